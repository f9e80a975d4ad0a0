//! ConPTY allocation and child-process spawn (§4.5 steps 9-13).
//!
//! Translated from `other_examples/.../platform/windows.rs`'s `Pty::spawn`
//! (which uses the `windows` crate) to `windows-sys`, to match the reference
//! codebase's own dependency choice, and reordered to match the exact step
//! sequence of `original_source/win32/conlog.c::main` — in particular,
//! `PSEUDOCONSOLE_INHERIT_CURSOR` (§4.5 step 10), which neither reference
//! implementation on its own includes.

use crate::error::LauncherError;
use std::cell::Cell;
use std::ptr;
use windows_sys::Win32::Foundation::{CloseHandle, GetLastError, HANDLE};
use windows_sys::Win32::Storage::FileSystem::{ReadFile, WriteFile};
use windows_sys::Win32::System::Console::{
    ClosePseudoConsole, CreatePseudoConsole, ResizePseudoConsole, COORD, HPCON,
    PSEUDOCONSOLE_INHERIT_CURSOR,
};
use windows_sys::Win32::System::Pipes::CreatePipe;
use windows_sys::Win32::System::Threading::{
    CreateProcessW, InitializeProcThreadAttributeList, UpdateProcThreadAttribute,
    EXTENDED_STARTUPINFO_PRESENT, PROCESS_INFORMATION, PROC_THREAD_ATTRIBUTE_PSEUDOCONSOLE,
    STARTUPINFOEXW,
};

/// An allocated pseudo-console with its child process attached (§3).
pub struct Pty {
    /// `Cell`-wrapped so `close_pseudo_console` can be called through `&Pty`
    /// mid-lifecycle (§4.5 step 16) without requiring unique ownership, and
    /// so `Drop` can detect it already ran.
    handle: Cell<HPCON>,
    /// We write to this; the PTY reads from the other end, which the child
    /// inherits as its stdin (§4.5 step 9).
    input_write: HANDLE,
    /// We read from this; the PTY writes to the other end (§4.5 step 9).
    output_read: HANDLE,
    process: HANDLE,
    thread: HANDLE,
    pid: u32,
}

unsafe impl Send for Pty {}

// The `Cell<HPCON>` is only ever written by `close_pseudo_console`, which the
// lifecycle manager calls from the main thread after the input thread (the
// only other thread that could observe a torn read) has already joined; the
// output thread never touches `handle`. Shared `&Pty` access from both
// worker threads is otherwise limited to plain `Copy` handles.
unsafe impl Sync for Pty {}

impl Pty {
    /// Allocate the PTY at `(cols, rows)` and launch `command_line` attached
    /// to it (§4.5 steps 9-13). `command_line` must already be a mutable-safe
    /// `CreateProcessW`-style string (caller owns the wide buffer).
    pub fn spawn(command_line: &str, cols: u16, rows: u16) -> Result<Self, LauncherError> {
        unsafe {
            let mut pty_stdin_read: HANDLE = 0;
            let mut our_stdin_write: HANDLE = 0;
            let mut our_stdout_read: HANDLE = 0;
            let mut pty_stdout_write: HANDLE = 0;

            if CreatePipe(&mut pty_stdin_read, &mut our_stdin_write, ptr::null(), 0) == 0 {
                return Err(resource_error("child-input pipe"));
            }
            if CreatePipe(&mut our_stdout_read, &mut pty_stdout_write, ptr::null(), 0) == 0 {
                close_all(&[pty_stdin_read, our_stdin_write]);
                return Err(resource_error("child-output pipe"));
            }

            let size = COORD {
                X: cols as i16,
                Y: rows as i16,
            };

            let mut handle: HPCON = 0;
            let hr = CreatePseudoConsole(
                size,
                pty_stdin_read,
                pty_stdout_write,
                PSEUDOCONSOLE_INHERIT_CURSOR,
                &mut handle,
            );

            // §4.5 step 13: the PTY now owns these; our copies are closed
            // regardless of whether allocation succeeded.
            close_all(&[pty_stdin_read, pty_stdout_write]);

            if hr != 0 {
                close_all(&[our_stdin_write, our_stdout_read]);
                return Err(LauncherError::ResourceCreation {
                    resource: "CreatePseudoConsole",
                    code: hr as u32,
                });
            }

            let spawn_result = Self::launch(command_line, handle);
            let (process, thread, pid) = match spawn_result {
                Ok(triple) => triple,
                Err(err) => {
                    ClosePseudoConsole(handle);
                    close_all(&[our_stdin_write, our_stdout_read]);
                    return Err(err);
                }
            };

            Ok(Self {
                handle: Cell::new(handle),
                input_write: our_stdin_write,
                output_read: our_stdout_read,
                process,
                thread,
                pid,
            })
        }
    }

    unsafe fn launch(
        command_line: &str,
        pty: HPCON,
    ) -> Result<(HANDLE, HANDLE, u32), LauncherError> {
        let mut attr_list_size: usize = 0;
        InitializeProcThreadAttributeList(ptr::null_mut(), 1, 0, &mut attr_list_size);

        let mut attr_list_buf = vec![0u8; attr_list_size];
        let attr_list = attr_list_buf.as_mut_ptr() as *mut _;
        if InitializeProcThreadAttributeList(attr_list, 1, 0, &mut attr_list_size) == 0 {
            return Err(resource_error("InitializeProcThreadAttributeList"));
        }

        if UpdateProcThreadAttribute(
            attr_list,
            0,
            PROC_THREAD_ATTRIBUTE_PSEUDOCONSOLE as usize,
            pty as *const _,
            std::mem::size_of::<HPCON>(),
            ptr::null_mut(),
            ptr::null(),
        ) == 0
        {
            return Err(resource_error("UpdateProcThreadAttribute"));
        }

        let mut startup_info: STARTUPINFOEXW = std::mem::zeroed();
        startup_info.StartupInfo.cb = std::mem::size_of::<STARTUPINFOEXW>() as u32;
        startup_info.lpAttributeList = attr_list;

        let mut cmdline_wide: Vec<u16> = command_line.encode_utf16().chain(std::iter::once(0)).collect();

        let mut process_info: PROCESS_INFORMATION = std::mem::zeroed();
        let ok = CreateProcessW(
            ptr::null(),
            cmdline_wide.as_mut_ptr(),
            ptr::null(),
            ptr::null(),
            0,
            EXTENDED_STARTUPINFO_PRESENT,
            ptr::null(),
            ptr::null(),
            (&startup_info as *const STARTUPINFOEXW).cast(),
            &mut process_info,
        );

        if ok == 0 {
            return Err(LauncherError::ChildLaunch {
                code: GetLastError(),
            });
        }

        CloseHandle(process_info.hThread);
        Ok((process_info.hProcess, process_info.hThread, process_info.dwProcessId))
    }

    pub fn input_write_handle(&self) -> HANDLE {
        self.input_write
    }

    pub fn output_read_handle(&self) -> HANDLE {
        self.output_read
    }

    pub fn process_handle(&self) -> HANDLE {
        self.process
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Read up to `buf.len()` bytes of the child's output (§4.1, output
    /// thread's blocking read).
    pub fn read(&self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut read = 0u32;
        let ok = unsafe {
            ReadFile(
                self.output_read,
                buf.as_mut_ptr(),
                buf.len() as u32,
                &mut read,
                ptr::null_mut(),
            )
        };
        if ok == 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(read as usize)
    }

    /// Write the child's stdin, looping on short writes (§4.3).
    pub fn write(&self, mut data: &[u8]) -> std::io::Result<()> {
        while !data.is_empty() {
            let mut written = 0u32;
            let ok = unsafe {
                WriteFile(
                    self.input_write,
                    data.as_ptr(),
                    data.len() as u32,
                    &mut written,
                    ptr::null_mut(),
                )
            };
            if ok == 0 || written == 0 {
                return Err(std::io::Error::last_os_error());
            }
            data = &data[written as usize..];
        }
        Ok(())
    }

    /// Resize the PTY's virtual screen buffer (§4.3 window-resize handling).
    pub fn resize(&self, cols: u16, rows: u16) -> Result<(), LauncherError> {
        let size = COORD {
            X: cols as i16,
            Y: rows as i16,
        };
        let hr = unsafe { ResizePseudoConsole(self.handle.get(), size) };
        if hr != 0 {
            return Err(LauncherError::ResourceCreation {
                resource: "ResizePseudoConsole",
                code: hr as u32,
            });
        }
        Ok(())
    }

    /// Close the pseudo-console, which releases ConPTY's internal reference
    /// to the output pipe's write side and lets the output thread's blocking
    /// `read` return 0 (§4.5 step 16). Idempotent: a second call (including
    /// the one `Drop` makes) is a no-op.
    pub fn close_pseudo_console(&self) {
        let handle = self.handle.get();
        if handle != 0 {
            unsafe { ClosePseudoConsole(handle) };
            self.handle.set(0);
        }
    }
}

impl Drop for Pty {
    fn drop(&mut self) {
        self.close_pseudo_console();
        unsafe {
            CloseHandle(self.input_write);
            CloseHandle(self.output_read);
            CloseHandle(self.process);
        }
    }
}

fn close_all(handles: &[HANDLE]) {
    for &h in handles {
        if h != 0 {
            unsafe {
                CloseHandle(h);
            }
        }
    }
}

fn resource_error(resource: &'static str) -> LauncherError {
    LauncherError::ResourceCreation {
        resource,
        code: unsafe { GetLastError() },
    }
}
