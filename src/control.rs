//! Control Channel: a one-byte-message pipe from the output thread to the
//! input thread, paired with a wake event (§3, §4.4).
//!
//! The reference codebase's `PtyControl` (`control.rs`) uses an
//! `mpsc::Sender`, which is the right shape for a command queue but can't sit
//! in a `WaitForMultipleObjects` wait alongside the console input handle.
//! This is a real anonymous pipe plus an auto-reset event instead, built the
//! same way the original program's own `hQuit` event is (`CreateEvent(NULL,
//! FALSE, FALSE, NULL)`), so a single wait call covers both sources.

use crate::error::LauncherError;
use std::ptr;
use windows_sys::Win32::Foundation::{CloseHandle, GetLastError, HANDLE};
use windows_sys::Win32::Storage::FileSystem::ReadFile;
use windows_sys::Win32::Storage::FileSystem::WriteFile;
use windows_sys::Win32::System::Pipes::{CreatePipe, PeekNamedPipe};
use windows_sys::Win32::System::Threading::{CreateEventW, SetEvent};

/// Request shutdown of the input thread.
pub const SHUTDOWN: u8 = 0x00;
/// Ask the input thread to resend focus state if it has drifted.
pub const RESEND_FOCUS: u8 = 0x01;
/// Ask the input thread to query and emit a cursor-position report.
pub const CURSOR_POSITION_REQUEST: u8 = 0x02;

/// Held by the output thread. Writes a byte, then signals the wake event so
/// the input thread's wait returns promptly (§4.2).
pub struct ControlSender {
    write_handle: HANDLE,
    wake_event: HANDLE,
}

/// Held by the input thread. Drains whatever bytes are queued without
/// blocking (§4.4).
pub struct ControlReceiver {
    read_handle: HANDLE,
    wake_event: HANDLE,
}

unsafe impl Send for ControlSender {}
unsafe impl Send for ControlReceiver {}

/// Allocate the pipe and its wake event (§4.5 step 2).
pub fn create() -> Result<(ControlSender, ControlReceiver), LauncherError> {
    let mut read_handle: HANDLE = 0;
    let mut write_handle: HANDLE = 0;

    let ok = unsafe { CreatePipe(&mut read_handle, &mut write_handle, ptr::null(), 0) };
    if ok == 0 {
        return Err(resource_error("control pipe"));
    }

    let wake_event = unsafe { CreateEventW(ptr::null(), 0, 0, ptr::null()) };
    if wake_event == 0 {
        unsafe {
            CloseHandle(read_handle);
            CloseHandle(write_handle);
        }
        return Err(resource_error("control wake event"));
    }

    Ok((
        ControlSender {
            write_handle,
            wake_event,
        },
        ControlReceiver {
            read_handle,
            wake_event,
        },
    ))
}

impl ControlSender {
    /// Write one byte and signal the wake event.
    pub fn send(&self, byte: u8) -> Result<(), LauncherError> {
        let mut written = 0u32;
        let ok = unsafe {
            WriteFile(
                self.write_handle,
                &byte as *const u8,
                1,
                &mut written,
                ptr::null_mut(),
            )
        };
        if ok == 0 || written == 0 {
            return Err(resource_error("control pipe write"));
        }
        unsafe { SetEvent(self.wake_event) };
        Ok(())
    }
}

impl ControlReceiver {
    /// The event the input thread includes in its `WaitForMultipleObjects`
    /// call (§4.4).
    pub fn wake_event(&self) -> HANDLE {
        self.wake_event
    }

    /// Non-blocking drain: peek, and if nothing is queued, stop (§4.4).
    pub fn drain(&self) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let mut available = 0u32;
            let peeked = unsafe {
                PeekNamedPipe(
                    self.read_handle,
                    ptr::null_mut(),
                    0,
                    ptr::null_mut(),
                    &mut available,
                    ptr::null_mut(),
                )
            };
            if peeked == 0 || available == 0 {
                break;
            }

            let mut byte = 0u8;
            let mut read = 0u32;
            let ok = unsafe {
                ReadFile(
                    self.read_handle,
                    &mut byte as *mut u8 as *mut _,
                    1,
                    &mut read,
                    ptr::null_mut(),
                )
            };
            if ok == 0 || read == 0 {
                break;
            }
            out.push(byte);
        }
        out
    }
}

impl Drop for ControlSender {
    fn drop(&mut self) {
        unsafe { CloseHandle(self.write_handle) };
    }
}

impl Drop for ControlReceiver {
    fn drop(&mut self) {
        unsafe {
            CloseHandle(self.read_handle);
            CloseHandle(self.wake_event);
        }
    }
}

fn resource_error(resource: &'static str) -> LauncherError {
    LauncherError::ResourceCreation {
        resource,
        code: unsafe { GetLastError() },
    }
}
