//! Lifecycle Manager: setup, run, and teardown (§4.5).
//!
//! The step numbers in the comments below are the eighteen steps of §4.5;
//! grounded throughout on `original_source/win32/conlog.c::main`, whose
//! sequencing (suppress error dialogs, validate stdin, probe stdout/stderr,
//! swap handles, set code page, parse the tail, allocate the PTY, spawn,
//! start threads, wait, teardown, restore modes) this function reproduces
//! with the `anyhow::Context`-annotated fallible-step style of the reference
//! codebase's own `execute_with_pty`.

use crate::cmdline::{parse_launcher_flags, resolve_command, skip_program_token};
use crate::console;
use crate::control;
use crate::error::LauncherError;
use crate::focus::FocusState;
use crate::pty::Pty;
use crate::sink::{OutputChannel, SinkWriter};
use crate::{input_pipeline, output_pipeline};
use anyhow::{Context, Result};
use std::io::{self, Write};
use std::thread;
use windows_sys::Win32::Foundation::{ERROR_NOT_SUPPORTED, HANDLE};
use windows_sys::Win32::System::Console::{
    GetStdHandle, SetStdHandle, WriteConsoleA, STD_ERROR_HANDLE, STD_INPUT_HANDLE,
    STD_OUTPUT_HANDLE,
};
use windows_sys::Win32::System::Diagnostics::Debug::{SetErrorMode, SEM_FAILCRITICALERRORS};
use windows_sys::Win32::System::Environment::GetEnvironmentVariableW;
use windows_sys::Win32::System::Threading::{GetExitCodeProcess, WaitForSingleObject, INFINITE};

/// Write side of a standard stream: a raw handle plus whether it denotes a
/// console device (§3's output-channel invariant).
struct ChannelHandle {
    handle: HANDLE,
    is_console: bool,
}

impl Write for ChannelHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut written = 0u32;
        let ok = unsafe {
            if self.is_console {
                WriteConsoleA(
                    self.handle,
                    buf.as_ptr().cast(),
                    buf.len() as u32,
                    &mut written,
                    std::ptr::null_mut(),
                )
            } else {
                windows_sys::Win32::Storage::FileSystem::WriteFile(
                    self.handle,
                    buf.as_ptr(),
                    buf.len() as u32,
                    &mut written,
                    std::ptr::null_mut(),
                )
            }
        };
        if ok == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(written as usize)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The outcome of a run that never reached a child exit code (§7's "write
/// error to non-console sink" flag): the message to report and the code to
/// propagate.
struct EarlyFailure {
    message: String,
    code: i32,
}

/// Run the whole program: steps 1-18 of §4.5, returning the exit code to
/// propagate (§7's propagation rule). `raw_command_line` is the value of
/// `GetCommandLineW` (or an equivalent caller-supplied string in tests).
pub fn run(raw_command_line: &str) -> i32 {
    match run_inner(raw_command_line) {
        Ok(code) => code,
        Err(err) => {
            // §7's propagation rule: the most recently captured OS error code
            // is returned, recovered from wherever it sits in the `anyhow`
            // cause chain that `.context(...)` built up.
            let code = err
                .chain()
                .find_map(|cause| cause.downcast_ref::<LauncherError>())
                .map(|e| e.exit_code() as i32)
                .unwrap_or(1);
            log::error!("{err:#}");
            report_to_non_console_sink(&EarlyFailure {
                message: format!("{err:#}"),
                code,
            });
            code
        }
    }
}

/// Step 18: a child exit code was never obtained, so format the error and
/// write it to whichever standard stream is not the console (best-effort;
/// see §7 kind 4 — this path tolerates its own failure).
fn report_to_non_console_sink(failure: &EarlyFailure) {
    let stdout_handle = unsafe { GetStdHandle(STD_OUTPUT_HANDLE) };
    let stderr_handle = unsafe { GetStdHandle(STD_ERROR_HANDLE) };
    let target = if console::is_console(stdout_handle) {
        stderr_handle
    } else {
        stdout_handle
    };
    let mut channel = ChannelHandle {
        handle: target,
        is_console: false,
    };
    let _ = writeln!(channel, "pty-tee: {} (exit {})", failure.message, failure.code);
}

fn run_inner(raw_command_line: &str) -> Result<i32> {
    // Step 1.
    unsafe {
        SetErrorMode(SEM_FAILCRITICALERRORS);
    }

    // Step 2.
    let (control_sender, control_receiver) =
        control::create().context("failed to create control channel")?;

    // Step 3.
    let stdin_handle = unsafe { GetStdHandle(STD_INPUT_HANDLE) };
    let saved_stdin_mode =
        console::get_console_mode(stdin_handle).context("stdin is not a console")?;
    console::set_console_mode(stdin_handle, console::minimal_input_mode(saved_stdin_mode))
        .context("stdin does not support the required mode")?;

    let mut teardown = ModeGuard {
        stdin_handle,
        saved_stdin_mode,
        channels: Vec::new(),
    };

    let result = run_with_modes_saved(raw_command_line, &control_sender, &control_receiver, &mut teardown);

    // Step 17 happens here via `teardown`'s Drop, on every exit path.
    drop(teardown);

    result
}

fn run_with_modes_saved(
    raw_command_line: &str,
    control_sender: &control::ControlSender,
    control_receiver: &control::ControlReceiver,
    teardown: &mut ModeGuard,
) -> Result<i32> {
    // Step 4.
    let stdout_handle = unsafe { GetStdHandle(STD_OUTPUT_HANDLE) };
    let stderr_handle = unsafe { GetStdHandle(STD_ERROR_HANDLE) };
    let stdout_is_console = console::is_console(stdout_handle);
    let stderr_is_console = console::is_console(stderr_handle);

    if stdout_is_console == stderr_is_console {
        let message = if stdout_is_console {
            "both stdout and stderr are console devices"
        } else {
            "no console output"
        };
        return Err(LauncherError::Precondition {
            message: message.to_string(),
            code: ERROR_NOT_SUPPORTED,
        }
        .into());
    }

    // Step 5: swap so the console side always ends up reachable via whichever
    // standard handle downstream error printing already targets. The
    // original program only codes the stdout-is-file / stderr-is-console
    // direction; the symmetric case is handled the same way here since §4.5
    // does not restrict the swap to one orientation.
    let console_handle = if stderr_is_console {
        unsafe {
            SetStdHandle(STD_OUTPUT_HANDLE, stderr_handle);
            SetStdHandle(STD_ERROR_HANDLE, stdout_handle);
        }
        stderr_handle
    } else {
        stdout_handle
    };
    let console_mode_before =
        console::get_console_mode(console_handle).context("failed to read console output mode")?;

    // Step 6.
    console::set_output_code_page_utf8().context("failed to set UTF-8 output code page")?;

    // Step 7.
    let tail = skip_program_token(raw_command_line);
    let (flags, tail) = parse_launcher_flags(tail);
    if flags.show_version {
        println!("pty-tee {}", crate::VERSION);
        return Ok(0);
    }
    if flags.show_help {
        println!("usage: pty-tee [--verbose|-v] [--version] [--help] -- <command>");
        return Ok(0);
    }

    let comspec = env_comspec();
    let command = resolve_command(tail, comspec.as_deref())
        .context("no command given and COMSPEC is not set")?
        .to_string();

    log::debug!("launching: {command}");

    // Step 8.
    console::set_console_mode(
        console_handle,
        console::processed_output_mode(console_mode_before),
    )
    .context("failed to enable VT processing on the console sink")?;
    let (cols, rows) =
        console::window_size(console_handle).context("failed to read console window size")?;
    teardown.channels.push((console_handle, console_mode_before));

    // Steps 9-13.
    let pty = Pty::spawn(&command, cols, rows).context("failed to launch child")?;
    log::info!("child pid {} attached to {cols}x{rows} PTY", pty.pid());

    // Step 14: the Sink Writer's channels are (re-)read from the standard
    // handles now, after the step-5 swap, so both always address the right
    // destination regardless of which original orientation was swapped.
    let channels = vec![
        OutputChannel::new(
            ChannelHandle {
                handle: unsafe { GetStdHandle(STD_OUTPUT_HANDLE) },
                is_console: console::is_console(unsafe { GetStdHandle(STD_OUTPUT_HANDLE) }),
            },
            console::is_console(unsafe { GetStdHandle(STD_OUTPUT_HANDLE) }),
        ),
        OutputChannel::new(
            ChannelHandle {
                handle: unsafe { GetStdHandle(STD_ERROR_HANDLE) },
                is_console: console::is_console(unsafe { GetStdHandle(STD_ERROR_HANDLE) }),
            },
            console::is_console(unsafe { GetStdHandle(STD_ERROR_HANDLE) }),
        ),
    ];

    let focus = FocusState::new();
    let exit_code = drive_child(
        &pty,
        control_sender,
        control_receiver,
        &focus,
        console_handle,
        channels,
    );

    Ok(exit_code)
}

/// Steps 14-16: start both worker threads, wait for the child, then tear the
/// threads down in the order §4.5 specifies — signal shutdown, join input,
/// close the PTY (unblocking the output thread's read), join output.
fn drive_child(
    pty: &Pty,
    control_sender: &control::ControlSender,
    control_receiver: &control::ControlReceiver,
    focus: &FocusState,
    console_handle: HANDLE,
    channels: Vec<OutputChannel<ChannelHandle>>,
) -> i32 {
    let mut sink = SinkWriter::new(channels);
    let stdin_handle = unsafe { GetStdHandle(STD_INPUT_HANDLE) };

    thread::scope(|scope| {
        let output_thread = scope.spawn(|| {
            output_pipeline::run(pty, &mut sink, control_sender, focus);
        });
        let input_thread = scope.spawn(|| {
            input_pipeline::run(stdin_handle, console_handle, pty, control_receiver, focus);
        });

        // Step 15.
        let exit_code = wait_for_child(pty);
        log::debug!("child exited with code {exit_code}");

        // Step 16.
        if let Err(e) = control_sender.send(control::SHUTDOWN) {
            log::warn!("failed to signal input-thread shutdown: {e}");
        }
        let _ = input_thread.join();
        pty.close_pseudo_console();
        let _ = output_thread.join();

        exit_code
    })
}

fn wait_for_child(pty: &Pty) -> i32 {
    unsafe {
        WaitForSingleObject(pty.process_handle(), INFINITE);
    }
    let mut code = 0u32;
    let ok = unsafe { GetExitCodeProcess(pty.process_handle(), &mut code) };
    if ok == 0 {
        log::warn!("failed to read child exit code, treating as failure");
        return 1;
    }
    code as i32
}

fn env_comspec() -> Option<String> {
    let name: Vec<u16> = "COMSPEC\0".encode_utf16().collect();
    let mut buf = vec![0u16; 260];
    let len = unsafe { GetEnvironmentVariableW(name.as_ptr(), buf.as_mut_ptr(), buf.len() as u32) };
    if len == 0 || len as usize >= buf.len() {
        return None;
    }
    buf.truncate(len as usize);
    Some(String::from_utf16_lossy(&buf))
}

/// Step 17: restores stdin's mode and every console sink's mode on drop,
/// regardless of which path out of `run_inner` is taken (§4.5's "restored on
/// every exit path" invariant).
struct ModeGuard {
    stdin_handle: HANDLE,
    saved_stdin_mode: u32,
    channels: Vec<(HANDLE, u32)>,
}

impl Drop for ModeGuard {
    fn drop(&mut self) {
        for &(handle, mode) in &self.channels {
            if let Err(e) = console::set_console_mode(handle, mode) {
                log::warn!("failed to restore console output mode: {e}");
            }
        }
        if let Err(e) = console::set_console_mode(self.stdin_handle, self.saved_stdin_mode) {
            log::warn!("failed to restore stdin mode: {e}");
        }
    }
}
