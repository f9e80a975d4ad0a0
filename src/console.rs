//! Console-mode, code-page, and screen-buffer helpers (§4.5 steps 3, 6, 8;
//! §4.4's cursor-position query).
//!
//! Grounded on the reference codebase's `windows_console_size`/
//! `MinimalTerminalGuard` mode-bit arithmetic, generalized so the lifecycle
//! manager can apply the same save/compute/restore pattern to stdin and to
//! whichever of stdout/stderr is the console.

use crate::error::LauncherError;
use windows_sys::Win32::Foundation::{HANDLE, INVALID_HANDLE_VALUE};
use windows_sys::Win32::System::Console::{
    GetConsoleMode, GetConsoleScreenBufferInfo, SetConsoleMode, SetConsoleOutputCP,
    CONSOLE_SCREEN_BUFFER_INFO, ENABLE_ECHO_INPUT, ENABLE_LINE_INPUT, ENABLE_PROCESSED_INPUT,
    ENABLE_PROCESSED_OUTPUT, ENABLE_VIRTUAL_TERMINAL_PROCESSING, ENABLE_WINDOW_INPUT,
};

const CP_UTF8: u32 = 65001;

/// Does `handle` denote a console device? A `GetConsoleMode` failure means no
/// (it's a file, pipe, or invalid handle) rather than an error (§4.5 step 4).
pub fn is_console(handle: HANDLE) -> bool {
    if handle == INVALID_HANDLE_VALUE || handle == 0 {
        return false;
    }
    let mut mode = 0u32;
    unsafe { GetConsoleMode(handle, &mut mode) != 0 }
}

pub fn get_console_mode(handle: HANDLE) -> Result<u32, LauncherError> {
    let mut mode = 0u32;
    let ok = unsafe { GetConsoleMode(handle, &mut mode) };
    if ok == 0 {
        return Err(last_error("GetConsoleMode"));
    }
    Ok(mode)
}

pub fn set_console_mode(handle: HANDLE, mode: u32) -> Result<(), LauncherError> {
    let ok = unsafe { SetConsoleMode(handle, mode) };
    if ok == 0 {
        return Err(last_error("SetConsoleMode"));
    }
    Ok(())
}

/// §4.5 step 3: WINDOW_INPUT enabled, LINE_INPUT/ECHO/PROCESSED disabled.
pub fn minimal_input_mode(original: u32) -> u32 {
    (original | ENABLE_WINDOW_INPUT)
        & !(ENABLE_LINE_INPUT | ENABLE_ECHO_INPUT | ENABLE_PROCESSED_INPUT)
}

/// §4.5 step 8: PROCESSED_OUTPUT and VIRTUAL_TERMINAL_PROCESSING enabled on
/// top of whatever was already set.
pub fn processed_output_mode(original: u32) -> u32 {
    original | ENABLE_PROCESSED_OUTPUT | ENABLE_VIRTUAL_TERMINAL_PROCESSING
}

/// §4.5 step 6: the console's output code page is forced to UTF-8.
pub fn set_output_code_page_utf8() -> Result<(), LauncherError> {
    if unsafe { SetConsoleOutputCP(CP_UTF8) } == 0 {
        return Err(last_error("SetConsoleOutputCP"));
    }
    Ok(())
}

fn screen_buffer_info(handle: HANDLE) -> Result<CONSOLE_SCREEN_BUFFER_INFO, LauncherError> {
    let mut info = std::mem::MaybeUninit::<CONSOLE_SCREEN_BUFFER_INFO>::uninit();
    let ok = unsafe { GetConsoleScreenBufferInfo(handle, info.as_mut_ptr()) };
    if ok == 0 {
        return Err(last_error("GetConsoleScreenBufferInfo"));
    }
    Ok(unsafe { info.assume_init() })
}

/// The screen buffer's (cols, rows), used to size the PTY at allocation time
/// (§4.5 step 8). This is `dwSize`, not the visible window rect (`srWindow`)
/// — `conlog.c`'s `CreatePseudoConsole` call sizes the PTY off the buffer
/// itself, and the resize path in `input_pipeline.rs` responds to the same
/// buffer-size field from `WINDOW_BUFFER_SIZE_EVENT`.
pub fn window_size(handle: HANDLE) -> Result<(u16, u16), LauncherError> {
    let info = screen_buffer_info(handle)?;
    Ok((info.dwSize.X as u16, info.dwSize.Y as u16))
}

/// The host console's current cursor position as 1-indexed (row, col), the
/// form `CSI <row> ; <col> R` expects (§4.4, §6).
pub fn cursor_position_one_indexed(handle: HANDLE) -> Result<(i32, i32), LauncherError> {
    let info = screen_buffer_info(handle)?;
    Ok((
        info.dwCursorPosition.Y as i32 + 1,
        info.dwCursorPosition.X as i32 + 1,
    ))
}

fn last_error(call: &'static str) -> LauncherError {
    let code = unsafe { windows_sys::Win32::Foundation::GetLastError() };
    LauncherError::ResourceCreation {
        resource: call,
        code,
    }
}
