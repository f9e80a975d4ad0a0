//! Input thread body: the multi-object wait over the host console and the
//! control channel's wake event, and dispatch of the three input-record
//! kinds (§4.3, §4.4).
//!
//! The wait/dispatch shape follows `original_source/win32/conlog.c`'s
//! `input_thread` exactly (`WaitForMultipleObjects` over `{console, hQuit}`,
//! then a single `ReadConsoleInputW`); the translation of key and focus
//! events into bytes is delegated to `crate::input` and `crate::focus`,
//! which that C function inlines directly. Decoding `INPUT_RECORD` into the
//! portable `KeyEvent`/`Modifiers` shape lives here, not in `crate::input`,
//! so that module stays Win32-free.

use crate::control::ControlReceiver;
use crate::focus::FocusState;
use crate::input::keytable::{Modifiers, VirtualKey};
use crate::input::{translate_key_event, KeyEvent};
use crate::pty::Pty;
use windows_sys::Win32::Foundation::{HANDLE, WAIT_FAILED, WAIT_OBJECT_0};
use windows_sys::Win32::System::Console::{
    ReadConsoleInputW, FOCUS_EVENT, INPUT_RECORD, KEY_EVENT, LEFT_ALT_PRESSED, LEFT_CTRL_PRESSED,
    RIGHT_ALT_PRESSED, RIGHT_CTRL_PRESSED, SHIFT_PRESSED, WINDOW_BUFFER_SIZE_EVENT,
};
use windows_sys::Win32::System::Threading::WaitForMultipleObjects;
use windows_sys::Win32::UI::Input::KeyboardAndMouse::{
    VK_CLEAR, VK_DELETE, VK_DOWN, VK_END, VK_ESCAPE, VK_F1, VK_F10, VK_F11, VK_F12, VK_F2, VK_F3,
    VK_F4, VK_F5, VK_F6, VK_F7, VK_F8, VK_F9, VK_HOME, VK_INSERT, VK_LEFT, VK_NEXT, VK_PRIOR,
    VK_RIGHT, VK_UP,
};

/// Run the input loop until a shutdown request is drained from the control
/// channel or the wait itself fails (§4.4, §5 cancellation).
///
/// `console_input` is the host console's input handle; `screen_buffer` is
/// its output handle, used only to answer cursor-position queries (§4.4).
pub fn run(
    console_input: HANDLE,
    screen_buffer: HANDLE,
    pty: &Pty,
    control: &ControlReceiver,
    focus: &FocusState,
) {
    let handles = [console_input, control.wake_event()];

    loop {
        let wait = unsafe { WaitForMultipleObjects(2, handles.as_ptr(), 0, u32::MAX) };

        if wait == WAIT_FAILED {
            log::debug!("input thread: wait failed, exiting");
            break;
        }

        let signaled_index = wait - WAIT_OBJECT_0;

        if signaled_index == 1 && drain_control(control, screen_buffer, pty, focus) {
            log::debug!("input thread: shutdown requested");
            break;
        }

        if signaled_index == 0 {
            match read_one(console_input) {
                Some(record) => handle_record(&record, pty, focus),
                None => {
                    log::debug!("input thread: ReadConsoleInputW failed, exiting");
                    break;
                }
            }
        }
    }
}

/// Drain every queued control byte; returns `true` if shutdown was among
/// them (§4.4).
fn drain_control(control: &ControlReceiver, screen_buffer: HANDLE, pty: &Pty, focus: &FocusState) -> bool {
    let mut shutdown = false;
    for byte in control.drain() {
        match byte {
            crate::control::SHUTDOWN => shutdown = true,
            crate::control::RESEND_FOCUS => {
                if let Some(bytes) = focus.resend_if_needed() {
                    write_child(pty, bytes);
                }
            }
            crate::control::CURSOR_POSITION_REQUEST => emit_cursor_report(pty, screen_buffer),
            _ => log::warn!("input thread: unrecognized control byte {byte:#04x}"),
        }
    }
    shutdown
}

fn read_one(console_input: HANDLE) -> Option<INPUT_RECORD> {
    let mut record: INPUT_RECORD = unsafe { std::mem::zeroed() };
    let mut read = 0u32;
    let ok = unsafe { ReadConsoleInputW(console_input, &mut record, 1, &mut read) };
    if ok == 0 || read == 0 {
        return None;
    }
    Some(record)
}

fn handle_record(record: &INPUT_RECORD, pty: &Pty, focus: &FocusState) {
    match record.EventType as u32 {
        WINDOW_BUFFER_SIZE_EVENT => {
            let size = unsafe { record.Event.WindowBufferSizeEvent.dwSize };
            if let Err(e) = pty.resize(size.X as u16, size.Y as u16) {
                log::warn!("input thread: PTY resize failed: {e}");
            }
        }
        FOCUS_EVENT => {
            let has_focus = unsafe { record.Event.FocusEvent.bSetFocus } != 0;
            if let Some(bytes) = focus.on_host_focus_change(has_focus) {
                write_child(pty, bytes);
            }
        }
        KEY_EVENT => {
            let key_event = unsafe { &record.Event.KeyEvent };
            if key_event.bKeyDown == 0 {
                return;
            }
            let event = KeyEvent {
                unicode_char: unsafe { key_event.uChar.UnicodeChar },
                virtual_key: virtual_key_from_vk(key_event.wVirtualKeyCode),
                modifiers: modifiers_from_control_key_state(key_event.dwControlKeyState),
            };
            if let Some(bytes) = translate_key_event(event) {
                write_child(pty, &bytes);
            }
        }
        _ => {}
    }
}

/// §4.3's table only names a fixed subset of virtual keys; anything else
/// maps to `None` and is dropped unless it also carries a `UnicodeChar`.
fn virtual_key_from_vk(vk: u16) -> Option<VirtualKey> {
    Some(match vk as u32 {
        VK_ESCAPE => VirtualKey::Escape,
        VK_UP => VirtualKey::Up,
        VK_DOWN => VirtualKey::Down,
        VK_RIGHT => VirtualKey::Right,
        VK_LEFT => VirtualKey::Left,
        VK_CLEAR => VirtualKey::Clear,
        VK_HOME => VirtualKey::Home,
        VK_INSERT => VirtualKey::Insert,
        VK_DELETE => VirtualKey::Delete,
        VK_END => VirtualKey::End,
        VK_PRIOR => VirtualKey::PageUp,
        VK_NEXT => VirtualKey::PageDown,
        VK_F1 => VirtualKey::F1,
        VK_F2 => VirtualKey::F2,
        VK_F3 => VirtualKey::F3,
        VK_F4 => VirtualKey::F4,
        VK_F5 => VirtualKey::F5,
        VK_F6 => VirtualKey::F6,
        VK_F7 => VirtualKey::F7,
        VK_F8 => VirtualKey::F8,
        VK_F9 => VirtualKey::F9,
        VK_F10 => VirtualKey::F10,
        VK_F11 => VirtualKey::F11,
        VK_F12 => VirtualKey::F12,
        _ => return None,
    })
}

fn modifiers_from_control_key_state(state: u32) -> Modifiers {
    Modifiers {
        shift: state & SHIFT_PRESSED != 0,
        alt: state & (LEFT_ALT_PRESSED | RIGHT_ALT_PRESSED) != 0,
        ctrl: state & (LEFT_CTRL_PRESSED | RIGHT_CTRL_PRESSED) != 0,
    }
}

fn emit_cursor_report(pty: &Pty, screen_buffer: HANDLE) {
    match crate::console::cursor_position_one_indexed(screen_buffer) {
        Ok((row, col)) => {
            let report = format!("\x1b[{row};{col}R");
            write_child(pty, report.as_bytes());
        }
        Err(e) => log::warn!("input thread: cursor-position query failed: {e}"),
    }
}

fn write_child(pty: &Pty, bytes: &[u8]) {
    if let Err(e) = pty.write(bytes) {
        log::debug!("input thread: write to child stdin ended ({e})");
    }
}
