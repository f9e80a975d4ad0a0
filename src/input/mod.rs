//! Input Translator: host console input records → child-stdin bytes (§4.3).
//!
//! `keytable` holds the pure virtual-key lookup; this module adds the
//! character-key path (UTF-16 transcoding, the Ctrl+Space special case) on
//! top of it. Window-resize and focus-change handling need the live PTY
//! handle and [`crate::focus::FocusState`] respectively and live in the
//! Windows-gated input pipeline instead.

pub mod keytable;

use keytable::{translate_virtual_key, Modifiers, VirtualKey};

/// A key-down event, already decoded out of whatever the host console API
/// hands over (`INPUT_RECORD` on Windows). Key-up events are not represented
/// here — the input pipeline discards them before constructing one (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// The UTF-16 code unit the console resolved for this keystroke, or 0 if
    /// this is a pure virtual-key event with no character mapping.
    pub unicode_char: u16,
    pub virtual_key: Option<VirtualKey>,
    pub modifiers: Modifiers,
}

/// Translate one key-down event to the bytes to write to the child's stdin,
/// or `None` if the event produces nothing (e.g. an unmapped virtual key).
pub fn translate_key_event(event: KeyEvent) -> Option<Vec<u8>> {
    if event.unicode_char != 0 {
        if event.unicode_char == b' ' as u16 && event.modifiers.ctrl {
            return Some(vec![0u8]);
        }
        return encode_utf16_code_unit(event.unicode_char);
    }

    translate_virtual_key(event.virtual_key?, event.modifiers)
}

/// Transcode a single UTF-16 code unit to UTF-8 (§4.3 step 1). Lone
/// surrogates cannot be decoded from a single console key event and produce
/// no bytes rather than a replacement character.
fn encode_utf16_code_unit(unit: u16) -> Option<Vec<u8>> {
    char::from_u32(unit as u32).map(|c| {
        let mut buf = [0u8; 4];
        c.encode_utf8(&mut buf).as_bytes().to_vec()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printable_ascii_is_transcoded_to_utf8() {
        let event = KeyEvent {
            unicode_char: b'a' as u16,
            virtual_key: None,
            modifiers: Modifiers::default(),
        };
        assert_eq!(translate_key_event(event), Some(b"a".to_vec()));
    }

    #[test]
    fn ctrl_space_sends_nul() {
        let event = KeyEvent {
            unicode_char: b' ' as u16,
            virtual_key: None,
            modifiers: Modifiers {
                ctrl: true,
                ..Default::default()
            },
        };
        assert_eq!(translate_key_event(event), Some(vec![0u8]));
    }

    #[test]
    fn plain_space_is_not_special_cased() {
        let event = KeyEvent {
            unicode_char: b' ' as u16,
            virtual_key: None,
            modifiers: Modifiers::default(),
        };
        assert_eq!(translate_key_event(event), Some(b" ".to_vec()));
    }

    #[test]
    fn non_ascii_bmp_character_round_trips_through_utf8() {
        let event = KeyEvent {
            unicode_char: 'é' as u16,
            virtual_key: None,
            modifiers: Modifiers::default(),
        };
        assert_eq!(translate_key_event(event), Some("é".as_bytes().to_vec()));
    }

    #[test]
    fn pure_virtual_key_falls_through_to_keytable() {
        let event = KeyEvent {
            unicode_char: 0,
            virtual_key: Some(VirtualKey::Up),
            modifiers: Modifiers::default(),
        };
        assert_eq!(translate_key_event(event), Some(b"\x1b[A".to_vec()));
    }

    #[test]
    fn unmapped_virtual_key_produces_nothing() {
        let event = KeyEvent {
            unicode_char: 0,
            virtual_key: None,
            modifiers: Modifiers::default(),
        };
        assert_eq!(translate_key_event(event), None);
    }
}
