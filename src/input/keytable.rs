//! Virtual-key → escape-sequence table for the Input Translator (§4.3).
//!
//! Pure and portable: takes an already-decoded virtual key and modifier set
//! (the Windows-specific `INPUT_RECORD` decoding lives in the input
//! pipeline) and returns the bytes to write to the child's stdin.

/// The subset of virtual keys this launcher translates to escape sequences.
/// Keys outside this set with no `UnicodeChar` produce nothing (§4.3 only
/// covers the listed keys; anything else is silently dropped, matching the
/// original program's `switch` falling through with `code == 0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirtualKey {
    Escape,
    Up,
    Down,
    Right,
    Left,
    Clear,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    Home,
    Insert,
    Delete,
    End,
    PageUp,
    PageDown,
}

/// Active modifier set on a key event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub alt: bool,
    pub ctrl: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.shift || self.alt || self.ctrl
    }

    /// The xterm modifier code for this combination (§4.3). Plain Alt and no
    /// modifier both yield `None` — the table in §4.3 simply does not
    /// assign either one a code.
    pub fn code(&self) -> Option<u32> {
        match (self.shift, self.alt, self.ctrl) {
            (true, false, false) => Some(2),
            (true, true, false) => Some(4),
            (false, false, true) => Some(5),
            (true, false, true) => Some(6),
            (false, true, true) => Some(7),
            (true, true, true) => Some(8),
            _ => None,
        }
    }
}

struct BaseSequence {
    introducer: u8,
    final_byte: u8,
    params: Vec<u32>,
}

fn base_sequence(key: VirtualKey, modifiers: Modifiers) -> Option<BaseSequence> {
    use VirtualKey::*;

    let arrow_like = |final_byte: u8| BaseSequence {
        introducer: b'[',
        final_byte,
        params: if modifiers.any() { vec![1] } else { vec![] },
    };

    let function_key = |unmodified_final: u8| BaseSequence {
        introducer: if modifiers.any() { b'[' } else { b'O' },
        final_byte: unmodified_final,
        params: if modifiers.any() { vec![1] } else { vec![] },
    };

    let editing_key = |param: u32| BaseSequence {
        introducer: b'[',
        final_byte: b'~',
        params: vec![param],
    };

    Some(match key {
        Escape => BaseSequence {
            introducer: b'[',
            final_byte: b'P',
            params: vec![],
        },
        Up => arrow_like(b'A'),
        Down => arrow_like(b'B'),
        Right => arrow_like(b'C'),
        Left => arrow_like(b'D'),
        Clear => arrow_like(b'E'),
        F1 => function_key(b'P'),
        F2 => function_key(b'Q'),
        F3 => function_key(b'R'),
        F4 => function_key(b'S'),
        Home => editing_key(1),
        Insert => editing_key(2),
        Delete => editing_key(3),
        End => editing_key(4),
        PageUp => editing_key(5),
        PageDown => editing_key(6),
        F5 => editing_key(15),
        F6 => editing_key(17),
        F7 => editing_key(18),
        F8 => editing_key(19),
        F9 => editing_key(20),
        F10 => editing_key(21),
        F11 => editing_key(23),
        F12 => editing_key(24),
    })
}

fn emit(introducer: u8, params: &[u32], final_byte: u8) -> Vec<u8> {
    let mut out = vec![0x1b, introducer];
    for (i, param) in params.iter().enumerate() {
        if i > 0 {
            out.push(b';');
        }
        out.extend_from_slice(param.to_string().as_bytes());
    }
    out.push(final_byte);
    out
}

/// Translate a virtual key, with its active modifiers, to the escape-sequence
/// bytes to write to the child's stdin (§4.3). Returns `None` for keys not in
/// the translation table.
pub fn translate_virtual_key(key: VirtualKey, modifiers: Modifiers) -> Option<Vec<u8>> {
    let mut sequence = base_sequence(key, modifiers)?;

    if key == VirtualKey::Escape {
        // Esc carries a modifier parameter only when Shift participates;
        // plain Ctrl/Alt-Escape are emitted unmodified (§4.3).
        if modifiers.shift {
            if let Some(code) = modifiers.code() {
                sequence.params = vec![1, code];
            }
        }
    } else if let Some(code) = modifiers.code() {
        if !sequence.params.is_empty() {
            sequence.params.push(code);
        }
    }

    Some(emit(sequence.introducer, &sequence.params, sequence.final_byte))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmodified_arrow_has_no_params() {
        let bytes = translate_virtual_key(VirtualKey::Up, Modifiers::default()).unwrap();
        assert_eq!(bytes, b"\x1b[A");
    }

    #[test]
    fn shift_up_uses_xterm_modifier_encoding() {
        let bytes = translate_virtual_key(
            VirtualKey::Up,
            Modifiers {
                shift: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(bytes, b"\x1b[1;2A");
    }

    #[test]
    fn unmodified_function_key_uses_ss3() {
        let bytes = translate_virtual_key(VirtualKey::F3, Modifiers::default()).unwrap();
        assert_eq!(bytes, b"\x1bOR");
    }

    #[test]
    fn ctrl_function_key_switches_to_csi() {
        let bytes = translate_virtual_key(
            VirtualKey::F3,
            Modifiers {
                ctrl: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(bytes, b"\x1b[1;5R");
    }

    #[test]
    fn editing_key_always_carries_its_default_param() {
        let bytes = translate_virtual_key(VirtualKey::Home, Modifiers::default()).unwrap();
        assert_eq!(bytes, b"\x1b[1~");
    }

    #[test]
    fn editing_key_with_modifier_appends_code() {
        let bytes = translate_virtual_key(
            VirtualKey::Delete,
            Modifiers {
                shift: true,
                ctrl: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(bytes, b"\x1b[3;6~");
    }

    #[test]
    fn plain_escape_has_no_params() {
        let bytes = translate_virtual_key(VirtualKey::Escape, Modifiers::default()).unwrap();
        assert_eq!(bytes, b"\x1b[P");
    }

    #[test]
    fn shift_escape_synthesizes_a_leading_param() {
        let bytes = translate_virtual_key(
            VirtualKey::Escape,
            Modifiers {
                shift: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(bytes, b"\x1b[1;2P");
    }

    #[test]
    fn ctrl_escape_without_shift_is_unmodified() {
        let bytes = translate_virtual_key(
            VirtualKey::Escape,
            Modifiers {
                ctrl: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(bytes, b"\x1b[P");
    }

    #[test]
    fn plain_alt_has_no_modifier_code() {
        let modifiers = Modifiers {
            alt: true,
            ..Default::default()
        };
        assert_eq!(modifiers.code(), None);
    }

    #[test]
    fn function_key_table_matches_xterm_defaults() {
        for (key, expected_param) in [
            (VirtualKey::F5, 15),
            (VirtualKey::F6, 17),
            (VirtualKey::F7, 18),
            (VirtualKey::F8, 19),
            (VirtualKey::F9, 20),
            (VirtualKey::F10, 21),
            (VirtualKey::F11, 23),
            (VirtualKey::F12, 24),
        ] {
            let bytes = translate_virtual_key(key, Modifiers::default()).unwrap();
            assert_eq!(bytes, format!("\x1b[{expected_param}~").into_bytes());
        }
    }
}
