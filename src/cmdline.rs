//! Command-tail parsing: extracting the child's command line out of this
//! program's own `GetCommandLineW`-style command line, plus the launcher's
//! own ambient flags (§4.5 step 7, §6).
//!
//! Pure and portable — operates on `&str`, no Win32 calls, so it is fully
//! unit-testable without a console.

/// Skip the program token (argv[0]) and any whitespace following it,
/// returning what remains of `command_line`.
///
/// Mirrors the original program's quote-aware scan: a leading `"` starts a
/// quoted token that ends at the next `"` or end of string (an unterminated
/// quote is tolerated — end-of-string closes it), otherwise the token ends
/// at the first byte `<= 0x20`. Bytes `<= 0x20` are then skipped as
/// whitespace/control separators, matching the C comparison `0x20 >= *p`.
pub fn skip_program_token(command_line: &str) -> &str {
    let bytes = command_line.as_bytes();
    let mut i = 0;

    if bytes.first() == Some(&b'"') {
        i += 1;
        while i < bytes.len() && bytes[i] != b'"' {
            i += 1;
        }
        if i < bytes.len() && bytes[i] == b'"' {
            i += 1;
        }
    } else {
        while i < bytes.len() && bytes[i] > 0x20 {
            i += 1;
        }
    }

    while i < bytes.len() && bytes[i] <= 0x20 {
        i += 1;
    }

    &command_line[i..]
}

/// The launcher's own leading flags (§6), consumed before the child's
/// command line begins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LauncherFlags {
    pub verbose: bool,
    pub show_version: bool,
    pub show_help: bool,
}

fn take_token(s: &str) -> (&str, &str) {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() && bytes[i] > 0x20 {
        i += 1;
    }
    let token = &s[..i];
    let mut j = i;
    while j < bytes.len() && bytes[j] <= 0x20 {
        j += 1;
    }
    (token, &s[j..])
}

/// Parse the launcher's own flags off the front of `tail` (already past the
/// program token), returning the flags seen and whatever remains as the
/// child's command line, unmodified.
///
/// Parsing stops at the first token that is not a recognized flag, or after
/// consuming a bare `--`, which ends flag parsing without being part of the
/// child's command line.
pub fn parse_launcher_flags(mut tail: &str) -> (LauncherFlags, &str) {
    let mut flags = LauncherFlags::default();

    loop {
        let (token, rest) = take_token(tail);
        match token {
            "--verbose" | "-v" => flags.verbose = true,
            "--version" => flags.show_version = true,
            "--help" | "-h" => flags.show_help = true,
            "--" => {
                tail = rest;
                break;
            }
            _ => break,
        }
        tail = rest;
    }

    (flags, tail)
}

/// §4.5 step 7's fallback: if the child command line is empty, use the
/// caller-supplied `COMSPEC` value instead.
pub fn resolve_command<'a>(tail: &'a str, comspec: Option<&'a str>) -> Option<&'a str> {
    if !tail.is_empty() {
        Some(tail)
    } else {
        comspec.filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unquoted_program_token() {
        assert_eq!(skip_program_token("prog.exe arg1 arg2"), "arg1 arg2");
    }

    #[test]
    fn quoted_program_token() {
        assert_eq!(
            skip_program_token("\"C:\\Program Files\\prog.exe\" arg1"),
            "arg1"
        );
    }

    #[test]
    fn unterminated_quote_is_tolerated() {
        assert_eq!(skip_program_token("\"unterminated"), "");
    }

    #[test]
    fn collapses_multiple_separators() {
        assert_eq!(skip_program_token("prog.exe    \t  arg"), "arg");
    }

    #[test]
    fn no_tail_returns_empty() {
        assert_eq!(skip_program_token("prog.exe"), "");
    }

    #[test]
    fn flags_are_consumed_in_order() {
        let (flags, tail) = parse_launcher_flags("-v cmd /c dir");
        assert!(flags.verbose);
        assert_eq!(tail, "cmd /c dir");
    }

    #[test]
    fn double_dash_ends_flag_parsing() {
        let (flags, tail) = parse_launcher_flags("--verbose -- -v not-a-flag");
        assert!(flags.verbose);
        assert_eq!(tail, "-v not-a-flag");
    }

    #[test]
    fn version_and_help_do_not_consume_the_tail() {
        let (flags, tail) = parse_launcher_flags("--version");
        assert!(flags.show_version);
        assert_eq!(tail, "");
    }

    #[test]
    fn non_flag_token_stops_parsing_immediately() {
        let (flags, tail) = parse_launcher_flags("cmd.exe --verbose");
        assert_eq!(flags, LauncherFlags::default());
        assert_eq!(tail, "cmd.exe --verbose");
    }

    #[test]
    fn empty_tail_falls_back_to_comspec() {
        assert_eq!(resolve_command("", Some("C:\\Windows\\System32\\cmd.exe")), Some("C:\\Windows\\System32\\cmd.exe"));
    }

    #[test]
    fn non_empty_tail_wins_over_comspec() {
        assert_eq!(resolve_command("cmd.exe", Some("fallback")), Some("cmd.exe"));
    }

    #[test]
    fn no_tail_and_no_comspec_is_none() {
        assert_eq!(resolve_command("", None), None);
    }
}
