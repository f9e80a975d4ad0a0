//! Property tests for the command-tail parser, in the teacher's
//! `proptest!` style (`crates/shell/tests/needs_shell.rs`).

use proptest::prelude::*;
use pty_tee::cmdline::{parse_launcher_flags, resolve_command, skip_program_token};

proptest! {
    #[test]
    fn skip_program_token_never_panics(input in "\\PC*") {
        let _ = skip_program_token(&input);
    }

    #[test]
    fn parse_launcher_flags_never_panics(input in "\\PC*") {
        let _ = parse_launcher_flags(&input);
    }

    #[test]
    fn skip_program_token_result_is_always_a_suffix(input in "\\PC*") {
        let tail = skip_program_token(&input);
        prop_assert!(input.ends_with(tail));
    }

    #[test]
    fn unquoted_program_followed_by_arg_leaves_exactly_the_arg(
        program in "[a-zA-Z][a-zA-Z0-9_.-]*",
        arg in "[a-zA-Z0-9_.-]+"
    ) {
        let command_line = format!("{program} {arg}");
        prop_assert_eq!(skip_program_token(&command_line), arg.as_str());
    }

    #[test]
    fn quoted_program_token_is_fully_consumed(
        program in "[a-zA-Z0-9_. \\\\:]+",
        arg in "[a-zA-Z0-9_.-]+"
    ) {
        let command_line = format!("\"{program}\" {arg}");
        prop_assert_eq!(skip_program_token(&command_line), arg.as_str());
    }

    #[test]
    fn recognized_flags_never_appear_in_the_returned_tail(
        verbose in any::<bool>(),
        cmd in "[a-zA-Z][a-zA-Z0-9_.-]*"
    ) {
        let command_line = if verbose { format!("-v -- {cmd}") } else { cmd.clone() };
        let (flags, tail) = parse_launcher_flags(&command_line);
        prop_assert_eq!(flags.verbose, verbose);
        prop_assert_eq!(tail, cmd.as_str());
    }

    #[test]
    fn resolve_command_prefers_a_non_empty_tail(
        tail in "[a-zA-Z0-9_.-]+",
        comspec in prop::option::of("[a-zA-Z0-9_.\\\\:-]+")
    ) {
        prop_assert_eq!(resolve_command(&tail, comspec.as_deref()), Some(tail.as_str()));
    }

    #[test]
    fn resolve_command_falls_back_to_comspec_when_tail_is_empty(
        comspec in "[a-zA-Z0-9_.\\\\:-]+"
    ) {
        prop_assert_eq!(resolve_command("", Some(comspec.as_str())), Some(comspec.as_str()));
    }
}
