//! `LauncherError`: the concrete shape of the five error kinds in §7 (§9.2).
//!
//! Kept as its own enum, rather than ad hoc `anyhow::anyhow!` strings, so the
//! lifecycle manager can match on *kind* to decide whether a child exit code
//! was ever obtained and what OS error code to propagate if not.

use std::fmt;

/// One of the five error kinds a run of this program can end in (§7).
#[derive(Debug)]
pub enum LauncherError {
    /// A precondition the lifecycle manager checks up front failed: stdin
    /// isn't a console, both or neither of stdout/stderr is a console, or a
    /// required console mode couldn't be set.
    Precondition { message: String, code: u32 },
    /// Allocating a pipe, event, the PTY itself, the process-thread
    /// attribute list, or a worker thread failed.
    ResourceCreation { resource: &'static str, code: u32 },
    /// `CreateProcess`-equivalent failed; no child exit code is available.
    ChildLaunch { code: u32 },
    /// Steady-state I/O failure inside one of the relay loops. Never
    /// escapes the loop it originates in (§7 kind 4/5) — this variant exists
    /// so the loops can use `?` locally without reaching for `anyhow`.
    Io(std::io::Error),
}

impl LauncherError {
    /// The OS-style exit code to use when no child exit code was ever
    /// obtained (§7 propagation rule).
    pub fn exit_code(&self) -> u32 {
        match self {
            LauncherError::Precondition { code, .. } => *code,
            LauncherError::ResourceCreation { code, .. } => *code,
            LauncherError::ChildLaunch { code } => *code,
            LauncherError::Io(err) => err.raw_os_error().map(|c| c as u32).unwrap_or(1),
        }
    }
}

impl fmt::Display for LauncherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LauncherError::Precondition { message, code } => {
                write!(f, "{message} (code {code})")
            }
            LauncherError::ResourceCreation { resource, code } => {
                write!(f, "failed to create {resource} (code {code})")
            }
            LauncherError::ChildLaunch { code } => {
                write!(f, "failed to launch child process (code {code})")
            }
            LauncherError::Io(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for LauncherError {}

impl From<std::io::Error> for LauncherError {
    fn from(err: std::io::Error) -> Self {
        LauncherError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_exit_code_round_trips() {
        let err = LauncherError::Precondition {
            message: "stdin is not a console".into(),
            code: 87,
        };
        assert_eq!(err.exit_code(), 87);
        assert!(err.to_string().contains("stdin is not a console"));
    }

    #[test]
    fn io_error_falls_back_to_one_without_an_os_code() {
        let err = LauncherError::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "x"));
        assert_eq!(err.exit_code(), 1);
    }
}
