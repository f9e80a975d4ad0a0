//! Binary entry point: logging setup (§9.1) and hand-off to the lifecycle
//! manager. Everything else — flag parsing, the PTY, the relay threads — is
//! library code in `lib.rs`'s modules, reached here the same way the
//! reference codebase's `main.rs` calls straight into its library crate.

#[cfg(windows)]
fn main() {
    let raw_command_line = windows_command_line();
    let tail = pty_tee::cmdline::skip_program_token(&raw_command_line);
    let (flags, _) = pty_tee::cmdline::parse_launcher_flags(tail);

    init_logging(flags.verbose);

    let exit_code = pty_tee::lifecycle::run(&raw_command_line);
    std::process::exit(exit_code);
}

#[cfg(not(windows))]
fn main() {
    eprintln!("pty-tee: requires a Windows host with ConPTY support; nothing to run here");
    std::process::exit(1);
}

#[cfg(windows)]
fn windows_command_line() -> String {
    use windows_sys::Win32::System::Environment::GetCommandLineW;
    unsafe {
        let ptr = GetCommandLineW();
        let mut len = 0isize;
        while *ptr.offset(len) != 0 {
            len += 1;
        }
        let slice = std::slice::from_raw_parts(ptr, len as usize);
        String::from_utf16_lossy(slice)
    }
}

/// §9.1: default filter `warn`, raised to `debug` by `-v`/`--verbose`;
/// `RUST_LOG` overrides the default via `env_logger::Env`, and `PTY_TEE_LOG`
/// is applied on top of that so it wins over both.
#[cfg(windows)]
fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let env = env_logger::Env::default().default_filter_or(default_filter);
    let mut builder = env_logger::Builder::from_env(env);
    if let Ok(override_filter) = std::env::var("PTY_TEE_LOG") {
        builder.parse_filters(&override_filter);
    }
    let _ = builder.try_init();
}
