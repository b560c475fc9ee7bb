//! Stdout helpers shared by the subcommands.
//!
//! Results always go to stdout as JSON; logs and diagnostics go to stderr.

use serde::Serialize;

/// Whether `--quiet` was given.
pub fn is_quiet() -> bool {
    std::env::var("PRICESCOUT_QUIET").is_ok()
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("  Error: failed to serialize output: {e}"),
    }
}
