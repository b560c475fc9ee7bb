//! CLI subcommand implementations for the `pricescout` binary.

pub mod discover_cmd;
pub mod doctor;
pub mod extract_cmd;
pub mod output;
pub mod serve_cmd;
pub mod setup;
