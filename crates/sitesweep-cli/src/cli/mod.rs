//! CLI subcommand implementations for the sitesweep binary.

pub mod doctor;
pub mod output;
pub mod plugins_cmd;
pub mod run_cmd;
pub mod validate_cmd;
