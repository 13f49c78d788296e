//! Sitesweep command-line front end: argument handling, configuration and subcommands.

pub mod cli;
pub mod config;
