//! Output conventions shared by every subcommand.
//!
//! Stdout carries results only (the `FOUND_COUNT` line, JSON, listings).
//! Human-facing notes go to stderr and are dropped by `--quiet`.

use std::io::Write;

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputMode {
    pub json: bool,
    pub quiet: bool,
}

impl OutputMode {
    /// A stderr note for humans; silent with `--quiet` or `--json`.
    pub fn note(&self, message: impl AsRef<str>) {
        if !self.quiet && !self.json {
            eprintln!("{}", message.as_ref());
        }
    }
}

/// Write `value` as a single JSON line.
pub fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> std::io::Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)
}

/// Print `value` as one JSON line on stdout.
pub fn print_json<T: Serialize>(value: &T) {
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    if let Err(e) = write_json(&mut lock, value) {
        eprintln!("failed to write JSON output: {e}");
    }
}
