//! Environment readiness check.

use std::path::Path;

use anyhow::Result;
use serde_json::json;

use crate::cli::output::{print_json, OutputMode};
use crate::config::DEFAULT_OUTPUT_DIR;

/// Check Chromium availability and whether the output directory is writable.
pub async fn run(mode: OutputMode) -> Result<()> {
    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;
    let chromium = chromium_path();
    let output_dir = Path::new(DEFAULT_OUTPUT_DIR);
    let writable = is_writable(output_dir);
    let ready = chromium.is_some() && writable;

    if mode.json {
        print_json(&json!({
            "os": os,
            "arch": arch,
            "chromium": chromium,
            "output_dir": output_dir,
            "output_dir_writable": writable,
            "ready": ready,
        }));
        return Ok(());
    }

    println!("Sitesweep Doctor");
    println!("================");
    println!();
    println!("OS:   {os}");
    println!("Arch: {arch}");
    println!();

    match &chromium {
        Some(path) => println!("[OK] Chromium found: {path}"),
        None => println!(
            "[!!] Chromium NOT found. Install Chrome or set SITESWEEP_CHROMIUM_PATH."
        ),
    }

    if writable {
        println!("[OK] Output directory {} is writable", output_dir.display());
    } else {
        println!("[!!] Cannot write to output directory {}", output_dir.display());
    }

    println!();
    if ready {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }

    Ok(())
}

#[cfg(feature = "chromium")]
fn chromium_path() -> Option<String> {
    sitesweep::browser::chromium::find_chromium().map(|p| p.display().to_string())
}

#[cfg(not(feature = "chromium"))]
fn chromium_path() -> Option<String> {
    None
}

/// Create `dir` if needed and check it accepts a throwaway file.
fn is_writable(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    let scratch = dir.join(format!(".sitesweep-write-check-{}", std::process::id()));
    let ok = std::fs::write(&scratch, b"").is_ok();
    let _ = std::fs::remove_file(&scratch);
    ok
}
