//! Sitesweep — entry point.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use sitesweep::Overrides;
use sitesweep_cli::cli;
use sitesweep_cli::cli::output::{print_json, OutputMode};
use sitesweep_cli::cli::run_cmd::RunArgs;
use sitesweep_cli::config::{init_logging, LogFormat, LoggingConfig};

#[derive(Parser)]
#[command(
    name = "sitesweep",
    about = "Sitesweep — collect business listings from JavaScript-rendered directories into CSV",
    version,
    after_help = "Run 'sitesweep <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log line format on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Also append logs to <DIR>/sitesweep.log
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect listings for a query from one site into a CSV file
    Run {
        /// Registered site id (see `sitesweep plugins`)
        #[arg(long)]
        site: String,
        /// Search text, e.g. "coffee shops"
        #[arg(long)]
        query: String,
        /// CSV destination (default: static/<query>_<site>_<DDMMYY>.csv)
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Maximum number of records to write. Zero or negative writes none.
        #[arg(long, allow_negative_numbers = true)]
        limit: Option<i64>,
        /// Pause after each scroll, in milliseconds
        #[arg(long)]
        scroll_delay_ms: Option<u64>,
        /// Maximum number of scroll rounds
        #[arg(long)]
        max_scrolls: Option<u32>,
        /// Page load timeout, in milliseconds
        #[arg(long)]
        nav_timeout_ms: Option<u64>,
        /// How long to wait for the results container, in milliseconds
        #[arg(long)]
        results_timeout_ms: Option<u64>,
        /// Show the browser window
        #[arg(long)]
        headful: bool,
    },
    /// List registered sites and their fields
    Plugins,
    /// Validate every built-in plugin with an offline dry run
    Validate,
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    ///
    /// Examples:
    ///   sitesweep completions bash > ~/.local/share/bash-completion/completions/sitesweep
    ///   sitesweep completions zsh > ~/.zfunc/_sitesweep
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mode = OutputMode {
        json: cli.json,
        quiet: cli.quiet,
    };

    let log_guard = init_logging(&LoggingConfig {
        level: cli.log_level.clone(),
        format: cli.log_format,
        dir: cli.log_dir.clone(),
    })?;

    let result = match cli.command {
        Commands::Run {
            site,
            query,
            output,
            limit,
            scroll_delay_ms,
            max_scrolls,
            nav_timeout_ms,
            results_timeout_ms,
            headful,
        } => {
            let overrides = Overrides {
                scroll_delay: scroll_delay_ms.map(Duration::from_millis),
                max_rounds: max_scrolls,
                navigation_timeout: nav_timeout_ms.map(Duration::from_millis),
                results_timeout: results_timeout_ms.map(Duration::from_millis),
            };
            let args = RunArgs {
                site,
                query,
                output,
                limit,
                overrides,
                headful,
            };
            cli::run_cmd::run(args, mode).await
        }
        Commands::Plugins => cli::plugins_cmd::run(mode),
        Commands::Validate => cli::validate_cmd::run(mode).await,
        Commands::Doctor => cli::doctor::run(mode).await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "sitesweep", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if mode.json {
            print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        } else {
            eprintln!("Error: {e:#}");
        }
        drop(log_guard);
        std::process::exit(1);
    }

    result
}
