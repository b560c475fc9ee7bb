// Copyright 2026 PriceScout Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use pricescout_runtime::cli;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pricescout",
    about = "PriceScout: competitor pricing-page discovery and plan extraction",
    version,
    after_help = "Run 'pricescout <command> --help' for details on each command."
)]
struct Cli {
    /// JSON configuration file (defaults to $PRICESCOUT_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find likely pricing pages for a website
    Discover {
        /// Website URL or bare domain (e.g. "acme.com")
        url: String,
    },
    /// Extract structured plans from a pricing page
    Extract {
        /// Pricing page URL
        url: String,
        /// Skip the browser pass even if a billing toggle is suspected
        #[arg(long)]
        no_browser: bool,
    },
    /// Serve the HTTP REST API
    Serve {
        /// Port to listen on (127.0.0.1 only)
        #[arg(long, default_value = "8080")]
        port: u16,
        /// SQLite plan store (defaults to ~/.pricescout/plans.db)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.quiet {
        std::env::set_var("PRICESCOUT_QUIET", "1");
    }
    cli::setup::init_tracing(cli.verbose, cli.json_logs);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Discover { url } => cli::discover_cmd::run(config, &url).await,
        Commands::Extract { url, no_browser } => {
            cli::extract_cmd::run(config, &url, no_browser).await
        }
        Commands::Serve { port, db } => cli::serve_cmd::run(config, port, db).await,
        Commands::Doctor => cli::doctor::run(config).await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "pricescout", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if !cli::output::is_quiet() {
            eprintln!("  Error: {e:#}");
        }
        std::process::exit(1);
    }

    result
}
