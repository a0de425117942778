// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

mod commands;
mod output;
mod progress;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use commands::*;
use mems_config::ConfigLoader;
use mems_observability::{init_tracing_with_config, LogConfig, LogFormat};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mems")]
#[command(version, about = "Shrink photos and videos before they go into a mem")]
#[command(
    long_about = "mems compresses images and videos to a byte budget the way the upload client does:
images are re-encoded at decreasing quality and size, videos are transcoded to WebM and
fall back to a single still frame when nothing fits."
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file [default: ./mems.toml when present]
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Hide progress bars and logs
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Colored output
    #[arg(
        long,
        global = true,
        value_name = "WHEN",
        default_value = "auto",
        value_parser = ["always", "auto", "never"]
    )]
    color: String,

    /// Log format (pretty, compact, json) instead of the configured one
    #[arg(long, global = true, value_name = "FORMAT")]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress one image or video
    Compress(CompressCmd),

    /// Compress several files concurrently
    Batch(BatchCmd),

    /// Estimate compressed sizes without compressing
    Estimate(EstimateCmd),

    /// Check the video transcoder and measure a video
    Probe(ProbeCmd),

    /// Inspect or create configuration
    #[command(subcommand)]
    Config(ConfigCmd),

    /// Show version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.color.as_str() {
        "never" => console::set_colors_enabled(false),
        "always" => console::set_colors_enabled(true),
        _ => {}
    }

    if let Err(e) = run(cli).await {
        output::error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let command = match cli.command {
        Commands::Version => {
            print_version();
            return Ok(());
        }
        Commands::Completions { shell } => {
            generate_completions(shell);
            return Ok(());
        }
        command => command,
    };

    let cwd = std::env::current_dir().context("Failed to resolve the working directory")?;
    let config = ConfigLoader::new()
        .discover(cli.config.as_deref(), &cwd)
        .await
        .context("Failed to load configuration")?;

    if !cli.quiet {
        let format = match cli.log_format {
            Some(format) => format,
            None => config.observability.log_format.parse()?,
        };
        let mut log = LogConfig::new()
            .with_format(format)
            .with_color(console::colors_enabled_stderr())
            .with_targets(cli.verbose);
        log.level = if cli.verbose {
            Some("debug".to_string())
        } else if std::env::var_os("RUST_LOG").is_some() {
            None
        } else {
            Some(config.observability.log_level.clone())
        };
        // a subscriber may already be installed when embedded
        init_tracing_with_config(log).ok();
    }

    let ctx = AppContext {
        config,
        quiet: cli.quiet,
    };
    match command {
        Commands::Compress(cmd) => cmd.execute(&ctx).await,
        Commands::Batch(cmd) => cmd.execute(&ctx).await,
        Commands::Estimate(cmd) => cmd.execute(&ctx).await,
        Commands::Probe(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
        Commands::Version | Commands::Completions { .. } => Ok(()),
    }
}

fn print_version() {
    println!("mems {}", env!("CARGO_PKG_VERSION"));
    println!("rust-version: {}", env!("CARGO_PKG_RUST_VERSION"));
    println!("license: {}", env!("CARGO_PKG_LICENSE"));
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "mems", &mut io::stdout());
}
