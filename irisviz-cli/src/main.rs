//! irisviz CLI: fits the Iris classifier lineup and exports grid fields.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// irisviz: classifier decision fields over the Iris dataset
#[derive(Parser, Debug)]
#[command(name = "irisviz", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (holds `.irisviz/config.toml`)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run visualization tasks and export their fields as JSON
    Run {
        /// Task id (task1, task2, task3, task4_boundary, task4_probability) or "all"
        #[arg(short, long, default_value = "all")]
        task: String,
        /// Output directory (defaults to `output.dir` from config)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Grid resolution applied to every selected task
        #[arg(short, long)]
        resolution: Option<usize>,
        /// Pretty-print the exported JSON
        #[arg(long)]
        pretty: bool,
    },
    /// List the available tasks
    List,
    /// Fit every pipeline and print its training accuracy
    Evaluate {
        /// Feature dimensionality (2 or 3)
        #[arg(short, long, default_value = "2")]
        dims: usize,
        /// Drop the third class before fitting
        #[arg(short, long)]
        binary: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create a default workspace configuration file
    Init,
    /// Show the effective configuration
    Show,
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)));

    // JSON file layer for structured logging
    let log_dir = irisviz_ml::config::log_dir().unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "irisviz.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    commands::handle_command(cli.command, &workspace)
}
