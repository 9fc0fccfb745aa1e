//! pacmon CLI: the main entry point.
//!
//! Commands:
//! - `query`: Fetch, consolidate and summarize one year of execution
//! - `programs`: List the registered budget actions
//! - `shell`: Interactive session sharing one cache across queries
//! - `config`: Show, locate or validate configuration
//! - `init`: Write the default configuration file
//! - `doctor`: Check configuration and provider reachability

use clap::{Parser, Subcommand, ValueEnum};
use pacmon_core::DetailLevel;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "pacmon",
    about = "pacmon — budget execution monitor for strategic investment actions",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of ~/.pacmon/config.toml
    #[arg(short, long, global = true, env = "PACMON_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Query budget execution for one fiscal year
    Query {
        /// Fiscal year (defaults to years.default)
        year: Option<i32>,

        /// Action code or "code - description" option (repeatable)
        #[arg(short, long = "program")]
        programs: Vec<String>,

        /// Query every registered action
        #[arg(short, long)]
        all: bool,

        /// Breakdowns to request, e.g. "nature,unit" or "none"
        #[arg(short, long, value_parser = pacmon::shell::parse_detail)]
        detail: Option<DetailLevel>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Also write the consolidated rows to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Print the consolidated rows
        #[arg(long)]
        rows: bool,
    },

    /// List registered budget actions
    Programs,

    /// Start an interactive query shell
    Shell,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Diagnose configuration and provider health
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Validate the configuration
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Query {
            year,
            programs,
            all,
            detail,
            format,
            csv,
            rows,
        } => {
            let options = commands::query::QueryOptions {
                year,
                programs,
                all,
                detail,
                format,
                csv,
                rows,
            };
            commands::query::run(config_path, options).await?
        }
        Commands::Programs => commands::programs::run(config_path).await?,
        Commands::Shell => commands::shell::run(config_path).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(config_path).await?,
            ConfigAction::Path => commands::config_cmd::path(config_path).await?,
            ConfigAction::Validate => commands::config_cmd::validate(config_path).await?,
        },
        Commands::Init { force } => commands::init::run(config_path, force).await?,
        Commands::Doctor => commands::doctor::run(config_path).await?,
    }

    Ok(())
}
