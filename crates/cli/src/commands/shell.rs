//! `pacmon shell`: Interactive query session.
//!
//! Every query in a session goes through the same pipeline, so repeated
//! (year, action, detail) slices are served from the cache.

use pacmon::render;
use pacmon::shell::{self, ShellCommand, HELP};
use pacmon::Session;
use pacmon_core::{PipelineError, Selection};
use std::io::Write;
use std::path::Path;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing::debug;

use super::load_config;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let session = Session::from_config(config)?;

    let mut year = session.config().years.default;
    let mut selection = Selection::SelectAll;

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        pacmon — Interactive Query Shell      ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", session.config().provider.kind);
    println!("  Years:     {}-{}", session.config().years.min, session.config().years.max);
    println!("  Actions:   {} registered", session.pipeline().registry().len());
    println!();
    println!("  Type 'help' for commands, 'exit' or Ctrl+D to quit.");
    println!();

    let mut lines = BufReader::new(io::stdin()).lines();

    loop {
        print!("  pacmon [{year}] > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match shell::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                debug!(line = %line, error = %e, "Rejected shell input");
                eprintln!("  [Error] {e}");
                continue;
            }
        };

        match command {
            ShellCommand::Empty => {}
            ShellCommand::Exit => break,
            ShellCommand::Help => println!("{HELP}"),
            ShellCommand::Year(y) => match session.pipeline().check_year(y) {
                Ok(_) => year = y,
                Err(e) => eprintln!("  [Error] {e}"),
            },
            ShellCommand::Select(s) => selection = s,
            ShellCommand::Programs => {
                for option in session.pipeline().registry().display_options() {
                    println!("  {option}");
                }
            }
            ShellCommand::Stats => {
                let stats = session.pipeline().cache().stats();
                println!(
                    "  Cache: {} entr{}, {} hit(s), {} miss(es)",
                    stats.entries,
                    if stats.entries == 1 { "y" } else { "ies" },
                    stats.hits,
                    stats.misses
                );
            }
            ShellCommand::Invalidate(y) => {
                let target = y.unwrap_or(year);
                match session.pipeline().check_year(target) {
                    Ok(fiscal_year) => {
                        let removed = session.pipeline().cache().invalidate_year(fiscal_year);
                        println!("  Forgot {removed} cached slice(s) for {fiscal_year}");
                    }
                    Err(e) => eprintln!("  [Error] {e}"),
                }
            }
            ShellCommand::Clear => {
                session.pipeline().cache().clear();
                println!("  Cache cleared");
            }
            ShellCommand::Query {
                year: query_year,
                selection: query_selection,
                detail,
            } => {
                let query_year = query_year.unwrap_or(year);
                let query_selection = query_selection.unwrap_or_else(|| selection.clone());
                match session.query(query_year, &query_selection, detail, true).await {
                    Ok(report) => {
                        println!();
                        print!("{}", render::report(&report, session.pipeline().registry(), false));
                        println!();
                    }
                    Err(PipelineError::EmptySelection) => {
                        eprintln!("  ⚠️  Nothing selected; use 'select all' or 'select CODE...'");
                    }
                    Err(e) => eprintln!("  [Error] {e}"),
                }
            }
        }
    }

    println!();
    println!("  Goodbye! 👋");
    println!();
    Ok(())
}
