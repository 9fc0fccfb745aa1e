//! `pacmon query`: Fetch, consolidate and summarize one fiscal year.

use pacmon::{export, render, selection_from_args, Session};
use pacmon_core::{DetailLevel, PipelineError};
use std::path::{Path, PathBuf};
use tracing::info;

use super::load_config;
use crate::OutputFormat;

pub struct QueryOptions {
    pub year: Option<i32>,
    pub programs: Vec<String>,
    pub all: bool,
    pub detail: Option<DetailLevel>,
    pub format: OutputFormat,
    pub csv: Option<PathBuf>,
    pub rows: bool,
}

pub async fn run(config_path: Option<&Path>, options: QueryOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let year = options.year.unwrap_or(config.years.default);
    let selection = selection_from_args(&options.programs, options.all);
    let session = Session::from_config(config)?;

    let progress = options.format == OutputFormat::Table;
    let report = match session.query(year, &selection, options.detail, progress).await {
        Ok(report) => report,
        Err(PipelineError::EmptySelection) => {
            eprintln!("  ⚠️  Select one or more actions (--program CODE, or --all) and query again.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    match options.format {
        OutputFormat::Table => {
            println!();
            print!("{}", render::report(&report, session.pipeline().registry(), options.rows));
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&export::report_json(&report))?);
        }
    }

    if let Some(path) = options.csv {
        let file = std::fs::File::create(&path)?;
        export::write_csv(&report.dataset.rows, std::io::BufWriter::new(file))?;
        info!(path = %path.display(), rows = report.dataset.len(), "CSV export written");
        eprintln!("  ✅ Wrote {} row(s) to {}", report.dataset.len(), path.display());
    }

    Ok(())
}
