//! Terminal rendering: box tables, pt-BR currency, execution bars.

use pacmon_core::{Dimension, ExpenditureRecord, PipelineEvent, ProgramRegistry};
use pacmon_pipeline::{AggregateView, BatchReport, Totals};
use std::fmt::Write as _;

/// Format an amount as Brazilian reais: `R$ 1.234.567,89`.
pub fn format_brl(value: f64) -> String {
    if !value.is_finite() {
        return "R$ -".into();
    }

    let cents = (value.abs() * 100.0).round() as u128;
    let (units, fraction) = (cents / 100, cents % 100);

    let digits = units.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}R$ {grouped},{fraction:02}")
}

/// `Some(0.4567)` → `45,7%`; `None` → `n/a`.
pub fn format_ratio(ratio: Option<f64>) -> String {
    match ratio {
        Some(r) if r.is_finite() => format!("{:.1}%", r * 100.0).replace('.', ","),
        _ => "n/a".into(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Draw a box table. `aligns` may be shorter than `headers`; missing
/// columns are left-aligned.
pub fn table(headers: &[&str], aligns: &[Align], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let rule = |left: &str, mid: &str, right: &str| {
        let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
        format!("  {left}{}{right}\n", segments.join(mid))
    };

    let line = |cells: &[String]| {
        let mut out = String::from("  │");
        for (i, width) in widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            let pad = width - cell.chars().count().min(*width);
            match aligns.get(i).copied().unwrap_or(Align::Left) {
                Align::Left => {
                    let _ = write!(out, " {cell}{} │", " ".repeat(pad));
                }
                Align::Right => {
                    let _ = write!(out, " {}{cell} │", " ".repeat(pad));
                }
            }
        }
        out.push('\n');
        out
    };

    let mut out = rule("┌", "┬", "┐");
    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    out.push_str(&line(&header_cells));
    out.push_str(&rule("├", "┼", "┤"));
    for row in rows {
        out.push_str(&line(row));
    }
    out.push_str(&rule("└", "┴", "┘"));
    out
}

/// The four execution stages with their share of the appropriation.
pub fn totals_table(totals: &Totals) -> String {
    let ratios = totals.ratios();
    let rows = vec![
        vec!["Updated appropriation".into(), format_brl(totals.updated_appropriation), "".into()],
        vec!["Committed".into(), format_brl(totals.committed), format_ratio(ratios.committed)],
        vec!["Settled".into(), format_brl(totals.settled), format_ratio(ratios.settled)],
        vec!["Paid".into(), format_brl(totals.paid), format_ratio(ratios.paid)],
    ];
    table(
        &["Stage", "Amount", "Executed"],
        &[Align::Left, Align::Right, Align::Right],
        &rows,
    )
}

/// Horizontal bars for the four stages, scaled to the largest one.
pub fn stage_bars(totals: &Totals, width: usize) -> String {
    let stages = [
        ("1. Updated appropriation", totals.updated_appropriation),
        ("2. Committed", totals.committed),
        ("3. Settled", totals.settled),
        ("4. Paid", totals.paid),
    ];
    let max = stages.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);

    let mut out = String::new();
    for (label, value) in stages {
        let len = if max > 0.0 {
            ((value.max(0.0) / max) * width as f64).round() as usize
        } else {
            0
        };
        let _ = writeln!(out, "  {label:<25} {}", "█".repeat(len));
    }
    out
}

pub fn breakdown_table(view: &AggregateView) -> String {
    let rows: Vec<Vec<String>> = view
        .rows
        .iter()
        .map(|r| vec![r.code.clone(), r.description.clone(), format_brl(r.amount)])
        .collect();
    table(
        &["Code", "Description", "Committed"],
        &[Align::Left, Align::Left, Align::Right],
        &rows,
    )
}

/// Consolidated rows, one line each.
pub fn rows_table(rows: &[ExpenditureRecord]) -> String {
    let category = |record: &ExpenditureRecord, dimension: Dimension| {
        record
            .category(dimension)
            .map(|c| c.code.clone())
            .unwrap_or_default()
    };
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.program.to_string(),
                category(r, Dimension::Nature),
                category(r, Dimension::Source),
                category(r, Dimension::Unit),
                format_brl(r.updated_appropriation),
                format_brl(r.committed),
                format_brl(r.settled),
                format_brl(r.paid),
            ]
        })
        .collect();
    table(
        &["Action", "GND", "Source", "Unit", "Appropriation", "Committed", "Settled", "Paid"],
        &[
            Align::Left,
            Align::Left,
            Align::Left,
            Align::Left,
            Align::Right,
            Align::Right,
            Align::Right,
            Align::Right,
        ],
        &body,
    )
}

/// Full human-readable report for one batch.
pub fn report(report: &BatchReport, registry: &ProgramRegistry, show_rows: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "📊 Consolidated results for {}", report.year);
    let _ = writeln!(out, "==================================");
    for code in &report.programs {
        let _ = writeln!(out, "  • {code} - {}", registry.describe(code));
    }
    out.push('\n');

    for failure in &report.failures {
        let _ = writeln!(out, "  ⚠️  {failure}");
    }
    if !report.failures.is_empty() {
        out.push('\n');
    }

    if !report.has_data() {
        let _ = writeln!(
            out,
            "  No data found for this combination of year and actions."
        );
        return out;
    }

    if report.year.is_open() {
        let _ = writeln!(
            out,
            "  ℹ️  {} is still open; figures may change during the session.\n",
            report.year
        );
    }

    let _ = writeln!(out, "  Total budget execution");
    out.push_str(&totals_table(&report.totals));
    out.push('\n');
    out.push_str(&stage_bars(&report.totals, 40));

    for breakdown in &report.breakdowns {
        out.push('\n');
        let _ = writeln!(out, "  Committed by {}", breakdown.dimension);
        match &breakdown.result {
            Ok(view) if view.is_empty() => {
                let _ = writeln!(out, "  (no committed amounts)");
            }
            Ok(view) => out.push_str(&breakdown_table(view)),
            Err(e) => {
                let _ = writeln!(out, "  (unavailable: {e})");
            }
        }
    }

    if show_rows {
        out.push('\n');
        let _ = writeln!(out, "  Detailed rows ({})", report.dataset.len());
        out.push_str(&rows_table(&report.dataset.rows));
    }

    out
}

/// One progress line for a pipeline event, or `None` for events that do
/// not need one.
pub fn progress_line(event: &PipelineEvent, registry: &ProgramRegistry) -> Option<String> {
    match event {
        PipelineEvent::FetchCompleted {
            code,
            rows,
            cached,
            completed,
            total,
            ..
        } => Some(format!(
            "  [{completed}/{total}] {} — {rows} row(s){}",
            registry.describe(code),
            if *cached { " (cached)" } else { "" }
        )),
        PipelineEvent::FetchFailed {
            code,
            completed,
            total,
            ..
        } => Some(format!("  [{completed}/{total}] {} — failed", registry.describe(code))),
        PipelineEvent::BatchFinished { duration_ms, .. } => {
            Some(format!("  Done in {duration_ms} ms; consolidating."))
        }
        PipelineEvent::BatchStarted { .. } => None,
    }
}
