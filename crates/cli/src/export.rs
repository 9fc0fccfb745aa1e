//! CSV and JSON export of batch results.

use pacmon_core::{Dimension, ExpenditureRecord};
use pacmon_pipeline::BatchReport;
use std::io::Write;

const CSV_HEADER: [&str; 13] = [
    "exercicio",
    "acao_cod",
    "acao_desc",
    "gnd_cod",
    "gnd_desc",
    "fonte_cod",
    "fonte_desc",
    "uo_cod",
    "uo_desc",
    "loa_mais_credito",
    "empenhado",
    "liquidado",
    "pago",
];

/// Write consolidated rows as CSV, using the provider's column names.
/// The header is written even when there are no rows.
pub fn write_csv<W: Write>(rows: &[ExpenditureRecord], writer: W) -> Result<(), csv::Error> {
    let mut csv_writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    csv_writer.write_record(CSV_HEADER)?;

    for row in rows {
        let category = |dimension: Dimension| {
            row.category(dimension)
                .map(|c| (c.code.clone(), c.description.clone()))
                .unwrap_or_default()
        };
        let (gnd_cod, gnd_desc) = category(Dimension::Nature);
        let (fonte_cod, fonte_desc) = category(Dimension::Source);
        let (uo_cod, uo_desc) = category(Dimension::Unit);

        csv_writer.write_record([
            row.year.to_string(),
            row.program.to_string(),
            row.program_description.clone().unwrap_or_default(),
            gnd_cod,
            gnd_desc,
            fonte_cod,
            fonte_desc,
            uo_cod,
            uo_desc,
            row.updated_appropriation.to_string(),
            row.committed.to_string(),
            row.settled.to_string(),
            row.paid.to_string(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Machine-readable view of a batch.
pub fn report_json(report: &BatchReport) -> serde_json::Value {
    let breakdowns: serde_json::Map<String, serde_json::Value> = report
        .breakdowns
        .iter()
        .map(|b| {
            let key = match b.dimension {
                Dimension::Nature => "nature",
                Dimension::Source => "source",
                Dimension::Unit => "unit",
            };
            let value = match &b.result {
                Ok(view) => serde_json::to_value(&view.rows).unwrap_or_default(),
                Err(e) => serde_json::json!({ "error": e.to_string() }),
            };
            (key.to_string(), value)
        })
        .collect();

    serde_json::json!({
        "year": report.year,
        "detail": report.detail,
        "programs": report.programs,
        "totals": report.totals,
        "ratios": report.ratios,
        "breakdowns": breakdowns,
        "failures": report.failures.iter().map(|f| f.to_string()).collect::<Vec<_>>(),
        "rows": report.dataset.rows,
    })
}
