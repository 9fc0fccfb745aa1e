//! SPARQL query construction and result parsing for the SIOP endpoint.
//!
//! The endpoint publishes the federal budget law (LOA) as linked data.
//! One query returns the execution figures of a single action in a single
//! fiscal year, grouped by whichever dimensions were requested.

use pacmon_core::error::ProviderError;
use pacmon_core::{Category, Dimension, ExpenditureQuery, ExpenditureRecord};
use serde::Deserialize;
use std::collections::HashMap;

/// Media type of SPARQL 1.1 JSON results.
pub const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

const PREFIXES: &str = "PREFIX loa: <http://vocab.e.gov.br/2013/09/loa#>\n\
                        PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>\n";

/// (result column, LOA predicate) for each monetary attribute.
const AMOUNTS: [(&str, &str); 4] = [
    ("loa_mais_credito", "loa:valorLeiMaisCredito"),
    ("empenhado", "loa:valorEmpenhado"),
    ("liquidado", "loa:valorLiquidado"),
    ("pago", "loa:valorPago"),
];

/// Result-column prefix and LOA predicate linking an item to a dimension.
fn dimension_terms(dimension: Dimension) -> (&'static str, &'static str) {
    match dimension {
        Dimension::Nature => ("gnd", "loa:temGND"),
        Dimension::Source => ("fonte", "loa:temFonteRecursos"),
        Dimension::Unit => ("uo", "loa:temUnidadeOrcamentaria"),
    }
}

/// Escape a value for use inside a double-quoted SPARQL string literal.
fn escape_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Build the aggregate SELECT for one provider request.
pub fn build_query(query: &ExpenditureQuery) -> String {
    let mut keys = vec!["?acao_cod".to_string()];
    let mut patterns = format!(
        "  ?item loa:temExercicio ?exercicio .\n\
         \x20 ?exercicio loa:identificador {year} .\n\
         \x20 ?item loa:temAcao ?acao .\n\
         \x20 ?acao loa:codigo ?acao_cod .\n\
         \x20 FILTER (STR(?acao_cod) = \"{code}\")\n",
        year = query.year.value(),
        code = escape_literal(query.program.as_str()),
    );

    if query.include_descriptions {
        keys.push("?acao_desc".into());
        patterns.push_str("  ?acao rdfs:label ?acao_desc .\n");
    }

    for dimension in query.detail.dimensions() {
        let (column, predicate) = dimension_terms(dimension);
        keys.push(format!("?{column}_cod"));
        patterns.push_str(&format!(
            "  ?item {predicate} ?{column} .\n  ?{column} loa:codigo ?{column}_cod .\n"
        ));
        if query.include_descriptions {
            keys.push(format!("?{column}_desc"));
            patterns.push_str(&format!("  ?{column} rdfs:label ?{column}_desc .\n"));
        }
    }

    let mut sums = Vec::with_capacity(AMOUNTS.len());
    for (column, predicate) in AMOUNTS {
        patterns.push_str(&format!("  ?item {predicate} ?v_{column} .\n"));
        sums.push(format!("(SUM(?v_{column}) AS ?{column})"));
    }

    let keys = keys.join(" ");
    format!(
        "{PREFIXES}SELECT {keys} {sums}\nWHERE {{\n{patterns}}}\nGROUP BY {keys}\nORDER BY {keys}\n",
        sums = sums.join(" "),
    )
}

// --- SPARQL JSON results format ---

#[derive(Debug, Deserialize)]
pub struct SparqlResults {
    pub results: SparqlBindings,
}

#[derive(Debug, Deserialize)]
pub struct SparqlBindings {
    #[serde(default)]
    pub bindings: Vec<HashMap<String, SparqlTerm>>,
}

/// A bound RDF term; only its lexical value matters here.
#[derive(Debug, Deserialize)]
pub struct SparqlTerm {
    pub value: String,
}

type Binding = HashMap<String, SparqlTerm>;

fn text(binding: &Binding, column: &str) -> Option<String> {
    binding.get(column).map(|term| term.value.trim().to_string())
}

fn amount(binding: &Binding, column: &str) -> Result<f64, ProviderError> {
    match binding.get(column) {
        // SUM over no values binds nothing on some stores
        None => Ok(0.0),
        Some(term) => term.value.trim().parse::<f64>().map_err(|_| {
            ProviderError::MalformedResponse(format!(
                "column '{column}' is not numeric: '{}'",
                term.value
            ))
        }),
    }
}

/// Turn result bindings into records for the request that produced them.
pub fn parse_records(
    results: SparqlResults,
    query: &ExpenditureQuery,
) -> Result<Vec<ExpenditureRecord>, ProviderError> {
    let dimensions = query.detail.dimensions();
    let mut records = Vec::with_capacity(results.results.bindings.len());

    for binding in &results.results.bindings {
        let program = text(binding, "acao_cod").unwrap_or_else(|| query.program.to_string());
        let mut record = ExpenditureRecord::new(query.year, program);
        record.program_description = text(binding, "acao_desc");

        for dimension in &dimensions {
            let (column, _) = dimension_terms(*dimension);
            let code = text(binding, &format!("{column}_cod")).ok_or_else(|| {
                ProviderError::MalformedResponse(format!(
                    "row without '{column}_cod' although the {dimension} breakdown was requested"
                ))
            })?;
            let description = text(binding, &format!("{column}_desc")).unwrap_or_default();
            record = record.with_category(*dimension, Category::new(code, description));
        }

        record = record.with_amounts(
            amount(binding, "loa_mais_credito")?,
            amount(binding, "empenhado")?,
            amount(binding, "liquidado")?,
            amount(binding, "pago")?,
        );
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacmon_core::{DetailLevel, ProgramCode, YearRange};

    fn query(detail: DetailLevel) -> ExpenditureQuery {
        let year = YearRange::default().check(2024).unwrap();
        ExpenditureQuery::new(year, ProgramCode::new("14T7"), detail)
    }

    #[test]
    fn program_total_query_has_no_dimension_patterns() {
        let sparql = build_query(&query(DetailLevel::NONE));
        assert!(sparql.contains("loa:identificador 2024"));
        assert!(sparql.contains("FILTER (STR(?acao_cod) = \"14T7\")"));
        assert!(sparql.contains("(SUM(?v_empenhado) AS ?empenhado)"));
        assert!(sparql.contains("(SUM(?v_loa_mais_credito) AS ?loa_mais_credito)"));
        assert!(!sparql.contains("loa:temGND"));
        assert!(!sparql.contains("loa:temFonteRecursos"));
        assert!(sparql.contains("GROUP BY ?acao_cod ?acao_desc"));
    }

    #[test]
    fn detailed_query_groups_by_each_dimension() {
        let sparql = build_query(&query(DetailLevel::FULL));
        for needle in [
            "?item loa:temGND ?gnd",
            "?item loa:temFonteRecursos ?fonte",
            "?item loa:temUnidadeOrcamentaria ?uo",
            "?uo rdfs:label ?uo_desc",
        ] {
            assert!(sparql.contains(needle), "missing {needle}");
        }
        assert!(sparql.contains(
            "GROUP BY ?acao_cod ?acao_desc ?gnd_cod ?gnd_desc ?fonte_cod ?fonte_desc ?uo_cod ?uo_desc"
        ));
    }

    #[test]
    fn descriptions_can_be_omitted() {
        let sparql = build_query(&query(DetailLevel::FULL).without_descriptions());
        assert!(!sparql.contains("rdfs:label"));
        assert!(sparql.contains("GROUP BY ?acao_cod ?gnd_cod ?fonte_cod ?uo_cod"));
    }

    #[test]
    fn program_code_is_escaped() {
        let year = YearRange::default().check(2024).unwrap();
        let hostile = ExpenditureQuery::new(year, ProgramCode::new("x\") || true || (\""), DetailLevel::NONE);
        let sparql = build_query(&hostile);
        assert!(sparql.contains(r#"= "x\") || true || (\"")"#));
    }

    #[test]
    fn parse_detailed_bindings() {
        let body = r#"{
            "head": {"vars": ["acao_cod", "gnd_cod", "gnd_desc", "empenhado"]},
            "results": {"bindings": [
                {
                    "acao_cod": {"type": "literal", "value": "14T7"},
                    "acao_desc": {"type": "literal", "value": "Tecnologia Nuclear da Marinha"},
                    "gnd_cod": {"type": "literal", "value": "4"},
                    "gnd_desc": {"type": "literal", "value": "INVESTIMENTOS"},
                    "loa_mais_credito": {"type": "literal", "datatype": "http://www.w3.org/2001/XMLSchema#decimal", "value": "1500.50"},
                    "empenhado": {"type": "literal", "value": "1000"},
                    "liquidado": {"type": "literal", "value": "800.25"},
                    "pago": {"type": "literal", "value": "700"}
                }
            ]}
        }"#;
        let results: SparqlResults = serde_json::from_str(body).unwrap();
        let records =
            parse_records(results, &query(DetailLevel::NONE.with(Dimension::Nature))).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.program.as_str(), "14T7");
        assert_eq!(record.program_description.as_deref(), Some("Tecnologia Nuclear da Marinha"));
        assert_eq!(record.nature, Some(Category::new("4", "INVESTIMENTOS")));
        assert_eq!(record.updated_appropriation, 1500.50);
        assert_eq!(record.committed, 1000.0);
        assert_eq!(record.settled, 800.25);
        assert_eq!(record.paid, 700.0);
        assert!(record.source.is_none());
    }

    #[test]
    fn empty_bindings_yield_no_rows() {
        let results: SparqlResults =
            serde_json::from_str(r#"{"head": {"vars": []}, "results": {"bindings": []}}"#).unwrap();
        assert!(parse_records(results, &query(DetailLevel::FULL)).unwrap().is_empty());
    }

    #[test]
    fn missing_requested_dimension_is_malformed() {
        let body = r#"{"results": {"bindings": [
            {"acao_cod": {"type": "literal", "value": "14T7"}, "empenhado": {"type": "literal", "value": "1"}}
        ]}}"#;
        let results: SparqlResults = serde_json::from_str(body).unwrap();
        let err = parse_records(results, &query(DetailLevel::NONE.with(Dimension::Unit))).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(msg) if msg.contains("uo_cod")));
    }

    #[test]
    fn non_numeric_amount_is_malformed() {
        let body = r#"{"results": {"bindings": [
            {"acao_cod": {"type": "literal", "value": "14T7"}, "pago": {"type": "literal", "value": "n/a"}}
        ]}}"#;
        let results: SparqlResults = serde_json::from_str(body).unwrap();
        let err = parse_records(results, &query(DetailLevel::NONE)).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[test]
    fn absent_amount_counts_as_zero() {
        let body = r#"{"results": {"bindings": [
            {"acao_cod": {"type": "literal", "value": "123G"}, "empenhado": {"type": "literal", "value": "50"}}
        ]}}"#;
        let results: SparqlResults = serde_json::from_str(body).unwrap();
        let records = parse_records(results, &query(DetailLevel::NONE)).unwrap();
        assert_eq!(records[0].committed, 50.0);
        assert_eq!(records[0].paid, 0.0);
        assert_eq!(records[0].program.as_str(), "123G");
    }
}
