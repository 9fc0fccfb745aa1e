//! `pacmon programs`: List registered budget actions.

use pacmon::render::{table, Align};
use std::path::Path;

use super::load_config;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let registry = config.registry();

    println!("🏗️  Registered budget actions");
    println!("============================");
    println!();

    let rows: Vec<Vec<String>> = registry
        .iter()
        .map(|entry| vec![entry.code.to_string(), entry.description.clone()])
        .collect();
    print!("{}", table(&["Code", "Description"], &[Align::Left, Align::Left], &rows));

    println!();
    println!("  Query some:  pacmon query 2024 --program 14T7 --program 123G");
    println!("  Query all:   pacmon query 2024 --all");

    Ok(())
}
