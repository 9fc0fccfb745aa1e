//! `pacmon config`: Configuration management commands.

use pacmon_config::AppConfig;
use std::path::Path;

use super::{config_file, load_config};

pub async fn validate(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match load_config(config_path) {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let warnings = advisories(&config);
            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Provider:  {} ({})", config.provider.kind, config.provider.endpoint);
            println!("   Timeout:   {}s", config.provider.timeout_secs);
            println!(
                "   Years:     {}-{} (default {})",
                config.years.min, config.years.max, config.years.default
            );
            println!("   Detail:    {}", config.pipeline.detail_level());
            println!("   Actions:   {}", config.programs.len());
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

/// Valid but questionable settings.
fn advisories(config: &AppConfig) -> Vec<&'static str> {
    let mut warnings = Vec::new();

    if config.provider.accept_invalid_certs {
        warnings.push("TLS certificate validation is disabled (provider.accept_invalid_certs)");
    }

    if config.cache.ttl_secs.is_none() && config.years.max >= chrono::Datelike::year(&chrono::Utc::now()) {
        warnings.push("Open fiscal years are cached for the whole session (set cache.ttl_secs to refresh)");
    }

    if config.pipeline.detail.is_empty() {
        warnings.push("pipeline.detail is empty; only totals will be available");
    }

    warnings
}

pub async fn show(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", config_file(config_path).display());
    Ok(())
}
