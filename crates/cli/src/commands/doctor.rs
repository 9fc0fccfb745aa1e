//! `pacmon doctor`: Diagnose configuration and provider health.

use pacmon_config::ProviderKind;
use std::path::Path;

use super::{config_file, load_config};

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 pacmon Doctor — System Diagnostics");
    println!("=====================================\n");

    let mut issues = 0;

    let path = config_file(config_path);
    if path.exists() {
        println!("  ✅ Config file found: {}", path.display());
    } else {
        println!("  ⚠️  No config file — using defaults (run `pacmon init`)");
    }

    let config = match load_config(config_path) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 issue(s) found. See above for details.");
            return Ok(());
        }
    };

    match pacmon_providers::build_from_config(&config) {
        Ok(provider) => {
            println!("  ✅ Provider '{}' built", provider.name());
            match provider.health_check().await {
                Ok(true) => println!("  ✅ Provider reachable"),
                Ok(false) => {
                    println!("  ⚠️  Provider answered but reported itself unhealthy");
                    issues += 1;
                }
                Err(e) => {
                    println!("  ❌ Provider unreachable: {e}");
                    issues += 1;
                }
            }
        }
        Err(e) => {
            println!("  ❌ Provider could not be built: {e}");
            issues += 1;
        }
    }

    if config.provider.kind == ProviderKind::Siop && config.provider.accept_invalid_certs {
        println!("  ℹ️  TLS certificate validation is relaxed for {}", config.provider.endpoint);
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
