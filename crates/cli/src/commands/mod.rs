pub mod config_cmd;
pub mod doctor;
pub mod init;
pub mod programs;
pub mod query;
pub mod shell;

use pacmon_config::{AppConfig, ConfigError};
use std::path::{Path, PathBuf};

/// Load the config file given by `--config`, or the default one.
/// Environment overrides apply either way.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)?;
            config.apply_env_overrides(|key| std::env::var(key).ok())?;
            Ok(config)
        }
        None => AppConfig::load(),
    }
}

pub fn config_file(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}
