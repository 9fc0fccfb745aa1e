//! Provider factory: builds the configured provider.

use pacmon_config::{AppConfig, ProviderKind};
use pacmon_core::error::Error;
use pacmon_core::provider::ExpenditureProvider;
use std::sync::Arc;
use tracing::info;

use crate::fixture::StaticProvider;
use crate::siop::SiopProvider;

/// Build the provider named by `[provider].kind`.
pub fn build_from_config(config: &AppConfig) -> pacmon_core::Result<Arc<dyn ExpenditureProvider>> {
    let settings = &config.provider;

    let provider: Arc<dyn ExpenditureProvider> = match settings.kind {
        ProviderKind::Siop => Arc::new(SiopProvider::new(
            &settings.endpoint,
            settings.timeout(),
            settings.accept_invalid_certs,
        )?),
        ProviderKind::Fixture => {
            let path = settings.fixture_path.as_deref().ok_or_else(|| Error::Config {
                message: "provider.fixture_path is required for the fixture provider".into(),
            })?;
            Arc::new(StaticProvider::from_json_file(path)?)
        }
    };

    info!(provider = provider.name(), "Provider ready");
    Ok(provider)
}
