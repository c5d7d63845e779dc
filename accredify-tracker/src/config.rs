//! Configuration resolution for accredify-tracker
//!
//! Bind address: CLI/ENV (via clap) → TOML → compiled default.
//! Enrichment: ENV → TOML → offline.

use accredify_common::config::{CompiledDefaults, TomlConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::services::enrichment::{FallbackEnricher, HttpEnricher, OfflineEnricher, DEFAULT_TIMEOUT_MS};

/// Module name used for the TOML file (`tracker.toml`)
pub const MODULE_NAME: &str = "tracker";

pub const ENRICHMENT_URL_ENV: &str = "ACCREDIFY_ENRICHMENT_URL";
pub const ENRICHMENT_API_KEY_ENV: &str = "ACCREDIFY_ENRICHMENT_API_KEY";

/// Address the HTTP server listens on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl ServerAddress {
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Resolve the listen address from CLI/ENV values, then TOML, then defaults
pub fn resolve_server_address(
    cli_host: Option<String>,
    cli_port: Option<u16>,
    toml_config: &TomlConfig,
) -> ServerAddress {
    let defaults = CompiledDefaults::for_current_platform();

    let host = cli_host
        .filter(|h| !h.trim().is_empty())
        .or_else(|| toml_config.bind_address.clone())
        .unwrap_or(defaults.bind_address);
    let port = cli_port.or(toml_config.port).unwrap_or(defaults.port);

    ServerAddress { host, port }
}

/// Resolved enrichment collaborator settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentSettings {
    /// `None` means offline enrichment
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Resolve enrichment settings: ENV → TOML → offline
pub fn resolve_enrichment_settings(toml_config: &TomlConfig) -> EnrichmentSettings {
    let toml = &toml_config.enrichment;

    let env_endpoint = non_blank(std::env::var(ENRICHMENT_URL_ENV).ok());
    let toml_endpoint = non_blank(toml.endpoint.clone());
    if env_endpoint.is_some() && toml_endpoint.is_some() {
        warn!("Enrichment endpoint found in environment and TOML config. Using environment.");
    }

    let endpoint = env_endpoint.or(toml_endpoint);
    let api_key = non_blank(std::env::var(ENRICHMENT_API_KEY_ENV).ok()).or_else(|| non_blank(toml.api_key.clone()));
    let timeout = Duration::from_millis(toml.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS));

    EnrichmentSettings {
        endpoint,
        api_key,
        timeout,
    }
}

/// Build the fallback-wrapped enricher for `settings`
///
/// A remote client that cannot be constructed degrades to offline
/// enrichment with a warning.
pub fn build_enricher(settings: &EnrichmentSettings) -> FallbackEnricher {
    let Some(endpoint) = &settings.endpoint else {
        info!("No enrichment endpoint configured, using offline enrichment");
        return FallbackEnricher::new(Arc::new(OfflineEnricher), settings.timeout);
    };

    match HttpEnricher::new(endpoint.clone(), settings.api_key.clone(), settings.timeout) {
        Ok(client) => {
            info!(endpoint = %endpoint, "Using remote enrichment service");
            FallbackEnricher::new(Arc::new(client), settings.timeout)
        }
        Err(e) => {
            warn!(error = %e, "Failed to build enrichment client, using offline enrichment");
            FallbackEnricher::new(Arc::new(OfflineEnricher), settings.timeout)
        }
    }
}
