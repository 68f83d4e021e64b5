//! Sink configuration for the reporter.
//!
//! Two independent bundles, supplied once at construction and held
//! immutably for the reporter's lifetime:
//! - HTTP event collector (endpoint URL + attribute whitelist)
//! - Error-tracking service (DSN + TLS verification)

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Full reporter configuration: both sink bundles.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ReporterConfig {
    pub http: HttpConfig,
    pub sentry: SentryConfig,
}

/// HTTP event-collector sink.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Endpoint receiving lifecycle event payloads
    pub url: String,
    /// Slash-separated attribute paths approved for export
    pub whitelist_attributes: Vec<String>,
}

/// Error-tracking sink.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SentryConfig {
    pub dsn: String,
    /// TLS verification; only an explicit `false` disables it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_ssl: Option<bool>,
}

impl SentryConfig {
    /// Effective TLS verification: explicit `false` disables it, anything
    /// else (including absent) enables it.
    pub fn verify_ssl(&self) -> bool {
        self.verify_ssl.unwrap_or(true)
    }
}

impl ReporterConfig {
    /// Load reporter configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .context(format!("Failed to read reporter config from {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse reporter config")?;

        log::info!("Loaded reporter config from: {}", path.as_ref().display());
        Ok(config)
    }
}
