//! Blocking submission client for the error-tracking sink.

use eyre::{Context, Result};
use log::debug;
use serde::Deserialize;
use serde_json::Value;
use ureq::Agent;
use ureq::tls::TlsConfig;

use super::dsn::Dsn;
use super::event::SentryEvent;
use super::ErrorSink;
use crate::config::SentryConfig;

/// Client for one error-tracking project, held by the reporter instance.
pub struct SentryClient {
    dsn: Dsn,
    agent: Agent,
    environment: String,
}

impl SentryClient {
    /// Build a client from sink configuration. A malformed DSN is fatal.
    pub fn new(config: &SentryConfig, environment: impl Into<String>) -> Result<Self> {
        let dsn = Dsn::parse(&config.dsn).context("Failed to configure error-tracking sink")?;

        let agent: Agent = Agent::config_builder()
            .tls_config(
                TlsConfig::builder()
                    .disable_verification(!config.verify_ssl())
                    .build(),
            )
            .build()
            .into();

        debug!("Sentry client ready to report errors");
        Ok(Self {
            dsn,
            agent,
            environment: environment.into(),
        })
    }

    /// Stamp client-level metadata onto an event that lacks it.
    fn enrich(&self, mut event: SentryEvent) -> SentryEvent {
        if event.environment.is_none() {
            event.environment = Some(self.environment.clone());
        }
        if event.modules.is_empty() {
            event.modules.insert(
                env!("CARGO_PKG_NAME").to_string(),
                Value::String(env!("CARGO_PKG_VERSION").to_string()),
            );
        }
        event
    }
}

#[derive(Debug, Deserialize)]
struct StoreResponse {
    id: Option<String>,
}

impl ErrorSink for SentryClient {
    fn capture(&self, event: SentryEvent) -> Result<String> {
        let event = self.enrich(event);
        let event_id = event.event_id.clone();
        let body = serde_json::to_string(&event).context("Failed to serialize Sentry event")?;

        let mut res = self
            .agent
            .post(self.dsn.store_url())
            .header("Content-Type", "application/json")
            .header("X-Sentry-Auth", self.dsn.auth_header())
            .send(body.as_bytes())
            .context(format!("Failed to submit event to {}", self.dsn.store_url()))?;

        // The collector echoes the id it stored; fall back to ours.
        let id = res
            .body_mut()
            .read_to_string()
            .ok()
            .and_then(|text| serde_json::from_str::<StoreResponse>(&text).ok())
            .and_then(|r| r.id)
            .unwrap_or(event_id);

        debug!("Reported event {id} to error-tracking sink");
        Ok(id)
    }
}
