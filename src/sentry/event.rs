//! Event model for the error-tracking sink.

use chrono::Utc;
use eyre::Report;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Event severity, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

/// A single event submitted to the error-tracking sink.
#[derive(Debug, Clone, Serialize)]
pub struct SentryEvent {
    /// Client-generated identifier, also the correlation id unless the
    /// collector assigns its own
    pub event_id: String,
    pub timestamp: String,
    pub platform: &'static str,
    pub level: Level,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<Exception>,
    /// Stable node identity for sink-side grouping, not the FQDN
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Package inventory of the reporting process
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub modules: Map<String, Value>,
    pub sdk: SdkInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct Exception {
    pub values: Vec<ExceptionValue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExceptionValue {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SdkInfo {
    pub name: &'static str,
    pub version: &'static str,
}

impl Default for SdkInfo {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

impl SentryEvent {
    fn base(level: Level) -> Self {
        Self {
            event_id: Uuid::new_v4().simple().to_string(),
            timestamp: Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
            platform: "other",
            level,
            message: None,
            exception: None,
            server_name: None,
            environment: None,
            modules: Map::new(),
            sdk: SdkInfo::default(),
        }
    }

    /// Synthetic message event.
    pub fn message(text: impl Into<String>, level: Level) -> Self {
        let mut event = Self::base(level);
        event.message = Some(text.into());
        event
    }

    /// Capture an error report: the whole cause chain becomes exception
    /// values, outermost first.
    pub fn from_report(report: &Report) -> Self {
        let values = report
            .chain()
            .map(|cause| ExceptionValue {
                kind: "Error".to_string(),
                value: cause.to_string(),
            })
            .collect();

        let mut event = Self::base(Level::Error);
        event.message = Some(report.to_string());
        event.exception = Some(Exception { values });
        event
    }

    pub fn with_server_name(mut self, server_name: impl Into<String>) -> Self {
        self.server_name = Some(server_name.into());
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }
}
