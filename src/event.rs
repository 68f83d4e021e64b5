//! Lifecycle event taxonomy and the wire payload sent to the collector.

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::whitelist::AttributeSet;

/// A point in a provisioning run's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    RunStarted,
    RunCompleted,
    RunFailed,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::RunStarted => "run_started",
            Lifecycle::RunCompleted => "run_completed",
            Lifecycle::RunFailed => "run_failed",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The event object POSTed to the collector.
#[derive(Debug, Clone, Serialize)]
pub struct DeployEvent {
    pub node_fqdn: String,
    pub sub_type: Lifecycle,
    pub occurred_at: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl DeployEvent {
    /// Build the event, merging custom attributes over the whitelisted set.
    /// Custom keys win on collision.
    pub fn new(
        node_fqdn: impl Into<String>,
        sub_type: Lifecycle,
        whitelisted: &AttributeSet,
        custom: Map<String, Value>,
    ) -> Self {
        let mut attributes = whitelisted.clone();
        for (key, value) in custom {
            attributes.insert(key, value);
        }

        Self {
            node_fqdn: node_fqdn.into(),
            sub_type,
            occurred_at: Utc::now().to_rfc3339(),
            attributes,
        }
    }
}

/// Top-level wrapper expected by the collector.
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    pub deploy_event: DeployEvent,
}
