//! Best-effort delivery of lifecycle events to the HTTP collector.

use log::{debug, warn};
use serde_json::{Map, Value};
use ureq::Agent;
use ureq::http::StatusCode;

use crate::event::{DeployEvent, EventEnvelope, Lifecycle};
use crate::whitelist::AttributeSet;

/// Outcome of one delivery attempt, consumed only for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Collector answered 2xx/3xx
    Accepted { status: u16 },
    /// Collector answered with any other status
    Rejected { status: u16, reason: String },
    /// The request never completed
    Failed { error: String },
}

/// Publishes lifecycle events to the configured collector endpoint.
///
/// A failed delivery never escapes: every outcome is logged and returned as
/// a [`Delivery`] value.
pub struct EventPublisher {
    url: String,
    whitelist_attributes: AttributeSet,
    agent: Agent,
}

impl EventPublisher {
    pub fn new(url: String, whitelist_attributes: AttributeSet) -> Self {
        // Non-2xx responses must come back as responses, not errors, so the
        // status code can be logged.
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            url,
            whitelist_attributes,
            agent,
        }
    }

    pub fn whitelist_attributes(&self) -> &AttributeSet {
        &self.whitelist_attributes
    }

    /// Merge, serialize and POST one lifecycle event.
    pub fn publish(&self, node_fqdn: &str, event: Lifecycle, custom_attributes: Map<String, Value>) -> Delivery {
        let envelope = EventEnvelope {
            deploy_event: DeployEvent::new(node_fqdn, event, &self.whitelist_attributes, custom_attributes),
        };

        let body = match serde_json::to_string(&envelope) {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to serialize {event} event: {e}");
                return Delivery::Failed { error: e.to_string() };
            }
        };

        match self.post(&body) {
            Ok(status) if status.is_success() || status.is_redirection() => {
                debug!("Successfully sent http request with {body} to {}", self.url);
                Delivery::Accepted { status: status.as_u16() }
            }
            Ok(status) => {
                let reason = status.canonical_reason().unwrap_or("unknown").to_string();
                warn!(
                    "Error in sending http request to {} Code is {} Msg is {}",
                    self.url,
                    status.as_u16(),
                    reason
                );
                Delivery::Rejected { status: status.as_u16(), reason }
            }
            Err(e) => {
                warn!("Exception raised when sending http request to {} : {e}", self.url);
                Delivery::Failed { error: e.to_string() }
            }
        }
    }

    fn post(&self, body: &str) -> Result<StatusCode, ureq::Error> {
        let res = self
            .agent
            .post(&self.url)
            .header("Content-Type", "application/json")
            .send(body)?;
        Ok(res.status())
    }
}
