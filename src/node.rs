//! Inbound data model: the node under management and the run status the
//! host engine hands to lifecycle callbacks.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A node being provisioned, as exposed by the host engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Node {
    /// Stable node name, used for error-sink grouping
    pub name: String,
    /// Fully-qualified domain name, when the node has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    /// Environment the node converges in
    #[serde(default = "default_environment")]
    pub chef_environment: String,
    /// Full node attribute tree
    #[serde(default = "empty_attributes")]
    pub attributes: Value,
}

fn default_environment() -> String {
    "_default".to_string()
}

fn empty_attributes() -> Value {
    Value::Object(serde_json::Map::new())
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fqdn: None,
            chef_environment: default_environment(),
            attributes: empty_attributes(),
        }
    }

    pub fn with_fqdn(mut self, fqdn: impl Into<String>) -> Self {
        self.fqdn = Some(fqdn.into());
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.chef_environment = environment.into();
        self
    }

    pub fn with_attributes(mut self, attributes: Value) -> Self {
        self.attributes = attributes;
        self
    }

    /// FQDN when known, stable name otherwise.
    pub fn fqdn_or_name(&self) -> &str {
        self.fqdn.as_deref().unwrap_or(&self.name)
    }
}

/// Status of a provisioning run, supplied by the host at lifecycle points.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunStatus {
    /// Opaque identifier generated once per run by the host
    pub run_id: String,
    pub node: Node,
}

impl RunStatus {
    pub fn new(run_id: impl Into<String>, node: Node) -> Self {
        Self {
            run_id: run_id.into(),
            node,
        }
    }
}
