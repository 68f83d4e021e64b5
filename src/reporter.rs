//! Run lifecycle reporting.
//!
//! One reporter per provisioning run. The host invokes the [`RunHandler`]
//! callbacks at run start, completion, and failure; the reporter forwards
//! each to the configured sinks and never lets a telemetry fault escape
//! back into the run.

use eyre::{Context, Report, Result};
use log::{info, warn};
use serde_json::{Map, Value};

use crate::config::{HttpConfig, ReporterConfig};
use crate::event::Lifecycle;
use crate::node::{Node, RunStatus};
use crate::publisher::EventPublisher;
use crate::sentry::{ErrorSink, Level, SentryClient, SentryEvent};
use crate::whitelist::Whitelist;

/// Lifecycle callback surface, invoked by the host's run orchestration.
///
/// None of the callbacks may fail: implementations recover from delivery
/// faults internally.
pub trait RunHandler {
    fn on_run_started(&mut self, run_status: &RunStatus);
    fn on_run_completed(&mut self, node: &Node);
    fn on_run_failed(&mut self, error: Option<&Report>);
}

/// Identity of the run being reported.
#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: Option<String>,
    node_name: String,
    node_fqdn: Option<String>,
}

impl RunContext {
    fn new(node: &Node) -> Self {
        Self {
            run_id: None,
            node_name: node.name.clone(),
            node_fqdn: node.fqdn.clone(),
        }
    }

    /// Capture the run identifier and FQDN at run start. Immutable after.
    fn begin(&mut self, run_status: &RunStatus) {
        self.run_id = Some(run_status.run_id.clone());
        self.node_fqdn = Some(run_status.node.fqdn_or_name().to_string());
    }

    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// FQDN for payloads, falling back to the stable name.
    pub fn node_fqdn(&self) -> &str {
        self.node_fqdn.as_deref().unwrap_or(&self.node_name)
    }
}

/// Forwards lifecycle events to the HTTP collector and run failures to the
/// error-tracking sink.
pub struct HttpEventReporter {
    context: RunContext,
    publisher: EventPublisher,
    error_sink: Box<dyn ErrorSink>,
}

impl HttpEventReporter {
    /// Construct a reporter with a Sentry-backed error sink.
    ///
    /// The sink client takes its environment tag from the node.
    pub fn new(config: &ReporterConfig, run_status: &RunStatus) -> Result<Self> {
        let sink = SentryClient::new(&config.sentry, run_status.node.chef_environment.clone())?;
        Self::with_sink(&config.http, Box::new(sink), run_status)
    }

    /// Construct a reporter around any error sink.
    ///
    /// Whitelist computation happens here and is the one fatal path: a
    /// misconfigured reporter must not run unfiltered.
    pub fn with_sink(http: &HttpConfig, error_sink: Box<dyn ErrorSink>, run_status: &RunStatus) -> Result<Self> {
        let whitelist_attributes = Whitelist::new(&http.whitelist_attributes)
            .filter(&run_status.node.attributes)
            .context("Failed to compute whitelisted attribute set")?;

        Ok(Self {
            context: RunContext::new(&run_status.node),
            publisher: EventPublisher::new(http.url.clone(), whitelist_attributes),
            error_sink,
        })
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    fn report_failure(&self, error: Option<&Report>) -> Option<String> {
        info!("Logging run failure to Sentry server");
        let event = match error {
            Some(report) => SentryEvent::from_report(report),
            None => SentryEvent::message("Unknown error during Chef run", Level::Error),
        }
        // Use the node name, not the FQDN
        .with_server_name(self.context.node_name.clone());

        match self.error_sink.capture(event) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Failed to report run failure to error-tracking sink: {e:#}");
                None
            }
        }
    }
}

impl RunHandler for HttpEventReporter {
    fn on_run_started(&mut self, run_status: &RunStatus) {
        self.context.begin(run_status);
        info!("Run {} started on {}", run_status.run_id, self.context.node_name());
        self.publisher.publish(self.context.node_fqdn(), Lifecycle::RunStarted, Map::new());
    }

    fn on_run_completed(&mut self, _node: &Node) {
        info!(
            "Run {} completed on {}",
            self.context.run_id().unwrap_or("unknown"),
            self.context.node_name()
        );
        self.publisher.publish(self.context.node_fqdn(), Lifecycle::RunCompleted, Map::new());
    }

    fn on_run_failed(&mut self, error: Option<&Report>) {
        let sentry_event_id = self.report_failure(error);

        let mut custom_attributes = Map::new();
        if let Some(id) = sentry_event_id {
            custom_attributes.insert("sentry_event_id".to_string(), Value::String(id));
        }
        self.publisher.publish(self.context.node_fqdn(), Lifecycle::RunFailed, custom_attributes);
    }
}
