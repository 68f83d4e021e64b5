//! Error-tracking sink: DSN handling, event model, and the blocking client.
//!
//! The client is an explicitly constructed instance held by the reporter,
//! not process-global state. Anything implementing [`ErrorSink`] can stand
//! in for it.

pub mod client;
pub mod dsn;
pub mod event;

pub use client::SentryClient;
pub use dsn::Dsn;
pub use event::{Level, SentryEvent};

use eyre::Result;

/// Capture/send contract for an error-tracking sink.
pub trait ErrorSink: Send + Sync {
    /// Submit one event, returning the sink's correlation identifier.
    fn capture(&self, event: SentryEvent) -> Result<String>;
}
