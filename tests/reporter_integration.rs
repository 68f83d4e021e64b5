//! End-to-end reporter scenarios against a loopback collector.
//!
//! A one-shot TCP server stands in for the HTTP event collector and captures
//! the raw request; a mock error sink stands in for the error-tracking
//! service. Together they exercise the full publish path without leaving the
//! machine.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use eyre::{Result, eyre};
use serde_json::{Value, json};

use run_reporter::{ErrorSink, HttpConfig, HttpEventReporter, Node, RunHandler, RunStatus, SentryEvent};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct CapturedRequest {
    request_line: String,
    headers: Vec<String>,
    body: String,
}

impl CapturedRequest {
    fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("collector received invalid JSON")
    }
}

/// One-shot HTTP collector: accepts a single POST and returns it, answering
/// with the given status line.
fn spawn_collector(status_line: &'static str) -> (String, JoinHandle<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind loopback listener");
    let addr = listener.local_addr().expect("Failed to read listener addr");

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("Failed to accept collector connection");
        let mut reader = BufReader::new(stream);

        let mut request_line = String::new();
        reader.read_line(&mut request_line).expect("Failed to read request line");

        let mut headers = Vec::new();
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).expect("Failed to read header");
            if line == "\r\n" || line == "\n" {
                break;
            }
            let lower = line.to_ascii_lowercase();
            if let Some(value) = lower.strip_prefix("content-length:") {
                content_length = value.trim().parse().unwrap_or(0);
            }
            headers.push(line.trim_end().to_string());
        }

        let mut body = vec![0u8; content_length];
        reader.read_exact(&mut body).expect("Failed to read body");

        let response = format!("HTTP/1.1 {status_line}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        reader
            .get_mut()
            .write_all(response.as_bytes())
            .expect("Failed to write response");

        CapturedRequest {
            request_line: request_line.trim_end().to_string(),
            headers,
            body: String::from_utf8(body).expect("Collector received non-UTF8 body"),
        }
    });

    (format!("http://{addr}/events"), handle)
}

struct MockSink {
    captured: Arc<Mutex<Vec<SentryEvent>>>,
    result: Option<String>,
}

impl MockSink {
    fn new(result: Option<&str>) -> (Self, Arc<Mutex<Vec<SentryEvent>>>) {
        let captured = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                captured: captured.clone(),
                result: result.map(String::from),
            },
            captured,
        )
    }
}

impl ErrorSink for MockSink {
    fn capture(&self, event: SentryEvent) -> Result<String> {
        self.captured.lock().unwrap().push(event);
        match &self.result {
            Some(id) => Ok(id.clone()),
            None => Err(eyre!("sink down")),
        }
    }
}

fn run_status(name: &str) -> RunStatus {
    RunStatus::new("r-1", Node::new(name).with_attributes(json!({"role": "web"})))
}

fn http_config(url: &str) -> HttpConfig {
    HttpConfig {
        url: url.to_string(),
        whitelist_attributes: vec!["role".to_string()],
    }
}

#[test]
fn test_run_started_publishes_whitelisted_event() {
    init_logging();
    let (url, collector) = spawn_collector("200 OK");
    let (sink, _) = MockSink::new(Some("evt-1"));

    let status = run_status("n1");
    let mut reporter = HttpEventReporter::with_sink(&http_config(&url), Box::new(sink), &status).unwrap();
    reporter.on_run_started(&status);

    let request = collector.join().unwrap();
    assert!(request.request_line.starts_with("POST /events"));
    assert!(
        request
            .headers
            .iter()
            .any(|h| h.to_ascii_lowercase().starts_with("content-type: application/json"))
    );

    let deploy_event = &request.json()["deploy_event"];
    assert_eq!(deploy_event["sub_type"], "run_started");
    assert_eq!(deploy_event["node_fqdn"], "n1");
    assert_eq!(deploy_event["role"], "web");
    assert!(deploy_event["occurred_at"].is_string());
    assert!(deploy_event.get("sentry_event_id").is_none());
}

#[test]
fn test_run_failed_embeds_correlation_id() {
    init_logging();
    let (url, collector) = spawn_collector("200 OK");
    let (sink, captured) = MockSink::new(Some("evt-42"));

    let status = run_status("n1");
    let mut reporter = HttpEventReporter::with_sink(&http_config(&url), Box::new(sink), &status).unwrap();
    reporter.on_run_failed(None);

    let events = captured.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].message.as_deref(), Some("Unknown error during Chef run"));

    let deploy_event = &collector.join().unwrap().json()["deploy_event"];
    assert_eq!(deploy_event["sub_type"], "run_failed");
    assert_eq!(deploy_event["sentry_event_id"], "evt-42");
}

#[test]
fn test_run_failed_with_cause_reports_exception_chain() {
    init_logging();
    let (url, collector) = spawn_collector("200 OK");
    let (sink, captured) = MockSink::new(Some("evt-7"));

    let status = run_status("n1");
    let mut reporter = HttpEventReporter::with_sink(&http_config(&url), Box::new(sink), &status).unwrap();

    let error = eyre!("cookbook compile failed");
    reporter.on_run_failed(Some(&error));

    let events = captured.lock().unwrap();
    let exception = events[0].exception.as_ref().unwrap();
    assert_eq!(exception.values[0].value, "cookbook compile failed");

    let deploy_event = &collector.join().unwrap().json()["deploy_event"];
    assert_eq!(deploy_event["sentry_event_id"], "evt-7");
}

#[test]
fn test_error_sink_groups_by_short_name_while_payload_keeps_fqdn() {
    init_logging();
    let (url, collector) = spawn_collector("200 OK");
    let (sink, captured) = MockSink::new(Some("evt-9"));

    let status = RunStatus::new(
        "r-1",
        Node::new("web01")
            .with_fqdn("web01.prod.example.com")
            .with_attributes(json!({"role": "web"})),
    );
    let mut reporter = HttpEventReporter::with_sink(&http_config(&url), Box::new(sink), &status).unwrap();
    reporter.on_run_failed(None);

    let events = captured.lock().unwrap();
    assert_eq!(events[0].server_name.as_deref(), Some("web01"));

    let deploy_event = &collector.join().unwrap().json()["deploy_event"];
    assert_eq!(deploy_event["node_fqdn"], "web01.prod.example.com");
}

#[test]
fn test_sink_failure_still_publishes_without_correlation_id() {
    init_logging();
    let (url, collector) = spawn_collector("200 OK");
    let (sink, captured) = MockSink::new(None);

    let status = run_status("n1");
    let mut reporter = HttpEventReporter::with_sink(&http_config(&url), Box::new(sink), &status).unwrap();
    reporter.on_run_failed(None);

    // The sink was attempted first, then the publish still went out.
    assert_eq!(captured.lock().unwrap().len(), 1);

    let deploy_event = &collector.join().unwrap().json()["deploy_event"];
    assert_eq!(deploy_event["sub_type"], "run_failed");
    assert!(deploy_event.get("sentry_event_id").is_none());
}

#[test]
fn test_rejected_response_never_propagates() {
    init_logging();
    let (url, collector) = spawn_collector("500 Internal Server Error");
    let (sink, _) = MockSink::new(Some("evt-1"));

    let status = run_status("n1");
    let mut reporter = HttpEventReporter::with_sink(&http_config(&url), Box::new(sink), &status).unwrap();
    reporter.on_run_completed(&status.node);

    let deploy_event = &collector.join().unwrap().json()["deploy_event"];
    assert_eq!(deploy_event["sub_type"], "run_completed");
}

#[test]
fn test_unreachable_collector_never_propagates() {
    init_logging();
    // Nothing listens on port 1.
    let (sink, _) = MockSink::new(None);

    let status = run_status("n1");
    let mut reporter =
        HttpEventReporter::with_sink(&http_config("http://127.0.0.1:1/events"), Box::new(sink), &status).unwrap();

    reporter.on_run_started(&status);
    reporter.on_run_completed(&status.node);
    reporter.on_run_failed(None);
}
