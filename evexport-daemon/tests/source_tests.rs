//! Event source integration tests.
//!
//! Feeds JSON lines through `source::pump` into a running exporter service
//! backed by an in-memory transport.

use std::io::{self, Read};
use std::sync::{Arc, Mutex, mpsc as std_mpsc};

use bytes::Bytes;
use tokio::sync::broadcast;

use evexport_core::config::ExporterConfig;
use evexport_core::error::TransportError;
use evexport_core::pipeline::{Pipeline, SendOutcome, Transport};
use evexport_daemon::source::{self, LineReceiver, SourceReport};
use evexport_exporter::{Connector, ExporterServiceBuilder};

struct MemoryTransport {
    sink: Arc<Mutex<Vec<Bytes>>>,
}

impl Transport for MemoryTransport {
    fn send_nonblocking(&mut self, message: &Bytes) -> SendOutcome {
        self.sink.lock().unwrap().push(message.clone());
        SendOutcome::Sent
    }

    fn close(&mut self) {}
}

#[derive(Clone, Default)]
struct MemoryConnector {
    sink: Arc<Mutex<Vec<Bytes>>>,
}

impl Connector for MemoryConnector {
    type Transport = MemoryTransport;

    fn connect(&self, _config: &ExporterConfig) -> Result<Self::Transport, TransportError> {
        Ok(MemoryTransport {
            sink: Arc::clone(&self.sink),
        })
    }
}

/// A reader that blocks until its sender is dropped, then reports EOF.
struct IdleReader(std_mpsc::Receiver<()>);

impl Read for IdleReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        let _ = self.0.recv();
        Ok(0)
    }
}

fn lines_of(input: &'static str) -> LineReceiver {
    LineReceiver::from_reader(io::Cursor::new(input)).unwrap()
}

fn config() -> ExporterConfig {
    ExporterConfig {
        buffer_size: 1_000,
        flush_interval_ms: 10_000,
        ..Default::default()
    }
}

const INPUT: &str = r#"{"packet":{"src_ip":"10.0.0.1","dst_ip":"10.0.0.2","length":60,"action":"drop","severity":"high"}}

{"flow":{"client_ip":"10.0.0.1","server_ip":"10.0.0.2","state":"inspect"}}
this is not json
{"packet":{"length":40,"action":"pass"}}
"#;

#[tokio::test]
async fn test_pump_submits_decoded_events_and_counts_errors() {
    // Given: A running exporter service and mixed input
    let connector = MemoryConnector::default();
    let sink = Arc::clone(&connector.sink);
    let (mut service, handle) = ExporterServiceBuilder::new(connector)
        .config(config())
        .build()
        .unwrap();
    service.start().await.unwrap();
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

    // When: Pumping the whole input
    let report = source::pump(lines_of(INPUT), handle, shutdown_rx)
        .await
        .unwrap();
    service.stop().await.unwrap();

    // Then: Blank and malformed lines are accounted for, valid lines submitted
    assert_eq!(
        report,
        SourceReport {
            lines: 5,
            submitted: 3,
            decode_errors: 1,
        }
    );

    // Only the dropped packet and the inspected flow are exported
    let sent = sink.lock().unwrap();
    assert_eq!(sent.len(), 2);
    let types: Vec<String> = sent
        .iter()
        .map(|m| {
            let json: serde_json::Value = serde_json::from_slice(m).unwrap();
            json["type"].as_str().unwrap().to_owned()
        })
        .collect();
    assert_eq!(types, ["alert", "flow"]);
    assert_eq!(service.events_sent(), 2);
    assert_eq!(service.events_dropped(), 0);
}

#[tokio::test]
async fn test_pump_stops_on_shutdown() {
    let (mut service, handle) = ExporterServiceBuilder::new(MemoryConnector::default())
        .config(config())
        .build()
        .unwrap();
    service.start().await.unwrap();

    // Input stays open and never produces a line
    let (_keep_open, idle) = std_mpsc::channel::<()>();
    let lines = LineReceiver::from_reader(IdleReader(idle)).unwrap();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let task = tokio::spawn(source::pump(lines, handle, shutdown_rx));
    shutdown_tx.send(()).unwrap();

    let report = tokio::time::timeout(std::time::Duration::from_secs(5), task)
        .await
        .expect("pump should stop on shutdown")
        .unwrap()
        .unwrap();
    assert_eq!(report, SourceReport::default());

    service.stop().await.unwrap();
}

#[tokio::test]
async fn test_pump_stops_when_exporter_is_gone() {
    let (mut service, handle) = ExporterServiceBuilder::new(MemoryConnector::default())
        .config(config())
        .build()
        .unwrap();
    service.start().await.unwrap();
    service.stop().await.unwrap();
    drop(service);

    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let report = source::pump(lines_of(INPUT), handle, shutdown_rx)
        .await
        .unwrap();

    // The first valid line cannot be delivered, so the pump gives up there
    assert_eq!(report.lines, 1);
    assert_eq!(report.submitted, 0);
}

#[tokio::test]
async fn test_run_source_missing_file_fails() {
    let (_service, handle) = ExporterServiceBuilder::new(MemoryConnector::default())
        .build()
        .unwrap();
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let result = source::run_source(
        source::InputSource::File("/nonexistent/events.ndjson".into()),
        handle,
        shutdown_rx,
    )
    .await;
    assert!(result.is_err());
}
