//! Orchestrator integration tests.
//!
//! Tests the full flow: config -> start -> replay input file -> shutdown,
//! with a local TCP listener standing in for the collector.

use std::io::{self, Read, Write};
use std::sync::mpsc as std_mpsc;
use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

use evexport_core::config::EvexportConfig;
use evexport_daemon::orchestrator::{self, Orchestrator, ShutdownTrigger};
use evexport_daemon::source::{InputSource, LineReceiver};

const RECV_TIMEOUT: Duration = Duration::from_secs(10);

/// Helper function to create a test config pointing at `endpoint`.
fn test_config(endpoint: &str) -> EvexportConfig {
    let toml_str = format!(
        r#"
[general]
log_level = "info"

[exporter]
endpoint = "{endpoint}"
buffer_size = 100
flush_interval_ms = 100
reconnect_interval_ms = 20
linger_ms = 2000

[metrics]
enabled = false
"#
    );
    EvexportConfig::parse(&toml_str).expect("failed to parse test config")
}

fn write_input(lines: &[&str]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    for line in lines {
        writeln!(file, "{line}").expect("write line");
    }
    file
}

#[test]
fn test_build_rejects_invalid_config() {
    let mut config = test_config("tcp://127.0.0.1:5555");
    config.exporter.buffer_size = 10;
    assert!(Orchestrator::build_from_config(config).is_err());
}

#[test]
fn test_validate_config_rejects_unusable_endpoints() {
    // Given: Endpoints that pass the non-empty check but can never connect
    for endpoint in [
        "inproc://x",
        "ipc:///tmp/evexport.sock",
        "tcp://127.0.0.1",
        "udp://*:5555",
    ] {
        let config = test_config(endpoint);

        // Then: Rejected before any transport is opened
        assert!(
            orchestrator::validate_config(&config).is_err(),
            "{endpoint} should fail validation"
        );
        assert!(Orchestrator::build_from_config(config).is_err());
    }

    assert!(orchestrator::validate_config(&test_config("udp://collector:7000")).is_ok());
}

/// A reader that blocks until its sender is dropped, like an idle stdin pipe.
struct IdleReader(std_mpsc::Receiver<()>);

impl Read for IdleReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        let _ = self.0.recv();
        Ok(0)
    }
}

#[test]
fn test_shutdown_with_open_input_releases_runtime() {
    // Given: Input that stays open and never reaches EOF
    let (keep_open, idle) = std_mpsc::channel::<()>();
    let (done_tx, done_rx) = std_mpsc::channel();

    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("runtime");

        let trigger = runtime.block_on(async move {
            let mut orchestrator =
                Orchestrator::build_from_config(test_config("udp://127.0.0.1:9")).expect("build");
            let lines = LineReceiver::from_reader(IdleReader(idle)).expect("reader");

            // When: A shutdown signal arrives while the read is pending
            orchestrator
                .run_until(lines, async {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok(ShutdownTrigger::Signal("SIGTERM"))
                })
                .await
        });

        // Dropping the runtime must not wait for the pending read
        let started = Instant::now();
        drop(runtime);
        let _ = done_tx.send((trigger.map_err(|e| e.to_string()), started.elapsed()));
    });

    // Then: Shutdown completes while the input is still open
    let (trigger, drop_elapsed) = done_rx
        .recv_timeout(RECV_TIMEOUT)
        .expect("daemon should shut down with the input still open");
    assert_eq!(trigger, Ok(ShutdownTrigger::Signal("SIGTERM")));
    assert!(drop_elapsed < Duration::from_secs(2));

    drop(keep_open);
}

#[tokio::test]
async fn test_replay_file_delivers_events_and_exits_on_eof() {
    // Given: A collector listening on an ephemeral port
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = test_config(&format!("tcp://{addr}"));
    let mut orchestrator = Orchestrator::build_from_config(config).expect("build");

    let input = write_input(&[
        r#"{"packet":{"src_ip":"10.0.0.1","dst_ip":"10.0.0.2","length":60,"action":"drop","severity":"high"}}"#,
        r#"{"flow":{"client_ip":"10.0.0.1","server_ip":"10.0.0.2","state":"inspect"}}"#,
        "garbage",
        r#"{"packet":{"length":40,"action":"pass"}}"#,
    ]);

    let collector = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut frames = Vec::new();
        for _ in 0..2 {
            let len = stream.read_u32().await.unwrap();
            let mut payload = vec![0u8; len as usize];
            stream.read_exact(&mut payload).await.unwrap();
            frames.push(serde_json::from_slice::<serde_json::Value>(&payload).unwrap());
        }
        frames
    });

    // When: Running until the input is exhausted
    let trigger = orchestrator
        .run(InputSource::File(input.path().to_path_buf()))
        .await
        .expect("run should succeed");

    // Then: The daemon stops on EOF and the collector received both events
    assert_eq!(trigger, ShutdownTrigger::InputClosed);

    let frames = tokio::time::timeout(RECV_TIMEOUT, collector)
        .await
        .expect("collector should receive frames")
        .unwrap();
    assert_eq!(frames[0]["type"], "alert");
    assert_eq!(frames[0]["src_ip"], "10.0.0.1");
    assert_eq!(frames[1]["type"], "flow");

    assert!(orchestrator.health().await.is_unhealthy());
}
