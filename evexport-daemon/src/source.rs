//! Host event source -- JSON lines to [`RawEvent`]s.
//!
//! Each non-empty line is one `RawEvent`:
//!
//! ```text
//! {"packet":{"src_ip":"10.0.0.1","dst_ip":"10.0.0.2","length":60,"action":"drop","severity":"high"}}
//! {"flow":{"client_ip":"10.0.0.1","server_ip":"10.0.0.2","state":"inspect"}}
//! ```
//!
//! Lines that fail to decode are logged and counted, never fatal.

use std::io::{self, BufRead, BufReader, Read};
use std::path::PathBuf;
use std::thread;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};

use evexport_core::metrics as m;
use evexport_core::types::RawEvent;
use evexport_exporter::ExporterHandle;

/// Lines buffered between the reader thread and the async pump.
const LINE_CHANNEL_CAPACITY: usize = 1024;

/// Where host events are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Standard input.
    Stdin,
    /// A file of JSON lines.
    File(PathBuf),
}

impl InputSource {
    /// `-` means stdin, anything else is a file path.
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            Self::Stdin
        } else {
            Self::File(PathBuf::from(arg))
        }
    }

    /// Start reading this input on its own thread.
    ///
    /// Opening a file happens on that thread too, so a FIFO without a
    /// writer does not stall the caller. Open failures arrive as the
    /// first line result.
    pub fn open(&self) -> Result<LineReceiver> {
        match self {
            Self::Stdin => {
                tracing::info!("reading host events from stdin");
                LineReceiver::spawn(|| Ok(io::stdin()))
            }
            Self::File(path) => {
                tracing::info!(path = %path.display(), "reading host events from file");
                let path = path.clone();
                LineReceiver::spawn(move || {
                    std::fs::File::open(&path).map_err(|e| {
                        io::Error::new(
                            e.kind(),
                            format!("failed to open input '{}': {}", path.display(), e),
                        )
                    })
                })
            }
        }
    }
}

/// Lines produced by a blocking reader thread.
///
/// The thread is detached: it is never joined, so a read that never
/// returns (an idle stdin pipe) cannot hold up runtime shutdown or
/// process exit. It stops on its own at EOF, on a read error, or at
/// the next line once the receiver is dropped.
pub struct LineReceiver {
    rx: mpsc::Receiver<io::Result<String>>,
}

impl LineReceiver {
    /// Spawn a reader thread that first calls `open`, then forwards lines.
    pub fn spawn<F, R>(open: F) -> Result<Self>
    where
        F: FnOnce() -> io::Result<R> + Send + 'static,
        R: Read + 'static,
    {
        let (tx, rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
        thread::Builder::new()
            .name("evexport-input".to_owned())
            .spawn(move || forward_lines(open, &tx))
            .map_err(|e| anyhow::anyhow!("failed to spawn input reader thread: {}", e))?;
        Ok(Self { rx })
    }

    /// Read from an already-open reader.
    pub fn from_reader<R>(reader: R) -> Result<Self>
    where
        R: Read + Send + 'static,
    {
        Self::spawn(move || Ok(reader))
    }

    /// Next line, `None` at EOF. Cancel safe.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        self.rx.recv().await.transpose()
    }
}

fn forward_lines<F, R>(open: F, tx: &mpsc::Sender<io::Result<String>>)
where
    F: FnOnce() -> io::Result<R>,
    R: Read,
{
    let reader = match open() {
        Ok(reader) => reader,
        Err(e) => {
            let _ = tx.blocking_send(Err(e));
            return;
        }
    };

    for line in BufReader::new(reader).lines() {
        let failed = line.is_err();
        // Receiver gone means the pump has shut down
        if tx.blocking_send(line).is_err() || failed {
            break;
        }
    }
}

/// Counters for one source run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceReport {
    /// Lines read, including blank and malformed ones.
    pub lines: u64,
    /// Events handed to the exporter.
    pub submitted: u64,
    /// Lines that were not valid `RawEvent` JSON.
    pub decode_errors: u64,
}

/// Decode a single input line.
pub fn decode_line(line: &str) -> Result<RawEvent, serde_json::Error> {
    serde_json::from_str(line)
}

/// Read the input until EOF or shutdown, submitting every decoded event.
pub async fn run_source(
    input: InputSource,
    handle: ExporterHandle,
    shutdown: broadcast::Receiver<()>,
) -> Result<SourceReport> {
    let lines = input.open()?;
    pump(lines, handle, shutdown).await
}

/// Pump lines from `lines` into the exporter.
///
/// Waits for room in the exporter's command channel, so a fast reader
/// is paced by the exporter task instead of losing events at ingress.
pub async fn pump(
    mut lines: LineReceiver,
    handle: ExporterHandle,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<SourceReport> {
    let mut report = SourceReport::default();

    loop {
        let line = tokio::select! {
            _ = shutdown.recv() => {
                tracing::debug!("source received shutdown");
                break;
            }
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            tracing::info!(lines = report.lines, "input reached end of file");
            break;
        };

        report.lines += 1;
        metrics::counter!(m::SOURCE_LINES_TOTAL).increment(1);

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match decode_line(trimmed) {
            Ok(raw) => {
                if let Err(e) = handle.submit_wait(raw).await {
                    tracing::warn!(error = %e, "exporter stopped accepting events");
                    break;
                }
                report.submitted += 1;
            }
            Err(e) => {
                report.decode_errors += 1;
                metrics::counter!(m::SOURCE_DECODE_ERRORS_TOTAL).increment(1);
                tracing::warn!(line = report.lines, error = %e, "skipping malformed event line");
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use evexport_core::types::{Action, FlowState};

    #[test]
    fn decode_packet_line() {
        let raw = decode_line(
            r#"{"packet":{"src_ip":"10.0.0.1","dst_ip":"10.0.0.2","length":60,"action":"drop","severity":"high"}}"#,
        )
        .unwrap();
        let packet = raw.packet.unwrap();
        assert_eq!(packet.action, Action::Drop);
        assert_eq!(packet.length, 60);
        assert!(raw.flow.is_none());
    }

    #[test]
    fn decode_flow_line_with_defaults() {
        let raw = decode_line(
            r#"{"flow":{"client_ip":"10.0.0.1","server_ip":"10.0.0.2","state":"inspect"}}"#,
        )
        .unwrap();
        let flow = raw.flow.unwrap();
        assert_eq!(flow.state, FlowState::Inspect);
        assert_eq!(flow.client_bytes, 0);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_line("not json").is_err());
        assert!(decode_line(r#"{"packet":{"action":"explode"}}"#).is_err());
    }

    #[tokio::test]
    async fn line_receiver_yields_lines_then_eof() {
        let mut lines = LineReceiver::from_reader(io::Cursor::new("a\nb\n")).unwrap();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("a"));
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("b"));
        assert_eq!(lines.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn open_missing_file_reports_error() {
        let mut lines = InputSource::File(PathBuf::from("/nonexistent/events.ndjson"))
            .open()
            .unwrap();
        let err = lines.next_line().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(err.to_string().contains("/nonexistent/events.ndjson"));
    }

    #[test]
    fn input_source_from_arg() {
        assert_eq!(InputSource::from_arg("-"), InputSource::Stdin);
        assert_eq!(
            InputSource::from_arg("events.ndjson"),
            InputSource::File(PathBuf::from("events.ndjson"))
        );
    }
}
