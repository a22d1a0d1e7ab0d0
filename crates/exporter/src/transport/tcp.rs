//! TCP 작성기 -- 4바이트 빅엔디언 길이 접두 프레임
//!
//! 연결이 없으면 `reconnect_interval`마다 다시 연결합니다. 기록에 실패한
//! 메시지는 재연결 후 처음부터 다시 보냅니다.

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use evexport_core::metrics as m;

use super::{Endpoint, TransportOptions};

const FRAME_HEADER_LEN: usize = 4;

/// 길이 접두 프레임을 만듭니다.
pub(crate) fn encode_frame(message: &[u8]) -> std::io::Result<Bytes> {
    let len = u32::try_from(message.len()).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "message exceeds 4 GiB frame limit",
        )
    })?;
    let mut frame = BytesMut::with_capacity(FRAME_HEADER_LEN + message.len());
    frame.put_u32(len);
    frame.put_slice(message);
    Ok(frame.freeze())
}

/// 연결될 때까지 재시도합니다. 첫 실패만 warn으로 남깁니다.
async fn connect_with_retry(endpoint: &Endpoint, options: &TransportOptions) -> TcpStream {
    let mut attempts: u64 = 0;
    loop {
        match TcpStream::connect((endpoint.host(), endpoint.port())).await {
            Ok(stream) => {
                if let Err(e) = stream.set_nodelay(true) {
                    tracing::debug!(error = %e, "failed to set TCP_NODELAY");
                }
                metrics::counter!(m::TRANSPORT_CONNECTS_TOTAL, m::LABEL_SCHEME => "tcp")
                    .increment(1);
                tracing::info!(endpoint = %endpoint, attempts, "transport connected");
                return stream;
            }
            Err(e) => {
                attempts += 1;
                if attempts == 1 {
                    tracing::warn!(endpoint = %endpoint, error = %e, "transport connect failed, retrying");
                } else {
                    tracing::debug!(endpoint = %endpoint, error = %e, attempts, "transport connect retry failed");
                }
                tokio::time::sleep(options.reconnect_interval).await;
            }
        }
    }
}

/// 송신 큐를 읽어 TCP 스트림으로 기록하는 작성기 태스크
pub(crate) async fn run_writer(
    endpoint: Endpoint,
    mut rx: mpsc::Receiver<Bytes>,
    closing: CancellationToken,
    options: TransportOptions,
) {
    // 종료 신호 이후 linger가 지나면 완료되는 기한
    let linger_deadline = async {
        closing.cancelled().await;
        tokio::time::sleep(options.linger).await;
    };
    tokio::pin!(linger_deadline);

    let mut stream: Option<TcpStream> = None;
    let mut pending: Option<Bytes> = None;

    loop {
        let message = match pending.take() {
            Some(message) => message,
            None => tokio::select! {
                received = rx.recv() => match received {
                    Some(message) => message,
                    None => break,
                },
                () = &mut linger_deadline => break,
            },
        };

        let frame = match encode_frame(&message) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "dropping oversized message");
                metrics::counter!(m::TRANSPORT_WRITE_ERRORS_TOTAL, m::LABEL_SCHEME => "tcp")
                    .increment(1);
                continue;
            }
        };

        if stream.is_none() {
            let connected = tokio::select! {
                connected = connect_with_retry(&endpoint, &options) => connected,
                () = &mut linger_deadline => {
                    pending = Some(message);
                    break;
                }
            };
            stream = Some(connected);
        }
        let Some(connected) = stream.as_mut() else {
            continue;
        };

        let written = tokio::select! {
            result = connected.write_all(&frame) => result,
            () = &mut linger_deadline => {
                pending = Some(message);
                break;
            }
        };

        match written {
            Ok(()) => {
                metrics::counter!(m::TRANSPORT_MESSAGES_WRITTEN_TOTAL, m::LABEL_SCHEME => "tcp")
                    .increment(1);
            }
            Err(e) => {
                tracing::warn!(endpoint = %endpoint, error = %e, "transport write failed, reconnecting");
                metrics::counter!(m::TRANSPORT_WRITE_ERRORS_TOTAL, m::LABEL_SCHEME => "tcp")
                    .increment(1);
                stream = None;
                pending = Some(message);
            }
        }
    }

    if let Some(mut connected) = stream {
        if let Err(e) = connected.shutdown().await {
            tracing::debug!(error = %e, "transport shutdown failed");
        }
    }

    let mut unsent = usize::from(pending.is_some());
    rx.close();
    while rx.try_recv().is_ok() {
        unsent += 1;
    }
    if unsent > 0 {
        tracing::warn!(endpoint = %endpoint, unsent, "transport closed with unsent messages");
    }
    tracing::debug!(endpoint = %endpoint, "transport writer stopped");
}
