//! UDP 작성기 -- 메시지 하나를 데이터그램 하나로 전송
//!
//! 데이터그램은 재전송하지 않습니다. 기록에 실패한 메시지는 버려집니다.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use evexport_core::metrics as m;

use super::{Endpoint, TransportOptions};

/// IPv4/IPv6 UDP 페이로드 최대 크기
pub(crate) const MAX_DATAGRAM_LEN: usize = 65_507;

async fn bind_and_connect(endpoint: &Endpoint) -> std::io::Result<UdpSocket> {
    let peer: SocketAddr = tokio::net::lookup_host((endpoint.host(), endpoint.port()))
        .await?
        .next()
        .ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "endpoint host did not resolve")
        })?;

    let local = if peer.is_ipv6() {
        SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
    } else {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
    };

    let socket = UdpSocket::bind(local).await?;
    socket.connect(peer).await?;
    Ok(socket)
}

async fn connect_with_retry(endpoint: &Endpoint, options: &TransportOptions) -> UdpSocket {
    let mut attempts: u64 = 0;
    loop {
        match bind_and_connect(endpoint).await {
            Ok(socket) => {
                metrics::counter!(m::TRANSPORT_CONNECTS_TOTAL, m::LABEL_SCHEME => "udp")
                    .increment(1);
                tracing::info!(endpoint = %endpoint, attempts, "transport connected");
                return socket;
            }
            Err(e) => {
                attempts += 1;
                if attempts == 1 {
                    tracing::warn!(endpoint = %endpoint, error = %e, "transport setup failed, retrying");
                }
                tokio::time::sleep(options.reconnect_interval).await;
            }
        }
    }
}

/// 송신 큐를 읽어 UDP 데이터그램으로 보내는 작성기 태스크
pub(crate) async fn run_writer(
    endpoint: Endpoint,
    mut rx: mpsc::Receiver<Bytes>,
    closing: CancellationToken,
    options: TransportOptions,
) {
    let linger_deadline = async {
        closing.cancelled().await;
        tokio::time::sleep(options.linger).await;
    };
    tokio::pin!(linger_deadline);

    let mut socket: Option<UdpSocket> = None;

    loop {
        let message = tokio::select! {
            received = rx.recv() => match received {
                Some(message) => message,
                None => break,
            },
            () = &mut linger_deadline => break,
        };

        if message.len() > MAX_DATAGRAM_LEN {
            tracing::warn!(len = message.len(), "dropping message larger than a datagram");
            metrics::counter!(m::TRANSPORT_WRITE_ERRORS_TOTAL, m::LABEL_SCHEME => "udp")
                .increment(1);
            continue;
        }

        if socket.is_none() {
            let connected = tokio::select! {
                connected = connect_with_retry(&endpoint, &options) => connected,
                () = &mut linger_deadline => break,
            };
            socket = Some(connected);
        }
        let Some(connected) = socket.as_ref() else {
            continue;
        };

        match connected.send(&message).await {
            Ok(_) => {
                metrics::counter!(m::TRANSPORT_MESSAGES_WRITTEN_TOTAL, m::LABEL_SCHEME => "udp")
                    .increment(1);
            }
            // 피어 포트가 닫혀 있으면 ICMP 응답으로 다음 send가 실패할 수 있음
            Err(e) => {
                tracing::debug!(endpoint = %endpoint, error = %e, "datagram send failed");
                metrics::counter!(m::TRANSPORT_WRITE_ERRORS_TOTAL, m::LABEL_SCHEME => "udp")
                    .increment(1);
            }
        }
    }

    tracing::debug!(endpoint = %endpoint, "transport writer stopped");
}
