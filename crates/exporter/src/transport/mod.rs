//! 전송 계층 -- 논블로킹 메시지 큐와 백그라운드 소켓 작성기
//!
//! [`ChannelTransport`]는 유한 mpsc 채널을 송신 큐로 사용합니다.
//! `send_nonblocking`은 채널에 `try_send`만 하고 즉시 반환하며,
//! 실제 소켓 I/O는 별도 tokio 태스크가 수행합니다.
//!
//! # 큐 동작
//! - 채널 용량(high water mark)은 `buffer_size`와 같습니다.
//! - 채널이 가득 차면 `WouldBlock`을 반환합니다.
//! - 작성기가 종료되어 채널이 닫히면 `Error(Closed)`를 반환합니다.
//! - 피어가 없거나 연결이 끊겨도 채널이 가득 찰 때까지는 `Sent`입니다.
//!
//! # 종료
//! `close`는 송신측을 닫고 작성기에 종료를 알립니다. 작성기는 큐에 남은
//! 메시지를 최대 `linger` 동안 계속 내보낸 뒤 끝납니다.

pub mod endpoint;
mod tcp;
mod udp;

use std::time::Duration;

use bytes::Bytes;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use evexport_core::config::ExporterConfig;
use evexport_core::error::TransportError;
use evexport_core::pipeline::{SendOutcome, Transport};

pub use endpoint::{Endpoint, Scheme};

/// 전송 계층 동작 파라미터
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportOptions {
    /// 송신 큐 용량 (메시지 수)
    pub high_water_mark: usize,
    /// 연결 재시도 간격
    pub reconnect_interval: Duration,
    /// 종료 시 남은 메시지를 내보내는 최대 시간
    pub linger: Duration,
}

impl TransportOptions {
    /// 익스포터 설정에서 전송 파라미터를 만듭니다.
    pub fn from_config(config: &ExporterConfig) -> Self {
        Self {
            high_water_mark: config.buffer_size.max(1),
            reconnect_interval: Duration::from_millis(config.reconnect_interval_ms.max(1)),
            linger: Duration::from_millis(config.linger_ms),
        }
    }
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self::from_config(&ExporterConfig::default())
    }
}

/// 설정으로부터 전송 계층을 여는 팩토리
///
/// 익스포터는 이 trait을 통해서만 전송 계층을 생성하므로, 테스트에서는
/// 소켓 없이 동작하는 구현으로 교체할 수 있습니다.
pub trait Connector {
    /// 생성되는 전송 계층 타입
    type Transport: Transport + 'static;

    /// 전송 계층을 엽니다.
    fn connect(&self, config: &ExporterConfig) -> Result<Self::Transport, TransportError>;
}

/// `tcp://`, `udp://` 엔드포인트용 소켓 커넥터
///
/// 이 커넥터로 연 전송 계층의 작성기 태스크는 모두 내부 [`TaskTracker`]에
/// 등록됩니다. 복제본끼리 같은 트래커를 공유하므로, 프로세스 종료 전에
/// [`SocketConnector::wait_writers`]로 남은 메시지 배출을 기다릴 수 있습니다.
#[derive(Debug, Clone, Default)]
pub struct SocketConnector {
    writers: TaskTracker,
}

impl SocketConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 열린 작성기 태스크 수
    pub fn active_writers(&self) -> usize {
        self.writers.len()
    }

    /// 모든 작성기 태스크가 끝날 때까지 기다립니다.
    ///
    /// 작성기는 전송 계층이 닫힌 뒤 `linger` 안에 끝납니다.
    pub async fn wait_writers(&self) {
        self.writers.close();
        self.writers.wait().await;
    }
}

impl Connector for SocketConnector {
    type Transport = ChannelTransport;

    fn connect(&self, config: &ExporterConfig) -> Result<Self::Transport, TransportError> {
        let endpoint: Endpoint = config.endpoint.parse()?;
        ChannelTransport::open(
            endpoint,
            TransportOptions::from_config(config),
            &self.writers,
        )
    }
}

/// 유한 채널 + 백그라운드 작성기 기반 전송 계층
pub struct ChannelTransport {
    endpoint: Endpoint,
    tx: Option<mpsc::Sender<Bytes>>,
    closing: CancellationToken,
    writer: Option<JoinHandle<()>>,
}

impl ChannelTransport {
    /// 엔드포인트로 작성기 태스크를 띄웁니다.
    ///
    /// 실제 연결은 작성기가 백그라운드에서 수립하므로 피어가 아직 없어도
    /// 성공합니다. tokio 런타임 밖에서 호출하면 `NoRuntime`을 반환합니다.
    pub fn connect(endpoint: Endpoint, options: TransportOptions) -> Result<Self, TransportError> {
        Self::open(endpoint, options, &TaskTracker::new())
    }

    /// 작성기 태스크를 주어진 트래커에 등록하며 엽니다.
    pub fn open(
        endpoint: Endpoint,
        options: TransportOptions,
        tracker: &TaskTracker,
    ) -> Result<Self, TransportError> {
        let handle = Handle::try_current().map_err(|_| TransportError::NoRuntime)?;

        let (tx, rx) = mpsc::channel(options.high_water_mark.max(1));
        let closing = CancellationToken::new();

        let writer = match endpoint.scheme() {
            Scheme::Tcp => tracker.spawn_on(
                tcp::run_writer(endpoint.clone(), rx, closing.clone(), options),
                &handle,
            ),
            Scheme::Udp => tracker.spawn_on(
                udp::run_writer(endpoint.clone(), rx, closing.clone(), options),
                &handle,
            ),
        };

        tracing::info!(
            endpoint = %endpoint,
            high_water_mark = options.high_water_mark,
            "transport opened"
        );

        Ok(Self {
            endpoint,
            tx: Some(tx),
            closing,
            writer: Some(writer),
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// 닫힌 상태인지 확인합니다.
    pub fn is_closed(&self) -> bool {
        self.tx.is_none()
    }

    /// 닫은 뒤 작성기 태스크가 끝날 때까지 기다립니다.
    ///
    /// 작성기는 `linger` 안에 반드시 끝나므로 이 대기도 그 안에 끝납니다.
    pub async fn shutdown(mut self) {
        self.close();
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.await {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "transport writer task failed");
            }
        }
    }
}

impl Transport for ChannelTransport {
    fn send_nonblocking(&mut self, message: &Bytes) -> SendOutcome {
        let Some(tx) = self.tx.as_ref() else {
            return SendOutcome::Error(TransportError::Closed);
        };

        match tx.try_send(message.clone()) {
            Ok(()) => SendOutcome::Sent,
            Err(TrySendError::Full(_)) => SendOutcome::WouldBlock,
            Err(TrySendError::Closed(_)) => SendOutcome::Error(TransportError::Closed),
        }
    }

    fn close(&mut self) {
        if self.tx.take().is_some() {
            self.closing.cancel();
            tracing::debug!(endpoint = %self.endpoint, "transport closing");
        }
    }
}

impl Drop for ChannelTransport {
    fn drop(&mut self) {
        self.close();
    }
}
