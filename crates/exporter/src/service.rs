//! 익스포터 서비스 -- 비동기 호스트용 단일 소유 태스크 래퍼
//!
//! [`ExporterService`]는 core의 [`Pipeline`](evexport_core::pipeline::Pipeline)
//! trait을 구현하여 데몬에서 시작/정지/헬스 체크 생명주기로 관리됩니다.
//! [`Exporter`]는 태스크 하나가 독점 소유하며, 이벤트 제출, 주기 플러시,
//! 통계 조회는 모두 명령 채널을 거쳐 그 태스크 안에서 직렬로 실행됩니다.
//!
//! # 내부 아키텍처
//! ```text
//! ExporterHandle::submit --try_send--> mpsc --> exporter task --> Transport
//!                                                   ^
//!                                       flush interval tick
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use evexport_core::config::ExporterConfig;
use evexport_core::error::{ExportError, PipelineError};
use evexport_core::metrics as m;
use evexport_core::pipeline::{HealthStatus, Pipeline};
use evexport_core::types::RawEvent;

use crate::exporter::Exporter;
use crate::flush::{FlushReason, FlushReport};
use crate::serializer::{Clock, SystemClock};
use crate::stats::{ExportCounters, ExportStats};
use crate::transport::Connector;

/// 기본 명령 채널 용량
pub const DEFAULT_INGRESS_CAPACITY: usize = 4096;

/// 익스포터 태스크로 보내는 명령
enum Command {
    Event(RawEvent),
    Flush(oneshot::Sender<Option<FlushReport>>),
    Stats(oneshot::Sender<ExportStats>),
}

/// 서비스 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServiceState {
    Initialized,
    Running,
    Stopped,
    /// 전송 계층을 열지 못함. 재시작할 수 없습니다.
    Failed,
}

/// 서비스에 이벤트를 넣는 복제 가능한 핸들
///
/// `submit`은 절대 기다리지 않습니다. 명령 채널이 가득 차 있으면 이벤트를
/// 버리고 드롭 카운트를 올립니다.
#[derive(Clone)]
pub struct ExporterHandle {
    tx: mpsc::Sender<Command>,
    counters: Arc<ExportCounters>,
}

impl ExporterHandle {
    /// 원시 이벤트를 제출합니다. 받아들여지면 `true`입니다.
    pub fn submit(&self, raw: RawEvent) -> bool {
        match self.tx.try_send(Command::Event(raw)) {
            Ok(()) => true,
            Err(_) => {
                self.counters.record_dropped(m::REASON_INGRESS_FULL, 1);
                false
            }
        }
    }

    /// 명령 채널에 자리가 날 때까지 기다렸다가 제출합니다.
    ///
    /// 파일 재생처럼 생산자가 기다려도 되는 입력에서만 사용합니다.
    pub async fn submit_wait(&self, raw: RawEvent) -> Result<(), ExportError> {
        self.tx
            .send(Command::Event(raw))
            .await
            .map_err(|e| PipelineError::ChannelSend(e.to_string()).into())
    }

    /// 즉시 플러시를 요청하고 결과를 기다립니다.
    pub async fn flush(&self) -> Result<Option<FlushReport>, ExportError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Flush(reply_tx))
            .await
            .map_err(|e| PipelineError::ChannelSend(e.to_string()))?;
        reply_rx
            .await
            .map_err(|e| PipelineError::ChannelRecv(e.to_string()).into())
    }

    /// 익스포터 태스크에서 통계 스냅샷을 받아옵니다.
    pub async fn stats(&self) -> Result<ExportStats, ExportError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Stats(reply_tx))
            .await
            .map_err(|e| PipelineError::ChannelSend(e.to_string()))?;
        reply_rx
            .await
            .map_err(|e| PipelineError::ChannelRecv(e.to_string()).into())
    }

    /// 공유 카운터
    pub fn counters(&self) -> &ExportCounters {
        &self.counters
    }
}

/// 익스포터 태스크 본체
///
/// 취소되거나 모든 핸들이 사라지면 이미 받은 명령을 마저 처리한 뒤
/// 최종 플러시와 함께 익스포터를 닫고 마지막 통계를 반환합니다.
async fn run_exporter<T>(
    mut exporter: Exporter<T>,
    mut rx: mpsc::Receiver<Command>,
    cancel: CancellationToken,
    flush_interval: Duration,
) -> ExportStats
where
    T: evexport_core::pipeline::Transport,
{
    let mut ticker = tokio::time::interval(flush_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // 첫 tick은 즉시 완료되므로 소비
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                tracing::debug!("exporter task cancelled");
                break;
            }
            command = rx.recv() => {
                match command {
                    Some(command) => handle_command(&mut exporter, command),
                    None => {
                        tracing::debug!("all exporter handles dropped");
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                exporter.flush_with(FlushReason::Interval);
            }
        }
    }

    rx.close();
    while let Ok(command) = rx.try_recv() {
        handle_command(&mut exporter, command);
    }

    exporter.terminate();
    exporter.show();
    exporter.stats()
}

fn handle_command<T>(exporter: &mut Exporter<T>, command: Command)
where
    T: evexport_core::pipeline::Transport,
{
    match command {
        Command::Event(raw) => exporter.on_event(&raw),
        Command::Flush(reply) => {
            // 요청자가 이미 떠났으면 결과는 버림
            let _ = reply.send(exporter.flush());
        }
        Command::Stats(reply) => {
            let _ = reply.send(exporter.stats());
        }
    }
}

/// 비동기 익스포터 서비스
///
/// # 사용 예시
/// ```ignore
/// let (mut service, handle) = ExporterServiceBuilder::new(SocketConnector::new())
///     .config(config.exporter.clone())
///     .build()?;
///
/// service.start().await?;
/// handle.submit(raw_event);
/// service.stop().await?;
/// ```
pub struct ExporterService<C: Connector> {
    config: ExporterConfig,
    connector: C,
    state: ServiceState,
    clock: Arc<dyn Clock>,
    counters: Arc<ExportCounters>,
    command_tx: mpsc::Sender<Command>,
    command_rx: Option<mpsc::Receiver<Command>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<ExportStats>>,
    final_stats: Option<ExportStats>,
}

impl<C: Connector> ExporterService<C> {
    pub fn state_name(&self) -> &str {
        match self.state {
            ServiceState::Initialized => "initialized",
            ServiceState::Running => "running",
            ServiceState::Stopped => "stopped",
            ServiceState::Failed => "failed",
        }
    }

    pub fn config(&self) -> &ExporterConfig {
        &self.config
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// 새 이벤트 제출 핸들을 만듭니다.
    pub fn handle(&self) -> ExporterHandle {
        ExporterHandle {
            tx: self.command_tx.clone(),
            counters: Arc::clone(&self.counters),
        }
    }

    /// 현재 통계. 실행 중이면 태스크에 조회하고, 정지 후에는 마지막 통계를 반환합니다.
    pub async fn stats(&self) -> Option<ExportStats> {
        match self.state {
            ServiceState::Running => self.handle().stats().await.ok(),
            ServiceState::Stopped | ServiceState::Failed => self.final_stats.clone(),
            ServiceState::Initialized => None,
        }
    }

    pub fn events_sent(&self) -> u64 {
        self.counters.events_sent()
    }

    pub fn events_dropped(&self) -> u64 {
        self.counters.events_dropped()
    }
}

impl<C> Pipeline for ExporterService<C>
where
    C: Connector + Send + Sync + 'static,
{
    async fn start(&mut self) -> Result<(), ExportError> {
        match self.state {
            ServiceState::Running => return Err(PipelineError::AlreadyRunning.into()),
            ServiceState::Stopped => {
                return Err(PipelineError::InitFailed(
                    "exporter service cannot be restarted".to_owned(),
                )
                .into());
            }
            ServiceState::Failed => {
                return Err(PipelineError::InitFailed(
                    "exporter service failed to configure and cannot be restarted".to_owned(),
                )
                .into());
            }
            ServiceState::Initialized => {}
        }

        tracing::info!(endpoint = %self.config.endpoint, "starting exporter service");

        let mut exporter = Exporter::new(self.config.clone())
            .with_clock(Arc::clone(&self.clock))
            .with_counters(Arc::clone(&self.counters));
        if let Err(e) = exporter.configure(&self.connector) {
            // 설정 실패는 영구적: 명령 채널을 닫아 이후 제출도 거부
            self.final_stats = Some(exporter.stats());
            self.command_rx = None;
            self.state = ServiceState::Failed;
            return Err(e);
        }
        exporter.show();

        let rx = self
            .command_rx
            .take()
            .ok_or_else(|| PipelineError::InitFailed("command channel missing".to_owned()))?;
        let flush_interval = Duration::from_millis(self.config.flush_interval_ms.max(1));

        self.task = Some(tokio::spawn(run_exporter(
            exporter,
            rx,
            self.cancel.clone(),
            flush_interval,
        )));

        self.state = ServiceState::Running;
        tracing::info!("exporter service started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), ExportError> {
        if self.state != ServiceState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        tracing::info!("stopping exporter service");
        self.cancel.cancel();

        if let Some(task) = self.task.take() {
            match task.await {
                Ok(stats) => self.final_stats = Some(stats),
                Err(e) => tracing::error!(error = %e, "exporter task failed"),
            }
        }

        self.state = ServiceState::Stopped;
        tracing::info!(
            events_sent = self.counters.events_sent(),
            events_dropped = self.counters.events_dropped(),
            "exporter service stopped"
        );
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            ServiceState::Running => match self.handle().stats().await {
                Ok(stats) => {
                    let utilization = stats.utilization();
                    if utilization > 0.9 {
                        HealthStatus::Degraded(format!(
                            "buffer utilization high: {:.1}%",
                            utilization * 100.0
                        ))
                    } else {
                        HealthStatus::Healthy
                    }
                }
                Err(e) => HealthStatus::Unhealthy(format!("exporter task unreachable: {e}")),
            },
            ServiceState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            ServiceState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
            ServiceState::Failed => {
                HealthStatus::Unhealthy("transport configuration failed".to_owned())
            }
        }
    }
}

/// 익스포터 서비스 빌더
pub struct ExporterServiceBuilder<C: Connector> {
    config: ExporterConfig,
    connector: C,
    ingress_capacity: usize,
    clock: Arc<dyn Clock>,
}

impl<C: Connector> ExporterServiceBuilder<C> {
    /// 커넥터로 새 빌더를 생성합니다.
    pub fn new(connector: C) -> Self {
        Self {
            config: ExporterConfig::default(),
            connector,
            ingress_capacity: DEFAULT_INGRESS_CAPACITY,
            clock: Arc::new(SystemClock),
        }
    }

    /// 익스포터 설정을 지정합니다.
    pub fn config(mut self, config: ExporterConfig) -> Self {
        self.config = config;
        self
    }

    /// 명령 채널 용량을 지정합니다.
    pub fn ingress_capacity(mut self, capacity: usize) -> Self {
        self.ingress_capacity = capacity;
        self
    }

    /// 직렬화 시계를 지정합니다.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// 서비스와 첫 제출 핸들을 빌드합니다.
    pub fn build(self) -> Result<(ExporterService<C>, ExporterHandle), ExportError> {
        if self.ingress_capacity == 0 {
            return Err(
                PipelineError::InitFailed("ingress capacity must be greater than 0".to_owned())
                    .into(),
            );
        }

        let (command_tx, command_rx) = mpsc::channel(self.ingress_capacity);
        let service = ExporterService {
            config: self.config,
            connector: self.connector,
            state: ServiceState::Initialized,
            clock: self.clock,
            counters: Arc::new(ExportCounters::new()),
            command_tx,
            command_rx: Some(command_rx),
            cancel: CancellationToken::new(),
            task: None,
            final_stats: None,
        };
        let handle = service.handle();

        Ok((service, handle))
    }
}
