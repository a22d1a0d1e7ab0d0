//! 익스포터 -- 분류, 게이팅, 버퍼링, 플러시를 묶는 동기 오케스트레이터
//!
//! [`Exporter`]는 호스트 검사 엔진의 이벤트 콜백에서 직접 호출되는 것을
//! 전제로 합니다. 어떤 호출도 블로킹하지 않으며 이벤트 경로의 실패는
//! 카운터로만 드러나고 호출자에게 전파되지 않습니다.
//!
//! # 생명주기
//! ```text
//! Unconfigured --configure()--> Ready --terminate()--> Closed
//!       |
//!       +--configure() 실패--> Failed
//! ```
//! `Ready`가 아닌 상태에서 들어온 이벤트는 조용히 무시됩니다.

use std::sync::Arc;
use std::time::Instant;

use evexport_core::config::ExporterConfig;
use evexport_core::error::{ExportError, PipelineError};
use evexport_core::event::Event;
use evexport_core::metrics as m;
use evexport_core::pipeline::Transport;
use evexport_core::types::RawEvent;

use crate::buffer::EventBuffer;
use crate::flush::{FlushReason, FlushReport, FlushTrigger, flush_buffer};
use crate::serializer::{self, Clock, SystemClock};
use crate::stats::{ExportCounters, ExportStats, LifecycleState};
use crate::transport::Connector;

/// 준비 상태에서만 존재하는 버퍼/전송 계층 묶음
struct Session<T: Transport> {
    buffer: EventBuffer,
    trigger: FlushTrigger,
    transport: T,
}

impl<T: Transport> Session<T> {
    fn new(transport: T, capacity: usize) -> Self {
        let buffer = EventBuffer::new(capacity);
        let trigger = FlushTrigger::for_capacity(buffer.capacity());
        Self {
            buffer,
            trigger,
            transport,
        }
    }

    fn enqueue(&mut self, event: &Event, clock: &dyn Clock, counters: &ExportCounters) {
        let payload = match serializer::serialize(event, clock) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(event_type = %event.event_type(), error = %e, "failed to serialize event");
                counters.record_dropped(m::REASON_SERIALIZE_ERROR, 1);
                return;
            }
        };

        let outcome = self.buffer.push(payload);
        counters.record_dropped(m::REASON_EVICTED, outcome.evicted);
        metrics::counter!(
            m::EXPORTER_EVENTS_ENQUEUED_TOTAL,
            m::LABEL_EVENT_TYPE => event.event_type().as_str()
        )
        .increment(1);

        if self.trigger.should_flush(self.buffer.len()) {
            self.flush(FlushReason::Threshold, counters);
        } else {
            self.record_occupancy();
        }
    }

    fn flush(&mut self, reason: FlushReason, counters: &ExportCounters) -> FlushReport {
        let start = Instant::now();
        let report = flush_buffer(&mut self.buffer, &mut self.transport, counters);

        metrics::histogram!(m::EXPORTER_FLUSH_DURATION_SECONDS)
            .record(start.elapsed().as_secs_f64());
        metrics::counter!(m::EXPORTER_FLUSHES_TOTAL, m::LABEL_TRIGGER => reason.as_str())
            .increment(1);
        self.record_occupancy();

        if report.blocked {
            tracing::debug!(
                trigger = reason.as_str(),
                sent = report.sent,
                remaining = report.remaining,
                "transport queue full, flush deferred"
            );
        }
        report
    }

    fn record_occupancy(&self) {
        let occupancy = f64::from(u32::try_from(self.buffer.len()).unwrap_or(u32::MAX));
        metrics::gauge!(m::EXPORTER_BUFFER_SIZE).set(occupancy);
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        self.transport.close();
    }
}

enum State<T: Transport> {
    Unconfigured,
    Ready(Session<T>),
    Failed,
    Closed,
}

impl<T: Transport> State<T> {
    fn lifecycle(&self) -> LifecycleState {
        match self {
            Self::Unconfigured => LifecycleState::Unconfigured,
            Self::Ready(_) => LifecycleState::Ready,
            Self::Failed => LifecycleState::Failed,
            Self::Closed => LifecycleState::Closed,
        }
    }
}

/// 이벤트 익스포터
///
/// # 사용 예시
/// ```ignore
/// let mut exporter = Exporter::new(config);
/// exporter.configure(&SocketConnector::new())?;
/// exporter.on_event(&raw_event);
/// exporter.terminate();
/// ```
pub struct Exporter<T: Transport> {
    config: ExporterConfig,
    state: State<T>,
    counters: Arc<ExportCounters>,
    clock: Arc<dyn Clock>,
}

impl<T: Transport> Exporter<T> {
    /// 설정만 가진 미구성 익스포터를 생성합니다.
    pub fn new(config: ExporterConfig) -> Self {
        Self {
            config,
            state: State::Unconfigured,
            counters: Arc::new(ExportCounters::new()),
            clock: Arc::new(SystemClock),
        }
    }

    /// 직렬화 타임스탬프에 쓸 시계를 교체합니다.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// 외부와 공유할 카운터를 지정합니다.
    pub fn with_counters(mut self, counters: Arc<ExportCounters>) -> Self {
        self.counters = counters;
        self
    }

    /// 커넥터로 전송 계층을 열고 버퍼를 준비합니다.
    ///
    /// 연결에 실패하면 `Failed` 상태가 되고 이후 이벤트는 무시됩니다.
    /// 생명주기당 한 번만 호출할 수 있습니다.
    pub fn configure<C>(&mut self, connector: &C) -> Result<(), ExportError>
    where
        C: Connector<Transport = T>,
    {
        self.ensure_unconfigured()?;

        match connector.connect(&self.config) {
            Ok(transport) => {
                self.install(transport);
                Ok(())
            }
            Err(e) => {
                tracing::error!(endpoint = %self.config.endpoint, error = %e, "failed to open transport");
                self.state = State::Failed;
                Err(e.into())
            }
        }
    }

    /// 이미 열린 전송 계층으로 준비 상태가 됩니다.
    pub fn configure_with_transport(&mut self, transport: T) -> Result<(), ExportError> {
        self.ensure_unconfigured()?;
        self.install(transport);
        Ok(())
    }

    fn ensure_unconfigured(&self) -> Result<(), ExportError> {
        match self.state {
            State::Unconfigured => Ok(()),
            _ => Err(PipelineError::AlreadyConfigured {
                state: self.state.lifecycle().as_str().to_owned(),
            }
            .into()),
        }
    }

    fn install(&mut self, transport: T) {
        let session = Session::new(transport, self.config.buffer_size);
        tracing::info!(
            endpoint = %self.config.endpoint,
            capacity = session.buffer.capacity(),
            flush_threshold = session.trigger.threshold(),
            "exporter configured"
        );
        self.state = State::Ready(session);
    }

    /// 호스트 이벤트 하나를 처리합니다.
    ///
    /// 알림 후보(`Pass`보다 강한 액션)는 `export_alerts`와 최소 심각도를 통과하면,
    /// 플로우 후보(검사 상태)는 `export_flows`가 켜져 있으면 익스포트됩니다.
    /// 하나의 원시 이벤트에서 알림과 플로우가 모두 나올 수 있으며 알림이 먼저입니다.
    pub fn on_event(&mut self, raw: &RawEvent) {
        let State::Ready(session) = &mut self.state else {
            tracing::trace!("exporter not ready, ignoring event");
            return;
        };

        metrics::counter!(m::EXPORTER_EVENTS_RECEIVED_TOTAL).increment(1);

        if self.config.export_alerts {
            if let Some(packet) = raw.alert_candidate() {
                if packet.severity >= self.config.min_severity {
                    let event = Event::Alert(packet.clone());
                    session.enqueue(&event, self.clock.as_ref(), &self.counters);
                }
            }
        }

        if self.config.export_flows {
            if let Some(flow) = raw.flow_candidate() {
                let event = Event::Flow(flow.clone());
                session.enqueue(&event, self.clock.as_ref(), &self.counters);
            }
        }
    }

    /// 임계값과 무관하게 플러시합니다. 준비 상태가 아니면 `None`입니다.
    pub fn flush(&mut self) -> Option<FlushReport> {
        self.flush_with(FlushReason::Manual)
    }

    /// 계기를 지정해 플러시합니다.
    pub fn flush_with(&mut self, reason: FlushReason) -> Option<FlushReport> {
        match &mut self.state {
            State::Ready(session) => Some(session.flush(reason, &self.counters)),
            _ => None,
        }
    }

    /// 마지막으로 플러시한 뒤 전송 계층을 닫습니다.
    ///
    /// 준비 상태가 아니면 아무 일도 하지 않고 `None`을 반환합니다.
    /// 플러시 후에도 남은 이벤트는 버려집니다.
    pub fn terminate(&mut self) -> Option<FlushReport> {
        if !matches!(self.state, State::Ready(_)) {
            return None;
        }
        let State::Ready(mut session) = std::mem::replace(&mut self.state, State::Closed) else {
            return None;
        };

        let report = session.flush(FlushReason::Shutdown, &self.counters);
        if report.remaining > 0 {
            tracing::warn!(
                remaining = report.remaining,
                "discarding events still buffered at shutdown"
            );
        }
        session.transport.close();
        drop(session);

        tracing::info!(
            events_sent = self.counters.events_sent(),
            events_dropped = self.counters.events_dropped(),
            "exporter terminated"
        );
        Some(report)
    }

    /// 현재 통계 스냅샷
    pub fn stats(&self) -> ExportStats {
        let (buffered, capacity) = match &self.state {
            State::Ready(session) => (session.buffer.len(), session.buffer.capacity()),
            _ => (0, self.config.buffer_size),
        };
        ExportStats {
            state: self.state.lifecycle(),
            events_sent: self.counters.events_sent(),
            events_dropped: self.counters.events_dropped(),
            buffered,
            capacity,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state.lifecycle()
    }

    pub fn config(&self) -> &ExporterConfig {
        &self.config
    }

    /// 공유 카운터 핸들
    pub fn counters(&self) -> Arc<ExportCounters> {
        Arc::clone(&self.counters)
    }

    /// 설정과 누적 카운터를 로그로 남깁니다.
    pub fn show(&self) {
        let stats = self.stats();
        tracing::info!(
            endpoint = %self.config.endpoint,
            export_alerts = self.config.export_alerts,
            export_flows = self.config.export_flows,
            export_stats = self.config.export_stats,
            min_severity = %self.config.min_severity,
            buffer_size = self.config.buffer_size,
            flush_interval_ms = self.config.flush_interval_ms,
            "exporter configuration"
        );
        tracing::info!(
            state = stats.state.as_str(),
            events_sent = stats.events_sent,
            events_dropped = stats.events_dropped,
            buffered = stats.buffered,
            "exporter statistics"
        );
    }
}
