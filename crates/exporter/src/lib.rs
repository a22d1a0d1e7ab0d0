//! # evexport-exporter
//!
//! 호스트 검사 엔진의 이벤트를 분류해 JSON으로 직렬화하고, 유한 버퍼에
//! 모았다가 논블로킹 전송 계층으로 내보내는 익스포트 엔진입니다.
//!
//! # 아키텍처
//! ```text
//! RawEvent -> classify/gate -> serialize -> EventBuffer -> flush -> Transport -> socket
//!                                            (drop oldest)  (len >= C/10)  (never blocks)
//! ```
//!
//! # 모듈 구성
//! - [`serializer`]: 알림/플로우 JSON 메시지 생성
//! - [`buffer`]: 가장 오래된 항목을 버리는 유한 FIFO 버퍼
//! - [`flush`]: 임계값 판단과 버퍼 배출
//! - [`transport`]: tcp/udp 엔드포인트용 논블로킹 전송 계층
//! - [`exporter`]: 생명주기와 이벤트 처리를 묶는 동기 오케스트레이터
//! - [`service`]: 비동기 호스트용 태스크 래퍼 (`Pipeline` 구현)
//! - [`stats`]: 전송/드롭 카운터와 통계 스냅샷

pub mod buffer;
pub mod exporter;
pub mod flush;
pub mod serializer;
pub mod service;
pub mod stats;
pub mod transport;

// 주요 타입 re-export
pub use buffer::{EventBuffer, PushOutcome};
pub use exporter::Exporter;
pub use flush::{FlushReason, FlushReport, FlushTrigger, flush_buffer};
pub use serializer::{Clock, FixedClock, SystemClock, serialize};
pub use service::{ExporterHandle, ExporterService, ExporterServiceBuilder};
pub use stats::{ExportCounters, ExportStats, LifecycleState};
pub use transport::{
    ChannelTransport, Connector, Endpoint, Scheme, SocketConnector, TransportOptions,
};
