//! evexport 공통 크레이트
//!
//! 호스트 검사 엔진이 전달하는 레코드 타입, 익스포트 이벤트, 에러 계층,
//! `evexport.toml` 설정, 메트릭 이름, 그리고 생명주기/전송 계층 trait을
//! 정의합니다. 실제 버퍼링과 전송은 `evexport-exporter`가 담당합니다.

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod pipeline;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, ExportError, PipelineError, SerializeError, TransportError};

// 설정
pub use config::{EvexportConfig, ExporterConfig, GeneralConfig, MetricsConfig};

// 이벤트
pub use event::{Event, EventType};

// 파이프라인 trait
pub use pipeline::{HealthStatus, Pipeline, SendOutcome, Transport};

// 도메인 타입
pub use types::{Action, FlowRecord, FlowState, PacketRecord, RawEvent, Severity, Verdict};
