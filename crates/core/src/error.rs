//! 에러 타입 — 도메인별 에러 정의
//!
//! 이벤트 경로(`on_event`, flush)의 실패는 카운터로 흡수되고 호출자에게
//! 전파되지 않습니다. 여기 정의된 에러는 초기화(설정, 전송 계층 연결)와
//! 생명주기 오용에서만 호출자에게 반환됩니다.

/// evexport 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 전송 계층 에러
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// 이벤트 직렬화 에러
    #[error("serialize error: {0}")]
    Serialize(#[from] SerializeError),

    /// 파이프라인 생명주기 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 전송 계층 에러
///
/// 연결 단계의 에러는 설정 에러와 동일하게 초기화를 실패시키고,
/// 전송 단계의 에러는 [`SendOutcome::Error`](crate::pipeline::SendOutcome::Error)로
/// 감싸져 항목 단위로 처리됩니다.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// 엔드포인트 형식 오류
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// 지원하지 않는 스킴
    #[error("unsupported endpoint scheme '{0}' (expected tcp or udp)")]
    UnsupportedScheme(String),

    /// 비동기 런타임 없이 연결 시도
    #[error("no async runtime available to drive the transport")]
    NoRuntime,

    /// 연결 실패
    #[error("connect to {endpoint} failed: {reason}")]
    Connect { endpoint: String, reason: String },

    /// 전송 채널이 닫힘
    #[error("transport closed")]
    Closed,

    /// 메시지 인코딩 실패
    #[error("message encoding failed: {0}")]
    Encode(String),
}

/// 이벤트 직렬화 에러
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    /// JSON 인코딩 실패
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// 파이프라인 생명주기 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 이미 실행 중
    #[error("pipeline is already running")]
    AlreadyRunning,

    /// 실행 중이 아님
    #[error("pipeline is not running")]
    NotRunning,

    /// 이미 설정됨 (configure는 생명주기당 한 번)
    #[error("exporter already configured (state: {state})")]
    AlreadyConfigured { state: String },

    /// 채널 전송 실패
    #[error("channel send failed: {0}")]
    ChannelSend(String),

    /// 채널 수신 실패
    #[error("channel receive failed: {0}")]
    ChannelRecv(String),

    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_export_error() {
        let err: ExportError = ConfigError::InvalidValue {
            field: "exporter.buffer_size".to_owned(),
            reason: "must be 100-100000".to_owned(),
        }
        .into();
        assert!(matches!(err, ExportError::Config(_)));
        assert!(err.to_string().contains("exporter.buffer_size"));
    }

    #[test]
    fn transport_error_display() {
        let err = TransportError::UnsupportedScheme("ipc".to_owned());
        assert!(err.to_string().contains("ipc"));

        let err = TransportError::Connect {
            endpoint: "tcp://127.0.0.1:5555".to_owned(),
            reason: "connection refused".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("127.0.0.1:5555"));
        assert!(msg.contains("refused"));
    }

    #[test]
    fn serialize_error_wraps_serde_json() {
        let json_err = serde_json::from_str::<u32>("not-a-number").unwrap_err();
        let err: ExportError = SerializeError::from(json_err).into();
        assert!(matches!(err, ExportError::Serialize(SerializeError::Json(_))));
    }

    #[test]
    fn pipeline_error_display() {
        let err = PipelineError::AlreadyConfigured {
            state: "ready".to_owned(),
        };
        assert!(err.to_string().contains("ready"));
    }
}
