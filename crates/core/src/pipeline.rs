//! 파이프라인 trait — 생명주기와 전송 계층 확장 포인트 정의

use std::fmt;
use std::future::Future;

use bytes::Bytes;

use crate::error::{ExportError, TransportError};

/// 모듈 건강 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// 정상
    Healthy,
    /// 동작하지만 주의 필요 (사유 포함)
    Degraded(String),
    /// 동작 불가 (사유 포함)
    Unhealthy(String),
}

impl HealthStatus {
    /// 정상 상태인지 확인합니다.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// 저하 상태인지 확인합니다.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }

    /// 비정상 상태인지 확인합니다.
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded(reason) => write!(f, "degraded: {reason}"),
            Self::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
        }
    }
}

/// 시작/정지/헬스 체크 생명주기를 가진 모듈
pub trait Pipeline: Send {
    /// 모듈을 시작합니다.
    fn start(&mut self) -> impl Future<Output = Result<(), ExportError>> + Send;

    /// 모듈을 정지합니다. 남은 이벤트는 best-effort로 내보냅니다.
    fn stop(&mut self) -> impl Future<Output = Result<(), ExportError>> + Send;

    /// 모듈의 건강 상태를 확인합니다.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}

/// 논블로킹 전송 결과
#[derive(Debug)]
pub enum SendOutcome {
    /// 전송 큐에 들어감
    Sent,
    /// 전송 큐가 가득 참 — 나중에 다시 시도
    WouldBlock,
    /// 이 메시지에 한정된 실패
    Error(TransportError),
}

impl SendOutcome {
    /// 메트릭/로그용 결과 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::WouldBlock => "would_block",
            Self::Error(_) => "error",
        }
    }
}

/// 논블로킹 메시지 전송 계층
///
/// 새로운 전송 방식을 지원하려면 이 trait을 구현합니다.
/// `send_nonblocking`은 피어를 기다리지 않고 즉시 반환해야 합니다.
/// 패킷 처리 스레드에서 호출되기 때문입니다.
pub trait Transport: Send {
    /// 메시지 하나를 전송 큐에 넣습니다.
    fn send_nonblocking(&mut self, message: &Bytes) -> SendOutcome;

    /// 전송 계층을 닫습니다. 두 번째 호출부터는 아무 일도 하지 않습니다.
    fn close(&mut self);
}
