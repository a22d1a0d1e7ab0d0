//! 이벤트 — 익스포트 단위
//!
//! [`Event`]는 분류와 게이팅을 통과한 뒤 직렬화를 기다리는 불변 레코드입니다.
//! 한 번 생성되어 한 번 소비됩니다.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{FlowRecord, PacketRecord, Severity};

// --- 이벤트 타입 상수 ---

/// 알림 이벤트 타입
pub const EVENT_TYPE_ALERT: &str = "alert";
/// 플로우 이벤트 타입
pub const EVENT_TYPE_FLOW: &str = "flow";
/// 통계 이벤트 타입 (설정상 예약, 생성되지 않음)
pub const EVENT_TYPE_STATS: &str = "stats";

/// 이벤트 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// 탐지 알림
    Alert,
    /// 플로우 스냅샷
    Flow,
    /// 통계 (예약)
    Stats,
}

impl EventType {
    /// 와이어 포맷의 `type` 값
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alert => EVENT_TYPE_ALERT,
            Self::Flow => EVENT_TYPE_FLOW,
            Self::Stats => EVENT_TYPE_STATS,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 익스포트 대상 이벤트
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// 알림 — 액션이 적용된 패킷
    Alert(PacketRecord),
    /// 플로우 — 검사 중인 세션
    Flow(FlowRecord),
}

impl Event {
    /// 이벤트 타입을 반환합니다.
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Alert(_) => EventType::Alert,
            Self::Flow(_) => EventType::Flow,
        }
    }

    /// 알림 이벤트의 심각도. 플로우는 심각도가 없습니다.
    pub fn severity(&self) -> Option<Severity> {
        match self {
            Self::Alert(packet) => Some(packet.severity),
            Self::Flow(_) => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alert(packet) => write!(f, "AlertEvent[{}] {}", packet.severity, packet),
            Self::Flow(flow) => write!(f, "FlowEvent {flow}"),
        }
    }
}
