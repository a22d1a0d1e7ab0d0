//! 익스포트 카운터와 통계 스냅샷

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use evexport_core::metrics as m;

/// 전송/드롭 누적 카운터
///
/// 익스포터 작업 태스크가 기록하고, 서비스 핸들과 데몬이 동시에 읽습니다.
/// 단조 증가만 하며 초기화하지 않습니다.
#[derive(Debug, Default)]
pub struct ExportCounters {
    events_sent: AtomicU64,
    events_dropped: AtomicU64,
}

impl ExportCounters {
    /// 0으로 시작하는 카운터를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 전송 계층이 받아들인 이벤트 하나를 기록합니다.
    pub fn record_sent(&self) {
        self.events_sent.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(m::EXPORTER_EVENTS_SENT_TOTAL).increment(1);
    }

    /// 드롭된 이벤트를 사유와 함께 기록합니다.
    pub fn record_dropped(&self, reason: &'static str, count: u64) {
        if count == 0 {
            return;
        }
        self.events_dropped.fetch_add(count, Ordering::Relaxed);
        metrics::counter!(m::EXPORTER_EVENTS_DROPPED_TOTAL, m::LABEL_REASON => reason)
            .increment(count);
    }

    /// 지금까지 전송된 이벤트 수
    pub fn events_sent(&self) -> u64 {
        self.events_sent.load(Ordering::Relaxed)
    }

    /// 지금까지 드롭된 이벤트 수
    pub fn events_dropped(&self) -> u64 {
        self.events_dropped.load(Ordering::Relaxed)
    }
}

/// 익스포터 생명주기 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// 생성됨, 아직 연결 전
    Unconfigured,
    /// 버퍼와 전송 계층이 준비됨
    Ready,
    /// 전송 계층 연결 실패
    Failed,
    /// 종료됨
    Closed,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Closed => "closed",
        }
    }
}

/// 특정 시점의 익스포터 통계
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportStats {
    pub state: LifecycleState,
    pub events_sent: u64,
    pub events_dropped: u64,
    pub buffered: usize,
    pub capacity: usize,
}

impl ExportStats {
    /// 버퍼 사용률 (0.0~1.0). 용량이 없으면 0.0입니다.
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        f64::from(u32::try_from(self.buffered).unwrap_or(u32::MAX))
            / f64::from(u32::try_from(self.capacity).unwrap_or(u32::MAX))
    }
}
