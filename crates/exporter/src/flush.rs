//! 플러시 -- 버퍼에서 전송 계층으로 이벤트 배출
//!
//! 임계값 규칙: 용량 `C`인 버퍼는 `len >= C / 10`(정수 나눗셈)이 되면
//! 플러시합니다. `C < 10`이면 임계값이 0이 되어 매 push마다 플러시합니다.
//!
//! 배출은 앞쪽부터 차례로 논블로킹 전송을 시도합니다.
//! - `Sent`: 전송 카운트 증가, 이벤트 제거, 계속
//! - `WouldBlock`: 드롭 카운트 증가, 이벤트를 그대로 둔 채 중단
//! - `Error`: 드롭 카운트 증가, 이벤트 제거, 계속

use evexport_core::metrics as m;
use evexport_core::pipeline::{SendOutcome, Transport};

use crate::buffer::EventBuffer;
use crate::stats::ExportCounters;

/// 임계값 계산에 쓰는 나눗셈 값
pub const FLUSH_THRESHOLD_DIVISOR: usize = 10;

/// 버퍼 점유에 따른 플러시 판단
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushTrigger {
    threshold: usize,
}

impl FlushTrigger {
    /// 버퍼 용량에서 임계값을 계산합니다.
    pub fn for_capacity(capacity: usize) -> Self {
        Self {
            threshold: capacity / FLUSH_THRESHOLD_DIVISOR,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// 현재 점유가 임계값 이상인지 확인합니다.
    pub fn should_flush(&self, len: usize) -> bool {
        len >= self.threshold
    }
}

/// 플러시를 일으킨 계기
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// push 직후 임계값 도달
    Threshold,
    /// 주기 타이머
    Interval,
    /// 외부 요청
    Manual,
    /// 종료 직전
    Shutdown,
}

impl FlushReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Threshold => "threshold",
            Self::Interval => "interval",
            Self::Manual => "manual",
            Self::Shutdown => "shutdown",
        }
    }
}

/// 플러시 한 번의 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// 전송 계층이 받아들인 이벤트 수
    pub sent: u64,
    /// 전송 계층이 거부해 버려진 이벤트 수
    pub failed: u64,
    /// 전송 큐 포화로 중단되었는지 여부
    pub blocked: bool,
    /// 플러시 후 버퍼에 남은 이벤트 수
    pub remaining: usize,
}

/// 버퍼를 앞쪽부터 전송 계층으로 배출합니다.
///
/// 전송 큐가 포화되면 즉시 멈추고 반환합니다. 막힌 이벤트는 버퍼 앞에 남아
/// 다음 플러시에서 다시 시도되며, 시도마다 드롭 카운트가 하나씩 늘어납니다.
pub fn flush_buffer<T>(
    buffer: &mut EventBuffer,
    transport: &mut T,
    counters: &ExportCounters,
) -> FlushReport
where
    T: Transport + ?Sized,
{
    let mut report = FlushReport::default();

    while let Some(front) = buffer.front() {
        let outcome = transport.send_nonblocking(front);
        match outcome {
            SendOutcome::Sent => {
                counters.record_sent();
                buffer.pop_front();
                report.sent += 1;
            }
            SendOutcome::WouldBlock => {
                counters.record_dropped(m::REASON_WOULD_BLOCK, 1);
                report.blocked = true;
                break;
            }
            SendOutcome::Error(e) => {
                tracing::warn!(error = %e, "transport rejected event, discarding");
                counters.record_dropped(m::REASON_SEND_ERROR, 1);
                buffer.pop_front();
                report.failed += 1;
            }
        }
    }

    report.remaining = buffer.len();
    report
}
