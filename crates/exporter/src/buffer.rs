//! 이벤트 버퍼 -- 직렬화된 이벤트의 유한 FIFO 큐
//!
//! [`EventBuffer`]는 직렬화가 끝난 이벤트를 전송 전까지 보관합니다.
//! 용량은 고정이며, 가득 찬 상태에서 새 이벤트가 들어오면 가장 오래된
//! 이벤트를 버리고 새 이벤트를 받습니다. 새 유입은 절대 거부하지 않습니다.
//!
//! 버퍼 자체는 동기화하지 않습니다. 소유자(익스포터)가 단일 생산자로서
//! 배타적으로 접근합니다.

use std::collections::VecDeque;

use bytes::Bytes;

/// `push` 한 번의 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushOutcome {
    /// 이번 push로 축출된 이벤트 수 (0 또는 1)
    pub evicted: u64,
}

impl PushOutcome {
    /// 축출이 발생했는지 확인합니다.
    pub fn evicted_any(&self) -> bool {
        self.evicted > 0
    }
}

/// 직렬화된 이벤트의 유한 버퍼
pub struct EventBuffer {
    /// 버퍼 내부 저장소 (앞쪽이 가장 오래된 이벤트)
    buffer: VecDeque<Bytes>,
    /// 최대 용량
    capacity: usize,
    /// 축출된 이벤트 카운터
    evicted_count: u64,
    /// 총 유입 이벤트 카운터
    total_received: u64,
}

impl EventBuffer {
    /// 새 이벤트 버퍼를 생성합니다.
    ///
    /// 용량이 0이면 1로 올려 잡습니다. 빈 버퍼는 어떤 이벤트도 보관할 수 없기 때문입니다.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: VecDeque::with_capacity(capacity.min(10_000)),
            capacity,
            evicted_count: 0,
            total_received: 0,
        }
    }

    /// 이벤트를 버퍼 끝에 추가합니다.
    ///
    /// 버퍼가 가득 차 있으면 가장 오래된 이벤트를 먼저 버립니다.
    /// 호출 후 `len() <= capacity()`가 항상 성립합니다.
    pub fn push(&mut self, payload: Bytes) -> PushOutcome {
        self.total_received += 1;

        let mut outcome = PushOutcome::default();
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
            self.evicted_count += 1;
            outcome.evicted = 1;
            tracing::debug!(
                evicted = self.evicted_count,
                capacity = self.capacity,
                "buffer full, evicted oldest event"
            );
        }

        self.buffer.push_back(payload);
        outcome
    }

    /// 가장 오래된 이벤트를 제거하지 않고 참조합니다.
    pub fn front(&self) -> Option<&Bytes> {
        self.buffer.front()
    }

    /// 가장 오래된 이벤트를 꺼냅니다.
    pub fn pop_front(&mut self) -> Option<Bytes> {
        self.buffer.pop_front()
    }

    /// 버퍼의 이벤트를 오래된 순서로 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = &Bytes> {
        self.buffer.iter()
    }

    /// 버퍼의 모든 이벤트를 버리고 버린 개수를 반환합니다.
    pub fn clear(&mut self) -> usize {
        let discarded = self.buffer.len();
        self.buffer.clear();
        discarded
    }

    /// 현재 버퍼에 저장된 이벤트 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// 버퍼가 비어있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// 버퍼 최대 용량을 반환합니다.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 지금까지 축출된 이벤트 수를 반환합니다.
    pub fn evicted_count(&self) -> u64 {
        self.evicted_count
    }

    /// 총 유입 이벤트 수를 반환합니다.
    pub fn total_received(&self) -> u64 {
        self.total_received
    }

    /// 버퍼 사용률을 0.0~1.0 범위로 반환합니다.
    pub fn utilization(&self) -> f64 {
        f64::from(u32::try_from(self.buffer.len()).unwrap_or(u32::MAX))
            / f64::from(u32::try_from(self.capacity).unwrap_or(u32::MAX))
    }
}
