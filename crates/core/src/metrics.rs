//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `evexport_`
//! - 컴포넌트명: `exporter_`, `transport_`, `source_`, `daemon_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 이벤트 타입 레이블 키 (alert, flow)
pub const LABEL_EVENT_TYPE: &str = "type";

/// 드롭 사유 레이블 키
pub const LABEL_REASON: &str = "reason";

/// 플러시 트리거 레이블 키 (threshold, interval, manual, shutdown)
pub const LABEL_TRIGGER: &str = "trigger";

/// 전송 스킴 레이블 키 (tcp, udp)
pub const LABEL_SCHEME: &str = "scheme";

// ─── 드롭 사유 값 ──────────────────────────────────────────────────

/// 버퍼가 가득 차서 가장 오래된 이벤트를 축출함
pub const REASON_EVICTED: &str = "evicted";
/// 전송 큐 포화로 플러시가 중단됨
pub const REASON_WOULD_BLOCK: &str = "would_block";
/// 전송 계층이 메시지 하나를 거부함
pub const REASON_SEND_ERROR: &str = "send_error";
/// 직렬화 실패
pub const REASON_SERIALIZE_ERROR: &str = "serialize_error";
/// 서비스 명령 채널이 가득 차거나 닫힘
pub const REASON_INGRESS_FULL: &str = "ingress_full";

// ─── Exporter 메트릭 ───────────────────────────────────────────────

/// Exporter: 수신한 원시 이벤트 수 (counter)
pub const EXPORTER_EVENTS_RECEIVED_TOTAL: &str = "evexport_exporter_events_received_total";

/// Exporter: 버퍼에 들어간 이벤트 수 (counter, label: type)
pub const EXPORTER_EVENTS_ENQUEUED_TOTAL: &str = "evexport_exporter_events_enqueued_total";

/// Exporter: 전송 계층에 넘긴 이벤트 수 (counter)
pub const EXPORTER_EVENTS_SENT_TOTAL: &str = "evexport_exporter_events_sent_total";

/// Exporter: 드롭된 이벤트 수 (counter, label: reason)
pub const EXPORTER_EVENTS_DROPPED_TOTAL: &str = "evexport_exporter_events_dropped_total";

/// Exporter: 현재 버퍼 점유 (gauge)
pub const EXPORTER_BUFFER_SIZE: &str = "evexport_exporter_buffer_size";

/// Exporter: 플러시 실행 수 (counter, label: trigger)
pub const EXPORTER_FLUSHES_TOTAL: &str = "evexport_exporter_flushes_total";

/// Exporter: 플러시 소요 시간 (histogram, 초)
pub const EXPORTER_FLUSH_DURATION_SECONDS: &str = "evexport_exporter_flush_duration_seconds";

// ─── Transport 메트릭 ──────────────────────────────────────────────

/// Transport: 소켓에 기록된 메시지 수 (counter, label: scheme)
pub const TRANSPORT_MESSAGES_WRITTEN_TOTAL: &str = "evexport_transport_messages_written_total";

/// Transport: 소켓 기록 실패 수 (counter, label: scheme)
pub const TRANSPORT_WRITE_ERRORS_TOTAL: &str = "evexport_transport_write_errors_total";

/// Transport: 연결 수립 횟수 (counter, label: scheme)
pub const TRANSPORT_CONNECTS_TOTAL: &str = "evexport_transport_connects_total";

// ─── Source 메트릭 ─────────────────────────────────────────────────

/// Source: 읽은 입력 라인 수 (counter)
pub const SOURCE_LINES_TOTAL: &str = "evexport_source_lines_total";

/// Source: 디코딩 실패 라인 수 (counter)
pub const SOURCE_DECODE_ERRORS_TOTAL: &str = "evexport_source_decode_errors_total";

// ─── Daemon 메트릭 ─────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "evexport_daemon_uptime_seconds";

/// Daemon: 빌드 정보 (gauge, 항상 1, labels: version)
pub const DAEMON_BUILD_INFO: &str = "evexport_daemon_build_info";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 플러시 소요 시간 히스토그램 버킷 (초)
///
/// 인라인 플러시는 생산자 스레드에서 실행되므로 10us ~ 100ms 범위에 집중합니다.
pub const FLUSH_DURATION_BUCKETS: [f64; 9] = [
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1,
];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 이 함수는 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Exporter
    describe_counter!(
        EXPORTER_EVENTS_RECEIVED_TOTAL,
        "Total number of raw host events received by the exporter"
    );
    describe_counter!(
        EXPORTER_EVENTS_ENQUEUED_TOTAL,
        "Total number of serialized events accepted into the buffer"
    );
    describe_counter!(
        EXPORTER_EVENTS_SENT_TOTAL,
        "Total number of events handed to the transport"
    );
    describe_counter!(
        EXPORTER_EVENTS_DROPPED_TOTAL,
        "Total number of events dropped, by reason"
    );
    describe_gauge!(
        EXPORTER_BUFFER_SIZE,
        "Current number of serialized events in the export buffer"
    );
    describe_counter!(EXPORTER_FLUSHES_TOTAL, "Total number of flushes, by trigger");
    describe_histogram!(
        EXPORTER_FLUSH_DURATION_SECONDS,
        "Time spent draining the buffer into the transport in seconds"
    );

    // Transport
    describe_counter!(
        TRANSPORT_MESSAGES_WRITTEN_TOTAL,
        "Total number of messages written to the socket"
    );
    describe_counter!(
        TRANSPORT_WRITE_ERRORS_TOTAL,
        "Total number of socket write failures"
    );
    describe_counter!(
        TRANSPORT_CONNECTS_TOTAL,
        "Total number of successful transport connections"
    );

    // Source
    describe_counter!(SOURCE_LINES_TOTAL, "Total number of host event lines read");
    describe_counter!(
        SOURCE_DECODE_ERRORS_TOTAL,
        "Total number of host event lines that failed to decode"
    );

    // Daemon
    describe_gauge!(DAEMON_UPTIME_SECONDS, "evexport daemon uptime in seconds");
    describe_gauge!(
        DAEMON_BUILD_INFO,
        "Build information (always 1, with version label)"
    );
}
