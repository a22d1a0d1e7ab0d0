//! 이벤트 직렬화 -- [`Event`]를 한 줄짜리 JSON 메시지로 변환
//!
//! 알림과 플로우는 서로 다른 키 집합을 가집니다. 값이 없는 선택 필드는
//! `null`로 쓰지 않고 키 자체를 생략합니다. `timestamp`는 유닉스 에포크
//! 기준 밀리초이며 [`Clock`]에서 가져옵니다.

use std::net::IpAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use serde::Serialize;

use evexport_core::error::SerializeError;
use evexport_core::event::{Event, EventType};
use evexport_core::types::{Action, FlowRecord, FlowState, PacketRecord, Severity, Verdict};

/// 직렬화 시각을 제공하는 시계
pub trait Clock: Send + Sync {
    /// 유닉스 에포크 기준 현재 시각 (밀리초)
    fn now_millis(&self) -> u64;
}

/// 시스템 벽시계
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}

/// 항상 같은 시각을 반환하는 시계 (테스트/재현용)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        self.0
    }
}

#[derive(Serialize)]
struct AlertMessage<'a> {
    #[serde(rename = "type")]
    kind: EventType,
    timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    src_ip: Option<&'a IpAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dst_ip: Option<&'a IpAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ip_proto: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    src_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dst_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tcp_flags: Option<u8>,
    packet_length: u32,
    action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    verdict: Option<Verdict>,
    severity: Severity,
}

impl<'a> AlertMessage<'a> {
    fn new(packet: &'a PacketRecord, timestamp: u64) -> Self {
        Self {
            kind: EventType::Alert,
            timestamp,
            src_ip: packet.src_ip.as_ref(),
            dst_ip: packet.dst_ip.as_ref(),
            ip_proto: packet.ip_proto,
            src_port: packet.src_port,
            dst_port: packet.dst_port,
            tcp_flags: packet.tcp_flags,
            packet_length: packet.length,
            action: packet.action,
            verdict: packet.verdict,
            severity: packet.severity,
        }
    }
}

#[derive(Serialize)]
struct FlowMessage<'a> {
    #[serde(rename = "type")]
    kind: EventType,
    timestamp: u64,
    src_ip: &'a IpAddr,
    dst_ip: &'a IpAddr,
    src_port: u16,
    dst_port: u16,
    protocol: u8,
    flow_state: FlowState,
    session_flags: u32,
    packets_to_server: u64,
    packets_to_client: u64,
    bytes_to_server: u64,
    bytes_to_client: u64,
}

impl<'a> FlowMessage<'a> {
    // 클라이언트가 출발지, 서버가 목적지
    fn new(flow: &'a FlowRecord, timestamp: u64) -> Self {
        Self {
            kind: EventType::Flow,
            timestamp,
            src_ip: &flow.client_ip,
            dst_ip: &flow.server_ip,
            src_port: flow.client_port,
            dst_port: flow.server_port,
            protocol: flow.protocol,
            flow_state: flow.state,
            session_flags: flow.session_flags,
            packets_to_server: flow.client_packets,
            packets_to_client: flow.server_packets,
            bytes_to_server: flow.client_bytes,
            bytes_to_client: flow.server_bytes,
        }
    }
}

/// 이벤트를 JSON 메시지 하나로 직렬화합니다.
pub fn serialize(event: &Event, clock: &dyn Clock) -> Result<Bytes, SerializeError> {
    let timestamp = clock.now_millis();
    let encoded = match event {
        Event::Alert(packet) => serde_json::to_vec(&AlertMessage::new(packet, timestamp))?,
        Event::Flow(flow) => serde_json::to_vec(&FlowMessage::new(flow, timestamp))?,
    };
    Ok(Bytes::from(encoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn tcp_alert() -> PacketRecord {
        PacketRecord {
            src_ip: Some("192.168.1.10".parse().unwrap()),
            dst_ip: Some("10.0.0.1".parse().unwrap()),
            ip_proto: Some(6),
            src_port: Some(51514),
            dst_port: Some(443),
            tcp_flags: Some(0x12),
            length: 60,
            action: Action::Drop,
            verdict: Some(Verdict::Force),
            severity: Severity::High,
        }
    }

    fn inspected_flow() -> FlowRecord {
        FlowRecord {
            client_ip: "192.168.1.10".parse().unwrap(),
            server_ip: "10.0.0.1".parse().unwrap(),
            client_port: 51514,
            server_port: 443,
            protocol: 6,
            state: FlowState::Inspect,
            session_flags: 0x0400,
            client_packets: 12,
            server_packets: 9,
            client_bytes: 1_400,
            server_bytes: 9_800,
        }
    }

    fn to_json(event: &Event) -> Value {
        let bytes = serialize(event, &FixedClock(1_700_000_000_123)).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn alert_contains_all_present_fields() {
        let json = to_json(&Event::Alert(tcp_alert()));

        assert_eq!(json["type"], "alert");
        assert_eq!(json["timestamp"], 1_700_000_000_123u64);
        assert_eq!(json["src_ip"], "192.168.1.10");
        assert_eq!(json["dst_ip"], "10.0.0.1");
        assert_eq!(json["ip_proto"], 6);
        assert_eq!(json["src_port"], 51514);
        assert_eq!(json["dst_port"], 443);
        assert_eq!(json["tcp_flags"], 0x12);
        assert_eq!(json["packet_length"], 60);
        assert_eq!(json["action"], "drop");
        assert_eq!(json["verdict"], "force");
        assert_eq!(json["severity"], "high");
    }

    #[test]
    fn alert_without_ip_layer_omits_address_keys() {
        let packet = PacketRecord {
            length: 42,
            action: Action::Block,
            ..Default::default()
        };
        let json = to_json(&Event::Alert(packet));
        let object = json.as_object().unwrap();

        for key in ["src_ip", "dst_ip", "ip_proto", "src_port", "dst_port", "tcp_flags", "verdict"] {
            assert!(!object.contains_key(key), "unexpected key {key}");
        }
        assert_eq!(json["packet_length"], 42);
        assert_eq!(json["action"], "block");
    }

    #[test]
    fn udp_alert_has_ports_but_no_tcp_flags() {
        let packet = PacketRecord {
            ip_proto: Some(17),
            tcp_flags: None,
            ..tcp_alert()
        };
        let json = to_json(&Event::Alert(packet));
        assert_eq!(json["src_port"], 51514);
        assert!(json.get("tcp_flags").is_none());
    }

    #[test]
    fn flow_maps_client_to_source() {
        let json = to_json(&Event::Flow(inspected_flow()));

        assert_eq!(json["type"], "flow");
        assert_eq!(json["src_ip"], "192.168.1.10");
        assert_eq!(json["dst_ip"], "10.0.0.1");
        assert_eq!(json["src_port"], 51514);
        assert_eq!(json["dst_port"], 443);
        assert_eq!(json["protocol"], 6);
        assert_eq!(json["flow_state"], "inspect");
        assert_eq!(json["session_flags"], 0x0400);
        assert_eq!(json["packets_to_server"], 12);
        assert_eq!(json["packets_to_client"], 9);
        assert_eq!(json["bytes_to_server"], 1_400);
        assert_eq!(json["bytes_to_client"], 9_800);
        assert!(json.get("severity").is_none());
    }

    #[test]
    fn ipv6_addresses_are_rendered() {
        let flow = FlowRecord {
            client_ip: "2001:db8::1".parse().unwrap(),
            server_ip: "2001:db8::2".parse().unwrap(),
            ..inspected_flow()
        };
        let json = to_json(&Event::Flow(flow));
        assert_eq!(json["src_ip"], "2001:db8::1");
    }

    #[test]
    fn message_is_single_line() {
        let bytes = serialize(&Event::Alert(tcp_alert()), &SystemClock).unwrap();
        assert!(!bytes.contains(&b'\n'));
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now_millis() > 1_577_836_800_000);
    }
}
