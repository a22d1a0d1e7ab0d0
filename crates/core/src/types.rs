//! 도메인 타입 — 호스트 검사 엔진이 전달하는 레코드
//!
//! 호스트 엔진(패킷/플로우 추출)은 외부 협력자이며, 익스포터는
//! 여기 정의된 필드만 소비합니다. 모든 레코드는 JSON으로 역직렬화할 수 있어
//! 데몬이 NDJSON 스트림으로 호스트 이벤트를 받을 수 있습니다.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// 심각도 레벨
///
/// `Ord` 구현으로 최소 심각도 비교가 가능합니다 (`Low < Medium < High < Critical`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// 낮은 심각도
    #[default]
    Low,
    /// 중간 심각도
    Medium,
    /// 높은 심각도
    High,
    /// 치명적 — 즉시 대응 필요
    Critical,
}

impl Severity {
    /// 문자열에서 심각도를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }

    /// 소문자 이름 (설정 파일, 메트릭 레이블과 동일한 표기)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 호스트 엔진이 패킷에 적용한 능동 대응 액션
///
/// 선언 순서가 곧 강도 순서입니다. `Pass`보다 강한 액션이 붙은 패킷만
/// 알림 대상입니다.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// 통과
    #[default]
    Pass,
    /// 보류
    Hold,
    /// 재시도
    Retry,
    /// 재작성
    Rewrite,
    /// 드롭
    Drop,
    /// 차단
    Block,
    /// 세션 리셋
    Reset,
}

/// 능동 대응의 실행 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// 허용됨
    Allow,
    /// 실행할 수 없었음
    Cant,
    /// 인라인 모드였다면 실행되었을 것
    Would,
    /// 강제 실행됨
    Force,
}

/// 플로우 상태
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowState {
    /// 세션 수립 중
    #[default]
    Setup,
    /// 검사 중 — 익스포트 대상
    Inspect,
    /// 차단됨
    Block,
    /// 리셋됨
    Reset,
    /// 검사 없이 허용됨
    Allow,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Setup => "setup",
            Self::Inspect => "inspect",
            Self::Block => "block",
            Self::Reset => "reset",
            Self::Allow => "allow",
        };
        f.write_str(name)
    }
}

/// 탐지 엔진이 넘겨준 단일 패킷 정보
///
/// IP 계층이 없는 패킷은 주소/프로토콜이 비어 있고, TCP/UDP가 아니면
/// 포트가 비어 있습니다. 비어 있는 필드는 직렬화 시 키 자체가 생략됩니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacketRecord {
    /// 출발지 IP
    pub src_ip: Option<IpAddr>,
    /// 목적지 IP
    pub dst_ip: Option<IpAddr>,
    /// IP 다음 계층 프로토콜 번호 (TCP=6, UDP=17 등)
    pub ip_proto: Option<u8>,
    /// 출발지 포트 (TCP/UDP)
    pub src_port: Option<u16>,
    /// 목적지 포트 (TCP/UDP)
    pub dst_port: Option<u16>,
    /// TCP 플래그 (TCP 전용)
    pub tcp_flags: Option<u8>,
    /// 패킷 길이 (바이트)
    pub length: u32,
    /// 적용된 액션
    pub action: Action,
    /// 액션 실행 결과 (능동 대응 컨텍스트가 있을 때만)
    pub verdict: Option<Verdict>,
    /// 매칭된 규칙의 심각도
    pub severity: Severity,
}

impl fmt::Display for PacketRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.src_ip, self.dst_ip) {
            (Some(src), Some(dst)) => write!(
                f,
                "{}:{} -> {}:{} len={} action={:?}",
                src,
                self.src_port.unwrap_or_default(),
                dst,
                self.dst_port.unwrap_or_default(),
                self.length,
                self.action,
            ),
            _ => write!(f, "non-ip len={} action={:?}", self.length, self.action),
        }
    }
}

/// 호스트 엔진이 추적 중인 플로우(세션) 정보
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRecord {
    /// 클라이언트 IP
    pub client_ip: IpAddr,
    /// 서버 IP
    pub server_ip: IpAddr,
    /// 클라이언트 포트
    #[serde(default)]
    pub client_port: u16,
    /// 서버 포트
    #[serde(default)]
    pub server_port: u16,
    /// 프로토콜 번호
    #[serde(default)]
    pub protocol: u8,
    /// 현재 플로우 상태
    #[serde(default)]
    pub state: FlowState,
    /// 세션 플래그 비트마스크
    #[serde(default)]
    pub session_flags: u32,
    /// 클라이언트 → 서버 패킷 수
    #[serde(default)]
    pub client_packets: u64,
    /// 서버 → 클라이언트 패킷 수
    #[serde(default)]
    pub server_packets: u64,
    /// 클라이언트 → 서버 바이트 수
    #[serde(default)]
    pub client_bytes: u64,
    /// 서버 → 클라이언트 바이트 수
    #[serde(default)]
    pub server_bytes: u64,
}

impl fmt::Display for FlowRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} <-> {}:{} proto={} state={}",
            self.client_ip,
            self.client_port,
            self.server_ip,
            self.server_port,
            self.protocol,
            self.state,
        )
    }
}

/// 호스트 엔진이 전달하는 원시 이벤트
///
/// 패킷 하나가 알림과 플로우 양쪽의 대상이 될 수 있으므로 두 필드를 모두
/// 가질 수 있습니다. 분류는 익스포터가 설정과 함께 판단합니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEvent {
    /// 검사된 패킷
    pub packet: Option<PacketRecord>,
    /// 패킷이 속한 플로우
    pub flow: Option<FlowRecord>,
}

impl RawEvent {
    /// 패킷만 가진 원시 이벤트를 생성합니다.
    pub fn from_packet(packet: PacketRecord) -> Self {
        Self {
            packet: Some(packet),
            flow: None,
        }
    }

    /// 플로우만 가진 원시 이벤트를 생성합니다.
    pub fn from_flow(flow: FlowRecord) -> Self {
        Self {
            packet: None,
            flow: Some(flow),
        }
    }

    /// 알림 후보인지 확인합니다 (패킷에 `Pass`보다 강한 액션이 적용됨).
    pub fn alert_candidate(&self) -> Option<&PacketRecord> {
        self.packet.as_ref().filter(|p| p.action > Action::Pass)
    }

    /// 플로우 익스포트 후보인지 확인합니다 (플로우가 검사 상태).
    pub fn flow_candidate(&self) -> Option<&FlowRecord> {
        self.flow.as_ref().filter(|f| f.state == FlowState::Inspect)
    }
}
