//! 엔드포인트 문자열 파싱 (`tcp://host:port`, `udp://host:port`)

use std::fmt;
use std::str::FromStr;

use evexport_core::error::TransportError;

/// 지원하는 전송 스킴
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// 길이 접두 프레임을 쓰는 TCP 스트림
    Tcp,
    /// 메시지당 데이터그램 하나
    Udp,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 파싱된 전송 엔드포인트
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    scheme: Scheme,
    host: String,
    port: u16,
}

impl Endpoint {
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// 호스트 이름 또는 IP (IPv6는 대괄호 없이)
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| TransportError::InvalidEndpoint {
            endpoint: s.to_owned(),
            reason: reason.to_owned(),
        };

        let (scheme, rest) = s
            .trim()
            .split_once("://")
            .ok_or_else(|| invalid("missing scheme separator '://'"))?;

        let scheme = match scheme.to_ascii_lowercase().as_str() {
            "tcp" => Scheme::Tcp,
            "udp" => Scheme::Udp,
            other => return Err(TransportError::UnsupportedScheme(other.to_owned())),
        };

        let (host, port) = rest
            .rsplit_once(':')
            .ok_or_else(|| invalid("missing port"))?;

        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        if host.is_empty() {
            return Err(invalid("missing host"));
        }
        if host.contains(['[', ']']) {
            return Err(invalid("unbalanced brackets in host"));
        }
        if host == "*" {
            return Err(invalid("wildcard bind addresses are not supported"));
        }
        if host.contains(':') && !rest.starts_with('[') {
            return Err(invalid("IPv6 hosts must be enclosed in brackets"));
        }

        let port: u16 = port.parse().map_err(|_| invalid("port must be 1-65535"))?;
        if port == 0 {
            return Err(invalid("port must be 1-65535"));
        }

        Ok(Self {
            scheme,
            host: host.to_owned(),
            port,
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "{}://[{}]:{}", self.scheme, self.host, self.port)
        } else {
            write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
        }
    }
}
