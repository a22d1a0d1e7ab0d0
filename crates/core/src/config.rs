//! 설정 관리 — evexport.toml 파싱 및 런타임 설정
//!
//! [`EvexportConfig`]는 모든 섹션의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`EVEXPORT_EXPORTER_ENDPOINT=tcp://10.0.0.5:5555` 형식)
//! 3. 설정 파일 (`evexport.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), evexport_core::error::ExportError> {
//! use evexport_core::config::EvexportConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = EvexportConfig::load("evexport.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = EvexportConfig::parse("[exporter]\nbuffer_size = 500")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ExportError};
use crate::types::Severity;

/// 버퍼 용량 허용 범위
pub const BUFFER_SIZE_RANGE: std::ops::RangeInclusive<usize> = 100..=100_000;

/// 플러시 간격 허용 범위 (밀리초)
pub const FLUSH_INTERVAL_MS_RANGE: std::ops::RangeInclusive<u64> = 100..=10_000;

/// 기본 엔드포인트 (로컬 루프백)
pub const DEFAULT_ENDPOINT: &str = "tcp://127.0.0.1:5555";

/// evexport 통합 설정
///
/// `evexport.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvexportConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 익스포터 설정
    #[serde(default)]
    pub exporter: ExporterConfig,
    /// 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl EvexportConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ExportError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                ExportError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, ExportError> {
        toml::from_str(toml_str).map_err(|e| {
            ExportError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `EVEXPORT_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "EVEXPORT_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "EVEXPORT_GENERAL_LOG_FORMAT");

        // Exporter
        override_string(&mut self.exporter.endpoint, "EVEXPORT_EXPORTER_ENDPOINT");
        override_bool(
            &mut self.exporter.export_alerts,
            "EVEXPORT_EXPORTER_EXPORT_ALERTS",
        );
        override_bool(
            &mut self.exporter.export_flows,
            "EVEXPORT_EXPORTER_EXPORT_FLOWS",
        );
        override_bool(
            &mut self.exporter.export_stats,
            "EVEXPORT_EXPORTER_EXPORT_STATS",
        );
        override_severity(
            &mut self.exporter.min_severity,
            "EVEXPORT_EXPORTER_MIN_SEVERITY",
        );
        override_usize(
            &mut self.exporter.buffer_size,
            "EVEXPORT_EXPORTER_BUFFER_SIZE",
        );
        override_u64(
            &mut self.exporter.flush_interval_ms,
            "EVEXPORT_EXPORTER_FLUSH_INTERVAL_MS",
        );
        override_u64(
            &mut self.exporter.reconnect_interval_ms,
            "EVEXPORT_EXPORTER_RECONNECT_INTERVAL_MS",
        );
        override_u64(&mut self.exporter.linger_ms, "EVEXPORT_EXPORTER_LINGER_MS");

        // Metrics
        override_bool(&mut self.metrics.enabled, "EVEXPORT_METRICS_ENABLED");
        override_string(
            &mut self.metrics.listen_addr,
            "EVEXPORT_METRICS_LISTEN_ADDR",
        );
        override_u16(&mut self.metrics.port, "EVEXPORT_METRICS_PORT");
        override_string(&mut self.metrics.endpoint, "EVEXPORT_METRICS_ENDPOINT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ExportError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        self.exporter.validate()?;

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "metrics.port".to_owned(),
                reason: "port must be non-zero when metrics are enabled".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 익스포터 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    /// 전송 엔드포인트 (`tcp://host:port` 또는 `udp://host:port`)
    pub endpoint: String,
    /// 알림 이벤트 익스포트 여부
    pub export_alerts: bool,
    /// 플로우 이벤트 익스포트 여부
    pub export_flows: bool,
    /// 통계 이벤트 익스포트 여부 (예약, 익스포터는 사용하지 않음)
    pub export_stats: bool,
    /// 알림 최소 심각도
    pub min_severity: Severity,
    /// 버퍼 용량 (이벤트 수)
    pub buffer_size: usize,
    /// 주기적 플러시 간격 (밀리초)
    pub flush_interval_ms: u64,
    /// 연결 끊김 후 재연결 간격 (밀리초)
    pub reconnect_interval_ms: u64,
    /// 종료 시 전송 큐를 비우기 위해 기다리는 최대 시간 (밀리초)
    pub linger_ms: u64,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            export_alerts: true,
            export_flows: true,
            export_stats: false,
            min_severity: Severity::Low,
            buffer_size: 10_000,
            flush_interval_ms: 1_000,
            reconnect_interval_ms: 100,
            linger_ms: 1_000,
        }
    }
}

impl ExporterConfig {
    /// 익스포터 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "exporter.endpoint".to_owned(),
                reason: "endpoint must not be empty".to_owned(),
            });
        }

        if !BUFFER_SIZE_RANGE.contains(&self.buffer_size) {
            return Err(ConfigError::InvalidValue {
                field: "exporter.buffer_size".to_owned(),
                reason: format!(
                    "must be {}-{}",
                    BUFFER_SIZE_RANGE.start(),
                    BUFFER_SIZE_RANGE.end()
                ),
            });
        }

        if !FLUSH_INTERVAL_MS_RANGE.contains(&self.flush_interval_ms) {
            return Err(ConfigError::InvalidValue {
                field: "exporter.flush_interval_ms".to_owned(),
                reason: format!(
                    "must be {}-{}",
                    FLUSH_INTERVAL_MS_RANGE.start(),
                    FLUSH_INTERVAL_MS_RANGE.end()
                ),
            });
        }

        if self.reconnect_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "exporter.reconnect_interval_ms".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus 엔드포인트 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 바인드 포트
    pub port: u16,
    /// 스크레이프 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_severity(target: &mut Severity, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match Severity::from_str_loose(&val) {
            Some(parsed) => *target = parsed,
            None => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse severity from env var, ignoring"
            ),
        }
    }
}
