//! 설정 관리 — dockle-exporter.toml 파싱 및 런타임 설정
//!
//! [`ExporterConfig`]는 모든 구성 요소의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선, 데몬에서 적용)
//! 2. 환경변수 (`DOCKLE_EXPORTER_COLLECTOR_CONCURRENCY=4` 형식)
//! 3. 설정 파일 (`dockle-exporter.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), dockle_exporter_core::error::ExporterError> {
//! use dockle_exporter_core::config::ExporterConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = ExporterConfig::load("dockle-exporter.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = ExporterConfig::parse("[collector]\nconcurrency = 4")?;
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ExporterError};

/// 동시 스캔 최대 허용값
///
/// 실질적인 상한은 없으며, 세마포어가 표현할 수 있는 허가 수까지 허용합니다.
pub const MAX_CONCURRENCY: usize = tokio::sync::Semaphore::MAX_PERMITS;
/// 스캔 주기 최대값 (초, 하루)
pub const MAX_LOOP_INTERVAL_SECS: u64 = 86_400;
/// 단일 스캔 타임아웃 최대값 (초)
pub const MAX_SCAN_TIMEOUT_SECS: u64 = 3600;

/// dockle-exporter 통합 설정
///
/// `dockle-exporter.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 스캔 컬렉터 설정
    #[serde(default)]
    pub collector: CollectorConfig,
    /// 벤치마크 메트릭 API 설정
    #[serde(default)]
    pub api: ApiConfig,
    /// 자기 모니터링 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl ExporterConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ExporterError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ExporterError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ExporterError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                ExporterError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, ExporterError> {
        toml::from_str(toml_str).map_err(|e| {
            ExporterError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `DOCKLE_EXPORTER_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(
            &mut self.general.log_level,
            "DOCKLE_EXPORTER_GENERAL_LOG_LEVEL",
        );
        override_string(
            &mut self.general.log_format,
            "DOCKLE_EXPORTER_GENERAL_LOG_FORMAT",
        );

        // Collector
        override_usize(
            &mut self.collector.concurrency,
            "DOCKLE_EXPORTER_COLLECTOR_CONCURRENCY",
        );
        override_u64(
            &mut self.collector.loop_interval_secs,
            "DOCKLE_EXPORTER_COLLECTOR_LOOP_INTERVAL_SECS",
        );
        override_string(
            &mut self.collector.dockle_path,
            "DOCKLE_EXPORTER_COLLECTOR_DOCKLE_PATH",
        );
        override_u64(
            &mut self.collector.scan_timeout_secs,
            "DOCKLE_EXPORTER_COLLECTOR_SCAN_TIMEOUT_SECS",
        );
        override_string(
            &mut self.collector.docker_socket,
            "DOCKLE_EXPORTER_COLLECTOR_DOCKER_SOCKET",
        );

        // API
        override_string(&mut self.api.listen_addr, "DOCKLE_EXPORTER_API_LISTEN_ADDR");

        // Metrics
        override_bool(&mut self.metrics.enabled, "DOCKLE_EXPORTER_METRICS_ENABLED");
        override_string(
            &mut self.metrics.listen_addr,
            "DOCKLE_EXPORTER_METRICS_LISTEN_ADDR",
        );
        override_u16(&mut self.metrics.port, "DOCKLE_EXPORTER_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ExporterError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.collector.concurrency == 0 || self.collector.concurrency > MAX_CONCURRENCY {
            return Err(invalid(
                "collector.concurrency",
                "must be a positive integer".to_owned(),
            ));
        }

        if self.collector.loop_interval_secs == 0
            || self.collector.loop_interval_secs > MAX_LOOP_INTERVAL_SECS
        {
            return Err(invalid(
                "collector.loop_interval_secs",
                format!("must be 1-{MAX_LOOP_INTERVAL_SECS}"),
            ));
        }

        if self.collector.dockle_path.trim().is_empty() {
            return Err(invalid(
                "collector.dockle_path",
                "must not be empty".to_owned(),
            ));
        }

        // 0은 타임아웃 없음
        if self.collector.scan_timeout_secs > MAX_SCAN_TIMEOUT_SECS {
            return Err(invalid(
                "collector.scan_timeout_secs",
                format!("must be 0-{MAX_SCAN_TIMEOUT_SECS}"),
            ));
        }

        if self.api.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(invalid(
                "api.listen_addr",
                format!("'{}' is not a valid socket address", self.api.listen_addr),
            ));
        }

        if self.metrics.enabled {
            if self.metrics.endpoint != "/metrics" {
                return Err(invalid(
                    "metrics.endpoint",
                    "only '/metrics' is supported".to_owned(),
                ));
            }
            if self.metrics.port == 0 {
                return Err(invalid(
                    "metrics.port",
                    "must be greater than 0".to_owned(),
                ));
            }
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> ExporterError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
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

/// 스캔 컬렉터 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// 동시에 실행할 수 있는 dockle 프로세스 최대 수
    pub concurrency: usize,
    /// 스캔 주기 (초)
    pub loop_interval_secs: u64,
    /// dockle 실행 파일 경로
    pub dockle_path: String,
    /// 이미지 하나당 스캔 타임아웃 (초, 0이면 제한 없음)
    pub scan_timeout_secs: u64,
    /// Docker 소켓 경로 (비어 있으면 플랫폼 기본값)
    pub docker_socket: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            loop_interval_secs: 60,
            dockle_path: "dockle".to_owned(),
            scan_timeout_secs: 600,
            docker_socket: String::new(),
        }
    }
}

/// 벤치마크 메트릭 API 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// 수신 주소 (`host:port`)
    pub listen_addr: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9521".to_owned(),
        }
    }
}

/// 자기 모니터링 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 수신 IP
    pub listen_addr: String,
    /// 수신 포트
    pub port: u16,
    /// 노출 경로 (현재 `/metrics`만 지원)
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_addr: "0.0.0.0".to_owned(),
            port: 9522,
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
    override_parsed(target, env_key, "bool");
}

fn override_usize(target: &mut usize, env_key: &str) {
    override_parsed(target, env_key, "usize");
}

fn override_u64(target: &mut u64, env_key: &str) {
    override_parsed(target, env_key, "u64");
}

fn override_u16(target: &mut u16, env_key: &str) {
    override_parsed(target, env_key, "u16");
}

fn override_parsed<T: std::str::FromStr>(target: &mut T, env_key: &str, type_name: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                expected = type_name,
                "failed to parse env var, ignoring"
            ),
        }
    }
}
