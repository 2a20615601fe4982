//! 컬렉터 설정
//!
//! [`ScanCollectorConfig`]는 core의 [`CollectorConfig`](dockle_exporter_core::config::CollectorConfig)를
//! 런타임에서 바로 쓸 수 있는 형태(`Duration` 등)로 변환한 설정입니다.
//!
//! # 사용 예시
//! ```ignore
//! use dockle_exporter_core::config::ExporterConfig;
//! use dockle_exporter_collector::config::ScanCollectorConfig;
//!
//! let core_config = ExporterConfig::default();
//! let config = ScanCollectorConfig::from_core(&core_config.collector);
//! ```

use std::time::Duration;

use dockle_exporter_core::config::{CollectorConfig, MAX_CONCURRENCY};

use crate::error::CollectorError;

/// 스캔 컬렉터 런타임 설정
#[derive(Debug, Clone)]
pub struct ScanCollectorConfig {
    /// 동시 스캔 상한 (C)
    pub concurrency: usize,
    /// 스캔 주기
    pub loop_interval: Duration,
    /// dockle 실행 파일 경로
    pub dockle_path: String,
    /// 이미지 하나당 타임아웃 (`None`이면 제한 없음)
    pub scan_timeout: Option<Duration>,
    /// Docker 소켓 경로 (비어 있으면 플랫폼 기본값)
    pub docker_socket: String,
}

impl Default for ScanCollectorConfig {
    fn default() -> Self {
        Self::from_core(&CollectorConfig::default())
    }
}

impl ScanCollectorConfig {
    /// core의 `CollectorConfig`에서 컬렉터 설정을 생성합니다.
    pub fn from_core(core: &CollectorConfig) -> Self {
        Self {
            concurrency: core.concurrency,
            loop_interval: Duration::from_secs(core.loop_interval_secs),
            dockle_path: core.dockle_path.clone(),
            scan_timeout: (core.scan_timeout_secs > 0)
                .then(|| Duration::from_secs(core.scan_timeout_secs)),
            docker_socket: core.docker_socket.clone(),
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), CollectorError> {
        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(CollectorError::Config {
                field: "concurrency".to_owned(),
                reason: "must be a positive integer".to_owned(),
            });
        }

        if self.loop_interval.is_zero() {
            return Err(CollectorError::Config {
                field: "loop_interval".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.dockle_path.trim().is_empty() {
            return Err(CollectorError::Config {
                field: "dockle_path".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.scan_timeout.is_some_and(|t| t.is_zero()) {
            return Err(CollectorError::Config {
                field: "scan_timeout".to_owned(),
                reason: "use None to disable the timeout".to_owned(),
            });
        }

        Ok(())
    }
}

/// 컬렉터 설정 빌더
#[derive(Default)]
pub struct ScanCollectorConfigBuilder {
    config: ScanCollectorConfig,
}

impl ScanCollectorConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 동시 스캔 상한을 설정합니다.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// 스캔 주기를 설정합니다.
    pub fn loop_interval(mut self, interval: Duration) -> Self {
        self.config.loop_interval = interval;
        self
    }

    /// dockle 실행 파일 경로를 설정합니다.
    pub fn dockle_path(mut self, path: impl Into<String>) -> Self {
        self.config.dockle_path = path.into();
        self
    }

    /// 이미지 하나당 타임아웃을 설정합니다.
    pub fn scan_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.scan_timeout = timeout;
        self
    }

    /// Docker 소켓 경로를 설정합니다.
    pub fn docker_socket(mut self, socket: impl Into<String>) -> Self {
        self.config.docker_socket = socket.into();
        self
    }

    /// 설정을 검증하고 반환합니다.
    pub fn build(self) -> Result<ScanCollectorConfig, CollectorError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
