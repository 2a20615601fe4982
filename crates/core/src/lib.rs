//! dockle-exporter 공통 크레이트
//!
//! 컬렉터와 데몬이 공유하는 도메인 타입, 최상위 에러, 설정,
//! 자기 모니터링 메트릭 이름을 정의합니다.
//!
//! # Module Structure
//!
//! - [`types`]: 도메인 타입 (`ContainerSpec`, `ImageRef`)
//! - [`error`]: 최상위 에러 (`ExporterError`, `ConfigError`)
//! - [`config`]: `dockle-exporter.toml` 설정 (`ExporterConfig`)
//! - [`metrics`]: 자기 모니터링 메트릭 이름과 설명 등록

pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, ExporterError};

// 설정
pub use config::ExporterConfig;

// 도메인 타입
pub use types::{ContainerSpec, ImageRef};
