//! 컬렉터 에러 타입
//!
//! [`CollectorError`]는 스캔 컬렉터 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<CollectorError> for ExporterError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.
//!
//! # 전파 정책
//!
//! - **탐색 실패** (`Discovery`): 주기 전체를 중단하고 `scan()` 호출자에게 반환됩니다.
//! - **스캔/파싱 실패** (`Scan`, `Parse`): 해당 이미지에만 국한되며
//!   로그로만 보고되고 주기 밖으로 전파되지 않습니다.

use dockle_exporter_core::error::{ConfigError, ExporterError};

/// 스캔 컬렉터 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// 워크로드 탐색 실패
    #[error("failed to get containers: {0}")]
    Discovery(String),

    /// dockle 실행 실패 (타임아웃, 취소 포함)
    #[error("scan failed for image '{image}': {reason}")]
    Scan {
        /// 대상 이미지
        image: String,
        /// 실패 사유
        reason: String,
    },

    /// dockle 결과 파싱 실패
    #[error("invalid dockle report for image '{image}': {reason}")]
    Parse {
        /// 대상 이미지
        image: String,
        /// 파싱 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl From<CollectorError> for ExporterError {
    fn from(err: CollectorError) -> Self {
        match err {
            CollectorError::Discovery(msg) => ExporterError::Discovery(msg),
            CollectorError::Scan { image, reason } => ExporterError::Scan { image, reason },
            CollectorError::Parse { image, reason } => {
                ExporterError::Parse(format!("{image}: {reason}"))
            }
            CollectorError::Config { field, reason } => {
                ExporterError::Config(ConfigError::InvalidValue { field, reason })
            }
        }
    }
}
