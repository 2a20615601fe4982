//! 에러 타입 — 도메인별 에러 정의

/// dockle-exporter 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum ExporterError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 워크로드 탐색 실패 (스캔 주기 전체가 중단됨)
    #[error("discovery error: {0}")]
    Discovery(String),

    /// 단일 이미지 스캔 실패
    #[error("scan error: {image}: {reason}")]
    Scan {
        /// 대상 이미지
        image: String,
        /// 실패 사유
        reason: String,
    },

    /// 스캔 결과 파싱 실패
    #[error("parse error: {0}")]
    Parse(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}
