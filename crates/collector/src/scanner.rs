//! 이미지 스캐너 -- dockle 실행
//!
//! [`ImageScanner`] trait은 이미지 하나를 스캔하여 원시 리포트 바이트를 돌려주는 추상화입니다.
//! 호출 순서나 호출 간 공유 상태를 가정하지 않으며, 각 호출은 독립적으로 실패할 수 있습니다.
//!
//! # 구현체
//! - [`DockleScanner`]: `dockle -o <tmpfile> -f json <image>` 프로세스 실행
//! - `MockScanner`: 테스트용 (`#[cfg(test)]`)

use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use dockle_exporter_core::types::ImageRef;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::ScanCollectorConfig;
use crate::error::CollectorError;

/// 에러 메시지에 포함할 stderr 최대 길이
const MAX_STDERR_LEN: usize = 1024;

/// 이미지 스캐너 추상화
pub trait ImageScanner: Send + Sync + 'static {
    /// 이미지를 스캔하고 원시 리포트 바이트를 반환합니다.
    ///
    /// `cancel`이 취소되면 가능한 빨리 `CollectorError::Scan`으로 끝나야 합니다.
    fn scan(
        &self,
        image: &ImageRef,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<u8>, CollectorError>> + Send;
}

/// dockle CLI 기반 스캐너
///
/// 호출마다 임시 파일을 만들어 dockle의 JSON 출력을 받고, 읽은 뒤 삭제합니다.
/// 취소나 타임아웃으로 future가 버려지면 dockle 프로세스도 함께 종료됩니다.
#[derive(Debug, Clone)]
pub struct DockleScanner {
    dockle_path: String,
    timeout: Option<Duration>,
}

impl DockleScanner {
    /// 실행 파일 경로로 스캐너를 생성합니다 (타임아웃 없음).
    pub fn new(dockle_path: impl Into<String>) -> Self {
        Self {
            dockle_path: dockle_path.into(),
            timeout: None,
        }
    }

    /// 이미지 하나당 타임아웃을 설정합니다.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// 컬렉터 설정에서 스캐너를 생성합니다.
    pub fn from_config(config: &ScanCollectorConfig) -> Self {
        Self::new(config.dockle_path.clone()).with_timeout(config.scan_timeout)
    }

    fn error(image: &ImageRef, reason: impl Into<String>) -> CollectorError {
        CollectorError::Scan {
            image: image.to_string(),
            reason: reason.into(),
        }
    }
}

impl ImageScanner for DockleScanner {
    async fn scan(
        &self,
        image: &ImageRef,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, CollectorError> {
        let output_file = tempfile::Builder::new()
            .prefix("dockle-")
            .suffix(".json")
            .tempfile()
            .map_err(|e| Self::error(image, format!("failed to create output file: {e}")))?;

        let child = Command::new(&self.dockle_path)
            .arg("-o")
            .arg(output_file.path())
            .arg("-f")
            .arg("json")
            .arg(image.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Self::error(image, format!("failed to spawn {}: {e}", self.dockle_path))
            })?;

        debug!(image = %image, pid = ?child.id(), "dockle started");

        let output = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return Err(Self::error(image, "scan cancelled"));
            }
            result = wait_with_timeout(self.timeout, child.wait_with_output()) => match result {
                Some(output) => output.map_err(|e| Self::error(image, format!("failed to wait for dockle: {e}")))?,
                None => {
                    let limit = self.timeout.unwrap_or_default();
                    return Err(Self::error(image, format!("timed out after {limit:?}")));
                }
            },
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = truncate(stderr.trim(), MAX_STDERR_LEN);
            return Err(Self::error(image, format!("{}: {stderr}", output.status)));
        }

        tokio::fs::read(output_file.path())
            .await
            .map_err(|e| Self::error(image, format!("failed to read dockle output: {e}")))
    }
}

async fn wait_with_timeout<F: Future>(timeout: Option<Duration>, fut: F) -> Option<F::Output> {
    match timeout {
        Some(duration) => tokio::time::timeout(duration, fut).await.ok(),
        None => Some(fut.await),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// 테스트용 Mock 스캐너
///
/// 이미지별로 미리 정한 응답을 반환하며, 응답이 없는 이미지는 실패합니다.
#[cfg(test)]
#[derive(Default)]
pub struct MockScanner {
    responses: std::collections::HashMap<ImageRef, Result<Vec<u8>, String>>,
    calls: std::sync::Mutex<Vec<ImageRef>>,
}

#[cfg(test)]
impl MockScanner {
    /// 빈 Mock을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 이미지에 대한 성공 응답을 등록합니다.
    pub fn respond(mut self, image: &str, raw: impl Into<Vec<u8>>) -> Self {
        self.responses.insert(ImageRef::from(image), Ok(raw.into()));
        self
    }

    /// 이미지에 대한 실패 응답을 등록합니다.
    pub fn fail(mut self, image: &str, reason: &str) -> Self {
        self.responses
            .insert(ImageRef::from(image), Err(reason.to_owned()));
        self
    }

    /// 지금까지 스캔된 이미지 목록
    pub fn calls(&self) -> Vec<ImageRef> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
impl ImageScanner for MockScanner {
    async fn scan(
        &self,
        image: &ImageRef,
        _cancel: &CancellationToken,
    ) -> Result<Vec<u8>, CollectorError> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(image.clone());
        match self.responses.get(image) {
            Some(Ok(raw)) => Ok(raw.clone()),
            Some(Err(reason)) => Err(DockleScanner::error(image, reason.clone())),
            None => Err(DockleScanner::error(image, "no mock response")),
        }
    }
}
