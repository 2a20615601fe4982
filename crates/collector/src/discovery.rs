//! 워크로드 탐색 -- 실행 중인 컨테이너 목록 조회
//!
//! [`ContainerDiscovery`] trait은 스캔 대상이 될 컨테이너를 나열하는 추상화입니다.
//! 컬렉터는 이 trait에만 의존하므로 테스트에서는 Mock 구현으로 교체할 수 있습니다.
//!
//! # 구현체
//! - [`DockerDiscovery`]: `bollard`로 Docker 엔진의 실행 중 컨테이너를 조회
//! - `MockDiscovery`: 테스트용 (`#[cfg(test)]`)
//!
//! # 사용 예시
//! ```ignore
//! use dockle_exporter_collector::discovery::{ContainerDiscovery, DockerDiscovery};
//!
//! let discovery = DockerDiscovery::connect_local()?;
//! let containers = discovery.list_containers().await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use dockle_exporter_core::types::ContainerSpec;
use tracing::debug;

use crate::config::ScanCollectorConfig;
use crate::error::CollectorError;

/// 컨테이너 탐색 추상화
///
/// 매 스캔 주기마다 한 번 호출됩니다. 실패하면 주기 전체가 중단되고
/// 이전 스냅샷이 그대로 유지됩니다.
pub trait ContainerDiscovery: Send + Sync + 'static {
    /// 실행 중인 컨테이너 목록을 반환합니다.
    ///
    /// # Errors
    ///
    /// 탐색 대상에 접근할 수 없으면 `CollectorError::Discovery`를 반환합니다.
    fn list_containers(
        &self,
    ) -> impl Future<Output = Result<Vec<ContainerSpec>, CollectorError>> + Send;
}

/// Docker 엔진 기반 탐색 구현체
///
/// 실행 중(`all: false`)인 컨테이너만 조회하며, 이미지가 비어 있는 항목은 건너뜁니다.
pub struct DockerDiscovery {
    docker: Arc<bollard::Docker>,
}

impl DockerDiscovery {
    /// 플랫폼 기본 소켓으로 Docker에 연결합니다.
    pub fn connect_local() -> Result<Self, CollectorError> {
        let docker = bollard::Docker::connect_with_local_defaults().map_err(|e| {
            CollectorError::Discovery(format!("failed to connect to docker: {e}"))
        })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }

    /// 지정한 소켓 경로로 Docker에 연결합니다.
    pub fn connect_with_socket(socket_path: &str) -> Result<Self, CollectorError> {
        let docker =
            bollard::Docker::connect_with_socket(socket_path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| {
                    CollectorError::Discovery(format!(
                        "failed to connect to docker at {socket_path}: {e}"
                    ))
                })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }

    /// 설정의 `docker_socket` 값에 따라 연결합니다.
    ///
    /// 비어 있으면 플랫폼 기본 소켓을 사용합니다.
    pub fn from_config(config: &ScanCollectorConfig) -> Result<Self, CollectorError> {
        if config.docker_socket.trim().is_empty() {
            Self::connect_local()
        } else {
            Self::connect_with_socket(&config.docker_socket)
        }
    }
}

impl ContainerDiscovery for DockerDiscovery {
    async fn list_containers(&self) -> Result<Vec<ContainerSpec>, CollectorError> {
        use bollard::container::ListContainersOptions;

        let options = ListContainersOptions::<String> {
            all: false,
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| CollectorError::Discovery(format!("list containers failed: {e}")))?;

        let mut specs = Vec::with_capacity(containers.len());
        for container in containers {
            let name = container
                .names
                .unwrap_or_default()
                .first()
                .map(|n| n.trim_start_matches('/').to_owned());

            let Some(image) = container.image.filter(|i| !i.trim().is_empty()) else {
                debug!(container = ?name, "skipping container without image");
                continue;
            };

            let spec = ContainerSpec::new(image);
            specs.push(match name {
                Some(name) => spec.with_name(name),
                None => spec,
            });
        }

        debug!(containers = specs.len(), "listed running containers");
        Ok(specs)
    }
}

/// 테스트용 Mock 탐색 구현체
#[cfg(test)]
#[derive(Default)]
pub struct MockDiscovery {
    /// list_containers 호출 시 반환할 컨테이너 목록
    pub containers: Vec<ContainerSpec>,
    /// 설정 시 탐색 실패를 시뮬레이션
    pub failure: Option<String>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockDiscovery {
    /// 주어진 이미지 목록으로 Mock을 생성합니다.
    pub fn with_images(images: &[&str]) -> Self {
        Self {
            containers: images.iter().map(|i| ContainerSpec::new(*i)).collect(),
            ..Self::default()
        }
    }

    /// 항상 실패하는 Mock을 생성합니다.
    pub fn failing(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_owned()),
            ..Self::default()
        }
    }

    /// list_containers 호출 횟수
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl ContainerDiscovery for MockDiscovery {
    async fn list_containers(&self) -> Result<Vec<ContainerSpec>, CollectorError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        match &self.failure {
            Some(reason) => Err(CollectorError::Discovery(reason.clone())),
            None => Ok(self.containers.clone()),
        }
    }
}
