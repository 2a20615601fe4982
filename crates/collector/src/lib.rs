//! dockle CIS 벤치마크 컬렉터
//!
//! 실행 중인 컨테이너 이미지를 주기적으로 dockle로 점검하고,
//! 결과를 `dockle_cis_benchmarks_total` 게이지 스냅샷으로 게시합니다.
//!
//! # 아키텍처
//! ```text
//! Scheduler --tick--> BenchmarkCollector.scan()
//!                         |
//!                  ContainerDiscovery (Docker)
//!                         |
//!                  unique_images()
//!                         |
//!              +----------+----------+
//!              |   Semaphore (C)     |
//!        ImageScanner (dockle) x N   |
//!              |                     |
//!        report::decode()            |
//!              +----------+----------+
//!                         |
//!                  MetricSnapshot --> SnapshotStore --> /metrics
//! ```
//!
//! # Module Structure
//!
//! - [`target`]: 이미지 중복 제거
//! - [`report`]: dockle JSON 리포트 디코더
//! - [`discovery`]: 컨테이너 탐색 trait과 Docker 구현체
//! - [`scanner`]: 이미지 스캐너 trait과 dockle 구현체
//! - [`snapshot`]: 스냅샷과 저장소, Prometheus 렌더링
//! - [`collector`]: 주기 하나를 실행하는 오케스트레이터
//! - [`scheduler`]: 고정 간격 루프

pub mod collector;
pub mod config;
pub mod discovery;
pub mod error;
pub mod report;
pub mod scanner;
pub mod scheduler;
pub mod snapshot;
pub mod target;

// --- 주요 타입 re-export ---

pub use collector::{BenchmarkCollector, BenchmarkCollectorBuilder, CycleReport};
pub use config::{ScanCollectorConfig, ScanCollectorConfigBuilder};
pub use discovery::{ContainerDiscovery, DockerDiscovery};
pub use error::CollectorError;
pub use report::{Finding, ScanResult, Summary, decode};
pub use scanner::{DockleScanner, ImageScanner};
pub use snapshot::{MetricDesc, MetricKey, MetricSample, MetricSnapshot, SnapshotStore};
pub use target::unique_images;
