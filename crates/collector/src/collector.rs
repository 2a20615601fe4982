//! 벤치마크 컬렉터 -- 탐색, 동시 스캔, 집계, 스냅샷 교체
//!
//! [`BenchmarkCollector`]는 스캔 주기 하나를 실행하는 오케스트레이터입니다.
//!
//! # 주기 흐름
//! ```text
//! ContainerDiscovery.list_containers()
//!        |  (실패 시 즉시 반환, 스냅샷 유지)
//!   unique_images()
//!        |
//!   JoinSet ── task(image) ── Semaphore(C) ── ImageScanner.scan() ── report::decode()
//!        |                                                              |
//!        |                                         Mutex<Vec<ScanResult>> (주기 전용)
//!   모든 태스크 종료 대기
//!        |
//!   MetricSnapshot::from_results() ──> SnapshotStore.replace()
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use dockle_exporter_core::metrics as m;
use dockle_exporter_core::types::ImageRef;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::ScanCollectorConfig;
use crate::discovery::ContainerDiscovery;
use crate::error::CollectorError;
use crate::report::{self, ScanResult};
use crate::scanner::ImageScanner;
use crate::snapshot::{MetricSnapshot, SnapshotStore};
use crate::target::unique_images;

/// 성공한 스캔 주기 요약
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// 고유 스캔 대상 수
    pub targets: usize,
    /// 스캔과 디코딩 모두 성공한 대상 수
    pub succeeded: usize,
    /// dockle 실행 실패 수 (비정상 종료된 태스크 포함)
    pub scan_failures: usize,
    /// 리포트 파싱 실패 수
    pub parse_failures: usize,
    /// 새 스냅샷의 시계열 수
    pub series: usize,
    /// 주기 소요 시간
    pub elapsed: Duration,
}

impl CycleReport {
    /// 실패한 대상 수를 반환합니다.
    pub fn failed(&self) -> usize {
        self.scan_failures + self.parse_failures
    }
}

/// 태스크 하나의 결과 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskOutcome {
    Succeeded,
    ScanFailed,
    ParseFailed,
}

/// CIS 벤치마크 컬렉터
///
/// 세마포어는 인스턴스가 소유하므로 같은 컬렉터로 실행되는 모든 주기를 합쳐도
/// 동시에 실행되는 스캔은 `concurrency`개를 넘지 않습니다.
///
/// # 사용 예시
/// ```ignore
/// let collector = BenchmarkCollectorBuilder::new()
///     .config(config)
///     .discovery(DockerDiscovery::connect_local()?)
///     .scanner(DockleScanner::new("dockle"))
///     .build()?;
///
/// let report = collector.scan(&cancel).await?;
/// ```
pub struct BenchmarkCollector<D: ContainerDiscovery, S: ImageScanner> {
    config: ScanCollectorConfig,
    discovery: Arc<D>,
    scanner: Arc<S>,
    store: Arc<SnapshotStore>,
    permits: Arc<Semaphore>,
    wall_clock: fn() -> SystemTime,
}

impl<D: ContainerDiscovery, S: ImageScanner> BenchmarkCollector<D, S> {
    /// 스냅샷 저장소를 반환합니다.
    pub fn store(&self) -> Arc<SnapshotStore> {
        Arc::clone(&self.store)
    }

    /// 동시 스캔 상한을 반환합니다.
    pub fn concurrency(&self) -> usize {
        self.config.concurrency
    }

    /// 설정을 반환합니다.
    pub fn config(&self) -> &ScanCollectorConfig {
        &self.config
    }

    /// 스캔 주기 하나를 실행합니다.
    ///
    /// 탐색 실패만 에러로 반환하며, 이 경우 스냅샷은 변경되지 않습니다.
    /// 이미지별 스캔/파싱 실패는 로그로만 남기고 나머지 결과로 새 스냅샷을 만듭니다.
    pub async fn scan(&self, cancel: &CancellationToken) -> Result<CycleReport, CollectorError> {
        let started = Instant::now();

        let containers = match self.discovery.list_containers().await {
            Ok(containers) => containers,
            Err(e) => {
                metrics::counter!(m::SCAN_CYCLES_TOTAL, m::LABEL_RESULT => m::RESULT_DISCOVERY_FAILURE)
                    .increment(1);
                return Err(e);
            }
        };

        let targets = unique_images(&containers);
        debug!(
            containers = containers.len(),
            targets = targets.len(),
            "scan targets resolved"
        );
        drop(containers);
        metrics::gauge!(m::SCAN_TARGETS).set(targets.len() as f64);

        let accumulator: Arc<Mutex<Vec<ScanResult>>> =
            Arc::new(Mutex::new(Vec::with_capacity(targets.len())));
        let mut tasks = JoinSet::new();
        let mut task_targets = HashMap::with_capacity(targets.len());

        for target in &targets {
            let handle = tasks.spawn(scan_target(
                Arc::clone(&self.scanner),
                Arc::clone(&self.permits),
                Arc::clone(&accumulator),
                target.clone(),
                cancel.clone(),
            ));
            task_targets.insert(handle.id(), target.clone());
        }

        let mut report = CycleReport {
            targets: targets.len(),
            ..CycleReport::default()
        };

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(TaskOutcome::Succeeded) => report.succeeded += 1,
                Ok(TaskOutcome::ScanFailed) => report.scan_failures += 1,
                Ok(TaskOutcome::ParseFailed) => report.parse_failures += 1,
                Err(e) => {
                    let image = task_targets
                        .get(&e.id())
                        .map_or("<unknown>", ImageRef::as_str);
                    error!(image = %image, error = %e, "scan task terminated abnormally");
                    metrics::counter!(m::IMAGE_SCANS_TOTAL, m::LABEL_RESULT => m::RESULT_SCAN_FAILURE)
                        .increment(1);
                    report.scan_failures += 1;
                }
            }
        }

        let results = std::mem::take(&mut *accumulator.lock().await);
        let snapshot = MetricSnapshot::from_results(&results);
        report.series = snapshot.len();
        self.store.replace(snapshot);

        report.elapsed = started.elapsed();
        record_cycle(&report, (self.wall_clock)());

        info!(
            targets = report.targets,
            succeeded = report.succeeded,
            scan_failures = report.scan_failures,
            parse_failures = report.parse_failures,
            series = report.series,
            elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            "scan cycle completed"
        );

        Ok(report)
    }
}

/// 대상 하나를 스캔하고 디코딩합니다.
///
/// 허가는 스캔부터 누적까지 유지되며, 어떤 결과든 반환 시점에 해제됩니다.
async fn scan_target<S: ImageScanner>(
    scanner: Arc<S>,
    permits: Arc<Semaphore>,
    accumulator: Arc<Mutex<Vec<ScanResult>>>,
    target: ImageRef,
    cancel: CancellationToken,
) -> TaskOutcome {
    let _permit = match permits.acquire_owned().await {
        Ok(permit) => permit,
        Err(e) => {
            error!(image = %target, error = %e, "failed to execute CIS benchmark");
            return TaskOutcome::ScanFailed;
        }
    };

    let raw = match scanner.scan(&target, &cancel).await {
        Ok(raw) => raw,
        Err(e) => {
            error!(image = %target, error = %e, "failed to execute CIS benchmark");
            metrics::counter!(m::IMAGE_SCANS_TOTAL, m::LABEL_RESULT => m::RESULT_SCAN_FAILURE)
                .increment(1);
            return TaskOutcome::ScanFailed;
        }
    };

    let result = match report::decode(&target, &raw) {
        Ok(result) => result,
        Err(e) => {
            error!(image = %target, error = %e, "failed to parse dockle report");
            metrics::counter!(m::IMAGE_SCANS_TOTAL, m::LABEL_RESULT => m::RESULT_PARSE_FAILURE)
                .increment(1);
            return TaskOutcome::ParseFailed;
        }
    };

    debug!(
        image = %target,
        findings = result.details.len(),
        fatal = result.summary.fatal,
        warn = result.summary.warn,
        "CIS benchmark completed"
    );
    metrics::counter!(m::IMAGE_SCANS_TOTAL, m::LABEL_RESULT => m::RESULT_SUCCESS).increment(1);
    accumulator.lock().await.push(result);
    TaskOutcome::Succeeded
}

fn record_cycle(report: &CycleReport, now: SystemTime) {
    metrics::counter!(m::SCAN_CYCLES_TOTAL, m::LABEL_RESULT => m::RESULT_SUCCESS).increment(1);
    metrics::histogram!(m::SCAN_CYCLE_DURATION_SECONDS).record(report.elapsed.as_secs_f64());
    metrics::gauge!(m::SNAPSHOT_SERIES).set(report.series as f64);
    if let Ok(since_epoch) = now.duration_since(SystemTime::UNIX_EPOCH) {
        metrics::gauge!(m::LAST_SUCCESS_TIMESTAMP_SECONDS).set(since_epoch.as_secs_f64());
    }
}

/// 벤치마크 컬렉터 빌더
pub struct BenchmarkCollectorBuilder<D: ContainerDiscovery, S: ImageScanner> {
    config: ScanCollectorConfig,
    discovery: Option<Arc<D>>,
    scanner: Option<Arc<S>>,
    store: Option<Arc<SnapshotStore>>,
    wall_clock: fn() -> SystemTime,
}

impl<D: ContainerDiscovery, S: ImageScanner> Default for BenchmarkCollectorBuilder<D, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: ContainerDiscovery, S: ImageScanner> BenchmarkCollectorBuilder<D, S> {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: ScanCollectorConfig::default(),
            discovery: None,
            scanner: None,
            store: None,
            wall_clock: SystemTime::now,
        }
    }

    /// 컬렉터 설정을 지정합니다.
    pub fn config(mut self, config: ScanCollectorConfig) -> Self {
        self.config = config;
        self
    }

    /// 탐색 구현체를 설정합니다.
    pub fn discovery(self, discovery: D) -> Self {
        self.shared_discovery(Arc::new(discovery))
    }

    /// 공유 탐색 구현체를 설정합니다.
    pub fn shared_discovery(mut self, discovery: Arc<D>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    /// 스캐너 구현체를 설정합니다.
    pub fn scanner(self, scanner: S) -> Self {
        self.shared_scanner(Arc::new(scanner))
    }

    /// 공유 스캐너 구현체를 설정합니다.
    pub fn shared_scanner(mut self, scanner: Arc<S>) -> Self {
        self.scanner = Some(scanner);
        self
    }

    /// 외부 스냅샷 저장소를 사용합니다.
    ///
    /// 설정하지 않으면 빈 저장소를 새로 만듭니다.
    pub fn store(mut self, store: Arc<SnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// 마지막 성공 시각 메트릭에 쓰일 벽시계를 지정합니다.
    pub fn wall_clock(mut self, clock: fn() -> SystemTime) -> Self {
        self.wall_clock = clock;
        self
    }

    /// 컬렉터를 빌드합니다.
    pub fn build(self) -> Result<BenchmarkCollector<D, S>, CollectorError> {
        self.config.validate()?;

        let discovery = self.discovery.ok_or_else(|| CollectorError::Config {
            field: "discovery".to_owned(),
            reason: "container discovery must be provided".to_owned(),
        })?;
        let scanner = self.scanner.ok_or_else(|| CollectorError::Config {
            field: "scanner".to_owned(),
            reason: "image scanner must be provided".to_owned(),
        })?;

        Ok(BenchmarkCollector {
            permits: Arc::new(Semaphore::new(self.config.concurrency)),
            config: self.config,
            discovery,
            scanner,
            store: self.store.unwrap_or_default(),
            wall_clock: self.wall_clock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanCollectorConfigBuilder;
    use crate::discovery::MockDiscovery;
    use crate::scanner::MockScanner;
    use crate::snapshot::MetricKey;

    const A_REPORT: &str = r#"{"target": "A", "details": [{"code": "CIS-1", "level": "warn"}]}"#;

    fn build(
        discovery: MockDiscovery,
        scanner: MockScanner,
    ) -> BenchmarkCollector<MockDiscovery, MockScanner> {
        BenchmarkCollectorBuilder::new()
            .discovery(discovery)
            .scanner(scanner)
            .build()
            .unwrap()
    }

    #[test]
    fn builder_requires_discovery() {
        let result = BenchmarkCollectorBuilder::<MockDiscovery, MockScanner>::new()
            .scanner(MockScanner::new())
            .build();
        assert!(matches!(result, Err(CollectorError::Config { .. })));
    }

    #[test]
    fn builder_requires_scanner() {
        let result = BenchmarkCollectorBuilder::<MockDiscovery, MockScanner>::new()
            .discovery(MockDiscovery::default())
            .build();
        assert!(matches!(result, Err(CollectorError::Config { .. })));
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let mut config = ScanCollectorConfig::default();
        config.concurrency = 0;
        let result = BenchmarkCollectorBuilder::new()
            .config(config)
            .discovery(MockDiscovery::default())
            .scanner(MockScanner::new())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_uses_provided_store() {
        let store = Arc::new(SnapshotStore::new());
        let collector = BenchmarkCollectorBuilder::new()
            .config(ScanCollectorConfigBuilder::new().concurrency(4).build().unwrap())
            .discovery(MockDiscovery::default())
            .scanner(MockScanner::new())
            .store(Arc::clone(&store))
            .build()
            .unwrap();
        assert!(Arc::ptr_eq(&store, &collector.store()));
        assert_eq!(collector.concurrency(), 4);
    }

    #[tokio::test]
    async fn scan_dedupes_and_isolates_failures() {
        let collector = build(
            MockDiscovery::with_images(&["A", "A", "B"]),
            MockScanner::new().respond("A", A_REPORT).fail("B", "exit status: 1"),
        );

        let report = collector.scan(&CancellationToken::new()).await.unwrap();

        assert_eq!(report.targets, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.scan_failures, 1);
        assert_eq!(report.series, 1);

        let snapshot = collector.store().get();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains(&MetricKey::new("A", "CIS-1", "warn")));
    }

    #[tokio::test]
    async fn scan_counts_parse_failures() {
        let collector = build(
            MockDiscovery::with_images(&["A", "B"]),
            MockScanner::new().respond("A", A_REPORT).respond("B", "not json"),
        );

        let report = collector.scan(&CancellationToken::new()).await.unwrap();
        assert_eq!(report.parse_failures, 1);
        assert_eq!(report.failed(), 1);
    }

    #[tokio::test]
    async fn discovery_failure_leaves_snapshot_untouched() {
        let collector = build(MockDiscovery::failing("api down"), MockScanner::new());
        let before = collector.store().get();

        let err = collector.scan(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, CollectorError::Discovery(_)));
        assert!(Arc::ptr_eq(&before, &collector.store().get()));
    }

    #[tokio::test]
    async fn empty_discovery_publishes_empty_snapshot() {
        let store = Arc::new(SnapshotStore::new());
        store.replace([MetricKey::new("old", "CIS-1", "warn")].into_iter().collect());

        let collector = BenchmarkCollectorBuilder::new()
            .discovery(MockDiscovery::default())
            .scanner(MockScanner::new())
            .store(Arc::clone(&store))
            .build()
            .unwrap();

        let report = collector.scan(&CancellationToken::new()).await.unwrap();
        assert_eq!(report.targets, 0);
        assert!(store.get().is_empty());
    }
}
