//! 메트릭 상수 및 설명 등록
//!
//! 벤치마크 결과 게이지와 자기 모니터링 메트릭의 이름을 중앙에서 정의합니다.
//!
//! 벤치마크 게이지(`dockle_cis_benchmarks_total`)는 스냅샷 단위로 통째로 교체되어야
//! 하므로 `metrics` 전역 레코더를 거치지 않고 컬렉터의 스냅샷 저장소가 직접 렌더링합니다.
//! 나머지 자기 모니터링 메트릭은 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로로 기록합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `dockle_exporter_` (자기 모니터링), `dockle_` (벤치마크 결과)
//! - 접미어: `_total` (counter), `_seconds` (histogram/시각), 없음 (gauge)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 이미지 레이블 키
pub const LABEL_IMAGE: &str = "image";

/// 점검 코드 레이블 키 (예: CIS-DI-0001)
pub const LABEL_CODE: &str = "code";

/// 심각도 레이블 키 (FATAL, WARN, INFO, SKIP, PASS)
pub const LABEL_LEVEL: &str = "level";

/// 결과 레이블 키
pub const LABEL_RESULT: &str = "result";

// ─── 결과 레이블 값 ────────────────────────────────────────────────

/// 성공
pub const RESULT_SUCCESS: &str = "success";

/// 탐색 실패 (주기 전체 중단)
pub const RESULT_DISCOVERY_FAILURE: &str = "discovery_failure";

/// dockle 실행 실패
pub const RESULT_SCAN_FAILURE: &str = "scan_failure";

/// dockle 결과 파싱 실패
pub const RESULT_PARSE_FAILURE: &str = "parse_failure";

// ─── 벤치마크 결과 게이지 ──────────────────────────────────────────

/// CIS 벤치마크 결과 (gauge, 항상 1, labels: image, code, level)
pub const CIS_BENCHMARKS_TOTAL: &str = "dockle_cis_benchmarks_total";

/// CIS 벤치마크 결과 게이지 설명
pub const CIS_BENCHMARKS_HELP: &str = "CIS benchmarks executed by dockle";

// ─── 자기 모니터링 메트릭 ──────────────────────────────────────────

/// 스캔 주기 실행 수 (counter, label: result)
pub const SCAN_CYCLES_TOTAL: &str = "dockle_exporter_scan_cycles_total";

/// 이미지 스캔 수 (counter, label: result)
pub const IMAGE_SCANS_TOTAL: &str = "dockle_exporter_image_scans_total";

/// 스캔 주기 소요 시간 (histogram, 초)
pub const SCAN_CYCLE_DURATION_SECONDS: &str = "dockle_exporter_scan_cycle_duration_seconds";

/// 마지막 주기의 고유 스캔 대상 수 (gauge)
pub const SCAN_TARGETS: &str = "dockle_exporter_scan_targets";

/// 현재 게시 중인 스냅샷 시계열 수 (gauge)
pub const SNAPSHOT_SERIES: &str = "dockle_exporter_snapshot_series";

/// 마지막 성공 주기 완료 시각 (gauge, Unix epoch 초)
pub const LAST_SUCCESS_TIMESTAMP_SECONDS: &str =
    "dockle_exporter_last_success_timestamp_seconds";

/// 빌드 정보 (gauge, 항상 1, label: version)
pub const BUILD_INFO: &str = "dockle_exporter_build_info";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 스캔 주기 소요 시간 히스토그램 버킷 (초)
///
/// 이미지 pull이 포함되므로 1s ~ 1h 범위
pub const SCAN_CYCLE_DURATION_BUCKETS: [f64; 10] = [
    1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0,
];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 자기 모니터링 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(
        SCAN_CYCLES_TOTAL,
        "Total number of scan cycles by result (success, discovery_failure)"
    );
    describe_counter!(
        IMAGE_SCANS_TOTAL,
        "Total number of image scans by result (success, scan_failure, parse_failure)"
    );
    describe_histogram!(
        SCAN_CYCLE_DURATION_SECONDS,
        "Time to complete a full scan cycle in seconds"
    );
    describe_gauge!(
        SCAN_TARGETS,
        "Number of unique images discovered in the last cycle"
    );
    describe_gauge!(
        SNAPSHOT_SERIES,
        "Number of benchmark series in the published snapshot"
    );
    describe_gauge!(
        LAST_SUCCESS_TIMESTAMP_SECONDS,
        "Unix timestamp of the last completed scan cycle"
    );
    describe_gauge!(BUILD_INFO, "Build information (always 1, with version label)");
}

#[cfg(test)]
mod tests {
    use super::*;

    const SELF_METRIC_NAMES: &[&str] = &[
        SCAN_CYCLES_TOTAL,
        IMAGE_SCANS_TOTAL,
        SCAN_CYCLE_DURATION_SECONDS,
        SCAN_TARGETS,
        SNAPSHOT_SERIES,
        LAST_SUCCESS_TIMESTAMP_SECONDS,
        BUILD_INFO,
    ];

    #[test]
    fn self_metrics_use_exporter_prefix() {
        for name in SELF_METRIC_NAMES {
            assert!(
                name.starts_with("dockle_exporter_"),
                "Metric '{}' does not start with 'dockle_exporter_' prefix",
                name
            );
        }
    }

    #[test]
    fn benchmark_gauge_name_is_stable() {
        // 대시보드와 알림 규칙이 이 이름에 의존함
        assert_eq!(CIS_BENCHMARKS_TOTAL, "dockle_cis_benchmarks_total");
    }

    #[test]
    fn describe_all_does_not_panic() {
        describe_all();
    }

    #[test]
    fn label_keys_are_lowercase() {
        for label in [LABEL_IMAGE, LABEL_CODE, LABEL_LEVEL, LABEL_RESULT] {
            assert_eq!(label.to_lowercase(), label);
        }
    }

    #[test]
    fn cycle_duration_buckets_are_sorted() {
        let buckets = SCAN_CYCLE_DURATION_BUCKETS;
        for i in 1..buckets.len() {
            assert!(buckets[i] > buckets[i - 1]);
        }
    }
}
