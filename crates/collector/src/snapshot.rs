//! 메트릭 스냅샷 저장소
//!
//! 한 스캔 주기의 집계 결과([`MetricSnapshot`])를 보관하고 Prometheus 수집 요청에 응답합니다.
//!
//! # 교체 규칙
//!
//! 새 스냅샷은 컬렉터가 저장소 밖에서 완성한 뒤 [`SnapshotStore::replace`]로
//! 한 번에 교체합니다. 읽는 쪽은 항상 이전 스냅샷 전체 또는 새 스냅샷 전체만 보며,
//! 비어 있는 중간 상태나 두 주기가 섞인 상태는 관찰되지 않습니다.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::{Arc, PoisonError, RwLock};

use dockle_exporter_core::metrics::{
    CIS_BENCHMARKS_HELP, CIS_BENCHMARKS_TOTAL, LABEL_CODE, LABEL_IMAGE, LABEL_LEVEL,
};

use crate::report::ScanResult;

/// 스냅샷 키 `(image, code, level)`
///
/// 키가 있으면 "가장 최근 성공 주기에서 관찰됨"을 뜻합니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricKey {
    pub image: String,
    pub code: String,
    pub level: String,
}

impl MetricKey {
    /// 새 키를 생성합니다.
    pub fn new(image: impl Into<String>, code: impl Into<String>, level: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            code: code.into(),
            level: level.into(),
        }
    }
}

/// 한 주기의 집계 결과
///
/// 값은 항상 1인 존재 표시이므로 키 집합만 보관합니다.
/// 정렬된 집합이라 같은 결과 집합에서는 작업 완료 순서와 무관하게 같은 스냅샷이 나옵니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricSnapshot {
    keys: BTreeSet<MetricKey>,
}

impl MetricSnapshot {
    /// 모든 시계열의 값
    pub const VALUE: f64 = 1.0;

    /// 빈 스냅샷을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 스캔 결과 목록에서 스냅샷을 만듭니다.
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a ScanResult>) -> Self {
        let mut snapshot = Self::new();
        for result in results {
            let image = result.image_label();
            for finding in &result.details {
                snapshot.insert(MetricKey::new(image, &finding.code, &finding.level));
            }
        }
        snapshot
    }

    /// 키를 추가합니다. 이미 있으면 아무 일도 하지 않습니다.
    pub fn insert(&mut self, key: MetricKey) {
        self.keys.insert(key);
    }

    /// 키 존재 여부를 반환합니다.
    pub fn contains(&self, key: &MetricKey) -> bool {
        self.keys.contains(key)
    }

    /// 시계열 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// 비어 있는지 반환합니다.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// 정렬된 순서로 키를 순회합니다.
    pub fn keys(&self) -> impl Iterator<Item = &MetricKey> {
        self.keys.iter()
    }
}

impl FromIterator<MetricKey> for MetricSnapshot {
    fn from_iter<I: IntoIterator<Item = MetricKey>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

/// 메트릭 설명자
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDesc {
    pub name: &'static str,
    pub help: &'static str,
    /// Prometheus 타입 (`gauge`)
    pub kind: &'static str,
    pub labels: [&'static str; 3],
}

/// 수집된 메트릭 인스턴스 하나
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub key: MetricKey,
    pub value: f64,
}

/// 현재 게시 중인 스냅샷 저장소
///
/// 쓰기 주체는 컬렉터의 교체 단계 하나뿐이고, 읽기 주체는 수집 엔드포인트입니다.
/// 잠금은 `Arc` 포인터 교체 동안에만 잡히므로 렌더링이 교체를 막지 않습니다.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Arc<MetricSnapshot>>,
}

impl SnapshotStore {
    /// 빈 스냅샷으로 저장소를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 현재 스냅샷을 반환합니다.
    pub fn get(&self) -> Arc<MetricSnapshot> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// 현재 스냅샷을 새 스냅샷으로 교체합니다.
    pub fn replace(&self, snapshot: MetricSnapshot) {
        let next = Arc::new(snapshot);
        let previous = {
            let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, next)
        };
        // 이전 스냅샷 해제는 잠금 밖에서
        drop(previous);
    }

    /// 벤치마크 게이지 설명자를 반환합니다.
    pub fn describe(&self) -> Vec<MetricDesc> {
        vec![MetricDesc {
            name: CIS_BENCHMARKS_TOTAL,
            help: CIS_BENCHMARKS_HELP,
            kind: "gauge",
            labels: [LABEL_IMAGE, LABEL_CODE, LABEL_LEVEL],
        }]
    }

    /// 현재 스냅샷의 모든 키를 값 1의 인스턴스로 반환합니다.
    pub fn collect(&self) -> Vec<MetricSample> {
        self.get()
            .keys()
            .map(|key| MetricSample {
                key: key.clone(),
                value: MetricSnapshot::VALUE,
            })
            .collect()
    }

    /// 현재 스냅샷을 Prometheus 텍스트 형식으로 렌더링합니다.
    ///
    /// 스냅샷이 비어 있으면 빈 문자열을 반환합니다.
    pub fn render(&self) -> String {
        render_snapshot(&self.get())
    }
}

/// 스냅샷을 Prometheus 텍스트 형식(0.0.4)으로 렌더링합니다.
pub fn render_snapshot(snapshot: &MetricSnapshot) -> String {
    if snapshot.is_empty() {
        return String::new();
    }

    let mut out = String::with_capacity(128 + snapshot.len() * 96);
    let _ = writeln!(out, "# HELP {CIS_BENCHMARKS_TOTAL} {CIS_BENCHMARKS_HELP}");
    let _ = writeln!(out, "# TYPE {CIS_BENCHMARKS_TOTAL} gauge");
    for key in snapshot.keys() {
        let _ = writeln!(
            out,
            "{CIS_BENCHMARKS_TOTAL}{{{LABEL_IMAGE}=\"{}\",{LABEL_CODE}=\"{}\",{LABEL_LEVEL}=\"{}\"}} {}",
            escape_label_value(&key.image),
            escape_label_value(&key.code),
            escape_label_value(&key.level),
            MetricSnapshot::VALUE,
        );
    }
    out
}

fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Finding, Summary};
    use dockle_exporter_core::types::ImageRef;

    fn finding(code: &str, level: &str) -> Finding {
        Finding {
            code: code.to_owned(),
            title: String::new(),
            level: level.to_owned(),
            alerts: Vec::new(),
        }
    }

    fn result(image: &str, findings: Vec<Finding>) -> ScanResult {
        ScanResult {
            target: ImageRef::from(image),
            reported_target: String::new(),
            summary: Summary::default(),
            details: findings,
        }
    }

    #[test]
    fn from_results_collects_every_finding() {
        let results = vec![
            result("a", vec![finding("CIS-1", "WARN"), finding("CIS-2", "INFO")]),
            result("b", vec![finding("CIS-1", "WARN")]),
        ];
        let snapshot = MetricSnapshot::from_results(&results);
        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.contains(&MetricKey::new("b", "CIS-1", "WARN")));
    }

    #[test]
    fn identical_keys_collapse() {
        let results = vec![
            result("a", vec![finding("CIS-1", "WARN"), finding("CIS-1", "WARN")]),
            result("a", vec![finding("CIS-1", "WARN")]),
        ];
        let snapshot = MetricSnapshot::from_results(&results);
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains(&MetricKey::new("a", "CIS-1", "WARN")));
    }

    #[test]
    fn snapshot_is_independent_of_result_order() {
        let a = result("a", vec![finding("CIS-1", "WARN")]);
        let b = result("b", vec![finding("CIS-2", "FATAL")]);
        let forward = MetricSnapshot::from_results(&[a.clone(), b.clone()]);
        let backward = MetricSnapshot::from_results(&[b, a]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn image_label_comes_from_reported_target() {
        let mut r = result("nginx", vec![finding("CIS-1", "WARN")]);
        r.reported_target = "nginx:latest (debian 12)".to_owned();
        let snapshot = MetricSnapshot::from_results(&[r]);
        assert!(snapshot.contains(&MetricKey::new("nginx:latest", "CIS-1", "WARN")));
    }

    #[test]
    fn store_starts_empty() {
        let store = SnapshotStore::new();
        assert!(store.get().is_empty());
        assert!(store.collect().is_empty());
        assert_eq!(store.render(), "");
    }

    #[test]
    fn replace_swaps_whole_snapshot() {
        let store = SnapshotStore::new();
        store.replace(MetricSnapshot::from_iter([MetricKey::new("a", "CIS-1", "WARN")]));
        let first = store.get();

        store.replace(MetricSnapshot::from_iter([MetricKey::new("b", "CIS-2", "INFO")]));
        let second = store.get();

        assert!(first.contains(&MetricKey::new("a", "CIS-1", "WARN")));
        assert!(!second.contains(&MetricKey::new("a", "CIS-1", "WARN")));
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn get_returns_shared_pointer_until_replaced() {
        let store = SnapshotStore::new();
        let a = store.get();
        let b = store.get();
        assert!(Arc::ptr_eq(&a, &b));
        store.replace(MetricSnapshot::new());
        assert!(!Arc::ptr_eq(&a, &store.get()));
    }

    #[test]
    fn describe_reports_single_gauge() {
        let descs = SnapshotStore::new().describe();
        assert_eq!(descs.len(), 1);
        assert_eq!(descs[0].name, "dockle_cis_benchmarks_total");
        assert_eq!(descs[0].help, "CIS benchmarks executed by dockle");
        assert_eq!(descs[0].kind, "gauge");
        assert_eq!(descs[0].labels, ["image", "code", "level"]);
    }

    #[test]
    fn collect_yields_one_sample_per_key() {
        let store = SnapshotStore::new();
        store.replace(MetricSnapshot::from_iter([
            MetricKey::new("a", "CIS-1", "WARN"),
            MetricKey::new("a", "CIS-2", "INFO"),
        ]));
        let samples = store.collect();
        assert_eq!(samples.len(), 2);
        assert!(samples.iter().all(|s| s.value == 1.0));
    }

    #[test]
    fn render_produces_exposition_format() {
        let store = SnapshotStore::new();
        store.replace(MetricSnapshot::from_iter([
            MetricKey::new("nginx:latest", "CIS-DI-0001", "WARN"),
            MetricKey::new("alpine:3", "CIS-DI-0005", "INFO"),
        ]));

        let expected = "\
# HELP dockle_cis_benchmarks_total CIS benchmarks executed by dockle
# TYPE dockle_cis_benchmarks_total gauge
dockle_cis_benchmarks_total{image=\"alpine:3\",code=\"CIS-DI-0005\",level=\"INFO\"} 1
dockle_cis_benchmarks_total{image=\"nginx:latest\",code=\"CIS-DI-0001\",level=\"WARN\"} 1
";
        assert_eq!(store.render(), expected);
    }

    #[test]
    fn render_escapes_label_values() {
        let snapshot = MetricSnapshot::from_iter([MetricKey::new("we\"ird\\img\n", "C", "L")]);
        let rendered = render_snapshot(&snapshot);
        assert!(rendered.contains(r#"image="we\"ird\\img\n""#));
    }
}
