//! dockle JSON 리포트 디코더
//!
//! `dockle -f json` 출력을 [`ScanResult`]로 변환합니다.
//!
//! 디코딩은 관대하게 동작합니다:
//! - 모든 필드는 선택 사항이며 없으면 빈 값/0으로 채워집니다.
//! - `null` 값은 필드가 없는 것과 같게 취급합니다.
//! - 필드 이름은 소문자가 기본이고 대문자로 시작하는 이름(`Target` 등)도 허용합니다.
//!
//! 반면 JSON 객체가 아닌 페이로드나 [`MAX_REPORT_SIZE`]를 넘는 페이로드는
//! [`CollectorError::Parse`]로 거부합니다.

use dockle_exporter_core::types::ImageRef;
use serde::{Deserialize, Deserializer};

use crate::error::CollectorError;

/// 허용하는 리포트 최대 크기 (8 MiB)
pub const MAX_REPORT_SIZE: usize = 8 * 1024 * 1024;

/// 심각도별 점검 결과 수
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Summary {
    #[serde(alias = "Fatal", alias = "FATAL", deserialize_with = "null_as_default")]
    pub fatal: u64,
    #[serde(alias = "Warn", alias = "WARN", deserialize_with = "null_as_default")]
    pub warn: u64,
    #[serde(alias = "Info", alias = "INFO", deserialize_with = "null_as_default")]
    pub info: u64,
    #[serde(alias = "Skip", alias = "SKIP", deserialize_with = "null_as_default")]
    pub skip: u64,
    #[serde(alias = "Pass", alias = "PASS", deserialize_with = "null_as_default")]
    pub pass: u64,
}

/// 개별 점검 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Finding {
    /// 점검 코드 (예: `CIS-DI-0001`)
    #[serde(alias = "Code", deserialize_with = "null_as_default")]
    pub code: String,
    /// 점검 제목
    #[serde(alias = "Title", deserialize_with = "null_as_default")]
    pub title: String,
    /// 심각도 (`FATAL`, `WARN`, `INFO`, `SKIP`, `PASS`)
    #[serde(alias = "Level", deserialize_with = "null_as_default")]
    pub level: String,
    /// 상세 경고 메시지
    #[serde(alias = "Alerts", deserialize_with = "null_as_default")]
    pub alerts: Vec<String>,
}

/// 디코딩된 스캔 결과
///
/// 스캔+디코딩이 성공할 때마다 하나씩 만들어지며 집계 후 버려집니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    /// 스캔을 요청한 대상
    pub target: ImageRef,
    /// dockle가 보고한 대상 문자열 (원문 그대로)
    pub reported_target: String,
    /// 심각도별 결과 수
    pub summary: Summary,
    /// 점검 결과 목록 (dockle 출력 순서 유지)
    pub details: Vec<Finding>,
}

impl ScanResult {
    /// 메트릭 `image` 레이블 값을 반환합니다.
    ///
    /// dockle가 보고한 대상의 첫 번째 공백 구분 토큰을 사용하고,
    /// 비어 있으면 요청 대상 이미지를 사용합니다.
    pub fn image_label(&self) -> &str {
        extract_image(&self.reported_target).unwrap_or(self.target.as_str())
    }
}

/// dockle가 보고한 대상 문자열에서 이미지 이름을 추출합니다.
///
/// `"nginx:latest (debian 12)"` 형식에서 첫 토큰만 취합니다.
pub fn extract_image(reported: &str) -> Option<&str> {
    reported.split_whitespace().next()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawReport {
    #[serde(alias = "Target", deserialize_with = "null_as_default")]
    target: String,
    #[serde(alias = "Summary", deserialize_with = "null_as_default")]
    summary: Summary,
    #[serde(alias = "Details", deserialize_with = "null_as_default")]
    details: Vec<Finding>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// dockle 출력 바이트를 [`ScanResult`]로 디코딩합니다.
pub fn decode(target: &ImageRef, raw: &[u8]) -> Result<ScanResult, CollectorError> {
    let parse_error = |reason: String| CollectorError::Parse {
        image: target.to_string(),
        reason,
    };

    if raw.len() > MAX_REPORT_SIZE {
        return Err(parse_error(format!(
            "report size {} exceeds limit {MAX_REPORT_SIZE}",
            raw.len()
        )));
    }

    // serde_json은 구조체를 배열에서도 역직렬화하므로 객체 여부를 먼저 확인
    match raw.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') => {}
        Some(_) => return Err(parse_error("report is not a JSON object".to_owned())),
        None => return Err(parse_error("empty report".to_owned())),
    }

    let report: RawReport =
        serde_json::from_slice(raw).map_err(|e| parse_error(e.to_string()))?;

    Ok(ScanResult {
        target: target.clone(),
        reported_target: report.target,
        summary: report.summary,
        details: report.details,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
      "image": "nginx:latest",
      "summary": { "fatal": 1, "warn": 2, "info": 2, "skip": 0, "pass": 11 },
      "details": [
        {
          "code": "CIS-DI-0001",
          "title": "Create a user for the container",
          "level": "WARN",
          "alerts": ["Last user should not be root"]
        },
        {
          "code": "DKL-DI-0006",
          "title": "Avoid latest tag",
          "level": "WARN",
          "alerts": ["Avoid 'latest' tag"]
        },
        {
          "code": "CIS-DI-0005",
          "title": "Enable Content trust for Docker",
          "level": "INFO",
          "alerts": null
        }
      ],
      "target": "nginx:latest (debian 12.5)"
    }"#;

    fn nginx() -> ImageRef {
        ImageRef::from("nginx:latest")
    }

    #[test]
    fn decodes_full_report() {
        let result = decode(&nginx(), SAMPLE.as_bytes()).unwrap();
        assert_eq!(result.target, nginx());
        assert_eq!(result.summary.fatal, 1);
        assert_eq!(result.summary.pass, 11);
        assert_eq!(result.details.len(), 3);
        assert_eq!(result.details[0].code, "CIS-DI-0001");
        assert_eq!(result.details[0].alerts, vec!["Last user should not be root"]);
    }

    #[test]
    fn null_alerts_decode_as_empty() {
        let result = decode(&nginx(), SAMPLE.as_bytes()).unwrap();
        assert!(result.details[2].alerts.is_empty());
    }

    #[test]
    fn image_label_uses_first_token_of_reported_target() {
        let result = decode(&nginx(), SAMPLE.as_bytes()).unwrap();
        assert_eq!(result.image_label(), "nginx:latest");
    }

    #[test]
    fn image_label_prefers_reported_target_over_request() {
        let raw = br#"{"target": "docker.io/library/redis:7 (alpine 3.19)"}"#;
        let result = decode(&ImageRef::from("redis:7"), raw).unwrap();
        assert_eq!(result.image_label(), "docker.io/library/redis:7");
    }

    #[test]
    fn image_label_falls_back_to_requested_target() {
        let raw = br#"{"target": "   ", "details": []}"#;
        let result = decode(&nginx(), raw).unwrap();
        assert_eq!(result.image_label(), "nginx:latest");
    }

    #[test]
    fn capitalised_field_names_are_accepted() {
        let raw = br#"{
            "Target": "alpine:3",
            "Summary": {"Fatal": 0, "Warn": 1},
            "Details": [{"Code": "CIS-DI-0006", "Level": "INFO", "Title": "t", "Alerts": []}]
        }"#;
        let result = decode(&ImageRef::from("alpine:3"), raw).unwrap();
        assert_eq!(result.reported_target, "alpine:3");
        assert_eq!(result.summary.warn, 1);
        assert_eq!(result.details[0].code, "CIS-DI-0006");
        assert_eq!(result.details[0].level, "INFO");
    }

    #[test]
    fn missing_fields_default() {
        let result = decode(&nginx(), b"{}").unwrap();
        assert_eq!(result.summary, Summary::default());
        assert!(result.details.is_empty());
        assert!(result.reported_target.is_empty());
    }

    #[test]
    fn null_details_and_summary_decode_as_empty() {
        let result = decode(&nginx(), br#"{"summary": null, "details": null}"#).unwrap();
        assert_eq!(result.summary, Summary::default());
        assert!(result.details.is_empty());
    }

    #[test]
    fn null_scalar_fields_decode_as_empty() {
        let raw = br#"{
            "target": null,
            "summary": {"fatal": null, "warn": 1, "info": null, "skip": null, "pass": null},
            "details": [{"code": "CIS-1", "title": null, "level": "WARN", "alerts": null}]
        }"#;
        let result = decode(&nginx(), raw).unwrap();

        assert_eq!(result.reported_target, "");
        assert_eq!(result.image_label(), "nginx:latest");
        assert_eq!(
            result.summary,
            Summary {
                warn: 1,
                ..Summary::default()
            }
        );
        assert_eq!(result.details.len(), 1);
        assert_eq!(result.details[0].code, "CIS-1");
        assert_eq!(result.details[0].title, "");
        assert_eq!(result.details[0].level, "WARN");
    }

    #[test]
    fn null_code_and_level_decode_as_empty() {
        let result = decode(&nginx(), br#"{"details": [{"code": null, "level": null}]}"#).unwrap();
        assert_eq!(result.details[0].code, "");
        assert_eq!(result.details[0].level, "");
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = decode(&nginx(), b"{\"details\": [").unwrap_err();
        match err {
            CollectorError::Parse { image, .. } => assert_eq!(image, "nginx:latest"),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn non_object_payload_is_parse_error() {
        for raw in [&b"[]"[..], b"null", b"42", b"\"text\""] {
            let err = decode(&nginx(), raw).unwrap_err();
            assert!(matches!(err, CollectorError::Parse { .. }), "payload {raw:?}");
        }
    }

    #[test]
    fn empty_payload_is_parse_error() {
        assert!(decode(&nginx(), b"").is_err());
        assert!(decode(&nginx(), b"  \n ").is_err());
    }

    #[test]
    fn wrong_field_type_is_parse_error() {
        let err = decode(&nginx(), br#"{"details": "nope"}"#).unwrap_err();
        assert!(matches!(err, CollectorError::Parse { .. }));
    }

    #[test]
    fn oversized_payload_is_parse_error() {
        let mut raw = vec![b' '; MAX_REPORT_SIZE];
        raw.insert(0, b'{');
        raw.push(b'}');
        let err = decode(&nginx(), &raw).unwrap_err();
        assert!(err.to_string().contains("exceeds limit"));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let raw = br#"{"target": "a", "extra": {"nested": true}}"#;
        assert!(decode(&ImageRef::from("a"), raw).is_ok());
    }

    #[test]
    fn extract_image_takes_first_token() {
        assert_eq!(extract_image("nginx:1.25 (debian 12)"), Some("nginx:1.25"));
        assert_eq!(extract_image("  padded  "), Some("padded"));
        assert_eq!(extract_image(""), None);
    }
}
