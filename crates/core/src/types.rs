//! 도메인 타입 — 스캔 대상 식별에 쓰이는 공통 타입
//!
//! 탐색(discovery) 어댑터는 [`ContainerSpec`]을 만들고,
//! 컬렉터는 이를 중복 제거하여 [`ImageRef`] 스캔 대상으로 바꿉니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 실행 중인 컨테이너 명세
///
/// 매 스캔 주기마다 탐색 어댑터가 새로 만들어 넘기며,
/// 주기가 끝나면 보관하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// 이미지 식별자 (불투명 문자열, 예: `nginx:1.25`)
    pub image: String,
    /// 컨테이너 이름 (디버그 로그용, 없을 수 있음)
    #[serde(default)]
    pub name: Option<String>,
}

impl ContainerSpec {
    /// 이미지 식별자만으로 명세를 생성합니다.
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            name: None,
        }
    }

    /// 컨테이너 이름을 설정합니다.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// 스캔 대상 이미지 참조
///
/// 값 타입이며 생성 후 변경되지 않습니다.
/// 같은 문자열이면 같은 대상입니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    /// 이미지 식별자로 참조를 생성합니다.
    pub fn new(image: impl Into<String>) -> Self {
        Self(image.into())
    }

    /// 이미지 식별자 문자열을 반환합니다.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ImageRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ImageRef {
    fn from(image: &str) -> Self {
        Self::new(image)
    }
}

impl From<String> for ImageRef {
    fn from(image: String) -> Self {
        Self(image)
    }
}
