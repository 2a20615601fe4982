//! 스캔 대상 추출
//!
//! 여러 워크로드가 같은 이미지를 참조해도 한 주기에 한 번만 스캔하도록
//! 컨테이너 목록을 이미지 단위로 중복 제거합니다.

use std::collections::HashSet;

use dockle_exporter_core::types::{ContainerSpec, ImageRef};

/// 컨테이너 목록에서 고유 이미지 목록을 첫 등장 순서대로 반환합니다.
pub fn unique_images(containers: &[ContainerSpec]) -> Vec<ImageRef> {
    let mut seen = HashSet::with_capacity(containers.len());
    containers
        .iter()
        .filter(|container| seen.insert(container.image.as_str()))
        .map(|container| ImageRef::new(container.image.as_str()))
        .collect()
}
