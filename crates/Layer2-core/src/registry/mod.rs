//! # Capability Registry
//!
//! 활성 플러그인이 제공하는 UI 컴포넌트 매니페스트, 컨트롤러 라우트,
//! 정적 에셋을 모아두는 읽기 위주 레지스트리.
//!
//! 빌더 UI와 프론트 컨트롤러가 이 레지스트리를 조회한다. 이벤트 핸들러
//! 바인딩은 `crate::dispatch::HandlerTable`이 따로 관리한다.

mod capability;
mod manifest;

pub use capability::{CapabilityRegistry, RegisteredComponent, RegistryStats, RouteBinding};
pub use manifest::{ComponentManifest, PropDefinition, SizeConstraints};
