//! trellis-core: Plugin Runtime for Trellis
//!
//! Layer2 - 플러그인 런타임 레이어
//!
//! # 주요 모듈
//!
//! - `plugin`: 패키지, 디스커버리, 실행 도메인, 라이프사이클 컨트롤러, 내장 플러그인
//! - `registry`: 기능 레지스트리 (컴포넌트 매니페스트, 라우트, 에셋)
//! - `dispatch`: 이벤트 디스패처 (핸들러 체인, 결과 병합)
//!
//! # 사용 예시
//!
//! ```ignore
//! use trellis_core::{builtin, DispatchRequest, PluginManager};
//! use trellis_foundation::RuntimeConfig;
//!
//! let manager = PluginManager::new(RuntimeConfig::load()?, builtin::entry_points());
//! manager.load_all(builtin::packages()).await;
//! manager.discover_and_load().await;
//!
//! let result = manager
//!     .dispatch(DispatchRequest::new("Button", "onClick").payload(json!({ "href": "/about" })))
//!     .await;
//! ```

pub mod dispatch;
pub mod plugin;
pub mod registry;

// Re-exports: Plugin
pub use plugin::{
    builtin, EntryPointTable, LoadReport, Plugin, PluginContext, PluginDescriptor, PluginManager,
    PluginPackage, PluginState, PluginSummary, PluginVersion, RuntimeEventBus, RuntimeSummary,
};

// Re-exports: Registry
pub use registry::{CapabilityRegistry, ComponentManifest, RegisteredComponent};

// Re-exports: Dispatch
pub use dispatch::{
    DispatchRequest, EventContext, EventDispatcher, EventHandler, EventHandlerBinding,
    EventResult, EventStatus, FrontendCommand,
};
