//! # Plugin System
//!
//! 플러그인 패키지를 격리된 실행 도메인으로 로드하고 라이프사이클을 관리한다.
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     PluginManager                           │
//! │  ┌───────────────────────────────────────────────────────┐ │
//! │  │  PluginDiscovery ──▶ PluginPackage ──▶ DomainLoader    │ │
//! │  └───────────────────────────────────────────────────────┘ │
//! │                          │                                  │
//! │  ┌───────────────────────▼───────────────────────────────┐ │
//! │  │                   PluginRegistry                       │ │
//! │  │  ┌────────────┬────────────┬────────────────────┐    │ │
//! │  │  │ Plugin A   │ Plugin B   │ Plugin C           │    │ │
//! │  │  │ (ACTIVE)   │ (LOADED)   │ (DEACTIVATED)      │    │ │
//! │  │  └────────────┴────────────┴────────────────────┘    │ │
//! │  └───────────────────────────────────────────────────────┘ │
//! │          │ on_activate 성공 시 한 번에 반영                  │
//! │          ▼                                                  │
//! │  CapabilityRegistry  +  HandlerTable  +  RuntimeEventBus    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 상태 머신
//!
//! ```text
//! UNLOADED ──load──▶ LOADED ──activate──▶ ACTIVE ──deactivate──▶ DEACTIVATED
//!                                           ▲                        │
//!                                           └────────activate────────┤
//!                                                                    └──uninstall──▶ UNINSTALLED
//! ```
//!
//! ## 예시
//!
//! ```ignore
//! struct MyPlugin;
//!
//! #[async_trait]
//! impl Plugin for MyPlugin {
//!     fn id(&self) -> &str { "acme.gallery" }
//!     fn version(&self) -> PluginVersion { PluginVersion::new(1, 0, 0) }
//!     fn name(&self) -> &str { "Gallery" }
//!
//!     async fn on_activate(&self, ctx: &PluginContext) -> Result<()> {
//!         ctx.register_component(ComponentManifest::new("Gallery", "Gallery"));
//!         Ok(())
//!     }
//! }
//!
//! let entry_points = EntryPointTable::new()
//!     .with("acme.gallery", || Arc::new(MyPlugin) as Arc<dyn Plugin>);
//! let manager = PluginManager::new(RuntimeConfig::load()?, entry_points);
//! manager.discover_and_load().await;
//! ```

pub mod builtin;
pub(crate) mod context;
mod descriptor;
mod discovery;
mod domain;
mod events;
mod lifecycle;
mod manager;
mod package;
mod registry;
mod services;
mod traits;

pub use context::{PluginConfigStore, PluginContext, PluginLogger};
pub use descriptor::{PluginDependency, PluginDescriptor, PluginProvides, PluginVersion};
pub use discovery::{parse_descriptor, DiscoveredPlugin, PluginDiscovery, PluginScope, DESCRIPTOR_FILE};
pub use domain::{DomainLoader, ExecutionDomain};
pub use events::{RuntimeEvent, RuntimeEventBus, RuntimeEventKind};
pub use lifecycle::{PluginState, Transition};
pub use manager::{LoadReport, PluginManager, RuntimeSummary};
pub use package::{EntryPointTable, PluginFactory, PluginPackage};
pub use registry::{PluginInstance, PluginRegistry, PluginSummary};
pub use services::ServiceContainer;
pub use traits::Plugin;
