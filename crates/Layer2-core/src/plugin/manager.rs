//! Plugin Manager - 라이프사이클 컨트롤러
//!
//! - 패키지 로드 (실행 도메인 생성 + on_load)
//! - 활성화/비활성화/제거 상태 전이와 기능 설치/제거
//! - 디스커버리 기반 일괄 로드
//! - 이벤트 디스패치 진입점

use super::discovery::PluginDiscovery;
use super::domain::DomainLoader;
use super::events::{RuntimeEvent, RuntimeEventBus, RuntimeEventKind};
use super::lifecycle::{PluginState, Transition};
use super::package::{EntryPointTable, PluginPackage};
use super::registry::{PluginInstance, PluginRegistry, PluginSummary};
use super::services::ServiceContainer;
use crate::dispatch::{DispatchRequest, EventDispatcher, EventResult, HandlerTable, ResolvedHandler};
use crate::registry::CapabilityRegistry;
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use trellis_foundation::{Error, Result, RuntimeConfig};

// ============================================================================
// 보고 타입
// ============================================================================

/// 일괄 로드 결과
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub activated: Vec<String>,
    /// disabledPlugins로 건너뛴 ID
    pub skipped: Vec<String>,
    /// (ID, 에러 메시지)
    pub failed: Vec<(String, String)>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// 런타임 요약
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuntimeSummary {
    pub total: usize,
    pub loaded: usize,
    pub active: usize,
    pub deactivated: usize,
    pub components: usize,
    pub routes: usize,
    pub handlers: usize,
}

// ============================================================================
// PluginManager
// ============================================================================

/// 플러그인 매니저 - 전체 플러그인 런타임 관리
pub struct PluginManager {
    config: RuntimeConfig,
    working_dir: PathBuf,
    loader: DomainLoader,
    registry: Arc<PluginRegistry>,
    capabilities: Arc<CapabilityRegistry>,
    handlers: Arc<HandlerTable>,
    dispatcher: EventDispatcher,
    events: Arc<RuntimeEventBus>,
    platform: Arc<ServiceContainer>,
}

impl PluginManager {
    /// 새 매니저 생성
    pub fn new(config: RuntimeConfig, entry_points: EntryPointTable) -> Self {
        let platform = Arc::new(ServiceContainer::new());
        let handlers = Arc::new(HandlerTable::new());
        let working_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        Self {
            loader: DomainLoader::new(entry_points, config.resolved_data_dir(), Arc::clone(&platform)),
            dispatcher: EventDispatcher::new(Arc::clone(&handlers), config.dispatch.clone()),
            registry: Arc::new(PluginRegistry::new()),
            capabilities: Arc::new(CapabilityRegistry::new()),
            events: Arc::new(RuntimeEventBus::new()),
            handlers,
            platform,
            working_dir,
            config,
        }
    }

    /// 디스커버리 기준 디렉토리 설정
    pub fn with_working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = working_dir.into();
        self
    }

    // ========================================================================
    // 로드
    // ========================================================================

    /// 패키지 로드 (UNLOADED -> LOADED)
    ///
    /// 실패하면 플러그인은 UNLOADED로 남고 아무 것도 등록되지 않는다.
    pub async fn load(&self, package: &PluginPackage) -> Result<()> {
        let id = package.id().to_string();
        info!("Loading plugin: {} (v{})", id, package.descriptor().version);

        if let Err(e) = self.registry.reserve(&id).await {
            self.publish_load_failure(&id, &e).await;
            return Err(e);
        }

        if let Err(e) = self.load_reserved(package).await {
            self.registry.release(&id).await;
            error!("Plugin {} failed to load: {}", id, e);
            self.publish_load_failure(&id, &e).await;
            return Err(e);
        }

        self.publish(RuntimeEventKind::PluginLoaded, &id, json!({
            "version": package.descriptor().version.to_string(),
        }))
        .await;
        info!("Plugin {} loaded successfully", id);
        Ok(())
    }

    async fn load_reserved(&self, package: &PluginPackage) -> Result<()> {
        let descriptor = package.descriptor();
        let id = &descriptor.id;

        let missing = self.registry.missing_dependencies(descriptor).await;
        if !missing.is_empty() {
            return Err(Error::load(
                id,
                format!("missing dependencies: {}", missing.join(", ")),
            ));
        }

        let domain = self.loader.load(package)?;
        let ctx = domain.context();

        domain
            .plugin()
            .on_load(ctx)
            .await
            .map_err(|e| Error::lifecycle(id, Transition::Load.to_string(), e.to_string()))?;
        domain.allocate()?;

        // 기능 등록은 on_activate에서만 반영된다
        let stray = ctx.take_pending();
        if !stray.is_empty() {
            warn!("Plugin {} registered capabilities during load; ignoring them", id);
        }

        self.registry.insert(descriptor.clone(), domain).await;
        Ok(())
    }

    /// 로드 후 바로 활성화
    pub async fn load_and_activate(&self, package: &PluginPackage) -> Result<()> {
        self.load(package).await?;
        self.activate(package.id()).await
    }

    /// 여러 패키지 로드 (의존성이 먼저 로드되도록 반복)
    ///
    /// 개별 실패는 보고서에 기록되고 나머지 로드를 막지 않는다.
    pub async fn load_all(&self, packages: Vec<PluginPackage>) -> LoadReport {
        let mut report = LoadReport::default();
        let mut pending = Vec::new();

        for package in packages {
            if self.config.is_disabled(package.id()) {
                info!("Skipping disabled plugin {}", package.id());
                report.skipped.push(package.id().to_string());
            } else {
                pending.push(package);
            }
        }

        while !pending.is_empty() {
            let before = pending.len();
            let mut deferred = Vec::new();

            for package in pending {
                let ready = self
                    .registry
                    .missing_dependencies(package.descriptor())
                    .await
                    .is_empty();
                if ready {
                    self.load_into_report(&package, &mut report).await;
                } else {
                    deferred.push(package);
                }
            }

            if deferred.len() == before {
                // 더 이상 진행 불가: 남은 패키지는 의존성 에러로 실패
                for package in &deferred {
                    self.load_into_report(package, &mut report).await;
                }
                break;
            }
            pending = deferred;
        }

        info!(
            "Loaded {} plugins ({} active, {} skipped, {} failed)",
            report.loaded.len(),
            report.activated.len(),
            report.skipped.len(),
            report.failed.len()
        );
        report
    }

    async fn load_into_report(&self, package: &PluginPackage, report: &mut LoadReport) {
        let id = package.id().to_string();
        if let Err(e) = self.load(package).await {
            report.failed.push((id, e.to_string()));
            return;
        }
        report.loaded.push(id.clone());

        if self.config.auto_activate {
            match self.activate(&id).await {
                Ok(()) => report.activated.push(id),
                Err(e) => report.failed.push((id, e.to_string())),
            }
        }
    }

    /// 디스커버리 → 로드 → (autoActivate) 활성화
    pub async fn discover_and_load(&self) -> LoadReport {
        let discovery = PluginDiscovery::from_config(&self.working_dir, &self.config);
        let packages = discovery
            .discover()
            .await
            .into_iter()
            .map(|d| d.package)
            .collect();
        self.load_all(packages).await
    }

    // ========================================================================
    // 상태 전이
    // ========================================================================

    /// 활성화 (LOADED/DEACTIVATED -> ACTIVE), 이미 ACTIVE면 no-op
    pub async fn activate(&self, id: &str) -> Result<()> {
        let instance = self.instance(id).await?;
        let _guard = instance.transition_lock().lock().await;

        let state = instance.state();
        if state.is_noop(Transition::Activate) {
            debug!("Plugin {} is already active", id);
            return Ok(());
        }
        if !state.allows(Transition::Activate) {
            return Err(Error::invalid_transition(id, state, Transition::Activate.target()));
        }

        info!("Activating plugin: {}", id);
        let ctx = instance.context();
        ctx.discard_pending();

        if let Err(e) = instance.plugin().on_activate(ctx).await {
            ctx.discard_pending();
            return Err(self.lifecycle_failure(id, Transition::Activate, e).await);
        }

        let pending = ctx.take_pending();
        let counts = json!({
            "components": pending.components.len(),
            "routes": pending.routes.len(),
            "handlers": pending.handlers.len(),
            "fallback": pending.fallback.is_some(),
        });

        self.capabilities
            .install_plugin(
                id,
                instance.domain().assets_dir().map(Path::to_path_buf),
                pending.components,
                pending.routes,
            )
            .await;
        self.handlers
            .install_plugin(id, Arc::clone(ctx), pending.handlers, pending.fallback);
        ctx.set_active(true);
        instance.set_state(Transition::Activate.target());

        self.publish(RuntimeEventKind::CapabilitiesRegistered, id, counts)
            .await;
        self.publish(RuntimeEventKind::PluginActivated, id, serde_json::Value::Null)
            .await;
        info!("Plugin {} activated", id);
        Ok(())
    }

    /// 비활성화 (ACTIVE -> DEACTIVATED), 이미 DEACTIVATED면 no-op
    ///
    /// 콜백 성공 여부와 관계없이 플러그인의 기능은 모두 제거된다.
    pub async fn deactivate(&self, id: &str) -> Result<()> {
        let instance = self.instance(id).await?;
        let _guard = instance.transition_lock().lock().await;

        let state = instance.state();
        if state.is_noop(Transition::Deactivate) {
            debug!("Plugin {} is already deactivated", id);
            return Ok(());
        }
        if !state.allows(Transition::Deactivate) {
            return Err(Error::invalid_transition(id, state, Transition::Deactivate.target()));
        }

        info!("Deactivating plugin: {}", id);
        let ctx = instance.context();
        let outcome = instance.plugin().on_deactivate(ctx).await;

        ctx.set_active(false);
        let removed = self.capabilities.remove_plugin(id).await + self.handlers.remove_plugin(id);
        self.publish(
            RuntimeEventKind::CapabilitiesRemoved,
            id,
            json!({ "removed": removed }),
        )
        .await;

        if let Err(e) = outcome {
            return Err(self.lifecycle_failure(id, Transition::Deactivate, e).await);
        }

        instance.set_state(Transition::Deactivate.target());
        self.publish(RuntimeEventKind::PluginDeactivated, id, serde_json::Value::Null)
            .await;
        info!("Plugin {} deactivated", id);
        Ok(())
    }

    /// 제거 (DEACTIVATED -> UNINSTALLED)
    ///
    /// 플러그인 데이터 디렉토리는 삭제하지 않는다.
    pub async fn uninstall(&self, id: &str) -> Result<()> {
        let instance = self.instance(id).await?;
        let _guard = instance.transition_lock().lock().await;

        let state = instance.state();
        if !state.allows(Transition::Uninstall) {
            return Err(Error::invalid_transition(id, state, Transition::Uninstall.target()));
        }

        info!("Uninstalling plugin: {}", id);
        if let Err(e) = instance.plugin().on_uninstall(instance.context()).await {
            return Err(self.lifecycle_failure(id, Transition::Uninstall, e).await);
        }

        self.registry.remove(id).await;
        instance.set_state(Transition::Uninstall.target());
        self.publish(RuntimeEventKind::PluginUninstalled, id, serde_json::Value::Null)
            .await;
        info!("Plugin {} uninstalled", id);
        Ok(())
    }

    /// 모든 ACTIVE 플러그인 비활성화 (로드 역순)
    pub async fn shutdown(&self) {
        let mut active = self.registry.ids_in_state(PluginState::Active).await;
        active.reverse();

        for id in active {
            if let Err(e) = self.deactivate(&id).await {
                warn!("Plugin {} failed to deactivate during shutdown: {}", id, e);
            }
        }
        info!("Plugin runtime shut down");
    }

    // ========================================================================
    // 이벤트 디스패치
    // ========================================================================

    pub async fn dispatch(&self, request: DispatchRequest) -> EventResult {
        self.dispatcher.dispatch(request).await
    }

    pub async fn dispatch_with_cancel(
        &self,
        request: DispatchRequest,
        cancel: CancellationToken,
    ) -> Result<EventResult> {
        self.dispatcher.dispatch_with_cancel(request, cancel).await
    }

    pub fn resolve_chain(
        &self,
        component_id: &str,
        event_type: &str,
        plugin_id: Option<&str>,
    ) -> Vec<ResolvedHandler> {
        self.dispatcher
            .resolve_chain(component_id, event_type, plugin_id)
    }

    // ========================================================================
    // 조회
    // ========================================================================

    pub async fn state(&self, id: &str) -> PluginState {
        self.registry.state(id).await
    }

    /// 로드 순서대로 플러그인 목록
    pub async fn list(&self) -> Vec<PluginSummary> {
        self.registry
            .list()
            .await
            .iter()
            .map(|instance| instance.summary())
            .collect()
    }

    pub async fn summary(&self) -> RuntimeSummary {
        let instances = self.registry.list().await;
        let count = |state: PluginState| instances.iter().filter(|i| i.state() == state).count();
        let stats = self.capabilities.stats().await;

        RuntimeSummary {
            total: instances.len(),
            loaded: count(PluginState::Loaded),
            active: count(PluginState::Active),
            deactivated: count(PluginState::Deactivated),
            components: stats.components,
            routes: stats.routes,
            handlers: self.handlers.len(),
        }
    }

    pub async fn plugin_count(&self) -> usize {
        self.registry.len().await
    }

    // ========================================================================
    // 접근자
    // ========================================================================

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub fn capabilities(&self) -> &Arc<CapabilityRegistry> {
        &self.capabilities
    }

    pub fn handlers(&self) -> &Arc<HandlerTable> {
        &self.handlers
    }

    pub fn events(&self) -> &Arc<RuntimeEventBus> {
        &self.events
    }

    /// 모든 플러그인이 공유하는 플랫폼 서비스
    pub fn platform_services(&self) -> &Arc<ServiceContainer> {
        &self.platform
    }

    // ========================================================================
    // 내부 헬퍼
    // ========================================================================

    async fn instance(&self, id: &str) -> Result<Arc<PluginInstance>> {
        self.registry
            .get(id)
            .await
            .ok_or_else(|| Error::NotFound(format!("Plugin {} is not loaded", id)))
    }

    async fn lifecycle_failure(&self, id: &str, transition: Transition, cause: Error) -> Error {
        let err = Error::lifecycle(id, transition.to_string(), cause.to_string());
        error!("{}", err);
        self.publish(
            RuntimeEventKind::LifecycleFailed,
            id,
            json!({ "transition": transition.to_string(), "error": cause.to_string() }),
        )
        .await;
        err
    }

    async fn publish_load_failure(&self, id: &str, err: &Error) {
        self.publish(
            RuntimeEventKind::PluginLoadFailed,
            id,
            json!({ "error": err.to_string() }),
        )
        .await;
    }

    async fn publish(&self, kind: RuntimeEventKind, id: &str, data: serde_json::Value) {
        self.events.publish(RuntimeEvent::new(kind, id, data)).await;
    }
}
