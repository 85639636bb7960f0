//! Plugin Registry - 로드된 플러그인 인스턴스 저장소

use super::context::PluginContext;
use super::descriptor::PluginDescriptor;
use super::domain::ExecutionDomain;
use super::lifecycle::PluginState;
use super::traits::Plugin;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use trellis_foundation::{Error, Result};

// ============================================================================
// PluginInstance
// ============================================================================

/// 로드되어 상주 중인 플러그인
pub struct PluginInstance {
    descriptor: PluginDescriptor,
    domain: ExecutionDomain,
    state: parking_lot::RwLock<PluginState>,
    /// 같은 플러그인의 상태 전이 직렬화
    transition: Mutex<()>,
    load_order: usize,
    loaded_at: chrono::DateTime<chrono::Utc>,
}

impl PluginInstance {
    pub(crate) fn new(descriptor: PluginDescriptor, domain: ExecutionDomain, load_order: usize) -> Self {
        Self {
            descriptor,
            domain,
            state: parking_lot::RwLock::new(PluginState::Loaded),
            transition: Mutex::new(()),
            load_order,
            loaded_at: chrono::Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    pub fn plugin(&self) -> &Arc<dyn Plugin> {
        self.domain.plugin()
    }

    pub fn context(&self) -> &Arc<PluginContext> {
        self.domain.context()
    }

    pub fn domain(&self) -> &ExecutionDomain {
        &self.domain
    }

    pub fn state(&self) -> PluginState {
        *self.state.read()
    }

    pub(crate) fn set_state(&self, state: PluginState) {
        debug!("Set plugin {} state to {}", self.descriptor.id, state);
        *self.state.write() = state;
    }

    pub(crate) fn transition_lock(&self) -> &Mutex<()> {
        &self.transition
    }

    pub fn loaded_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.loaded_at
    }

    pub fn summary(&self) -> PluginSummary {
        PluginSummary {
            id: self.descriptor.id.clone(),
            name: self.descriptor.name.clone(),
            version: self.descriptor.version.to_string(),
            state: self.state(),
        }
    }
}

/// 플러그인 목록 행
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginSummary {
    pub id: String,
    pub name: String,
    pub version: String,
    pub state: PluginState,
}

// ============================================================================
// PluginRegistry
// ============================================================================

#[derive(Default)]
struct Slots {
    instances: HashMap<String, Arc<PluginInstance>>,
    /// 로드 진행 중인 ID (중복 로드 방지)
    loading: HashSet<String>,
    /// 제거된 ID
    uninstalled: HashSet<String>,
    load_counter: usize,
}

/// 플러그인 레지스트리 - ID당 인스턴스 하나
#[derive(Default)]
pub struct PluginRegistry {
    slots: RwLock<Slots>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 로드 예약 (이미 로드됐거나 로드 중이면 LoadError)
    pub(crate) async fn reserve(&self, id: &str) -> Result<()> {
        let mut slots = self.slots.write().await;
        if slots.instances.contains_key(id) || !slots.loading.insert(id.to_string()) {
            warn!("Plugin {} is already loaded", id);
            return Err(Error::load(id, "a plugin with this id is already loaded"));
        }
        Ok(())
    }

    /// 로드 실패 시 예약 해제
    pub(crate) async fn release(&self, id: &str) {
        self.slots.write().await.loading.remove(id);
    }

    /// 예약된 ID에 인스턴스 등록
    pub(crate) async fn insert(
        &self,
        descriptor: PluginDescriptor,
        domain: ExecutionDomain,
    ) -> Arc<PluginInstance> {
        let mut slots = self.slots.write().await;
        let id = descriptor.id.clone();
        slots.loading.remove(&id);
        slots.uninstalled.remove(&id);
        slots.load_counter += 1;

        let instance = Arc::new(PluginInstance::new(descriptor, domain, slots.load_counter));
        slots.instances.insert(id.clone(), Arc::clone(&instance));
        info!("Registered plugin: {} (v{})", id, instance.descriptor.version);
        instance
    }

    /// 인스턴스 제거 (UNINSTALLED 표시)
    pub(crate) async fn remove(&self, id: &str) -> Option<Arc<PluginInstance>> {
        let mut slots = self.slots.write().await;
        let removed = slots.instances.remove(id);
        if removed.is_some() {
            slots.uninstalled.insert(id.to_string());
            info!("Unregistered plugin: {}", id);
        }
        removed
    }

    pub async fn get(&self, id: &str) -> Option<Arc<PluginInstance>> {
        self.slots.read().await.instances.get(id).cloned()
    }

    /// 현재 상태 (없으면 UNINSTALLED 또는 UNLOADED)
    pub async fn state(&self, id: &str) -> PluginState {
        let slots = self.slots.read().await;
        match slots.instances.get(id) {
            Some(instance) => instance.state(),
            None if slots.uninstalled.contains(id) => PluginState::Uninstalled,
            None => PluginState::Unloaded,
        }
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.slots.read().await.instances.contains_key(id)
    }

    /// 로드 순서대로 정렬된 인스턴스
    pub async fn list(&self) -> Vec<Arc<PluginInstance>> {
        let slots = self.slots.read().await;
        let mut instances: Vec<_> = slots.instances.values().cloned().collect();
        instances.sort_by_key(|i| i.load_order);
        instances
    }

    /// 특정 상태의 플러그인 ID (로드 순서)
    pub async fn ids_in_state(&self, state: PluginState) -> Vec<String> {
        self.list()
            .await
            .into_iter()
            .filter(|i| i.state() == state)
            .map(|i| i.id().to_string())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.instances.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.instances.is_empty()
    }

    /// 필수 의존성 중 로드되지 않았거나 버전이 맞지 않는 것
    pub async fn missing_dependencies(&self, descriptor: &PluginDescriptor) -> Vec<String> {
        let slots = self.slots.read().await;
        descriptor
            .dependencies
            .iter()
            .filter(|dep| !dep.optional)
            .filter(|dep| match slots.instances.get(&dep.id) {
                Some(instance) => !dep.is_satisfied_by(&instance.descriptor.version),
                None => true,
            })
            .map(|dep| format!("{} >= {}", dep.id, dep.min_version))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::descriptor::{PluginDependency, PluginVersion};
    use crate::plugin::domain::DomainLoader;
    use crate::plugin::package::{EntryPointTable, PluginPackage};
    use crate::plugin::services::ServiceContainer;
    use async_trait::async_trait;

    struct TestPlugin;

    #[async_trait]
    impl Plugin for TestPlugin {
        fn id(&self) -> &str {
            "test.plugin"
        }
        fn version(&self) -> PluginVersion {
            PluginVersion::new(1, 0, 0)
        }
        fn name(&self) -> &str {
            "Test"
        }
        async fn on_activate(&self, _ctx: &PluginContext) -> Result<()> {
            Ok(())
        }
    }

    fn domain(root: &std::path::Path) -> (PluginDescriptor, ExecutionDomain) {
        let descriptor = PluginDescriptor::new("test.plugin", "Test");
        let loader = DomainLoader::new(
            EntryPointTable::new().with("test.plugin", || Arc::new(TestPlugin) as Arc<dyn Plugin>),
            root,
            Arc::new(ServiceContainer::new()),
        );
        let domain = loader.load(&PluginPackage::new(descriptor.clone())).unwrap();
        (descriptor, domain)
    }

    #[tokio::test]
    async fn test_duplicate_reservation() {
        let registry = PluginRegistry::new();
        registry.reserve("test.plugin").await.unwrap();
        assert!(registry.reserve("test.plugin").await.is_err());

        registry.release("test.plugin").await;
        assert!(registry.reserve("test.plugin").await.is_ok());
    }

    #[tokio::test]
    async fn test_insert_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let registry = PluginRegistry::new();
        assert_eq!(registry.state("test.plugin").await, PluginState::Unloaded);

        registry.reserve("test.plugin").await.unwrap();
        let (descriptor, domain) = domain(dir.path());
        registry.insert(descriptor, domain).await;

        assert_eq!(registry.state("test.plugin").await, PluginState::Loaded);
        assert!(registry.reserve("test.plugin").await.is_err());

        registry.remove("test.plugin").await;
        assert_eq!(registry.state("test.plugin").await, PluginState::Uninstalled);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_missing_dependencies() {
        let dir = tempfile::tempdir().unwrap();
        let registry = PluginRegistry::new();
        registry.reserve("test.plugin").await.unwrap();
        let (descriptor, domain) = domain(dir.path());
        registry.insert(descriptor, domain).await;

        let dependent = PluginDescriptor::new("acme.dependent", "Dependent")
            .with_dependency(PluginDependency::new("test.plugin", PluginVersion::new(1, 0, 0)))
            .with_dependency(PluginDependency::new("acme.absent", PluginVersion::new(1, 0, 0)))
            .with_dependency(
                PluginDependency::new("acme.optional", PluginVersion::new(1, 0, 0)).optional(),
            );

        assert_eq!(
            registry.missing_dependencies(&dependent).await,
            vec!["acme.absent >= 1.0.0"]
        );
    }
}
