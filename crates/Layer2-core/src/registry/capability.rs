//! Capability Registry - 현재 렌더/라우팅/호출 가능한 기능의 단일 진실 공급원
//!
//! 모든 상태를 하나의 RwLock 아래에 두어 플러그인 단위 설치/제거가
//! 원자적으로 보이도록 한다. 읽기는 활성 플러그인 소유 항목만 반환한다.

use super::manifest::ComponentManifest;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use trellis_foundation::Error;

// ============================================================================
// 항목 타입
// ============================================================================

/// 등록된 컴포넌트
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredComponent {
    pub plugin_id: String,
    pub manifest: ComponentManifest,
    pub registered_at: chrono::DateTime<chrono::Utc>,
}

/// 컨트롤러 라우트 prefix 바인딩
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteBinding {
    pub plugin_id: String,
    pub prefix: String,
}

/// 레지스트리 통계
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub components: usize,
    pub categories: usize,
    pub routes: usize,
    pub active_plugins: usize,
}

#[derive(Default)]
struct RegistryState {
    /// (pluginId, componentId) → 컴포넌트
    components: BTreeMap<(String, String), RegisteredComponent>,
    /// 정규화된 prefix → 등록 순서대로의 소유 후보 (마지막 활성 후보가 이긴다)
    routes: HashMap<String, Vec<RouteBinding>>,
    /// 활성 플러그인
    active: HashSet<String>,
    /// 플러그인별 에셋 루트
    asset_roots: HashMap<String, PathBuf>,
}

impl RegistryState {
    fn visible(&self) -> impl Iterator<Item = &RegisteredComponent> {
        self.components
            .values()
            .filter(|c| self.active.contains(&c.plugin_id))
    }

    fn insert_component(&mut self, plugin_id: &str, manifest: ComponentManifest) {
        let key = (plugin_id.to_string(), manifest.id.clone());
        if let Some(previous) = self.components.get(&key) {
            warn!(
                "{}",
                Error::registration_conflict(
                    format!("component {}/{}", plugin_id, manifest.id),
                    &previous.manifest.name,
                    &manifest.name
                )
            );
        }
        self.components.insert(
            key,
            RegisteredComponent {
                plugin_id: plugin_id.to_string(),
                manifest,
                registered_at: chrono::Utc::now(),
            },
        );
    }

    fn insert_route(&mut self, plugin_id: &str, prefix: &str) {
        let prefix = normalize_route(prefix);
        let claimants = self.routes.entry(prefix.clone()).or_default();
        claimants.retain(|route| route.plugin_id != plugin_id);
        if let Some(previous) = claimants.last() {
            warn!(
                "{}",
                Error::registration_conflict(
                    format!("route {}", prefix),
                    &previous.plugin_id,
                    plugin_id
                )
            );
        }
        claimants.push(RouteBinding {
            plugin_id: plugin_id.to_string(),
            prefix,
        });
    }

    /// prefix마다 현재 이기는 바인딩 (마지막으로 등록한 활성 플러그인)
    fn visible_routes(&self) -> impl Iterator<Item = &RouteBinding> {
        self.routes.values().filter_map(|claimants| {
            claimants
                .iter()
                .rev()
                .find(|route| self.active.contains(&route.plugin_id))
        })
    }

    fn route_claims(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    fn remove_plugin(&mut self, plugin_id: &str) -> usize {
        let before = self.components.len() + self.route_claims();
        self.components.retain(|(owner, _), _| owner != plugin_id);
        for claimants in self.routes.values_mut() {
            claimants.retain(|route| route.plugin_id != plugin_id);
        }
        self.routes.retain(|_, claimants| !claimants.is_empty());
        self.asset_roots.remove(plugin_id);
        self.active.remove(plugin_id);
        before - (self.components.len() + self.route_claims())
    }
}

// ============================================================================
// CapabilityRegistry
// ============================================================================

/// 기능 레지스트리
#[derive(Default)]
pub struct CapabilityRegistry {
    state: RwLock<RegistryState>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // 플러그인 단위 설치 / 제거 (원자적)
    // ========================================================================

    /// 플러그인의 기능을 한 번에 설치하고 활성으로 표시
    ///
    /// 같은 플러그인의 이전 항목은 먼저 제거된다.
    pub async fn install_plugin(
        &self,
        plugin_id: &str,
        assets_root: Option<PathBuf>,
        manifests: Vec<ComponentManifest>,
        routes: Vec<String>,
    ) {
        let mut state = self.state.write().await;
        state.remove_plugin(plugin_id);

        let (component_count, route_count) = (manifests.len(), routes.len());
        for manifest in manifests {
            state.insert_component(plugin_id, manifest);
        }
        for prefix in &routes {
            state.insert_route(plugin_id, prefix);
        }
        if let Some(root) = assets_root {
            state.asset_roots.insert(plugin_id.to_string(), root);
        }
        state.active.insert(plugin_id.to_string());

        debug!(
            "Installed capabilities for {}: {} components, {} routes",
            plugin_id, component_count, route_count
        );
    }

    /// 플러그인의 모든 항목 제거 (멱등), 제거된 항목 수 반환
    pub async fn remove_plugin(&self, plugin_id: &str) -> usize {
        let removed = self.state.write().await.remove_plugin(plugin_id);
        debug!("Removed {} capabilities owned by {}", removed, plugin_id);
        removed
    }

    pub async fn is_active(&self, plugin_id: &str) -> bool {
        self.state.read().await.active.contains(plugin_id)
    }

    // ========================================================================
    // 컴포넌트 등록 / 해제
    // ========================================================================

    /// 매니페스트 등록 (같은 키는 last-write-wins)
    pub async fn register(&self, plugin_id: &str, manifest: ComponentManifest) {
        debug!("Registering component {}/{}", plugin_id, manifest.id);
        self.state.write().await.insert_component(plugin_id, manifest);
    }

    pub async fn unregister(&self, plugin_id: &str, component_id: &str) -> Option<ComponentManifest> {
        let key = (plugin_id.to_string(), component_id.to_string());
        self.state
            .write()
            .await
            .components
            .remove(&key)
            .map(|c| c.manifest)
    }

    // ========================================================================
    // 조회 (활성 플러그인만)
    // ========================================================================

    pub async fn get(&self, plugin_id: &str, component_id: &str) -> Option<RegisteredComponent> {
        let state = self.state.read().await;
        if !state.active.contains(plugin_id) {
            return None;
        }
        state
            .components
            .get(&(plugin_id.to_string(), component_id.to_string()))
            .cloned()
    }

    pub async fn lookup(&self, plugin_id: &str, component_id: &str) -> Option<ComponentManifest> {
        self.get(plugin_id, component_id).await.map(|c| c.manifest)
    }

    pub async fn get_manifest(
        &self,
        plugin_id: &str,
        component_id: &str,
    ) -> Option<ComponentManifest> {
        self.lookup(plugin_id, component_id).await
    }

    pub async fn exists(&self, plugin_id: &str, component_id: &str) -> bool {
        self.get(plugin_id, component_id).await.is_some()
    }

    pub async fn list_all(&self) -> Vec<RegisteredComponent> {
        self.state.read().await.visible().cloned().collect()
    }

    pub async fn list_by_category(&self, category: &str) -> Vec<RegisteredComponent> {
        self.state
            .read()
            .await
            .visible()
            .filter(|c| c.manifest.category.eq_ignore_ascii_case(category))
            .cloned()
            .collect()
    }

    pub async fn list_categories(&self) -> Vec<String> {
        let state = self.state.read().await;
        let categories: BTreeSet<_> = state.visible().map(|c| c.manifest.category.clone()).collect();
        categories.into_iter().collect()
    }

    pub async fn list_by_plugin(&self, plugin_id: &str) -> Vec<RegisteredComponent> {
        self.state
            .read()
            .await
            .visible()
            .filter(|c| c.plugin_id == plugin_id)
            .cloned()
            .collect()
    }

    /// 이름/ID/설명/태그 검색
    pub async fn search(&self, query: &str) -> Vec<RegisteredComponent> {
        self.state
            .read()
            .await
            .visible()
            .filter(|c| c.manifest.matches_query(query))
            .cloned()
            .collect()
    }

    // ========================================================================
    // 라우트
    // ========================================================================

    pub async fn register_route(&self, plugin_id: &str, prefix: &str) {
        self.state.write().await.insert_route(plugin_id, prefix);
    }

    /// 가장 긴 prefix 매칭
    pub async fn resolve_route(&self, path: &str) -> Option<RouteBinding> {
        let path = normalize_route(path);
        let state = self.state.read().await;
        state
            .visible_routes()
            .filter(|route| route_matches(&route.prefix, &path))
            .max_by_key(|route| route.prefix.len())
            .cloned()
    }

    pub async fn list_routes(&self) -> Vec<RouteBinding> {
        let state = self.state.read().await;
        let mut routes: Vec<_> = state.visible_routes().cloned().collect();
        routes.sort_by(|a, b| a.prefix.cmp(&b.prefix));
        routes
    }

    // ========================================================================
    // 정적 에셋
    // ========================================================================

    /// 플러그인 에셋 루트 내부의 파일 경로 (경로 탈출 거부)
    pub async fn asset_path(&self, plugin_id: &str, relative: &str) -> Option<PathBuf> {
        let relative = Path::new(relative);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe || relative.as_os_str().is_empty() {
            return None;
        }

        let state = self.state.read().await;
        if !state.active.contains(plugin_id) {
            return None;
        }
        let path = state.asset_roots.get(plugin_id)?.join(relative);
        path.is_file().then_some(path)
    }

    // ========================================================================
    // 통계
    // ========================================================================

    pub async fn stats(&self) -> RegistryStats {
        let state = self.state.read().await;
        let categories: HashSet<_> = state.visible().map(|c| c.manifest.category.as_str()).collect();
        RegistryStats {
            components: state.visible().count(),
            categories: categories.len(),
            routes: state.visible_routes().count(),
            active_plugins: state.active.len(),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn normalize_route(route: &str) -> String {
    let trimmed = route.trim().trim_matches('/');
    format!("/{}", trimmed)
}

fn route_matches(prefix: &str, path: &str) -> bool {
    prefix == "/"
        || path == prefix
        || (path.starts_with(prefix) && path.as_bytes().get(prefix.len()) == Some(&b'/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button() -> ComponentManifest {
        ComponentManifest::new("Button", "Button").with_category("basic")
    }

    #[tokio::test]
    async fn test_register_lookup_unregister() {
        let registry = CapabilityRegistry::new();
        registry.install_plugin("p1", None, vec![], vec![]).await;

        registry.register("p1", button()).await;
        assert_eq!(registry.lookup("p1", "Button").await, Some(button()));

        registry.unregister("p1", "Button").await;
        assert!(registry.lookup("p1", "Button").await.is_none());
    }

    #[tokio::test]
    async fn test_inactive_plugin_is_invisible() {
        let registry = CapabilityRegistry::new();
        registry.register("p1", button()).await;
        assert!(registry.lookup("p1", "Button").await.is_none());
        assert!(registry.list_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_same_component_id_across_plugins() {
        let registry = CapabilityRegistry::new();
        registry.install_plugin("p1", None, vec![button()], vec![]).await;
        registry
            .install_plugin("p2", None, vec![button().with_category("forms")], vec![])
            .await;

        assert_eq!(registry.list_all().await.len(), 2);
        assert_eq!(registry.list_by_category("forms").await[0].plugin_id, "p2");
        assert_eq!(registry.list_categories().await, vec!["basic", "forms"]);

        registry.remove_plugin("p1").await;
        assert!(!registry.exists("p1", "Button").await);
        assert!(registry.exists("p2", "Button").await);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let registry = CapabilityRegistry::new();
        registry.install_plugin("p1", None, vec![button()], vec![]).await;
        registry
            .register("p1", button().with_description("v2"))
            .await;

        let manifest = registry.lookup("p1", "Button").await.unwrap();
        assert_eq!(manifest.description, "v2");
        assert_eq!(registry.list_by_plugin("p1").await.len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_route_longest_prefix() {
        let registry = CapabilityRegistry::new();
        registry
            .install_plugin("shop", None, vec![], vec!["/shop".into()])
            .await;
        registry
            .install_plugin("cart", None, vec![], vec!["/shop/cart/".into()])
            .await;

        let route = registry.resolve_route("/shop/cart/items").await.unwrap();
        assert_eq!(route.plugin_id, "cart");
        assert_eq!(registry.resolve_route("/shop/list").await.unwrap().plugin_id, "shop");
        assert!(registry.resolve_route("/shopping").await.is_none());

        registry.remove_plugin("cart").await;
        assert_eq!(
            registry.resolve_route("/shop/cart/items").await.unwrap().plugin_id,
            "shop"
        );
    }

    #[tokio::test]
    async fn test_shared_prefix_returns_to_earlier_owner() {
        let registry = CapabilityRegistry::new();
        registry
            .install_plugin("shop", None, vec![], vec!["/shop".into()])
            .await;
        registry
            .install_plugin("shop2", None, vec![], vec!["/shop".into()])
            .await;

        assert_eq!(registry.resolve_route("/shop/x").await.unwrap().plugin_id, "shop2");
        assert_eq!(registry.list_routes().await.len(), 1);

        assert_eq!(registry.remove_plugin("shop2").await, 1);
        assert!(registry.is_active("shop").await);
        assert_eq!(registry.resolve_route("/shop/x").await.unwrap().plugin_id, "shop");

        // 재설치하면 다시 마지막 소유자가 된다
        registry
            .install_plugin("shop2", None, vec![], vec!["/shop".into()])
            .await;
        assert_eq!(registry.resolve_route("/shop/x").await.unwrap().plugin_id, "shop2");
        registry.remove_plugin("shop").await;
        registry.remove_plugin("shop2").await;
        assert!(registry.resolve_route("/shop/x").await.is_none());
        assert_eq!(registry.stats().await.routes, 0);
    }

    #[tokio::test]
    async fn test_asset_path_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("logo.svg"), "<svg/>").unwrap();

        let registry = CapabilityRegistry::new();
        registry
            .install_plugin("p1", Some(dir.path().to_path_buf()), vec![], vec![])
            .await;

        assert!(registry.asset_path("p1", "logo.svg").await.is_some());
        assert!(registry.asset_path("p1", "../secret").await.is_none());
        assert!(registry.asset_path("p1", "/etc/passwd").await.is_none());
        assert!(registry.asset_path("p1", "missing.png").await.is_none());
    }

    #[tokio::test]
    async fn test_stats() {
        let registry = CapabilityRegistry::new();
        registry
            .install_plugin("p1", None, vec![button()], vec!["/p1".into()])
            .await;

        let stats = registry.stats().await;
        assert_eq!(stats.components, 1);
        assert_eq!(stats.categories, 1);
        assert_eq!(stats.routes, 1);
        assert_eq!(stats.active_plugins, 1);
    }
}
