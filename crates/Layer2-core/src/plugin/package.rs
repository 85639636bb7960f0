//! Plugin Package - 불변 패키지 + 엔트리 포인트 테이블

use super::descriptor::PluginDescriptor;
use super::traits::Plugin;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 엔트리 포인트 팩토리 (호출할 때마다 새 인스턴스)
pub type PluginFactory = Arc<dyn Fn() -> Arc<dyn Plugin> + Send + Sync>;

// ============================================================================
// EntryPointTable
// ============================================================================

/// 엔트리 포인트 이름 → 팩토리
///
/// 정적 링크된 플러그인 코드에 대한 심볼 해석 테이블.
#[derive(Clone, Default)]
pub struct EntryPointTable {
    factories: HashMap<String, PluginFactory>,
}

impl EntryPointTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 엔트리 포인트 등록 (같은 이름이면 교체)
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Arc<dyn Plugin> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// 빌더 패턴 등록
    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn Plugin> + Send + Sync + 'static,
    {
        self.register(name, factory);
        self
    }

    /// 다른 테이블 병합
    pub fn extend(&mut self, other: EntryPointTable) {
        self.factories.extend(other.factories);
    }

    pub fn resolve(&self, name: &str) -> Option<PluginFactory> {
        self.factories.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for EntryPointTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryPointTable")
            .field("names", &self.names())
            .finish()
    }
}

// ============================================================================
// PluginPackage
// ============================================================================

/// 플러그인 패키지 (디스크립터 + 위치 + 정적 에셋)
#[derive(Debug, Clone)]
pub struct PluginPackage {
    descriptor: PluginDescriptor,
    root: Option<PathBuf>,
    assets_dir: Option<PathBuf>,
}

impl PluginPackage {
    /// 메모리 내 패키지 (내장 플러그인 등)
    pub fn new(descriptor: PluginDescriptor) -> Self {
        Self {
            descriptor,
            root: None,
            assets_dir: None,
        }
    }

    /// 디스크 상의 패키지
    pub fn at(descriptor: PluginDescriptor, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let assets = root.join("assets");
        Self {
            descriptor,
            assets_dir: assets.is_dir().then_some(assets),
            root: Some(root),
        }
    }

    pub fn with_assets(mut self, assets_dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = Some(assets_dir.into());
        self
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn assets_dir(&self) -> Option<&Path> {
        self.assets_dir.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_detects_assets() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("assets")).unwrap();

        let package = PluginPackage::at(PluginDescriptor::new("acme.gallery", "Gallery"), dir.path());
        assert_eq!(package.id(), "acme.gallery");
        assert_eq!(package.assets_dir(), Some(dir.path().join("assets").as_path()));

        let bare = PluginPackage::new(PluginDescriptor::new("acme.bare", "Bare"));
        assert!(bare.root().is_none());
        assert!(bare.assets_dir().is_none());
    }

    #[test]
    fn test_entry_point_table_names() {
        let table = EntryPointTable::new();
        assert!(table.is_empty());
        assert!(table.resolve("missing").is_none());
    }
}
