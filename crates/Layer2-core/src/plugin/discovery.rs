//! Plugin Discovery - 파일 시스템에서 플러그인 패키지 발견
//!
//! 각 검색 경로의 하위 디렉토리에서 `plugin.json` 디스크립터를 찾는다.
//! 같은 ID가 여러 곳에 있으면 우선순위가 높은 scope 하나만 남긴다.

use super::descriptor::PluginDescriptor;
use super::package::PluginPackage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};
use trellis_foundation::{Error, Result, RuntimeConfig};

/// 디스크립터 파일명
pub const DESCRIPTOR_FILE: &str = "plugin.json";

// ============================================================================
// DiscoveredPlugin
// ============================================================================

/// 발견된 플러그인 패키지
#[derive(Debug, Clone)]
pub struct DiscoveredPlugin {
    pub package: PluginPackage,
    pub scope: PluginScope,
}

impl DiscoveredPlugin {
    pub fn id(&self) -> &str {
        self.package.id()
    }
}

/// 플러그인 발견 범위
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginScope {
    /// 프로젝트 레벨 (.trellis/plugins)
    Project,
    /// 사용자 레벨 (<config_dir>/trellis/plugins)
    User,
    /// 설정의 pluginDirs
    Extra,
}

impl PluginScope {
    /// 우선순위 (높을수록 우선)
    pub fn priority(&self) -> u8 {
        match self {
            PluginScope::Project => 3,
            PluginScope::User => 2,
            PluginScope::Extra => 1,
        }
    }
}

impl std::fmt::Display for PluginScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Project => write!(f, "project"),
            Self::User => write!(f, "user"),
            Self::Extra => write!(f, "extra"),
        }
    }
}

// ============================================================================
// PluginDiscovery
// ============================================================================

/// 플러그인 발견 시스템
pub struct PluginDiscovery {
    search_paths: Vec<(PathBuf, PluginScope)>,
}

impl PluginDiscovery {
    /// 검색 경로 없이 생성
    pub fn empty() -> Self {
        Self {
            search_paths: Vec::new(),
        }
    }

    /// 기본 검색 경로 (프로젝트 + 사용자)
    pub fn new(working_dir: &Path) -> Self {
        let mut discovery = Self::empty();
        discovery.add_search_path(
            working_dir.join(".trellis").join("plugins"),
            PluginScope::Project,
        );
        if let Some(config_dir) = dirs::config_dir() {
            discovery.add_search_path(
                config_dir.join("trellis").join("plugins"),
                PluginScope::User,
            );
        }
        discovery
    }

    /// 기본 검색 경로 + 설정의 pluginDirs
    pub fn from_config(working_dir: &Path, config: &RuntimeConfig) -> Self {
        let mut discovery = Self::new(working_dir);
        for dir in &config.plugin_dirs {
            discovery.add_search_path(dir.clone(), PluginScope::Extra);
        }
        discovery
    }

    pub fn add_search_path(&mut self, path: impl Into<PathBuf>, scope: PluginScope) {
        self.search_paths.push((path.into(), scope));
    }

    pub fn search_paths(&self) -> &[(PathBuf, PluginScope)] {
        &self.search_paths
    }

    /// 모든 플러그인 발견 (ID당 하나, 우선순위 → ID 순)
    pub async fn discover(&self) -> Vec<DiscoveredPlugin> {
        let mut by_id: HashMap<String, DiscoveredPlugin> = HashMap::new();

        for (path, scope) in &self.search_paths {
            if !path.is_dir() {
                continue;
            }

            let found = match self.scan_directory(path, *scope).await {
                Ok(found) => found,
                Err(e) => {
                    warn!("Failed to scan plugin directory {:?}: {}", path, e);
                    continue;
                }
            };

            for plugin in found {
                match by_id.get(plugin.id()) {
                    Some(existing) if existing.scope.priority() >= plugin.scope.priority() => {
                        debug!(
                            "Plugin {} in {} scope shadowed by {} scope",
                            plugin.id(),
                            plugin.scope,
                            existing.scope
                        );
                    }
                    _ => {
                        by_id.insert(plugin.id().to_string(), plugin);
                    }
                }
            }
        }

        let mut plugins: Vec<_> = by_id.into_values().collect();
        plugins.sort_by(|a, b| {
            b.scope
                .priority()
                .cmp(&a.scope.priority())
                .then_with(|| a.id().cmp(b.id()))
        });

        info!("Discovered {} plugins", plugins.len());
        plugins
    }

    /// 특정 ID의 플러그인 찾기
    pub async fn find(&self, id: &str) -> Option<DiscoveredPlugin> {
        self.discover().await.into_iter().find(|p| p.id() == id)
    }

    async fn scan_directory(&self, dir: &Path, scope: PluginScope) -> Result<Vec<DiscoveredPlugin>> {
        let mut plugins = Vec::new();
        let mut entries = fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let descriptor_path = path.join(DESCRIPTOR_FILE);
            if !descriptor_path.exists() {
                continue;
            }

            match parse_descriptor(&descriptor_path).await {
                Ok(descriptor) => {
                    debug!("Found plugin: {} at {:?}", descriptor.id, path);
                    plugins.push(DiscoveredPlugin {
                        package: PluginPackage::at(descriptor, &path),
                        scope,
                    });
                }
                Err(e) => {
                    warn!("Skipping plugin descriptor {:?}: {}", descriptor_path, e);
                }
            }
        }

        Ok(plugins)
    }
}

/// plugin.json 파싱 + 검증
pub async fn parse_descriptor(path: &Path) -> Result<PluginDescriptor> {
    let content = fs::read_to_string(path).await?;
    let descriptor: PluginDescriptor = serde_json::from_str(&content)
        .map_err(|e| Error::InvalidInput(format!("{}: {}", path.display(), e)))?;
    descriptor.validate()?;
    Ok(descriptor)
}
