//! Runtime Config - 플러그인 런타임 통합 설정
//!
//! 글로벌(<config_dir>/trellis) + 프로젝트(.trellis) 설정을 병합해서 사용

use crate::storage::JsonStore;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 설정 파일명
pub const RUNTIME_CONFIG_FILE: &str = "runtime.json";

// ============================================================================
// RuntimeConfig (통합)
// ============================================================================

/// 플러그인 런타임 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// 버전 (마이그레이션용)
    #[serde(default = "default_version")]
    pub version: u32,

    /// 추가 플러그인 검색 경로
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugin_dirs: Vec<PathBuf>,

    /// 플러그인 전용 데이터/설정 디렉토리 루트
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// 로드 후 자동 활성화
    #[serde(default = "default_true")]
    pub auto_activate: bool,

    /// 발견되더라도 로드하지 않을 플러그인 ID
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled_plugins: Vec<String>,

    /// 이벤트 디스패치 설정
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            plugin_dirs: Vec::new(),
            data_dir: None,
            auto_activate: true,
            disabled_plugins: Vec::new(),
            dispatch: DispatchConfig::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// 글로벌 + 프로젝트 병합 로드
    pub fn load() -> Result<Self> {
        let mut config = Self::new();

        // 1. 글로벌 설정
        if let Ok(global) = JsonStore::global() {
            if let Some(global_config) = global.load_optional::<RuntimeConfig>(RUNTIME_CONFIG_FILE)? {
                config.merge(global_config);
            }
        }

        // 2. 프로젝트 설정
        if let Ok(project) = JsonStore::current_project() {
            if let Some(project_config) =
                project.load_optional::<RuntimeConfig>(RUNTIME_CONFIG_FILE)?
            {
                config.merge(project_config);
            }
        }

        Ok(config)
    }

    /// 특정 파일에서 로드
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// 글로벌 설정 저장
    pub fn save_global(&self) -> Result<()> {
        let store = JsonStore::global()?;
        store.save(RUNTIME_CONFIG_FILE, self)
    }

    /// 프로젝트 설정 저장
    pub fn save_project(&self) -> Result<()> {
        let store = JsonStore::current_project()?;
        store.save(RUNTIME_CONFIG_FILE, self)
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// 다른 설정과 병합 (other가 우선)
    pub fn merge(&mut self, other: RuntimeConfig) {
        for dir in other.plugin_dirs {
            if !self.plugin_dirs.contains(&dir) {
                self.plugin_dirs.push(dir);
            }
        }
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
        self.auto_activate = other.auto_activate;
        for id in other.disabled_plugins {
            if !self.disabled_plugins.contains(&id) {
                self.disabled_plugins.push(id);
            }
        }
        self.dispatch.merge(other.dispatch);
    }

    // ========================================================================
    // 계산된 값
    // ========================================================================

    /// 플러그인 데이터 루트 (설정이 없으면 OS 데이터 디렉토리)
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("trellis")
                .join("plugins")
        })
    }

    /// 플러그인이 비활성 목록에 있는지
    pub fn is_disabled(&self, plugin_id: &str) -> bool {
        self.disabled_plugins.iter().any(|id| id == plugin_id)
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn plugin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.plugin_dirs.push(dir.into());
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn auto_activate(mut self, enabled: bool) -> Self {
        self.auto_activate = enabled;
        self
    }

    pub fn disable_plugin(mut self, plugin_id: impl Into<String>) -> Self {
        self.disabled_plugins.push(plugin_id.into());
        self
    }

    pub fn dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.dispatch = dispatch;
        self
    }
}

// ============================================================================
// Dispatch Config
// ============================================================================

/// 이벤트 결과 병합 우선순위
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MergePolicy {
    /// 나중 핸들러가 같은 키를 덮어씀
    #[default]
    LastWriteWins,
    /// 먼저 쓴 핸들러의 값을 유지
    FirstWriteWins,
}

/// 이벤트 디스패치 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchConfig {
    /// 동기 핸들러 1회 호출 제한 시간 (ms)
    #[serde(default = "default_sync_timeout_ms")]
    pub sync_timeout_ms: u64,

    /// 비동기 핸들러 1회 호출 제한 시간 (ms)
    #[serde(default = "default_async_timeout_ms")]
    pub async_timeout_ms: u64,

    /// 결과 병합 정책
    #[serde(default)]
    pub merge_policy: MergePolicy,

    /// 체인 최대 길이
    #[serde(default = "default_max_chain_length")]
    pub max_chain_length: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            sync_timeout_ms: default_sync_timeout_ms(),
            async_timeout_ms: default_async_timeout_ms(),
            merge_policy: MergePolicy::default(),
            max_chain_length: default_max_chain_length(),
        }
    }
}

impl DispatchConfig {
    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }

    pub fn async_timeout(&self) -> Duration {
        Duration::from_millis(self.async_timeout_ms)
    }

    pub fn with_sync_timeout(mut self, timeout: Duration) -> Self {
        self.sync_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_async_timeout(mut self, timeout: Duration) -> Self {
        self.async_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    fn merge(&mut self, other: DispatchConfig) {
        if other.sync_timeout_ms != default_sync_timeout_ms() {
            self.sync_timeout_ms = other.sync_timeout_ms;
        }
        if other.async_timeout_ms != default_async_timeout_ms() {
            self.async_timeout_ms = other.async_timeout_ms;
        }
        if other.merge_policy != MergePolicy::default() {
            self.merge_policy = other.merge_policy;
        }
        if other.max_chain_length != default_max_chain_length() {
            self.max_chain_length = other.max_chain_length;
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn default_version() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_sync_timeout_ms() -> u64 {
    5_000
}

fn default_async_timeout_ms() -> u64 {
    30_000
}

fn default_max_chain_length() -> usize {
    64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_config_default() {
        let config = RuntimeConfig::new();
        assert_eq!(config.version, 1);
        assert!(config.auto_activate);
        assert_eq!(config.dispatch.sync_timeout(), Duration::from_secs(5));
        assert_eq!(config.dispatch.merge_policy, MergePolicy::LastWriteWins);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: RuntimeConfig = serde_json::from_str(
            r#"{ "autoActivate": false, "dispatch": { "syncTimeoutMs": 2000 } }"#,
        )
        .unwrap();

        assert!(!config.auto_activate);
        assert_eq!(config.dispatch.sync_timeout_ms, 2000);
        assert_eq!(config.dispatch.async_timeout_ms, 30_000);
        assert_eq!(config.dispatch.max_chain_length, 64);
    }

    #[test]
    fn test_merge_project_over_global() {
        let mut global = RuntimeConfig::new()
            .plugin_dir("/opt/trellis/plugins")
            .disable_plugin("legacy.forms");
        let project = RuntimeConfig::new()
            .plugin_dir("./plugins")
            .data_dir("/var/lib/trellis")
            .dispatch(DispatchConfig::default().with_merge_policy(MergePolicy::FirstWriteWins));

        global.merge(project);

        assert_eq!(global.plugin_dirs.len(), 2);
        assert_eq!(global.data_dir, Some(PathBuf::from("/var/lib/trellis")));
        assert!(global.is_disabled("legacy.forms"));
        assert_eq!(global.dispatch.merge_policy, MergePolicy::FirstWriteWins);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(RUNTIME_CONFIG_FILE);
        std::fs::write(&path, r#"{ "disabledPlugins": ["x"] }"#).unwrap();

        let config = RuntimeConfig::load_from(&path).unwrap();
        assert!(config.is_disabled("x"));

        let missing = RuntimeConfig::load_from(&dir.path().join("nope.json"));
        assert!(matches!(missing, Err(Error::Config(_))));
    }
}
