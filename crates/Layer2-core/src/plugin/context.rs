//! Plugin Context - 플러그인에 제공되는 권한 범위 핸들
//!
//! 플러그인 ID, 전용 데이터 디렉토리, 전용 설정 저장소, 로거,
//! 플랫폼 공유 / 플러그인 전용 서비스 컨테이너를 묶는다.
//! `on_activate` 동안에는 기능 등록(registrar) 창구 역할도 한다.

use super::services::ServiceContainer;
use crate::dispatch::{EventHandler, EventHandlerBinding};
use crate::registry::ComponentManifest;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use trellis_foundation::{JsonStore, Result};

/// 플러그인 설정 파일명
const PLUGIN_CONFIG_FILE: &str = "config.json";

// ============================================================================
// PluginConfigStore - 플러그인 전용 설정
// ============================================================================

/// 플러그인 전용 키/값 설정 저장소
///
/// `<dataDir>/<id>/config/config.json`에 영속화된다. 소유 플러그인만 접근하므로
/// 플러그인 간 잠금이 필요 없다.
pub struct PluginConfigStore {
    store: JsonStore,
    values: RwLock<HashMap<String, Value>>,
    /// 스냅샷 + 저장 직렬화 (나중 저장이 항상 더 새로운 스냅샷)
    save_lock: Mutex<()>,
}

impl PluginConfigStore {
    pub fn open(config_dir: impl Into<PathBuf>) -> Self {
        let store = JsonStore::new(config_dir);
        let values = store.load_or_default(PLUGIN_CONFIG_FILE);
        Self {
            store,
            values: RwLock::new(values),
            save_lock: Mutex::new(()),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    /// 값 설정 후 즉시 저장
    pub fn set(&self, key: impl Into<String>, value: Value) -> Result<()> {
        self.values.write().insert(key.into(), value);
        self.flush()
    }

    /// 현재 값을 보고 새 값을 계산해 저장 (읽기-수정-쓰기가 원자적)
    pub fn update<F>(&self, key: impl Into<String>, f: F) -> Result<Value>
    where
        F: FnOnce(Option<&Value>) -> Value,
    {
        let key = key.into();
        let value = {
            let mut values = self.values.write();
            let next = f(values.get(&key));
            values.insert(key, next.clone());
            next
        };
        self.flush()?;
        Ok(value)
    }

    pub fn remove(&self, key: &str) -> Result<Option<Value>> {
        let removed = self.values.write().remove(key);
        if removed.is_some() {
            self.flush()?;
        }
        Ok(removed)
    }

    pub fn all(&self) -> HashMap<String, Value> {
        self.values.read().clone()
    }

    pub fn flush(&self) -> Result<()> {
        let _guard = self.save_lock.lock();
        let snapshot = self.values.read().clone();
        self.store.save(PLUGIN_CONFIG_FILE, &snapshot)
    }

    pub fn path(&self) -> PathBuf {
        self.store.file_path(PLUGIN_CONFIG_FILE)
    }
}

// ============================================================================
// PluginLogger
// ============================================================================

/// 플러그인 로거 - 플러그인 ID를 붙여 tracing 이벤트로 기록
#[derive(Debug, Clone)]
pub struct PluginLogger {
    plugin_id: String,
}

impl PluginLogger {
    pub fn new(plugin_id: impl Into<String>) -> Self {
        Self {
            plugin_id: plugin_id.into(),
        }
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        tracing::debug!(target: "trellis::plugin", plugin = %self.plugin_id, "{}", message.as_ref());
    }

    pub fn info(&self, message: impl AsRef<str>) {
        tracing::info!(target: "trellis::plugin", plugin = %self.plugin_id, "{}", message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        tracing::warn!(target: "trellis::plugin", plugin = %self.plugin_id, "{}", message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        tracing::error!(target: "trellis::plugin", plugin = %self.plugin_id, "{}", message.as_ref());
    }
}

// ============================================================================
// Pending capabilities
// ============================================================================

/// on_activate 동안 수집된 기능 (성공 시 한 번에 적용)
#[derive(Default)]
pub(crate) struct PendingCapabilities {
    pub components: Vec<ComponentManifest>,
    pub routes: Vec<String>,
    pub handlers: Vec<EventHandlerBinding>,
    pub fallback: Option<Arc<dyn EventHandler>>,
}

impl PendingCapabilities {
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
            && self.routes.is_empty()
            && self.handlers.is_empty()
            && self.fallback.is_none()
    }
}

// ============================================================================
// PluginContext
// ============================================================================

/// 플러그인 컨텍스트
///
/// 하나의 PluginInstance가 독점 소유하며 다른 플러그인과 공유되지 않는다.
pub struct PluginContext {
    plugin_id: String,
    data_dir: PathBuf,
    config: PluginConfigStore,
    logger: PluginLogger,
    platform: Arc<ServiceContainer>,
    services: Arc<ServiceContainer>,
    active: AtomicBool,
    pending: Mutex<PendingCapabilities>,
}

impl PluginContext {
    pub(crate) fn new(
        plugin_id: impl Into<String>,
        data_dir: impl Into<PathBuf>,
        config_dir: impl Into<PathBuf>,
        platform: Arc<ServiceContainer>,
        services: Arc<ServiceContainer>,
    ) -> Self {
        let plugin_id = plugin_id.into();
        Self {
            logger: PluginLogger::new(plugin_id.clone()),
            plugin_id,
            data_dir: data_dir.into(),
            config: PluginConfigStore::open(config_dir),
            platform,
            services,
            active: AtomicBool::new(false),
            pending: Mutex::new(PendingCapabilities::default()),
        }
    }

    // ========================================================================
    // 식별 / 저장소
    // ========================================================================

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// 전용 데이터 디렉토리
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// 전용 설정 저장소
    pub fn config(&self) -> &PluginConfigStore {
        &self.config
    }

    pub fn logger(&self) -> &PluginLogger {
        &self.logger
    }

    // ========================================================================
    // 서비스
    // ========================================================================

    /// 플랫폼 공유 서비스
    pub fn platform_services(&self) -> &ServiceContainer {
        &self.platform
    }

    /// 플러그인 전용 서비스
    pub fn services(&self) -> &ServiceContainer {
        &self.services
    }

    // ========================================================================
    // 활성 상태
    // ========================================================================

    /// 비활성화되면 false (컨텍스트 무효화)
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub(crate) fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }

    // ========================================================================
    // 기능 등록 (on_activate 중 사용)
    // ========================================================================

    pub fn register_component(&self, manifest: ComponentManifest) {
        self.pending.lock().components.push(manifest);
    }

    /// 컨트롤러 라우트 prefix 등록
    pub fn register_route(&self, prefix: impl Into<String>) {
        self.pending.lock().routes.push(prefix.into());
    }

    /// 이벤트 핸들러 등록 (소유 플러그인 ID가 채워짐)
    pub fn register_handler(&self, mut binding: EventHandlerBinding) {
        binding.plugin_id = self.plugin_id.clone();
        self.pending.lock().handlers.push(binding);
    }

    /// 매칭되는 바인딩이 없을 때 이 플러그인 앞으로 온 이벤트를 받는 핸들러
    pub fn register_fallback(&self, handler: Arc<dyn EventHandler>) {
        self.pending.lock().fallback = Some(handler);
    }

    pub(crate) fn take_pending(&self) -> PendingCapabilities {
        std::mem::take(&mut *self.pending.lock())
    }

    pub(crate) fn discard_pending(&self) {
        let _ = self.take_pending();
    }
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("plugin_id", &self.plugin_id)
            .field("data_dir", &self.data_dir)
            .field("active", &self.is_active())
            .finish()
    }
}
