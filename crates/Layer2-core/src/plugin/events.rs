//! Runtime Events - 라이프사이클 이벤트 버스
//!
//! 컨트롤러가 상태 전이 결과마다 하나의 이벤트를 발행한다.
//! 프론트엔드 이벤트 디스패치(`crate::dispatch`)와는 별개의 운영용 채널.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

// ============================================================================
// RuntimeEvent
// ============================================================================

/// 런타임 이벤트 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeEventKind {
    PluginLoaded,
    PluginLoadFailed,
    PluginActivated,
    PluginDeactivated,
    PluginUninstalled,
    LifecycleFailed,
    CapabilitiesRegistered,
    CapabilitiesRemoved,
}

impl std::fmt::Display for RuntimeEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PluginLoaded => write!(f, "plugin_loaded"),
            Self::PluginLoadFailed => write!(f, "plugin_load_failed"),
            Self::PluginActivated => write!(f, "plugin_activated"),
            Self::PluginDeactivated => write!(f, "plugin_deactivated"),
            Self::PluginUninstalled => write!(f, "plugin_uninstalled"),
            Self::LifecycleFailed => write!(f, "lifecycle_failed"),
            Self::CapabilitiesRegistered => write!(f, "capabilities_registered"),
            Self::CapabilitiesRemoved => write!(f, "capabilities_removed"),
        }
    }
}

/// 런타임 이벤트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeEvent {
    pub kind: RuntimeEventKind,
    pub plugin_id: String,
    pub data: Value,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl RuntimeEvent {
    pub fn new(kind: RuntimeEventKind, plugin_id: impl Into<String>, data: Value) -> Self {
        Self {
            kind,
            plugin_id: plugin_id.into(),
            data,
            timestamp: chrono::Utc::now(),
        }
    }

    /// 데이터 없는 이벤트
    pub fn simple(kind: RuntimeEventKind, plugin_id: impl Into<String>) -> Self {
        Self::new(kind, plugin_id, Value::Null)
    }
}

// ============================================================================
// RuntimeEventBus - 발행/구독 + 히스토리
// ============================================================================

pub struct RuntimeEventBus {
    sender: broadcast::Sender<RuntimeEvent>,
    history: RwLock<VecDeque<RuntimeEvent>>,
    history_size: usize,
}

impl RuntimeEventBus {
    pub fn new() -> Self {
        Self::with_capacity(256, 200)
    }

    pub fn with_capacity(channel_capacity: usize, history_size: usize) -> Self {
        let (sender, _) = broadcast::channel(channel_capacity);
        Self {
            sender,
            history: RwLock::new(VecDeque::with_capacity(history_size)),
            history_size,
        }
    }

    /// 이벤트 발행
    pub async fn publish(&self, event: RuntimeEvent) {
        debug!("Publishing runtime event {} for {}", event.kind, event.plugin_id);

        {
            let mut history = self.history.write().await;
            if history.len() >= self.history_size {
                history.pop_front();
            }
            history.push_back(event.clone());
        }

        // 구독자가 없어도 OK
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RuntimeEvent> {
        self.sender.subscribe()
    }

    pub async fn history(&self) -> Vec<RuntimeEvent> {
        self.history.read().await.iter().cloned().collect()
    }

    /// 특정 플러그인의 이벤트 히스토리
    pub async fn history_for(&self, plugin_id: &str) -> Vec<RuntimeEvent> {
        self.history
            .read()
            .await
            .iter()
            .filter(|e| e.plugin_id == plugin_id)
            .cloned()
            .collect()
    }

    pub async fn clear_history(&self) {
        self.history.write().await.clear();
    }
}

impl Default for RuntimeEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_history_is_bounded() {
        let bus = RuntimeEventBus::with_capacity(8, 2);
        bus.publish(RuntimeEvent::simple(RuntimeEventKind::PluginLoaded, "a"))
            .await;
        bus.publish(RuntimeEvent::simple(RuntimeEventKind::PluginActivated, "a"))
            .await;
        bus.publish(RuntimeEvent::simple(RuntimeEventKind::PluginLoaded, "b"))
            .await;

        let history = bus.history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].kind, RuntimeEventKind::PluginActivated);
        assert_eq!(bus.history_for("b").await.len(), 1);
    }

    #[tokio::test]
    async fn test_subscribe() {
        let bus = Arc::new(RuntimeEventBus::new());
        let mut receiver = bus.subscribe();

        let publisher = Arc::clone(&bus);
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            publisher
                .publish(RuntimeEvent::simple(RuntimeEventKind::PluginDeactivated, "nav"))
                .await;
        });

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.kind, RuntimeEventKind::PluginDeactivated);
        assert_eq!(event.plugin_id, "nav");
    }
}
