//! Event Handler Binding - (컴포넌트, 이벤트) → 핸들러 연결

use super::types::{EventContext, EventResult};
use crate::plugin::PluginContext;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use trellis_foundation::Result;

/// 모든 컴포넌트 / 모든 이벤트 매칭
pub const WILDCARD: &str = "*";

// ============================================================================
// EventHandler
// ============================================================================

/// 이벤트 핸들러 트레이트
///
/// 핸들러는 자신을 등록한 플러그인의 컨텍스트를 매 호출마다 전달받는다.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, plugin: Arc<PluginContext>, event: EventContext)
        -> Result<EventResult>;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(Arc<PluginContext>, EventContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<EventResult>> + Send + 'static,
{
    async fn handle(
        &self,
        plugin: Arc<PluginContext>,
        event: EventContext,
    ) -> Result<EventResult> {
        (self.0)(plugin, event).await
    }
}

/// 클로저로 핸들러 생성
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn EventHandler>
where
    F: Fn(Arc<PluginContext>, EventContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<EventResult>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

// ============================================================================
// EventHandlerBinding
// ============================================================================

/// 이벤트 핸들러 바인딩
///
/// 등록 후에는 변경되지 않는다. 재활성화 시 플러그인이 다시 등록한다.
#[derive(Clone)]
pub struct EventHandlerBinding {
    /// 소유 플러그인 (등록 시 컨텍스트가 채움)
    pub plugin_id: String,
    /// 컴포넌트 ID 또는 "*"
    pub component_id: String,
    /// 이벤트 타입 또는 "*"
    pub event_type: String,
    pub description: String,
    /// 높을수록 먼저 실행
    pub priority: i32,
    pub is_async: bool,
    pub continue_on_success: bool,
    pub continue_on_error: bool,
    /// 개별 타임아웃 (없으면 DispatchConfig 값)
    pub timeout: Option<Duration>,
    pub handler: Arc<dyn EventHandler>,
}

impl EventHandlerBinding {
    pub fn new(
        component_id: impl Into<String>,
        event_type: impl Into<String>,
        handler: Arc<dyn EventHandler>,
    ) -> Self {
        Self {
            plugin_id: String::new(),
            component_id: component_id.into(),
            event_type: event_type.into(),
            description: String::new(),
            priority: 0,
            is_async: false,
            continue_on_success: true,
            continue_on_error: false,
            timeout: None,
            handler,
        }
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn asynchronous(mut self) -> Self {
        self.is_async = true;
        self
    }

    /// 성공 시 체인 중단
    pub fn stop_on_success(mut self) -> Self {
        self.continue_on_success = false;
        self
    }

    /// 실패해도 체인 계속
    pub fn continue_on_error(mut self) -> Self {
        self.continue_on_error = true;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// (컴포넌트, 이벤트) 매칭
    pub fn matches(&self, component_id: &str, event_type: &str) -> bool {
        (self.component_id == WILDCARD || self.component_id == component_id)
            && (self.event_type == WILDCARD || self.event_type == event_type)
    }

    /// 에러/로그용 라벨
    pub fn label(&self) -> String {
        if self.description.is_empty() {
            format!("{}:{}/{}", self.plugin_id, self.component_id, self.event_type)
        } else {
            format!("{}:{}", self.plugin_id, self.description)
        }
    }
}

impl std::fmt::Debug for EventHandlerBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHandlerBinding")
            .field("plugin_id", &self.plugin_id)
            .field("component_id", &self.component_id)
            .field("event_type", &self.event_type)
            .field("priority", &self.priority)
            .field("is_async", &self.is_async)
            .field("continue_on_success", &self.continue_on_success)
            .field("continue_on_error", &self.continue_on_error)
            .finish()
    }
}
