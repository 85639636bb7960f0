//! Dispatch types - 이벤트 입력/출력 구조

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// ============================================================================
// EventSource
// ============================================================================

/// 이벤트 발생 위치
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    /// 게시된 페이지 런타임
    #[default]
    Runtime,
    /// 빌더 편집 화면
    Builder,
    /// 미리보기
    Preview,
    /// 외부 API 호출
    Api,
    /// 서버 내부
    System,
}

impl std::fmt::Display for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Runtime => write!(f, "runtime"),
            Self::Builder => write!(f, "builder"),
            Self::Preview => write!(f, "preview"),
            Self::Api => write!(f, "api"),
            Self::System => write!(f, "system"),
        }
    }
}

// ============================================================================
// EventContext - 핸들러 호출마다 새로 생성되는 입력
// ============================================================================

/// 핸들러 호출 1회의 입력 (읽기 전용)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    pub component_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_id: Option<String>,
    pub event_type: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub event_id: String,
    #[serde(default)]
    pub props: Map<String, Value>,
    #[serde(default)]
    pub styles: Map<String, Value>,
    #[serde(default)]
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub source: EventSource,
}

impl EventContext {
    /// payload에서 필드 조회
    pub fn payload_field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.props.get(key)
    }
}

// ============================================================================
// DispatchRequest - 프론트 컨트롤러 입력
// ============================================================================

/// 디스패치 요청
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    #[serde(default)]
    pub instance_id: Option<String>,
    pub component_id: String,
    #[serde(default)]
    pub plugin_id: Option<String>,
    pub event_type: String,
    #[serde(default)]
    pub props: Map<String, Value>,
    #[serde(default)]
    pub styles: Map<String, Value>,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub source: EventSource,
    #[serde(default)]
    pub page_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl DispatchRequest {
    pub fn new(component_id: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self {
            component_id: component_id.into(),
            event_type: event_type.into(),
            ..Default::default()
        }
    }

    pub fn plugin(mut self, plugin_id: impl Into<String>) -> Self {
        self.plugin_id = Some(plugin_id.into());
        self
    }

    pub fn instance(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }

    pub fn props(mut self, props: Map<String, Value>) -> Self {
        self.props = props;
        self
    }

    pub fn styles(mut self, styles: Map<String, Value>) -> Self {
        self.styles = styles;
        self
    }

    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn source(mut self, source: EventSource) -> Self {
        self.source = source;
        self
    }

    pub fn page(mut self, page_id: impl Into<String>) -> Self {
        self.page_id = Some(page_id.into());
        self
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// 호출 1회분 컨텍스트 생성
    pub(crate) fn to_context(
        &self,
        event_id: &str,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) -> EventContext {
        EventContext {
            instance_id: self.instance_id.clone(),
            component_id: self.component_id.clone(),
            plugin_id: self.plugin_id.clone(),
            event_type: self.event_type.clone(),
            timestamp,
            event_id: event_id.to_string(),
            props: self.props.clone(),
            styles: self.styles.clone(),
            payload: self.payload.clone(),
            page_id: self.page_id.clone(),
            user_id: self.user_id.clone(),
            session_id: self.session_id.clone(),
            source: self.source,
        }
    }
}

// ============================================================================
// EventResult - 핸들러 출력
// ============================================================================

/// 결과 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Success,
    Failure,
    Partial,
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Failure => write!(f, "FAILURE"),
            Self::Partial => write!(f, "PARTIAL"),
        }
    }
}

/// 브라우저에 전달할 명령
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontendCommand {
    /// 명령 이름 (navigate, toast, reload, ...)
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default)]
    pub payload: Value,
}

impl FrontendCommand {
    pub fn new(command: impl Into<String>, payload: Value) -> Self {
        Self {
            command: command.into(),
            target: None,
            payload,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn navigate(href: impl Into<String>) -> Self {
        Self::new("navigate", serde_json::json!({ "href": href.into() }))
    }

    pub fn toast(level: &str, message: impl Into<String>) -> Self {
        Self::new(
            "toast",
            serde_json::json!({ "level": level, "message": message.into() }),
        )
    }

    pub fn reload() -> Self {
        Self::new("reload", Value::Null)
    }

    /// 병합 키 (command:target)
    pub fn key(&self) -> String {
        format!("{}:{}", self.command, self.target.as_deref().unwrap_or(""))
    }
}

/// 다른 컴포넌트 인스턴스로 전파할 이벤트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastEvent {
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default)]
    pub payload: Value,
}

impl BroadcastEvent {
    pub fn new(event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            target: None,
            payload,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn key(&self) -> String {
        format!("{}:{}", self.event_type, self.target.as_deref().unwrap_or(""))
    }
}

/// 핸들러 결과 (집계 결과도 같은 구조)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResult {
    pub status: EventStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub errors: BTreeMap<String, String>,
    #[serde(default)]
    pub prop_updates: Map<String, Value>,
    #[serde(default)]
    pub style_updates: Map<String, Value>,
    #[serde(default)]
    pub frontend_commands: Vec<FrontendCommand>,
    #[serde(default)]
    pub broadcast_events: Vec<BroadcastEvent>,
}

impl EventResult {
    fn with_status(status: EventStatus) -> Self {
        Self {
            status,
            message: None,
            data: Map::new(),
            errors: BTreeMap::new(),
            prop_updates: Map::new(),
            style_updates: Map::new(),
            frontend_commands: Vec::new(),
            broadcast_events: Vec::new(),
        }
    }

    pub fn success() -> Self {
        Self::with_status(EventStatus::Success)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::with_status(EventStatus::Failure).with_message(message)
    }

    pub fn partial() -> Self {
        Self::with_status(EventStatus::Partial)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    pub fn with_error(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.errors.insert(field.into(), message.into());
        self
    }

    pub fn with_prop_update(mut self, key: impl Into<String>, value: Value) -> Self {
        self.prop_updates.insert(key.into(), value);
        self
    }

    pub fn with_style_update(mut self, key: impl Into<String>, value: Value) -> Self {
        self.style_updates.insert(key.into(), value);
        self
    }

    pub fn with_command(mut self, command: FrontendCommand) -> Self {
        self.frontend_commands.push(command);
        self
    }

    pub fn with_broadcast(mut self, event: BroadcastEvent) -> Self {
        self.broadcast_events.push(event);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == EventStatus::Success
    }

    pub fn is_failure(&self) -> bool {
        self.status == EventStatus::Failure
    }

    /// 페이로드가 비어 있는지 (상태/메시지 제외)
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
            && self.errors.is_empty()
            && self.prop_updates.is_empty()
            && self.style_updates.is_empty()
            && self.frontend_commands.is_empty()
            && self.broadcast_events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_serializes_camel_case() {
        let result = EventResult::success()
            .with_prop_update("label", json!("Saved"))
            .with_command(FrontendCommand::navigate("/thanks"));

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "SUCCESS");
        assert_eq!(value["propUpdates"]["label"], "Saved");
        assert_eq!(value["frontendCommands"][0]["command"], "navigate");
        assert_eq!(value["frontendCommands"][0]["payload"]["href"], "/thanks");
    }

    #[test]
    fn test_request_builds_context() {
        let request = DispatchRequest::new("Button", "onClick")
            .plugin("trellis.nav")
            .payload(json!({ "href": "/about" }))
            .source(EventSource::Preview)
            .user("u-1");

        let now = chrono::Utc::now();
        let ctx = request.to_context("evt-1", now);
        assert_eq!(ctx.event_id, "evt-1");
        assert_eq!(ctx.plugin_id.as_deref(), Some("trellis.nav"));
        assert_eq!(ctx.payload_field("href"), Some(&json!("/about")));
        assert_eq!(ctx.source, EventSource::Preview);
        assert_eq!(ctx.user_id.as_deref(), Some("u-1"));
    }

    #[test]
    fn test_command_key() {
        assert_eq!(FrontendCommand::reload().key(), "reload:");
        assert_eq!(
            FrontendCommand::toast("info", "hi").with_target("main").key(),
            "toast:main"
        );
    }
}
