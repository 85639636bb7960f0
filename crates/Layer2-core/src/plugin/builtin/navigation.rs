//! Navigation Plugin - 링크/버튼 컴포넌트와 페이지 이동

use crate::dispatch::{
    handler_fn, EventContext, EventHandlerBinding, EventResult, FrontendCommand, WILDCARD,
};
use crate::plugin::context::PluginContext;
use crate::plugin::descriptor::{PluginDescriptor, PluginProvides, PluginVersion};
use crate::plugin::traits::Plugin;
use crate::registry::{ComponentManifest, PropDefinition};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use trellis_foundation::Result;

pub const NAV_PLUGIN_ID: &str = "trellis.nav";

const ROUTE_PREFIX: &str = "/nav";

pub struct NavigationPlugin;

impl NavigationPlugin {
    pub fn descriptor() -> PluginDescriptor {
        PluginDescriptor::new(NAV_PLUGIN_ID, "Navigation")
            .with_version(super::BUILTIN_VERSION)
            .with_description("Button and Link components with click navigation")
            .with_provides(
                PluginProvides::new()
                    .with_component("Button")
                    .with_component("Link")
                    .with_route(ROUTE_PREFIX)
                    .with_event("onClick"),
            )
    }

    fn button() -> ComponentManifest {
        ComponentManifest::new("Button", "Button")
            .with_description("Clickable button, navigates when href is set")
            .with_category("navigation")
            .with_icon("cursor-click")
            .with_tag("action")
            .with_prop(PropDefinition::new("label", "string").with_default(json!("Button")))
            .with_prop(PropDefinition::new("href", "string"))
            .with_prop(
                PropDefinition::new("variant", "select")
                    .with_default(json!("primary"))
                    .with_options(vec![json!("primary"), json!("secondary"), json!("ghost")]),
            )
            .with_default_style("padding", json!("8px 16px"))
    }

    fn link() -> ComponentManifest {
        ComponentManifest::new("Link", "Link")
            .with_description("Inline hyperlink")
            .with_category("navigation")
            .with_icon("link")
            .with_prop(PropDefinition::new("href", "string").required())
            .with_prop(PropDefinition::new("text", "string").with_default(json!("Link")))
            .allow_children()
    }
}

/// 클릭 이벤트 처리: payload의 href로 이동 명령 생성
async fn on_click(_plugin: Arc<PluginContext>, event: EventContext) -> Result<EventResult> {
    let href = event
        .payload_field("href")
        .or_else(|| event.prop("href"))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty());

    Ok(match href {
        Some(href) => EventResult::success().with_command(FrontendCommand::navigate(href)),
        None => EventResult::success(),
    })
}

/// 이 플러그인 앞으로 온 이벤트 중 바인딩이 없는 것
async fn unhandled(plugin: Arc<PluginContext>, event: EventContext) -> Result<EventResult> {
    plugin.logger().debug(format!(
        "No navigation handler for {}/{}",
        event.component_id, event.event_type
    ));
    Ok(EventResult::success().with_message(format!("{} ignored", event.event_type)))
}

#[async_trait]
impl Plugin for NavigationPlugin {
    fn id(&self) -> &str {
        NAV_PLUGIN_ID
    }

    fn version(&self) -> PluginVersion {
        super::BUILTIN_VERSION
    }

    fn name(&self) -> &str {
        "Navigation"
    }

    async fn on_activate(&self, ctx: &PluginContext) -> Result<()> {
        ctx.register_component(Self::button());
        ctx.register_component(Self::link());
        ctx.register_route(ROUTE_PREFIX);
        ctx.register_handler(
            EventHandlerBinding::new(WILDCARD, "onClick", handler_fn(on_click))
                .described("navigate on click"),
        );
        ctx.register_fallback(handler_fn(unhandled));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatchRequest;
    use crate::plugin::context::tests::test_context;

    #[tokio::test]
    async fn test_registers_components_route_and_handlers() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(NAV_PLUGIN_ID, dir.path());
        NavigationPlugin.on_activate(&ctx).await.unwrap();

        let pending = ctx.take_pending();
        let ids: Vec<_> = pending.components.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["Button", "Link"]);
        assert_eq!(pending.routes, vec![ROUTE_PREFIX]);
        assert!(pending.handlers[0].matches("Anything", "onClick"));
        assert!(!pending.handlers[0].matches("Button", "onSubmit"));
        assert!(pending.fallback.is_some());
    }

    #[tokio::test]
    async fn test_click_with_href_navigates() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(NAV_PLUGIN_ID, dir.path());
        let now = chrono::Utc::now();

        let event = DispatchRequest::new("Button", "onClick")
            .payload(json!({ "href": "/about" }))
            .to_context("evt-1", now);
        let result = on_click(Arc::clone(&ctx), event).await.unwrap();
        assert_eq!(result.frontend_commands, vec![FrontendCommand::navigate("/about")]);

        let event = DispatchRequest::new("Button", "onClick").to_context("evt-2", now);
        let result = on_click(ctx, event).await.unwrap();
        assert!(result.is_empty());
    }
}
