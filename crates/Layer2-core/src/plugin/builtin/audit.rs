//! Audit Plugin - 모든 이벤트 기록
//!
//! `*`/`*` 비동기 바인딩을 가장 낮은 우선순위로 등록하고
//! 처리한 이벤트 수를 설정 저장소의 `eventCount`에 남긴다.

use crate::dispatch::{EventContext, EventHandler, EventHandlerBinding, EventResult, WILDCARD};
use crate::plugin::context::PluginContext;
use crate::plugin::descriptor::{PluginDescriptor, PluginProvides, PluginVersion};
use crate::plugin::traits::Plugin;
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use trellis_foundation::Result;

pub const AUDIT_PLUGIN_ID: &str = "trellis.audit";

const EVENT_COUNT_KEY: &str = "eventCount";

/// 플러그인 전용 서비스 컨테이너에 보관되는 카운터
struct EventCounter(AtomicU64);

pub struct AuditPlugin;

impl AuditPlugin {
    pub fn descriptor() -> PluginDescriptor {
        PluginDescriptor::new(AUDIT_PLUGIN_ID, "Audit")
            .with_version(super::BUILTIN_VERSION)
            .with_description("Logs every dispatched event")
            .with_provides(PluginProvides::new().with_event(WILDCARD))
    }
}

#[async_trait]
impl Plugin for AuditPlugin {
    fn id(&self) -> &str {
        AUDIT_PLUGIN_ID
    }

    fn version(&self) -> PluginVersion {
        super::BUILTIN_VERSION
    }

    fn name(&self) -> &str {
        "Audit"
    }

    fn description(&self) -> &str {
        "Logs every dispatched event"
    }

    async fn on_activate(&self, ctx: &PluginContext) -> Result<()> {
        let persisted = ctx
            .config()
            .get(EVENT_COUNT_KEY)
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        ctx.services()
            .insert(Arc::new(EventCounter(AtomicU64::new(persisted))));

        ctx.register_handler(
            EventHandlerBinding::new(WILDCARD, WILDCARD, Arc::new(AuditHandler))
                .described("audit")
                .priority(i32::MIN)
                .asynchronous()
                .continue_on_error(),
        );
        ctx.logger()
            .info(format!("Audit active ({} events recorded so far)", persisted));
        Ok(())
    }

    async fn on_deactivate(&self, ctx: &PluginContext) -> Result<()> {
        ctx.config().flush()
    }
}

struct AuditHandler;

#[async_trait]
impl EventHandler for AuditHandler {
    async fn handle(&self, plugin: Arc<PluginContext>, event: EventContext) -> Result<EventResult> {
        let count = match plugin.services().get::<EventCounter>() {
            Some(counter) => counter.0.fetch_add(1, Ordering::SeqCst) + 1,
            None => 0,
        };

        plugin.logger().info(format!(
            "#{} {}/{} ({}) from {}",
            count,
            event.component_id,
            event.event_type,
            event.event_id,
            event.plugin_id.as_deref().unwrap_or("-")
        ));
        // 동시 호출이 늦게 도착해도 저장된 값은 줄지 않는다
        plugin.config().update(EVENT_COUNT_KEY, |prev| {
            let stored = prev.and_then(|v| v.as_u64()).unwrap_or(0);
            json!(stored.max(count))
        })?;

        Ok(EventResult::success().with_data("audited", json!(count)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatchRequest;
    use crate::plugin::context::tests::test_context;

    #[tokio::test]
    async fn test_counts_events_in_config_store() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(AUDIT_PLUGIN_ID, dir.path());
        AuditPlugin.on_activate(&ctx).await.unwrap();

        let pending = ctx.take_pending();
        assert_eq!(pending.handlers.len(), 1);
        let binding = &pending.handlers[0];
        assert!(binding.is_async);
        assert_eq!(binding.priority, i32::MIN);
        assert!(binding.matches("Anything", "onWhatever"));

        let event = DispatchRequest::new("Button", "onClick").to_context("evt-1", chrono::Utc::now());
        binding
            .handler
            .handle(Arc::clone(&ctx), event.clone())
            .await
            .unwrap();
        binding.handler.handle(Arc::clone(&ctx), event).await.unwrap();

        assert_eq!(ctx.config().get(EVENT_COUNT_KEY), Some(json!(2)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_events_never_lower_the_count() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(AUDIT_PLUGIN_ID, dir.path());
        AuditPlugin.on_activate(&ctx).await.unwrap();
        let binding = ctx.take_pending().handlers.remove(0);

        let tasks: Vec<_> = (0..40)
            .map(|i| {
                let handler = Arc::clone(&binding.handler);
                let ctx = Arc::clone(&ctx);
                let event = DispatchRequest::new("Button", "onClick")
                    .to_context(&format!("evt-{}", i), chrono::Utc::now());
                tokio::spawn(async move { handler.handle(ctx, event).await })
            })
            .collect();
        for task in futures::future::join_all(tasks).await {
            task.unwrap().unwrap();
        }

        assert_eq!(ctx.config().get(EVENT_COUNT_KEY), Some(json!(40)));
        let reopened = crate::plugin::context::PluginConfigStore::open(
            ctx.config().path().parent().unwrap(),
        );
        assert_eq!(reopened.get(EVENT_COUNT_KEY), Some(json!(40)));
    }
}
