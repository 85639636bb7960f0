//! Handler Table - 활성 플러그인의 이벤트 핸들러 바인딩 저장소

use super::binding::{EventHandler, EventHandlerBinding, WILDCARD};
use crate::plugin::PluginContext;
use parking_lot::RwLock;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// 체인에 포함된 핸들러 하나
#[derive(Clone)]
pub struct ResolvedHandler {
    pub binding: Arc<EventHandlerBinding>,
    pub context: Arc<PluginContext>,
    /// 플러그인 전용 fallback 여부
    pub fallback: bool,
}

impl std::fmt::Debug for ResolvedHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedHandler")
            .field("binding", &self.binding)
            .field("fallback", &self.fallback)
            .finish()
    }
}

struct HandlerEntry {
    binding: Arc<EventHandlerBinding>,
    /// 등록 순서 (동일 우선순위 정렬용)
    seq: u64,
    context: Arc<PluginContext>,
}

struct FallbackEntry {
    binding: Arc<EventHandlerBinding>,
    context: Arc<PluginContext>,
}

#[derive(Default)]
struct TableState {
    entries: Vec<HandlerEntry>,
    fallbacks: HashMap<String, FallbackEntry>,
    next_seq: u64,
}

/// 핸들러 테이블
///
/// 플러그인 단위 설치/제거는 하나의 쓰기 잠금 안에서 끝난다.
#[derive(Default)]
pub struct HandlerTable {
    state: RwLock<TableState>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 플러그인의 바인딩을 한 번에 설치 (이전 바인딩은 교체)
    pub fn install_plugin(
        &self,
        plugin_id: &str,
        context: Arc<PluginContext>,
        bindings: Vec<EventHandlerBinding>,
        fallback: Option<Arc<dyn EventHandler>>,
    ) {
        let mut state = self.state.write();
        state.entries.retain(|e| e.binding.plugin_id != plugin_id);
        state.fallbacks.remove(plugin_id);

        let count = bindings.len();
        for mut binding in bindings {
            binding.plugin_id = plugin_id.to_string();
            if binding.is_async && !binding.continue_on_success {
                warn!(
                    "Async handler {} asked to stop the chain on success; async handlers never stop it",
                    binding.label()
                );
            }
            let seq = state.next_seq;
            state.next_seq += 1;
            state.entries.push(HandlerEntry {
                binding: Arc::new(binding),
                seq,
                context: Arc::clone(&context),
            });
        }

        if let Some(handler) = fallback {
            let mut binding =
                EventHandlerBinding::new(WILDCARD, WILDCARD, handler).described("fallback");
            binding.plugin_id = plugin_id.to_string();
            state.fallbacks.insert(
                plugin_id.to_string(),
                FallbackEntry {
                    binding: Arc::new(binding),
                    context,
                },
            );
        }

        debug!("Installed {} handler bindings for {}", count, plugin_id);
    }

    /// 플러그인의 바인딩 제거 (멱등)
    pub fn remove_plugin(&self, plugin_id: &str) -> usize {
        let mut state = self.state.write();
        let before = state.entries.len();
        state.entries.retain(|e| e.binding.plugin_id != plugin_id);
        let fallback = state.fallbacks.remove(plugin_id).is_some();
        before - state.entries.len() + usize::from(fallback)
    }

    /// 핸들러 체인 해석
    ///
    /// 매칭 바인딩을 우선순위 내림차순, 등록 순서 오름차순으로 정렬한다.
    /// 이벤트가 특정 플러그인 앞이고 그 플러그인의 바인딩이 하나도 매칭되지 않으면
    /// 그 플러그인의 fallback이 자기 우선순위 자리에 끼어든다
    /// (같은 우선순위에서는 일반 바인딩 뒤).
    pub fn resolve(
        &self,
        component_id: &str,
        event_type: &str,
        target_plugin: Option<&str>,
    ) -> Vec<ResolvedHandler> {
        let state = self.state.read();

        let mut chain: Vec<(i32, u64, ResolvedHandler)> = state
            .entries
            .iter()
            .filter(|e| e.context.is_active() && e.binding.matches(component_id, event_type))
            .map(|e| {
                let handler = ResolvedHandler {
                    binding: Arc::clone(&e.binding),
                    context: Arc::clone(&e.context),
                    fallback: false,
                };
                (e.binding.priority, e.seq, handler)
            })
            .collect();

        if let Some(target) = target_plugin {
            let handled = chain.iter().any(|(_, _, h)| h.binding.plugin_id == target);
            let fallback = state
                .fallbacks
                .get(target)
                .filter(|f| !handled && f.context.is_active());
            if let Some(f) = fallback {
                let handler = ResolvedHandler {
                    binding: Arc::clone(&f.binding),
                    context: Arc::clone(&f.context),
                    fallback: true,
                };
                chain.push((f.binding.priority, u64::MAX, handler));
            }
        }

        chain.sort_by_key(|(priority, seq, _)| (Reverse(*priority), *seq));
        chain.into_iter().map(|(_, _, handler)| handler).collect()
    }

    pub fn has_fallback(&self, plugin_id: &str) -> bool {
        self.state.read().fallbacks.contains_key(plugin_id)
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{handler_fn, EventResult};
    use crate::plugin::context::tests::test_context;

    fn binding(component: &str, event: &str, priority: i32, label: &str) -> EventHandlerBinding {
        EventHandlerBinding::new(
            component,
            event,
            handler_fn(|_, _| async { Ok(EventResult::success()) }),
        )
        .priority(priority)
        .described(label)
    }

    #[test]
    fn test_priority_then_registration_order() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context("p1", dir.path());
        ctx.set_active(true);

        let table = HandlerTable::new();
        table.install_plugin(
            "p1",
            ctx,
            vec![
                binding("Button", "onClick", 5, "B"),
                binding("Button", "onClick", 0, "D"),
                binding("*", "onClick", 10, "A"),
                binding("Button", "*", 5, "C"),
            ],
            None,
        );

        let chain: Vec<_> = table
            .resolve("Button", "onClick", None)
            .into_iter()
            .map(|h| h.binding.description.clone())
            .collect();
        assert_eq!(chain, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_inactive_context_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context("p1", dir.path());

        let table = HandlerTable::new();
        table.install_plugin("p1", ctx, vec![binding("*", "*", 0, "all")], None);
        assert!(table.resolve("Button", "onClick", None).is_empty());
    }

    #[test]
    fn test_fallback_only_for_target_plugin() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context("forms", dir.path());
        ctx.set_active(true);

        let table = HandlerTable::new();
        table.install_plugin(
            "forms",
            ctx,
            vec![binding("Form", "onSubmit", 0, "submit")],
            Some(handler_fn(|_, _| async { Ok(EventResult::success()) })),
        );

        let chain = table.resolve("Form", "onReset", Some("forms"));
        assert_eq!(chain.len(), 1);
        assert!(chain[0].fallback);

        assert!(table.resolve("Form", "onReset", Some("other")).is_empty());
        assert!(!table.resolve("Form", "onSubmit", Some("forms"))[0].fallback);

        assert_eq!(table.remove_plugin("forms"), 2);
        assert!(table.is_empty());
        assert!(!table.has_fallback("forms"));
    }

    #[test]
    fn test_fallback_joins_other_plugins_handlers() {
        let dir = tempfile::tempdir().unwrap();
        let nav = test_context("nav", dir.path());
        let audit = test_context("audit", dir.path());
        let hooks = test_context("hooks", dir.path());
        for ctx in [&nav, &audit, &hooks] {
            ctx.set_active(true);
        }

        let table = HandlerTable::new();
        table.install_plugin(
            "nav",
            nav,
            vec![binding("Link", "onClick", 0, "click")],
            Some(handler_fn(|_, _| async { Ok(EventResult::success()) })),
        );
        table.install_plugin("audit", audit, vec![binding("*", "*", i32::MIN, "audit")], None);
        table.install_plugin("hooks", hooks, vec![binding("Link", "*", 0, "hook")], None);

        let chain: Vec<_> = table
            .resolve("Link", "onHover", Some("nav"))
            .into_iter()
            .map(|h| (h.binding.label(), h.fallback))
            .collect();
        assert_eq!(
            chain,
            vec![
                ("hooks:hook".to_string(), false),
                ("nav:fallback".to_string(), true),
                ("audit:audit".to_string(), false),
            ]
        );

        // 대상 플러그인이 직접 처리하면 fallback은 빠진다
        let chain = table.resolve("Link", "onClick", Some("nav"));
        assert_eq!(chain.len(), 3);
        assert!(chain.iter().all(|h| !h.fallback));
    }
}
