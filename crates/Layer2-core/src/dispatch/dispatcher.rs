//! Event Dispatcher - 핸들러 체인 실행 엔진
//!
//! 1. (component, eventType)에 매칭되는 바인딩 해석 (우선순위 ↓, 등록 순서 ↑)
//! 2. 체인을 순서대로 실행 (동기: 타임아웃 내 대기 / 비동기: 백그라운드 실행)
//! 3. continueOnSuccess / continueOnError 규칙으로 중단 여부 결정
//! 4. 비동기 핸들러까지 모두 끝난 뒤 결과 병합

use super::aggregate::{aggregate, HandlerOutcome};
use super::table::{HandlerTable, ResolvedHandler};
use super::types::{DispatchRequest, EventResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{AbortHandle, JoinError, JoinHandle};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use trellis_foundation::{DispatchConfig, Error, Result};

type HandlerTask = JoinHandle<Result<EventResult>>;

/// 체인 내 한 자리 (완료 또는 진행 중인 비동기 핸들러)
enum Slot {
    Done(HandlerOutcome),
    Pending {
        label: String,
        task: HandlerTask,
        deadline: Instant,
        timeout: Duration,
    },
}

/// 이벤트 디스패처
pub struct EventDispatcher {
    handlers: Arc<HandlerTable>,
    config: DispatchConfig,
}

impl EventDispatcher {
    pub fn new(handlers: Arc<HandlerTable>, config: DispatchConfig) -> Self {
        Self { handlers, config }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn handlers(&self) -> &Arc<HandlerTable> {
        &self.handlers
    }

    /// 이벤트 하나에 대한 핸들러 체인 (진단용)
    pub fn resolve_chain(
        &self,
        component_id: &str,
        event_type: &str,
        plugin_id: Option<&str>,
    ) -> Vec<ResolvedHandler> {
        let mut chain = self.handlers.resolve(component_id, event_type, plugin_id);
        if chain.len() > self.config.max_chain_length {
            warn!(
                "Handler chain for {}/{} has {} entries, truncating to {}",
                component_id,
                event_type,
                chain.len(),
                self.config.max_chain_length
            );
            chain.truncate(self.config.max_chain_length);
        }
        chain
    }

    /// 이벤트 디스패치
    ///
    /// 항상 병합된 결과를 반환한다. 핸들러 에러는 결과의 errors에 담긴다.
    pub async fn dispatch(&self, request: DispatchRequest) -> EventResult {
        match self
            .dispatch_with_cancel(request, CancellationToken::new())
            .await
        {
            Ok(result) => result,
            Err(e) => EventResult::failure(e.to_string()),
        }
    }

    /// 취소 가능한 디스패치
    ///
    /// 토큰이 취소되면 진행 중인 핸들러 작업을 중단하고 부분 결과는 버린다.
    pub async fn dispatch_with_cancel(
        &self,
        request: DispatchRequest,
        cancel: CancellationToken,
    ) -> Result<EventResult> {
        let chain = self.resolve_chain(
            &request.component_id,
            &request.event_type,
            request.plugin_id.as_deref(),
        );
        if chain.is_empty() {
            debug!(
                "No handlers for {}/{}",
                request.component_id, request.event_type
            );
            return Ok(EventResult::success());
        }

        let event_id = uuid::Uuid::new_v4().to_string();
        let timestamp = chrono::Utc::now();
        debug!(
            "Dispatching {}/{} ({}) through {} handlers",
            request.component_id,
            request.event_type,
            event_id,
            chain.len()
        );

        let mut slots = Vec::with_capacity(chain.len());
        let mut inflight: Vec<AbortHandle> = Vec::with_capacity(chain.len());
        let mut stopped_on_failure = false;
        let mut seen_labels = HashMap::new();

        for handler in chain {
            let binding = Arc::clone(&handler.binding);
            let label = unique_label(&mut seen_labels, binding.label());
            let task = spawn_handler(&handler, request.to_context(&event_id, timestamp));
            inflight.push(task.abort_handle());

            if binding.is_async {
                let timeout = binding.timeout.unwrap_or_else(|| self.config.async_timeout());
                slots.push(Slot::Pending {
                    label,
                    task,
                    deadline: Instant::now() + timeout,
                    timeout,
                });
                continue;
            }

            let timeout = binding.timeout.unwrap_or_else(|| self.config.sync_timeout());
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    abort_all(&inflight);
                    return Err(Error::Cancelled);
                }
                outcome = join_until(task, label, Instant::now() + timeout, timeout) => outcome,
            };

            let failed = outcome.is_failure();
            slots.push(Slot::Done(outcome));

            if failed {
                if !binding.continue_on_error {
                    debug!("Chain stopped after failure in {}", binding.label());
                    stopped_on_failure = true;
                    break;
                }
            } else if !binding.continue_on_success {
                debug!("Chain stopped after success in {}", binding.label());
                break;
            }
        }

        // 비동기 핸들러 완료 대기
        let mut outcomes = Vec::with_capacity(slots.len());
        for slot in slots {
            match slot {
                Slot::Done(outcome) => outcomes.push(outcome),
                Slot::Pending {
                    label,
                    task,
                    deadline,
                    timeout,
                } => {
                    let outcome = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            abort_all(&inflight);
                            return Err(Error::Cancelled);
                        }
                        outcome = join_until(task, label, deadline, timeout) => outcome,
                    };
                    outcomes.push(outcome);
                }
            }
        }

        let result = aggregate(outcomes, stopped_on_failure, self.config.merge_policy);
        debug!("Dispatch {} finished with {}", event_id, result.status);
        Ok(result)
    }
}

/// 체인 안에서 겹치는 라벨에 `#2`, `#3` ... 을 붙인다 (첫 번째는 그대로)
fn unique_label(seen: &mut HashMap<String, usize>, label: String) -> String {
    let count = seen.entry(label.clone()).or_insert(0);
    *count += 1;
    if *count == 1 {
        label
    } else {
        format!("{}#{}", label, count)
    }
}

fn spawn_handler(handler: &ResolvedHandler, event: super::types::EventContext) -> HandlerTask {
    let callable = Arc::clone(&handler.binding.handler);
    let plugin = Arc::clone(&handler.context);
    tokio::spawn(async move { callable.handle(plugin, event).await })
}

/// 마감 시각까지 핸들러 결과 대기 (초과 시 작업 중단)
async fn join_until(
    mut task: HandlerTask,
    label: String,
    deadline: Instant,
    timeout: Duration,
) -> HandlerOutcome {
    let result = match tokio::time::timeout_at(deadline, &mut task).await {
        Ok(Ok(Ok(result))) => Ok(result),
        Ok(Ok(Err(e))) => {
            warn!("Handler {} failed: {}", label, e);
            Err(e)
        }
        Ok(Err(join_error)) => {
            warn!("Handler {} did not complete: {}", label, join_error);
            Err(Error::handler(&label, join_failure(&join_error)))
        }
        Err(_) => {
            task.abort();
            warn!("Handler {} timed out after {:?}", label, timeout);
            Err(Error::DispatchTimeout {
                handler: label.clone(),
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    };
    HandlerOutcome { label, result }
}

fn join_failure(error: &JoinError) -> &'static str {
    if error.is_panic() {
        "handler panicked"
    } else {
        "handler task was cancelled"
    }
}

fn abort_all(inflight: &[AbortHandle]) {
    for handle in inflight {
        handle.abort();
    }
}
