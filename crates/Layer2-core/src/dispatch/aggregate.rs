//! Result aggregation - 체인 결과를 하나의 응답으로 병합

use super::types::{EventResult, EventStatus};
use serde_json::{Map, Value};
use trellis_foundation::{Error, MergePolicy};

/// 핸들러 1회 호출 결과
#[derive(Debug)]
pub(crate) struct HandlerOutcome {
    pub label: String,
    pub result: Result<EventResult, Error>,
}

impl HandlerOutcome {
    pub fn is_failure(&self) -> bool {
        match &self.result {
            Ok(result) => result.is_failure(),
            Err(_) => true,
        }
    }
}

/// 체인 순서대로 결과 병합
///
/// `stopped_on_failure`는 continueOnError=false인 핸들러의 실패로 체인이 끊긴 경우.
pub(crate) fn aggregate(
    outcomes: Vec<HandlerOutcome>,
    stopped_on_failure: bool,
    policy: MergePolicy,
) -> EventResult {
    let mut merged = EventResult::success();
    let (mut successes, mut failures, mut partials) = (0usize, 0usize, 0usize);

    for outcome in outcomes {
        match outcome.result {
            Ok(result) => {
                match result.status {
                    EventStatus::Success => successes += 1,
                    EventStatus::Partial => partials += 1,
                    EventStatus::Failure => {
                        failures += 1;
                        if let Some(message) = &result.message {
                            merge_entry(
                                &mut merged.errors,
                                outcome.label.clone(),
                                message.clone(),
                                policy,
                            );
                        }
                    }
                }
                merge_result(&mut merged, result, policy);
            }
            Err(err) => {
                failures += 1;
                merge_entry(&mut merged.errors, outcome.label, err.to_string(), policy);
            }
        }
    }

    merged.status = if stopped_on_failure || (failures > 0 && successes == 0 && partials == 0) {
        EventStatus::Failure
    } else if failures > 0 || partials > 0 {
        EventStatus::Partial
    } else {
        EventStatus::Success
    };

    if merged.status == EventStatus::Failure && merged.message.is_none() {
        merged.message = Some(format!("{} handler(s) failed", failures));
    }

    merged
}

fn merge_result(target: &mut EventResult, source: EventResult, policy: MergePolicy) {
    if let Some(message) = source.message {
        if policy == MergePolicy::LastWriteWins || target.message.is_none() {
            target.message = Some(message);
        }
    }

    merge_map(&mut target.data, source.data, policy);
    merge_map(&mut target.prop_updates, source.prop_updates, policy);
    merge_map(&mut target.style_updates, source.style_updates, policy);
    for (field, message) in source.errors {
        merge_entry(&mut target.errors, field, message, policy);
    }

    for command in source.frontend_commands {
        let key = command.key();
        match target.frontend_commands.iter().position(|c| c.key() == key) {
            Some(index) if policy == MergePolicy::LastWriteWins => {
                target.frontend_commands[index] = command
            }
            Some(_) => {}
            None => target.frontend_commands.push(command),
        }
    }

    for event in source.broadcast_events {
        let key = event.key();
        match target.broadcast_events.iter().position(|e| e.key() == key) {
            Some(index) if policy == MergePolicy::LastWriteWins => {
                target.broadcast_events[index] = event
            }
            Some(_) => {}
            None => target.broadcast_events.push(event),
        }
    }
}

fn merge_map(target: &mut Map<String, Value>, source: Map<String, Value>, policy: MergePolicy) {
    for (key, value) in source {
        match policy {
            MergePolicy::LastWriteWins => {
                target.insert(key, value);
            }
            MergePolicy::FirstWriteWins => {
                target.entry(key).or_insert(value);
            }
        }
    }
}

fn merge_entry(
    target: &mut std::collections::BTreeMap<String, String>,
    key: String,
    value: String,
    policy: MergePolicy,
) {
    match policy {
        MergePolicy::LastWriteWins => {
            target.insert(key, value);
        }
        MergePolicy::FirstWriteWins => {
            target.entry(key).or_insert(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::FrontendCommand;
    use serde_json::json;

    fn ok(label: &str, result: EventResult) -> HandlerOutcome {
        HandlerOutcome {
            label: label.into(),
            result: Ok(result),
        }
    }

    fn err(label: &str) -> HandlerOutcome {
        HandlerOutcome {
            label: label.into(),
            result: Err(Error::handler(label, "boom")),
        }
    }

    #[test]
    fn test_empty_chain_is_success() {
        let result = aggregate(vec![], false, MergePolicy::LastWriteWins);
        assert_eq!(result.status, EventStatus::Success);
        assert!(result.is_empty());
        assert!(result.message.is_none());
    }

    #[test]
    fn test_last_write_wins() {
        let outcomes = vec![
            ok(
                "a",
                EventResult::success()
                    .with_prop_update("label", json!("first"))
                    .with_command(FrontendCommand::navigate("/a")),
            ),
            ok(
                "b",
                EventResult::success()
                    .with_prop_update("label", json!("second"))
                    .with_data("saved", json!(true))
                    .with_command(FrontendCommand::navigate("/b")),
            ),
        ];

        let result = aggregate(outcomes, false, MergePolicy::LastWriteWins);
        assert_eq!(result.prop_updates["label"], json!("second"));
        assert_eq!(result.data["saved"], json!(true));
        assert_eq!(result.frontend_commands.len(), 1);
        assert_eq!(result.frontend_commands[0].payload["href"], "/b");
    }

    #[test]
    fn test_first_write_wins() {
        let outcomes = vec![
            ok("a", EventResult::success().with_style_update("color", json!("red"))),
            ok("b", EventResult::success().with_style_update("color", json!("blue"))),
        ];

        let result = aggregate(outcomes, false, MergePolicy::FirstWriteWins);
        assert_eq!(result.style_updates["color"], json!("red"));
    }

    #[test]
    fn test_partial_when_failure_then_success() {
        let result = aggregate(
            vec![err("p:validate"), ok("p:save", EventResult::success())],
            false,
            MergePolicy::LastWriteWins,
        );
        assert_eq!(result.status, EventStatus::Partial);
        assert!(result.errors["p:validate"].contains("boom"));
    }

    #[test]
    fn test_failure_when_stopped() {
        let result = aggregate(
            vec![
                ok("p:a", EventResult::success()),
                ok("p:b", EventResult::failure("invalid email")),
            ],
            true,
            MergePolicy::LastWriteWins,
        );
        assert_eq!(result.status, EventStatus::Failure);
        assert_eq!(result.errors["p:b"], "invalid email");
    }

    #[test]
    fn test_all_failed_gets_message() {
        let result = aggregate(vec![err("p:a"), err("p:b")], false, MergePolicy::LastWriteWins);
        assert_eq!(result.status, EventStatus::Failure);
        assert_eq!(result.message.as_deref(), Some("2 handler(s) failed"));
        assert_eq!(result.errors.len(), 2);
    }
}
