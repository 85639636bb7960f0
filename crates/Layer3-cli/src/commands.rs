//! Subcommand implementations

use anyhow::Context;
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use trellis_core::{builtin, DispatchRequest, PluginManager};
use trellis_foundation::RuntimeConfig;

/// 내장 플러그인 + 디스커버리로 찾은 플러그인을 모두 로드
pub async fn start_runtime(config: RuntimeConfig) -> PluginManager {
    let manager = PluginManager::new(config, builtin::entry_points());

    let mut report = manager.load_all(builtin::packages()).await;
    let discovered = manager.discover_and_load().await;
    report.loaded.extend(discovered.loaded);
    report.activated.extend(discovered.activated);
    report.skipped.extend(discovered.skipped);
    report.failed.extend(discovered.failed);

    for (id, error) in &report.failed {
        warn!("{}: {}", id, error);
    }
    info!(
        "Runtime ready: {} loaded, {} active",
        report.loaded.len(),
        report.activated.len()
    );
    manager
}

pub fn print_config(config: &RuntimeConfig) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    println!("\nData directory: {}", config.resolved_data_dir().display());
    Ok(())
}

pub async fn list_plugins(manager: &PluginManager) -> anyhow::Result<()> {
    let plugins = manager.list().await;
    if plugins.is_empty() {
        println!("No plugins loaded.");
        return Ok(());
    }

    println!("{:<32} {:<24} {:<10} {:<12}", "ID", "Name", "Version", "State");
    println!("{}", "-".repeat(80));
    for plugin in plugins {
        println!(
            "{:<32} {:<24} {:<10} {:<12}",
            plugin.id,
            plugin.name,
            plugin.version,
            plugin.state.to_string()
        );
    }

    let summary = manager.summary().await;
    println!(
        "\n{} plugins ({} active), {} components, {} routes, {} handlers",
        summary.total, summary.active, summary.components, summary.routes, summary.handlers
    );
    Ok(())
}

pub async fn list_components(
    manager: &PluginManager,
    category: Option<&str>,
    search: Option<&str>,
) -> anyhow::Result<()> {
    let registry = manager.capabilities();
    let mut components = match search {
        Some(query) => registry.search(query).await,
        None => registry.list_all().await,
    };
    if let Some(category) = category {
        components.retain(|c| c.manifest.category.eq_ignore_ascii_case(category));
    }

    if components.is_empty() {
        println!("No components found.");
        return Ok(());
    }

    println!("{:<24} {:<24} {:<16} {}", "Plugin", "Component", "Category", "Description");
    println!("{}", "-".repeat(80));
    for c in components {
        println!(
            "{:<24} {:<24} {:<16} {}",
            c.plugin_id, c.manifest.id, c.manifest.category, c.manifest.description
        );
    }
    Ok(())
}

pub fn show_chain(
    manager: &PluginManager,
    component: &str,
    event: &str,
    plugin: Option<&str>,
) -> anyhow::Result<()> {
    let chain = manager.resolve_chain(component, event, plugin);
    if chain.is_empty() {
        println!("No handlers match {}/{}.", component, event);
        return Ok(());
    }

    println!("{:<4} {:<40} {:>12} {:<6} {}", "#", "Handler", "Priority", "Mode", "Flags");
    println!("{}", "-".repeat(80));
    for (i, handler) in chain.iter().enumerate() {
        let binding = &handler.binding;
        let mut flags = Vec::new();
        if !binding.continue_on_success {
            flags.push("stop-on-success");
        }
        if binding.continue_on_error {
            flags.push("continue-on-error");
        }
        if handler.fallback {
            flags.push("fallback");
        }
        println!(
            "{:<4} {:<40} {:>12} {:<6} {}",
            i + 1,
            binding.label(),
            binding.priority,
            if binding.is_async { "async" } else { "sync" },
            flags.join(",")
        );
    }
    Ok(())
}

pub fn build_request(
    component: String,
    event: String,
    plugin: Option<String>,
    payload: Option<&str>,
) -> anyhow::Result<DispatchRequest> {
    let mut request = DispatchRequest::new(component, event);
    if let Some(plugin) = plugin {
        request = request.plugin(plugin);
    }
    if let Some(payload) = payload {
        let value: Value = serde_json::from_str(payload).context("--payload is not valid JSON")?;
        request = request.payload(value);
    }
    Ok(request)
}

/// 디스패치 (Ctrl+C 또는 --timeout-ms 경과 시 취소)
pub async fn dispatch(
    manager: &PluginManager,
    request: DispatchRequest,
    timeout_ms: Option<u64>,
) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let watchdog = tokio::spawn(async move {
        match timeout_ms {
            Some(ms) => {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(ms)) => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
            }
            None => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
        trigger.cancel();
    });

    let outcome = manager.dispatch_with_cancel(request, cancel).await;
    watchdog.abort();

    let result = outcome?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_request_parses_payload() {
        let request = build_request(
            "Button".into(),
            "onClick".into(),
            Some("trellis.nav".into()),
            Some(r#"{"href":"/about"}"#),
        )
        .unwrap();

        assert_eq!(request.plugin_id.as_deref(), Some("trellis.nav"));
        assert_eq!(request.payload, json!({ "href": "/about" }));
    }

    #[test]
    fn test_build_request_rejects_bad_json() {
        assert!(build_request("Button".into(), "onClick".into(), None, Some("{")).is_err());
    }

    #[tokio::test]
    async fn test_runtime_starts_with_builtins() {
        let dir = tempfile::tempdir().unwrap();
        let config = RuntimeConfig::new().data_dir(dir.path());
        let manager = start_runtime(config).await;

        assert!(manager.plugin_count().await >= 2);
        assert!(!manager.resolve_chain("Button", "onClick", None).is_empty());
        manager.shutdown().await;
    }
}
