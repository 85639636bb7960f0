//! Trellis CLI - Main entry point

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trellis_foundation::RuntimeConfig;

/// Trellis - plugin runtime for the site builder
#[derive(Parser, Debug)]
#[command(name = "trellis")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Additional plugin directory to scan (repeatable)
    #[arg(long = "plugins-dir", global = true)]
    plugins_dirs: Vec<PathBuf>,

    /// Root directory for plugin data and config
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load every plugin and print its state
    Plugins,
    /// List registered components
    Components {
        /// Only components in this category
        #[arg(short, long)]
        category: Option<String>,
        /// Case-insensitive name/description search
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show the handler chain an event would run through
    Chain {
        #[arg(long)]
        component: String,
        #[arg(long)]
        event: String,
        /// Plugin the event is addressed to
        #[arg(long)]
        plugin: Option<String>,
    },
    /// Dispatch an event and print the aggregate result
    Dispatch {
        #[arg(long)]
        component: String,
        #[arg(long)]
        event: String,
        /// Plugin the event is addressed to
        #[arg(long)]
        plugin: Option<String>,
        /// Event payload as JSON
        #[arg(long)]
        payload: Option<String>,
        /// Cancel the whole dispatch after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Print the effective runtime configuration
    Config,
}

impl Args {
    /// 설정 파일 + 명령행 옵션
    fn runtime_config(&self) -> RuntimeConfig {
        let mut config = RuntimeConfig::load().unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config: {}", e);
            RuntimeConfig::default()
        });

        for dir in &self.plugins_dirs {
            config = config.plugin_dir(dir.clone());
        }
        if let Some(dir) = &self.data_dir {
            config = config.data_dir(dir.clone());
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = args.runtime_config();
    if let Command::Config = args.command {
        return commands::print_config(&config);
    }

    let manager = commands::start_runtime(config).await;

    let outcome = match args.command {
        Command::Plugins => commands::list_plugins(&manager).await,
        Command::Components { category, search } => {
            commands::list_components(&manager, category.as_deref(), search.as_deref()).await
        }
        Command::Chain {
            component,
            event,
            plugin,
        } => commands::show_chain(&manager, &component, &event, plugin.as_deref()),
        Command::Dispatch {
            component,
            event,
            plugin,
            payload,
            timeout_ms,
        } => {
            let request = commands::build_request(component, event, plugin, payload.as_deref())?;
            commands::dispatch(&manager, request, timeout_ms).await
        }
        Command::Config => Ok(()),
    };

    manager.shutdown().await;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dispatch() {
        let args = Args::try_parse_from([
            "trellis",
            "dispatch",
            "--component",
            "Button",
            "--event",
            "onClick",
            "--payload",
            r#"{"href":"/about"}"#,
            "--timeout-ms",
            "1500",
        ])
        .unwrap();

        match args.command {
            Command::Dispatch {
                component,
                event,
                timeout_ms,
                plugin,
                ..
            } => {
                assert_eq!(component, "Button");
                assert_eq!(event, "onClick");
                assert_eq!(timeout_ms, Some(1500));
                assert!(plugin.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "trellis",
            "plugins",
            "--plugins-dir",
            "/opt/a",
            "--plugins-dir",
            "/opt/b",
            "--data-dir",
            "/var/trellis",
            "--debug",
        ])
        .unwrap();

        assert!(args.debug);
        assert_eq!(args.plugins_dirs.len(), 2);
        assert_eq!(args.data_dir, Some(PathBuf::from("/var/trellis")));
    }

    #[test]
    fn test_chain_requires_event() {
        assert!(Args::try_parse_from(["trellis", "chain", "--component", "Button"]).is_err());
    }
}
