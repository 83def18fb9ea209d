/*
 * Copyright 2026 Specmock Team
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use anyhow::Context;
use arc_swap::ArcSwap;
use clap::Parser;
use specmock::config::{Config, ConfigLoader};
use specmock::dispatch::Dispatcher;
use specmock::server::run_server;
use specmock::telemetry::{init_telemetry, shutdown_telemetry};
use specmock::utils::shutdown_signal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

const DEFAULT_CONFIG: &str = "config/specmock-config.yaml";

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// OpenAPI document path or URL; overrides the config file and SPECMOCK_SPEC.
    #[arg(short, long)]
    spec: Option<String>,

    #[arg(long, default_value = "false")]
    hot_reload: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = load_config(&args)?;

    init_telemetry(&config.telemetry).await?;

    let dispatcher = specmock::build_dispatcher(&config).await?;
    let dispatcher_swap = Arc::new(ArcSwap::from_pointee(dispatcher));

    if args.hot_reload {
        start_hot_reload(&args, &config, dispatcher_swap.clone())?;
    }

    let server = run_server(config, dispatcher_swap).await?;

    info!("Specmock server is running");
    info!("Press Ctrl+C to shutdown");

    let server_handle = server.handle();
    tokio::select! {
        _ = server => {
            info!("Server stopped");
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
            server_handle.stop(true).await;
            info!("Server shutdown complete");
        }
    }

    shutdown_telemetry().await;

    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    // The default path is optional so `--spec` alone is enough to start.
    let config = if !args.config.exists() && args.config == Path::new(DEFAULT_CONFIG) {
        Config::default()
    } else {
        ConfigLoader::from_file(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?
    };

    let config = ConfigLoader::apply_env(config);
    let config = ConfigLoader::with_spec_source(config, args.spec.clone());
    ConfigLoader::validate(&config)?;
    Ok(config)
}

#[cfg(feature = "hot-reload")]
fn start_hot_reload(
    args: &Args,
    config: &Config,
    dispatcher_swap: Arc<ArcSwap<Dispatcher>>,
) -> anyhow::Result<()> {
    use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
    use specmock::spec::SpecSource;
    use std::sync::mpsc;

    let mut watched = Vec::new();
    if args.config.exists() {
        watched.push(args.config.clone());
    }
    if let Some(path) = SpecSource::parse(&config.spec.source).file_path() {
        watched.push(path.to_path_buf());
    }
    let watched: Vec<PathBuf> = watched
        .into_iter()
        .map(|p| p.canonicalize().unwrap_or(p))
        .collect();
    if watched.is_empty() {
        info!("Nothing to watch for hot reload");
        return Ok(());
    }

    let (tx, rx) = mpsc::channel();
    let mut watcher = RecommendedWatcher::new(tx, notify::Config::default())?;
    // Directories survive editors that replace the file on save.
    for path in &watched {
        let dir = path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        info!("Watching {:?} for changes", path);
    }

    let args = args.clone();
    let runtime = tokio::runtime::Handle::current();
    std::thread::spawn(move || {
        let _watcher = watcher;
        for event in rx {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!("File watch error: {}", e);
                    continue;
                }
            };
            if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                continue;
            }
            let touched = event.paths.iter().any(|p| {
                let p = p.canonicalize().unwrap_or_else(|_| p.clone());
                watched.contains(&p)
            });
            if !touched {
                continue;
            }

            info!("Watched file modified, reloading...");
            let reloaded = runtime.block_on(async {
                let config = load_config(&args)?;
                specmock::build_dispatcher(&config).await
            });
            match reloaded {
                Ok(dispatcher) => {
                    dispatcher_swap.store(Arc::new(dispatcher));
                    info!("API description reloaded successfully");
                }
                Err(e) => {
                    tracing::error!("Reload failed, keeping the previous description: {:#}", e);
                }
            }
        }
    });

    Ok(())
}

#[cfg(not(feature = "hot-reload"))]
fn start_hot_reload(
    _args: &Args,
    _config: &Config,
    _dispatcher_swap: Arc<ArcSwap<Dispatcher>>,
) -> anyhow::Result<()> {
    info!("Hot reload feature is not enabled");
    Ok(())
}
