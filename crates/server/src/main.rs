// Copyright © 2026 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use aeroguard_core::config::{Config, ConfigError, LoggingConfig};
use aeroguard_core::types::Result;
use aeroguard_core::GuardContext;
use aeroguard_server::handlers::ApiHandlers;
use aeroguard_server::router::create_router;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Debug, Parser)]
#[command(name = "aeroguard", version, about = "Cache and brute-force protection service")]
struct Args {
    /// TOML configuration file; environment variables override its values.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

/// File first, then environment only, then built-in defaults.
fn load_config(path: &str) -> (Config, Option<ConfigError>) {
    match Config::load_from_file(path).and_then(Config::apply_env) {
        Ok(config) => (config, None),
        Err(file_error) => match Config::load_from_env() {
            Ok(config) => (config, Some(file_error)),
            Err(env_error) => (Config::default(), Some(env_error)),
        },
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter);

    if logging.format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (config, load_error) = load_config(&args.config);
    init_tracing(&config.logging);

    info!("Starting Aeroguard");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    if let Some(e) = load_error {
        warn!(path = %args.config, error = %e, "Configuration file not used, falling back");
    }

    let addr = config.app.http_addr()?;
    let context = Arc::new(GuardContext::initialize(config).await?);
    if !context.store_kind().is_shared() {
        warn!("Running on the in-process store: lockouts are per instance");
    }

    let handlers = Arc::new(ApiHandlers::new(context.clone()));
    let router = create_router(handlers)
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES));

    info!("Starting HTTP server on {}", addr);
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    context.shutdown().await;
    info!("Aeroguard stopped");
    Ok(())
}
