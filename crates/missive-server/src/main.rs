#![doc = include_str!("../README.md")]

mod server;

use anyhow::Context;
use clap::Parser;
use missive::{MemoryStore, MessageStore, RedbStore};
use server::config::{CliArgs, ServerConfig, StoreBackend};
use server::error::terminate_on_integrity_fault;
use server::router::router;
use server::service::state::AppState;
use server::telemetry::init_telemetry;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    init_telemetry(config.log_format)?;

    match config.backend.clone() {
        StoreBackend::Redb { path, table } => {
            let store = RedbStore::open_table(&path, table)
                .with_context(|| format!("failed to open store at {}", path.display()))?;
            run_server(store, config).await
        }
        StoreBackend::Memory => run_server(MemoryStore::new(), config).await,
    }
}

async fn run_server<S>(store: S, config: ServerConfig) -> anyhow::Result<()>
where
    S: MessageStore + Send + Sync + 'static,
{
    let state = AppState::new(store);
    let fault = state.fault().clone();
    let app = router(state, config.request_log);

    let listener = TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    log_startup_info(&listener.local_addr()?, &config);

    let token = CancellationToken::new();
    let mut server = tokio::spawn(
        axum::serve(listener, app)
            .with_graceful_shutdown(token.clone().cancelled_owned())
            .into_future(),
    );

    tokio::select! {
        res = &mut server => {
            res??;
            tracing::warn!("Server stopped without a shutdown signal");
            return Ok(());
        }
        () = fault.raised() => {
            server.abort();
            terminate_on_integrity_fault(fault.reason().unwrap_or("unknown"));
        }
        () = shutdown_signal() => {}
    }

    token.cancel();
    match tokio::time::timeout(config.shutdown_timeout, &mut server).await {
        Ok(res) => res??,
        Err(_) => {
            tracing::warn!(
                "In-flight requests did not drain within {:?}, exiting anyway",
                config.shutdown_timeout
            );
            server.abort();
        }
    }

    tracing::info!("Service shut down successfully");
    Ok(())
}

fn log_startup_info(addr: &SocketAddr, config: &ServerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!(
            "Starting message service on {} with full config: {:#?}",
            addr,
            config
        );
    } else {
        tracing::info!(
            "Starting message service on {} backed by {}",
            addr,
            config.backend
        );
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }

    tracing::info!("Shutdown signal received, terminating gracefully...");
}
