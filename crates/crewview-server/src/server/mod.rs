//! Listener bind, watcher startup and graceful shutdown around the HTTP router.

pub mod shutdown;

use std::sync::Arc;

use crewview_teams::TeamWatcher;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::api;
use crate::config::ServerConfig;
use crate::engine::SyncEngine;
use crate::errors::ServerError;
use crate::hub::BroadcastHub;

/// Run the server until SIGINT/SIGTERM.
///
/// Failing to bind the listen address is fatal; everything after that
/// degrades instead of exiting.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: config.bind_addr,
            source,
        })?;

    let shutdown = CancellationToken::new();

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = shutdown::wait_for_shutdown_signal(signal_shutdown).await {
            error!(
                event = "server.signal_handler_failed",
                error = %e,
                "Signal handler failed; SIGTERM/SIGINT will not trigger graceful shutdown.",
            );
        }
    });

    serve(listener, &config, shutdown).await
}

/// Serve on an already bound listener until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    config: &ServerConfig,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let roots = config.roots();
    let hub = Arc::new(BroadcastHub::new(config.observer_buffer));
    let engine = Arc::new(SyncEngine::new(roots.clone(), hub.clone()));

    // Prime the snapshot cache so teams removed before their first change
    // can still be archived.
    let (teams, _) = engine.resync().await;

    let (change_tx, change_rx) = mpsc::unbounded_channel();
    let watcher = match TeamWatcher::start(&roots, &config.watch_policy(), change_tx) {
        Ok(w) => Some(w),
        Err(e) => {
            warn!(
                event = "server.watcher_start_failed",
                error = %e,
                "Live updates disabled; read endpoints still work.",
            );
            None
        }
    };
    let engine_task = tokio::spawn(engine.clone().run(change_rx, shutdown.clone()));

    let addr = listener.local_addr()?;
    info!(
        event = "server.started",
        addr = %addr,
        teams_root = %roots.teams.display(),
        teams = teams.len(),
        polling = config.watch.use_polling,
    );

    let drain = shutdown.clone();
    axum::serve(listener, api::router(engine))
        .with_graceful_shutdown(async move {
            drain.cancelled().await;
            info!(event = "server.shutdown_started");
            // Closing observer queues ends the WebSocket writer tasks.
            hub.close_all().await;
        })
        .await?;

    shutdown.cancel();
    drop(watcher);
    if let Err(e) = engine_task.await {
        warn!(event = "server.engine_task_failed", error = %e);
    }

    info!(event = "server.shutdown_completed");
    Ok(())
}
