pub mod api;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod miner;
pub mod state;
pub mod sync;

use anyhow::{Context, Result};
use config::NodeConfig;
use miner::Miner;
use state::AppState;
use std::future::Future;
use tokio::{net::TcpListener, sync::watch};
use tracing::{info, warn};

/// Serves the node API on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("http server failed")
}

/// Resolves when `signal` fires. If the signal handler could not be installed
/// the error is logged and this never resolves.
pub async fn shutdown_on<S>(signal: S)
where
    S: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("shutting down"),
        Err(e) => {
            warn!("cannot listen for shutdown signal, serving until killed: {e}");
            std::future::pending::<()>().await;
        }
    }
}

/// Full node lifecycle: bind, optionally join the network, start the miner and
/// serve until ctrl-c.
pub async fn run(config: NodeConfig) -> Result<()> {
    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("binding {}", config.listen))?;
    let state = AppState::new(&config);
    info!(
        "node {} at {} (difficulty {})",
        state.node_id, state.public_address, config.difficulty
    );

    if let Some(bootstrap) = &config.bootstrap {
        if let Err(e) = sync::join_network(&state, bootstrap).await {
            warn!("could not join the network via {bootstrap}: {e}");
        }
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    let miner = config.mining.then(|| {
        let miner = Miner::new(state.clone(), config.mine_interval.clone());
        tokio::spawn(miner.run(stop_rx))
    });

    info!("chainmesh-node listening on http://{}", config.listen);
    serve(listener, state, shutdown_on(tokio::signal::ctrl_c())).await?;

    let _ = stop_tx.send(true);
    if let Some(handle) = miner {
        let _ = handle.await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{io, time::Duration};

    #[tokio::test]
    async fn shutdown_follows_signal() {
        tokio::time::timeout(Duration::from_secs(1), shutdown_on(async { Ok(()) }))
            .await
            .expect("resolves once signalled");
    }

    #[tokio::test]
    async fn failed_signal_handler_keeps_serving() {
        let failed = async { Err(io::Error::other("no signals here")) };
        assert!(
            tokio::time::timeout(Duration::from_millis(200), shutdown_on(failed))
                .await
                .is_err()
        );
    }
}
