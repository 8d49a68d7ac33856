// ABOUTME: Wires the registry, watch adapter, coordinator and event listener together.
// ABOUTME: Owns bootstrap, the shared cancellation token and graceful shutdown.

use crate::cluster::{InstanceWatcher, KubeCluster};
use crate::config::Settings;
use crate::coordinator::DeletionCoordinator;
use crate::error::Result;
use crate::registry::Registry;
use crate::runtime::{BollardRuntime, RuntimeError, RuntimeInfoTrait, detect, run_tag_listener};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

/// Cancel `cancel` on the first SIGINT or SIGTERM.
pub fn cancel_on_signals(cancel: CancellationToken) -> Result<()> {
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("received signal: interrupt"),
            _ = terminate.recv() => info!("received signal: terminated"),
        }
        cancel.cancel();
    });
    Ok(())
}

/// Connect to the cluster and the container runtime and probe both.
async fn bootstrap(settings: &Settings) -> Result<(Arc<KubeCluster>, BollardRuntime)> {
    let cluster = Arc::new(
        KubeCluster::connect(settings.kubeconfig.as_deref(), settings.namespace.clone()).await?,
    );
    let version = cluster.server_version().await?;
    info!("connected kubernetes apiserver ({version})");

    let runtime_info = detect(&settings.runtime).map_err(RuntimeError::from)?;
    let runtime = BollardRuntime::connect(&runtime_info).map_err(RuntimeError::from)?;
    let metadata = runtime.version().await.map_err(RuntimeError::from)?;
    info!(
        socket = %runtime_info.socket_path,
        os = %metadata.os,
        arch = %metadata.arch,
        "connected {} api (api: v{}, version: {})",
        metadata.name,
        metadata.api_version,
        metadata.version
    );
    Ok((cluster, runtime))
}

/// Connect to both collaborators and run the pipeline until `cancel` fires.
///
/// Bootstrap failures return immediately, and a signal during bootstrap
/// ends the run cleanly. After startup the only fatal error is losing the
/// runtime event stream for good; in-flight deletions are allowed to
/// finish before this returns either way.
pub async fn run(settings: Settings, cancel: CancellationToken) -> Result<()> {
    let (cluster, runtime) = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            info!("shutdown requested during startup");
            return Ok(());
        }
        connected = bootstrap(&settings) => connected?,
    };

    let registry = Arc::new(Registry::new());
    let tracker = TaskTracker::new();

    let mut coordinator = DeletionCoordinator::new(registry.clone(), cluster.clone())
        .max_concurrent_deletes(settings.max_concurrent_deletes);
    if let Some(timeout) = settings.delete_timeout {
        coordinator = coordinator.delete_timeout(timeout);
    }
    let queue = coordinator.start(cancel.clone(), &tracker);

    let watcher = Arc::new(InstanceWatcher::new(registry));
    {
        let watcher = watcher.clone();
        let events = cluster.watch();
        let cancel = cancel.clone();
        tracker.spawn(async move { watcher.run(events, cancel).await });
    }
    {
        let cluster = cluster.clone();
        let cancel = cancel.clone();
        let interval = settings.resync_interval;
        tracker.spawn(async move { watcher.resync(cluster.as_ref(), interval, cancel).await });
    }

    info!("watching for image tag events");
    let result = run_tag_listener(&runtime, queue, cancel.clone(), settings.event_reconnects).await;
    if let Err(e) = &result {
        warn!("shutting down: {e}");
    }

    cancel.cancel();
    tracker.close();
    tracker.wait().await;
    info!("shutdown complete");

    result.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn cancelled_before_startup_exits_cleanly() {
        let settings = Settings {
            kubeconfig: Some(PathBuf::from("/nonexistent/kubeconfig")),
            ..Settings::default()
        };
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(run(settings, cancel).await.is_ok());
    }

    #[tokio::test]
    async fn bootstrap_failure_is_reported_when_not_cancelled() {
        let settings = Settings {
            kubeconfig: Some(PathBuf::from("/nonexistent/kubeconfig")),
            ..Settings::default()
        };

        assert!(run(settings, CancellationToken::new()).await.is_err());
    }
}
