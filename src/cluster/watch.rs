// ABOUTME: Keeps the registry in step with the pod population.
// ABOUTME: Applies typed watch events and runs the periodic full-list resync.

use super::error::ClusterError;
use super::traits::InstanceSource;
use crate::registry::Registry;
use crate::types::{ImageKey, InstanceId};
use futures::{Stream, StreamExt};
use k8s_openapi::api::core::v1::Pod;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The parts of a pod the registry cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodSnapshot {
    pub id: InstanceId,
    /// Raw image references of init and regular containers, in spec order.
    pub images: Vec<String>,
    /// The pod has a deletion timestamp and is on its way out.
    pub terminating: bool,
}

impl PodSnapshot {
    pub fn new(id: InstanceId, images: Vec<String>) -> Self {
        Self {
            id,
            images,
            terminating: false,
        }
    }

    /// Extract a snapshot from a Kubernetes pod.
    ///
    /// Returns `None` for a pod without a name, which the API server never
    /// sends for a persisted object.
    pub fn from_pod(pod: &Pod) -> Option<Self> {
        let name = pod.metadata.name.clone()?;
        let namespace = pod
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| "default".to_string());

        let images = pod
            .spec
            .as_ref()
            .map(|spec| {
                spec.init_containers
                    .iter()
                    .flatten()
                    .chain(spec.containers.iter())
                    .filter_map(|c| c.image.clone())
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            id: InstanceId::new(namespace, name),
            images,
            terminating: pod.metadata.deletion_timestamp.is_some(),
        })
    }

    /// Declared images run through the normalizer.
    pub fn image_keys(&self) -> impl Iterator<Item = ImageKey> + '_ {
        self.images.iter().map(|image| ImageKey::normalize(image))
    }
}

/// A pod lifecycle notification from list+watch.
#[derive(Debug, Clone)]
pub enum InstanceEvent {
    /// A pod was created or modified.
    Applied(PodSnapshot),
    /// A pod is gone.
    Deleted(PodSnapshot),
    /// A full listing replacing everything seen so far.
    Restarted(Vec<PodSnapshot>),
}

/// Feeds the registry from pod events.
pub struct InstanceWatcher {
    registry: Arc<Registry>,
}

impl InstanceWatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Apply one event to the registry.
    pub fn apply(&self, event: InstanceEvent) {
        match event {
            InstanceEvent::Applied(pod) if pod.terminating => self.untrack(&pod),
            InstanceEvent::Applied(pod) => self.track(&pod),
            InstanceEvent::Deleted(pod) => self.untrack(&pod),
            InstanceEvent::Restarted(pods) => {
                let population = live_population(&pods);
                debug!(pods = population.len(), "reconciling registry from full list");
                self.registry.reconcile(population);
            }
        }
    }

    fn track(&self, pod: &PodSnapshot) {
        debug!(pod = %pod.id, "track pod");
        self.registry.replace_instance(&pod.id, pod.image_keys());
    }

    fn untrack(&self, pod: &PodSnapshot) {
        debug!(pod = %pod.id, "untrack pod");
        for image in pod.image_keys() {
            self.registry.remove(&pod.id, &image);
        }
    }

    /// Consume a watch stream until it ends or `cancel` fires.
    ///
    /// Stream errors are logged and skipped; the underlying watcher backs off
    /// and re-establishes the watch on its own.
    pub async fn run<S>(&self, events: S, cancel: CancellationToken)
    where
        S: Stream<Item = Result<InstanceEvent, ClusterError>> + Send,
    {
        futures::pin_mut!(events);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("pod watcher shutdown requested");
                    break;
                }
                next = events.next() => match next {
                    Some(Ok(event)) => self.apply(event),
                    Some(Err(e)) => warn!("pod watch error: {e}"),
                    None => {
                        warn!("pod watch stream ended");
                        break;
                    }
                }
            }
        }
    }

    /// Periodically re-derive the registry from a full listing.
    ///
    /// Catches drift from missed incremental events. The first pass runs one
    /// `interval` after start since the watch itself begins with a full list.
    pub async fn resync<L>(&self, source: &L, interval: Duration, cancel: CancellationToken)
    where
        L: InstanceSource + ?Sized,
    {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.resync_once(source).await {
                        warn!("resync list failed: {e}");
                    }
                }
            }
        }
    }

    /// One resync pass.
    ///
    /// Watch updates that land while the list request is in flight win over
    /// the listing, so a slow or stale list never drops a pod the watch has
    /// just added or resurrects one it has just removed.
    pub async fn resync_once<L>(&self, source: &L) -> Result<(), ClusterError>
    where
        L: InstanceSource + ?Sized,
    {
        let mark = self.registry.generation();
        let pods = source.list().await?;
        let population = live_population(&pods);
        debug!(pods = population.len(), "resyncing registry from pod list");
        self.registry.reconcile_since(mark, population);
        Ok(())
    }
}

fn live_population(pods: &[PodSnapshot]) -> Vec<(InstanceId, Vec<ImageKey>)> {
    pods.iter()
        .filter(|pod| !pod.terminating)
        .map(|pod| (pod.id.clone(), pod.image_keys().collect()))
        .collect()
}
