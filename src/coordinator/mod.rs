// ABOUTME: Turns image-tag notifications into pod deletions.
// ABOUTME: Snapshot lookup, bounded concurrent deletes, eager registry cleanup.

mod report;

pub use report::{DeleteFailure, DeletionReport, FailureKind};

use crate::cluster::{InstanceLifecycle, LifecycleError};
use crate::registry::Registry;
use crate::types::{ImageKey, InstanceId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

/// Default cap on deletes in flight across all notifications.
pub const DEFAULT_MAX_CONCURRENT_DELETES: usize = 4;

/// Capacity of the notification queue between the runtime adapter and the
/// dispatcher.
const QUEUE_CAPACITY: usize = 64;

enum Outcome {
    Deleted(InstanceId),
    Failed(DeleteFailure),
}

/// Deletes the pods running an image when that image is re-tagged.
///
/// Cheap to clone: every field is shared.
#[derive(Clone)]
pub struct DeletionCoordinator {
    registry: Arc<Registry>,
    lifecycle: Arc<dyn InstanceLifecycle>,
    permits: Arc<Semaphore>,
    delete_timeout: Option<Duration>,
}

impl DeletionCoordinator {
    pub fn new(registry: Arc<Registry>, lifecycle: Arc<dyn InstanceLifecycle>) -> Self {
        Self {
            registry,
            lifecycle,
            permits: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT_DELETES)),
            delete_timeout: None,
        }
    }

    /// Cap the number of delete calls in flight at once. Zero is raised to one.
    pub fn max_concurrent_deletes(mut self, limit: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(limit.max(1)));
        self
    }

    /// Give up on a single delete call after `timeout`.
    pub fn delete_timeout(mut self, timeout: Duration) -> Self {
        self.delete_timeout = Some(timeout);
        self
    }

    /// Start the dispatcher and return the queue that feeds it.
    ///
    /// Each notification is handled on its own task spawned on `tracker`, so
    /// callers wait for in-flight deletions with `tracker.wait()`. Once
    /// `cancel` fires the dispatcher stops receiving, and further sends fail.
    /// Deletes already calling the API finish; deletes still waiting for a
    /// permit are abandoned and their pods stay registered.
    pub fn start(self, cancel: CancellationToken, tracker: &TaskTracker) -> mpsc::Sender<ImageKey> {
        let (tx, mut rx) = mpsc::channel::<ImageKey>(QUEUE_CAPACITY);
        let workers = tracker.clone();
        tracker.spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!("deletion dispatcher stopping");
                        self.permits.close();
                        break;
                    }
                    next = rx.recv() => match next {
                        Some(image) => {
                            let coordinator = self.clone();
                            workers.spawn(async move {
                                coordinator.handle_tag(image).await;
                            });
                        }
                        None => break,
                    }
                }
            }
        });
        tx
    }

    /// Delete every pod registered for `image` at lookup time.
    ///
    /// Pods that get the image after the lookup are left for a later tag.
    /// A failed delete leaves the pod registered. A successful one removes
    /// all of the pod's registry entries without waiting for the watch to
    /// report it gone.
    pub async fn handle_tag(&self, image: ImageKey) -> DeletionReport {
        info!(image = %image, "image tagged");
        let mut report = DeletionReport::new(image.clone());

        let instances = self.registry.instances_for(&image);
        if instances.is_empty() {
            info!(image = %image, "no pods registered with image");
            return report;
        }

        let outcomes =
            futures::future::join_all(instances.into_iter().map(|i| self.delete_one(i))).await;
        for outcome in outcomes {
            match outcome {
                Outcome::Deleted(instance) => report.record_deleted(instance),
                Outcome::Failed(failure) => report.record_failure(failure),
            }
        }
        report
    }

    async fn delete_one(&self, instance: InstanceId) -> Outcome {
        let Ok(_permit) = self.permits.acquire().await else {
            return Outcome::Failed(DeleteFailure::shutting_down(instance));
        };

        info!(pod = %instance, "deleting pod");
        let result = match self.delete_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.lifecycle.delete(&instance))
                .await
                .unwrap_or(Err(LifecycleError::Timeout(timeout))),
            None => self.lifecycle.delete(&instance).await,
        };

        match result {
            Ok(()) => {
                self.registry.remove_instance(&instance);
                info!(pod = %instance, "deleted pod");
                Outcome::Deleted(instance)
            }
            Err(e) if e.is_not_found() => {
                self.registry.remove_instance(&instance);
                debug!(pod = %instance, "pod already gone");
                Outcome::Deleted(instance)
            }
            Err(e) => Outcome::Failed(DeleteFailure::from_error(instance, &e)),
        }
    }
}
