// ABOUTME: Outcome of handling one image-tag notification.
// ABOUTME: Records deleted pods and non-fatal per-pod failures.

use crate::cluster::LifecycleError;
use crate::types::{ImageKey, InstanceId};

/// What happened to the pods snapshotted for one tagged image.
#[derive(Debug, Clone)]
pub struct DeletionReport {
    pub image: ImageKey,
    deleted: Vec<InstanceId>,
    failures: Vec<DeleteFailure>,
}

impl DeletionReport {
    pub fn new(image: ImageKey) -> Self {
        Self {
            image,
            deleted: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub(crate) fn record_deleted(&mut self, instance: InstanceId) {
        self.deleted.push(instance);
    }

    /// Record a failed delete, auto-logging it via tracing.
    pub(crate) fn record_failure(&mut self, failure: DeleteFailure) {
        tracing::warn!(
            pod = %failure.instance,
            image = %self.image,
            "failed to delete pod: {}",
            failure.message
        );
        self.failures.push(failure);
    }

    pub fn deleted(&self) -> &[InstanceId] {
        &self.deleted
    }

    pub fn failures(&self) -> &[DeleteFailure] {
        &self.failures
    }

    /// No pod was registered for the image.
    pub fn is_noop(&self) -> bool {
        self.deleted.is_empty() && self.failures.is_empty()
    }
}

/// A pod that could not be deleted and stays registered.
#[derive(Debug, Clone)]
pub struct DeleteFailure {
    pub instance: InstanceId,
    pub kind: FailureKind,
    pub message: String,
}

impl DeleteFailure {
    pub fn from_error(instance: InstanceId, error: &LifecycleError) -> Self {
        let kind = match error {
            LifecycleError::Timeout(_) => FailureKind::Timeout,
            LifecycleError::NotFound(_) | LifecycleError::Api(_) => FailureKind::Api,
        };
        Self {
            instance,
            kind,
            message: error.to_string(),
        }
    }

    pub fn shutting_down(instance: InstanceId) -> Self {
        Self {
            instance,
            kind: FailureKind::ShuttingDown,
            message: "coordinator is shutting down".to_string(),
        }
    }
}

/// Categories of delete failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The API rejected or failed the request.
    Api,
    /// The request did not complete within the configured timeout.
    Timeout,
    /// The concurrency limiter was closed before the delete could start.
    ShuttingDown,
}
