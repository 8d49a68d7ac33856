// ABOUTME: Error types for the cluster control-plane side.
// ABOUTME: Split between connection/watch failures and per-pod delete failures.

use std::time::Duration;

/// Errors from connecting to, listing or watching the cluster.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("failed to read kubeconfig {path}: {message}")]
    Kubeconfig { path: String, message: String },

    #[error("list failed: {0}")]
    ListFailed(String),

    #[error("watch stream error: {0}")]
    WatchFailed(String),
}

/// Errors from deleting a single pod.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("pod not found: {0}")]
    NotFound(String),

    #[error("delete timed out after {0:?}")]
    Timeout(Duration),

    #[error("api error: {0}")]
    Api(String),
}

impl LifecycleError {
    /// The pod is already gone, so the delete had the intended effect.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LifecycleError::NotFound(_))
    }
}
