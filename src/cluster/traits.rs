// ABOUTME: Capability traits for the cluster side of the pipeline.
// ABOUTME: InstanceLifecycle deletes pods, InstanceSource lists them for resync.

use super::error::{ClusterError, LifecycleError};
use super::watch::PodSnapshot;
use crate::types::InstanceId;
use async_trait::async_trait;

/// Deletes pods by namespace and name.
#[async_trait]
pub trait InstanceLifecycle: Send + Sync {
    /// Delete one pod with default deletion options.
    async fn delete(&self, instance: &InstanceId) -> Result<(), LifecycleError>;
}

/// Produces a full listing of the current pod population.
#[async_trait]
pub trait InstanceSource: Send + Sync {
    async fn list(&self) -> Result<Vec<PodSnapshot>, ClusterError>;
}
