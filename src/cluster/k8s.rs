// ABOUTME: Kubernetes-backed implementation of the cluster traits.
// ABOUTME: Client bootstrap, pod list+watch as typed events, and pod deletion.

use super::error::{ClusterError, LifecycleError};
use super::traits::{InstanceLifecycle, InstanceSource};
use super::watch::{InstanceEvent, PodSnapshot};
use crate::types::InstanceId;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use k8s_openapi::api::core::v1::Pod;
use kube::api::{DeleteParams, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::runtime::{WatchStreamExt, watcher};
use kube::{Api, Client, Config};
use std::path::Path;
use tracing::warn;

fn map_delete_error(e: kube::Error, instance: &InstanceId) -> LifecycleError {
    match &e {
        kube::Error::Api(response) if response.code == 404 => {
            LifecycleError::NotFound(instance.to_string())
        }
        _ => LifecycleError::Api(format!("failed to delete {instance}: {e}")),
    }
}

/// Cluster access through a kube client.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
    namespace: Option<String>,
}

impl KubeCluster {
    pub fn new(client: Client, namespace: Option<String>) -> Self {
        Self { client, namespace }
    }

    /// Build a client from an explicit kubeconfig, or from the in-cluster
    /// environment / default kubeconfig when none is given.
    pub async fn connect(
        kubeconfig: Option<&Path>,
        namespace: Option<String>,
    ) -> Result<Self, ClusterError> {
        let client = match kubeconfig {
            Some(path) => {
                let kubeconfig =
                    Kubeconfig::read_from(path).map_err(|e| ClusterError::Kubeconfig {
                        path: path.display().to_string(),
                        message: e.to_string(),
                    })?;
                let config =
                    Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                        .await
                        .map_err(|e| ClusterError::Kubeconfig {
                            path: path.display().to_string(),
                            message: e.to_string(),
                        })?;
                Client::try_from(config)
                    .map_err(|e| ClusterError::ConnectionFailed(e.to_string()))?
            }
            None => Client::try_default()
                .await
                .map_err(|e| ClusterError::ConnectionFailed(e.to_string()))?,
        };
        Ok(Self::new(client, namespace))
    }

    /// Probe the API server and return its git version.
    pub async fn server_version(&self) -> Result<String, ClusterError> {
        let info = self
            .client
            .apiserver_version()
            .await
            .map_err(|e| ClusterError::ConnectionFailed(e.to_string()))?;
        Ok(info.git_version)
    }

    fn pods(&self) -> Api<Pod> {
        match &self.namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }

    fn pods_in(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// List+watch all pods in scope as typed events.
    ///
    /// No label or field selector is applied. The watcher re-lists on
    /// desync, which surfaces as [`InstanceEvent::Restarted`].
    pub fn watch(&self) -> impl Stream<Item = Result<InstanceEvent, ClusterError>> + Send + use<> {
        watcher(self.pods(), watcher::Config::default())
            .default_backoff()
            .filter_map(|event| async move {
                match event {
                    Ok(event) => map_watch_event(event).map(Ok),
                    Err(e) => Some(Err(ClusterError::WatchFailed(e.to_string()))),
                }
            })
    }
}

/// Translate a kube watcher event. Pods without a name are dropped.
fn map_watch_event(event: watcher::Event<Pod>) -> Option<InstanceEvent> {
    match event {
        watcher::Event::Applied(pod) => snapshot_or_warn(&pod).map(InstanceEvent::Applied),
        watcher::Event::Deleted(pod) => snapshot_or_warn(&pod).map(InstanceEvent::Deleted),
        watcher::Event::Restarted(pods) => Some(InstanceEvent::Restarted(
            pods.iter().filter_map(snapshot_or_warn).collect(),
        )),
    }
}

fn snapshot_or_warn(pod: &Pod) -> Option<PodSnapshot> {
    let snapshot = PodSnapshot::from_pod(pod);
    if snapshot.is_none() {
        warn!("skipping pod without a name");
    }
    snapshot
}

#[async_trait]
impl InstanceLifecycle for KubeCluster {
    async fn delete(&self, instance: &InstanceId) -> Result<(), LifecycleError> {
        self.pods_in(instance.namespace())
            .delete(instance.name(), &DeleteParams::default())
            .await
            .map_err(|e| map_delete_error(e, instance))?;
        Ok(())
    }
}

#[async_trait]
impl InstanceSource for KubeCluster {
    async fn list(&self) -> Result<Vec<PodSnapshot>, ClusterError> {
        let pods = self
            .pods()
            .list(&ListParams::default())
            .await
            .map_err(|e| ClusterError::ListFailed(e.to_string()))?;
        Ok(pods.items.iter().filter_map(snapshot_or_warn).collect())
    }
}
