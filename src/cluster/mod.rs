// ABOUTME: Cluster control-plane side: pod watch, resync listing, pod deletion.
// ABOUTME: Traits at the seam so the coordinator can be tested without a cluster.

mod error;
mod k8s;
mod traits;
mod watch;

pub use error::{ClusterError, LifecycleError};
pub use k8s::KubeCluster;
pub use traits::{InstanceLifecycle, InstanceSource};
pub use watch::{InstanceEvent, InstanceWatcher, PodSnapshot};
