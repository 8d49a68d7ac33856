// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Single long-running command; flags map onto config::Settings.

use clap::Parser;
use podrecycle::config::{DEFAULT_EVENT_RECONNECTS, Settings};
use podrecycle::coordinator::DEFAULT_MAX_CONCURRENT_DELETES;
use podrecycle::runtime::{RuntimeConfig, RuntimeType};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "podrecycle")]
#[command(about = "Delete pods running an image whenever the local container runtime re-tags it")]
#[command(version)]
pub struct Cli {
    /// Only watch pods in this namespace (default: all namespaces)
    #[arg(short, long, env = "PODRECYCLE_NAMESPACE")]
    pub namespace: Option<String>,

    /// Path to a kubeconfig file (default: in-cluster or standard loading rules)
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Container runtime to use (default: auto-detect)
    #[arg(long, value_enum)]
    pub runtime: Option<RuntimeType>,

    /// Runtime API socket path (overrides detection)
    #[arg(long)]
    pub socket: Option<String>,

    /// Seconds between full pod list resyncs
    #[arg(long, default_value_t = 5)]
    pub resync_interval: u64,

    /// Maximum pod deletions in flight at once
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT_DELETES)]
    pub max_concurrent_deletes: usize,

    /// Give up on a single pod deletion after this many seconds
    #[arg(long)]
    pub delete_timeout: Option<u64>,

    /// Consecutive event stream resubscriptions before giving up
    #[arg(long, default_value_t = DEFAULT_EVENT_RECONNECTS)]
    pub event_reconnects: u32,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn settings(&self) -> Settings {
        Settings {
            namespace: self.namespace.clone(),
            kubeconfig: self.kubeconfig.clone(),
            runtime: RuntimeConfig {
                runtime: self.runtime,
                socket: self.socket.clone(),
            },
            resync_interval: Duration::from_secs(self.resync_interval),
            max_concurrent_deletes: self.max_concurrent_deletes,
            delete_timeout: self.delete_timeout.map(Duration::from_secs),
            event_reconnects: self.event_reconnects,
        }
    }
}
