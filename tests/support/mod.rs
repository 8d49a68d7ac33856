// ABOUTME: Test support utilities.
// ABOUTME: Tracing setup and a scriptable fake for the pod lifecycle API.

use async_trait::async_trait;
use parking_lot::Mutex;
use podrecycle::cluster::{InstanceLifecycle, LifecycleError};
use podrecycle::types::InstanceId;
use std::collections::HashSet;
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("podrecycle=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

#[allow(dead_code)]
pub fn pod(name: &str) -> InstanceId {
    InstanceId::new("dev", name)
}

/// Records delete calls and fails or delays the ones it is told to.
#[derive(Default)]
#[allow(dead_code)]
pub struct FakeLifecycle {
    calls: Mutex<Vec<InstanceId>>,
    failing: HashSet<InstanceId>,
    missing: HashSet<InstanceId>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

#[allow(dead_code)]
impl FakeLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deletes of `instance` return an API error.
    pub fn failing(mut self, instance: InstanceId) -> Self {
        self.failing.insert(instance);
        self
    }

    /// Deletes of `instance` report the pod as already gone.
    pub fn missing(mut self, instance: InstanceId) -> Self {
        self.missing.insert(instance);
        self
    }

    /// Every delete sleeps for `delay` before answering.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<InstanceId> {
        self.calls.lock().clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InstanceLifecycle for FakeLifecycle {
    async fn delete(&self, instance: &InstanceId) -> Result<(), LifecycleError> {
        self.calls.lock().push(instance.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(instance) {
            Err(LifecycleError::Api(format!("failed to delete {instance}")))
        } else if self.missing.contains(instance) {
            Err(LifecycleError::NotFound(instance.to_string()))
        } else {
            Ok(())
        }
    }
}
