// ABOUTME: End-to-end tests of the watch -> registry -> tag event -> delete pipeline.
// ABOUTME: Uses in-memory event streams and a fake lifecycle API instead of a cluster.

mod support;

use podrecycle::cluster::{InstanceEvent, InstanceWatcher, PodSnapshot};
use podrecycle::coordinator::DeletionCoordinator;
use podrecycle::registry::Registry;
use podrecycle::runtime::{EventError, StopReason, TagEvent, forward_tag_events};
use podrecycle::types::ImageKey;
use std::sync::Arc;
use support::{FakeLifecycle, pod};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

fn snapshot(name: &str, images: &[&str]) -> PodSnapshot {
    PodSnapshot::new(pod(name), images.iter().map(|s| s.to_string()).collect())
}

fn tag(name: &str) -> Result<TagEvent, EventError> {
    Ok(TagEvent {
        name: Some(name.to_string()),
        ..Default::default()
    })
}

#[tokio::test]
async fn retag_deletes_matching_pods_only() {
    support::init_tracing();
    let registry = Arc::new(Registry::new());
    let watcher = InstanceWatcher::new(registry.clone());
    watcher.apply(InstanceEvent::Restarted(vec![
        snapshot("web", &["app"]),
        snapshot("worker", &["app:latest", "redis:7"]),
        snapshot("db", &["postgres:16"]),
    ]));

    let lifecycle = Arc::new(FakeLifecycle::new());
    let cancel = CancellationToken::new();
    let tracker = TaskTracker::new();
    let queue = DeletionCoordinator::new(registry.clone(), lifecycle.clone())
        .start(cancel.clone(), &tracker);

    let pass = forward_tag_events(
        futures::stream::iter(vec![tag("app"), Err(EventError::Closed)]),
        &queue,
        &cancel,
    )
    .await;
    assert_eq!(pass.forwarded, 1);
    assert!(matches!(pass.stop, StopReason::Lost(EventError::Closed)));

    drop(queue);
    tracker.close();
    tracker.wait().await;

    let mut calls = lifecycle.calls();
    calls.sort();
    assert_eq!(calls, vec![pod("web"), pod("worker")]);
    assert!(registry.instances_for(&ImageKey::normalize("redis:7")).is_empty());
    assert_eq!(
        registry.instances_for(&ImageKey::normalize("postgres:16")),
        vec![pod("db")]
    );
}

#[tokio::test]
async fn watch_delete_after_eager_removal_is_harmless() {
    let registry = Arc::new(Registry::new());
    let watcher = InstanceWatcher::new(registry.clone());
    watcher.apply(InstanceEvent::Applied(snapshot("web", &["app:v1"])));

    let coordinator = DeletionCoordinator::new(registry.clone(), Arc::new(FakeLifecycle::new()));
    coordinator.handle_tag(ImageKey::normalize("app:v1")).await;
    watcher.apply(InstanceEvent::Deleted(snapshot("web", &["app:v1"])));

    assert!(registry.is_empty());
}

#[tokio::test]
async fn replacement_pod_is_tracked_again() {
    let registry = Arc::new(Registry::new());
    let watcher = InstanceWatcher::new(registry.clone());
    watcher.apply(InstanceEvent::Applied(snapshot("web-1", &["app:v1"])));

    let lifecycle = Arc::new(FakeLifecycle::new());
    let coordinator = DeletionCoordinator::new(registry.clone(), lifecycle.clone());
    coordinator.handle_tag(ImageKey::normalize("app:v1")).await;

    // The controller schedules a replacement running the same tag.
    watcher.apply(InstanceEvent::Applied(snapshot("web-2", &["app:v1"])));
    coordinator.handle_tag(ImageKey::normalize("app:v1")).await;

    assert_eq!(lifecycle.calls(), vec![pod("web-1"), pod("web-2")]);
}
