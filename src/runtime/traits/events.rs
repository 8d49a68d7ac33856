// ABOUTME: Image event trait for container runtimes.
// ABOUTME: Subscribes to the runtime's image tag notifications.

use super::sealed::Sealed;
use futures::Stream;
use std::pin::Pin;

/// A stream of tag events as delivered by the runtime.
pub type TagEventStream = Pin<Box<dyn Stream<Item = Result<TagEvent, EventError>> + Send>>;

/// Image event subscriptions.
pub trait ImageEvents: Sealed + Send + Sync {
    /// Subscribe to `type=image`, `event=tag` events.
    ///
    /// Each call opens a fresh subscription; events from before the call are
    /// not replayed.
    fn tag_events(&self) -> TagEventStream;
}

/// An image was tagged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagEvent {
    /// The new reference, from the actor's `name` attribute.
    pub name: Option<String>,
    /// Image ID the reference now points at.
    pub image_id: Option<String>,
    /// Unix timestamp of the event.
    pub time: Option<i64>,
}

/// Errors from the event subscription.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("event stream transport error: {0}")]
    Transport(String),

    #[error("event stream closed by runtime")]
    Closed,
}
