// ABOUTME: Forwards runtime image-tag events to the deletion coordinator.
// ABOUTME: Normalizes references and resubscribes a bounded number of times on transport loss.

use super::error::RuntimeError;
use super::traits::{EventError, ImageEvents, TagEvent};
use crate::types::ImageKey;
use futures::{Stream, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Pause between resubscription attempts.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Why a forwarding pass stopped.
#[derive(Debug)]
pub enum StopReason {
    /// Shutdown was requested.
    Cancelled,
    /// The coordinator is no longer accepting notifications.
    QueueClosed,
    /// The subscription broke while not shutting down.
    Lost(EventError),
}

/// Result of one forwarding pass over a subscription.
#[derive(Debug)]
pub struct Forwarded {
    pub forwarded: usize,
    pub stop: StopReason,
}

/// Forward tag events from one subscription until it stops.
///
/// Events without a `name` attribute are skipped. A transport error seen
/// after cancellation is treated as part of shutdown, not as a failure.
pub async fn forward_tag_events<S>(
    events: S,
    queue: &mpsc::Sender<ImageKey>,
    cancel: &CancellationToken,
) -> Forwarded
where
    S: Stream<Item = Result<TagEvent, EventError>> + Send,
{
    futures::pin_mut!(events);
    let mut forwarded = 0;
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("stopping event listener due to cancellation");
                return Forwarded { forwarded, stop: StopReason::Cancelled };
            }
            next = events.next() => next,
        };

        let stop = match next {
            Some(Ok(event)) => {
                let Some(reference) = event.name else {
                    warn!(image_id = ?event.image_id, "tag event without name attribute");
                    continue;
                };
                let image = ImageKey::normalize(&reference);
                debug!(image = %image, "forwarding tag event");
                if queue.send(image).await.is_err() {
                    StopReason::QueueClosed
                } else {
                    forwarded += 1;
                    continue;
                }
            }
            Some(Err(_)) | None if cancel.is_cancelled() => StopReason::Cancelled,
            Some(Err(e)) => StopReason::Lost(e),
            None => StopReason::Lost(EventError::Closed),
        };
        return Forwarded { forwarded, stop };
    }
}

/// Subscribe to tag events and forward them until shutdown.
///
/// A lost subscription is re-established up to `max_reconnects` times in a
/// row; the count resets whenever a pass forwarded at least one event.
pub async fn run_tag_listener<R>(
    runtime: &R,
    queue: mpsc::Sender<ImageKey>,
    cancel: CancellationToken,
    max_reconnects: u32,
) -> Result<(), RuntimeError>
where
    R: ImageEvents + ?Sized,
{
    let mut attempts = 0;
    loop {
        let pass = forward_tag_events(runtime.tag_events(), &queue, &cancel).await;
        if pass.forwarded > 0 {
            attempts = 0;
        }

        let source = match pass.stop {
            StopReason::Cancelled => return Ok(()),
            StopReason::QueueClosed => {
                debug!("deletion queue closed, stopping event listener");
                return Ok(());
            }
            StopReason::Lost(e) => e,
        };

        if attempts >= max_reconnects {
            return Err(RuntimeError::EventStream { source, attempts });
        }
        attempts += 1;
        warn!(
            attempt = attempts,
            max = max_reconnects,
            "event stream lost, resubscribing: {source}"
        );

        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::traits::TagEventStream;
    use crate::runtime::traits::sealed::Sealed;
    use crate::runtime::RuntimeErrorKind;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    fn tag(name: &str) -> Result<TagEvent, EventError> {
        Ok(TagEvent {
            name: Some(name.to_string()),
            ..Default::default()
        })
    }

    fn transport_error() -> Result<TagEvent, EventError> {
        Err(EventError::Transport("connection reset".to_string()))
    }

    /// Hands out one scripted subscription per call, then empty ones.
    struct ScriptedEvents {
        passes: Mutex<VecDeque<Vec<Result<TagEvent, EventError>>>>,
    }

    impl ScriptedEvents {
        fn new(passes: Vec<Vec<Result<TagEvent, EventError>>>) -> Self {
            Self {
                passes: Mutex::new(passes.into()),
            }
        }
    }

    impl Sealed for ScriptedEvents {}

    impl ImageEvents for ScriptedEvents {
        fn tag_events(&self) -> TagEventStream {
            let pass = self.passes.lock().pop_front().unwrap_or_default();
            Box::pin(futures::stream::iter(pass))
        }
    }

    #[tokio::test]
    async fn forwards_normalized_references() {
        let (tx, mut rx) = mpsc::channel(8);
        let events = futures::stream::iter(vec![tag("app"), tag("app:v2")]);

        let pass = forward_tag_events(events, &tx, &CancellationToken::new()).await;

        assert_eq!(pass.forwarded, 2);
        assert!(matches!(pass.stop, StopReason::Lost(EventError::Closed)));
        assert_eq!(rx.recv().await.unwrap().as_str(), "app:latest");
        assert_eq!(rx.recv().await.unwrap().as_str(), "app:v2");
    }

    #[tokio::test]
    async fn skips_events_without_name() {
        let (tx, mut rx) = mpsc::channel(8);
        let events = futures::stream::iter(vec![Ok(TagEvent::default()), tag("app:v1")]);

        let pass = forward_tag_events(events, &tx, &CancellationToken::new()).await;

        assert_eq!(pass.forwarded, 1);
        assert_eq!(rx.recv().await.unwrap().as_str(), "app:v1");
    }

    #[tokio::test]
    async fn transport_error_is_lost_subscription() {
        let (tx, _rx) = mpsc::channel(8);
        let events = futures::stream::iter(vec![transport_error()]);

        let pass = forward_tag_events(events, &tx, &CancellationToken::new()).await;

        assert!(matches!(pass.stop, StopReason::Lost(EventError::Transport(_))));
    }

    #[tokio::test]
    async fn cancellation_stops_forwarding() {
        let (tx, _rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let pass = forward_tag_events(futures::stream::pending(), &tx, &cancel).await;

        assert!(matches!(pass.stop, StopReason::Cancelled));
    }

    #[tokio::test]
    async fn closed_queue_stops_forwarding() {
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        let events = futures::stream::iter(vec![tag("app:v1")]);

        let pass = forward_tag_events(events, &tx, &CancellationToken::new()).await;

        assert!(matches!(pass.stop, StopReason::QueueClosed));
        assert_eq!(pass.forwarded, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn listener_resubscribes_after_loss() {
        let runtime = ScriptedEvents::new(vec![
            vec![tag("app:v1"), transport_error()],
            vec![tag("app:v2")],
        ]);
        let (tx, mut rx) = mpsc::channel(8);

        let result = run_tag_listener(&runtime, tx, CancellationToken::new(), 1).await;

        // Third subscription is empty and ends; one retry was allowed after
        // the second pass reset the counter, so the error surfaces then.
        let err = result.unwrap_err();
        assert_eq!(err.kind(), RuntimeErrorKind::EventStreamLost);
        assert_eq!(rx.recv().await.unwrap().as_str(), "app:v1");
        assert_eq!(rx.recv().await.unwrap().as_str(), "app:v2");
    }

    #[tokio::test(start_paused = true)]
    async fn listener_gives_up_without_reconnects() {
        let runtime = ScriptedEvents::new(vec![vec![transport_error()]]);
        let (tx, _rx) = mpsc::channel(8);

        let result = run_tag_listener(&runtime, tx, CancellationToken::new(), 0).await;

        assert!(matches!(
            result,
            Err(RuntimeError::EventStream { attempts: 0, .. })
        ));
    }

    #[tokio::test]
    async fn listener_exits_cleanly_when_cancelled() {
        let runtime = ScriptedEvents::new(vec![vec![transport_error()]]);
        let (tx, _rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        cancel.cancel();

        run_tag_listener(&runtime, tx, cancel, 0).await.unwrap();
    }
}
