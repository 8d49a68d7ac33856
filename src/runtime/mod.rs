// ABOUTME: Container runtime access for Docker and Podman.
// ABOUTME: Socket detection, bollard client, and the image-tag event listener.

mod bollard;
mod detection;
mod error;
mod events;
pub mod traits;
mod types;

pub use self::bollard::BollardRuntime;
pub use detection::{DetectionError, detect, detect_local};
pub use error::{RuntimeError, RuntimeErrorKind};
pub use events::{Forwarded, StopReason, forward_tag_events, run_tag_listener};
pub use traits::RuntimeInfo as RuntimeInfoTrait;
pub use traits::{
    EventError, ImageEvents, RuntimeInfoError, RuntimeMetadata, TagEvent, TagEventStream,
};
pub use types::{RuntimeConfig, RuntimeInfo, RuntimeType};
