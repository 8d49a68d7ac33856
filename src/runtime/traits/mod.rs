// ABOUTME: Capability traits for container runtimes.
// ABOUTME: Defines RuntimeInfo and ImageEvents.

mod events;
mod runtime_info;
pub(crate) mod sealed;
mod shared_types;

pub use events::{EventError, ImageEvents, TagEvent, TagEventStream};
pub use runtime_info::{RuntimeInfo, RuntimeInfoError};
pub use shared_types::RuntimeMetadata;
