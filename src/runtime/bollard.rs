// ABOUTME: Bollard-based container runtime implementation.
// ABOUTME: Supports both Docker and Podman via Docker-compatible API.

use crate::runtime::traits::sealed::Sealed;
use crate::runtime::traits::{
    EventError, ImageEvents, RuntimeInfo, RuntimeInfoError, RuntimeMetadata, TagEvent,
    TagEventStream,
};
use crate::runtime::types::RuntimeType;
use async_trait::async_trait;
use bollard::Docker;
use bollard::models::EventMessage;
use bollard::query_parameters::EventsOptions;
use futures::StreamExt;
use std::collections::HashMap;

/// Connection timeout in seconds for the runtime socket.
const CONNECT_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// Event Mapping Helpers
// =============================================================================

fn tag_filters() -> HashMap<String, Vec<String>> {
    HashMap::from([
        ("type".to_string(), vec!["image".to_string()]),
        ("event".to_string(), vec!["tag".to_string()]),
    ])
}

fn map_event_message(message: EventMessage) -> TagEvent {
    let (image_id, mut attributes) = match message.actor {
        Some(actor) => (actor.id, actor.attributes.unwrap_or_default()),
        None => (None, HashMap::new()),
    };
    TagEvent {
        name: attributes.remove("name"),
        image_id,
        time: message.time,
    }
}

fn map_event_error(e: bollard::errors::Error) -> EventError {
    EventError::Transport(e.to_string())
}

// =============================================================================
// BollardRuntime
// =============================================================================

/// Container runtime implementation using bollard.
///
/// Supports both Docker and Podman via Docker-compatible API.
pub struct BollardRuntime {
    client: Docker,
    runtime_type: RuntimeType,
}

impl BollardRuntime {
    /// Create a new BollardRuntime from a Docker client.
    pub fn new(client: Docker, runtime_type: RuntimeType) -> Self {
        Self {
            client,
            runtime_type,
        }
    }

    /// Connect to a container runtime using detected runtime info.
    ///
    /// Use with `detect_local()` to connect to a runtime.
    pub fn connect(info: &super::types::RuntimeInfo) -> Result<Self, RuntimeInfoError> {
        let client = Docker::connect_with_unix(
            &info.socket_path,
            CONNECT_TIMEOUT_SECS,
            bollard::API_DEFAULT_VERSION,
        )
        .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;
        Ok(Self::new(client, info.runtime_type))
    }
}

// Implement Sealed trait to allow runtime trait implementations
impl Sealed for BollardRuntime {}

#[async_trait]
impl RuntimeInfo for BollardRuntime {
    async fn version(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        let version = self
            .client
            .version()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;

        let name = match self.runtime_type {
            RuntimeType::Docker => "Docker".to_string(),
            RuntimeType::Podman => "Podman".to_string(),
        };

        Ok(RuntimeMetadata {
            name,
            version: version.version.unwrap_or_default(),
            api_version: version.api_version.unwrap_or_default(),
            os: version.os.unwrap_or_default(),
            arch: version.arch.unwrap_or_default(),
        })
    }

    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        self.client
            .ping()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }
}

impl ImageEvents for BollardRuntime {
    fn tag_events(&self) -> TagEventStream {
        let opts = EventsOptions {
            filters: Some(tag_filters()),
            ..Default::default()
        };

        let stream = self
            .client
            .events(Some(opts))
            .map(|result| result.map(map_event_message).map_err(map_event_error));
        Box::pin(stream)
    }
}
