// ABOUTME: Runtime error types with SNAFU pattern.
// ABOUTME: Unifies detection, connection and event stream errors for programmatic handling.

use snafu::Snafu;

use super::detection::DetectionError;
use super::traits::{EventError, RuntimeInfoError};

/// Unified runtime error for detection, connection and event failures.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RuntimeError {
    #[snafu(display("runtime detection failed: {source}"))]
    Detection { source: DetectionError },

    #[snafu(display("runtime connection failed: {source}"))]
    Connection { source: RuntimeInfoError },

    #[snafu(display("runtime event stream failed after {attempts} reconnect attempt(s): {source}"))]
    EventStream { source: EventError, attempts: u32 },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// No container runtime found on the system.
    NoRuntimeFound,
    /// Runtime location could not be understood.
    InvalidHost,
    /// Failed to connect to runtime socket.
    ConnectionFailed,
    /// The event subscription broke and could not be re-established.
    EventStreamLost,
}

impl RuntimeError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> RuntimeErrorKind {
        match self {
            RuntimeError::Detection { source } => match source {
                DetectionError::NoRuntimeFound => RuntimeErrorKind::NoRuntimeFound,
                DetectionError::UnsupportedHost(_) => RuntimeErrorKind::InvalidHost,
            },
            RuntimeError::Connection { .. } => RuntimeErrorKind::ConnectionFailed,
            RuntimeError::EventStream { .. } => RuntimeErrorKind::EventStreamLost,
        }
    }
}

impl From<DetectionError> for RuntimeError {
    fn from(source: DetectionError) -> Self {
        RuntimeError::Detection { source }
    }
}

impl From<RuntimeInfoError> for RuntimeError {
    fn from(source: RuntimeInfoError) -> Self {
        RuntimeError::Connection { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_reflects_source() {
        let err = RuntimeError::from(DetectionError::NoRuntimeFound);
        assert_eq!(err.kind(), RuntimeErrorKind::NoRuntimeFound);

        let err = RuntimeError::from(RuntimeInfoError::ConnectionFailed("refused".to_string()));
        assert_eq!(err.kind(), RuntimeErrorKind::ConnectionFailed);
        assert!(err.to_string().contains("refused"));

        let err = RuntimeError::EventStream {
            source: EventError::Closed,
            attempts: 3,
        };
        assert_eq!(err.kind(), RuntimeErrorKind::EventStreamLost);
        assert!(err.to_string().contains("3 reconnect attempt(s)"));
    }
}
