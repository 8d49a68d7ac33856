// ABOUTME: Shared types used across runtime trait definitions.
// ABOUTME: RuntimeMetadata reported by the startup version probe.

/// Runtime metadata.
#[derive(Debug, Clone, Default)]
pub struct RuntimeMetadata {
    /// Runtime name (e.g., "Docker", "Podman").
    pub name: String,
    /// Runtime version.
    pub version: String,
    /// API version.
    pub api_version: String,
    /// Operating system.
    pub os: String,
    /// Architecture.
    pub arch: String,
}
