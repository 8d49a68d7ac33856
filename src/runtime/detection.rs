// ABOUTME: Runtime detection logic for the local system.
// ABOUTME: Honours explicit config and DOCKER_HOST, then checks Podman and Docker sockets.

use super::types::{RuntimeConfig, RuntimeInfo, RuntimeType};
use std::path::Path;

/// Error during runtime detection.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("no container runtime found (checked Podman and Docker sockets)")]
    NoRuntimeFound,

    #[error("unsupported DOCKER_HOST (only unix:// sockets are supported): {0}")]
    UnsupportedHost(String),
}

const ROOTFUL_PODMAN: &str = "/run/podman/podman.sock";
const DOCKER_SOCKET: &str = "/var/run/docker.sock";
const UNIX_SCHEME: &str = "unix://";

/// Detect the container runtime, honouring explicit configuration.
///
/// If `config` names a runtime, it is used with its socket (or the
/// runtime's default socket). Otherwise falls back to [`detect_local`].
pub fn detect(config: &RuntimeConfig) -> Result<RuntimeInfo, DetectionError> {
    if let Some(runtime_type) = config.runtime {
        let socket_path = config
            .socket
            .clone()
            .unwrap_or_else(|| default_socket_path(runtime_type));
        return Ok(RuntimeInfo {
            runtime_type,
            socket_path,
        });
    }

    if let Some(socket_path) = config.socket.clone() {
        return Ok(RuntimeInfo {
            runtime_type: guess_runtime_type(&socket_path),
            socket_path,
        });
    }

    detect_local()
}

/// Detect container runtime on the local system.
///
/// Detection order:
/// 1. `DOCKER_HOST` if it names a `unix://` socket
/// 2. Rootless Podman socket (`/run/user/$UID/podman/podman.sock`)
/// 3. Rootful Podman socket (`/run/podman/podman.sock`)
/// 4. Docker socket (`/var/run/docker.sock`)
pub fn detect_local() -> Result<RuntimeInfo, DetectionError> {
    // 1. DOCKER_HOST
    if let Ok(host) = std::env::var("DOCKER_HOST")
        && !host.is_empty()
    {
        let socket_path = socket_from_docker_host(&host)?;
        return Ok(RuntimeInfo {
            runtime_type: guess_runtime_type(&socket_path),
            socket_path,
        });
    }

    // 2. Rootless Podman
    if let Some(uid) = get_uid() {
        let rootless_socket = format!("/run/user/{}/podman/podman.sock", uid);
        if Path::new(&rootless_socket).exists() {
            return Ok(RuntimeInfo {
                runtime_type: RuntimeType::Podman,
                socket_path: rootless_socket,
            });
        }
    }

    // 3. Rootful Podman
    if Path::new(ROOTFUL_PODMAN).exists() {
        return Ok(RuntimeInfo {
            runtime_type: RuntimeType::Podman,
            socket_path: ROOTFUL_PODMAN.to_string(),
        });
    }

    // 4. Docker
    if Path::new(DOCKER_SOCKET).exists() {
        return Ok(RuntimeInfo {
            runtime_type: RuntimeType::Docker,
            socket_path: DOCKER_SOCKET.to_string(),
        });
    }

    Err(DetectionError::NoRuntimeFound)
}

fn socket_from_docker_host(host: &str) -> Result<String, DetectionError> {
    host.strip_prefix(UNIX_SCHEME)
        .map(str::to_string)
        .ok_or_else(|| DetectionError::UnsupportedHost(host.to_string()))
}

fn guess_runtime_type(socket_path: &str) -> RuntimeType {
    if socket_path.contains("podman") {
        RuntimeType::Podman
    } else {
        RuntimeType::Docker
    }
}

fn get_uid() -> Option<String> {
    std::env::var("UID").ok().or_else(|| {
        // Fall back to reading /proc/self/status
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|s| {
                s.lines()
                    .find(|l| l.starts_with("Uid:"))
                    .and_then(|l| l.split_whitespace().nth(1))
                    .map(|s| s.to_string())
            })
    })
}

fn default_socket_path(runtime: RuntimeType) -> String {
    match runtime {
        RuntimeType::Docker => DOCKER_SOCKET.to_string(),
        RuntimeType::Podman => ROOTFUL_PODMAN.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_runtime_uses_default_socket() {
        let config = RuntimeConfig {
            runtime: Some(RuntimeType::Docker),
            socket: None,
        };
        let info = detect(&config).unwrap();
        assert_eq!(info.runtime_type, RuntimeType::Docker);
        assert_eq!(info.socket_path, DOCKER_SOCKET);
    }

    #[test]
    fn explicit_socket_wins_over_default() {
        let config = RuntimeConfig {
            runtime: Some(RuntimeType::Podman),
            socket: Some("/tmp/podman.sock".to_string()),
        };
        let info = detect(&config).unwrap();
        assert_eq!(info.runtime_type, RuntimeType::Podman);
        assert_eq!(info.socket_path, "/tmp/podman.sock");
    }

    #[test]
    fn socket_only_guesses_runtime() {
        let config = RuntimeConfig {
            runtime: None,
            socket: Some("/run/user/1000/podman/podman.sock".to_string()),
        };
        assert_eq!(detect(&config).unwrap().runtime_type, RuntimeType::Podman);
    }

    #[test]
    fn docker_host_unix_scheme_is_stripped() {
        assert_eq!(
            socket_from_docker_host("unix:///var/run/docker.sock").unwrap(),
            "/var/run/docker.sock"
        );
    }

    #[test]
    fn docker_host_tcp_is_rejected() {
        assert!(matches!(
            socket_from_docker_host("tcp://127.0.0.1:2375"),
            Err(DetectionError::UnsupportedHost(_))
        ));
    }
}
