// ABOUTME: Application-wide error types for podrecycle.
// ABOUTME: Uses thiserror for ergonomic error handling.

use crate::cluster::ClusterError;
use crate::runtime::RuntimeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("kubernetes: {0}")]
    Cluster(#[from] ClusterError),

    #[error("container runtime: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
