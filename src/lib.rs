// ABOUTME: Library root for podrecycle - exposes the pipeline components for testing.
// ABOUTME: The main binary is in main.rs.

pub mod app;
pub mod cluster;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod registry;
pub mod runtime;
pub mod types;
