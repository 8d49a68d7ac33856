// ABOUTME: Sealed trait pattern for runtime traits.
// ABOUTME: Prevents external implementations, allowing non-breaking evolution.

/// Sealed trait to prevent external implementations.
///
/// Only types that implement Sealed (our internal runtime types) can implement
/// the runtime traits.
pub trait Sealed {}
