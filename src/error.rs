//! Error types surfaced by the primitive.

use thiserror::Error;

/// Rejection payload used when a reaction callback returns the very
/// downstream it is about to settle. Resolving would make the value wait on
/// itself, so the downstream is rejected with this instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("chaining cycle detected for deferred value")]
pub struct CycleError;

/// A scheduler was already selected for this thread, either explicitly or
/// by defaulting on first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("scheduler already selected for this thread")]
pub struct InstallError;
