//! Error types for the render crate.

use ember_core::ExecutorError;
use thiserror::Error;

/// Errors that can occur while setting up a renderer.
///
/// Only construction can fail. Every operation on a live renderer is
/// fire-and-forget and reports native failures through logs and
/// [`RendererStats`](crate::RendererStats) instead.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The worker thread could not be started.
    #[error("failed to start renderer worker: {0}")]
    Executor(#[from] ExecutorError),

    /// The configured worker-thread name prefix is empty.
    #[error("invalid worker thread name prefix: {0:?}")]
    InvalidThreadName(String),
}

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;
