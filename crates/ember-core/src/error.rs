//! Error types for Ember core.

use std::fmt;
use std::io;

/// Errors raised while setting up a [`ConfinedExecutor`](crate::ConfinedExecutor).
///
/// Task execution never produces an error here: submission is fire-and-forget
/// and faults inside tasks are contained on the worker thread.
#[derive(Debug)]
pub enum ExecutorError {
    /// The worker thread name cannot be used as an OS thread name.
    InvalidName {
        /// The rejected name.
        name: String,
    },
    /// The operating system refused to spawn the worker thread.
    Spawn {
        /// Name the worker thread would have carried.
        name: String,
        /// Underlying I/O error from the thread builder.
        source: io::Error,
    },
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidName { name } => {
                write!(f, "Invalid worker thread name {name:?}: names must not contain NUL bytes")
            }
            Self::Spawn { name, source } => {
                write!(f, "Failed to spawn worker thread '{name}': {source}")
            }
        }
    }
}

impl std::error::Error for ExecutorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidName { .. } => None,
            Self::Spawn { source, .. } => Some(source),
        }
    }
}

/// A specialized Result type for Ember core operations.
pub type Result<T> = std::result::Result<T, ExecutorError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_spawn_error_display() {
        let err = ExecutorError::Spawn {
            name: "GLRenderer-001".to_string(),
            source: io::Error::new(io::ErrorKind::OutOfMemory, "no threads left"),
        };

        let message = err.to_string();
        assert!(message.contains("GLRenderer-001"));
        assert!(message.contains("no threads left"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_invalid_name_display() {
        let err = ExecutorError::InvalidName {
            name: "bad\0name".to_string(),
        };

        assert!(err.to_string().contains("NUL"));
        assert!(err.source().is_none());
    }
}
