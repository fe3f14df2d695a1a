//! Error Types

use thiserror::Error;

use crate::graph::NodeId;

/// Errors raised by the cell engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// A derived cell was read from inside its own evaluation.
    #[error("cycle detected: derived cell {0} was read while it was being evaluated")]
    Cycle(NodeId),
}

/// Why an async computed cell could not be handed out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsyncComputedError<E> {
    /// The first run to settle failed.
    #[error("first async run failed: {0}")]
    Failed(E),

    /// Every run was dropped before any of them settled, typically because
    /// the task set driving them shut down.
    #[error("async computed was torn down before its first run settled")]
    Abandoned,
}

impl<E> AsyncComputedError<E> {
    /// The error of the failed first run, if that is what happened.
    pub fn into_failure(self) -> Option<E> {
        match self {
            Self::Failed(error) => Some(error),
            Self::Abandoned => None,
        }
    }
}

/// Errors loading a [`RuntimeConfig`](crate::config::RuntimeConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid runtime configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn async_error_messages() {
        let failed: AsyncComputedError<String> = AsyncComputedError::Failed("welp!".into());
        assert_eq!(failed.to_string(), "first async run failed: welp!");
        assert_eq!(failed.into_failure().as_deref(), Some("welp!"));

        let abandoned: AsyncComputedError<String> = AsyncComputedError::Abandoned;
        assert!(abandoned.into_failure().is_none());
    }
}
