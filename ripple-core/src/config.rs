//! Runtime Configuration
//!
//! A [`RuntimeConfig`] decides how a [`Runtime`](crate::reactive::Runtime)
//! runs its effect flushes. Every field has a default, so a config can be
//! built in code or loaded from a partial JSON document:
//!
//! ```rust
//! use ripple_core::config::{FlushStrategy, RuntimeConfig};
//!
//! let config = RuntimeConfig::from_json(r#"{ "flush": "manual" }"#).unwrap();
//! assert_eq!(config.flush, FlushStrategy::Manual);
//! assert!(config.isolate_panics);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// When a queued effect flush actually runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushStrategy {
    /// Spawn the flush as a task on the current `tokio::task::LocalSet`.
    ///
    /// Writes that dirty an effect must then happen inside that local set.
    #[default]
    Microtask,

    /// Leave the flush queued until [`Runtime::flush`] is called.
    ///
    /// [`Runtime::flush`]: crate::reactive::Runtime::flush
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub flush: FlushStrategy,

    /// Catch a panicking effect and carry on with the rest of the flush.
    ///
    /// When false the first panic propagates out of the flush. The effects
    /// that did not get their turn are flushed next time.
    pub isolate_panics: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            flush: FlushStrategy::Microtask,
            isolate_panics: true,
        }
    }
}

impl RuntimeConfig {
    /// Defaults, but with flushes run by hand.
    pub fn manual() -> Self {
        Self {
            flush: FlushStrategy::Manual,
            ..Self::default()
        }
    }

    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(source)?)
    }
}
