//! Ripple Core
//!
//! This crate provides a fine-grained reactive runtime. It implements:
//!
//! - A push-pull cell engine (states, computed cells, watchers)
//! - Effects batched by a per-runtime scheduler
//! - Async computed cells with cooperative cancellation
//!
//! Everything is single-threaded. Effect flushes and async runs are spawned
//! on the current `tokio::task::LocalSet`.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: The cell engine: nodes, dependency tracking, watchers
//! - `reactive`: Cell handles, effects, the runtime, async computed cells
//! - `config`: Runtime configuration
//! - `error`: Error types
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use ripple_core::config::RuntimeConfig;
//! use ripple_core::reactive::{Computed, Runtime, State};
//!
//! let runtime = Runtime::with_config(RuntimeConfig::manual());
//!
//! // Create a state
//! let count = State::new(1);
//!
//! // Create a derived value
//! let doubled = {
//!     let count = count.clone();
//!     Computed::new(move || count.get() * 2)
//! };
//!
//! // Create an effect
//! let log = Rc::new(RefCell::new(Vec::new()));
//! let handle = {
//!     let log = log.clone();
//!     runtime.effect(move || log.borrow_mut().push(doubled.get()))
//! };
//!
//! // Update the state, then let the scheduler run
//! count.set(5);
//! runtime.flush();
//!
//! assert_eq!(*log.borrow(), vec![2, 10]);
//! handle.dispose();
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;

pub use config::{FlushStrategy, RuntimeConfig};
pub use error::{AsyncComputedError, ConfigError, ReactiveError};
pub use graph::{is_tracking, untracked, DirtyState, NodeId, Watcher};
pub use reactive::{
    AsyncCell, CancelToken, Computed, Disposable, IntoDisposable, Readable, Runtime, Signal,
    State,
};
