//! Reactive Primitives
//!
//! This module implements the reactive surface: states, computed cells,
//! effects, and async computed cells. These primitives sit on top of the
//! cell engine in [`crate::graph`].
//!
//! # Concepts
//!
//! ## States
//!
//! A State is a container for mutable state. When a state's value is read
//! while a computed cell or effect is evaluating, the state automatically
//! becomes one of its sources. When the value changes, every dependent is
//! marked dirty.
//!
//! ## Computed Cells
//!
//! A Computed is a derived value that caches its result. It re-evaluates
//! lazily, only when read after one of its dependencies changed.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change. Effects are bound to a [`Runtime`], whose scheduler
//! batches re-runs into one flush per turn.
//!
//! ## Async Computed Cells
//!
//! An async computed cell re-runs an async computation whenever its inputs
//! change, cancels the run it supersedes, and holds the latest settled
//! result.
//!
//! # Implementation Notes
//!
//! The reactive system uses a thread-local tracking stack to automatically
//! detect dependencies. When a cell is read, we check if there is an active
//! evaluation and, if so, record the dependency.
//!
//! This approach (sometimes called "automatic dependency tracking" or
//! "transparent reactivity") is used by SolidJS, Vue 3, and Leptos.

mod async_computed;
mod cancel;
mod disposable;
mod effect;
mod memo;
mod readable;
mod runtime;
mod scheduler;
mod signal;

pub use async_computed::AsyncCell;
pub use cancel::CancelToken;
pub use disposable::{Disposable, DisposeGuard, IntoDisposable};
pub use effect::{effect, subscribe};
pub use memo::Computed;
pub use readable::{Readable, Signal, SignalKind};
pub use runtime::Runtime;
pub use scheduler::{EffectScheduler, FlushReport};
pub use signal::State;
