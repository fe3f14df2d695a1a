//! Dependency Graph
//!
//! This module implements the reactive cell engine: the nodes behind state
//! and derived cells, the tracking stack that records reads, and the watcher
//! that reports derived cells turning dirty.
//!
//! # Overview
//!
//! The dependency graph is a directed acyclic graph where:
//!
//! - State nodes are the roots. They hold a value and are written explicitly.
//! - Derived nodes hold a cached value computed from other nodes.
//! - Edges are recorded automatically: every node read while a derived node
//!   evaluates becomes one of its sources.
//!
//! # Push-Pull
//!
//! Writes push: a changed state node marks its observers `Dirty` and their
//! observers `MaybeDirty`, transitively, stopping at nodes that are already
//! marked. Nothing recomputes during a write.
//!
//! Reads pull: a marked node checks its sources (refreshing them first) and
//! recomputes only if one of them actually produced a new version.
//!
//! # Design Decisions
//!
//! 1. Edges live on the nodes themselves rather than in a central registry.
//!    A consumer holds its sources strongly; a producer holds its consumers
//!    weakly. Dropping the last handle to a derived cell removes it.
//!
//! 2. Everything is single-threaded (`Rc`/`RefCell`). Cells are `!Send`.
//!
//! 3. Scheduling is not the engine's job. The [`Watcher`] only reports; the
//!    effect scheduler decides when to pull.

mod derived;
mod node;
mod source;
mod tracking;
mod watcher;

pub(crate) use derived::DerivedNode;
pub(crate) use node::default_equals;
pub use node::{DirtyState, Equals, NodeId};
pub(crate) use source::StateNode;
pub use tracking::{is_tracking, untracked};
pub use watcher::Watcher;
