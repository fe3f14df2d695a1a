//! State Implementation
//!
//! A State is the writable reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How States Work
//!
//! 1. When a state is read within a computation (computed cell or effect),
//!    the computation records the state as one of its sources.
//!
//! 2. When a state's value changes, every computation that read it is
//!    marked dirty.
//!
//! 3. Nothing re-runs during the write. Computed cells recompute on their
//!    next read; effects are re-run by the scheduler's next flush.
//!
//! A write that is equal to the current value, under the state's
//! comparator, is dropped without marking anything.
//!
//! # Thread Safety
//!
//! States are single-threaded. Clones are cheap handles to the same value.

use std::fmt::{self, Debug};
use std::rc::Rc;

use super::memo::Computed;
use super::readable::{Readable, SignalKind};
use crate::graph::{default_equals, untracked, Equals, NodeId, StateNode};

/// A writable reactive value of type T.
///
/// # Example
///
/// ```rust
/// use ripple_core::reactive::State;
///
/// let count = State::new(0);
///
/// // Read the value
/// assert_eq!(count.get(), 0);
///
/// // Update the value (marks dependents dirty)
/// count.set(5);
/// count.update(|v| v + 1);
/// assert_eq!(count.get(), 6);
/// ```
pub struct State<T: 'static> {
    node: Rc<StateNode<T>>,
}

impl<T: PartialEq + 'static> State<T> {
    /// Create a new state compared with `PartialEq`.
    pub fn new(value: T) -> Self {
        Self::from_equals(value, default_equals())
    }
}

impl<T: 'static> State<T> {
    /// Create a new state with a custom comparator.
    ///
    /// A write `b` over a current value `a` is dropped when `equals(a, b)`.
    pub fn with_equals<F>(value: T, equals: F) -> Self
    where
        F: Fn(&T, &T) -> bool + 'static,
    {
        Self::from_equals(value, Rc::new(equals))
    }

    pub(crate) fn from_equals(value: T, equals: Equals<T>) -> Self {
        Self {
            node: StateNode::new(value, equals),
        }
    }

    /// Get the state's unique ID.
    pub fn id(&self) -> NodeId {
        self.node.node_id()
    }

    /// Get the current value.
    ///
    /// If called within a computation, this also records the state as one
    /// of its sources.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    /// Borrow the current value, recording the read like [`get`](Self::get).
    ///
    /// `f` must not write to this state.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.node.track();
        self.node.with_value(f)
    }

    /// Get the current value without recording a dependency.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.node.with_value(T::clone)
    }

    /// Set a new value and mark dependents dirty.
    ///
    /// Does nothing if the value is equal to the current one.
    pub fn set(&self, value: T) {
        self.node.write(value);
    }

    /// Update the value using a function of the current one.
    ///
    /// `f` runs untracked, so calling this inside a computation does not
    /// make the computation depend on this state.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = untracked(|| self.node.with_value(f));
        self.set(next);
    }

    /// A read-only view of this state, sharing its comparator.
    pub fn read_only(&self) -> Computed<T>
    where
        T: Clone,
    {
        let source = self.clone();
        Computed::from_equals(move || source.get(), self.node.equals())
    }

    /// Get the number of computations currently depending on this state.
    pub fn observer_count(&self) -> usize {
        self.node.observer_count()
    }
}

impl<T: 'static> Readable<T> for State<T> {
    fn id(&self) -> NodeId {
        State::id(self)
    }

    fn kind(&self) -> SignalKind {
        SignalKind::State
    }

    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        State::with(self, f)
    }

    fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.node.with_value(f)
    }
}

impl<T: 'static> Clone for State<T> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl<T: Debug + 'static> Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("id", &self.id())
            .field("value", &self.node.with_value(|v| format!("{v:?}")))
            .field("observer_count", &self.observer_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
