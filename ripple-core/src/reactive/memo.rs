//! Computed Implementation
//!
//! A Computed is a cached derived value that re-evaluates only when its
//! dependencies change.
//!
//! # How Computed Cells Work
//!
//! 1. On first access, the cell runs its computation and caches the result.
//!
//! 2. When accessed again, if no dependencies have changed, returns the
//!    cached value.
//!
//! 3. When a dependency changes, the cell is marked dirty (or maybe dirty,
//!    if the change is further upstream).
//!
//! 4. On next access, the cell re-checks whether its inputs actually
//!    changed, and recomputes only if they did.
//!
//! # Why This Matters
//!
//! This "lazy" approach avoids unnecessary recomputation:
//!
//! - A state changes
//! - 10 computed cells depend on it
//! - Only the cells actually accessed will recompute
//! - Cells that are never read stay dirty (no wasted work)
//!
//! # Errors
//!
//! A computation that panics propagates the panic to whoever read the cell.
//! Reading a cell from inside its own computation is a cycle; see
//! [`Computed::try_get`].

use std::any::Any;
use std::fmt::{self, Debug};
use std::rc::Rc;

use super::readable::{Readable, SignalKind};
use crate::error::ReactiveError;
use crate::graph::{default_equals, untracked, DerivedNode, DirtyState, Equals, NodeId};

/// A cached derived value that recomputes only when dependencies change.
///
/// The default comparator is `PartialEq`: a recomputation that yields an
/// equal value leaves dependents clean.
///
/// # Example
///
/// ```rust
/// use ripple_core::reactive::{Computed, State};
///
/// let count = State::new(2);
/// let doubled = {
///     let count = count.clone();
///     Computed::new(move || count.get() * 2)
/// };
///
/// assert_eq!(doubled.get(), 4);
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Computed<T: 'static> {
    node: Rc<DerivedNode<T>>,
}

impl<T: PartialEq + 'static> Computed<T> {
    /// Create a new computed cell with the given computation function.
    ///
    /// The computation is not run immediately. It runs on first access.
    pub fn new<F>(compute: F) -> Self
    where
        F: FnMut() -> T + 'static,
    {
        Self::from_equals(compute, default_equals())
    }
}

impl<T: 'static> Computed<T> {
    /// Create a new computed cell with a custom comparator.
    pub fn with_equals<F, E>(compute: F, equals: E) -> Self
    where
        F: FnMut() -> T + 'static,
        E: Fn(&T, &T) -> bool + 'static,
    {
        Self::from_equals(compute, Rc::new(equals))
    }

    pub(crate) fn from_equals<F>(compute: F, equals: Equals<T>) -> Self
    where
        F: FnMut() -> T + 'static,
    {
        Self {
            node: DerivedNode::new(Box::new(compute), equals),
        }
    }

    /// Get the cell's unique ID.
    pub fn id(&self) -> NodeId {
        self.node.node_id()
    }

    /// Get the current value, recomputing if necessary.
    ///
    /// # Panics
    ///
    /// Panics if called from inside this cell's own computation.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    /// Like [`get`](Self::get), but reports a cycle instead of panicking.
    pub fn try_get(&self) -> Result<T, ReactiveError>
    where
        T: Clone,
    {
        self.node.read(T::clone)
    }

    /// Borrow the current value, recomputing if necessary.
    ///
    /// # Panics
    ///
    /// Panics if called from inside this cell's own computation.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        match self.node.read(f) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Get the current value without recording a dependency.
    ///
    /// The cell still recomputes if it is dirty.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        untracked(|| self.get())
    }

    /// Get the current dirty state.
    pub fn state(&self) -> DirtyState {
        self.node.state()
    }

    /// Check if the cell has a cached value.
    pub fn has_value(&self) -> bool {
        self.node.has_value()
    }

    /// Get the number of computations depending on this cell.
    pub fn observer_count(&self) -> usize {
        self.node.observer_count()
    }

    /// Get the number of cells this one read during its last evaluation.
    pub fn source_count(&self) -> usize {
        self.node.source_count()
    }

    pub(crate) fn node(&self) -> Rc<DerivedNode<T>> {
        Rc::clone(&self.node)
    }

    /// Keep `value` alive for as long as this cell is.
    pub(crate) fn retain(&self, value: Rc<dyn Any>) {
        self.node.retain(value);
    }
}

impl<T: 'static> Readable<T> for Computed<T> {
    fn id(&self) -> NodeId {
        Computed::id(self)
    }

    fn kind(&self) -> SignalKind {
        SignalKind::Computed
    }

    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        Computed::with(self, f)
    }

    fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        untracked(|| Computed::with(self, f))
    }
}

impl<T: 'static> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl<T: 'static> Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.id())
            .field("state", &self.state())
            .field("has_value", &self.has_value())
            .field("observer_count", &self.observer_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::State;
    use std::cell::{Cell, RefCell};

    fn counted<T: PartialEq + 'static>(
        runs: &Rc<Cell<usize>>,
        mut f: impl FnMut() -> T + 'static,
    ) -> Computed<T> {
        let runs = runs.clone();
        Computed::new(move || {
            runs.set(runs.get() + 1);
            f()
        })
    }

    #[test]
    fn computed_computes_on_first_access() {
        let runs = Rc::new(Cell::new(0));
        let cell = counted(&runs, || 42);

        // Not computed yet
        assert!(!cell.has_value());
        assert_eq!(runs.get(), 0);

        // First access triggers computation
        assert_eq!(cell.get(), 42);
        assert_eq!(runs.get(), 1);
        assert!(cell.has_value());
    }

    #[test]
    fn computed_caches_value_when_clean() {
        let runs = Rc::new(Cell::new(0));
        let cell = counted(&runs, || 42);

        assert_eq!(cell.get(), 42);
        assert_eq!(cell.get(), 42);
        assert_eq!(cell.get(), 42);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn computed_recomputes_after_source_change() {
        let runs = Rc::new(Cell::new(0));
        let source = State::new(0);
        let cell = {
            let source = source.clone();
            counted(&runs, move || source.get() + 1)
        };

        assert_eq!(cell.get(), 1);
        source.set(5);
        assert_eq!(cell.state(), DirtyState::Dirty);
        assert_eq!(cell.get(), 6);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn computed_depends_on_computed() {
        let base = State::new(5);
        let doubled = {
            let base = base.clone();
            Computed::new(move || base.get() * 2)
        };
        let plus_ten = {
            let doubled = doubled.clone();
            Computed::new(move || doubled.get() + 10)
        };

        assert_eq!(plus_ten.get(), 20);

        base.set(10);
        assert_eq!(doubled.state(), DirtyState::Dirty);
        assert_eq!(plus_ten.state(), DirtyState::MaybeDirty);
        assert_eq!(plus_ten.get(), 30);
    }

    #[test]
    fn unchanged_intermediate_skips_downstream() {
        let downstream_runs = Rc::new(Cell::new(0));
        let source = State::new(2);
        let parity = {
            let source = source.clone();
            Computed::new(move || source.get() % 2 == 0)
        };
        let label = {
            let parity = parity.clone();
            counted(&downstream_runs, move || if parity.get() { "even" } else { "odd" })
        };

        assert_eq!(label.get(), "even");
        source.set(4);
        assert_eq!(label.get(), "even");
        assert_eq!(downstream_runs.get(), 1);

        source.set(5);
        assert_eq!(label.get(), "odd");
        assert_eq!(downstream_runs.get(), 2);
    }

    #[test]
    fn diamond_evaluates_each_cell_once() {
        let sum_runs = Rc::new(Cell::new(0));
        let source = State::new(1);
        let left = {
            let source = source.clone();
            Computed::new(move || source.get() + 1)
        };
        let right = {
            let source = source.clone();
            Computed::new(move || source.get() * 2)
        };
        let sum = {
            let (left, right) = (left.clone(), right.clone());
            counted(&sum_runs, move || left.get() + right.get())
        };

        assert_eq!(sum.get(), 4);
        source.set(3);
        assert_eq!(sum.get(), 10);
        assert_eq!(sum_runs.get(), 2);
    }

    #[test]
    fn try_get_reports_cycle() {
        let slot: Rc<RefCell<Option<Computed<bool>>>> = Rc::default();
        let cell = {
            let slot = slot.clone();
            Computed::new(move || {
                let me = slot.borrow().clone();
                me.is_some_and(|me| matches!(me.try_get(), Err(ReactiveError::Cycle(_))))
            })
        };
        *slot.borrow_mut() = Some(cell.clone());

        assert!(cell.get());
        slot.borrow_mut().take();
    }

    #[test]
    fn get_untracked_does_not_subscribe() {
        let inner = Computed::new(|| 7);
        let outer = {
            let inner = inner.clone();
            Computed::new(move || inner.get_untracked())
        };

        assert_eq!(outer.get(), 7);
        assert_eq!(inner.observer_count(), 0);
        assert_eq!(outer.source_count(), 0);
    }

    #[test]
    fn clone_shares_cache() {
        let runs = Rc::new(Cell::new(0));
        let first = counted(&runs, || 1);
        let second = first.clone();

        assert_eq!(first.get(), 1);
        assert_eq!(second.get(), 1);
        assert_eq!(first.id(), second.id());
        assert_eq!(runs.get(), 1);
    }
}
