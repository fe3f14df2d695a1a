//! Readable cells.
//!
//! [`Readable`] is what state and computed cells have in common: something
//! that can be read (tracked or not), projected with [`map`](Readable::map),
//! and subscribed to with [`on`](Readable::on).
//!
//! [`Signal`] holds either kind when the caller needs to keep them together
//! and tell them apart later.

use std::fmt::{self, Debug};

use super::disposable::Disposable;
use super::memo::Computed;
use super::runtime::Runtime;
use super::signal::State;
use crate::graph::NodeId;

/// Which kind of cell a [`Readable`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    State,
    Computed,
}

/// A reactive cell that can be read.
pub trait Readable<T: 'static> {
    fn id(&self) -> NodeId;

    fn kind(&self) -> SignalKind;

    /// Borrow the current value, recording the read in the enclosing
    /// computation.
    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R;

    /// Borrow the current value without recording the read.
    fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R;

    fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.with_untracked(T::clone)
    }

    /// A computed cell holding `f` applied to this cell's value.
    fn map<U, F>(&self, f: F) -> Computed<U>
    where
        Self: Clone + Sized + 'static,
        U: PartialEq + 'static,
        F: Fn(&T) -> U + 'static,
    {
        let source = self.clone();
        Computed::new(move || source.with(|value| f(value)))
    }

    /// Call `callback` with the value now and after every change.
    fn on<F>(&self, runtime: &Runtime, callback: F) -> Disposable
    where
        Self: Clone + Sized + 'static,
        T: Clone,
        F: FnMut(T) + 'static,
    {
        runtime.subscribe(self, callback)
    }
}

/// Either kind of cell.
pub enum Signal<T: 'static> {
    State(State<T>),
    Computed(Computed<T>),
}

impl<T: 'static> Signal<T> {
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State(_))
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, Self::Computed(_))
    }

    pub fn as_state(&self) -> Option<&State<T>> {
        match self {
            Self::State(state) => Some(state),
            Self::Computed(_) => None,
        }
    }

    pub fn as_computed(&self) -> Option<&Computed<T>> {
        match self {
            Self::State(_) => None,
            Self::Computed(computed) => Some(computed),
        }
    }
}

impl<T: 'static> Readable<T> for Signal<T> {
    fn id(&self) -> NodeId {
        match self {
            Self::State(state) => state.id(),
            Self::Computed(computed) => computed.id(),
        }
    }

    fn kind(&self) -> SignalKind {
        match self {
            Self::State(_) => SignalKind::State,
            Self::Computed(_) => SignalKind::Computed,
        }
    }

    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        match self {
            Self::State(state) => state.with(f),
            Self::Computed(computed) => computed.with(f),
        }
    }

    fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        match self {
            Self::State(state) => Readable::with_untracked(state, f),
            Self::Computed(computed) => Readable::with_untracked(computed, f),
        }
    }
}

impl<T: 'static> From<State<T>> for Signal<T> {
    fn from(state: State<T>) -> Self {
        Self::State(state)
    }
}

impl<T: 'static> From<Computed<T>> for Signal<T> {
    fn from(computed: Computed<T>) -> Self {
        Self::Computed(computed)
    }
}

impl<T: 'static> Clone for Signal<T> {
    fn clone(&self) -> Self {
        match self {
            Self::State(state) => Self::State(state.clone()),
            Self::Computed(computed) => Self::Computed(computed.clone()),
        }
    }
}

impl<T: Debug + 'static> Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State(state) => state.fmt(f),
            Self::Computed(computed) => computed.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_reported() {
        let state = State::new(1);
        assert_eq!(Readable::kind(&state), SignalKind::State);

        let computed = Computed::new(|| 2);
        assert_eq!(Readable::kind(&computed), SignalKind::Computed);

        let s1: Signal<i32> = state.into();
        assert!(s1.is_state());
        assert!(!s1.is_computed());
        assert!(s1.as_state().is_some());

        let s2: Signal<i32> = computed.into();
        assert!(s2.is_computed());
        assert!(!s2.is_state());
        assert_eq!(s2.get(), 2);
    }

    #[test]
    fn map_projects_either_kind() {
        let state = State::new(3);
        let doubled = state.map(|v| v * 2);
        let described = doubled.map(|v| format!("{v}!"));

        assert_eq!(described.get(), "6!");
        state.set(4);
        assert_eq!(described.get(), "8!");
    }

    #[test]
    fn signal_reads_through_to_its_cell() {
        let state = State::new(5);
        let signal = Signal::from(state.clone());

        state.set(6);
        assert_eq!(signal.get_untracked(), 6);
        assert_eq!(signal.id(), state.id());
    }
}
