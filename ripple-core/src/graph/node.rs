//! Graph Nodes
//!
//! This module defines the identifiers, dirty states and the two roles a
//! node can play in the dependency graph:
//!
//! - a [`Producer`] is something other nodes read from (state and derived
//!   cells);
//! - a [`Consumer`] is something that gets marked when one of the producers
//!   it read has changed (derived cells only).
//!
//! Edges are stored on both ends. A consumer holds strong references to its
//! producers together with the version it last saw; a producer holds weak
//! references to its consumers so that dropping a derived cell is enough to
//! cut it out of the graph.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use smallvec::SmallVec;

/// Unique identifier for a node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Dirty state of a derived node.
///
/// The ordering matters: marking only ever raises the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DirtyState {
    /// The node's value is up-to-date.
    Clean,

    /// Something upstream changed. The node must check its sources before
    /// deciding whether to recompute.
    MaybeDirty,

    /// A direct source changed. The node must recompute.
    Dirty,
}

/// Equality comparator shared by a cell and the projections built from it.
pub type Equals<T> = Rc<dyn Fn(&T, &T) -> bool>;

/// The default comparator: `PartialEq`.
pub(crate) fn default_equals<T: PartialEq + 'static>() -> Equals<T> {
    Rc::new(|a: &T, b: &T| a == b)
}

/// A node that other nodes can read from.
pub(crate) trait Producer {
    fn id(&self) -> NodeId;

    /// Version of the current value. Bumped only when the value changes
    /// under the node's comparator.
    fn version(&self) -> u64;

    /// Bring the value up to date. A no-op for state nodes.
    fn refresh(&self);

    fn subscribe(&self, consumer: NodeId, handle: Weak<dyn Consumer>);

    fn unsubscribe(&self, consumer: NodeId);
}

/// A node that is told when something it read has changed.
pub(crate) trait Consumer {
    fn mark(&self, level: DirtyState);
}

/// One recorded read: the producer and the version observed at the time.
#[derive(Clone)]
pub(crate) struct Dependency {
    pub(crate) source: Rc<dyn Producer>,
    pub(crate) version: u64,
}

impl Dependency {
    pub(crate) fn new(source: Rc<dyn Producer>) -> Self {
        let version = source.version();
        Self { source, version }
    }

    pub(crate) fn id(&self) -> NodeId {
        self.source.id()
    }

    /// True if the producer has moved on since this read was recorded.
    pub(crate) fn is_stale(&self) -> bool {
        self.source.version() != self.version
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("source", &self.id())
            .field("version", &self.version)
            .finish()
    }
}

pub(crate) type Dependencies = SmallVec<[Dependency; 4]>;

/// The consumer side of a producer's edges, in subscription order.
#[derive(Default)]
pub(crate) struct Observers {
    entries: RefCell<IndexMap<NodeId, Weak<dyn Consumer>>>,
}

impl Observers {
    pub(crate) fn insert(&self, id: NodeId, handle: Weak<dyn Consumer>) {
        self.entries.borrow_mut().insert(id, handle);
    }

    pub(crate) fn remove(&self, id: NodeId) {
        self.entries.borrow_mut().shift_remove(&id);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Mark every live consumer. Dead entries are pruned on the way.
    ///
    /// The borrow is released before any consumer runs, since marking
    /// recurses through the graph.
    pub(crate) fn mark_all(&self, level: DirtyState) {
        let live: SmallVec<[Rc<dyn Consumer>; 8]> = {
            let mut entries = self.entries.borrow_mut();
            entries.retain(|_, handle| handle.strong_count() > 0);
            entries.values().filter_map(Weak::upgrade).collect()
        };
        for consumer in live {
            consumer.mark(level);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Probe {
        marks: Cell<usize>,
        last: Cell<Option<DirtyState>>,
    }

    impl Consumer for Probe {
        fn mark(&self, level: DirtyState) {
            self.marks.set(self.marks.get() + 1);
            self.last.set(Some(level));
        }
    }

    fn probe() -> Rc<Probe> {
        Rc::new(Probe {
            marks: Cell::new(0),
            last: Cell::new(None),
        })
    }

    #[test]
    fn node_ids_are_unique() {
        let id1 = NodeId::new();
        let id2 = NodeId::new();
        let id3 = NodeId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn dirty_states_are_ordered() {
        assert!(DirtyState::Clean < DirtyState::MaybeDirty);
        assert!(DirtyState::MaybeDirty < DirtyState::Dirty);
    }

    #[test]
    fn observers_mark_live_consumers() {
        let observers = Observers::default();
        let first = probe();
        let second = probe();

        let first_handle: Weak<dyn Consumer> = Rc::downgrade(&first) as Weak<dyn Consumer>;
        let second_handle: Weak<dyn Consumer> = Rc::downgrade(&second) as Weak<dyn Consumer>;
        observers.insert(NodeId::new(), first_handle);
        observers.insert(NodeId::new(), second_handle);

        observers.mark_all(DirtyState::Dirty);

        assert_eq!(first.marks.get(), 1);
        assert_eq!(second.last.get(), Some(DirtyState::Dirty));
    }

    #[test]
    fn observers_prune_dropped_consumers() {
        let observers = Observers::default();
        let kept = probe();
        let dropped = probe();

        observers.insert(NodeId::new(), Rc::downgrade(&kept) as Weak<dyn Consumer>);
        observers.insert(NodeId::new(), Rc::downgrade(&dropped) as Weak<dyn Consumer>);
        assert_eq!(observers.len(), 2);

        drop(dropped);
        observers.mark_all(DirtyState::MaybeDirty);

        assert_eq!(observers.len(), 1);
        assert_eq!(kept.marks.get(), 1);
    }

    #[test]
    fn observers_remove_by_id() {
        let observers = Observers::default();
        let consumer = probe();
        let id = NodeId::new();

        observers.insert(id, Rc::downgrade(&consumer) as Weak<dyn Consumer>);
        observers.remove(id);
        observers.mark_all(DirtyState::Dirty);

        assert_eq!(consumer.marks.get(), 0);
    }
}
