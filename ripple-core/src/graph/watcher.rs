//! Watcher
//!
//! A watcher observes a set of derived cells and calls its notification
//! callback when one of them goes from clean to dirty.
//!
//! The callback fires at most once until the watcher is re-armed, no matter
//! how many watched cells get dirtied in between. Whoever owns the watcher
//! is expected to collect [`Watcher::pending`] cells, bring them up to date,
//! and call [`Watcher::rearm`].
//!
//! Watched cells are held strongly: a watched cell stays alive until it is
//! unwatched or the watcher is dropped.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::derived::Watched;
use super::node::NodeId;
use crate::reactive::Computed;

pub(crate) struct WatcherCore {
    id: NodeId,
    armed: Cell<bool>,
    on_dirty: Box<dyn Fn()>,
    watched: RefCell<IndexMap<NodeId, Rc<dyn Watched>>>,
}

impl WatcherCore {
    /// Called by a watched cell that just became dirty.
    pub(crate) fn notify(&self) {
        if self.armed.replace(false) {
            (self.on_dirty)();
        }
    }
}

/// A set of derived cells observed for dirtiness.
pub struct Watcher {
    core: Rc<WatcherCore>,
}

impl Watcher {
    /// Create an armed watcher with nothing watched.
    pub fn new<F>(on_dirty: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self {
            core: Rc::new(WatcherCore {
                id: NodeId::new(),
                armed: Cell::new(true),
                on_dirty: Box::new(on_dirty),
                watched: RefCell::new(IndexMap::new()),
            }),
        }
    }

    /// Start watching `cell`. Watching also re-arms the watcher.
    pub fn watch<T: 'static>(&self, cell: &Computed<T>) {
        self.watch_node(cell.node());
    }

    pub(crate) fn watch_node(&self, node: Rc<dyn Watched>) {
        node.attach(self.core.id, Rc::downgrade(&self.core));
        self.core.watched.borrow_mut().insert(node.id(), node);
        self.core.armed.set(true);
    }

    /// Stop watching `cell`. Unknown cells are ignored.
    pub fn unwatch<T: 'static>(&self, cell: &Computed<T>) {
        self.unwatch_id(cell.id());
    }

    pub(crate) fn unwatch_id(&self, id: NodeId) {
        let removed = self.core.watched.borrow_mut().shift_remove(&id);
        if let Some(node) = removed {
            node.detach(self.core.id);
        }
    }

    /// Allow the callback to fire again.
    pub fn rearm(&self) {
        self.core.armed.set(true);
    }

    pub fn is_armed(&self) -> bool {
        self.core.armed.get()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.core.watched.borrow().contains_key(&id)
    }

    /// Number of watched cells.
    pub fn len(&self) -> usize {
        self.core.watched.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Watched cells that are currently dirty, in the order they were
    /// first watched.
    pub(crate) fn pending(&self) -> Vec<Rc<dyn Watched>> {
        self.core
            .watched
            .borrow()
            .values()
            .filter(|node| node.is_dirty())
            .cloned()
            .collect()
    }

    /// IDs of the cells [`pending`](Self::pending) would return.
    pub fn pending_ids(&self) -> Vec<NodeId> {
        self.pending().iter().map(|node| node.id()).collect()
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        let watched = std::mem::take(&mut *self.core.watched.borrow_mut());
        for node in watched.values() {
            node.detach(self.core.id);
        }
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.core.id)
            .field("armed", &self.is_armed())
            .field("watched", &self.len())
            .finish()
    }
}
