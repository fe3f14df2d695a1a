//! State Nodes
//!
//! A state node is a root of the graph: it has no sources, only observers.
//! Writing a value that differs from the current one (under the node's
//! comparator) bumps the version and marks every observer dirty.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::node::{Consumer, DirtyState, Equals, NodeId, Observers, Producer};
use super::tracking::Tracking;

pub(crate) struct StateNode<T> {
    id: NodeId,
    value: RefCell<T>,
    equals: Equals<T>,
    version: Cell<u64>,
    observers: Observers,
}

impl<T: 'static> StateNode<T> {
    pub(crate) fn new(value: T, equals: Equals<T>) -> Rc<Self> {
        Rc::new(Self {
            id: NodeId::new(),
            value: RefCell::new(value),
            equals,
            version: Cell::new(0),
            observers: Observers::default(),
        })
    }

    pub(crate) fn node_id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn equals(&self) -> Equals<T> {
        Rc::clone(&self.equals)
    }

    /// Record a read in the enclosing computation, if any.
    pub(crate) fn track(self: &Rc<Self>) {
        Tracking::record(Rc::clone(self) as Rc<dyn Producer>);
    }

    /// Borrow the current value without tracking.
    ///
    /// `f` must not write to this node.
    pub(crate) fn with_value<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    /// Store `value` and notify observers. Returns false, and touches
    /// nothing, if the value is equal to the current one.
    pub(crate) fn write(&self, value: T) -> bool {
        let unchanged = {
            let current = self.value.borrow();
            (self.equals)(&*current, &value)
        };
        if unchanged {
            return false;
        }

        *self.value.borrow_mut() = value;
        self.version.set(self.version.get() + 1);
        self.observers.mark_all(DirtyState::Dirty);
        true
    }

    pub(crate) fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

impl<T: 'static> Producer for StateNode<T> {
    fn id(&self) -> NodeId {
        self.id
    }

    fn version(&self) -> u64 {
        self.version.get()
    }

    fn refresh(&self) {}

    fn subscribe(&self, consumer: NodeId, handle: Weak<dyn Consumer>) {
        self.observers.insert(consumer, handle);
    }

    fn unsubscribe(&self, consumer: NodeId) {
        self.observers.remove(consumer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::default_equals;

    #[test]
    fn write_bumps_version_only_on_change() {
        let node = StateNode::new(1, default_equals());
        assert_eq!(node.version(), 0);

        assert!(node.write(2));
        assert_eq!(node.version(), 1);

        assert!(!node.write(2));
        assert_eq!(node.version(), 1);
        assert_eq!(node.with_value(|v| *v), 2);
    }

    #[test]
    fn custom_comparator_suppresses_writes() {
        let by_len: Equals<String> = Rc::new(|a: &String, b: &String| a.len() == b.len());
        let node = StateNode::new("abc".to_string(), by_len);

        assert!(!node.write("xyz".to_string()));
        assert_eq!(node.with_value(String::clone), "abc");

        assert!(node.write("abcd".to_string()));
        assert_eq!(node.with_value(String::clone), "abcd");
    }
}
