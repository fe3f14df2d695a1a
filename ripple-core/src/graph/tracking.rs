//! Dependency Tracking
//!
//! The tracking stack records which producers a derived node reads while its
//! computation runs.
//!
//! # Implementation
//!
//! We use a thread-local stack of frames. Entering a derived node's
//! evaluation pushes a frame owned by that node; every producer read while
//! the frame is on top is recorded in it, together with the producer's
//! version at the time of the read. When the computation completes the frame
//! is popped and handed back to the node.
//!
//! [`untracked`] pushes an ownerless frame, which swallows reads. This is how
//! a computation reads a cell without depending on it.

use std::cell::RefCell;
use std::rc::Rc;

use super::node::{Dependencies, Dependency, NodeId, Producer};

thread_local! {
    static TRACKING_STACK: RefCell<Vec<Frame>> = RefCell::new(Vec::new());
}

/// An entry in the tracking stack.
struct Frame {
    /// The node being evaluated, or `None` inside [`untracked`].
    owner: Option<NodeId>,
    /// Producers read so far, deduplicated, in first-read order.
    reads: Dependencies,
}

/// Guard that pops its frame when dropped.
///
/// This keeps the stack balanced even if the computation panics.
pub(crate) struct Tracking {
    owner: Option<NodeId>,
    popped: bool,
}

impl Tracking {
    /// Start recording reads on behalf of `owner`.
    pub(crate) fn enter(owner: NodeId) -> Self {
        Self::push(Some(owner))
    }

    fn enter_untracked() -> Self {
        Self::push(None)
    }

    fn push(owner: Option<NodeId>) -> Self {
        TRACKING_STACK.with(|stack| {
            stack.borrow_mut().push(Frame {
                owner,
                reads: Dependencies::new(),
            });
        });
        Self {
            owner,
            popped: false,
        }
    }

    /// Pop the frame and return what it recorded.
    pub(crate) fn finish(mut self) -> Dependencies {
        self.popped = true;
        Self::pop(self.owner)
            .map(|frame| frame.reads)
            .unwrap_or_default()
    }

    fn pop(owner: Option<NodeId>) -> Option<Frame> {
        TRACKING_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();
            if let Some(frame) = &popped {
                debug_assert_eq!(
                    frame.owner, owner,
                    "tracking frame mismatch: expected {:?}, got {:?}",
                    owner, frame.owner
                );
            }
            popped
        })
    }

    /// Check whether reads are currently being recorded.
    pub(crate) fn is_active() -> bool {
        TRACKING_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .is_some_and(|frame| frame.owner.is_some())
        })
    }

    /// The node whose evaluation is currently recording reads, if any.
    #[cfg(test)]
    pub(crate) fn current() -> Option<NodeId> {
        TRACKING_STACK.with(|stack| stack.borrow().last().and_then(|frame| frame.owner))
    }

    /// Record a read of `source` in the top frame.
    pub(crate) fn record(source: Rc<dyn Producer>) {
        let dependency = Dependency::new(source);
        TRACKING_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            let Some(frame) = stack.last_mut() else {
                return;
            };
            if frame.owner.is_none() {
                return;
            }
            // A node that reads one producer twice keeps the first version.
            if frame.reads.iter().all(|read| read.id() != dependency.id()) {
                frame.reads.push(dependency);
            }
        });
    }
}

impl Drop for Tracking {
    fn drop(&mut self) {
        if !self.popped {
            Self::pop(self.owner);
        }
    }
}

/// Run `f` without recording any reads into the enclosing computation.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _scope = Tracking::enter_untracked();
    f()
}

/// Whether a read made now would be recorded as a dependency.
pub fn is_tracking() -> bool {
    Tracking::is_active()
}
