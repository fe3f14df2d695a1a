//! Derived Nodes
//!
//! A derived node caches the result of a computation over other nodes and
//! re-evaluates lazily.
//!
//! # How Derived Nodes Work
//!
//! 1. A fresh node is `Dirty` and holds no value. The first read runs the
//!    computation under a tracking frame and caches the result.
//!
//! 2. A write to a direct source marks the node `Dirty`; a change further
//!    upstream marks it `MaybeDirty`. Marking is push-only and cheap: nothing
//!    recomputes yet.
//!
//! 3. On the next read, a `MaybeDirty` node refreshes its sources in the
//!    order it first read them and compares their versions with the ones it
//!    recorded. Only if one moved does it recompute. Otherwise it is clean
//!    again without running anything.
//!
//! 4. A recomputation that produces a value equal to the cached one (under
//!    the node's comparator) keeps the version, so dependents checking it in
//!    step 3 stay clean.
//!
//! Steps 3 and 4 are what keep diamonds from double-firing: a node becomes
//! clean the moment it has been brought up to date, so a second path
//! reaching it in the same pass finds nothing to do.
//!
//! # Watchers
//!
//! A derived node can be attached to one or more watchers. When it goes from
//! clean to anything else it tells them, after propagating to its observers.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use super::node::{Consumer, Dependencies, DirtyState, Equals, NodeId, Observers, Producer};
use super::tracking::Tracking;
use super::watcher::WatcherCore;
use crate::error::ReactiveError;

type Compute<T> = Box<dyn FnMut() -> T>;

pub(crate) struct DerivedNode<T> {
    id: NodeId,
    weak_self: Weak<DerivedNode<T>>,
    compute: RefCell<Compute<T>>,
    equals: Equals<T>,
    value: RefCell<Option<T>>,
    state: Cell<DirtyState>,
    version: Cell<u64>,
    evaluating: Cell<bool>,
    sources: RefCell<Dependencies>,
    observers: Observers,
    watchers: RefCell<SmallVec<[(NodeId, Weak<WatcherCore>); 1]>>,
    /// Values kept alive for as long as this node is.
    retained: RefCell<Vec<Rc<dyn Any>>>,
}

impl<T: 'static> DerivedNode<T> {
    pub(crate) fn new(compute: Compute<T>, equals: Equals<T>) -> Rc<Self> {
        Rc::new_cyclic(|weak_self| Self {
            id: NodeId::new(),
            weak_self: weak_self.clone(),
            compute: RefCell::new(compute),
            equals,
            value: RefCell::new(None),
            state: Cell::new(DirtyState::Dirty),
            version: Cell::new(0),
            evaluating: Cell::new(false),
            sources: RefCell::new(Dependencies::new()),
            observers: Observers::default(),
            watchers: RefCell::new(SmallVec::new()),
            retained: RefCell::new(Vec::new()),
        })
    }

    pub(crate) fn node_id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn state(&self) -> DirtyState {
        self.state.get()
    }

    pub(crate) fn has_value(&self) -> bool {
        self.value.borrow().is_some()
    }

    pub(crate) fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn source_count(&self) -> usize {
        self.sources.borrow().len()
    }

    pub(crate) fn retain(&self, value: Rc<dyn Any>) {
        self.retained.borrow_mut().push(value);
    }

    /// Bring the node up to date, record the read, and borrow the value.
    ///
    /// `f` must not write to anything this node depends on.
    pub(crate) fn read<R>(self: &Rc<Self>, f: impl FnOnce(&T) -> R) -> Result<R, ReactiveError> {
        if self.evaluating.get() {
            return Err(ReactiveError::Cycle(self.id));
        }

        self.update();
        Tracking::record(Rc::clone(self) as Rc<dyn Producer>);

        let value = self.value.borrow();
        Ok(f(value
            .as_ref()
            .expect("derived node should hold a value after update")))
    }

    fn update(&self) {
        if self.evaluating.get() {
            return;
        }

        let has_value = self.has_value();
        match self.state.get() {
            DirtyState::Clean if has_value => {}
            DirtyState::MaybeDirty if has_value => {
                // Clone the list so no borrow is held while sources refresh.
                let sources = self.sources.borrow().clone();
                let stale = sources.iter().any(|dependency| {
                    dependency.source.refresh();
                    dependency.is_stale()
                });
                if stale {
                    self.recompute();
                } else if self.state.get() == DirtyState::MaybeDirty {
                    self.state.set(DirtyState::Clean);
                }
            }
            _ => self.recompute(),
        }
    }

    /// Run the computation under a fresh tracking frame.
    ///
    /// The node is set clean before the computation starts so that a write
    /// landing during it marks the node again.
    ///
    /// If the computation panics, the reads made so far are still committed
    /// and the cached value is left alone, then the panic resumes.
    fn recompute(&self) {
        self.evaluating.set(true);
        self.state.set(DirtyState::Clean);

        let tracking = Tracking::enter(self.id);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut compute = self.compute.borrow_mut();
            (&mut **compute)()
        }));
        let reads = tracking.finish();
        self.evaluating.set(false);

        self.commit_sources(reads);

        match outcome {
            Ok(next) => self.store(next),
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    fn commit_sources(&self, reads: Dependencies) {
        let previous = std::mem::replace(&mut *self.sources.borrow_mut(), reads.clone());

        for dropped in previous
            .iter()
            .filter(|old| reads.iter().all(|new| new.id() != old.id()))
        {
            dropped.source.unsubscribe(self.id);
        }

        let handle: Weak<dyn Consumer> = self.weak_self.clone();
        for dependency in &reads {
            dependency.source.subscribe(self.id, handle.clone());
        }

        // A source written after we read it, but before we were subscribed
        // to it, would otherwise go unnoticed.
        if reads.iter().any(|dependency| dependency.is_stale()) {
            self.mark(DirtyState::Dirty);
        }
    }

    fn store(&self, next: T) {
        let changed = match self.value.borrow().as_ref() {
            Some(current) => !(self.equals)(current, &next),
            None => true,
        };
        if changed {
            *self.value.borrow_mut() = Some(next);
            self.version.set(self.version.get() + 1);
        }
    }

    fn notify_watchers(&self) {
        let live: SmallVec<[Rc<WatcherCore>; 1]> = {
            let mut watchers = self.watchers.borrow_mut();
            watchers.retain(|(_, core)| core.strong_count() > 0);
            watchers.iter().filter_map(|(_, core)| core.upgrade()).collect()
        };
        for core in live {
            core.notify();
        }
    }
}

impl<T: 'static> Producer for DerivedNode<T> {
    fn id(&self) -> NodeId {
        self.id
    }

    fn version(&self) -> u64 {
        self.version.get()
    }

    fn refresh(&self) {
        self.update();
    }

    fn subscribe(&self, consumer: NodeId, handle: Weak<dyn Consumer>) {
        self.observers.insert(consumer, handle);
    }

    fn unsubscribe(&self, consumer: NodeId) {
        self.observers.remove(consumer);
    }
}

impl<T: 'static> Consumer for DerivedNode<T> {
    fn mark(&self, level: DirtyState) {
        let previous = self.state.get();
        if level > previous {
            self.state.set(level);
        }

        // Already non-clean nodes have already told everyone downstream.
        if previous == DirtyState::Clean {
            self.observers.mark_all(DirtyState::MaybeDirty);
            self.notify_watchers();
        }
    }
}

/// The view of a derived node a watcher needs.
pub(crate) trait Watched: Producer {
    fn is_dirty(&self) -> bool;

    fn attach(&self, watcher: NodeId, core: Weak<WatcherCore>);

    fn detach(&self, watcher: NodeId);
}

impl<T: 'static> Watched for DerivedNode<T> {
    fn is_dirty(&self) -> bool {
        self.state.get() != DirtyState::Clean
    }

    fn attach(&self, watcher: NodeId, core: Weak<WatcherCore>) {
        let mut watchers = self.watchers.borrow_mut();
        if watchers.iter().all(|(id, _)| *id != watcher) {
            watchers.push((watcher, core));
        }
    }

    fn detach(&self, watcher: NodeId) {
        self.watchers.borrow_mut().retain(|(id, _)| *id != watcher);
    }
}
