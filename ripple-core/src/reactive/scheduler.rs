//! Effect Scheduler
//!
//! The scheduler owns one [`Watcher`] over every effect cell. When an
//! effect turns dirty the watcher fires, and the scheduler queues a flush
//! that re-runs all dirty effects together.
//!
//! # Coalescing
//!
//! Only one flush is ever queued. Writes made before it runs just dirty more
//! cells; the watcher stays disarmed until the flush re-arms it, so they do
//! not queue anything new.
//!
//! # Ordering
//!
//! A flush evaluates the effects that were dirty when it started, in the
//! order they were first watched. Effects dirtied while the flush is running
//! are left for the next one.

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use tracing::{error, trace, warn};

use super::memo::Computed;
use crate::config::{FlushStrategy, RuntimeConfig};
use crate::graph::{NodeId, Watcher};

/// What a flush did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Effects evaluated.
    pub evaluated: usize,

    /// Effects whose evaluation panicked.
    pub panicked: usize,
}

pub(crate) struct SchedulerInner {
    watcher: Watcher,
    flush_pending: Cell<bool>,
    flushes: Cell<u64>,
    config: RuntimeConfig,
}

impl SchedulerInner {
    fn request_flush(self: &Rc<Self>) {
        if self.flush_pending.replace(true) {
            return;
        }

        match self.config.flush {
            FlushStrategy::Microtask => {
                if tokio::runtime::Handle::try_current().is_err() {
                    warn!("no tokio runtime on this thread; effect flush left queued");
                    return;
                }
                // spawn_local panics outside a LocalSet
                let weak = Rc::downgrade(self);
                let spawned = panic::catch_unwind(AssertUnwindSafe(|| {
                    tokio::task::spawn_local(async move {
                        if let Some(inner) = weak.upgrade() {
                            inner.flush();
                        }
                    });
                }));
                if spawned.is_err() {
                    warn!("no LocalSet on this thread; effect flush left queued for Runtime::flush");
                    return;
                }
                trace!("effect flush queued");
            }
            FlushStrategy::Manual => trace!("effect flush pending"),
        }
    }

    fn flush(self: &Rc<Self>) -> FlushReport {
        self.flush_pending.set(false);
        let flush = self.flushes.get() + 1;
        self.flushes.set(flush);

        let pending = self.watcher.pending();
        trace!(flush, pending = pending.len(), "flushing effects");

        let mut report = FlushReport::default();
        let mut held = None;
        for node in pending {
            // disposed by an effect that ran earlier in this flush
            if !self.watcher.contains(node.id()) {
                continue;
            }
            report.evaluated += 1;

            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| node.refresh())) {
                report.panicked += 1;
                error!(
                    flush,
                    effect = %node.id(),
                    message = panic_message(payload.as_ref()),
                    "effect panicked"
                );
                if !self.config.isolate_panics {
                    held = Some(payload);
                    break;
                }
            }
        }

        self.watcher.rearm();
        if !self.watcher.pending().is_empty() {
            self.request_flush();
        }

        if let Some(payload) = held {
            panic::resume_unwind(payload);
        }
        report
    }

    pub(crate) fn unwatch_id(&self, id: NodeId) {
        self.watcher.unwatch_id(id);
    }
}

/// Runs effect cells when they go dirty.
///
/// Clones share the same scheduler.
#[derive(Clone)]
pub struct EffectScheduler {
    inner: Rc<SchedulerInner>,
}

impl EffectScheduler {
    pub fn new(config: RuntimeConfig) -> Self {
        let inner = Rc::new_cyclic(|weak: &Weak<SchedulerInner>| {
            let weak = weak.clone();
            SchedulerInner {
                watcher: Watcher::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.request_flush();
                    }
                }),
                flush_pending: Cell::new(false),
                flushes: Cell::new(0),
                config,
            }
        });
        Self { inner }
    }

    /// Re-run `cell` whenever it turns dirty.
    pub fn watch<T: 'static>(&self, cell: &Computed<T>) {
        self.inner.watcher.watch(cell);
    }

    pub fn unwatch<T: 'static>(&self, cell: &Computed<T>) {
        self.inner.watcher.unwatch(cell);
    }

    /// Run the queued flush now.
    ///
    /// Returns an empty report when nothing is dirty.
    ///
    /// # Panics
    ///
    /// With `isolate_panics` off, resumes the first effect panic.
    pub fn flush(&self) -> FlushReport {
        self.inner.flush()
    }

    /// Whether a flush has been queued and has not run yet.
    pub fn is_flush_pending(&self) -> bool {
        self.inner.flush_pending.get()
    }

    /// Number of effect cells being watched.
    pub fn watched_count(&self) -> usize {
        self.inner.watcher.len()
    }

    /// Number of flushes run so far.
    pub fn flush_count(&self) -> u64 {
        self.inner.flushes.get()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub(crate) fn downgrade(&self) -> Weak<SchedulerInner> {
        Rc::downgrade(&self.inner)
    }
}

impl fmt::Debug for EffectScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectScheduler")
            .field("config", &self.inner.config)
            .field("watched", &self.watched_count())
            .field("flush_pending", &self.is_flush_pending())
            .field("flushes", &self.flush_count())
            .finish()
    }
}

pub(crate) fn panic_message<'a>(payload: &'a (dyn Any + Send + 'static)) -> &'a str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic payload>"
    }
}
