//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. When any dependency changes, the effect's cell turns dirty and the
//!    scheduler queues a flush.
//!
//! 3. The flush re-runs the function, which tracks a fresh set of
//!    dependencies during execution.
//!
//! # Differences from Computed
//!
//! - Computed cells return a value; effects do not.
//! - Computed cells are lazy (compute on access); effects are eager (run
//!   when deps change).
//!
//! # Cleanup
//!
//! An effect function may return a [`Disposable`]. It is released before
//! the effect re-runs and when the effect is disposed. This is useful for
//! cleaning up resources like listeners or in-flight work.

use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use tracing::{debug, trace};

use super::disposable::{Disposable, IntoDisposable};
use super::memo::Computed;
use super::readable::Readable;
use super::scheduler::EffectScheduler;
use crate::graph::untracked;

type CleanupSlot = Rc<RefCell<Option<Disposable>>>;

fn release(slot: &CleanupSlot) {
    let cleanup = slot.borrow_mut().take();
    if let Some(cleanup) = cleanup {
        untracked(|| cleanup.dispose());
    }
}

/// Run `run` now and again after every change to what it read.
///
/// The returned handle stops the effect and releases its last cleanup.
///
/// # Panics
///
/// A panic during the first run is resumed here, after the effect has been
/// unregistered.
pub fn effect<F, R>(scheduler: &EffectScheduler, mut run: F) -> Disposable
where
    F: FnMut() -> R + 'static,
    R: IntoDisposable,
{
    let cleanup: CleanupSlot = Rc::default();
    let disposed = Rc::new(Cell::new(false));

    let cell = {
        let (cleanup, disposed) = (cleanup.clone(), disposed.clone());
        Computed::with_equals(
            move || {
                release(&cleanup);
                let next = run().into_disposable();
                if !disposed.get() {
                    *cleanup.borrow_mut() = next;
                } else if let Some(next) = next {
                    // the run disposed its own effect
                    untracked(|| next.dispose());
                }
            },
            |_: &(), _: &()| true,
        )
    };
    let id = cell.id();
    scheduler.watch(&cell);

    let registration = {
        let scheduler = scheduler.downgrade();
        Disposable::from_fn(move || {
            disposed.set(true);
            if let Some(scheduler) = scheduler.upgrade() {
                scheduler.unwatch_id(id);
            }
            release(&cleanup);
            debug!(effect = %id, "effect disposed");
        })
    };

    let first = panic::catch_unwind(AssertUnwindSafe(|| untracked(|| cell.get())));
    if let Err(payload) = first {
        registration.dispose();
        panic::resume_unwind(payload);
    }

    trace!(effect = %id, sources = cell.source_count(), "effect started");
    registration
}

/// Call `callback` with the value of `readable` now and after every change.
pub fn subscribe<T, S, F>(scheduler: &EffectScheduler, readable: &S, mut callback: F) -> Disposable
where
    T: Clone + 'static,
    S: Readable<T> + Clone + 'static,
    F: FnMut(T) + 'static,
{
    let readable = readable.clone();
    effect(scheduler, move || callback(readable.get()))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
