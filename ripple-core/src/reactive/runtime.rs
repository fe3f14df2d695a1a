//! Reactive Runtime
//!
//! The runtime is the handle that connects cells to effects. It owns an
//! effect scheduler and hands out effects, subscriptions and async computed
//! cells bound to it.
//!
//! # How It Works
//!
//! 1. States and computed cells do not need a runtime. They track their
//!    dependencies on their own.
//!
//! 2. Effects do. Each effect is a derived cell watched by the runtime's
//!    scheduler.
//!
//! 3. When a state's value changes, the engine:
//!    a. Marks direct dependents dirty, and theirs maybe dirty
//!    b. Fires the scheduler's watcher if an effect went dirty
//!    c. The scheduler queues a single flush
//!    d. The flush re-runs the dirty effects; computed cells recompute as
//!       the effects read them
//!
//! # Thread Safety
//!
//! A runtime belongs to the thread that created it. With the default
//! [`FlushStrategy::Microtask`], flushes are spawned on the current
//! `tokio::task::LocalSet`, so writes that dirty an effect must happen inside
//! one.
//!
//! [`FlushStrategy::Microtask`]: crate::config::FlushStrategy::Microtask

use std::fmt;
use std::future::Future;
use std::rc::Rc;

use super::async_computed::{self, AsyncCell};
use super::cancel::CancelToken;
use super::disposable::{Disposable, IntoDisposable};
use super::effect;
use super::readable::Readable;
use super::scheduler::{EffectScheduler, FlushReport};
use crate::config::RuntimeConfig;
use crate::error::AsyncComputedError;
use crate::graph::default_equals;

/// A handle to one effect scheduler.
///
/// Clones share the scheduler. Separate runtimes never see each other's
/// effects.
///
/// # Example
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// use ripple_core::config::RuntimeConfig;
/// use ripple_core::reactive::{Runtime, State};
///
/// let runtime = Runtime::with_config(RuntimeConfig::manual());
/// let count = State::new(0);
/// let seen = Rc::new(RefCell::new(Vec::new()));
///
/// let handle = {
///     let (count, seen) = (count.clone(), seen.clone());
///     runtime.effect(move || seen.borrow_mut().push(count.get()))
/// };
///
/// count.set(1);
/// count.set(2);
/// runtime.flush();
///
/// assert_eq!(*seen.borrow(), vec![0, 2]);
/// handle.dispose();
/// ```
#[derive(Clone)]
pub struct Runtime {
    scheduler: EffectScheduler,
}

impl Runtime {
    /// A runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            scheduler: EffectScheduler::new(config),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        self.scheduler.config()
    }

    pub fn scheduler(&self) -> &EffectScheduler {
        &self.scheduler
    }

    /// Run `run` now and again after every change to what it read.
    ///
    /// `run` may return a [`Disposable`] that is released before the next
    /// run and when the effect is disposed.
    pub fn effect<F, R>(&self, run: F) -> Disposable
    where
        F: FnMut() -> R + 'static,
        R: IntoDisposable,
    {
        effect::effect(&self.scheduler, run)
    }

    /// Call `callback` with the value of `readable` now and after every
    /// change.
    pub fn subscribe<T, S, F>(&self, readable: &S, callback: F) -> Disposable
    where
        T: Clone + 'static,
        S: Readable<T> + Clone + 'static,
        F: FnMut(T) + 'static,
    {
        effect::subscribe(&self.scheduler, readable, callback)
    }

    /// Start an async computed cell whose `Ok` values compare with
    /// `PartialEq`.
    ///
    /// `run` is called immediately. The returned future resolves with the
    /// cell once the first run settles, or with the first run's error.
    pub fn async_computed<T, E, F, Fut>(
        &self,
        run: F,
    ) -> impl Future<Output = Result<AsyncCell<T, E>, AsyncComputedError<E>>>
    where
        T: Clone + PartialEq + 'static,
        E: Clone + 'static,
        F: FnMut(CancelToken) -> Fut + 'static,
        Fut: Future<Output = Result<T, E>> + 'static,
    {
        async_computed::async_computed(&self.scheduler, run, default_equals())
    }

    /// Like [`async_computed`](Self::async_computed), comparing `Ok` values
    /// with `equals`. An `Err` never compares equal to anything.
    pub fn async_computed_with<T, E, F, Fut, Q>(
        &self,
        run: F,
        equals: Q,
    ) -> impl Future<Output = Result<AsyncCell<T, E>, AsyncComputedError<E>>>
    where
        T: Clone + 'static,
        E: Clone + 'static,
        F: FnMut(CancelToken) -> Fut + 'static,
        Fut: Future<Output = Result<T, E>> + 'static,
        Q: Fn(&T, &T) -> bool + 'static,
    {
        async_computed::async_computed(&self.scheduler, run, Rc::new(equals))
    }

    /// Run the queued effect flush now.
    pub fn flush(&self) -> FlushReport {
        self.scheduler.flush()
    }

    pub fn is_flush_pending(&self) -> bool {
        self.scheduler.is_flush_pending()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlushStrategy;
    use crate::reactive::{Computed, State};
    use std::cell::{Cell, RefCell};

    fn manual() -> Runtime {
        Runtime::with_config(RuntimeConfig::manual())
    }

    #[test]
    fn runtimes_are_isolated() {
        let first = manual();
        let second = manual();
        let count = State::new(0);

        let runs = Rc::new(Cell::new(0));
        let _handle = {
            let (count, runs) = (count.clone(), runs.clone());
            first.effect(move || {
                count.get();
                runs.set(runs.get() + 1);
            })
        };

        count.set(1);
        assert!(first.is_flush_pending());
        assert!(!second.is_flush_pending());

        assert_eq!(second.flush().evaluated, 0);
        assert_eq!(first.flush().evaluated, 1);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn clones_share_the_scheduler() {
        let runtime = manual();
        let clone = runtime.clone();
        let _handle = clone.effect(|| {});

        assert_eq!(runtime.scheduler().watched_count(), 1);
        assert_eq!(runtime.config().flush, FlushStrategy::Manual);
    }

    #[test]
    fn effect_sees_consistent_diamond() {
        let runtime = manual();
        let source = State::new(1);
        let left = {
            let source = source.clone();
            Computed::new(move || source.get() + 1)
        };
        let right = {
            let source = source.clone();
            Computed::new(move || source.get() * 10)
        };

        let seen = Rc::new(RefCell::new(Vec::new()));
        let _handle = {
            let seen = seen.clone();
            runtime.effect(move || seen.borrow_mut().push((left.get(), right.get())))
        };

        source.set(2);
        runtime.flush();
        assert_eq!(*seen.borrow(), vec![(2, 10), (3, 20)]);
    }

    #[test]
    fn default_runtime_uses_microtasks() {
        let runtime = Runtime::default();
        assert_eq!(runtime.config(), &RuntimeConfig::default());
        assert!(!runtime.is_flush_pending());
    }
}
