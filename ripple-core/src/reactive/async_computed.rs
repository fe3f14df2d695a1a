//! Async Computed Cells
//!
//! An async computed cell holds the latest settled result of an async
//! computation, re-run whenever the cells it reads change.
//!
//! # How It Works
//!
//! 1. A launcher effect calls the run function with a fresh
//!    [`CancelToken`]. Cells read while the function builds its future are
//!    the inputs; reads after the first `.await` are not tracked.
//!
//! 2. The future is spawned on the current `LocalSet`. When it settles, its
//!    outcome is written to the result cell, unless a newer run has started
//!    since, in which case it is dropped.
//!
//! 3. When an input changes, the launcher cancels the run in flight before
//!    starting the next one. The last run started always wins.
//!
//! The future returned by [`async_computed`] resolves once the first run
//! settles. If that run failed there is no cell to hand out and the
//! launcher is torn down.
//!
//! # Lifetime
//!
//! The launcher lives as long as the returned cell (or any clone of it).
//! Dropping the last one stops it and cancels the run in flight.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::{Rc, Weak};

use tokio::sync::oneshot;
use tracing::{debug, trace};

use super::cancel::{AbortHandle, CancelToken};
use super::disposable::{Disposable, DisposeGuard};
use super::effect::effect;
use super::memo::Computed;
use super::scheduler::EffectScheduler;
use super::signal::State;
use crate::error::AsyncComputedError;
use crate::graph::Equals;

/// The cell handed out by an async computed: the latest settled outcome.
pub type AsyncCell<T, E> = Computed<Result<T, E>>;

type FirstSettlement<T, E> = Result<AsyncCell<T, E>, E>;

struct Coordinator<T: 'static, E: 'static> {
    result: RefCell<Option<State<Result<T, E>>>>,
    first: RefCell<Option<oneshot::Sender<FirstSettlement<T, E>>>>,
    launcher: RefCell<Option<DisposeGuard>>,
    equals: Equals<T>,
    runs: Cell<u64>,
}

impl<T, E> Coordinator<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    fn has_settled(&self) -> bool {
        self.result.borrow().is_some()
    }

    fn next_run(&self) -> u64 {
        let run = self.runs.get() + 1;
        self.runs.set(run);
        run
    }

    fn settle(self: &Rc<Self>, run: u64, outcome: Result<T, E>) {
        let state = self.result.borrow().clone();
        if let Some(state) = state {
            trace!(run, ok = outcome.is_ok(), "async run settled");
            state.set(outcome);
            return;
        }

        let first = self.first.borrow_mut().take();
        match outcome {
            Ok(value) => {
                let equals = Rc::clone(&self.equals);
                let state = State::from_equals(
                    Ok(value),
                    Rc::new(move |a: &Result<T, E>, b: &Result<T, E>| match (a, b) {
                        (Ok(a), Ok(b)) => equals(a, b),
                        _ => false,
                    }),
                );
                let cell = state.read_only();
                cell.retain(Rc::clone(self) as Rc<dyn Any>);
                *self.result.borrow_mut() = Some(state);

                trace!(run, "first async run settled");
                if let Some(first) = first {
                    let _ = first.send(Ok(cell));
                }
            }
            Err(error) => {
                debug!(run, "first async run failed; stopping launcher");
                let launcher = self.launcher.borrow_mut().take();
                drop(launcher);
                if let Some(first) = first {
                    let _ = first.send(Err(error));
                }
            }
        }
    }
}

fn launch<T, E, F, Fut>(coordinator: &Rc<Coordinator<T, E>>, run: &mut F) -> Disposable
where
    T: Clone + 'static,
    E: Clone + 'static,
    F: FnMut(CancelToken) -> Fut,
    Fut: Future<Output = Result<T, E>> + 'static,
{
    let id = coordinator.next_run();
    let (handle, token) = AbortHandle::new();
    let future = run(token.clone());

    // Until something settles, the runs in flight are all that keeps the
    // coordinator alive.
    let keep_alive = (!coordinator.has_settled()).then(|| Rc::clone(coordinator));
    let weak = Rc::downgrade(coordinator);

    tokio::task::spawn_local(async move {
        let _keep_alive = keep_alive;
        let outcome = future.await;
        if token.is_cancelled() {
            debug!(run = id, "discarding superseded async run");
            return;
        }
        if let Some(coordinator) = weak.upgrade() {
            coordinator.settle(id, outcome);
        }
    });
    trace!(run = id, "async run started");

    Disposable::from_fn(move || handle.abort())
}

/// Start an async computed cell.
///
/// `run` is called now, and again whenever a cell it read synchronously
/// changes. Each call gets a token that is cancelled when the next call
/// starts or the cell is dropped.
///
/// Must be called inside a `tokio::task::LocalSet`.
pub fn async_computed<T, E, F, Fut>(
    scheduler: &EffectScheduler,
    run: F,
    equals: Equals<T>,
) -> impl Future<Output = Result<AsyncCell<T, E>, AsyncComputedError<E>>>
where
    T: Clone + 'static,
    E: Clone + 'static,
    F: FnMut(CancelToken) -> Fut + 'static,
    Fut: Future<Output = Result<T, E>> + 'static,
{
    let (tx, rx) = oneshot::channel();
    let coordinator = Rc::new(Coordinator {
        result: RefCell::new(None),
        first: RefCell::new(Some(tx)),
        launcher: RefCell::new(None),
        equals,
        runs: Cell::new(0),
    });

    let launcher = {
        let weak: Weak<Coordinator<T, E>> = Rc::downgrade(&coordinator);
        let mut run = run;
        effect(scheduler, move || {
            let coordinator = weak.upgrade()?;
            Some(launch(&coordinator, &mut run))
        })
    };
    *coordinator.launcher.borrow_mut() = Some(launcher.guard());
    drop(coordinator);

    async move {
        match rx.await {
            Ok(Ok(cell)) => Ok(cell),
            Ok(Err(error)) => Err(AsyncComputedError::Failed(error)),
            Err(_) => Err(AsyncComputedError::Abandoned),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::graph::default_equals;
    use std::future::ready;
    use tokio::task::LocalSet;

    async fn drain(scheduler: &EffectScheduler) {
        for _ in 0..8 {
            scheduler.flush();
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn first_settlement_resolves_with_cell() {
        LocalSet::new()
            .run_until(async {
                let scheduler = EffectScheduler::new(RuntimeConfig::manual());
                let input = State::new(1);
                let cell = {
                    let input = input.clone();
                    async_computed(
                        &scheduler,
                        move |_| ready(Ok::<_, String>(input.get() * 10)),
                        default_equals(),
                    )
                }
                .await
                .unwrap();

                assert_eq!(cell.get(), Ok(10));

                input.set(2);
                drain(&scheduler).await;
                assert_eq!(cell.get(), Ok(20));
            })
            .await;
    }

    #[tokio::test]
    async fn first_failure_stops_the_launcher() {
        LocalSet::new()
            .run_until(async {
                let scheduler = EffectScheduler::new(RuntimeConfig::manual());
                let err = async_computed(
                    &scheduler,
                    |_| ready(Err::<i32, _>("nope".to_string())),
                    default_equals(),
                )
                .await
                .unwrap_err();

                assert_eq!(err, AsyncComputedError::Failed("nope".to_string()));
                assert_eq!(scheduler.watched_count(), 0);
            })
            .await;
    }

    #[tokio::test]
    async fn dropping_the_cell_stops_the_launcher() {
        LocalSet::new()
            .run_until(async {
                let scheduler = EffectScheduler::new(RuntimeConfig::manual());
                let cell = async_computed(
                    &scheduler,
                    |_| ready(Ok::<_, ()>(1)),
                    default_equals(),
                )
                .await
                .unwrap();
                assert_eq!(scheduler.watched_count(), 1);

                drop(cell);
                assert_eq!(scheduler.watched_count(), 0);
            })
            .await;
    }
}
