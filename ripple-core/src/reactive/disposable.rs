//! Disposables
//!
//! A [`Disposable`] wraps a release action that runs at most once. Clones
//! share the action: disposing any clone disposes all of them, and every
//! call after the first does nothing.
//!
//! Dropping a `Disposable` does not release it. Use [`Disposable::guard`]
//! when the release should be tied to a scope.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

type Release = Box<dyn FnOnce()>;

/// A single-use release handle.
#[must_use = "dropping a Disposable does not release it; call dispose() or guard()"]
#[derive(Clone)]
pub struct Disposable {
    release: Rc<RefCell<Option<Release>>>,
}

impl Disposable {
    /// Wrap `release` so that it runs on the first [`dispose`](Self::dispose).
    pub fn from_fn<F>(release: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            release: Rc::new(RefCell::new(Some(Box::new(release)))),
        }
    }

    /// A handle that is already disposed.
    pub fn noop() -> Self {
        Self {
            release: Rc::new(RefCell::new(None)),
        }
    }

    /// Combine several handles into one that disposes them in order.
    pub fn all<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Disposable>,
    {
        let items: Vec<Disposable> = items.into_iter().collect();
        Self::from_fn(move || {
            for item in &items {
                item.dispose();
            }
        })
    }

    /// Run the release action if it has not run yet.
    pub fn dispose(&self) {
        // Take it out first: the action may drop or dispose this handle.
        let release = self.release.borrow_mut().take();
        if let Some(release) = release {
            release();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.release.borrow().is_none()
    }

    /// Turn this handle into a guard that disposes it when dropped.
    pub fn guard(self) -> DisposeGuard {
        DisposeGuard(Some(self))
    }
}

impl fmt::Debug for Disposable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposable")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Disposes the wrapped [`Disposable`] on drop.
#[must_use = "dropping a DisposeGuard disposes it immediately"]
#[derive(Debug)]
pub struct DisposeGuard(Option<Disposable>);

impl DisposeGuard {
    /// Give the handle back without disposing it.
    pub fn into_inner(mut self) -> Disposable {
        self.0.take().unwrap_or_else(Disposable::noop)
    }
}

impl Drop for DisposeGuard {
    fn drop(&mut self) {
        if let Some(disposable) = self.0.take() {
            disposable.dispose();
        }
    }
}

/// What an effect body may return as its cleanup.
pub trait IntoDisposable {
    fn into_disposable(self) -> Option<Disposable>;
}

impl IntoDisposable for () {
    fn into_disposable(self) -> Option<Disposable> {
        None
    }
}

impl IntoDisposable for Disposable {
    fn into_disposable(self) -> Option<Disposable> {
        Some(self)
    }
}

impl IntoDisposable for Option<Disposable> {
    fn into_disposable(self) -> Option<Disposable> {
        self
    }
}

impl IntoDisposable for DisposeGuard {
    fn into_disposable(self) -> Option<Disposable> {
        Some(self.into_inner())
    }
}
