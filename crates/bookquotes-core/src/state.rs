//! Observable state primitives shared by repositories and view models.
//!
//! - `ViewState`: what a screen should show for its current request
//! - `StateHolder`: a single value with last-value replay, backed by `tokio::sync::watch`
//! - `TaskScope`: owns launched tasks and aborts them when the screen goes away

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinSet;

/// Result of a screen's request. Each request moves from `Loading` to exactly
/// one of the other variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState<T> {
    Loading,
    Success(T),
    Empty,
    Error(String),
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        ViewState::Loading
    }
}

impl<T> ViewState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ViewState::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ViewState::Error(message) => Some(message),
            _ => None,
        }
    }

    /// `Success` when present, `Empty` otherwise.
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(data) => ViewState::Success(data),
            None => ViewState::Empty,
        }
    }

    /// Render an error chain the way screens display it.
    pub fn from_error(error: &anyhow::Error) -> Self {
        ViewState::Error(format!("{:#}", error))
    }
}

impl<T> ViewState<Vec<T>> {
    /// `Success` for a non-empty list, `Empty` otherwise.
    pub fn from_list(items: Vec<T>) -> Self {
        if items.is_empty() {
            ViewState::Empty
        } else {
            ViewState::Success(items)
        }
    }
}

/// A single observable value. Subscribers always see the latest value first.
#[derive(Debug)]
pub struct StateHolder<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone> StateHolder<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Snapshot of the current value.
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Read the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.tx.borrow())
    }

    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

impl<T: Clone + PartialEq> StateHolder<T> {
    /// Store `value` and notify subscribers only if it differs from the current one.
    /// Returns whether the value changed.
    pub fn set_if_changed(&self, value: T) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }
}

impl<T: Clone + Default> Default for StateHolder<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Tasks launched on behalf of one screen. Dropping the scope aborts them.
#[derive(Debug, Default)]
pub struct TaskScope {
    tasks: Mutex<JoinSet<()>>,
}

impl TaskScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Launch `future` on the current Tokio runtime, tied to this scope.
    pub fn launch<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        // Reap finished tasks so the set does not grow without bound
        while tasks.try_join_next().is_some() {}
        tasks.spawn(future);
    }

    /// Abort every task still running in this scope.
    pub fn cancel_all(&self) {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .abort_all();
    }

    /// Wait for every launched task to finish.
    pub async fn join_all(&self) {
        let mut tasks = {
            let mut guard = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *guard)
        };
        while tasks.join_next().await.is_some() {}
    }
}
