#![forbid(unsafe_code)]

//! Single-writer shared cells.
//!
//! # Design
//!
//! A cell is split into a [`CellWriter`] owned by exactly one execution
//! context (the animation context for offsets, scroll state, and the snap
//! profile) and any number of [`CellReader`]s handed to other contexts.
//! Reads are wait-free through `arc-swap`; the writer publishes a new `Arc`
//! per change.
//!
//! Readers that need to react rather than poll call
//! [`CellReader::watch`] and receive every changed value over an `mpsc`
//! channel. Watchers whose receiver was dropped are pruned on the next
//! publish.
//!
//! # Invariants
//!
//! 1. Only the writer mutates; `CellWriter` is not `Clone`.
//! 2. `version` increments by exactly 1 on each value-changing `set`.
//! 3. `set(v)` where `v == current` is a no-op: no version bump, no watch
//!    message.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;

struct Shared<T> {
    value: ArcSwap<T>,
    version: AtomicU64,
    watchers: Mutex<Vec<mpsc::Sender<T>>>,
}

/// Create a cell holding `initial`.
#[must_use]
pub fn shared_cell<T>(initial: T) -> (CellWriter<T>, CellReader<T>)
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    let shared = Arc::new(Shared {
        value: ArcSwap::from_pointee(initial),
        version: AtomicU64::new(0),
        watchers: Mutex::new(Vec::new()),
    });
    (
        CellWriter {
            shared: Arc::clone(&shared),
        },
        CellReader { shared },
    )
}

/// The only handle that can change the value.
pub struct CellWriter<T> {
    shared: Arc<Shared<T>>,
}

impl<T: std::fmt::Debug> std::fmt::Debug for CellWriter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellWriter")
            .field("value", &**self.shared.value.load())
            .field("version", &self.shared.version.load(Ordering::Acquire))
            .finish()
    }
}

impl<T> CellWriter<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Current value.
    #[must_use]
    pub fn get(&self) -> T {
        T::clone(&self.shared.value.load())
    }

    /// Publish `value`. Returns `true` if it differed from the current value.
    pub fn set(&self, value: T) -> bool {
        if **self.shared.value.load() == value {
            return false;
        }
        self.shared.value.store(Arc::new(value.clone()));
        self.shared.version.fetch_add(1, Ordering::AcqRel);

        let mut watchers = self
            .shared
            .watchers
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        watchers.retain(|tx| tx.send(value.clone()).is_ok());
        true
    }

    /// Another reader for this cell.
    #[must_use]
    pub fn reader(&self) -> CellReader<T> {
        CellReader {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Read-only handle. Cheap to clone and safe to move across threads.
pub struct CellReader<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for CellReader<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for CellReader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellReader")
            .field("value", &**self.shared.value.load())
            .finish()
    }
}

impl<T> CellReader<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Current value.
    #[must_use]
    pub fn get(&self) -> T {
        T::clone(&self.shared.value.load())
    }

    /// Number of value-changing writes so far. Useful for dirty-checking.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.shared.version.load(Ordering::Acquire)
    }

    /// Receive every future change.
    #[must_use]
    pub fn watch(&self) -> mpsc::Receiver<T> {
        let (tx, rx) = mpsc::channel();
        self.shared
            .watchers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(tx);
        rx
    }

    /// Registered watchers, including ones not yet pruned.
    #[must_use]
    pub fn watcher_count(&self) -> usize {
        self.shared
            .watchers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}
