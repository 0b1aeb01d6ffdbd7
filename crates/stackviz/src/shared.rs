//! Thread-safe handle around a [`StackTracker`].
//!
//! One simulation thread feeds events while any number of presentation
//! threads take snapshots. Every event is applied under the write lock, so a
//! reader sees either all of an event's effects or none of them.

use std::ops::Range;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::event::Event;
use crate::rows::MemorySource;
use crate::snapshot::Snapshot;
use crate::tracker::{ChangeNotice, StackTracker};
use crate::window::RowIndex;

/// Receives notices from a simulator notification bus.
///
/// Implementations must not panic: a failing subscriber would break event
/// delivery for every other subscriber on the bus.
pub trait Subscriber: Send + Sync {
    fn on_event(&self, event: &Event);
}

#[derive(Clone)]
pub struct SharedTracker {
    inner: Arc<RwLock<StackTracker>>,
    listeners: Arc<Mutex<Vec<Sender<ChangeNotice>>>>,
}

impl SharedTracker {
    #[must_use]
    pub fn new(tracker: StackTracker) -> Self {
        Self {
            inner: Arc::new(RwLock::new(tracker)),
            listeners: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Channel that receives one notice per state-changing event.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<ChangeNotice> {
        let (sender, receiver) = mpsc::channel();
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sender);
        receiver
    }

    pub fn dispatch(&self, event: &Event) -> Option<ChangeNotice> {
        let notice = self.write().process(event)?;
        self.notify(&notice);
        Some(notice)
    }

    pub fn reset(&self) -> ChangeNotice {
        let notice = self.write().reset();
        self.notify(&notice);
        notice
    }

    pub fn refresh(&self, memory: &dyn MemorySource) -> ChangeNotice {
        let notice = self.write().refresh(memory);
        self.notify(&notice);
        notice
    }

    #[must_use]
    pub fn snapshot(&self, range: Range<RowIndex>) -> Snapshot {
        self.read().snapshot(range)
    }

    #[must_use]
    pub fn snapshot_all(&self) -> Snapshot {
        self.read().snapshot_all()
    }

    /// Run `f` with shared access to the tracker.
    pub fn with<R>(&self, f: impl FnOnce(&StackTracker) -> R) -> R {
        f(&self.read())
    }

    fn read(&self) -> RwLockReadGuard<'_, StackTracker> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StackTracker> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, notice: &ChangeNotice) {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        // hung-up receivers are dropped
        listeners.retain(|listener| listener.send(notice.clone()).is_ok());
    }
}

impl Subscriber for SharedTracker {
    fn on_event(&self, event: &Event) {
        self.dispatch(event);
    }
}
