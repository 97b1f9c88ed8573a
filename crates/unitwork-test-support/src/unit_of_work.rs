//! Test unit of work — records every handler invocation it takes part in.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use unitwork_core::unit_of_work::UnitOfWork;

/// One handler invocation as seen by a [`RecordingUnitOfWork`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Label of the handler that ran.
    pub handler: String,
    /// `Debug` rendering of the event it received.
    pub event: String,
    /// Address of the unit of work it received.
    pub unit_of_work: usize,
}

/// A unit of work that journals invocations and detects overlapping access.
///
/// Handlers call [`RecordingUnitOfWork::enter`] for the duration of their
/// work. If a second handler enters while the first is still inside, the
/// overlap counter is incremented.
#[derive(Debug, Default)]
pub struct RecordingUnitOfWork {
    journal: Mutex<Vec<Invocation>>,
    busy: AtomicBool,
    overlaps: AtomicUsize,
}

impl UnitOfWork for RecordingUnitOfWork {}

impl RecordingUnitOfWork {
    /// Create an empty recording unit of work.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the unit of work as in use until the guard is dropped.
    pub fn enter(&self) -> ExclusiveGuard<'_> {
        if self.busy.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        ExclusiveGuard { busy: &self.busy }
    }

    /// Append an invocation to the journal.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn record(&self, handler: &str, event: &dyn std::fmt::Debug) {
        self.journal.lock().unwrap().push(Invocation {
            handler: handler.to_owned(),
            event: format!("{event:?}"),
            unit_of_work: self.address(),
        });
    }

    /// Returns a snapshot of all recorded invocations.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.journal.lock().unwrap().clone()
    }

    /// Returns the handler labels in the order they ran.
    pub fn handler_order(&self) -> Vec<String> {
        self.invocations()
            .into_iter()
            .map(|invocation| invocation.handler)
            .collect()
    }

    /// Number of times a handler entered while another was still inside.
    pub fn overlap_count(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    /// Address of this instance, for identity assertions.
    pub fn address(&self) -> usize {
        std::ptr::from_ref(self).addr()
    }
}

/// Releases exclusive access to a [`RecordingUnitOfWork`] on drop.
#[derive(Debug)]
pub struct ExclusiveGuard<'a> {
    busy: &'a AtomicBool,
}

impl Drop for ExclusiveGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}
