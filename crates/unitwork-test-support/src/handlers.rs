//! Test handlers — recording and failing handler implementations for tests.
//!
//! Every handler here records itself in the [`RecordingUnitOfWork`] it is
//! given, so tests can assert on execution order, unit-of-work identity and
//! exclusive access from the journal alone.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use unitwork_core::error::DomainError;
use unitwork_core::event::DomainEvent;
use unitwork_core::handler::{AsyncUnitOfWorkEventHandler, UnitOfWorkEventHandler};

use crate::unit_of_work::RecordingUnitOfWork;

/// A synchronous handler that records its label and always succeeds.
#[derive(Debug)]
pub struct RecordingHandler {
    label: String,
}

impl RecordingHandler {
    /// Create a handler that records `label`.
    #[must_use]
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_owned(),
        }
    }
}

impl<E: DomainEvent> UnitOfWorkEventHandler<E, RecordingUnitOfWork> for RecordingHandler {
    fn execute(&self, event: &E, unit_of_work: &RecordingUnitOfWork) -> Result<(), DomainError> {
        let _guard = unit_of_work.enter();
        unit_of_work.record(&self.label, event);
        Ok(())
    }
}

/// An asynchronous handler that yields to the scheduler while holding the
/// unit of work, records its label, and succeeds.
#[derive(Debug)]
pub struct RecordingAsyncHandler {
    label: String,
}

impl RecordingAsyncHandler {
    /// Create a handler that records `label`.
    #[must_use]
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_owned(),
        }
    }
}

#[async_trait]
impl<E: DomainEvent> AsyncUnitOfWorkEventHandler<E, RecordingUnitOfWork> for RecordingAsyncHandler {
    async fn execute_async(
        &self,
        event: &E,
        unit_of_work: &RecordingUnitOfWork,
    ) -> Result<(), DomainError> {
        let _guard = unit_of_work.enter();
        tokio::task::yield_now().await;
        unit_of_work.record(&self.label, event);
        tokio::task::yield_now().await;
        Ok(())
    }
}

/// A synchronous handler that records its label and then fails with
/// `DomainError::Validation("<label> rejected the event")`.
#[derive(Debug)]
pub struct FailingHandler {
    label: String,
}

impl FailingHandler {
    /// Create a failing handler labelled `label`.
    #[must_use]
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_owned(),
        }
    }
}

impl<E: DomainEvent> UnitOfWorkEventHandler<E, RecordingUnitOfWork> for FailingHandler {
    fn execute(&self, event: &E, unit_of_work: &RecordingUnitOfWork) -> Result<(), DomainError> {
        let _guard = unit_of_work.enter();
        unit_of_work.record(&self.label, event);
        Err(DomainError::Validation(format!(
            "{} rejected the event",
            self.label
        )))
    }
}

/// An asynchronous handler that records its label and then fails with
/// `DomainError::Infrastructure("<label> lost its connection")`.
#[derive(Debug)]
pub struct FailingAsyncHandler {
    label: String,
}

impl FailingAsyncHandler {
    /// Create a failing handler labelled `label`.
    #[must_use]
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_owned(),
        }
    }
}

#[async_trait]
impl<E: DomainEvent> AsyncUnitOfWorkEventHandler<E, RecordingUnitOfWork> for FailingAsyncHandler {
    async fn execute_async(
        &self,
        event: &E,
        unit_of_work: &RecordingUnitOfWork,
    ) -> Result<(), DomainError> {
        let _guard = unit_of_work.enter();
        tokio::task::yield_now().await;
        unit_of_work.record(&self.label, event);
        Err(DomainError::Infrastructure(format!(
            "{} lost its connection",
            self.label
        )))
    }
}

/// A synchronous handler that records its label, cancels the given token,
/// and succeeds. Used to trigger cancellation between two handlers.
#[derive(Debug)]
pub struct CancellingHandler {
    label: String,
    token: CancellationToken,
}

impl CancellingHandler {
    /// Create a handler labelled `label` that cancels `token` when run.
    #[must_use]
    pub fn new(label: &str, token: CancellationToken) -> Self {
        Self {
            label: label.to_owned(),
            token,
        }
    }
}

impl<E: DomainEvent> UnitOfWorkEventHandler<E, RecordingUnitOfWork> for CancellingHandler {
    fn execute(&self, event: &E, unit_of_work: &RecordingUnitOfWork) -> Result<(), DomainError> {
        let _guard = unit_of_work.enter();
        unit_of_work.record(&self.label, event);
        self.token.cancel();
        Ok(())
    }
}

/// An asynchronous handler that records its label, cancels the given token,
/// and succeeds.
#[derive(Debug)]
pub struct CancellingAsyncHandler {
    label: String,
    token: CancellationToken,
}

impl CancellingAsyncHandler {
    /// Create a handler labelled `label` that cancels `token` when run.
    #[must_use]
    pub fn new(label: &str, token: CancellationToken) -> Self {
        Self {
            label: label.to_owned(),
            token,
        }
    }
}

#[async_trait]
impl<E: DomainEvent> AsyncUnitOfWorkEventHandler<E, RecordingUnitOfWork>
    for CancellingAsyncHandler
{
    async fn execute_async(
        &self,
        event: &E,
        unit_of_work: &RecordingUnitOfWork,
    ) -> Result<(), DomainError> {
        let _guard = unit_of_work.enter();
        tokio::task::yield_now().await;
        unit_of_work.record(&self.label, event);
        self.token.cancel();
        Ok(())
    }
}
