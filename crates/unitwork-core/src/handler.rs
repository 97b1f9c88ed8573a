//! Event handler abstractions.
//!
//! A handler reacts to one event type while enlisted in one unit-of-work
//! type. Handlers come in two kinds: synchronous handlers run to completion
//! inline, asynchronous handlers return a future the broker awaits.

use async_trait::async_trait;

use crate::error::DomainError;
use crate::event::DomainEvent;
use crate::unit_of_work::UnitOfWork;

/// Synchronous handler for events of type `E` within unit of work `U`.
pub trait UnitOfWorkEventHandler<E, U>: Send + Sync
where
    E: DomainEvent,
    U: UnitOfWork,
{
    /// Handles the event using the shared unit of work.
    ///
    /// # Errors
    ///
    /// Any error is returned to the publishing caller unchanged and stops
    /// the remaining dispatch.
    fn execute(&self, event: &E, unit_of_work: &U) -> Result<(), DomainError>;

    /// Name used in dispatch logs.
    fn handler_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Asynchronous handler for events of type `E` within unit of work `U`.
#[async_trait]
pub trait AsyncUnitOfWorkEventHandler<E, U>: Send + Sync
where
    E: DomainEvent,
    U: UnitOfWork,
{
    /// Handles the event using the shared unit of work.
    ///
    /// # Errors
    ///
    /// Any error is returned to the publishing caller unchanged and stops
    /// the remaining dispatch.
    async fn execute_async(&self, event: &E, unit_of_work: &U) -> Result<(), DomainError>;

    /// Name used in dispatch logs.
    fn handler_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug)]
    struct Ping;

    impl DomainEvent for Ping {
        fn event_type(&self) -> &'static str {
            "test.ping"
        }
    }

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl UnitOfWork for Counter {}

    struct Increment;

    impl UnitOfWorkEventHandler<Ping, Counter> for Increment {
        fn execute(&self, _event: &Ping, unit_of_work: &Counter) -> Result<(), DomainError> {
            unit_of_work.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct IncrementLater;

    #[async_trait]
    impl AsyncUnitOfWorkEventHandler<Ping, Counter> for IncrementLater {
        async fn execute_async(&self, _event: &Ping, unit_of_work: &Counter) -> Result<(), DomainError> {
            tokio::task::yield_now().await;
            unit_of_work.0.fetch_add(10, Ordering::SeqCst);
            Ok(())
        }

        fn handler_name(&self) -> &'static str {
            "increment-later"
        }
    }

    #[test]
    fn test_default_handler_name_is_type_name() {
        let handler: &dyn UnitOfWorkEventHandler<Ping, Counter> = &Increment;

        assert!(handler.handler_name().ends_with("Increment"));
    }

    #[tokio::test]
    async fn test_handlers_mutate_shared_unit_of_work() {
        // Arrange
        let uow = Counter::default();
        let sync_handler: &dyn UnitOfWorkEventHandler<Ping, Counter> = &Increment;
        let async_handler: &dyn AsyncUnitOfWorkEventHandler<Ping, Counter> = &IncrementLater;

        // Act
        sync_handler.execute(&Ping, &uow).unwrap();
        async_handler.execute_async(&Ping, &uow).await.unwrap();

        // Assert
        assert_eq!(uow.0.load(Ordering::SeqCst), 11);
        assert_eq!(async_handler.handler_name(), "increment-later");
    }
}
