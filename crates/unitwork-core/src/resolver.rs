//! Handler resolution contract.

use std::sync::Arc;

use crate::error::DomainError;
use crate::event::DomainEvent;
use crate::handler::{AsyncUnitOfWorkEventHandler, UnitOfWorkEventHandler};
use crate::unit_of_work::UnitOfWork;

/// A resolved synchronous handler.
pub type SharedHandler<E, U> = Arc<dyn UnitOfWorkEventHandler<E, U>>;

/// A resolved asynchronous handler.
pub type SharedAsyncHandler<E, U> = Arc<dyn AsyncUnitOfWorkEventHandler<E, U>>;

/// Looks up the handlers registered for an (event type, unit-of-work type)
/// pair.
///
/// Returning an empty set is a normal outcome. Implementations may
/// re-resolve on every call, so registrations can change between publishes.
/// The order of the returned handlers is the order in which they will run;
/// each implementation defines what that order is.
pub trait EventHandlerResolver: Send + Sync {
    /// Resolves the synchronous handlers for `event`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Resolution` (or any other variant) when the
    /// underlying registry cannot be read.
    fn resolve_handlers<E, U>(&self, event: &E) -> Result<Vec<SharedHandler<E, U>>, DomainError>
    where
        E: DomainEvent,
        U: UnitOfWork;

    /// Resolves the asynchronous handlers for `event`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Resolution` (or any other variant) when the
    /// underlying registry cannot be read.
    fn resolve_async_handlers<E, U>(
        &self,
        event: &E,
    ) -> Result<Vec<SharedAsyncHandler<E, U>>, DomainError>
    where
        E: DomainEvent,
        U: UnitOfWork;
}

impl<R: EventHandlerResolver> EventHandlerResolver for Arc<R> {
    fn resolve_handlers<E, U>(&self, event: &E) -> Result<Vec<SharedHandler<E, U>>, DomainError>
    where
        E: DomainEvent,
        U: UnitOfWork,
    {
        (**self).resolve_handlers(event)
    }

    fn resolve_async_handlers<E, U>(
        &self,
        event: &E,
    ) -> Result<Vec<SharedAsyncHandler<E, U>>, DomainError>
    where
        E: DomainEvent,
        U: UnitOfWork,
    {
        (**self).resolve_async_handlers(event)
    }
}

impl<R: EventHandlerResolver> EventHandlerResolver for &R {
    fn resolve_handlers<E, U>(&self, event: &E) -> Result<Vec<SharedHandler<E, U>>, DomainError>
    where
        E: DomainEvent,
        U: UnitOfWork,
    {
        (**self).resolve_handlers(event)
    }

    fn resolve_async_handlers<E, U>(
        &self,
        event: &E,
    ) -> Result<Vec<SharedAsyncHandler<E, U>>, DomainError>
    where
        E: DomainEvent,
        U: UnitOfWork,
    {
        (**self).resolve_async_handlers(event)
    }
}
