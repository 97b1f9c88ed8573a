//! Test resolvers — mock `EventHandlerResolver` implementations for tests.

use unitwork_core::error::DomainError;
use unitwork_core::event::DomainEvent;
use unitwork_core::resolver::{EventHandlerResolver, SharedAsyncHandler, SharedHandler};
use unitwork_core::unit_of_work::UnitOfWork;

/// A resolver with no registrations. Every lookup returns an empty set.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyResolver;

impl EventHandlerResolver for EmptyResolver {
    fn resolve_handlers<E, U>(&self, _event: &E) -> Result<Vec<SharedHandler<E, U>>, DomainError>
    where
        E: DomainEvent,
        U: UnitOfWork,
    {
        Ok(Vec::new())
    }

    fn resolve_async_handlers<E, U>(
        &self,
        _event: &E,
    ) -> Result<Vec<SharedAsyncHandler<E, U>>, DomainError>
    where
        E: DomainEvent,
        U: UnitOfWork,
    {
        Ok(Vec::new())
    }
}

/// A resolver whose registry is unreadable. Every lookup returns
/// `DomainError::Resolution("registry unavailable")`. Useful for testing
/// error-handling paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingResolver;

impl EventHandlerResolver for FailingResolver {
    fn resolve_handlers<E, U>(&self, _event: &E) -> Result<Vec<SharedHandler<E, U>>, DomainError>
    where
        E: DomainEvent,
        U: UnitOfWork,
    {
        Err(DomainError::Resolution("registry unavailable".into()))
    }

    fn resolve_async_handlers<E, U>(
        &self,
        _event: &E,
    ) -> Result<Vec<SharedAsyncHandler<E, U>>, DomainError>
    where
        E: DomainEvent,
        U: UnitOfWork,
    {
        Err(DomainError::Resolution("registry unavailable".into()))
    }
}
