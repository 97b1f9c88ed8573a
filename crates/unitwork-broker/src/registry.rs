//! In-process handler registry.
//!
//! Handlers are stored per (event type, unit-of-work type) pair, keyed by
//! `TypeId`, in two tables: one for synchronous handlers and one for
//! asynchronous handlers. Each table entry is a type-erased
//! `Vec<SharedHandler<E, U>>` that is downcast back on lookup.
//!
//! Lookups return handlers in registration order.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use unitwork_core::error::DomainError;
use unitwork_core::event::DomainEvent;
use unitwork_core::handler::{AsyncUnitOfWorkEventHandler, UnitOfWorkEventHandler};
use unitwork_core::resolver::{EventHandlerResolver, SharedAsyncHandler, SharedHandler};
use unitwork_core::unit_of_work::UnitOfWork;

type HandlerKey = (TypeId, TypeId);

type HandlerTable = RwLock<HashMap<HandlerKey, Box<dyn Any + Send + Sync>>>;

fn key_of<E: DomainEvent, U: UnitOfWork>() -> HandlerKey {
    (TypeId::of::<E>(), TypeId::of::<U>())
}

fn poisoned(table: &str) -> DomainError {
    DomainError::Resolution(format!("{table} handler table lock poisoned"))
}

fn type_mismatch(table: &str) -> DomainError {
    DomainError::Resolution(format!("{table} handler table holds an entry of the wrong type"))
}

/// Registry of handlers, usable as an [`EventHandlerResolver`].
///
/// Registration may happen at any time, including while brokers are
/// resolving from the same registry; each resolve sees the registrations
/// present at that moment.
#[derive(Default)]
pub struct HandlerRegistry {
    sync_handlers: HandlerTable,
    async_handlers: HandlerTable,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sync_pairs = self.sync_handlers.read().map_or(0, |table| table.len());
        let async_pairs = self.async_handlers.read().map_or(0, |table| table.len());
        f.debug_struct("HandlerRegistry")
            .field("sync_pairs", &sync_pairs)
            .field("async_pairs", &async_pairs)
            .finish()
    }
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a synchronous handler for events `E` in unit of work `U`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Resolution` if the registry lock is poisoned.
    pub fn register<E, U>(
        &self,
        handler: impl UnitOfWorkEventHandler<E, U> + 'static,
    ) -> Result<(), DomainError>
    where
        E: DomainEvent,
        U: UnitOfWork,
    {
        self.register_shared(Arc::new(handler))
    }

    /// Registers an already shared synchronous handler.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Resolution` if the registry lock is poisoned.
    pub fn register_shared<E, U>(&self, handler: SharedHandler<E, U>) -> Result<(), DomainError>
    where
        E: DomainEvent,
        U: UnitOfWork,
    {
        push(&self.sync_handlers, "sync", key_of::<E, U>(), handler)
    }

    /// Registers an asynchronous handler for events `E` in unit of work `U`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Resolution` if the registry lock is poisoned.
    pub fn register_async<E, U>(
        &self,
        handler: impl AsyncUnitOfWorkEventHandler<E, U> + 'static,
    ) -> Result<(), DomainError>
    where
        E: DomainEvent,
        U: UnitOfWork,
    {
        self.register_shared_async(Arc::new(handler))
    }

    /// Registers an already shared asynchronous handler.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Resolution` if the registry lock is poisoned.
    pub fn register_shared_async<E, U>(
        &self,
        handler: SharedAsyncHandler<E, U>,
    ) -> Result<(), DomainError>
    where
        E: DomainEvent,
        U: UnitOfWork,
    {
        push(&self.async_handlers, "async", key_of::<E, U>(), handler)
    }

    /// Removes every handler, of both kinds, registered for `(E, U)`.
    /// Returns how many handlers were removed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Resolution` if the registry lock is poisoned.
    pub fn unregister_all<E, U>(&self) -> Result<usize, DomainError>
    where
        E: DomainEvent,
        U: UnitOfWork,
    {
        let (sync_count, async_count) = self.handler_count::<E, U>()?;
        let key = key_of::<E, U>();
        self.sync_handlers
            .write()
            .map_err(|_| poisoned("sync"))?
            .remove(&key);
        self.async_handlers
            .write()
            .map_err(|_| poisoned("async"))?
            .remove(&key);
        Ok(sync_count + async_count)
    }

    /// Returns `(sync, async)` handler counts for `(E, U)`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Resolution` if the registry lock is poisoned.
    pub fn handler_count<E, U>(&self) -> Result<(usize, usize), DomainError>
    where
        E: DomainEvent,
        U: UnitOfWork,
    {
        let key = key_of::<E, U>();
        let sync_count = snapshot::<SharedHandler<E, U>>(&self.sync_handlers, "sync", key)?.len();
        let async_count =
            snapshot::<SharedAsyncHandler<E, U>>(&self.async_handlers, "async", key)?.len();
        Ok((sync_count, async_count))
    }
}

fn push<H>(
    table: &HandlerTable,
    name: &str,
    key: HandlerKey,
    handler: H,
) -> Result<(), DomainError>
where
    H: Send + Sync + 'static,
{
    let mut guard = table.write().map_err(|_| poisoned(name))?;
    let entry = guard
        .entry(key)
        .or_insert_with(|| Box::new(Vec::<H>::new()) as Box<dyn Any + Send + Sync>);
    entry
        .downcast_mut::<Vec<H>>()
        .ok_or_else(|| type_mismatch(name))?
        .push(handler);
    Ok(())
}

fn snapshot<H>(table: &HandlerTable, name: &str, key: HandlerKey) -> Result<Vec<H>, DomainError>
where
    H: Clone + 'static,
{
    let guard = table.read().map_err(|_| poisoned(name))?;
    match guard.get(&key) {
        Some(entry) => entry
            .downcast_ref::<Vec<H>>()
            .cloned()
            .ok_or_else(|| type_mismatch(name)),
        None => Ok(Vec::new()),
    }
}

impl EventHandlerResolver for HandlerRegistry {
    fn resolve_handlers<E, U>(&self, _event: &E) -> Result<Vec<SharedHandler<E, U>>, DomainError>
    where
        E: DomainEvent,
        U: UnitOfWork,
    {
        snapshot(&self.sync_handlers, "sync", key_of::<E, U>())
    }

    fn resolve_async_handlers<E, U>(
        &self,
        _event: &E,
    ) -> Result<Vec<SharedAsyncHandler<E, U>>, DomainError>
    where
        E: DomainEvent,
        U: UnitOfWork,
    {
        snapshot(&self.async_handlers, "async", key_of::<E, U>())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use unitwork_core::resolver::EventHandlerResolver;
    use unitwork_test_support::{
        OtherTestEvent, RecordingAsyncHandler, RecordingHandler, RecordingUnitOfWork, TestEvent,
    };

    use super::HandlerRegistry;

    #[derive(Debug, Default)]
    struct OtherUnitOfWork;

    impl unitwork_core::unit_of_work::UnitOfWork for OtherUnitOfWork {}

    #[test]
    fn test_resolve_returns_empty_set_when_nothing_registered() {
        // Arrange
        let registry = HandlerRegistry::new();

        // Act
        let sync_handlers = registry
            .resolve_handlers::<TestEvent, RecordingUnitOfWork>(&TestEvent(1))
            .unwrap();
        let async_handlers = registry
            .resolve_async_handlers::<TestEvent, RecordingUnitOfWork>(&TestEvent(1))
            .unwrap();

        // Assert
        assert!(sync_handlers.is_empty());
        assert!(async_handlers.is_empty());
    }

    #[test]
    fn test_resolve_returns_handlers_in_registration_order() {
        // Arrange
        let registry = HandlerRegistry::new();
        let uow = RecordingUnitOfWork::new();
        for label in ["first", "second", "third"] {
            registry
                .register::<TestEvent, RecordingUnitOfWork>(RecordingHandler::new(label))
                .unwrap();
        }

        // Act
        let handlers = registry
            .resolve_handlers::<TestEvent, RecordingUnitOfWork>(&TestEvent(1))
            .unwrap();
        for handler in &handlers {
            handler.execute(&TestEvent(1), &uow).unwrap();
        }

        // Assert
        assert_eq!(uow.handler_order(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_handlers_are_keyed_by_event_and_unit_of_work_type() {
        // Arrange
        let registry = HandlerRegistry::new();
        registry
            .register::<TestEvent, RecordingUnitOfWork>(RecordingHandler::new("test-event"))
            .unwrap();
        registry
            .register_async::<OtherTestEvent, RecordingUnitOfWork>(RecordingAsyncHandler::new(
                "other-event",
            ))
            .unwrap();

        // Act
        let for_test_event = registry.handler_count::<TestEvent, RecordingUnitOfWork>().unwrap();
        let for_other_event = registry
            .handler_count::<OtherTestEvent, RecordingUnitOfWork>()
            .unwrap();
        let for_other_uow = registry
            .resolve_handlers::<TestEvent, OtherUnitOfWork>(&TestEvent(1))
            .unwrap();

        // Assert
        assert_eq!(for_test_event, (1, 0));
        assert_eq!(for_other_event, (0, 1));
        assert!(for_other_uow.is_empty());
    }

    #[test]
    fn test_unregister_all_removes_both_kinds_for_the_pair_only() {
        // Arrange
        let registry = HandlerRegistry::new();
        registry
            .register::<TestEvent, RecordingUnitOfWork>(RecordingHandler::new("a"))
            .unwrap();
        registry
            .register_async::<TestEvent, RecordingUnitOfWork>(RecordingAsyncHandler::new("b"))
            .unwrap();
        registry
            .register::<OtherTestEvent, RecordingUnitOfWork>(RecordingHandler::new("c"))
            .unwrap();

        // Act
        let removed = registry
            .unregister_all::<TestEvent, RecordingUnitOfWork>()
            .unwrap();

        // Assert
        assert_eq!(removed, 2);
        assert_eq!(
            registry.handler_count::<TestEvent, RecordingUnitOfWork>().unwrap(),
            (0, 0)
        );
        assert_eq!(
            registry
                .handler_count::<OtherTestEvent, RecordingUnitOfWork>()
                .unwrap(),
            (1, 0)
        );
    }

    #[test]
    fn test_registration_after_resolve_is_visible_to_next_resolve() {
        // Arrange
        let registry = Arc::new(HandlerRegistry::new());
        let before = registry
            .resolve_handlers::<TestEvent, RecordingUnitOfWork>(&TestEvent(1))
            .unwrap();

        // Act
        registry
            .register_shared::<TestEvent, RecordingUnitOfWork>(Arc::new(RecordingHandler::new(
                "late",
            )))
            .unwrap();
        let after = registry
            .resolve_handlers::<TestEvent, RecordingUnitOfWork>(&TestEvent(1))
            .unwrap();

        // Assert
        assert!(before.is_empty());
        assert_eq!(after.len(), 1);
    }
}
