//! The unit-of-work domain event broker.

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, debug_span};
use unitwork_core::error::DomainError;
use unitwork_core::event::DomainEvent;
use unitwork_core::resolver::EventHandlerResolver;
use unitwork_core::unit_of_work::UnitOfWork;

use crate::dispatch::Dispatch;

/// Publishes domain events to the handlers registered for them, all of which
/// share the broker's unit of work.
///
/// The broker is bound to one unit of work for its whole lifetime and hands
/// that same instance to every handler it runs. It never begins, commits or
/// rolls back the unit of work; when a publish fails, the caller decides what
/// to do with it.
///
/// Handlers run strictly one at a time: synchronous handlers first, then
/// asynchronous handlers, each group in the order the resolver returns.
/// The first failure stops the publish and is returned unchanged.
pub struct UnitOfWorkEventBroker<U, R> {
    resolver: R,
    unit_of_work: Arc<U>,
}

impl<U, R> std::fmt::Debug for UnitOfWorkEventBroker<U, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWorkEventBroker")
            .field("unit_of_work", &std::any::type_name::<U>())
            .field("resolver", &std::any::type_name::<R>())
            .finish()
    }
}

impl<U, R> UnitOfWorkEventBroker<U, R>
where
    U: UnitOfWork,
    R: EventHandlerResolver,
{
    /// Creates a broker bound to `unit_of_work`, resolving handlers through
    /// `resolver`.
    #[must_use]
    pub fn new(resolver: R, unit_of_work: Arc<U>) -> Self {
        Self {
            resolver,
            unit_of_work,
        }
    }

    /// Starts a [`BrokerBuilder`].
    #[must_use]
    pub fn builder() -> BrokerBuilder<U, R> {
        BrokerBuilder::default()
    }

    /// The unit of work every handler of this broker receives.
    #[must_use]
    pub fn unit_of_work(&self) -> &Arc<U> {
        &self.unit_of_work
    }

    /// Publishes `event`, blocking the calling thread until every handler has
    /// run or one has failed.
    ///
    /// Synchronous handlers run directly on the calling thread. Asynchronous
    /// handlers are driven to completion one after another on the calling
    /// thread too: outside a Tokio runtime a private current-thread runtime
    /// is started for the call, and inside a multi-thread runtime the worker
    /// is handed over with `block_in_place`.
    ///
    /// # Errors
    ///
    /// Returns the first handler or resolver error unchanged. Returns
    /// `DomainError::Configuration` if asynchronous handlers are registered
    /// and the call is made from a current-thread runtime, where blocking
    /// would deadlock; in that case no asynchronous handler has started.
    pub fn publish<E: DomainEvent>(&self, event: &E) -> Result<(), DomainError> {
        let span = debug_span!("publish", event_type = event.event_type(), form = "blocking");
        let _entered = span.enter();

        let mut dispatch = Dispatch::new(event, &*self.unit_of_work, None);
        dispatch.run_sync_phase(&self.resolver)?;
        let queue = dispatch.resolve_async_phase(&self.resolver)?;
        if queue.is_empty() {
            dispatch.skip_async_phase();
            return Ok(());
        }

        let bridge = match BlockingBridge::for_current_thread() {
            Ok(bridge) => bridge,
            Err(err) => return Err(dispatch.fail(err)),
        };
        bridge.block_on(dispatch.run_async_phase(queue))
    }

    /// Publishes `event`, awaiting each asynchronous handler in turn.
    ///
    /// Synchronous handlers still run inline. Dropping the returned future
    /// stops dispatch at the handler currently being awaited; handlers that
    /// already finished are not undone.
    ///
    /// # Errors
    ///
    /// Returns the first handler or resolver error unchanged.
    pub async fn publish_async<E: DomainEvent>(&self, event: &E) -> Result<(), DomainError> {
        let span = debug_span!("publish", event_type = event.event_type(), form = "cooperative");
        self.dispatch_cooperatively(event, None)
            .instrument(span)
            .await
    }

    /// Like [`publish_async`](Self::publish_async), but checks `token` before
    /// starting each handler and stops once it is cancelled.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Cancelled` with the number of handlers that
    /// completed if `token` is cancelled before dispatch finishes, otherwise
    /// the first handler or resolver error unchanged.
    pub async fn publish_async_with_cancellation<E: DomainEvent>(
        &self,
        event: &E,
        token: &CancellationToken,
    ) -> Result<(), DomainError> {
        let span = debug_span!("publish", event_type = event.event_type(), form = "cooperative");
        self.dispatch_cooperatively(event, Some(token))
            .instrument(span)
            .await
    }

    /// Publishes each event in turn with [`publish`](Self::publish).
    ///
    /// # Errors
    ///
    /// Stops at the first failing event and returns its error; later events
    /// are not published.
    pub fn publish_all<'e, E, I>(&self, events: I) -> Result<(), DomainError>
    where
        E: DomainEvent,
        I: IntoIterator<Item = &'e E>,
    {
        for event in events {
            self.publish(event)?;
        }
        Ok(())
    }

    /// Publishes each event in turn with
    /// [`publish_async`](Self::publish_async).
    ///
    /// # Errors
    ///
    /// Stops at the first failing event and returns its error; later events
    /// are not published.
    pub async fn publish_all_async<'e, E, I>(&self, events: I) -> Result<(), DomainError>
    where
        E: DomainEvent,
        I: IntoIterator<Item = &'e E>,
    {
        for event in events {
            self.publish_async(event).await?;
        }
        Ok(())
    }

    async fn dispatch_cooperatively<E: DomainEvent>(
        &self,
        event: &E,
        token: Option<&CancellationToken>,
    ) -> Result<(), DomainError> {
        let mut dispatch = Dispatch::new(event, &*self.unit_of_work, token);
        dispatch.run_sync_phase(&self.resolver)?;
        let queue = dispatch.resolve_async_phase(&self.resolver)?;
        dispatch.run_async_phase(queue).await
    }
}

/// How the blocking form drives asynchronous handlers on the caller's thread.
enum BlockingBridge {
    /// No runtime on this thread; one is started for the call.
    Owned(Runtime),
    /// Inside a multi-thread runtime; the worker is handed over while blocked.
    Ambient(Handle),
}

impl BlockingBridge {
    fn for_current_thread() -> Result<Self, DomainError> {
        match Handle::try_current() {
            Ok(handle) => match handle.runtime_flavor() {
                RuntimeFlavor::MultiThread => Ok(Self::Ambient(handle)),
                flavor => Err(DomainError::Configuration(format!(
                    "blocking publish cannot await handlers on a {flavor:?} runtime; use publish_async"
                ))),
            },
            Err(_) => {
                debug!("starting current-thread runtime for blocking publish");
                Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map(Self::Owned)
                    .map_err(|e| {
                        DomainError::Configuration(format!(
                            "failed to start runtime for blocking publish: {e}"
                        ))
                    })
            }
        }
    }

    fn block_on<F: Future>(self, future: F) -> F::Output {
        match self {
            Self::Owned(runtime) => runtime.block_on(future),
            Self::Ambient(handle) => tokio::task::block_in_place(|| handle.block_on(future)),
        }
    }
}

/// Builds a [`UnitOfWorkEventBroker`], refusing to produce one that is
/// missing its resolver or its unit of work.
pub struct BrokerBuilder<U, R> {
    resolver: Option<R>,
    unit_of_work: Option<Arc<U>>,
}

impl<U, R> Default for BrokerBuilder<U, R> {
    fn default() -> Self {
        Self {
            resolver: None,
            unit_of_work: None,
        }
    }
}

impl<U, R> BrokerBuilder<U, R>
where
    U: UnitOfWork,
    R: EventHandlerResolver,
{
    /// Sets the handler resolver.
    #[must_use]
    pub fn resolver(mut self, resolver: R) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Sets the unit of work the broker is bound to.
    #[must_use]
    pub fn unit_of_work(mut self, unit_of_work: Arc<U>) -> Self {
        self.unit_of_work = Some(unit_of_work);
        self
    }

    /// Builds the broker.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if the resolver or the unit of
    /// work was not set.
    pub fn build(self) -> Result<UnitOfWorkEventBroker<U, R>, DomainError> {
        let resolver = self
            .resolver
            .ok_or_else(|| DomainError::Configuration("broker requires a handler resolver".into()))?;
        let unit_of_work = self
            .unit_of_work
            .ok_or_else(|| DomainError::Configuration("broker requires a unit of work".into()))?;
        Ok(UnitOfWorkEventBroker::new(resolver, unit_of_work))
    }
}
