//! Sequential dispatch of one published event.
//!
//! A [`Dispatch`] walks one event through the handler pipeline:
//!
//! ```text
//! NotStarted -> ResolvingSyncHandlers -> ExecutingSyncHandlers
//!            -> ResolvingAsyncHandlers -> ExecutingAsyncHandlers -> Completed
//! ```
//!
//! Any failure moves it to `Failed`. Each phase drains a queue of resolved
//! handlers one at a time, so at most one handler holds the unit of work at
//! any moment.

use std::collections::VecDeque;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use unitwork_core::error::DomainError;
use unitwork_core::event::DomainEvent;
use unitwork_core::resolver::{EventHandlerResolver, SharedAsyncHandler};
use unitwork_core::unit_of_work::UnitOfWork;

/// Progress of one publish call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DispatchState {
    /// Nothing has happened yet.
    NotStarted,
    /// Looking up synchronous handlers.
    ResolvingSyncHandlers,
    /// Running synchronous handlers.
    ExecutingSyncHandlers,
    /// Looking up asynchronous handlers.
    ResolvingAsyncHandlers,
    /// Running asynchronous handlers.
    ExecutingAsyncHandlers,
    /// Every handler ran successfully.
    Completed,
    /// A resolver or handler failed, or dispatch was cancelled.
    Failed,
}

impl DispatchState {
    /// Returns `true` for `Completed` and `Failed`.
    #[must_use]
    pub(crate) fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Queue of asynchronous handlers waiting to run.
pub(crate) type AsyncQueue<E, U> = VecDeque<SharedAsyncHandler<E, U>>;

/// Dispatch of a single event against a single unit of work.
pub(crate) struct Dispatch<'a, E, U> {
    event: &'a E,
    unit_of_work: &'a U,
    cancellation: Option<&'a CancellationToken>,
    state: DispatchState,
    executed: usize,
}

impl<'a, E, U> Dispatch<'a, E, U>
where
    E: DomainEvent,
    U: UnitOfWork,
{
    pub(crate) fn new(
        event: &'a E,
        unit_of_work: &'a U,
        cancellation: Option<&'a CancellationToken>,
    ) -> Self {
        Self {
            event,
            unit_of_work,
            cancellation,
            state: DispatchState::NotStarted,
            executed: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> DispatchState {
        self.state
    }

    /// Number of handlers that ran to completion so far.
    #[cfg(test)]
    pub(crate) fn executed(&self) -> usize {
        self.executed
    }

    fn transition(&mut self, next: DispatchState) {
        debug_assert!(
            !self.state.is_terminal(),
            "dispatch already ended in {:?}",
            self.state
        );
        trace!(from = ?self.state, to = ?next, "dispatch state transition");
        self.state = next;
    }

    /// Records the failure and hands the error back unchanged.
    pub(crate) fn fail(&mut self, err: DomainError) -> DomainError {
        self.transition(DispatchState::Failed);
        err
    }

    fn ensure_not_cancelled(&mut self) -> Result<(), DomainError> {
        if self.cancellation.is_some_and(CancellationToken::is_cancelled) {
            debug!(executed = self.executed, "dispatch cancelled");
            let err = DomainError::Cancelled {
                event_type: self.event.event_type(),
                executed: self.executed,
            };
            return Err(self.fail(err));
        }
        Ok(())
    }

    /// Resolves and runs every synchronous handler, in resolution order.
    pub(crate) fn run_sync_phase<R: EventHandlerResolver>(
        &mut self,
        resolver: &R,
    ) -> Result<(), DomainError> {
        self.transition(DispatchState::ResolvingSyncHandlers);
        let mut queue: VecDeque<_> = match resolver.resolve_handlers::<E, U>(self.event) {
            Ok(handlers) => handlers.into(),
            Err(err) => {
                warn!(kind = "sync", error = %err, "handler resolution failed");
                return Err(self.fail(err));
            }
        };

        self.transition(DispatchState::ExecutingSyncHandlers);
        debug!(count = queue.len(), "executing sync handlers");
        while let Some(handler) = queue.pop_front() {
            self.ensure_not_cancelled()?;
            let name = handler.handler_name();
            debug!(handler = name, kind = "sync", "executing handler");
            if let Err(err) = handler.execute(self.event, self.unit_of_work) {
                warn!(handler = name, kind = "sync", error = %err, "handler failed");
                return Err(self.fail(err));
            }
            self.executed += 1;
        }
        Ok(())
    }

    /// Resolves the asynchronous handlers.
    pub(crate) fn resolve_async_phase<R: EventHandlerResolver>(
        &mut self,
        resolver: &R,
    ) -> Result<AsyncQueue<E, U>, DomainError> {
        self.transition(DispatchState::ResolvingAsyncHandlers);
        match resolver.resolve_async_handlers::<E, U>(self.event) {
            Ok(handlers) => Ok(handlers.into()),
            Err(err) => {
                warn!(kind = "async", error = %err, "handler resolution failed");
                Err(self.fail(err))
            }
        }
    }

    /// Awaits every asynchronous handler in `queue`, one at a time.
    pub(crate) async fn run_async_phase(
        &mut self,
        mut queue: AsyncQueue<E, U>,
    ) -> Result<(), DomainError> {
        self.transition(DispatchState::ExecutingAsyncHandlers);
        debug!(count = queue.len(), "executing async handlers");
        while let Some(handler) = queue.pop_front() {
            self.ensure_not_cancelled()?;
            let name = handler.handler_name();
            debug!(handler = name, kind = "async", "executing handler");
            if let Err(err) = handler.execute_async(self.event, self.unit_of_work).await {
                warn!(handler = name, kind = "async", error = %err, "handler failed");
                return Err(self.fail(err));
            }
            self.executed += 1;
        }
        self.complete();
        Ok(())
    }

    /// Finishes a dispatch whose async queue is empty without needing an
    /// executor.
    pub(crate) fn skip_async_phase(&mut self) {
        self.transition(DispatchState::ExecutingAsyncHandlers);
        self.complete();
    }

    fn complete(&mut self) {
        self.transition(DispatchState::Completed);
        debug!(executed = self.executed, "dispatch completed");
    }
}
