//! Shared test mocks and utilities for unit-of-work event dispatch.

mod events;
mod handlers;
mod resolver;
mod unit_of_work;

pub use events::{OtherTestEvent, TestEvent};
pub use handlers::{
    CancellingAsyncHandler, CancellingHandler, FailingAsyncHandler, FailingHandler,
    RecordingAsyncHandler, RecordingHandler,
};
pub use resolver::{EmptyResolver, FailingResolver};
pub use unit_of_work::{ExclusiveGuard, Invocation, RecordingUnitOfWork};
