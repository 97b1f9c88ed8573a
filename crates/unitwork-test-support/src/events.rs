//! Test events — minimal `DomainEvent` implementations for tests.

use unitwork_core::event::DomainEvent;

/// A test event carrying a sequence number so batches can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestEvent(pub u32);

impl DomainEvent for TestEvent {
    fn event_type(&self) -> &'static str {
        "test.test_event"
    }
}

/// A second event type, used to check that handlers are keyed by event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtherTestEvent;

impl DomainEvent for OtherTestEvent {
    fn event_type(&self) -> &'static str {
        "test.other_test_event"
    }
}
