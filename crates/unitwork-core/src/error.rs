//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
///
/// Handlers, resolvers and the broker share this type so that a handler's
/// failure reaches the publishing caller exactly as it was raised.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),

    /// The handler resolver could not produce a handler set.
    #[error("handler resolution failed: {0}")]
    Resolution(String),

    /// A component was constructed or used in an unsupported configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Dispatch was cancelled before every handler ran.
    #[error("dispatch of {event_type} cancelled after {executed} handler(s)")]
    Cancelled {
        /// The event type whose dispatch was cancelled.
        event_type: &'static str,
        /// Number of handlers that completed before cancellation.
        executed: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_message_names_event_type_and_count() {
        let err = DomainError::Cancelled {
            event_type: "orders.order_placed",
            executed: 2,
        };

        assert_eq!(
            err.to_string(),
            "dispatch of orders.order_placed cancelled after 2 handler(s)"
        );
    }
}
