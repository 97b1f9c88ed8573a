//! Domain event abstractions.

/// Trait that all domain events implement.
///
/// An event is an immutable record of something that happened. It carries no
/// identity beyond its type; handlers only ever see it by shared reference.
pub trait DomainEvent: Send + Sync + std::fmt::Debug + 'static {
    /// Returns the event type name (used for logging and routing).
    fn event_type(&self) -> &'static str;
}
