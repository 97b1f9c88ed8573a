//! Unit-of-work abstraction.

/// Marker trait for a transactional context shared by every handler of one
/// publish call.
///
/// The broker treats implementors as opaque: it never begins, commits, or
/// rolls back anything. Those operations belong to the owner of the value.
pub trait UnitOfWork: Send + Sync + 'static {}
