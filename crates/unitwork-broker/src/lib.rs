//! Unitwork — domain event broker for the Unit-of-Work pattern.
//!
//! A [`broker::UnitOfWorkEventBroker`] is bound to one unit of work for its
//! whole lifetime. Publishing an event resolves the handlers registered for
//! the (event type, unit-of-work type) pair and runs them one at a time
//! against that unit of work: synchronous handlers first, then asynchronous
//! handlers, each in the order the resolver returned them.
//!
//! [`registry::HandlerRegistry`] is the in-process resolver.

pub mod broker;
mod dispatch;
pub mod registry;
