//! Unitwork Core — shared domain abstractions.
//!
//! This crate defines the traits and types that the broker, its resolvers,
//! and application handlers all depend on. It contains no dispatch logic.

pub mod error;
pub mod event;
pub mod handler;
pub mod resolver;
pub mod unit_of_work;
