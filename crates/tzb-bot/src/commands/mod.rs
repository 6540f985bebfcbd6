//! CLI command implementations.
//!
//! Commands write to a caller-supplied writer so tests can capture
//! output without a child process.

pub mod link;
pub mod lookup;
pub mod members;
pub mod message;
pub mod register;
pub mod unregister;
pub mod when;
