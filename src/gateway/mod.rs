//! Boundary between raw chat traffic and lobby commands

pub mod filter;

pub use filter::{FilterDecision, MessageFilter};
