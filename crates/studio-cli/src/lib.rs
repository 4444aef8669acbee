//! Studio CLI - scripted panel sessions
//!
//! Replays a recorded sequence of panel actions (edits, selector changes,
//! relations, key presses) against the in-memory backend and reports what
//! reached the server.

#![warn(unreachable_pub)]

pub mod replay;
pub mod script;

pub use replay::{replay, ReplayReport};
pub use script::{Script, Step};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
