//! Contains the building blocks the scheduler multiplexes over.
//!
//! `block` holds the per-block unit (display state, timer, update routine)
//! and `source` holds the readiness sources and the waiter that selects
//! across all of them.

pub mod block;
pub mod source;
