//! Contains common, primitive types shared across the Blockbar engine.
//!
//! Event sources are identified by slotmap keys so a stale id can never
//! alias a newer registration.

use slotmap::new_key_type;

new_key_type! {
    /// Uniquely identifies a registered event source within the engine.
    ///
    /// Returned by every registration call on the `EventRegistry` and carried
    /// by the `SystemEvent`s the engine broadcasts.
    pub struct SourceId;
}

/// The first real-time signal number on glibc Linux, which reserves 32 and 33
/// for its threading. musl reserves one more and starts at 35.
///
/// A block configured with `update_signal = n` listens on `SIGRTMIN + n`.
pub const SIGRTMIN: i32 = 34;

/// The largest `update_signal` offset that stays within `SIGRTMAX` (64).
pub const MAX_UPDATE_SIGNAL: i32 = 30;
