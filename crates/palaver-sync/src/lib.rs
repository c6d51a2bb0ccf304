//! # palaver-sync
//!
//! The message synchronizer: a single task that owns the authoritative
//! in-memory message list and reconciles its three write sources (the
//! durable store at startup, locally authored sends, inbound realtime
//! events) under one merge rule.  Every merge persists before it becomes
//! visible, so the list on screen never contains a message the store
//! rejected.

pub mod responder;
pub mod synchronizer;

mod error;

pub use error::SyncError;
pub use responder::{AutoReply, AutoResponder, CannedResponder};
pub use synchronizer::{SyncHandle, SyncState, Synchronizer};
