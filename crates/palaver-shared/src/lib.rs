//! # palaver-shared
//!
//! The canonical data model for the Palaver chat core: the [`Message`]
//! entity with its tagged per-kind payload, the inbound-event
//! [`RemoteCandidate`] normalizer, and the timestamp helpers shared by
//! every other crate in the workspace.

pub mod constants;
pub mod drafts;
pub mod message;
pub mod time;

pub use message::{Message, MessageBody, MessageId, RemoteCandidate, Sender};
