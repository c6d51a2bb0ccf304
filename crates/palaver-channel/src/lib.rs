//! # palaver-channel
//!
//! Realtime channel adapter for the Palaver chat core.
//!
//! The adapter subscribes to a named channel on a pub/sub transport and
//! delivers inbound events as [`RemoteCandidate`]s to bound handlers.  The
//! vendor wire protocol sits behind the [`Transport`] trait; the crate
//! ships an in-process [`MemoryHub`] transport used by tests and the demo
//! CLI.  Connection lifecycle events are observability-only and never gate
//! event delivery.
//!
//! [`RemoteCandidate`]: palaver_shared::RemoteCandidate

pub mod config;
pub mod connection;
pub mod memory;
pub mod transport;

mod error;

pub use config::ChannelConfig;
pub use connection::{ActiveConnection, Topic};
pub use error::ChannelError;
pub use memory::{MemoryHub, MemoryTransport};
pub use transport::{Lifecycle, Transport, TransportEvent, TransportLink};
