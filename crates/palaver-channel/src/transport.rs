//! The vendor seam.
//!
//! A [`Transport`] turns a [`ChannelConfig`] into a stream of
//! [`TransportEvent`]s.  The adapter does not care how events reach the
//! process; anything that can push JSON payloads tagged with a channel and
//! event name fits behind this trait.

use tokio::sync::mpsc;

use crate::config::ChannelConfig;
use crate::error::ChannelError;

/// Connection lifecycle notifications.  Observability only: they are
/// logged and never gate delivery of message events.
#[derive(Debug, Clone)]
pub enum Lifecycle {
    Connected,
    Disconnected,
    TransportError(String),
}

/// An event pushed up from the transport.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Lifecycle(Lifecycle),
    /// A published payload on a named channel.
    Message {
        channel: String,
        event: String,
        payload: serde_json::Value,
    },
}

/// The receiving end of an opened transport.
pub struct TransportLink {
    pub events: mpsc::Receiver<TransportEvent>,
}

/// A pub/sub transport capable of opening a link for a given config.
///
/// `open` must resolve immediately: setup failures are returned as errors,
/// never awaited indefinitely.
pub trait Transport: Send + Sync {
    fn open(&self, config: &ChannelConfig) -> Result<TransportLink, ChannelError>;
}
