//! In-process pub/sub transport.
//!
//! [`MemoryHub`] is a broadcast bus: every opened link sees every publish,
//! and the adapter filters by subscribed channel name.  This mirrors the
//! hosted pub/sub semantics closely enough for tests and the demo CLI.

use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use crate::config::ChannelConfig;
use crate::error::ChannelError;
use crate::transport::{Lifecycle, Transport, TransportEvent, TransportLink};

const HUB_CAPACITY: usize = 256;
const LINK_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
struct HubEvent {
    channel: String,
    event: String,
    payload: serde_json::Value,
}

/// A cloneable in-process broker handle.
#[derive(Clone)]
pub struct MemoryHub {
    tx: broadcast::Sender<HubEvent>,
}

impl MemoryHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(HUB_CAPACITY);
        Self { tx }
    }

    /// Publish a payload to every open link.  A send error only means no
    /// link is currently open.
    pub fn publish(&self, channel: &str, event: &str, payload: serde_json::Value) {
        let hub_event = HubEvent {
            channel: channel.to_string(),
            event: event.to_string(),
            payload,
        };
        if self.tx.send(hub_event).is_err() {
            debug!(channel, event, "publish with no open links");
        }
    }
}

impl Default for MemoryHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Transport backed by a [`MemoryHub`].
pub struct MemoryTransport {
    hub: MemoryHub,
}

impl MemoryTransport {
    pub fn new(hub: MemoryHub) -> Self {
        Self { hub }
    }
}

impl Transport for MemoryTransport {
    fn open(&self, _config: &ChannelConfig) -> Result<TransportLink, ChannelError> {
        // Subscribe synchronously so no publish between open() and the
        // forwarding task starting is lost.
        let mut hub_rx = self.hub.tx.subscribe();
        let (tx, rx) = mpsc::channel(LINK_CAPACITY);

        tokio::spawn(async move {
            if tx
                .send(TransportEvent::Lifecycle(Lifecycle::Connected))
                .await
                .is_err()
            {
                return;
            }
            loop {
                match hub_rx.recv().await {
                    Ok(ev) => {
                        let forwarded = TransportEvent::Message {
                            channel: ev.channel,
                            event: ev.event,
                            payload: ev.payload,
                        };
                        if tx.send(forwarded).await.is_err() {
                            // Link receiver dropped; connection torn down.
                            return;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        let notice =
                            TransportEvent::Lifecycle(Lifecycle::TransportError(format!(
                                "dropped {n} events under backpressure"
                            )));
                        if tx.send(notice).await.is_err() {
                            return;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        let _ = tx
                            .send(TransportEvent::Lifecycle(Lifecycle::Disconnected))
                            .await;
                        return;
                    }
                }
            }
        });

        Ok(TransportLink { events: rx })
    }
}
