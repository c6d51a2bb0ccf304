//! Connection lifecycle and event dispatch.
//!
//! [`ActiveConnection`] is an owned resource object: connect, subscribe,
//! bind, and finally disconnect.  There is no process-wide singleton, so
//! independent instances can coexist (and be tested) freely.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use palaver_shared::RemoteCandidate;

use crate::config::ChannelConfig;
use crate::error::ChannelError;
use crate::transport::{Lifecycle, Transport, TransportEvent, TransportLink};

type Handler = Box<dyn Fn(RemoteCandidate) + Send + Sync>;

/// State shared between the connection handle and its dispatch task.
#[derive(Default)]
struct Shared {
    topics: Mutex<HashSet<String>>,
    handlers: Mutex<HashMap<String, Vec<Handler>>>,
}

/// A logical handle to a subscribed topic.  Re-subscribing to the same
/// name yields a handle to the same topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    name: String,
}

impl Topic {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// One live connection to the realtime channel.
pub struct ActiveConnection {
    shared: Arc<Shared>,
    dispatch: JoinHandle<()>,
}

impl ActiveConnection {
    /// Attempt to connect.
    ///
    /// Returns `None` (not an error) when the config is incomplete or the
    /// transport fails during setup; both mean "no realtime capability"
    /// and callers continue in store-only mode.  Must be called from
    /// within a tokio runtime.
    pub fn connect(config: &ChannelConfig, transport: &dyn Transport) -> Option<Self> {
        if !config.is_complete() {
            error!("channel configuration is incomplete, realtime disabled");
            return None;
        }

        let link = match transport.open(config) {
            Ok(link) => link,
            Err(e) => {
                error!(error = %e, "transport setup failed, realtime disabled");
                return None;
            }
        };

        info!(
            channel = %config.channel_name,
            cluster = %config.cluster,
            "realtime channel connecting"
        );

        let shared = Arc::new(Shared::default());
        let dispatch = tokio::spawn(dispatch_loop(link, Arc::clone(&shared)));

        Some(Self { shared, dispatch })
    }

    /// Subscribe to a topic by name.  Idempotent: subscribing twice to the
    /// same name is a no-op and returns the same logical handle.
    pub fn subscribe(&self, name: &str) -> Topic {
        let mut topics = self.shared.topics.lock();
        if topics.insert(name.to_string()) {
            info!(topic = name, "subscribed to topic");
        }
        Topic {
            name: name.to_string(),
        }
    }

    /// Register one additional handler for `event`.  Multiple binds
    /// accumulate.  A no-op (logged) when nothing is subscribed yet.
    pub fn bind<F>(&self, event: &str, handler: F)
    where
        F: Fn(RemoteCandidate) + Send + Sync + 'static,
    {
        if self.shared.topics.lock().is_empty() {
            error!(event, "{}", ChannelError::NotReady);
            return;
        }

        self.shared
            .handlers
            .lock()
            .entry(event.to_string())
            .or_default()
            .push(Box::new(handler));
        debug!(event, "handler bound");
    }

    /// Remove every handler bound to `event`.  No-op if nothing is bound.
    pub fn unbind(&self, event: &str) {
        if self.shared.handlers.lock().remove(event).is_some() {
            debug!(event, "handlers unbound");
        }
    }

    /// Tear the connection down.  Future events are not delivered;
    /// handlers already dispatched may still complete.
    pub fn disconnect(self) {
        info!("realtime channel disconnected");
        // Drop runs the actual teardown.
    }
}

impl Drop for ActiveConnection {
    fn drop(&mut self) {
        self.dispatch.abort();
        self.shared.topics.lock().clear();
        self.shared.handlers.lock().clear();
    }
}

async fn dispatch_loop(mut link: TransportLink, shared: Arc<Shared>) {
    while let Some(event) = link.events.recv().await {
        match event {
            TransportEvent::Lifecycle(Lifecycle::Connected) => {
                info!("transport connected");
            }
            TransportEvent::Lifecycle(Lifecycle::Disconnected) => {
                warn!("transport disconnected");
            }
            TransportEvent::Lifecycle(Lifecycle::TransportError(reason)) => {
                warn!(reason = %reason, "transport error");
            }
            TransportEvent::Message {
                channel,
                event,
                payload,
            } => {
                if !shared.topics.lock().contains(&channel) {
                    debug!(channel = %channel, event = %event, "event on unsubscribed channel, ignored");
                    continue;
                }

                let candidate: RemoteCandidate = match serde_json::from_value(payload) {
                    Ok(candidate) => candidate,
                    Err(e) => {
                        warn!(channel = %channel, event = %event, error = %e, "undecodable payload dropped");
                        continue;
                    }
                };

                let handlers = shared.handlers.lock();
                match handlers.get(&event) {
                    Some(bound) => {
                        debug!(event = %event, handlers = bound.len(), "dispatching event");
                        for handler in bound {
                            handler(candidate.clone());
                        }
                    }
                    None => debug!(event = %event, "no handler bound, event dropped"),
                }
            }
        }
    }
    debug!("transport link closed, dispatch loop ended");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::memory::{MemoryHub, MemoryTransport};
    use palaver_shared::constants::{DEFAULT_CHANNEL_NAME, DEFAULT_EVENT_NAME};

    fn config() -> ChannelConfig {
        ChannelConfig {
            app_key: "key".into(),
            cluster: "local".into(),
            channel_name: DEFAULT_CHANNEL_NAME.into(),
            event_name: DEFAULT_EVENT_NAME.into(),
        }
    }

    fn counting_handler() -> (Arc<AtomicUsize>, impl Fn(RemoteCandidate) + Send + Sync) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        (count, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn incomplete_config_yields_none() {
        let hub = MemoryHub::new();
        let transport = MemoryTransport::new(hub);
        let mut config = config();
        config.app_key.clear();

        assert!(ActiveConnection::connect(&config, &transport).is_none());
    }

    #[tokio::test]
    async fn bound_handler_receives_published_event() {
        let hub = MemoryHub::new();
        let transport = MemoryTransport::new(hub.clone());
        let conn = ActiveConnection::connect(&config(), &transport).unwrap();

        conn.subscribe(DEFAULT_CHANNEL_NAME);
        let (count, handler) = counting_handler();
        conn.bind(DEFAULT_EVENT_NAME, handler);

        hub.publish(
            DEFAULT_CHANNEL_NAME,
            DEFAULT_EVENT_NAME,
            serde_json::json!({"type": "text", "text": "hi"}),
        );
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn bind_without_subscription_is_a_no_op() {
        let hub = MemoryHub::new();
        let transport = MemoryTransport::new(hub.clone());
        let conn = ActiveConnection::connect(&config(), &transport).unwrap();

        let (count, handler) = counting_handler();
        conn.bind(DEFAULT_EVENT_NAME, handler);

        conn.subscribe(DEFAULT_CHANNEL_NAME);
        hub.publish(DEFAULT_CHANNEL_NAME, DEFAULT_EVENT_NAME, serde_json::json!({}));
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn events_on_other_channels_are_ignored() {
        let hub = MemoryHub::new();
        let transport = MemoryTransport::new(hub.clone());
        let conn = ActiveConnection::connect(&config(), &transport).unwrap();

        conn.subscribe(DEFAULT_CHANNEL_NAME);
        let (count, handler) = counting_handler();
        conn.bind(DEFAULT_EVENT_NAME, handler);

        hub.publish("other-channel", DEFAULT_EVENT_NAME, serde_json::json!({}));
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn multiple_binds_accumulate() {
        let hub = MemoryHub::new();
        let transport = MemoryTransport::new(hub.clone());
        let conn = ActiveConnection::connect(&config(), &transport).unwrap();

        conn.subscribe(DEFAULT_CHANNEL_NAME);
        let (first, handler_a) = counting_handler();
        let (second, handler_b) = counting_handler();
        conn.bind(DEFAULT_EVENT_NAME, handler_a);
        conn.bind(DEFAULT_EVENT_NAME, handler_b);

        hub.publish(DEFAULT_CHANNEL_NAME, DEFAULT_EVENT_NAME, serde_json::json!({}));
        settle().await;

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unbind_stops_future_delivery() {
        let hub = MemoryHub::new();
        let transport = MemoryTransport::new(hub.clone());
        let conn = ActiveConnection::connect(&config(), &transport).unwrap();

        conn.subscribe(DEFAULT_CHANNEL_NAME);
        let (count, handler) = counting_handler();
        conn.bind(DEFAULT_EVENT_NAME, handler);

        hub.publish(DEFAULT_CHANNEL_NAME, DEFAULT_EVENT_NAME, serde_json::json!({}));
        settle().await;
        conn.unbind(DEFAULT_EVENT_NAME);
        hub.publish(DEFAULT_CHANNEL_NAME, DEFAULT_EVENT_NAME, serde_json::json!({}));
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disconnect_stops_dispatch() {
        let hub = MemoryHub::new();
        let transport = MemoryTransport::new(hub.clone());
        let conn = ActiveConnection::connect(&config(), &transport).unwrap();

        conn.subscribe(DEFAULT_CHANNEL_NAME);
        let (count, handler) = counting_handler();
        conn.bind(DEFAULT_EVENT_NAME, handler);
        conn.disconnect();

        hub.publish(DEFAULT_CHANNEL_NAME, DEFAULT_EVENT_NAME, serde_json::json!({}));
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn malformed_payload_is_dropped() {
        let hub = MemoryHub::new();
        let transport = MemoryTransport::new(hub.clone());
        let conn = ActiveConnection::connect(&config(), &transport).unwrap();

        conn.subscribe(DEFAULT_CHANNEL_NAME);
        let (count, handler) = counting_handler();
        conn.bind(DEFAULT_EVENT_NAME, handler);

        hub.publish(
            DEFAULT_CHANNEL_NAME,
            DEFAULT_EVENT_NAME,
            serde_json::json!("not an object"),
        );
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
