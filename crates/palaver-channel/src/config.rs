//! Channel configuration.

use serde::{Deserialize, Serialize};

use palaver_shared::constants::{DEFAULT_CHANNEL_NAME, DEFAULT_EVENT_NAME};

/// Connection parameters for the realtime channel.
///
/// All four fields are required for a connection attempt to proceed; an
/// incomplete config disables realtime delivery rather than erroring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Application key issued by the pub/sub provider.
    pub app_key: String,
    /// Provider cluster / region identifier.
    pub cluster: String,
    /// Name of the channel (topic) carrying chat messages.
    pub channel_name: String,
    /// Event name published for new messages.
    pub event_name: String,
}

impl ChannelConfig {
    /// Whether every required field is present and non-empty.
    pub fn is_complete(&self) -> bool {
        !self.app_key.is_empty()
            && !self.cluster.is_empty()
            && !self.channel_name.is_empty()
            && !self.event_name.is_empty()
    }

    /// Load from `PALAVER_APP_KEY`, `PALAVER_CLUSTER`, `PALAVER_CHANNEL`
    /// and `PALAVER_EVENT`.  Channel and event names fall back to the
    /// application defaults; key and cluster stay empty when unset, which
    /// leaves the config incomplete and realtime disabled.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).unwrap_or_default();
        Self {
            app_key: var("PALAVER_APP_KEY"),
            cluster: var("PALAVER_CLUSTER"),
            channel_name: std::env::var("PALAVER_CHANNEL")
                .unwrap_or_else(|_| DEFAULT_CHANNEL_NAME.to_string()),
            event_name: std::env::var("PALAVER_EVENT")
                .unwrap_or_else(|_| DEFAULT_EVENT_NAME.to_string()),
        }
    }
}
