use thiserror::Error;

/// Errors produced by the channel layer.
///
/// All of these are non-fatal to the core: an incomplete config or a
/// transport setup failure means "no realtime capability", and callers
/// continue in store-only mode.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// A required config field is missing or empty.
    #[error("Channel configuration is incomplete")]
    IncompleteConfig,

    /// An operation needs an active topic but nothing is subscribed.
    #[error("Channel not ready: no subscribed topic")]
    NotReady,

    /// The underlying transport failed during setup or delivery.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The connection has been torn down.
    #[error("Connection closed")]
    Closed,
}
