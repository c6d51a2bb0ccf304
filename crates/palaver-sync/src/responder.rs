//! Optional auto-responder collaborator.
//!
//! The synchronizer consults the responder after every successful local
//! merge; a returned reply is delivered after its delay through the normal
//! remote-merge path.  This keeps the demo "canned reply" behavior out of
//! the merge routine itself.

use std::time::Duration;

use palaver_shared::{Message, MessageBody};

/// A reply the responder wants delivered.
pub struct AutoReply {
    pub body: MessageBody,
    pub delay: Duration,
}

/// Reacts to locally authored messages.
pub trait AutoResponder: Send {
    /// Called after a successful local merge.  `None` means no reply.
    fn respond(&mut self, to: &Message) -> Option<AutoReply>;
}

/// The demo responder: one canned text reply per message kind.
pub struct CannedResponder {
    delay: Duration,
}

impl CannedResponder {
    pub fn new() -> Self {
        Self {
            delay: Duration::from_secs(2),
        }
    }

    /// Override the reply delay (tests use a short one).
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for CannedResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl AutoResponder for CannedResponder {
    fn respond(&mut self, to: &Message) -> Option<AutoReply> {
        let text = match &to.body {
            MessageBody::Text { .. } => "Thanks for your message!".to_string(),
            MessageBody::Image { .. } => "Nice image!".to_string(),
            MessageBody::Video { .. } => "Great video!".to_string(),
            MessageBody::Gif { .. } => "Haha, nice GIF!".to_string(),
            MessageBody::File { file_name, .. } => {
                format!("I've received your file: {file_name}")
            }
            MessageBody::Catalog { .. } => {
                "Great! I've received your catalog selection.".to_string()
            }
        };
        Some(AutoReply {
            body: MessageBody::Text { text },
            delay: self.delay,
        })
    }
}
