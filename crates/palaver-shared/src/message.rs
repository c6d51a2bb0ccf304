//! The message data model.
//!
//! [`Message`] is the unit of conversation content.  Its payload is a
//! tagged [`MessageBody`] variant, one per kind, so "which fields are
//! valid for this kind" is a compile-time property rather than a bag of
//! nullable columns.  Every struct derives `Serialize`/`Deserialize` so
//! it can be handed directly to a UI layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time;

// ---------------------------------------------------------------------------
// MessageId
// ---------------------------------------------------------------------------

/// Opaque stable message identifier, unique across the whole history.
/// Primary key for merge/dedup and for store upsert.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    /// Mint a fresh id for a locally authored message.
    pub fn mint() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Derive an id from the wall clock, used when an inbound event
    /// arrives without one.
    pub fn from_clock(now: DateTime<Utc>) -> Self {
        Self(now.timestamp_millis().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Sender
// ---------------------------------------------------------------------------

/// Which side of the conversation authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    /// Authored on this device.  Wire string `"self"`.
    #[serde(rename = "self")]
    Local,
    /// Delivered by the realtime channel.  Wire string `"remote"`.
    #[serde(rename = "remote")]
    Remote,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::Local => "self",
            Sender::Remote => "remote",
        }
    }

    /// Parse a wire string.  Anything that is not `"self"` normalizes to
    /// [`Sender::Remote`], matching the inbound-event defaulting rule.
    pub fn parse(s: &str) -> Self {
        match s {
            "self" => Sender::Local,
            _ => Sender::Remote,
        }
    }
}

// ---------------------------------------------------------------------------
// MessageBody
// ---------------------------------------------------------------------------

/// Kind-specific message payload.  The closed tag set is
/// `text | image | video | gif | file | catalog`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageBody {
    Text {
        text: String,
    },
    Image {
        uri: String,
        width: u32,
        height: u32,
    },
    Video {
        uri: String,
        width: u32,
        height: u32,
    },
    Gif {
        uri: String,
    },
    #[serde(rename_all = "camelCase")]
    File {
        uri: String,
        file_name: String,
        /// Human-readable size string, e.g. `"1.2 MB"`.
        file_size: String,
    },
    Catalog {
        title: String,
        items: u32,
    },
}

impl MessageBody {
    /// The tag string persisted in the `kind` column.
    pub fn kind(&self) -> &'static str {
        match self {
            MessageBody::Text { .. } => "text",
            MessageBody::Image { .. } => "image",
            MessageBody::Video { .. } => "video",
            MessageBody::Gif { .. } => "gif",
            MessageBody::File { .. } => "file",
            MessageBody::Catalog { .. } => "catalog",
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message.
///
/// `timestamp` is the display string shown in the UI; `sent_at` is the
/// sortable key the store orders by.  The two are minted together and
/// never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    #[serde(flatten)]
    pub body: MessageBody,
    pub sender: Sender,
    /// Display-formatted local time, e.g. `"10:00 AM"`.
    pub timestamp: String,
    /// Epoch sort key.
    pub sent_at: DateTime<Utc>,
}

impl Message {
    /// Construct a locally authored message: fresh id, `self` sender,
    /// current timestamps.
    pub fn local(body: MessageBody) -> Self {
        let now = Utc::now();
        Self {
            id: MessageId::mint(),
            body,
            sender: Sender::Local,
            timestamp: time::display_time_utc(now),
            sent_at: now,
        }
    }

    /// The welcome message synthesized when the history is empty.
    pub fn seed() -> Self {
        let now = Utc::now();
        Self {
            id: MessageId::from(crate::constants::SEED_MESSAGE_ID),
            body: MessageBody::Text {
                text: crate::constants::SEED_MESSAGE_TEXT.to_string(),
            },
            sender: Sender::Remote,
            timestamp: time::display_time_utc(now),
            sent_at: now,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.body.kind()
    }
}

// ---------------------------------------------------------------------------
// RemoteCandidate
// ---------------------------------------------------------------------------

/// The any-shaped payload of an inbound realtime event.
///
/// Every field is optional; [`RemoteCandidate::normalize`] applies the
/// defaulting rules and produces a fully-typed [`Message`] before the
/// payload ever reaches the merge routine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RemoteCandidate {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub text: Option<String>,
    pub uri: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub file_name: Option<String>,
    pub file_size: Option<String>,
    pub title: Option<String>,
    pub items: Option<u32>,
    pub sender: Option<String>,
    pub timestamp: Option<String>,
}

impl RemoteCandidate {
    /// Normalize into a full [`Message`].
    ///
    /// Defaults: missing `id` is clock-derived, missing `kind` is `text`
    /// (unknown kinds degrade to `text` as well), missing `sender` is
    /// `remote`, missing `timestamp` is stamped with the current local
    /// time.  Fields irrelevant to the kind are dropped; missing
    /// kind-relevant fields default to empty / zero.
    pub fn normalize(self, now: DateTime<Utc>) -> Message {
        let body = match self.kind.as_deref().unwrap_or("text") {
            "image" => MessageBody::Image {
                uri: self.uri.unwrap_or_default(),
                width: self.width.unwrap_or_default(),
                height: self.height.unwrap_or_default(),
            },
            "video" => MessageBody::Video {
                uri: self.uri.unwrap_or_default(),
                width: self.width.unwrap_or_default(),
                height: self.height.unwrap_or_default(),
            },
            "gif" => MessageBody::Gif {
                uri: self.uri.unwrap_or_default(),
            },
            "file" => MessageBody::File {
                uri: self.uri.unwrap_or_default(),
                file_name: self.file_name.unwrap_or_default(),
                file_size: self.file_size.unwrap_or_default(),
            },
            "catalog" => MessageBody::Catalog {
                title: self.title.unwrap_or_default(),
                items: self.items.unwrap_or_default(),
            },
            _ => MessageBody::Text {
                text: self.text.unwrap_or_default(),
            },
        };

        Message {
            id: self
                .id
                .map(MessageId::from)
                .unwrap_or_else(|| MessageId::from_clock(now)),
            body,
            sender: self
                .sender
                .as_deref()
                .map(Sender::parse)
                .unwrap_or(Sender::Remote),
            timestamp: self
                .timestamp
                .unwrap_or_else(|| time::display_time_utc(now)),
            sent_at: now,
        }
    }
}

impl From<MessageBody> for RemoteCandidate {
    /// Re-wrap a body as a candidate with every envelope field left to the
    /// defaulting rules.  Used by the auto-responder path.
    fn from(body: MessageBody) -> Self {
        let mut candidate = RemoteCandidate {
            kind: Some(body.kind().to_string()),
            ..Default::default()
        };
        match body {
            MessageBody::Text { text } => candidate.text = Some(text),
            MessageBody::Image { uri, width, height }
            | MessageBody::Video { uri, width, height } => {
                candidate.uri = Some(uri);
                candidate.width = Some(width);
                candidate.height = Some(height);
            }
            MessageBody::Gif { uri } => candidate.uri = Some(uri),
            MessageBody::File {
                uri,
                file_name,
                file_size,
            } => {
                candidate.uri = Some(uri);
                candidate.file_name = Some(file_name);
                candidate.file_size = Some(file_size);
            }
            MessageBody::Catalog { title, items } => {
                candidate.title = Some(title);
                candidate.items = Some(items);
            }
        }
        candidate
    }
}
