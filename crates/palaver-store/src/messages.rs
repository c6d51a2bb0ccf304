//! Typed helpers for the message history.
//!
//! Writes are keyed upserts: a colliding `id` replaces the prior row in
//! place, atomically within a single SQL statement.  Reads return the full
//! history ordered by the `sent_at` sort key.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::params;

use palaver_shared::{Message, MessageBody, MessageId, Sender};

use crate::database::Database;
use crate::error::{Result, StoreError};

impl Database {
    /// Write all fields of `message` keyed by `id`, replacing any existing
    /// row with the same `id`.  An error means the write did not happen.
    pub fn upsert_message(&self, message: &Message) -> Result<()> {
        let cols = Columns::from_body(&message.body);

        self.conn().execute(
            "INSERT OR REPLACE INTO messages (
                id, kind, text, uri, width, height, file_name, file_size,
                title, items, sender, timestamp, sent_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                message.id.as_str(),
                message.kind(),
                cols.text,
                cols.uri,
                cols.width,
                cols.height,
                cols.file_name,
                cols.file_size,
                cols.title,
                cols.items,
                message.sender.as_str(),
                message.timestamp,
                message
                    .sent_at
                    .to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;
        Ok(())
    }

    /// Load every stored message, ordered by `sent_at` ascending with
    /// `created_at` as a tiebreak.
    pub fn load_all(&self) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, kind, text, uri, width, height, file_name, file_size,
                    title, items, sender, timestamp, sent_at
             FROM messages
             ORDER BY sent_at ASC, created_at ASC",
        )?;

        let rows = stmt.query_map([], row_to_raw)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(decode_row(row?)?);
        }
        Ok(messages)
    }

    /// Delete every stored message.
    pub fn clear_all(&self) -> Result<()> {
        self.conn().execute("DELETE FROM messages", [])?;
        Ok(())
    }

    /// Number of stored messages.
    pub fn count_messages(&self) -> Result<u64> {
        let count: i64 =
            self.conn()
                .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

/// Nullable payload columns, populated per kind.
#[derive(Default)]
struct Columns {
    text: Option<String>,
    uri: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    file_name: Option<String>,
    file_size: Option<String>,
    title: Option<String>,
    items: Option<u32>,
}

impl Columns {
    fn from_body(body: &MessageBody) -> Self {
        let mut cols = Columns::default();
        match body {
            MessageBody::Text { text } => cols.text = Some(text.clone()),
            MessageBody::Image { uri, width, height }
            | MessageBody::Video { uri, width, height } => {
                cols.uri = Some(uri.clone());
                cols.width = Some(*width);
                cols.height = Some(*height);
            }
            MessageBody::Gif { uri } => cols.uri = Some(uri.clone()),
            MessageBody::File {
                uri,
                file_name,
                file_size,
            } => {
                cols.uri = Some(uri.clone());
                cols.file_name = Some(file_name.clone());
                cols.file_size = Some(file_size.clone());
            }
            MessageBody::Catalog { title, items } => {
                cols.title = Some(title.clone());
                cols.items = Some(*items);
            }
        }
        cols
    }
}

/// One row as stored, before kind validation.
struct RawRow {
    id: String,
    kind: String,
    cols: Columns,
    sender: String,
    timestamp: String,
    sent_at: String,
}

fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        kind: row.get(1)?,
        cols: Columns {
            text: row.get(2)?,
            uri: row.get(3)?,
            width: row.get(4)?,
            height: row.get(5)?,
            file_name: row.get(6)?,
            file_size: row.get(7)?,
            title: row.get(8)?,
            items: row.get(9)?,
        },
        sender: row.get(10)?,
        timestamp: row.get(11)?,
        sent_at: row.get(12)?,
    })
}

fn decode_row(raw: RawRow) -> Result<Message> {
    fn require<T>(value: Option<T>, id: &str, column: &str) -> Result<T> {
        value.ok_or_else(|| StoreError::Corrupt {
            id: id.to_string(),
            reason: format!("missing required column `{column}`"),
        })
    }

    let cols = raw.cols;
    let body = match raw.kind.as_str() {
        "text" => MessageBody::Text {
            text: require(cols.text, &raw.id, "text")?,
        },
        "image" => MessageBody::Image {
            uri: require(cols.uri, &raw.id, "uri")?,
            width: require(cols.width, &raw.id, "width")?,
            height: require(cols.height, &raw.id, "height")?,
        },
        "video" => MessageBody::Video {
            uri: require(cols.uri, &raw.id, "uri")?,
            width: require(cols.width, &raw.id, "width")?,
            height: require(cols.height, &raw.id, "height")?,
        },
        "gif" => MessageBody::Gif {
            uri: require(cols.uri, &raw.id, "uri")?,
        },
        "file" => MessageBody::File {
            uri: require(cols.uri, &raw.id, "uri")?,
            file_name: require(cols.file_name, &raw.id, "file_name")?,
            file_size: require(cols.file_size, &raw.id, "file_size")?,
        },
        "catalog" => MessageBody::Catalog {
            title: require(cols.title, &raw.id, "title")?,
            items: require(cols.items, &raw.id, "items")?,
        },
        other => {
            return Err(StoreError::Corrupt {
                id: raw.id,
                reason: format!("unknown kind `{other}`"),
            })
        }
    };

    let sent_at: DateTime<Utc> =
        DateTime::parse_from_rfc3339(&raw.sent_at)?.with_timezone(&Utc);

    Ok(Message {
        id: MessageId::from(raw.id),
        body,
        sender: Sender::parse(&raw.sender),
        timestamp: raw.timestamp,
        sent_at,
    })
}
