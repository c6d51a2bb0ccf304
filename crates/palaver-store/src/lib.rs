//! # palaver-store
//!
//! Local durable storage for the Palaver chat core, backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed helpers for the message
//! history: keyed upsert, full ordered load, and full clear.  Migrations
//! run on every open and are guarded by the `user_version` pragma.

pub mod database;
pub mod messages;
pub mod migrations;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
