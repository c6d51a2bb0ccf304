//! # palaver
//!
//! Terminal front end for the Palaver chat core.  It stands in for the
//! mobile presentation surface: it renders the synchronizer's snapshot and
//! forwards typed lines as local text messages.
//!
//! Slash commands:
//! - `/gif`                 send a random canned GIF
//! - `/catalog`             send the canned catalog entry
//! - `/file <name> <bytes>` send a fake document attachment
//! - `/publish <text>`      simulate an external publisher on the hub
//! - `/history`             reprint the full message list
//! - `/clear`               wipe the history (store and screen)
//! - `/quit`                exit

use std::path::PathBuf;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use palaver_channel::{ChannelConfig, MemoryHub, MemoryTransport};
use palaver_shared::{drafts, Message, Sender};
use palaver_store::Database;
use palaver_sync::{CannedResponder, SyncHandle, Synchronizer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,palaver=info")),
        )
        .init();

    info!("Starting Palaver v{}", env!("CARGO_PKG_VERSION"));

    let db = match std::env::var("PALAVER_DB") {
        Ok(path) => Database::open_at(&PathBuf::from(path))?,
        Err(_) => Database::new()?,
    };

    // Realtime is wired to the in-process hub so `/publish` can simulate a
    // remote party.  An incomplete env config simply disables it.
    let mut config = ChannelConfig::from_env();
    if config.app_key.is_empty() {
        config.app_key = "demo".into();
        config.cluster = "local".into();
    }
    let hub = MemoryHub::new();
    let transport = Box::new(MemoryTransport::new(hub.clone()));

    let handle = Synchronizer::spawn(
        db,
        config.clone(),
        transport,
        Some(Box::new(CannedResponder::new())),
    );
    handle.ready().await;

    for message in handle.snapshot() {
        print_message(&message);
    }

    // Echo messages the REPL loop did not author itself (remote
    // deliveries, auto-replies).
    let mut watcher = handle.subscribe();
    let printer = tokio::spawn(async move {
        let mut seen = watcher.borrow().len();
        while watcher.changed().await.is_ok() {
            let snapshot = watcher.borrow().clone();
            if snapshot.len() < seen {
                seen = snapshot.len(); // history was cleared
                continue;
            }
            for message in &snapshot[seen..] {
                print_message(message);
            }
            seen = snapshot.len();
        }
    });

    run_repl(&handle, &hub, &config).await?;

    handle.shutdown();
    printer.abort();
    Ok(())
}

async fn run_repl(
    handle: &SyncHandle,
    hub: &MemoryHub,
    config: &ChannelConfig,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.split_once(' ').unwrap_or((line, "")) {
            ("/quit", _) => break,
            ("/clear", _) => {
                handle.clear_history().await?;
                println!("-- history cleared --");
            }
            ("/history", _) => {
                for message in handle.snapshot() {
                    print_message(&message);
                }
            }
            ("/gif", _) => {
                handle.submit_local(drafts::random_gif()).await?;
            }
            ("/catalog", _) => {
                handle.submit_local(drafts::catalog_entry()).await?;
            }
            ("/file", rest) => {
                let (name, bytes) = rest.split_once(' ').unwrap_or((rest, "0"));
                let size = bytes.parse().unwrap_or(0);
                let name = (!name.is_empty()).then(|| name.to_string());
                handle
                    .submit_local(drafts::document("file://local", name, size))
                    .await?;
            }
            ("/publish", text) => {
                hub.publish(
                    &config.channel_name,
                    &config.event_name,
                    serde_json::json!({ "type": "text", "text": text }),
                );
            }
            _ => {
                handle.submit_local(drafts::text(line)).await?;
            }
        }
    }

    Ok(())
}

fn print_message(message: &Message) {
    let side = match message.sender {
        Sender::Local => "you",
        Sender::Remote => "them",
    };
    println!(
        "[{}] {:>4}: {}",
        message.timestamp,
        side,
        render_body(message)
    );
}

fn render_body(message: &Message) -> String {
    use palaver_shared::MessageBody::*;
    match &message.body {
        Text { text } => text.clone(),
        Image { uri, width, height } => format!("<image {width}x{height} {uri}>"),
        Video { uri, width, height } => format!("<video {width}x{height} {uri}>"),
        Gif { uri } => format!("<gif {uri}>"),
        File {
            file_name,
            file_size,
            ..
        } => format!("<file {file_name} ({file_size})>"),
        Catalog { title, items } => format!("<catalog {title}, {items} items>"),
    }
}
