//! The synchronizer actor.
//!
//! One tokio task owns the authoritative list; external code talks to it
//! through typed commands, which serializes every merge's
//! read-modify-write.  Snapshots are published on a `watch` channel the
//! presentation surface observes.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use palaver_channel::{ActiveConnection, ChannelConfig, Transport};
use palaver_shared::{Message, MessageBody, MessageId, RemoteCandidate};
use palaver_store::Database;

use crate::error::SyncError;
use crate::responder::AutoResponder;

/// Startup lifecycle.  `Ready` is terminal until teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Uninitialized,
    Loading,
    Ready,
}

/// Commands sent *into* the synchronizer task.
enum SyncCommand {
    SubmitLocal {
        body: MessageBody,
        reply: oneshot::Sender<Result<Message, SyncError>>,
    },
    ReceiveRemote {
        candidate: RemoteCandidate,
        /// `None` for events arriving through the channel binding.
        reply: Option<oneshot::Sender<Result<Message, SyncError>>>,
    },
    ClearHistory {
        reply: oneshot::Sender<Result<(), SyncError>>,
    },
    Shutdown,
}

/// Cloneable handle to a running synchronizer.
#[derive(Clone)]
pub struct SyncHandle {
    cmd_tx: mpsc::UnboundedSender<SyncCommand>,
    snapshot_rx: watch::Receiver<Vec<Message>>,
    state_rx: watch::Receiver<SyncState>,
}

impl SyncHandle {
    /// Construct a fully-formed local message and merge it.  Returns the
    /// finalized message, or the persist failure if the store rejected it.
    pub async fn submit_local(&self, body: MessageBody) -> Result<Message, SyncError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(SyncCommand::SubmitLocal { body, reply })
            .map_err(|_| SyncError::Shutdown)?;
        rx.await.map_err(|_| SyncError::Shutdown)?
    }

    /// Normalize an inbound candidate and merge it.  The channel binding
    /// uses the same path internally; this entry point exists for direct
    /// producers and tests.
    pub async fn receive_remote(&self, candidate: RemoteCandidate) -> Result<Message, SyncError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(SyncCommand::ReceiveRemote {
                candidate,
                reply: Some(reply),
            })
            .map_err(|_| SyncError::Shutdown)?;
        rx.await.map_err(|_| SyncError::Shutdown)?
    }

    /// Delete the whole history (store and list).  Testing/reset only.
    pub async fn clear_history(&self) -> Result<(), SyncError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(SyncCommand::ClearHistory { reply })
            .map_err(|_| SyncError::Shutdown)?;
        rx.await.map_err(|_| SyncError::Shutdown)?
    }

    /// Current ordered snapshot of the authoritative list.
    pub fn snapshot(&self) -> Vec<Message> {
        self.snapshot_rx.borrow().clone()
    }

    /// Observe snapshots as they are published.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Message>> {
        self.snapshot_rx.clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SyncState {
        *self.state_rx.borrow()
    }

    /// Resolve once the synchronizer reaches `Ready`.
    pub async fn ready(&self) {
        let mut rx = self.state_rx.clone();
        loop {
            if *rx.borrow() == SyncState::Ready {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Request teardown.  Best-effort; a no-op if the task already exited.
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(SyncCommand::Shutdown);
    }
}

/// Spawns and owns the actor task.
pub struct Synchronizer;

impl Synchronizer {
    /// Spawn the synchronizer.
    ///
    /// Loading runs inside the task: history is read from `db` (a read
    /// failure degrades to an empty history), an empty history is seeded
    /// with the welcome message, and the realtime channel is attached
    /// best-effort.  Commands sent before `Ready` queue up and are served
    /// after loading completes.
    pub fn spawn(
        db: Database,
        config: ChannelConfig,
        transport: Box<dyn Transport>,
        responder: Option<Box<dyn AutoResponder>>,
    ) -> SyncHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(Vec::new());
        let (state_tx, state_rx) = watch::channel(SyncState::Uninitialized);

        let actor = Actor {
            db,
            list: Vec::new(),
            index: HashMap::new(),
            snapshot_tx,
            state_tx,
            responder,
            connection: None,
            event_name: config.event_name.clone(),
            cmd_tx: cmd_tx.clone(),
        };

        tokio::spawn(actor.run(cmd_rx, config, transport));

        SyncHandle {
            cmd_tx,
            snapshot_rx,
            state_rx,
        }
    }
}

struct Actor {
    db: Database,
    list: Vec<Message>,
    index: HashMap<MessageId, usize>,
    snapshot_tx: watch::Sender<Vec<Message>>,
    state_tx: watch::Sender<SyncState>,
    responder: Option<Box<dyn AutoResponder>>,
    connection: Option<ActiveConnection>,
    event_name: String,
    /// Used to re-enter the command queue from channel bindings and
    /// delayed auto-replies.
    cmd_tx: mpsc::UnboundedSender<SyncCommand>,
}

impl Actor {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<SyncCommand>,
        config: ChannelConfig,
        transport: Box<dyn Transport>,
    ) {
        self.state_tx.send_replace(SyncState::Loading);

        self.load_history();
        self.attach_channel(&config, transport.as_ref());

        self.state_tx.send_replace(SyncState::Ready);
        info!(messages = self.list.len(), "synchronizer ready");

        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                SyncCommand::SubmitLocal { body, reply } => {
                    let result = self.merge(Message::local(body));
                    if let Ok(merged) = &result {
                        self.consult_responder(merged);
                    }
                    let _ = reply.send(result);
                }
                SyncCommand::ReceiveRemote { candidate, reply } => {
                    let result = self.merge(candidate.normalize(Utc::now()));
                    match reply {
                        Some(reply) => {
                            let _ = reply.send(result);
                        }
                        None => {
                            if let Err(e) = result {
                                warn!(error = %e, "inbound event merge failed");
                            }
                        }
                    }
                }
                SyncCommand::ClearHistory { reply } => {
                    let _ = reply.send(self.clear());
                }
                SyncCommand::Shutdown => break,
            }
        }

        self.detach_channel();
        debug!("synchronizer task exited");
    }

    /// Load persisted history.  A read failure is non-fatal: the system
    /// proceeds with an empty history.
    fn load_history(&mut self) {
        let loaded = match self.db.load_all() {
            Ok(messages) => messages,
            Err(e) => {
                warn!(error = %e, "failed to load history, starting empty");
                Vec::new()
            }
        };

        for message in loaded {
            self.index.insert(message.id.clone(), self.list.len());
            self.list.push(message);
        }

        if self.list.is_empty() {
            match self.merge(Message::seed()) {
                Ok(_) => info!("seeded empty history with welcome message"),
                Err(e) => warn!(error = %e, "failed to seed welcome message"),
            }
        } else {
            debug!(messages = self.list.len(), "history loaded");
            self.snapshot_tx.send_replace(self.list.clone());
        }
    }

    /// Best-effort channel attach: a failed connect leaves the system in
    /// local-only mode and never blocks readiness.
    fn attach_channel(&mut self, config: &ChannelConfig, transport: &dyn Transport) {
        let Some(connection) = ActiveConnection::connect(config, transport) else {
            info!("realtime channel unavailable, continuing in local-only mode");
            return;
        };

        connection.subscribe(&config.channel_name);

        let cmd_tx = self.cmd_tx.clone();
        connection.bind(&config.event_name, move |candidate| {
            let _ = cmd_tx.send(SyncCommand::ReceiveRemote {
                candidate,
                reply: None,
            });
        });

        self.connection = Some(connection);
    }

    fn detach_channel(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.unbind(&self.event_name);
            connection.disconnect();
        }
    }

    /// The shared merge routine: persist, then update the list by id,
    /// then publish the snapshot.  A persist failure aborts the merge
    /// with the list untouched.
    fn merge(&mut self, message: Message) -> Result<Message, SyncError> {
        self.db.upsert_message(&message)?;

        match self.index.get(&message.id) {
            Some(&position) => {
                debug!(id = %message.id, "replacing message in place");
                self.list[position] = message.clone();
            }
            None => {
                self.index.insert(message.id.clone(), self.list.len());
                self.list.push(message.clone());
            }
        }

        self.snapshot_tx.send_replace(self.list.clone());
        Ok(message)
    }

    fn clear(&mut self) -> Result<(), SyncError> {
        self.db.clear_all()?;
        self.list.clear();
        self.index.clear();
        self.snapshot_tx.send_replace(Vec::new());
        info!("history cleared");
        Ok(())
    }

    /// Hand a successful local merge to the auto-responder; a reply
    /// re-enters the command queue after its delay, as a remote candidate.
    fn consult_responder(&mut self, merged: &Message) {
        let Some(responder) = self.responder.as_mut() else {
            return;
        };
        let Some(reply) = responder.respond(merged) else {
            return;
        };

        let cmd_tx = self.cmd_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(reply.delay).await;
            let _ = cmd_tx.send(SyncCommand::ReceiveRemote {
                candidate: RemoteCandidate::from(reply.body),
                reply: None,
            });
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::responder::CannedResponder;
    use palaver_channel::{MemoryHub, MemoryTransport};
    use palaver_shared::constants::{
        DEFAULT_CHANNEL_NAME, DEFAULT_EVENT_NAME, SEED_MESSAGE_ID,
    };
    use palaver_shared::{drafts, Sender};

    fn channel_config(app_key: &str) -> ChannelConfig {
        ChannelConfig {
            app_key: app_key.into(),
            cluster: "local".into(),
            channel_name: DEFAULT_CHANNEL_NAME.into(),
            event_name: DEFAULT_EVENT_NAME.into(),
        }
    }

    /// Spawn against a fresh in-memory database, local-only.
    fn spawn_local_only(db: Database) -> SyncHandle {
        let transport = Box::new(MemoryTransport::new(MemoryHub::new()));
        Synchronizer::spawn(db, channel_config(""), transport, None)
    }

    async fn wait_for<F>(handle: &SyncHandle, predicate: F)
    where
        F: Fn(&[Message]) -> bool,
    {
        let mut rx = handle.subscribe();
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if predicate(&rx.borrow()) {
                    return;
                }
                rx.changed().await.expect("synchronizer dropped");
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn empty_history_is_seeded_before_ready() {
        let db = Database::open_in_memory().unwrap();
        let handle = spawn_local_only(db);
        handle.ready().await;

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id.as_str(), SEED_MESSAGE_ID);
        assert_eq!(snapshot[0].sender, Sender::Remote);
    }

    #[tokio::test]
    async fn existing_history_is_not_reseeded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let db = Database::open_at(&path).unwrap();
            db.upsert_message(&Message::local(drafts::text("already here")))
                .unwrap();
        }

        let handle = spawn_local_only(Database::open_at(&path).unwrap());
        handle.ready().await;

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            snapshot[0].body,
            MessageBody::Text {
                text: "already here".into()
            }
        );
    }

    #[tokio::test]
    async fn submit_local_appears_in_snapshot_and_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        let handle = spawn_local_only(Database::open_at(&path).unwrap());
        handle.ready().await;

        let merged = handle.submit_local(drafts::text("hi")).await.unwrap();
        assert_eq!(merged.sender, Sender::Local);

        let snapshot = handle.snapshot();
        assert!(snapshot.iter().any(|m| m.id == merged.id));

        // A full reload from the store reproduces the message.
        let reloaded = Database::open_at(&path).unwrap().load_all().unwrap();
        assert!(reloaded.iter().any(|m| m.id == merged.id));
    }

    #[tokio::test]
    async fn write_failure_is_fail_closed() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_message(&Message::local(drafts::text("existing")))
            .unwrap();
        // Force every subsequent write to fail.
        db.conn().pragma_update(None, "query_only", "ON").unwrap();

        let handle = spawn_local_only(db);
        handle.ready().await;
        assert_eq!(handle.snapshot().len(), 1);

        let result = handle.submit_local(drafts::text("doomed")).await;
        assert!(matches!(result, Err(SyncError::Persist(_))));
        assert_eq!(handle.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn incomplete_channel_config_still_reaches_ready() {
        let db = Database::open_in_memory().unwrap();
        let handle = spawn_local_only(db); // empty app_key
        handle.ready().await;

        assert_eq!(handle.state(), SyncState::Ready);
        handle.submit_local(drafts::text("works offline")).await.unwrap();
        assert_eq!(handle.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn published_event_is_merged_and_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        let hub = MemoryHub::new();
        let transport = Box::new(MemoryTransport::new(hub.clone()));
        let handle = Synchronizer::spawn(
            Database::open_at(&path).unwrap(),
            channel_config("key"),
            transport,
            None,
        );
        handle.ready().await;

        hub.publish(
            DEFAULT_CHANNEL_NAME,
            DEFAULT_EVENT_NAME,
            serde_json::json!({"type": "text", "text": "ping"}),
        );

        let is_ping = |m: &Message| {
            matches!(&m.body, MessageBody::Text { text } if text == "ping")
        };
        wait_for(&handle, |list| list.iter().any(is_ping)).await;

        let merged = handle.snapshot().into_iter().find(is_ping).unwrap();
        assert_eq!(merged.sender, Sender::Remote);

        let reloaded = Database::open_at(&path).unwrap().load_all().unwrap();
        assert!(reloaded.iter().any(is_ping));
    }

    #[tokio::test]
    async fn colliding_id_replaces_in_place() {
        let db = Database::open_in_memory().unwrap();
        let handle = spawn_local_only(db);
        handle.ready().await;

        let first = RemoteCandidate {
            id: Some("dup".into()),
            kind: Some("text".into()),
            text: Some("first".into()),
            ..Default::default()
        };
        let second = RemoteCandidate {
            text: Some("second".into()),
            ..first.clone()
        };

        handle.receive_remote(first).await.unwrap();
        let before = handle.snapshot();
        handle.receive_remote(second).await.unwrap();
        let after = handle.snapshot();

        assert_eq!(before.len(), after.len());
        let replaced = after
            .iter()
            .find(|m| m.id.as_str() == "dup")
            .expect("message present");
        assert_eq!(
            replaced.body,
            MessageBody::Text {
                text: "second".into()
            }
        );
    }

    #[tokio::test]
    async fn merges_preserve_arrival_order() {
        let db = Database::open_in_memory().unwrap();
        let handle = spawn_local_only(db);
        handle.ready().await;

        let a = handle.submit_local(drafts::text("a")).await.unwrap();
        let b = handle
            .receive_remote(RemoteCandidate {
                text: Some("b".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let c = handle.submit_local(drafts::text("c")).await.unwrap();

        let ids: Vec<_> = handle
            .snapshot()
            .iter()
            .skip(1) // seed
            .map(|m| m.id.clone())
            .collect();
        assert_eq!(ids, vec![a.id, b.id, c.id]);
    }

    #[tokio::test]
    async fn clear_history_empties_list_and_store() {
        let db = Database::open_in_memory().unwrap();
        let handle = spawn_local_only(db);
        handle.ready().await;
        handle.submit_local(drafts::text("gone soon")).await.unwrap();

        handle.clear_history().await.unwrap();

        assert!(handle.snapshot().is_empty());
    }

    #[tokio::test]
    async fn auto_responder_reply_arrives_as_remote() {
        let db = Database::open_in_memory().unwrap();
        let transport = Box::new(MemoryTransport::new(MemoryHub::new()));
        let responder = Box::new(CannedResponder::with_delay(Duration::from_millis(10)));
        let handle = Synchronizer::spawn(db, channel_config(""), transport, Some(responder));
        handle.ready().await;

        handle.submit_local(drafts::text("hello")).await.unwrap();

        let is_reply = |m: &Message| {
            m.sender == Sender::Remote
                && matches!(&m.body, MessageBody::Text { text } if text == "Thanks for your message!")
        };
        wait_for(&handle, |list| list.iter().any(is_reply)).await;
    }

    #[tokio::test]
    async fn shutdown_makes_operations_fail() {
        let db = Database::open_in_memory().unwrap();
        let handle = spawn_local_only(db);
        handle.ready().await;

        handle.shutdown();
        // Give the task a moment to exit.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let result = handle.submit_local(drafts::text("too late")).await;
        assert!(matches!(result, Err(SyncError::Shutdown)));
    }
}
