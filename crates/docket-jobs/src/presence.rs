//! Presence registry: which users currently hold a live push channel.
//!
//! The map is owned by a single actor task. Everything else talks to it
//! through [`PresenceRegistry`], a cloneable handle that sends commands over
//! an mpsc channel. At most one channel is tracked per user; a new
//! registration replaces the previous one.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use docket_core::PushEvent;

/// Capacity of the command queue in front of the actor.
const COMMAND_BUFFER: usize = 256;

/// Sending half of one live connection.
#[derive(Debug, Clone)]
pub struct Channel {
    connection_id: Uuid,
    sender: mpsc::UnboundedSender<PushEvent>,
}

impl Channel {
    /// Wrap the sender of a freshly accepted connection.
    pub fn new(sender: mpsc::UnboundedSender<PushEvent>) -> Self {
        Self {
            connection_id: Uuid::now_v7(),
            sender,
        }
    }

    /// Open a channel together with the inbox its connection reads from.
    pub fn open() -> (Self, Inbox) {
        let (sender, rx) = mpsc::unbounded_channel();
        let inbox = Inbox {
            rx,
            _keepalive: sender.clone(),
        };
        (Self::new(sender), inbox)
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    /// Fire-and-forget push. Returns false when the connection is gone.
    pub fn push(&self, event: PushEvent) -> bool {
        self.sender.send(event).is_ok()
    }
}

/// Receiving half of one live connection.
///
/// The inbox holds a sender of its own, so it stays open when the registry
/// drops or replaces the [`Channel`]. It only ends when the connection does.
#[derive(Debug)]
pub struct Inbox {
    rx: mpsc::UnboundedReceiver<PushEvent>,
    _keepalive: mpsc::UnboundedSender<PushEvent>,
}

impl Inbox {
    pub async fn recv(&mut self) -> Option<PushEvent> {
        self.rx.recv().await
    }
}

enum Command {
    Register {
        user_id: i64,
        channel: Channel,
    },
    Unregister {
        user_id: i64,
        connection_id: Uuid,
        reply: oneshot::Sender<bool>,
    },
    Lookup {
        user_id: i64,
        reply: oneshot::Sender<Option<Channel>>,
    },
    Count {
        reply: oneshot::Sender<usize>,
    },
}

/// Handle to the presence actor.
#[derive(Debug, Clone)]
pub struct PresenceRegistry {
    tx: mpsc::Sender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Register { user_id, .. } => write!(f, "Register({user_id})"),
            Command::Unregister { user_id, .. } => write!(f, "Unregister({user_id})"),
            Command::Lookup { user_id, .. } => write!(f, "Lookup({user_id})"),
            Command::Count { .. } => write!(f, "Count"),
        }
    }
}

impl PresenceRegistry {
    /// Spawn the actor. It stops once every handle has been dropped.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        tokio::spawn(run(rx));
        Self { tx }
    }

    /// Make `channel` the live channel for `user_id`, replacing any other.
    pub async fn register(&self, user_id: i64, channel: Channel) {
        if self
            .tx
            .send(Command::Register { user_id, channel })
            .await
            .is_err()
        {
            warn!(subsystem = "jobs", component = "presence", user_id, "Presence actor stopped");
        }
    }

    /// Remove the entry for `user_id` if it still belongs to `connection_id`.
    ///
    /// Returns whether an entry was removed. A newer connection for the same
    /// user is left untouched.
    pub async fn unregister(&self, user_id: i64, connection_id: Uuid) -> bool {
        let (reply, rx) = oneshot::channel();
        if self
            .tx
            .send(Command::Unregister {
                user_id,
                connection_id,
                reply,
            })
            .await
            .is_err()
        {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// The live channel for `user_id`, if any.
    pub async fn lookup(&self, user_id: i64) -> Option<Channel> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(Command::Lookup { user_id, reply }).await.ok()?;
        rx.await.ok().flatten()
    }

    /// Number of users with a live channel.
    pub async fn online_count(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Count { reply }).await.is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}

async fn run(mut rx: mpsc::Receiver<Command>) {
    let mut channels: HashMap<i64, Channel> = HashMap::new();

    while let Some(command) = rx.recv().await {
        trace!(subsystem = "jobs", component = "presence", ?command, "Presence command");
        match command {
            Command::Register { user_id, channel } => {
                let connection_id = channel.connection_id;
                if let Some(previous) = channels.insert(user_id, channel) {
                    debug!(
                        subsystem = "jobs",
                        component = "presence",
                        user_id,
                        replaced = %previous.connection_id,
                        %connection_id,
                        "Replaced live channel"
                    );
                } else {
                    debug!(
                        subsystem = "jobs",
                        component = "presence",
                        user_id,
                        %connection_id,
                        "User online"
                    );
                }
            }
            Command::Unregister {
                user_id,
                connection_id,
                reply,
            } => {
                let owned = channels
                    .get(&user_id)
                    .is_some_and(|c| c.connection_id == connection_id);
                if owned {
                    channels.remove(&user_id);
                    debug!(
                        subsystem = "jobs",
                        component = "presence",
                        user_id,
                        %connection_id,
                        "User offline"
                    );
                }
                let _ = reply.send(owned);
            }
            Command::Lookup { user_id, reply } => {
                let _ = reply.send(channels.get(&user_id).cloned());
            }
            Command::Count { reply } => {
                let _ = reply.send(channels.len());
            }
        }
    }

    debug!(subsystem = "jobs", component = "presence", "Presence actor stopped");
}
