// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The chat connection state machine.
//!
//! One driver task owns the WebSocket for the whole session: connect, send
//! the auth frame, replay the durable room membership, then pump commands
//! and inbound frames until the transport drops. Handshake failures count
//! against a bounded reconnect budget with exponential backoff; a successful
//! connect resets the counter and replays every room exactly once.

use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::chat::frame::{AuthPayload, ClientFrame, OutgoingMessage, ServerFrame};
use crate::config::ClientConfig;
use crate::domain::{ChatMessage, MessageUser, Presence};
use crate::error::{is_auth_message, ClientError};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Transport connection state. Mirrored into a watch channel so UI layers
/// can render connection health separately from per-message errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Connection-health notices, distinct from in-room chat errors.
#[derive(Debug, Clone)]
pub enum ConnectionNotice {
    Connected,
    /// The transport dropped; a reconnect attempt follows.
    Disconnected,
    /// A (re)connect attempt failed. `attempt` counts consecutive failures
    /// since the last successful connect.
    ConnectFailed { message: String, attempt: u32 },
    /// The reconnect budget is spent; the connection stays down until the
    /// next explicit `connect`.
    ReconnectsExhausted,
    /// The relay rejected the session credential — refresh and reauth.
    AuthRequired { message: String },
}

/// In-room application error (bad room, rejected message, ...). Never
/// retried; surfaced straight to subscribers.
#[derive(Debug, Clone)]
pub struct ChatError {
    pub message: String,
}

enum Command {
    Join(String),
    Leave(String),
    Send(OutgoingMessage),
    /// Cycle the connection so a replaced token takes effect immediately.
    Reauth,
}

struct Shared {
    ws_url: String,
    token: RwLock<Option<String>>,
    /// Durable room membership: what the session intends to be joined to,
    /// independent of socket connectivity. Replayed on every (re)connect.
    rooms: RwLock<BTreeSet<String>>,
    /// Consecutive failed reconnect attempts since the last successful
    /// connect.
    attempts: AtomicU32,
    max_attempts: u32,
    delay: Duration,
    delay_max: Duration,
    state_tx: watch::Sender<ConnectionState>,
    message_tx: broadcast::Sender<ChatMessage>,
    error_tx: broadcast::Sender<ChatError>,
    conn_tx: broadcast::Sender<ConnectionNotice>,
}

impl Shared {
    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }

    fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }
}

struct Driver {
    cmd_tx: mpsc::UnboundedSender<Command>,
    cancel: CancellationToken,
}

pub struct ChatClient {
    shared: Arc<Shared>,
    driver: Mutex<Option<Driver>>,
}

impl ChatClient {
    pub fn new(config: &ClientConfig) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (message_tx, _) = broadcast::channel(256);
        let (error_tx, _) = broadcast::channel(64);
        let (conn_tx, _) = broadcast::channel(64);
        Self {
            shared: Arc::new(Shared {
                ws_url: config.chat_url.clone(),
                token: RwLock::new(None),
                rooms: RwLock::new(BTreeSet::new()),
                attempts: AtomicU32::new(0),
                max_attempts: config.reconnect_attempts,
                delay: config.reconnect_delay(),
                delay_max: config.reconnect_delay_max(),
                state_tx,
                message_tx,
                error_tx,
                conn_tx,
            }),
            driver: Mutex::new(None),
        }
    }

    /// Open the relay connection with the given token. Idempotent: a live
    /// connection (or one mid-reconnect) makes this a no-op.
    pub fn connect(&self, token: &str) {
        self.store_token(token);
        let mut guard = self.driver.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(driver) = guard.as_ref() {
            if !driver.cancel.is_cancelled() {
                return;
            }
        }

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        *guard = Some(Driver { cmd_tx, cancel: cancel.clone() });
        self.shared.attempts.store(0, Ordering::SeqCst);
        spawn_driver(Arc::clone(&self.shared), cmd_rx, cancel);
    }

    /// Replace the credential used for (re)authentication. When connected,
    /// forces one disconnect-then-reconnect cycle so the new credential
    /// takes effect immediately.
    pub fn update_token(&self, token: &str) {
        self.store_token(token);
        if self.state() == ConnectionState::Connected {
            self.command(Command::Reauth);
        }
    }

    /// Record the intent to be in `room` and emit the join signal when
    /// connected. The membership mutation happens unconditionally so a
    /// later reconnect replays it.
    pub fn join_room(&self, room: &str) -> anyhow::Result<()> {
        self.ensure_initialized()?;
        self.shared
            .rooms
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(room.to_owned());
        self.command(Command::Join(room.to_owned()));
        Ok(())
    }

    pub fn leave_room(&self, room: &str) -> anyhow::Result<()> {
        self.ensure_initialized()?;
        self.shared
            .rooms
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(room);
        self.command(Command::Leave(room.to_owned()));
        Ok(())
    }

    /// Fire-and-forget message emission; no acknowledgment is awaited.
    /// Delivery confirmation, if any, arrives as a normal inbound event.
    pub fn send_message(&self, message: OutgoingMessage) -> anyhow::Result<()> {
        self.ensure_initialized()?;
        if self.state() != ConnectionState::Connected {
            anyhow::bail!("chat connection is not established");
        }
        if !self.command(Command::Send(message)) {
            anyhow::bail!("chat connection closed");
        }
        Ok(())
    }

    /// Tear down the transport, clear room membership, and reset the
    /// reconnect counter. The client needs a fresh `connect` afterwards.
    pub fn disconnect(&self) {
        let mut guard = self.driver.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(driver) = guard.take() {
            driver.cancel.cancel();
        }
        self.shared
            .rooms
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
        self.shared.attempts.store(0, Ordering::SeqCst);
        self.shared.set_state(ConnectionState::Disconnected);
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    /// Watch the connection state (health signal for UI gating).
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.attempts.load(Ordering::SeqCst)
    }

    /// Chat messages, including synthesized presence system messages.
    /// Dropping the receiver unsubscribes.
    pub fn subscribe_messages(&self) -> broadcast::Receiver<ChatMessage> {
        self.shared.message_tx.subscribe()
    }

    /// Per-message application errors from the relay.
    pub fn subscribe_errors(&self) -> broadcast::Receiver<ChatError> {
        self.shared.error_tx.subscribe()
    }

    /// Connection-health notices. Multiple independent subscribers are fine.
    pub fn subscribe_connection(&self) -> broadcast::Receiver<ConnectionNotice> {
        self.shared.conn_tx.subscribe()
    }

    fn store_token(&self, token: &str) {
        let mut guard =
            self.shared.token.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = Some(token.to_owned());
    }

    fn ensure_initialized(&self) -> anyhow::Result<()> {
        let guard = self.driver.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if guard.is_none() {
            return Err(ClientError::NotInitialized.into());
        }
        Ok(())
    }

    /// Hand a command to the driver. Returns false when no driver is alive
    /// to take it (membership mutations are already durable at that point).
    fn command(&self, command: Command) -> bool {
        let guard = self.driver.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        match guard.as_ref() {
            Some(driver) => driver.cmd_tx.send(command).is_ok(),
            None => false,
        }
    }
}

fn spawn_driver(
    shared: Arc<Shared>,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        let mut backoff = shared.delay;

        loop {
            if cancel.is_cancelled() {
                break;
            }
            shared.set_state(ConnectionState::Connecting);

            match connect_async(shared.ws_url.as_str()).await {
                Ok((stream, _)) => {
                    let (mut write, read) = stream.split();
                    match open_session(&shared, &mut write).await {
                        Ok(joined) => {
                            shared.attempts.store(0, Ordering::SeqCst);
                            backoff = shared.delay;
                            shared.set_state(ConnectionState::Connected);
                            let _ = shared.conn_tx.send(ConnectionNotice::Connected);
                            tracing::debug!(url = %shared.ws_url, "chat relay connected");

                            let reauth =
                                pump(&shared, &cancel, &mut cmd_rx, write, read, joined).await;
                            if cancel.is_cancelled() {
                                break;
                            }
                            if reauth {
                                // One immediate cycle with the replaced
                                // credential; not a failure.
                                continue;
                            }
                            shared.set_state(ConnectionState::Disconnected);
                            let _ = shared.conn_tx.send(ConnectionNotice::Disconnected);
                            tracing::debug!("chat relay disconnected, will reconnect");
                        }
                        Err(e) => {
                            if !note_failure(&shared, &e.to_string()) {
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    if !note_failure(&shared, &e.to_string()) {
                        break;
                    }
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(backoff) => {}
            }
            backoff = (backoff * 2).min(shared.delay_max);
        }

        shared.set_state(ConnectionState::Disconnected);
        // Mark this driver dead so a later `connect` can spawn a fresh one.
        cancel.cancel();
    });
}

/// Record a failed (re)connect attempt. Returns false once the budget is
/// spent, which parks the driver.
fn note_failure(shared: &Shared, message: &str) -> bool {
    let attempt = shared.attempts.fetch_add(1, Ordering::SeqCst) + 1;
    tracing::debug!(attempt, err = %message, "chat connect failed");
    let _ = shared.conn_tx.send(ConnectionNotice::ConnectFailed {
        message: message.to_owned(),
        attempt,
    });
    if attempt >= shared.max_attempts {
        tracing::warn!(attempts = attempt, "chat reconnect budget exhausted");
        let _ = shared.conn_tx.send(ConnectionNotice::ReconnectsExhausted);
        return false;
    }
    true
}

/// Authenticate the fresh socket and replay the durable room membership.
/// Returns the set of rooms joined on this connection.
async fn open_session(shared: &Shared, write: &mut WsSink) -> anyhow::Result<HashSet<String>> {
    let token = shared.token().unwrap_or_default();
    send_frame(write, &ClientFrame::Auth(AuthPayload { token: format!("Bearer {token}") }))
        .await?;

    let rooms: Vec<String> = shared
        .rooms
        .read()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .iter()
        .cloned()
        .collect();
    let mut joined = HashSet::new();
    for room in rooms {
        send_frame(write, &ClientFrame::JoinRoom(room.clone())).await?;
        joined.insert(room);
    }
    Ok(joined)
}

/// Pump commands and inbound frames until the connection ends. Returns true
/// when the connection should cycle immediately for a reauth.
async fn pump(
    shared: &Shared,
    cancel: &CancellationToken,
    cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
    mut write: WsSink,
    mut read: WsSource,
    mut joined: HashSet<String>,
) -> bool {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return false,

            cmd = cmd_rx.recv() => match cmd {
                Some(Command::Join(room)) => {
                    // The replay may already have joined this room; every
                    // membership is joined at most once per connection.
                    if joined.insert(room.clone()) {
                        let _ = send_frame(&mut write, &ClientFrame::JoinRoom(room)).await;
                    }
                }
                Some(Command::Leave(room)) => {
                    if joined.remove(&room) {
                        let _ = send_frame(&mut write, &ClientFrame::LeaveRoom(room)).await;
                    }
                }
                Some(Command::Send(message)) => {
                    let _ = send_frame(&mut write, &ClientFrame::SendMessage(message)).await;
                }
                Some(Command::Reauth) => {
                    let _ = write.send(Message::Close(None)).await;
                    return true;
                }
                None => return false,
            },

            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => handle_frame(shared, text.as_str()),
                Some(Ok(Message::Close(_))) | None => return false,
                Some(Err(e)) => {
                    tracing::debug!(err = %e, "chat socket error");
                    return false;
                }
                _ => {} // ping/pong/binary ignored
            },
        }
    }
}

fn handle_frame(shared: &Shared, text: &str) {
    let frame: ServerFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!(err = %e, "unrecognized relay frame, ignoring");
            return;
        }
    };

    match frame {
        ServerFrame::NewMessage(message) => {
            let _ = shared.message_tx.send(message);
        }
        ServerFrame::UserJoined(presence) => {
            let _ = shared.message_tx.send(system_message(&presence, true));
        }
        ServerFrame::UserLeft(presence) => {
            let _ = shared.message_tx.send(system_message(&presence, false));
        }
        ServerFrame::Error(err) => {
            if is_auth_message(&err.message) {
                let _ = shared
                    .conn_tx
                    .send(ConnectionNotice::AuthRequired { message: err.message.clone() });
            }
            let _ = shared.error_tx.send(ChatError { message: err.message });
        }
    }
}

/// Synthesize a display-ready system message from a presence event. These
/// records exist only on this client: synthetic id, current timestamp,
/// never persisted or re-fetched.
fn system_message(presence: &Presence, joined: bool) -> ChatMessage {
    let verb = if joined { "joined" } else { "left" };
    ChatMessage {
        id: format!("system-{}", uuid::Uuid::new_v4()),
        text: format!("{} {verb} the chat", presence.username),
        created_at: chrono::Utc::now().to_rfc3339(),
        stream_id: String::new(),
        user_id: presence.user_id.clone(),
        user: MessageUser { id: presence.user_id.clone(), username: presence.username.clone() },
        is_system: true,
    }
}

async fn send_frame(write: &mut WsSink, frame: &ClientFrame) -> anyhow::Result<()> {
    let text = serde_json::to_string(frame)?;
    write.send(Message::Text(text.into())).await?;
    Ok(())
}
