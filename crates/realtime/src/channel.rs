//! The realtime sync channel: one hub connection per session.
//!
//! [`SyncChannel::start`] connects, performs the hub handshake and joins
//! an area, then hands the socket to a background task. That task applies
//! inbound change events to the session stores, sends keepalive pings,
//! executes join/leave commands and, when the connection drops, reconnects
//! with [`BackoffPolicy`] delays and re-joins every joined area. Only
//! [`SyncChannel::stop`] ends the task.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use msel_store::SessionStores;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::backoff::BackoffPolicy;
use crate::dispatch::apply_invocation;
use crate::protocol::{self, HubMessage, ProtocolError};
use crate::state::{Area, ConnectionState};

type HubStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long the server may take to answer the handshake.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// How long `stop` waits for the connection task to wind down.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Hub endpoint, e.g. `wss://host/hubs/main`.
    pub hub_url: String,
    pub backoff: BackoffPolicy,
    /// Interval between client keepalive pings.
    pub keepalive_interval: Duration,
}

impl SyncConfig {
    pub fn new(hub_url: impl Into<String>) -> Self {
        Self {
            hub_url: hub_url.into(),
            backoff: BackoffPolicy::default(),
            keepalive_interval: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Failed to connect to hub at {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    #[error("Hub handshake failed: {0}")]
    Handshake(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("Hub transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Access token is not a valid header value")]
    InvalidToken,

    #[error("Not connected to the hub")]
    NotConnected,
}

enum Command {
    Join {
        area: Area,
        reply: oneshot::Sender<Result<(), SyncError>>,
    },
    Leave {
        area: Area,
        reply: oneshot::Sender<Result<(), SyncError>>,
    },
}

/// Why a session loop returned.
enum SessionEnd {
    Stopped,
    Lost,
}

struct Shared {
    config: SyncConfig,
    stores: Arc<SessionStores>,
    state_tx: watch::Sender<ConnectionState>,
}

impl Shared {
    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
    }
}

struct ActiveConnection {
    area: Area,
    commands: mpsc::UnboundedSender<Command>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Push channel keeping the session stores in sync with other clients.
pub struct SyncChannel {
    shared: Arc<Shared>,
    active: Mutex<Option<ActiveConnection>>,
}

impl SyncChannel {
    pub fn new(config: SyncConfig, stores: Arc<SessionStores>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            shared: Arc::new(Shared {
                config,
                stores,
                state_tx,
            }),
            active: Mutex::new(None),
        }
    }

    /// Subscribe to connection state changes.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    pub fn current_state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    /// Connect with `token` and join `area`.
    ///
    /// Returns immediately when a connection task for `area` is already
    /// running. A failed initial connect leaves the channel disconnected;
    /// only a connection lost after a successful start is retried.
    pub async fn start(&self, area: Area, token: impl Into<String>) -> Result<(), SyncError> {
        let token = token.into();
        let mut active = self.active.lock().await;

        if let Some(conn) = active.as_ref() {
            if conn.area == area && !conn.task.is_finished() {
                tracing::debug!(%area, "Sync channel already running");
                return Ok(());
            }
        }
        if let Some(previous) = active.take() {
            self.shutdown(previous).await;
        }

        self.shared.set_state(ConnectionState::Connecting);
        let mut ws = match open_session(&self.shared, &token).await {
            Ok(ws) => ws,
            Err(e) => {
                self.shared.set_state(ConnectionState::Disconnected);
                return Err(e);
            }
        };
        self.shared.set_state(ConnectionState::Connected { joined: false });

        if let Err(e) = send_frame(&mut ws, protocol::invocation(area.join_target())).await {
            self.shared.set_state(ConnectionState::Disconnected);
            return Err(e);
        }
        self.shared.set_state(ConnectionState::Connected { joined: true });
        tracing::info!(%area, url = %self.shared.config.hub_url, "Joined hub area");

        *active = Some(self.spawn_connection(Some(ws), area, token));
        Ok(())
    }

    /// Join another area on the live connection.
    pub async fn join(&self, area: Area) -> Result<(), SyncError> {
        let (reply, reply_rx) = oneshot::channel();
        {
            let active = self.active.lock().await;
            let conn = active.as_ref().ok_or(SyncError::NotConnected)?;
            if !self.current_state().is_connected() {
                return Err(SyncError::NotConnected);
            }
            conn.commands
                .send(Command::Join { area, reply })
                .map_err(|_| SyncError::NotConnected)?;
        }
        reply_rx.await.map_err(|_| SyncError::NotConnected)?
    }

    /// Leave `area`. Leaving an area that was never joined does nothing.
    pub async fn leave(&self, area: Area) -> Result<(), SyncError> {
        let (reply, reply_rx) = oneshot::channel();
        {
            let active = self.active.lock().await;
            let Some(conn) = active.as_ref() else {
                return Ok(());
            };
            if conn.commands.send(Command::Leave { area, reply }).is_err() {
                return Ok(());
            }
        }
        reply_rx.await.unwrap_or(Ok(()))
    }

    /// Close the connection and cancel any pending reconnect.
    pub async fn stop(&self) {
        if let Some(conn) = self.active.lock().await.take() {
            self.shutdown(conn).await;
        }
        self.shared.set_state(ConnectionState::Disconnected);
    }

    /// Reconnect the current area with a new token: stop, start, join.
    /// Does nothing when the channel is not running.
    ///
    /// When the new connection cannot be opened the error is returned and
    /// the channel keeps retrying with the new token under the backoff
    /// policy, as after a lost connection.
    pub async fn rotate_credentials(&self, token: impl Into<String>) -> Result<(), SyncError> {
        let token = token.into();
        let area = self.active.lock().await.as_ref().map(|conn| conn.area);
        let Some(area) = area else {
            tracing::debug!("No hub connection to rotate credentials for");
            return Ok(());
        };
        tracing::info!(%area, "Rotating hub credentials");
        self.stop().await;

        let Err(e) = self.start(area, token.clone()).await else {
            return Ok(());
        };
        tracing::warn!(error = %e, %area, "Reconnect with rotated credentials failed, retrying");
        let mut active = self.active.lock().await;
        if active.is_none() {
            *active = Some(self.spawn_connection(None, area, token));
        }
        Err(e)
    }

    /// Rotate credentials every time `tokens` yields a new value.
    pub fn watch_credentials(self: &Arc<Self>, mut tokens: watch::Receiver<String>) -> JoinHandle<()> {
        let channel = Arc::clone(self);
        tokio::spawn(async move {
            while tokens.changed().await.is_ok() {
                let token = tokens.borrow_and_update().clone();
                if let Err(e) = channel.rotate_credentials(token).await {
                    tracing::warn!(error = %e, "Credential rotation failed");
                }
            }
            tracing::debug!("Credential source closed");
        })
    }

    // ---- private helpers ----

    /// Spawn the connection task. Without a session it starts in the
    /// reconnect loop.
    fn spawn_connection(&self, ws: Option<HubStream>, area: Area, token: String) -> ActiveConnection {
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_connection(
            Arc::clone(&self.shared),
            ws,
            area,
            token,
            commands_rx,
            cancel.clone(),
        ));
        ActiveConnection {
            area,
            commands,
            cancel,
            task,
        }
    }

    async fn shutdown(&self, conn: ActiveConnection) {
        tracing::info!(area = %conn.area, "Stopping sync channel");
        conn.cancel.cancel();
        if tokio::time::timeout(STOP_TIMEOUT, conn.task).await.is_err() {
            tracing::warn!("Sync channel task did not stop in time");
        }
    }
}

/// Connect, authenticate and complete the hub handshake.
async fn open_session(shared: &Shared, token: &str) -> Result<HubStream, SyncError> {
    let url = authorized_url(&shared.config.hub_url, token);
    let mut request = url.as_str().into_client_request().map_err(|source| SyncError::Connect {
        url: shared.config.hub_url.clone(),
        source,
    })?;
    let bearer = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| SyncError::InvalidToken)?;
    request.headers_mut().insert(AUTHORIZATION, bearer);

    let (mut ws, _response) = connect_async(request).await.map_err(|source| SyncError::Connect {
        url: shared.config.hub_url.clone(),
        source,
    })?;

    send_frame(&mut ws, protocol::handshake_request()).await?;
    let text = match tokio::time::timeout(HANDSHAKE_TIMEOUT, next_text(&mut ws)).await {
        Ok(Some(text)) => text,
        Ok(None) => return Err(SyncError::Handshake("connection closed during handshake".into())),
        Err(_) => return Err(SyncError::Handshake("timed out waiting for handshake response".into())),
    };

    let mut frames = protocol::split_frames(&text);
    let response = frames
        .next()
        .ok_or_else(|| SyncError::Handshake("empty handshake response".into()))?;
    protocol::parse_handshake_response(response)?;
    // Frames that arrived together with the handshake answer.
    for frame in frames {
        handle_frame(shared, frame);
    }

    tracing::debug!(url = %shared.config.hub_url, "Hub handshake complete");
    Ok(ws)
}

/// Connection task: run sessions until stopped, reconnecting in between.
async fn run_connection(
    shared: Arc<Shared>,
    mut session: Option<HubStream>,
    area: Area,
    token: String,
    mut commands: mpsc::UnboundedReceiver<Command>,
    cancel: CancellationToken,
) {
    let mut joined = BTreeSet::from([area]);

    loop {
        let mut ws = match session.take() {
            Some(ws) => ws,
            None => match reconnect(&shared, &token, &joined, &cancel).await {
                Some(ws) => ws,
                None => break,
            },
        };

        match run_session(&shared, &mut ws, &mut joined, &mut commands, &cancel).await {
            SessionEnd::Stopped => {
                let _ = ws.close(None).await;
                break;
            }
            SessionEnd::Lost => {
                tracing::warn!(url = %shared.config.hub_url, "Hub connection lost");
            }
        }
    }

    shared.set_state(ConnectionState::Disconnected);
    tracing::debug!("Sync channel task exited");
}

/// Pump one live connection until it drops or the channel is stopped.
async fn run_session(
    shared: &Shared,
    ws: &mut HubStream,
    joined: &mut BTreeSet<Area>,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    cancel: &CancellationToken,
) -> SessionEnd {
    let period = shared.config.keepalive_interval;
    let mut keepalive = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return SessionEnd::Stopped,

            _ = keepalive.tick() => {
                if let Err(e) = send_frame(ws, protocol::encode(&HubMessage::Ping)).await {
                    tracing::warn!(error = %e, "Keepalive ping failed");
                    return SessionEnd::Lost;
                }
            }

            command = commands.recv() => {
                let Some(command) = command else {
                    return SessionEnd::Stopped;
                };
                if let Err(e) = handle_command(shared, ws, joined, command).await {
                    tracing::warn!(error = %e, "Hub command failed");
                    return SessionEnd::Lost;
                }
            }

            message = ws.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    for frame in protocol::split_frames(&text) {
                        if let Some(reason) = handle_frame(shared, frame) {
                            tracing::info!(reason = ?reason, "Hub closed the connection");
                            return SessionEnd::Lost;
                        }
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(?frame, "Hub WebSocket closed");
                    return SessionEnd::Lost;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Hub receive error");
                    return SessionEnd::Lost;
                }
                None => return SessionEnd::Lost,
            },
        }
    }
}

/// Execute a join/leave. Returns a transport error only when the socket
/// failed, after replying to the caller.
async fn handle_command(
    shared: &Shared,
    ws: &mut HubStream,
    joined: &mut BTreeSet<Area>,
    command: Command,
) -> Result<(), String> {
    let (area, reply, joining) = match command {
        Command::Join { area, reply } => (area, reply, true),
        Command::Leave { area, reply } => (area, reply, false),
    };

    if joined.contains(&area) == joining {
        let _ = reply.send(Ok(()));
        return Ok(());
    }

    let target = if joining {
        area.join_target()
    } else {
        area.leave_target()
    };
    match send_frame(ws, protocol::invocation(target)).await {
        Ok(()) => {
            if joining {
                joined.insert(area);
            } else {
                joined.remove(&area);
            }
            shared.set_state(ConnectionState::Connected {
                joined: !joined.is_empty(),
            });
            tracing::info!(%area, hub_target = target, "Hub group membership changed");
            let _ = reply.send(Ok(()));
            Ok(())
        }
        Err(e) => {
            let message = e.to_string();
            let _ = reply.send(Err(e));
            Err(message)
        }
    }
}

/// Apply one inbound frame. Returns `Some(reason)` for a close frame.
fn handle_frame(shared: &Shared, frame: &str) -> Option<Option<String>> {
    match protocol::decode_frame(frame) {
        Ok(HubMessage::Invocation { target, arguments }) => {
            if let Err(e) = apply_invocation(&shared.stores, &target, &arguments) {
                tracing::warn!(error = %e, "Dropped hub event");
            }
        }
        Ok(HubMessage::Ping) => tracing::trace!("Hub ping"),
        Ok(HubMessage::Close { error }) => return Some(error),
        Ok(HubMessage::Other(kind)) => tracing::trace!(kind, "Ignoring hub frame"),
        Err(e) => tracing::warn!(error = %e, raw_frame = %frame, "Failed to parse hub frame"),
    }
    None
}

/// Reconnect with backoff and re-join `joined`. `None` once cancelled.
async fn reconnect(
    shared: &Shared,
    token: &str,
    joined: &BTreeSet<Area>,
    cancel: &CancellationToken,
) -> Option<HubStream> {
    let mut attempt = 0u32;

    loop {
        attempt = attempt.saturating_add(1);
        let delay = shared.config.backoff.next_delay(attempt);
        shared.set_state(ConnectionState::Reconnecting { attempt });
        tracing::info!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Reconnecting to hub",
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Reconnect cancelled");
                return None;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => return None,
            result = open_session(shared, token) => result,
        };

        match result {
            Ok(mut ws) => match rejoin(&mut ws, joined).await {
                Ok(()) => {
                    shared.set_state(ConnectionState::Connected {
                        joined: !joined.is_empty(),
                    });
                    tracing::info!(attempt, "Reconnected to hub");
                    return Some(ws);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Reconnect attempt {attempt} failed to re-join");
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Reconnect attempt {attempt} failed");
            }
        }
    }
}

async fn rejoin(ws: &mut HubStream, joined: &BTreeSet<Area>) -> Result<(), SyncError> {
    for area in joined {
        send_frame(ws, protocol::invocation(area.join_target())).await?;
    }
    Ok(())
}

async fn send_frame(ws: &mut HubStream, frame: String) -> Result<(), SyncError> {
    ws.send(Message::Text(frame)).await?;
    Ok(())
}

/// Next text message, skipping control frames. `None` when the socket
/// closes or fails.
async fn next_text(ws: &mut HubStream) -> Option<String> {
    while let Some(message) = ws.next().await {
        match message {
            Ok(Message::Text(text)) => return Some(text),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => {}
        }
    }
    None
}

/// Append the token as the `access_token` query parameter. WebSocket
/// clients in browsers cannot set headers, so hubs accept either.
fn authorized_url(hub_url: &str, token: &str) -> String {
    let separator = if hub_url.contains('?') { '&' } else { '?' };
    format!("{hub_url}{separator}access_token={token}")
}
