//! Remote-control channel with deduplicated connects.
//!
//! Opens the TV's `samsung.remote.control` WebSocket, presents the stored
//! token (if any), waits for the `ms.channel.connect` event and persists a
//! freshly issued token before declaring the session ready. Each live
//! connection is a [`Session`] owned by a background task that is the only
//! code touching the socket; callers hand it frames through a channel.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use samtv_api::{ChannelConfig, MemoryCredentialStore, OutgoingMessage, RemoteChannel};
//! use samtv_api::remote::{KeyAction, RemoteKey};
//!
//! let config = ChannelConfig::new("192.168.1.20", "uuid:...", "samtv - Living Room");
//! let channel = RemoteChannel::new(config, Arc::new(MemoryCredentialStore::new()));
//!
//! channel.ensure_connected().await?;
//! channel
//!     .send_command(&OutgoingMessage::key(KeyAction::Click, RemoteKey::Home))
//!     .await?;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::auth::{Credential, CredentialStore};
use crate::error::{ConnectError, Error};
use crate::remote::OutgoingMessage;
use crate::status::duration_ms;
use crate::transport::{TlsMode, ws_connector};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Attempt = Shared<BoxFuture<'static, Result<SessionHandle, ConnectError>>>;

/// Path of the remote-control channel on the TV.
pub const CHANNEL_PATH: &str = "/api/v2/channels/samsung.remote.control";

const OUTBOUND_CAPACITY: usize = 32;

// ── ChannelState ─────────────────────────────────────────────────────

/// Lifecycle of the channel, observable through [`RemoteChannel::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Authenticating,
    Ready,
    Failed,
}

// ── ChannelConfig ────────────────────────────────────────────────────

/// Where and as whom to connect.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub host: String,
    /// Overrides the port implied by `tls`.
    pub port: Option<u16>,
    pub tls: TlsMode,
    /// Shown on the TV's approval prompt (sent base64-encoded).
    pub client_name: String,
    /// Key under which the session token is persisted.
    pub device_id: String,
    /// Upper bound on TCP + TLS + WebSocket handshake + approval wait.
    pub handshake_timeout: Duration,
}

impl ChannelConfig {
    pub fn new(
        host: impl Into<String>,
        device_id: impl Into<String>,
        client_name: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: None,
            tls: TlsMode::default(),
            client_name: client_name.into(),
            device_id: device_id.into(),
            handshake_timeout: Duration::from_secs(30),
        }
    }

    /// Channel URL, with `token` appended when one is known.
    pub fn url(&self, token: Option<&str>) -> Result<Url, Error> {
        let port = self.port.unwrap_or_else(|| self.tls.default_port());
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        let mut url = Url::parse(&format!(
            "{}://{host}:{port}{CHANNEL_PATH}",
            self.tls.scheme()
        ))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("name", &BASE64.encode(self.client_name.as_bytes()));
            if let Some(token) = token {
                query.append_pair("token", token);
            }
        }
        Ok(url)
    }
}

// ── Inbound events ───────────────────────────────────────────────────

/// An inbound frame, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// `ms.channel.connect`: the channel is ready. `token` is present only
    /// when the TV issued a new one.
    ChannelConnected {
        client_id: String,
        token: Option<String>,
    },
    /// `ms.channel.unauthorized`: the user denied access.
    Unauthorized,
    /// `ms.channel.timeOut`: the approval prompt went unanswered.
    ApprovalTimedOut,
    /// `ms.error`.
    Error { message: String },
    Unknown { event: String },
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Classify a text frame. `None` when the frame is not an event envelope.
pub fn classify(text: &str) -> Option<ChannelEvent> {
    let raw: RawEvent = match serde_json::from_str(text) {
        Ok(raw) => raw,
        Err(e) => {
            debug!(error = %e, "failed to parse channel frame");
            return None;
        }
    };

    let event = match raw.event.as_str() {
        "ms.channel.connect" => ChannelEvent::ChannelConnected {
            client_id: raw.data["id"].as_str().unwrap_or_default().to_owned(),
            token: raw.data["token"].as_str().map(String::from),
        },
        "ms.channel.unauthorized" => ChannelEvent::Unauthorized,
        "ms.channel.timeOut" => ChannelEvent::ApprovalTimedOut,
        "ms.error" => ChannelEvent::Error {
            message: raw.data["message"]
                .as_str()
                .unwrap_or("unknown error")
                .to_owned(),
        },
        _ => ChannelEvent::Unknown { event: raw.event },
    };
    Some(event)
}

// ── Session ──────────────────────────────────────────────────────────

/// Whether the TV admitted the session on a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Unauthenticated,
    Authenticated,
}

struct OutboundFrame {
    text: String,
    ack: oneshot::Sender<Result<(), ConnectError>>,
}

/// One ready connection. Replaced wholesale on reconnect.
#[derive(Debug)]
pub struct Session {
    generation: u64,
    client_id: String,
    auth: AuthStatus,
    credential: Option<Credential>,
    outbound: mpsc::Sender<OutboundFrame>,
    closed: CancellationToken,
}

impl std::fmt::Debug for OutboundFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundFrame").finish_non_exhaustive()
    }
}

/// Shared handle to the ready session.
pub type SessionHandle = Arc<Session>;

impl Session {
    /// Monotonic connect counter; a reconnect always yields a larger value.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Client id the TV assigned in `ms.channel.connect`.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn auth(&self) -> AuthStatus {
        self.auth
    }

    /// Token the session was admitted with (stored or freshly issued).
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn is_open(&self) -> bool {
        !self.closed.is_cancelled()
    }

    /// Write one frame and wait until the socket accepted it.
    pub async fn send(&self, message: &OutgoingMessage) -> Result<(), Error> {
        let text = message.to_json()?;
        let (ack, done) = oneshot::channel();
        self.outbound
            .send(OutboundFrame { text, ack })
            .await
            .map_err(|_| Error::NotConnected)?;
        done.await.map_err(|_| Error::NotConnected)??;
        Ok(())
    }
}

// ── RemoteChannel ────────────────────────────────────────────────────

/// The single remote-control connection to one TV.
///
/// Cheaply cloneable via `Arc<ChannelInner>`. Concurrent
/// [`ensure_connected`](Self::ensure_connected) calls share one in-flight
/// attempt and observe the same outcome.
#[derive(Clone)]
pub struct RemoteChannel {
    inner: Arc<ChannelInner>,
}

struct ChannelInner {
    config: ChannelConfig,
    credentials: Arc<dyn CredentialStore>,
    state: watch::Sender<ChannelState>,
    slot: Mutex<SessionSlot>,
    /// Parent of every session token; cancelled only by `shutdown`.
    cancel: CancellationToken,
    generation: AtomicU64,
}

#[derive(Default)]
struct SessionSlot {
    session: Option<SessionHandle>,
    pending: Option<Attempt>,
}

impl ChannelInner {
    fn set_state(&self, state: ChannelState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            trace!(from = %current, to = %state, "channel state");
            *current = state;
            true
        });
    }
}

impl RemoteChannel {
    pub fn new(config: ChannelConfig, credentials: Arc<dyn CredentialStore>) -> Self {
        let (state, _) = watch::channel(ChannelState::Disconnected);
        Self {
            inner: Arc::new(ChannelInner {
                config,
                credentials,
                state,
                slot: Mutex::new(SessionSlot::default()),
                cancel: CancellationToken::new(),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.inner.config
    }

    /// Subscribe to channel state transitions.
    pub fn state(&self) -> watch::Receiver<ChannelState> {
        self.inner.state.subscribe()
    }

    pub fn current_state(&self) -> ChannelState {
        *self.inner.state.borrow()
    }

    /// Return the ready session, connecting first if there is none.
    ///
    /// Joins an attempt already in flight instead of opening a second
    /// socket. A failed attempt is not retried here; the next call starts
    /// a fresh one.
    ///
    /// The attempt runs on its own task, so it finishes (and persists any
    /// issued token) even if every caller stops waiting.
    pub async fn ensure_connected(&self) -> Result<SessionHandle, Error> {
        let attempt = {
            let mut slot = self.inner.slot.lock().await;
            if let Some(session) = slot.session.as_ref().filter(|s| s.is_open()) {
                return Ok(Arc::clone(session));
            }
            slot.session = None;

            // A finished attempt still parked here died before clearing the slot.
            if slot.pending.as_ref().is_some_and(|p| p.peek().is_some()) {
                slot.pending = None;
            }

            if let Some(pending) = &slot.pending {
                debug!("joining in-flight connect attempt");
                pending.clone()
            } else {
                let attempt = spawn_connect(Arc::clone(&self.inner));
                slot.pending = Some(attempt.clone());
                attempt
            }
        };

        Ok(attempt.await?)
    }

    /// Send one frame on the ready session.
    ///
    /// Fails with [`Error::NotConnected`] when there is none; frames are
    /// never queued across reconnects.
    pub async fn send_command(&self, message: &OutgoingMessage) -> Result<(), Error> {
        let session = {
            let slot = self.inner.slot.lock().await;
            slot.session
                .as_ref()
                .filter(|s| s.is_open())
                .cloned()
                .ok_or(Error::NotConnected)?
        };
        session.send(message).await
    }

    /// Drop the current session. The next `ensure_connected` reconnects.
    pub async fn close(&self) {
        let session = self.inner.slot.lock().await.session.take();
        if let Some(session) = session {
            debug!(generation = session.generation, "closing session");
            session.closed.cancel();
        }
        self.inner.set_state(ChannelState::Failed);
    }

    /// Tear down the session and abort any in-flight attempt for good.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let mut slot = self.inner.slot.lock().await;
        slot.session = None;
        slot.pending = None;
        self.inner.set_state(ChannelState::Disconnected);
    }
}

// ── Connect attempt ──────────────────────────────────────────────────

fn spawn_connect(inner: Arc<ChannelInner>) -> Attempt {
    let task = tokio::spawn(connect(inner));
    async move {
        task.await.unwrap_or_else(|e| {
            if e.is_cancelled() {
                Err(ConnectError::Shutdown)
            } else {
                warn!(error = %e, "connect task failed");
                Err(ConnectError::WebSocket(format!("connect task failed: {e}")))
            }
        })
    }
    .boxed()
    .shared()
}

/// One shared connect attempt. Installs the session on success and always
/// clears the pending slot.
async fn connect(inner: Arc<ChannelInner>) -> Result<SessionHandle, ConnectError> {
    let result = tokio::select! {
        biased;
        () = inner.cancel.cancelled() => Err(ConnectError::Shutdown),
        result = handshake(&inner) => result,
    };

    let mut slot = inner.slot.lock().await;
    slot.pending = None;
    match result {
        Ok(session) => {
            if session.is_open() {
                slot.session = Some(Arc::clone(&session));
                inner.set_state(ChannelState::Ready);
                info!(
                    host = %inner.config.host,
                    generation = session.generation,
                    "remote channel ready"
                );
            }
            Ok(session)
        }
        Err(ConnectError::Shutdown) => Err(ConnectError::Shutdown),
        Err(e) => {
            if matches!(e, ConnectError::NotAuthorized) {
                warn!(
                    client = %inner.config.client_name,
                    "you need to allow access for this client on the TV"
                );
            } else {
                warn!(host = %inner.config.host, error = %e, "remote channel connect failed");
            }
            inner.set_state(ChannelState::Failed);
            Err(e)
        }
    }
}

// Credential stores may block on disk I/O.

async fn load_credential(inner: &Arc<ChannelInner>) -> Option<Credential> {
    let store = Arc::clone(&inner.credentials);
    let device_id = inner.config.device_id.clone();
    tokio::task::spawn_blocking(move || store.load(&device_id))
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "credential lookup failed");
            None
        })
}

async fn save_credential(inner: &Arc<ChannelInner>, credential: Credential) {
    let store = Arc::clone(&inner.credentials);
    let device_id = inner.config.device_id.clone();
    let saved = tokio::task::spawn_blocking(move || store.save(&device_id, &credential)).await;
    let device = &inner.config.device_id;
    match saved {
        Ok(Ok(())) => debug!(%device, "saved fresh token"),
        Ok(Err(e)) => warn!(%device, error = %e, "failed to persist token"),
        Err(e) => warn!(%device, error = %e, "credential save task failed"),
    }
}

async fn handshake(inner: &Arc<ChannelInner>) -> Result<SessionHandle, ConnectError> {
    let config = &inner.config;
    inner.set_state(ChannelState::Connecting);

    let stored = load_credential(inner).await;
    let url = config
        .url(stored.as_ref().map(Credential::expose))
        .map_err(|e| ConnectError::WebSocket(e.to_string()))?;
    let connector = ws_connector(config.tls)?;

    info!(
        host = %config.host,
        tls = ?config.tls,
        has_token = stored.is_some(),
        "opening remote channel"
    );

    let timeout = config.handshake_timeout;
    let (ws, client_id, fresh_token) = tokio::time::timeout(timeout, async {
        let (mut ws, _response) = tokio_tungstenite::connect_async_tls_with_config(
            url.as_str(),
            None,
            false,
            connector,
        )
        .await
        .map_err(classify_ws_error)?;

        inner.set_state(ChannelState::Authenticating);
        let (client_id, token) = await_channel_connect(&mut ws).await?;
        Ok::<_, ConnectError>((ws, client_id, token))
    })
    .await
    .map_err(|_| ConnectError::Timeout {
        timeout_ms: duration_ms(timeout),
    })??;

    let credential = match fresh_token {
        Some(token) => {
            let credential = Credential::new(token);
            save_credential(inner, credential.clone()).await;
            Some(credential)
        }
        None => stored,
    };

    let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
    let closed = inner.cancel.child_token();
    let generation = inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
    let session = Arc::new(Session {
        generation,
        client_id,
        auth: if credential.is_some() {
            AuthStatus::Authenticated
        } else {
            AuthStatus::Unauthenticated
        },
        credential,
        outbound,
        closed: closed.clone(),
    });

    tokio::spawn(run_session(
        Arc::clone(inner),
        ws,
        outbound_rx,
        closed,
        generation,
    ));

    Ok(session)
}

/// Read frames until the TV admits or rejects us.
async fn await_channel_connect(
    ws: &mut WsStream,
) -> Result<(String, Option<String>), ConnectError> {
    loop {
        let frame = ws.next().await;
        match frame {
            Some(Ok(Message::Text(text))) => match classify(text.as_str()) {
                Some(ChannelEvent::ChannelConnected { client_id, token }) => {
                    return Ok((client_id, token));
                }
                Some(ChannelEvent::Unauthorized | ChannelEvent::ApprovalTimedOut) => {
                    return Err(ConnectError::NotAuthorized);
                }
                Some(ChannelEvent::Error { message }) => {
                    return Err(ConnectError::WebSocket(format!("device error: {message}")));
                }
                Some(ChannelEvent::Unknown { event }) => {
                    debug!(%event, "ignoring event before channel connect");
                }
                None => warn!("dropping malformed frame before channel connect"),
            },
            Some(Ok(Message::Close(frame))) => {
                return Err(match frame {
                    // The TV closes without a status code while the
                    // approval prompt is pending or was declined.
                    None => ConnectError::NotAuthorized,
                    Some(cf) if cf.code == CloseCode::Status => ConnectError::NotAuthorized,
                    Some(cf) => ConnectError::Closed {
                        code: u16::from(cf.code),
                        reason: cf.reason.to_string(),
                    },
                });
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(classify_ws_error(e)),
            None => {
                return Err(ConnectError::Closed {
                    code: 1006,
                    reason: "stream ended before channel connect".into(),
                });
            }
        }
    }
}

fn classify_ws_error(e: tungstenite::Error) -> ConnectError {
    match e {
        // A close frame carrying the reserved 1005 code: the TV's way of
        // refusing an unapproved client.
        tungstenite::Error::Protocol(ProtocolError::InvalidCloseSequence) => {
            ConnectError::NotAuthorized
        }
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            ConnectError::Closed {
                code: 1006,
                reason: "connection closed".into(),
            }
        }
        tungstenite::Error::Http(response) => {
            ConnectError::WebSocket(format!("upgrade rejected with HTTP {}", response.status()))
        }
        other => ConnectError::WebSocket(other.to_string()),
    }
}

// ── Session task ─────────────────────────────────────────────────────

/// Sole owner of the socket for one session.
async fn run_session(
    inner: Arc<ChannelInner>,
    ws: WsStream,
    mut outbound: mpsc::Receiver<OutboundFrame>,
    closed: CancellationToken,
    generation: u64,
) {
    let (mut write, mut read) = ws.split();

    loop {
        tokio::select! {
            biased;
            () = closed.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                break;
            }
            frame = outbound.recv() => {
                let Some(OutboundFrame { text, ack }) = frame else {
                    break;
                };
                trace!(generation, "sending frame");
                let result = write
                    .send(Message::text(text))
                    .await
                    .map_err(|e| ConnectError::WebSocket(e.to_string()));
                let failed = result.is_err();
                let _ = ack.send(result);
                if failed {
                    warn!(generation, "write failed, dropping session");
                    break;
                }
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => dispatch_inbound(generation, text.as_str()),
                    Some(Ok(Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            info!(code = %cf.code, reason = %cf.reason, "remote channel closed by TV");
                        } else {
                            info!("remote channel closed by TV (no payload)");
                        }
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(generation, error = %e, "remote channel transport error");
                        break;
                    }
                    None => {
                        info!(generation, "remote channel stream ended");
                        break;
                    }
                }
            }
        }
    }

    closed.cancel();

    if inner.cancel.is_cancelled() {
        return;
    }
    let mut slot = inner.slot.lock().await;
    if slot
        .session
        .as_ref()
        .is_some_and(|s| s.generation == generation)
    {
        slot.session = None;
    }
    if slot.session.is_none() && slot.pending.is_none() {
        inner.set_state(ChannelState::Failed);
    }
    debug!(generation, "session task exiting");
}

fn dispatch_inbound(generation: u64, text: &str) {
    match classify(text) {
        Some(ChannelEvent::ChannelConnected { client_id, .. }) => {
            debug!(generation, %client_id, "duplicate channel connect");
        }
        Some(ChannelEvent::Error { message }) => {
            warn!(generation, %message, "device reported an error");
        }
        Some(ChannelEvent::Unauthorized | ChannelEvent::ApprovalTimedOut) => {
            warn!(generation, "device revoked access");
        }
        Some(ChannelEvent::Unknown { event }) => {
            debug!(generation, %event, "unhandled channel event");
        }
        None => warn!(generation, "dropping malformed frame"),
    }
}
