use thiserror::Error;

/// Top-level error type for the `samtv-api` crate.
///
/// Covers every failure mode across the three device surfaces:
/// the HTTP status endpoint, the remote-control WebSocket channel,
/// and the wake-on-LAN broadcast. `samtv-core` maps these into
/// user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request did not complete before its deadline.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// TLS configuration error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Socket-level I/O failure (wake packet send, local bind).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ── Status endpoint ─────────────────────────────────────────────
    /// The status endpoint answered with a non-success HTTP status.
    #[error("Status endpoint returned HTTP {status}")]
    HttpStatus { status: u16 },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Remote channel ──────────────────────────────────────────────
    /// Opening or authenticating the remote channel failed.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// A command was sent while no ready session exists.
    #[error("Remote channel is not connected")]
    NotConnected,

    /// An outbound frame could not be serialized.
    #[error("Failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),

    // ── Input ───────────────────────────────────────────────────────
    /// A hardware address could not be parsed.
    #[error("Invalid MAC address: {0}")]
    InvalidMac(String),
}

impl Error {
    /// Returns `true` if the device asked for on-screen approval of this client.
    pub fn is_not_authorized(&self) -> bool {
        matches!(self, Self::Connect(ConnectError::NotAuthorized))
    }

    /// Returns `true` if the device did not answer before the deadline.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Connect(ConnectError::Timeout { .. }) => true,
            Self::Transport(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::NotConnected => true,
            Self::Connect(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// Failure of a single connect attempt on the remote channel.
///
/// `Clone` because one in-flight attempt is shared by every concurrent
/// caller of [`RemoteChannel::ensure_connected`](crate::RemoteChannel::ensure_connected),
/// and each of them receives the same outcome.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectError {
    /// The TV rejected the connection until the user approves this client
    /// on the TV screen. Resolves only through user action.
    #[error("Access not granted -- allow this client on the TV screen")]
    NotAuthorized,

    /// TLS connector could not be built.
    #[error("TLS setup failed: {0}")]
    Tls(String),

    /// WebSocket handshake or stream failure.
    #[error("WebSocket connection failed: {0}")]
    WebSocket(String),

    /// The device closed the channel before it became ready.
    #[error("WebSocket closed (code {code}): {reason}")]
    Closed { code: u16, reason: String },

    /// No `ms.channel.connect` event arrived before the deadline.
    #[error("Remote channel handshake timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The channel was shut down while the attempt was in flight.
    #[error("Remote channel shut down")]
    Shutdown,
}

impl ConnectError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::WebSocket(_) | Self::Closed { .. } | Self::Timeout { .. }
        )
    }
}
