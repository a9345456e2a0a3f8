// ── Core error types ──
//
// User-facing errors from samtv-core. Consumers never see HTTP status codes
// or WebSocket internals directly; the `From<samtv_api::Error>` impl
// translates transport-layer errors into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
///
/// `Clone` so a single power-change outcome can be handed to every caller
/// whose request was coalesced into it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    // ── Device errors ────────────────────────────────────────────────
    #[error("Cannot reach TV: {reason}")]
    Transport { reason: String },

    #[error("TV did not answer within {timeout_ms}ms")]
    TimedOut { timeout_ms: u64 },

    #[error("TV has not approved this client -- accept the prompt on the TV screen")]
    NotAuthorized,

    #[error("TV did not reach {target} within {deadline_ms}ms")]
    PowerChangeTimeout { target: String, deadline_ms: u64 },

    #[error("Remote channel is not connected")]
    NotConnected,

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation not supported: {operation} ({reason})")]
    Unsupported { operation: String, reason: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the device could not be contacted at all (as opposed to
    /// rejecting or ignoring a request).
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::TimedOut { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<samtv_api::Error> for CoreError {
    fn from(err: samtv_api::Error) -> Self {
        use samtv_api::ConnectError;

        match err {
            samtv_api::Error::Transport(e) => {
                if e.is_timeout() {
                    CoreError::TimedOut { timeout_ms: 0 }
                } else {
                    CoreError::Transport {
                        reason: e.to_string(),
                    }
                }
            }
            samtv_api::Error::Timeout { timeout_ms } => CoreError::TimedOut { timeout_ms },
            samtv_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            samtv_api::Error::InvalidMac(mac) => CoreError::Config {
                message: format!("Invalid MAC address: {mac}"),
            },
            samtv_api::Error::Tls(msg) => CoreError::Transport {
                reason: format!("TLS error: {msg}"),
            },
            samtv_api::Error::Io(e) => CoreError::Transport {
                reason: e.to_string(),
            },
            samtv_api::Error::HttpStatus { status } => CoreError::Transport {
                reason: format!("status endpoint returned HTTP {status}"),
            },
            samtv_api::Error::Deserialization { message, body: _ } => CoreError::Transport {
                reason: format!("malformed status document: {message}"),
            },
            samtv_api::Error::NotConnected => CoreError::NotConnected,
            samtv_api::Error::Encode(e) => CoreError::Internal(format!("encode error: {e}")),
            samtv_api::Error::Connect(connect) => match connect {
                ConnectError::NotAuthorized => CoreError::NotAuthorized,
                ConnectError::Timeout { timeout_ms } => CoreError::TimedOut { timeout_ms },
                ConnectError::Shutdown => {
                    CoreError::Internal("remote channel shut down".into())
                }
                other => CoreError::Transport {
                    reason: other.to_string(),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_errors_map_to_domain() {
        let err: CoreError = samtv_api::Error::Connect(samtv_api::ConnectError::NotAuthorized).into();
        assert_eq!(err, CoreError::NotAuthorized);

        let err: CoreError = samtv_api::Error::Timeout { timeout_ms: 1000 }.into();
        assert_eq!(err, CoreError::TimedOut { timeout_ms: 1000 });
        assert!(err.is_unreachable());

        let err: CoreError = samtv_api::Error::NotConnected.into();
        assert_eq!(err, CoreError::NotConnected);

        let err: CoreError = samtv_api::Error::HttpStatus { status: 503 }.into();
        assert!(matches!(err, CoreError::Transport { .. }));
    }
}
