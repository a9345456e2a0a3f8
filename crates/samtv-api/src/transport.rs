// Shared transport configuration.
//
// The status probe speaks plain HTTP through reqwest; the remote channel
// speaks WebSocket over TLS with a verifier that accepts the TV's
// self-signed certificate. Both are built here so callers never touch
// rustls directly.

use std::sync::Arc;
use std::time::Duration;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::{DigitallySignedStruct, SignatureScheme};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_tungstenite::Connector;

use crate::error::{ConnectError, Error};

const USER_AGENT: &str = concat!("samtv/", env!("CARGO_PKG_VERSION"));

/// How the remote channel secures its WebSocket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsMode {
    /// `wss://` on port 8002, any certificate accepted. The TV presents a
    /// self-signed certificate tied to its own identity.
    #[default]
    DangerAcceptInvalid,
    /// `ws://` on port 8001 (pre-token firmware, local test servers).
    Plaintext,
}

impl TlsMode {
    pub fn scheme(self) -> &'static str {
        match self {
            Self::DangerAcceptInvalid => "wss",
            Self::Plaintext => "ws",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Self::DangerAcceptInvalid => 8002,
            Self::Plaintext => 8001,
        }
    }
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Upper bound on a single HTTP request, enforced by reqwest.
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(1),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}

/// Build the WebSocket connector for the given mode.
///
/// Returns `None` for [`TlsMode::Plaintext`] so tungstenite opens a bare TCP stream.
pub(crate) fn ws_connector(mode: TlsMode) -> Result<Option<Connector>, ConnectError> {
    match mode {
        TlsMode::Plaintext => Ok(None),
        TlsMode::DangerAcceptInvalid => {
            let provider = Arc::new(rustls::crypto::ring::default_provider());
            let config = rustls::ClientConfig::builder_with_provider(Arc::clone(&provider))
                .with_safe_default_protocol_versions()
                .map_err(|e| ConnectError::Tls(e.to_string()))?
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate { provider }))
                .with_no_client_auth();
            Ok(Some(Connector::Rustls(Arc::new(config))))
        }
    }
}

// ── Certificate verifier ─────────────────────────────────────────────

/// Skips chain and hostname validation but still checks handshake
/// signatures, so the session key is bound to the presented certificate.
#[derive(Debug)]
struct AcceptAnyCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tls_mode_defaults_to_secure_channel_port() {
        let mode = TlsMode::default();
        assert_eq!(mode.scheme(), "wss");
        assert_eq!(mode.default_port(), 8002);
        assert_eq!(TlsMode::Plaintext.default_port(), 8001);
    }

    #[test]
    fn insecure_connector_builds() {
        let connector = ws_connector(TlsMode::DangerAcceptInvalid);
        assert!(matches!(connector, Ok(Some(Connector::Rustls(_)))));
        assert!(matches!(ws_connector(TlsMode::Plaintext), Ok(None)));
    }
}
