use std::collections::HashMap;
use std::sync::Mutex;

use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// Format version of persisted credentials. Records carrying any other
/// version are treated as absent.
pub const CREDENTIAL_VERSION: u32 = 1;

/// Session token issued by the TV on the first approved connection.
///
/// Presenting it on later connections skips the on-screen approval prompt.
#[derive(Debug, Clone)]
pub struct Credential {
    pub version: u32,
    pub token: SecretString,
}

impl Credential {
    /// Wrap a token at the current format version.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            version: CREDENTIAL_VERSION,
            token: SecretString::from(token.into()),
        }
    }

    pub fn expose(&self) -> &str {
        self.token.expose_secret()
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version && self.expose() == other.expose()
    }
}

impl Eq for Credential {}

/// Durable storage for one credential per device identifier.
///
/// Keyed by the device's stable identifier, never its address. Writes are
/// last-wins. Implementations never fail a `load`: anything unreadable is
/// reported as absent so the caller falls back to an unauthenticated
/// connection. The channel calls both methods on the blocking thread pool,
/// so implementations may do synchronous I/O.
pub trait CredentialStore: Send + Sync {
    fn load(&self, device_id: &str) -> Option<Credential>;

    fn save(&self, device_id: &str, credential: &Credential) -> Result<(), Error>;
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    tokens: Mutex<HashMap<String, Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self, device_id: &str) -> Option<Credential> {
        let tokens = self.tokens.lock().ok()?;
        tokens.get(device_id).cloned()
    }

    fn save(&self, device_id: &str, credential: &Credential) -> Result<(), Error> {
        let mut tokens = self
            .tokens
            .lock()
            .map_err(|_| Error::Io(std::io::Error::other("credential map poisoned")))?;
        tokens.insert(device_id.to_owned(), credential.clone());
        Ok(())
    }
}
