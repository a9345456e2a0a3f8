// ── File-backed credential store ──
//
// One JSON file per TV, `samsung-tv-<id>.json`, holding
// `{"version": 1, "token": "..."}`. Loading never fails the caller:
// missing, unreadable, malformed or outdated records all read as absent,
// and a record that could not be read is removed so the next approved
// connection writes a clean one.

use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use samtv_api::{CREDENTIAL_VERSION, Credential, CredentialStore};

#[derive(Debug, Serialize, Deserialize)]
struct StoredCredential {
    version: u32,
    token: String,
}

/// Stores tokens as files under one directory.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the token for `device_id`.
    ///
    /// Bytes outside `[A-Za-z0-9.-]` are written as `_xx` hex escapes, so
    /// distinct ids never share a file.
    pub fn path_for(&self, device_id: &str) -> PathBuf {
        let mut safe = String::with_capacity(device_id.len());
        for byte in device_id.bytes() {
            if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.') {
                safe.push(char::from(byte));
            } else {
                let _ = write!(safe, "_{byte:02x}");
            }
        }
        self.dir.join(format!("samsung-tv-{safe}.json"))
    }

    fn discard(path: &Path) {
        if let Err(e) = std::fs::remove_file(path) {
            debug!(path = %path.display(), error = %e, "could not remove credential file");
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self, device_id: &str) -> Option<Credential> {
        let path = self.path_for(device_id);

        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read auth token");
                Self::discard(&path);
                return None;
            }
        };

        let stored: StoredCredential = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to parse auth token");
                Self::discard(&path);
                return None;
            }
        };

        if stored.version != CREDENTIAL_VERSION {
            warn!(
                version = stored.version,
                "outdated credential file version, re-authenticating"
            );
            return None;
        }

        debug!(device = device_id, "loaded auth token from storage");
        Some(Credential::new(stored.token))
    }

    fn save(&self, device_id: &str, credential: &Credential) -> Result<(), samtv_api::Error> {
        std::fs::create_dir_all(&self.dir)?;
        let record = StoredCredential {
            version: credential.version,
            token: credential.expose().to_owned(),
        };
        let path = self.path_for(device_id);
        std::fs::write(&path, serde_json::to_string(&record)?)?;
        debug!(device = device_id, path = %path.display(), "saved auth token");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ID: &str = "uuid:8a0c3b8e-1111-2222-3333-444455556666";

    #[test]
    fn round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());

        store.save(ID, &Credential::new("12345678")).unwrap();

        assert_eq!(store.load(ID).unwrap().expose(), "12345678");
        assert!(store.load("uuid:someone-else").is_none());
    }

    #[test]
    fn last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());

        store.save(ID, &Credential::new("first")).unwrap();
        store.save(ID, &Credential::new("second")).unwrap();

        assert_eq!(store.load(ID).unwrap().expose(), "second");
    }

    #[test]
    fn file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());
        store.save(ID, &Credential::new("abc")).unwrap();

        let path = store.path_for(ID);
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("samsung-tv-uuid_3a8a0c3b8e")
        );
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value, serde_json::json!({ "version": 1, "token": "abc" }));
    }

    #[test]
    fn ids_differing_only_in_punctuation_keep_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());

        assert_ne!(store.path_for("uuid:a"), store.path_for("uuid_a"));
        assert_ne!(store.path_for("tv/1"), store.path_for("tv:1"));

        store.save("uuid:a", &Credential::new("colon")).unwrap();
        store.save("uuid_a", &Credential::new("underscore")).unwrap();

        assert_eq!(store.load("uuid:a").unwrap().expose(), "colon");
        assert_eq!(store.load("uuid_a").unwrap().expose(), "underscore");
    }

    #[test]
    fn other_version_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());
        let path = store.path_for(ID);
        std::fs::write(&path, r#"{"version":2,"token":"abc"}"#).unwrap();

        assert!(store.load(ID).is_none());
    }

    #[test]
    fn malformed_file_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());
        let path = store.path_for(ID);
        std::fs::write(&path, "{not json").unwrap();

        assert!(store.load(ID).is_none());
        assert!(!path.exists());
    }

    #[test]
    fn save_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("nested/tokens"));

        store.save(ID, &Credential::new("abc")).unwrap();
        assert!(store.load(ID).is_some());
    }
}
