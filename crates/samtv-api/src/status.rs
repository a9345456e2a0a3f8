// Device status endpoint
//
// `GET http://<host>:8001/api/v2/` answers with a JSON document describing
// the TV. Power state lives in `device.PowerState`; the capability flags
// arrive as a JSON object serialized into a string (`isSupport`) and need a
// second parse pass.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Port of the unauthenticated status endpoint.
pub const STATUS_PORT: u16 = 8001;

// ── Raw document ─────────────────────────────────────────────────────

/// The status document as the TV sends it.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusDocument {
    pub device: DeviceSection,
    pub id: String,
    pub name: String,
    /// Capability flags, JSON-encoded into a string.
    #[serde(rename = "isSupport", default)]
    pub is_support: Option<String>,
    #[serde(rename = "type", default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// The `device` object inside [`StatusDocument`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSection {
    /// `"on"` or `"standby"`. Absent on firmware that only answers while on.
    #[serde(rename = "PowerState", default)]
    pub power_state: Option<String>,
    #[serde(rename = "TokenAuthSupport", default)]
    pub token_auth_support: Option<String>,
    #[serde(default)]
    pub wifi_mac: Option<String>,
    pub name: String,
    #[serde(default)]
    pub model_name: Option<String>,
    pub id: String,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(rename = "type", default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub firmware_version: Option<String>,
    /// All remaining fields the TV sends.
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

// ── Parsed status ────────────────────────────────────────────────────

/// Power state as reported by a TV that answered the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ReportedPower {
    On,
    Standby,
}

/// Capability flags from the `isSupport` blob (`"true"`/`"false"` strings).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    flags: BTreeMap<String, bool>,
}

impl Capabilities {
    /// Second parse pass over the string-encoded flag object.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let values: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(raw.trim()).map_err(|e| Error::Deserialization {
                message: format!("invalid capability flags: {e}"),
                body: raw.to_owned(),
            })?;

        let flags = values
            .into_iter()
            .filter_map(|(name, value)| {
                let enabled = match value {
                    serde_json::Value::Bool(b) => b,
                    serde_json::Value::String(s) => s.eq_ignore_ascii_case("true"),
                    _ => return None,
                };
                Some((name, enabled))
            })
            .collect();

        Ok(Self { flags })
    }

    /// A single flag, `None` when the TV did not report it.
    pub fn flag(&self, name: &str) -> Option<bool> {
        self.flags.get(name).copied()
    }

    /// Whether the TV accepts remote key input. Assumed when unreported.
    pub fn remote_available(&self) -> bool {
        self.flag("remote_available").unwrap_or(true)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.flags.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

/// Result of a successful probe.
#[derive(Debug, Clone)]
pub struct DeviceStatus {
    pub power: ReportedPower,
    /// Stable identifier (`uuid:...`) of the TV.
    pub id: String,
    /// Friendly name from the top-level document.
    pub name: String,
    pub model_name: Option<String>,
    pub wifi_mac: Option<String>,
    pub token_auth_supported: bool,
    pub capabilities: Capabilities,
    pub document: StatusDocument,
}

impl TryFrom<StatusDocument> for DeviceStatus {
    type Error = Error;

    fn try_from(doc: StatusDocument) -> Result<Self, Error> {
        let power = match doc.device.power_state.as_deref() {
            Some("on") | None => ReportedPower::On,
            Some("standby") => ReportedPower::Standby,
            Some(other) => {
                return Err(Error::Deserialization {
                    message: format!("unknown PowerState {other:?}"),
                    body: String::new(),
                });
            }
        };

        let capabilities = match doc.is_support.as_deref() {
            Some(raw) => Capabilities::parse(raw)?,
            None => Capabilities::default(),
        };

        Ok(Self {
            power,
            id: doc.id.clone(),
            name: doc.name.clone(),
            model_name: doc.device.model_name.clone(),
            wifi_mac: doc.device.wifi_mac.clone(),
            token_auth_supported: doc.device.token_auth_support.as_deref() == Some("true"),
            capabilities,
            document: doc,
        })
    }
}

// ── Probe ────────────────────────────────────────────────────────────

/// Bounded-time client for the status endpoint.
///
/// Every probe runs under [`tokio::time::timeout`]: when the deadline
/// passes the request future is dropped, which aborts the in-flight HTTP
/// exchange, so a hung TV never holds the caller past `timeout`.
#[derive(Debug, Clone)]
pub struct StatusProbe {
    http: reqwest::Client,
    url: Url,
}

impl StatusProbe {
    /// Probe for the TV at `host` (IP address or hostname, no port).
    pub fn for_host(host: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let url = status_url(host)?;
        Ok(Self {
            http: transport.build_client()?,
            url,
        })
    }

    /// Probe a fully specified status URL with a pre-built client.
    pub fn with_client(http: reqwest::Client, url: Url) -> Self {
        Self { http, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Issue one status request, giving up after `timeout`.
    pub async fn probe(&self, timeout: Duration) -> Result<DeviceStatus, Error> {
        match tokio::time::timeout(timeout, self.fetch()).await {
            Ok(result) => result,
            Err(_) => {
                trace!(url = %self.url, "status probe timed out");
                Err(Error::Timeout {
                    timeout_ms: duration_ms(timeout),
                })
            }
        }
    }

    async fn fetch(&self) -> Result<DeviceStatus, Error> {
        debug!("GET {}", self.url);

        let resp = self
            .http
            .get(self.url.clone())
            .send()
            .await
            .map_err(map_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.map_err(map_reqwest)?;
        let doc: StatusDocument = serde_json::from_str(&body).map_err(|e| {
            let preview = body
                .char_indices()
                .nth(200)
                .map_or(body.as_str(), |(i, _)| &body[..i]);
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })?;

        DeviceStatus::try_from(doc)
    }
}

/// `http://<host>:8001/api/v2/`, bracketing bare IPv6 literals.
pub fn status_url(host: &str) -> Result<Url, Error> {
    let host = if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]")
    } else {
        host.to_owned()
    };
    Ok(Url::parse(&format!("http://{host}:{STATUS_PORT}/api/v2/"))?)
}

fn map_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout { timeout_ms: 0 }
    } else {
        Error::Transport(e)
    }
}

pub(crate) fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
