// ── Runtime device configuration ──
//
// These types describe *how* to drive one TV: where it is, what to call
// ourselves on its approval prompt, and the poll/deadline pairs the power
// state machine runs on. They never touch disk; the CLI builds them from
// `samtv-config` and hands them in.

use std::path::PathBuf;
use std::time::Duration;

use samtv_api::{MacAddress, TlsMode, WakeConfig};

/// Interval/deadline pairs for power transitions.
///
/// The defaults reflect what the TV tolerates: it answers the status
/// endpoint well within a second, needs several seconds to settle after a
/// power toggle, and ignores toggles that arrive too close together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerTiming {
    /// Upper bound on one status probe.
    pub probe_timeout: Duration,
    /// Gap between probes while waiting for the target state.
    pub poll_interval: Duration,
    /// Gap between wake signals while the TV is unreachable.
    pub wake_interval: Duration,
    /// Ceiling on one whole power-change attempt.
    pub deadline: Duration,
    /// Quiet period after a successful change before the next one runs.
    pub cooldown: Duration,
}

impl Default for PowerTiming {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(1),
            poll_interval: Duration::from_millis(400),
            wake_interval: Duration::from_secs(1),
            deadline: Duration::from_secs(20),
            cooldown: Duration::from_secs(1),
        }
    }
}

/// Everything needed to talk to one TV.
#[derive(Debug, Clone)]
pub struct TvConfig {
    /// IP address or hostname.
    pub host: String,
    /// Hardware address for wake signals. Taken from the status document
    /// when not configured.
    pub mac: Option<MacAddress>,
    /// Stable identifier, used when the TV cannot be probed at startup.
    pub device_id: Option<String>,
    /// Display name override.
    pub name: Option<String>,
    /// Name shown on the TV's approval prompt. Defaults to `samtv - <name>`.
    pub client_name: Option<String>,
    pub tls: TlsMode,
    pub handshake_timeout: Duration,
    pub timing: PowerTiming,
    pub wake: WakeConfig,
    /// Directory holding `samsung-tv-<id>.json` credential files.
    pub storage_dir: PathBuf,
}

impl TvConfig {
    pub fn new(host: impl Into<String>, storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            host: host.into(),
            mac: None,
            device_id: None,
            name: None,
            client_name: None,
            tls: TlsMode::default(),
            handshake_timeout: Duration::from_secs(30),
            timing: PowerTiming::default(),
            wake: WakeConfig::default(),
            storage_dir: storage_dir.into(),
        }
    }
}
