//! Shared configuration for samtv.
//!
//! TOML profiles (one per TV), timing defaults with per-profile overrides,
//! and translation to `samtv_core::TvConfig`. The CLI adds flag-aware
//! wrappers on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use samtv_core::{MacAddress, PowerTiming, TlsMode, TvConfig};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found in config")]
    UnknownProfile { name: String },

    #[error("no TV configured -- pass --host or run `samtv config init`")]
    NoProfile,

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named.
    pub default_profile: Option<String>,

    /// Where credential files live. Platform data dir when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named TV profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            storage_dir: None,
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_wake_interval_ms")]
    pub wake_interval_ms: u64,

    #[serde(default = "default_power_deadline_ms")]
    pub power_deadline_ms: u64,

    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            probe_timeout_ms: default_probe_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            wake_interval_ms: default_wake_interval_ms(),
            power_deadline_ms: default_power_deadline_ms(),
            cooldown_ms: default_cooldown_ms(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_probe_timeout_ms() -> u64 {
    1_000
}
fn default_poll_interval_ms() -> u64 {
    400
}
fn default_wake_interval_ms() -> u64 {
    1_000
}
fn default_power_deadline_ms() -> u64 {
    20_000
}
fn default_cooldown_ms() -> u64 {
    1_000
}
fn default_handshake_timeout_ms() -> u64 {
    30_000
}

/// A named TV profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// IP address or hostname of the TV.
    pub host: String,

    /// Hardware address for wake-on-LAN (taken from the TV when unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,

    /// Stable device id (`uuid:...`), recorded by `config init`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Display name override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Name shown on the TV's approval prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,

    /// Use `ws://` on port 8001 instead of TLS on 8002.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plaintext: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_timeout_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wake_interval_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_deadline_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handshake_timeout_ms: Option<u64>,
}

impl Profile {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "samtv", "samtv")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default directory for credential files.
pub fn data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".local/share"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

fn dirs_fallback(base: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(base);
    p.push("samtv");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
///
/// Environment variables use `SAMTV_` with `__` between levels, e.g.
/// `SAMTV_DEFAULTS__POLL_INTERVAL_MS=250`.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file, still layering the environment on top.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SAMTV_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(&path, cfg)?;
    Ok(path)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Profile resolution ──────────────────────────────────────────────

impl Config {
    /// Pick the named profile, else the default one, else the only one.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        if let Some(name) = name {
            return self
                .profiles
                .get(name)
                .map(|p| (name.to_owned(), p))
                .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() });
        }

        if let Some(default) = self.default_profile.as_deref() {
            if let Some(profile) = self.profiles.get(default) {
                return Ok((default.to_owned(), profile));
            }
        }

        let mut profiles = self.profiles.iter();
        match (profiles.next(), profiles.next()) {
            (Some((name, profile)), None) => Ok((name.clone(), profile)),
            _ => Err(ConfigError::NoProfile),
        }
    }

    /// Credential directory in effect.
    pub fn storage_dir(&self) -> PathBuf {
        self.storage_dir.clone().unwrap_or_else(data_dir)
    }
}

/// Build a `TvConfig` from a profile and the global defaults.
pub fn profile_to_tv_config(
    profile: &Profile,
    defaults: &Defaults,
    storage_dir: PathBuf,
) -> Result<TvConfig, ConfigError> {
    if profile.host.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "host".into(),
            reason: "must not be empty".into(),
        });
    }

    let mac = profile
        .mac
        .as_deref()
        .map(|raw| {
            raw.parse::<MacAddress>()
                .map_err(|_| ConfigError::Validation {
                    field: "mac".into(),
                    reason: format!("not a MAC address: {raw}"),
                })
        })
        .transpose()?;

    let ms = |value: Option<u64>, fallback: u64| Duration::from_millis(value.unwrap_or(fallback));
    let timing = PowerTiming {
        probe_timeout: ms(profile.probe_timeout_ms, defaults.probe_timeout_ms),
        poll_interval: ms(profile.poll_interval_ms, defaults.poll_interval_ms),
        wake_interval: ms(profile.wake_interval_ms, defaults.wake_interval_ms),
        deadline: ms(profile.power_deadline_ms, defaults.power_deadline_ms),
        cooldown: ms(profile.cooldown_ms, defaults.cooldown_ms),
    };
    if timing.poll_interval.is_zero() || timing.wake_interval.is_zero() {
        return Err(ConfigError::Validation {
            field: "poll_interval_ms / wake_interval_ms".into(),
            reason: "must be greater than zero".into(),
        });
    }

    let mut config = TvConfig::new(profile.host.trim(), storage_dir);
    config.mac = mac;
    config.device_id.clone_from(&profile.id);
    config.name.clone_from(&profile.name);
    config.client_name.clone_from(&profile.client_name);
    config.tls = if profile.plaintext.unwrap_or(false) {
        TlsMode::Plaintext
    } else {
        TlsMode::DangerAcceptInvalid
    };
    config.handshake_timeout = ms(profile.handshake_timeout_ms, defaults.handshake_timeout_ms);
    config.timing = timing;
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn write(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(cfg.defaults, Defaults::default());
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn profile_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            r#"
default_profile = "living"

[defaults]
poll_interval_ms = 250

[profiles.living]
host = "192.168.1.20"
mac = "64:1c:ae:00:11:22"
power_deadline_ms = 30000
"#,
        );

        let cfg = load_config_from(&path).unwrap();
        let (name, profile) = cfg.profile(None).unwrap();
        assert_eq!(name, "living");

        let tv = profile_to_tv_config(profile, &cfg.defaults, dir.path().into()).unwrap();
        assert_eq!(tv.host, "192.168.1.20");
        assert_eq!(tv.mac.unwrap().to_string(), "64:1c:ae:00:11:22");
        assert_eq!(tv.timing.poll_interval, Duration::from_millis(250));
        assert_eq!(tv.timing.deadline, Duration::from_secs(30));
        assert_eq!(tv.timing.cooldown, Duration::from_secs(1));
        assert_eq!(tv.tls, TlsMode::DangerAcceptInvalid);
    }

    #[test]
    fn single_profile_is_picked_without_default() {
        let mut cfg = Config {
            default_profile: None,
            ..Config::default()
        };
        cfg.profiles.insert("den".into(), Profile::new("10.0.0.9"));

        assert_eq!(cfg.profile(None).unwrap().0, "den");
        assert!(matches!(
            cfg.profile(Some("attic")),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn no_profiles_is_an_error() {
        assert!(matches!(
            Config::default().profile(None),
            Err(ConfigError::NoProfile)
        ));
    }

    #[test]
    fn bad_mac_is_rejected() {
        let mut profile = Profile::new("10.0.0.9");
        profile.mac = Some("not-a-mac".into());

        let err = profile_to_tv_config(&profile, &Defaults::default(), PathBuf::from("/tmp"));
        assert!(matches!(err, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");
        let mut cfg = Config::default();
        let mut profile = Profile::new("192.168.1.30");
        profile.id = Some("uuid:abc".into());
        cfg.profiles.insert("default".into(), profile);

        save_config_to(&path, &cfg).unwrap();
        let loaded = load_config_from(&path).unwrap();

        assert_eq!(loaded.profiles, cfg.profiles);
        assert_eq!(loaded.default_profile.as_deref(), Some("default"));
    }
}
