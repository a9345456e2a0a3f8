//! CLI configuration: a thin layer over `samtv_config` that applies
//! `GlobalOpts` overrides (--host, --mac, --timeout, --plaintext).

use std::time::Duration;

use samtv_config::{Config, ConfigError, Profile, profile_to_tv_config};
use samtv_core::TvConfig;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

pub use samtv_config::{config_path, load_config, save_config};

/// Load the config file; a missing file yields defaults.
pub fn load() -> Result<Config, CliError> {
    Ok(load_config()?)
}

/// Build the `TvConfig` for this invocation.
///
/// `--host` works without any config file; with one, it replaces the
/// selected profile's host and keeps the rest.
pub fn resolve_tv_config(global: &GlobalOpts, cfg: &Config) -> Result<TvConfig, CliError> {
    let mut profile = match (cfg.profile(global.profile.as_deref()), global.host.as_deref()) {
        (Ok((_, profile)), host) => {
            let mut profile = profile.clone();
            if let Some(host) = host {
                host.clone_into(&mut profile.host);
            }
            profile
        }
        (Err(ConfigError::NoProfile), Some(host)) => Profile::new(host),
        (Err(ConfigError::UnknownProfile { name }), _) => {
            return Err(CliError::ProfileNotFound {
                name,
                available: available_profiles(cfg),
            });
        }
        (Err(e), _) => return Err(e.into()),
    };

    if let Some(mac) = &global.mac {
        profile.mac = Some(mac.clone());
    }
    if global.plaintext {
        profile.plaintext = Some(true);
    }

    let mut tv = profile_to_tv_config(&profile, &cfg.defaults, cfg.storage_dir())?;
    if let Some(secs) = global.timeout {
        tv.timing.deadline = Duration::from_secs(secs);
    }
    Ok(tv)
}

/// Output format: flag or env first, then the config default.
pub fn output_format(global: &GlobalOpts, cfg: &Config) -> OutputFormat {
    if let Some(format) = global.output {
        return format;
    }
    match cfg.defaults.output.as_str() {
        "json" => OutputFormat::Json,
        "json-compact" => OutputFormat::JsonCompact,
        "plain" => OutputFormat::Plain,
        _ => OutputFormat::Table,
    }
}

fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        return "(none)".into();
    }
    cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
}
