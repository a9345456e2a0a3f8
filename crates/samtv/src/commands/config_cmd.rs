//! `samtv config`: runs without contacting a TV, except `init` which reads
//! the device's identity unless `--no-probe` is given.

use tracing::warn;

use samtv_config::{ConfigError, Profile, profile_to_tv_config};
use samtv_core::{MacAddress, Television};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, InitArgs, OutputFormat};
use crate::config::{self, config_path, save_config};
use crate::error::CliError;
use crate::output::print_output;

pub async fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            print_output(&config_path().display().to_string(), global.quiet);
            Ok(())
        }
        ConfigCommand::Show => {
            let cfg = config::load()?;
            let rendered = match config::output_format(global, &cfg) {
                OutputFormat::Json => serde_json::to_string_pretty(&cfg)?,
                OutputFormat::JsonCompact => serde_json::to_string(&cfg)?,
                OutputFormat::Table | OutputFormat::Plain => {
                    toml::to_string_pretty(&cfg).map_err(ConfigError::from)?
                }
            };
            print_output(&rendered, global.quiet);
            Ok(())
        }
        ConfigCommand::Init(init_args) => init(init_args, global).await,
    }
}

async fn init(args: InitArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = config::load()?;

    let host = args.host.trim();
    if host.is_empty() {
        return Err(CliError::Validation {
            field: "host".into(),
            reason: "must not be empty".into(),
        });
    }
    let mut profile = Profile::new(host);

    if let Some(raw) = &args.mac {
        let mac: MacAddress = raw.parse().map_err(|_| CliError::Validation {
            field: "mac".into(),
            reason: format!("not a MAC address: {raw}"),
        })?;
        profile.mac = Some(mac.to_string());
    }
    if global.plaintext {
        profile.plaintext = Some(true);
    }

    if !args.no_probe {
        let tv_config = profile_to_tv_config(&profile, &cfg.defaults, cfg.storage_dir())?;
        match Television::discover(&tv_config).await {
            Ok(descriptor) => {
                profile.id = Some(descriptor.id);
                profile.name = Some(descriptor.name);
                if profile.mac.is_none() {
                    profile.mac = descriptor.mac.as_ref().map(ToString::to_string);
                }
            }
            Err(e) if e.is_unreachable() => {
                warn!(host, error = %e, "TV not answering, saving profile without device details");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let default_missing = cfg
        .default_profile
        .as_ref()
        .is_none_or(|name| !cfg.profiles.contains_key(name));
    cfg.profiles.insert(args.name.clone(), profile);
    if default_missing {
        cfg.default_profile = Some(args.name.clone());
    }

    let path = save_config(&cfg)?;
    print_output(
        &format!("Saved profile '{}' to {}", args.name, path.display()),
        global.quiet,
    );
    Ok(())
}
