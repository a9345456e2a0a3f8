//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use samtv_config::ConfigError;
use samtv_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const UNSUPPORTED: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the TV")]
    #[diagnostic(
        code(samtv::connection_failed),
        help(
            "Check that the TV is on the same network and has network standby enabled.\n\
             {reason}"
        )
    )]
    ConnectionFailed { reason: String },

    #[error("Remote channel is not connected")]
    #[diagnostic(code(samtv::not_connected), help("Run: samtv pair"))]
    NotConnected,

    // ── Authorization ────────────────────────────────────────────────
    #[error("The TV has not approved this client")]
    #[diagnostic(
        code(samtv::not_authorized),
        help(
            "Accept the access prompt on the TV screen, then run: samtv pair\n\
             If no prompt appears, check Settings > General > External Device Manager."
        )
    )]
    NotAuthorized,

    // ── Timing ───────────────────────────────────────────────────────
    #[error("The TV did not answer within {timeout_ms}ms")]
    #[diagnostic(code(samtv::timeout), help("Retry, or raise the probe timeout in the profile."))]
    Timeout { timeout_ms: u64 },

    #[error("The TV did not reach {target} in time ({deadline_ms}ms)")]
    #[diagnostic(
        code(samtv::power_timeout),
        help(
            "A TV that is fully off only wakes over wake-on-LAN; set `mac` in the profile.\n\
             Use --timeout to wait longer."
        )
    )]
    PowerTimeout { target: String, deadline_ms: u64 },

    // ── Capability ───────────────────────────────────────────────────
    #[error("{operation} is not supported by this TV")]
    #[diagnostic(code(samtv::unsupported), help("{reason}"))]
    Unsupported { operation: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("No TV configured")]
    #[diagnostic(
        code(samtv::no_config),
        help(
            "Add one with: samtv config init --host <address>\n\
             Or pass --host / set SAMTV_HOST.\n\
             Config file: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Profile '{name}' not found")]
    #[diagnostic(code(samtv::profile_not_found), help("Available profiles: {available}"))]
    ProfileNotFound { name: String, available: String },

    #[error("Invalid {field}: {reason}")]
    #[diagnostic(code(samtv::validation))]
    Validation { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(code(samtv::config))]
    Config(ConfigError),

    // ── Output ───────────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(samtv::io))]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(code(samtv::json))]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    #[diagnostic(code(samtv::internal))]
    Internal(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::NotConnected => exit_code::CONNECTION,
            Self::NotAuthorized => exit_code::AUTH,
            Self::Timeout { .. } | Self::PowerTimeout { .. } => exit_code::TIMEOUT,
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            Self::NoConfig { .. } | Self::ProfileNotFound { .. } | Self::Validation { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Transport { reason } => Self::ConnectionFailed { reason },
            CoreError::TimedOut { timeout_ms } => Self::Timeout { timeout_ms },
            CoreError::NotAuthorized => Self::NotAuthorized,
            CoreError::PowerChangeTimeout {
                target,
                deadline_ms,
            } => Self::PowerTimeout {
                target,
                deadline_ms,
            },
            CoreError::NotConnected => Self::NotConnected,
            CoreError::Unsupported { operation, reason } => {
                Self::Unsupported { operation, reason }
            }
            CoreError::Config { message } => Self::Validation {
                field: "configuration".into(),
                reason: message,
            },
            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::UnknownProfile { name } => Self::ProfileNotFound {
                name,
                available: "(none)".into(),
            },
            ConfigError::NoProfile => Self::NoConfig {
                path: samtv_config::config_path().display().to_string(),
            },
            other => Self::Config(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_pick_exit_codes() {
        let cases = [
            (CoreError::NotAuthorized, exit_code::AUTH),
            (CoreError::TimedOut { timeout_ms: 1000 }, exit_code::TIMEOUT),
            (
                CoreError::PowerChangeTimeout {
                    target: "on".into(),
                    deadline_ms: 20_000,
                },
                exit_code::TIMEOUT,
            ),
            (
                CoreError::Transport {
                    reason: "refused".into(),
                },
                exit_code::CONNECTION,
            ),
            (
                CoreError::Unsupported {
                    operation: "remote key".into(),
                    reason: "no remote".into(),
                },
                exit_code::UNSUPPORTED,
            ),
            (CoreError::Internal("boom".into()), exit_code::GENERAL),
        ];
        for (core, code) in cases {
            let label = core.to_string();
            assert_eq!(CliError::from(core).exit_code(), code, "{label}");
        }
    }

    #[test]
    fn missing_profile_is_a_usage_error() {
        assert_eq!(CliError::from(ConfigError::NoProfile).exit_code(), exit_code::USAGE);
    }
}
