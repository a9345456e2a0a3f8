//! Clap derive structures for the `samtv` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};
use url::Url;

use samtv_core::NavKey;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// samtv -- remote control for Samsung Tizen TVs
#[derive(Debug, Parser)]
#[command(
    name = "samtv",
    version,
    about = "Control Samsung Tizen TVs from the command line",
    long_about = "Power, remote keys, text input and app launches for Samsung Tizen TVs.\n\n\
        Talks to the TV's local status endpoint and remote-control WebSocket;\n\
        wakes a powered-off TV with wake-on-LAN.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// TV profile to use
    #[arg(long, short = 'p', env = "SAMTV_PROFILE", global = true)]
    pub profile: Option<String>,

    /// TV address (overrides profile)
    #[arg(long, env = "SAMTV_HOST", global = true)]
    pub host: Option<String>,

    /// TV hardware address for wake-on-LAN (overrides profile)
    #[arg(long, env = "SAMTV_MAC", global = true)]
    pub mac: Option<String>,

    /// Output format
    #[arg(long, short = 'o', env = "SAMTV_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Power-change deadline in seconds
    #[arg(long, env = "SAMTV_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Use the unencrypted channel (ws:// on port 8001)
    #[arg(long, global = true)]
    pub plaintext: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show power state and device details
    #[command(alias = "st")]
    Status,

    /// Turn the TV on or put it in standby
    Power(PowerArgs),

    /// Press a remote button
    #[command(alias = "k")]
    Key(KeyArgs),

    /// Type text into the focused input field
    Text(TextArgs),

    /// Open a URL in the TV's browser
    Browse(BrowseArgs),

    /// Launch an installed app
    Launch(LaunchArgs),

    /// Move the pointer
    #[command(allow_negative_numbers = true)]
    Cursor(CursorArgs),

    /// Connect and wait for the TV to approve this client
    Pair,

    /// Manage configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Power ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PowerArgs {
    /// Target power state
    pub state: PowerTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PowerTarget {
    On,
    #[value(alias = "standby")]
    Off,
}

// ── Remote input ─────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct KeyArgs {
    /// Button to press
    pub key: KeyName,

    /// Press it this many times
    #[arg(long, short = 'n', default_value_t = 1)]
    pub repeat: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KeyName {
    Up,
    Down,
    Left,
    Right,
    #[value(alias = "enter", alias = "ok")]
    Select,
    Back,
    #[value(alias = "home")]
    Exit,
    PlayPause,
    Info,
    Rewind,
    FastForward,
    NextTrack,
    PreviousTrack,
    VolumeUp,
    VolumeDown,
    Mute,
}

impl From<KeyName> for NavKey {
    fn from(key: KeyName) -> Self {
        match key {
            KeyName::Up => Self::Up,
            KeyName::Down => Self::Down,
            KeyName::Left => Self::Left,
            KeyName::Right => Self::Right,
            KeyName::Select => Self::Select,
            KeyName::Back => Self::Back,
            KeyName::Exit => Self::Exit,
            KeyName::PlayPause => Self::PlayPause,
            KeyName::Info => Self::Information,
            KeyName::Rewind => Self::Rewind,
            KeyName::FastForward => Self::FastForward,
            KeyName::NextTrack => Self::NextTrack,
            KeyName::PreviousTrack => Self::PreviousTrack,
            KeyName::VolumeUp => Self::VolumeUp,
            KeyName::VolumeDown => Self::VolumeDown,
            KeyName::Mute => Self::Mute,
        }
    }
}

#[derive(Debug, Args)]
pub struct TextArgs {
    /// Text to type
    pub text: String,
}

#[derive(Debug, Args)]
pub struct BrowseArgs {
    /// URL to open
    pub url: Url,
}

#[derive(Debug, Args)]
pub struct LaunchArgs {
    /// App id (e.g. 3201907018807 for Netflix)
    pub app_id: String,

    /// Meta tag handed to the app (deep link, URL)
    #[arg(long)]
    pub meta_tag: Option<String>,
}

#[derive(Debug, Args)]
pub struct CursorArgs {
    /// Horizontal movement
    pub x: i32,
    /// Vertical movement
    pub y: i32,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Show the effective configuration
    Show,

    /// Add (or replace) a TV profile
    Init(InitArgs),
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// TV address
    #[arg(long)]
    pub host: String,

    /// Profile name
    #[arg(long, default_value = "default")]
    pub name: String,

    /// Hardware address (read from the TV when omitted)
    #[arg(long)]
    pub mac: Option<String>,

    /// Do not contact the TV; write only what was given
    #[arg(long)]
    pub no_probe: bool,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn every_key_name_maps() {
        for key in KeyName::value_variants() {
            let _ = NavKey::from(*key);
        }
        assert_eq!(NavKey::from(KeyName::Info), NavKey::Information);
    }
}
