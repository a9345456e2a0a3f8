// Remote-control payloads
//
// Outbound frames on the remote channel. Key presses, text and cursor
// moves go through `ms.remote.control`; app launches are `ms.channel.emit`
// events addressed to the host. Field names match the TV's vocabulary
// verbatim, including its capitalisation.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use strum::{Display, EnumString};

/// App id of the built-in web browser.
pub const BROWSER_APP_ID: &str = "org.tizen.browser";

/// Hardware remote keys this client knows how to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
pub enum RemoteKey {
    #[serde(rename = "KEY_POWER")]
    #[strum(serialize = "KEY_POWER")]
    Power,
    #[serde(rename = "KEY_UP")]
    #[strum(serialize = "KEY_UP")]
    Up,
    #[serde(rename = "KEY_DOWN")]
    #[strum(serialize = "KEY_DOWN")]
    Down,
    #[serde(rename = "KEY_LEFT")]
    #[strum(serialize = "KEY_LEFT")]
    Left,
    #[serde(rename = "KEY_RIGHT")]
    #[strum(serialize = "KEY_RIGHT")]
    Right,
    #[serde(rename = "KEY_ENTER")]
    #[strum(serialize = "KEY_ENTER")]
    Enter,
    #[serde(rename = "KEY_RETURN")]
    #[strum(serialize = "KEY_RETURN")]
    Return,
    #[serde(rename = "KEY_HOME")]
    #[strum(serialize = "KEY_HOME")]
    Home,
    #[serde(rename = "KEY_PLAY_BACK")]
    #[strum(serialize = "KEY_PLAY_BACK")]
    PlayBack,
    #[serde(rename = "KEY_INFO")]
    #[strum(serialize = "KEY_INFO")]
    Info,
    #[serde(rename = "KEY_REWIND")]
    #[strum(serialize = "KEY_REWIND")]
    Rewind,
    #[serde(rename = "KEY_FF")]
    #[strum(serialize = "KEY_FF")]
    FastForward,
    #[serde(rename = "KEY_VOLUP")]
    #[strum(serialize = "KEY_VOLUP")]
    VolumeUp,
    #[serde(rename = "KEY_VOLDOWN")]
    #[strum(serialize = "KEY_VOLDOWN")]
    VolumeDown,
    #[serde(rename = "KEY_MUTE")]
    #[strum(serialize = "KEY_MUTE")]
    Mute,
}

/// How a key is pressed.
///
/// `Click` is a full press-and-release. `Press` holds the key down until a
/// matching `Release` (or the TV's own timeout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum KeyAction {
    Press,
    Click,
    Release,
}

// ── Envelope ─────────────────────────────────────────────────────────

/// One outbound frame: `{ "method": ..., "params": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum OutgoingMessage {
    #[serde(rename = "ms.remote.control")]
    RemoteControl(RemoteControl),
    #[serde(rename = "ms.channel.emit")]
    Emit(ChannelEmit),
}

/// `ms.remote.control` parameters, discriminated by `TypeOfRemote`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "TypeOfRemote")]
pub enum RemoteControl {
    SendRemoteKey {
        #[serde(rename = "Cmd")]
        cmd: KeyAction,
        #[serde(rename = "DataOfCmd")]
        key: RemoteKey,
        #[serde(rename = "Option")]
        option: bool,
    },
    SendInputString {
        /// Base64 of the UTF-8 text.
        #[serde(rename = "Cmd")]
        encoded: String,
        #[serde(rename = "DataOfCmd")]
        encoding: &'static str,
    },
    ProcessMouseDevice {
        #[serde(rename = "Cmd")]
        cmd: &'static str,
        x: i32,
        y: i32,
        #[serde(rename = "Time")]
        time: u64,
    },
}

/// `ms.channel.emit` parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelEmit {
    pub event: &'static str,
    pub to: &'static str,
    pub data: AppLaunch,
}

/// Payload of an `ed.apps.launch` event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppLaunch {
    #[serde(rename = "appId")]
    pub app_id: String,
    pub action_type: &'static str,
    #[serde(rename = "metaTag", skip_serializing_if = "Option::is_none")]
    pub meta_tag: Option<String>,
}

impl OutgoingMessage {
    /// A key event.
    pub fn key(cmd: KeyAction, key: RemoteKey) -> Self {
        Self::RemoteControl(RemoteControl::SendRemoteKey {
            cmd,
            key,
            option: false,
        })
    }

    /// Text typed into the focused input field.
    pub fn text(text: &str) -> Self {
        Self::RemoteControl(RemoteControl::SendInputString {
            encoded: BASE64.encode(text.as_bytes()),
            encoding: "base64",
        })
    }

    /// Relative pointer movement.
    pub fn cursor_move(x: i32, y: i32) -> Self {
        Self::RemoteControl(RemoteControl::ProcessMouseDevice {
            cmd: "Move",
            x,
            y,
            time: 0,
        })
    }

    /// Launch an installed app, optionally handing it a meta tag (a URL for the browser).
    pub fn launch_app(app_id: impl Into<String>, meta_tag: Option<String>) -> Self {
        Self::Emit(ChannelEmit {
            event: "ed.apps.launch",
            to: "host",
            data: AppLaunch {
                app_id: app_id.into(),
                action_type: "NATIVE_LAUNCH",
                meta_tag,
            },
        })
    }

    /// Open `url` in the built-in browser.
    pub fn open_browser(url: &url::Url) -> Self {
        Self::launch_app(BROWSER_APP_ID, Some(url.to_string()))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
