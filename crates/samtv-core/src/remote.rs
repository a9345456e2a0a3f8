// ── Remote commands ──
//
// High-level intents (what a remote's buttons mean) mapped onto channel
// payloads. Intents with no matching button are accepted and dropped.

use strum::{Display, EnumString};
use tracing::debug;
use url::Url;

use samtv_api::{KeyAction, OutgoingMessage, RemoteChannel, RemoteKey};

use crate::error::CoreError;

/// A logical remote-control action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteIntent {
    Key(NavKey),
    /// Text typed into the focused input field.
    Text(String),
    /// Open the built-in browser at a URL.
    OpenBrowser(Url),
    LaunchApp {
        app_id: String,
        meta_tag: Option<String>,
    },
    /// Relative pointer movement.
    CursorMove { x: i32, y: i32 },
}

/// Remote buttons, named as a user would.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum NavKey {
    Up,
    Down,
    Left,
    Right,
    Select,
    Back,
    Exit,
    PlayPause,
    #[strum(to_string = "info", serialize = "information")]
    Information,
    Rewind,
    FastForward,
    NextTrack,
    PreviousTrack,
    VolumeUp,
    VolumeDown,
    Mute,
}

impl NavKey {
    /// The hardware key this button sends, `None` when the TV has none.
    pub fn remote_key(self) -> Option<RemoteKey> {
        let key = match self {
            Self::Up => RemoteKey::Up,
            Self::Down => RemoteKey::Down,
            Self::Left => RemoteKey::Left,
            Self::Right => RemoteKey::Right,
            Self::Select => RemoteKey::Enter,
            Self::Back => RemoteKey::Return,
            Self::Exit => RemoteKey::Home,
            Self::PlayPause => RemoteKey::PlayBack,
            Self::Information => RemoteKey::Info,
            Self::Rewind => RemoteKey::Rewind,
            Self::FastForward => RemoteKey::FastForward,
            Self::VolumeUp => RemoteKey::VolumeUp,
            Self::VolumeDown => RemoteKey::VolumeDown,
            Self::Mute => RemoteKey::Mute,
            Self::NextTrack | Self::PreviousTrack => return None,
        };
        Some(key)
    }
}

impl RemoteIntent {
    /// The frame for this intent, `None` for a no-op.
    pub fn payload(&self) -> Option<OutgoingMessage> {
        match self {
            Self::Key(key) => key
                .remote_key()
                .map(|k| OutgoingMessage::key(KeyAction::Click, k)),
            Self::Text(text) => Some(OutgoingMessage::text(text)),
            Self::OpenBrowser(url) => Some(OutgoingMessage::open_browser(url)),
            Self::LaunchApp { app_id, meta_tag } => {
                Some(OutgoingMessage::launch_app(app_id.clone(), meta_tag.clone()))
            }
            Self::CursorMove { x, y } => Some(OutgoingMessage::cursor_move(*x, *y)),
        }
    }
}

/// Sends intents over the remote channel, connecting on demand.
#[derive(Clone)]
pub struct RemoteCommandSender {
    channel: RemoteChannel,
    remote_available: bool,
}

impl RemoteCommandSender {
    /// `remote_available` gates key intents, from the TV's capability flags.
    pub fn new(channel: RemoteChannel, remote_available: bool) -> Self {
        Self {
            channel,
            remote_available,
        }
    }

    pub async fn send(&self, intent: &RemoteIntent) -> Result<(), CoreError> {
        if matches!(intent, RemoteIntent::Key(_)) && !self.remote_available {
            return Err(CoreError::Unsupported {
                operation: "remote key".into(),
                reason: "TV reports remote input unavailable".into(),
            });
        }

        let Some(payload) = intent.payload() else {
            debug!(?intent, "no payload for intent, ignoring");
            return Ok(());
        };

        self.channel.ensure_connected().await?;
        self.channel.send_command(&payload).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn button_mapping() {
        let cases = [
            (NavKey::Select, Some(RemoteKey::Enter)),
            (NavKey::Back, Some(RemoteKey::Return)),
            (NavKey::Exit, Some(RemoteKey::Home)),
            (NavKey::PlayPause, Some(RemoteKey::PlayBack)),
            (NavKey::FastForward, Some(RemoteKey::FastForward)),
            (NavKey::NextTrack, None),
            (NavKey::PreviousTrack, None),
        ];
        for (nav, expected) in cases {
            assert_eq!(nav.remote_key(), expected, "{nav}");
        }
    }

    #[test]
    fn key_names_parse() {
        assert_eq!("play-pause".parse::<NavKey>().unwrap(), NavKey::PlayPause);
        assert_eq!("info".parse::<NavKey>().unwrap(), NavKey::Information);
        assert_eq!(NavKey::VolumeUp.to_string(), "volume-up");
    }

    #[test]
    fn keys_are_clicked() {
        let payload = RemoteIntent::Key(NavKey::Up).payload().unwrap();
        assert_eq!(payload, OutgoingMessage::key(KeyAction::Click, RemoteKey::Up));
        assert!(RemoteIntent::Key(NavKey::NextTrack).payload().is_none());
    }

    #[tokio::test]
    async fn track_buttons_are_silent_no_ops() {
        use std::sync::Arc;

        // Nothing listens here; a no-op must not try to connect.
        let mut config = samtv_api::ChannelConfig::new("127.0.0.1", "uuid:tv", "test");
        config.port = Some(9);
        let channel = RemoteChannel::new(config, Arc::new(samtv_api::MemoryCredentialStore::new()));
        let sender = RemoteCommandSender::new(channel.clone(), true);

        sender
            .send(&RemoteIntent::Key(NavKey::PreviousTrack))
            .await
            .unwrap();
        assert_eq!(channel.current_state(), samtv_api::ChannelState::Disconnected);
    }

    #[tokio::test]
    async fn keys_rejected_without_remote_capability() {
        use std::sync::Arc;

        let config = samtv_api::ChannelConfig::new("127.0.0.1", "uuid:tv", "test");
        let channel = RemoteChannel::new(config, Arc::new(samtv_api::MemoryCredentialStore::new()));
        let sender = RemoteCommandSender::new(channel, false);

        let err = sender.send(&RemoteIntent::Key(NavKey::Up)).await.unwrap_err();
        assert!(matches!(err, CoreError::Unsupported { .. }));
    }
}
