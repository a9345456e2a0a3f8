// ── Device link ──
//
// The three device operations the power state machine needs, behind a
// trait so the machine can be driven by a scripted TV in tests.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use samtv_api::{
    KeyAction, MacAddress, OutgoingMessage, RemoteChannel, RemoteKey, StatusProbe, WakeConfig,
};

use crate::error::CoreError;
use crate::model::PowerState;

/// Probe, wake and power-toggle access to one TV.
pub trait TvLink: Send + Sync + 'static {
    /// Current power state. Never fails: no answer is `Unreachable`.
    fn probe_power(&self) -> impl Future<Output = PowerState> + Send;

    /// Broadcast one wake signal.
    fn wake(&self) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Send the power key with the given action.
    fn send_power(&self, action: KeyAction) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// [`TvLink`] over the real status endpoint, remote channel and wake packet.
#[derive(Clone)]
pub struct LiveLink {
    probe: StatusProbe,
    probe_timeout: Duration,
    channel: RemoteChannel,
    mac: Option<MacAddress>,
    wake: WakeConfig,
}

impl LiveLink {
    pub fn new(
        probe: StatusProbe,
        probe_timeout: Duration,
        channel: RemoteChannel,
        mac: Option<MacAddress>,
        wake: WakeConfig,
    ) -> Self {
        Self {
            probe,
            probe_timeout,
            channel,
            mac,
            wake,
        }
    }
}

impl TvLink for LiveLink {
    async fn probe_power(&self) -> PowerState {
        match self.probe.probe(self.probe_timeout).await {
            Ok(status) => status.power.into(),
            Err(e) => {
                debug!(error = %e, "status probe failed, treating TV as unreachable");
                PowerState::Unreachable
            }
        }
    }

    async fn wake(&self) -> Result<(), CoreError> {
        let mac = self.mac.as_ref().ok_or_else(|| CoreError::Unsupported {
            operation: "wake".into(),
            reason: "no MAC address known for this TV".into(),
        })?;
        samtv_api::wake(mac, &self.wake).await?;
        Ok(())
    }

    async fn send_power(&self, action: KeyAction) -> Result<(), CoreError> {
        self.channel.ensure_connected().await?;
        self.channel
            .send_command(&OutgoingMessage::key(action, RemoteKey::Power))
            .await?;
        Ok(())
    }
}
