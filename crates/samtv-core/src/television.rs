// ── Television ──
//
// One TV, fully wired: status probe, remote channel with file-backed
// credentials, power controller and remote command sender. The CLI builds
// one of these per invocation; a long-running host would keep one per TV.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use samtv_api::{
    AuthStatus, Capabilities, ChannelConfig, DeviceStatus, RemoteChannel, StatusProbe,
    TransportConfig,
};

use crate::config::TvConfig;
use crate::credential::FileCredentialStore;
use crate::error::CoreError;
use crate::link::LiveLink;
use crate::model::{ActiveState, DeviceDescriptor, PowerState};
use crate::power::PowerController;
use crate::remote::{RemoteCommandSender, RemoteIntent};

pub struct Television {
    descriptor: DeviceDescriptor,
    probe: StatusProbe,
    probe_timeout: std::time::Duration,
    channel: RemoteChannel,
    power: PowerController<LiveLink>,
    remote: RemoteCommandSender,
    background: Mutex<Option<JoinHandle<()>>>,
}

impl Television {
    /// Status probe for the configured host.
    pub fn status_probe(config: &TvConfig) -> Result<StatusProbe, CoreError> {
        let transport = TransportConfig {
            timeout: config.timing.probe_timeout,
        };
        Ok(StatusProbe::for_host(&config.host, &transport)?)
    }

    /// Fetch the status document once and describe the TV from it.
    pub async fn discover(config: &TvConfig) -> Result<DeviceDescriptor, CoreError> {
        let probe = Self::status_probe(config)?;
        Self::discover_with(config, &probe).await
    }

    /// [`discover`](Self::discover) through an existing probe.
    pub async fn discover_with(
        config: &TvConfig,
        probe: &StatusProbe,
    ) -> Result<DeviceDescriptor, CoreError> {
        let status = probe.probe(config.timing.probe_timeout).await?;
        Ok(describe(config, &status))
    }

    /// Discover the TV and wire everything up.
    ///
    /// A TV that does not answer is still usable when a MAC address is
    /// configured: the identity falls back to the configured id (or the
    /// host) so it can be woken.
    pub async fn connect(config: TvConfig) -> Result<Self, CoreError> {
        let probe = Self::status_probe(&config)?;
        let descriptor = match Self::discover_with(&config, &probe).await {
            Ok(descriptor) => descriptor,
            Err(e) if e.is_unreachable() && config.mac.is_some() => {
                warn!(host = %config.host, error = %e, "TV not answering, using configured identity");
                offline_descriptor(&config)
            }
            Err(e) => return Err(e),
        };
        Ok(Self::from_parts(&config, descriptor, probe))
    }

    /// Wire up a TV whose descriptor is already known.
    pub fn from_parts(config: &TvConfig, descriptor: DeviceDescriptor, probe: StatusProbe) -> Self {
        let client_name = config
            .client_name
            .clone()
            .unwrap_or_else(|| format!("samtv - {}", descriptor.name));

        let mut channel_config = ChannelConfig::new(&config.host, &descriptor.id, client_name);
        channel_config.tls = config.tls;
        channel_config.handshake_timeout = config.handshake_timeout;

        let store = Arc::new(FileCredentialStore::new(&config.storage_dir));
        let channel = RemoteChannel::new(channel_config, store);

        let link = LiveLink::new(
            probe.clone(),
            config.timing.probe_timeout,
            channel.clone(),
            descriptor.mac,
            config.wake.clone(),
        );
        let power = PowerController::new(link, config.timing.clone());
        let remote = RemoteCommandSender::new(channel.clone(), descriptor.remote_available());

        debug!(
            id = %descriptor.id,
            name = %descriptor.name,
            remote_available = descriptor.remote_available(),
            "television ready"
        );

        Self {
            descriptor,
            probe,
            probe_timeout: config.timing.probe_timeout,
            channel,
            power,
            remote,
            background: Mutex::new(None),
        }
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    pub fn channel(&self) -> &RemoteChannel {
        &self.channel
    }

    pub fn power(&self) -> &PowerController<LiveLink> {
        &self.power
    }

    /// Open the remote channel in the background.
    pub fn start(&self) {
        let channel = self.channel.clone();
        let handle = tokio::spawn(async move {
            match channel.ensure_connected().await {
                Ok(session) => debug!(client_id = session.client_id(), "background connect done"),
                Err(e) if e.is_not_authorized() => {
                    warn!("you need to allow access for this client on the TV");
                }
                Err(e) => warn!(error = %e, "background connect failed"),
            }
        });

        let previous = self
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Full status document.
    pub async fn status(&self) -> Result<DeviceStatus, CoreError> {
        Ok(self.probe.probe(self.probe_timeout).await?)
    }

    /// Drive the TV to `target` and wait for the outcome.
    pub async fn set_power(&self, target: PowerState) -> Result<(), CoreError> {
        self.power.set_target(target).await
    }

    pub async fn active_state(&self) -> ActiveState {
        self.power.get_active_state().await
    }

    pub async fn send(&self, intent: &RemoteIntent) -> Result<(), CoreError> {
        self.remote.send(intent).await
    }

    /// Connect and wait for the TV to admit us, persisting any new token.
    pub async fn pair(&self) -> Result<AuthStatus, CoreError> {
        let session = self.channel.ensure_connected().await?;
        info!(
            client_id = session.client_id(),
            auth = ?session.auth(),
            "paired with TV"
        );
        Ok(session.auth())
    }

    /// Stop background work and close the channel.
    pub async fn shutdown(&self) {
        let handle = self
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
        self.channel.shutdown().await;
    }
}

fn describe(config: &TvConfig, status: &DeviceStatus) -> DeviceDescriptor {
    if !status.token_auth_supported {
        warn!(
            host = %config.host,
            "TV does not advertise token auth, approval may be requested on every connect"
        );
    }
    for (flag, enabled) in status.capabilities.iter() {
        debug!(flag, enabled, "capability");
    }

    let mut descriptor = DeviceDescriptor::from_status(&config.host, status);
    if config.mac.is_some() {
        descriptor.mac = config.mac;
    }
    if let Some(name) = &config.name {
        descriptor.name.clone_from(name);
    }
    descriptor
}

fn offline_descriptor(config: &TvConfig) -> DeviceDescriptor {
    DeviceDescriptor {
        host: config.host.clone(),
        mac: config.mac,
        id: config.device_id.clone().unwrap_or_else(|| config.host.clone()),
        name: config.name.clone().unwrap_or_else(|| config.host.clone()),
        model: None,
        capabilities: Capabilities::default(),
    }
}
