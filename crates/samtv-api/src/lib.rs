// samtv-api: Async Rust client for Samsung Tizen TVs (status endpoint, remote channel, wake-on-LAN)

pub mod auth;
pub mod channel;
pub mod error;
pub mod remote;
pub mod status;
pub mod transport;
pub mod wake;

pub use auth::{CREDENTIAL_VERSION, Credential, CredentialStore, MemoryCredentialStore};
pub use channel::{
    AuthStatus, ChannelConfig, ChannelEvent, ChannelState, RemoteChannel, Session, SessionHandle,
};
pub use error::{ConnectError, Error};
pub use remote::{KeyAction, OutgoingMessage, RemoteKey};
pub use status::{Capabilities, DeviceStatus, ReportedPower, StatusProbe};
pub use transport::{TlsMode, TransportConfig};
pub use wake::{MacAddress, WakeConfig, wake};
