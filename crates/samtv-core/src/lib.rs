//! Domain layer between `samtv-api` and the `samtv` binary.
//!
//! - **[`Television`]**: one TV wired end to end. Discovers the device from
//!   its status document, keeps the remote channel (with credentials in a
//!   [`FileCredentialStore`]), and exposes power and remote operations.
//!
//! - **[`PowerController`]**: serializes power changes through a one-slot
//!   coalescing queue. Probes the TV, wakes it when unreachable, sends the
//!   power key, and polls until the target state shows up or the deadline
//!   passes. Generic over [`TvLink`] so it can run against a scripted TV.
//!
//! - **[`RemoteCommandSender`]**: maps [`RemoteIntent`]s onto channel
//!   payloads, connecting on demand.

pub mod config;
pub mod credential;
pub mod error;
pub mod link;
pub mod model;
pub mod power;
pub mod remote;
pub mod television;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{PowerTiming, TvConfig};
pub use credential::FileCredentialStore;
pub use error::CoreError;
pub use link::{LiveLink, TvLink};
pub use model::{ActiveState, DeviceDescriptor, PowerState};
pub use power::{PowerChange, PowerController, PowerPhase};
pub use remote::{NavKey, RemoteCommandSender, RemoteIntent};
pub use television::Television;

// Transport types callers need alongside the core API.
pub use samtv_api::{AuthStatus, ChannelState, DeviceStatus, MacAddress, TlsMode, WakeConfig};
