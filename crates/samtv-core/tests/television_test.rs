#![allow(clippy::unwrap_used)]
// Integration tests for `Television` against a wiremock status endpoint.

use serde_json::json;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use samtv_api::StatusProbe;
use samtv_core::{ActiveState, ChannelState, CoreError, PowerState, Television, TvConfig};

const TV_ID: &str = "uuid:0f6d4a1e-aaaa-bbbb-cccc-000000000001";

// ── Helpers ─────────────────────────────────────────────────────────

fn status_body(power: &str, remote: &str) -> serde_json::Value {
    json!({
        "device": {
            "PowerState": power,
            "TokenAuthSupport": "true",
            "wifiMac": "64:1C:AE:00:11:22",
            "name": "[TV] Den",
            "modelName": "QE65S95C",
            "id": TV_ID
        },
        "id": TV_ID,
        "isSupport": format!("{{\"remote_available\":\"{remote}\"}}"),
        "name": "Den",
        "type": "Samsung SmartTV"
    })
}

async fn setup(power: &str, remote: &str) -> (MockServer, StatusProbe, TvConfig, TempDir) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body(power, remote)))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/api/v2/", server.uri())).unwrap();
    let probe = StatusProbe::with_client(reqwest::Client::new(), url);
    let dir = tempfile::tempdir().unwrap();
    let config = TvConfig::new("127.0.0.1", dir.path());
    (server, probe, config, dir)
}

// ── Discovery ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_discover_describes_tv() {
    let (_server, probe, config, _dir) = setup("on", "true").await;

    let descriptor = Television::discover_with(&config, &probe).await.unwrap();

    assert_eq!(descriptor.id, TV_ID);
    assert_eq!(descriptor.name, "Den");
    assert_eq!(descriptor.model.as_deref(), Some("QE65S95C"));
    assert_eq!(descriptor.mac.unwrap().to_string(), "64:1c:ae:00:11:22");
    assert!(descriptor.remote_available());
}

#[tokio::test]
async fn test_configured_identity_overrides_document() {
    let (_server, probe, mut config, _dir) = setup("on", "true").await;
    config.name = Some("Basement".into());
    config.mac = Some("aa:bb:cc:dd:ee:ff".parse().unwrap());

    let descriptor = Television::discover_with(&config, &probe).await.unwrap();

    assert_eq!(descriptor.name, "Basement");
    assert_eq!(descriptor.mac.unwrap().to_string(), "aa:bb:cc:dd:ee:ff");
}

// ── Power ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_standby_tv_reads_inactive() {
    let (_server, probe, config, _dir) = setup("standby", "true").await;
    let descriptor = Television::discover_with(&config, &probe).await.unwrap();
    let tv = Television::from_parts(&config, descriptor, probe);

    assert_eq!(tv.active_state().await, ActiveState::Inactive);
    assert_eq!(tv.status().await.unwrap().id, TV_ID);
}

#[tokio::test]
async fn test_power_to_current_state_never_connects() {
    let (_server, probe, config, _dir) = setup("standby", "true").await;
    let descriptor = Television::discover_with(&config, &probe).await.unwrap();
    let tv = Television::from_parts(&config, descriptor, probe);

    tv.set_power(PowerState::Standby).await.unwrap();

    assert_eq!(tv.channel().current_state(), ChannelState::Disconnected);
}

// ── Capabilities ────────────────────────────────────────────────────

#[tokio::test]
async fn test_keys_rejected_when_remote_unavailable() {
    let (_server, probe, config, _dir) = setup("on", "false").await;
    let descriptor = Television::discover_with(&config, &probe).await.unwrap();
    let tv = Television::from_parts(&config, descriptor, probe);

    let err = tv
        .send(&samtv_core::RemoteIntent::Key(samtv_core::NavKey::Up))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Unsupported { .. }));
}

// ── Offline TV ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_unreachable_tv_with_mac_uses_configured_identity() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = TvConfig::new("127.0.0.1", dir.path());
    config.mac = Some("aa:bb:cc:dd:ee:ff".parse().unwrap());
    config.device_id = Some("uuid:den".into());
    config.timing.probe_timeout = std::time::Duration::from_millis(200);

    let tv = Television::connect(config).await.unwrap();
    assert_eq!(tv.descriptor().id, "uuid:den");
    assert_eq!(tv.descriptor().name, "127.0.0.1");

    tv.start();
    tv.shutdown().await;
    assert_eq!(tv.channel().current_state(), ChannelState::Disconnected);
}
