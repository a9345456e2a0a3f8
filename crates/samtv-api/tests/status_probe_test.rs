#![allow(clippy::unwrap_used)]
// Integration tests for `StatusProbe` using wiremock.

use std::time::Duration;

use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use samtv_api::{Error, ReportedPower, StatusProbe};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, StatusProbe) {
    let server = MockServer::start().await;
    let url = Url::parse(&format!("{}/api/v2/", server.uri())).unwrap();
    let probe = StatusProbe::with_client(reqwest::Client::new(), url);
    (server, probe)
}

fn status_body(power: &str) -> serde_json::Value {
    json!({
        "device": {
            "PowerState": power,
            "TokenAuthSupport": "true",
            "wifiMac": "64:1C:AE:00:11:22",
            "name": "[TV] Bedroom",
            "modelName": "UE43TU7100",
            "id": "uuid:0f6d4a1e-aaaa-bbbb-cccc-000000000001"
        },
        "id": "uuid:0f6d4a1e-aaaa-bbbb-cccc-000000000001",
        "isSupport": "{\"remote_available\":\"true\",\"DMP_available\":\"true\"}",
        "name": "Bedroom",
        "type": "Samsung SmartTV",
        "version": "2.0.25"
    })
}

async fn mount(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/api/v2/"))
        .respond_with(template)
        .mount(server)
        .await;
}

// ── Power state ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_probe_reports_on() {
    let (server, probe) = setup().await;
    mount(&server, ResponseTemplate::new(200).set_body_json(status_body("on"))).await;

    let status = probe.probe(Duration::from_secs(2)).await.unwrap();

    assert_eq!(status.power, ReportedPower::On);
    assert_eq!(status.id, "uuid:0f6d4a1e-aaaa-bbbb-cccc-000000000001");
    assert_eq!(status.name, "Bedroom");
    assert_eq!(status.capabilities.flag("DMP_available"), Some(true));
}

#[tokio::test]
async fn test_probe_reports_standby() {
    let (server, probe) = setup().await;
    mount(
        &server,
        ResponseTemplate::new(200).set_body_json(status_body("standby")),
    )
    .await;

    let status = probe.probe(Duration::from_secs(2)).await.unwrap();
    assert_eq!(status.power, ReportedPower::Standby);
}

// ── Failures ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_probe_http_error() {
    let (server, probe) = setup().await;
    mount(&server, ResponseTemplate::new(500)).await;

    let result = probe.probe(Duration::from_secs(2)).await;
    assert!(
        matches!(result, Err(Error::HttpStatus { status: 500 })),
        "expected HttpStatus error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_probe_malformed_body() {
    let (server, probe) = setup().await;
    mount(
        &server,
        ResponseTemplate::new(200).set_body_string("<html>not json</html>"),
    )
    .await;

    let result = probe.probe(Duration::from_secs(2)).await;
    match result {
        Err(Error::Deserialization { body, .. }) => assert!(body.contains("not json")),
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_multibyte_body_is_reported() {
    let (server, probe) = setup().await;
    // 'é' spans bytes 199..201.
    let body = format!("{}é tail", "a".repeat(199));
    mount(&server, ResponseTemplate::new(200).set_body_string(body.clone())).await;

    let result = probe.probe(Duration::from_secs(2)).await;
    match result {
        Err(Error::Deserialization { body: returned, message }) => {
            assert_eq!(returned, body);
            assert!(message.contains("body preview"));
        }
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_probe_gives_up_at_deadline() {
    let (server, probe) = setup().await;
    mount(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(status_body("on"))
            .set_delay(Duration::from_secs(5)),
    )
    .await;

    let started = std::time::Instant::now();
    let result = probe.probe(Duration::from_millis(200)).await;

    assert!(matches!(result, Err(Error::Timeout { timeout_ms: 200 })));
    assert!(result.unwrap_err().is_timeout());
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_probe_unreachable_host() {
    // Nothing listens on the discard port of the loopback address.
    let url = Url::parse("http://127.0.0.1:9/api/v2/").unwrap();
    let probe = StatusProbe::with_client(reqwest::Client::new(), url);

    assert!(probe.probe(Duration::from_secs(2)).await.is_err());
}
