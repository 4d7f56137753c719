//! Nominatim provider against a WireMock upstream

use flyer_geocoder::geocoding::{GeocodeProvider, LookupError, NominatimProvider};
use serde_json::json;
use std::net::TcpListener;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER_AGENT: &str = "PockitFlyer/1.0";

/// A search for `address` carrying the expected query and user agent
fn search(address: &str) -> wiremock::MockBuilder {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", address))
        .and(query_param("format", "json"))
        .and(query_param("limit", "1"))
        .and(header("user-agent", USER_AGENT))
}

fn provider(server: &MockServer) -> NominatimProvider {
    NominatimProvider::new(server.uri(), USER_AGENT)
}

#[actix::test]
async fn test_lookup_returns_first_place() {
    let server = MockServer::start().await;
    search("Zurich, Switzerland")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"lat": "47.3768866", "lon": "8.541694", "display_name": "Zürich"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let location = provider(&server)
        .lookup("Zurich, Switzerland", Duration::from_secs(5))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(location.coordinates.latitude, 47.3768866);
    assert_eq!(location.coordinates.longitude, 8.541694);
    assert_eq!(location.display_name.as_deref(), Some("Zürich"));
}

#[actix::test]
async fn test_empty_result_is_absent() {
    let server = MockServer::start().await;
    search("InvalidAddressXYZ123456789")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let result = provider(&server)
        .lookup("InvalidAddressXYZ123456789", Duration::from_secs(5))
        .await;

    assert_eq!(result, Ok(None));
}

#[actix::test]
async fn test_error_status_is_service_error() {
    let server = MockServer::start().await;
    search("Zurich")
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let result = provider(&server).lookup("Zurich", Duration::from_secs(5)).await;

    assert_eq!(result, Err(LookupError::Service("HTTP 503".to_string())));
}

#[actix::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    search("Zurich")
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;
    let timeout = Duration::from_millis(200);

    let result = provider(&server).lookup("Zurich", timeout).await;

    assert_eq!(result, Err(LookupError::TimedOut(timeout)));
}

#[actix::test]
async fn test_unreachable_service_is_service_error() {
    // Bind then drop to get a port nobody listens on
    let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let provider = NominatimProvider::new(format!("http://127.0.0.1:{}", port), USER_AGENT);

    let result = provider.lookup("Zurich", Duration::from_secs(2)).await;

    assert!(matches!(result, Err(LookupError::Service(_))), "got {:?}", result);
}
