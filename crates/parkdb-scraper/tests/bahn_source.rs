//! Integration tests for the Bahnpark adapter against a local mock API.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use parkdb_core::{BahnCredentials, ImportErrorKind, LotStatus};
use parkdb_scraper::sources::bahn::{BahnOptions, BahnSource};
use parkdb_scraper::{HttpClient, ScraperError, SourceAdapter};

fn test_client(max_retries: u32) -> HttpClient {
    HttpClient::new(5, "parkdb-test/0.1", max_retries, 0).expect("failed to build test HttpClient")
}

fn source(server: &MockServer, max_retries: u32) -> BahnSource {
    BahnSource::new(
        test_client(max_retries),
        BahnCredentials {
            client_id: "client-1".to_string(),
            api_key: "key-1".to_string(),
        },
        BahnOptions {
            base_url: format!("{}/parking-facilities", server.uri()),
            postal_code_prefix: "7".to_string(),
            listing_timeout: Duration::from_secs(5),
            max_concurrent_requests: 2,
        },
    )
}

fn facility(id: u64, zip: &str, has_prognosis: bool) -> serde_json::Value {
    json!({
        "id": id,
        "name": [{"context": "DISPLAY", "name": format!("Bahnhof {id}")}],
        "type": {"abbreviation": "PH"},
        "url": format!("https://www.dbbahnpark.de/{id}"),
        "address": {
            "streetAndNumber": "Bahnhofstraße 1",
            "zip": zip,
            "city": "Irgendwo",
            "location": {"latitude": 48.5, "longitude": 9.1}
        },
        "capacity": [{"type": "PARKING", "total": "100"}],
        "equipment": {"charging": {"hasChargingStation": false}},
        "hasPrognosis": has_prognosis,
        "access": {
            "openingHours": {"is24h": true},
            "outOfService": {"isOutOfService": false}
        },
        "operator": {"name": "DB BahnPark GmbH"},
        "tariff": {"prices": []}
    })
}

fn listing() -> serde_json::Value {
    let mut out_of_service = facility(3, "70173", true);
    out_of_service["access"]["outOfService"]["isOutOfService"] = json!(true);
    json!({
        "_embedded": [
            facility(1, "70173", true),
            facility(2, "10115", true),
            out_of_service,
            facility(4, "71032", false)
        ]
    })
}

async fn mount_listing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/parking-facilities"))
        .and(header("DB-Client-Id", "client-1"))
        .and(header("DB-Api-Key", "key-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing()))
        .mount(server)
        .await;
}

// ---------------------------------------------------------------------------
// lot infos
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lot_infos_partition_the_listing() {
    let server = MockServer::start().await;
    mount_listing(&server).await;

    let result = source(&server, 0).fetch_lot_infos().await.unwrap();

    let ids: Vec<&str> = result.items.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec!["db-1", "db-2", "db-4"]);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].uid.as_deref(), Some("3"));
    assert_eq!(result.errors[0].kind, ImportErrorKind::Ignored);
    assert_eq!(result.len(), 4);
}

#[tokio::test]
async fn missing_embedded_fails_the_batch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/parking-facilities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 0})))
        .mount(&server)
        .await;

    let err = source(&server, 0).fetch_lot_infos().await.unwrap_err();
    assert!(matches!(err, ScraperError::MissingContainer { .. }), "got: {err:?}");
}

#[tokio::test]
async fn server_error_fails_the_batch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/parking-facilities"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = source(&server, 0).fetch_lot_infos().await.unwrap_err();
    assert!(
        matches!(err, ScraperError::UnexpectedStatus { status: 500, .. }),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn rate_limited_listing_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/parking-facilities"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_listing(&server).await;

    let result = source(&server, 2).fetch_lot_infos().await.unwrap();
    assert_eq!(result.items.len(), 3);
}

#[tokio::test]
async fn missing_credentials_header_is_not_found() {
    let server = MockServer::start().await;
    mount_listing(&server).await;

    let wrong = BahnSource::new(
        test_client(0),
        BahnCredentials {
            client_id: "someone-else".to_string(),
            api_key: "key-1".to_string(),
        },
        BahnOptions {
            base_url: format!("{}/parking-facilities", server.uri()),
            ..BahnOptions::default()
        },
    );
    let err = wrong.fetch_lot_infos().await.unwrap_err();
    assert!(matches!(err, ScraperError::NotFound { .. }), "got: {err:?}");
}

// ---------------------------------------------------------------------------
// lot data
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lot_data_polls_only_live_lots_in_area() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    Mock::given(method("GET"))
        .and(path("/parking-facilities/1/prognoses"))
        .and(header("DB-Api-Key", "key-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_embedded": [{"occupancy": {
                "validData": true,
                "timeSegment": "2024-03-12T10:15:00Z",
                "capacity": 100,
                "vacancyText": ">30"
            }}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = source(&server, 0).fetch_lot_data().await.unwrap();

    assert_eq!(result.items.len(), 1);
    assert!(result.errors.is_empty());
    let data = &result.items[0];
    assert_eq!(data.id, "db-1");
    assert_eq!(data.status, LotStatus::Open);
    assert_eq!(data.num_free, Some(31));
    assert_eq!(data.capacity, Some(100));
}

#[tokio::test]
async fn prognosis_without_occupancy_is_a_record_error() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    Mock::given(method("GET"))
        .and(path("/parking-facilities/1/prognoses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"_embedded": []})))
        .mount(&server)
        .await;

    let result = source(&server, 0).fetch_lot_data().await.unwrap();
    assert!(result.items.is_empty());
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].uid.as_deref(), Some("db-1"));
    assert_eq!(result.errors[0].kind, ImportErrorKind::Validation);
}

#[tokio::test]
async fn failed_prognosis_request_fails_the_batch() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    Mock::given(method("GET"))
        .and(path("/parking-facilities/1/prognoses"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = source(&server, 0).fetch_lot_data().await.unwrap_err();
    assert!(
        matches!(err, ScraperError::UnexpectedStatus { status: 503, .. }),
        "got: {err:?}"
    );
}
