//! Integration tests for the Neckarsulm export adapter, reading the export
//! from disk and over HTTP.

use std::path::PathBuf;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use parkdb_core::{ImportErrorKind, LotType, OPEN_24_7};
use parkdb_scraper::sources::neckarsulm::NeckarsulmSource;
use parkdb_scraper::{HttpClient, ScraperError, SourceAdapter};

fn test_client() -> HttpClient {
    HttpClient::new(5, "parkdb-test/0.1", 0, 0).expect("failed to build test HttpClient")
}

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/neckarsulm.csv")
}

#[tokio::test]
async fn reads_reordered_export_from_disk() {
    let source = NeckarsulmSource::new(
        test_client(),
        fixture().display().to_string(),
        None,
    );

    let result = source.fetch_lot_infos().await.unwrap();

    let ids: Vec<&str> = result.items.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec!["neckarsulm-5", "neckarsulm-6", "neckarsulm-8"]);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].uid.as_deref(), Some("7"));
    assert_eq!(result.errors[0].kind, ImportErrorKind::Validation);

    let stadtmitte = &result.items[0];
    assert_eq!(stadtmitte.lot_type, Some(LotType::CarPark));
    assert_eq!(stadtmitte.capacity, Some(120));
    assert_eq!(stadtmitte.capacity_disabled, Some(4));
    assert_eq!(stadtmitte.capacity_charging, Some(6));

    assert_eq!(result.items[1].opening_hours.as_deref(), Some(OPEN_24_7));
    assert_eq!(result.items[2].lot_type, Some(LotType::ParkAndRide));
    assert_eq!(result.items[2].has_fee, Some(false));
}

#[tokio::test]
async fn reads_export_over_http() {
    let server = MockServer::start().await;
    let body = std::fs::read(fixture()).unwrap();
    Mock::given(method("GET"))
        .and(path("/parken.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(&server)
        .await;

    let source = NeckarsulmSource::new(test_client(), format!("{}/parken.csv", server.uri()), Some(5));
    let result = source.fetch_lot_infos().await.unwrap();
    assert_eq!(result.len(), 4);
    assert_eq!(result.items.len(), 3);
}

#[tokio::test]
async fn empty_export_fails_the_batch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/parken.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(Vec::new()))
        .mount(&server)
        .await;

    let source = NeckarsulmSource::new(test_client(), format!("{}/parken.csv", server.uri()), None);
    let err = source.fetch_lot_infos().await.unwrap_err();
    assert!(matches!(err, ScraperError::EmptySource { .. }), "got: {err:?}");
}

#[tokio::test]
async fn missing_export_is_not_found() {
    let server = MockServer::start().await;
    let source = NeckarsulmSource::new(test_client(), format!("{}/parken.csv", server.uri()), None);
    let err = source.fetch_lot_infos().await.unwrap_err();
    assert!(matches!(err, ScraperError::NotFound { .. }), "got: {err:?}");
}
