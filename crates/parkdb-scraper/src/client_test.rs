use super::*;

#[test]
fn extract_domain_returns_host() {
    assert_eq!(
        extract_domain("https://apis.deutschebahn.com/db-api-marketplace/apis"),
        "apis.deutschebahn.com"
    );
}

#[test]
fn extract_domain_falls_back_to_input() {
    assert_eq!(extract_domain("not a url"), "not a url");
}

#[test]
fn remote_location_detects_http_schemes() {
    assert!(is_remote_location("https://www.neckarsulm.de/parken.csv"));
    assert!(is_remote_location("  HTTP://example.org/x.xlsx"));
    assert!(!is_remote_location("./data/neckarsulm.csv"));
    assert!(!is_remote_location("/var/lib/parkdb/httpdump.csv"));
}

#[test]
fn join_url_normalizes_slashes() {
    assert_eq!(
        join_url("https://api.example.com/facilities/", "/42/prognoses"),
        "https://api.example.com/facilities/42/prognoses"
    );
    assert_eq!(
        join_url("https://api.example.com/facilities", "42"),
        "https://api.example.com/facilities/42"
    );
}

#[test]
fn client_builds_with_retry_policy() {
    let client = HttpClient::new(5, "parkdb-test/0.1", 2, 1).expect("client should build");
    assert_eq!(
        client.retry,
        RetryPolicy {
            max_retries: 2,
            backoff_base_secs: 1,
        }
    );
}
