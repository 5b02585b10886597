// crates/dataprep-broker/tests/content/http_tests.rs
// ============================================================================
// Module: HttpContentStore Tests
// Description: HTTP-backed content resolution against a local server.
// ============================================================================

use std::thread;
use std::time::Duration;

use dataprep_broker::BrokerError;
use dataprep_broker::HttpContentStore;
use dataprep_core::ContentAccessor;
use dataprep_core::ContentError;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

use crate::common::SAMPLE_CSV;
use crate::common::metadata;
use crate::common::read_all;

/// Serves one request with the given status and body, returning the path seen.
fn serve_once(status: u16, body: &'static str) -> (String, thread::JoinHandle<String>) {
    let server = Server::http("127.0.0.1:0").expect("http server");
    let base = format!("http://{}/datasets/", server.server_addr());
    let handle = thread::spawn(move || {
        let request = server.recv().expect("request");
        let path = request.url().to_string();
        let response = Response::from_string(body)
            .with_status_code(status)
            .with_header(Header::from_bytes("Content-Type", "text/csv").unwrap());
        request.respond(response).expect("respond");
        path
    });
    (base, handle)
}

#[test]
fn http_store_streams_content() {
    let (base, handle) = serve_once(200, SAMPLE_CSV);
    let store = HttpContentStore::new(&base, Duration::from_secs(5)).unwrap();

    let reader = store.get(&metadata("ds-1")).unwrap();
    assert_eq!(read_all(reader), SAMPLE_CSV);
    assert_eq!(handle.join().unwrap(), "/datasets/ds-1");
}

#[test]
fn http_store_encodes_dataset_id_as_one_segment() {
    let (base, handle) = serve_once(200, SAMPLE_CSV);
    let store = HttpContentStore::new(&base, Duration::from_secs(5)).unwrap();

    store.get(&metadata("ds 1?x")).unwrap();
    assert_eq!(handle.join().unwrap(), "/datasets/ds%201%3Fx");
}

#[test]
fn http_store_maps_not_found() {
    let (base, handle) = serve_once(404, "");
    let store = HttpContentStore::new(&base, Duration::from_secs(5)).unwrap();

    assert!(matches!(store.get(&metadata("ds-1")), Err(ContentError::NotFound(_))));
    handle.join().unwrap();
}

#[test]
fn http_store_fails_closed_on_server_error_and_redirect() {
    for status in [500, 302] {
        let (base, handle) = serve_once(status, "");
        let store = HttpContentStore::new(&base, Duration::from_secs(5)).unwrap();
        assert!(matches!(store.get(&metadata("ds-1")), Err(ContentError::Http(_))));
        handle.join().unwrap();
    }
}

#[test]
fn http_store_refuses_declared_oversize_body() {
    let (base, handle) = serve_once(200, SAMPLE_CSV);
    let store = HttpContentStore::new(&base, Duration::from_secs(5)).unwrap().with_max_bytes(4);

    let result = store.get(&metadata("ds-1"));
    assert!(matches!(result, Err(ContentError::TooLarge { max_bytes: 4, .. })));
    handle.join().unwrap();
}

#[test]
fn http_store_rejects_invalid_base_url() {
    for base in ["ftp://example.com/", "not a url", "mailto:someone@example.com"] {
        let result = HttpContentStore::new(base, Duration::from_secs(5));
        assert!(matches!(result, Err(BrokerError::InvalidUrl(_))), "base {base} accepted");
    }
}
