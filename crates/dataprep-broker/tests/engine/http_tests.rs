// crates/dataprep-broker/tests/engine/http_tests.rs
// ============================================================================
// Module: HttpAnalysisEngine Tests
// Description: Engine calls against a local HTTP server.
// ============================================================================

use std::thread;
use std::time::Duration;

use dataprep_broker::HttpAnalysisEngine;
use dataprep_core::AnalysisEngine;
use dataprep_core::EngineError;
use dataprep_core::EngineParameters;
use dataprep_core::EngineRequest;
use tiny_http::Response;
use tiny_http::Server;

use crate::common::SAMPLE_CSV;
use crate::common::snapshot;

const REPORT: &str = r#"{"columns":[{"name":"id","valid":2,"invalid":0,"empty":0}]}"#;

#[test]
fn http_engine_posts_snapshot_with_parameters() {
    let server = Server::http("127.0.0.1:0").expect("http server");
    let endpoint = format!("http://{}/analyze", server.server_addr());
    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request");
        let url = request.url().to_string();
        let method = request.method().to_string();
        let mut body = String::new();
        request.as_reader().read_to_string(&mut body).expect("body");
        request.respond(Response::from_string(REPORT)).expect("respond");
        (method, url, body)
    });

    let file = snapshot(SAMPLE_CSV);
    let parameters = EngineParameters::default();
    let engine = HttpAnalysisEngine::new(&endpoint, Duration::from_secs(5)).unwrap();
    let result = engine
        .analyze(&EngineRequest {
            parameters: &parameters,
            delimiter: ';',
            content_path: file.path(),
        })
        .unwrap();

    assert_eq!(result, REPORT);
    let (method, url, body) = handle.join().unwrap();
    assert_eq!(method, "POST");
    assert_eq!(
        url,
        "/analyze?concurrency=local%5B4%5D&start-offset=0&sample-limit=2&delimiter=%3B&format=json"
    );
    assert_eq!(body, SAMPLE_CSV);
}

#[test]
fn http_engine_maps_error_status_to_failure() {
    let server = Server::http("127.0.0.1:0").expect("http server");
    let endpoint = format!("http://{}/analyze", server.server_addr());
    let handle = thread::spawn(move || {
        let request = server.recv().expect("request");
        request.respond(Response::from_string("boom").with_status_code(500)).expect("respond");
    });

    let file = snapshot(SAMPLE_CSV);
    let parameters = EngineParameters::default();
    let engine = HttpAnalysisEngine::new(&endpoint, Duration::from_secs(5)).unwrap();
    let result = engine.analyze(&EngineRequest {
        parameters: &parameters,
        delimiter: ';',
        content_path: file.path(),
    });

    assert!(matches!(result, Err(EngineError::Failed(_))));
    handle.join().unwrap();
}

#[test]
fn http_engine_reports_unreachable_endpoint_as_unavailable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("listener");
    let endpoint = format!("http://{}/analyze", listener.local_addr().unwrap());
    drop(listener);

    let file = snapshot(SAMPLE_CSV);
    let parameters = EngineParameters::default();
    let engine = HttpAnalysisEngine::new(&endpoint, Duration::from_secs(5)).unwrap();
    let result = engine.analyze(&EngineRequest {
        parameters: &parameters,
        delimiter: ';',
        content_path: file.path(),
    });

    assert!(matches!(result, Err(EngineError::Unavailable(_))));
}
