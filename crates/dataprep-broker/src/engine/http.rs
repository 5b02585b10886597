// crates/dataprep-broker/src/engine/http.rs
// ============================================================================
// Module: Dataprep HTTP Engine Client
// Description: Statistics engine reached over HTTP.
// Purpose: POST a snapshot with its parameters and return the result body.
// Dependencies: reqwest, url
// ============================================================================

//! ## Overview
//! The snapshot is streamed as the request body; parameters travel in the
//! query string. Connection failures map to [`EngineError::Unavailable`], a
//! non-success status to [`EngineError::Failed`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use dataprep_core::AnalysisEngine;
use dataprep_core::EngineError;
use dataprep_core::EngineRequest;
use reqwest::blocking::Body;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::BrokerError;
use crate::engine::decode_output;
use crate::engine::parameter_pairs;
use crate::engine::read_capped;
use crate::http_client;
use crate::parse_http_url;

// ============================================================================
// SECTION: HTTP Engine
// ============================================================================

/// HTTP statistics engine client.
#[derive(Debug, Clone)]
pub struct HttpAnalysisEngine {
    /// HTTP client used for engine calls.
    client: Client,
    /// Engine analysis endpoint.
    endpoint: Url,
}

impl HttpAnalysisEngine {
    /// Builds an engine client for the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError`] when the URL is invalid or the client cannot
    /// be constructed.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, BrokerError> {
        Ok(Self {
            client: http_client(timeout)?,
            endpoint: parse_http_url(endpoint)?,
        })
    }

    /// Returns the request URL carrying the engine parameters.
    fn request_url(&self, request: &EngineRequest<'_>) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            for (name, value) in parameter_pairs(request) {
                query.append_pair(name, &value);
            }
        }
        url
    }
}

impl AnalysisEngine for HttpAnalysisEngine {
    fn analyze(&self, request: &EngineRequest<'_>) -> Result<String, EngineError> {
        let file = std::fs::File::open(request.content_path).map_err(|err| EngineError::Io(err.to_string()))?;
        let response = self
            .client
            .post(self.request_url(request).as_str())
            .header(CONTENT_TYPE, "text/csv")
            .body(Body::from(file))
            .send()
            .map_err(|err| {
                if err.is_connect() || err.is_timeout() {
                    EngineError::Unavailable(err.to_string())
                } else {
                    EngineError::Io(err.to_string())
                }
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Failed(format!("http status {status}")));
        }
        decode_output(read_capped(response)?)
    }
}
