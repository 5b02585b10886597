// crates/dataprep-broker/src/lib.rs
// ============================================================================
// Module: Dataprep Broker Library
// Description: Content accessors and analysis engine clients.
// Purpose: Connect analysis workers to dataset content and statistics engines.
// Dependencies: dataprep-core, reqwest, url
// ============================================================================

//! ## Overview
//! Dataprep Broker provides ready-made [`ContentAccessor`] and
//! [`AnalysisEngine`] implementations: file and HTTP content stores, and
//! engine clients that reach the statistics engine over HTTP or by spawning a
//! local executable. All remote input is treated as untrusted and size-capped.
//!
//! [`ContentAccessor`]: dataprep_core::ContentAccessor
//! [`AnalysisEngine`]: dataprep_core::AnalysisEngine

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod content;
pub mod engine;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use content::FileContentStore;
pub use content::HttpContentStore;
pub use engine::CommandAnalysisEngine;
pub use engine::HttpAnalysisEngine;
pub use engine::MAX_ENGINE_OUTPUT_BYTES;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while constructing broker clients.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// Endpoint URL is malformed or uses an unsupported scheme.
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),
    /// HTTP client construction failed.
    #[error("http client error: {0}")]
    Client(String),
    /// Local path configuration is invalid.
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

/// Parses an HTTP(S) endpoint URL usable as a path base.
pub(crate) fn parse_http_url(raw: &str) -> Result<url::Url, BrokerError> {
    let url = url::Url::parse(raw).map_err(|err| BrokerError::InvalidUrl(err.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(BrokerError::InvalidUrl(format!("unsupported scheme: {scheme}"))),
    }
    if url.cannot_be_a_base() || url.host().is_none() {
        return Err(BrokerError::InvalidUrl(format!("url has no host: {raw}")));
    }
    Ok(url)
}

/// Builds the blocking HTTP client shared by broker clients.
pub(crate) fn http_client(timeout: std::time::Duration) -> Result<reqwest::blocking::Client, BrokerError> {
    reqwest::blocking::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(timeout)
        .build()
        .map_err(|err| BrokerError::Client(err.to_string()))
}
