// crates/dataprep-broker/src/content/http.rs
// ============================================================================
// Module: Dataprep HTTP Content Store
// Description: HTTP-backed content accessor.
// Purpose: Stream dataset content via HTTP GET from `<base>/<dataset id>`.
// Dependencies: reqwest, url
// ============================================================================

//! ## Overview
//! `HttpContentStore` fetches content from a configured base URL. Redirects
//! and non-success statuses fail closed; a declared body larger than the
//! configured cap is refused before streaming.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use dataprep_core::ContentAccessor;
use dataprep_core::ContentError;
use dataprep_core::DatasetMetadata;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use url::Url;

use crate::BrokerError;
use crate::content::checked_segment;
use crate::http_client;
use crate::parse_http_url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default request timeout for content downloads.
pub const DEFAULT_CONTENT_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// SECTION: HTTP Content Store
// ============================================================================

/// HTTP-backed content store.
///
/// # Invariants
/// - Redirects are rejected.
/// - Each dataset id is appended as a single percent-encoded path segment.
#[derive(Debug, Clone)]
pub struct HttpContentStore {
    /// HTTP client used for downloads.
    client: Client,
    /// Base URL the dataset id is appended to.
    base: Url,
    /// Optional cap on the declared content length.
    max_bytes: Option<u64>,
}

impl HttpContentStore {
    /// Builds a content store for the given base URL.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError`] when the URL is invalid or the client cannot
    /// be constructed.
    pub fn new(base: &str, timeout: Duration) -> Result<Self, BrokerError> {
        Ok(Self {
            client: http_client(timeout)?,
            base: parse_http_url(base)?,
            max_bytes: None,
        })
    }

    /// Refuses responses that declare more than `max_bytes`.
    #[must_use]
    pub const fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    /// Returns the download URL for a dataset.
    fn content_url(&self, metadata: &DatasetMetadata) -> Result<Url, ContentError> {
        let segment = checked_segment(metadata.id())?;
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ContentError::InvalidLocation(format!("base url cannot be extended: {}", self.base)))?
            .pop_if_empty()
            .push(segment);
        Ok(url)
    }
}

impl ContentAccessor for HttpContentStore {
    fn get(&self, metadata: &DatasetMetadata) -> Result<Box<dyn Read + Send>, ContentError> {
        let url = self.content_url(metadata)?;
        let response =
            self.client.get(url.as_str()).send().map_err(|err| ContentError::Http(err.to_string()))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ContentError::NotFound(format!("{url} returned {status}")));
        }
        if !status.is_success() {
            return Err(ContentError::Http(format!("http status {status}")));
        }
        if let (Some(max_bytes), Some(length)) = (self.max_bytes, response.content_length())
            && length > max_bytes
        {
            return Err(ContentError::TooLarge {
                max_bytes,
                read_at_least: length,
            });
        }
        Ok(Box::new(response))
    }
}
