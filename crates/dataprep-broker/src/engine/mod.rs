// crates/dataprep-broker/src/engine/mod.rs
// ============================================================================
// Module: Dataprep Engine Clients
// Description: HTTP and command-line clients for the statistics engine.
// Purpose: Run one engine analysis per materialized dataset snapshot.
// Dependencies: dataprep-core
// ============================================================================

//! ## Overview
//! Both clients pass the same fixed parameters: concurrency hint, start
//! offset, sample limit, field delimiter, and output format, together with
//! the path of the materialized snapshot. The engine's serialized result is
//! returned verbatim, capped at [`MAX_ENGINE_OUTPUT_BYTES`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;

use dataprep_core::EngineError;
use dataprep_core::EngineRequest;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum engine result size accepted by the clients.
pub const MAX_ENGINE_OUTPUT_BYTES: usize = 16 * 1024 * 1024;

/// Reads an engine result, failing when it exceeds the output cap.
pub(crate) fn read_capped<R: Read>(reader: R) -> Result<Vec<u8>, EngineError> {
    let limit = u64::try_from(MAX_ENGINE_OUTPUT_BYTES).unwrap_or(u64::MAX).saturating_add(1);
    let mut limited = reader.take(limit);
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes).map_err(|err| EngineError::Io(err.to_string()))?;
    if bytes.len() > MAX_ENGINE_OUTPUT_BYTES {
        return Err(EngineError::Failed(format!(
            "engine output exceeds {MAX_ENGINE_OUTPUT_BYTES} bytes"
        )));
    }
    Ok(bytes)
}

/// Decodes an engine result as UTF-8.
pub(crate) fn decode_output(bytes: Vec<u8>) -> Result<String, EngineError> {
    String::from_utf8(bytes).map_err(|err| EngineError::Failed(format!("engine output is not utf-8: {err}")))
}

/// Returns the named engine parameters for a request, in a stable order.
pub(crate) fn parameter_pairs(request: &EngineRequest<'_>) -> [(&'static str, String); 5] {
    let parameters = request.parameters;
    [
        ("concurrency", parameters.concurrency_hint.clone()),
        ("start-offset", parameters.start_offset.to_string()),
        ("sample-limit", parameters.sample_limit.to_string()),
        ("delimiter", request.delimiter.to_string()),
        ("format", parameters.output_format.as_str().to_string()),
    ]
}

// ============================================================================
// SECTION: Implementations
// ============================================================================

pub mod command;
pub mod http;

pub use command::CommandAnalysisEngine;
pub use http::HttpAnalysisEngine;
