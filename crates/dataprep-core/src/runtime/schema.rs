// crates/dataprep-core/src/runtime/schema.rs
// ============================================================================
// Module: Dataprep Schema Analyzer
// Description: Schema stage: column names from the header, types from a sample.
// Purpose: Establish the column list that the quality stage scores.
// Dependencies: thiserror, crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The schema stage reads the header line of delimited content and infers a
//! type for each column from up to `sample_rows` data rows. A column takes the
//! narrowest type every non-empty sampled value conforms to, trying integer,
//! then double, then boolean, and falling back to string. Quoting is limited
//! to stripping a surrounding pair of double quotes from each cell.
//!
//! Once the schema stage has completed, rerunning it keeps the existing
//! columns so quality results are never wiped by a duplicate delivery.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::sync::Arc;

use thiserror::Error;

use crate::core::AnalysisStage;
use crate::core::ColumnId;
use crate::core::ColumnMetadata;
use crate::core::ColumnType;
use crate::core::DatasetMetadata;
use crate::core::Destination;
use crate::interfaces::ContentAccessor;
use crate::runtime::content::DEFAULT_MAX_MATERIALIZE_BYTES;
use crate::runtime::events::AnalysisEventSink;
use crate::runtime::worker::AnalyzeError;
use crate::runtime::worker::DatasetAnalyzer;
use crate::runtime::worker::StageReport;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default number of data rows sampled for type inference.
pub const DEFAULT_SAMPLE_ROWS: usize = 1_000;

// ============================================================================
// SECTION: Inference
// ============================================================================

/// Schema inference errors.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Content has no header line.
    #[error("content has no header line")]
    MissingHeader,
    /// Content could not be read.
    #[error("content read failed: {0}")]
    Io(String),
}

/// Types still consistent with every sampled value of a column.
#[derive(Debug, Clone, Copy)]
struct TypeCandidates {
    /// Whether any non-empty value was seen.
    seen: bool,
    /// Integer still possible.
    integer: bool,
    /// Double still possible.
    double: bool,
    /// Boolean still possible.
    boolean: bool,
}

impl TypeCandidates {
    /// All narrow types possible, nothing seen.
    const fn new() -> Self {
        Self {
            seen: false,
            integer: true,
            double: true,
            boolean: true,
        }
    }

    /// Narrows candidates by one cell value.
    fn observe(&mut self, value: &str) {
        if value.is_empty() {
            return;
        }
        self.seen = true;
        self.integer &= ColumnType::Integer.accepts(value);
        self.double &= ColumnType::Double.accepts(value);
        self.boolean &= ColumnType::Boolean.accepts(value);
    }

    /// Picks the narrowest remaining type.
    const fn resolve(self) -> ColumnType {
        if !self.seen {
            ColumnType::String
        } else if self.integer {
            ColumnType::Integer
        } else if self.double {
            ColumnType::Double
        } else if self.boolean {
            ColumnType::Boolean
        } else {
            ColumnType::String
        }
    }
}

/// Trims a cell and strips one surrounding pair of double quotes.
fn clean_cell(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .map_or(trimmed, str::trim)
}

/// Infers columns from delimited content.
///
/// # Errors
///
/// Returns [`SchemaError::MissingHeader`] when the content has no non-blank
/// line, or [`SchemaError::Io`] when reading fails.
pub fn infer_columns<R: BufRead>(
    reader: R,
    delimiter: char,
    sample_rows: usize,
) -> Result<Vec<ColumnMetadata>, SchemaError> {
    let mut lines = reader.lines();
    let header = loop {
        match lines.next() {
            Some(Ok(line)) if line.trim().is_empty() => {}
            Some(Ok(line)) => break line,
            Some(Err(err)) => return Err(SchemaError::Io(err.to_string())),
            None => return Err(SchemaError::MissingHeader),
        }
    };
    let names: Vec<String> = header
        .trim_end_matches('\r')
        .split(delimiter)
        .enumerate()
        .map(|(index, raw)| {
            let name = clean_cell(raw);
            if name.is_empty() { format!("column_{index}") } else { name.to_string() }
        })
        .collect();

    let mut candidates = vec![TypeCandidates::new(); names.len()];
    for line in lines.take(sample_rows) {
        let line = line.map_err(|err| SchemaError::Io(err.to_string()))?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        for (candidate, raw) in candidates.iter_mut().zip(line.split(delimiter)) {
            candidate.observe(clean_cell(raw));
        }
    }

    Ok(names
        .into_iter()
        .zip(candidates)
        .enumerate()
        .map(|(index, (name, candidate))| ColumnMetadata::new(ColumnId::from_index(index), name, candidate.resolve()))
        .collect())
}

// ============================================================================
// SECTION: Analyzer
// ============================================================================

/// Schema stage analyzer; publishes a quality request on completion.
pub struct SchemaAnalyzer {
    /// Raw content source.
    content: Arc<dyn ContentAccessor>,
    /// Data rows sampled for type inference.
    sample_rows: usize,
    /// Maximum bytes read from the content.
    max_bytes: u64,
}

impl SchemaAnalyzer {
    /// Creates an analyzer with default sampling limits.
    #[must_use]
    pub fn new(content: Arc<dyn ContentAccessor>) -> Self {
        Self {
            content,
            sample_rows: DEFAULT_SAMPLE_ROWS,
            max_bytes: DEFAULT_MAX_MATERIALIZE_BYTES,
        }
    }

    /// Sets the number of sampled data rows.
    #[must_use]
    pub const fn with_sample_rows(mut self, sample_rows: usize) -> Self {
        self.sample_rows = sample_rows;
        self
    }

    /// Sets the maximum bytes read.
    #[must_use]
    pub const fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

impl DatasetAnalyzer for SchemaAnalyzer {
    fn stage(&self) -> AnalysisStage {
        AnalysisStage::Schema
    }

    fn destination(&self) -> Destination {
        Destination::SchemaAnalysis
    }

    fn follow_up(&self) -> Option<Destination> {
        Some(Destination::QualityAnalysis)
    }

    fn analyze(
        &self,
        metadata: &mut DatasetMetadata,
        _events: &dyn AnalysisEventSink,
    ) -> Result<StageReport, AnalyzeError> {
        if metadata.lifecycle().schema_analyzed() {
            return Ok(StageReport::default());
        }
        let reader = BufReader::new(self.content.get(metadata)?.take(self.max_bytes));
        let columns = infer_columns(reader, metadata.delimiter, self.sample_rows)?;
        metadata.replace_columns(columns);
        Ok(StageReport::default())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

    use super::*;

    #[test]
    fn clean_cell_strips_quotes_and_whitespace() {
        assert_eq!(clean_cell("  \" name \" "), "name");
        assert_eq!(clean_cell("\""), "\"");
        assert_eq!(clean_cell(" plain "), "plain");
    }

    #[test]
    fn blank_header_cells_get_positional_names() {
        let columns = infer_columns("a;;c\n1;2;3\n".as_bytes(), ';', 10).unwrap();
        let names: Vec<&str> = columns.iter().map(|column| column.name.as_str()).collect();
        assert_eq!(names, ["a", "column_1", "c"]);
    }
}
