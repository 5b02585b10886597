// crates/dataprep-core/src/core/messages.rs
// ============================================================================
// Module: Dataprep Analysis Messages
// Description: Channel destinations and analysis request payloads.
// Purpose: Define the wire form of "analyze dataset X" requests.
// Dependencies: serde, crate::core
// ============================================================================

//! ## Overview
//! An [`AnalysisRequest`] is a destination plus a flat string property map.
//! The dataset is named by the [`DATASET_ID_PROPERTY`] property; a request
//! without a non-blank value is malformed and can never succeed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::DatasetId;
use crate::core::lifecycle::AnalysisStage;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Message property carrying the dataset identifier.
pub const DATASET_ID_PROPERTY: &str = "dataset.id";

// ============================================================================
// SECTION: Destinations
// ============================================================================

/// Named queues on the message channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Destination {
    /// Schema inference requests.
    #[serde(rename = "SCHEMA_ANALYSIS")]
    SchemaAnalysis,
    /// Quality analysis requests.
    #[serde(rename = "QUALITY_ANALYSIS")]
    QualityAnalysis,
}

impl Destination {
    /// Returns the stable queue name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SchemaAnalysis => "SCHEMA_ANALYSIS",
            Self::QualityAnalysis => "QUALITY_ANALYSIS",
        }
    }

    /// Returns the lifecycle stage advanced by consumers of this destination.
    #[must_use]
    pub const fn stage(self) -> AnalysisStage {
        match self {
            Self::SchemaAnalysis => AnalysisStage::Schema,
            Self::QualityAnalysis => AnalysisStage::Quality,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Destination {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "SCHEMA_ANALYSIS" => Ok(Self::SchemaAnalysis),
            "QUALITY_ANALYSIS" => Ok(Self::QualityAnalysis),
            other => Err(format!("unknown destination: {other}")),
        }
    }
}

// ============================================================================
// SECTION: Analysis Request
// ============================================================================

/// Request payload published on the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Target queue.
    pub destination: Destination,
    /// String properties carried by the message.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl AnalysisRequest {
    /// Creates a request for the given dataset.
    #[must_use]
    pub fn for_dataset(destination: Destination, dataset_id: &DatasetId) -> Self {
        let mut properties = BTreeMap::new();
        properties.insert(DATASET_ID_PROPERTY.to_string(), dataset_id.as_str().to_string());
        Self {
            destination,
            properties,
        }
    }

    /// Returns a property value by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// Returns the dataset identifier when present and non-blank.
    #[must_use]
    pub fn dataset_id(&self) -> Option<DatasetId> {
        self.property(DATASET_ID_PROPERTY)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(DatasetId::from)
    }
}
