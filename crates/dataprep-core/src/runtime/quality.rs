// crates/dataprep-core/src/runtime/quality.rs
// ============================================================================
// Module: Dataprep Quality Analyzer
// Description: Quality stage: engine enrichment plus per-column scoring.
// Purpose: Fill every column's quality record for a schema-analyzed dataset.
// Dependencies: serde, thiserror, crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The quality stage snapshots the dataset's content, hands the snapshot to
//! the analysis engine, and then scores every column. Engine enrichment is
//! governed by [`EnrichmentPolicy`]: under `best_effort` a failing engine is
//! logged and the stage still completes with scorer-only results; under
//! `required` the stage fails and the request is redelivered.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::AnalysisStage;
use crate::core::DatasetMetadata;
use crate::core::Destination;
use crate::interfaces::AnalysisEngine;
use crate::interfaces::ContentAccessor;
use crate::interfaces::ContentError;
use crate::interfaces::EngineError;
use crate::interfaces::EngineParameters;
use crate::interfaces::EngineRequest;
use crate::runtime::content::MaterializeOptions;
use crate::runtime::content::materialize;
use crate::runtime::events::AnalysisEvent;
use crate::runtime::events::AnalysisEventSink;
use crate::runtime::events::EventLevel;
use crate::runtime::scoring::AnalysisReport;
use crate::runtime::scoring::QualityScorer;
use crate::runtime::worker::AnalyzeError;
use crate::runtime::worker::DatasetAnalyzer;
use crate::runtime::worker::StageReport;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// How engine failures affect the quality stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentPolicy {
    /// Log the failure and complete the stage without engine results.
    #[default]
    BestEffort,
    /// Fail the stage and leave the request for redelivery.
    Required,
}

/// Engine enrichment failures.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    /// Content snapshot could not be produced.
    #[error("content snapshot failed: {0}")]
    Content(#[from] ContentError),
    /// Engine call failed.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

// ============================================================================
// SECTION: Analyzer
// ============================================================================

/// Quality stage analyzer.
pub struct QualityAnalyzer {
    /// Raw content source.
    content: Arc<dyn ContentAccessor>,
    /// Statistics engine; enrichment is skipped when `None`.
    engine: Option<Arc<dyn AnalysisEngine>>,
    /// Column scorer.
    scorer: Arc<dyn QualityScorer>,
    /// Fixed engine parameters.
    parameters: EngineParameters,
    /// Enrichment failure policy.
    policy: EnrichmentPolicy,
    /// Snapshot limits.
    materialize: MaterializeOptions,
}

impl QualityAnalyzer {
    /// Creates an analyzer without an engine.
    #[must_use]
    pub fn new(content: Arc<dyn ContentAccessor>, scorer: Arc<dyn QualityScorer>) -> Self {
        Self {
            content,
            engine: None,
            scorer,
            parameters: EngineParameters::default(),
            policy: EnrichmentPolicy::default(),
            materialize: MaterializeOptions::default(),
        }
    }

    /// Attaches an engine and its fixed parameters.
    #[must_use]
    pub fn with_engine(mut self, engine: Arc<dyn AnalysisEngine>, parameters: EngineParameters) -> Self {
        self.engine = Some(engine);
        self.parameters = parameters;
        self
    }

    /// Sets the enrichment policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: EnrichmentPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the snapshot limits.
    #[must_use]
    pub fn with_materialize_options(mut self, options: MaterializeOptions) -> Self {
        self.materialize = options;
        self
    }

    /// Returns the enrichment policy.
    #[must_use]
    pub const fn policy(&self) -> EnrichmentPolicy {
        self.policy
    }

    /// Snapshots content and runs the engine over it.
    fn enrich(&self, engine: &dyn AnalysisEngine, metadata: &DatasetMetadata) -> Result<AnalysisReport, EnrichmentError> {
        let snapshot = materialize(self.content.as_ref(), metadata, &self.materialize)?;
        let request = EngineRequest {
            parameters: &self.parameters,
            delimiter: metadata.delimiter,
            content_path: snapshot.path(),
        };
        let raw = engine.analyze(&request)?;
        Ok(AnalysisReport::parse(raw))
    }
}

impl DatasetAnalyzer for QualityAnalyzer {
    fn stage(&self) -> AnalysisStage {
        AnalysisStage::Quality
    }

    fn destination(&self) -> Destination {
        Destination::QualityAnalysis
    }

    fn analyze(
        &self,
        metadata: &mut DatasetMetadata,
        events: &dyn AnalysisEventSink,
    ) -> Result<StageReport, AnalyzeError> {
        let mut degraded = false;
        let report = match &self.engine {
            None => None,
            Some(engine) => match self.enrich(engine.as_ref(), metadata) {
                Ok(report) => {
                    events.record(
                        &AnalysisEvent::new(EventLevel::Info, "engine_completed", "statistics engine completed")
                            .with_stage(AnalysisStage::Quality)
                            .with_dataset(metadata.id())
                            .with_detail(report.raw()),
                    );
                    Some(report)
                }
                Err(err) if self.policy == EnrichmentPolicy::Required => return Err(err.into()),
                Err(err) => {
                    events.record(
                        &AnalysisEvent::new(EventLevel::Error, "engine_failed", "statistics engine failed")
                            .with_stage(AnalysisStage::Quality)
                            .with_dataset(metadata.id())
                            .with_detail(err.to_string()),
                    );
                    degraded = true;
                    None
                }
            },
        };

        let qualities = metadata
            .columns()
            .iter()
            .map(|column| self.scorer.score(column, report.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        for (column, quality) in metadata.columns_mut().iter_mut().zip(qualities) {
            column.quality = quality;
        }
        Ok(StageReport {
            degraded,
        })
    }
}
