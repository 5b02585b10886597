// crates/dataprep-cli/src/wiring.rs
// ============================================================================
// Module: Runtime Wiring
// Description: Builds analysis workers and backends from configuration.
// Purpose: Single place where config sections become runtime instances.
// Dependencies: dataprep-broker, dataprep-config, dataprep-core,
//               dataprep-store-sqlite, thiserror
// ============================================================================

//! ## Overview
//! [`AnalysisRuntime::from_config`] opens the `SQLite` database once and
//! derives the lock manager and message channel from it, so every worker in
//! the process (and every process pointed at the same file) shares one lock
//! table and one queue. The schema worker publishes follow-up quality
//! requests on the same channel it consumes from.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::sync::Arc;

use dataprep_broker::BrokerError;
use dataprep_broker::CommandAnalysisEngine;
use dataprep_broker::FileContentStore;
use dataprep_broker::HttpAnalysisEngine;
use dataprep_broker::HttpContentStore;
use dataprep_config::ChannelConfig;
use dataprep_config::ContentConfig;
use dataprep_config::ContentType;
use dataprep_config::DataprepConfig;
use dataprep_config::EngineConfig;
use dataprep_config::EngineType;
use dataprep_config::EventSinkType;
use dataprep_config::EventsConfig;
use dataprep_config::StoreConfig;
use dataprep_core::AnalysisEngine;
use dataprep_core::AnalysisWorker;
use dataprep_core::ContentAccessor;
use dataprep_core::MessageChannel;
use dataprep_core::MessageHandler;
use dataprep_core::PoolOptions;
use dataprep_core::QualityAnalyzer;
use dataprep_core::SchemaAnalyzer;
use dataprep_core::WorkerPool;
use dataprep_core::runtime::AnalysisEventSink;
use dataprep_core::runtime::EngineQualityScorer;
use dataprep_core::runtime::FileEventSink;
use dataprep_core::runtime::NoopEventSink;
use dataprep_core::runtime::QualityScorer;
use dataprep_core::runtime::RandomQualityScorer;
use dataprep_core::runtime::ScorerKind;
use dataprep_core::runtime::StderrEventSink;
use dataprep_core::runtime::pool::drain;
use dataprep_store_sqlite::SqliteMessageChannel;
use dataprep_store_sqlite::SqliteMetadataStore;
use dataprep_store_sqlite::SqliteStoreError;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures while assembling the runtime.
#[derive(Debug, Error)]
pub enum WiringError {
    /// Store could not be opened.
    #[error("store unavailable: {0}")]
    Store(#[from] SqliteStoreError),
    /// Content accessor or engine client could not be built.
    #[error("client setup failed: {0}")]
    Broker(#[from] BrokerError),
    /// Event sink could not be opened.
    #[error("event sink unavailable: {0}")]
    Events(String),
    /// Configuration is inconsistent with the requested backend.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Stage Selection
// ============================================================================

/// Destinations a worker process consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StageSelection {
    /// Schema inference requests only.
    Schema,
    /// Quality analysis requests only.
    Quality,
    /// Both destinations.
    #[default]
    All,
}

// ============================================================================
// SECTION: Runtime
// ============================================================================

/// Fully wired analysis workers for one process.
pub struct AnalysisRuntime {
    /// Shared metadata store.
    store: SqliteMetadataStore,
    /// Shared message channel.
    channel: Arc<SqliteMessageChannel>,
    /// Event sink shared by workers and the pool.
    events: Arc<dyn AnalysisEventSink>,
    /// Schema stage handler.
    schema: Arc<dyn MessageHandler>,
    /// Quality stage handler.
    quality: Arc<dyn MessageHandler>,
    /// Consumer pool options.
    pool: PoolOptions,
}

impl AnalysisRuntime {
    /// Builds every backend and both stage workers from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError`] when a backend cannot be opened.
    pub fn from_config(config: &DataprepConfig) -> Result<Self, WiringError> {
        let events = build_events(&config.events)?;
        Self::with_events(config, events)
    }

    /// Builds the runtime with a caller-provided event sink.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError`] when a backend cannot be opened.
    pub fn with_events(config: &DataprepConfig, events: Arc<dyn AnalysisEventSink>) -> Result<Self, WiringError> {
        let store = open_store(&config.store)?;
        let channel = Arc::new(open_channel(&store, &config.channel));
        let locks = store.lock_manager(config.worker.lock_lease(), config.worker.lock_poll_interval());
        let content = build_content(&config.content)?;
        let worker_config = config.worker.worker_config();

        let schema_analyzer =
            SchemaAnalyzer::new(Arc::clone(&content)).with_max_bytes(config.worker.snapshot_max_bytes);
        let follow_up: Arc<dyn MessageChannel> = channel.clone();
        let schema: Arc<dyn MessageHandler> = Arc::new(
            AnalysisWorker::new(store.clone(), locks.clone(), schema_analyzer, worker_config)
                .with_events(Arc::clone(&events))
                .with_follow_up_channel(follow_up),
        );

        let mut quality_analyzer = QualityAnalyzer::new(content, build_scorer(config.worker.scorer))
            .with_policy(config.worker.enrichment_policy)
            .with_materialize_options(config.worker.materialize_options());
        if let Some(engine) = build_engine(&config.engine)? {
            quality_analyzer = quality_analyzer.with_engine(engine, config.engine.parameters());
        }
        let quality: Arc<dyn MessageHandler> = Arc::new(
            AnalysisWorker::new(store.clone(), locks, quality_analyzer, worker_config)
                .with_events(Arc::clone(&events)),
        );

        Ok(Self {
            store,
            channel,
            events,
            schema,
            quality,
            pool: config.worker.pool_options(),
        })
    }

    /// Returns the metadata store.
    #[must_use]
    pub const fn store(&self) -> &SqliteMetadataStore {
        &self.store
    }

    /// Returns the message channel.
    #[must_use]
    pub fn channel(&self) -> &SqliteMessageChannel {
        &self.channel
    }

    /// Returns the handlers for the selected stages.
    #[must_use]
    pub fn handlers(&self, stages: StageSelection) -> Vec<Arc<dyn MessageHandler>> {
        match stages {
            StageSelection::Schema => vec![Arc::clone(&self.schema)],
            StageSelection::Quality => vec![Arc::clone(&self.quality)],
            StageSelection::All => vec![Arc::clone(&self.schema), Arc::clone(&self.quality)],
        }
    }

    /// Handles visible messages on the calling thread until the queues are
    /// empty or `limit` messages were handled.
    #[must_use]
    pub fn drain(&self, stages: StageSelection, limit: usize) -> usize {
        drain(self.channel.as_ref(), &self.handlers(stages), self.events.as_ref(), limit)
    }

    /// Starts the configured number of consumer threads.
    ///
    /// # Errors
    ///
    /// Returns an error when a consumer thread cannot be spawned.
    pub fn start(&self, stages: StageSelection) -> io::Result<WorkerPool> {
        let channel: Arc<dyn MessageChannel> = self.channel.clone();
        WorkerPool::start(&channel, &self.handlers(stages), &self.events, self.pool)
    }
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Opens the `SQLite` metadata store.
///
/// # Errors
///
/// Returns [`WiringError::Store`] when the database cannot be opened.
pub fn open_store(config: &StoreConfig) -> Result<SqliteMetadataStore, WiringError> {
    Ok(SqliteMetadataStore::new(config.sqlite_config())?)
}

/// Opens the message channel sharing the store's database.
#[must_use]
pub fn open_channel(store: &SqliteMetadataStore, config: &ChannelConfig) -> SqliteMessageChannel {
    store.message_channel(config.visibility_timeout())
}

/// Builds the configured event sink.
///
/// # Errors
///
/// Returns [`WiringError::Events`] when the event file cannot be opened.
pub fn build_events(config: &EventsConfig) -> Result<Arc<dyn AnalysisEventSink>, WiringError> {
    match config.sink_type {
        EventSinkType::Stderr => Ok(Arc::new(StderrEventSink::new(config.min_level))),
        EventSinkType::None => Ok(Arc::new(NoopEventSink)),
        EventSinkType::File => {
            let path =
                config.path.as_deref().ok_or_else(|| WiringError::Invalid("file events require path".to_string()))?;
            let sink = FileEventSink::new(path, config.min_level)
                .map_err(|err| WiringError::Events(format!("{}: {err}", path.display())))?;
            Ok(Arc::new(sink))
        }
    }
}

/// Builds the configured content accessor.
///
/// # Errors
///
/// Returns [`WiringError::Broker`] when the root or base URL is unusable.
pub fn build_content(config: &ContentConfig) -> Result<Arc<dyn ContentAccessor>, WiringError> {
    match config.content_type {
        ContentType::File => Ok(Arc::new(FileContentStore::new(config.root_path())?)),
        ContentType::Http => {
            let base = config
                .base_url
                .as_deref()
                .ok_or_else(|| WiringError::Invalid("http content requires base_url".to_string()))?;
            let mut store = HttpContentStore::new(base, config.timeout())?;
            if let Some(max_bytes) = config.max_bytes {
                store = store.with_max_bytes(max_bytes);
            }
            Ok(Arc::new(store))
        }
    }
}

/// Builds the configured engine client; `None` disables enrichment.
///
/// # Errors
///
/// Returns [`WiringError`] when the endpoint or program is missing or invalid.
pub fn build_engine(config: &EngineConfig) -> Result<Option<Arc<dyn AnalysisEngine>>, WiringError> {
    match config.engine_type {
        EngineType::None => Ok(None),
        EngineType::Http => {
            let endpoint = config
                .endpoint
                .as_deref()
                .ok_or_else(|| WiringError::Invalid("http engine requires endpoint".to_string()))?;
            Ok(Some(Arc::new(HttpAnalysisEngine::new(endpoint, config.timeout())?)))
        }
        EngineType::Command => {
            let program = config
                .program
                .clone()
                .ok_or_else(|| WiringError::Invalid("command engine requires program".to_string()))?;
            let engine =
                CommandAnalysisEngine::new(program).with_args(config.args.iter()).with_timeout(config.timeout());
            Ok(Some(Arc::new(engine)))
        }
    }
}

/// Builds the configured column scorer.
#[must_use]
pub fn build_scorer(kind: ScorerKind) -> Arc<dyn QualityScorer> {
    match kind {
        ScorerKind::Random => Arc::new(RandomQualityScorer::new()),
        ScorerKind::Engine => Arc::new(EngineQualityScorer),
    }
}
