// crates/dataprep-core/src/runtime/pool.rs
// ============================================================================
// Module: Dataprep Consumer Pool
// Description: Threads that poll the channel and dispatch to workers.
// Purpose: Run analysis workers concurrently with cooperative shutdown.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Each pool thread polls every registered destination in turn and hands
//! received messages to the matching handler on the same thread, so every
//! message is processed to completion by exactly one thread. Worker errors are
//! reported through the event sink; they never stop the pool.
//!
//! A round only counts as progress when it acknowledged something. A round of
//! deferrals idles for the poll interval like an empty one, so a request
//! waiting on an unmet precondition is retried at most once per interval.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread::JoinHandle;
use std::time::Duration;
use std::time::Instant;

use crate::core::Destination;
use crate::interfaces::LockManager;
use crate::interfaces::MessageChannel;
use crate::interfaces::MetadataStore;
use crate::interfaces::ReceivedMessage;
use crate::runtime::channel::Delivery;
use crate::runtime::events::AnalysisEvent;
use crate::runtime::events::AnalysisEventSink;
use crate::runtime::events::EventLevel;
use crate::runtime::worker::AnalysisOutcome;
use crate::runtime::worker::AnalysisWorker;
use crate::runtime::worker::DatasetAnalyzer;
use crate::runtime::worker::WorkerError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Longest uninterrupted sleep while idle, bounding shutdown latency.
const IDLE_SLICE: Duration = Duration::from_millis(50);

// ============================================================================
// SECTION: Handler Trait
// ============================================================================

/// Object-safe handler for one destination.
pub trait MessageHandler: Send + Sync {
    /// Returns the destination the handler consumes.
    fn destination(&self) -> Destination;

    /// Handles a received message to completion.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError`] when the message cannot be settled.
    fn handle_received(
        &self,
        channel: &dyn MessageChannel,
        message: ReceivedMessage,
    ) -> Result<AnalysisOutcome, WorkerError>;
}

impl<S, L, A> MessageHandler for AnalysisWorker<S, L, A>
where
    S: MetadataStore,
    L: LockManager,
    A: DatasetAnalyzer,
{
    fn destination(&self) -> Destination {
        self.analyzer().destination()
    }

    fn handle_received(
        &self,
        channel: &dyn MessageChannel,
        message: ReceivedMessage,
    ) -> Result<AnalysisOutcome, WorkerError> {
        let mut delivery = Delivery::new(channel, message);
        self.handle(&mut delivery)
    }
}

// ============================================================================
// SECTION: Polling
// ============================================================================

/// Messages handled by one polling round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollRound {
    /// Messages received and handed to a handler.
    pub handled: usize,
    /// Handled messages that were acknowledged.
    pub acknowledged: usize,
}

impl PollRound {
    /// Returns true when the round removed at least one message.
    #[must_use]
    pub const fn made_progress(self) -> bool {
        self.acknowledged > 0
    }
}

/// Polls each handler's destination once.
pub fn poll_once(
    channel: &dyn MessageChannel,
    handlers: &[Arc<dyn MessageHandler>],
    events: &dyn AnalysisEventSink,
) -> PollRound {
    let mut round = PollRound::default();
    for handler in handlers {
        let destination = handler.destination();
        match channel.receive(destination) {
            Ok(Some(message)) => {
                let message_id = message.receipt.message_id;
                match handler.handle_received(channel, message) {
                    Ok(outcome) if outcome.is_acknowledged() => round.acknowledged += 1,
                    Ok(_) => {}
                    Err(err) => {
                        events.record(
                            &AnalysisEvent::new(EventLevel::Error, "worker_error", "analysis worker failed")
                                .with_stage(destination.stage())
                                .with_message_id(message_id)
                                .with_outcome(err.code())
                                .with_detail(err.to_string()),
                        );
                    }
                }
                round.handled += 1;
            }
            Ok(None) => {}
            Err(err) => {
                events.record(
                    &AnalysisEvent::new(EventLevel::Error, "channel_receive_failed", "channel receive failed")
                        .with_stage(destination.stage())
                        .with_detail(err.to_string()),
                );
            }
        }
    }
    round
}

/// Polls until no destination has a visible message or `limit` messages were
/// handled. Returns the number of messages handled.
pub fn drain(
    channel: &dyn MessageChannel,
    handlers: &[Arc<dyn MessageHandler>],
    events: &dyn AnalysisEventSink,
    limit: usize,
) -> usize {
    let mut handled = 0;
    while handled < limit {
        let round = poll_once(channel, handlers, events).handled;
        if round == 0 {
            break;
        }
        handled += round;
    }
    handled
}

// ============================================================================
// SECTION: Pool
// ============================================================================

/// Consumer pool options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    /// Number of consumer threads.
    pub threads: usize,
    /// Idle wait after a round that acknowledged nothing.
    pub poll_interval: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            threads: 1,
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Running consumer threads.
pub struct WorkerPool {
    /// Cooperative shutdown flag.
    shutdown: Arc<AtomicBool>,
    /// Thread handles.
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Starts the consumer threads.
    ///
    /// # Errors
    ///
    /// Returns an error when a thread cannot be spawned; threads already
    /// started are stopped first.
    pub fn start(
        channel: &Arc<dyn MessageChannel>,
        handlers: &[Arc<dyn MessageHandler>],
        events: &Arc<dyn AnalysisEventSink>,
        options: PoolOptions,
    ) -> io::Result<Self> {
        let mut pool = Self {
            shutdown: Arc::new(AtomicBool::new(false)),
            handles: Vec::with_capacity(options.threads),
        };
        for index in 0 .. options.threads.max(1) {
            let channel = Arc::clone(channel);
            let handlers = handlers.to_vec();
            let events = Arc::clone(events);
            let shutdown = Arc::clone(&pool.shutdown);
            let spawned = std::thread::Builder::new().name(format!("dataprep-worker-{index}")).spawn(move || {
                consume(channel.as_ref(), &handlers, events.as_ref(), &shutdown, options.poll_interval);
            });
            match spawned {
                Ok(handle) => pool.handles.push(handle),
                Err(err) => {
                    pool.shutdown();
                    return Err(err);
                }
            }
        }
        Ok(pool)
    }

    /// Returns the shutdown flag shared with the consumer threads.
    #[must_use]
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Signals shutdown and joins every thread. Returns the number of threads
    /// that panicked.
    pub fn shutdown(&mut self) -> usize {
        self.shutdown.store(true, Ordering::Release);
        self.handles.drain(..).map(JoinHandle::join).filter(Result::is_err).count()
    }
}

/// Consumer thread body.
fn consume(
    channel: &dyn MessageChannel,
    handlers: &[Arc<dyn MessageHandler>],
    events: &dyn AnalysisEventSink,
    shutdown: &AtomicBool,
    poll_interval: Duration,
) {
    while !shutdown.load(Ordering::Acquire) {
        if poll_once(channel, handlers, events).made_progress() {
            continue;
        }
        let idle_until = Instant::now() + poll_interval;
        while !shutdown.load(Ordering::Acquire) {
            let remaining = idle_until.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            std::thread::sleep(remaining.min(IDLE_SLICE));
        }
    }
}
