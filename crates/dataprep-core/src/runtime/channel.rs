// crates/dataprep-core/src/runtime/channel.rs
// ============================================================================
// Module: Dataprep Channel Runtime
// Description: Delivery settlement wrapper and an in-memory message channel.
// Purpose: Bridge channel receipts to the worker-facing message trait.
// Dependencies: crate::core, crate::interfaces, crate::runtime::lock
// ============================================================================

//! ## Overview
//! [`Delivery`] binds a received message to the channel it came from and
//! enforces that each delivery is settled at most once. The in-memory channel
//! implements visibility timeouts and per-delivery tokens the same way a
//! durable queue does, so worker behavior under redelivery can be exercised
//! without external infrastructure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;
use std::time::Instant;

use crate::core::AnalysisRequest;
use crate::core::Destination;
use crate::core::MessageId;
use crate::interfaces::AnalysisMessage;
use crate::interfaces::ChannelError;
use crate::interfaces::DeliveryReceipt;
use crate::interfaces::MessageChannel;
use crate::interfaces::ReceivedMessage;
use crate::runtime::lock::lease_token;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default time a received message stays hidden before redelivery.
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(300);

// ============================================================================
// SECTION: Delivery
// ============================================================================

/// A received message bound to its channel.
#[derive(Debug)]
pub struct Delivery<'a, C: MessageChannel + ?Sized> {
    /// Channel the message was received from.
    channel: &'a C,
    /// Received message.
    message: ReceivedMessage,
    /// Whether the delivery has been acknowledged or deferred.
    settled: bool,
}

impl<'a, C: MessageChannel + ?Sized> Delivery<'a, C> {
    /// Wraps a received message.
    #[must_use]
    pub const fn new(channel: &'a C, message: ReceivedMessage) -> Self {
        Self {
            channel,
            message,
            settled: false,
        }
    }

    /// Returns the message identifier.
    #[must_use]
    pub const fn message_id(&self) -> MessageId {
        self.message.receipt.message_id
    }

    /// Returns true once the delivery has been settled.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        self.settled
    }

    /// Fails when the delivery was already settled.
    const fn ensure_unsettled(&self) -> Result<(), ChannelError> {
        if self.settled {
            return Err(ChannelError::AlreadySettled(self.message.receipt.message_id));
        }
        Ok(())
    }
}

impl<C: MessageChannel + ?Sized> AnalysisMessage for Delivery<'_, C> {
    fn request(&self) -> &AnalysisRequest {
        &self.message.request
    }

    fn delivery_count(&self) -> u32 {
        self.message.delivery_count
    }

    fn acknowledge(&mut self) -> Result<(), ChannelError> {
        self.ensure_unsettled()?;
        self.channel.acknowledge(&self.message.receipt)?;
        self.settled = true;
        Ok(())
    }

    fn defer(&mut self, delay: Duration) -> Result<(), ChannelError> {
        self.ensure_unsettled()?;
        self.channel.defer(&self.message.receipt, delay)?;
        self.settled = true;
        Ok(())
    }

    fn extend(&mut self) -> Result<(), ChannelError> {
        self.ensure_unsettled()?;
        self.channel.extend(&self.message.receipt)
    }
}

// ============================================================================
// SECTION: In-Memory Channel
// ============================================================================

/// Queued message state.
#[derive(Debug, Clone)]
struct QueuedMessage {
    /// Request payload.
    request: AnalysisRequest,
    /// Instant when the message becomes receivable.
    visible_at: Instant,
    /// Token of the latest delivery, if any.
    token: Option<String>,
    /// Number of deliveries so far.
    delivery_count: u32,
}

/// Mutable channel state.
#[derive(Debug, Default)]
struct ChannelState {
    /// Next message identifier.
    next_id: u64,
    /// Pending messages in publish order.
    messages: BTreeMap<u64, QueuedMessage>,
}

/// In-memory at-least-once channel; clones share the same queue.
#[derive(Debug, Clone)]
pub struct InMemoryMessageChannel {
    /// Shared channel state.
    state: Arc<Mutex<ChannelState>>,
    /// Visibility timeout for received messages.
    visibility_timeout: Duration,
}

impl Default for InMemoryMessageChannel {
    fn default() -> Self {
        Self::new(DEFAULT_VISIBILITY_TIMEOUT)
    }
}

impl InMemoryMessageChannel {
    /// Creates a channel with the given visibility timeout.
    #[must_use]
    pub fn new(visibility_timeout: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChannelState::default())),
            visibility_timeout,
        }
    }

    /// Returns the number of unacknowledged messages for a destination.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Backend`] when the channel state is poisoned.
    pub fn pending(&self, destination: Destination) -> Result<usize, ChannelError> {
        let state = self.state()?;
        Ok(state.messages.values().filter(|message| message.request.destination == destination).count())
    }

    /// Locks the channel state.
    fn state(&self) -> Result<MutexGuard<'_, ChannelState>, ChannelError> {
        self.state.lock().map_err(|_| ChannelError::Backend("channel mutex poisoned".to_string()))
    }
}

/// Resolves a receipt to its queued message, rejecting stale tokens.
fn current<'s>(
    state: &'s mut ChannelState,
    receipt: &DeliveryReceipt,
) -> Result<&'s mut QueuedMessage, ChannelError> {
    match state.messages.get_mut(&receipt.message_id.get()) {
        Some(message) if message.token.as_deref() == Some(receipt.token.as_str()) => Ok(message),
        _ => Err(ChannelError::StaleReceipt(receipt.message_id)),
    }
}

impl MessageChannel for InMemoryMessageChannel {
    fn publish(&self, request: &AnalysisRequest) -> Result<MessageId, ChannelError> {
        let mut state = self.state()?;
        state.next_id += 1;
        let id = state.next_id;
        state.messages.insert(id, QueuedMessage {
            request: request.clone(),
            visible_at: Instant::now(),
            token: None,
            delivery_count: 0,
        });
        drop(state);
        Ok(MessageId::new(id))
    }

    fn receive(&self, destination: Destination) -> Result<Option<ReceivedMessage>, ChannelError> {
        let mut state = self.state()?;
        let now = Instant::now();
        let next = state
            .messages
            .iter_mut()
            .find(|(_, message)| message.request.destination == destination && message.visible_at <= now);
        let Some((id, message)) = next else {
            return Ok(None);
        };
        let token = lease_token();
        message.visible_at = now + self.visibility_timeout;
        message.token = Some(token.clone());
        message.delivery_count = message.delivery_count.saturating_add(1);
        Ok(Some(ReceivedMessage {
            receipt: DeliveryReceipt {
                message_id: MessageId::new(*id),
                token,
            },
            request: message.request.clone(),
            delivery_count: message.delivery_count,
        }))
    }

    fn acknowledge(&self, receipt: &DeliveryReceipt) -> Result<(), ChannelError> {
        let mut state = self.state()?;
        current(&mut state, receipt)?;
        state.messages.remove(&receipt.message_id.get());
        drop(state);
        Ok(())
    }

    fn defer(&self, receipt: &DeliveryReceipt, delay: Duration) -> Result<(), ChannelError> {
        let mut state = self.state()?;
        let message = current(&mut state, receipt)?;
        message.visible_at = Instant::now() + delay;
        message.token = None;
        drop(state);
        Ok(())
    }

    fn extend(&self, receipt: &DeliveryReceipt) -> Result<(), ChannelError> {
        let mut state = self.state()?;
        let message = current(&mut state, receipt)?;
        message.visible_at = Instant::now() + self.visibility_timeout;
        drop(state);
        Ok(())
    }
}
