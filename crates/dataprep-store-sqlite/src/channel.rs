// crates/dataprep-store-sqlite/src/channel.rs
// ============================================================================
// Module: SQLite Message Channel
// Description: Durable at-least-once queue stored in the shared database.
// Purpose: Deliver analysis requests to worker processes with redelivery.
// Dependencies: dataprep-core, rusqlite, serde_json
// ============================================================================

//! ## Overview
//! Messages live in `channel_messages` until acknowledged. Receiving a
//! message stamps it with a fresh delivery token and pushes its `visible_at`
//! out by the visibility timeout; an unsettled message therefore reappears
//! once that window lapses. A consumer that is still working restarts the
//! window with [`MessageChannel::extend`]. Settlement and extension match on
//! the token, so a consumer whose window lapsed cannot touch a newer delivery.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use dataprep_core::AnalysisRequest;
use dataprep_core::ChannelError;
use dataprep_core::DeliveryReceipt;
use dataprep_core::Destination;
use dataprep_core::MessageChannel;
use dataprep_core::MessageId;
use dataprep_core::ReceivedMessage;
use dataprep_core::Timestamp;
use dataprep_core::runtime::lock::lease_token;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::TransactionBehavior;
use rusqlite::params;

use crate::store::SqliteStoreError;
use crate::store::duration_millis;
use crate::store::lock_connection;

// ============================================================================
// SECTION: Errors
// ============================================================================

impl From<SqliteStoreError> for ChannelError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Invalid(message) | SqliteStoreError::Corrupt(message) => {
                Self::Invalid(message)
            }
            other => Self::Backend(other.to_string()),
        }
    }
}

/// Maps a `rusqlite` failure into a channel error.
fn db_error(error: rusqlite::Error) -> ChannelError {
    ChannelError::from(SqliteStoreError::from(error))
}

// ============================================================================
// SECTION: Channel
// ============================================================================

/// `SQLite`-backed durable message channel.
#[derive(Clone)]
pub struct SqliteMessageChannel {
    /// Shared `SQLite` connection.
    connection: Arc<Mutex<Connection>>,
    /// Time a received message stays hidden from other consumers.
    visibility_timeout: Duration,
}

impl SqliteMessageChannel {
    /// Creates a channel over an open connection.
    pub(crate) const fn new(connection: Arc<Mutex<Connection>>, visibility_timeout: Duration) -> Self {
        Self {
            connection,
            visibility_timeout,
        }
    }

    /// Returns the number of unacknowledged messages for a destination.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] when the query fails.
    pub fn pending(&self, destination: Destination) -> Result<u64, ChannelError> {
        let guard = lock_connection(&self.connection)?;
        let count: i64 = guard
            .query_row(
                "SELECT COUNT(*) FROM channel_messages WHERE destination = ?1",
                params![destination.as_str()],
                |row| row.get(0),
            )
            .map_err(db_error)?;
        drop(guard);
        u64::try_from(count).map_err(|_| ChannelError::Invalid("negative message count".to_string()))
    }
}

impl MessageChannel for SqliteMessageChannel {
    fn publish(&self, request: &AnalysisRequest) -> Result<MessageId, ChannelError> {
        let payload = serde_json::to_vec(request).map_err(|err| ChannelError::Invalid(err.to_string()))?;
        let now = Timestamp::now().as_unix_millis();
        let guard = lock_connection(&self.connection)?;
        guard
            .execute(
                "INSERT INTO channel_messages (destination, payload, visible_at, delivery_count, \
                 published_at) VALUES (?1, ?2, ?3, 0, ?3)",
                params![request.destination.as_str(), payload, now],
            )
            .map_err(db_error)?;
        let id = guard.last_insert_rowid();
        drop(guard);
        message_id(id)
    }

    fn receive(&self, destination: Destination) -> Result<Option<ReceivedMessage>, ChannelError> {
        let now = Timestamp::now().as_unix_millis();
        let mut guard = lock_connection(&self.connection)?;
        let tx = guard.transaction_with_behavior(TransactionBehavior::Immediate).map_err(db_error)?;
        let next: Option<(i64, Vec<u8>, i64)> = tx
            .query_row(
                "SELECT message_id, payload, delivery_count FROM channel_messages WHERE \
                 destination = ?1 AND visible_at <= ?2 ORDER BY message_id LIMIT 1",
                params![destination.as_str(), now],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(db_error)?;
        let Some((id, payload, delivery_count)) = next else {
            tx.commit().map_err(db_error)?;
            return Ok(None);
        };
        let request = match serde_json::from_slice::<AnalysisRequest>(&payload) {
            Ok(request) if request.destination == destination => request,
            _ => {
                // Malformed rows are dropped, never redelivered.
                tx.execute("DELETE FROM channel_messages WHERE message_id = ?1", params![id])
                    .map_err(db_error)?;
                tx.commit().map_err(db_error)?;
                return Err(ChannelError::Invalid(format!("discarded malformed message {id}")));
            }
        };
        let token = lease_token();
        let delivery_count = delivery_count.saturating_add(1);
        let visible_at = now.saturating_add(duration_millis(self.visibility_timeout));
        tx.execute(
            "UPDATE channel_messages SET delivery_token = ?1, delivery_count = ?2, visible_at = ?3 \
             WHERE message_id = ?4",
            params![token, delivery_count, visible_at, id],
        )
        .map_err(db_error)?;
        tx.commit().map_err(db_error)?;
        drop(guard);
        Ok(Some(ReceivedMessage {
            receipt: DeliveryReceipt {
                message_id: message_id(id)?,
                token,
            },
            request,
            delivery_count: u32::try_from(delivery_count).unwrap_or(u32::MAX),
        }))
    }

    fn acknowledge(&self, receipt: &DeliveryReceipt) -> Result<(), ChannelError> {
        let guard = lock_connection(&self.connection)?;
        let deleted = guard
            .execute(
                "DELETE FROM channel_messages WHERE message_id = ?1 AND delivery_token = ?2",
                params![receipt_row(receipt)?, receipt.token],
            )
            .map_err(db_error)?;
        drop(guard);
        if deleted == 0 {
            return Err(ChannelError::StaleReceipt(receipt.message_id));
        }
        Ok(())
    }

    fn defer(&self, receipt: &DeliveryReceipt, delay: Duration) -> Result<(), ChannelError> {
        let visible_at = Timestamp::now().as_unix_millis().saturating_add(duration_millis(delay));
        let guard = lock_connection(&self.connection)?;
        let updated = guard
            .execute(
                "UPDATE channel_messages SET visible_at = ?1, delivery_token = NULL WHERE \
                 message_id = ?2 AND delivery_token = ?3",
                params![visible_at, receipt_row(receipt)?, receipt.token],
            )
            .map_err(db_error)?;
        drop(guard);
        if updated == 0 {
            return Err(ChannelError::StaleReceipt(receipt.message_id));
        }
        Ok(())
    }

    fn extend(&self, receipt: &DeliveryReceipt) -> Result<(), ChannelError> {
        let visible_at =
            Timestamp::now().as_unix_millis().saturating_add(duration_millis(self.visibility_timeout));
        let guard = lock_connection(&self.connection)?;
        let updated = guard
            .execute(
                "UPDATE channel_messages SET visible_at = ?1 WHERE message_id = ?2 AND delivery_token = ?3",
                params![visible_at, receipt_row(receipt)?, receipt.token],
            )
            .map_err(db_error)?;
        drop(guard);
        if updated == 0 {
            return Err(ChannelError::StaleReceipt(receipt.message_id));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts a row id into a message identifier.
fn message_id(row: i64) -> Result<MessageId, ChannelError> {
    u64::try_from(row)
        .map(MessageId::new)
        .map_err(|_| ChannelError::Invalid(format!("invalid message id {row}")))
}

/// Converts a receipt's message identifier into a row id.
fn receipt_row(receipt: &DeliveryReceipt) -> Result<i64, ChannelError> {
    i64::try_from(receipt.message_id.get()).map_err(|_| ChannelError::StaleReceipt(receipt.message_id))
}
