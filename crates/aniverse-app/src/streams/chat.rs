//! # Chat
//!
//! Messages of one chat in server insertion order. A sent message shows at
//! once as [`MessageDeliveryStatus::Sending`] and becomes `Sent` when the
//! store confirms it; a refused message disappears and the error goes back
//! to the sender.
//!
//! An echo of the sender's own message, matched by sender and content,
//! takes over the pending entry even before the store answers.

use super::store_assigned_stripped;
use crate::records::{check_text, unassigned, Message};
use crate::AppError;
use aniverse_core::{Clock, RecordId, StreamFilter};
use aniverse_sync::{
    LiveStream, MutationClient, StreamEntry, StreamOptions, StreamSpec, SubscriptionManager,
    SyncError,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Owning view of the open chat's subscription
pub const CHAT_VIEW: &str = "chat";

// ============================================================================
// Message Delivery Status
// ============================================================================

/// Where a message is in its lifecycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageDeliveryStatus {
    /// Shown locally, not yet acknowledged by the store
    Sending,
    /// Stored
    #[default]
    Sent,
}

impl MessageDeliveryStatus {
    /// Status indicator for display
    #[must_use]
    pub fn indicator(&self) -> &'static str {
        match self {
            Self::Sending => "◐",
            Self::Sent => "✓",
        }
    }

    /// Whether the store has not acknowledged the message yet
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Sending)
    }
}

/// A message with its delivery status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The message
    pub message: Message,
    /// Delivery status
    pub status: MessageDeliveryStatus,
}

impl From<StreamEntry<Message>> for ChatMessage {
    fn from(entry: StreamEntry<Message>) -> Self {
        let status = if entry.is_pending() {
            MessageDeliveryStatus::Sending
        } else {
            MessageDeliveryStatus::Sent
        };
        Self {
            message: entry.record,
            status,
        }
    }
}

// ============================================================================
// Stream
// ============================================================================

/// `messages` where `chat_id = X`, oldest first
#[derive(Debug, Clone)]
pub struct ChatSpec {
    chat_id: RecordId,
}

impl ChatSpec {
    /// Messages of `chat_id`
    pub fn new(chat_id: RecordId) -> Self {
        Self { chat_id }
    }
}

impl StreamSpec for ChatSpec {
    type Record = Message;
    type Key = DateTime<Utc>;

    fn table(&self) -> &str {
        "messages"
    }

    fn filter(&self) -> StreamFilter {
        StreamFilter::eq("chat_id", self.chat_id.as_str())
    }

    fn sort_key(&self, message: &Message) -> DateTime<Utc> {
        message.created_at
    }

    fn record_id(&self, message: &Message) -> RecordId {
        message.id.clone()
    }

    fn correlation_key(&self, message: &Message) -> Option<String> {
        Some(format!("{}/{}", message.sender_id, message.content))
    }

    fn insert_row(&self, message: &Message) -> Result<Value, SyncError> {
        store_assigned_stripped(self.table(), message)
    }
}

/// Live messages of one chat
#[derive(Clone)]
pub struct ChatStream {
    chat_id: RecordId,
    stream: LiveStream<ChatSpec>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ChatStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatStream")
            .field("chat_id", &self.chat_id)
            .field("live", &self.stream.is_live())
            .finish_non_exhaustive()
    }
}

impl ChatStream {
    /// Subscribe to `chat_id`
    pub fn open(
        subscriptions: &SubscriptionManager,
        chat_id: RecordId,
        client: Arc<dyn MutationClient>,
        clock: Arc<dyn Clock>,
        options: StreamOptions,
    ) -> Result<Self, AppError> {
        let spec = ChatSpec::new(chat_id.clone());
        let stream = LiveStream::open(subscriptions, CHAT_VIEW, "messages", spec, client, options)?;
        Ok(Self {
            chat_id,
            stream,
            clock,
        })
    }

    /// Open chat
    pub fn chat_id(&self) -> &RecordId {
        &self.chat_id
    }

    /// Underlying live stream
    pub fn stream(&self) -> &LiveStream<ChatSpec> {
        &self.stream
    }

    /// Messages, oldest first, with delivery status
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.stream
            .entries()
            .into_iter()
            .map(ChatMessage::from)
            .collect()
    }

    /// Release the subscription
    pub fn close(&self, subscriptions: &SubscriptionManager) {
        self.stream.close(subscriptions);
    }

    /// Send `content` as `sender`
    pub async fn send_message(
        &self,
        sender: &RecordId,
        content: &str,
    ) -> Result<RecordId, AppError> {
        let content = check_text("message", content, None)?;
        let message = Message {
            id: unassigned(),
            chat_id: self.chat_id.clone(),
            sender_id: sender.clone(),
            content,
            created_at: self.clock.now(),
        };
        Ok(self.stream.create(message).await?)
    }
}
