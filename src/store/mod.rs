use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{ConversationSummary, Message};

pub mod postgres;

pub use postgres::PgStore;

/// Resolves and manages the conversation tied to a (listing, buyer) pair.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Returns the existing conversation for (listing_id, buyer_id) or
    /// creates one. Concurrent callers for the same pair all receive the
    /// same id; a lost creation race is absorbed by re-querying.
    async fn get_or_create(
        &self,
        listing_id: Uuid,
        seller_id: Uuid,
        buyer_id: Uuid,
    ) -> AppResult<Uuid>;

    /// Every conversation where the user is buyer or seller, enriched for
    /// the inbox list, newest-created-first.
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<ConversationSummary>>;

    /// Removes the conversation's messages, then the conversation row.
    /// Finding no messages to remove is fine; a failure on the row delete
    /// after messages were removed surfaces `AppError::PartialDelete`.
    async fn delete(&self, conversation_id: Uuid) -> AppResult<()>;
}

/// Ordered history and persistence for messages within a conversation.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// All confirmed messages, ascending by created_at.
    async fn history(&self, conversation_id: Uuid) -> AppResult<Vec<Message>>;

    /// Persists one message and returns the confirmed row. Rejects
    /// empty/whitespace content before touching the store, and senders who
    /// are not a participant of the conversation.
    async fn send(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> AppResult<Message>;
}
