use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{ConversationSummary, Message};
use crate::realtime::pubsub;
use crate::redis_client::RedisClient;

use super::{ConversationStore, MessageStore};

/// Postgres-backed store. When constructed with a Redis client, confirmed
/// inserts are echoed onto the conversation's channel so live subscribers
/// see them without refetching.
#[derive(Clone)]
pub struct PgStore {
    db: Pool<Postgres>,
    redis: Option<RedisClient>,
}

impl PgStore {
    pub fn new(db: Pool<Postgres>) -> Self {
        Self { db, redis: None }
    }

    pub fn with_realtime(db: Pool<Postgres>, redis: RedisClient) -> Self {
        Self {
            db,
            redis: Some(redis),
        }
    }

    async fn find_conversation(&self, listing_id: Uuid, buyer_id: Uuid) -> AppResult<Option<Uuid>> {
        let row = sqlx::query("SELECT id FROM conversations WHERE listing_id = $1 AND buyer_id = $2")
            .bind(listing_id)
            .bind(buyer_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(|r| r.get("id")))
    }

    async fn participants(&self, conversation_id: Uuid) -> AppResult<(Uuid, Uuid)> {
        let row = sqlx::query("SELECT buyer_id, seller_id FROM conversations WHERE id = $1")
            .bind(conversation_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;
        Ok((row.get("buyer_id"), row.get("seller_id")))
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl ConversationStore for PgStore {
    async fn get_or_create(
        &self,
        listing_id: Uuid,
        seller_id: Uuid,
        buyer_id: Uuid,
    ) -> AppResult<Uuid> {
        if let Some(id) = self.find_conversation(listing_id, buyer_id).await? {
            return Ok(id);
        }

        let id = Uuid::new_v4();
        let inserted = sqlx::query(
            "INSERT INTO conversations (id, listing_id, buyer_id, seller_id) VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(listing_id)
        .bind(buyer_id)
        .bind(seller_id)
        .execute(&self.db)
        .await;

        match inserted {
            Ok(_) => Ok(id),
            // Another session of the same buyer won the insert; fetch the
            // winning row instead of surfacing the violation.
            Err(e) if is_unique_violation(&e) => {
                tracing::debug!(%listing_id, %buyer_id, "conversation insert lost creation race");
                self.find_conversation(listing_id, buyer_id)
                    .await?
                    .ok_or(AppError::NotFound)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<ConversationSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.listing_id, c.buyer_id, c.seller_id, c.created_at,
                   l.title AS listing_title,
                   l.price_cents AS listing_price_cents,
                   l.image_url AS listing_image_url,
                   p.display_name AS counterpart_name
            FROM conversations c
            JOIN listings l ON l.id = c.listing_id
            JOIN profiles p
              ON p.id = CASE WHEN c.buyer_id = $1 THEN c.seller_id ELSE c.buyer_id END
            WHERE c.buyer_id = $1 OR c.seller_id = $1
            ORDER BY c.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        let summaries = rows
            .into_iter()
            .map(|r| ConversationSummary {
                id: r.get("id"),
                listing_id: r.get("listing_id"),
                buyer_id: r.get("buyer_id"),
                seller_id: r.get("seller_id"),
                created_at: r.get("created_at"),
                listing_title: r.get("listing_title"),
                listing_price_cents: r.get("listing_price_cents"),
                listing_image_url: r.try_get("listing_image_url").ok(),
                counterpart_name: r.get("counterpart_name"),
            })
            .collect();

        Ok(summaries)
    }

    async fn delete(&self, conversation_id: Uuid) -> AppResult<()> {
        // Two deliberate steps, no transaction: this mirrors the hosted
        // store's row-level interface. Removing zero messages is fine.
        sqlx::query("DELETE FROM messages WHERE conversation_id = $1")
            .bind(conversation_id)
            .execute(&self.db)
            .await?;

        match sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(conversation_id)
            .execute(&self.db)
            .await
        {
            // Zero rows affected means someone else already deleted it.
            Ok(_) => Ok(()),
            Err(source) => Err(AppError::PartialDelete {
                conversation_id,
                source,
            }),
        }
    }
}

#[async_trait]
impl MessageStore for PgStore {
    async fn history(&self, conversation_id: Uuid) -> AppResult<Vec<Message>> {
        let rows = sqlx::query(
            "SELECT id, conversation_id, sender_id, content, created_at \
             FROM messages WHERE conversation_id = $1 ORDER BY created_at ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.db)
        .await?;

        let messages = rows
            .into_iter()
            .map(|r| Message {
                id: r.get("id"),
                conversation_id: r.get("conversation_id"),
                sender_id: r.get("sender_id"),
                content: r.get("content"),
                created_at: r.get("created_at"),
            })
            .collect();

        Ok(messages)
    }

    async fn send(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> AppResult<Message> {
        if content.trim().is_empty() {
            return Err(AppError::BadRequest("message content cannot be empty".into()));
        }

        let (buyer_id, seller_id) = self.participants(conversation_id).await?;
        if sender_id != buyer_id && sender_id != seller_id {
            return Err(AppError::NotParticipant);
        }

        let id = Uuid::new_v4();
        let row = sqlx::query(
            "INSERT INTO messages (id, conversation_id, sender_id, content) \
             VALUES ($1, $2, $3, $4) RETURNING created_at",
        )
        .bind(id)
        .bind(conversation_id)
        .bind(sender_id)
        .bind(content)
        .fetch_one(&self.db)
        .await?;
        let created_at: DateTime<Utc> = row.get("created_at");

        let message = Message {
            id,
            conversation_id,
            sender_id,
            content: content.to_string(),
            created_at,
        };

        // Publish failure never fails the send; subscribers fall back to a
        // fresh history load.
        if let Some(redis) = &self.redis {
            if let Err(e) = pubsub::publish_message(redis, &message).await {
                tracing::warn!(error = %e, %conversation_id, "failed to publish message event");
            }
        }

        Ok(message)
    }
}
