use async_trait::async_trait;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::AppResult;
use crate::redis_client::RedisClient;

/// A "contact seller" action stashed by another part of the app (e.g. a
/// listing detail view) for the inbox to pick up on its next mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactIntent {
    pub listing_id: Uuid,
    pub seller_id: Uuid,
}

/// Durable write-once / read-once-and-clear slot for the deferred-contact
/// handoff.
#[async_trait]
pub trait IntentSlot: Send + Sync {
    async fn stash(&self, intent: ContactIntent) -> AppResult<()>;

    /// Returns the stashed intent and clears the slot in one step, so a
    /// second mount observes nothing.
    async fn take(&self) -> AppResult<Option<ContactIntent>>;
}

/// Process-local slot.
#[derive(Default)]
pub struct MemoryIntentSlot {
    slot: Mutex<Option<ContactIntent>>,
}

#[async_trait]
impl IntentSlot for MemoryIntentSlot {
    async fn stash(&self, intent: ContactIntent) -> AppResult<()> {
        *self.slot.lock().await = Some(intent);
        Ok(())
    }

    async fn take(&self) -> AppResult<Option<ContactIntent>> {
        Ok(self.slot.lock().await.take())
    }
}

/// Redis-backed slot, keyed per user so two signed-in sessions do not
/// consume each other's handoff. GETDEL makes the read-once-and-clear step
/// atomic across tabs.
pub struct RedisIntentSlot {
    redis: RedisClient,
    key: String,
}

impl RedisIntentSlot {
    pub fn for_user(redis: RedisClient, user_id: Uuid) -> Self {
        Self {
            redis,
            key: format!("contact-intent:{user_id}"),
        }
    }
}

#[async_trait]
impl IntentSlot for RedisIntentSlot {
    async fn stash(&self, intent: ContactIntent) -> AppResult<()> {
        let payload = serde_json::to_string(&intent)?;
        let mut conn = self.redis.manager();
        conn.set::<_, _, ()>(&self.key, payload).await?;
        Ok(())
    }

    async fn take(&self) -> AppResult<Option<ContactIntent>> {
        let mut conn = self.redis.manager();
        let payload: Option<String> = redis::cmd("GETDEL")
            .arg(&self.key)
            .query_async(&mut conn)
            .await?;
        match payload {
            Some(p) => Ok(Some(serde_json::from_str(&p)?)),
            None => Ok(None),
        }
    }
}
