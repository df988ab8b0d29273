use async_trait::async_trait;
use futures_util::StreamExt;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::Message;
use crate::redis_client::RedisClient;

use super::{FeedHandle, MessageFeed};

fn channel_for_conversation(id: Uuid) -> String {
    format!("conversation:{id}")
}

/// Wire format for events on a conversation channel. Only inserts are
/// published today; the tag leaves room for more.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChannelEvent {
    #[serde(rename = "message_created")]
    MessageCreated { message: Message },
}

pub async fn publish_message(redis: &RedisClient, message: &Message) -> AppResult<()> {
    let payload = serde_json::to_string(&ChannelEvent::MessageCreated {
        message: message.clone(),
    })?;
    let mut conn = redis.manager();
    let ch = channel_for_conversation(message.conversation_id);
    conn.publish::<_, _, ()>(ch, payload).await?;
    Ok(())
}

/// Redis pub/sub feed: one SUBSCRIBE per conversation, so the filter lives
/// on the server side of the channel.
pub struct RedisFeed {
    redis: RedisClient,
}

impl RedisFeed {
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl MessageFeed for RedisFeed {
    async fn subscribe(&self, conversation_id: Uuid) -> AppResult<FeedHandle> {
        let mut pubsub = self.redis.pubsub().await?;
        pubsub.subscribe(channel_for_conversation(conversation_id)).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let pump = tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(e) => {
                        tracing::warn!(error = %e, "unreadable channel payload");
                        continue;
                    }
                };
                match serde_json::from_str::<ChannelEvent>(&payload) {
                    Ok(ChannelEvent::MessageCreated { message }) => {
                        // The channel is scoped to one conversation already;
                        // the id check guards against a mispublished event.
                        if message.conversation_id != conversation_id {
                            tracing::warn!(
                                got = %message.conversation_id,
                                want = %conversation_id,
                                "event for foreign conversation on scoped channel"
                            );
                            continue;
                        }
                        if tx.send(message).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "ignoring unrecognized channel payload");
                    }
                }
            }
        });

        Ok(FeedHandle::new(conversation_id, rx, pump))
    }
}
