use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::Message;

pub mod pubsub;

pub use pubsub::RedisFeed;

/// Opens a push channel delivering confirmed inserts for one conversation.
#[async_trait]
pub trait MessageFeed: Send + Sync {
    async fn subscribe(&self, conversation_id: Uuid) -> AppResult<FeedHandle>;
}

/// An open push channel. Closing (or dropping) the handle tears the
/// underlying subscription down. A leaked handle keeps stale events
/// flowing, which is a correctness bug rather than a resource leak.
pub struct FeedHandle {
    conversation_id: Uuid,
    events: UnboundedReceiver<Message>,
    pump: Option<JoinHandle<()>>,
}

impl FeedHandle {
    pub fn new(
        conversation_id: Uuid,
        events: UnboundedReceiver<Message>,
        pump: JoinHandle<()>,
    ) -> Self {
        Self {
            conversation_id,
            events,
            pump: Some(pump),
        }
    }

    /// A handle fed directly by the caller, with no pump task. Used by
    /// in-process feeds and test fakes.
    pub fn detached(conversation_id: Uuid, events: UnboundedReceiver<Message>) -> Self {
        Self {
            conversation_id,
            events,
            pump: None,
        }
    }

    pub fn conversation_id(&self) -> Uuid {
        self.conversation_id
    }

    /// Pops the next delivered event without waiting.
    pub fn try_next(&mut self) -> Option<Message> {
        self.events.try_recv().ok()
    }

    pub async fn next(&mut self) -> Option<Message> {
        self.events.recv().await
    }

    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.events.close();
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Lifecycle of the single live subscription an inbox holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Idle,
    Subscribing,
    Subscribed,
}

/// Keeps at most one subscription open. Switching conversations closes the
/// previous channel before the next one is opened, so a stale filter can
/// never deliver into the new thread.
pub struct SubscriptionManager {
    feed: Arc<dyn MessageFeed>,
    active: Option<FeedHandle>,
    state: SubscriptionState,
}

impl SubscriptionManager {
    pub fn new(feed: Arc<dyn MessageFeed>) -> Self {
        Self {
            feed,
            active: None,
            state: SubscriptionState::Idle,
        }
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    pub fn active_conversation(&self) -> Option<Uuid> {
        self.active.as_ref().map(|h| h.conversation_id())
    }

    pub async fn switch_to(&mut self, conversation_id: Uuid) -> AppResult<()> {
        self.close();
        self.state = SubscriptionState::Subscribing;
        match self.feed.subscribe(conversation_id).await {
            Ok(handle) => {
                self.active = Some(handle);
                self.state = SubscriptionState::Subscribed;
                Ok(())
            }
            Err(e) => {
                self.state = SubscriptionState::Idle;
                Err(e)
            }
        }
    }

    pub fn close(&mut self) {
        if let Some(handle) = self.active.take() {
            handle.close();
        }
        self.state = SubscriptionState::Idle;
    }

    /// Pops the next pending event for the active conversation. Events
    /// carrying any other conversation id are discarded here even though
    /// the channel itself is already scoped to one conversation.
    pub fn try_next(&mut self) -> Option<Message> {
        let handle = self.active.as_mut()?;
        while let Some(message) = handle.try_next() {
            if message.conversation_id == handle.conversation_id() {
                return Some(message);
            }
            tracing::warn!(
                got = %message.conversation_id,
                want = %handle.conversation_id(),
                "dropping event for foreign conversation"
            );
        }
        None
    }
}
