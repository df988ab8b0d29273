#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::SeqCst;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::Mutex;
use uuid::Uuid;

use bazaar_messaging::auth::{CurrentUser, SessionAuth};
use bazaar_messaging::error::{AppError, AppResult};
use bazaar_messaging::inbox::{InboxController, InboxDeps, MemoryIntentSlot, Viewport};
use bazaar_messaging::models::{ConversationSummary, Message};
use bazaar_messaging::notify::{ConfirmPrompt, Notifier};
use bazaar_messaging::realtime::{FeedHandle, MessageFeed};
use bazaar_messaging::store::{ConversationStore, MessageStore};

#[derive(Clone)]
pub struct ListingFixture {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub title: String,
    pub price_cents: i64,
}

struct StoredConversation {
    id: Uuid,
    listing_id: Uuid,
    buyer_id: Uuid,
    seller_id: Uuid,
    created_at: chrono::DateTime<Utc>,
    seq: u64,
}

#[derive(Default)]
struct StoreState {
    profiles: HashMap<Uuid, String>,
    listings: HashMap<Uuid, ListingFixture>,
    conversations: Vec<StoredConversation>,
    messages: Vec<Message>,
    seq: u64,
}

/// In-memory stand-in for the hosted data store. Confirmed sends are
/// echoed onto the fake feed, like the real channel would.
pub struct MemoryStore {
    state: Mutex<StoreState>,
    feed: FakeFeed,
    pub fail_sends: AtomicBool,
    pub fail_conversation_delete: AtomicBool,
    pub fail_list: AtomicBool,
}

impl MemoryStore {
    pub fn new(feed: FakeFeed) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            feed,
            fail_sends: AtomicBool::new(false),
            fail_conversation_delete: AtomicBool::new(false),
            fail_list: AtomicBool::new(false),
        }
    }

    pub async fn add_profile(&self, id: Uuid, display_name: &str) {
        self.state
            .lock()
            .await
            .profiles
            .insert(id, display_name.to_string());
    }

    pub async fn add_listing(&self, listing: ListingFixture) {
        self.state.lock().await.listings.insert(listing.id, listing);
    }

    pub async fn conversation_count(&self) -> usize {
        self.state.lock().await.conversations.len()
    }

    pub async fn message_count(&self, conversation_id: Uuid) -> usize {
        self.state
            .lock()
            .await
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .count()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn get_or_create(
        &self,
        listing_id: Uuid,
        seller_id: Uuid,
        buyer_id: Uuid,
    ) -> AppResult<Uuid> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state
            .conversations
            .iter()
            .find(|c| c.listing_id == listing_id && c.buyer_id == buyer_id)
        {
            return Ok(existing.id);
        }
        let id = Uuid::new_v4();
        let seq = state.seq;
        state.seq += 1;
        state.conversations.push(StoredConversation {
            id,
            listing_id,
            buyer_id,
            seller_id,
            created_at: Utc::now(),
            seq,
        });
        Ok(id)
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<ConversationSummary>> {
        if self.fail_list.load(SeqCst) {
            return Err(AppError::Timeout(Duration::from_millis(5)));
        }
        let state = self.state.lock().await;
        let mut rows: Vec<&StoredConversation> = state
            .conversations
            .iter()
            .filter(|c| c.buyer_id == user_id || c.seller_id == user_id)
            .collect();
        rows.sort_by(|a, b| b.seq.cmp(&a.seq));

        let summaries = rows
            .into_iter()
            .map(|c| {
                let listing = state.listings.get(&c.listing_id);
                let counterpart = if c.buyer_id == user_id {
                    c.seller_id
                } else {
                    c.buyer_id
                };
                ConversationSummary {
                    id: c.id,
                    listing_id: c.listing_id,
                    buyer_id: c.buyer_id,
                    seller_id: c.seller_id,
                    created_at: c.created_at,
                    listing_title: listing.map(|l| l.title.clone()).unwrap_or_default(),
                    listing_price_cents: listing.map(|l| l.price_cents).unwrap_or_default(),
                    listing_image_url: None,
                    counterpart_name: state
                        .profiles
                        .get(&counterpart)
                        .cloned()
                        .unwrap_or_default(),
                }
            })
            .collect();
        Ok(summaries)
    }

    async fn delete(&self, conversation_id: Uuid) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state
            .messages
            .retain(|m| m.conversation_id != conversation_id);
        if self.fail_conversation_delete.load(SeqCst) {
            return Err(AppError::PartialDelete {
                conversation_id,
                source: sqlx::Error::RowNotFound,
            });
        }
        state.conversations.retain(|c| c.id != conversation_id);
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn history(&self, conversation_id: Uuid) -> AppResult<Vec<Message>> {
        let state = self.state.lock().await;
        let mut messages: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.created_at);
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
        if self.fail_sends.load(SeqCst) {
            return Err(AppError::Timeout(Duration::from_millis(5)));
        }
        let mut state = self.state.lock().await;
        let conversation = state
            .conversations
            .iter()
            .find(|c| c.id == conversation_id)
            .ok_or(AppError::NotFound)?;
        if sender_id != conversation.buyer_id && sender_id != conversation.seller_id {
            return Err(AppError::NotParticipant);
        }

        let message = Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        state.messages.push(message.clone());
        // Echo onto the channel, as the hosted store's realtime layer does.
        self.feed.push(message.clone());
        Ok(message)
    }
}

/// Fake push channel: a registry of per-conversation senders.
#[derive(Default, Clone)]
pub struct FakeFeed {
    senders: Arc<StdMutex<HashMap<Uuid, Vec<UnboundedSender<Message>>>>>,
}

impl FakeFeed {
    pub fn push(&self, message: Message) {
        let mut guard = self.senders.lock().unwrap();
        if let Some(list) = guard.get_mut(&message.conversation_id) {
            list.retain(|tx| tx.send(message.clone()).is_ok());
        }
    }

    /// How many live (unclosed) subscriptions exist for a conversation.
    pub fn open_channels(&self, conversation_id: Uuid) -> usize {
        let guard = self.senders.lock().unwrap();
        guard
            .get(&conversation_id)
            .map(|list| list.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl MessageFeed for FakeFeed {
    async fn subscribe(&self, conversation_id: Uuid) -> AppResult<FeedHandle> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders
            .lock()
            .unwrap()
            .entry(conversation_id)
            .or_default()
            .push(tx);
        Ok(FeedHandle::detached(conversation_id, rx))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    successes: StdMutex<Vec<String>>,
    errors: StdMutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn successes(&self) -> Vec<String> {
        self.successes.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, text: &str) {
        self.successes.lock().unwrap().push(text.to_string());
    }

    fn error(&self, text: &str) {
        self.errors.lock().unwrap().push(text.to_string());
    }
}

pub struct AlwaysConfirm;

#[async_trait]
impl ConfirmPrompt for AlwaysConfirm {
    async fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

pub struct NeverConfirm;

#[async_trait]
impl ConfirmPrompt for NeverConfirm {
    async fn confirm(&self, _prompt: &str) -> bool {
        false
    }
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub feed: FakeFeed,
    pub notifier: Arc<RecordingNotifier>,
    pub intents: Arc<MemoryIntentSlot>,
    pub buyer: CurrentUser,
    pub seller: CurrentUser,
    pub listing_id: Uuid,
}

/// One listing ("Dorm fridge") with its seller, plus a buyer.
pub async fn fixture() -> Fixture {
    let feed = FakeFeed::default();
    let store = Arc::new(MemoryStore::new(feed.clone()));

    let buyer = CurrentUser {
        id: Uuid::new_v4(),
        email: "maya@campus.edu".into(),
    };
    let seller = CurrentUser {
        id: Uuid::new_v4(),
        email: "theo@campus.edu".into(),
    };
    store.add_profile(buyer.id, "Maya").await;
    store.add_profile(seller.id, "Theo").await;

    let listing_id = Uuid::new_v4();
    store
        .add_listing(ListingFixture {
            id: listing_id,
            seller_id: seller.id,
            title: "Dorm fridge".into(),
            price_cents: 4_500,
        })
        .await;

    Fixture {
        store,
        feed,
        notifier: Arc::new(RecordingNotifier::default()),
        intents: Arc::new(MemoryIntentSlot::default()),
        buyer,
        seller,
        listing_id,
    }
}

impl Fixture {
    pub fn controller(&self, user: &CurrentUser, viewport: Viewport) -> InboxController {
        self.controller_with_prompt(user, viewport, Arc::new(AlwaysConfirm))
    }

    pub fn controller_with_prompt(
        &self,
        user: &CurrentUser,
        viewport: Viewport,
        prompt: Arc<dyn ConfirmPrompt>,
    ) -> InboxController {
        let deps = InboxDeps {
            conversations: self.store.clone(),
            messages: self.store.clone(),
            feed: Arc::new(self.feed.clone()),
            auth: Arc::new(SessionAuth::signed_in(user.clone())),
            notifier: self.notifier.clone(),
            prompt,
            intents: self.intents.clone(),
        };
        InboxController::new(deps, viewport, Duration::from_secs(5))
    }

    pub fn controller_signed_out(&self, viewport: Viewport) -> InboxController {
        let deps = InboxDeps {
            conversations: self.store.clone(),
            messages: self.store.clone(),
            feed: Arc::new(self.feed.clone()),
            auth: Arc::new(SessionAuth::signed_out()),
            notifier: self.notifier.clone(),
            prompt: Arc::new(AlwaysConfirm),
            intents: self.intents.clone(),
        };
        InboxController::new(deps, viewport, Duration::from_secs(5))
    }
}
