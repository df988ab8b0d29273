use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::auth::{AuthProvider, CurrentUser};
use crate::error::{AppError, AppResult};
use crate::inbox::intent::{ContactIntent, IntentSlot};
use crate::inbox::reconcile::MessageThread;
use crate::models::ConversationSummary;
use crate::notify::{ConfirmPrompt, Notifier};
use crate::realtime::{MessageFeed, SubscriptionManager, SubscriptionState};
use crate::store::{ConversationStore, MessageStore};
use crate::util::retry::{with_retry, RetryConfig};
use crate::util::timeout::with_timeout;

/// Rendering context the shell reports at mount time. Wide viewports show
/// list and thread side by side and may auto-select; narrow ones toggle
/// between the two panes and never auto-select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewport {
    Wide,
    Narrow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneView {
    List,
    Thread,
}

/// Collaborators, injected so tests can substitute fakes. Each controller
/// instance owns its own state; there is no process-wide store.
#[derive(Clone)]
pub struct InboxDeps {
    pub conversations: Arc<dyn ConversationStore>,
    pub messages: Arc<dyn MessageStore>,
    pub feed: Arc<dyn MessageFeed>,
    pub auth: Arc<dyn AuthProvider>,
    pub notifier: Arc<dyn Notifier>,
    pub prompt: Arc<dyn ConfirmPrompt>,
    pub intents: Arc<dyn IntentSlot>,
}

pub struct InboxController {
    deps: InboxDeps,
    store_timeout: Duration,
    refetch_retry: RetryConfig,
    viewport: Viewport,
    view: PaneView,
    user: Option<CurrentUser>,
    conversations: Vec<ConversationSummary>,
    subscription: SubscriptionManager,
    thread: Option<MessageThread>,
    load_failed: bool,
}

impl InboxController {
    pub fn new(deps: InboxDeps, viewport: Viewport, store_timeout: Duration) -> Self {
        let subscription = SubscriptionManager::new(deps.feed.clone());
        Self {
            deps,
            store_timeout,
            refetch_retry: RetryConfig::default(),
            viewport,
            view: PaneView::List,
            user: None,
            conversations: Vec::new(),
            subscription,
            thread: None,
            load_failed: false,
        }
    }

    pub fn conversations(&self) -> &[ConversationSummary] {
        &self.conversations
    }

    pub fn active_conversation(&self) -> Option<Uuid> {
        self.thread.as_ref().map(MessageThread::conversation_id)
    }

    pub fn thread(&self) -> Option<&MessageThread> {
        self.thread.as_ref()
    }

    pub fn view(&self) -> PaneView {
        self.view
    }

    pub fn subscription_state(&self) -> SubscriptionState {
        self.subscription.state()
    }

    /// Whether the last list load failed; the shell renders an error inbox
    /// instead of a spinner when set.
    pub fn load_failed(&self) -> bool {
        self.load_failed
    }

    pub fn user(&self) -> Option<&CurrentUser> {
        self.user.as_ref()
    }

    fn current_user(&self) -> AppResult<&CurrentUser> {
        self.user.as_ref().ok_or(AppError::Unauthenticated)
    }

    /// Loads the inbox for the signed-in user, consumes a deferred
    /// contact-seller handoff if one was stashed, and applies the
    /// auto-selection rule for the viewport.
    pub async fn mount(&mut self) -> AppResult<()> {
        let user = self
            .deps
            .auth
            .current_user()
            .await
            .ok_or(AppError::Unauthenticated)?;
        self.user = Some(user.clone());

        match with_timeout(
            self.store_timeout,
            self.deps.conversations.list_for_user(user.id),
        )
        .await
        {
            Ok(list) => {
                self.conversations = list;
                self.load_failed = false;
            }
            Err(e) => {
                tracing::warn!(error = %e, "inbox list load failed");
                self.conversations.clear();
                self.load_failed = true;
                self.deps.notifier.error("Could not load your conversations");
                return Ok(());
            }
        }

        // The slot is cleared before the conversation is resolved, so a
        // remount never replays the handoff.
        let intent = match self.deps.intents.take().await {
            Ok(intent) => intent,
            Err(e) => {
                tracing::warn!(error = %e, "contact intent lookup failed");
                None
            }
        };
        if let Some(ContactIntent {
            listing_id,
            seller_id,
        }) = intent
        {
            match with_timeout(
                self.store_timeout,
                self.deps
                    .conversations
                    .get_or_create(listing_id, seller_id, user.id),
            )
            .await
            {
                Ok(conversation_id) => {
                    self.refresh_conversations().await;
                    self.select_conversation(conversation_id).await?;
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(error = %e, %listing_id, "deferred contact-seller handoff failed");
                    self.deps
                        .notifier
                        .error("Could not open the conversation for this listing");
                }
            }
        }

        if self.viewport == Viewport::Wide && self.active_conversation().is_none() {
            if let Some(newest) = self.conversations.first().map(|c| c.id) {
                self.select_conversation(newest).await?;
            }
        }
        Ok(())
    }

    /// Switches the active conversation. The previous channel is closed
    /// before history is fetched and the next channel opened, so nothing
    /// from the old subscription can land in the new thread.
    pub async fn select_conversation(&mut self, conversation_id: Uuid) -> AppResult<()> {
        self.current_user()?;
        self.subscription.close();
        self.thread = None;

        let history = with_timeout(
            self.store_timeout,
            self.deps.messages.history(conversation_id),
        )
        .await?;
        self.subscription.switch_to(conversation_id).await?;
        self.thread = Some(MessageThread::from_history(conversation_id, history));
        self.view = PaneView::Thread;
        Ok(())
    }

    /// Narrow-viewport navigation back to the conversation list. The
    /// thread leaves scope, so its subscription is closed; returning
    /// re-fetches history.
    pub fn back_to_list(&mut self) {
        self.subscription.close();
        self.thread = None;
        self.view = PaneView::List;
    }

    /// Optimistic send: the entry is displayed immediately and reconciled
    /// (or removed, with a notification) once the store answers.
    pub async fn send(&mut self, content: &str) -> AppResult<()> {
        let sender_id = self.current_user()?.id;
        if content.trim().is_empty() {
            return Err(AppError::BadRequest("message content cannot be empty".into()));
        }
        let Some(thread) = self.thread.as_mut() else {
            return Err(AppError::NotFound);
        };
        let conversation_id = thread.conversation_id();
        let local_id = thread.push_pending(sender_id, content);

        match with_timeout(
            self.store_timeout,
            self.deps.messages.send(conversation_id, sender_id, content),
        )
        .await
        {
            Ok(confirmed) => {
                // The channel echo may already have landed; apply_confirmed
                // is idempotent either way.
                if let Some(thread) = self.thread.as_mut() {
                    if thread.conversation_id() == conversation_id {
                        thread.apply_confirmed(confirmed);
                    }
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, %conversation_id, "send failed");
                if let Some(thread) = self.thread.as_mut() {
                    thread.remove_pending(local_id);
                }
                self.deps.notifier.error("Message not sent. Try again.");
                Ok(())
            }
        }
    }

    /// Removes a conversation after user confirmation. The list is updated
    /// optimistically; a store failure is reported and followed by a
    /// silent re-fetch instead of hand-restoring the removed row.
    pub async fn delete_conversation(&mut self, conversation_id: Uuid) -> AppResult<()> {
        self.current_user()?;
        let Some(idx) = self
            .conversations
            .iter()
            .position(|c| c.id == conversation_id)
        else {
            return Err(AppError::NotFound);
        };

        let title = self.conversations[idx].listing_title.clone();
        let prompt = format!("Delete the conversation about \"{title}\"? This cannot be undone.");
        if !self.deps.prompt.confirm(&prompt).await {
            return Ok(());
        }

        self.conversations.remove(idx);
        if self.active_conversation() == Some(conversation_id) {
            self.subscription.close();
            self.thread = None;
            self.view = PaneView::List;
        }

        match with_timeout(
            self.store_timeout,
            self.deps.conversations.delete(conversation_id),
        )
        .await
        {
            Ok(()) => {
                self.deps.notifier.success("Conversation deleted");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, %conversation_id, "conversation delete failed");
                self.deps.notifier.error("Could not delete the conversation");
                self.refresh_conversations().await;
                Ok(())
            }
        }
    }

    /// Drains the live channel into the active thread. Returns how many
    /// events were applied.
    pub fn pump_live(&mut self) -> usize {
        let mut applied = 0;
        while let Some(message) = self.subscription.try_next() {
            let Some(thread) = self.thread.as_mut() else {
                break;
            };
            if message.conversation_id == thread.conversation_id()
                && thread.apply_confirmed(message)
            {
                applied += 1;
            }
        }
        applied
    }

    /// Mandatory teardown when the inbox leaves scope.
    pub fn unmount(&mut self) {
        self.subscription.close();
        self.thread = None;
    }

    /// Re-fetches the list from the store, retrying transient failures a
    /// few times. On terminal failure the current (possibly stale) list is
    /// kept; the next mount reconciles.
    async fn refresh_conversations(&mut self) {
        let Some(user_id) = self.user.as_ref().map(|u| u.id) else {
            return;
        };
        let store = self.deps.conversations.clone();
        let timeout = self.store_timeout;
        let retry = self.refetch_retry.clone();

        let result = with_retry(&retry, || {
            let store = store.clone();
            async move { with_timeout(timeout, store.list_for_user(user_id)).await }
        })
        .await;

        match result {
            Ok(list) => self.conversations = list,
            Err(e) => tracing::warn!(error = %e, "conversation list refresh failed"),
        }
    }
}
