use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::models::Message;

/// One row of the displayed thread. Pending entries are locally-originated
/// sends the store has not yet acknowledged; confirmed entries carry the
/// server id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEntry {
    Pending {
        local_id: Uuid,
        sender_id: Uuid,
        content: String,
        queued_at: DateTime<Utc>,
    },
    Confirmed(Message),
}

impl ChatEntry {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            ChatEntry::Pending { queued_at, .. } => *queued_at,
            ChatEntry::Confirmed(m) => m.created_at,
        }
    }

    pub fn sender_id(&self) -> Uuid {
        match self {
            ChatEntry::Pending { sender_id, .. } => *sender_id,
            ChatEntry::Confirmed(m) => m.sender_id,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            ChatEntry::Pending { content, .. } => content,
            ChatEntry::Confirmed(m) => &m.content,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ChatEntry::Pending { .. })
    }
}

/// The single source of truth for "messages currently displayed" in one
/// conversation. Merges the initial history, local optimistic sends and
/// channel-delivered rows into a de-duplicated list sorted ascending by
/// timestamp.
#[derive(Debug)]
pub struct MessageThread {
    conversation_id: Uuid,
    entries: Vec<ChatEntry>,
    seen: HashSet<Uuid>,
}

impl MessageThread {
    pub fn new(conversation_id: Uuid) -> Self {
        Self {
            conversation_id,
            entries: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub fn from_history(conversation_id: Uuid, history: Vec<Message>) -> Self {
        let mut thread = Self::new(conversation_id);
        for message in history {
            thread.apply_confirmed(message);
        }
        thread
    }

    pub fn conversation_id(&self) -> Uuid {
        self.conversation_id
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_pending(&self) -> bool {
        self.entries.iter().any(ChatEntry::is_pending)
    }

    /// Appends an optimistic entry and returns its local id. The stand-in
    /// timestamp is pushed past the newest entry already displayed so a
    /// pending bubble can never sort into the middle of confirmed history.
    pub fn push_pending(&mut self, sender_id: Uuid, content: &str) -> Uuid {
        let local_id = Uuid::new_v4();
        let mut queued_at = Utc::now();
        if let Some(last) = self.entries.last() {
            let floor = last.timestamp() + Duration::milliseconds(1);
            if queued_at < floor {
                queued_at = floor;
            }
        }
        self.entries.push(ChatEntry::Pending {
            local_id,
            sender_id,
            content: content.to_string(),
            queued_at,
        });
        local_id
    }

    /// Folds one confirmed row in, whether it arrived from the send
    /// response or from the live channel. Applying the same row twice is a
    /// no-op; the first arrival replaces its matching pending entry in
    /// place rather than appending a duplicate. Returns whether the list
    /// changed.
    pub fn apply_confirmed(&mut self, message: Message) -> bool {
        if message.conversation_id != self.conversation_id {
            return false;
        }
        if !self.seen.insert(message.id) {
            return false;
        }

        let matching_pending = self.entries.iter().position(|e| {
            matches!(
                e,
                ChatEntry::Pending { sender_id, content, .. }
                    if *sender_id == message.sender_id && content == &message.content
            )
        });

        match matching_pending {
            Some(idx) => self.entries[idx] = ChatEntry::Confirmed(message),
            None => self.entries.push(ChatEntry::Confirmed(message)),
        }
        self.resort();
        true
    }

    /// Drops a failed optimistic entry. Returns whether it was present.
    pub fn remove_pending(&mut self, local_id: Uuid) -> bool {
        let before = self.entries.len();
        self.entries.retain(
            |e| !matches!(e, ChatEntry::Pending { local_id: id, .. } if *id == local_id),
        );
        before != self.entries.len()
    }

    fn resort(&mut self) {
        // Stable sort: entries with equal timestamps keep arrival order.
        self.entries.sort_by_key(ChatEntry::timestamp);
    }
}
