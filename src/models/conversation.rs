use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A negotiation channel scoped to one listing and one buyer/seller pair.
/// At most one exists per (listing_id, buyer_id); seller_id is denormalized
/// from the listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// One inbox row: a conversation enriched with listing details and the
/// counterpart's display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub listing_title: String,
    pub listing_price_cents: i64,
    pub listing_image_url: Option<String>,
    pub counterpart_name: String,
}

impl ConversationSummary {
    pub fn counterpart_id(&self, user_id: Uuid) -> Uuid {
        if self.buyer_id == user_id {
            self.seller_id
        } else {
            self.buyer_id
        }
    }
}
