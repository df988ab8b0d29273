pub mod controller;
pub mod intent;
pub mod reconcile;

pub use controller::{InboxController, InboxDeps, PaneView, Viewport};
pub use intent::{ContactIntent, IntentSlot, MemoryIntentSlot, RedisIntentSlot};
pub use reconcile::{ChatEntry, MessageThread};
