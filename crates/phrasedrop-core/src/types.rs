//! Data model: recipients, phrases, capability roles.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Telegram chat identifier — the delivery target for a recipient.
pub type ChatId = i64;

/// A distributable phrase. Text is unique across the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phrase {
    pub id: Uuid,
    pub text: String,
}

/// Capability a recipient may hold. Closed set, checked by explicit match,
/// never by open-ended role strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Subscriber,
}

/// A registered chat. The delivery core only ever reads recipients; they are
/// created and mutated through the directory side of the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub id: Uuid,
    pub chat_id: ChatId,
    pub is_admin: bool,
    pub subscribed: bool,
}

impl Recipient {
    pub fn has_role(&self, role: Role) -> bool {
        match role {
            Role::Admin => self.is_admin,
            Role::Subscriber => self.subscribed,
        }
    }
}
