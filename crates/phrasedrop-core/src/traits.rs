//! Collaborator interfaces consumed by the delivery core.
//!
//! The core never talks to SQLite, the Telegram API, or SMTP directly; it is
//! written against these traits so the hosting process decides the concrete
//! backends (and tests substitute their own).

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::report::FaultReport;
use crate::types::{ChatId, Phrase};

/// Read access to the subscriber base.
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    /// Recipients currently eligible for delivery, with their chat targets.
    async fn list_eligible(&self) -> Result<Vec<(Uuid, ChatId)>>;

    /// Chats of recipients holding the admin capability, used as the
    /// targets for operator-facing escalation.
    async fn admin_chats(&self) -> Result<Vec<ChatId>>;
}

/// The phrase pool and the consumption ledger.
#[async_trait]
pub trait Store: Send + Sync {
    async fn all_phrases(&self) -> Result<Vec<Phrase>>;

    /// Phrase ids not yet delivered to the given recipient.
    async fn unconsumed_for(&self, recipient: Uuid) -> Result<Vec<Uuid>>;

    /// Commit consumption records atomically: either every pair is recorded
    /// or none is.
    async fn record_consumption(&self, pairs: &[(Uuid, Uuid)]) -> Result<()>;

    /// Insert phrases whose text is not in the pool yet; duplicate text is
    /// silently skipped. Returns how many were actually inserted.
    async fn add_phrases_if_absent(&self, texts: &[String]) -> Result<usize>;
}

/// Message delivery transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, chat: ChatId, text: &str) -> Result<()>;
}

/// A sink that turns a failure into a human-visible report. Channel failures
/// are swallowed by the pipeline, never propagated to the delivery cycle.
#[async_trait]
pub trait EscalationChannel: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(&self, report: &FaultReport) -> Result<()>;
}
