//! # Phrasedrop Channels
//!
//! Concrete transports behind the core's `Notifier` and `EscalationChannel`
//! traits: Telegram Bot API for phrase delivery and operator reports, SMTP
//! for mailed fault reports.

pub mod email;
pub mod telegram;

pub use email::{MailEscalation, Mailer};
pub use telegram::{TelegramChannel, TelegramEscalation};
