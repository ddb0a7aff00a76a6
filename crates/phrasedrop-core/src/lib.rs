//! # Phrasedrop Core
//!
//! Shared foundation for the Phrasedrop delivery system: the unified error
//! type, TOML configuration, the data model (recipients, phrases, capability
//! roles), fault reports, and the collaborator traits the delivery core is
//! written against.

pub mod config;
pub mod error;
pub mod report;
pub mod traits;
pub mod types;

pub use config::PhrasedropConfig;
pub use error::{PhrasedropError, Result};
pub use report::FaultReport;
pub use types::{ChatId, Phrase, Recipient, Role};
