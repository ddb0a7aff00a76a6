//! # Phrasedrop Scheduler
//!
//! The periodic delivery core: anchored wakeup arithmetic, the background
//! cycle timer, fair phrase distribution, the delivery cycle itself, and the
//! fault escalation pipeline.
//!
//! ## Architecture
//! ```text
//! CycleTimer (tokio worker, sliced sleeps, cooperative stop)
//!   └── tick → DeliveryCycle::run()
//!         ├── distribute::assign()         — one unseen phrase per recipient
//!         ├── Notifier::send()             — fallback text on an empty pool
//!         ├── Store::record_consumption()  — one transaction, successes only
//!         └── EscalationPipeline::notify() — aggregated outcomes, fan-out
//!               ├── LogChannel (baseline, cannot fail)
//!               ├── Telegram → operator chats
//!               └── Email (optional)
//! ```

pub mod cycle;
pub mod distribute;
pub mod escalate;
pub mod timer;
pub mod wakeup;

pub use cycle::{DeliveryCycle, EXHAUSTED_MESSAGE};
pub use distribute::Assignment;
pub use escalate::{EscalationPipeline, LogChannel};
pub use timer::CycleTimer;
pub use wakeup::WakeupSchedule;
