//! One delivery cycle: assign, send, record, escalate.

use std::collections::BTreeSet;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use uuid::Uuid;

use phrasedrop_core::error::{PhrasedropError, Result};
use phrasedrop_core::report::FaultReport;
use phrasedrop_core::traits::{Notifier, RecipientDirectory, Store};

use crate::distribute;
use crate::escalate::EscalationPipeline;

/// Sent to a recipient whose unconsumed set is empty. Exhaustion is a
/// graceful state, not an error.
pub const EXHAUSTED_MESSAGE: &str = "We do not have phrases for you :(";

/// Executes one full delivery pass per timer tick.
///
/// Consumption is staged per successful send and committed in one store
/// transaction at the end of the pass, so a failed send leaves the phrase
/// eligible for the next cycle and a half-written ledger is impossible.
pub struct DeliveryCycle {
    directory: Arc<dyn RecipientDirectory>,
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    pipeline: Arc<EscalationPipeline>,
}

impl DeliveryCycle {
    pub fn new(
        directory: Arc<dyn RecipientDirectory>,
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        pipeline: Arc<EscalationPipeline>,
    ) -> Self {
        Self {
            directory,
            store,
            notifier,
            pipeline,
        }
    }

    /// Run one cycle. Never propagates: recoverable outcomes are aggregated
    /// and escalated at most once per class, anything else is escalated as
    /// an unexpected fault. A bad cycle must not stop future cycles.
    pub async fn run(&self) {
        if let Err(e) = self.run_inner().await {
            self.pipeline.notify(FaultReport::unexpected(&e)).await;
        }
    }

    async fn run_inner(&self) -> Result<()> {
        let mut rng = StdRng::from_entropy();
        let assignments =
            distribute::assign(self.directory.as_ref(), self.store.as_ref(), &mut rng).await?;
        tracing::info!("📨 Delivering to {} recipients", assignments.len());

        let mut staged: Vec<(Uuid, Uuid)> = Vec::new();
        let mut send_failures: Vec<PhrasedropError> = Vec::new();
        let mut exhausted = 0usize;

        for assignment in assignments {
            let text = assignment
                .phrase
                .as_ref()
                .map_or(EXHAUSTED_MESSAGE, |p| p.text.as_str());
            if let Err(e) = self.notifier.send(assignment.chat, text).await {
                send_failures.push(e);
                continue;
            }
            match assignment.phrase {
                Some(phrase) => staged.push((assignment.recipient, phrase.id)),
                None => exhausted += 1,
            }
        }

        if !staged.is_empty() {
            if let Err(e) = self.store.record_consumption(&staged).await {
                // Messages already went out, only the bookkeeping is lost;
                // unrecorded phrases will be redelivered next cycle.
                self.pipeline.notify(FaultReport::expected(&e)).await;
            }
        }

        if !send_failures.is_empty() {
            let causes: BTreeSet<String> =
                send_failures.iter().map(|e| e.to_string()).collect();
            self.pipeline
                .notify(FaultReport::aggregate(
                    format!("failed to send {} messages", send_failures.len()),
                    causes.into_iter().collect(),
                ))
                .await;
        }

        if exhausted > 0 {
            self.pipeline
                .notify(FaultReport::aggregate(
                    format!("no phrases left for {exhausted} recipients"),
                    Vec::new(),
                ))
                .await;
        }

        Ok(())
    }
}
