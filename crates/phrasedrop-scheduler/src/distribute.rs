//! Fair assignment of unseen phrases to eligible recipients.

use std::collections::HashMap;

use rand::Rng;
use rand::seq::SliceRandom;
use uuid::Uuid;

use phrasedrop_core::error::Result;
use phrasedrop_core::traits::{RecipientDirectory, Store};
use phrasedrop_core::types::{ChatId, Phrase};

/// One cycle's delivery decision for a single recipient. `phrase` is `None`
/// when the recipient has consumed the entire pool.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub recipient: Uuid,
    pub chat: ChatId,
    pub phrase: Option<Phrase>,
}

/// Draw one unseen phrase uniformly at random for every eligible recipient,
/// independently across recipients.
///
/// The draw works over each recipient's full unconsumed set, never as
/// pick-and-retry against the whole pool: retrying cannot terminate once a
/// recipient has consumed everything, and it skews the distribution when few
/// phrases remain.
pub async fn assign<R: Rng>(
    directory: &dyn RecipientDirectory,
    store: &dyn Store,
    rng: &mut R,
) -> Result<Vec<Assignment>> {
    let pool: HashMap<Uuid, Phrase> = store
        .all_phrases()
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut assignments = Vec::new();
    for (recipient, chat) in directory.list_eligible().await? {
        let unconsumed = store.unconsumed_for(recipient).await?;
        let phrase = unconsumed.choose(rng).and_then(|id| pool.get(id)).cloned();
        assignments.push(Assignment {
            recipient,
            chat,
            phrase,
        });
    }
    Ok(assignments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use phrasedrop_core::error::PhrasedropError;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::{HashMap, HashSet};

    struct FixedDirectory(Vec<(Uuid, ChatId)>);

    #[async_trait]
    impl RecipientDirectory for FixedDirectory {
        async fn list_eligible(&self) -> Result<Vec<(Uuid, ChatId)>> {
            Ok(self.0.clone())
        }

        async fn admin_chats(&self) -> Result<Vec<ChatId>> {
            Ok(Vec::new())
        }
    }

    struct FixedStore {
        phrases: Vec<Phrase>,
        consumed: HashMap<Uuid, HashSet<Uuid>>,
    }

    impl FixedStore {
        fn new(texts: &[&str]) -> Self {
            Self {
                phrases: texts
                    .iter()
                    .map(|t| Phrase {
                        id: Uuid::new_v4(),
                        text: t.to_string(),
                    })
                    .collect(),
                consumed: HashMap::new(),
            }
        }
    }

    #[async_trait]
    impl Store for FixedStore {
        async fn all_phrases(&self) -> Result<Vec<Phrase>> {
            Ok(self.phrases.clone())
        }

        async fn unconsumed_for(&self, recipient: Uuid) -> Result<Vec<Uuid>> {
            let seen = self.consumed.get(&recipient);
            Ok(self
                .phrases
                .iter()
                .map(|p| p.id)
                .filter(|id| seen.is_none_or(|s| !s.contains(id)))
                .collect())
        }

        async fn record_consumption(&self, _pairs: &[(Uuid, Uuid)]) -> Result<()> {
            Err(PhrasedropError::store("read-only test store"))
        }

        async fn add_phrases_if_absent(&self, _texts: &[String]) -> Result<usize> {
            Err(PhrasedropError::store("read-only test store"))
        }
    }

    #[tokio::test]
    async fn test_uniform_draw_over_unconsumed_set() {
        let store = FixedStore::new(&["a", "b", "c"]);
        let recipient = Uuid::new_v4();
        let directory = FixedDirectory(vec![(recipient, 100)]);
        let mut rng = StdRng::seed_from_u64(42);

        let trials = 10_000;
        let mut counts: HashMap<Uuid, usize> = HashMap::new();
        for _ in 0..trials {
            let assignments = assign(&directory, &store, &mut rng).await.unwrap();
            let phrase = assignments[0].phrase.as_ref().unwrap();
            *counts.entry(phrase.id).or_default() += 1;
        }

        assert_eq!(counts.len(), 3);
        // Each of k=3 phrases must land within 1/3 ± 0.05.
        for count in counts.values() {
            let frequency = *count as f64 / trials as f64;
            assert!(
                (frequency - 1.0 / 3.0).abs() < 0.05,
                "frequency {frequency} outside tolerance"
            );
        }
    }

    #[tokio::test]
    async fn test_only_unconsumed_phrases_are_drawn() {
        let mut store = FixedStore::new(&["a", "b", "c"]);
        let recipient = Uuid::new_v4();
        let remaining = store.phrases[2].clone();
        store.consumed.insert(
            recipient,
            [store.phrases[0].id, store.phrases[1].id].into(),
        );
        let directory = FixedDirectory(vec![(recipient, 100)]);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..20 {
            let assignments = assign(&directory, &store, &mut rng).await.unwrap();
            assert_eq!(assignments[0].phrase.as_ref(), Some(&remaining));
        }
    }

    #[tokio::test]
    async fn test_exhausted_recipient_gets_none() {
        let mut store = FixedStore::new(&["a", "b"]);
        let exhausted = Uuid::new_v4();
        let fresh = Uuid::new_v4();
        store
            .consumed
            .insert(exhausted, store.phrases.iter().map(|p| p.id).collect());
        let directory = FixedDirectory(vec![(exhausted, 1), (fresh, 2)]);
        let mut rng = StdRng::seed_from_u64(7);

        let assignments = assign(&directory, &store, &mut rng).await.unwrap();
        assert_eq!(assignments.len(), 2);
        assert!(assignments[0].phrase.is_none());
        assert!(assignments[1].phrase.is_some());
    }

    #[tokio::test]
    async fn test_empty_pool_means_none_for_everyone() {
        let store = FixedStore::new(&[]);
        let directory = FixedDirectory(vec![(Uuid::new_v4(), 1)]);
        let mut rng = StdRng::seed_from_u64(7);

        let assignments = assign(&directory, &store, &mut rng).await.unwrap();
        assert!(assignments[0].phrase.is_none());
    }
}
