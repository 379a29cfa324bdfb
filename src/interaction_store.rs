//! Append-only interaction log with bulk-scan (training) and per-user (inference) access.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::types::{Interaction, InteractionType};

/// In-memory interaction store. Duplicate `(user, event)` pairs collapse via
/// latest-timestamp wins, matching the at-least-once ingest contract.
#[derive(Default)]
pub struct InteractionStore {
    // Key: (user_id, event_id) -> index into `log`, so later writes for the
    // same pair overwrite in place rather than appending a duplicate.
    inner: RwLock<InteractionStoreInner>,
}

#[derive(Default)]
struct InteractionStoreInner {
    log: Vec<Interaction>,
    latest_index: HashMap<(Uuid, Uuid), usize>,
    by_user: HashMap<Uuid, Vec<usize>>,
}

impl InteractionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest a single interaction. If a record already exists for this
    /// `(user, event)` pair with an earlier or equal timestamp, it is
    /// replaced in place; an older duplicate arriving after a newer one is
    /// ignored (latest-timestamp wins).
    pub fn ingest(&self, interaction: Interaction) {
        let mut inner = self.inner.write();
        let key = (interaction.user_id, interaction.event_id);

        if let Some(&idx) = inner.latest_index.get(&key) {
            if inner.log[idx].timestamp <= interaction.timestamp {
                inner.log[idx] = interaction;
            }
            return;
        }

        let idx = inner.log.len();
        inner.by_user.entry(interaction.user_id).or_default().push(idx);
        inner.latest_index.insert(key, idx);
        inner.log.push(interaction);
    }

    pub fn ingest_many(&self, interactions: impl IntoIterator<Item = Interaction>) {
        for i in interactions {
            self.ingest(i);
        }
    }

    /// Full bulk scan, used by CF/CB training.
    pub fn all(&self) -> Vec<Interaction> {
        self.inner.read().log.clone()
    }

    /// Per-user interactions, used by inference and profile building.
    pub fn for_user(&self, user_id: Uuid) -> Vec<Interaction> {
        let inner = self.inner.read();
        match inner.by_user.get(&user_id) {
            Some(idxs) => idxs.iter().map(|&i| inner.log[i].clone()).collect(),
            None => Vec::new(),
        }
    }

    pub fn interaction_count_for_user(&self, user_id: Uuid) -> usize {
        self.inner
            .read()
            .by_user
            .get(&user_id)
            .map(|v| v.len())
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.inner.read().log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count of interactions of a given type since `since`, used by scorers
    /// that aggregate engagement counts (e.g. trending).
    pub fn count_since(&self, event_id: Uuid, interaction_type: InteractionType, since: DateTime<Utc>) -> usize {
        self.inner
            .read()
            .log
            .iter()
            .filter(|i| i.event_id == event_id && i.interaction_type == interaction_type && i.timestamp >= since)
            .count()
    }
}
