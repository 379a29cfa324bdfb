//! Event Feature Store: per-event structured features plus semantic vector,
//! represented as a dense arena indexed by integer position (the "arena +
//! index" pattern in place of cross-pointer similarity graphs).

use std::collections::HashMap;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::encoder::TextEncoder;
use crate::types::EventFeature;

#[derive(Default)]
pub struct EventFeatureStore {
    inner: RwLock<EventFeatureStoreInner>,
}

#[derive(Default)]
struct EventFeatureStoreInner {
    arena: Vec<EventFeature>,
    index: HashMap<Uuid, usize>,
}

impl EventFeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an event's features, computing its semantic vector
    /// from the weighted text blob via the given encoder if not already set.
    pub fn upsert(&self, mut feature: EventFeature, encoder: &dyn TextEncoder) {
        if feature.semantic_vector.is_empty() {
            feature.semantic_vector = encoder.encode(&feature.combined_text_blob());
        }

        let mut inner = self.inner.write();
        if let Some(&idx) = inner.index.get(&feature.event_id) {
            inner.arena[idx] = feature;
        } else {
            let idx = inner.arena.len();
            inner.index.insert(feature.event_id, idx);
            inner.arena.push(feature);
        }
    }

    pub fn get(&self, event_id: Uuid) -> Option<EventFeature> {
        let inner = self.inner.read();
        inner.index.get(&event_id).map(|&idx| inner.arena[idx].clone())
    }

    pub fn all(&self) -> Vec<EventFeature> {
        self.inner.read().arena.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn categories(&self) -> Vec<String> {
        let inner = self.inner.read();
        let mut seen = std::collections::HashSet::new();
        inner
            .arena
            .iter()
            .filter(|e| seen.insert(e.category.clone()))
            .map(|e| e.category.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::HashingEncoder;
    use std::collections::HashSet;

    fn sample_event(title: &str) -> EventFeature {
        EventFeature {
            event_id: Uuid::new_v4(),
            title: title.to_string(),
            description: "desc".to_string(),
            short_description: "short".to_string(),
            category: "tech".to_string(),
            tags: HashSet::new(),
            organizer: "acme".to_string(),
            venue: "hall".to_string(),
            venue_location: None,
            is_virtual: false,
            price: 10.0,
            start_time: None,
            curation_score: 0.5,
            image_count: 0,
            semantic_vector: Vec::new(),
        }
    }

    #[test]
    fn upsert_computes_semantic_vector_when_missing() {
        let store = EventFeatureStore::new();
        let encoder = HashingEncoder::default();
        let event = sample_event("Rust Conference");
        let id = event.event_id;
        store.upsert(event, &encoder);

        let fetched = store.get(id).unwrap();
        assert_eq!(fetched.semantic_vector.len(), encoder.dim());
    }

    #[test]
    fn upsert_replaces_existing_event() {
        let store = EventFeatureStore::new();
        let encoder = HashingEncoder::default();
        let mut event = sample_event("First Title");
        let id = event.event_id;
        store.upsert(event.clone(), &encoder);
        event.title = "Second Title".to_string();
        event.semantic_vector.clear();
        store.upsert(event, &encoder);

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(id).unwrap().title, "Second Title");
    }
}
