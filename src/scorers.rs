//! Side scorers the Hybrid Orchestrator calls alongside CF/CB: popularity
//! (for cold catalogs with no trained CF model at all), location proximity,
//! and recency-decayed trending.

use std::collections::HashSet;

use chrono::Utc;
use uuid::Uuid;

use crate::cb::{CbProfile, CbRecommender};
use crate::event_store::EventFeatureStore;
use crate::interaction_store::InteractionStore;
use crate::types::{GeoPoint, InteractionType, RecommendationAlgorithm, RecommendationItem};
use crate::util::{haversine_km, normalize_score};

const TRENDING_DECAY_RATE: f32 = 0.1;
const TRENDING_MIN_ENGAGEMENT: f32 = 10.0;

/// Ranks the Event Feature Store directly by `log1p(total_interactions)`
/// normalized to [0,1] across the corpus. Used by the CF recommender when
/// it has no snapshot at all, and as its own standalone algorithm entry.
pub fn popularity_scorer(
    events: &EventFeatureStore,
    interactions: &InteractionStore,
    k: usize,
    exclude: &HashSet<Uuid>,
) -> Vec<RecommendationItem> {
    let all_interactions = interactions.all();
    let mut counts: std::collections::HashMap<Uuid, u32> = std::collections::HashMap::new();
    for i in &all_interactions {
        *counts.entry(i.event_id).or_insert(0) += 1;
    }

    let mut scored: Vec<(Uuid, f32)> = events
        .all()
        .into_iter()
        .filter(|e| !exclude.contains(&e.event_id))
        .map(|e| {
            let total = *counts.get(&e.event_id).unwrap_or(&0);
            (e.event_id, (1.0 + total as f32).ln())
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let max = scored.first().map(|(_, s)| *s).unwrap_or(0.0);

    scored
        .into_iter()
        .take(k)
        .enumerate()
        .map(|(idx, (event_id, raw))| RecommendationItem {
            event_id,
            score: normalize_score(raw, 0.0, max),
            algorithm: RecommendationAlgorithm::PopularityBased,
            reasons: vec!["Popular event among all users".to_string()],
            confidence: 0.6,
            rank: idx + 1,
        })
        .collect()
}

/// Only invoked when the request carries a location. Falls back to the
/// content-based location signal for events with no venue coordinates.
pub fn location_scorer(
    events: &EventFeatureStore,
    origin: GeoPoint,
    cb: &CbRecommender,
    profile: &CbProfile,
    k: usize,
    exclude: &HashSet<Uuid>,
) -> Vec<RecommendationItem> {
    let mut scored: Vec<(Uuid, f32)> = events
        .all()
        .into_iter()
        .filter(|e| !exclude.contains(&e.event_id))
        .map(|e| {
            let score = match e.venue_location {
                Some(loc) => {
                    let km = haversine_km(origin.lat, origin.lon, loc.lat, loc.lon);
                    if km <= 5.0 {
                        1.0
                    } else if km <= 25.0 {
                        0.8
                    } else if km <= 100.0 {
                        0.5
                    } else {
                        0.2
                    }
                }
                None => cb.location_signal(profile, &e),
            };
            (e.event_id, score)
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    scored
        .into_iter()
        .take(k)
        .enumerate()
        .map(|(idx, (event_id, score))| RecommendationItem {
            event_id,
            score,
            algorithm: RecommendationAlgorithm::LocationBased,
            reasons: vec!["Near your location".to_string()],
            confidence: 0.55,
            rank: idx + 1,
        })
        .collect()
}

fn engagement_type_weight(interaction_type: InteractionType) -> f32 {
    match interaction_type {
        InteractionType::View => 1.0,
        InteractionType::Like => 5.0,
        InteractionType::Share => 10.0,
        InteractionType::Comment => 3.0,
        _ => 0.0,
    }
}

/// Exponential recency decay applied per engagement event, modeled on the
/// "moderate decay" preset (half-life ~6.9 hours): each qualifying
/// interaction contributes `weight * e^(-rate * its own age in hours)`,
/// summed per event, so two events with the same 7-day engagement total
/// still rank apart if one skews recent and the other stale.
pub fn trending_scorer(
    events: &EventFeatureStore,
    interactions: &InteractionStore,
    k: usize,
    exclude: &HashSet<Uuid>,
) -> Vec<RecommendationItem> {
    let now = Utc::now();
    let lookback = now - chrono::Duration::days(7);

    let mut raw_engagement: std::collections::HashMap<Uuid, f32> = std::collections::HashMap::new();
    let mut decayed_score: std::collections::HashMap<Uuid, f32> = std::collections::HashMap::new();
    for i in interactions.all() {
        if i.timestamp < lookback {
            continue;
        }
        let weight = engagement_type_weight(i.interaction_type);
        if weight <= 0.0 {
            continue;
        }
        let age_hours = (now - i.timestamp).num_seconds().max(0) as f32 / 3600.0;
        *raw_engagement.entry(i.event_id).or_insert(0.0) += weight;
        *decayed_score.entry(i.event_id).or_insert(0.0) += weight * crate::util::exponential_decay(age_hours, TRENDING_DECAY_RATE);
    }

    let mut scored: Vec<(Uuid, f32)> = events
        .all()
        .into_iter()
        .filter(|e| !exclude.contains(&e.event_id))
        .filter_map(|e| {
            let engagement = *raw_engagement.get(&e.event_id).unwrap_or(&0.0);
            if engagement < TRENDING_MIN_ENGAGEMENT {
                return None;
            }
            let score = *decayed_score.get(&e.event_id).unwrap_or(&0.0);
            Some((e.event_id, score))
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let max = scored.first().map(|(_, s)| *s).unwrap_or(0.0);

    scored
        .into_iter()
        .take(k)
        .enumerate()
        .map(|(idx, (event_id, raw))| RecommendationItem {
            event_id,
            score: normalize_score(raw, 0.0, max),
            algorithm: RecommendationAlgorithm::Trending,
            reasons: vec!["Trending now".to_string()],
            confidence: 0.5,
            rank: idx + 1,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cb::{CbProfile, CbRecommender};
    use crate::config::CbConfig;
    use crate::encoder::HashingEncoder;
    use crate::types::{EventFeature, Interaction};

    fn test_cb() -> CbRecommender {
        CbRecommender::new(CbConfig {
            category_weight: 0.30,
            tag_weight: 0.25,
            description_weight: 0.25,
            location_weight: 0.20,
            similarity_threshold: 0.7,
        })
    }

    fn event_at(lat: f64, lon: f64) -> EventFeature {
        EventFeature {
            event_id: Uuid::new_v4(),
            title: "t".to_string(),
            description: "d".to_string(),
            short_description: "s".to_string(),
            category: "tech".to_string(),
            tags: HashSet::new(),
            organizer: "acme".to_string(),
            venue: "hall".to_string(),
            venue_location: Some(GeoPoint { lat, lon }),
            is_virtual: false,
            price: 0.0,
            start_time: None,
            curation_score: 0.5,
            image_count: 0,
            semantic_vector: Vec::new(),
        }
    }

    #[test]
    fn location_scorer_ranks_nearby_event_first() {
        let store = EventFeatureStore::new();
        let encoder = HashingEncoder::default();
        let near = event_at(40.7128, -74.0060);
        let far = event_at(34.0522, -118.2437);
        store.upsert(near.clone(), &encoder);
        store.upsert(far.clone(), &encoder);

        let origin = GeoPoint { lat: 40.7128, lon: -74.0060 };
        let cb = test_cb();
        let profile = CbProfile::default();
        let recs = location_scorer(&store, origin, &cb, &profile, 2, &HashSet::new());
        assert_eq!(recs[0].event_id, near.event_id);
    }

    #[test]
    fn location_scorer_falls_back_to_content_based_signal_when_no_coordinates() {
        let store = EventFeatureStore::new();
        let encoder = HashingEncoder::default();
        let mut no_coords = event_at(0.0, 0.0);
        no_coords.venue_location = None;
        no_coords.venue = "Remote Online Hall".to_string();
        no_coords.is_virtual = true;
        store.upsert(no_coords.clone(), &encoder);

        let origin = GeoPoint { lat: 40.7128, lon: -74.0060 };
        let cb = test_cb();
        let mut profile = CbProfile::default();
        profile.preferred_locations.insert("online".to_string());

        let recs = location_scorer(&store, origin, &cb, &profile, 1, &HashSet::new());
        assert_eq!(recs[0].score, 1.0);
    }

    #[test]
    fn popularity_scorer_ranks_more_interacted_event_first() {
        let store = EventFeatureStore::new();
        let interactions = InteractionStore::new();
        let encoder = HashingEncoder::default();
        let popular = event_at(0.0, 0.0);
        let quiet = event_at(1.0, 1.0);
        store.upsert(popular.clone(), &encoder);
        store.upsert(quiet.clone(), &encoder);

        for _ in 0..5 {
            interactions.ingest(Interaction::new(Uuid::new_v4(), popular.event_id, InteractionType::View));
        }
        interactions.ingest(Interaction::new(Uuid::new_v4(), quiet.event_id, InteractionType::View));

        let recs = popularity_scorer(&store, &interactions, 2, &HashSet::new());
        assert_eq!(recs[0].event_id, popular.event_id);
    }

    #[test]
    fn trending_scorer_excludes_below_min_engagement() {
        let store = EventFeatureStore::new();
        let interactions = InteractionStore::new();
        let encoder = HashingEncoder::default();
        let quiet = event_at(0.0, 0.0);
        store.upsert(quiet.clone(), &encoder);
        interactions.ingest(Interaction::new(Uuid::new_v4(), quiet.event_id, InteractionType::View));

        let recs = trending_scorer(&store, &interactions, 5, &HashSet::new());
        assert!(recs.is_empty());
    }

    #[test]
    fn trending_scorer_ranks_recent_engagement_above_stale_with_equal_totals() {
        let store = EventFeatureStore::new();
        let interactions = InteractionStore::new();
        let encoder = HashingEncoder::default();
        let recent = event_at(0.0, 0.0);
        let stale = event_at(1.0, 1.0);
        store.upsert(recent.clone(), &encoder);
        store.upsert(stale.clone(), &encoder);

        for _ in 0..12 {
            let mut i = Interaction::new(Uuid::new_v4(), recent.event_id, InteractionType::View);
            i.timestamp = Utc::now() - chrono::Duration::hours(1);
            interactions.ingest(i);
        }
        for _ in 0..12 {
            let mut i = Interaction::new(Uuid::new_v4(), stale.event_id, InteractionType::View);
            i.timestamp = Utc::now() - chrono::Duration::days(6);
            interactions.ingest(i);
        }

        let recs = trending_scorer(&store, &interactions, 2, &HashSet::new());
        assert_eq!(recs[0].event_id, recent.event_id);
    }
}
