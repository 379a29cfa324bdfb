//! Content-based recommender: profile construction from preferences and
//! interaction history, additive+multiplicative scoring against event
//! features, and a standalone CB-side event similarity used by the
//! "similar events" entry point when the caller asks for it explicitly.

use std::collections::HashSet;

use chrono::Utc;
use uuid::Uuid;

use crate::config::CbConfig;
use crate::encoder::TextEncoder;
use crate::event_store::EventFeatureStore;
use crate::types::{
    EventFeature, Interaction, RecommendationAlgorithm, RecommendationItem, UserPreferences,
};
use crate::util::{cosine_similarity, jaccard_or_neutral};

/// Accumulated user taste signal, built fresh from preferences + history on
/// each recommend call rather than persisted as its own model snapshot.
#[derive(Debug, Clone, Default)]
pub struct CbProfile {
    pub preferred_categories: HashSet<String>,
    pub preferred_tags: HashSet<String>,
    pub preferred_organizers: HashSet<String>,
    pub preferred_venues: HashSet<String>,
    pub virtual_preference: f32,
    pub text_blobs: Vec<String>,
    pub preferred_locations: HashSet<String>,
    pub price_range_min: Option<f32>,
    pub price_range_max: Option<f32>,
}

pub struct CbRecommender {
    config: CbConfig,
}

impl CbRecommender {
    pub fn new(config: CbConfig) -> Self {
        Self { config }
    }

    /// Build a profile from stated preferences plus interaction history,
    /// accumulating categories/tags/organizers/venues by simple union
    /// (any interaction contributes regardless of its weight) while
    /// `virtual_preference` drifts by the interaction-type weight.
    pub fn build_profile(
        &self,
        preferences: &UserPreferences,
        interactions: &[Interaction],
        events: &EventFeatureStore,
    ) -> CbProfile {
        let mut profile = CbProfile {
            preferred_categories: preferences.preferred_categories.clone(),
            preferred_locations: preferences.preferred_locations.clone(),
            price_range_min: preferences.price_range_min,
            price_range_max: preferences.price_range_max,
            virtual_preference: preferences.virtual_preference,
            ..Default::default()
        };

        for interaction in interactions {
            let Some(event) = events.get(interaction.event_id) else {
                continue;
            };
            let w = interaction.interaction_type.profile_weight();

            profile.preferred_categories.insert(event.category.clone());
            profile.preferred_tags.extend(event.tags.iter().cloned());
            profile.preferred_organizers.insert(event.organizer.clone());
            profile.preferred_venues.insert(event.venue.clone());
            profile.text_blobs.push(event.combined_text_blob());

            let delta = 0.1 * w;
            if event.is_virtual {
                profile.virtual_preference = (profile.virtual_preference + delta).clamp(0.0, 1.0);
            } else {
                profile.virtual_preference = (profile.virtual_preference - delta).clamp(0.0, 1.0);
            }
        }

        profile
    }

    fn category_signal(&self, profile: &CbProfile, event: &EventFeature) -> f32 {
        if profile.preferred_categories.is_empty() {
            0.5
        } else if profile.preferred_categories.contains(&event.category) {
            1.0
        } else {
            0.1
        }
    }

    fn tag_signal(&self, profile: &CbProfile, event: &EventFeature) -> f32 {
        jaccard_or_neutral(&profile.preferred_tags, &event.tags)
    }

    fn text_signal(&self, profile: &CbProfile, encoder: &dyn TextEncoder, event: &EventFeature) -> f32 {
        if profile.text_blobs.is_empty() {
            return 0.5;
        }
        profile
            .text_blobs
            .iter()
            .map(|blob| cosine_similarity(&encoder.encode(blob), &event.semantic_vector))
            .fold(f32::MIN, f32::max)
            .max(0.0)
    }

    /// Visible to `scorers::location_scorer`, which delegates to this same
    /// signal for events with no venue coordinates rather than a flat default.
    pub(crate) fn location_signal(&self, profile: &CbProfile, event: &EventFeature) -> f32 {
        if profile.preferred_locations.is_empty() {
            return 1.0;
        }

        let virtual_match = event.is_virtual
            && profile
                .preferred_locations
                .iter()
                .any(|l| l.eq_ignore_ascii_case("online") || l.eq_ignore_ascii_case("virtual"));

        let venue_lower = event.venue.to_lowercase();
        let venue_match = profile.preferred_locations.iter().any(|l| {
            let l = l.to_lowercase();
            venue_lower.contains(&l) || l.contains(&venue_lower)
        });

        if virtual_match || venue_match {
            1.0
        } else {
            0.5
        }
    }

    fn price_signal(&self, profile: &CbProfile, event: &EventFeature) -> f32 {
        let min = profile.price_range_min;
        let max = profile.price_range_max;
        match (min, max) {
            (None, None) => 1.0,
            (Some(min), _) if event.price < min => 0.8,
            (_, Some(max)) if event.price > max => {
                if event.price <= 0.0 {
                    0.1
                } else {
                    (max / event.price).max(0.1)
                }
            }
            _ => 1.0,
        }
    }

    fn virtual_signal(&self, profile: &CbProfile, event: &EventFeature) -> f32 {
        let vp = profile.virtual_preference;
        if event.is_virtual {
            0.5 + 0.5 * vp
        } else {
            0.5 + 0.5 * (1.0 - vp)
        }
    }

    fn time_signal(&self, event: &EventFeature) -> f32 {
        let Some(start) = event.start_time else {
            return 0.8;
        };
        let now = Utc::now();
        if start <= now {
            return 0.1;
        }
        let days = (start - now).num_seconds() as f32 / 86_400.0;
        if days <= 30.0 {
            1.0
        } else if days <= 90.0 {
            0.9
        } else {
            0.7
        }
    }

    /// Combine all signals into a single clipped [0,1] score.
    pub fn score_event(&self, profile: &CbProfile, encoder: &dyn TextEncoder, event: &EventFeature) -> f32 {
        let additive = self.config.category_weight * self.category_signal(profile, event)
            + self.config.tag_weight * self.tag_signal(profile, event)
            + self.config.description_weight * self.text_signal(profile, encoder, event)
            + self.config.location_weight * self.location_signal(profile, event);

        let multiplier = self.price_signal(profile, event)
            * self.virtual_signal(profile, event)
            * self.time_signal(event)
            * (0.5 + 0.5 * event.curation_score);

        (additive * multiplier).clamp(0.0, 1.0)
    }

    fn confidence(&self, profile: &CbProfile) -> f32 {
        let mut c = 0.5;
        if !profile.preferred_categories.is_empty() {
            c += 0.1;
        }
        if !profile.preferred_tags.is_empty() {
            c += 0.1;
        }
        if !profile.text_blobs.is_empty() {
            c += 0.1;
        }
        if !profile.preferred_locations.is_empty() {
            c += 0.1;
        }
        c.min(0.95)
    }

    fn explain(&self, profile: &CbProfile, event: &EventFeature) -> Vec<String> {
        let mut reasons = Vec::with_capacity(3);

        if profile.preferred_categories.contains(&event.category) {
            reasons.push(format!("Matches your interest in {}", event.category));
        }
        if reasons.len() < 3 {
            let overlap: Vec<&String> = profile.preferred_tags.intersection(&event.tags).collect();
            if !overlap.is_empty() {
                let names: Vec<String> = overlap.iter().take(2).map(|s| s.to_string()).collect();
                reasons.push(format!("Shares tags: {}", names.join(", ")));
            }
        }
        if reasons.len() < 3 && profile.preferred_organizers.contains(&event.organizer) {
            reasons.push(format!("From an organizer you've engaged with: {}", event.organizer));
        }
        if reasons.len() < 3 {
            let aligned = (event.is_virtual && profile.virtual_preference > 0.6)
                || (!event.is_virtual && profile.virtual_preference < 0.4);
            if aligned {
                reasons.push(if event.is_virtual {
                    "Matches your preference for virtual events".to_string()
                } else {
                    "Matches your preference for in-person events".to_string()
                });
            }
        }
        if reasons.len() < 3 && event.curation_score > 0.8 {
            reasons.push("Highly curated event".to_string());
        }

        reasons.truncate(3);
        reasons
    }

    pub fn recommend(
        &self,
        profile: &CbProfile,
        encoder: &dyn TextEncoder,
        events: &EventFeatureStore,
        k: usize,
        exclude: &HashSet<Uuid>,
    ) -> Vec<RecommendationItem> {
        let confidence = self.confidence(profile);
        let mut scored: Vec<(EventFeature, f32)> = events
            .all()
            .into_iter()
            .filter(|e| !exclude.contains(&e.event_id))
            .map(|e| {
                let score = self.score_event(profile, encoder, &e);
                (e, score)
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        scored
            .into_iter()
            .take(k)
            .enumerate()
            .map(|(idx, (event, score))| RecommendationItem {
                event_id: event.event_id,
                score,
                algorithm: RecommendationAlgorithm::ContentBased,
                reasons: self.explain(profile, &event),
                confidence,
                rank: idx + 1,
            })
            .collect()
    }

    /// CB-side event similarity, distinct from the CF latent-factor cosine:
    /// weighted blend of category match, tag overlap and semantic cosine.
    pub fn event_similarity(&self, e1: &EventFeature, e2: &EventFeature) -> f32 {
        let category_match = if e1.category == e2.category { 1.0 } else { 0.0 };
        let tag_jaccard = jaccard_or_neutral(&e1.tags, &e2.tags);
        let semantic = cosine_similarity(&e1.semantic_vector, &e2.semantic_vector);
        (0.30 * category_match + 0.25 * tag_jaccard + 0.45 * semantic).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::HashingEncoder;
    use crate::types::InteractionType;

    fn event(category: &str, tags: &[&str], price: f32, is_virtual: bool) -> EventFeature {
        EventFeature {
            event_id: Uuid::new_v4(),
            title: format!("{category} event"),
            description: "an event".to_string(),
            short_description: "short".to_string(),
            category: category.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            organizer: "acme".to_string(),
            venue: "Main Hall".to_string(),
            venue_location: None,
            is_virtual,
            price,
            start_time: None,
            curation_score: 0.9,
            image_count: 0,
            semantic_vector: Vec::new(),
        }
    }

    #[test]
    fn category_match_scores_higher_than_mismatch() {
        let cb = CbRecommender::new(CbConfig {
            category_weight: 0.30,
            tag_weight: 0.25,
            description_weight: 0.25,
            location_weight: 0.20,
            similarity_threshold: 0.7,
        });
        let encoder = HashingEncoder::default();
        let mut profile = CbProfile::default();
        profile.preferred_categories.insert("tech".to_string());

        let tech = event("tech", &[], 10.0, false);
        let music = event("music", &[], 10.0, false);

        let s_tech = cb.score_event(&profile, &encoder, &tech);
        let s_music = cb.score_event(&profile, &encoder, &music);
        assert!(s_tech > s_music);
    }

    #[test]
    fn empty_profile_category_signal_is_neutral() {
        let cb = CbRecommender::new(CbConfig {
            category_weight: 0.30,
            tag_weight: 0.25,
            description_weight: 0.25,
            location_weight: 0.20,
            similarity_threshold: 0.7,
        });
        let profile = CbProfile::default();
        let e = event("tech", &[], 10.0, false);
        assert_eq!(cb.category_signal(&profile, &e), 0.5);
    }

    #[test]
    fn build_profile_accumulates_union_not_weighted() {
        let cb = CbRecommender::new(CbConfig {
            category_weight: 0.30,
            tag_weight: 0.25,
            description_weight: 0.25,
            location_weight: 0.20,
            similarity_threshold: 0.7,
        });
        let store = EventFeatureStore::new();
        let encoder = HashingEncoder::default();
        let e1 = event("tech", &["rust"], 10.0, false);
        let e2 = event("music", &["jazz"], 10.0, true);
        store.upsert(e1.clone(), &encoder);
        store.upsert(e2.clone(), &encoder);

        let user = Uuid::new_v4();
        let mut i1 = Interaction::new(user, e1.event_id, InteractionType::View);
        i1.timestamp = Utc::now();
        let mut i2 = Interaction::new(user, e2.event_id, InteractionType::Like);
        i2.timestamp = Utc::now();

        let prefs = UserPreferences::new();
        let profile = cb.build_profile(&prefs, &[i1, i2], &store);

        assert!(profile.preferred_categories.contains("tech"));
        assert!(profile.preferred_categories.contains("music"));
        assert!(profile.preferred_tags.contains("rust"));
        assert!(profile.preferred_tags.contains("jazz"));
    }

    #[test]
    fn event_similarity_same_category_scores_higher() {
        let cb = CbRecommender::new(CbConfig {
            category_weight: 0.30,
            tag_weight: 0.25,
            description_weight: 0.25,
            location_weight: 0.20,
            similarity_threshold: 0.7,
        });
        let a = event("tech", &["rust"], 10.0, false);
        let b = event("tech", &["rust"], 10.0, false);
        let c = event("music", &["jazz"], 10.0, false);
        assert!(cb.event_similarity(&a, &b) > cb.event_similarity(&a, &c));
    }
}
