//! Hybrid Orchestrator: classifies the user, gathers candidates from every
//! algorithm concurrently, merges by weighted score, diversifies by
//! category, injects exploration, and emits the final ranked response.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tracing::warn;
use uuid::Uuid;

use crate::cb::CbRecommender;
use crate::cf::CfRecommender;
use crate::config::{CfConfig, HybridConfig};
use crate::encoder::TextEncoder;
use crate::error::Result;
use crate::event_store::EventFeatureStore;
use crate::interaction_store::InteractionStore;
use crate::scorers;
use crate::types::{
    RecommendationAlgorithm, RecommendationItem, RecommendationRequest, RecommendationResponse,
    UserPreferences,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserType {
    ColdStart,
    Sparse,
    Normal,
    Active,
}

pub fn classify_user(n_interactions: usize, min_interactions: usize) -> UserType {
    if n_interactions == 0 {
        UserType::ColdStart
    } else if n_interactions < min_interactions {
        UserType::Sparse
    } else if n_interactions >= 20 {
        UserType::Active
    } else {
        UserType::Normal
    }
}

#[derive(Debug, Clone, Copy)]
struct Weights {
    collaborative: f32,
    content: f32,
    popularity: f32,
    diversity: f32,
}

impl Weights {
    fn baseline(user_type: UserType, config: &HybridConfig) -> Self {
        match user_type {
            UserType::ColdStart => Weights {
                collaborative: 0.10,
                content: 0.50,
                popularity: 0.30,
                diversity: 0.10,
            },
            UserType::Sparse => Weights {
                collaborative: 0.30,
                content: 0.40,
                popularity: 0.20,
                diversity: 0.10,
            },
            UserType::Normal | UserType::Active => Weights {
                collaborative: config.collaborative_weight,
                content: config.content_weight,
                popularity: config.popularity_weight,
                diversity: config.diversity_weight,
            },
        }
    }

    /// Move a dead algorithm's weight to content (60%) / popularity (40%),
    /// or the symmetric swap when content is the dead one, then renormalize.
    fn redistribute(mut self, cf_empty: bool, cb_empty: bool) -> Self {
        if cf_empty && self.collaborative > 0.0 {
            let w = self.collaborative;
            self.collaborative = 0.0;
            self.content += w * 0.6;
            self.popularity += w * 0.4;
        }
        if cb_empty && self.content > 0.0 {
            let w = self.content;
            self.content = 0.0;
            self.collaborative += w * 0.6;
            self.popularity += w * 0.4;
        }

        let sum = self.collaborative + self.content + self.popularity + self.diversity;
        if sum > f32::EPSILON {
            self.collaborative /= sum;
            self.content /= sum;
            self.popularity /= sum;
            self.diversity /= sum;
        }
        self
    }

    /// The weight table only has entries for collaborative/content/popularity
    /// (plus diversity, which isn't a merge weight at all). Location and
    /// trending candidates are gathered and can still win on `inject_exploration`
    /// or surface via their own algorithm tag, but they contribute nothing to
    /// the weighted merge total, matching a dict lookup with no key for them.
    fn for_algorithm(&self, algorithm: RecommendationAlgorithm) -> f32 {
        match algorithm {
            RecommendationAlgorithm::CollaborativeFiltering => self.collaborative,
            RecommendationAlgorithm::ContentBased => self.content,
            RecommendationAlgorithm::PopularityBased => self.popularity,
            RecommendationAlgorithm::LocationBased | RecommendationAlgorithm::Trending => 0.0,
            RecommendationAlgorithm::Hybrid => 1.0,
        }
    }
}

struct MergedEntry {
    total: f32,
    per_algorithm: Vec<(RecommendationAlgorithm, f32)>,
    reasons: Vec<String>,
    confidence: f32,
}

pub struct HybridOrchestrator {
    hybrid_config: HybridConfig,
    cf_config: CfConfig,
    cf: Arc<CfRecommender>,
    cb: Arc<CbRecommender>,
    events: Arc<EventFeatureStore>,
    interactions: Arc<InteractionStore>,
    encoder: Arc<dyn TextEncoder>,
}

impl HybridOrchestrator {
    pub fn new(
        hybrid_config: HybridConfig,
        cf_config: CfConfig,
        cf: Arc<CfRecommender>,
        cb: Arc<CbRecommender>,
        events: Arc<EventFeatureStore>,
        interactions: Arc<InteractionStore>,
        encoder: Arc<dyn TextEncoder>,
    ) -> Self {
        Self {
            hybrid_config,
            cf_config,
            cf,
            cb,
            events,
            interactions,
            encoder,
        }
    }

    async fn timed<F>(&self, label: &'static str, f: F) -> Vec<RecommendationItem>
    where
        F: FnOnce() -> Vec<RecommendationItem> + Send + 'static,
    {
        let dur = self.hybrid_config.model_inference_timeout;
        match tokio::time::timeout(dur, tokio::task::spawn_blocking(f)).await {
            Ok(Ok(items)) => items,
            Ok(Err(join_err)) => {
                warn!(algorithm = label, error = %join_err, "candidate gathering task failed");
                Vec::new()
            }
            Err(_) => {
                warn!(algorithm = label, timeout = ?dur, "candidate gathering timed out");
                Vec::new()
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn gather_candidates(
        &self,
        user_id: Uuid,
        k: usize,
        exclude: HashSet<Uuid>,
        profile: crate::cb::CbProfile,
        location: Option<crate::types::GeoPoint>,
    ) -> (
        Vec<RecommendationItem>,
        Vec<RecommendationItem>,
        Vec<RecommendationItem>,
        Vec<RecommendationItem>,
        Vec<RecommendationItem>,
    ) {
        let cf_k = (2 * k).min(50);
        let cb_k = (2 * k).min(50);
        let pop_k = k.min(20);
        let loc_k = k.min(15);
        let trend_k = (k / 2).max(1).min(10);

        let cf = self.cf.clone();
        let cf_exclude = exclude.clone();
        let cf_fut = self.timed("cf", move || cf.recommend(user_id, cf_k, &cf_exclude));

        let cb = self.cb.clone();
        let encoder = self.encoder.clone();
        let events = self.events.clone();
        let cb_exclude = exclude.clone();
        let loc_profile = profile.clone();
        let cb_fut = self.timed("cb", move || cb.recommend(&profile, encoder.as_ref(), &events, cb_k, &cb_exclude));

        let events_pop = self.events.clone();
        let interactions_pop = self.interactions.clone();
        let pop_exclude = exclude.clone();
        let pop_fut = self.timed("popularity", move || {
            scorers::popularity_scorer(&events_pop, &interactions_pop, pop_k, &pop_exclude)
        });

        let events_loc = self.events.clone();
        let cb_loc = self.cb.clone();
        let loc_exclude = exclude.clone();
        let loc_fut = async {
            match location {
                Some(origin) => {
                    self.timed("location", move || {
                        scorers::location_scorer(&events_loc, origin, cb_loc.as_ref(), &loc_profile, loc_k, &loc_exclude)
                    })
                    .await
                }
                None => Vec::new(),
            }
        };

        let events_trend = self.events.clone();
        let interactions_trend = self.interactions.clone();
        let trend_exclude = exclude.clone();
        let trend_fut = self.timed("trending", move || {
            scorers::trending_scorer(&events_trend, &interactions_trend, trend_k, &trend_exclude)
        });

        tokio::join!(cf_fut, cb_fut, pop_fut, loc_fut, trend_fut)
    }

    fn merge(
        &self,
        lists: [(RecommendationAlgorithm, Vec<RecommendationItem>, f32); 5],
    ) -> HashMap<Uuid, MergedEntry> {
        let mut merged: HashMap<Uuid, MergedEntry> = HashMap::new();

        for (algorithm, items, weight) in lists {
            for item in items {
                let contribution = item.score * weight * item.confidence;
                let entry = merged.entry(item.event_id).or_insert_with(|| MergedEntry {
                    total: 0.0,
                    per_algorithm: Vec::new(),
                    reasons: Vec::new(),
                    confidence: 0.0,
                });
                entry.total += contribution;
                entry.per_algorithm.push((algorithm, item.score));
                for reason in item.reasons {
                    if !entry.reasons.contains(&reason) {
                        entry.reasons.push(reason);
                    }
                }
                entry.confidence = entry.confidence.max(item.confidence);
            }
        }

        merged
    }

    fn dominant_algorithm(counts: &[(RecommendationAlgorithm, usize)]) -> RecommendationAlgorithm {
        counts
            .iter()
            .max_by_key(|(_, count)| *count)
            .map(|(alg, _)| *alg)
            .unwrap_or(RecommendationAlgorithm::Hybrid)
    }

    /// Round-robin across categories so no single category exceeds
    /// `ceil(k / distinct_categories)`.
    fn diversify(&self, mut ranked: Vec<(Uuid, f32)>, k: usize) -> Vec<(Uuid, f32)> {
        if ranked.is_empty() {
            return ranked;
        }
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut by_category: HashMap<String, Vec<(Uuid, f32)>> = HashMap::new();
        for (event_id, score) in ranked {
            let category = self
                .events
                .get(event_id)
                .map(|e| e.category)
                .unwrap_or_else(|| "unknown".to_string());
            by_category.entry(category).or_default().push((event_id, score));
        }

        let mut order: Vec<String> = by_category.keys().cloned().collect();
        order.sort();

        let mut selected = Vec::with_capacity(k);
        let mut cursor = 0usize;
        while selected.len() < k {
            let mut progressed = false;
            for category in &order {
                if selected.len() >= k {
                    break;
                }
                if let Some(bucket) = by_category.get_mut(category) {
                    if cursor < bucket.len() {
                        selected.push(bucket[cursor]);
                        progressed = true;
                    }
                }
            }
            if !progressed {
                break;
            }
            cursor += 1;
        }

        selected
    }

    fn inject_exploration(
        &self,
        mut selected: Vec<RecommendationItem>,
        popularity_candidates: &[RecommendationItem],
        already: &HashSet<Uuid>,
        k: usize,
    ) -> Vec<RecommendationItem> {
        let exploration_factor = self.hybrid_config.exploration_factor;
        let n_explore = (k as f32 * exploration_factor).ceil() as usize;
        if n_explore == 0 {
            return selected;
        }

        let mut seen: HashSet<Uuid> = already.clone();
        let fresh: Vec<&RecommendationItem> = popularity_candidates
            .iter()
            .filter(|item| !seen.contains(&item.event_id))
            .take(n_explore)
            .collect();

        for item in fresh {
            seen.insert(item.event_id);
            let mut explore_item = item.clone();
            explore_item.score *= 0.8;
            explore_item.algorithm = RecommendationAlgorithm::Hybrid;
            explore_item.reasons.insert(0, "Explore something new".to_string());
            selected.push(explore_item);
        }

        selected.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        selected.truncate(k);
        selected
    }

    fn profile_completeness(preferences: &UserPreferences, n_interactions: usize) -> f32 {
        let mut c = 0.0;
        if !preferences.preferred_categories.is_empty() {
            c += 0.2;
        }
        if !preferences.preferred_locations.is_empty() {
            c += 0.15;
        }
        if !preferences.interests.is_empty() {
            c += 0.15;
        }
        if preferences.price_range_min.is_some() {
            c += 0.1;
        }
        if preferences.price_range_max.is_some() {
            c += 0.1;
        }
        c += (n_interactions as f32 / 50.0).min(0.3);
        c.min(1.0)
    }

    pub async fn recommend(
        &self,
        request: &RecommendationRequest,
        preferences: &UserPreferences,
    ) -> Result<RecommendationResponse> {
        let start = Instant::now();
        request
            .validate()
            .map_err(crate::error::EngineError::InvalidRequest)?;

        let user_interactions = self.interactions.for_user(request.user_id);
        let n_interactions = user_interactions.len();
        let user_type = classify_user(n_interactions, self.cf_config.min_interactions);
        let cold_start_user = user_type == UserType::ColdStart;
        let fallback_used = n_interactions < self.cf_config.min_interactions;

        let profile = self.cb.build_profile(preferences, &user_interactions, &self.events);

        let (cf_items, cb_items, pop_items, loc_items, trend_items) = self
            .gather_candidates(
                request.user_id,
                request.count,
                request.exclude_events.clone(),
                profile,
                request.location,
            )
            .await;

        let weights = Weights::baseline(user_type, &self.hybrid_config)
            .redistribute(cf_items.is_empty(), cb_items.is_empty());

        let counts = [
            (RecommendationAlgorithm::CollaborativeFiltering, cf_items.len()),
            (RecommendationAlgorithm::ContentBased, cb_items.len()),
            (RecommendationAlgorithm::PopularityBased, pop_items.len()),
            (RecommendationAlgorithm::LocationBased, loc_items.len()),
            (RecommendationAlgorithm::Trending, trend_items.len()),
        ];
        let dominant = Self::dominant_algorithm(&counts);

        let lists: [(RecommendationAlgorithm, Vec<RecommendationItem>, f32); 5] = [
            (
                RecommendationAlgorithm::CollaborativeFiltering,
                cf_items.clone(),
                weights.for_algorithm(RecommendationAlgorithm::CollaborativeFiltering),
            ),
            (
                RecommendationAlgorithm::ContentBased,
                cb_items.clone(),
                weights.for_algorithm(RecommendationAlgorithm::ContentBased),
            ),
            (
                RecommendationAlgorithm::PopularityBased,
                pop_items.clone(),
                weights.for_algorithm(RecommendationAlgorithm::PopularityBased),
            ),
            (
                RecommendationAlgorithm::LocationBased,
                loc_items.clone(),
                weights.for_algorithm(RecommendationAlgorithm::LocationBased),
            ),
            (
                RecommendationAlgorithm::Trending,
                trend_items.clone(),
                weights.for_algorithm(RecommendationAlgorithm::Trending),
            ),
        ];
        let merged = self.merge(lists);

        let diversity_factor = request.diversity_factor.unwrap_or(self.hybrid_config.diversity_factor);

        let ranked: Vec<(Uuid, f32)> = {
            let mut v: Vec<(Uuid, f32)> = merged.iter().map(|(id, e)| (*id, e.total)).collect();
            v.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            v
        };

        let selected_ids: Vec<(Uuid, f32)> = if diversity_factor > 0.0 {
            self.diversify(ranked, request.count)
        } else {
            ranked.into_iter().take(request.count).collect()
        };

        let mut items: Vec<RecommendationItem> = selected_ids
            .into_iter()
            .map(|(event_id, score)| {
                let entry = merged.get(&event_id);
                RecommendationItem {
                    event_id,
                    score: score.clamp(0.0, 1.0),
                    algorithm: RecommendationAlgorithm::Hybrid,
                    reasons: entry.map(|e| e.reasons.clone()).unwrap_or_default(),
                    confidence: entry.map(|e| e.confidence).unwrap_or(0.5),
                    rank: 0,
                }
            })
            .collect();

        let already: HashSet<Uuid> = items.iter().map(|i| i.event_id).collect();
        items = self.inject_exploration(items, &pop_items, &already, request.count);

        items.truncate(request.count);
        for (idx, item) in items.iter_mut().enumerate() {
            item.rank = idx + 1;
            item.clamp_score();
        }

        let response = RecommendationResponse {
            user_id: request.user_id,
            total_count: items.len(),
            recommendations: items,
            algorithm_used: dominant,
            context: request.context.clone(),
            generated_at: chrono::Utc::now(),
            processing_time_ms: start.elapsed().as_secs_f64() * 1000.0,
            model_version: self.cf.model_version().unwrap_or_else(|| "untrained".to_string()),
            ab_test_variant: None,
            user_profile_completeness: Self::profile_completeness(preferences, n_interactions),
            cold_start_user,
            fallback_used,
        };

        Ok(response)
    }
}
