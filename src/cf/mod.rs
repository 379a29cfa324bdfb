//! CF Recommender: non-negative matrix factorization over the user x event
//! implicit-rating matrix.

mod nmf;

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::CfConfig;
use crate::error::{EngineError, Result};
use crate::types::{Interaction, RecommendationAlgorithm, RecommendationItem};
use crate::util::normalize_score;

/// Persisted CF model snapshot. Immutable after publish; readers see a
/// consistent view via `ArcSwapOption` pointer swap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CfSnapshot {
    pub schema_version: u32,
    pub model_version: String,
    pub user_index: HashMap<Uuid, usize>,
    pub event_index: HashMap<Uuid, usize>,
    /// Row j of `user_factors` is user i's latent vector (N x F).
    pub user_factors: Vec<Vec<f32>>,
    /// Row j of `item_factors` is event j's latent vector (M x F).
    pub item_factors: Vec<Vec<f32>>,
    pub user_bias: Vec<f32>,
    pub item_bias: Vec<f32>,
    pub global_bias: f32,
    /// Dense implicit-rating matrix, kept to mask already-interacted events
    /// and to serve the popularity fallback by column sum.
    pub ratings: Vec<Vec<f32>>,
}

const SCHEMA_VERSION: u32 = 1;

impl CfSnapshot {
    fn validate(&self) -> Result<()> {
        let n = self.user_index.len();
        let m = self.event_index.len();
        if self.user_factors.len() != n || self.item_factors.len() != m {
            return Err(EngineError::Fatal(
                "CF snapshot dimension mismatch between index maps and factors".to_string(),
            ));
        }
        if self.user_bias.len() != n || self.item_bias.len() != m {
            return Err(EngineError::Fatal(
                "CF snapshot dimension mismatch in bias vectors".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct CfRecommender {
    config: CfConfig,
    snapshot: ArcSwapOption<CfSnapshot>,
    version_counter: AtomicU64,
}

impl CfRecommender {
    pub fn new(config: CfConfig) -> Self {
        Self {
            config,
            snapshot: ArcSwapOption::from(None),
            version_counter: AtomicU64::new(0),
        }
    }

    pub fn is_trained(&self) -> bool {
        self.snapshot.load().is_some()
    }

    pub fn model_version(&self) -> Option<String> {
        self.snapshot.load().as_ref().map(|s| s.model_version.clone())
    }

    /// Train over the full interaction history. Refuses (leaves the model
    /// untrained) if there are fewer than `CF_MIN_INTERACTIONS` interactions.
    pub fn train(&self, interactions: &[Interaction]) -> Result<()> {
        if interactions.len() < self.config.min_interactions {
            info!(
                count = interactions.len(),
                min = self.config.min_interactions,
                "CF training skipped: not enough interactions"
            );
            return Ok(());
        }

        let mut user_index: HashMap<Uuid, usize> = HashMap::new();
        let mut event_index: HashMap<Uuid, usize> = HashMap::new();
        for i in interactions {
            let next_u = user_index.len();
            user_index.entry(i.user_id).or_insert(next_u);
            let next_e = event_index.len();
            event_index.entry(i.event_id).or_insert(next_e);
        }

        let n = user_index.len();
        let m = event_index.len();
        let mut ratings = vec![vec![0.0f32; m]; n];
        // Duplicate (user,event) pairs overwrite with the latest value: walk
        // interactions in timestamp order so later writes win.
        let mut ordered: Vec<&Interaction> = interactions.iter().collect();
        ordered.sort_by_key(|i| i.timestamp);
        for i in ordered {
            let ui = user_index[&i.user_id];
            let ei = event_index[&i.event_id];
            ratings[ui][ei] = i.derived_rating();
        }

        let flat: Vec<f32> = ratings.iter().flatten().copied().collect();
        let r = Array2::from_shape_vec((n, m), flat).map_err(|e| {
            EngineError::component("cf_train", anyhow::anyhow!("failed to build rating matrix: {e}"))
        })?;

        let result = nmf::factorize(&r, self.config.n_factors, self.config.n_epochs, 42);

        let nonzero: Vec<f32> = r.iter().copied().filter(|&x| x > 0.0).collect();
        let global_bias = if nonzero.is_empty() {
            0.0
        } else {
            nonzero.iter().sum::<f32>() / nonzero.len() as f32
        };

        let user_bias: Vec<f32> = (0..n)
            .map(|i| r.row(i).mean().unwrap_or(0.0) - global_bias)
            .collect();
        let item_bias: Vec<f32> = (0..m)
            .map(|j| r.column(j).mean().unwrap_or(0.0) - global_bias)
            .collect();

        let user_factors: Vec<Vec<f32>> = result.w.outer_iter().map(|row| row.to_vec()).collect();
        let item_factors: Vec<Vec<f32>> = result.h.outer_iter().map(|row| row.to_vec()).collect();

        let version = self.version_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = CfSnapshot {
            schema_version: SCHEMA_VERSION,
            model_version: format!("cf-v{version}"),
            user_index,
            event_index,
            user_factors,
            item_factors,
            user_bias,
            item_bias,
            global_bias,
            ratings,
        };
        snapshot.validate()?;

        self.snapshot.store(Some(std::sync::Arc::new(snapshot)));
        info!(
            users = n,
            events = m,
            factors = self.config.n_factors,
            "CF model trained"
        );
        Ok(())
    }

    /// Atomically persist the current snapshot to disk (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        let Some(snapshot) = self.snapshot.load_full() else {
            return Err(EngineError::ModelNotReady("no CF snapshot to save".to_string()));
        };
        let tmp_path = path.with_extension("tmp");
        let bytes = serde_json::to_vec(&*snapshot)?;
        std::fs::write(&tmp_path, bytes)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Load a snapshot from disk, validating before publishing it. A corrupt
    /// snapshot never replaces an already-loaded one.
    pub fn load(&self, path: &Path) -> Result<()> {
        let bytes = std::fs::read(path)?;
        let snapshot: CfSnapshot = serde_json::from_slice(&bytes)?;
        snapshot.validate()?;
        self.snapshot.store(Some(std::sync::Arc::new(snapshot)));
        Ok(())
    }

    /// Top-K predicted-rating recommendations for a user, falling back to
    /// popularity when untrained or the user is unseen.
    pub fn recommend(
        &self,
        user_id: Uuid,
        k: usize,
        exclude: &std::collections::HashSet<Uuid>,
    ) -> Vec<RecommendationItem> {
        let Some(snapshot) = self.snapshot.load_full() else {
            return self.popularity_fallback_empty(k, exclude);
        };

        let Some(&ui) = snapshot.user_index.get(&user_id) else {
            return self.popularity_fallback(&snapshot, k, exclude);
        };

        let n_interactions = snapshot.ratings[ui].iter().filter(|&&r| r > 0.0).count();
        let confidence = (0.5 + n_interactions as f32 / 100.0).min(0.9);

        let mut scored: Vec<(Uuid, f32)> = Vec::new();
        for (event_id, &ej) in snapshot.event_index.iter() {
            if exclude.contains(event_id) {
                continue;
            }
            if snapshot.ratings[ui][ej] > 0.0 {
                continue;
            }
            let dot: f32 = snapshot.user_factors[ui]
                .iter()
                .zip(snapshot.item_factors[ej].iter())
                .map(|(a, b)| a * b)
                .sum();
            let raw = dot + snapshot.global_bias + snapshot.user_bias[ui] + snapshot.item_bias[ej];
            scored.push((*event_id, raw));
        }
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        scored
            .into_iter()
            .take(k)
            .enumerate()
            .map(|(idx, (event_id, raw))| RecommendationItem {
                event_id,
                score: (raw / 5.0).clamp(0.0, 1.0),
                algorithm: RecommendationAlgorithm::CollaborativeFiltering,
                reasons: vec!["Users with similar preferences also liked this event".to_string()],
                confidence,
                rank: idx + 1,
            })
            .collect()
    }

    fn popularity_fallback(
        &self,
        snapshot: &CfSnapshot,
        k: usize,
        exclude: &std::collections::HashSet<Uuid>,
    ) -> Vec<RecommendationItem> {
        let mut sums: Vec<(Uuid, f32)> = snapshot
            .event_index
            .iter()
            .filter(|(id, _)| !exclude.contains(*id))
            .map(|(id, &j)| {
                let sum: f32 = (0..snapshot.ratings.len()).map(|i| snapshot.ratings[i][j]).sum();
                (*id, sum)
            })
            .collect();
        sums.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        let max = sums.first().map(|(_, s)| *s).unwrap_or(0.0);

        sums.into_iter()
            .take(k)
            .enumerate()
            .map(|(idx, (event_id, sum))| RecommendationItem {
                event_id,
                score: normalize_score(sum, 0.0, max),
                algorithm: RecommendationAlgorithm::PopularityBased,
                reasons: vec!["Popular event among all users".to_string()],
                confidence: 0.6,
                rank: idx + 1,
            })
            .collect()
    }

    /// Called when there is no snapshot at all; the orchestrator's own
    /// popularity scorer (over the Event Feature Store) handles this case,
    /// so this just signals an empty CF contribution.
    fn popularity_fallback_empty(
        &self,
        _k: usize,
        _exclude: &std::collections::HashSet<Uuid>,
    ) -> Vec<RecommendationItem> {
        warn!("CF model not trained; no interaction-based popularity data available");
        Vec::new()
    }

    /// Cosine similarity between two events' latent factor vectors.
    pub fn event_similarity(&self, e1: Uuid, e2: Uuid) -> Option<f32> {
        let snapshot = self.snapshot.load_full()?;
        let j1 = *snapshot.event_index.get(&e1)?;
        let j2 = *snapshot.event_index.get(&e2)?;
        Some(crate::util::cosine_similarity(
            &snapshot.item_factors[j1],
            &snapshot.item_factors[j2],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InteractionType;
    use std::collections::HashSet;

    fn interaction(user: Uuid, event: Uuid, t: InteractionType, rating: f32) -> Interaction {
        let mut i = Interaction::new(user, event, t);
        i.rating = Some(rating);
        i
    }

    #[test]
    fn refuses_training_below_min_interactions() {
        let cf = CfRecommender::new(CfConfig {
            min_interactions: 5,
            n_factors: 2,
            n_epochs: 10,
        });
        let u = Uuid::new_v4();
        let e = Uuid::new_v4();
        cf.train(&[interaction(u, e, InteractionType::View, 2.0)]).unwrap();
        assert!(!cf.is_trained());
    }

    #[test]
    fn cf_happy_path_ranks_overlap_event_higher() {
        let cf = CfRecommender::new(CfConfig {
            min_interactions: 5,
            n_factors: 2,
            n_epochs: 200,
        });

        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();
        let u3 = Uuid::new_v4();
        let e1 = Uuid::new_v4();
        let e2 = Uuid::new_v4();
        let e3 = Uuid::new_v4();
        let e4 = Uuid::new_v4();

        let interactions = vec![
            interaction(u1, e1, InteractionType::Rate, 5.0),
            interaction(u1, e2, InteractionType::Rate, 4.0),
            interaction(u2, e1, InteractionType::Rate, 5.0),
            interaction(u2, e2, InteractionType::Rate, 5.0),
            interaction(u2, e3, InteractionType::Rate, 2.0),
            interaction(u3, e3, InteractionType::Rate, 5.0),
            interaction(u3, e4, InteractionType::Rate, 4.0),
        ];

        cf.train(&interactions).unwrap();
        assert!(cf.is_trained());

        let mut exclude = HashSet::new();
        exclude.insert(e1);
        exclude.insert(e2);
        let recs = cf.recommend(u1, 2, &exclude);

        let rank_of = |id: Uuid| recs.iter().position(|r| r.event_id == id);
        let r3 = rank_of(e3);
        let r4 = rank_of(e4);
        assert!(r3.is_some());
        if let (Some(r3), Some(r4)) = (r3, r4) {
            assert!(r3 < r4, "expected E3 ranked above E4");
        }
    }

    #[test]
    fn unseen_user_falls_back_to_popularity() {
        let cf = CfRecommender::new(CfConfig {
            min_interactions: 1,
            n_factors: 2,
            n_epochs: 20,
        });
        let u1 = Uuid::new_v4();
        let e1 = Uuid::new_v4();
        let e2 = Uuid::new_v4();
        cf.train(&[
            interaction(u1, e1, InteractionType::Rate, 5.0),
            interaction(u1, e2, InteractionType::Rate, 1.0),
        ])
        .unwrap();

        let recs = cf.recommend(Uuid::new_v4(), 2, &HashSet::new());
        assert!(recs.iter().all(|r| r.algorithm == RecommendationAlgorithm::PopularityBased));
    }

    #[test]
    fn save_and_load_round_trip() {
        let cf = CfRecommender::new(CfConfig {
            min_interactions: 1,
            n_factors: 2,
            n_epochs: 10,
        });
        let u1 = Uuid::new_v4();
        let e1 = Uuid::new_v4();
        let e2 = Uuid::new_v4();
        cf.train(&[
            interaction(u1, e1, InteractionType::Rate, 5.0),
            interaction(u1, e2, InteractionType::Rate, 1.0),
        ])
        .unwrap();

        let dir = std::env::temp_dir().join(format!("cf_snapshot_test_{}", Uuid::new_v4()));
        cf.save(&dir).unwrap();

        let cf2 = CfRecommender::new(CfConfig {
            min_interactions: 1,
            n_factors: 2,
            n_epochs: 10,
        });
        cf2.load(&dir).unwrap();
        assert!(cf2.is_trained());
        std::fs::remove_file(&dir).ok();
    }
}
