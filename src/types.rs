//! Shared domain types for interactions, events, preferences and recommendations.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Interaction types, as enumerated in the rating-derivation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    View,
    Click,
    Like,
    Save,
    Share,
    Register,
    Comment,
    Rate,
}

impl InteractionType {
    /// Weight used when building a content-based user profile.
    pub fn profile_weight(&self) -> f32 {
        match self {
            InteractionType::Register => 1.0,
            InteractionType::Rate => 0.9,
            InteractionType::Like | InteractionType::Save => 0.8,
            InteractionType::Share => 0.7,
            InteractionType::Comment => 0.6,
            InteractionType::Click => 0.5,
            InteractionType::View => 0.3,
        }
    }
}

/// A single append-only interaction record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub interaction_type: InteractionType,
    pub rating: Option<f32>,
    pub duration_seconds: Option<u32>,
    pub timestamp: DateTime<Utc>,
}

impl Interaction {
    pub fn new(user_id: Uuid, event_id: Uuid, interaction_type: InteractionType) -> Self {
        Self {
            user_id,
            event_id,
            interaction_type,
            rating: None,
            duration_seconds: None,
            timestamp: Utc::now(),
        }
    }

    /// Derive an implicit 1..5 rating from the interaction type and duration,
    /// used whenever an explicit `rating` was not supplied.
    pub fn derived_rating(&self) -> f32 {
        if let Some(rating) = self.rating {
            return rating.clamp(1.0, 5.0);
        }

        let base = match self.interaction_type {
            InteractionType::Register => 5.0,
            InteractionType::Like | InteractionType::Save | InteractionType::Share => 4.0,
            InteractionType::Comment => 3.5,
            InteractionType::Click => 3.0,
            InteractionType::View | InteractionType::Rate => 2.0,
        };

        let bonus = if self.interaction_type == InteractionType::View {
            match self.duration_seconds {
                Some(d) if d >= 300 => 1.0,
                Some(d) if d >= 60 => 0.5,
                _ => 0.0,
            }
        } else {
            0.0
        };

        (base + bonus).min(5.0)
    }
}

/// Geographic coordinate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Per-event structured features, plus the precomputed semantic vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFeature {
    pub event_id: Uuid,
    pub title: String,
    pub description: String,
    pub short_description: String,
    pub category: String,
    pub tags: HashSet<String>,
    pub organizer: String,
    pub venue: String,
    pub venue_location: Option<GeoPoint>,
    pub is_virtual: bool,
    pub price: f32,
    pub start_time: Option<DateTime<Utc>>,
    /// Curation score in [0, 1].
    pub curation_score: f32,
    pub image_count: u32,
    pub semantic_vector: Vec<f32>,
}

impl EventFeature {
    /// Weighted concatenation of text fields used both for the event's own
    /// semantic vector and when accumulating a user's text preferences:
    /// title is repeated 3x, category and tags 2x, the rest once.
    pub fn combined_text_blob(&self) -> String {
        let tags_joined = self
            .tags
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(" ");
        let mut parts = Vec::with_capacity(12);
        for _ in 0..3 {
            parts.push(self.title.clone());
        }
        for _ in 0..2 {
            parts.push(self.category.clone());
        }
        for _ in 0..2 {
            parts.push(tags_joined.clone());
        }
        parts.push(self.description.clone());
        parts.push(self.short_description.clone());
        parts.push(self.organizer.clone());
        parts.push(self.venue.clone());
        parts.join(" ")
    }
}

/// User-controlled and learned preferences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPreferences {
    pub preferred_categories: HashSet<String>,
    pub preferred_locations: HashSet<String>,
    pub price_range_min: Option<f32>,
    pub price_range_max: Option<f32>,
    pub interests: HashSet<String>,
    pub avoid_categories: HashSet<String>,
    /// Learned preference for virtual vs in-person events, in [0, 1].
    pub virtual_preference: f32,
}

impl UserPreferences {
    pub fn new() -> Self {
        Self {
            virtual_preference: 0.5,
            ..Default::default()
        }
    }
}

/// Which algorithm produced (or dominantly produced) a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationAlgorithm {
    CollaborativeFiltering,
    ContentBased,
    PopularityBased,
    LocationBased,
    Trending,
    Hybrid,
}

/// A single scored, ranked recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub event_id: Uuid,
    pub score: f32,
    pub algorithm: RecommendationAlgorithm,
    pub reasons: Vec<String>,
    pub confidence: f32,
    pub rank: usize,
}

impl RecommendationItem {
    pub fn clamp_score(&mut self) {
        self.score = self.score.clamp(0.0, 1.0);
        self.confidence = self.confidence.clamp(0.0, 1.0);
    }
}

/// Explanation verbosity requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationLevel {
    None,
    #[default]
    Basic,
    Detailed,
}

/// Inbound recommendation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub user_id: Uuid,
    pub algorithm: Option<RecommendationAlgorithm>,
    pub count: usize,
    pub exclude_events: HashSet<Uuid>,
    pub include_past_events: bool,
    pub location: Option<GeoPoint>,
    pub diversity_factor: Option<f32>,
    pub explanation_level: ExplanationLevel,
    /// Caller-supplied context (e.g. device, surface, referrer), passed
    /// through to the response unread.
    pub context: Option<serde_json::Value>,
    /// Caller-supplied filters (e.g. category/date-range restrictions),
    /// not interpreted by the orchestrator itself.
    pub filters: Option<serde_json::Value>,
}

impl RecommendationRequest {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            algorithm: None,
            count: 20,
            exclude_events: HashSet::new(),
            include_past_events: false,
            location: None,
            diversity_factor: None,
            explanation_level: ExplanationLevel::Basic,
            context: None,
            filters: None,
        }
    }

    /// `InvalidRequest` boundary check: `count` must fall in 1..=100.
    pub fn validate(&self) -> Result<(), String> {
        if self.count == 0 || self.count > 100 {
            return Err(format!(
                "count must be in 1..=100, got {}",
                self.count
            ));
        }
        if let Some(loc) = self.location {
            if !(-90.0..=90.0).contains(&loc.lat) || !(-180.0..=180.0).contains(&loc.lon) {
                return Err(format!("invalid location: {loc:?}"));
            }
        }
        if let Some(df) = self.diversity_factor {
            if !(0.0..=1.0).contains(&df) {
                return Err(format!("diversity_factor must be in [0,1], got {df}"));
            }
        }
        Ok(())
    }
}

/// The final response emitted by the hybrid orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub user_id: Uuid,
    pub recommendations: Vec<RecommendationItem>,
    pub total_count: usize,
    pub algorithm_used: RecommendationAlgorithm,
    /// Echoes the request's `context` unchanged.
    pub context: Option<serde_json::Value>,
    pub generated_at: DateTime<Utc>,
    pub processing_time_ms: f64,
    pub model_version: String,
    pub ab_test_variant: Option<String>,
    pub user_profile_completeness: f32,
    pub cold_start_user: bool,
    pub fallback_used: bool,
}

/// A request for events similar to a given event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarEventsRequest {
    pub event_id: Uuid,
    pub count: usize,
    pub algorithm: Option<RecommendationAlgorithm>,
    pub exclude_same_organizer: bool,
    pub min_similarity_score: f32,
}
