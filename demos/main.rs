//! Small runnable demonstration of the recommendation + analytics pipeline,
//! standing in for the HTTP/gRPC surface that is out of scope here.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use recommendation_core::analytics::AnalyticsEngine;
use recommendation_core::cb::CbRecommender;
use recommendation_core::cf::CfRecommender;
use recommendation_core::config::Config;
use recommendation_core::encoder::HashingEncoder;
use recommendation_core::event_store::EventFeatureStore;
use recommendation_core::hybrid::HybridOrchestrator;
use recommendation_core::interaction_store::InteractionStore;
use recommendation_core::types::{EventFeature, Interaction, InteractionType, RecommendationRequest, UserPreferences};
use tracing::info;
use uuid::Uuid;

fn seed_catalog(events: &EventFeatureStore, encoder: &HashingEncoder) -> Vec<Uuid> {
    let samples = [
        ("Rust Conference 2026", "tech", vec!["rust", "systems"]),
        ("AI Summit", "tech", vec!["ml", "ai"]),
        ("Indie Rock Night", "music", vec!["rock", "live"]),
        ("Jazz in the Park", "music", vec!["jazz", "outdoor"]),
        ("Startup Pitch Day", "business", vec!["startups", "networking"]),
    ];

    let mut ids = Vec::new();
    for (title, category, tags) in samples {
        let feature = EventFeature {
            event_id: Uuid::new_v4(),
            title: title.to_string(),
            description: format!("{title} is a great {category} event"),
            short_description: title.to_string(),
            category: category.to_string(),
            tags: tags.into_iter().map(|t| t.to_string()).collect(),
            organizer: "community".to_string(),
            venue: "Downtown Hall".to_string(),
            venue_location: None,
            is_virtual: false,
            price: 25.0,
            start_time: Some(Utc::now() + chrono::Duration::days(10)),
            curation_score: 0.7,
            image_count: 3,
            semantic_vector: Vec::new(),
        };
        ids.push(feature.event_id);
        events.upsert(feature, encoder);
    }
    ids
}

#[tokio::main]
async fn main() {
    recommendation_core::init_tracing();
    let config = Config::from_env();

    let encoder = Arc::new(HashingEncoder::default());
    let events = Arc::new(EventFeatureStore::new());
    let interactions = Arc::new(InteractionStore::new());
    let analytics = Arc::new(AnalyticsEngine::new(config.analytics.clone()));

    let catalog = seed_catalog(&events, &encoder);

    let user = Uuid::new_v4();
    let mut view = Interaction::new(user, catalog[0], InteractionType::View);
    view.duration_seconds = Some(120);
    interactions.ingest(view.clone());
    analytics.record_interaction(&view, 4.0);

    let like = Interaction::new(user, catalog[1], InteractionType::Like);
    interactions.ingest(like.clone());
    analytics.record_interaction(&like, 3.0);

    let cf = Arc::new(CfRecommender::new(config.cf.clone()));
    let cb = Arc::new(CbRecommender::new(config.cb.clone()));
    cf.train(&interactions.all()).ok();

    let orchestrator = HybridOrchestrator::new(
        config.hybrid.clone(),
        config.cf.clone(),
        cf,
        cb,
        events,
        interactions,
        encoder,
    );

    let mut request = RecommendationRequest::new(user);
    request.count = 3;
    request.exclude_events = HashSet::new();

    let mut preferences = UserPreferences::new();
    preferences.preferred_categories.insert("tech".to_string());

    match orchestrator.recommend(&request, &preferences).await {
        Ok(response) => {
            info!(
                algorithm_used = ?response.algorithm_used,
                cold_start = response.cold_start_user,
                count = response.recommendations.len(),
                "generated recommendations"
            );
            for item in &response.recommendations {
                println!(
                    "#{} event={} score={:.2} confidence={:.2} reasons={:?}",
                    item.rank, item.event_id, item.score, item.confidence, item.reasons
                );
            }
        }
        Err(err) => {
            eprintln!("recommendation request failed: {err}");
        }
    }

    let status = analytics.status();
    println!(
        "analytics: buffer={} sessions={} avg_processing_ms={:.2}",
        status.buffer_size, status.session_count, status.processing_stats.avg_processing_time_ms
    );
}
