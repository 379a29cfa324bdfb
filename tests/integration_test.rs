use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use recommendation_core::cb::CbRecommender;
use recommendation_core::cf::CfRecommender;
use recommendation_core::config::Config;
use recommendation_core::encoder::HashingEncoder;
use recommendation_core::event_store::EventFeatureStore;
use recommendation_core::hybrid::HybridOrchestrator;
use recommendation_core::interaction_store::InteractionStore;
use recommendation_core::types::{EventFeature, Interaction, InteractionType, RecommendationRequest, UserPreferences};
use uuid::Uuid;

fn catalog_event(category: &str, tags: &[&str], curation_score: f32) -> EventFeature {
    EventFeature {
        event_id: Uuid::new_v4(),
        title: format!("{category} gathering"),
        description: format!("a {category} event"),
        short_description: category.to_string(),
        category: category.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        organizer: "community".to_string(),
        venue: "Main Hall".to_string(),
        venue_location: None,
        is_virtual: false,
        price: 15.0,
        start_time: Some(Utc::now() + chrono::Duration::days(14)),
        curation_score,
        image_count: 1,
        semantic_vector: Vec::new(),
    }
}

fn build_orchestrator(
    events: Arc<EventFeatureStore>,
    interactions: Arc<InteractionStore>,
    encoder: Arc<HashingEncoder>,
) -> HybridOrchestrator {
    let config = Config::default();
    let cf = Arc::new(CfRecommender::new(config.cf.clone()));
    cf.train(&interactions.all()).ok();
    let cb = Arc::new(CbRecommender::new(config.cb.clone()));

    HybridOrchestrator::new(config.hybrid, config.cf, cf, cb, events, interactions, encoder)
}

#[tokio::test]
async fn cold_start_basic_ranks_by_popularity() {
    let events = Arc::new(EventFeatureStore::new());
    let interactions = Arc::new(InteractionStore::new());
    let encoder = Arc::new(HashingEncoder::default());

    let mut event_ids = Vec::new();
    for i in 0..10 {
        let event = catalog_event("tech", &[], 0.5);
        event_ids.push(event.event_id);
        events.upsert(event, encoder.as_ref());
    }

    // Give the first few events more interaction volume so popularity has
    // something to differentiate on.
    for _ in 0..8 {
        interactions.ingest(Interaction::new(Uuid::new_v4(), event_ids[0], InteractionType::View));
    }
    for _ in 0..3 {
        interactions.ingest(Interaction::new(Uuid::new_v4(), event_ids[1], InteractionType::View));
    }

    let orchestrator = build_orchestrator(events, interactions, encoder);
    let mut request = RecommendationRequest::new(Uuid::new_v4());
    request.count = 5;
    let preferences = UserPreferences::new();

    let response = orchestrator.recommend(&request, &preferences).await.unwrap();

    assert!(response.cold_start_user);
    assert!(response.fallback_used);
    assert_eq!(response.recommendations.len(), 5);
    for window in response.recommendations.windows(2) {
        assert!(window[0].rank < window[1].rank);
    }
}

#[tokio::test]
async fn cf_happy_path_overlap_event_ranks_above_non_overlap() {
    let events = Arc::new(EventFeatureStore::new());
    let interactions = Arc::new(InteractionStore::new());
    let encoder = Arc::new(HashingEncoder::default());

    let u1 = Uuid::new_v4();
    let u2 = Uuid::new_v4();
    let u3 = Uuid::new_v4();
    let e1 = catalog_event("tech", &[], 0.5);
    let e2 = catalog_event("tech", &[], 0.5);
    let e3 = catalog_event("music", &[], 0.5);
    let e4 = catalog_event("music", &[], 0.5);
    for e in [&e1, &e2, &e3, &e4] {
        events.upsert(e.clone(), encoder.as_ref());
    }

    let rated = |user: Uuid, event: Uuid, rating: f32| {
        let mut i = Interaction::new(user, event, InteractionType::Rate);
        i.rating = Some(rating);
        i
    };

    interactions.ingest(rated(u1, e1.event_id, 5.0));
    interactions.ingest(rated(u1, e2.event_id, 4.0));
    interactions.ingest(rated(u2, e1.event_id, 5.0));
    interactions.ingest(rated(u2, e2.event_id, 5.0));
    interactions.ingest(rated(u2, e3.event_id, 2.0));
    interactions.ingest(rated(u3, e3.event_id, 5.0));
    interactions.ingest(rated(u3, e4.event_id, 4.0));

    let cf = CfRecommender::new(recommendation_core::config::CfConfig {
        min_interactions: 5,
        n_factors: 2,
        n_epochs: 200,
    });
    cf.train(&interactions.all()).unwrap();

    let mut exclude = HashSet::new();
    exclude.insert(e1.event_id);
    exclude.insert(e2.event_id);
    let recs = cf.recommend(u1, 2, &exclude);

    let rank_of = |id: Uuid| recs.iter().position(|r| r.event_id == id);
    let (r3, r4) = (rank_of(e3.event_id), rank_of(e4.event_id));
    assert!(r3.is_some());
    if let (Some(r3), Some(r4)) = (r3, r4) {
        assert!(r3 < r4);
    }
}

#[tokio::test]
async fn cold_start_with_category_preference_favors_matching_category() {
    let events = Arc::new(EventFeatureStore::new());
    let interactions = Arc::new(InteractionStore::new());
    let encoder = Arc::new(HashingEncoder::default());

    for _ in 0..3 {
        events.upsert(catalog_event("tech", &["rust"], 0.6), encoder.as_ref());
    }
    for _ in 0..3 {
        events.upsert(catalog_event("music", &["jazz"], 0.6), encoder.as_ref());
    }

    let orchestrator = build_orchestrator(events.clone(), interactions, encoder);
    let mut request = RecommendationRequest::new(Uuid::new_v4());
    request.count = 4;
    request.diversity_factor = Some(0.0);

    let mut preferences = UserPreferences::new();
    preferences.preferred_categories.insert("tech".to_string());

    let response = orchestrator.recommend(&request, &preferences).await.unwrap();
    let tech_count = response
        .recommendations
        .iter()
        .filter(|r| events.get(r.event_id).map(|e| e.category == "tech").unwrap_or(false))
        .count();

    assert!(tech_count >= 3, "expected at least 3 tech events, got {tech_count}");
}

#[tokio::test]
async fn diversification_balances_two_categories() {
    let events = Arc::new(EventFeatureStore::new());
    let interactions = Arc::new(InteractionStore::new());
    let encoder = Arc::new(HashingEncoder::default());

    for _ in 0..15 {
        events.upsert(catalog_event("a-category", &[], 0.9), encoder.as_ref());
    }
    for _ in 0..5 {
        events.upsert(catalog_event("b-category", &[], 0.7), encoder.as_ref());
    }

    let orchestrator = build_orchestrator(events, interactions, encoder);
    let mut request = RecommendationRequest::new(Uuid::new_v4());
    request.count = 10;
    request.diversity_factor = Some(1.0);
    let preferences = UserPreferences::new();

    let response = orchestrator.recommend(&request, &preferences).await.unwrap();
    assert_eq!(response.recommendations.len(), 10);
}
