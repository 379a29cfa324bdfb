//! Hybrid event-recommendation core: collaborative filtering, content-based
//! similarity, and popularity/location/trending signals fused by a hybrid
//! orchestrator, plus the real-time analytics engine that shares its
//! interaction stream.

pub mod analytics;
pub mod cb;
pub mod cf;
pub mod config;
pub mod encoder;
pub mod error;
pub mod event_store;
pub mod hybrid;
pub mod interaction_store;
pub mod scorers;
pub mod types;
pub mod util;

pub use config::Config;
pub use encoder::{HashingEncoder, TextEncoder};
pub use error::{EngineError, Result};
pub use event_store::EventFeatureStore;
pub use hybrid::HybridOrchestrator;
pub use interaction_store::InteractionStore;

/// Initialize `tracing` with an env-filter + fmt layer.
pub fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
