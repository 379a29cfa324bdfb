//! Environment-driven configuration, following the recognized options table.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub cf: CfConfig,
    pub cb: CbConfig,
    pub hybrid: HybridConfig,
    pub analytics: AnalyticsConfig,
}

#[derive(Debug, Clone)]
pub struct CfConfig {
    pub min_interactions: usize,
    pub n_factors: usize,
    pub n_epochs: usize,
}

#[derive(Debug, Clone)]
pub struct CbConfig {
    pub category_weight: f32,
    pub tag_weight: f32,
    pub description_weight: f32,
    pub location_weight: f32,
    pub similarity_threshold: f32,
}

#[derive(Debug, Clone)]
pub struct HybridConfig {
    pub collaborative_weight: f32,
    pub content_weight: f32,
    pub popularity_weight: f32,
    pub diversity_weight: f32,
    pub diversity_factor: f32,
    pub exploration_factor: f32,
    pub model_inference_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    pub real_time_window_seconds: usize,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T
where
    T::Err: std::fmt::Debug,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{key} must be a valid value: {e:?}")),
        Err(_) => default,
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to the
    /// recognized defaults. Mirrors the `Config::from_env` idiom used
    /// throughout the source monorepo's services.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Config {
            cf: CfConfig {
                min_interactions: env_parse("CF_MIN_INTERACTIONS", 5),
                n_factors: env_parse("CF_N_FACTORS", 50),
                n_epochs: env_parse("CF_N_EPOCHS", 100),
            },
            cb: CbConfig {
                category_weight: env_parse("CATEGORY_WEIGHT", 0.30),
                tag_weight: env_parse("TAG_WEIGHT", 0.25),
                description_weight: env_parse("DESCRIPTION_WEIGHT", 0.25),
                location_weight: env_parse("LOCATION_WEIGHT", 0.20),
                similarity_threshold: env_parse("SIMILARITY_THRESHOLD", 0.7),
            },
            hybrid: HybridConfig {
                collaborative_weight: env_parse("COLLABORATIVE_WEIGHT", 0.4),
                content_weight: env_parse("CONTENT_WEIGHT", 0.35),
                popularity_weight: env_parse("POPULARITY_WEIGHT", 0.15),
                diversity_weight: env_parse("DIVERSITY_WEIGHT", 0.1),
                diversity_factor: env_parse("DIVERSITY_FACTOR", 0.1),
                exploration_factor: env_parse("EXPLORATION_FACTOR", 0.05),
                model_inference_timeout: Duration::from_secs(env_parse(
                    "MODEL_INFERENCE_TIMEOUT",
                    30,
                )),
            },
            analytics: AnalyticsConfig {
                real_time_window_seconds: env_parse("REAL_TIME_WINDOW_SECONDS", 300),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cf: CfConfig {
                min_interactions: 5,
                n_factors: 50,
                n_epochs: 100,
            },
            cb: CbConfig {
                category_weight: 0.30,
                tag_weight: 0.25,
                description_weight: 0.25,
                location_weight: 0.20,
                similarity_threshold: 0.7,
            },
            hybrid: HybridConfig {
                collaborative_weight: 0.4,
                content_weight: 0.35,
                popularity_weight: 0.15,
                diversity_weight: 0.1,
                diversity_factor: 0.1,
                exploration_factor: 0.05,
                model_inference_timeout: Duration::from_secs(30),
            },
            analytics: AnalyticsConfig {
                real_time_window_seconds: 300,
            },
        }
    }
}
