//! Small numeric helpers shared across scorers.

use std::collections::HashSet;

/// Normalize a score to [0, 1] given observed min/max.
pub fn normalize_score(score: f32, min: f32, max: f32) -> f32 {
    if max - min < f32::EPSILON {
        if max > 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        ((score - min) / (max - min)).clamp(0.0, 1.0)
    }
}

/// Exponential recency decay: `weight * exp(-decay_rate * age_hours)`.
pub fn exponential_decay(age_hours: f32, decay_rate: f32) -> f32 {
    (-decay_rate * age_hours).exp()
}

/// Cosine similarity between two equal-length dense vectors; 0.0 if either is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a < f32::EPSILON || norm_b < f32::EPSILON {
        0.0
    } else {
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

/// Jaccard similarity of two string sets; either side being empty is treated
/// as a neutral 0.5 rather than 0.0.
pub fn jaccard_or_neutral(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.5;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.5
    } else {
        intersection as f32 / union as f32
    }
}

/// Great-circle distance between two points, in kilometers.
pub fn haversine_km(a_lat: f64, a_lon: f64, b_lat: f64, b_lon: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let (lat1, lat2) = (a_lat.to_radians(), b_lat.to_radians());
    let dlat = (b_lat - a_lat).to_radians();
    let dlon = (b_lon - a_lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}
