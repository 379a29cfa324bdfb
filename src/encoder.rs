//! Text Encoder: deterministic text → fixed-dim dense vector.
//!
//! Behind a trait so a real sentence-transformer/ONNX encoder can be swapped
//! in without touching CB training or inference call sites.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub const DEFAULT_DIM: usize = 384;

pub trait TextEncoder: Send + Sync {
    fn dim(&self) -> usize;
    fn encode(&self, text: &str) -> Vec<f32>;

    fn encode_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
        texts.iter().map(|t| self.encode(t)).collect()
    }
}

/// Deterministic hashing-based encoder. No network or model-file dependency;
/// identical input always produces an identical vector, and batched encode
/// matches single encode exactly since each text is encoded independently.
///
/// Tokens are hashed into buckets of a fixed-dim vector (a signed feature
/// hashing trick), then L2-normalized.
#[derive(Debug, Clone)]
pub struct HashingEncoder {
    dim: usize,
}

impl HashingEncoder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Default for HashingEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_DIM)
    }
}

impl TextEncoder for HashingEncoder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn encode(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];
        if self.dim == 0 {
            return vector;
        }

        for token in text.split_whitespace().map(|t| t.to_lowercase()) {
            if token.is_empty() {
                continue;
            }
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let h = hasher.finish();
            let bucket = (h % self.dim as u64) as usize;
            // Use the next bit of the hash to decide sign, a standard
            // feature-hashing variant that reduces collision bias.
            let sign = if (h >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }
        vector
    }
}
