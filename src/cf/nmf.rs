//! Non-negative matrix factorization via the multiplicative-update solver.
//!
//! `R (N x M) ≈ W (N x F) · H (M x F)^T`, W ≥ 0, H ≥ 0. Initializes with a
//! fixed-seed small-positive random fill (see DESIGN.md for the tradeoff
//! against NNDSVD init); determinism given a fixed seed holds either way.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

const EPS: f32 = 1e-10;
const INIT_MEAN: f32 = 0.15;
const INIT_STDDEV: f32 = 0.06;
const INIT_MIN: f32 = 0.01;

pub struct NmfResult {
    pub w: Array2<f32>,
    pub h: Array2<f32>,
}

/// Factor `r` (N x M) into `w` (N x F) and `h` (M x F) with `epochs`
/// multiplicative-update steps and a fixed `seed` for reproducibility.
pub fn factorize(r: &Array2<f32>, n_factors: usize, epochs: usize, seed: u64) -> NmfResult {
    let (n_users, n_items) = r.dim();
    let mut rng = StdRng::seed_from_u64(seed);
    let init_dist = Normal::new(INIT_MEAN, INIT_STDDEV).expect("fixed init params are valid");

    let mut w = Array2::from_shape_fn((n_users, n_factors), |_| init_dist.sample(&mut rng).max(INIT_MIN));
    let mut h = Array2::from_shape_fn((n_items, n_factors), |_| init_dist.sample(&mut rng).max(INIT_MIN));

    for _ in 0..epochs {
        // W *= (R H) / (W H^T H)
        let rh = r.dot(&h);
        let hth = h.t().dot(&h);
        let w_hth = w.dot(&hth);
        for ((wi, num), den) in w.iter_mut().zip(rh.iter()).zip(w_hth.iter()) {
            *wi = (*wi * num / (den + EPS)).max(0.0);
        }

        // H *= (R^T W) / (H W^T W)
        let rtw = r.t().dot(&w);
        let wtw = w.t().dot(&w);
        let h_wtw = h.dot(&wtw);
        for ((hi, num), den) in h.iter_mut().zip(rtw.iter()).zip(h_wtw.iter()) {
            *hi = (*hi * num / (den + EPS)).max(0.0);
        }
    }

    NmfResult { w, h }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factorization_is_nonnegative() {
        let r = Array2::from_shape_vec((3, 3), vec![5.0, 4.0, 0.0, 5.0, 5.0, 2.0, 0.0, 0.0, 5.0]).unwrap();
        let result = factorize(&r, 2, 50, 42);
        assert!(result.w.iter().all(|&x| x >= 0.0));
        assert!(result.h.iter().all(|&x| x >= 0.0));
    }

    #[test]
    fn same_seed_is_deterministic() {
        let r = Array2::from_shape_vec((3, 3), vec![5.0, 4.0, 0.0, 5.0, 5.0, 2.0, 0.0, 0.0, 5.0]).unwrap();
        let a = factorize(&r, 2, 30, 42);
        let b = factorize(&r, 2, 30, 42);
        assert_eq!(a.w, b.w);
        assert_eq!(a.h, b.h);
    }

    #[test]
    fn reconstruction_approximates_input_after_many_epochs() {
        let r = Array2::from_shape_vec((3, 3), vec![5.0, 4.0, 0.0, 5.0, 5.0, 2.0, 0.0, 0.0, 5.0]).unwrap();
        let result = factorize(&r, 2, 300, 42);
        let reconstructed = result.w.dot(&result.h.t());
        let err: f32 = (&reconstructed - &r).mapv(|x| x * x).sum();
        assert!(err < 10.0, "reconstruction error too high: {err}");
    }
}
