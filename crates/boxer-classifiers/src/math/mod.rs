//! Growable dense containers and log-space numerics.
//!
//! `Array2` backs the per-discrimination coefficient blocks and `Array1` the
//! per-class score counters. Both grow on demand and never truncate live data.
pub mod matrix;
pub mod vector;

pub use matrix::{Array2, ShapeError};
pub use vector::Array1;

/// `ln(sum(exp(v)))` computed without overflow or underflow.
///
/// Returns negative infinity for an empty slice or when every entry is
/// negative infinity.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if max == f64::INFINITY {
        return f64::INFINITY;
    }
    let sum: f64 = values.iter().map(|&v| (v - max).exp()).sum();
    max + sum.ln()
}

/// Turn raw linear scores into log-probabilities in place.
pub fn log_normalize(scores: &mut [f64]) {
    let norm = log_sum_exp(scores);
    for s in scores.iter_mut() {
        *s -= norm;
    }
}

/// Position of the largest value; ties resolve to the lowest position.
pub fn argmax_first(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ if v.is_nan() => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
