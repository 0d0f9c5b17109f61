// Weighted composite of normalized metric columns.

use crate::error::{EngineError, EngineResult};
use crate::normalize::{NormalizedFrame, EPSILON};
use crate::selection::WeightVector;
use std::cmp::Ordering;

/// Weighted mean of each row: `sum(n * w) / (sum(w) + EPSILON)`.
///
/// Uniformly rescaling every weight leaves the result unchanged.
pub fn composite_score(frame: &NormalizedFrame, weights: &WeightVector) -> EngineResult<Vec<f64>> {
    let w: Vec<f64> = frame.metrics().iter().map(|m| weights.get(m)).collect();
    let total: f64 = w.iter().sum();
    if total <= EPSILON {
        return Err(EngineError::DegenerateWeights);
    }

    let scores = (0..frame.rows())
        .map(|row| {
            let weighted: f64 = (0..w.len())
                .map(|i| frame.column_at(i)[row] * w[i])
                .sum();
            weighted / (total + EPSILON)
        })
        .collect();
    Ok(scores)
}

/// Row indices ordered by score, highest first. Equal scores keep their
/// input order.
pub fn rank_descending(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal)
    });
    order
}
