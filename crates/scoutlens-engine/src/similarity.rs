// Weighted cosine similarity to a reference player.

use crate::error::{EngineError, EngineResult};
use crate::normalize::{normalize_minmax, Scale, EPSILON};
use crate::scorer::rank_descending;
use crate::selection::{MetricSelection, WeightVector};
use scoutlens_core::table::{PlayerRecord, PlayerTable};
use serde::Serialize;
use tracing::debug;

/// Number of neighbours returned when the caller does not say otherwise.
pub const DEFAULT_TOP_K: usize = 25;

/// One pool row and its similarity to the reference profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarPlayer {
    pub rank: usize,
    pub record: PlayerRecord,
    pub similarity: f64,
}

/// Scale each component by its weight, then divide by the L2 norm.
pub fn weighted_unit_vector(values: &[f64], weights: &[f64]) -> Vec<f64> {
    let weighted: Vec<f64> = values.iter().zip(weights).map(|(v, w)| v * w).collect();
    let norm = weighted.iter().map(|x| x * x).sum::<f64>().sqrt();
    weighted.iter().map(|x| x / (norm + EPSILON)).collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Rank pool rows by similarity to `reference`.
///
/// Metrics are min-max scaled over `population`. The reference profile is
/// the mean of the reference player's population rows. The reference's own
/// pool rows are never scored. Ties keep pool order; at most `top_k` rows
/// are returned, and an empty result is not an error.
pub fn most_similar(
    reference: &str,
    pool: &PlayerTable,
    selection: &MetricSelection,
    weights: &WeightVector,
    population: &PlayerTable,
    top_k: usize,
) -> EngineResult<Vec<SimilarPlayer>> {
    if pool.is_empty() {
        return Err(EngineError::NoRows { what: "pool" });
    }
    if population.is_empty() {
        return Err(EngineError::NoRows { what: "population" });
    }
    pool.require_metrics(selection.keys())?;
    population.require_metrics(selection.keys())?;
    weights.ensure_not_degenerate(selection)?;

    let reference_rows = population.rows_for_player(reference);
    if reference_rows.is_empty() {
        return Err(EngineError::ReferenceNotFound {
            player: reference.to_string(),
            scope: "population",
        });
    }
    if !pool.contains_player(reference) {
        return Err(EngineError::ReferenceNotFound {
            player: reference.to_string(),
            scope: "pool",
        });
    }

    let population_norm = normalize_minmax(population, population, selection, Scale::Unit)?;
    let pool_norm = normalize_minmax(population, pool, selection, Scale::Unit)?;

    let w = weights.for_selection(selection);
    let reference_unit = weighted_unit_vector(&population_norm.mean_of_rows(&reference_rows), &w);

    let candidates: Vec<usize> = (0..pool.len())
        .filter(|&row| pool.records()[row].player != reference)
        .collect();
    let scores: Vec<f64> = candidates
        .iter()
        .map(|&row| dot(&reference_unit, &weighted_unit_vector(&pool_norm.row(row), &w)))
        .collect();

    let result: Vec<SimilarPlayer> = rank_descending(&scores)
        .into_iter()
        .take(top_k)
        .enumerate()
        .map(|(i, idx)| SimilarPlayer {
            rank: i + 1,
            record: pool.records()[candidates[idx]].clone(),
            similarity: scores[idx],
        })
        .collect();

    debug!(
        "Similarity for {}: {} candidate row(s), returning {}",
        reference,
        candidates.len(),
        result.len()
    );
    Ok(result)
}
