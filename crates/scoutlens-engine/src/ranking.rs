// Single-metric and weighted-composite rankings of a player pool.

use crate::error::{EngineError, EngineResult};
use crate::normalize::{normalize_minmax, percentile_ranks, Scale};
use crate::scorer::{composite_score, rank_descending};
use crate::selection::{MetricSelection, WeightVector, COMPOSITE_BOUNDS};
use scoutlens_core::table::{PlayerRecord, PlayerTable};
use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortOrder {
    Ascending,
    Descending,
}

// ---------------------------------------------------------------------------
// Single metric
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRankRow {
    pub rank: usize,
    pub record: PlayerRecord,
    pub value: Option<f64>,
    /// Percentile of `value` within the ranked pool, 0-100.
    pub index: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleMetricRanking {
    pub metric: String,
    pub order: SortOrder,
    pub rows: Vec<MetricRankRow>,
}

/// Sort the pool by one metric's raw value. Missing values go last in
/// either direction and equal values keep pool order.
pub fn rank_by_metric(
    pool: &PlayerTable,
    metric: &str,
    order: SortOrder,
) -> EngineResult<SingleMetricRanking> {
    if pool.is_empty() {
        return Err(EngineError::NoRows { what: "pool" });
    }
    let values = pool.column(metric)?;
    let index = percentile_ranks(values);

    let mut rows: Vec<usize> = (0..pool.len()).collect();
    rows.sort_by(|&a, &b| match (values[a], values[b]) {
        (Some(x), Some(y)) => {
            let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            match order {
                SortOrder::Ascending => ord,
                SortOrder::Descending => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    let rows = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| MetricRankRow {
            rank: i + 1,
            record: pool.records()[row].clone(),
            value: values[row],
            index: index[row],
        })
        .collect();

    Ok(SingleMetricRanking {
        metric: metric.to_string(),
        order,
        rows,
    })
}

// ---------------------------------------------------------------------------
// Composite
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositeRow {
    pub rank: usize,
    pub record: PlayerRecord,
    /// Weighted mean of pool-normalized metrics, 0-100.
    pub score: f64,
    /// Raw value times weight per metric, in selection order.
    pub weighted_values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositeRanking {
    pub metrics: Vec<String>,
    pub weights: Vec<f64>,
    pub rows: Vec<CompositeRow>,
}

/// Rank the pool by a weighted composite of 3 to 12 metrics, each min-max
/// scaled over the pool itself.
pub fn rank_composite(
    pool: &PlayerTable,
    selection: &MetricSelection,
    weights: &WeightVector,
) -> EngineResult<CompositeRanking> {
    selection.require_len(&COMPOSITE_BOUNDS)?;
    if pool.is_empty() {
        return Err(EngineError::NoRows { what: "pool" });
    }

    let frame = normalize_minmax(pool, pool, selection, Scale::Unit)?;
    let scores: Vec<f64> = composite_score(&frame, weights)?
        .into_iter()
        .map(|s| s * 100.0)
        .collect();
    let w = weights.for_selection(selection);

    let columns = selection
        .iter()
        .map(|m| pool.column(m))
        .collect::<Result<Vec<_>, _>>()?;

    let rows = rank_descending(&scores)
        .into_iter()
        .enumerate()
        .map(|(i, row)| CompositeRow {
            rank: i + 1,
            record: pool.records()[row].clone(),
            score: scores[row],
            weighted_values: columns
                .iter()
                .zip(&w)
                .map(|(col, weight)| col[row].map(|v| v * weight))
                .collect(),
        })
        .collect();

    debug!(
        "Composite ranking over {} row(s), {} metric(s)",
        pool.len(),
        selection.len()
    );
    Ok(CompositeRanking {
        metrics: selection.keys().to_vec(),
        weights: w,
        rows,
    })
}
