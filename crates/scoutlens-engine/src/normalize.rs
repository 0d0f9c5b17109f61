// Min-max and percentile-rank transforms over a reference population.

use crate::error::{EngineError, EngineResult};
use crate::selection::MetricSelection;
use scoutlens_core::table::PlayerTable;
use serde::Serialize;
use std::cmp::Ordering;

/// Guard added to every denominator that could otherwise be zero.
pub const EPSILON: f64 = 1e-9;

/// Output scale for min-max normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    /// `[0, 1]`
    Unit,
    /// `[0, 100]`
    Percent,
}

impl Scale {
    fn factor(self) -> f64 {
        match self {
            Scale::Unit => 1.0,
            Scale::Percent => 100.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// Column-major block of per-metric values for a fixed row set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricFrame<T> {
    metrics: Vec<String>,
    columns: Vec<Vec<T>>,
    rows: usize,
}

/// Min-max output: every cell is defined.
pub type NormalizedFrame = MetricFrame<f64>;

/// Percentile output: rows with a missing raw value stay missing.
pub type PercentileFrame = MetricFrame<Option<f64>>;

impl<T: Copy> MetricFrame<T> {
    fn new(metrics: Vec<String>, columns: Vec<Vec<T>>, rows: usize) -> Self {
        Self {
            metrics,
            columns,
            rows,
        }
    }

    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn column(&self, metric: &str) -> Option<&[T]> {
        self.metrics
            .iter()
            .position(|m| m == metric)
            .map(|i| self.columns[i].as_slice())
    }

    /// Column by position in the selection.
    pub fn column_at(&self, index: usize) -> &[T] {
        &self.columns[index]
    }

    /// One row across all metrics, in selection order.
    pub fn row(&self, row: usize) -> Vec<T> {
        self.columns.iter().map(|col| col[row]).collect()
    }
}

impl NormalizedFrame {
    /// Unweighted mean of one row's normalized values.
    pub fn row_mean(&self, row: usize) -> f64 {
        if self.columns.is_empty() {
            return 0.0;
        }
        self.columns.iter().map(|col| col[row]).sum::<f64>() / self.columns.len() as f64
    }

    /// Column-wise mean over the given rows.
    pub fn mean_of_rows(&self, rows: &[usize]) -> Vec<f64> {
        self.columns
            .iter()
            .map(|col| {
                if rows.is_empty() {
                    0.0
                } else {
                    rows.iter().map(|&r| col[r]).sum::<f64>() / rows.len() as f64
                }
            })
            .collect()
    }
}

impl PercentileFrame {
    /// Column-wise mean over the given rows, skipping missing cells.
    /// A column with no value among those rows yields `None`.
    pub fn mean_of_rows(&self, rows: &[usize]) -> Vec<Option<f64>> {
        self.columns
            .iter()
            .map(|col| mean_present(rows.iter().map(|&r| col[r])))
            .collect()
    }
}

pub(crate) fn mean_present(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .flatten()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

// ---------------------------------------------------------------------------
// Min-max
// ---------------------------------------------------------------------------

/// Min and max of the present values, or `None` for an all-missing column.
pub fn column_range(values: &[Option<f64>]) -> Option<(f64, f64)> {
    values.iter().flatten().fold(None, |acc, &v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// Scale one value into `[0, 1]` against a population range.
fn scale_unit(value: Option<f64>, range: Option<(f64, f64)>) -> f64 {
    match (value, range) {
        (Some(v), Some((lo, hi))) if hi - lo > 0.0 => ((v - lo) / (hi - lo + EPSILON)).clamp(0.0, 1.0),
        _ => 0.0,
    }
}

/// Min-max normalize `target` rows with ranges taken from `population`.
///
/// Zero-range and all-missing population columns map every target row to 0.
/// Missing target cells become 0 after scaling.
pub fn normalize_minmax(
    population: &PlayerTable,
    target: &PlayerTable,
    selection: &MetricSelection,
    scale: Scale,
) -> EngineResult<NormalizedFrame> {
    if population.is_empty() {
        return Err(EngineError::NoRows { what: "population" });
    }
    population.require_metrics(selection.keys())?;
    target.require_metrics(selection.keys())?;

    let factor = scale.factor();
    let mut columns = Vec::with_capacity(selection.len());
    for metric in selection.iter() {
        let range = column_range(population.column(metric)?);
        let column = target
            .column(metric)?
            .iter()
            .map(|&v| scale_unit(v, range) * factor)
            .collect();
        columns.push(column);
    }
    Ok(MetricFrame::new(selection.keys().to_vec(), columns, target.len()))
}

// ---------------------------------------------------------------------------
// Percentiles
// ---------------------------------------------------------------------------

/// Fractional ranks in `(0, 100]` among the present values. Ties share the
/// average of their positions, so `[10, 10, 20]` gives `[50, 50, 100]`.
pub fn percentile_ranks(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut present: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|x| (i, x)))
        .collect();
    present.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    let count = present.len() as f64;
    let mut out = vec![None; values.len()];
    let mut start = 0;
    while start < present.len() {
        let mut end = start;
        while end + 1 < present.len() && present[end + 1].1 == present[start].1 {
            end += 1;
        }
        // 1-based positions start+1 ..= end+1
        let avg_rank = (start + end + 2) as f64 / 2.0;
        for &(row, _) in &present[start..=end] {
            out[row] = Some(avg_rank / count * 100.0);
        }
        start = end + 1;
    }
    out
}

/// Percentile rank of every population row for each selected metric.
pub fn normalize_percentile(
    population: &PlayerTable,
    selection: &MetricSelection,
) -> EngineResult<PercentileFrame> {
    if population.is_empty() {
        return Err(EngineError::NoRows { what: "population" });
    }
    population.require_metrics(selection.keys())?;

    let columns = selection
        .iter()
        .map(|metric| Ok(percentile_ranks(population.column(metric)?)))
        .collect::<EngineResult<Vec<_>>>()?;
    Ok(MetricFrame::new(
        selection.keys().to_vec(),
        columns,
        population.len(),
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use scoutlens_core::table::PlayerRecord;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn table(rows: &[(&str, Option<f64>, Option<f64>)]) -> PlayerTable {
        rows.iter()
            .fold(PlayerTable::builder(&["gls", "xg"]), |b, (name, g, x)| {
                b.row(PlayerRecord::new(name, "Squad", "2024"), &[*g, *x])
            })
            .build()
            .unwrap()
    }

    fn sel() -> MetricSelection {
        MetricSelection::new(&["gls", "xg"]).unwrap()
    }

    #[test]
    fn minmax_bounds_and_missing() {
        let pop = table(&[
            ("A", Some(0.0), Some(5.0)),
            ("B", Some(5.0), Some(5.0)),
            ("C", Some(10.0), None),
            ("D", None, Some(5.0)),
        ]);
        let frame = normalize_minmax(&pop, &pop, &sel(), Scale::Unit).unwrap();
        let gls = frame.column("gls").unwrap();
        assert!(approx_eq(gls[0], 0.0, 1e-12));
        assert!(approx_eq(gls[1], 0.5, 1e-6));
        assert!(approx_eq(gls[2], 1.0, 1e-6));
        assert_eq!(gls[3], 0.0);
        // zero range
        assert!(frame.column("xg").unwrap().iter().all(|&v| v == 0.0));
        for v in gls {
            assert!((0.0..=1.0).contains(v));
        }
    }

    #[test]
    fn minmax_clips_targets_outside_population() {
        let pop = table(&[("A", Some(1.0), Some(1.0)), ("B", Some(3.0), Some(2.0))]);
        let target = table(&[("X", Some(5.0), Some(0.0))]);
        let frame = normalize_minmax(&pop, &target, &sel(), Scale::Percent).unwrap();
        assert!(approx_eq(frame.row(0)[0], 100.0, 1e-9));
        assert_eq!(frame.row(0)[1], 0.0);
    }

    #[test]
    fn minmax_rejects_empty_population_and_unknown_metric() {
        let empty = table(&[]);
        assert_eq!(
            normalize_minmax(&empty, &empty, &sel(), Scale::Unit),
            Err(EngineError::NoRows { what: "population" })
        );
        let pop = table(&[("A", Some(1.0), Some(1.0))]);
        let bad = MetricSelection::new(&["npxg"]).unwrap();
        assert_eq!(
            normalize_minmax(&pop, &pop, &bad, Scale::Unit),
            Err(EngineError::UnknownMetric("npxg".into()))
        );
    }

    #[test]
    fn percentile_ties_average() {
        let ranks = percentile_ranks(&[Some(10.0), Some(10.0), Some(20.0)]);
        assert_eq!(ranks, vec![Some(50.0), Some(50.0), Some(100.0)]);
    }

    #[test]
    fn percentile_missing_not_counted() {
        let ranks = percentile_ranks(&[Some(3.0), None, Some(1.0), Some(2.0)]);
        assert!(approx_eq(ranks[0].unwrap(), 100.0, 1e-9));
        assert_eq!(ranks[1], None);
        assert!(approx_eq(ranks[2].unwrap(), 100.0 / 3.0, 1e-9));
        assert!(approx_eq(ranks[3].unwrap(), 200.0 / 3.0, 1e-9));
    }

    #[test]
    fn percentile_frame_row_means() {
        let pop = table(&[
            ("A", Some(1.0), None),
            ("A", Some(3.0), None),
            ("B", Some(2.0), Some(1.0)),
            ("C", Some(4.0), Some(2.0)),
        ]);
        let frame = normalize_percentile(&pop, &sel()).unwrap();
        let means = frame.mean_of_rows(&[0, 1]);
        // gls ranks: 25, 75 -> mean 50; xg missing for both rows
        assert!(approx_eq(means[0].unwrap(), 50.0, 1e-9));
        assert_eq!(means[1], None);
    }
}
