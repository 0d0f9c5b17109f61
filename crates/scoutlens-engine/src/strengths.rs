// A player's strongest and weakest metrics relative to a pool.

use crate::error::{EngineError, EngineResult};
use crate::normalize::normalize_percentile;
use crate::selection::MetricSelection;
use scoutlens_core::table::PlayerTable;
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricPercentile {
    pub metric: String,
    pub percentile: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrengthReport {
    pub player: String,
    pub strengths: Vec<MetricPercentile>,
    pub weaknesses: Vec<MetricPercentile>,
}

/// Percentiles over `pool`, averaged across the player's rows and sorted
/// high to low. Strengths are the first `n`, weaknesses the last `n`.
/// Metrics the player has no value for are left out.
pub fn strengths_and_weaknesses(
    reference: &str,
    pool: &PlayerTable,
    selection: &MetricSelection,
    n: usize,
) -> EngineResult<StrengthReport> {
    if pool.is_empty() {
        return Err(EngineError::NoRows { what: "pool" });
    }
    let rows = pool.rows_for_player(reference);
    if rows.is_empty() {
        return Err(EngineError::ReferenceNotFound {
            player: reference.to_string(),
            scope: "pool",
        });
    }

    let frame = normalize_percentile(pool, selection)?;
    let mut ranked: Vec<MetricPercentile> = selection
        .iter()
        .zip(frame.mean_of_rows(&rows))
        .filter_map(|(metric, pct)| {
            pct.map(|percentile| MetricPercentile {
                metric: metric.to_string(),
                percentile,
            })
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.percentile
            .partial_cmp(&a.percentile)
            .unwrap_or(Ordering::Equal)
    });

    let strengths = ranked.iter().take(n).cloned().collect();
    let weaknesses = ranked[ranked.len().saturating_sub(n)..].to_vec();
    Ok(StrengthReport {
        player: reference.to_string(),
        strengths,
        weaknesses,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scoutlens_core::table::PlayerRecord;

    fn pool() -> PlayerTable {
        PlayerTable::builder(&["a", "b", "c", "d"])
            .row(
                PlayerRecord::new("A", "S", "2024"),
                &[Some(4.0), Some(1.0), Some(3.0), None],
            )
            .row(
                PlayerRecord::new("B", "S", "2024"),
                &[Some(2.0), Some(2.0), Some(1.0), Some(1.0)],
            )
            .row(
                PlayerRecord::new("C", "S", "2024"),
                &[Some(1.0), Some(3.0), Some(2.0), Some(2.0)],
            )
            .build()
            .unwrap()
    }

    fn keys(items: &[MetricPercentile]) -> Vec<&str> {
        items.iter().map(|m| m.metric.as_str()).collect()
    }

    #[test]
    fn splits_top_and_bottom() {
        let sel = MetricSelection::new(&["a", "b", "c", "d"]).unwrap();
        let report = strengths_and_weaknesses("A", &pool(), &sel, 1).unwrap();
        assert_eq!(keys(&report.strengths), vec!["a"]);
        assert_eq!(keys(&report.weaknesses), vec!["b"]);

        let report = strengths_and_weaknesses("A", &pool(), &sel, 5).unwrap();
        // d is missing for A and left out
        assert_eq!(keys(&report.strengths), vec!["a", "c", "b"]);
        assert_eq!(keys(&report.weaknesses), vec!["a", "c", "b"]);
    }

    #[test]
    fn unknown_player_is_reference_error() {
        let sel = MetricSelection::new(&["a"]).unwrap();
        assert_eq!(
            strengths_and_weaknesses("Z", &pool(), &sel, 3),
            Err(EngineError::ReferenceNotFound {
                player: "Z".into(),
                scope: "pool"
            })
        );
    }
}
