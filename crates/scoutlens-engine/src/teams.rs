// Squad-level metric averages.

use crate::error::{EngineError, EngineResult};
use crate::normalize::mean_present;
use crate::selection::{MetricSelection, SelectionBounds};
use scoutlens_core::table::PlayerTable;
use serde::Serialize;
use std::cmp::Ordering;

/// A squad comparison reads best with one to three metrics.
pub const TEAM_METRIC_BOUNDS: SelectionBounds = 1..=3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamAverage {
    pub rank: usize,
    pub squad: String,
    pub rows: usize,
    /// Mean of each selected metric, in selection order.
    pub means: Vec<f64>,
    /// Mean of `means`; the sort key.
    pub overall: f64,
}

/// Average each metric per squad and rank squads by the mean of those
/// averages. Squads with no value at all for some metric are dropped.
pub fn team_averages(
    pool: &PlayerTable,
    selection: &MetricSelection,
    top_n: usize,
) -> EngineResult<Vec<TeamAverage>> {
    selection.require_len(&TEAM_METRIC_BOUNDS)?;
    if pool.is_empty() {
        return Err(EngineError::NoRows { what: "pool" });
    }
    let columns = selection
        .iter()
        .map(|m| pool.column(m))
        .collect::<Result<Vec<_>, _>>()?;

    // Squads in first-seen order.
    let mut squads: Vec<(&str, Vec<usize>)> = Vec::new();
    for (row, record) in pool.records().iter().enumerate() {
        match squads.iter_mut().find(|(s, _)| *s == record.squad) {
            Some((_, rows)) => rows.push(row),
            None => squads.push((record.squad.as_str(), vec![row])),
        }
    }

    let mut teams: Vec<TeamAverage> = squads
        .into_iter()
        .filter_map(|(squad, rows)| {
            let means = columns
                .iter()
                .map(|col| mean_present(rows.iter().map(|&r| col[r])))
                .collect::<Option<Vec<f64>>>()?;
            let overall = means.iter().sum::<f64>() / means.len() as f64;
            Some(TeamAverage {
                rank: 0,
                squad: squad.to_string(),
                rows: rows.len(),
                means,
                overall,
            })
        })
        .collect();

    teams.sort_by(|a, b| b.overall.partial_cmp(&a.overall).unwrap_or(Ordering::Equal));
    teams.truncate(top_n);
    for (i, team) in teams.iter_mut().enumerate() {
        team.rank = i + 1;
    }
    Ok(teams)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use scoutlens_core::table::PlayerRecord;

    fn pool() -> PlayerTable {
        PlayerTable::builder(&["gls", "ast"])
            .row(PlayerRecord::new("A", "Alpha", "2024"), &[Some(1.0), Some(0.0)])
            .row(PlayerRecord::new("B", "Beta", "2024"), &[Some(2.0), Some(2.0)])
            .row(PlayerRecord::new("C", "Alpha", "2024"), &[Some(3.0), None])
            .row(PlayerRecord::new("D", "Gamma", "2024"), &[Some(9.0), None])
            .row(PlayerRecord::new("E", "Delta", "2024"), &[Some(1.0), Some(1.0)])
            .build()
            .unwrap()
    }

    #[test]
    fn groups_and_orders_squads() {
        let sel = MetricSelection::new(&["gls", "ast"]).unwrap();
        let teams = team_averages(&pool(), &sel, 10).unwrap();
        let names: Vec<&str> = teams.iter().map(|t| t.squad.as_str()).collect();
        // Gamma has no ast values and is dropped; Alpha and Delta tie at 1.0
        assert_eq!(names, vec!["Beta", "Alpha", "Delta"]);
        assert_eq!(teams[1].means, vec![2.0, 0.0]);
        assert_eq!(teams[1].rows, 2);
        assert_eq!(teams[0].rank, 1);
    }

    #[test]
    fn ties_keep_first_appearance_and_top_n_truncates() {
        let sel = MetricSelection::new(&["ast"]).unwrap();
        let pool = pool().filter_records(|r| r.squad != "Beta");
        let teams = team_averages(&pool, &sel, 10).unwrap();
        let names: Vec<&str> = teams.iter().map(|t| t.squad.as_str()).collect();
        assert_eq!(names, vec!["Delta", "Alpha"]);

        let sel = MetricSelection::new(&["gls"]).unwrap();
        assert_eq!(team_averages(&pool, &sel, 1).unwrap().len(), 1);
    }

    #[test]
    fn metric_count_bounded() {
        let sel = MetricSelection::new(&["gls", "ast", "x", "y"]).unwrap();
        let err = team_averages(&pool(), &sel, 10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputShape);
    }
}
