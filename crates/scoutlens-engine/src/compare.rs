// Side-by-side comparison of up to three players: radar profiles against
// the full dataset, an aggregate index with deltas, and a per-metric table.

use crate::error::{EngineError, EngineResult};
use crate::normalize::{mean_present, normalize_minmax, normalize_percentile, PercentileFrame, Scale};
use crate::selection::MetricSelection;
use scoutlens_core::table::PlayerTable;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Most players shown on one radar.
pub const MAX_COMPARED_PLAYERS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerProfile {
    pub player: String,
    /// Group rows the profile was averaged over.
    pub rows: usize,
    /// Global percentiles per metric, 0-100, missing as 0.
    pub radar: Vec<f64>,
    /// Mean of the globally min-max scaled metrics, 0-100.
    pub aggregate_index: f64,
    /// `aggregate_index` minus the reference's; `None` for the reference.
    pub delta: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub metric: String,
    /// Mean raw value per compared player.
    pub raw: Vec<Option<f64>>,
    /// Raw difference against the reference, one per non-reference player.
    pub deltas: Vec<Option<f64>>,
    /// Percentile within the comparison group per compared player.
    pub group_percentiles: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub reference: String,
    pub metrics: Vec<String>,
    pub players: Vec<PlayerProfile>,
    /// Mean radar profile across every player in the comparison group.
    pub baseline: Vec<f64>,
    pub table: Vec<ComparisonRow>,
}

impl Comparison {
    pub fn profile(&self, player: &str) -> Option<&PlayerProfile> {
        self.players.iter().find(|p| p.player == player)
    }
}

/// Distinct names in input order, capped at `MAX_COMPARED_PLAYERS`.
fn dedupe_players<'a>(players: &[&'a str]) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for &p in players {
        if !out.contains(&p) {
            out.push(p);
        }
    }
    if out.len() > MAX_COMPARED_PLAYERS {
        warn!(
            "Comparing at most {} players; dropping {:?}",
            MAX_COMPARED_PLAYERS,
            &out[MAX_COMPARED_PLAYERS..]
        );
        out.truncate(MAX_COMPARED_PLAYERS);
    }
    out
}

/// Compare players within `group`, scoring radar and aggregate values
/// against `global`.
pub fn compare_players(
    global: &PlayerTable,
    group: &PlayerTable,
    players: &[&str],
    reference: &str,
    selection: &MetricSelection,
) -> EngineResult<Comparison> {
    if global.is_empty() {
        return Err(EngineError::NoRows { what: "population" });
    }
    if group.is_empty() {
        return Err(EngineError::NoRows { what: "comparison group" });
    }
    global.require_metrics(selection.keys())?;
    group.require_metrics(selection.keys())?;

    let requested = dedupe_players(players);
    if requested.is_empty() {
        return Err(EngineError::TooFewPlayers {
            required: 1,
            got: 0,
        });
    }
    if !requested.contains(&reference) {
        return Err(EngineError::ReferenceNotFound {
            player: reference.to_string(),
            scope: "selected players",
        });
    }
    if !group.contains_player(reference) {
        return Err(EngineError::ReferenceNotFound {
            player: reference.to_string(),
            scope: "comparison group",
        });
    }

    let mut compared: Vec<(&str, Vec<usize>)> = Vec::new();
    for name in requested {
        let rows = group.rows_for_player(name);
        if rows.is_empty() {
            warn!("{} has no rows in the comparison group; skipping", name);
            continue;
        }
        compared.push((name, rows));
    }

    // Group rows located in the global table through their row key.
    let global_index: HashMap<&str, usize> = global
        .records()
        .iter()
        .enumerate()
        .rev()
        .map(|(i, r)| (r.row_key.as_str(), i))
        .collect();

    let global_pct = normalize_percentile(global, selection)?;
    let group_pct = normalize_percentile(group, selection)?;
    let scaled = normalize_minmax(global, group, selection, Scale::Percent)?;

    let mut profiles: Vec<PlayerProfile> = compared
        .iter()
        .map(|(name, rows)| {
            let global_rows: Vec<usize> = rows
                .iter()
                .filter_map(|&r| global_index.get(group.records()[r].row_key.as_str()).copied())
                .collect();
            let radar = global_pct
                .mean_of_rows(&global_rows)
                .into_iter()
                .map(|v| v.unwrap_or(0.0))
                .collect();
            let aggregate_index =
                rows.iter().map(|&r| scaled.row_mean(r)).sum::<f64>() / rows.len() as f64;
            PlayerProfile {
                player: name.to_string(),
                rows: rows.len(),
                radar,
                aggregate_index,
                delta: None,
            }
        })
        .collect();

    let reference_index = profiles
        .iter()
        .find(|p| p.player == reference)
        .map(|p| p.aggregate_index)
        .unwrap_or(0.0);
    for profile in profiles.iter_mut().filter(|p| p.player != reference) {
        profile.delta = Some(profile.aggregate_index - reference_index);
    }

    let baseline = group_baseline(group, &global_index, &global_pct);

    let table = comparison_table(group, selection, &compared, reference, &group_pct)?;

    debug!(
        "Compared {} player(s) over {} metric(s), group of {} row(s)",
        profiles.len(),
        selection.len(),
        group.len()
    );
    Ok(Comparison {
        reference: reference.to_string(),
        metrics: selection.keys().to_vec(),
        players: profiles,
        baseline,
        table,
    })
}

/// Per-player mean global percentiles over each group player's rows, then
/// averaged across players. Players with no value for a metric do not count
/// toward that metric; a metric nobody has is 0.
fn group_baseline(
    group: &PlayerTable,
    global_index: &HashMap<&str, usize>,
    global_pct: &PercentileFrame,
) -> Vec<f64> {
    let mut players: Vec<(&str, Vec<usize>)> = Vec::new();
    for record in group.records() {
        let Some(&row) = global_index.get(record.row_key.as_str()) else {
            continue;
        };
        match players.iter_mut().find(|(p, _)| *p == record.player) {
            Some((_, rows)) => rows.push(row),
            None => players.push((record.player.as_str(), vec![row])),
        }
    }

    let per_player: Vec<Vec<Option<f64>>> = players
        .iter()
        .map(|(_, rows)| global_pct.mean_of_rows(rows))
        .collect();
    (0..global_pct.metrics().len())
        .map(|m| mean_present(per_player.iter().map(|means| means[m])).unwrap_or(0.0))
        .collect()
}

fn comparison_table(
    group: &PlayerTable,
    selection: &MetricSelection,
    compared: &[(&str, Vec<usize>)],
    reference: &str,
    group_pct: &PercentileFrame,
) -> EngineResult<Vec<ComparisonRow>> {
    let mut table = Vec::with_capacity(selection.len());
    for (m, metric) in selection.iter().enumerate() {
        let column = group.column(metric)?;
        let pct = group_pct.column_at(m);

        let raw: Vec<Option<f64>> = compared
            .iter()
            .map(|(_, rows)| mean_present(rows.iter().map(|&r| column[r])))
            .collect();
        let reference_raw = compared
            .iter()
            .position(|(name, _)| *name == reference)
            .and_then(|i| raw[i]);
        let deltas = compared
            .iter()
            .zip(&raw)
            .filter(|((name, _), _)| *name != reference)
            .map(|(_, value)| match (value, reference_raw) {
                (Some(v), Some(r)) => Some(v - r),
                _ => None,
            })
            .collect();
        let group_percentiles = compared
            .iter()
            .map(|(_, rows)| mean_present(rows.iter().map(|&r| pct[r])))
            .collect();

        table.push(ComparisonRow {
            metric: metric.to_string(),
            raw,
            deltas,
            group_percentiles,
        });
    }

    // Largest gap against the reference first; rows without a gap go last.
    table.sort_by(|a, b| {
        let gap = |row: &ComparisonRow| row.deltas.first().copied().flatten().map(f64::abs);
        match (gap(a), gap(b)) {
            (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
    Ok(table)
}
