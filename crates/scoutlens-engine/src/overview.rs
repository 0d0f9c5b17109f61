// Pool-level aggregations behind the overview charts: the maturity curve,
// role mix per league, and squad evolution across seasons.

use crate::error::{EngineError, EngineResult};
use crate::normalize::mean_present;
use crate::selection::{MetricSelection, SelectionBounds};
use scoutlens_core::table::PlayerTable;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Squad evolution charts take one to four metrics.
pub const EVOLUTION_METRIC_BOUNDS: SelectionBounds = 1..=4;

/// Squads shown in the evolution chart unless the caller asks otherwise.
pub const DEFAULT_EVOLUTION_TOP_N: usize = 3;

// ---------------------------------------------------------------------------
// Maturity curve
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaturityPoint {
    pub role: String,
    pub age: f64,
    /// Rows with a minutes value at this role and age.
    pub rows: usize,
    pub mean_minutes: f64,
}

/// Mean minutes per (role, age), ordered by role then age. Rows without a
/// role, an age or minutes do not contribute.
pub fn maturity_curve(pool: &PlayerTable) -> EngineResult<Vec<MaturityPoint>> {
    if pool.is_empty() {
        return Err(EngineError::NoRows { what: "pool" });
    }

    let mut groups: Vec<(&str, f64, Vec<f64>)> = Vec::new();
    for record in pool.records() {
        let (Some(age), Some(minutes)) = (record.age, record.minutes) else {
            continue;
        };
        if record.role.is_empty() {
            continue;
        }
        match groups
            .iter_mut()
            .find(|(role, a, _)| *role == record.role && *a == age)
        {
            Some((_, _, values)) => values.push(minutes),
            None => groups.push((record.role.as_str(), age, vec![minutes])),
        }
    }

    let mut points: Vec<MaturityPoint> = groups
        .into_iter()
        .map(|(role, age, values)| MaturityPoint {
            role: role.to_string(),
            age,
            rows: values.len(),
            mean_minutes: values.iter().sum::<f64>() / values.len() as f64,
        })
        .collect();
    points.sort_by(|a, b| a.role.cmp(&b.role).then(a.age.total_cmp(&b.age)));
    Ok(points)
}

// ---------------------------------------------------------------------------
// Role distribution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleShare {
    pub league: String,
    pub role: String,
    pub rows: usize,
    /// Rows with a role in this league.
    pub league_rows: usize,
    /// `rows / league_rows`, 0-1.
    pub share: f64,
}

/// Row counts per (league, role) with each role's share of its league.
/// Ordered by league then role; rows without a role are left out of both
/// the counts and the league totals.
pub fn role_distribution(pool: &PlayerTable) -> EngineResult<Vec<RoleShare>> {
    if pool.is_empty() {
        return Err(EngineError::NoRows { what: "pool" });
    }

    let mut counts: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    let mut totals: BTreeMap<&str, usize> = BTreeMap::new();
    for record in pool.records().iter().filter(|r| !r.role.is_empty()) {
        *counts
            .entry((record.league.as_str(), record.role.as_str()))
            .or_default() += 1;
        *totals.entry(record.league.as_str()).or_default() += 1;
    }

    Ok(counts
        .into_iter()
        .map(|((league, role), rows)| {
            let league_rows = totals.get(league).copied().unwrap_or(rows);
            RoleShare {
                league: league.to_string(),
                role: role.to_string(),
                rows,
                league_rows,
                share: rows as f64 / league_rows as f64,
            }
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Squad evolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonMeans {
    pub season: String,
    pub squad: String,
    /// Mean of each selected metric for the squad that season, in selection
    /// order; `None` when no row had a value.
    pub means: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SquadEvolution {
    pub metrics: Vec<String>,
    /// The top squads by whole-period score, best first.
    pub squads: Vec<String>,
    /// Season ascending, then squads in `squads` order.
    pub seasons: Vec<SeasonMeans>,
}

/// Pick the `top_n` squads by the mean of their per-metric means over the
/// whole pool, then average each metric per (season, squad) for those
/// squads. Squads with no value for any selected metric are not ranked;
/// ties keep first appearance.
pub fn squad_evolution(
    pool: &PlayerTable,
    selection: &MetricSelection,
    top_n: usize,
) -> EngineResult<SquadEvolution> {
    selection.require_len(&EVOLUTION_METRIC_BOUNDS)?;
    if pool.is_empty() {
        return Err(EngineError::NoRows { what: "pool" });
    }
    let columns = selection
        .iter()
        .map(|m| pool.column(m))
        .collect::<Result<Vec<_>, _>>()?;
    let squad_means = |rows: &[usize]| -> Vec<Option<f64>> {
        columns
            .iter()
            .map(|col| mean_present(rows.iter().map(|&r| col[r])))
            .collect()
    };

    let mut squads: Vec<(&str, Vec<usize>)> = Vec::new();
    for (row, record) in pool.records().iter().enumerate() {
        match squads.iter_mut().find(|(s, _)| *s == record.squad) {
            Some((_, rows)) => rows.push(row),
            None => squads.push((record.squad.as_str(), vec![row])),
        }
    }

    let mut scored: Vec<(&str, f64)> = squads
        .iter()
        .filter_map(|(squad, rows)| {
            let score = mean_present(squad_means(rows.as_slice()).into_iter())?;
            Some((*squad, score))
        })
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(top_n);
    let top: Vec<&str> = scored.into_iter().map(|(squad, _)| squad).collect();

    let mut by_season: BTreeMap<&str, Vec<(&str, Vec<usize>)>> = BTreeMap::new();
    for (row, record) in pool.records().iter().enumerate() {
        if !top.contains(&record.squad.as_str()) {
            continue;
        }
        let entries = by_season.entry(record.season.as_str()).or_default();
        match entries.iter_mut().find(|(s, _)| *s == record.squad) {
            Some((_, rows)) => rows.push(row),
            None => entries.push((record.squad.as_str(), vec![row])),
        }
    }

    let mut seasons = Vec::new();
    for (season, mut entries) in by_season {
        entries.sort_by_key(|(squad, _)| top.iter().position(|t| t == squad));
        for (squad, rows) in entries {
            seasons.push(SeasonMeans {
                season: season.to_string(),
                squad: squad.to_string(),
                means: squad_means(rows.as_slice()),
            });
        }
    }

    Ok(SquadEvolution {
        metrics: selection.keys().to_vec(),
        squads: top.into_iter().map(String::from).collect(),
        seasons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use scoutlens_core::table::PlayerRecord;

    fn row(player: &str, squad: &str, season: &str, role: &str, age: f64, minutes: f64) -> PlayerRecord {
        PlayerRecord::new(player, squad, season)
            .with_role(role)
            .with_age(age)
            .with_minutes(minutes)
            .with_league("La Liga")
    }

    fn pool() -> PlayerTable {
        PlayerTable::builder(&["xg_per90", "kp_per90"])
            .row(row("A", "Alpha", "2023", "Forward", 24.0, 2000.0), &[Some(0.5), Some(1.0)])
            .row(row("A", "Alpha", "2024", "Forward", 25.0, 1800.0), &[Some(0.7), None])
            .row(row("B", "Beta", "2024", "Forward", 24.0, 1000.0), &[Some(0.2), Some(2.0)])
            .row(row("C", "Beta", "2023", "Defender", 30.0, 2500.0), &[Some(0.1), Some(0.4)])
            .row(
                row("D", "Gamma", "2024", "Midfielder", 21.0, 900.0).with_league("Serie A"),
                &[None, None],
            )
            .row(
                PlayerRecord::new("E", "Gamma", "2024").with_league("Serie A").with_age(22.0),
                &[Some(0.3), Some(1.5)],
            )
            .build()
            .unwrap()
    }

    #[test]
    fn maturity_curve_groups_by_role_and_age() {
        let curve = maturity_curve(&pool()).unwrap();
        let keys: Vec<(&str, f64)> = curve.iter().map(|p| (p.role.as_str(), p.age)).collect();
        assert_eq!(
            keys,
            vec![("Defender", 30.0), ("Forward", 24.0), ("Forward", 25.0), ("Midfielder", 21.0)]
        );
        let forward_24 = &curve[1];
        assert_eq!(forward_24.rows, 2);
        assert!((forward_24.mean_minutes - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn role_distribution_shares_sum_to_one_per_league() {
        let dist = role_distribution(&pool()).unwrap();
        let keys: Vec<(&str, &str, usize)> = dist
            .iter()
            .map(|s| (s.league.as_str(), s.role.as_str(), s.rows))
            .collect();
        // E has no role and is not counted.
        assert_eq!(
            keys,
            vec![
                ("La Liga", "Defender", 1),
                ("La Liga", "Forward", 3),
                ("Serie A", "Midfielder", 1),
            ]
        );
        assert_eq!(dist[1].league_rows, 4);
        assert!((dist[1].share - 0.75).abs() < 1e-9);
        assert!((dist[2].share - 1.0).abs() < 1e-9);
    }

    #[test]
    fn evolution_keeps_top_squads_per_season() {
        let sel = MetricSelection::new(&["xg_per90", "kp_per90"]).unwrap();
        // Alpha: xg 0.6, kp 1.0 -> 0.8; Beta: xg 0.15, kp 1.2 -> 0.675;
        // Gamma: xg 0.3, kp 1.5 -> 0.9.
        let evo = squad_evolution(&pool(), &sel, 2).unwrap();
        assert_eq!(evo.squads, vec!["Gamma", "Alpha"]);

        let keys: Vec<(&str, &str)> = evo
            .seasons
            .iter()
            .map(|s| (s.season.as_str(), s.squad.as_str()))
            .collect();
        assert_eq!(keys, vec![("2023", "Alpha"), ("2024", "Gamma"), ("2024", "Alpha")]);
        assert_eq!(evo.seasons[2].means, vec![Some(0.7), None]);
        assert_eq!(evo.seasons[1].means, vec![Some(0.3), Some(1.5)]);
    }

    #[test]
    fn evolution_metric_count_and_empty_pool() {
        let five = MetricSelection::new(&["a", "b", "c", "d", "e"]).unwrap();
        let err = squad_evolution(&pool(), &five, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputShape);

        let empty = pool().filter_records(|_| false);
        assert_eq!(
            maturity_curve(&empty).unwrap_err(),
            EngineError::NoRows { what: "pool" }
        );
        assert!(role_distribution(&empty).is_err());
    }
}
