// Reference populations: which rows supply min/max and percentile bases.

use crate::error::{EngineError, EngineResult};
use scoutlens_core::table::{PlayerRecord, PlayerTable};
use std::borrow::Cow;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopulationScope {
    /// The full dataset.
    Global,
    /// The analyst's filtered pool.
    Filtered,
    /// Filtered rows sharing the reference player's role.
    SameRole,
    /// Filtered rows sharing the reference player's league.
    SameLeague,
}

impl PopulationScope {
    pub fn from_str_scope(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "global" => Some(PopulationScope::Global),
            "filtered" | "selected" => Some(PopulationScope::Filtered),
            "same_role" | "role" => Some(PopulationScope::SameRole),
            "same_league" | "league" => Some(PopulationScope::SameLeague),
            _ => None,
        }
    }
}

/// Resolve a scope to a concrete table.
///
/// Subgroup scopes need the reference player in the filtered pool and fall
/// back to the whole pool when the reference has no role or league value.
pub fn resolve_population<'a>(
    scope: PopulationScope,
    global: &'a PlayerTable,
    filtered: &'a PlayerTable,
    reference: &str,
) -> EngineResult<Cow<'a, PlayerTable>> {
    let field: fn(&PlayerRecord) -> &str = match scope {
        PopulationScope::Global => return Ok(Cow::Borrowed(global)),
        PopulationScope::Filtered => return Ok(Cow::Borrowed(filtered)),
        PopulationScope::SameRole => |r| r.role.as_str(),
        PopulationScope::SameLeague => |r| r.league.as_str(),
    };

    let reference_record = filtered
        .records()
        .iter()
        .find(|r| r.player == reference)
        .ok_or_else(|| EngineError::ReferenceNotFound {
            player: reference.to_string(),
            scope: "pool",
        })?;
    let key = field(reference_record);
    if key.is_empty() {
        warn!(
            "{} has no value for {:?}; using the filtered pool",
            reference, scope
        );
        return Ok(Cow::Borrowed(filtered));
    }

    let subgroup = filtered.filter_records(|r| field(r) == key);
    if subgroup.is_empty() {
        warn!("{:?} group for {} is empty; using the filtered pool", scope, reference);
        return Ok(Cow::Borrowed(filtered));
    }
    Ok(Cow::Owned(subgroup))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global() -> PlayerTable {
        PlayerTable::builder(&["x"])
            .row(
                PlayerRecord::new("A", "S1", "2024").with_role("Forward").with_league("L1"),
                &[Some(1.0)],
            )
            .row(
                PlayerRecord::new("B", "S2", "2024").with_role("Forward").with_league("L2"),
                &[Some(2.0)],
            )
            .row(
                PlayerRecord::new("C", "S3", "2024").with_role("Midfielder").with_league("L1"),
                &[Some(3.0)],
            )
            .row(PlayerRecord::new("D", "S4", "2024"), &[Some(4.0)])
            .build()
            .unwrap()
    }

    fn players(t: &PlayerTable) -> Vec<&str> {
        t.records().iter().map(|r| r.player.as_str()).collect()
    }

    #[test]
    fn global_and_filtered_borrow() {
        let g = global();
        let f = g.filter_records(|r| r.player != "D");
        let pop = resolve_population(PopulationScope::Global, &g, &f, "A").unwrap();
        assert_eq!(pop.len(), 4);
        assert!(matches!(pop, Cow::Borrowed(_)));
        let pop = resolve_population(PopulationScope::Filtered, &g, &f, "anyone").unwrap();
        assert_eq!(pop.len(), 3);
    }

    #[test]
    fn subgroups_follow_reference() {
        let g = global();
        let role = resolve_population(PopulationScope::SameRole, &g, &g, "A").unwrap();
        assert_eq!(players(&role), vec!["A", "B"]);
        let league = resolve_population(PopulationScope::SameLeague, &g, &g, "A").unwrap();
        assert_eq!(players(&league), vec!["A", "C"]);
    }

    #[test]
    fn missing_role_falls_back_and_missing_reference_fails() {
        let g = global();
        let pop = resolve_population(PopulationScope::SameRole, &g, &g, "D").unwrap();
        assert_eq!(pop.len(), 4);
        assert!(resolve_population(PopulationScope::SameRole, &g, &g, "Z").is_err());
    }

    #[test]
    fn parses_scope_names() {
        assert_eq!(PopulationScope::from_str_scope("same-role"), Some(PopulationScope::SameRole));
        assert_eq!(PopulationScope::from_str_scope("League"), Some(PopulationScope::SameLeague));
        assert_eq!(PopulationScope::from_str_scope("nope"), None);
    }
}
