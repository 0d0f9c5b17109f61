// Row filters: the boolean mask the analyst builds from league, season,
// team, age, minutes and role selections.

use crate::table::{PlayerRecord, PlayerTable};

/// Quick age caps offered next to the ranking table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeCap {
    Under22,
    Under28,
}

impl AgeCap {
    pub fn max_age(self) -> f64 {
        match self {
            AgeCap::Under22 => 22.0,
            AgeCap::Under28 => 28.0,
        }
    }

    pub fn from_str_cap(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "u22" => Some(AgeCap::Under22),
            "u28" => Some(AgeCap::Under28),
            _ => None,
        }
    }
}

/// Inclusive numeric range; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Range {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Range {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn is_open(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// A missing value only passes an unconstrained range.
    pub fn contains(&self, value: Option<f64>) -> bool {
        if self.is_open() {
            return true;
        }
        let Some(v) = value else {
            return false;
        };
        self.min.map_or(true, |lo| v >= lo) && self.max.map_or(true, |hi| v <= hi)
    }
}

/// Analyst filter selections. Empty lists mean "no constraint".
#[derive(Debug, Clone, Default)]
pub struct PlayerFilter {
    pub leagues: Vec<String>,
    pub seasons: Vec<String>,
    pub teams: Vec<String>,
    pub roles: Vec<String>,
    pub age: Range,
    pub minutes: Range,
    pub age_cap: Option<AgeCap>,
}

fn allowed(selection: &[String], value: &str) -> bool {
    selection.is_empty() || selection.iter().any(|s| s == value)
}

impl PlayerFilter {
    pub fn matches(&self, record: &PlayerRecord) -> bool {
        allowed(&self.leagues, &record.league)
            && allowed(&self.seasons, &record.season)
            && allowed(&self.teams, &record.squad)
            && allowed(&self.roles, &record.role)
            && self.age.contains(record.age)
            && self.minutes.contains(record.minutes)
            && self
                .age_cap
                .map_or(true, |cap| record.age.is_some_and(|a| a <= cap.max_age()))
    }

    /// The filtered pool as a new table.
    pub fn apply(&self, table: &PlayerTable) -> PlayerTable {
        table.filter_records(|r| self.matches(r))
    }

    pub fn is_empty(&self) -> bool {
        self.leagues.is_empty()
            && self.seasons.is_empty()
            && self.teams.is_empty()
            && self.roles.is_empty()
            && self.age.is_open()
            && self.minutes.is_open()
            && self.age_cap.is_none()
    }
}

/// Sorted distinct values of an identity column, for filter option lists.
pub fn distinct_values<F>(table: &PlayerTable, field: F) -> Vec<String>
where
    F: Fn(&PlayerRecord) -> &str,
{
    let mut values: Vec<String> = table
        .records()
        .iter()
        .map(|r| field(r))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    values.sort();
    values.dedup();
    values
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
