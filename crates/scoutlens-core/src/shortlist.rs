// In-memory shortlist: the players an analyst is tracking during a session.
// Entries are keyed by (player, squad, season); nothing is persisted.

use crate::table::{PlayerRecord, PlayerTable};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, PartialEq)]
pub enum ShortlistError {
    #[error("no players selected")]
    NothingSelected,

    #[error("no dataset rows found for: {0}")]
    NoRows(String),

    #[error("no shortlist entry with key `{0}`")]
    UnknownEntry(String),

    #[error("unknown {kind} `{value}`")]
    InvalidValue { kind: &'static str, value: String },
}

/// Scouting workflow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Status {
    Observed,
    Tracking,
    Candidate,
    Rejected,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Observed,
        Status::Tracking,
        Status::Candidate,
        Status::Rejected,
    ];

    pub fn from_str_status(s: &str) -> Result<Self, ShortlistError> {
        match s.trim().to_lowercase().as_str() {
            "observed" => Ok(Status::Observed),
            "tracking" => Ok(Status::Tracking),
            "candidate" => Ok(Status::Candidate),
            "rejected" => Ok(Status::Rejected),
            _ => Err(ShortlistError::InvalidValue {
                kind: "status",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Priority {
    A,
    B,
    C,
}

impl Priority {
    pub fn from_str_priority(s: &str) -> Result<Self, ShortlistError> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(Priority::A),
            "B" => Ok(Priority::B),
            "C" => Ok(Priority::C),
            _ => Err(ShortlistError::InvalidValue {
                kind: "priority",
                value: s.to_string(),
            }),
        }
    }
}

/// Editable fields applied to every player added in one go.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryDetails {
    pub status: Status,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub notes: String,
    pub next_action: Option<NaiveDate>,
    pub estimated_fee: String,
}

impl Default for EntryDetails {
    fn default() -> Self {
        Self {
            status: Status::Observed,
            priority: Priority::B,
            tags: Vec::new(),
            notes: String::new(),
            next_action: None,
            estimated_fee: String::new(),
        }
    }
}

/// Split a comma-separated tag string, dropping blanks.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShortlistEntry {
    pub record: PlayerRecord,
    pub status: Status,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub notes: String,
    pub next_action: Option<NaiveDate>,
    pub estimated_fee: String,
    pub origin: String,
}

impl ShortlistEntry {
    fn key(&self) -> (&str, &str, &str) {
        self.record.identity()
    }
}

/// Result of an add: how many rows were new, how many already listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOutcome {
    pub added: usize,
    pub already_listed: usize,
}

/// Counts per status for the KPI strip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub observed: usize,
    pub tracking: usize,
    pub candidate: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Shortlist {
    entries: Vec<ShortlistEntry>,
}

impl Shortlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ShortlistEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn contains_identity(&self, record: &PlayerRecord) -> bool {
        self.entries.iter().any(|e| e.key() == record.identity())
    }

    /// Add every dataset row of the named players. Rows are deduplicated on
    /// (player, squad, season), both within the table and against the
    /// existing entries.
    pub fn add_players(
        &mut self,
        table: &PlayerTable,
        players: &[&str],
        details: &EntryDetails,
    ) -> Result<AddOutcome, ShortlistError> {
        if players.is_empty() {
            return Err(ShortlistError::NothingSelected);
        }

        let mut candidates: Vec<&PlayerRecord> = Vec::new();
        for record in table.records() {
            if !players.contains(&record.player.as_str()) {
                continue;
            }
            if candidates.iter().any(|c| c.identity() == record.identity()) {
                continue;
            }
            candidates.push(record);
        }
        if candidates.is_empty() {
            return Err(ShortlistError::NoRows(players.join(", ")));
        }

        let mut outcome = AddOutcome {
            added: 0,
            already_listed: 0,
        };
        for record in candidates {
            if self.contains_identity(record) {
                outcome.already_listed += 1;
                continue;
            }
            self.entries.push(ShortlistEntry {
                record: record.clone(),
                status: details.status,
                priority: details.priority,
                tags: details.tags.clone(),
                notes: details.notes.clone(),
                next_action: details.next_action,
                estimated_fee: details.estimated_fee.clone(),
                origin: "App".to_string(),
            });
            outcome.added += 1;
        }
        info!(
            "Shortlist: added {} row(s), {} already listed",
            outcome.added, outcome.already_listed
        );
        Ok(outcome)
    }

    fn entry_mut(&mut self, row_key: &str) -> Result<&mut ShortlistEntry, ShortlistError> {
        self.entries
            .iter_mut()
            .find(|e| e.record.row_key == row_key)
            .ok_or_else(|| ShortlistError::UnknownEntry(row_key.to_string()))
    }

    pub fn set_status(&mut self, row_key: &str, status: Status) -> Result<(), ShortlistError> {
        self.entry_mut(row_key)?.status = status;
        Ok(())
    }

    pub fn set_priority(&mut self, row_key: &str, priority: Priority) -> Result<(), ShortlistError> {
        self.entry_mut(row_key)?.priority = priority;
        Ok(())
    }

    /// Remove the given entries; returns how many were removed.
    pub fn remove(&mut self, row_keys: &[&str]) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|e| !row_keys.contains(&e.record.row_key.as_str()));
        before - self.entries.len()
    }

    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for entry in &self.entries {
            match entry.status {
                Status::Observed => counts.observed += 1,
                Status::Tracking => counts.tracking += 1,
                Status::Candidate => counts.candidate += 1,
                Status::Rejected => counts.rejected += 1,
            }
        }
        counts
    }

    pub fn mean_age(&self) -> Option<f64> {
        let ages: Vec<f64> = self.entries.iter().filter_map(|e| e.record.age).collect();
        if ages.is_empty() {
            return None;
        }
        Some(ages.iter().sum::<f64>() / ages.len() as f64)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PlayerTable {
        PlayerTable::builder(&["gls_per90"])
            .row(PlayerRecord::new("Ana", "Alpha", "2023").with_age(20.0), &[Some(0.5)])
            .row(PlayerRecord::new("Ana", "Alpha", "2024").with_age(21.0), &[Some(0.6)])
            .row(PlayerRecord::new("Ana", "Alpha", "2024").with_age(21.0), &[Some(0.6)])
            .row(PlayerRecord::new("Ben", "Beta", "2024").with_age(30.0), &[Some(0.1)])
            .build()
            .unwrap()
    }

    #[test]
    fn add_dedupes_rows_and_existing_entries() {
        let mut list = Shortlist::new();
        let details = EntryDetails {
            status: Status::Tracking,
            tags: parse_tags("U23, left-footed, "),
            ..Default::default()
        };

        let outcome = list.add_players(&table(), &["Ana"], &details).unwrap();
        assert_eq!(outcome, AddOutcome { added: 2, already_listed: 0 });
        assert_eq!(list.entries()[0].tags, vec!["U23", "left-footed"]);
        assert_eq!(list.entries()[0].origin, "App");

        let outcome = list
            .add_players(&table(), &["Ana", "Ben"], &EntryDetails::default())
            .unwrap();
        assert_eq!(outcome, AddOutcome { added: 1, already_listed: 2 });
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn add_requires_selection_and_rows() {
        let mut list = Shortlist::new();
        assert_eq!(
            list.add_players(&table(), &[], &EntryDetails::default()),
            Err(ShortlistError::NothingSelected)
        );
        assert_eq!(
            list.add_players(&table(), &["Zed"], &EntryDetails::default()),
            Err(ShortlistError::NoRows("Zed".into()))
        );
    }

    #[test]
    fn edits_and_counts() {
        let mut list = Shortlist::new();
        list.add_players(&table(), &["Ana", "Ben"], &EntryDetails::default())
            .unwrap();
        list.set_status("Ben_2024_Beta", Status::Candidate).unwrap();
        list.set_priority("Ben_2024_Beta", Priority::A).unwrap();
        assert!(list.set_status("Zed_2024_X", Status::Rejected).is_err());

        let counts = list.status_counts();
        assert_eq!(counts.observed, 2);
        assert_eq!(counts.candidate, 1);
        assert!((list.mean_age().unwrap() - 71.0 / 3.0).abs() < 1e-9);

        assert_eq!(list.remove(&["Ana_2023_Alpha", "missing"]), 1);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn entries_serialize_with_iso_dates() {
        let mut list = Shortlist::new();
        let details = EntryDetails {
            status: Status::Candidate,
            priority: Priority::A,
            next_action: NaiveDate::from_ymd_opt(2026, 11, 2),
            estimated_fee: "5-8M".into(),
            ..Default::default()
        };
        list.add_players(&table(), &["Ben"], &details).unwrap();

        let json = serde_json::to_value(&list.entries()[0]).unwrap();
        assert_eq!(json["status"], "Candidate");
        assert_eq!(json["priority"], "A");
        assert_eq!(json["next_action"], "2026-11-02");
        assert_eq!(json["record"]["row_key"], "Ben_2024_Beta");
        assert_eq!(json["origin"], "App");
    }

    #[test]
    fn parses_status_and_priority() {
        assert_eq!(Status::from_str_status("Candidate"), Ok(Status::Candidate));
        assert!(Status::from_str_status("hot").is_err());
        assert_eq!(Priority::from_str_priority("c"), Ok(Priority::C));
        assert!(Priority::from_str_priority("D").is_err());
    }
}
