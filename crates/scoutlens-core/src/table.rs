// Columnar player-season table: identity records plus optional numeric
// metric columns.

use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error("column `{column}` has {actual} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("duplicate metric column `{0}`")]
    DuplicateColumn(String),

    #[error("unknown metric column `{0}`")]
    UnknownMetric(String),
}

// ---------------------------------------------------------------------------
// Identity record
// ---------------------------------------------------------------------------

/// Identity and exposure columns for one player, one squad, one season.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerRecord {
    /// Synthetic unique key: `{player}_{season}_{squad}`.
    pub row_key: String,
    pub player: String,
    pub squad: String,
    pub season: String,
    pub league: String,
    pub role: String,
    pub minutes: Option<f64>,
    pub age: Option<f64>,
}

/// League value used when the dataset carries neither `league` nor `comp`.
pub const UNKNOWN_LEAGUE: &str = "Unknown";

/// Build the synthetic row key from the identity triple.
pub fn build_row_key(player: &str, season: &str, squad: &str) -> String {
    format!("{player}_{season}_{squad}")
}

impl PlayerRecord {
    pub fn new(player: &str, squad: &str, season: &str) -> Self {
        Self {
            row_key: build_row_key(player, season, squad),
            player: player.to_string(),
            squad: squad.to_string(),
            season: season.to_string(),
            league: UNKNOWN_LEAGUE.to_string(),
            role: String::new(),
            minutes: None,
            age: None,
        }
    }

    pub fn with_league(mut self, league: &str) -> Self {
        self.league = league.to_string();
        self
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.role = role.to_string();
        self
    }

    pub fn with_minutes(mut self, minutes: f64) -> Self {
        self.minutes = Some(minutes);
        self
    }

    pub fn with_age(mut self, age: f64) -> Self {
        self.age = Some(age);
        self
    }

    /// The `(player, squad, season)` triple that identifies a row.
    pub fn identity(&self) -> (&str, &str, &str) {
        (&self.player, &self.squad, &self.season)
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Read-only player table. Metric columns are stored column-major; every
/// column has exactly one (possibly missing) value per record.
#[derive(Debug, Clone, Default)]
pub struct PlayerTable {
    records: Vec<PlayerRecord>,
    metric_keys: Vec<String>,
    columns: Vec<Vec<Option<f64>>>,
    index: HashMap<String, usize>,
}

impl PlayerTable {
    /// Assemble a table from records and named columns, rejecting ragged
    /// columns and duplicate keys.
    pub fn from_parts(
        records: Vec<PlayerRecord>,
        columns: Vec<(String, Vec<Option<f64>>)>,
    ) -> Result<Self, TableError> {
        let mut metric_keys = Vec::with_capacity(columns.len());
        let mut values = Vec::with_capacity(columns.len());
        let mut index = HashMap::with_capacity(columns.len());

        for (key, column) in columns {
            if column.len() != records.len() {
                return Err(TableError::LengthMismatch {
                    column: key,
                    expected: records.len(),
                    actual: column.len(),
                });
            }
            if index.contains_key(&key) {
                return Err(TableError::DuplicateColumn(key));
            }
            // Non-finite cells are treated as missing.
            let column = column
                .into_iter()
                .map(|v| v.filter(|x| x.is_finite()))
                .collect();
            index.insert(key.clone(), metric_keys.len());
            metric_keys.push(key);
            values.push(column);
        }

        Ok(Self {
            records,
            metric_keys,
            columns: values,
            index,
        })
    }

    pub fn builder(metric_keys: &[&str]) -> TableBuilder {
        TableBuilder {
            metric_keys: metric_keys.iter().map(|k| k.to_string()).collect(),
            records: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[PlayerRecord] {
        &self.records
    }

    pub fn record(&self, row: usize) -> Option<&PlayerRecord> {
        self.records.get(row)
    }

    /// Metric keys in schema order.
    pub fn metric_keys(&self) -> &[String] {
        &self.metric_keys
    }

    pub fn has_metric(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// All values of one metric column.
    pub fn column(&self, key: &str) -> Result<&[Option<f64>], TableError> {
        self.index
            .get(key)
            .map(|&i| self.columns[i].as_slice())
            .ok_or_else(|| TableError::UnknownMetric(key.to_string()))
    }

    pub fn value(&self, row: usize, key: &str) -> Result<Option<f64>, TableError> {
        Ok(self.column(key)?.get(row).copied().flatten())
    }

    /// Fail with `UnknownMetric` for the first key the table does not carry.
    pub fn require_metrics<S: AsRef<str>>(&self, keys: &[S]) -> Result<(), TableError> {
        match keys.iter().find(|k| !self.has_metric(k.as_ref())) {
            Some(missing) => Err(TableError::UnknownMetric(missing.as_ref().to_string())),
            None => Ok(()),
        }
    }

    /// Row indices belonging to the named player, in table order.
    pub fn rows_for_player(&self, player: &str) -> Vec<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.player == player)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn contains_player(&self, player: &str) -> bool {
        self.records.iter().any(|r| r.player == player)
    }

    /// Distinct player names in first-seen order.
    pub fn player_names(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.records
            .iter()
            .filter(|r| seen.insert(r.player.as_str()))
            .map(|r| r.player.as_str())
            .collect()
    }

    /// A new table holding the given rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> PlayerTable {
        let records = rows
            .iter()
            .filter_map(|&i| self.records.get(i).cloned())
            .collect();
        let columns = self
            .columns
            .iter()
            .map(|col| rows.iter().filter_map(|&i| col.get(i).copied()).collect())
            .collect();
        PlayerTable {
            records,
            metric_keys: self.metric_keys.clone(),
            columns,
            index: self.index.clone(),
        }
    }

    /// A new table holding the rows whose record satisfies `keep`.
    pub fn filter_records<F>(&self, keep: F) -> PlayerTable
    where
        F: Fn(&PlayerRecord) -> bool,
    {
        let rows: Vec<usize> = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| keep(r))
            .map(|(i, _)| i)
            .collect();
        self.select_rows(&rows)
    }

    /// Headline figures for a pool of rows.
    pub fn summary(&self) -> PoolSummary {
        let squads: std::collections::HashSet<&str> =
            self.records.iter().map(|r| r.squad.as_str()).collect();
        let ages: Vec<f64> = self.records.iter().filter_map(|r| r.age).collect();
        let mut minutes: Vec<f64> = self.records.iter().filter_map(|r| r.minutes).collect();

        PoolSummary {
            players: self.records.len(),
            squads: squads.len(),
            mean_age: mean(&ages),
            mean_minutes: mean(&minutes),
            median_minutes: median(&mut minutes),
        }
    }
}

/// Row-by-row construction, mostly for fixtures and tests.
#[derive(Debug, Clone)]
pub struct TableBuilder {
    metric_keys: Vec<String>,
    records: Vec<PlayerRecord>,
    rows: Vec<Vec<Option<f64>>>,
}

impl TableBuilder {
    /// Append a row; `values` follow the builder's metric order.
    pub fn row(mut self, record: PlayerRecord, values: &[Option<f64>]) -> Self {
        self.records.push(record);
        self.rows.push(values.to_vec());
        self
    }

    pub fn build(self) -> Result<PlayerTable, TableError> {
        let mut columns: Vec<(String, Vec<Option<f64>>)> = self
            .metric_keys
            .iter()
            .map(|k| (k.clone(), Vec::with_capacity(self.rows.len())))
            .collect();
        for (row_idx, row) in self.rows.iter().enumerate() {
            if row.len() != columns.len() {
                let record = &self.records[row_idx];
                return Err(TableError::LengthMismatch {
                    column: format!("row {}", record.row_key),
                    expected: columns.len(),
                    actual: row.len(),
                });
            }
            for (col, value) in columns.iter_mut().zip(row) {
                col.1.push(*value);
            }
        }
        PlayerTable::from_parts(self.records, columns)
    }
}

// ---------------------------------------------------------------------------
// Pool summary
// ---------------------------------------------------------------------------

/// KPI strip shown above every pool: size, squads, mean age, minutes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolSummary {
    pub players: usize,
    pub squads: usize,
    pub mean_age: Option<f64>,
    pub mean_minutes: Option<f64>,
    pub median_minutes: Option<f64>,
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
