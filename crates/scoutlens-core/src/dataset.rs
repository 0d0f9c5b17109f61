// Dataset provider: locate the most recent processed dataset, load it once,
// normalize its schema and report data-quality problems.
//
// The processed file is a CSV with a header row. Headers are trimmed,
// lower-cased and have inner whitespace collapsed to `_`; `comp` is aliased
// to `league`; `player`, `squad` and `season` are required.

use crate::catalog::{is_scaled_metric, MetricCatalog};
use crate::config::DatasetConfig;
use crate::table::{build_row_key, PlayerRecord, PlayerTable, TableError, UNKNOWN_LEAGUE};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("no dataset matching `{pattern}` found in {dir}")]
    NotFound { dir: PathBuf, pattern: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("dataset is missing required column `{0}`")]
    MissingColumn(String),

    #[error("dataset produced zero valid rows")]
    Empty,

    #[error(transparent)]
    Table(#[from] TableError),
}

// ---------------------------------------------------------------------------
// Data quality
// ---------------------------------------------------------------------------

/// Non-fatal findings from the load. Scaled metrics (`_per90`, `%`) are
/// expected within 0–100; rows outside that range are counted, not removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataQualityReport {
    pub out_of_range_rows: usize,
    pub out_of_range_columns: Vec<String>,
    pub coerced_cells: usize,
    pub dropped_text_columns: Vec<String>,
    pub skipped_rows: usize,
}

impl DataQualityReport {
    pub fn is_clean(&self) -> bool {
        self.out_of_range_rows == 0 && self.coerced_cells == 0 && self.skipped_rows == 0
    }
}

// ---------------------------------------------------------------------------
// Loaded dataset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
    pub table: PlayerTable,
    pub catalog: MetricCatalog,
    pub quality: DataQualityReport,
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Normalize a header: trim, lower-case, whitespace runs become `_`.
pub fn normalize_header(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// The most recently modified file in `dir` named `{prefix}*.{extension}`.
pub fn find_latest_dataset(dir: &Path, prefix: &str, extension: &str) -> Result<PathBuf, DatasetError> {
    let extension = extension.trim_start_matches('.');
    let pattern = format!("{prefix}*.{extension}");
    let entries = std::fs::read_dir(dir).map_err(|_| DatasetError::NotFound {
        dir: dir.to_path_buf(),
        pattern: pattern.clone(),
    })?;

    let mut latest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let matches = name.starts_with(prefix)
            && path.extension().and_then(|e| e.to_str()) == Some(extension);
        if !matches {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let newer = match &latest {
            Some((best, best_path)) => modified > *best || (modified == *best && path > *best_path),
            None => true,
        };
        if newer {
            latest = Some((modified, path));
        }
    }

    latest.map(|(_, p)| p).ok_or(DatasetError::NotFound {
        dir: dir.to_path_buf(),
        pattern,
    })
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

enum Cell {
    Missing,
    Number(f64),
    Text,
}

fn parse_cell(raw: &str) -> Cell {
    let s = raw.trim();
    if s.is_empty() || matches!(s.to_lowercase().as_str(), "na" | "nan" | "null" | "none" | "-") {
        return Cell::Missing;
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Cell::Number(v),
        Ok(_) => Cell::Missing,
        Err(_) => Cell::Text,
    }
}

/// Ages sometimes arrive as `years-days` (e.g. `24-123`); keep the years.
fn parse_age(raw: &str) -> Option<f64> {
    match parse_cell(raw) {
        Cell::Number(v) => Some(v),
        Cell::Text => raw.trim().split('-').next().and_then(|y| y.trim().parse().ok()),
        Cell::Missing => None,
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    match parse_cell(raw) {
        Cell::Number(v) => Some(v),
        _ => None,
    }
}

/// Columns carried on the record rather than as metrics.
const RECORD_COLUMNS: &[&str] = &[
    "player", "squad", "season", "league", "comp", "role", "rol_tactico", "min", "minutes", "age",
    "row_key",
];

/// Parse a whole CSV stream. `source` names it in errors.
fn load_from_reader<R: Read>(
    rdr: R,
    source: &str,
) -> Result<(PlayerTable, DataQualityReport), DatasetError> {
    let csv_error = |e: csv::Error| DatasetError::Csv {
        path: source.to_string(),
        source: e,
    };
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(rdr);
    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(normalize_header)
        .collect();
    let rows: Vec<csv::StringRecord> = reader
        .records()
        .collect::<Result<_, _>>()
        .map_err(csv_error)?;
    build_table(&headers, &rows)
}

/// Index of the first header equal to any of the candidates, in candidate order.
fn find_column(headers: &[String], candidates: &[&str]) -> Option<usize> {
    candidates
        .iter()
        .find_map(|c| headers.iter().position(|h| h == c))
}

fn build_table(
    headers: &[String],
    rows: &[csv::StringRecord],
) -> Result<(PlayerTable, DataQualityReport), DatasetError> {
    let mut quality = DataQualityReport::default();

    let required = |name: &str| {
        find_column(headers, &[name]).ok_or_else(|| DatasetError::MissingColumn(name.to_string()))
    };
    let player_idx = Some(required("player")?);
    let squad_idx = Some(required("squad")?);
    let season_idx = Some(required("season")?);
    let league_idx = find_column(headers, &["league", "comp"]);
    let role_idx = find_column(headers, &["rol_tactico", "role"]);
    let minutes_idx = find_column(headers, &["min", "minutes"]);
    let age_idx = find_column(headers, &["age"]);

    if league_idx.is_none() {
        debug!("dataset has no league/comp column, defaulting to '{}'", UNKNOWN_LEAGUE);
    }

    let field = |row: &csv::StringRecord, idx: Option<usize>| -> String {
        idx.and_then(|i| row.get(i)).unwrap_or("").trim().to_string()
    };

    // Identity records; rows without a player name are skipped.
    let mut kept_rows = Vec::with_capacity(rows.len());
    let mut records = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let player = field(row, player_idx);
        if player.is_empty() {
            warn!("skipping dataset row {}: empty player name", i + 2);
            quality.skipped_rows += 1;
            continue;
        }
        let squad = field(row, squad_idx);
        let season = field(row, season_idx);
        let league = match field(row, league_idx) {
            l if l.is_empty() => UNKNOWN_LEAGUE.to_string(),
            l => l,
        };
        records.push(PlayerRecord {
            row_key: build_row_key(&player, &season, &squad),
            player,
            squad,
            season,
            league,
            role: field(row, role_idx),
            minutes: minutes_idx.and_then(|j| row.get(j)).and_then(parse_number),
            age: age_idx.and_then(|j| row.get(j)).and_then(parse_age),
        });
        kept_rows.push(row);
    }

    // Metric candidates: every other column, numeric-coerced.
    let mut columns: Vec<(String, Vec<Option<f64>>)> = Vec::new();
    for (col_idx, header) in headers.iter().enumerate() {
        if RECORD_COLUMNS.contains(&header.as_str()) {
            continue;
        }
        let mut values = Vec::with_capacity(kept_rows.len());
        let mut numbers = 0usize;
        let mut texts = 0usize;
        for row in &kept_rows {
            match parse_cell(row.get(col_idx).unwrap_or("")) {
                Cell::Number(v) => {
                    numbers += 1;
                    values.push(Some(v));
                }
                Cell::Missing => values.push(None),
                Cell::Text => {
                    texts += 1;
                    values.push(None);
                }
            }
        }

        if numbers == 0 && texts > 0 {
            debug!("dropping text column '{}'", header);
            quality.dropped_text_columns.push(header.clone());
            continue;
        }
        if texts > 0 {
            warn!(
                "column '{}': {} non-numeric cells coerced to missing",
                header, texts
            );
            quality.coerced_cells += texts;
        }
        columns.push((header.clone(), values));
    }

    // Out-of-range check on scaled metrics.
    let scaled: Vec<&(String, Vec<Option<f64>>)> =
        columns.iter().filter(|(k, _)| is_scaled_metric(k)).collect();
    let out_of_range = |v: &Option<f64>| v.is_some_and(|x| !(0.0..=100.0).contains(&x));
    for row in 0..records.len() {
        if scaled.iter().any(|(_, col)| out_of_range(&col[row])) {
            quality.out_of_range_rows += 1;
        }
    }
    quality.out_of_range_columns = scaled
        .iter()
        .filter(|(_, col)| col.iter().any(out_of_range))
        .map(|(k, _)| k.clone())
        .collect();
    if quality.out_of_range_rows > 0 {
        warn!(
            "{} rows have values outside the expected 0-100 range in scaled metrics ({})",
            quality.out_of_range_rows,
            quality.out_of_range_columns.join(", ")
        );
    }

    // Headers that collide after normalization are rejected here.
    let table = PlayerTable::from_parts(records, columns)?;
    Ok((table, quality))
}

// ---------------------------------------------------------------------------
// Public loaders
// ---------------------------------------------------------------------------

/// Load one dataset file and build its metric catalog.
pub fn load_dataset(path: &Path) -> Result<LoadedDataset, DatasetError> {
    let file = std::fs::File::open(path).map_err(|e| DatasetError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let modified = file.metadata().and_then(|m| m.modified()).ok();
    let (table, quality) = load_from_reader(file, &path.display().to_string())?;
    finish_load(path.to_path_buf(), modified, table, quality)
}

fn finish_load(
    path: PathBuf,
    modified: Option<SystemTime>,
    table: PlayerTable,
    quality: DataQualityReport,
) -> Result<LoadedDataset, DatasetError> {
    if table.is_empty() {
        return Err(DatasetError::Empty);
    }
    let catalog = MetricCatalog::from_columns(table.metric_keys());
    info!(
        "Loaded {} rows with {} metric columns ({} catalogued) from {}",
        table.len(),
        table.metric_keys().len(),
        catalog.len(),
        path.display()
    );
    Ok(LoadedDataset {
        path,
        modified,
        table,
        catalog,
        quality,
    })
}

// ---------------------------------------------------------------------------
// Provider (load once, refresh on demand)
// ---------------------------------------------------------------------------

/// Holds the loaded dataset for the process lifetime.
#[derive(Debug, Clone)]
pub struct DatasetProvider {
    config: DatasetConfig,
    loaded: LoadedDataset,
}

impl DatasetProvider {
    /// Scan the configured directory and load the newest matching file.
    pub fn open(config: &DatasetConfig) -> Result<Self, DatasetError> {
        let loaded = Self::scan_and_load(config)?;
        Ok(Self {
            config: config.clone(),
            loaded,
        })
    }

    fn scan_and_load(config: &DatasetConfig) -> Result<LoadedDataset, DatasetError> {
        let path = find_latest_dataset(Path::new(&config.dir), &config.prefix, &config.extension)?;
        load_dataset(&path)
    }

    pub fn dataset(&self) -> &LoadedDataset {
        &self.loaded
    }

    pub fn table(&self) -> &PlayerTable {
        &self.loaded.table
    }

    pub fn catalog(&self) -> &MetricCatalog {
        &self.loaded.catalog
    }

    /// Re-scan the directory; reload only when a different or newer file is
    /// found. Returns whether a reload happened.
    pub fn refresh(&mut self) -> Result<bool, DatasetError> {
        let path = find_latest_dataset(
            Path::new(&self.config.dir),
            &self.config.prefix,
            &self.config.extension,
        )?;
        let modified = std::fs::metadata(&path).and_then(|m| m.modified()).ok();
        if path == self.loaded.path && modified == self.loaded.modified {
            debug!("dataset unchanged: {}", path.display());
            return Ok(false);
        }
        self.loaded = load_dataset(&path)?;
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
