// Metric catalog: which columns are eligible metrics, which pool they belong
// to, how they are labelled, and the per-role metric presets.

use serde::Serialize;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Static label dictionary
// ---------------------------------------------------------------------------

/// Raw column key -> human label.
const METRIC_LABELS: &[(&str, &str)] = &[
    ("player", "Player"),
    ("squad", "Squad"),
    ("season", "Season"),
    ("role", "Tactical role"),
    ("rol_tactico", "Tactical role"),
    ("league", "Competition"),
    ("comp", "Competition"),
    ("min", "Minutes"),
    ("minutes", "Minutes"),
    ("age", "Age"),
    ("cmp%", "Pass completion %"),
    ("save%", "Save efficiency %"),
    ("gls_per90", "Goals /90"),
    ("xg_per90", "xG /90"),
    ("npxg_per90", "NPxG /90"),
    ("sh_per90", "Shots /90"),
    ("sot_per90", "Shots on target /90"),
    ("xa_per90", "xA /90"),
    ("xag_per90", "xAG /90"),
    ("kp_per90", "Key passes /90"),
    ("gca90_per90", "GCA /90"),
    ("sca_per90", "SCA /90"),
    ("prgp_per90", "Progressive passes /90"),
    ("prgc_per90", "Progressive carries /90"),
    ("carries_per90", "Carries /90"),
    ("tkl+int_per90", "Tackles + interceptions /90"),
    ("int_per90", "Interceptions /90"),
    ("recov_per90", "Recoveries /90"),
    ("blocks_per90", "Blocks /90"),
    ("clr_per90", "Clearances /90"),
    ("touches_per90", "Touches /90"),
    ("dis_per90", "Dispossessed /90"),
    ("pressures_per90", "Pressures /90"),
    ("err_per90", "Errors /90"),
    ("cmp_per90", "Completed passes /90"),
    ("ppa_per90", "Passes into box /90"),
    ("1/3_per90", "Passes into final third /90"),
    ("totdist_per90", "Total pass distance /90"),
    ("psxg+/-_per90", "PSxG +/- /90"),
    ("psxg_per90", "PSxG /90"),
    ("saves_per90", "Saves /90"),
    ("cs%", "Clean sheet %"),
    ("launch%", "Launched goal kicks %"),
];

/// Identity and exposure columns: never metrics, labelled without the key.
const IDENTITY_COLUMNS: &[&str] = &[
    "player",
    "squad",
    "season",
    "role",
    "rol_tactico",
    "league",
    "comp",
    "min",
    "minutes",
    "age",
    "row_key",
];

/// Percentage columns that join the per-90 metrics in the ranking pool.
const RANKING_RATE_COLUMNS: &[&str] = &["cmp%", "save%"];

/// Built-in role presets (role name -> metric keys in display order).
const ROLE_PRESETS: &[(&str, &[&str])] = &[
    (
        "goalkeeper",
        &["save%", "psxg+/-_per90", "psxg_per90", "saves_per90", "cs%", "launch%", "prgp_per90"],
    ),
    (
        "centre_back",
        &["tkl+int_per90", "int_per90", "blocks_per90", "clr_per90", "recov_per90", "touches_per90", "err_per90"],
    ),
    (
        "full_back",
        &["ppa_per90", "prgp_per90", "carries_per90", "tkl+int_per90", "1/3_per90", "touches_per90", "pressures_per90"],
    ),
    (
        "midfielder",
        &["xa_per90", "prgp_per90", "recov_per90", "pressures_per90", "totdist_per90", "prgc_per90"],
    ),
    (
        "playmaker",
        &["xag_per90", "kp_per90", "gca90_per90", "prgp_per90", "sca_per90", "1/3_per90", "sot_per90"],
    ),
    (
        "forward",
        &["gls_per90", "xg_per90", "npxg_per90", "sot_per90", "xa_per90", "touches_per90", "pressures_per90"],
    ),
];

// ---------------------------------------------------------------------------
// Pools
// ---------------------------------------------------------------------------

/// Selection pools offered to the analyst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MetricPool {
    /// Every `_per90` column.
    Per90,
    /// Percentages and rate/ratio columns.
    Rate,
    /// Per-90 metrics plus the pass/save completion rates.
    Ranking,
    /// Everything eligible for similarity and radar profiles.
    Profile,
}

/// True when a column key looks like a rate or ratio metric.
fn is_rate_key(key: &str) -> bool {
    key.ends_with('%') || key.contains("rate") || key.contains("ratio")
}

fn is_per90_key(key: &str) -> bool {
    key.ends_with("_per90")
}

/// Columns whose values are expected on a 0–100 scale.
pub fn is_scaled_metric(key: &str) -> bool {
    is_per90_key(key) || key.ends_with('%')
}

pub fn is_identity_column(key: &str) -> bool {
    IDENTITY_COLUMNS.contains(&key)
}

/// Human label for a column; metrics carry their key in parentheses,
/// e.g. `Goals /90 (gls_per90)`.
pub fn label(column: &str) -> String {
    let key = column.to_lowercase();
    let base = METRIC_LABELS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, l)| l.to_string())
        .unwrap_or_else(|| title_case(&key.replace('_', " ")));

    if base.contains('(') || is_identity_column(&key) {
        return base;
    }
    format!("{base} ({key})")
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// One eligible metric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricInfo {
    pub key: String,
    pub label: String,
    pub pools: Vec<MetricPool>,
}

/// Eligible metrics discovered once from the loaded schema.
#[derive(Debug, Clone, Default)]
pub struct MetricCatalog {
    metrics: Vec<MetricInfo>,
    presets: BTreeMap<String, Vec<String>>,
}

impl MetricCatalog {
    /// Classify each column key. Identity columns and keys matching no pool
    /// are left out. Built-in role presets are installed.
    pub fn from_columns<S: AsRef<str>>(columns: &[S]) -> Self {
        let mut metrics = Vec::new();
        for column in columns {
            let key = column.as_ref();
            if is_identity_column(key) {
                continue;
            }
            let mut pools = Vec::new();
            if is_per90_key(key) {
                pools.push(MetricPool::Per90);
            }
            if is_rate_key(key) {
                pools.push(MetricPool::Rate);
            }
            if is_per90_key(key) || RANKING_RATE_COLUMNS.contains(&key) {
                pools.push(MetricPool::Ranking);
            }
            if pools.is_empty() {
                continue;
            }
            pools.push(MetricPool::Profile);
            metrics.push(MetricInfo {
                key: key.to_string(),
                label: label(key),
                pools,
            });
        }

        let presets = ROLE_PRESETS
            .iter()
            .map(|(role, keys)| (role.to_string(), keys.iter().map(|k| k.to_string()).collect()))
            .collect();

        Self { metrics, presets }
    }

    /// Replace or add role presets (e.g. from configuration).
    pub fn with_presets(mut self, presets: &BTreeMap<String, Vec<String>>) -> Self {
        for (role, keys) in presets {
            self.presets.insert(role.to_lowercase(), keys.clone());
        }
        self
    }

    pub fn metrics(&self) -> &[MetricInfo] {
        &self.metrics
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.metrics.iter().any(|m| m.key == key)
    }

    pub fn get(&self, key: &str) -> Option<&MetricInfo> {
        self.metrics.iter().find(|m| m.key == key)
    }

    /// Keys belonging to a pool, in schema order.
    pub fn pool(&self, pool: MetricPool) -> Vec<&str> {
        self.metrics
            .iter()
            .filter(|m| m.pools.contains(&pool))
            .map(|m| m.key.as_str())
            .collect()
    }

    pub fn preset_names(&self) -> Vec<&str> {
        self.presets.keys().map(|k| k.as_str()).collect()
    }

    /// Metrics of a role preset that exist in this catalog, duplicates
    /// dropped in first-seen order. Matching is exact on the lower-cased key.
    /// Returns `None` for an unknown role.
    pub fn preset(&self, role: &str) -> Option<Vec<String>> {
        let keys = self.presets.get(&role.to_lowercase())?;
        let mut out: Vec<String> = Vec::with_capacity(keys.len());
        for key in keys {
            let key = key.to_lowercase();
            if self.contains(&key) && !out.contains(&key) {
                out.push(key);
            }
        }
        Some(out)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
