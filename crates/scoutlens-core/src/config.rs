// Configuration loading and validation (config/scoutlens.toml).

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("no configuration under {dir}: expected config/scoutlens.toml or defaults/scoutlens.toml")]
    NoDefaults { dir: PathBuf },

    #[error("failed to install default configuration at {path}: {source}")]
    DefaultsCopyError {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Name of the single configuration file.
pub const CONFIG_FILE: &str = "scoutlens.toml";

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub similarity: SimilarityConfig,
    pub comparison: ComparisonConfig,
    pub weights: WeightConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    /// Role presets added to (or overriding) the built-in ones.
    #[serde(default)]
    pub presets: BTreeMap<String, Vec<String>>,
}

/// Where the processed dataset lives and how its files are named.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DatasetConfig {
    pub dir: String,
    pub prefix: String,
    pub extension: String,
}

/// Which rows similarity search normalizes against by default.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeOver {
    /// The full, unfiltered dataset.
    Global,
    /// The currently filtered pool.
    Filtered,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimilarityConfig {
    pub top_k: usize,
    pub min_metrics: usize,
    pub max_metrics: usize,
    pub normalize_over: NormalizeOver,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComparisonConfig {
    pub min_metrics: usize,
    pub max_metrics: usize,
}

/// Weight slider bounds. The engine accepts any non-negative weight; the
/// ceiling is applied where weights enter from the command line.
#[derive(Debug, Clone, Deserialize)]
pub struct WeightConfig {
    pub default: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    pub decimals: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { decimals: 3 }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Path of the active configuration file under `base_dir`.
pub fn config_path(base_dir: &Path) -> PathBuf {
    base_dir.join("config").join(CONFIG_FILE)
}

/// Load and validate `config/scoutlens.toml` under `base_dir` as it is on
/// disk; see `load_config_in` for first-run setup.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = config_path(base_dir);
    let text = read_file(&path)?;
    let config: Config = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;
    validate(&config)?;
    Ok(config)
}

/// Install `defaults/scoutlens.toml` as `config/scoutlens.toml` when the
/// analyst has no configuration yet. Returns the new file's path, or `None`
/// when a configuration already exists and was left untouched.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = config_path(base_dir);
    if target.is_file() {
        return Ok(None);
    }
    let shipped = base_dir.join("defaults").join(CONFIG_FILE);
    if !shipped.is_file() {
        return Err(ConfigError::NoDefaults {
            dir: base_dir.to_path_buf(),
        });
    }

    let install = || -> std::io::Result<()> {
        if let Some(dir) = target.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::copy(&shipped, &target).map(|_| ())
    };
    install().map_err(|e| ConfigError::DefaultsCopyError {
        path: target.clone(),
        source: e,
    })?;
    info!("Installed default configuration at {}", target.display());
    Ok(Some(target))
}

/// Load the configuration under `base_dir`, installing the shipped defaults
/// on first run.
pub fn load_config_in(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_file(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: String) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message,
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.dataset.dir.trim().is_empty() {
        return Err(invalid("dataset.dir", "must not be empty".into()));
    }
    if config.dataset.extension.trim_start_matches('.').is_empty() {
        return Err(invalid("dataset.extension", "must not be empty".into()));
    }

    let s = &config.similarity;
    if s.top_k == 0 {
        return Err(invalid("similarity.top_k", "must be > 0".into()));
    }
    let bounds: &[(&str, usize, usize)] = &[
        ("similarity", s.min_metrics, s.max_metrics),
        ("comparison", config.comparison.min_metrics, config.comparison.max_metrics),
    ];
    for (section, min, max) in bounds {
        if *min == 0 {
            return Err(invalid(&format!("{section}.min_metrics"), "must be > 0".into()));
        }
        if max < min {
            return Err(invalid(
                &format!("{section}.max_metrics"),
                format!("must be >= min_metrics ({min}), got {max}"),
            ));
        }
    }

    let w = &config.weights;
    if !w.max.is_finite() || w.max <= 0.0 {
        return Err(invalid("weights.max", format!("must be > 0, got {}", w.max)));
    }
    if !(0.0..=w.max).contains(&w.default) || w.default == 0.0 {
        return Err(invalid(
            "weights.default",
            format!("must be in (0, {}], got {}", w.max, w.default),
        ));
    }

    for (role, keys) in &config.presets {
        if keys.is_empty() {
            return Err(invalid(
                &format!("presets.{role}"),
                "must list at least one metric".into(),
            ));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
