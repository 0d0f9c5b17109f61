// Metric selections and per-metric weights.

use crate::error::{EngineError, EngineResult};
use crate::normalize::EPSILON;
use std::collections::HashMap;
use std::ops::RangeInclusive;

/// Inclusive bounds on how many metrics an operation accepts.
pub type SelectionBounds = RangeInclusive<usize>;

/// Weighted composite ranking.
pub const COMPOSITE_BOUNDS: SelectionBounds = 3..=12;

/// Radar and similarity profiles offered to the analyst.
pub const PROFILE_BOUNDS: SelectionBounds = 4..=10;

// ---------------------------------------------------------------------------
// MetricSelection
// ---------------------------------------------------------------------------

/// Ordered, distinct metric keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSelection {
    keys: Vec<String>,
}

impl MetricSelection {
    /// Build a selection of trimmed, lower-cased keys (the dataset's header
    /// form), dropping repeats (first occurrence wins) and blank keys. An
    /// empty result is rejected.
    pub fn new<S: AsRef<str>>(keys: &[S]) -> EngineResult<Self> {
        let mut out: Vec<String> = Vec::with_capacity(keys.len());
        for key in keys {
            let key = key.as_ref().trim().to_lowercase();
            if key.is_empty() || out.contains(&key) {
                continue;
            }
            out.push(key);
        }
        if out.is_empty() {
            return Err(EngineError::EmptySelection);
        }
        Ok(Self { keys: out })
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Check the selection size against an operation's bounds.
    pub fn require_len(&self, bounds: &SelectionBounds) -> EngineResult<()> {
        let got = self.keys.len();
        if got < *bounds.start() {
            return Err(EngineError::InsufficientMetrics {
                required: *bounds.start(),
                got,
            });
        }
        if got > *bounds.end() {
            return Err(EngineError::TooManyMetrics {
                allowed: *bounds.end(),
                got,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// WeightVector
// ---------------------------------------------------------------------------

/// Weight used for any metric without an explicit entry.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Per-metric weights. Unset metrics weigh `DEFAULT_WEIGHT`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightVector {
    weights: HashMap<String, f64>,
}

impl WeightVector {
    /// All metrics at the default weight.
    pub fn uniform() -> Self {
        Self::default()
    }

    /// Set one weight. Negative and non-finite values are rejected.
    pub fn set(&mut self, metric: &str, weight: f64) -> EngineResult<()> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(EngineError::InvalidWeight {
                metric: metric.to_string(),
                value: weight,
            });
        }
        self.weights.insert(metric.to_string(), weight);
        Ok(())
    }

    pub fn with(mut self, metric: &str, weight: f64) -> EngineResult<Self> {
        self.set(metric, weight)?;
        Ok(self)
    }

    pub fn get(&self, metric: &str) -> f64 {
        self.weights.get(metric).copied().unwrap_or(DEFAULT_WEIGHT)
    }

    /// Weights in selection order.
    pub fn for_selection(&self, selection: &MetricSelection) -> Vec<f64> {
        selection.iter().map(|m| self.get(m)).collect()
    }

    pub fn total(&self, selection: &MetricSelection) -> f64 {
        self.for_selection(selection).iter().sum()
    }

    /// Fail when the selection's total weight is effectively zero.
    pub fn ensure_not_degenerate(&self, selection: &MetricSelection) -> EngineResult<()> {
        if self.total(selection) <= EPSILON {
            return Err(EngineError::DegenerateWeights);
        }
        Ok(())
    }

    /// Reject any explicit weight above `max`.
    pub fn check_ceiling(&self, max: f64) -> EngineResult<()> {
        let offending = self
            .weights
            .iter()
            .filter(|(_, w)| **w > max)
            .min_by(|a, b| a.0.cmp(b.0));
        match offending {
            Some((metric, value)) => Err(EngineError::InvalidWeight {
                metric: metric.clone(),
                value: *value,
            }),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn selection_drops_duplicates_in_order() {
        let sel = MetricSelection::new(&["xg", "gls", "xg", " ", "ast"]).unwrap();
        assert_eq!(sel.keys(), &["xg", "gls", "ast"]);
    }

    #[test]
    fn selection_keys_match_header_case() {
        let sel = MetricSelection::new(&[" Gls_per90", "CMP%", "gls_per90"]).unwrap();
        assert_eq!(sel.keys(), &["gls_per90", "cmp%"]);
    }

    #[test]
    fn empty_selection_rejected() {
        let empty: [&str; 0] = [];
        assert_eq!(MetricSelection::new(&empty), Err(EngineError::EmptySelection));
    }

    #[test]
    fn bounds_checked() {
        let two = MetricSelection::new(&["a", "b"]).unwrap();
        let err = two.require_len(&COMPOSITE_BOUNDS).unwrap_err();
        assert_eq!(err, EngineError::InsufficientMetrics { required: 3, got: 2 });
        assert_eq!(err.kind(), ErrorKind::InputShape);

        let keys: Vec<String> = (0..13).map(|i| format!("m{i}")).collect();
        let many = MetricSelection::new(&keys).unwrap();
        assert_eq!(
            many.require_len(&COMPOSITE_BOUNDS),
            Err(EngineError::TooManyMetrics { allowed: 12, got: 13 })
        );
        assert!(many.require_len(&(1..=20)).is_ok());
    }

    #[test]
    fn weights_default_and_validate() {
        let sel = MetricSelection::new(&["a", "b", "c"]).unwrap();
        let w = WeightVector::uniform().with("b", 2.0).unwrap();
        assert_eq!(w.for_selection(&sel), vec![1.0, 2.0, 1.0]);

        let mut w = WeightVector::uniform();
        assert!(w.set("a", -0.5).is_err());
        assert!(w.set("a", f64::NAN).is_err());
        assert!(w.set("a", 0.0).is_ok());
    }

    #[test]
    fn degenerate_and_ceiling() {
        let sel = MetricSelection::new(&["a", "b"]).unwrap();
        let zero = WeightVector::uniform().with("a", 0.0).unwrap().with("b", 0.0).unwrap();
        assert_eq!(
            zero.ensure_not_degenerate(&sel),
            Err(EngineError::DegenerateWeights)
        );

        let heavy = WeightVector::uniform().with("b", 2.5).unwrap();
        assert!(heavy.ensure_not_degenerate(&sel).is_ok());
        assert_eq!(
            heavy.check_ceiling(2.0),
            Err(EngineError::InvalidWeight {
                metric: "b".into(),
                value: 2.5
            })
        );
        assert!(heavy.check_ceiling(3.0).is_ok());
    }
}
