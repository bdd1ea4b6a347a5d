//! Per-request pipeline parameters.

use crate::distance::Metric;
use crate::error::{Error, Result};
use crate::weighting::WeightingMode;
use serde::{Deserialize, Serialize};

/// Default number of words kept after weighting.
pub const DEFAULT_MAX_WORDS: usize = 100;
/// Default neighbor count for the kNN graph.
pub const DEFAULT_K: usize = 10;

/// Tunable knobs for one pipeline run.
///
/// Deserializes with per-field defaults, so a query string carrying only
/// `n_neighbors=5` is a complete configuration. The aliases `words` and
/// `n_neighbors` match the HTTP parameter names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Words kept after weighting (heaviest first).
    #[serde(alias = "words")]
    pub max_words: usize,
    /// Neighbors per word in the similarity graph.
    #[serde(alias = "n_neighbors")]
    pub k: usize,
    /// How words are scored.
    pub weighting: WeightingMode,
    /// Distance between embeddings.
    pub metric: Metric,
    /// Modularity resolution (γ).
    pub resolution: f64,
    /// Seed for a shuffled node visiting order; `None` keeps index order.
    pub seed: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_words: DEFAULT_MAX_WORDS,
            k: DEFAULT_K,
            weighting: WeightingMode::default(),
            metric: Metric::default(),
            resolution: 1.0,
            seed: None,
        }
    }
}

impl PipelineConfig {
    /// Set the number of words kept.
    pub fn with_max_words(mut self, max_words: usize) -> Self {
        self.max_words = max_words;
        self
    }

    /// Set the neighbor count.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Set the weighting mode.
    pub fn with_weighting(mut self, weighting: WeightingMode) -> Self {
        self.weighting = weighting;
        self
    }

    /// Set the distance metric.
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Set the modularity resolution.
    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    /// Set the node-order seed.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Reject values no run could succeed with.
    ///
    /// `k < word count` can only be checked once the words are known; the
    /// graph builder does that.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] naming the offending parameter.
    pub fn validate(&self) -> Result<()> {
        if self.max_words == 0 {
            return Err(Error::config("max_words", "must be at least 1"));
        }
        if self.k == 0 {
            return Err(Error::config("k", "must be at least 1"));
        }
        if !self.resolution.is_finite() || self.resolution <= 0.0 {
            return Err(Error::config(
                "resolution",
                format!("must be finite and positive, got {}", self.resolution),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.max_words, 100);
        assert_eq!(cfg.k, 10);
        assert_eq!(cfg.weighting, WeightingMode::InverseFrequency);
        assert_eq!(cfg.metric, Metric::Cosine);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zeroes() {
        let err = PipelineConfig::default().with_max_words(0).validate();
        assert!(matches!(err, Err(Error::Configuration { name: "max_words", .. })));
        let err = PipelineConfig::default().with_k(0).validate();
        assert!(matches!(err, Err(Error::Configuration { name: "k", .. })));
        let err = PipelineConfig::default().with_resolution(f64::NAN).validate();
        assert!(matches!(err, Err(Error::Configuration { name: "resolution", .. })));
    }

    #[test]
    fn test_deserialize_with_aliases_and_defaults() {
        let cfg: PipelineConfig = serde_json::from_str(
            r#"{"words": 20, "n_neighbors": 3, "weighting": "raw-count"}"#,
        )
        .unwrap();
        assert_eq!(cfg.max_words, 20);
        assert_eq!(cfg.k, 3);
        assert_eq!(cfg.weighting, WeightingMode::RawCount);
        assert_eq!(cfg.metric, Metric::Cosine);
    }

    #[test]
    fn test_deserialize_rejects_unknown_mode() {
        let res: std::result::Result<PipelineConfig, _> =
            serde_json::from_str(r#"{"weighting": "bm25"}"#);
        assert!(res.is_err());
    }
}
