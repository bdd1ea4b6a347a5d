//! Word importance scores.
//!
//! Two modes:
//!
//! | Mode | Weight |
//! |------|--------|
//! | `raw-count` | in-document count |
//! | `inverse-frequency` | in-document count / ln(corpus frequency) |
//!
//! The inverse-frequency mode is a TF-IDF flavour: a word that is frequent in
//! this text but rare in the embedding corpus scores highest.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// How words are scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WeightingMode {
    /// `weight = count`.
    RawCount,
    /// `weight = count / ln(corpus_frequency)`.
    #[default]
    InverseFrequency,
}

impl WeightingMode {
    /// Canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightingMode::RawCount => "raw-count",
            WeightingMode::InverseFrequency => "inverse-frequency",
        }
    }

    /// Whether the mode needs corpus frequencies.
    pub fn needs_frequency(&self) -> bool {
        matches!(self, WeightingMode::InverseFrequency)
    }
}

impl fmt::Display for WeightingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeightingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw-count" | "raw_count" | "tf" => Ok(WeightingMode::RawCount),
            "inverse-frequency" | "inverse_frequency" | "tf-idf" | "tfidf" => {
                Ok(WeightingMode::InverseFrequency)
            }
            other => Err(Error::config(
                "weighting",
                format!("unsupported weighting mode '{other}'"),
            )),
        }
    }
}

impl TryFrom<String> for WeightingMode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<WeightingMode> for String {
    fn from(mode: WeightingMode) -> Self {
        mode.as_str().to_string()
    }
}

/// A pure `word -> weight` function over borrowed count maps.
#[derive(Debug, Clone, Copy)]
pub struct Weighting<'a> {
    mode: WeightingMode,
    counts: &'a HashMap<String, u32>,
    frequencies: Option<&'a HashMap<String, u64>>,
}

impl<'a> Weighting<'a> {
    /// Weight by in-document count.
    pub fn raw_count(counts: &'a HashMap<String, u32>) -> Self {
        Self {
            mode: WeightingMode::RawCount,
            counts,
            frequencies: None,
        }
    }

    /// Weight by in-document count over log corpus frequency.
    pub fn inverse_frequency(
        counts: &'a HashMap<String, u32>,
        frequencies: &'a HashMap<String, u64>,
    ) -> Self {
        Self {
            mode: WeightingMode::InverseFrequency,
            counts,
            frequencies: Some(frequencies),
        }
    }

    /// Build the weighting for `mode`.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] when `mode` needs frequencies and none were given.
    pub fn new(
        mode: WeightingMode,
        counts: &'a HashMap<String, u32>,
        frequencies: Option<&'a HashMap<String, u64>>,
    ) -> Result<Self> {
        match (mode, frequencies) {
            (WeightingMode::RawCount, _) => Ok(Self::raw_count(counts)),
            (WeightingMode::InverseFrequency, Some(freq)) => {
                Ok(Self::inverse_frequency(counts, freq))
            }
            (WeightingMode::InverseFrequency, None) => Err(Error::config(
                "weighting",
                "inverse-frequency weighting requires corpus frequencies",
            )),
        }
    }

    /// The active mode.
    pub fn mode(&self) -> WeightingMode {
        self.mode
    }

    /// Score one word.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownWord`] if the word was never counted, or (inverse
    /// frequency) its corpus frequency is missing or not above 1.
    pub fn weight(&self, word: &str) -> Result<f64> {
        let count = *self.counts.get(word).ok_or_else(|| Error::UnknownWord {
            word: word.to_string(),
            reason: "not counted in document",
        })?;

        match self.frequencies {
            None => Ok(f64::from(count)),
            Some(freq) => {
                let f = freq.get(word).copied().ok_or_else(|| Error::UnknownWord {
                    word: word.to_string(),
                    reason: "no corpus frequency",
                })?;
                // ln(1) = 0; anything at or below 1 has no usable log.
                if f <= 1 {
                    return Err(Error::UnknownWord {
                        word: word.to_string(),
                        reason: "corpus frequency must exceed 1",
                    });
                }
                Ok(f64::from(count) / (f as f64).ln())
            }
        }
    }
}

/// Count occurrences, remembering first-occurrence order.
pub fn count_words<I>(tokens: I) -> (HashMap<String, u32>, Vec<String>)
where
    I: IntoIterator<Item = String>,
{
    let mut counts: HashMap<String, u32> = HashMap::new();
    let mut order = Vec::new();
    for token in tokens {
        let slot = counts.entry(token.clone()).or_insert_with(|| {
            order.push(token);
            0
        });
        *slot += 1;
    }
    (counts, order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, u32)]) -> HashMap<String, u32> {
        pairs.iter().map(|(w, c)| (w.to_string(), *c)).collect()
    }

    fn freqs(pairs: &[(&str, u64)]) -> HashMap<String, u64> {
        pairs.iter().map(|(w, c)| (w.to_string(), *c)).collect()
    }

    #[test]
    fn test_raw_count() {
        let c = counts(&[("dog", 3), ("cat", 2)]);
        let w = Weighting::raw_count(&c);
        assert_eq!(w.weight("dog").unwrap(), 3.0);
        assert_eq!(w.weight("cat").unwrap(), 2.0);
    }

    #[test]
    fn test_inverse_frequency_value() {
        let c = counts(&[("dog", 4)]);
        let f = freqs(&[("dog", 100)]);
        let w = Weighting::inverse_frequency(&c, &f);
        let expected = 4.0 / (100f64).ln();
        assert!((w.weight("dog").unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_frequency_monotone() {
        let c = counts(&[("rare", 2), ("common", 2)]);
        let f = freqs(&[("rare", 50), ("common", 50_000)]);
        let w = Weighting::inverse_frequency(&c, &f);
        assert!(w.weight("rare").unwrap() > w.weight("common").unwrap());
    }

    #[test]
    fn test_inverse_frequency_rejects_missing_and_small() {
        let c = counts(&[("a", 1), ("b", 1), ("c", 1)]);
        let f = freqs(&[("b", 1), ("c", 0)]);
        let w = Weighting::inverse_frequency(&c, &f);
        for word in ["a", "b", "c"] {
            assert!(matches!(w.weight(word), Err(Error::UnknownWord { .. })));
        }
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(
            "raw-count".parse::<WeightingMode>().unwrap(),
            WeightingMode::RawCount
        );
        assert_eq!(
            "TF-IDF".parse::<WeightingMode>().unwrap(),
            WeightingMode::InverseFrequency
        );
        let err = "bm25".parse::<WeightingMode>().unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_new_requires_frequencies() {
        let c = counts(&[("a", 1)]);
        assert!(Weighting::new(WeightingMode::InverseFrequency, &c, None).is_err());
        assert!(Weighting::new(WeightingMode::RawCount, &c, None).is_ok());
    }

    #[test]
    fn test_count_words_first_occurrence() {
        let tokens = ["cat", "cat", "dog", "dog", "dog", "bird"]
            .iter()
            .map(|s| s.to_string());
        let (counts, order) = count_words(tokens);
        assert_eq!(order, vec!["cat", "dog", "bird"]);
        assert_eq!(counts["dog"], 3);
        assert_eq!(counts["cat"], 2);
        assert_eq!(counts["bird"], 1);
    }
}
