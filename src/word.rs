//! Per-request word records.

use serde::Serialize;

/// A distinct word that survived tokenization and has an embedding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordRecord {
    /// Normalized surface form.
    pub word: String,
    /// Occurrences in the submitted text (at least 1).
    pub in_doc_count: u32,
    /// Corpus-level frequency, when the store knows it.
    pub corpus_frequency: Option<u64>,
    /// Embedding vector.
    #[serde(skip)]
    pub embedding: Vec<f32>,
}

/// A [`WordRecord`] with its importance score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightedWord {
    /// The underlying record.
    #[serde(flatten)]
    pub record: WordRecord,
    /// Output of the weighting engine.
    pub weight: f64,
}

impl WeightedWord {
    /// Attach a weight to a record.
    pub fn new(record: WordRecord, weight: f64) -> Self {
        Self { record, weight }
    }

    /// The word itself.
    pub fn word(&self) -> &str {
        &self.record.word
    }

    /// The embedding vector.
    pub fn embedding(&self) -> &[f32] {
        &self.record.embedding
    }
}

/// Keep the `max_words` heaviest words.
///
/// Sorting is stable: words of equal weight keep their input order, which the
/// pipeline sets to first occurrence in the text.
pub fn top_weighted(mut words: Vec<WeightedWord>, max_words: usize) -> Vec<WeightedWord> {
    words.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    words.truncate(max_words);
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weighted(word: &str, weight: f64) -> WeightedWord {
        WeightedWord::new(
            WordRecord {
                word: word.to_string(),
                in_doc_count: 1,
                corpus_frequency: None,
                embedding: vec![1.0],
            },
            weight,
        )
    }

    #[test]
    fn test_top_weighted_orders_and_truncates() {
        let words = vec![
            weighted("cat", 2.0),
            weighted("dog", 3.0),
            weighted("bird", 1.0),
        ];
        let top = top_weighted(words, 2);
        let names: Vec<&str> = top.iter().map(|w| w.word()).collect();
        assert_eq!(names, vec!["dog", "cat"]);
    }

    #[test]
    fn test_top_weighted_ties_keep_input_order() {
        let words = vec![
            weighted("first", 1.0),
            weighted("second", 1.0),
            weighted("third", 1.0),
        ];
        let top = top_weighted(words, 3);
        let names: Vec<&str> = top.iter().map(|w| w.word()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }
}
