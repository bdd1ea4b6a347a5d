//! Embedding and frequency lookup.
//!
//! The store is injected into the pipeline as a capability. It is only ever
//! read during a run, so one instance can serve concurrent requests behind an
//! `Arc`.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::io::BufRead;
use std::sync::Arc;

/// Vector and corpus-frequency lookup per language.
///
/// Both lookups return entries only for words the store knows; missing words
/// are simply absent from the map.
pub trait EmbeddingStore: Send + Sync {
    /// Embedding vectors for `words`.
    ///
    /// # Errors
    ///
    /// [`Error::EmbeddingLookup`] when the backend cannot answer.
    fn vectors_for(&self, words: &[&str], lang: &str) -> Result<HashMap<String, Vec<f32>>>;

    /// Corpus frequencies for `words`.
    ///
    /// # Errors
    ///
    /// [`Error::EmbeddingLookup`] when the backend cannot answer.
    fn frequency_for(&self, words: &[&str], lang: &str) -> Result<HashMap<String, u64>>;
}

impl<S: EmbeddingStore + ?Sized> EmbeddingStore for Arc<S> {
    fn vectors_for(&self, words: &[&str], lang: &str) -> Result<HashMap<String, Vec<f32>>> {
        (**self).vectors_for(words, lang)
    }

    fn frequency_for(&self, words: &[&str], lang: &str) -> Result<HashMap<String, u64>> {
        (**self).frequency_for(words, lang)
    }
}

#[derive(Debug, Clone, Default)]
struct LanguageTable {
    dim: Option<usize>,
    vectors: HashMap<String, Vec<f32>>,
    frequencies: HashMap<String, u64>,
}

/// Store holding every table in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: HashMap<String, LanguageTable>,
}

impl InMemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one word's vector.
    ///
    /// # Errors
    ///
    /// [`Error::DimensionMismatch`] when the vector length differs from
    /// earlier vectors of the same language.
    pub fn insert(&mut self, lang: &str, word: &str, vector: Vec<f32>) -> Result<()> {
        let table = self.tables.entry(lang.to_string()).or_default();
        match table.dim {
            Some(dim) if dim != vector.len() => {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    found: vector.len(),
                })
            }
            Some(_) => {}
            None => table.dim = Some(vector.len()),
        }
        let _ = table.vectors.insert(word.to_string(), vector);
        Ok(())
    }

    /// Add or replace one word's corpus frequency.
    pub fn set_frequency(&mut self, lang: &str, word: &str, frequency: u64) {
        let table = self.tables.entry(lang.to_string()).or_default();
        let _ = table.frequencies.insert(word.to_string(), frequency);
    }

    /// Builder-style [`InMemoryStore::insert`] plus frequency.
    pub fn with_word(
        mut self,
        lang: &str,
        word: &str,
        vector: Vec<f32>,
        frequency: Option<u64>,
    ) -> Result<Self> {
        self.insert(lang, word, vector)?;
        if let Some(f) = frequency {
            self.set_frequency(lang, word, f);
        }
        Ok(self)
    }

    /// Load vectors in word2vec text format.
    ///
    /// An optional `count dim` header line is skipped; every other non-empty
    /// line is `word v1 v2 ... vdim`. Returns the number of vectors read.
    ///
    /// # Errors
    ///
    /// [`Error::EmbeddingLookup`] on I/O failure or a malformed line,
    /// [`Error::DimensionMismatch`] on inconsistent vector lengths.
    pub fn load_word2vec_text<R: BufRead>(&mut self, reader: R, lang: &str) -> Result<usize> {
        let mut loaded = 0;
        for (lineno, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| Error::lookup(format!("reading vectors: {e}")))?;
            let mut fields = line.split_whitespace();
            let Some(word) = fields.next() else {
                continue;
            };
            let values: Vec<&str> = fields.collect();
            if lineno == 0 && is_header(word, &values) {
                continue;
            }
            let vector = values
                .iter()
                .map(|v| v.parse::<f32>())
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| {
                    Error::lookup(format!("line {}: bad vector component: {e}", lineno + 1))
                })?;
            if vector.is_empty() {
                return Err(Error::lookup(format!(
                    "line {}: word '{word}' has no vector",
                    lineno + 1
                )));
            }
            self.insert(lang, word, vector)?;
            loaded += 1;
        }
        log::debug!("loaded {loaded} vectors for '{lang}'");
        Ok(loaded)
    }

    /// Load `word count` lines of corpus frequencies. Returns the number read.
    ///
    /// # Errors
    ///
    /// [`Error::EmbeddingLookup`] on I/O failure or a malformed line.
    pub fn load_frequencies<R: BufRead>(&mut self, reader: R, lang: &str) -> Result<usize> {
        let mut loaded = 0;
        for (lineno, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| Error::lookup(format!("reading frequencies: {e}")))?;
            let mut fields = line.split_whitespace();
            let (Some(word), Some(count)) = (fields.next(), fields.next()) else {
                if line.trim().is_empty() {
                    continue;
                }
                return Err(Error::lookup(format!(
                    "line {}: expected 'word count'",
                    lineno + 1
                )));
            };
            let count: u64 = count
                .parse()
                .map_err(|e| Error::lookup(format!("line {}: bad count: {e}", lineno + 1)))?;
            self.set_frequency(lang, word, count);
            loaded += 1;
        }
        log::debug!("loaded {loaded} frequencies for '{lang}'");
        Ok(loaded)
    }

    /// Languages with at least one vector or frequency.
    pub fn languages(&self) -> Vec<&str> {
        let mut langs: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        langs.sort_unstable();
        langs
    }

    /// Number of vectors for `lang`.
    pub fn len(&self, lang: &str) -> usize {
        self.tables.get(lang).map_or(0, |t| t.vectors.len())
    }

    /// Whether the store holds no vectors at all.
    pub fn is_empty(&self) -> bool {
        self.tables.values().all(|t| t.vectors.is_empty())
    }

    fn table(&self, lang: &str) -> Result<&LanguageTable> {
        self.tables
            .get(lang)
            .ok_or_else(|| Error::lookup(format!("no embeddings loaded for language '{lang}'")))
    }
}

fn is_header(first: &str, rest: &[&str]) -> bool {
    rest.len() == 1 && first.parse::<usize>().is_ok() && rest[0].parse::<usize>().is_ok()
}

impl EmbeddingStore for InMemoryStore {
    fn vectors_for(&self, words: &[&str], lang: &str) -> Result<HashMap<String, Vec<f32>>> {
        let table = self.table(lang)?;
        Ok(words
            .iter()
            .filter_map(|&w| table.vectors.get(w).map(|v| (w.to_string(), v.clone())))
            .collect())
    }

    fn frequency_for(&self, words: &[&str], lang: &str) -> Result<HashMap<String, u64>> {
        let table = self.table(lang)?;
        Ok(words
            .iter()
            .filter_map(|&w| table.frequencies.get(w).map(|&f| (w.to_string(), f)))
            .collect())
    }
}
