//! Tokenization collaborator.
//!
//! The pipeline only needs a lazy stream of normalized words per language;
//! real deployments plug in a proper analyzer (POS filtering, lemmatizing).
//! [`SimpleTokenizer`] is the lightweight fallback: Unicode word boundaries
//! (UAX #29), lowercase, drop stopwords, single characters and pure numbers.
//! Stopword lists come from the `stop-words` crate.

use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet};
use stop_words::LANGUAGE;
use unicode_segmentation::UnicodeSegmentation;

/// Lazy token stream borrowed from the input text.
pub type Tokens<'a> = Box<dyn Iterator<Item = String> + 'a>;

/// Splits text into normalized word tokens.
pub trait Tokenizer: Send + Sync {
    /// Tokenize `text` written in `lang`.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedLanguage`] for unknown language codes.
    fn tokenize<'a>(&'a self, text: &'a str, lang: &str) -> Result<Tokens<'a>>;
}

/// Stopword-filtering word splitter, configurable per language.
#[derive(Debug, Clone)]
pub struct SimpleTokenizer {
    stopwords: HashMap<String, HashSet<String>>,
}

impl SimpleTokenizer {
    /// Tokenizer knowing `en`, `de`, `fr` and `es`.
    pub fn new() -> Self {
        Self::empty()
            .with_builtin("en", LANGUAGE::English)
            .with_builtin("de", LANGUAGE::German)
            .with_builtin("fr", LANGUAGE::French)
            .with_builtin("es", LANGUAGE::Spanish)
    }

    /// Tokenizer knowing no language at all.
    pub fn empty() -> Self {
        Self {
            stopwords: HashMap::new(),
        }
    }

    /// Register `lang` with the stopword list `stop-words` ships for `language`.
    pub fn with_builtin(self, lang: &str, language: LANGUAGE) -> Self {
        self.with_language(lang, stop_words::get(language))
    }

    /// Register (or replace) a language and its stopwords.
    pub fn with_language<I, S>(mut self, lang: &str, stopwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = stopwords
            .into_iter()
            .map(|w| w.as_ref().to_lowercase())
            .collect();
        let _ = self.stopwords.insert(lang.to_string(), set);
        self
    }

    /// Whether `lang` is registered.
    pub fn supports(&self, lang: &str) -> bool {
        self.stopwords.contains_key(lang)
    }
}

impl Default for SimpleTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer for SimpleTokenizer {
    fn tokenize<'a>(&'a self, text: &'a str, lang: &str) -> Result<Tokens<'a>> {
        let stopwords = self
            .stopwords
            .get(lang)
            .ok_or_else(|| Error::UnsupportedLanguage(lang.to_string()))?;

        Ok(Box::new(
            text.unicode_words()
                .filter(|raw| raw.chars().count() > 1)
                .filter(|raw| !raw.chars().all(|c| c.is_numeric()))
                .map(str::to_lowercase)
                .filter(move |word| !stopwords.contains(word)),
        ))
    }
}
