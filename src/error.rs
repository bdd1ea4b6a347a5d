use core::fmt;

/// Result alias for `wordtier`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the weighting, graph, clustering and pipeline stages.
///
/// Every stage fails fast and hands its first error to the caller unchanged;
/// there is no partial tree on failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The tokenizer does not know the language code.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// A word lacks the corpus frequency the weighting mode needs.
    #[error("unknown word '{word}': {reason}")]
    UnknownWord {
        /// The offending word.
        word: String,
        /// What was missing or out of range.
        reason: &'static str,
    },

    /// Invalid parameter value (weighting mode, metric, k, max words...).
    #[error("invalid parameter '{name}': {message}")]
    Configuration {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: String,
    },

    /// Not enough usable words (or nodes) to build anything.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// The embedding / frequency collaborator failed.
    #[error("embedding lookup failed: {0}")]
    EmbeddingLookup(String),

    /// Embedding vectors of different lengths.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Found dimension.
        found: usize,
    },

    /// The caller cancelled the run or its deadline passed.
    #[error("cancelled before stage '{stage}'")]
    Cancelled {
        /// The stage that was about to start.
        stage: &'static str,
    },
}

impl Error {
    /// Shorthand for a [`Error::Configuration`].
    pub fn config(name: &'static str, message: impl Into<String>) -> Self {
        Error::Configuration {
            name,
            message: message.into(),
        }
    }

    /// Shorthand for an [`Error::InsufficientData`].
    pub fn insufficient(message: impl Into<String>) -> Self {
        Error::InsufficientData(message.into())
    }

    /// Shorthand for an [`Error::EmbeddingLookup`].
    pub fn lookup(message: impl Into<String>) -> Self {
        Error::EmbeddingLookup(message.into())
    }

    /// The error's kind, for transport adapters.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnsupportedLanguage(_) => ErrorKind::UnsupportedLanguage,
            Error::UnknownWord { .. } => ErrorKind::UnknownWord,
            Error::Configuration { .. } => ErrorKind::Configuration,
            Error::InsufficientData(_) => ErrorKind::InsufficientData,
            Error::EmbeddingLookup(_) => ErrorKind::EmbeddingLookup,
            Error::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            Error::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }
}

/// Coarse error classification with a stable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::UnsupportedLanguage`].
    UnsupportedLanguage,
    /// See [`Error::UnknownWord`].
    UnknownWord,
    /// See [`Error::Configuration`].
    Configuration,
    /// See [`Error::InsufficientData`].
    InsufficientData,
    /// See [`Error::EmbeddingLookup`].
    EmbeddingLookup,
    /// See [`Error::DimensionMismatch`].
    DimensionMismatch,
    /// See [`Error::Cancelled`].
    Cancelled,
}

impl ErrorKind {
    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnsupportedLanguage => "unsupported_language",
            ErrorKind::UnknownWord => "unknown_word",
            ErrorKind::Configuration => "configuration",
            ErrorKind::InsufficientData => "insufficient_data",
            ErrorKind::EmbeddingLookup => "embedding_lookup",
            ErrorKind::DimensionMismatch => "dimension_mismatch",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct() {
        let errors = [
            Error::UnsupportedLanguage("xx".into()),
            Error::UnknownWord {
                word: "w".into(),
                reason: "no frequency",
            },
            Error::config("k", "must be positive"),
            Error::insufficient("one word"),
            Error::lookup("offline"),
            Error::DimensionMismatch {
                expected: 3,
                found: 2,
            },
            Error::Cancelled { stage: "graph" },
        ];
        let mut names: Vec<&str> = errors.iter().map(|e| e.kind().as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), errors.len());
    }

    #[test]
    fn display_mentions_parameter() {
        let err = Error::config("max_words", "must be at least 1");
        assert_eq!(
            err.to_string(),
            "invalid parameter 'max_words': must be at least 1"
        );
    }
}
