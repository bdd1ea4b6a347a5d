//! End-to-end run: text in, word-cluster tree out.
//!
//! ```text
//! text ─tokenize─▶ counts ─lookup─▶ records ─weight─▶ top words
//!      ─kNN─▶ graph ─louvain─▶ dendrogram ─serialize─▶ [OutputNode]
//! ```
//!
//! Each run owns all of its data; the tokenizer and store are shared
//! read-only, so one [`Pipeline`] can serve many threads. The first failing
//! stage ends the run. A [`CancelToken`] is checked between stages (never
//! inside one) to bound latency on oversized inputs.

use crate::community::{knn_graph_with_metric, CommunityDetection, Louvain};
use crate::config::PipelineConfig;
use crate::embedding::EmbeddingStore;
use crate::error::{Error, Result};
use crate::hierarchy::{serialize_dendrogram, OutputNode};
use crate::text::Tokenizer;
use crate::weighting::{count_words, Weighting};
use crate::word::{top_weighted, WeightedWord, WordRecord};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cooperative cancellation for a pipeline run.
///
/// Clones share the same flag, so a caller can keep one clone and trip it
/// from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that only trips when [`CancelToken::cancel`] is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also trip once `deadline` has passed.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Also trip `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether the run should stop.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// `Err(Cancelled)` if tripped, naming the stage about to start.
    pub fn check(&self, stage: &'static str) -> Result<()> {
        if self.is_cancelled() {
            log::debug!("pipeline cancelled before '{stage}'");
            return Err(Error::Cancelled { stage });
        }
        Ok(())
    }
}

/// Tokenizer + embedding store, ready to turn text into cluster trees.
#[derive(Debug, Clone)]
pub struct Pipeline<T, S> {
    tokenizer: T,
    store: S,
}

impl<T: Tokenizer, S: EmbeddingStore> Pipeline<T, S> {
    /// Wire the collaborators.
    pub fn new(tokenizer: T, store: S) -> Self {
        Self { tokenizer, store }
    }

    /// The embedding store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run without cancellation.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::run_with`].
    pub fn run(&self, text: &str, lang: &str, config: &PipelineConfig) -> Result<Vec<OutputNode>> {
        self.run_with(text, lang, config, &CancelToken::new())
    }

    /// Run, checking `cancel` between stages.
    ///
    /// # Errors
    ///
    /// The first error of any stage: [`Error::Configuration`] for bad
    /// parameters, [`Error::UnsupportedLanguage`] from the tokenizer,
    /// [`Error::EmbeddingLookup`] from the store, [`Error::UnknownWord`] from
    /// weighting, [`Error::InsufficientData`] with fewer than two usable
    /// words, [`Error::Cancelled`] when `cancel` trips.
    pub fn run_with(
        &self,
        text: &str,
        lang: &str,
        config: &PipelineConfig,
        cancel: &CancelToken,
    ) -> Result<Vec<OutputNode>> {
        config.validate()?;
        let started = Instant::now();

        cancel.check("tokenize")?;
        let (counts, order) = count_words(self.tokenizer.tokenize(text, lang)?);
        log::debug!("tokenized: {} distinct words", order.len());

        cancel.check("lookup")?;
        let records = self.lookup(&order, &counts, lang, config)?;

        cancel.check("weighting")?;
        let words = self.weigh(records, &counts, config)?;

        cancel.check("graph")?;
        let graph = knn_graph_with_metric(words, config.k, &config.metric)?;

        cancel.check("cluster")?;
        let dendrogram = Louvain::new()
            .with_resolution(config.resolution)
            .with_seed(config.seed)
            .dendrogram(&graph)?;

        cancel.check("serialize")?;
        let nodes = serialize_dendrogram(&graph, &dendrogram)?;

        log::debug!(
            "pipeline: {} words, {} edges, {} levels, {} output nodes in {:?}",
            graph.node_count(),
            graph.edge_count(),
            dendrogram.n_levels(),
            nodes.len(),
            started.elapsed()
        );
        Ok(nodes)
    }

    /// Keep words the store can embed (and, when the weighting needs it,
    /// that have a corpus frequency), in first-occurrence order.
    fn lookup(
        &self,
        order: &[String],
        counts: &std::collections::HashMap<String, u32>,
        lang: &str,
        config: &PipelineConfig,
    ) -> Result<Vec<WordRecord>> {
        let words: Vec<&str> = order.iter().map(String::as_str).collect();
        let mut vectors = self.store.vectors_for(&words, lang)?;
        let frequencies = self.store.frequency_for(&words, lang)?;
        let needs_frequency = config.weighting.needs_frequency();

        let mut records = Vec::with_capacity(vectors.len());
        for word in order {
            let Some(embedding) = vectors.remove(word) else {
                log::trace!("dropping '{word}': no embedding");
                continue;
            };
            let corpus_frequency = frequencies.get(word).copied();
            if needs_frequency && corpus_frequency.is_none() {
                log::trace!("dropping '{word}': no corpus frequency");
                continue;
            }
            records.push(WordRecord {
                word: word.clone(),
                in_doc_count: counts.get(word).copied().unwrap_or(0),
                corpus_frequency,
                embedding,
            });
        }
        log::debug!("lookup: {} of {} words usable", records.len(), order.len());
        Ok(records)
    }

    fn weigh(
        &self,
        records: Vec<WordRecord>,
        counts: &std::collections::HashMap<String, u32>,
        config: &PipelineConfig,
    ) -> Result<Vec<WeightedWord>> {
        let frequencies: std::collections::HashMap<String, u64> = records
            .iter()
            .filter_map(|r| r.corpus_frequency.map(|f| (r.word.clone(), f)))
            .collect();
        let weighting = Weighting::new(config.weighting, counts, Some(&frequencies))?;

        let weighted = records
            .into_iter()
            .map(|record| {
                let weight = weighting.weight(&record.word)?;
                Ok(WeightedWord::new(record, weight))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(top_weighted(weighted, config.max_words))
    }
}
