//! # wordtier
//!
//! Hierarchical word clusters from free text: weight the words, link each to
//! its nearest neighbors in embedding space, and run multilevel Louvain to get
//! a dendrogram that renders as a zoomable word cloud.
//!
//! The library core (weighting, graph building, community detection,
//! serialization) is synchronous and dependency-light. The HTTP transport is
//! opt-in via the `server` feature; the `wordtier` binary needs `cli`.
//!
//! ```rust
//! use wordtier::{InMemoryStore, Pipeline, PipelineConfig, SimpleTokenizer, WeightingMode};
//!
//! let store = InMemoryStore::new()
//!     .with_word("en", "cat", vec![1.0, 0.0], None).unwrap()
//!     .with_word("en", "dog", vec![0.9, 0.1], None).unwrap()
//!     .with_word("en", "bird", vec![0.0, 1.0], None).unwrap();
//! let pipeline = Pipeline::new(SimpleTokenizer::new(), store);
//! let config = PipelineConfig::default()
//!     .with_weighting(WeightingMode::RawCount)
//!     .with_k(1);
//!
//! let nodes = pipeline.run("cat dog dog bird bird bird", "en", &config).unwrap();
//! assert_eq!(nodes.iter().filter(|n| n.is_root()).count(), 1);
//! ```

pub mod community;
pub mod config;
pub mod distance;
pub mod embedding;
/// Error types used across `wordtier`.
pub mod error;
pub mod hierarchy;
pub mod pipeline;
#[cfg(feature = "server")]
pub mod server;
pub mod text;
pub mod weighting;
pub mod word;

pub use community::{knn_graph, knn_graph_with_metric, CommunityDetection, Louvain, WordGraph};
pub use config::PipelineConfig;
pub use distance::{DistanceMetric, Metric};
pub use embedding::{EmbeddingStore, InMemoryStore};
pub use error::{Error, ErrorKind, Result};
pub use hierarchy::{serialize_dendrogram, validate_forest, Dendrogram, OutputNode, Partition};
pub use pipeline::{CancelToken, Pipeline};
pub use text::{SimpleTokenizer, Tokenizer};
pub use weighting::{Weighting, WeightingMode};
pub use word::{WeightedWord, WordRecord};
