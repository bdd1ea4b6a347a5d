//! Similarity graphs and community detection.
//!
//! Given embedded words, build a graph linking each word to its nearest
//! neighbors, then find natural groupings where nodes within groups are
//! densely connected and connections between groups are sparse.
//!
//! ## Objective
//!
//! Louvain maximizes modularity: the weight inside communities minus what a
//! random graph with the same weighted degrees would put there.
//!
//! ```text
//! Q = Σ_c [ in_c / m − γ · (tot_c / 2m)² ]
//! ```
//!
//! `m` is the total edge weight, `in_c` the weight inside community `c`,
//! `tot_c` the summed degree of its members and `γ` the resolution. Raising
//! `γ` yields more, smaller word groups; lowering it merges topics sooner.
//!
//! Edge weights are taken as similarities by the objective. The kNN graph
//! stores distances there, so among a word's k nearest neighbors the
//! farther ones pull harder. Only the neighbor selection is distance-aware.
//!
//! ## Usage
//!
//! ```rust
//! use wordtier::community::{knn_graph, CommunityDetection, Louvain};
//!
//! let embeddings: Vec<Vec<f32>> = vec![
//!     vec![1.0, 0.0],
//!     vec![0.9, 0.1],
//!     vec![0.0, 1.0],
//!     vec![0.1, 0.9],
//! ];
//! let graph = knn_graph(embeddings, 1).unwrap();
//! let dendrogram = Louvain::new().dendrogram(&graph).unwrap();
//! assert_eq!(dendrogram.n_leaves(), 4);
//! ```
//!
//! ## References
//!
//! - Blondel et al. (2008). "Fast unfolding of communities in large networks."

mod knn_graph;
mod louvain;
mod traits;

pub use knn_graph::{knn_graph, knn_graph_with_metric, nearest_neighbors, WordGraph};
pub use louvain::Louvain;
pub use traits::CommunityDetection;
