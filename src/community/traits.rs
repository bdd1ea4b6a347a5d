//! Community detection traits.

use crate::error::Result;
use crate::hierarchy::Dendrogram;
use petgraph::graph::UnGraph;

/// Trait for hierarchical community detection on weighted graphs.
pub trait CommunityDetection {
    /// Partition the graph at successive resolutions.
    ///
    /// The returned dendrogram always ends with a level that maps every
    /// remaining community to root 0.
    fn dendrogram<N>(&self, graph: &UnGraph<N, f64>) -> Result<Dendrogram>;

    /// Detect communities at the coarsest non-trivial level.
    ///
    /// Returns a mapping from node index to community ID.
    fn detect<N>(&self, graph: &UnGraph<N, f64>) -> Result<Vec<usize>> {
        Ok(self.dendrogram(graph)?.best_partition())
    }

    /// Get the resolution parameter (if applicable).
    fn resolution(&self) -> f64 {
        1.0
    }
}
