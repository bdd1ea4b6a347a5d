//! kNN similarity graph construction from embeddings.
//!
//! This module bridges word embeddings to community detection. Given a set of
//! embedded nodes, it constructs a graph where:
//! - Each embedding becomes a node (index order is preserved)
//! - Node `i` is linked to `j > i` when `j` is one of `i`'s k nearest neighbors
//! - Edge weights are the raw distances `D[i][j]`
//!
//! # The Neighbor Check
//!
//! ```text
//! for i < j:
//!     edge(i, j, D[i][j])  iff  j ∈ kNN(i)
//! ```
//!
//! Only row `i` is consulted. If `i ∈ kNN(j)` but `j ∉ kNN(i)` there is no
//! edge, and because only pairs with `i < j` are visited, a node's row can
//! contribute at most `k` edges. Nodes with no edge stay in the graph as
//! isolated nodes.
//!
//! # Neighbor Order
//!
//! Neighbors are ranked by distance ascending, ties to the lower node index,
//! so the graph is a deterministic function of the input order.
//!
//! # Performance Considerations
//!
//! Brute force: O(n²) distances, O(n² log n) ranking. Word clouds keep `n`
//! in the low hundreds, where this is cheaper than building an index.

use crate::distance::{pairwise_distances, DistanceMetric, Metric};
use crate::error::{Error, Result};
use crate::word::WeightedWord;
use ndarray::Array2;
use petgraph::graph::{NodeIndex, UnGraph};

/// Graph of weighted words; edge weight is the distance between embeddings.
pub type WordGraph = UnGraph<WeightedWord, f64>;

impl AsRef<[f32]> for WeightedWord {
    fn as_ref(&self) -> &[f32] {
        self.embedding()
    }
}

/// Build a kNN graph under cosine distance.
///
/// # Errors
///
/// See [`knn_graph_with_metric`].
pub fn knn_graph<N: AsRef<[f32]>>(nodes: Vec<N>, k: usize) -> Result<UnGraph<N, f64>> {
    knn_graph_with_metric(nodes, k, &Metric::Cosine)
}

/// Build a kNN graph under an arbitrary metric.
///
/// # Errors
///
/// - [`Error::InsufficientData`] with fewer than two nodes.
/// - [`Error::Configuration`] unless `1 <= k < n`.
/// - [`Error::DimensionMismatch`] when embeddings differ in length.
pub fn knn_graph_with_metric<N, M>(nodes: Vec<N>, k: usize, metric: &M) -> Result<UnGraph<N, f64>>
where
    N: AsRef<[f32]>,
    M: DistanceMetric + ?Sized,
{
    let n = nodes.len();
    if n < 2 {
        return Err(Error::insufficient(format!(
            "need at least 2 embedded words to build a graph, got {n}"
        )));
    }
    if k == 0 || k >= n {
        return Err(Error::config(
            "k",
            format!("neighbor count must satisfy 1 <= k < {n}, got {k}"),
        ));
    }

    let distances = {
        let vectors: Vec<&[f32]> = nodes.iter().map(|node| node.as_ref()).collect();
        pairwise_distances(&vectors, metric)?
    };
    let neighbors = nearest_neighbors(&distances, k);

    let mut graph = UnGraph::<N, f64>::with_capacity(n, n * k);
    let ids: Vec<NodeIndex> = nodes.into_iter().map(|node| graph.add_node(node)).collect();

    for (i, row) in neighbors.iter().enumerate() {
        let mut forward: Vec<usize> = row.iter().copied().filter(|&j| j > i).collect();
        forward.sort_unstable();
        for j in forward {
            let _ = graph.add_edge(ids[i], ids[j], distances[[i, j]]);
        }
    }

    log::debug!(
        "kNN graph: {} nodes, {} edges (k={})",
        graph.node_count(),
        graph.edge_count(),
        k
    );
    Ok(graph)
}

/// The `k` nearest neighbors of every row, closest first.
///
/// The diagonal is skipped; equal distances rank the lower index first.
pub fn nearest_neighbors(distances: &Array2<f64>, k: usize) -> Vec<Vec<usize>> {
    let n = distances.nrows();
    (0..n)
        .map(|i| {
            let mut candidates: Vec<usize> = (0..n).filter(|&j| j != i).collect();
            candidates.sort_by(|&a, &b| {
                distances[[i, a]]
                    .total_cmp(&distances[[i, b]])
                    .then(a.cmp(&b))
            });
            candidates.truncate(k);
            candidates
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::visit::EdgeRef;
    use proptest::prelude::*;

    fn edge_list<N>(graph: &UnGraph<N, f64>) -> Vec<(usize, usize)> {
        let mut edges: Vec<(usize, usize)> = graph
            .edge_references()
            .map(|e| {
                let (a, b) = (e.source().index(), e.target().index());
                (a.min(b), a.max(b))
            })
            .collect();
        edges.sort_unstable();
        edges
    }

    #[test]
    fn test_knn_graph_basic() {
        let embeddings: Vec<Vec<f32>> = vec![
            // Cluster 1
            vec![1.0, 0.0, 0.0],
            vec![0.9, 0.1, 0.0],
            vec![0.95, 0.05, 0.0],
            // Cluster 2
            vec![0.0, 1.0, 0.0],
            vec![0.1, 0.9, 0.0],
            vec![0.05, 0.95, 0.0],
        ];

        let graph = knn_graph(embeddings, 2).unwrap();
        assert_eq!(graph.node_count(), 6);

        // No edge crosses between the two clusters.
        for (a, b) in edge_list(&graph) {
            assert_eq!(a < 3, b < 3, "edge ({a}, {b}) crosses clusters");
        }
    }

    #[test]
    fn test_only_row_owner_neighbors_make_edges() {
        // On a line: 0 at 0.0, 1 at 1.0, 2 at 10.0, 3 at 10.5.
        // kNN(1) = {0}, kNN(2) = {3}; kNN(0) = {1}.
        // Pair (1, 2): 2 is not 1's neighbor -> no edge even though
        // nothing else constrains it.
        let points: Vec<Vec<f32>> = vec![vec![0.0], vec![1.0], vec![10.0], vec![10.5]];
        let graph = knn_graph_with_metric(points, 1, &Metric::Euclidean).unwrap();
        assert_eq!(edge_list(&graph), vec![(0, 1), (2, 3)]);
    }

    #[test]
    fn test_asymmetric_neighbor_check() {
        // kNN(0) = {1}, kNN(2) = {1}: the pair (1, 2) is only looked at from
        // row 1, and kNN(1) = {0}, so (1, 2) gets no edge.
        let points: Vec<Vec<f32>> = vec![vec![0.0], vec![1.0], vec![2.5]];
        let graph = knn_graph_with_metric(points, 1, &Metric::Euclidean).unwrap();
        assert_eq!(edge_list(&graph), vec![(0, 1)]);
        assert_eq!(graph.neighbors(NodeIndex::new(2)).count(), 0);
    }

    #[test]
    fn test_edge_weight_is_distance() {
        let points: Vec<Vec<f32>> = vec![vec![0.0, 0.0], vec![3.0, 4.0]];
        let graph = knn_graph_with_metric(points, 1, &Metric::Euclidean).unwrap();
        let edge = graph.edge_references().next().unwrap();
        assert!((*edge.weight() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_neighbor_ties_prefer_lower_index() {
        let mut d = Array2::<f64>::zeros((3, 3));
        for (i, j) in [(0, 1), (0, 2), (1, 2)] {
            d[[i, j]] = 1.0;
            d[[j, i]] = 1.0;
        }
        let nn = nearest_neighbors(&d, 1);
        assert_eq!(nn, vec![vec![1], vec![0], vec![0]]);
    }

    #[test]
    fn test_knn_graph_too_few_nodes() {
        let err = knn_graph(vec![vec![1.0f32, 0.0]], 1).unwrap_err();
        assert!(matches!(err, Error::InsufficientData(_)));
        let err = knn_graph(Vec::<Vec<f32>>::new(), 1).unwrap_err();
        assert!(matches!(err, Error::InsufficientData(_)));
    }

    #[test]
    fn test_knn_graph_invalid_k() {
        let points = vec![vec![1.0f32, 0.0], vec![0.0, 1.0]];
        assert!(matches!(
            knn_graph(points.clone(), 0),
            Err(Error::Configuration { name: "k", .. })
        ));
        assert!(matches!(
            knn_graph(points, 2),
            Err(Error::Configuration { name: "k", .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_row_owner_edges_bounded_by_k(
            points in proptest::collection::vec(
                proptest::collection::vec(-5.0f32..5.0, 3),
                2..20,
            ),
            k_seed in 1usize..8,
        ) {
            let n = points.len();
            let k = 1 + k_seed % (n - 1);
            let graph = knn_graph(points, k).unwrap();
            let mut owned = vec![0usize; n];
            for (a, b) in edge_list(&graph) {
                prop_assert!(a != b);
                owned[a] += 1;
            }
            prop_assert!(owned.iter().all(|&c| c <= k));
            // At most one edge per unordered pair.
            let edges = edge_list(&graph);
            let mut dedup = edges.clone();
            dedup.dedup();
            prop_assert_eq!(edges.len(), dedup.len());
        }
    }
}
