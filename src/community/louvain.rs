//! Louvain algorithm for hierarchical community detection.
//!
//! Fast modularity optimization through local node moves and graph aggregation.
//!
//! ## The Algorithm (Blondel et al. 2008)
//!
//! Louvain is a multi-level, greedy modularity optimization algorithm:
//!
//! 1. **Phase 1 (Local Moving)**: Start with each node in its own community.
//!    Visit nodes in a fixed order and move each to the neighboring community
//!    with the highest positive modularity gain. Repeat passes until no node
//!    moves.
//!
//! 2. **Phase 2 (Aggregation)**: Build a meta-graph where communities become
//!    single nodes. Edge weights are sums of edges between communities.
//!    Internal edges become a self-loop weight: not a neighbor, but still
//!    counted in the node's degree and in the total weight.
//!
//! 3. **Iterate**: Repeat phases 1-2 on the meta-graph. Every level's
//!    partition is kept, which gives the dendrogram.
//!
//! ## Modularity Gain
//!
//! Moving isolated node i into community C changes modularity by
//! (up to the constant factor 1/m):
//!
//! ```text
//! ΔQ(i → C) = k_i,in(C) − γ · Σ_tot(C) · k_i / 2m
//! ```
//!
//! where `k_i,in(C)` is the weight from i into C and `Σ_tot(C)` the summed
//! degree of C without i. A node leaves its community only when some
//! neighbor community beats staying; equal gains go to the lowest id.
//!
//! ## Determinism
//!
//! Neighbor weights are accumulated in ordered maps and nodes are visited in
//! index order, so identical graphs give identical dendrograms. A seed
//! switches to a seeded shuffle of the visiting order, which is reproducible
//! for a fixed seed.
//!
//! ## References
//!
//! Blondel et al. (2008). "Fast unfolding of communities in large networks."
//! Journal of Statistical Mechanics: Theory and Experiment, P10008.

use super::traits::CommunityDetection;
use crate::error::{Error, Result};
use crate::hierarchy::{Dendrogram, Partition};
use petgraph::graph::UnGraph;
use petgraph::visit::EdgeRef;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

/// Louvain community detection algorithm.
#[derive(Debug, Clone)]
pub struct Louvain {
    /// Resolution parameter (gamma).
    resolution: f64,
    /// Maximum local-moving passes per level.
    max_passes: usize,
    /// Maximum levels of aggregation.
    max_levels: usize,
    /// Minimum modularity improvement for a new level to count.
    min_modularity_gain: f64,
    /// Shuffle seed for the node visiting order.
    seed: Option<u64>,
}

impl Louvain {
    /// Create a new Louvain detector with default settings.
    pub fn new() -> Self {
        Self {
            resolution: 1.0,
            max_passes: 100,
            max_levels: 10,
            min_modularity_gain: 1e-7,
            seed: None,
        }
    }

    /// Set resolution parameter.
    ///
    /// Higher values produce smaller communities.
    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    /// Set maximum local-moving passes per level.
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes.max(1);
        self
    }

    /// Set maximum aggregation levels (at least 1).
    pub fn with_max_levels(mut self, levels: usize) -> Self {
        self.max_levels = levels.max(1);
        self
    }

    /// Visit nodes in a seeded random order instead of index order.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Modularity of `communities` (node index -> community id) on `graph`.
    ///
    /// Labels are arbitrary; only which nodes share one matters.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] if the labels do not cover the graph or an
    /// edge weight is negative or not finite.
    pub fn modularity<N>(&self, graph: &UnGraph<N, f64>, communities: &[usize]) -> Result<f64> {
        if communities.len() != graph.node_count() {
            return Err(Error::config(
                "communities",
                format!(
                    "expected {} labels, got {}",
                    graph.node_count(),
                    communities.len()
                ),
            ));
        }
        let level = LevelGraph::from_graph(graph)?;
        let dense = Partition::from_labels(communities);
        Ok(self.modularity_weighted(&level, dense.as_slice()))
    }

    /// Q = Σ_c [ in_c / m − γ (tot_c / 2m)² ].
    fn modularity_weighted(&self, graph: &LevelGraph, communities: &[usize]) -> f64 {
        let m = graph.total_weight;
        if m <= 0.0 {
            return 0.0;
        }
        let n_comms = communities.iter().max().map_or(0, |&c| c + 1);
        let mut internal = vec![0.0; n_comms];
        let mut total = vec![0.0; n_comms];

        for (i, &ci) in communities.iter().enumerate() {
            total[ci] += graph.degrees[i];
            internal[ci] += graph.self_loops[i];
            for (&j, &w) in &graph.adjacency[i] {
                if j > i && communities[j] == ci {
                    internal[ci] += w;
                }
            }
        }

        internal
            .iter()
            .zip(&total)
            .map(|(&inc, &tot)| {
                let share = tot / (2.0 * m);
                inc / m - self.resolution * share * share
            })
            .sum()
    }

    /// Phase 1: Local moving on weighted graph.
    fn local_moving(&self, graph: &LevelGraph, order: &[usize]) -> Partition {
        let n = graph.len();
        let m = graph.total_weight;
        if m <= 0.0 {
            return Partition::identity(n);
        }
        let two_m = 2.0 * m;

        let mut communities: Vec<usize> = (0..n).collect();
        let mut community_degrees = graph.degrees.clone();

        for _pass in 0..self.max_passes {
            let mut improved = false;

            for &node in order {
                let current_community = communities[node];
                let ki = graph.degrees[node];

                // Find neighboring communities and their edge weights
                let mut community_weights: BTreeMap<usize, f64> = BTreeMap::new();
                for (&neighbor, &w) in &graph.adjacency[node] {
                    *community_weights
                        .entry(communities[neighbor])
                        .or_insert(0.0) += w;
                }

                // Temporarily remove node from community
                community_degrees[current_community] -= ki;

                let stay_in = community_weights
                    .get(&current_community)
                    .copied()
                    .unwrap_or(0.0);
                let mut best_community = current_community;
                let mut best_gain = stay_in
                    - self.resolution * community_degrees[current_community] * ki / two_m;

                for (&target_comm, &ki_in) in &community_weights {
                    if target_comm == current_community {
                        continue;
                    }
                    let sigma_tot = community_degrees[target_comm];
                    let gain = ki_in - self.resolution * sigma_tot * ki / two_m;
                    if gain > best_gain {
                        best_gain = gain;
                        best_community = target_comm;
                    }
                }

                community_degrees[best_community] += ki;
                if best_community != current_community {
                    communities[node] = best_community;
                    improved = true;
                }
            }

            if !improved {
                break;
            }
        }

        Partition::from_labels(&communities)
    }

    fn node_order(n: usize, rng: Option<&mut StdRng>) -> Vec<usize> {
        let mut order: Vec<usize> = (0..n).collect();
        if let Some(rng) = rng {
            order.shuffle(rng);
        }
        order
    }
}

impl Default for Louvain {
    fn default() -> Self {
        Self::new()
    }
}

impl CommunityDetection for Louvain {
    fn dendrogram<N>(&self, graph: &UnGraph<N, f64>) -> Result<Dendrogram> {
        let n = graph.node_count();
        if n == 0 {
            return Err(Error::insufficient("cannot cluster an empty graph"));
        }
        if n == 1 {
            return Ok(Dendrogram::new(Vec::new()).close_with_root());
        }

        let mut current = LevelGraph::from_graph(graph)?;
        let mut rng = self.seed.map(StdRng::seed_from_u64);
        let mut levels: Vec<Partition> = Vec::new();
        let mut prev_modularity = f64::NEG_INFINITY;

        for level in 0..self.max_levels {
            let order = Self::node_order(current.len(), rng.as_mut());
            let partition = self.local_moving(&current, &order);
            let n_communities = partition.n_communities();
            let modularity = self.modularity_weighted(&current, partition.as_slice());

            // Level 0 is always kept: it carries the leaves.
            if level > 0
                && (n_communities == current.len()
                    || modularity - prev_modularity < self.min_modularity_gain)
            {
                log::debug!("louvain: converged after {level} level(s)");
                break;
            }

            log::debug!(
                "louvain level {level}: {} nodes -> {n_communities} communities, Q = {modularity:.6}",
                current.len()
            );
            prev_modularity = modularity;

            let next = current.aggregate(&partition);
            levels.push(partition);
            if n_communities == 1 {
                break;
            }
            current = next;
        }

        Ok(Dendrogram::new(levels).close_with_root())
    }

    fn resolution(&self) -> f64 {
        self.resolution
    }
}

/// Weighted graph at one aggregation level.
#[derive(Debug, Clone)]
struct LevelGraph {
    /// Neighbor weights, self-loops excluded.
    adjacency: Vec<BTreeMap<usize, f64>>,
    /// Weight of internal edges folded into each node.
    self_loops: Vec<f64>,
    /// Weighted degree (self-loops count twice).
    degrees: Vec<f64>,
    /// Total edge weight m.
    total_weight: f64,
}

impl LevelGraph {
    fn from_graph<N>(graph: &UnGraph<N, f64>) -> Result<Self> {
        let n = graph.node_count();
        let mut adjacency: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); n];
        let mut self_loops = vec![0.0; n];

        for edge in graph.edge_references() {
            let w = *edge.weight();
            if !w.is_finite() || w < 0.0 {
                return Err(Error::config(
                    "edge weight",
                    format!("weights must be finite and non-negative, got {w}"),
                ));
            }
            let (i, j) = (edge.source().index(), edge.target().index());
            if i == j {
                self_loops[i] += w;
            } else {
                *adjacency[i].entry(j).or_insert(0.0) += w;
                *adjacency[j].entry(i).or_insert(0.0) += w;
            }
        }

        Ok(Self::from_parts(adjacency, self_loops))
    }

    fn from_parts(adjacency: Vec<BTreeMap<usize, f64>>, self_loops: Vec<f64>) -> Self {
        let degrees: Vec<f64> = adjacency
            .iter()
            .zip(&self_loops)
            .map(|(adj, &sl)| adj.values().sum::<f64>() + 2.0 * sl)
            .collect();
        let total_weight = degrees.iter().sum::<f64>() / 2.0;
        Self {
            adjacency,
            self_loops,
            degrees,
            total_weight,
        }
    }

    fn len(&self) -> usize {
        self.adjacency.len()
    }

    /// Phase 2: collapse each community into one node.
    fn aggregate(&self, partition: &Partition) -> Self {
        let n_new = partition.n_communities();
        let mut adjacency: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); n_new];
        let mut self_loops = vec![0.0; n_new];

        for (i, ci) in partition.iter() {
            self_loops[ci] += self.self_loops[i];
            for (&j, &w) in &self.adjacency[i] {
                if j <= i {
                    continue;
                }
                let cj = partition.as_slice()[j];
                if ci == cj {
                    self_loops[ci] += w;
                } else {
                    *adjacency[ci].entry(cj).or_insert(0.0) += w;
                    *adjacency[cj].entry(ci).or_insert(0.0) += w;
                }
            }
        }

        Self::from_parts(adjacency, self_loops)
    }
}
