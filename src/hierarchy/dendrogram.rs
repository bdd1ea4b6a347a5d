//! Multi-level partitions produced by community detection.
//!
//! A dendrogram here is a stack of partitions rather than a merge history:
//! level 0 maps graph nodes to communities, level 1 maps those communities to
//! coarser communities, and so on. The last level is a synthetic collapse of
//! every surviving community into a single root.
//!
//! ```text
//! level 2 (root):         0
//!                       /   \
//! level 1:             0     1
//!                     / \    |
//! level 0:           0   1   2
//!                   /|\  |  / \
//! graph nodes:     0 1 2 3  4  5
//! ```
//!
//! Ids are dense per level: a partition over `n` nodes with `c` communities
//! maps `0..n` onto exactly `0..c`.

use serde::Serialize;
use std::collections::HashMap;

/// One dendrogram level: node id -> community id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Partition {
    parents: Vec<usize>,
}

impl Partition {
    /// Build from raw labels, renumbering communities densely by first
    /// appearance in node order. Labels may be any `usize`.
    pub fn from_labels(labels: &[usize]) -> Self {
        let mut dense: HashMap<usize, usize> = HashMap::with_capacity(labels.len());
        let parents = labels
            .iter()
            .map(|&label| {
                let next = dense.len();
                *dense.entry(label).or_insert(next)
            })
            .collect();
        Self { parents }
    }

    /// Every node in its own community.
    pub fn identity(n: usize) -> Self {
        Self {
            parents: (0..n).collect(),
        }
    }

    /// Every node in community 0.
    pub fn collapse(n: usize) -> Self {
        Self {
            parents: vec![0; n],
        }
    }

    /// Community of `node`.
    pub fn parent(&self, node: usize) -> Option<usize> {
        self.parents.get(node).copied()
    }

    /// Number of nodes at this level.
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    /// Whether the partition covers no nodes.
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Number of distinct communities.
    pub fn n_communities(&self) -> usize {
        self.parents.iter().max().map_or(0, |&max| max + 1)
    }

    /// `(node, community)` pairs in node order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.parents.iter().copied().enumerate()
    }

    /// Community labels indexed by node.
    pub fn as_slice(&self) -> &[usize] {
        &self.parents
    }

    /// Members of each community, in node order.
    pub fn members(&self) -> Vec<Vec<usize>> {
        let mut groups = vec![Vec::new(); self.n_communities()];
        for (node, comm) in self.iter() {
            groups[comm].push(node);
        }
        groups
    }
}

/// Ordered partitions, finest first, ending in the root collapse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dendrogram {
    levels: Vec<Partition>,
}

impl Dendrogram {
    /// Wrap a list of levels.
    ///
    /// Callers are expected to chain levels: level `i + 1` has one entry per
    /// community of level `i`.
    pub fn new(levels: Vec<Partition>) -> Self {
        Self { levels }
    }

    /// Append the synthetic level mapping every top community to root 0.
    ///
    /// With no levels at all the dendrogram describes a single node, which
    /// maps straight to the root.
    pub(crate) fn close_with_root(mut self) -> Self {
        let top = self.levels.last().map_or(1, Partition::n_communities);
        self.levels.push(Partition::collapse(top));
        self
    }

    /// All levels.
    pub fn levels(&self) -> &[Partition] {
        &self.levels
    }

    /// Level `i`.
    pub fn level(&self, i: usize) -> Option<&Partition> {
        self.levels.get(i)
    }

    /// Number of levels, including the root collapse.
    pub fn n_levels(&self) -> usize {
        self.levels.len()
    }

    /// Number of original graph nodes.
    pub fn n_leaves(&self) -> usize {
        self.levels.first().map_or(0, Partition::len)
    }

    /// Communities just below the root.
    pub fn top_level_communities(&self) -> usize {
        self.levels.last().map_or(0, Partition::len)
    }

    /// Community of every original node at `level`.
    ///
    /// Level 0 is the first partition; higher levels compose the partitions
    /// above it. Returns `None` past the last level.
    pub fn partition_at_level(&self, level: usize) -> Option<Vec<usize>> {
        let first = self.levels.first()?;
        if level >= self.levels.len() {
            return None;
        }
        let mut labels = first.as_slice().to_vec();
        for partition in &self.levels[1..=level] {
            for label in labels.iter_mut() {
                *label = partition.parent(*label)?;
            }
        }
        Some(labels)
    }

    /// Coarsest non-trivial partition of the original nodes (the level just
    /// below the root collapse).
    pub fn best_partition(&self) -> Vec<usize> {
        let level = self.levels.len().saturating_sub(2);
        self.partition_at_level(level).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_labels_renumbers_by_first_appearance() {
        let p = Partition::from_labels(&[5, 5, 2, 9, 2]);
        assert_eq!(p.as_slice(), &[0, 0, 1, 2, 1]);
        assert_eq!(p.n_communities(), 3);
        assert_eq!(p.members(), vec![vec![0, 1], vec![2, 4], vec![3]]);
    }

    #[test]
    fn test_from_labels_accepts_sparse_labels() {
        let p = Partition::from_labels(&[usize::MAX, 1 << 40, usize::MAX, 3]);
        assert_eq!(p.as_slice(), &[0, 1, 0, 2]);
        assert_eq!(p.n_communities(), 3);
    }

    #[test]
    fn test_identity_and_collapse() {
        assert_eq!(Partition::identity(3).as_slice(), &[0, 1, 2]);
        assert_eq!(Partition::collapse(3).as_slice(), &[0, 0, 0]);
        assert_eq!(Partition::collapse(0).n_communities(), 0);
    }

    #[test]
    fn test_partition_at_level() {
        let d = Dendrogram::new(vec![
            Partition::from_labels(&[0, 0, 1, 1, 2, 2]),
            Partition::from_labels(&[0, 0, 1]),
        ])
        .close_with_root();

        assert_eq!(d.n_levels(), 3);
        assert_eq!(d.n_leaves(), 6);
        assert_eq!(d.top_level_communities(), 2);
        assert_eq!(d.partition_at_level(0).unwrap(), vec![0, 0, 1, 1, 2, 2]);
        assert_eq!(d.partition_at_level(1).unwrap(), vec![0, 0, 0, 0, 1, 1]);
        assert_eq!(d.partition_at_level(2).unwrap(), vec![0; 6]);
        assert!(d.partition_at_level(3).is_none());
        assert_eq!(d.best_partition(), vec![0, 0, 0, 0, 1, 1]);
    }

    #[test]
    fn test_close_with_root_on_empty() {
        let d = Dendrogram::new(Vec::new()).close_with_root();
        assert_eq!(d.levels(), &[Partition::collapse(1)]);
    }
}
