//! Flattening a dendrogram into a parent-pointer forest.
//!
//! Every dendrogram entry `(local, parent)` at level `i` becomes one node
//! `"{i}-{local}"` pointing at `"{i+1}-{parent}"`. A final `"{levels}-0"` node
//! with no parent closes the tree. Level 0 nodes are the words and carry their
//! text and weight.

use crate::error::{Error, Result};
use crate::hierarchy::Dendrogram;
use crate::word::WeightedWord;
use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};

/// Something that can label a leaf of the output tree.
pub trait Leaf {
    /// Text shown for the leaf.
    fn label(&self) -> &str;
    /// Importance of the leaf.
    fn weight(&self) -> f64;
}

impl Leaf for WeightedWord {
    fn label(&self) -> &str {
        self.word()
    }

    fn weight(&self) -> f64 {
        self.weight
    }
}

/// One node of the serialized tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputNode {
    /// `"{level}-{localId}"`.
    pub id: String,
    /// Parent id; `None` only for the root.
    pub parent_id: Option<String>,
    /// Word text (leaves only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word: Option<String>,
    /// Word weight (leaves only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl OutputNode {
    /// Whether this is the root.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Level parsed from the id, if well formed.
    pub fn level(&self) -> Option<usize> {
        parse_id(&self.id).map(|(level, _)| level)
    }
}

/// Format a node id.
pub fn node_id(level: usize, local: usize) -> String {
    format!("{level}-{local}")
}

/// Split `"{level}-{local}"`.
pub fn parse_id(id: &str) -> Option<(usize, usize)> {
    let (level, local) = id.split_once('-')?;
    Some((level.parse().ok()?, local.parse().ok()?))
}

/// Serialize `dendrogram` over `graph` into a flat forest with one root.
///
/// Nodes are emitted level by level, in local-id order, followed by the root.
///
/// # Errors
///
/// [`Error::Configuration`] if the dendrogram's leaves do not match the graph.
pub fn serialize_dendrogram<N: Leaf>(
    graph: &UnGraph<N, f64>,
    dendrogram: &Dendrogram,
) -> Result<Vec<OutputNode>> {
    if dendrogram.n_leaves() != graph.node_count() {
        return Err(Error::config(
            "dendrogram",
            format!(
                "dendrogram covers {} leaves but graph has {} nodes",
                dendrogram.n_leaves(),
                graph.node_count()
            ),
        ));
    }

    let total: usize = dendrogram.levels().iter().map(|p| p.len()).sum();
    let mut nodes = Vec::with_capacity(total + 1);

    for (level, partition) in dendrogram.levels().iter().enumerate() {
        for (local, parent) in partition.iter() {
            let mut node = OutputNode {
                id: node_id(level, local),
                parent_id: Some(node_id(level + 1, parent)),
                word: None,
                weight: None,
            };
            if level == 0 {
                let leaf = graph.node_weight(NodeIndex::new(local)).ok_or_else(|| {
                    Error::config("dendrogram", format!("leaf {local} is not a graph node"))
                })?;
                node.word = Some(leaf.label().to_string());
                node.weight = Some(leaf.weight());
            }
            nodes.push(node);
        }
    }

    nodes.push(OutputNode {
        id: node_id(dendrogram.n_levels(), 0),
        parent_id: None,
        word: None,
        weight: None,
    });
    Ok(nodes)
}
