//! Hierarchical structures for multi-resolution word clouds.
//!
//! # The Core Insight
//!
//! A word cloud can be read at several zoom levels:
//!
//! ```text
//! Zoom        │ What you see
//! ────────────┼──────────────────────────────
//! coarse      │ one blob: the whole document
//! medium      │ a handful of topics
//! fine        │ individual words
//! ```
//!
//! Community detection produces exactly this: a [`Dendrogram`] of partitions
//! where each level groups the communities of the level below. This module
//! holds the partition types and turns them into a flat parent-pointer tree
//! ([`OutputNode`]) that renderers consume directly.
//!
//! # Module Overview
//!
//! - [`Dendrogram`] / [`Partition`]: per-level node → community maps with
//!   dense ids, finest first, ending in a single root.
//! - [`serialize_dendrogram`]: the `"{level}-{local}"` id scheme, leaves
//!   labelled with word and weight.
//! - [`validate_forest`]: checks the single-root, no-dangling-parent and
//!   leaf-metadata invariants of a serialized tree.
//!
//! ```text
//! Level 2:             2-0            (root, parentId = null)
//!                     /    \
//! Level 1:         1-0      1-1
//!                 /   \       \
//! Level 0:      0-0   0-1     0-2     (words)
//! ```

mod dendrogram;
pub mod tree;
mod validate;

pub use dendrogram::{Dendrogram, Partition};
pub use tree::{node_id, parse_id, serialize_dendrogram, Leaf, OutputNode};
pub use validate::{validate_forest, Severity, ValidationIssue, ValidationReport};
