//! Forest validation for serialized trees.
//!
//! Checks that a flat list of [`OutputNode`]s is a well-formed tree:
//! - Ids are unique and of the form `"{level}-{local}"`
//! - Exactly one node has no parent
//! - Every parent id resolves, one level up
//! - Leaf metadata (`word`, `weight`) appears on level 0 and nowhere else
//! - Internal nodes have at least one child (warning only)
//!
//! Because each parent sits exactly one level above its child, parent chains
//! strictly climb levels and cannot cycle; with a single root and no dangling
//! parents, every node reaches the root.
//!
//! # Example
//!
//! ```rust,ignore
//! let nodes = pipeline.run(text, "en", &config)?;
//! let report = validate_forest(&nodes);
//! if !report.is_healthy() {
//!     eprintln!("{report}");
//! }
//! ```

use std::collections::{HashMap, HashSet};

use super::tree::{parse_id, OutputNode};

/// How bad a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Renderable, but probably not what the producer meant.
    Warning,
    /// The node list is not a single tree.
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// One finding, optionally tied to a node id.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    /// How bad it is.
    pub severity: Severity,
    /// What is wrong.
    pub message: String,
    /// Offending node, when there is one.
    pub node_id: Option<String>,
}

impl ValidationIssue {
    /// Finding not tied to a node.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            node_id: None,
        }
    }

    /// Attach the offending node id.
    pub fn with_node(mut self, id: impl Into<String>) -> Self {
        self.node_id = Some(id.into());
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.node_id {
            Some(id) => write!(f, "{}: node {id}: {}", self.severity, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// Everything [`validate_forest`] found, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Findings.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finding.
    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    fn node_issue(&mut self, severity: Severity, id: &str, message: impl Into<String>) {
        self.add(ValidationIssue::new(severity, message).with_node(id));
    }

    fn node_error(&mut self, id: &str, message: impl Into<String>) {
        self.node_issue(Severity::Error, id, message);
    }

    /// No errors (warnings allowed).
    pub fn is_healthy(&self) -> bool {
        self.count(Severity::Error) == 0
    }

    /// No findings at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Number of findings at `severity`.
    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_clean() {
            return f.write_str("tree ok");
        }
        writeln!(
            f,
            "tree has {} error(s), {} warning(s)",
            self.count(Severity::Error),
            self.count(Severity::Warning)
        )?;
        for issue in &self.issues {
            writeln!(f, "  {issue}")?;
        }
        Ok(())
    }
}

/// Validate that `nodes` form a single well-formed tree.
pub fn validate_forest(nodes: &[OutputNode]) -> ValidationReport {
    let mut report = ValidationReport::new();

    let mut levels: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
    let mut seen = HashSet::with_capacity(nodes.len());
    for node in nodes {
        if !seen.insert(node.id.as_str()) {
            report.node_error(&node.id, "duplicate id");
        }
        match parse_id(&node.id) {
            Some((level, _)) => {
                let _ = levels.insert(node.id.as_str(), level);
            }
            None => report.node_error(&node.id, "malformed id"),
        }
    }

    let roots: Vec<&OutputNode> = nodes.iter().filter(|n| n.is_root()).collect();
    match roots.len() {
        0 => report.add(ValidationIssue::new(Severity::Error, "no root node found")),
        1 => {}
        n => report.add(ValidationIssue::new(
            Severity::Error,
            format!("{n} root nodes found, expected exactly one"),
        )),
    }

    let parents: HashSet<&str> = nodes.iter().filter_map(|n| n.parent_id.as_deref()).collect();

    for node in nodes {
        let Some(&level) = levels.get(node.id.as_str()) else {
            continue;
        };
        if level > 0 && !parents.contains(node.id.as_str()) {
            report.node_issue(Severity::Warning, &node.id, "internal node has no children");
        }

        if let Some(parent) = &node.parent_id {
            match levels.get(parent.as_str()) {
                None => report.node_error(&node.id, format!("dangling parent '{parent}'")),
                Some(&parent_level) if parent_level != level + 1 => report.node_error(
                    &node.id,
                    format!("parent '{parent}' is at level {parent_level}, expected {}", level + 1),
                ),
                Some(_) => {}
            }
        }

        let is_leaf = level == 0 && !node.is_root();
        let has_word = node.word.is_some();
        let has_weight = node.weight.is_some();
        if is_leaf && !(has_word && has_weight) {
            report.node_error(&node.id, "leaf is missing word or weight");
        }
        if !is_leaf && (has_word || has_weight) {
            report.node_error(&node.id, "internal node carries leaf metadata");
        }
    }

    report
}
