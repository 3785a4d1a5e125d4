//! Test scope tree.
//!
//! Suites and tests form a tree rooted at an unnamed-by-convention root
//! suite. A suite declared with [`ScopeTree::group`] owns one transaction
//! shared by everything beneath it.

use std::fmt;

/// Label of the implicit outermost suite. Never part of a breadcrumb.
pub const ROOT_SCOPE_NAME: &str = "ROOT";

/// Separator used when joining breadcrumb fragments.
pub const BREADCRUMB_SEPARATOR: &str = " > ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Suite,
    Test,
}

#[derive(Debug, Clone)]
pub struct ScopeNode {
    pub name: String,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// Set for suites declared with [`ScopeTree::group`].
    pub grouped: bool,
}

#[derive(Debug, Clone)]
pub struct ScopeTree {
    nodes: Vec<ScopeNode>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![ScopeNode {
                name: ROOT_SCOPE_NAME.to_string(),
                kind: ScopeKind::Suite,
                parent: None,
                grouped: false,
            }],
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Declare a plain suite. It does not own a transaction.
    pub fn describe(&mut self, parent: ScopeId, name: impl Into<String>) -> ScopeId {
        self.push(parent, name.into(), ScopeKind::Suite, false)
    }

    /// Declare a grouped suite: one transaction spans all of its children.
    pub fn group(&mut self, parent: ScopeId, name: impl Into<String>) -> ScopeId {
        self.push(parent, name.into(), ScopeKind::Suite, true)
    }

    pub fn test(&mut self, parent: ScopeId, name: impl Into<String>) -> ScopeId {
        self.push(parent, name.into(), ScopeKind::Test, false)
    }

    fn push(&mut self, parent: ScopeId, name: String, kind: ScopeKind, grouped: bool) -> ScopeId {
        debug_assert!(parent.0 < self.nodes.len(), "unknown parent scope {parent}");
        self.nodes.push(ScopeNode {
            name,
            kind,
            parent: Some(parent),
            grouped,
        });
        ScopeId(self.nodes.len() - 1)
    }

    /// Look up a node. Ids are only handed out by this tree, so a foreign id
    /// is a caller bug.
    pub fn node(&self, id: ScopeId) -> &ScopeNode {
        &self.nodes[id.0]
    }

    pub fn name(&self, id: ScopeId) -> &str {
        &self.node(id).name
    }

    /// Parent links from `id` upwards, excluding `id` itself.
    pub fn ancestors(&self, id: ScopeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.node(id).parent,
        }
    }

    /// Whether some ancestor of `id` is a grouped suite.
    ///
    /// The grouped suite itself is not "inside" a group: it opens the shared
    /// transaction that its descendants reuse.
    pub fn is_grouped(&self, id: ScopeId) -> bool {
        self.ancestors(id).any(|ancestor| self.node(ancestor).grouped)
    }

    /// Hierarchical name for log lines: the test path, then every suite from
    /// the outermost inwards (the root is omitted), then the scope itself.
    pub fn breadcrumb(&self, test_path: &str, id: ScopeId) -> String {
        let mut fragments: Vec<&str> = self
            .ancestors(id)
            .filter(|ancestor| *ancestor != self.root())
            .map(|ancestor| self.name(ancestor))
            .collect();
        fragments.reverse();
        if id != self.root() {
            fragments.push(self.name(id));
        }

        let mut parts = Vec::with_capacity(fragments.len() + 1);
        if !test_path.is_empty() {
            parts.push(test_path);
        }
        parts.extend(fragments);
        parts.join(BREADCRUMB_SEPARATOR)
    }
}

pub struct Ancestors<'a> {
    tree: &'a ScopeTree,
    next: Option<ScopeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = ScopeId;

    fn next(&mut self) -> Option<ScopeId> {
        let current = self.next?;
        self.next = self.tree.node(current).parent;
        Some(current)
    }
}
