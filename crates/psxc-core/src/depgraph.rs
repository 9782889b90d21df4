// Copyright (c) psxc contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Computes a valid compilation order across files and surfaces
//! circular dependencies with explicit cycle paths (§4.5).
//!
//! Built once by a single coordinator thread before any per-file
//! worker starts (§5); read-only afterwards.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::ast::{ImportFromStmt, ImportStmt, Module, Stmt};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DependencyError {
    #[error("{from} already depends on a module at the same path as itself")]
    SelfImport { from: PathBuf },

    #[error("add_edge: endpoint not registered via add_file: {path}")]
    UnknownEndpoint { path: PathBuf },

    #[error("circular dependency: {}", format_cycle(.cycle))]
    Circular { cycle: Vec<PathBuf> },
}

impl DependencyError {
    pub fn code(&self) -> &'static str {
        match self {
            DependencyError::SelfImport { .. } => "E0401",
            DependencyError::UnknownEndpoint { .. } => "E0402",
            DependencyError::Circular { .. } => "E0403",
        }
    }
}

fn format_cycle(cycle: &[PathBuf]) -> String {
    cycle
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// One `import`/`from ... import ...` statement, resolved to the
/// absolute path of the file it names (resolution of a module name to
/// a path is left to the caller via `resolver`, since that mapping is
/// project-layout-specific, not something the graph itself decides).
#[derive(Debug, Clone)]
pub struct ExtractedImport {
    pub target: PathBuf,
    pub is_wildcard: bool,
    pub names: Vec<(String, Option<String>)>,
}

/// Resolves a dotted module name (and relative-import dot count) to an
/// absolute `.psx` file path, given the importing file's own path.
/// The dependency graph is agnostic to the resolution strategy; the
/// project coordinator supplies one grounded in its source root.
pub trait ModulePathResolver {
    fn resolve(&self, importer: &Path, dots: u32, module: Option<&str>) -> Option<PathBuf>;
}

/// Reads every `import`/`from` statement at a module's top level and
/// resolves each to a file path via `resolver`.
pub fn extract_imports(module: &Module, path: &Path, resolver: &dyn ModulePathResolver) -> Vec<ExtractedImport> {
    let mut imports = Vec::new();
    for stmt in &module.body {
        match stmt {
            Stmt::Import(i) => extract_plain_import(i, path, resolver, &mut imports),
            Stmt::ImportFrom(i) => extract_from_import(i, path, resolver, &mut imports),
            _ => {}
        }
    }
    imports
}

fn extract_plain_import(
    stmt: &ImportStmt,
    path: &Path,
    resolver: &dyn ModulePathResolver,
    out: &mut Vec<ExtractedImport>,
) {
    for alias in &stmt.names {
        if let Some(target) = resolver.resolve(path, 0, Some(&alias.name)) {
            out.push(ExtractedImport {
                target,
                is_wildcard: false,
                names: vec![(alias.name.clone(), alias.alias.clone())],
            });
        }
    }
}

fn extract_from_import(
    stmt: &ImportFromStmt,
    path: &Path,
    resolver: &dyn ModulePathResolver,
    out: &mut Vec<ExtractedImport>,
) {
    let Some(target) = resolver.resolve(path, stmt.dots, stmt.module.as_deref()) else {
        return;
    };
    let names = stmt
        .names
        .iter()
        .map(|a| (a.name.clone(), a.alias.clone()))
        .collect();
    out.push(ExtractedImport {
        target,
        is_wildcard: stmt.wildcard,
        names,
    });
}

#[derive(Debug, Default)]
struct Node {
    /// Outgoing edges: files this node depends on (imports).
    depends_on: Vec<PathBuf>,
}

/// The project's import graph: nodes are absolute file paths, edges
/// point from an importer to the file it imports.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    nodes: HashMap<PathBuf, Node>,
    /// Insertion order, so iteration that doesn't care about topology
    /// (e.g. listing all files) stays deterministic.
    order: Vec<PathBuf>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a file as a graph node. A module's parsed AST is not
    /// retained here — the graph only needs the path; callers hold the
    /// `Module` separately.
    pub fn add_file(&mut self, path: PathBuf) {
        if !self.nodes.contains_key(&path) {
            self.order.push(path.clone());
            self.nodes.insert(path, Node::default());
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.order
    }

    /// Adds a directed "from depends on to" edge. Both endpoints must
    /// already be registered via `add_file`; duplicate edges are
    /// no-ops.
    pub fn add_edge(&mut self, from: &Path, to: &Path) -> Result<(), DependencyError> {
        if !self.nodes.contains_key(to) {
            return Err(DependencyError::UnknownEndpoint { path: to.to_path_buf() });
        }
        let node = self
            .nodes
            .get_mut(from)
            .ok_or_else(|| DependencyError::UnknownEndpoint { path: from.to_path_buf() })?;
        if !node.depends_on.iter().any(|p| p == to) {
            node.depends_on.push(to.to_path_buf());
        }
        Ok(())
    }

    /// Kahn's algorithm over the "depends on" relation: a file can be
    /// compiled once every file it depends on has already been ordered.
    /// Ties among equally-ready files break lexicographically ascending
    /// by absolute path, for deterministic output (§4.5).
    pub fn compilation_order(&self) -> Result<Vec<PathBuf>, DependencyError> {
        let mut in_degree: HashMap<&Path, usize> = self
            .nodes
            .keys()
            .map(|p| (p.as_path(), self.nodes[p].depends_on.len()))
            .collect();

        // Predecessors: files that depend on a given node (the edges we
        // decrement as each dependency is satisfied).
        let mut dependents: HashMap<&Path, Vec<&Path>> = HashMap::new();
        for (from, node) in &self.nodes {
            for to in &node.depends_on {
                dependents.entry(to.as_path()).or_default().push(from.as_path());
            }
        }

        let mut ready: Vec<&Path> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(&p, _)| p)
            .collect();
        ready.sort();

        let mut order = Vec::with_capacity(self.nodes.len());
        let mut frontier = ready;
        while let Some(path) = frontier.pop() {
            order.push(path.to_path_buf());
            if let Some(preds) = dependents.get(path) {
                for &pred in preds {
                    let deg = in_degree.get_mut(pred).unwrap();
                    *deg -= 1;
                    if *deg == 0 {
                        let idx = frontier.partition_point(|p| *p > pred);
                        frontier.insert(idx, pred);
                    }
                }
            }
        }

        if order.len() < self.nodes.len() {
            let cycles = self.detect_cycles();
            let cycle = cycles.into_iter().next().unwrap_or_default();
            return Err(DependencyError::Circular { cycle });
        }

        Ok(order)
    }

    /// Depth-first search tracking a visited set and an on-stack set.
    /// Hitting an edge into an on-stack node closes a cycle from that
    /// node to the current one; a self-edge closes a length-2 cycle
    /// (the node, then itself again).
    pub fn detect_cycles(&self) -> Vec<Vec<PathBuf>> {
        let mut visited: HashSet<&Path> = HashSet::new();
        let mut cycles = Vec::new();

        let mut starts: Vec<&Path> = self.nodes.keys().map(PathBuf::as_path).collect();
        starts.sort();

        for start in starts {
            if !visited.contains(start) {
                let mut stack: Vec<&Path> = Vec::new();
                let mut on_stack: HashSet<&Path> = HashSet::new();
                self.dfs_cycles(start, &mut visited, &mut on_stack, &mut stack, &mut cycles);
            }
        }
        cycles
    }

    fn dfs_cycles<'a>(
        &'a self,
        node: &'a Path,
        visited: &mut HashSet<&'a Path>,
        on_stack: &mut HashSet<&'a Path>,
        stack: &mut Vec<&'a Path>,
        cycles: &mut Vec<Vec<PathBuf>>,
    ) {
        visited.insert(node);
        on_stack.insert(node);
        stack.push(node);

        if let Some(n) = self.nodes.get(node) {
            let mut deps: Vec<&Path> = n.depends_on.iter().map(PathBuf::as_path).collect();
            deps.sort();
            for dep in deps {
                if on_stack.contains(dep) {
                    let start_idx = stack.iter().position(|&p| p == dep).unwrap();
                    let mut cycle: Vec<PathBuf> = stack[start_idx..].iter().map(|p| p.to_path_buf()).collect();
                    cycle.push(dep.to_path_buf());
                    cycles.push(cycle);
                } else if !visited.contains(dep) {
                    self.dfs_cycles(dep, visited, on_stack, stack, cycles);
                }
            }
        }

        stack.pop();
        on_stack.remove(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> PathBuf {
        PathBuf::from(s)
    }

    #[test]
    fn linear_chain_orders_dependencies_first() {
        let mut g = DependencyGraph::new();
        g.add_file(p("/a.psx"));
        g.add_file(p("/b.psx"));
        g.add_file(p("/c.psx"));
        g.add_edge(&p("/b.psx"), &p("/a.psx")).unwrap();
        g.add_edge(&p("/c.psx"), &p("/b.psx")).unwrap();

        let order = g.compilation_order().unwrap();
        assert_eq!(order, vec![p("/a.psx"), p("/b.psx"), p("/c.psx")]);
    }

    #[test]
    fn diamond_places_base_before_both_branches_and_main_last() {
        let mut g = DependencyGraph::new();
        for f in ["/base.psx", "/a.psx", "/b.psx", "/main.psx"] {
            g.add_file(p(f));
        }
        g.add_edge(&p("/a.psx"), &p("/base.psx")).unwrap();
        g.add_edge(&p("/b.psx"), &p("/base.psx")).unwrap();
        g.add_edge(&p("/main.psx"), &p("/a.psx")).unwrap();
        g.add_edge(&p("/main.psx"), &p("/b.psx")).unwrap();

        let order = g.compilation_order().unwrap();
        let idx = |path: &str| order.iter().position(|x| x == &p(path)).unwrap();
        assert!(idx("/base.psx") < idx("/a.psx"));
        assert!(idx("/base.psx") < idx("/b.psx"));
        assert!(idx("/a.psx") < idx("/main.psx"));
        assert!(idx("/b.psx") < idx("/main.psx"));
    }

    #[test]
    fn two_file_cycle_is_detected_and_fails_ordering() {
        let mut g = DependencyGraph::new();
        g.add_file(p("/a.psx"));
        g.add_file(p("/b.psx"));
        g.add_edge(&p("/a.psx"), &p("/b.psx")).unwrap();
        g.add_edge(&p("/b.psx"), &p("/a.psx")).unwrap();

        let err = g.compilation_order().unwrap_err();
        assert!(matches!(err, DependencyError::Circular { .. }));
        assert!(err.to_string().contains("circular"));

        let cycles = g.detect_cycles();
        assert!(!cycles.is_empty());
        assert!(cycles[0].contains(&p("/a.psx")));
        assert!(cycles[0].contains(&p("/b.psx")));
    }

    #[test]
    fn self_edge_is_a_length_two_cycle() {
        let mut g = DependencyGraph::new();
        g.add_file(p("/a.psx"));
        g.add_edge(&p("/a.psx"), &p("/a.psx")).unwrap();

        let cycles = g.detect_cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0], vec![p("/a.psx"), p("/a.psx")]);
    }

    #[test]
    fn add_edge_rejects_unknown_endpoints() {
        let mut g = DependencyGraph::new();
        g.add_file(p("/a.psx"));
        assert!(matches!(
            g.add_edge(&p("/a.psx"), &p("/missing.psx")),
            Err(DependencyError::UnknownEndpoint { .. })
        ));
    }

    #[test]
    fn duplicate_edges_are_no_ops() {
        let mut g = DependencyGraph::new();
        g.add_file(p("/a.psx"));
        g.add_file(p("/b.psx"));
        g.add_edge(&p("/a.psx"), &p("/b.psx")).unwrap();
        g.add_edge(&p("/a.psx"), &p("/b.psx")).unwrap();
        assert_eq!(g.nodes.get(&p("/a.psx")).unwrap().depends_on.len(), 1);
    }

    #[test]
    fn ties_break_lexicographically() {
        let mut g = DependencyGraph::new();
        g.add_file(p("/z.psx"));
        g.add_file(p("/a.psx"));
        g.add_file(p("/m.psx"));
        let order = g.compilation_order().unwrap();
        assert_eq!(order, vec![p("/a.psx"), p("/m.psx"), p("/z.psx")]);
    }
}
