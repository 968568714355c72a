use log::debug;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleNode {
    pub path: PathBuf,
    /// `None` for the entry script, which never receives a slot.
    pub id: Option<usize>,
}

/// Require edges between scripts, labelled with the line of the requiring call.
#[derive(Debug, Default)]
pub struct RequireGraph {
    graph: DiGraph<ModuleNode, usize>,
    node_indices: FxHashMap<PathBuf, NodeIndex>,
}

impl RequireGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module to the graph, returning the existing node if the path is known
    pub fn add_module(&mut self, path: &Path, id: Option<usize>) -> NodeIndex {
        if let Some(&index) = self.node_indices.get(path) {
            return index;
        }
        let index = self.graph.add_node(ModuleNode {
            path: path.to_path_buf(),
            id,
        });
        self.node_indices.insert(path.to_path_buf(), index);
        index
    }

    /// Record that `from` requires `to`. Both must already be in the graph.
    pub fn add_require(&mut self, from: &Path, to: &Path, line: usize) {
        let (Some(&from_index), Some(&to_index)) =
            (self.node_indices.get(from), self.node_indices.get(to))
        else {
            debug!("Ignoring require edge with unknown endpoint: {:?} -> {:?}", from, to);
            return;
        };
        if !self.graph.contains_edge(from_index, to_index) {
            self.graph.add_edge(from_index, to_index, line);
        }
    }

    pub fn module_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn require_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Direct requires of `path`, in the order they were first seen.
    pub fn requires_of(&self, path: &Path) -> Vec<&Path> {
        let Some(&index) = self.node_indices.get(path) else {
            return Vec::new();
        };
        // petgraph yields the most recently added edge first
        let mut targets: Vec<&Path> = self
            .graph
            .neighbors(index)
            .map(|neighbor| self.graph[neighbor].path.as_path())
            .collect();
        targets.reverse();
        targets
    }

    /// Groups of scripts that require each other, directly or transitively.
    /// Each group is sorted by path; groups are sorted by their first path.
    pub fn cycles(&self) -> Vec<Vec<PathBuf>> {
        let mut cycles: Vec<Vec<PathBuf>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|&node| self.graph.contains_edge(node, node))
            })
            .map(|component| {
                let mut paths: Vec<PathBuf> = component
                    .into_iter()
                    .map(|node| self.graph[node].path.clone())
                    .collect();
                paths.sort();
                paths
            })
            .collect();
        cycles.sort();
        cycles
    }

    pub fn log_cycles(&self) {
        for cycle in self.cycles() {
            debug!(
                "Require cycle between {} scripts, resolved lazily at run time: {:?}",
                cycle.len(),
                cycle
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn path(name: &str) -> PathBuf {
        PathBuf::from(format!("/project/{name}.lua"))
    }

    #[test]
    fn test_duplicate_modules_and_edges_collapse() {
        let mut graph = RequireGraph::new();
        let main = graph.add_module(&path("main"), None);
        graph.add_module(&path("a"), Some(1));
        assert_eq!(graph.add_module(&path("main"), None), main);

        graph.add_require(&path("main"), &path("a"), 1);
        graph.add_require(&path("main"), &path("a"), 7);
        graph.add_require(&path("main"), &path("unknown"), 9);

        assert_eq!(graph.module_count(), 2);
        assert_eq!(graph.require_count(), 1);
        assert!(graph.cycles().is_empty());
    }

    #[test]
    fn test_requires_keep_discovery_order() {
        let mut graph = RequireGraph::new();
        for (name, id) in [("main", None), ("b", Some(1)), ("a", Some(2))] {
            graph.add_module(&path(name), id);
        }
        graph.add_require(&path("main"), &path("b"), 1);
        graph.add_require(&path("main"), &path("a"), 2);

        assert_eq!(
            graph.requires_of(&path("main")),
            vec![path("b").as_path(), path("a").as_path()]
        );
        assert!(graph.requires_of(&path("a")).is_empty());
    }

    #[test]
    fn test_cycles_are_reported() {
        let mut graph = RequireGraph::new();
        for (name, id) in [("main", None), ("a", Some(1)), ("b", Some(2)), ("c", Some(3))] {
            graph.add_module(&path(name), id);
        }
        graph.add_require(&path("main"), &path("a"), 1);
        graph.add_require(&path("a"), &path("b"), 1);
        graph.add_require(&path("b"), &path("a"), 1);
        graph.add_require(&path("c"), &path("c"), 1);

        assert_eq!(
            graph.cycles(),
            vec![vec![path("a"), path("b")], vec![path("c")]]
        );
    }
}
