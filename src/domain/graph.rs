//! Dependency graph for stacks
//!
//! Nodes are stacks keyed by hierarchical id, kept in input order. An edge
//! `dependency -> dependent` exists for every declared dependency whose
//! target is part of the graph. Uses petgraph for graph operations.
//!
//! Closures are computed with pure steps: each step takes a membership set
//! and returns a new, possibly larger one. Iterating until the set stops
//! changing yields the transitive closure.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction as EdgeDirection;
use std::collections::{BTreeSet, HashMap};

use super::stack::StackArtifact;

/// Which edges a closure follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards the stacks a selected stack depends on
    Upstream,
    /// Towards the stacks that depend on a selected stack
    Downstream,
}

/// A dependency graph over stacks
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// The underlying directed graph
    graph: DiGraph<String, ()>,

    /// Map from hierarchical id to node index
    node_map: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Builds a graph from stacks
    ///
    /// Dependencies on artifacts outside `stacks` and self-dependencies are
    /// ignored. Duplicate ids keep the first node.
    pub fn from_stacks<'a>(stacks: impl IntoIterator<Item = &'a StackArtifact>) -> Self {
        let mut graph = Self::default();

        let stacks: Vec<_> = stacks.into_iter().collect();
        for stack in &stacks {
            if !graph.node_map.contains_key(&stack.hierarchical_id) {
                let idx = graph.graph.add_node(stack.hierarchical_id.clone());
                graph.node_map.insert(stack.hierarchical_id.clone(), idx);
            }
        }

        for stack in &stacks {
            let Some(&dependent) = graph.node_map.get(&stack.hierarchical_id) else {
                continue;
            };
            for dep in &stack.dependencies {
                match graph.node_map.get(dep.target()) {
                    Some(&dependency) if dependency != dependent => {
                        graph.graph.update_edge(dependency, dependent, ());
                    }
                    _ => {}
                }
            }
        }

        graph
    }

    /// Direct neighbors of `id`, in input order
    fn neighbors(&self, id: &str, direction: EdgeDirection) -> Vec<&String> {
        let Some(&idx) = self.node_map.get(id) else {
            return vec![];
        };

        let mut indices: Vec<_> = self.graph.neighbors_directed(idx, direction).collect();
        indices.sort();
        indices.into_iter().map(|i| &self.graph[i]).collect()
    }

    /// One closure step: `selected` plus the direct neighbors in `direction`
    pub fn step(&self, selected: &BTreeSet<String>, direction: Direction) -> BTreeSet<String> {
        let edge_direction = match direction {
            Direction::Upstream => EdgeDirection::Incoming,
            Direction::Downstream => EdgeDirection::Outgoing,
        };

        let mut next = selected.clone();
        for id in selected {
            next.extend(self.neighbors(id, edge_direction).into_iter().cloned());
        }
        next
    }

    /// Transitive closure of `seed` in `direction`
    pub fn closure(&self, seed: &BTreeSet<String>, direction: Direction) -> BTreeSet<String> {
        let mut current = seed.clone();
        loop {
            let next = self.step(&current, direction);
            if next == current {
                return current;
            }
            current = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stack::DependencyRef;

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    /// A <- B <- C, plus an unrelated D
    fn chain() -> DependencyGraph {
        let stacks = vec![
            StackArtifact::new("A"),
            StackArtifact::new("B").with_dependency(DependencyRef::new("A")),
            StackArtifact::new("C").with_dependency(DependencyRef::new("B")),
            StackArtifact::new("D"),
        ];
        DependencyGraph::from_stacks(&stacks)
    }

    #[test]
    fn empty_graph_closure_keeps_seed() {
        let graph = DependencyGraph::from_stacks(&Vec::<StackArtifact>::new());
        assert_eq!(graph.closure(&set(&["A"]), Direction::Upstream), set(&["A"]));
    }

    #[test]
    fn unknown_and_self_dependencies_are_ignored() {
        let stacks = vec![
            StackArtifact::new("A")
                .with_dependency(DependencyRef::new("A"))
                .with_dependency(DependencyRef::new("AssetManifest")),
        ];
        let graph = DependencyGraph::from_stacks(&stacks);
        assert_eq!(graph.step(&set(&["A"]), Direction::Upstream), set(&["A"]));
        assert_eq!(graph.step(&set(&["A"]), Direction::Downstream), set(&["A"]));
    }

    #[test]
    fn dependencies_resolve_through_display_name() {
        let stacks = vec![
            StackArtifact::new("StageA").with_display_name("Stage/A"),
            StackArtifact::new("StageB")
                .with_display_name("Stage/B")
                .with_dependency(DependencyRef::new("StageA").with_display_name("Stage/A")),
        ];
        let graph = DependencyGraph::from_stacks(&stacks);
        assert_eq!(
            graph.step(&set(&["Stage/B"]), Direction::Upstream),
            set(&["Stage/A", "Stage/B"])
        );
    }

    #[test]
    fn duplicate_ids_keep_one_node() {
        let stacks = vec![
            StackArtifact::new("A"),
            StackArtifact::new("A"),
            StackArtifact::new("B").with_dependency(DependencyRef::new("A")),
        ];
        let graph = DependencyGraph::from_stacks(&stacks);
        assert_eq!(graph.graph.node_count(), 2);
        assert_eq!(graph.step(&set(&["A"]), Direction::Downstream), set(&["A", "B"]));
    }

    #[test]
    fn steps_are_single_hop() {
        let graph = chain();
        assert_eq!(graph.step(&set(&["C"]), Direction::Upstream), set(&["B", "C"]));
        assert_eq!(graph.step(&set(&["A"]), Direction::Downstream), set(&["A", "B"]));
        assert!(graph.neighbors("D", EdgeDirection::Incoming).is_empty());
    }

    #[test]
    fn closure_reaches_fixpoint() {
        let graph = chain();
        assert_eq!(
            graph.closure(&set(&["C"]), Direction::Upstream),
            set(&["A", "B", "C"])
        );
        assert_eq!(
            graph.closure(&set(&["A"]), Direction::Downstream),
            set(&["A", "B", "C"])
        );
        assert_eq!(graph.closure(&set(&["D"]), Direction::Upstream), set(&["D"]));
    }

    #[test]
    fn closure_is_idempotent() {
        let graph = chain();
        let once = graph.closure(&set(&["B"]), Direction::Upstream);
        let twice = graph.closure(&once, Direction::Upstream);
        assert_eq!(once, twice);
    }

    #[test]
    fn closure_terminates_on_cycles() {
        let stacks = vec![
            StackArtifact::new("A").with_dependency(DependencyRef::new("B")),
            StackArtifact::new("B").with_dependency(DependencyRef::new("A")),
        ];
        let graph = DependencyGraph::from_stacks(&stacks);
        assert_eq!(
            graph.closure(&set(&["A"]), Direction::Upstream),
            set(&["A", "B"])
        );
    }
}
