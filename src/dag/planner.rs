// src/dag/planner.rs

//! Target restriction and advisory ordering of the expanded graph.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::dag::node::{Node, NodeKey};
use crate::errors::{Result, WindagError};

/// Nodes to schedule, dependencies before dependents.
///
/// With a target only nodes of that id and their transitive dependencies are
/// kept. The order is advisory: readiness is decided at run time.
pub fn plan(nodes: &[Arc<Node>], target: Option<&str>) -> Result<Vec<Arc<Node>>> {
    let scope = match target {
        Some(id) => restrict(nodes, id)?,
        None => nodes.to_vec(),
    };
    debug!(target = ?target, total = nodes.len(), scheduled = scope.len(), "planned schedule");
    Ok(dependencies_first(scope))
}

fn restrict(nodes: &[Arc<Node>], target: &str) -> Result<Vec<Arc<Node>>> {
    let roots: Vec<&Arc<Node>> = nodes.iter().filter(|n| n.id() == target).collect();
    if roots.is_empty() {
        return Err(WindagError::UnknownTarget(target.to_string()));
    }

    let mut seen: HashSet<NodeKey> = HashSet::new();
    let mut scope = Vec::new();
    for root in roots {
        if seen.insert(root.key().clone()) {
            scope.push(Arc::clone(root));
        }
        for dep in root.dependencies() {
            if seen.insert(dep.key().clone()) {
                scope.push(dep);
            }
        }
    }
    Ok(scope)
}

fn dependencies_first(scope: Vec<Arc<Node>>) -> Vec<Arc<Node>> {
    let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(scope.len(), 0);
    let mut index: HashMap<&NodeKey, NodeIndex> = HashMap::with_capacity(scope.len());
    for (i, node) in scope.iter().enumerate() {
        index.insert(node.key(), graph.add_node(i));
    }

    for node in &scope {
        let to = index[node.key()];
        for dep in node.direct_dependencies() {
            if let Some(&from) = index.get(dep.key()) {
                graph.add_edge(from, to, ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(order) => order.into_iter().map(|ix| Arc::clone(&scope[graph[ix]])).collect(),
        // Dependencies always point at earlier declarations, so this is
        // unreachable for builder-made graphs.
        Err(_) => scope.clone(),
    }
}
