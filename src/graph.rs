//! Assembly graph and spanning-tree extraction
//!
//! The assembly graph is an undirected multigraph: one node per rigid group,
//! one edge per extracted mate. A breadth-first traversal from the root keeps
//! the first edge that reaches each unvisited node as that node's governing
//! edge; every other edge closes a loop and is reported as redundant.
//! Incident edges are visited in discovery order, so the result depends only
//! on the input order, never on the graph's internal edge order.

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::VecDeque;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::flatten::FlatAssembly;
use crate::mates::Mate;
use crate::report::{DiscardReport, RedundantEdge};
use crate::rigid::{GroupId, RigidGroups};

/// Undirected multigraph over rigid groups
///
/// Node `i` carries group `i`; each edge carries the discovery index of its mate.
#[derive(Debug, Clone)]
pub struct AssemblyGraph {
    graph: UnGraph<GroupId, usize>,
}

impl AssemblyGraph {
    /// Build the graph; `mates[i].index` must equal `i`
    pub fn build(node_count: usize, mates: &[Mate]) -> Self {
        let mut graph = UnGraph::with_capacity(node_count, mates.len());
        for group in 0..node_count {
            graph.add_node(group);
        }
        for mate in mates {
            let [a, b] = mate.nodes;
            graph.add_edge(NodeIndex::new(a), NodeIndex::new(b), mate.index);
        }
        Self { graph }
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of incident edges, counting parallel edges separately
    pub fn degree(&self, node: GroupId) -> usize {
        self.graph.edges(NodeIndex::new(node)).count()
    }

    /// Incident edge discovery indices, ascending
    pub fn incident(&self, node: GroupId) -> Vec<usize> {
        let mut edges: Vec<usize> = self
            .graph
            .edges(NodeIndex::new(node))
            .map(|e| *e.weight())
            .collect();
        edges.sort_unstable();
        edges
    }
}

/// The edge that attaches a node to its parent in the spanning tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeEdge {
    /// Discovery index of the governing mate
    pub mate: usize,
    /// Parent node
    pub parent: GroupId,
    /// The traversal reached the mate from its B endpoint, so A and B swap roles
    pub reversed: bool,
}

/// Rooted spanning tree of the assembly graph
#[derive(Debug, Clone, PartialEq)]
pub struct SpanningTree {
    /// Root node
    pub root: GroupId,
    /// Nodes in breadth-first order, root first
    pub order: Vec<GroupId>,
    /// Governing edge of each node, `None` for the root
    pub parent: Vec<Option<TreeEdge>>,
    /// Discovery indices of loop-closing edges, ascending
    pub redundant: Vec<usize>,
}

impl SpanningTree {
    /// Number of governing edges
    pub fn governing_edge_count(&self) -> usize {
        self.parent.iter().filter(|p| p.is_some()).count()
    }
}

/// Pick the root node
///
/// An explicit override may name a group or any instance inside one.
/// Otherwise the node of maximum degree wins, ties broken by the smallest
/// group name.
pub fn select_root(
    graph: &AssemblyGraph,
    flat: &FlatAssembly,
    groups: &RigidGroups,
    root_override: Option<&str>,
) -> Result<GroupId> {
    if let Some(name) = root_override {
        return groups
            .find_by_member_name(flat, name)
            .ok_or_else(|| Error::MissingRoot(name.to_string()));
    }

    groups
        .groups()
        .iter()
        .max_by(|a, b| {
            graph
                .degree(a.id)
                .cmp(&graph.degree(b.id))
                .then_with(|| b.name.cmp(&a.name))
        })
        .map(|g| g.id)
        .ok_or_else(|| Error::InvalidAssembly("Assembly has no rigid groups".to_string()))
}

/// Breadth-first spanning tree from `root`
///
/// Every node must be reachable; otherwise the unreachable group names are
/// reported and no tree is returned. Redundant edges are recorded in `report`.
#[tracing::instrument(skip_all, fields(root = %groups.group(root).name))]
pub fn extract_spanning_tree(
    graph: &AssemblyGraph,
    groups: &RigidGroups,
    mates: &[Mate],
    root: GroupId,
    report: &mut DiscardReport,
) -> Result<SpanningTree> {
    let n = graph.node_count();
    let mut visited = vec![false; n];
    let mut processed = vec![false; graph.edge_count()];
    let mut parent: Vec<Option<TreeEdge>> = vec![None; n];
    let mut order = Vec::with_capacity(n);
    let mut redundant = Vec::new();

    let mut queue = VecDeque::from([root]);
    visited[root] = true;
    while let Some(node) = queue.pop_front() {
        order.push(node);
        for edge in graph.incident(node) {
            if processed[edge] {
                continue;
            }
            processed[edge] = true;

            let next = mates[edge].other(node);
            if visited[next] {
                redundant.push(edge);
                continue;
            }
            visited[next] = true;
            parent[next] = Some(TreeEdge {
                mate: edge,
                parent: node,
                reversed: mates[edge].nodes[0] != node,
            });
            debug!(
                mate = %mates[edge].id,
                parent = %groups.group(node).name,
                child = %groups.group(next).name,
                "governing edge"
            );
            queue.push_back(next);
        }
    }

    let unreachable: Vec<String> = (0..n)
        .filter(|&g| !visited[g])
        .map(|g| groups.group(g).name.clone())
        .collect();
    if !unreachable.is_empty() {
        return Err(Error::disconnected(&groups.group(root).name, unreachable));
    }

    redundant.sort_unstable();
    for &edge in &redundant {
        let mate = &mates[edge];
        report.redundant(RedundantEdge {
            mate_id: mate.id.clone(),
            mate_name: mate.name.clone(),
            discovery_index: mate.index,
            mate_type: mate.mate_type,
            nodes: [
                groups.group(mate.nodes[0]).name.clone(),
                groups.group(mate.nodes[1]).name.clone(),
            ],
        });
    }

    info!(
        nodes = n,
        governing = n - 1,
        redundant = redundant.len(),
        "extracted spanning tree"
    );
    Ok(SpanningTree {
        root,
        order,
        parent,
        redundant,
    })
}
