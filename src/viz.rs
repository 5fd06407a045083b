//! Projection of the network into the flat shape graph widgets expect:
//! string ids, prebuilt labels, and every edge carrying its active flag
//! so a frontend can draw severed links differently instead of hiding
//! them.

use serde::Serialize;

use crate::graph::NetworkGraph;
use crate::graph::nodes::NodeStatus;

/// One node, ready to drop into a graph widget.
#[derive(Debug, Clone, Serialize)]
pub struct NodeView {
    pub id: String,
    pub label: String,
    pub status: NodeStatus,
    pub criticality: f64,
}

/// One directed edge, string-keyed like the nodes.
#[derive(Debug, Clone, Serialize)]
pub struct EdgeView {
    pub source: String,
    pub target: String,
    pub active: bool,
}

/// The whole topology in render order: nodes by id, edges by
/// (source, target).
#[derive(Debug, Clone, Serialize)]
pub struct TopologyView {
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
}

/// Project the graph for rendering. Inactive edges are included; the
/// `active` flag is the view's to interpret.
pub fn topology(graph: &NetworkGraph) -> TopologyView {
    let nodes = graph
        .nodes()
        .iter()
        .map(|node| NodeView {
            id: node.id.to_string(),
            label: format!("Node {} ({})", node.id, node.role),
            status: node.status,
            criticality: node.criticality,
        })
        .collect();

    let edges = graph
        .edges()
        .iter()
        .map(|edge| EdgeView {
            source: edge.source.to_string(),
            target: edge.target.to_string(),
            active: edge.active,
        })
        .collect();

    TopologyView { nodes, edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::edges::Protocol;
    use crate::graph::nodes::{OsKind, Role};

    fn sample() -> NetworkGraph {
        let mut graph = NetworkGraph::new();
        graph.add_node(Role::Database, OsKind::Linux, 2);
        graph.add_node(Role::Client, OsKind::Windows, 0);
        graph.add_node(Role::Server, OsKind::MacOs, 1);
        graph.add_edge(1, 0, Protocol::Tcp).unwrap();
        graph.add_edge(0, 2, Protocol::Http).unwrap();
        graph
    }

    #[test]
    fn test_labels_and_string_ids() {
        let view = topology(&sample());
        assert_eq!(view.nodes.len(), 3);
        assert_eq!(view.nodes[0].id, "0");
        assert_eq!(view.nodes[0].label, "Node 0 (database)");
        assert_eq!(view.nodes[1].label, "Node 1 (client)");
        assert_eq!(view.nodes[2].label, "Node 2 (server)");
    }

    #[test]
    fn test_edges_ordered_and_inactive_included() {
        let mut graph = sample();
        graph.isolate(0).unwrap();
        let view = topology(&graph);

        let listed: Vec<(&str, &str, bool)> = view
            .edges
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str(), e.active))
            .collect();
        // Both of node 0's edges went inactive with it, and both still
        // appear, ordered by (source, target).
        assert_eq!(listed, vec![("0", "2", false), ("1", "0", false)]);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let mut graph = sample();
        graph.set_status(2, NodeStatus::Compromised).unwrap();
        let json = serde_json::to_string(&topology(&graph)).unwrap();
        assert!(json.contains("\"status\":\"compromised\""));
        assert!(json.contains("\"source\":\"1\""));
    }

    #[test]
    fn test_empty_graph_projects_empty() {
        let view = topology(&NetworkGraph::new());
        assert!(view.nodes.is_empty());
        assert!(view.edges.is_empty());
    }
}
