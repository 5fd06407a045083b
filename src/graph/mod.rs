// AEGIS Mesh - Self-Healing Network Simulation
// mod.rs - Module exports and NetworkGraph struct (the main interface)
//
// Copyright (c) 2026 CIPS Corps. All rights reserved.

pub mod edges;
pub mod nodes;

use std::collections::HashMap;

use rand::Rng;

use edges::{Edge, Protocol};
use nodes::{Node, NodeId, NodeStatus, OsKind, Role, MAX_VULNERABILITIES};

use crate::{SimError, SimResult};

/// Per-status node counts, taken in one pass over the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StatusCounts {
    pub normal: usize,
    pub compromised: usize,
    pub isolated: usize,
}

impl StatusCounts {
    /// Total nodes counted.
    pub fn total(&self) -> usize {
        self.normal + self.compromised + self.isolated
    }
}

/// The simulated network: typed nodes, directed edges, and the node
/// status state machine.
///
/// Node ids are dense (0..N-1) and stable; the graph only grows during
/// generation and is destroyed wholesale on reset. Directional adjacency
/// is kept sorted ascending so every iteration over neighbors is
/// deterministic, which in turn makes the attack engine's draw order
/// reproducible under a fixed seed.
#[derive(Debug, Clone)]
pub struct NetworkGraph {
    /// Node records, indexed by id.
    nodes: Vec<Node>,

    /// Outgoing neighbor ids per node, sorted ascending.
    succ: Vec<Vec<NodeId>>,

    /// Incoming neighbor ids per node, sorted ascending.
    pred: Vec<Vec<NodeId>>,

    /// Edge records keyed by ordered (source, target) pair.
    edges: HashMap<(NodeId, NodeId), Edge>,
}

impl NetworkGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            succ: Vec::new(),
            pred: Vec::new(),
            edges: HashMap::new(),
        }
    }

    /// Generate a random topology from the given random source.
    ///
    /// Every node gets a uniform random role, OS, and vulnerability count
    /// in 0..=5, starting normal with no traffic. Each node then links to
    /// 1..=3 distinct random targets (self-links are skipped), so the
    /// graph comes up loosely connected with every edge active.
    ///
    /// The same random stream always produces the same topology; the
    /// caller seeds the stream and hands the remainder to the attack
    /// engine so one seed pins the whole simulation.
    pub fn generate(num_nodes: usize, rng: &mut impl Rng) -> Self {
        let mut graph = Self::new();

        for _ in 0..num_nodes {
            let role = Role::ALL[rng.random_range(0..Role::ALL.len())];
            let os = OsKind::ALL[rng.random_range(0..OsKind::ALL.len())];
            let vulns = rng.random_range(0..=MAX_VULNERABILITIES);
            graph.add_node(role, os, vulns);
        }

        for source in 0..num_nodes {
            let fanout = rng.random_range(1..=3).min(num_nodes);
            for target in rand::seq::index::sample(&mut *rng, num_nodes, fanout) {
                if target != source {
                    let protocol = Protocol::ALL[rng.random_range(0..Protocol::ALL.len())];
                    graph.link(source, target, protocol);
                }
            }
        }

        graph
    }

    /// Append a node in its initial state and return its id.
    pub fn add_node(&mut self, role: Role, os: OsKind, vulnerabilities: u8) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::new(id, role, os, vulnerabilities));
        self.succ.push(Vec::new());
        self.pred.push(Vec::new());
        id
    }

    /// Add a directed edge between two existing, distinct nodes.
    ///
    /// Re-adding an existing pair replaces the edge record (there is at
    /// most one edge per ordered pair).
    pub fn add_edge(&mut self, source: NodeId, target: NodeId, protocol: Protocol) -> SimResult<()> {
        if source == target {
            return Err(SimError::Graph(format!(
                "self-link on node {} is not allowed",
                source
            )));
        }
        self.node(source)?;
        self.node(target)?;
        self.link(source, target, protocol);
        Ok(())
    }

    /// Insert an edge whose endpoints are already validated.
    fn link(&mut self, source: NodeId, target: NodeId, protocol: Protocol) {
        if self
            .edges
            .insert((source, target), Edge::new(source, target, protocol))
            .is_none()
        {
            if let Err(pos) = self.succ[source].binary_search(&target) {
                self.succ[source].insert(pos, target);
            }
            if let Err(pos) = self.pred[target].binary_search(&source) {
                self.pred[target].insert(pos, source);
            }
        }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Look up a node by id.
    pub fn node(&self, id: NodeId) -> SimResult<&Node> {
        self.nodes.get(id).ok_or(SimError::NodeNotFound {
            id,
            count: self.nodes.len(),
        })
    }

    /// Look up a node by id for mutation.
    pub fn node_mut(&mut self, id: NodeId) -> SimResult<&mut Node> {
        let count = self.nodes.len();
        self.nodes
            .get_mut(id)
            .ok_or(SimError::NodeNotFound { id, count })
    }

    /// Overwrite a node's status unconditionally.
    ///
    /// Transition legality lives in the attack and healing layers; this
    /// layer only guarantees the id exists.
    pub fn set_status(&mut self, id: NodeId, status: NodeStatus) -> SimResult<()> {
        self.node_mut(id)?.status = status;
        Ok(())
    }

    /// Take a node off the network: status becomes isolated and every
    /// incident edge, in either direction, goes inactive.
    pub fn isolate(&mut self, id: NodeId) -> SimResult<()> {
        self.node_mut(id)?.status = NodeStatus::Isolated;
        for key in self.incident_keys(id) {
            if let Some(edge) = self.edges.get_mut(&key) {
                edge.active = false;
            }
        }
        Ok(())
    }

    /// Bring a node back: status normal, vulnerabilities patched to zero,
    /// traffic drained to zero, incident edges reactivated.
    ///
    /// An incident edge whose far endpoint is still isolated stays
    /// inactive; it comes back when that endpoint is restored.
    pub fn restore(&mut self, id: NodeId) -> SimResult<()> {
        {
            let node = self.node_mut(id)?;
            node.status = NodeStatus::Normal;
            node.vulnerabilities = 0;
            node.traffic_load = 0.0;
        }
        for key in self.incident_keys(id) {
            let far = if key.0 == id { key.1 } else { key.0 };
            if self.nodes[far].status == NodeStatus::Isolated {
                continue;
            }
            if let Some(edge) = self.edges.get_mut(&key) {
                edge.active = true;
            }
        }
        Ok(())
    }

    /// Ordered (source, target) keys of every edge touching `id`.
    fn incident_keys(&self, id: NodeId) -> Vec<(NodeId, NodeId)> {
        let mut keys = Vec::new();
        if let Some(targets) = self.succ.get(id) {
            keys.extend(targets.iter().map(|&t| (id, t)));
        }
        if let Some(sources) = self.pred.get(id) {
            keys.extend(sources.iter().map(|&s| (s, id)));
        }
        keys
    }

    /// Per-node status codes in ascending id order
    /// (normal=0, compromised=1, isolated=2).
    pub fn state_vector(&self) -> Vec<u8> {
        self.nodes.iter().map(|n| n.status.index()).collect()
    }

    /// All nodes, ascending by id.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Outgoing neighbor ids of `id`, sorted ascending. Empty for an
    /// unknown id.
    pub fn successors(&self, id: NodeId) -> &[NodeId] {
        self.succ.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Incoming neighbor ids of `id`, sorted ascending. Empty for an
    /// unknown id.
    pub fn predecessors(&self, id: NodeId) -> &[NodeId] {
        self.pred.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The edge on the ordered pair (source, target), if present.
    pub fn edge(&self, source: NodeId, target: NodeId) -> Option<&Edge> {
        self.edges.get(&(source, target))
    }

    /// All edges, ascending by (source, target).
    pub fn edges(&self) -> Vec<&Edge> {
        let mut all = Vec::with_capacity(self.edges.len());
        for source in 0..self.nodes.len() {
            for &target in &self.succ[source] {
                if let Some(edge) = self.edges.get(&(source, target)) {
                    all.push(edge);
                }
            }
        }
        all
    }

    /// Edges currently carrying traffic, ascending by (source, target).
    pub fn active_edges(&self) -> Vec<&Edge> {
        self.edges().into_iter().filter(|e| e.active).collect()
    }

    /// Count nodes per status in one pass.
    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts {
            normal: 0,
            compromised: 0,
            isolated: 0,
        };
        for node in &self.nodes {
            match node.status {
                NodeStatus::Normal => counts.normal += 1,
                NodeStatus::Compromised => counts.compromised += 1,
                NodeStatus::Isolated => counts.isolated += 1,
            }
        }
        counts
    }
}

impl Default for NetworkGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn three_in_a_line() -> NetworkGraph {
        // 0 -> 1 -> 2
        let mut graph = NetworkGraph::new();
        graph.add_node(Role::Client, OsKind::Linux, 2);
        graph.add_node(Role::Server, OsKind::Linux, 3);
        graph.add_node(Role::Database, OsKind::Windows, 1);
        graph.add_edge(0, 1, Protocol::Tcp).unwrap();
        graph.add_edge(1, 2, Protocol::Tcp).unwrap();
        graph
    }

    #[test]
    fn test_generate_is_deterministic() {
        let mut rng_a = StdRng::seed_from_u64(42);
        let mut rng_b = StdRng::seed_from_u64(42);
        let a = NetworkGraph::generate(12, &mut rng_a);
        let b = NetworkGraph::generate(12, &mut rng_b);

        assert_eq!(a.len(), b.len());
        for (na, nb) in a.nodes().iter().zip(b.nodes()) {
            assert_eq!(na.role, nb.role);
            assert_eq!(na.os, nb.os);
            assert_eq!(na.vulnerabilities, nb.vulnerabilities);
        }
        let keys_a: Vec<_> = a.edges().iter().map(|e| e.key()).collect();
        let keys_b: Vec<_> = b.edges().iter().map(|e| e.key()).collect();
        assert_eq!(keys_a, keys_b);
    }

    #[test]
    fn test_generate_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let graph = NetworkGraph::generate(20, &mut rng);

        assert_eq!(graph.len(), 20);
        for node in graph.nodes() {
            assert_eq!(node.status, NodeStatus::Normal);
            assert!(node.vulnerabilities <= MAX_VULNERABILITIES);
            assert_eq!(node.traffic_load, 0.0);
            assert_eq!(node.criticality, node.role.criticality());
            assert!(graph.successors(node.id).len() <= 3);
        }
        for edge in graph.edges() {
            assert_ne!(edge.source, edge.target, "self-links must never be generated");
            assert!(edge.active, "generated edges start active");
        }
    }

    #[test]
    fn test_generate_tiny_graphs() {
        let mut rng = StdRng::seed_from_u64(3);
        let lonely = NetworkGraph::generate(1, &mut rng);
        assert_eq!(lonely.len(), 1);
        assert_eq!(lonely.edge_count(), 0);

        let empty = NetworkGraph::generate(0, &mut rng);
        assert!(empty.is_empty());
        assert!(empty.state_vector().is_empty());
    }

    #[test]
    fn test_node_lookup_out_of_range() {
        let graph = three_in_a_line();
        assert!(graph.node(2).is_ok());
        let err = graph.node(3).unwrap_err();
        assert!(matches!(err, SimError::NodeNotFound { id: 3, count: 3 }));
    }

    #[test]
    fn test_add_edge_validation() {
        let mut graph = three_in_a_line();
        assert!(matches!(
            graph.add_edge(1, 1, Protocol::Udp),
            Err(SimError::Graph(_))
        ));
        assert!(matches!(
            graph.add_edge(0, 9, Protocol::Udp),
            Err(SimError::NodeNotFound { .. })
        ));
    }

    #[test]
    fn test_add_edge_replaces_existing_pair() {
        let mut graph = three_in_a_line();
        graph.add_edge(0, 1, Protocol::Http).unwrap();
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.edge(0, 1).unwrap().protocol, Protocol::Http);
        assert_eq!(graph.successors(0), &[1]);
    }

    #[test]
    fn test_set_status_is_unconditional() {
        let mut graph = three_in_a_line();
        graph.set_status(0, NodeStatus::Compromised).unwrap();
        graph.set_status(0, NodeStatus::Normal).unwrap();
        assert_eq!(graph.node(0).unwrap().status, NodeStatus::Normal);
        assert!(graph.set_status(5, NodeStatus::Normal).is_err());
    }

    #[test]
    fn test_isolate_kills_both_directions() {
        let mut graph = three_in_a_line();
        graph.isolate(1).unwrap();

        assert_eq!(graph.node(1).unwrap().status, NodeStatus::Isolated);
        assert!(!graph.edge(0, 1).unwrap().active, "incoming edge must go inactive");
        assert!(!graph.edge(1, 2).unwrap().active, "outgoing edge must go inactive");
        assert!(graph.active_edges().is_empty());
    }

    #[test]
    fn test_restore_resets_node_and_edges() {
        let mut graph = three_in_a_line();
        {
            let node = graph.node_mut(1).unwrap();
            node.traffic_load = 88.0;
        }
        graph.isolate(1).unwrap();
        graph.restore(1).unwrap();

        let node = graph.node(1).unwrap();
        assert_eq!(node.status, NodeStatus::Normal);
        assert_eq!(node.vulnerabilities, 0, "restore patches vulnerabilities");
        assert_eq!(node.traffic_load, 0.0, "restore drains traffic");
        assert!(graph.edge(0, 1).unwrap().active);
        assert!(graph.edge(1, 2).unwrap().active);
    }

    #[test]
    fn test_restore_leaves_edges_to_isolated_peers_down() {
        let mut graph = three_in_a_line();
        graph.isolate(1).unwrap();
        graph.isolate(2).unwrap();
        graph.restore(1).unwrap();

        assert!(graph.edge(0, 1).unwrap().active, "edge to restored peer comes back");
        assert!(
            !graph.edge(1, 2).unwrap().active,
            "edge into a still-isolated node must stay inactive"
        );

        graph.restore(2).unwrap();
        assert!(graph.edge(1, 2).unwrap().active);
    }

    #[test]
    fn test_state_vector_encoding() {
        let mut graph = three_in_a_line();
        graph.set_status(1, NodeStatus::Compromised).unwrap();
        graph.isolate(2).unwrap();
        assert_eq!(graph.state_vector(), vec![0, 1, 2]);
    }

    #[test]
    fn test_edges_are_ordered() {
        let mut graph = NetworkGraph::new();
        for _ in 0..4 {
            graph.add_node(Role::Client, OsKind::Linux, 0);
        }
        graph.add_edge(3, 0, Protocol::Tcp).unwrap();
        graph.add_edge(1, 2, Protocol::Tcp).unwrap();
        graph.add_edge(1, 0, Protocol::Tcp).unwrap();
        graph.add_edge(0, 2, Protocol::Tcp).unwrap();

        let keys: Vec<_> = graph.edges().iter().map(|e| e.key()).collect();
        assert_eq!(keys, vec![(0, 2), (1, 0), (1, 2), (3, 0)]);
    }

    #[test]
    fn test_status_counts() {
        let mut graph = three_in_a_line();
        graph.set_status(0, NodeStatus::Compromised).unwrap();
        graph.isolate(2).unwrap();

        let counts = graph.status_counts();
        assert_eq!(counts.normal, 1);
        assert_eq!(counts.compromised, 1);
        assert_eq!(counts.isolated, 1);
        assert_eq!(counts.total(), 3);
    }
}
