// AEGIS Mesh - Self-Healing Network Simulation
// edges.rs - Directed links between simulated hosts
//
// Copyright (c) 2026 CIPS Corps. All rights reserved.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::graph::nodes::NodeId;

/// Transport tag carried by an edge. Cosmetic: no simulation logic reads
/// it, it only flavors the topology view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Http,
}

impl Protocol {
    /// All protocol tags, in generation order.
    pub const ALL: [Protocol; 3] = [Protocol::Tcp, Protocol::Udp, Protocol::Http];
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Http => "http",
        };
        write!(f, "{}", name)
    }
}

/// A directed link from one host to another.
///
/// At most one edge exists per ordered pair (source, target), and
/// source != target always holds. The `active` flag is the edge's only
/// mutable state and is flipped exclusively by node isolation and
/// restoration: isolating either endpoint deactivates the edge,
/// restoring an endpoint reactivates it unless the far endpoint is
/// still isolated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Node the link originates from.
    pub source: NodeId,

    /// Node the link points at.
    pub target: NodeId,

    /// Transport tag (cosmetic).
    pub protocol: Protocol,

    /// Whether the link currently carries traffic. Inactive edges do not
    /// conduct lateral movement and do not count toward risk exposure.
    pub active: bool,
}

impl Edge {
    /// Create an active edge.
    pub fn new(source: NodeId, target: NodeId, protocol: Protocol) -> Self {
        Self {
            source,
            target,
            protocol,
            active: true,
        }
    }

    /// The ordered pair this edge occupies.
    pub fn key(&self) -> (NodeId, NodeId) {
        (self.source, self.target)
    }

    /// Whether the edge touches the given node in either direction.
    pub fn is_incident_to(&self, id: NodeId) -> bool {
        self.source == id || self.target == id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_starts_active() {
        let edge = Edge::new(0, 1, Protocol::Tcp);
        assert!(edge.active);
        assert_eq!(edge.key(), (0, 1));
    }

    #[test]
    fn test_edge_incidence() {
        let edge = Edge::new(2, 5, Protocol::Udp);
        assert!(edge.is_incident_to(2));
        assert!(edge.is_incident_to(5));
        assert!(!edge.is_incident_to(3));
    }

    #[test]
    fn test_protocol_display() {
        assert_eq!(Protocol::Tcp.to_string(), "tcp");
        assert_eq!(Protocol::Udp.to_string(), "udp");
        assert_eq!(Protocol::Http.to_string(), "http");
        assert_eq!(Protocol::ALL.len(), 3);
    }
}
