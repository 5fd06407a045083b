// AEGIS Mesh - Self-Healing Network Simulation
// nodes.rs - Simulated host records and the node status state machine
//
// Copyright (c) 2026 CIPS Corps. All rights reserved.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::SimError;

/// Dense node handle, assigned 0..N-1 at generation time.
///
/// Ids are stable for the lifetime of one graph instance: nodes are never
/// deleted individually, so an id never gets reused. The only destruction
/// path is a wholesale reset that discards the graph.
pub type NodeId = usize;

/// Functional role of a simulated host.
///
/// The role fixes the node's criticality weight at creation and gates
/// which attacks apply (SQL injection only makes sense against hosts
/// that answer queries).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End-user workstation.
    Client,
    /// Application or service host.
    Server,
    /// Data store; the highest-value target.
    Database,
    /// Perimeter filter node.
    Firewall,
}

impl Role {
    /// All roles, in generation order.
    pub const ALL: [Role; 4] = [Role::Client, Role::Server, Role::Database, Role::Firewall];

    /// Fixed criticality weight for this role. Immutable after creation.
    pub fn criticality(&self) -> f64 {
        match self {
            Role::Database => 0.8,
            Role::Server => 0.5,
            Role::Client | Role::Firewall => 0.2,
        }
    }

    /// Whether this role exposes a query surface that SQL injection
    /// can target.
    pub fn accepts_queries(&self) -> bool {
        matches!(self, Role::Database | Role::Server)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Client => "client",
            Role::Server => "server",
            Role::Database => "database",
            Role::Firewall => "firewall",
        };
        write!(f, "{}", name)
    }
}

/// Operating system of a simulated host. Cosmetic: no simulation logic
/// reads it, it only flavors snapshots and the topology view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsKind {
    Windows,
    Linux,
    MacOs,
}

impl OsKind {
    /// All OS kinds, in generation order.
    pub const ALL: [OsKind; 3] = [OsKind::Windows, OsKind::Linux, OsKind::MacOs];
}

impl fmt::Display for OsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OsKind::Windows => "windows",
            OsKind::Linux => "linux",
            OsKind::MacOs => "macos",
        };
        write!(f, "{}", name)
    }
}

/// Node state machine value.
///
/// Legal transitions are enforced by the attack and healing layers, not
/// here: attacks drive normal -> compromised, healing drives
/// compromised -> isolated, normal -> isolated (preemptive), and
/// isolated -> normal (restore). Isolated nodes are excluded from every
/// attack entry point, so isolated -> compromised cannot happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Normal,
    Compromised,
    Isolated,
}

impl NodeStatus {
    /// All statuses, in observation-encoding order.
    pub const ALL: [NodeStatus; 3] =
        [NodeStatus::Normal, NodeStatus::Compromised, NodeStatus::Isolated];

    /// Number of distinct statuses.
    pub const COUNT: usize = 3;

    /// Fixed observation encoding used by the state vector and the
    /// RL adapter: normal=0, compromised=1, isolated=2.
    pub fn index(&self) -> u8 {
        match self {
            NodeStatus::Normal => 0,
            NodeStatus::Compromised => 1,
            NodeStatus::Isolated => 2,
        }
    }

    /// Reconstruct from the observation encoding.
    pub fn from_index(idx: u8) -> Option<NodeStatus> {
        match idx {
            0 => Some(NodeStatus::Normal),
            1 => Some(NodeStatus::Compromised),
            2 => Some(NodeStatus::Isolated),
            _ => None,
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeStatus::Normal => "normal",
            NodeStatus::Compromised => "compromised",
            NodeStatus::Isolated => "isolated",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for NodeStatus {
    type Err = SimError;

    /// Parse a status name at an untyped boundary (CLI, service request).
    /// Inside the crate the enum is closed and invalid values are
    /// unrepresentable; this is where a bad input gets rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(NodeStatus::Normal),
            "compromised" => Ok(NodeStatus::Compromised),
            "isolated" => Ok(NodeStatus::Isolated),
            other => Err(SimError::InvalidStatus(other.to_string())),
        }
    }
}

/// Maximum vulnerability count a node can carry.
pub const MAX_VULNERABILITIES: u8 = 5;

/// A single simulated host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Stable dense id (0..N-1).
    pub id: NodeId,

    /// Functional role; fixes criticality.
    pub role: Role,

    /// Operating system (cosmetic).
    pub os: OsKind,

    /// Current state machine value.
    pub status: NodeStatus,

    /// Open vulnerability count, 0..=5. Zeroed exactly on restore.
    pub vulnerabilities: u8,

    /// Role-derived importance weight. Immutable after creation.
    pub criticality: f64,

    /// Accumulated DDoS traffic, >= 0. Zeroed exactly on restore.
    pub traffic_load: f64,
}

impl Node {
    /// Create a node in its initial state: status normal, no traffic,
    /// criticality derived from the role. Vulnerability counts above
    /// the cap are clamped.
    pub fn new(id: NodeId, role: Role, os: OsKind, vulnerabilities: u8) -> Self {
        Self {
            id,
            role,
            os,
            status: NodeStatus::Normal,
            vulnerabilities: vulnerabilities.min(MAX_VULNERABILITIES),
            criticality: role.criticality(),
            traffic_load: 0.0,
        }
    }
}
