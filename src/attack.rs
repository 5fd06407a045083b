//! # Attack Engine
//!
//! Stochastic mutator that drives the simulation's threat side. Three
//! attack kinds, one shared random stream:
//!
//! - **DDoS** piles traffic onto a target; past 100 units the node
//!   buckles and goes compromised. Deterministic once the threshold is
//!   crossed, no draw involved.
//! - **SQL injection** only bites normal-status hosts with a query
//!   surface (database and server roles). One uniform draw against
//!   `min(0.1 + 0.15*vulns, 0.9)`; skipped targets consume no draw.
//! - **Lateral movement** spreads from every currently compromised node
//!   across active outgoing edges into normal neighbors, one draw per
//!   candidate hop at `0.2 + 0.1*vulns(target)`. A node that falls
//!   during the sweep does not spread further until the next call;
//!   cascades happen across ticks, not within one.
//!
//! Isolated nodes are invisible to all three kinds, which is what makes
//! isolation a defense: there is no path back from isolated to
//! compromised.
//!
//! The engine owns the crate's only random source. Seed it (or hand it
//! the stream that already generated the topology) and every probability
//! check becomes replayable: each check is exactly one uniform draw in
//! [0, 1), and iteration orders are fixed ascending, so a seed pins the
//! full outcome sequence.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::graph::nodes::{NodeId, NodeStatus};
use crate::graph::NetworkGraph;
use crate::{SimError, SimResult};

/// Traffic load above which a node buckles. Strictly greater-than:
/// landing exactly on the limit is survivable.
pub const MAX_TRAFFIC_LOAD: f64 = 100.0;

/// Lower bound of the random driver's DDoS intensity draw.
pub const MIN_RANDOM_INTENSITY: u32 = 20;

/// Upper bound (inclusive) of the random driver's DDoS intensity draw.
pub const MAX_RANDOM_INTENSITY: u32 = 120;

/// The three attack kinds the driver chooses among.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackKind {
    Ddos,
    #[serde(rename = "sqli")]
    SqlInjection,
    Lateral,
}

impl AttackKind {
    /// All attack kinds, in driver-choice order.
    pub const ALL: [AttackKind; 3] = [AttackKind::Ddos, AttackKind::SqlInjection, AttackKind::Lateral];
}

impl fmt::Display for AttackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttackKind::Ddos => "ddos",
            AttackKind::SqlInjection => "sqli",
            AttackKind::Lateral => "lateral",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for AttackKind {
    type Err = SimError;

    /// Parse an attack name at an untyped boundary (CLI, service request).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ddos" => Ok(AttackKind::Ddos),
            "sqli" => Ok(AttackKind::SqlInjection),
            "lateral" => Ok(AttackKind::Lateral),
            other => Err(SimError::InvalidAttack(other.to_string())),
        }
    }
}

/// What a single driver step did, for logs and tick results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackReport {
    /// Which attack the driver chose.
    pub kind: AttackKind,

    /// The drawn target, for the targeted kinds. Lateral movement sweeps
    /// the whole graph and has no single target.
    pub target: Option<NodeId>,

    /// Nodes newly compromised by this step, ascending.
    pub compromised: Vec<NodeId>,
}

impl fmt::Display for AttackReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target {
            Some(target) => write!(f, "{} against node {}", self.kind, target)?,
            None => write!(f, "{} sweep", self.kind)?,
        }
        if self.compromised.is_empty() {
            write!(f, " (held)")
        } else {
            write!(f, " (compromised {:?})", self.compromised)
        }
    }
}

/// Success probability for SQL injection against a node with the given
/// vulnerability count: `min(0.1 + 0.15*vulns, 0.9)`.
pub fn sqli_success_probability(vulnerabilities: u8) -> f64 {
    (0.1 + 0.15 * f64::from(vulnerabilities)).min(0.9)
}

/// Success probability for one lateral hop into a node with the given
/// vulnerability count: `0.2 + 0.1*vulns`.
pub fn lateral_success_probability(vulnerabilities: u8) -> f64 {
    0.2 + 0.1 * f64::from(vulnerabilities)
}

/// The stochastic attacker. Owns the simulation's random stream.
#[derive(Debug)]
pub struct AttackEngine {
    rng: StdRng,
}

impl AttackEngine {
    /// Engine seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Engine with a fixed seed, for replayable runs.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Engine continuing an existing stream. This is how the simulation
    /// shares one seed between topology generation and attack outcomes:
    /// generate the graph first, then hand the rest of the stream here.
    pub fn from_rng(rng: StdRng) -> Self {
        Self { rng }
    }

    /// Flood a node with traffic.
    ///
    /// No-op against an isolated target (the flood has nowhere to land).
    /// Otherwise the load accumulates, and once it exceeds
    /// `MAX_TRAFFIC_LOAD` the node goes compromised. Returns whether this
    /// call newly compromised the target.
    pub fn ddos(&mut self, graph: &mut NetworkGraph, target: NodeId, intensity: f64) -> SimResult<bool> {
        let node = graph.node_mut(target)?;
        if node.status == NodeStatus::Isolated {
            return Ok(false);
        }

        node.traffic_load += intensity;
        if node.traffic_load > MAX_TRAFFIC_LOAD && node.status != NodeStatus::Compromised {
            node.status = NodeStatus::Compromised;
            log::warn!(
                "[ATTACK] node {} buckled at {} units of traffic",
                target,
                node.traffic_load
            );
            return Ok(true);
        }
        Ok(false)
    }

    /// Attempt SQL injection against a node.
    ///
    /// No-op unless the target is a normal-status host with a query
    /// surface; a skipped target consumes no draw. Returns whether this
    /// call newly compromised the target.
    pub fn sql_injection(&mut self, graph: &mut NetworkGraph, target: NodeId) -> SimResult<bool> {
        let (status, role, vulns) = {
            let node = graph.node(target)?;
            (node.status, node.role, node.vulnerabilities)
        };
        if status != NodeStatus::Normal || !role.accepts_queries() {
            return Ok(false);
        }

        if self.rng.random::<f64>() < sqli_success_probability(vulns) {
            graph.set_status(target, NodeStatus::Compromised)?;
            log::warn!("[ATTACK] sql injection took node {}", target);
            return Ok(true);
        }
        Ok(false)
    }

    /// Spread compromise one hop outward from every compromised node.
    ///
    /// Sources are snapshotted before the sweep, so a node that falls
    /// here only starts spreading on the next call. Per source, per
    /// active outgoing edge into a normal neighbor: one draw. Returns
    /// the newly compromised ids, ascending.
    pub fn lateral_movement(&mut self, graph: &mut NetworkGraph) -> SimResult<Vec<NodeId>> {
        let sources: Vec<NodeId> = graph
            .nodes()
            .iter()
            .filter(|n| n.status == NodeStatus::Compromised)
            .map(|n| n.id)
            .collect();

        let mut fallen = Vec::new();
        for source in sources {
            for target in graph.successors(source).to_vec() {
                if graph.node(target)?.status != NodeStatus::Normal {
                    continue;
                }
                if !graph.edge(source, target).is_some_and(|e| e.active) {
                    continue;
                }
                let p = lateral_success_probability(graph.node(target)?.vulnerabilities);
                if self.rng.random::<f64>() < p {
                    graph.set_status(target, NodeStatus::Compromised)?;
                    log::warn!("[ATTACK] lateral movement {} -> {}", source, target);
                    fallen.push(target);
                }
            }
        }
        // Discovery order is source-major and can run backwards across
        // sources; the report contract is ascending ids.
        fallen.sort_unstable();
        Ok(fallen)
    }

    /// The per-tick driver: uniformly choose an attack kind, draw a
    /// target (and an intensity for DDoS), and run it.
    ///
    /// Returns `None` on an empty graph; nothing is attempted and no
    /// draw is consumed.
    pub fn random_step(&mut self, graph: &mut NetworkGraph) -> SimResult<Option<AttackReport>> {
        if graph.is_empty() {
            return Ok(None);
        }

        let kind = AttackKind::ALL[self.rng.random_range(0..AttackKind::ALL.len())];
        let report = match kind {
            AttackKind::Ddos => {
                let target = self.rng.random_range(0..graph.len());
                let intensity =
                    f64::from(self.rng.random_range(MIN_RANDOM_INTENSITY..=MAX_RANDOM_INTENSITY));
                let crashed = self.ddos(graph, target, intensity)?;
                AttackReport {
                    kind,
                    target: Some(target),
                    compromised: if crashed { vec![target] } else { Vec::new() },
                }
            }
            AttackKind::SqlInjection => {
                let target = self.rng.random_range(0..graph.len());
                let landed = self.sql_injection(graph, target)?;
                AttackReport {
                    kind,
                    target: Some(target),
                    compromised: if landed { vec![target] } else { Vec::new() },
                }
            }
            AttackKind::Lateral => {
                let fallen = self.lateral_movement(graph)?;
                AttackReport {
                    kind,
                    target: None,
                    compromised: fallen,
                }
            }
        };

        log::info!("[ATTACK] {}", report);
        Ok(Some(report))
    }
}

impl Default for AttackEngine {
    fn default() -> Self {
        Self::new()
    }
}
