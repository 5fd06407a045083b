//! # Self-Healing Controller
//!
//! Rule-based defense that scans the graph once per pass, in ascending id
//! order, and mutates it in place:
//!
//! - **Isolated** nodes are restored as soon as no predecessor is
//!   compromised. The check reads predecessors regardless of edge
//!   activity: an isolated attacker one hop upstream still blocks
//!   restoration until it is cleaned up.
//! - **Compromised** nodes are isolated immediately, no questions asked.
//! - **Normal** nodes get a local risk estimate; above the threshold they
//!   are preemptively isolated before the attacker arrives.
//!
//! The pass runs over the live graph, so an action taken early in the
//! pass is visible to the checks for later nodes. Isolating a compromised
//! node at id 3 can make an isolated node at id 7 restorable within the
//! same pass.
//!
//! The local risk estimate here is deliberately not `risk::node_risk`:
//! it ignores criticality and edge activity, and weighs compromised
//! neighbors harder. The scorer measures standing; the controller makes
//! snap decisions.

pub mod risk;

use serde::Serialize;
use std::fmt;

use crate::graph::nodes::{NodeId, NodeStatus};
use crate::graph::NetworkGraph;
use crate::SimResult;

/// Local-risk weight per open vulnerability.
pub const LOCAL_VULNERABILITY_WEIGHT: f64 = 0.1;

/// Local-risk weight per compromised predecessor, active edge or not.
pub const LOCAL_NEIGHBOR_WEIGHT: f64 = 0.3;

/// Default local-risk level above which a normal node is preemptively
/// isolated.
pub const DEFAULT_RISK_THRESHOLD: f64 = 0.7;

/// One action applied during a healing pass.
///
/// The `Display` rendering is the action-log contract consumed by the
/// service layer and the CLI; tests pin the exact strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum HealAction {
    /// An isolated node with no compromised predecessors came back.
    Restored { id: NodeId },

    /// A compromised node was cut off the network.
    IsolatedCompromised { id: NodeId },

    /// A normal node crossed the local risk threshold and was cut off
    /// before the attacker could reach it.
    PreemptivelyIsolated { id: NodeId, local_risk: f64 },
}

impl fmt::Display for HealAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealAction::Restored { id } => write!(f, "Restored Node {}", id),
            HealAction::IsolatedCompromised { id } => {
                write!(f, "Isolated Compromised Node {}", id)
            }
            HealAction::PreemptivelyIsolated { id, local_risk } => {
                write!(f, "Preemptively Isolated Node {} (High Risk: {})", id, local_risk)
            }
        }
    }
}

/// The rule-based healing policy.
///
/// Stateless between passes apart from its threshold; all decisions are
/// functions of the current graph, so the controller never drifts out of
/// sync with it.
#[derive(Debug, Clone)]
pub struct SelfHealingController {
    /// Local-risk level above which a normal node is preemptively cut
    /// off. Strictly greater-than: landing exactly on the threshold does
    /// not trigger.
    pub risk_threshold: f64,
}

impl Default for SelfHealingController {
    fn default() -> Self {
        Self {
            risk_threshold: DEFAULT_RISK_THRESHOLD,
        }
    }
}

impl SelfHealingController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one healing pass over the graph.
    ///
    /// Visits every node once in ascending id order and returns the
    /// actions taken, in execution order. An empty vector means the
    /// network needed no attention.
    pub fn monitor_and_heal(&self, graph: &mut NetworkGraph) -> SimResult<Vec<HealAction>> {
        let mut actions = Vec::new();

        for id in 0..graph.len() {
            match graph.node(id)?.status {
                NodeStatus::Isolated => {
                    if can_restore(graph, id) {
                        graph.restore(id)?;
                        let action = HealAction::Restored { id };
                        log::info!("[HEAL] {}", action);
                        actions.push(action);
                    }
                }
                NodeStatus::Compromised => {
                    graph.isolate(id)?;
                    let action = HealAction::IsolatedCompromised { id };
                    log::warn!("[HEAL] {}", action);
                    actions.push(action);
                }
                NodeStatus::Normal => {
                    let local_risk = local_risk(graph, id)?;
                    if local_risk > self.risk_threshold {
                        graph.isolate(id)?;
                        let action = HealAction::PreemptivelyIsolated { id, local_risk };
                        log::warn!("[HEAL] {}", action);
                        actions.push(action);
                    }
                }
            }
        }

        Ok(actions)
    }
}

/// Blunt per-node risk estimate used only by the healing policy.
///
/// `min(vulnerabilities * 0.1 + 0.3 * compromised_predecessors, 1.0)`,
/// counting predecessors whether or not the connecting edge is active.
pub fn local_risk(graph: &NetworkGraph, id: NodeId) -> SimResult<f64> {
    let vulns = graph.node(id)?.vulnerabilities;

    let mut compromised_preds = 0u32;
    for &pred in graph.predecessors(id) {
        if graph.nodes()[pred].status == NodeStatus::Compromised {
            compromised_preds += 1;
        }
    }

    Ok((f64::from(vulns) * LOCAL_VULNERABILITY_WEIGHT
        + f64::from(compromised_preds) * LOCAL_NEIGHBOR_WEIGHT)
        .min(1.0))
}

/// Whether an isolated node is safe to bring back: true when no
/// predecessor is currently compromised, active edge or not.
pub fn can_restore(graph: &NetworkGraph, id: NodeId) -> bool {
    graph
        .predecessors(id)
        .iter()
        .all(|&pred| graph.nodes()[pred].status != NodeStatus::Compromised)
}
