//! # Composite Risk Scorer
//!
//! Pure read-side scoring over the network graph. Nothing here mutates
//! state: the attack and healing layers move risk, this module only
//! measures it.
//!
//! ## Scoring Model
//!
//! Per-node risk is a clamped sum of three factors:
//!
//! ```text
//! base     = criticality * 0.4 + min(vulnerabilities, 5) * 0.1
//! exposure = min(0.25 * compromised_active_in_neighbors, 0.5)
//! risk     = min(base + exposure, 1.0)
//! ```
//!
//! Weights:
//! - Criticality: 0.4 - what the node is worth
//! - Vulnerabilities: 0.1 each - how soft the node is
//! - Exposure: 0.25 per compromised neighbor with an active inbound
//!   edge, capped at 0.5 - how close the fire already is
//!
//! Exposure only counts active edges: an isolated attacker cannot reach
//! the node, so its influence is cut the moment the link goes down. The
//! healing controller's local heuristic (see the parent module) is a
//! deliberately different, blunter instrument; the two are not meant to
//! agree.

use crate::graph::nodes::{Node, NodeId, NodeStatus, MAX_VULNERABILITIES};
use crate::graph::NetworkGraph;
use crate::SimResult;

/// Weight applied to the node's role-derived criticality.
pub const CRITICALITY_WEIGHT: f64 = 0.4;

/// Risk added per open vulnerability (capped at `MAX_VULNERABILITIES`).
pub const VULNERABILITY_WEIGHT: f64 = 0.1;

/// Risk added per compromised neighbor with an active inbound edge.
pub const EXPOSURE_PER_NEIGHBOR: f64 = 0.25;

/// Ceiling on total exposure contribution.
pub const EXPOSURE_CAP: f64 = 0.5;

/// Risk score in [0.0, 1.0] for a single node.
///
/// Fails with `NodeNotFound` if the id is out of range; no default is
/// substituted.
pub fn node_risk(graph: &NetworkGraph, id: NodeId) -> SimResult<f64> {
    Ok(score_node(graph, graph.node(id)?))
}

/// Mean node risk across the whole graph. An empty graph scores 0.0 by
/// definition; it is not an error.
pub fn network_risk(graph: &NetworkGraph) -> f64 {
    if graph.is_empty() {
        return 0.0;
    }
    let total: f64 = graph.nodes().iter().map(|n| score_node(graph, n)).sum();
    total / graph.len() as f64
}

/// Node ids most in need of attention: sorted by risk descending, ties
/// resolved toward the lower id (stable sort over id-ascending order),
/// truncated to `top_n`.
pub fn recommend_critical_fixes(graph: &NetworkGraph, top_n: usize) -> Vec<NodeId> {
    let mut ranked: Vec<(NodeId, f64)> = graph
        .nodes()
        .iter()
        .map(|n| (n.id, score_node(graph, n)))
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.into_iter().take(top_n).map(|(id, _)| id).collect()
}

/// Human-readable band for a risk value, for logs and dashboards.
pub fn risk_level_label(risk: f64) -> &'static str {
    match risk {
        r if r >= 0.8 => "CRITICAL",
        r if r >= 0.6 => "HIGH",
        r if r >= 0.4 => "ELEVATED",
        r if r >= 0.2 => "MODERATE",
        _ => "LOW",
    }
}

fn score_node(graph: &NetworkGraph, node: &Node) -> f64 {
    let base = node.criticality * CRITICALITY_WEIGHT
        + f64::from(node.vulnerabilities.min(MAX_VULNERABILITIES)) * VULNERABILITY_WEIGHT;

    let mut compromised_neighbors = 0u32;
    for &source in graph.predecessors(node.id) {
        let link_active = graph.edge(source, node.id).is_some_and(|e| e.active);
        if link_active && graph.nodes()[source].status == NodeStatus::Compromised {
            compromised_neighbors += 1;
        }
    }
    let exposure = (EXPOSURE_PER_NEIGHBOR * f64::from(compromised_neighbors)).min(EXPOSURE_CAP);

    (base + exposure).min(1.0)
}
