//! # Simulation Facade
//!
//! One object that wires the pieces together and advances time. Each
//! tick runs the same pipeline:
//!
//! 1. the attacker takes one random step,
//! 2. network risk is scored on the post-attack state,
//! 3. an optional defense policy acts on the observation,
//! 4. the self-healing controller sweeps the graph.
//!
//! The risk figure in a tick's outcome is the post-attack, pre-healing
//! value: it measures the threat the defenses were facing, not the
//! state they left behind.
//!
//! A seed pins everything. `with_seed` feeds one stream through
//! topology generation and then hands the remainder to the attack
//! engine, so the same seed always yields the same graph and the same
//! attack sequence. Policy failures never poison a tick; a decision or
//! application error downgrades to no-op and the healing sweep still
//! runs.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::{Arc, Mutex};

use crate::attack::{AttackEngine, AttackKind, AttackReport};
use crate::defense::risk;
use crate::defense::{HealAction, SelfHealingController};
use crate::env::{DefenseAction, DefensePolicy};
use crate::graph::nodes::{NodeId, NodeStatus, OsKind, Role};
use crate::graph::{NetworkGraph, StatusCounts};
use crate::{SimError, SimResult};

/// Intensity of a manually injected DDoS burst. One burst on a fresh
/// node lands exactly on the load limit and is survivable; the second
/// is not.
pub const MANUAL_DDOS_INTENSITY: f64 = 100.0;

/// A simulation behind a shared, lockable handle, for callers that
/// drive ticks from one thread and read state from another.
pub type SharedSimulation = Arc<Mutex<Simulation>>;

/// What one tick did.
#[derive(Debug, Clone, Serialize)]
pub struct TickOutcome {
    pub tick: u64,
    /// The attacker's move, absent only on an empty network.
    pub attack: Option<AttackReport>,
    /// Mean node risk after the attack, before any defense acted.
    pub network_risk: f64,
    /// The policy's move, when one was in the loop and both its
    /// decision and application succeeded.
    pub policy_action: Option<DefenseAction>,
    /// Human-readable healing log, in sweep order.
    pub healing_actions: Vec<String>,
}

/// Per-node slice of a snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub role: Role,
    pub os: OsKind,
    pub status: NodeStatus,
    pub vulnerabilities: u8,
    pub criticality: f64,
    pub traffic_load: f64,
    pub risk: f64,
}

/// Full network state at a point in time, shaped for export.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub taken_at: DateTime<Utc>,
    pub network_risk: f64,
    pub counts: StatusCounts,
    pub nodes: Vec<NodeSnapshot>,
}

/// The assembled simulation: graph, attacker, healer, clock.
pub struct Simulation {
    graph: NetworkGraph,
    attacker: AttackEngine,
    healer: SelfHealingController,
    tick: u64,
}

impl Simulation {
    /// Simulation over a fresh random topology, seeded from OS entropy.
    pub fn new(num_nodes: usize) -> Self {
        Self::build(num_nodes, StdRng::from_os_rng())
    }

    /// Fully replayable simulation: one seed covers both the generated
    /// topology and every subsequent attack draw.
    pub fn with_seed(num_nodes: usize, seed: u64) -> Self {
        Self::build(num_nodes, StdRng::seed_from_u64(seed))
    }

    fn build(num_nodes: usize, mut stream: StdRng) -> Self {
        let graph = NetworkGraph::generate(num_nodes, &mut stream);
        Self {
            graph,
            attacker: AttackEngine::from_rng(stream),
            healer: SelfHealingController::new(),
            tick: 0,
        }
    }

    /// Wrap this simulation in a shared, lockable handle.
    pub fn shared(self) -> SharedSimulation {
        Arc::new(Mutex::new(self))
    }

    /// Advance one tick without a policy in the loop.
    pub fn tick(&mut self) -> SimResult<TickOutcome> {
        self.advance(None)
    }

    /// Advance one tick with a defense policy acting between the attack
    /// and the healing sweep.
    pub fn tick_with_policy(&mut self, policy: &mut dyn DefensePolicy) -> SimResult<TickOutcome> {
        self.advance(Some(policy))
    }

    fn advance(&mut self, policy: Option<&mut dyn DefensePolicy>) -> SimResult<TickOutcome> {
        self.tick += 1;

        // 1. Attacker moves.
        let attack = self.attacker.random_step(&mut self.graph)?;

        // 2. Score the damage before anyone reacts.
        let network_risk = risk::network_risk(&self.graph);

        // 3. Optional policy move. Failures downgrade to no-op.
        let policy_action = match policy {
            Some(policy) => self.run_policy(policy),
            None => None,
        };

        // 4. Healing sweep.
        let healing = self.healer.monitor_and_heal(&mut self.graph)?;
        let healing_actions: Vec<String> = healing.iter().map(HealAction::to_string).collect();

        log::info!(
            "[TICK] {}: risk {:.3}, {} healing action(s)",
            self.tick,
            network_risk,
            healing_actions.len()
        );

        Ok(TickOutcome {
            tick: self.tick,
            attack,
            network_risk,
            policy_action,
            healing_actions,
        })
    }

    fn run_policy(&mut self, policy: &mut dyn DefensePolicy) -> Option<DefenseAction> {
        let observation = self.graph.state_vector();
        let action = match policy.decide(&observation) {
            Ok(action) => action,
            Err(err) => {
                log::warn!("[POLICY] decision failed, holding: {}", err);
                return None;
            }
        };
        let applied = match action {
            DefenseAction::NoOp => Ok(()),
            DefenseAction::Isolate(id) => self.graph.isolate(id),
            DefenseAction::Restore(id) => self.graph.restore(id),
        };
        match applied {
            Ok(()) => {
                log::info!("[POLICY] {}", action);
                Some(action)
            }
            Err(err) => {
                log::warn!("[POLICY] {} rejected: {}", action, err);
                None
            }
        }
    }

    /// Fire a manual attack at a node. Only the targeted kinds make
    /// sense here; lateral movement is a sweep, not a shot.
    pub fn inject_attack(&mut self, target: NodeId, kind: AttackKind) -> SimResult<AttackReport> {
        let landed = match kind {
            AttackKind::Ddos => self.attacker.ddos(&mut self.graph, target, MANUAL_DDOS_INTENSITY)?,
            AttackKind::SqlInjection => self.attacker.sql_injection(&mut self.graph, target)?,
            AttackKind::Lateral => {
                return Err(SimError::InvalidAttack(
                    "lateral (inject ddos or sqli at a single node)".to_string(),
                ))
            }
        };
        let report = AttackReport {
            kind,
            target: Some(target),
            compromised: if landed { vec![target] } else { Vec::new() },
        };
        log::info!("[ATTACK] manual {}", report);
        Ok(report)
    }

    /// Capture the full network state, risk-scored and timestamped.
    pub fn snapshot(&self) -> Snapshot {
        let nodes = self
            .graph
            .nodes()
            .iter()
            .map(|node| NodeSnapshot {
                id: node.id,
                role: node.role,
                os: node.os,
                status: node.status,
                vulnerabilities: node.vulnerabilities,
                criticality: node.criticality,
                traffic_load: node.traffic_load,
                risk: risk::node_risk(&self.graph, node.id).unwrap_or(0.0),
            })
            .collect();

        Snapshot {
            tick: self.tick,
            taken_at: Utc::now(),
            network_risk: risk::network_risk(&self.graph),
            counts: self.graph.status_counts(),
            nodes,
        }
    }

    /// Tear down and rebuild: new topology, new attack stream, tick
    /// counter back to zero.
    pub fn reset(&mut self, num_nodes: usize, seed: Option<u64>) {
        let stream = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        *self = Self::build(num_nodes, stream);
        log::info!("[TICK] reset to a fresh {}-node network", num_nodes);
    }

    /// Ids of the riskiest nodes right now, highest first.
    pub fn recommend_critical_fixes(&self, top_n: usize) -> Vec<NodeId> {
        risk::recommend_critical_fixes(&self.graph, top_n)
    }

    /// Current mean node risk.
    pub fn network_risk(&self) -> f64 {
        risk::network_risk(&self.graph)
    }

    /// Read access to the live graph.
    pub fn graph(&self) -> &NetworkGraph {
        &self.graph
    }

    /// Ticks advanced since construction or the last reset.
    pub fn current_tick(&self) -> u64 {
        self.tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedPolicy {
        action: DefenseAction,
        observed_lengths: Vec<usize>,
    }

    impl DefensePolicy for ScriptedPolicy {
        fn decide(&mut self, observation: &[u8]) -> SimResult<DefenseAction> {
            self.observed_lengths.push(observation.len());
            Ok(self.action)
        }
    }

    struct OfflinePolicy;

    impl DefensePolicy for OfflinePolicy {
        fn decide(&mut self, _observation: &[u8]) -> SimResult<DefenseAction> {
            Err(SimError::Policy("model offline".to_string()))
        }
    }

    #[test]
    fn test_seed_pins_full_run() {
        let mut sim_a = Simulation::with_seed(12, 42);
        let mut sim_b = Simulation::with_seed(12, 42);
        assert_eq!(sim_a.graph().state_vector(), sim_b.graph().state_vector());

        for _ in 0..30 {
            let out_a = sim_a.tick().unwrap();
            let out_b = sim_b.tick().unwrap();
            assert_eq!(out_a.network_risk, out_b.network_risk);
            assert_eq!(out_a.healing_actions, out_b.healing_actions);
            let (att_a, att_b) = (out_a.attack.unwrap(), out_b.attack.unwrap());
            assert_eq!(att_a.kind, att_b.kind);
            assert_eq!(att_a.target, att_b.target);
            assert_eq!(att_a.compromised, att_b.compromised);
            assert_eq!(sim_a.graph().state_vector(), sim_b.graph().state_vector());
        }
    }

    #[test]
    fn test_tick_risk_is_scored_before_healing() {
        let mut sim = Simulation::with_seed(4, 13);
        for id in 0..4 {
            sim.graph.set_status(id, NodeStatus::Compromised).unwrap();
        }

        // With every node already compromised the attack phase cannot
        // change any risk input, so the expected figure is computable
        // up front. The healer then isolates the lot.
        let expected = risk::network_risk(&sim.graph);
        let outcome = sim.tick().unwrap();

        assert_eq!(outcome.network_risk, expected);
        assert_eq!(outcome.healing_actions.len(), 4);
        for (id, line) in outcome.healing_actions.iter().enumerate() {
            assert_eq!(line, &format!("Isolated Compromised Node {}", id));
        }
        assert!(sim
            .graph
            .nodes()
            .iter()
            .all(|n| n.status == NodeStatus::Isolated));
    }

    #[test]
    fn test_manual_ddos_takes_two_bursts() {
        let mut sim = Simulation::with_seed(3, 8);

        let first = sim.inject_attack(0, AttackKind::Ddos).unwrap();
        assert!(first.compromised.is_empty(), "one burst lands on the limit");
        assert_eq!(sim.graph().node(0).unwrap().traffic_load, 100.0);

        let second = sim.inject_attack(0, AttackKind::Ddos).unwrap();
        assert_eq!(second.compromised, vec![0]);
        assert_eq!(
            sim.graph().node(0).unwrap().status,
            NodeStatus::Compromised
        );
    }

    #[test]
    fn test_manual_lateral_is_rejected() {
        let mut sim = Simulation::with_seed(3, 8);
        let err = sim.inject_attack(0, AttackKind::Lateral).unwrap_err();
        assert!(matches!(err, SimError::InvalidAttack(_)));
    }

    #[test]
    fn test_manual_attack_unknown_target() {
        let mut sim = Simulation::with_seed(3, 8);
        assert!(matches!(
            sim.inject_attack(99, AttackKind::Ddos),
            Err(SimError::NodeNotFound { id: 99, .. })
        ));
    }

    #[test]
    fn test_policy_sees_observation_and_gets_recorded() {
        let mut sim = Simulation::with_seed(6, 31);
        let mut policy = ScriptedPolicy {
            action: DefenseAction::Isolate(2),
            observed_lengths: Vec::new(),
        };

        let outcome = sim.tick_with_policy(&mut policy).unwrap();
        assert_eq!(outcome.policy_action, Some(DefenseAction::Isolate(2)));
        assert_eq!(policy.observed_lengths, vec![6]);
    }

    #[test]
    fn test_failed_policy_decision_downgrades_to_noop() {
        // A policy that errors before touching the graph must leave the
        // tick identical to a policy-free one.
        let mut with_policy = Simulation::with_seed(8, 55);
        let mut without = Simulation::with_seed(8, 55);

        let out_a = with_policy.tick_with_policy(&mut OfflinePolicy).unwrap();
        let out_b = without.tick().unwrap();

        assert_eq!(out_a.policy_action, None);
        assert_eq!(out_a.network_risk, out_b.network_risk);
        assert_eq!(out_a.healing_actions, out_b.healing_actions);
        assert_eq!(with_policy.graph().state_vector(), without.graph().state_vector());
    }

    #[test]
    fn test_out_of_range_policy_action_downgrades_to_noop() {
        let mut with_policy = Simulation::with_seed(8, 55);
        let mut without = Simulation::with_seed(8, 55);
        let mut policy = ScriptedPolicy {
            action: DefenseAction::Isolate(999),
            observed_lengths: Vec::new(),
        };

        let out_a = with_policy.tick_with_policy(&mut policy).unwrap();
        without.tick().unwrap();

        assert_eq!(out_a.policy_action, None);
        assert_eq!(with_policy.graph().state_vector(), without.graph().state_vector());
    }

    #[test]
    fn test_snapshot_shape() {
        let mut sim = Simulation::with_seed(5, 99);
        for _ in 0..3 {
            sim.tick().unwrap();
        }

        let snap = sim.snapshot();
        assert_eq!(snap.tick, 3);
        assert_eq!(snap.nodes.len(), 5);
        assert_eq!(snap.counts.total(), 5);
        assert!((0.0..=1.0).contains(&snap.network_risk));
        for (index, node) in snap.nodes.iter().enumerate() {
            assert_eq!(node.id, index);
            assert!((0.0..=1.0).contains(&node.risk));
        }

        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"taken_at\""));
        assert!(json.contains("\"network_risk\""));
    }

    #[test]
    fn test_reset_rebuilds_from_scratch() {
        let mut sim = Simulation::with_seed(8, 42);
        for _ in 0..10 {
            sim.tick().unwrap();
        }

        sim.reset(5, Some(7));
        assert_eq!(sim.current_tick(), 0);
        assert_eq!(sim.graph().len(), 5);
        assert!(sim.graph().state_vector().iter().all(|&s| s == 0));

        // A reset with a seed is indistinguishable from a fresh build.
        let fresh = Simulation::with_seed(5, 7);
        assert_eq!(sim.graph().state_vector(), fresh.graph().state_vector());
        let keys = |s: &Simulation| {
            s.graph()
                .edges()
                .iter()
                .map(|e| (e.key(), e.active))
                .collect::<Vec<_>>()
        };
        assert_eq!(keys(&sim), keys(&fresh));
    }

    #[test]
    fn test_shared_handle_ticks() {
        let shared: SharedSimulation = Simulation::with_seed(6, 1).shared();
        {
            let mut sim = shared.lock().unwrap();
            sim.tick().unwrap();
        }
        assert_eq!(shared.lock().unwrap().current_tick(), 1);
    }

    #[test]
    fn test_recommend_critical_fixes_bounded() {
        let sim = Simulation::with_seed(10, 64);
        let fixes = sim.recommend_critical_fixes(3);
        assert!(fixes.len() <= 3);
        for id in fixes {
            assert!(id < 10);
        }
    }
}
