//! # Defense Environment
//!
//! A reinforcement-learning adapter over the graph and attack engine,
//! shaped like a gym environment: `reset` starts an episode, `step`
//! takes one flat-encoded action, runs one random attack, and returns
//! observation, reward, and episode flags.
//!
//! ## Action space
//!
//! For a network of `n` nodes the action index is flat over
//! `2 * n + 1` choices:
//!
//! ```text
//! 0            do nothing
//! 1 ..= n      isolate node (index - 1)
//! n+1 ..= 2n   restore node (index - n - 1)
//! ```
//!
//! ## Reward
//!
//! ```text
//! reward = action cost (isolate -1.0 when it fires, restore -0.5 always)
//!        + 1.0 * healthy - 5.0 * compromised - 0.5 * isolated
//!        - 100.0 extra when every node has fallen
//! ```
//!
//! An isolate aimed at an already-isolated node is a wasted move and
//! costs nothing. A restore always executes and always costs; on a
//! healthy node it acts as a patch, wiping vulnerabilities and load.
//!
//! The scripted self-healing controller does not run here. The acting
//! agent is the only defense in the loop, and the attacker is the only
//! other force. Episodes truncate after `max_steps` and terminate early
//! with a large penalty when the whole network is compromised.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::fmt;

use crate::attack::AttackEngine;
use crate::graph::nodes::{NodeId, NodeStatus};
use crate::graph::NetworkGraph;
use crate::{MeshConfig, SimError, SimResult};

// --- Reward shape ---

/// Per-node reward for a healthy (normal) node at the end of a step.
pub const HEALTHY_REWARD: f64 = 1.0;

/// Per-node penalty for a compromised node.
pub const COMPROMISED_PENALTY: f64 = 5.0;

/// Per-node penalty for an isolated node. Isolation protects, but a
/// quarantined service still serves nobody.
pub const ISOLATED_PENALTY: f64 = 0.5;

/// Cost of an isolate action that actually fires.
pub const ISOLATE_ACTION_COST: f64 = 1.0;

/// Cost of a restore action. Always charged.
pub const RESTORE_ACTION_COST: f64 = 0.5;

/// Extra penalty when the episode ends with every node compromised.
pub const COLLAPSE_PENALTY: f64 = 100.0;

/// Default step budget per episode.
pub const DEFAULT_MAX_STEPS: u64 = 100;

// --- Actions ---

/// A decoded defense action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DefenseAction {
    NoOp,
    Isolate(NodeId),
    Restore(NodeId),
}

impl DefenseAction {
    /// Decode a flat action index for a network of `num_nodes` nodes.
    pub fn from_index(action: usize, num_nodes: usize) -> SimResult<Self> {
        if action == 0 {
            Ok(DefenseAction::NoOp)
        } else if action <= num_nodes {
            Ok(DefenseAction::Isolate(action - 1))
        } else if action <= 2 * num_nodes {
            Ok(DefenseAction::Restore(action - num_nodes - 1))
        } else {
            Err(SimError::InvalidAction { action, num_nodes })
        }
    }

    /// The flat index this action occupies, inverse of `from_index`.
    pub fn to_index(self, num_nodes: usize) -> usize {
        match self {
            DefenseAction::NoOp => 0,
            DefenseAction::Isolate(id) => 1 + id,
            DefenseAction::Restore(id) => 1 + num_nodes + id,
        }
    }
}

impl fmt::Display for DefenseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefenseAction::NoOp => write!(f, "no-op"),
            DefenseAction::Isolate(id) => write!(f, "isolate node {}", id),
            DefenseAction::Restore(id) => write!(f, "restore node {}", id),
        }
    }
}

/// Something that picks a defense action from an observation.
///
/// The observation is the graph's state vector, one status byte per
/// node id. Implementations may keep state (an RL agent's weights, a
/// scripted playbook's counters) and may fail; a failed decision is the
/// caller's problem to downgrade, not the policy's.
pub trait DefensePolicy {
    fn decide(&mut self, observation: &[u8]) -> SimResult<DefenseAction>;
}

// --- Step results ---

/// Status tallies surfaced alongside each step.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StepInfo {
    pub compromised: usize,
    pub isolated: usize,
}

/// Everything one environment step hands back.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    /// Post-step state vector, one status byte per node id.
    pub observation: Vec<u8>,
    pub reward: f64,
    /// Every node compromised; the episode is over.
    pub terminated: bool,
    /// Step budget exhausted.
    pub truncated: bool,
    pub info: StepInfo,
}

// --- Environment ---

/// Episodic attack-defense environment.
pub struct DefenseEnv {
    graph: NetworkGraph,
    engine: AttackEngine,
    seeder: StdRng,
    num_nodes: usize,
    /// Step budget per episode before truncation.
    pub max_steps: u64,
    current_step: u64,
}

impl DefenseEnv {
    /// Environment seeded from OS entropy.
    pub fn new(num_nodes: usize) -> Self {
        Self::build(num_nodes, StdRng::from_os_rng())
    }

    /// Environment with a fixed master seed. Each episode draws its own
    /// sub-seed from the master stream, so a master seed pins the whole
    /// sequence of episodes.
    pub fn with_seed(num_nodes: usize, seed: u64) -> Self {
        Self::build(num_nodes, StdRng::seed_from_u64(seed))
    }

    /// Environment shaped by a loaded configuration: node count and
    /// seed from `[general]`, step budget from `[environment]`.
    pub fn from_config(config: &MeshConfig) -> Self {
        let mut env = match config.general.seed {
            Some(seed) => Self::with_seed(config.general.num_nodes, seed),
            None => Self::new(config.general.num_nodes),
        };
        env.max_steps = config.environment.max_steps;
        env
    }

    fn build(num_nodes: usize, mut seeder: StdRng) -> Self {
        let (graph, engine) = Self::roll_episode(&mut seeder, num_nodes);
        Self {
            graph,
            engine,
            seeder,
            num_nodes,
            max_steps: DEFAULT_MAX_STEPS,
            current_step: 0,
        }
    }

    /// One episode's graph and attack stream from a fresh sub-seed.
    fn roll_episode(seeder: &mut StdRng, num_nodes: usize) -> (NetworkGraph, AttackEngine) {
        let mut stream = StdRng::seed_from_u64(seeder.random::<u64>());
        let graph = NetworkGraph::generate(num_nodes, &mut stream);
        (graph, AttackEngine::from_rng(stream))
    }

    /// Start a fresh episode and return its initial observation.
    pub fn reset(&mut self) -> Vec<u8> {
        let (graph, engine) = Self::roll_episode(&mut self.seeder, self.num_nodes);
        self.graph = graph;
        self.engine = engine;
        self.current_step = 0;
        log::debug!("[ENV] reset: fresh {}-node episode", self.num_nodes);
        self.graph.state_vector()
    }

    /// Take one step: apply the agent's action, let the attacker move,
    /// then score the resulting state.
    pub fn step(&mut self, action: usize) -> SimResult<StepOutcome> {
        let decoded = DefenseAction::from_index(action, self.num_nodes)?;
        let mut reward = self.apply(decoded)?;

        self.engine.random_step(&mut self.graph)?;
        self.current_step += 1;

        let counts = self.graph.status_counts();
        reward += HEALTHY_REWARD * counts.normal as f64
            - COMPROMISED_PENALTY * counts.compromised as f64
            - ISOLATED_PENALTY * counts.isolated as f64;

        let terminated = self.num_nodes > 0 && counts.compromised == self.num_nodes;
        if terminated {
            reward -= COLLAPSE_PENALTY;
            log::warn!(
                "[ENV] network fully compromised after {} steps",
                self.current_step
            );
        }
        let truncated = self.current_step >= self.max_steps;

        log::debug!(
            "[ENV] step {}: {} -> reward {:.1}",
            self.current_step,
            decoded,
            reward
        );

        Ok(StepOutcome {
            observation: self.graph.state_vector(),
            reward,
            terminated,
            truncated,
            info: StepInfo {
                compromised: counts.compromised,
                isolated: counts.isolated,
            },
        })
    }

    fn apply(&mut self, action: DefenseAction) -> SimResult<f64> {
        match action {
            DefenseAction::NoOp => Ok(0.0),
            DefenseAction::Isolate(id) => {
                if self.graph.node(id)?.status == NodeStatus::Isolated {
                    // Wasted move, but not a punished one.
                    Ok(0.0)
                } else {
                    self.graph.isolate(id)?;
                    Ok(-ISOLATE_ACTION_COST)
                }
            }
            DefenseAction::Restore(id) => {
                self.graph.restore(id)?;
                Ok(-RESTORE_ACTION_COST)
            }
        }
    }

    /// Size of the flat action space: no-op plus isolate and restore
    /// per node.
    pub fn action_count(&self) -> usize {
        2 * self.num_nodes + 1
    }

    /// The current observation without stepping.
    pub fn observation(&self) -> Vec<u8> {
        self.graph.state_vector()
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn current_step(&self) -> u64 {
        self.current_step
    }

    /// Read access to the live episode graph.
    pub fn graph(&self) -> &NetworkGraph {
        &self.graph
    }
}
