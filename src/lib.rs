//! # AEGIS Mesh - Core Library
//!
//! Self-healing network attack-defense simulation.
//!
//! AEGIS Mesh builds a randomized service topology, batters it with
//! scripted attackers (DDoS floods, SQL injection, lateral movement),
//! scores the blast radius, and heals: compromised and high-risk nodes
//! are cut off the network, and isolated nodes come back patched once
//! their neighborhood is clean.
//!
//! ## Design Philosophy
//! - **Simulation only.** No packets leave the process. The network, the
//!   attacks, and the defenses are all in-memory models.
//! - **Attack, Score, Defend, Repeat.** Every tick runs the same pipeline.
//! - One seed pins an entire run, topology and attack draws included.
//! - Small enough to embed: a gym-style environment wraps the same core
//!   for reinforcement-learning experiments.

pub mod attack;
pub mod defense;
pub mod env;
pub mod graph;
pub mod sim;
pub mod viz;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::nodes::NodeId;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Unified error type for AEGIS Mesh.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Node {id} does not exist (graph has {count} nodes)")]
    NodeNotFound { id: NodeId, count: usize },

    #[error("Invalid status '{0}' (expected normal, compromised, or isolated)")]
    InvalidStatus(String),

    #[error("Invalid attack kind: {0}")]
    InvalidAttack(String),

    #[error("Action {action} out of range for a {num_nodes}-node network")]
    InvalidAction { action: usize, num_nodes: usize },

    #[error("Policy error: {0}")]
    Policy(String),

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

pub type SimResult<T> = Result<T, SimError>;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Top-level configuration for AEGIS Mesh.
///
/// Loaded from `aegis-mesh.toml` in the working directory or a path
/// supplied via CLI flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshConfig {
    /// Network shape and seeding.
    pub general: GeneralConfig,

    /// Continuous-run loop settings.
    pub run: RunConfig,

    /// Reinforcement-learning environment settings.
    pub environment: EnvironmentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// How many nodes the generated network carries.
    pub num_nodes: usize,

    /// Seed for topology and attack draws. None = fresh entropy per run.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Milliseconds between ticks in the run loop.
    pub tick_interval_ms: u64,

    /// Stop after this many ticks. None = run until interrupted.
    pub max_ticks: Option<u64>,

    /// Print a critical-fixes report every N ticks.
    pub report_interval_ticks: u64,

    /// How many nodes the critical-fixes report lists.
    pub top_fixes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Steps per episode before truncation.
    pub max_steps: u64,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig {
                num_nodes: 15,
                seed: None,
            },
            run: RunConfig {
                tick_interval_ms: 500,
                max_ticks: None,
                report_interval_ticks: 10,
                top_fixes: 3,
            },
            environment: EnvironmentConfig { max_steps: 100 },
        }
    }
}

impl MeshConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &std::path::Path) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MeshConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Write the default configuration to a TOML file.
    pub fn write_default(path: &std::path::Path) -> SimResult<()> {
        let config = Self::default();
        let content =
            toml::to_string_pretty(&config).map_err(|e| SimError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
