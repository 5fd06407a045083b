//! # AEGIS Mesh - CLI Entry Point
//!
//! Command-line interface for the AEGIS Mesh simulator.
//!
//! Commands:
//! - `run`         - Run the attack-defense loop until interrupted
//! - `episode`     - Play one defense episode in the RL environment
//! - `snapshot`    - Advance a fresh simulation and print its state as JSON
//! - `topology`    - Print the generated network topology as JSON
//! - `inject`      - Fire one manual attack at a node and show the result
//! - `init-config` - Generate a default configuration file

use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use aegis_mesh::attack::AttackKind;
use aegis_mesh::defense::risk;
use aegis_mesh::env::DefenseEnv;
use aegis_mesh::sim::Simulation;
use aegis_mesh::viz;
use aegis_mesh::{MeshConfig, SimError, SimResult};

/// AEGIS Mesh - Self-healing network attack-defense simulator.
///
/// Generates a service topology, runs scripted attacks against it,
/// scores network risk, and heals the damage tick by tick. Simulation
/// only; nothing leaves the process.
#[derive(Parser, Debug)]
#[command(name = "aegis-mesh")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "aegis-mesh.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the attack-defense loop until interrupted.
    Run,

    /// Play one defense episode in the RL environment.
    Episode,

    /// Advance a fresh simulation and print its state as JSON.
    Snapshot {
        /// Ticks to advance before capturing.
        #[arg(short, long, default_value_t = 0)]
        ticks: u64,
    },

    /// Print the generated network topology as JSON.
    Topology,

    /// Fire one manual attack at a node and show the result.
    Inject {
        /// Node to hit.
        #[arg(short, long)]
        target: usize,

        /// Attack kind: ddos or sqli.
        #[arg(short, long)]
        kind: String,
    },

    /// Generate a default configuration file.
    InitConfig,
}

fn main() -> SimResult<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run => cmd_run(&cli.config),
        Commands::Episode => cmd_episode(&cli.config),
        Commands::Snapshot { ticks } => cmd_snapshot(&cli.config, ticks),
        Commands::Topology => cmd_topology(&cli.config),
        Commands::Inject { target, kind } => cmd_inject(&cli.config, target, &kind),
        Commands::InitConfig => cmd_init_config(&cli.config),
    }
}

/// Load configuration, falling back to defaults when no file exists.
fn load_config(config_path: &Path) -> SimResult<MeshConfig> {
    if config_path.exists() {
        info!("Loading configuration from: {}", config_path.display());
        MeshConfig::from_file(config_path)
    } else {
        info!("No config file found, using defaults. Run 'init-config' to generate one.");
        Ok(MeshConfig::default())
    }
}

/// Build a simulation from the configured shape and seed.
fn build_sim(config: &MeshConfig) -> Simulation {
    match config.general.seed {
        Some(seed) => Simulation::with_seed(config.general.num_nodes, seed),
        None => Simulation::new(config.general.num_nodes),
    }
}

/// Run the attack-defense loop.
///
/// 1. Load configuration
/// 2. Generate the network
/// 3. Install shutdown signal handler
/// 4. Enter the attack-score-defend loop
fn cmd_run(config_path: &Path) -> SimResult<()> {
    info!("AEGIS Mesh starting...");

    let config = load_config(config_path)?;
    let mut sim = build_sim(&config);
    info!(
        "Network online: {} nodes, {} edges{}",
        sim.graph().len(),
        sim.graph().edge_count(),
        match config.general.seed {
            Some(seed) => format!(" (seed {})", seed),
            None => String::new(),
        }
    );

    // Set up graceful shutdown signal
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!("Could not install signal handler: {}. Use kill to stop.", e);
    }

    info!("AEGIS Mesh is running. Simulation only. Break and heal.");

    let tick_interval = std::time::Duration::from_millis(config.run.tick_interval_ms);

    // -----------------------------------------------------------------------
    // Main loop: Attack -> Score -> Defend
    // -----------------------------------------------------------------------
    loop {
        // 1. Check for shutdown signal
        if shutdown.load(Ordering::SeqCst) {
            info!("Shutdown signal received. Stopping gracefully...");
            break;
        }

        // 2. Advance one tick
        let outcome = sim.tick()?;

        // 3. Report what happened
        if let Some(attack) = &outcome.attack {
            info!(
                "Tick {}: {} | network risk {:.3} [{}]",
                outcome.tick,
                attack,
                outcome.network_risk,
                risk::risk_level_label(outcome.network_risk)
            );
        }
        for action in &outcome.healing_actions {
            info!("  Heal: {}", action);
        }

        // 4. Periodic patch-priority report
        if outcome.tick.is_multiple_of(config.run.report_interval_ticks) {
            let fixes = sim.recommend_critical_fixes(config.run.top_fixes);
            if !fixes.is_empty() {
                info!("Patch priority (riskiest first): nodes {:?}", fixes);
            }
        }

        // 5. Honor the tick budget, if one is set
        if let Some(max_ticks) = config.run.max_ticks {
            if outcome.tick >= max_ticks {
                info!("Tick budget reached ({}).", max_ticks);
                break;
            }
        }

        // 6. Sleep until the next tick
        std::thread::sleep(tick_interval);
    }

    // -----------------------------------------------------------------------
    // Shutdown summary
    // -----------------------------------------------------------------------
    let snapshot = sim.snapshot();
    info!(
        "AEGIS Mesh stopped after {} ticks. Final risk {:.3} [{}] ({} normal / {} compromised / {} isolated).",
        snapshot.tick,
        snapshot.network_risk,
        risk::risk_level_label(snapshot.network_risk),
        snapshot.counts.normal,
        snapshot.counts.compromised,
        snapshot.counts.isolated,
    );

    Ok(())
}

/// Play one defense episode in the RL environment.
///
/// The episode shape comes from the configuration: node count and seed
/// from `[general]`, step budget from `[environment]`. A reactive
/// baseline policy drives it (isolate the first compromised node, else
/// hold) until the network collapses or the budget runs out.
fn cmd_episode(config_path: &Path) -> SimResult<()> {
    let config = load_config(config_path)?;
    let mut env = DefenseEnv::from_config(&config);
    info!(
        "Episode starting: {} nodes, {} steps budgeted",
        env.num_nodes(),
        env.max_steps
    );

    let mut observation = env.observation();
    let mut total_reward = 0.0;
    loop {
        // Status 1 is compromised; action id + 1 isolates that node.
        let action = observation
            .iter()
            .position(|&status| status == 1)
            .map(|id| id + 1)
            .unwrap_or(0);

        let outcome = env.step(action)?;
        total_reward += outcome.reward;

        if outcome.terminated || outcome.truncated {
            let ending = if outcome.terminated {
                "collapsed"
            } else {
                "survived"
            };
            println!(
                "Episode {} after {} steps: total reward {:.1}, {} compromised, {} isolated",
                ending,
                env.current_step(),
                total_reward,
                outcome.info.compromised,
                outcome.info.isolated
            );
            break;
        }
        observation = outcome.observation;
    }

    Ok(())
}

/// Advance a fresh simulation and print its snapshot as JSON.
fn cmd_snapshot(config_path: &Path, ticks: u64) -> SimResult<()> {
    let config = load_config(config_path)?;
    let mut sim = build_sim(&config);

    for _ in 0..ticks {
        sim.tick()?;
    }

    let snapshot = sim.snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

/// Print the generated topology in render shape as JSON.
fn cmd_topology(config_path: &Path) -> SimResult<()> {
    let config = load_config(config_path)?;
    let sim = build_sim(&config);

    let view = viz::topology(sim.graph());
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

/// Fire one manual attack and report the node's state afterwards.
fn cmd_inject(config_path: &Path, target: usize, kind: &str) -> SimResult<()> {
    let kind: AttackKind = kind.parse()?;
    let config = load_config(config_path)?;
    let mut sim = build_sim(&config);

    let report = sim.inject_attack(target, kind)?;
    println!("{}", report);

    let node = sim.graph().node(target)?;
    println!(
        "Node {} now: status {}, load {:.1}, vulnerabilities {}",
        target, node.status, node.traffic_load, node.vulnerabilities
    );
    Ok(())
}

/// Generate a default configuration file.
fn cmd_init_config(config_path: &Path) -> SimResult<()> {
    if config_path.exists() {
        return Err(SimError::Config(format!(
            "Configuration file already exists: {}. Remove it first or use a different path.",
            config_path.display()
        )));
    }

    MeshConfig::write_default(config_path)?;
    println!("Default configuration written to: {}", config_path.display());
    println!("Edit this file to shape the network and the run loop.");
    println!();
    println!("Key settings to configure:");
    println!("  [general]     - num_nodes (default 15) and an optional fixed seed");
    println!("  [run]         - tick cadence, reporting, and an optional tick budget");
    println!("  [environment] - episode length for RL experiments");

    Ok(())
}
