//! Orchestration Layer
//!
//! This crate wires the 2D SPH kernel into a runnable simulation:
//! - JSON configuration loading and validation
//! - Scenario setup (walls, obstacles and fluid blocks)
//! - Simulation runner with lifecycle management on a background thread

#![warn(missing_docs)]

pub mod config;
pub mod domain;
pub mod runner;

pub use config::{PressureSolverConfig, Scenario, SimulationConfig};
pub use runner::{RunSettings, RunnerState, SimulationRunner};

use sph2d_kernel::Simulation;

/// Create a complete simulation from a configuration file
///
/// This function performs the full simulation setup pipeline:
/// 1. Load and validate the configuration
/// 2. Lay out the scenario's boundary and fluid particles
/// 3. Create the simulation with the configured pressure solver
/// 4. Wrap it in a SimulationRunner for lifecycle management
///
/// # Arguments
/// * `config_path` - Path to the JSON configuration file
///
/// # Returns
/// A `SimulationRunner` ready to be started, or an error if setup fails
///
/// # Example
/// ```no_run
/// use sph2d_orchestrator::create_simulation;
///
/// let runner = create_simulation("configs/breaking_dam.json")?;
/// runner.start();
/// // ... query status, pause, resume, etc.
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn create_simulation(config_path: &str) -> Result<SimulationRunner, Box<dyn std::error::Error>> {
    tracing::info!("Creating simulation from config: {}", config_path);

    let config = SimulationConfig::load(config_path)?;
    tracing::info!("Configuration loaded: {}", config.name);

    Ok(create_runner(&config))
}

/// Build the scenario and simulation for an already validated configuration
pub fn create_runner(config: &SimulationConfig) -> SimulationRunner {
    let particles = domain::build_scenario(config);
    let simulation = Simulation::new(particles, config.fluid_params(), config.pressure_solver())
        .with_recolor(config.recolor);

    let settings = RunSettings {
        time_step: config.time_step,
        max_timesteps: config.max_timesteps,
        log_every: config.log_every,
    };
    tracing::info!(
        time_step = settings.time_step,
        max_timesteps = ?settings.max_timesteps,
        "Simulation ready to start"
    );
    SimulationRunner::new(simulation, settings)
}
