//! Configuration parsing and validation for 2D SPH runs

use serde::{Deserialize, Serialize};
use sph2d_kernel::{FluidParams, IterativeSettings, PressureSolver};
use std::fs;

/// Main simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Human-readable simulation name
    pub name: String,
    /// Initial particle layout
    pub scenario: Scenario,
    /// Domain width
    #[serde(default = "default_width")]
    pub width: f32,
    /// Domain height
    #[serde(default = "default_height")]
    pub height: f32,
    /// Particle size h (lattice spacing and smoothing length)
    pub particle_size: f32,
    /// Kernel support radius (defaults to 2h)
    #[serde(default)]
    pub kernel_support: Option<f32>,
    /// Rest density rho0
    #[serde(default = "default_rest_density")]
    pub rest_density: f32,
    /// Kinematic viscosity
    #[serde(default = "default_viscosity")]
    pub viscosity: f32,
    /// Gravity magnitude, pointing down
    #[serde(default = "default_gravity")]
    pub gravity: f32,
    /// Pressure solver and its parameters
    pub pressure_solver: PressureSolverConfig,
    /// Fixed time step
    pub time_step: f32,
    /// Stop after this many timesteps (run until stopped if absent)
    #[serde(default)]
    pub max_timesteps: Option<u64>,
    /// Recolor fluid particles by speed after every step
    #[serde(default = "default_recolor")]
    pub recolor: bool,
    /// Seed for the random fluid colors (entropy-seeded if absent)
    #[serde(default)]
    pub seed: Option<u64>,
    /// Log diagnostics every this many timesteps
    #[serde(default = "default_log_every")]
    pub log_every: u64,
}

/// Initial particle layout. Every scenario is enclosed by three layers of
/// boundary particles on the left, right and bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scenario {
    /// Fluid block in the lower-left quarter
    BreakingDam,
    /// Breaking dam with a perforated wall in the middle of the domain
    LeakyDam,
    /// Fluid block standing on a boundary pedestal
    DroppingFluid,
    /// Fluid on a slanted ramp
    FlowingFluid,
    /// Shallow pool across the whole floor
    RestingFluid,
}

/// Pressure solver selection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PressureSolverConfig {
    /// Explicit state equation
    Compressible {
        /// Stiffness constant k
        stiffness: f32,
    },
    /// Iterative divergence correction
    Incompressible {
        /// Mean relative density error to converge to
        max_error: f32,
        /// Iteration cap per step
        #[serde(default = "default_max_iterations")]
        max_iterations: u32,
    },
}

// Default values
fn default_width() -> f32 {
    1200.0
}

fn default_height() -> f32 {
    750.0
}

fn default_rest_density() -> f32 {
    1.0
}

fn default_viscosity() -> f32 {
    1.0e-6
}

fn default_gravity() -> f32 {
    9.81
}

fn default_max_iterations() -> u32 {
    sph2d_kernel::pressure::DEFAULT_MAX_ITERATIONS
}

fn default_recolor() -> bool {
    true
}

fn default_log_every() -> u64 {
    100
}

impl SimulationConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &str) -> Result<Self, String> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path, e))?;
        Self::from_json(&contents)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, String> {
        let config: SimulationConfig = serde_json::from_str(json)
            .map_err(|e| format!("Failed to parse config JSON: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        // Domain
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err("Domain width and height must be positive".to_string());
        }

        // Particle size: scenarios are laid out on an integer lattice
        if !(self.particle_size >= 1.0) {
            return Err("Particle size must be at least 1".to_string());
        }
        if self.particle_size * 6.0 > self.width.min(self.height) {
            return Err("Domain must be wider and taller than six particles".to_string());
        }

        if let Some(support) = self.kernel_support {
            if !(support >= self.particle_size) {
                return Err("Kernel support must be at least the particle size".to_string());
            }
        }

        // Fluid
        if !(self.rest_density > 0.0) {
            return Err("Rest density must be positive".to_string());
        }
        if !(self.viscosity >= 0.0) {
            return Err("Viscosity must be non-negative".to_string());
        }
        if !self.gravity.is_finite() {
            return Err("Gravity must be finite".to_string());
        }

        // Solver
        match self.pressure_solver {
            PressureSolverConfig::Compressible { stiffness } => {
                if !(stiffness > 0.0) {
                    return Err("Stiffness must be positive".to_string());
                }
            }
            PressureSolverConfig::Incompressible {
                max_error,
                max_iterations,
            } => {
                if !(max_error > 0.0) {
                    return Err("max_error must be positive".to_string());
                }
                if max_iterations < sph2d_kernel::pressure::MIN_ITERATIONS {
                    return Err(format!(
                        "max_iterations must be at least {}",
                        sph2d_kernel::pressure::MIN_ITERATIONS
                    ));
                }
            }
        }

        // Time stepping
        if !(self.time_step > 0.0 && self.time_step.is_finite()) {
            return Err("Time step must be positive".to_string());
        }
        if let Some(max_timesteps) = self.max_timesteps {
            if max_timesteps == 0 {
                return Err("max_timesteps must be at least 1".to_string());
            }
        }
        if self.log_every == 0 {
            return Err("log_every must be at least 1".to_string());
        }

        Ok(())
    }

    /// Kernel support radius (explicit or 2h)
    pub fn kernel_support(&self) -> f32 {
        self.kernel_support.unwrap_or(2.0 * self.particle_size)
    }

    /// Uniform particle mass `rho0 * h^2`
    pub fn particle_mass(&self) -> f32 {
        self.rest_density * self.particle_size * self.particle_size
    }

    /// Kernel parameters for this configuration
    pub fn fluid_params(&self) -> FluidParams {
        FluidParams {
            width: self.width,
            height: self.height,
            particle_size: self.particle_size,
            kernel_support: self.kernel_support(),
            rest_density: self.rest_density,
            viscosity: self.viscosity,
            gravity: self.gravity,
        }
    }

    /// Kernel pressure strategy for this configuration
    pub fn pressure_solver(&self) -> PressureSolver {
        match self.pressure_solver {
            PressureSolverConfig::Compressible { stiffness } => {
                PressureSolver::StateEquation { stiffness }
            }
            PressureSolverConfig::Incompressible {
                max_error,
                max_iterations,
            } => PressureSolver::Iterative(IterativeSettings {
                max_error,
                max_iterations,
            }),
        }
    }
}
