//! 2D SPH Fluid Simulation Kernel
//!
//! This crate provides the core of a two-dimensional Smoothed Particle
//! Hydrodynamics (SPH) simulation. It is compute-focused and has no notion of
//! windows, rendering or files; an embedding reads [`Simulation::particles`]
//! between steps.
//!
//! # Modules
//! - [`particle`] -- Particle record and index-stable [`ParticleStore`].
//! - [`neighbor`] -- Counting-sort uniform grid and per-particle neighbor lists.
//! - [`sph`] -- Cubic spline kernel, density summation and acceleration fields.
//! - [`boundary`] -- Mirrored boundary density/pressure substitution.
//! - [`eos`] -- Linear state equation for the compressible solver.
//! - [`pressure`] -- Compressible and iterative (incompressible) pressure solvers.
//! - [`integrator`] -- Semi-implicit Euler updates.
//! - [`color`] -- Speed-based display colors.

#![warn(missing_docs)]

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

pub mod boundary;
pub mod color;
pub mod eos;
pub mod integrator;
pub mod neighbor;
pub mod particle;
pub mod pressure;
pub mod sph;

pub use neighbor::{NeighborLists, ParticleGrid};
pub use particle::{Particle, ParticleStore};
pub use pressure::{IterativeSettings, PressureSolver, SolveOutcome, SolveStatus, SolverScratch};
pub use sph::CubicSpline;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Physical and domain parameters, fixed for the lifetime of a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FluidParams {
    /// Domain width. The domain spans `[0, width] x [0, height]`.
    pub width: f32,
    /// Domain height.
    pub height: f32,
    /// Particle size `h` (kernel smoothing length and lattice spacing).
    pub particle_size: f32,
    /// Kernel support radius, normally `2h`. Also the grid cell size.
    pub kernel_support: f32,
    /// Rest density rho0.
    pub rest_density: f32,
    /// Kinematic viscosity nu.
    pub viscosity: f32,
    /// Gravity magnitude, applied along `-y`.
    pub gravity: f32,
}

impl FluidParams {
    /// Parameters with the default fluid: support `2h`, rho0 = 1,
    /// nu = 1e-6 and g = 9.81.
    pub fn new(width: f32, height: f32, particle_size: f32) -> Self {
        Self {
            width,
            height,
            particle_size,
            kernel_support: 2.0 * particle_size,
            rest_density: 1.0,
            viscosity: 1.0e-6,
            gravity: 9.81,
        }
    }

    /// Uniform particle mass `m = rho0 * h^2`.
    #[inline]
    pub fn particle_mass(&self) -> f32 {
        self.rest_density * self.particle_size * self.particle_size
    }
}

// ---------------------------------------------------------------------------
// Step results and errors
// ---------------------------------------------------------------------------

/// Summary of one completed step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// Index of the step that just finished (1-based).
    pub step: u64,
    /// How the pressure solve ended.
    pub solve: SolveOutcome,
}

/// Failure of [`Simulation::step`].
#[derive(Debug, Clone, PartialEq)]
pub enum StepError {
    /// The time step was not a positive finite number. Nothing was mutated.
    InvalidTimeStep(f32),
    /// A fluid particle ended the step with a non-finite position or velocity.
    /// The step's mutations are kept.
    NonFinite {
        /// Index of the first offending particle.
        index: usize,
        /// Step in which it happened.
        step: u64,
    },
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepError::InvalidTimeStep(dt) => write!(f, "invalid time step {dt}"),
            StepError::NonFinite { index, step } => {
                write!(f, "particle {index} became non-finite in step {step}")
            }
        }
    }
}

impl std::error::Error for StepError {}

/// Aggregate fluid state for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Number of fluid (non-boundary) particles.
    pub fluid_particles: usize,
    /// Mean fluid density.
    pub average_density: f32,
    /// Largest `|rho - rho0| / rho0` over fluid particles.
    pub max_density_error: f32,
    /// Largest fluid speed.
    pub max_speed: f32,
    /// `max_speed * dt / h`.
    pub cfl_number: f32,
    /// Sweeps of the last pressure solve, if a step has run.
    pub solver_iterations: Option<u32>,
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Buffers reused across steps.
#[derive(Debug, Clone, Default)]
struct Workspace {
    density: Vec<f32>,
    non_pressure_acc: Vec<Vec2>,
    pressure_acc: Vec<Vec2>,
    pressures: Vec<f32>,
    solver: SolverScratch,
}

/// Owns the particles and advances them one fixed time step at a time.
///
/// Each step runs:
///
/// 1. Grid rebuild and neighbor lists
/// 2. Density summation
/// 3. Gravity + viscosity, velocity update
/// 4. Pressure solve, pressure acceleration, velocity update
/// 5. Position update, optional speed recolor, finite check
#[derive(Debug, Clone)]
pub struct Simulation {
    particles: ParticleStore,
    params: FluidParams,
    kernel: CubicSpline,
    grid: ParticleGrid,
    neighbors: NeighborLists,
    solver: PressureSolver,
    workspace: Workspace,
    recolor: bool,
    steps: u64,
    last_outcome: Option<SolveOutcome>,
}

impl Simulation {
    /// Create a simulation over `particles`.
    ///
    /// # Arguments
    /// * `particles` - Initial fluid and boundary particles. Boundary particles
    ///   should carry their fixed density; zero is fine since it is mirrored.
    /// * `params` - Domain and fluid parameters.
    /// * `solver` - Pressure strategy for the whole run.
    pub fn new(particles: ParticleStore, params: FluidParams, solver: PressureSolver) -> Self {
        let grid = ParticleGrid::new(params.kernel_support, params.width, params.height);
        tracing::info!(
            particles = particles.len(),
            fluid = particles.fluid_count(),
            h = params.particle_size,
            ?solver,
            "simulation created"
        );
        Self {
            particles,
            params,
            kernel: CubicSpline::new(params.particle_size),
            grid,
            neighbors: NeighborLists::new(),
            solver,
            workspace: Workspace::default(),
            recolor: false,
            steps: 0,
            last_outcome: None,
        }
    }

    /// Enable or disable the speed color remap after each step.
    pub fn with_recolor(mut self, recolor: bool) -> Self {
        self.recolor = recolor;
        self
    }

    /// Current particle state.
    pub fn particles(&self) -> &[Particle] {
        self.particles.as_slice()
    }

    /// Particle store.
    pub fn store(&self) -> &ParticleStore {
        &self.particles
    }

    /// Simulation parameters.
    pub fn params(&self) -> &FluidParams {
        &self.params
    }

    /// Pressure strategy.
    pub fn solver(&self) -> &PressureSolver {
        &self.solver
    }

    /// Spatial grid as of the last step.
    pub fn grid(&self) -> &ParticleGrid {
        &self.grid
    }

    /// Neighbor lists as of the last step.
    pub fn neighbors(&self) -> &NeighborLists {
        &self.neighbors
    }

    /// Smoothing kernel.
    pub fn kernel(&self) -> &CubicSpline {
        &self.kernel
    }

    /// Number of completed steps.
    pub fn step_count(&self) -> u64 {
        self.steps
    }

    /// Outcome of the last pressure solve.
    pub fn last_outcome(&self) -> Option<SolveOutcome> {
        self.last_outcome
    }

    /// Advance the simulation by `dt`.
    ///
    /// A solver that runs out of iterations still completes the step; the
    /// returned report carries [`SolveStatus::BudgetExhausted`].
    pub fn step(&mut self, dt: f32) -> Result<StepReport, StepError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(StepError::InvalidTimeStep(dt));
        }
        let mass = self.params.particle_mass();
        let ws = &mut self.workspace;

        // --- 1. Spatial index ---
        self.grid.rebuild(self.particles.as_slice());
        self.neighbors.rebuild(&self.grid, self.particles.as_slice());

        // --- 2. Density ---
        sph::compute_densities(
            self.particles.as_slice(),
            &self.neighbors,
            &self.kernel,
            mass,
            &mut ws.density,
        );
        for (p, &rho) in self.particles.as_mut_slice().iter_mut().zip(&ws.density) {
            p.density = rho;
        }

        // --- 3. Gravity + viscosity ---
        sph::compute_non_pressure_accelerations(
            self.particles.as_slice(),
            &self.neighbors,
            &self.kernel,
            &self.params,
            &mut ws.non_pressure_acc,
        );
        integrator::apply_accelerations(self.particles.as_mut_slice(), &ws.non_pressure_acc, dt);

        // --- 4. Pressure ---
        let outcome = self.solver.solve(
            self.particles.as_slice(),
            &self.neighbors,
            &self.kernel,
            &self.params,
            dt,
            &mut ws.solver,
            &mut ws.pressures,
        );
        for (p, &pressure) in self.particles.as_mut_slice().iter_mut().zip(&ws.pressures) {
            p.pressure = pressure;
        }
        sph::compute_pressure_accelerations(
            self.particles.as_slice(),
            &ws.pressures,
            &self.neighbors,
            &self.kernel,
            mass,
            self.params.rest_density,
            &mut ws.pressure_acc,
        );
        integrator::apply_accelerations(self.particles.as_mut_slice(), &ws.pressure_acc, dt);

        // --- 5. Positions ---
        integrator::advance_positions(self.particles.as_mut_slice(), dt);
        if self.recolor {
            color::recolor_by_speed(self.particles.as_mut_slice(), self.params.particle_size / dt);
        }

        self.steps += 1;
        self.last_outcome = Some(outcome);

        if let Some(index) = integrator::first_non_finite(self.particles.as_slice()) {
            tracing::error!(index, step = self.steps, "particle state became non-finite");
            return Err(StepError::NonFinite {
                index,
                step: self.steps,
            });
        }

        Ok(StepReport {
            step: self.steps,
            solve: outcome,
        })
    }

    /// Aggregate fluid state, with the CFL number evaluated for `dt`.
    pub fn diagnostics(&self, dt: f32) -> Diagnostics {
        let rest = self.params.rest_density;
        let mut count = 0usize;
        let mut density_sum = 0.0_f64;
        let mut max_error = 0.0_f32;
        let mut max_speed = 0.0_f32;
        for p in self.particles.iter().filter(|p| p.is_fluid()) {
            count += 1;
            density_sum += p.density as f64;
            max_error = max_error.max((p.density - rest).abs() / rest);
            max_speed = max_speed.max(p.velocity.length());
        }
        let average_density = if count > 0 {
            (density_sum / count as f64) as f32
        } else {
            0.0
        };
        Diagnostics {
            fluid_particles: count,
            average_density,
            max_density_error: max_error,
            max_speed,
            cfl_number: max_speed * dt / self.params.particle_size,
            solver_iterations: self.last_outcome.map(|o| o.iterations),
        }
    }
}
