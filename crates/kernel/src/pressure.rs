//! Pressure solvers.
//!
//! Two strategies share one capability, "compute a pressure field for this
//! step": an explicit state equation (compressible) and an iterative
//! divergence-correction solve (incompressible, PCISPH-style Jacobi). The
//! strategy is picked once at construction as a [`PressureSolver`] variant.

use glam::Vec2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::eos;
use crate::neighbor::NeighborLists;
use crate::particle::Particle;
use crate::sph::{self, CubicSpline};
use crate::FluidParams;

/// Default cap on iterative solver sweeps per step.
pub const DEFAULT_MAX_ITERATIONS: u32 = 500;

/// Sweeps the iterative solver always performs, regardless of error.
pub const MIN_ITERATIONS: u32 = 2;

/// Settings for the iterative (incompressible) solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterativeSettings {
    /// Mean relative density error below which the solve stops.
    pub max_error: f32,
    /// Hard cap on sweeps per step.
    pub max_iterations: u32,
}

impl IterativeSettings {
    /// Settings with the default iteration cap.
    pub fn new(max_error: f32) -> Self {
        Self {
            max_error,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Pressure strategy, fixed for the lifetime of a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PressureSolver {
    /// Explicit linear state equation (compressible fluid).
    StateEquation {
        /// Stiffness constant k.
        stiffness: f32,
    },
    /// Iterative divergence correction (incompressible fluid).
    Iterative(IterativeSettings),
}

/// How a pressure solve ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// The error criterion was met (always the case for the state equation).
    Converged,
    /// The iteration cap was reached before the error criterion was met, or
    /// the error stopped being finite.
    BudgetExhausted,
}

/// Result of one pressure solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolveOutcome {
    /// Sweeps performed (1 for the state equation).
    pub iterations: u32,
    /// Mean relative density error of the last sweep (0 for the state equation).
    pub mean_error: f32,
    /// Whether the solve converged or ran out of iterations.
    pub status: SolveStatus,
}

impl SolveOutcome {
    /// `true` if the solve met its error criterion.
    pub fn converged(&self) -> bool {
        self.status == SolveStatus::Converged
    }
}

/// Pooled buffers for the iterative solver.
#[derive(Debug, Clone, Default)]
pub struct SolverScratch {
    source: Vec<f32>,
    diagonal: Vec<f32>,
    acc: Vec<Vec2>,
    next: Vec<f32>,
}

impl PressureSolver {
    /// Compute the pressure field for this step into `pressures`.
    ///
    /// `particles` must carry this step's densities and the velocities after
    /// the non-pressure update; their stored pressures seed the iterative
    /// solver's warm start.
    #[allow(clippy::too_many_arguments)]
    pub fn solve(
        &self,
        particles: &[Particle],
        neighbors: &NeighborLists,
        kernel: &CubicSpline,
        params: &FluidParams,
        dt: f32,
        scratch: &mut SolverScratch,
        pressures: &mut Vec<f32>,
    ) -> SolveOutcome {
        match *self {
            PressureSolver::StateEquation { stiffness } => {
                eos::compute_state_equation_pressures(
                    particles,
                    params.rest_density,
                    stiffness,
                    pressures,
                );
                SolveOutcome {
                    iterations: 1,
                    mean_error: 0.0,
                    status: SolveStatus::Converged,
                }
            }
            PressureSolver::Iterative(settings) => solve_divergence(
                particles, neighbors, kernel, params, dt, &settings, scratch, pressures,
            ),
        }
    }
}

/// Iterative divergence-correction pressure solve.
///
/// Per fluid particle, once per step:
/// ```text
/// a_ii = -dt^2 m^2 / rho0^2 * sum_j (sum_k grad W_ik + grad W_ij) . grad W_ij
/// s_i  = -dt m * sum_j (v_i - v_j) . grad W_ij + (rho0 - rho_i)
/// p_i  = p_i / 2                                   (warm start)
/// ```
/// Each sweep recomputes the pressure acceleration field `a` from the current
/// guess and applies a damped Jacobi update:
/// ```text
/// (A p)_i = dt^2 m * sum_j (a_i - a_j) . grad W_ij
/// p_i    += 0.5 * (s_i - (A p)_i) / a_ii,  clamped to >= 0
/// ```
/// Particles with `a_ii == 0` are skipped. Unclamped updates contribute
/// `|(A p)_i - s_i| / rho0` to the mean error. The solve stops once the mean
/// error drops below `max_error` after at least two sweeps, or when
/// `max_iterations` sweeps have run.
#[allow(clippy::too_many_arguments)]
pub fn solve_divergence(
    particles: &[Particle],
    neighbors: &NeighborLists,
    kernel: &CubicSpline,
    params: &FluidParams,
    dt: f32,
    settings: &IterativeSettings,
    scratch: &mut SolverScratch,
    pressures: &mut Vec<f32>,
) -> SolveOutcome {
    let n = particles.len();
    let mass = params.particle_mass();
    let rest_density = params.rest_density;
    let SolverScratch {
        source,
        diagonal,
        acc,
        next,
    } = scratch;

    // --- 1. Diagonal, source term and warm start ---
    source.resize(n, 0.0);
    diagonal.resize(n, 0.0);
    let diag_scale = -dt * dt * mass * mass / (rest_density * rest_density);
    source
        .par_iter_mut()
        .zip(diagonal.par_iter_mut())
        .enumerate()
        .for_each(|(i, (s, a))| {
            let pi = &particles[i];
            if pi.boundary {
                *s = 0.0;
                *a = 0.0;
                return;
            }
            let list = neighbors.get(i);
            let mut grad_sum = Vec2::ZERO;
            let mut divergence = 0.0;
            for &j in list {
                let pj = &particles[j as usize];
                let grad = kernel.gradient(pi.position, pj.position);
                grad_sum += grad;
                divergence += (pi.velocity - pj.velocity).dot(grad);
            }
            let mut self_coupling = 0.0;
            for &j in list {
                let grad = kernel.gradient(pi.position, particles[j as usize].position);
                self_coupling += (grad_sum + grad).dot(grad);
            }
            *s = -dt * mass * divergence + (rest_density - pi.density);
            *a = self_coupling * diag_scale;
        });

    pressures.clear();
    pressures.extend(particles.iter().map(|p| {
        if p.boundary {
            p.pressure
        } else {
            p.pressure / 2.0
        }
    }));

    // --- 2. Jacobi sweeps ---
    let residual_scale = dt * dt * mass;
    let mut iterations = 0;
    loop {
        sph::compute_pressure_accelerations(
            particles,
            pressures,
            neighbors,
            kernel,
            mass,
            rest_density,
            acc,
        );

        let current = &pressures[..];
        let acc_field = &acc[..];
        let source = &source[..];
        let diagonal = &diagonal[..];
        next.resize(n, 0.0);
        let (error_sum, contributors) = next
            .par_iter_mut()
            .enumerate()
            .map(|(i, p_next)| {
                let pi = &particles[i];
                *p_next = current[i];
                if pi.boundary || diagonal[i] == 0.0 {
                    return (0.0_f64, 0_usize);
                }
                let a_p: f32 = neighbors
                    .get(i)
                    .iter()
                    .map(|&j| {
                        let j = j as usize;
                        (acc_field[i] - acc_field[j])
                            .dot(kernel.gradient(pi.position, particles[j].position))
                    })
                    .sum::<f32>()
                    * residual_scale;

                let updated = current[i] + 0.5 * (source[i] - a_p) / diagonal[i];
                if updated < 0.0 {
                    *p_next = 0.0;
                    (0.0, 0)
                } else {
                    *p_next = updated;
                    (((a_p - source[i]) / rest_density).abs() as f64, 1)
                }
            })
            .reduce(|| (0.0, 0), |a, b| (a.0 + b.0, a.1 + b.1));

        std::mem::swap(pressures, next);
        iterations += 1;

        let mean_error = if contributors > 0 {
            (error_sum / contributors as f64) as f32
        } else {
            0.0
        };

        if !mean_error.is_finite() {
            tracing::warn!(iterations, "pressure solve produced a non-finite error");
            return SolveOutcome {
                iterations,
                mean_error,
                status: SolveStatus::BudgetExhausted,
            };
        }
        if mean_error < settings.max_error && iterations >= MIN_ITERATIONS {
            tracing::debug!(iterations, mean_error, "pressure solve converged");
            return SolveOutcome {
                iterations,
                mean_error,
                status: SolveStatus::Converged,
            };
        }
        if iterations >= settings.max_iterations {
            tracing::warn!(
                iterations,
                mean_error,
                max_error = settings.max_error,
                "pressure solve hit its iteration budget"
            );
            return SolveOutcome {
                iterations,
                mean_error,
                status: SolveStatus::BudgetExhausted,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighbor::ParticleGrid;

    struct Fixture {
        particles: Vec<Particle>,
        neighbors: NeighborLists,
        kernel: CubicSpline,
        params: FluidParams,
    }

    /// `n x n` fluid lattice at `spacing`, densities already summed.
    fn fixture(n: usize, spacing: f32) -> Fixture {
        let params = FluidParams::new(200.0, 200.0, 10.0);
        let kernel = CubicSpline::new(params.particle_size);
        let mut particles = Vec::new();
        for ix in 0..n {
            for iy in 0..n {
                let pos = Vec2::new(50.0 + ix as f32 * spacing, 50.0 + iy as f32 * spacing);
                particles.push(Particle::fluid(pos, [0.0; 3]));
            }
        }
        let mut grid = ParticleGrid::new(params.kernel_support, params.width, params.height);
        grid.rebuild(&particles);
        let mut neighbors = NeighborLists::new();
        neighbors.rebuild(&grid, &particles);
        let mut rho = Vec::new();
        sph::compute_densities(&particles, &neighbors, &kernel, params.particle_mass(), &mut rho);
        for (p, r) in particles.iter_mut().zip(rho) {
            p.density = r;
        }
        Fixture {
            particles,
            neighbors,
            kernel,
            params,
        }
    }

    #[test]
    fn state_equation_reports_single_pass() {
        let f = fixture(4, 8.0);
        let solver = PressureSolver::StateEquation { stiffness: 100.0 };
        let mut pressures = Vec::new();
        let outcome = solver.solve(
            &f.particles,
            &f.neighbors,
            &f.kernel,
            &f.params,
            0.1,
            &mut SolverScratch::default(),
            &mut pressures,
        );
        assert_eq!(outcome.iterations, 1);
        assert!(outcome.converged());
        assert_eq!(pressures.len(), f.particles.len());
        assert!(pressures.iter().all(|&p| p >= 0.0));
        // A compressed lattice has positive pressure somewhere.
        assert!(pressures.iter().any(|&p| p > 0.0));
    }

    #[test]
    fn iterative_solver_runs_at_least_two_sweeps() {
        let f = fixture(6, 10.0);
        let settings = IterativeSettings::new(1.0);
        let mut pressures = Vec::new();
        let outcome = solve_divergence(
            &f.particles,
            &f.neighbors,
            &f.kernel,
            &f.params,
            0.1,
            &settings,
            &mut SolverScratch::default(),
            &mut pressures,
        );
        assert_eq!(outcome.iterations, MIN_ITERATIONS);
        assert!(outcome.converged());
    }

    #[test]
    fn iterative_solver_reports_exhausted_budget() {
        let f = fixture(6, 7.0);
        // A zero threshold can never be met.
        let settings = IterativeSettings {
            max_error: 0.0,
            max_iterations: 5,
        };
        let mut pressures = Vec::new();
        let outcome = solve_divergence(
            &f.particles,
            &f.neighbors,
            &f.kernel,
            &f.params,
            0.1,
            &settings,
            &mut SolverScratch::default(),
            &mut pressures,
        );
        assert_eq!(outcome.iterations, 5);
        assert_eq!(outcome.status, SolveStatus::BudgetExhausted);
        assert!(pressures.iter().all(|&p| p >= 0.0));
    }

    #[test]
    fn non_finite_error_stops_the_sweeps() {
        let mut f = fixture(6, 8.0);
        f.particles[14].velocity = Vec2::new(f32::NAN, 0.0);
        let mut pressures = Vec::new();
        let outcome = solve_divergence(
            &f.particles,
            &f.neighbors,
            &f.kernel,
            &f.params,
            0.1,
            &IterativeSettings::new(0.01),
            &mut SolverScratch::default(),
            &mut pressures,
        );
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.status, SolveStatus::BudgetExhausted);
        assert!(outcome.mean_error.is_nan());
    }

    #[test]
    fn warm_start_halves_previous_pressure() {
        let mut f = fixture(1, 10.0);
        // A lone particle has a_ii == 0 and is never updated.
        f.particles[0].pressure = 8.0;
        let mut pressures = Vec::new();
        let outcome = solve_divergence(
            &f.particles,
            &f.neighbors,
            &f.kernel,
            &f.params,
            0.1,
            &IterativeSettings::new(0.01),
            &mut SolverScratch::default(),
            &mut pressures,
        );
        assert_eq!(pressures, vec![4.0]);
        assert_eq!(outcome.mean_error, 0.0);
        assert_eq!(outcome.iterations, MIN_ITERATIONS);
    }
}
