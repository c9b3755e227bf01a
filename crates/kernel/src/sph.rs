//! SPH smoothing kernel and core SPH operators.
//!
//! Implements the 2D cubic spline kernel and its gradient, plus density
//! summation and the two acceleration fields (non-pressure and pressure).
//! Every operator reads a particle snapshot and writes into a separate output
//! buffer, so the per-particle loops run in parallel without locks.

use std::f32::consts::PI;

use glam::Vec2;
use rayon::prelude::*;

use crate::boundary;
use crate::neighbor::NeighborLists;
use crate::particle::Particle;
use crate::FluidParams;

/// Cubic spline smoothing kernel in 2D.
///
/// ```text
/// q = |xi - xj| / h
/// W(q)  = sigma * (max(2 - q, 0)^3 - 4 * max(1 - q, 0)^3)
/// sigma = 5 / (14 pi h^2)
/// ```
///
/// `h` is the particle size; the support radius is `2h`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicSpline {
    h: f32,
    sigma: f32,
}

impl CubicSpline {
    /// Create the kernel for particle size `h`.
    pub fn new(h: f32) -> Self {
        assert!(h > 0.0, "particle size must be positive");
        Self {
            h,
            sigma: 5.0 / (14.0 * PI * h * h),
        }
    }

    /// Particle size `h`.
    pub fn h(&self) -> f32 {
        self.h
    }

    /// 2D normalization constant `sigma`.
    pub fn sigma(&self) -> f32 {
        self.sigma
    }

    /// Kernel value for a normalized distance `q = r / h`.
    #[inline]
    pub fn value_q(&self, q: f32) -> f32 {
        let t1 = (1.0 - q).max(0.0);
        let t2 = (2.0 - q).max(0.0);
        self.sigma * (t2 * t2 * t2 - 4.0 * t1 * t1 * t1)
    }

    /// Kernel value between two positions.
    #[inline]
    pub fn value(&self, xi: Vec2, xj: Vec2) -> f32 {
        self.value_q(xi.distance(xj) / self.h)
    }

    /// Kernel gradient with respect to `xi`.
    ///
    /// ```text
    /// grad W = sigma * (xi - xj) / (q h^2) * (-3 max(2 - q, 0)^2 + 12 max(1 - q, 0)^2)
    /// ```
    ///
    /// Returns the zero vector when `xi == xj`.
    #[inline]
    pub fn gradient(&self, xi: Vec2, xj: Vec2) -> Vec2 {
        let q = xi.distance(xj) / self.h;
        if q == 0.0 {
            return Vec2::ZERO;
        }
        let t1 = (1.0 - q).max(0.0);
        let t2 = (2.0 - q).max(0.0);
        let scale = self.sigma / (q * self.h * self.h) * (-3.0 * t2 * t2 + 12.0 * t1 * t1);
        (xi - xj) * scale
    }
}

// ---------------------------------------------------------------------------
// Density summation
// ---------------------------------------------------------------------------

/// Compute the density of every fluid particle by kernel summation.
///
/// ```text
/// rho_i = m * sum_j W(x_i, x_j)
/// ```
///
/// The sum runs over the full neighbor list, which contains the particle
/// itself and any boundary neighbors. Boundary particles keep their current
/// density.
pub fn compute_densities(
    particles: &[Particle],
    neighbors: &NeighborLists,
    kernel: &CubicSpline,
    mass: f32,
    out: &mut Vec<f32>,
) {
    out.resize(particles.len(), 0.0);
    out.par_iter_mut().enumerate().for_each(|(i, rho)| {
        let pi = &particles[i];
        if pi.boundary {
            *rho = pi.density;
            return;
        }
        let sum: f32 = neighbors
            .get(i)
            .iter()
            .map(|&j| kernel.value(pi.position, particles[j as usize].position))
            .sum();
        *rho = mass * sum;
    });
}

// ---------------------------------------------------------------------------
// Gravity + artificial viscosity
// ---------------------------------------------------------------------------

/// Compute gravity plus artificial viscosity for every fluid particle.
///
/// ```text
/// f_ij    = (v_ij . x_ij) / (|x_ij|^2 + 0.01 h^2) / rho*_j
/// a_visc  = 2 nu m * sum_j f_ij * grad W_ij
/// a_i     = (0, -g) + a_visc
/// ```
///
/// `rho*_j` is the neighbor's density, or the particle's own density when the
/// neighbor is a boundary particle. Boundary particles get zero.
pub fn compute_non_pressure_accelerations(
    particles: &[Particle],
    neighbors: &NeighborLists,
    kernel: &CubicSpline,
    params: &FluidParams,
    out: &mut Vec<Vec2>,
) {
    let h = kernel.h();
    let eta_sq = 0.01 * h * h;
    let mass = params.particle_mass();
    let gravity = Vec2::new(0.0, -params.gravity);
    let visc_scale = 2.0 * params.viscosity * mass;

    out.resize(particles.len(), Vec2::ZERO);
    out.par_iter_mut().enumerate().for_each(|(i, acc)| {
        let pi = &particles[i];
        if pi.boundary {
            *acc = Vec2::ZERO;
            return;
        }
        let mut visc = Vec2::ZERO;
        for &j in neighbors.get(i) {
            let pj = &particles[j as usize];
            let x_ij = pi.position - pj.position;
            let v_ij = pi.velocity - pj.velocity;
            let factor = v_ij.dot(x_ij) / (x_ij.dot(x_ij) + eta_sq)
                / boundary::viscosity_density(pi, pj);
            visc += factor * kernel.gradient(pi.position, pj.position);
        }
        *acc = gravity + visc * visc_scale;
    });
}

// ---------------------------------------------------------------------------
// Pressure acceleration
// ---------------------------------------------------------------------------

/// Compute the symmetric SPH pressure acceleration for every fluid particle.
///
/// ```text
/// a_i = -m * sum_j (p_i / rho_i^2 + p*_j) * grad W_ij
/// ```
///
/// `p*_j = p_j / rho_j^2` for fluid neighbors and `p_i / rho0^2` for boundary
/// neighbors. `pressures` is indexed like `particles` and may differ from the
/// pressures stored on the particles (the iterative solver passes its
/// current guess). Boundary particles get zero.
pub fn compute_pressure_accelerations(
    particles: &[Particle],
    pressures: &[f32],
    neighbors: &NeighborLists,
    kernel: &CubicSpline,
    mass: f32,
    rest_density: f32,
    out: &mut Vec<Vec2>,
) {
    debug_assert_eq!(particles.len(), pressures.len());
    out.resize(particles.len(), Vec2::ZERO);
    out.par_iter_mut().enumerate().for_each(|(i, acc)| {
        let pi = &particles[i];
        if pi.boundary {
            *acc = Vec2::ZERO;
            return;
        }
        let p_i = pressures[i];
        let own = p_i / (pi.density * pi.density);
        let mut sum = Vec2::ZERO;
        for &j in neighbors.get(i) {
            let j = j as usize;
            let pj = &particles[j];
            let factor = own + boundary::neighbor_pressure_term(p_i, pj, pressures[j], rest_density);
            sum -= factor * kernel.gradient(pi.position, pj.position);
        }
        *acc = sum * mass;
    });
}
