//! Boundary handling by mirroring.
//!
//! Boundary particles are static and carry no meaningful density or pressure
//! of their own. When a fluid particle interacts with a boundary neighbor it
//! substitutes its *own* state for the neighbor's: its own density in the
//! viscosity term, and its own pressure over the rest density in the pressure
//! term. These helpers are the single place that rule lives.

use crate::particle::Particle;

/// Density to divide by in the viscosity term of fluid particle `pi` for
/// neighbor `pj`.
///
/// ```text
/// rho*_j = rho_i   if j is boundary
///        = rho_j   otherwise
/// ```
#[inline]
pub fn viscosity_density(pi: &Particle, pj: &Particle) -> f32 {
    if pj.boundary {
        pi.density
    } else {
        pj.density
    }
}

/// Neighbor half of the symmetric pressure term for fluid particle `i`.
///
/// ```text
/// p*_j = p_i / rho0^2    if j is boundary
///      = p_j / rho_j^2   otherwise
/// ```
///
/// `p_i` is the querying particle's pressure, `p_j` the neighbor's entry in
/// the same pressure field.
#[inline]
pub fn neighbor_pressure_term(p_i: f32, pj: &Particle, p_j: f32, rest_density: f32) -> f32 {
    if pj.boundary {
        p_i / (rest_density * rest_density)
    } else {
        p_j / (pj.density * pj.density)
    }
}
