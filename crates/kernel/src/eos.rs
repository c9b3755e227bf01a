//! Equation of state for the compressible (explicit) pressure solver.

use rayon::prelude::*;

use crate::particle::Particle;

/// Linear state equation, clamped to non-negative pressure.
///
/// ```text
/// P = max(k * (rho / rho0 - 1), 0)
/// ```
///
/// Negative pressures would pull particles together, so sub-rest densities
/// produce zero pressure.
///
/// # Arguments
/// * `density` - Current density rho.
/// * `rest_density` - Reference rest density rho0.
/// * `stiffness` - Stiffness constant k.
#[inline]
pub fn state_equation_pressure(density: f32, rest_density: f32, stiffness: f32) -> f32 {
    (stiffness * (density / rest_density - 1.0)).max(0.0)
}

/// Evaluate [`state_equation_pressure`] for every fluid particle into `out`.
///
/// Boundary entries keep the particle's stored pressure.
pub fn compute_state_equation_pressures(
    particles: &[Particle],
    rest_density: f32,
    stiffness: f32,
    out: &mut Vec<f32>,
) {
    out.resize(particles.len(), 0.0);
    out.par_iter_mut()
        .zip(particles.par_iter())
        .for_each(|(p, particle)| {
            *p = if particle.boundary {
                particle.pressure
            } else {
                state_equation_pressure(particle.density, rest_density, stiffness)
            };
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn zero_at_rest_density() {
        assert_eq!(state_equation_pressure(1.0, 1.0, 2000.0), 0.0);
        assert_eq!(state_equation_pressure(1000.0, 1000.0, 50.0), 0.0);
    }

    #[test]
    fn clamped_when_expanded() {
        assert_eq!(state_equation_pressure(0.9, 1.0, 2000.0), 0.0);
        assert_eq!(state_equation_pressure(0.0, 1.0, 2000.0), 0.0);
    }

    #[test]
    fn linear_when_compressed() {
        let p = state_equation_pressure(1.01, 1.0, 2000.0);
        assert!(p > 0.0);
        assert!((p - 20.0).abs() < 1.0e-3, "got {p}");
        let p2 = state_equation_pressure(1.02, 1.0, 2000.0);
        assert!((p2 - 2.0 * p).abs() < 1.0e-2);
    }

    #[test]
    fn boundary_pressure_is_untouched() {
        let mut fluid = Particle::fluid(Vec2::ZERO, [0.0; 3]);
        fluid.density = 1.5;
        let mut wall = Particle::boundary(Vec2::ONE);
        wall.density = 5.0;
        let mut out = Vec::new();
        compute_state_equation_pressures(&[fluid, wall], 1.0, 10.0, &mut out);
        assert!((out[0] - 5.0).abs() < 1.0e-5);
        assert_eq!(out[1], 0.0);
    }
}
