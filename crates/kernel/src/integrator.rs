//! Semi-implicit Euler integration.
//!
//! A step applies two velocity kicks (non-pressure, then pressure) followed by
//! one position drift with the final velocity. Boundary particles are pinned.

use glam::Vec2;
use rayon::prelude::*;

use crate::particle::Particle;

/// `v_i += dt * a_i` for every fluid particle.
pub fn apply_accelerations(particles: &mut [Particle], acc: &[Vec2], dt: f32) {
    debug_assert_eq!(particles.len(), acc.len());
    particles
        .par_iter_mut()
        .zip(acc.par_iter())
        .filter(|(p, _)| p.is_fluid())
        .for_each(|(p, a)| p.velocity += dt * *a);
}

/// `x_i += dt * v_i` for every fluid particle.
pub fn advance_positions(particles: &mut [Particle], dt: f32) {
    particles
        .par_iter_mut()
        .filter(|p| p.is_fluid())
        .for_each(|p| p.position += dt * p.velocity);
}

/// Index of the first fluid particle whose position or velocity is not finite.
pub fn first_non_finite(particles: &[Particle]) -> Option<usize> {
    particles
        .par_iter()
        .position_first(|p| p.is_fluid() && !(p.position.is_finite() && p.velocity.is_finite()))
}
