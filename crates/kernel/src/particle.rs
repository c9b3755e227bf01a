//! Particle data structures.
//!
//! Particles are stored array-of-structs in a [`ParticleStore`]. Index identity
//! is the only cross-reference used by the grid and the neighbor lists, so the
//! store only ever grows at the end and never reorders.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Color assigned to boundary particles by default.
pub const BOUNDARY_COLOR: [f32; 3] = [0.5, 0.5, 0.5];

/// A single SPH particle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// Position in domain units.
    pub position: Vec2,
    /// Velocity (domain units per time unit).
    pub velocity: Vec2,
    /// Density from the last summation. Boundary particles keep their initial value.
    pub density: f32,
    /// Pressure from the last solve. Always `>= 0`.
    pub pressure: f32,
    /// Static obstacle flag. Boundary particles are never integrated.
    pub boundary: bool,
    /// RGB display color. Not physically meaningful.
    pub color: [f32; 3],
}

impl Particle {
    /// Create a particle at rest with zero density and pressure.
    pub fn new(position: Vec2, color: [f32; 3], boundary: bool) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            density: 0.0,
            pressure: 0.0,
            boundary,
            color,
        }
    }

    /// Create a fluid particle.
    pub fn fluid(position: Vec2, color: [f32; 3]) -> Self {
        Self::new(position, color, false)
    }

    /// Create a boundary particle with the default grey color.
    pub fn boundary(position: Vec2) -> Self {
        Self::new(position, BOUNDARY_COLOR, true)
    }

    /// `true` if this particle is integrated (not part of the boundary).
    #[inline]
    pub fn is_fluid(&self) -> bool {
        !self.boundary
    }
}

/// Ordered, index-stable particle storage.
#[derive(Debug, Clone, Default)]
pub struct ParticleStore {
    particles: Vec<Particle>,
}

impl ParticleStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with room for `capacity` particles.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            particles: Vec::with_capacity(capacity),
        }
    }

    /// Number of particles (fluid and boundary).
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// `true` if the store holds no particles.
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Number of non-boundary particles.
    pub fn fluid_count(&self) -> usize {
        self.particles.iter().filter(|p| p.is_fluid()).count()
    }

    /// Append a particle and return its index.
    pub fn push(&mut self, particle: Particle) -> usize {
        self.particles.push(particle);
        self.particles.len() - 1
    }

    /// Append a fluid particle at `position`.
    pub fn push_fluid(&mut self, position: Vec2, color: [f32; 3]) -> usize {
        self.push(Particle::fluid(position, color))
    }

    /// Append a boundary particle at `position`.
    pub fn push_boundary(&mut self, position: Vec2) -> usize {
        self.push(Particle::boundary(position))
    }

    /// Read-only view of all particles.
    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// Iterate over all particles in index order.
    pub fn iter(&self) -> std::slice::Iter<'_, Particle> {
        self.particles.iter()
    }
}

impl From<Vec<Particle>> for ParticleStore {
    fn from(particles: Vec<Particle>) -> Self {
        Self { particles }
    }
}

impl FromIterator<Particle> for ParticleStore {
    fn from_iter<I: IntoIterator<Item = Particle>>(iter: I) -> Self {
        Self {
            particles: iter.into_iter().collect(),
        }
    }
}
