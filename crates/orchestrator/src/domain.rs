//! Domain setup: walls and initial particle layouts for each scenario
//!
//! Layouts are placed on an integer lattice with spacing `h = particle_size`
//! (truncated to an integer), so every scenario is reproducible for a given
//! domain size and seed.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sph2d_kernel::ParticleStore;

use crate::config::{Scenario, SimulationConfig};

/// Number of boundary layers on every wall
const WALL_LAYERS: i32 = 3;

/// Width of the perforated wall in the leaky dam, in particles
const DAM_WALL_COLUMNS: i32 = 6;

/// Particles per ramp column in the flowing-fluid scenario (boundary included)
const RAMP_COLUMN: i32 = 25;

/// Build the initial particles for the configured scenario
///
/// Boundary particles come first (walls, then scenario obstacles interleaved
/// with fluid in layout order). Fluid particles get random colors from an RNG
/// seeded with `config.seed`, or from entropy if no seed is set.
pub fn build_scenario(config: &SimulationConfig) -> ParticleStore {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut layout = Layout {
        h: (config.particle_size as i32).max(1),
        width: config.width as i32,
        height: config.height as i32,
        store: ParticleStore::new(),
        rng: &mut rng,
    };

    layout.walls();
    match config.scenario {
        Scenario::BreakingDam => layout.breaking_dam(),
        Scenario::LeakyDam => {
            layout.dam_wall();
            layout.breaking_dam();
        }
        Scenario::DroppingFluid => layout.dropping_fluid(),
        Scenario::FlowingFluid => layout.flowing_fluid(),
        Scenario::RestingFluid => layout.resting_fluid(),
    }

    let store = layout.store;
    tracing::info!(
        scenario = ?config.scenario,
        fluid = store.fluid_count(),
        boundary = store.len() - store.fluid_count(),
        "Domain setup complete"
    );
    store
}

/// Lattice placement state for one scenario build
struct Layout<'a> {
    h: i32,
    width: i32,
    height: i32,
    store: ParticleStore,
    rng: &'a mut StdRng,
}

impl Layout<'_> {
    fn step(&self) -> usize {
        self.h as usize
    }

    fn boundary(&mut self, x: i32, y: i32) {
        self.store.push_boundary(Vec2::new(x as f32, y as f32));
    }

    fn fluid(&mut self, x: i32, y: i32) {
        let color = [self.rng.gen(), self.rng.gen(), self.rng.gen()];
        self.store.push_fluid(Vec2::new(x as f32, y as f32), color);
    }

    /// Left and right walls over the full height, then the floor between them
    fn walls(&mut self) {
        let h = self.h;
        for x in (0..WALL_LAYERS * h).step_by(self.step()) {
            for y in (0..=self.height).step_by(self.step()) {
                self.boundary(x, y);
                self.boundary(self.width - x, y);
            }
        }
        for x in (WALL_LAYERS * h..=self.width - WALL_LAYERS * h).step_by(self.step()) {
            for y in (0..WALL_LAYERS * h).step_by(self.step()) {
                self.boundary(x, y);
            }
        }
    }

    /// Fluid block filling the lower-left quarter
    fn breaking_dam(&mut self) {
        let h = self.h;
        for x in (WALL_LAYERS * h..self.width / 2).step_by(self.step()) {
            for y in (WALL_LAYERS * h..self.height / 2).step_by(self.step()) {
                self.fluid(x, y);
            }
        }
    }

    /// Wall in the middle of the domain with a gap just above the floor
    fn dam_wall(&mut self) {
        let h = self.h;
        let x0 = self.width / 2 + (self.width / 2) % h;
        let gap = self.height / 6;
        for x in (x0..x0 + DAM_WALL_COLUMNS * h).step_by(self.step()) {
            for y in (WALL_LAYERS * h..gap - 2 * h).step_by(self.step()) {
                self.boundary(x, y);
            }
            for y in (gap + 3 * h..=self.height).step_by(self.step()) {
                self.boundary(x, y);
            }
        }
    }

    /// Fluid block on a boundary pedestal in the middle third
    fn dropping_fluid(&mut self) {
        let h = self.h;
        for x in (self.width / 3..=2 * self.width / 3).step_by(self.step()) {
            for y in (WALL_LAYERS * h..=2 * self.height / 3).step_by(self.step()) {
                if y <= self.height / 3 {
                    self.boundary(x, y);
                } else {
                    self.fluid(x, y);
                }
            }
        }
    }

    /// Slanted ramp, three boundary particles thick, with fluid stacked on top
    fn flowing_fluid(&mut self) {
        let h = self.h;
        for x in (WALL_LAYERS * h..=self.width / 2).step_by(self.step()) {
            let base = WALL_LAYERS * h + self.width / 4 - x / 2;
            for i in 0..RAMP_COLUMN {
                let y = base + i * h;
                if i < WALL_LAYERS {
                    self.boundary(x, y);
                } else {
                    self.fluid(x, y);
                }
            }
        }
    }

    /// Shallow pool over the whole floor, up to a quarter of the height
    fn resting_fluid(&mut self) {
        let h = self.h;
        for x in (WALL_LAYERS * h..=self.width - WALL_LAYERS * h).step_by(self.step()) {
            for y in (WALL_LAYERS * h..self.height / 4).step_by(self.step()) {
                self.fluid(x, y);
            }
        }
    }
}
