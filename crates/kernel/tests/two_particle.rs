//! Two-particle symmetry test.
//!
//! Verifies Newton's 3rd law (accelerations equal and opposite) for the
//! pressure and viscosity terms and momentum conservation over full steps,
//! for a mirror-symmetric pair of fluid particles with gravity switched off.

use glam::Vec2;
use sph2d_kernel::sph::{
    compute_densities, compute_non_pressure_accelerations, compute_pressure_accelerations,
};
use sph2d_kernel::{
    CubicSpline, FluidParams, IterativeSettings, NeighborLists, Particle, ParticleGrid,
    ParticleStore, PressureSolver, Simulation,
};

fn weightless() -> FluidParams {
    let mut params = FluidParams::new(200.0, 200.0, 10.0);
    params.gravity = 0.0;
    params.viscosity = 0.5;
    params
}

/// Two fluid particles `separation` apart, mirrored about x = 100, approaching
/// each other at `speed`.
fn pair(separation: f32, speed: f32) -> Vec<Particle> {
    let mut a = Particle::fluid(Vec2::new(100.0 - separation / 2.0, 100.0), [0.0; 3]);
    let mut b = Particle::fluid(Vec2::new(100.0 + separation / 2.0, 100.0), [0.0; 3]);
    a.velocity = Vec2::new(speed, 0.0);
    b.velocity = Vec2::new(-speed, 0.0);
    vec![a, b]
}

fn prepared(particles: &mut [Particle], params: &FluidParams) -> (NeighborLists, CubicSpline) {
    let kernel = CubicSpline::new(params.particle_size);
    let mut grid = ParticleGrid::new(params.kernel_support, params.width, params.height);
    grid.rebuild(particles);
    let mut neighbors = NeighborLists::new();
    neighbors.rebuild(&grid, particles);
    let mut rho = Vec::new();
    compute_densities(particles, &neighbors, &kernel, params.particle_mass(), &mut rho);
    for (p, r) in particles.iter_mut().zip(rho) {
        p.density = r;
    }
    (neighbors, kernel)
}

#[test]
fn pressure_accelerations_equal_and_opposite() {
    let params = weightless();
    let mut particles = pair(8.0, 0.0);
    let (neighbors, kernel) = prepared(&mut particles, &params);
    assert_eq!(particles[0].density, particles[1].density);

    let mut acc = Vec::new();
    compute_pressure_accelerations(
        &particles,
        &[2.0, 2.0],
        &neighbors,
        &kernel,
        params.particle_mass(),
        params.rest_density,
        &mut acc,
    );

    let sum = acc[0] + acc[1];
    assert!(sum.length() < 1.0e-6, "net pressure acceleration {sum:?}");
    // Pressure pushes the pair apart.
    assert!(acc[0].x < 0.0 && acc[1].x > 0.0, "acc = {acc:?}");
    assert_eq!(acc[0].y, 0.0);
}

#[test]
fn viscous_accelerations_equal_and_opposite() {
    let params = weightless();
    let mut particles = pair(8.0, 1.0);
    let (neighbors, kernel) = prepared(&mut particles, &params);

    let mut acc = Vec::new();
    compute_non_pressure_accelerations(&particles, &neighbors, &kernel, &params, &mut acc);

    let sum = acc[0] + acc[1];
    assert!(sum.length() < 1.0e-6, "net viscous acceleration {sum:?}");
    // Viscosity brakes the approach.
    assert!(acc[0].x < 0.0, "acc = {acc:?}");
}

#[test]
fn step_conserves_momentum() {
    for solver in [
        PressureSolver::StateEquation { stiffness: 50.0 },
        PressureSolver::Iterative(IterativeSettings::new(0.01)),
    ] {
        let store = ParticleStore::from(pair(12.0, 2.0));
        let mut sim = Simulation::new(store, weightless(), solver);
        let midpoint = Vec2::new(100.0, 100.0);

        for _ in 0..10 {
            sim.step(0.05).unwrap();
        }

        let p = sim.particles();
        let momentum = p[0].velocity + p[1].velocity;
        assert!(momentum.length() < 1.0e-4, "{solver:?}: momentum {momentum:?}");
        let center = (p[0].position + p[1].position) / 2.0;
        assert!((center - midpoint).length() < 1.0e-3, "{solver:?}: center {center:?}");
        assert!(p[0].position.y == 100.0 && p[1].position.y == 100.0);
    }
}
