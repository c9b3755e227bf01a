//! Kernel normalization via SPH density summation.
//!
//! Places 10,000 particles on a lattice with spacing equal to the particle
//! size `h` and mass `m = rho0 * h^2`. For a particle with a full neighborhood
//! the kernel weights must sum to `rho0 / m`, the kernel gradients must cancel,
//! and the summed density must match the rest density.

use glam::Vec2;
use sph2d_kernel::sph::compute_densities;
use sph2d_kernel::{CubicSpline, FluidParams, NeighborLists, Particle, ParticleGrid};

const CENTER: usize = 50 * 100 + 50;

struct Lattice {
    particles: Vec<Particle>,
    neighbors: NeighborLists,
    kernel: CubicSpline,
    params: FluidParams,
}

fn lattice() -> Lattice {
    let params = FluidParams::new(1000.0, 1000.0, 10.0);
    let mut particles = Vec::with_capacity(10_000);
    for i in 0..100 {
        for j in 0..100 {
            let pos = Vec2::new(i as f32 * 10.0, j as f32 * 10.0);
            particles.push(Particle::fluid(pos, [0.5; 3]));
        }
    }
    let mut grid = ParticleGrid::new(params.kernel_support, params.width, params.height);
    grid.rebuild(&particles);
    let mut neighbors = NeighborLists::new();
    neighbors.rebuild(&grid, &particles);
    Lattice {
        particles,
        neighbors,
        kernel: CubicSpline::new(params.particle_size),
        params,
    }
}

#[test]
fn kernel_sum_matches_inverse_volume() {
    let l = lattice();
    let xi = l.particles[CENTER].position;
    let sum: f32 = l
        .neighbors
        .get(CENTER)
        .iter()
        .map(|&j| l.kernel.value(xi, l.particles[j as usize].position))
        .sum();

    let expected = l.params.rest_density / l.params.particle_mass();
    assert!(
        (sum - expected).abs() / expected < 0.01,
        "kernel sum {sum} vs expected {expected}"
    );
}

#[test]
fn kernel_gradients_cancel() {
    let l = lattice();
    let xi = l.particles[CENTER].position;
    let sum: Vec2 = l
        .neighbors
        .get(CENTER)
        .iter()
        .map(|&j| l.kernel.gradient(xi, l.particles[j as usize].position))
        .sum();
    assert!(sum.length() < 1.0e-6, "gradient sum {sum:?}");
}

#[test]
fn interior_density_matches_rest_density() {
    let l = lattice();
    let mut rho = Vec::new();
    compute_densities(&l.particles, &l.neighbors, &l.kernel, l.params.particle_mass(), &mut rho);

    // Every particle at least two spacings from the edge sees a full stencil.
    for i in 2..98 {
        for j in 2..98 {
            let idx = i * 100 + j;
            let err = (rho[idx] - l.params.rest_density).abs() / l.params.rest_density;
            assert!(err < 0.01, "particle {idx}: density {} off by {err}", rho[idx]);
        }
    }
    // Edge particles are under-dense.
    assert!(rho[0] < l.params.rest_density);
}

#[test]
fn kernel_integrates_to_one() {
    // Midpoint quadrature of W over a fine grid covering the support disk.
    let h = 10.0;
    let kernel = CubicSpline::new(h);
    let step = 0.1;
    let n = (4.0 * h / step) as i32;
    let mut integral = 0.0_f64;
    for ix in 0..n {
        for iy in 0..n {
            let x = -2.0 * h + (ix as f32 + 0.5) * step;
            let y = -2.0 * h + (iy as f32 + 0.5) * step;
            integral += kernel.value(Vec2::ZERO, Vec2::new(x, y)) as f64 * (step * step) as f64;
        }
    }
    assert!((integral - 1.0).abs() < 1.0e-3, "integral of W = {integral}");
}
