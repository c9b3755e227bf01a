//! Speed-based color remap for display.
//!
//! Colors carry no physics; this only exists so a renderer can show the flow.

use std::f32::consts::PI;

use rayon::prelude::*;

use crate::particle::Particle;

/// Map a speed onto a blue -> green -> red ramp.
///
/// ```text
/// speed < max/2 :  (0, sin^2 t, cos^2 t)   t = pi * speed / max
/// speed < max   :  (cos^2 t, sin^2 t, 0)
/// otherwise     :  (1, 0, 0)
/// ```
pub fn speed_color(speed: f32, max_speed: f32) -> [f32; 3] {
    if speed >= max_speed {
        return [1.0, 0.0, 0.0];
    }
    let t = PI / max_speed * speed;
    let (s, c) = t.sin_cos();
    if speed < max_speed / 2.0 {
        [0.0, s * s, c * c]
    } else {
        [c * c, s * s, 0.0]
    }
}

/// Recolor every fluid particle by its speed. Boundary colors are untouched.
pub fn recolor_by_speed(particles: &mut [Particle], max_speed: f32) {
    particles
        .par_iter_mut()
        .filter(|p| p.is_fluid())
        .for_each(|p| p.color = speed_color(p.velocity.length(), max_speed));
}
