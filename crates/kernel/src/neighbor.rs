//! Uniform-grid spatial index and per-particle neighbor lists.
//!
//! Uses a counting-sort layout (cell offsets + sorted particle indices) rather
//! than a `HashMap`, so a cell lookup is a single slice.

use glam::Vec2;
use rayon::prelude::*;

use crate::particle::Particle;

/// Uniform-grid spatial index over a fixed `[0, width] x [0, height]` domain.
///
/// Cell size equals the kernel support radius, so the 3x3 block of cells
/// around a particle contains every particle within the support radius.
/// Positions outside the domain are clamped into the border cells.
#[derive(Debug, Clone)]
pub struct ParticleGrid {
    support: f32,
    width: f32,
    height: f32,
    cols: usize,
    rows: usize,
    /// Slice-start offsets into `sorted_list`, one per cell plus a final total.
    counter: Vec<u32>,
    /// Particle indices grouped by cell.
    sorted_list: Vec<u32>,
    /// Cell of each particle from the last rebuild.
    cell_of: Vec<u32>,
    /// Exclusive upper bound for neighbor probe positions.
    probe_limit: Vec2,
}

impl ParticleGrid {
    /// Create an empty grid for the given support radius and domain size.
    pub fn new(support: f32, width: f32, height: f32) -> Self {
        assert!(support > 0.0, "support radius must be positive");
        assert!(width > 0.0 && height > 0.0, "domain must have a positive size");
        let cols = (width / support).ceil() as usize + 1;
        let rows = (height / support).ceil() as usize + 1;
        tracing::debug!(cols, rows, support, "neighbor grid allocated");
        Self {
            support,
            width,
            height,
            cols,
            rows,
            counter: vec![0; cols * rows + 1],
            sorted_list: Vec::new(),
            cell_of: Vec::new(),
            probe_limit: Vec2::new(
                width + support - width % support,
                height + support - height % support,
            ),
        }
    }

    /// Support radius (cell edge length).
    pub fn support(&self) -> f32 {
        self.support
    }

    /// Number of cell columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of cell rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.cols * self.rows
    }

    /// Cell offsets: cell `c` occupies `sorted_list()[counter[c]..counter[c + 1]]`.
    pub fn counter(&self) -> &[u32] {
        &self.counter
    }

    /// Particle indices grouped by cell.
    pub fn sorted_list(&self) -> &[u32] {
        &self.sorted_list
    }

    /// Particle indices stored in cell `cell`.
    pub fn cell(&self, cell: usize) -> &[u32] {
        let start = self.counter[cell] as usize;
        let end = self.counter[cell + 1] as usize;
        &self.sorted_list[start..end]
    }

    /// Flat cell id of `position`.
    ///
    /// Coordinates at or beyond the domain edge collapse to the last
    /// column/row, negative coordinates to the first.
    pub fn cell_index(&self, position: Vec2) -> usize {
        let col = Self::axis_cell(position.x, self.width, self.support);
        let row = Self::axis_cell(position.y, self.height, self.support);
        col + self.cols * row
    }

    #[inline]
    fn axis_cell(coord: f32, extent: f32, support: f32) -> usize {
        if coord >= extent {
            (extent / support) as usize
        } else if coord < 0.0 {
            0
        } else {
            (coord / support) as usize
        }
    }

    /// Rebuild the index from current particle positions (two-pass counting sort).
    pub fn rebuild(&mut self, particles: &[Particle]) {
        let n = particles.len();

        // --- 1. Tally particles per cell ---
        let mut cell_of = std::mem::take(&mut self.cell_of);
        cell_of.clear();
        cell_of.extend(particles.iter().map(|p| self.cell_index(p.position) as u32));

        self.counter.fill(0);
        for &c in &cell_of {
            self.counter[c as usize] += 1;
        }

        // --- 2. Inclusive prefix sum: counter[c] = end of cell c ---
        for c in 1..self.counter.len() {
            self.counter[c] += self.counter[c - 1];
        }

        // --- 3. Scatter with a descending cursor; leaves counter at slice starts ---
        self.sorted_list.clear();
        self.sorted_list.resize(n, 0);
        for (i, &c) in cell_of.iter().enumerate() {
            let slot = &mut self.counter[c as usize];
            *slot -= 1;
            self.sorted_list[*slot as usize] = i as u32;
        }

        self.cell_of = cell_of;
    }

    /// Collect every particle within the support radius of particle `index`
    /// into `out` (including `index` itself).
    ///
    /// Probes the particle's own cell and the 8 cells one support radius away.
    /// Probe positions outside the padded domain are skipped. A particle that
    /// has left the padded domain still scans its clamped home cell, so every
    /// list contains at least the particle itself.
    pub fn find_neighbors(&self, index: usize, particles: &[Particle], out: &mut Vec<u32>) {
        let s = self.support;
        let xi = particles[index].position;
        let home = self.cell_index(xi);
        let mut home_scanned = false;
        let offsets = [
            Vec2::ZERO,
            Vec2::new(s, 0.0),
            Vec2::new(0.0, s),
            Vec2::new(-s, 0.0),
            Vec2::new(0.0, -s),
            Vec2::new(s, s),
            Vec2::new(-s, s),
            Vec2::new(-s, -s),
            Vec2::new(s, -s),
        ];

        for offset in offsets {
            let probe = xi + offset;
            if !(0.0 <= probe.x
                && probe.x < self.probe_limit.x
                && 0.0 <= probe.y
                && probe.y < self.probe_limit.y)
            {
                continue;
            }
            let cell = self.cell_index(probe);
            home_scanned |= cell == home;
            self.scan_cell(cell, xi, particles, out);
        }

        if !home_scanned {
            self.scan_cell(home, xi, particles, out);
        }
    }

    #[inline]
    fn scan_cell(&self, cell: usize, xi: Vec2, particles: &[Particle], out: &mut Vec<u32>) {
        for &j in self.cell(cell) {
            if xi.distance(particles[j as usize].position) < self.support {
                out.push(j);
            }
        }
    }

    /// Convenience wrapper around [`find_neighbors`](Self::find_neighbors).
    pub fn neighbors(&self, index: usize, particles: &[Particle]) -> Vec<u32> {
        let mut out = Vec::with_capacity(20);
        self.find_neighbors(index, particles, &mut out);
        out
    }
}

/// One neighbor-index list per particle, recomputed every step.
///
/// The inner vectors are kept between rebuilds so steady-state steps do not
/// allocate.
#[derive(Debug, Clone, Default)]
pub struct NeighborLists {
    lists: Vec<Vec<u32>>,
}

impl NeighborLists {
    /// Create an empty set of lists.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute all lists from a freshly rebuilt grid.
    ///
    /// A boundary particle's list is just its own index: boundary neighbor
    /// relations are only consumed through the fluid particles that see them.
    pub fn rebuild(&mut self, grid: &ParticleGrid, particles: &[Particle]) {
        self.lists.resize_with(particles.len(), Vec::new);
        self.lists
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, list)| {
                list.clear();
                if particles[i].boundary {
                    list.push(i as u32);
                } else {
                    grid.find_neighbors(i, particles, list);
                }
            });
    }

    /// Neighbor indices of particle `i`.
    #[inline]
    pub fn get(&self, i: usize) -> &[u32] {
        &self.lists[i]
    }

    /// Number of lists (equals the particle count after a rebuild).
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    /// `true` if no lists have been built.
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Sum of all list lengths.
    pub fn total_pairs(&self) -> usize {
        self.lists.iter().map(Vec::len).sum()
    }
}
