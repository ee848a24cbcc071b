//! Uniform particle grid with fixed-capacity, lock-free cells.
//!
//! The grid covers `dims` cells of edge `particle_diameter` starting at
//! `origin`. Cells are flattened as `x + dim_x * y + dim_x * dim_y * z`.
//! Each cell holds up to [`CELL_CAPACITY`] particle indices; slots are claimed
//! with a compare-exchange against [`EMPTY_SLOT`], so any number of threads
//! may insert at once without locking. Which racing particle wins which slot
//! is unspecified, and a particle arriving at a full cell is dropped.

use crate::constants::{CELL_CAPACITY, EMPTY_SLOT, STENCIL_RADIUS};
use crate::params::SimulationParams;
use glam::{IVec3, Vec3};
use rayon::prelude::*;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

/// One grid cell: four atomically claimed particle slots.
#[derive(Debug)]
pub struct GridCell {
    slots: [AtomicI32; CELL_CAPACITY],
}

impl GridCell {
    fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| AtomicI32::new(EMPTY_SLOT)),
        }
    }

    /// Mark every slot empty.
    pub fn clear(&self) {
        for slot in &self.slots {
            slot.store(EMPTY_SLOT, Ordering::Release);
        }
    }

    /// Claim the first free slot for `particle`. Returns the slot, or `None`
    /// when all slots are taken.
    pub fn claim(&self, particle: i32) -> Option<usize> {
        self.slots.iter().position(|slot| {
            slot.compare_exchange(EMPTY_SLOT, particle, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        })
    }

    /// Current slot contents, `EMPTY_SLOT` for unclaimed slots.
    pub fn slots(&self) -> [i32; CELL_CAPACITY] {
        std::array::from_fn(|k| self.slots[k].load(Ordering::Acquire))
    }

    /// Particle indices stored in this cell.
    pub fn occupants(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots.iter().filter_map(|slot| {
            let value = slot.load(Ordering::Acquire);
            (value != EMPTY_SLOT).then_some(value as usize)
        })
    }
}

/// Outcome of inserting one particle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Insertion {
    /// Stored in the given slot of the given flat cell.
    Stored { cell: usize, slot: usize },
    /// The cell already held `CELL_CAPACITY` particles.
    CellFull { cell: usize },
    /// The particle lies outside the grid.
    OutOfBounds,
}

/// Per-build counters. Diagnostics only; overflow is not an error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GridStats {
    pub inserted: usize,
    pub overflowed: usize,
    pub out_of_bounds: usize,
}

impl GridStats {
    /// True when every particle made it into the grid.
    pub fn is_complete(&self) -> bool {
        self.overflowed == 0 && self.out_of_bounds == 0
    }
}

#[derive(Debug)]
pub struct SpatialGrid {
    /// World position of cell (0, 0, 0)'s minimum corner
    pub origin: Vec3,
    /// Cell edge length (the particle diameter)
    pub cell_size: f32,
    dims: IVec3,
    inv_cell_size: f32,
    cells: Vec<GridCell>,
}

impl SpatialGrid {
    pub fn new(origin: Vec3, dims: [u32; 3], cell_size: f32) -> Self {
        assert!(cell_size > 0.0, "cell_size must be positive, got {}", cell_size);
        let cell_count = dims.iter().map(|&d| d as usize).product();
        Self {
            origin,
            cell_size,
            dims: IVec3::new(dims[0] as i32, dims[1] as i32, dims[2] as i32),
            inv_cell_size: 1.0 / cell_size,
            cells: (0..cell_count).map(|_| GridCell::new()).collect(),
        }
    }

    /// Grid matching the parameters' origin, dimensions and particle diameter.
    pub fn from_params(params: &SimulationParams) -> Self {
        Self::new(params.grid_origin, params.grid_dims, params.particle_diameter)
    }

    pub fn dims(&self) -> IVec3 {
        self.dims
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cell(&self, index: usize) -> &GridCell {
        &self.cells[index]
    }

    /// Integer cell coordinate containing `position` (may lie outside the grid).
    #[inline]
    pub fn cell_coord(&self, position: Vec3) -> IVec3 {
        ((position - self.origin) * self.inv_cell_size)
            .floor()
            .as_ivec3()
    }

    #[inline]
    pub fn contains(&self, coord: IVec3) -> bool {
        coord.cmpge(IVec3::ZERO).all() && coord.cmplt(self.dims).all()
    }

    /// Flat index of `coord`, or `None` outside the grid.
    #[inline]
    pub fn flat_index(&self, coord: IVec3) -> Option<usize> {
        if !self.contains(coord) {
            return None;
        }
        let index = coord.x + self.dims.x * coord.y + self.dims.x * self.dims.y * coord.z;
        Some(index as usize)
    }

    /// Flat index of the cell containing `position`.
    #[inline]
    pub fn cell_index_of(&self, position: Vec3) -> Option<usize> {
        self.flat_index(self.cell_coord(position))
    }

    /// Empty every cell.
    pub fn reset(&self) {
        self.cells.par_iter().for_each(GridCell::clear);
    }

    /// Insert one particle. Safe to call from many threads at once.
    pub fn insert(&self, particle: usize, position: Vec3) -> Insertion {
        let Some(cell) = self.cell_index_of(position) else {
            return Insertion::OutOfBounds;
        };
        match self.cells[cell].claim(particle as i32) {
            Some(slot) => Insertion::Stored { cell, slot },
            None => Insertion::CellFull { cell },
        }
    }

    /// Insert every particle concurrently, one work item per particle.
    pub fn build(&self, positions: &[Vec3]) -> GridStats {
        let overflowed = AtomicUsize::new(0);
        let out_of_bounds = AtomicUsize::new(0);

        positions
            .par_iter()
            .enumerate()
            .for_each(|(i, &position)| match self.insert(i, position) {
                Insertion::Stored { .. } => {}
                Insertion::CellFull { .. } => {
                    overflowed.fetch_add(1, Ordering::Relaxed);
                }
                Insertion::OutOfBounds => {
                    out_of_bounds.fetch_add(1, Ordering::Relaxed);
                }
            });

        let overflowed = overflowed.into_inner();
        let out_of_bounds = out_of_bounds.into_inner();
        GridStats {
            inserted: positions.len() - overflowed - out_of_bounds,
            overflowed,
            out_of_bounds,
        }
    }

    /// Insert particles one at a time in the given order.
    ///
    /// Stands in for a particular interleaving of the concurrent build; tests
    /// feed shuffled orders to check nothing depends on who wins a slot.
    pub fn build_in_order(&self, positions: &[Vec3], order: &[usize]) -> GridStats {
        let mut stats = GridStats::default();
        for &i in order {
            match self.insert(i, positions[i]) {
                Insertion::Stored { .. } => stats.inserted += 1,
                Insertion::CellFull { .. } => stats.overflowed += 1,
                Insertion::OutOfBounds => stats.out_of_bounds += 1,
            }
        }
        stats
    }

    /// Call `f` with every particle index stored in the 3x3x3 block of cells
    /// around `position`. Neighbour cells outside the grid are skipped.
    pub fn for_each_neighbor(&self, position: Vec3, mut f: impl FnMut(usize)) {
        let center = self.cell_coord(position);
        // No stencil cell can be inside; also keeps `center + offset` from
        // overflowing for saturated coordinates.
        let reach = IVec3::splat(STENCIL_RADIUS);
        if center.cmplt(-reach).any() || center.cmpge(self.dims.saturating_add(reach)).any() {
            return;
        }
        for dz in -STENCIL_RADIUS..=STENCIL_RADIUS {
            for dy in -STENCIL_RADIUS..=STENCIL_RADIUS {
                for dx in -STENCIL_RADIUS..=STENCIL_RADIUS {
                    let Some(cell) = self.flat_index(center + IVec3::new(dx, dy, dz)) else {
                        continue;
                    };
                    for j in self.cells[cell].occupants() {
                        f(j);
                    }
                }
            }
        }
    }

    /// Number of stored particle indices across all cells.
    pub fn occupied_slots(&self) -> usize {
        self.cells.iter().map(|c| c.occupants().count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> SpatialGrid {
        SpatialGrid::new(Vec3::new(-2.0, 0.0, -2.0), [4, 5, 6], 1.0)
    }

    #[test]
    fn test_grid_creation() {
        let g = grid();
        assert_eq!(g.dims(), IVec3::new(4, 5, 6));
        assert_eq!(g.cell_count(), 120);
        assert_eq!(g.occupied_slots(), 0);
    }

    #[test]
    fn test_flat_index_layout() {
        let g = grid();
        // Index should be x + w * y + w * h * z
        assert_eq!(g.flat_index(IVec3::new(0, 0, 0)), Some(0));
        assert_eq!(g.flat_index(IVec3::new(1, 0, 0)), Some(1));
        assert_eq!(g.flat_index(IVec3::new(0, 1, 0)), Some(4));
        assert_eq!(g.flat_index(IVec3::new(0, 0, 1)), Some(20));
        assert_eq!(g.flat_index(IVec3::new(3, 4, 5)), Some(5 * 20 + 4 * 4 + 3));
    }

    #[test]
    fn test_cell_coord_floors_negative() {
        let g = grid();
        assert_eq!(g.cell_coord(Vec3::new(-2.5, 0.5, -1.5)), IVec3::new(-1, 0, 0));
        assert_eq!(g.cell_coord(Vec3::new(-1.0, 2.0, 0.99)), IVec3::new(1, 2, 2));
    }

    #[test]
    fn test_inside_positions_in_range() {
        let g = grid();
        for &p in &[
            Vec3::new(-1.99, 0.01, -1.99),
            Vec3::new(1.99, 4.99, 3.99),
            Vec3::new(0.0, 2.5, 1.0),
        ] {
            let index = g.cell_index_of(p).expect("inside the grid");
            assert!(index < g.cell_count());
        }
    }

    #[test]
    fn test_outside_positions_rejected() {
        let g = grid();
        for &p in &[
            Vec3::new(-2.01, 1.0, 0.0),
            Vec3::new(2.0, 1.0, 0.0),
            Vec3::new(0.0, -0.01, 0.0),
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::new(0.0, 1.0, 4.0),
            // Would wrap into a valid flat index without per-axis checks
            Vec3::new(2.5, 0.5, -1.5),
        ] {
            assert_eq!(g.cell_index_of(p), None, "{:?}", p);
            assert_eq!(g.insert(0, p), Insertion::OutOfBounds);
        }
        assert_eq!(g.occupied_slots(), 0);
    }

    #[test]
    fn test_claim_fills_slots_in_order() {
        let cell = GridCell::new();
        assert_eq!(cell.claim(10), Some(0));
        assert_eq!(cell.claim(11), Some(1));
        assert_eq!(cell.claim(12), Some(2));
        assert_eq!(cell.claim(13), Some(3));
        assert_eq!(cell.claim(14), None);
        assert_eq!(cell.slots(), [10, 11, 12, 13]);
    }

    #[test]
    fn test_fifth_insertion_dropped() {
        let g = grid();
        let p = Vec3::new(0.5, 0.5, 0.5);
        for i in 0..4 {
            assert!(matches!(g.insert(i, p), Insertion::Stored { .. }));
        }
        let cell = g.cell_index_of(p).unwrap();
        assert_eq!(g.insert(4, p), Insertion::CellFull { cell });
        assert_eq!(g.cell(cell).slots(), [0, 1, 2, 3]);
        assert_eq!(g.occupied_slots(), 4);
    }

    #[test]
    fn test_reset_clears_everything() {
        let g = grid();
        let positions: Vec<Vec3> = (0..10)
            .map(|i| Vec3::new(-1.5 + (i % 4) as f32, 0.5 + (i / 4) as f32, 0.5))
            .collect();
        let stats = g.build(&positions);
        assert_eq!(stats.inserted, 10);
        g.reset();
        assert_eq!(g.occupied_slots(), 0);
        for i in 0..g.cell_count() {
            assert_eq!(g.cell(i).slots(), [EMPTY_SLOT; CELL_CAPACITY]);
        }
    }

    #[test]
    fn test_build_counts() {
        let g = grid();
        let mut positions = vec![Vec3::new(0.5, 0.5, 0.5); 6];
        positions.push(Vec3::new(10.0, 0.5, 0.5));
        let stats = g.build(&positions);
        assert_eq!(
            stats,
            GridStats {
                inserted: 4,
                overflowed: 2,
                out_of_bounds: 1
            }
        );
        assert!(!stats.is_complete());
    }

    #[test]
    fn test_neighbor_stencil() {
        let g = grid();
        let positions = vec![
            Vec3::new(0.5, 2.5, 1.5),  // centre cell
            Vec3::new(1.5, 3.5, 2.5),  // diagonal neighbour
            Vec3::new(-0.5, 1.5, 0.5), // opposite diagonal
            Vec3::new(-1.5, 2.5, 1.5), // two cells away in x
        ];
        g.build(&positions);

        let mut seen = Vec::new();
        g.for_each_neighbor(positions[0], |j| seen.push(j));
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn test_neighbor_stencil_at_boundary() {
        let g = grid();
        let corner = Vec3::new(-1.5, 0.5, -1.5);
        g.insert(7, corner);
        let mut seen = Vec::new();
        g.for_each_neighbor(corner, |j| seen.push(j));
        assert_eq!(seen, vec![7]);

        // Centre outside, neighbour inside
        let mut seen = Vec::new();
        g.for_each_neighbor(Vec3::new(-1.5, -0.5, -1.5), |j| seen.push(j));
        assert_eq!(seen, vec![7]);
    }

    #[test]
    fn test_far_away_positions_are_skipped() {
        let g = grid();
        g.insert(3, Vec3::new(1.5, 4.5, 3.5));
        for &p in &[
            Vec3::new(3.0e9, 0.5, 0.5),
            Vec3::new(-3.0e9, 0.5, 0.5),
            Vec3::new(0.5, f32::MAX, 0.5),
            Vec3::new(0.5, 0.5, f32::MIN),
            // Just past the last cell: its stencil still reaches inside
            Vec3::new(2.5, 5.5, 4.5),
        ] {
            assert_eq!(g.insert(0, p), Insertion::OutOfBounds);
            let mut seen = Vec::new();
            g.for_each_neighbor(p, |j| seen.push(j));
            if p.x.abs() < 10.0 && p.y.abs() < 10.0 && p.z.abs() < 10.0 {
                assert_eq!(seen, vec![3]);
            } else {
                assert!(seen.is_empty(), "{:?}", p);
            }
        }
    }
}
