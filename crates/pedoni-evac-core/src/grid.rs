//! Sentinel-aware rectangular grids backed by [`ndarray::Array2`].

use ndarray::Array2;

use crate::location::Location;

/// Integer cell sentinels. Pedestrian ids (a separate grid) are always
/// positive, so these stay zero/negative to keep the two namespaces disjoint.
pub const EMPTY: i32 = 0;
pub const IMPASSABLE: i32 = -1;
pub const EXIT: i32 = -2;
pub const BLOCKED_EXIT: i32 = -3;
pub const FIRE: i32 = -4;

/// Float sentinels reusing the same marker magnitudes as the integer grid.
/// Legal field values (distances, densities, probabilities) are always >= 0.
pub const F_IMPASSABLE: f32 = -1.0;
pub const F_EXIT: f32 = -2.0;
pub const F_BLOCKED_EXIT: f32 = -3.0;
pub const F_FIRE: f32 = -4.0;

/// Risky-cell classification (§4.5).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    #[default]
    None,
    Risky,
    Danger,
}

pub fn new_i32_grid(shape: (usize, usize), fill: i32) -> Array2<i32> {
    Array2::from_elem(shape, fill)
}

pub fn new_f32_grid(shape: (usize, usize), fill: f32) -> Array2<f32> {
    Array2::from_elem(shape, fill)
}

/// Structural copy: propagate only the non-empty cells of `src` into a grid
/// otherwise filled with `EMPTY`, matching the "structural copy" primitive
/// used to derive per-exit private structure grids (§4.2).
pub fn structural_copy_i32(src: &Array2<i32>) -> Array2<i32> {
    src.map(|&v| if v == EMPTY { EMPTY } else { v })
}

pub fn sum_i32(grid: &Array2<i32>) -> i64 {
    grid.iter().map(|&v| v as i64).sum()
}

pub fn get_i32(grid: &Array2<i32>, loc: Location) -> Option<i32> {
    loc.as_index().and_then(|ix| grid.get(ix)).copied()
}

pub fn get_f32(grid: &Array2<f32>, loc: Location) -> Option<f32> {
    loc.as_index().and_then(|ix| grid.get(ix)).copied()
}

pub fn set_i32(grid: &mut Array2<i32>, loc: Location, value: i32) {
    if let Some(ix) = loc.as_index() {
        if let Some(cell) = grid.get_mut(ix) {
            *cell = value;
        }
    }
}

pub fn set_f32(grid: &mut Array2<f32>, loc: Location, value: f32) {
    if let Some(ix) = loc.as_index() {
        if let Some(cell) = grid.get_mut(ix) {
            *cell = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_copy_keeps_only_nonempty_cells() {
        let mut src = new_i32_grid((2, 2), EMPTY);
        src[(0, 0)] = IMPASSABLE;
        src[(1, 1)] = EXIT;

        let copy = structural_copy_i32(&src);
        assert_eq!(copy[(0, 0)], IMPASSABLE);
        assert_eq!(copy[(0, 1)], EMPTY);
        assert_eq!(copy[(1, 1)], EXIT);
    }

    #[test]
    fn sum_handles_negative_sentinels() {
        let mut grid = new_i32_grid((1, 3), EMPTY);
        grid[(0, 0)] = IMPASSABLE;
        grid[(0, 1)] = 5;
        assert_eq!(sum_i32(&grid), 4);
    }
}
