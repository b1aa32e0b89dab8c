//! Fire dynamics and fields (§4.5): Moore-8 spreading, the distance-to-fire
//! field (accelerated with a coordinate-set index, not a linear scan), the
//! fire floor field, and risky/danger cell classification.

use ndarray::Array2;

use crate::grid::{self, RiskLevel, EMPTY, FIRE, IMPASSABLE};
use crate::location::Location;

pub struct FireState {
    pub grid: Array2<i32>,
    initial_grid: Array2<i32>,
    pub distance_to_fire: Array2<f32>,
    pub fire_field: Array2<f32>,
    pub risky: Array2<RiskLevel>,
    shape: (usize, usize),
}

impl FireState {
    pub fn new(initial_grid: Array2<i32>) -> Self {
        let shape = initial_grid.dim();
        FireState {
            grid: initial_grid.clone(),
            initial_grid,
            distance_to_fire: grid::new_f32_grid(shape, 0.0),
            fire_field: grid::new_f32_grid(shape, 0.0),
            risky: Array2::from_elem(shape, RiskLevel::None),
            shape,
        }
    }

    pub fn reset(&mut self) {
        self.grid.assign(&self.initial_grid);
    }

    pub fn has_fire(&self) -> bool {
        self.grid.iter().any(|&c| c == FIRE)
    }

    fn fire_cells(&self) -> Vec<Location> {
        let mut cells = Vec::new();
        for (r, c) in ndarray::indices(self.shape) {
            if self.grid[(r, c)] == FIRE {
                cells.push(Location::new(r as i32, c as i32));
            }
        }
        cells
    }

    /// Moore-8 spread: a scratch grid receives `FIRE` at every burning cell
    /// and every passable 8-neighbor of a burning cell. Fire is monotone.
    pub fn spread(&mut self, obstacle_grid: &Array2<i32>) -> bool {
        let before = self.fire_cells().len();
        let mut scratch = self.grid.clone();

        for (r, c) in ndarray::indices(self.shape) {
            if self.grid[(r, c)] != FIRE {
                continue;
            }
            let loc = Location::new(r as i32, c as i32);
            for n in loc.moore8() {
                if let Some(nix) = n.as_index() {
                    if n.is_inside(self.shape)
                        && obstacle_grid.get(nix).copied() == Some(EMPTY)
                        && self.grid.get(nix).copied() == Some(EMPTY)
                    {
                        scratch[nix] = FIRE;
                    }
                }
            }
        }

        self.grid = scratch;
        self.fire_cells().len() > before
    }

    /// Coordinate-set index over fire positions: sets grouped by row then by
    /// column, so nearest-fire queries resolve with two binary searches
    /// instead of a linear scan over every fire cell (a real requirement
    /// once fire covers a large fraction of the grid).
    fn build_index(&self) -> CoordinateIndex {
        let mut by_row: Vec<i32> = self.fire_cells().iter().map(|l| l.row).collect();
        let mut by_col: Vec<i32> = self.fire_cells().iter().map(|l| l.col).collect();
        by_row.sort_unstable();
        by_row.dedup();
        by_col.sort_unstable();
        by_col.dedup();
        CoordinateIndex {
            cells: self.fire_cells(),
            rows: by_row,
            cols: by_col,
        }
    }

    /// Euclidean distance from every cell (obstacles included) to the
    /// nearest fire cell. Obstacle cells get a real distance too, not a
    /// sentinel — `classify_risky`'s second pass needs an obstacle's own
    /// distance to decide whether it sits close enough to the fire to mark
    /// its passable neighbors `Risky`; every other consumer already guards
    /// on `obstacle_grid` directly before reading this value.
    pub fn compute_distance_to_fire(&mut self, _obstacle_grid: &Array2<i32>) {
        let shape = self.shape;
        if !self.has_fire() {
            self.distance_to_fire = grid::new_f32_grid(shape, f32::INFINITY);
            return;
        }

        let index = self.build_index();
        let mut distance = grid::new_f32_grid(shape, 0.0);

        for (r, c) in ndarray::indices(shape) {
            if self.grid[(r, c)] == FIRE {
                distance[(r, c)] = 0.0;
                continue;
            }
            let loc = Location::new(r as i32, c as i32);
            distance[(r, c)] = index.nearest_distance(loc);
        }

        self.distance_to_fire = distance;
    }

    /// Fire floor field: `f = 1/d` within `gamma`, normalised so the
    /// affected region sums to 1; all-zero when there is no fire.
    pub fn compute_fire_field(&mut self, gamma: f64, obstacle_grid: &Array2<i32>) {
        let shape = self.shape;
        let mut field = grid::new_f32_grid(shape, 0.0);

        if !self.has_fire() {
            self.fire_field = field;
            return;
        }

        let mut total = 0.0f64;
        for (r, c) in ndarray::indices(shape) {
            if obstacle_grid[(r, c)] == IMPASSABLE || self.grid[(r, c)] == FIRE {
                continue;
            }
            let d = self.distance_to_fire[(r, c)];
            if d >= 0.0 && d as f64 <= gamma {
                let v = 1.0 / d.max(1e-6) as f64;
                field[(r, c)] = v as f32;
                total += v;
            }
        }

        if total > 0.0 {
            field.mapv_inplace(|v| (v as f64 / total) as f32);
        }

        self.fire_field = field;
    }

    /// Danger: `d_fire < 1.5`. Risky: passable, adjacent to an obstacle whose
    /// own `d_fire <= 3`, and whose own `d_fire < 1.5` (§4.5).
    pub fn classify_risky(&mut self, obstacle_grid: &Array2<i32>) {
        let shape = self.shape;
        let mut risky = Array2::from_elem(shape, RiskLevel::None);

        for (r, c) in ndarray::indices(shape) {
            if obstacle_grid[(r, c)] == IMPASSABLE || self.grid[(r, c)] == FIRE {
                continue;
            }
            let d_fire = self.distance_to_fire[(r, c)];
            if d_fire >= 0.0 && d_fire < 1.5 {
                risky[(r, c)] = RiskLevel::Danger;
            }
        }

        // Second pass: cells the first pass marked Danger get reclassified
        // to Risky when they're also adjacent to an obstacle whose own
        // d_fire <= 3 — mirrors the two-pass Danger-then-Risky overwrite.
        for (r, c) in ndarray::indices(shape) {
            if risky[(r, c)] != RiskLevel::Danger {
                continue;
            }
            let loc = Location::new(r as i32, c as i32);
            let adjacent_to_obstacle_near_fire = loc.von_neumann4().into_iter().any(|n| {
                grid::get_i32(obstacle_grid, n) == Some(IMPASSABLE)
                    && grid::get_f32(&self.distance_to_fire, n)
                        .map(|d| d >= 0.0 && d as f64 <= 3.0)
                        .unwrap_or(false)
            });
            if adjacent_to_obstacle_near_fire {
                risky[(r, c)] = RiskLevel::Risky;
            }
        }

        self.risky = risky;
    }
}

struct CoordinateIndex {
    cells: Vec<Location>,
    rows: Vec<i32>,
    cols: Vec<i32>,
}

impl CoordinateIndex {
    /// Up to 3 candidate rows and 3 candidate columns (the row/col nearest
    /// `loc` plus its immediate neighbors in the sorted coordinate sets),
    /// then an exact scan restricted to fire cells matching those rows or
    /// columns.
    fn nearest_distance(&self, loc: Location) -> f32 {
        let candidate_rows = nearby_values(&self.rows, loc.row);
        let candidate_cols = nearby_values(&self.cols, loc.col);

        self.cells
            .iter()
            .filter(|cell| candidate_rows.contains(&cell.row) || candidate_cols.contains(&cell.col))
            .map(|&cell| loc.euclidean_distance(cell))
            .fold(f32::INFINITY, f32::min)
    }
}

/// Binary-search `sorted` for `target`, returning the matching value (if
/// any) plus its immediate predecessor/successor: up to 3 candidates.
fn nearby_values(sorted: &[i32], target: i32) -> Vec<i32> {
    if sorted.is_empty() {
        return Vec::new();
    }
    let pos = sorted.partition_point(|&v| v < target);
    let mut out = Vec::with_capacity(3);
    if pos > 0 {
        out.push(sorted[pos - 1]);
    }
    if pos < sorted.len() {
        out.push(sorted[pos]);
    }
    if pos + 1 < sorted.len() {
        out.push(sorted[pos + 1]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::new_i32_grid;

    #[test]
    fn fire_is_monotone_after_spread() {
        let obstacle_grid = new_i32_grid((5, 5), 0);
        let mut initial = new_i32_grid((5, 5), 0);
        initial[(2, 2)] = FIRE;
        let mut fire = FireState::new(initial);

        let before: Vec<i32> = fire.grid.iter().copied().collect();
        fire.spread(&obstacle_grid);
        for (a, b) in before.iter().zip(fire.grid.iter()) {
            if *a == FIRE {
                assert_eq!(*b, FIRE);
            }
        }
    }

    #[test]
    fn distance_to_fire_index_matches_linear_scan() {
        let obstacle_grid = new_i32_grid((10, 10), 0);
        let mut initial = new_i32_grid((10, 10), 0);
        initial[(1, 1)] = FIRE;
        initial[(8, 8)] = FIRE;
        let mut fire = FireState::new(initial);
        fire.compute_distance_to_fire(&obstacle_grid);

        for (r, c) in ndarray::indices((10usize, 10usize)) {
            if fire.grid[(r, c)] == FIRE {
                continue;
            }
            let loc = Location::new(r as i32, c as i32);
            let expected = [Location::new(1, 1), Location::new(8, 8)]
                .iter()
                .map(|&f| loc.euclidean_distance(f))
                .fold(f32::INFINITY, f32::min);
            assert!((fire.distance_to_fire[(r, c)] - expected).abs() < 1e-4);
        }
    }

    #[test]
    fn no_fire_means_empty_fire_field() {
        let obstacle_grid = new_i32_grid((5, 5), 0);
        let initial = new_i32_grid((5, 5), 0);
        let mut fire = FireState::new(initial);
        fire.compute_distance_to_fire(&obstacle_grid);
        fire.compute_fire_field(10.0, &obstacle_grid);
        assert!(fire.fire_field.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn cells_adjacent_to_fire_are_danger() {
        let obstacle_grid = new_i32_grid((5, 5), 0);
        let mut initial = new_i32_grid((5, 5), 0);
        initial[(2, 2)] = FIRE;
        let mut fire = FireState::new(initial);
        fire.compute_distance_to_fire(&obstacle_grid);
        fire.classify_risky(&obstacle_grid);
        assert_eq!(fire.risky[(2, 1)], RiskLevel::Danger);
    }

    #[test]
    fn danger_cell_adjacent_to_an_obstacle_near_fire_becomes_risky() {
        let mut obstacle_grid = new_i32_grid((5, 5), 0);
        obstacle_grid[(2, 0)] = IMPASSABLE;
        let mut initial = new_i32_grid((5, 5), 0);
        initial[(2, 2)] = FIRE;
        let mut fire = FireState::new(initial);
        fire.compute_distance_to_fire(&obstacle_grid);
        fire.classify_risky(&obstacle_grid);
        assert_eq!(fire.risky[(2, 1)], RiskLevel::Risky);
    }
}
