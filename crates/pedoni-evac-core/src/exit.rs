//! Exit registry (§4.2): contiguous-cell doors, each with its own
//! private-structure grid and per-exit Varas weight field.

use ndarray::Array2;

use crate::grid::{self, EXIT, IMPASSABLE};
use crate::location::Location;

/// A contiguous line of exit cells.
pub struct Exit {
    pub cells: Vec<Location>,
    pub blocked_by_fire: bool,
    /// Per-exit Varas flood-fill weight grid (§4.3), lazily populated by the
    /// static-field module when that form is selected.
    pub varas_weight: Array2<f32>,
    /// A copy of the obstacle grid with only this exit's cells marked `EXIT`.
    pub private_structure: Array2<i32>,
}

impl Exit {
    fn new(cell: Location, obstacle_grid: &Array2<i32>) -> Self {
        let shape = obstacle_grid.dim();
        let mut private_structure = grid::structural_copy_i32(obstacle_grid);
        grid::set_i32(&mut private_structure, cell, EXIT);

        Exit {
            cells: vec![cell],
            blocked_by_fire: false,
            varas_weight: grid::new_f32_grid(shape, 0.0),
            private_structure,
        }
    }

    /// Append a cell to an existing exit (must be orthogonally adjacent to
    /// the last cell added; the caller is responsible for choosing a
    /// contiguous sequence — the engine does not validate contiguity).
    pub fn expand(&mut self, cell: Location) {
        self.cells.push(cell);
        grid::set_i32(&mut self.private_structure, cell, EXIT);
    }

    /// At least one cell has an orthogonal neighbor that is neither an
    /// obstacle nor another exit cell.
    pub fn is_accessible(&self, obstacle_grid: &Array2<i32>, exits_grid: &Array2<i32>) -> bool {
        let shape = obstacle_grid.dim();
        self.cells.iter().any(|&cell| {
            cell.von_neumann4().into_iter().any(|n| {
                n.is_inside(shape)
                    && grid::get_i32(obstacle_grid, n) != Some(IMPASSABLE)
                    && grid::get_i32(exits_grid, n) != Some(EXIT)
            })
        })
    }

    /// Every orthogonal neighbor of every cell is an obstacle, another exit
    /// cell, or on fire.
    pub fn is_blocked_by_fire(
        &self,
        obstacle_grid: &Array2<i32>,
        exits_grid: &Array2<i32>,
        fire_grid: &Array2<i32>,
    ) -> bool {
        let shape = obstacle_grid.dim();
        self.cells.iter().all(|&cell| {
            cell.von_neumann4().into_iter().all(|n| {
                !n.is_inside(shape)
                    || grid::get_i32(obstacle_grid, n) == Some(IMPASSABLE)
                    || grid::get_i32(exits_grid, n) == Some(EXIT)
                    || grid::get_i32(fire_grid, n) == Some(crate::grid::FIRE)
            })
        })
    }
}

#[derive(Default)]
pub struct ExitRegistry {
    pub exits: Vec<Exit>,
}

impl ExitRegistry {
    pub fn new() -> Self {
        ExitRegistry::default()
    }

    /// Start a new exit with a single cell.
    pub fn add_exit(&mut self, cell: Location, obstacle_grid: &Array2<i32>) {
        self.exits.push(Exit::new(cell, obstacle_grid));
    }

    /// Append a cell to the most recently added exit.
    pub fn expand_last(&mut self, cell: Location) {
        if let Some(exit) = self.exits.last_mut() {
            exit.expand(cell);
        }
    }

    /// Update the `blocked_by_fire` flag of every exit. Monotone: once
    /// blocked, an exit stays blocked (fire cells never disappear) so this
    /// only ever sets the flag, never clears it.
    ///
    /// Returns `true` if the effective (non-blocked) exit set changed.
    pub fn update_fire_blockage(
        &mut self,
        obstacle_grid: &Array2<i32>,
        exits_grid: &Array2<i32>,
        fire_grid: &Array2<i32>,
    ) -> bool {
        let mut changed = false;
        for exit in self.exits.iter_mut() {
            if !exit.blocked_by_fire
                && exit.is_blocked_by_fire(obstacle_grid, exits_grid, fire_grid)
            {
                exit.blocked_by_fire = true;
                changed = true;
            }
        }
        changed
    }

    pub fn reset_blockage(&mut self) {
        for exit in self.exits.iter_mut() {
            exit.blocked_by_fire = false;
        }
    }

    pub fn non_blocked_cells(&self) -> Vec<Location> {
        self.exits
            .iter()
            .filter(|e| !e.blocked_by_fire)
            .flat_map(|e| e.cells.iter().copied())
            .collect()
    }

    pub fn all_cells(&self) -> Vec<Location> {
        self.exits.iter().flat_map(|e| e.cells.iter().copied()).collect()
    }

    pub fn any_inaccessible(&self, obstacle_grid: &Array2<i32>, exits_grid: &Array2<i32>) -> bool {
        self.exits
            .iter()
            .any(|e| !e.is_accessible(obstacle_grid, exits_grid))
    }
}
