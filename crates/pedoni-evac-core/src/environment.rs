//! Parsed environment data (§6): the obstacle grid, any statically-placed
//! pedestrians and initial fire, plus the exit groups for each simulation
//! set. Parsing the environment/auxiliary file text is the CLI crate's job
//! (`loader.rs`); this module only holds the validated result.

use ndarray::Array2;

use crate::grid::{new_i32_grid, EMPTY, IMPASSABLE};
use crate::location::Location;

#[derive(Debug, Clone)]
pub struct Environment {
    pub obstacle_grid: Array2<i32>,
    pub initial_fire: Vec<Location>,
    pub static_pedestrians: Vec<Location>,
    pub static_exits: Vec<Location>,
}

impl Environment {
    pub fn empty(shape: (usize, usize)) -> Self {
        Environment {
            obstacle_grid: new_i32_grid(shape, EMPTY),
            initial_fire: Vec::new(),
            static_pedestrians: Vec::new(),
            static_exits: Vec::new(),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.obstacle_grid.dim()
    }

    /// Every cell that is not an obstacle, used as the random-spawn pool.
    pub fn empty_cells(&self) -> Vec<Location> {
        let shape = self.shape();
        let mut cells = Vec::with_capacity(shape.0 * shape.1);
        for (r, c) in ndarray::indices(shape) {
            if self.obstacle_grid[(r, c)] != IMPASSABLE {
                cells.push(Location::new(r as i32, c as i32));
            }
        }
        cells
    }
}

/// One exit placement choice for a simulation set (§4.9 step 3): a list of
/// exits, each a contiguous group of cells.
#[derive(Debug, Clone, Default)]
pub struct SimulationSetExits {
    pub exits: Vec<Vec<Location>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cells_excludes_obstacles() {
        let mut env = Environment::empty((2, 2));
        env.obstacle_grid[(0, 0)] = IMPASSABLE;
        let cells = env.empty_cells();
        assert_eq!(cells.len(), 3);
        assert!(!cells.contains(&Location::new(0, 0)));
    }
}
