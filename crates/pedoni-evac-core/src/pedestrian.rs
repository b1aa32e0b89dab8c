//! Pedestrian records and population management (§3, §4.8).

use crate::location::Location;
use crate::random::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PedestrianState {
    Moving,
    Stopped,
    Leaving,
    GotOut,
    Dead,
}

#[derive(Debug, Clone)]
pub struct Pedestrian {
    pub id: u32,
    pub state: PedestrianState,
    pub origin: Location,
    pub previous: Location,
    pub current: Location,
    pub target: Location,
    /// 3x3 transition probabilities, `prob[i][j]` for offset `(i-1, j-1)`.
    pub prob: [[f32; 3]; 3],
}

impl Pedestrian {
    pub fn new(id: u32, at: Location) -> Self {
        Pedestrian {
            id,
            state: PedestrianState::Moving,
            origin: at,
            previous: at,
            current: at,
            target: at,
            prob: [[0.0; 3]; 3],
        }
    }

    pub fn is_present(&self) -> bool {
        !matches!(self.state, PedestrianState::GotOut | PedestrianState::Dead)
    }

    /// Direction travelled on the previous commit, if any (used for inertia).
    pub fn inertia_direction(&self) -> Option<Location> {
        if self.previous == self.current {
            None
        } else {
            Some(self.current - self.previous)
        }
    }
}

/// Dense 1-based ids: `pedestrian_position_grid` uses 0 for empty, so the
/// first pedestrian created must be id 1.
pub struct PedestrianSet {
    pub pedestrians: Vec<Pedestrian>,
    next_id: u32,
}

impl Default for PedestrianSet {
    fn default() -> Self {
        PedestrianSet {
            pedestrians: Vec::new(),
            next_id: 1,
        }
    }
}

impl PedestrianSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.pedestrians.clear();
        self.next_id = 1;
    }

    pub fn spawn_at(&mut self, at: Location) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.pedestrians.push(Pedestrian::new(id, at));
        id
    }

    /// Randomly place `count` pedestrians on empty cells, per
    /// `NoRoomForPedestrians` (§7): fails if a full wrap-around of the cell
    /// list finds no empty cell.
    pub fn spawn_random(
        &mut self,
        rng: &mut Rng,
        empty_cells: &[Location],
        occupied: &mut ndarray::Array2<i32>,
        count: usize,
    ) -> crate::error::EngineResult<()> {
        if empty_cells.is_empty() {
            return Err(crate::error::EngineError::NoRoomForPedestrians);
        }

        let mut placed = 0;
        let start = rng.usize(empty_cells.len());
        let mut attempts = 0;

        while placed < count {
            if attempts >= empty_cells.len() * 2 && placed == 0 {
                return Err(crate::error::EngineError::NoRoomForPedestrians);
            }
            let idx = (start + attempts) % empty_cells.len();
            attempts += 1;
            if attempts > empty_cells.len() * 4 {
                // Full wrap-around repeatedly found nothing new: over-saturated.
                return Err(crate::error::EngineError::NoRoomForPedestrians);
            }

            let loc = empty_cells[idx];
            if let Some(ix) = loc.as_index() {
                if occupied.get(ix).copied() == Some(0) {
                    let id = self.spawn_at(loc);
                    occupied[ix] = id as i32;
                    placed += 1;
                }
            }
        }

        Ok(())
    }

    pub fn active_count(&self) -> usize {
        self.pedestrians.iter().filter(|p| p.is_present()).count()
    }

    pub fn is_environment_empty(&self) -> bool {
        self.active_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_dense_and_start_at_one() {
        let mut set = PedestrianSet::new();
        let a = set.spawn_at(Location::new(0, 0));
        let b = set.spawn_at(Location::new(0, 1));
        assert_eq!(a, 1);
        assert_eq!(b, 2);
    }

    #[test]
    fn inertia_direction_is_none_when_stationary() {
        let p = Pedestrian::new(1, Location::new(2, 2));
        assert_eq!(p.inertia_direction(), None);
    }

    #[test]
    fn inertia_direction_reflects_last_move() {
        let mut p = Pedestrian::new(1, Location::new(2, 2));
        p.previous = Location::new(2, 2);
        p.current = Location::new(2, 3);
        assert_eq!(p.inertia_direction(), Some(Location::new(0, 1)));
    }

    #[test]
    fn no_room_for_pedestrians_when_grid_is_full() {
        let mut set = PedestrianSet::new();
        let mut rng = Rng::with_seed(1);
        let cells = vec![Location::new(0, 0)];
        let mut occupied = crate::grid::new_i32_grid((1, 1), 1); // already occupied
        let result = set.spawn_random(&mut rng, &cells, &mut occupied, 1);
        assert!(result.is_err());
    }
}
