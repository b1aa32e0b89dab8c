//! Transition-probability model (§4.6): scores the 3x3 von-Neumann cross
//! around a moving pedestrian and picks a target by roulette.

use ndarray::Array2;

use crate::grid::{self, RiskLevel, FIRE, IMPASSABLE};
use crate::location::{bresenham_line, Location};
use crate::pedestrian::Pedestrian;
use crate::random::Rng;
use crate::static_field;

pub struct TransitionInputs<'a> {
    pub obstacle_grid: &'a Array2<i32>,
    pub fire_grid: &'a Array2<i32>,
    pub position_grid: &'a Array2<i32>,
    pub static_field: &'a Array2<f32>,
    pub distance_to_exit: &'a Array2<f32>,
    pub dynamic_field: &'a Array2<f32>,
    pub fire_field: &'a Array2<f32>,
    pub risky: &'a Array2<RiskLevel>,
    pub exit_cells: &'a [Location],
    pub ks: f64,
    pub kd: f64,
    pub kf: f64,
    pub omega: f64,
    pub fire_alpha: f64,
    pub risk_distance: f64,
    pub fire_aware: bool,
    pub allow_diagonals: bool,
    pub prevent_corner_crossing: bool,
}

/// Is any cell on the Bresenham path from `from` to `exit` (inclusive of the
/// start) on fire? If so the exit is not "visible".
fn exit_visible(from: Location, exit: Location, fire_grid: &Array2<i32>) -> bool {
    bresenham_line(from, exit)
        .iter()
        .all(|&p| grid::get_i32(fire_grid, p) != Some(FIRE))
}

/// Score the 3x3 cross for `pedestrian` and fill its `prob` table, returning
/// whether a visible-exit subset smaller than the full exit set was used.
pub fn score(pedestrian: &Pedestrian, inputs: &TransitionInputs) -> [[f32; 3]; 3] {
    let p = pedestrian.current;

    let aux_static: Option<Array2<f32>> = if inputs.fire_aware {
        let visible: Vec<Location> = inputs
            .exit_cells
            .iter()
            .copied()
            .filter(|&e| exit_visible(p, e, inputs.fire_grid))
            .collect();
        if visible.len() < inputs.exit_cells.len() {
            Some(static_field::compute_visible_zheng(
                inputs.obstacle_grid,
                inputs.fire_grid,
                &visible,
            ))
        } else {
            None
        }
    } else {
        None
    };
    let static_field = aux_static.as_ref().unwrap_or(inputs.static_field);

    let mut prob = [[0.0f32; 3]; 3];

    for i in 0..3 {
        for j in 0..3 {
            let dr = i as i32 - 1;
            let dc = j as i32 - 1;
            if dr != 0 && dc != 0 && !inputs.allow_diagonals {
                continue;
            }

            let c = p + Location::new(dr, dc);
            if !c.is_inside(inputs.obstacle_grid.dim()) {
                continue;
            }
            if grid::get_i32(inputs.obstacle_grid, c) == Some(IMPASSABLE) {
                continue;
            }
            if dr != 0 && dc != 0 {
                let orth_a = Location::new(p.row + dr, p.col);
                let orth_b = Location::new(p.row, p.col + dc);
                let a_impassable = grid::get_i32(inputs.obstacle_grid, orth_a) == Some(IMPASSABLE)
                    || !orth_a.is_inside(inputs.obstacle_grid.dim());
                let b_impassable = grid::get_i32(inputs.obstacle_grid, orth_b) == Some(IMPASSABLE)
                    || !orth_b.is_inside(inputs.obstacle_grid.dim());
                if !crate::location::diagonal_is_valid(a_impassable, b_impassable, inputs.prevent_corner_crossing) {
                    continue;
                }
            }
            if grid::get_i32(inputs.fire_grid, c) == Some(FIRE) {
                continue;
            }
            if c != p {
                if let Some(occupant) = grid::get_i32(inputs.position_grid, c) {
                    if occupant > 0 {
                        continue;
                    }
                }
            }
            let cell_risk = index_risk(inputs.risky, c);
            if cell_risk == Some(RiskLevel::Danger) {
                continue;
            }

            let s = grid::get_f32(static_field, c).unwrap_or(0.0) as f64;
            let d = grid::get_f32(inputs.dynamic_field, c).unwrap_or(0.0) as f64;
            let mut weight = (inputs.ks * s).exp() * (inputs.kd * d).exp();

            if cell_risk != Some(RiskLevel::Risky) {
                let dist = grid::get_f32(inputs.distance_to_exit, c).unwrap_or(f32::MAX) as f64;
                let alpha_fire = if dist < inputs.risk_distance {
                    inputs.fire_alpha
                } else {
                    1.0
                };
                let f = grid::get_f32(inputs.fire_field, c).unwrap_or(0.0) as f64;
                weight /= (inputs.kf * alpha_fire * f).exp();
            }

            prob[i as usize][j as usize] = weight as f32;
        }
    }

    if let Some(m) = pedestrian.inertia_direction() {
        let i = (m.row + 1) as usize;
        let j = (m.col + 1) as usize;
        if i < 3 && j < 3 {
            prob[i][j] *= inputs.omega as f32;
        }
    }

    normalize(&mut prob);
    prob
}

fn index_risk(risky: &Array2<RiskLevel>, loc: Location) -> Option<RiskLevel> {
    loc.as_index().and_then(|ix| risky.get(ix)).copied()
}

fn normalize(prob: &mut [[f32; 3]; 3]) {
    let total: f64 = prob.iter().flatten().map(|&v| v as f64).sum();
    if total <= 0.0 {
        return;
    }
    for row in prob.iter_mut() {
        for v in row.iter_mut() {
            *v = (*v as f64 / total) as f32;
        }
    }
}

/// Roulette over the flattened 3x3 table; falls back to the current cell
/// (no move) if rounding leaves nothing selected.
pub fn select_target(prob: &[[f32; 3]; 3], current: Location, rng: &mut Rng) -> Location {
    let weights: Vec<f64> = prob.iter().flatten().map(|&v| v as f64).collect();
    let total: f64 = weights.iter().sum();
    match rng.roulette(&weights, total) {
        Some(idx) => {
            let i = idx / 3;
            let j = idx % 3;
            current + Location::new(i as i32 - 1, j as i32 - 1)
        }
        None => current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::new_i32_grid;
    use crate::pedestrian::Pedestrian;

    fn uniform_inputs<'a>(
        obstacle_grid: &'a Array2<i32>,
        fire_grid: &'a Array2<i32>,
        position_grid: &'a Array2<i32>,
        static_field: &'a Array2<f32>,
        distance: &'a Array2<f32>,
        dynamic: &'a Array2<f32>,
        fire_field: &'a Array2<f32>,
        risky: &'a Array2<RiskLevel>,
        exit_cells: &'a [Location],
    ) -> TransitionInputs<'a> {
        TransitionInputs {
            obstacle_grid,
            fire_grid,
            position_grid,
            static_field,
            distance_to_exit: distance,
            dynamic_field: dynamic,
            fire_field,
            risky,
            exit_cells,
            ks: 1.0,
            kd: 1.0,
            kf: 1.0,
            omega: 1.0,
            fire_alpha: 2.0,
            risk_distance: 5.0,
            fire_aware: true,
            allow_diagonals: false,
            prevent_corner_crossing: false,
        }
    }

    #[test]
    fn prefers_cell_closer_to_exit() {
        let obstacle_grid = new_i32_grid((1, 5), 0);
        let fire_grid = new_i32_grid((1, 5), 0);
        let position_grid = new_i32_grid((1, 5), 0);
        let exit_cells = vec![Location::new(0, 0)];
        let distance = static_field::distance_to_exit(&obstacle_grid, &fire_grid, &exit_cells);
        let field = static_field::compute(
            crate::config::StaticFieldKind::Zheng,
            &obstacle_grid,
            &fire_grid,
            &{
                let mut reg = crate::exit::ExitRegistry::new();
                reg.add_exit(Location::new(0, 0), &obstacle_grid);
                reg
            },
            std::f64::consts::SQRT_2,
            false,
        );
        let dynamic = grid::new_f32_grid((1, 5), 0.0);
        let fire_field = grid::new_f32_grid((1, 5), 0.0);
        let risky = Array2::from_elem((1, 5), RiskLevel::None);

        let ped = Pedestrian::new(1, Location::new(0, 2));
        let inputs = uniform_inputs(
            &obstacle_grid,
            &fire_grid,
            &position_grid,
            &field.field,
            &distance,
            &dynamic,
            &fire_field,
            &risky,
            &exit_cells,
        );
        let prob = score(&ped, &inputs);
        // column 1 (towards exit) should outweigh column 3 (away from exit)
        assert!(prob[1][0] > prob[1][2]);
    }

    #[test]
    fn danger_cells_get_zero_probability() {
        let obstacle_grid = new_i32_grid((1, 3), 0);
        let fire_grid = new_i32_grid((1, 3), 0);
        let position_grid = new_i32_grid((1, 3), 0);
        let exit_cells = vec![Location::new(0, 0)];
        let distance = static_field::distance_to_exit(&obstacle_grid, &fire_grid, &exit_cells);
        let field = grid::new_f32_grid((1, 3), 1.0);
        let dynamic = grid::new_f32_grid((1, 3), 0.0);
        let fire_field = grid::new_f32_grid((1, 3), 0.0);
        let mut risky = Array2::from_elem((1, 3), RiskLevel::None);
        risky[(0, 2)] = RiskLevel::Danger;

        let ped = Pedestrian::new(1, Location::new(0, 1));
        let inputs = uniform_inputs(
            &obstacle_grid,
            &fire_grid,
            &position_grid,
            &field,
            &distance,
            &dynamic,
            &fire_field,
            &risky,
            &exit_cells,
        );
        let prob = score(&ped, &inputs);
        assert_eq!(prob[1][2], 0.0);
    }

    #[test]
    fn select_target_falls_back_to_current_when_all_zero() {
        let prob = [[0.0f32; 3]; 3];
        let mut rng = Rng::with_seed(1);
        let current = Location::new(3, 3);
        assert_eq!(select_target(&prob, current, &mut rng), current);
    }
}
