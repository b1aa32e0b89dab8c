//! Static floor field (§4.3): distance-to-nearest-exit attraction, in three
//! selectable forms.

use ndarray::Array2;

use crate::config::StaticFieldKind;
use crate::exit::ExitRegistry;
use crate::grid::{self, F_BLOCKED_EXIT, F_EXIT, F_FIRE, F_IMPASSABLE, FIRE, IMPASSABLE};
use crate::location::Location;

/// Moore-8 step kernel used by the Varas flood fill: orthogonal cost 1,
/// diagonal cost `diagonal_cost` (configurable, typically sqrt(2)).
fn step_cost(dr: i32, dc: i32, diagonal_cost: f64) -> f64 {
    if dr != 0 && dc != 0 {
        diagonal_cost
    } else {
        1.0
    }
}

/// Varas flood-fill wavefront cost, restricted to the given (non-blocked)
/// exit cells.
pub fn varas_flood_fill(
    obstacle_grid: &Array2<i32>,
    exit_cells: &[Location],
    diagonal_cost: f64,
    prevent_corner_crossing: bool,
) -> Array2<f32> {
    let shape = obstacle_grid.dim();
    let mut weight = grid::new_f32_grid(shape, 0.0);

    for (r, c) in ndarray::indices(shape) {
        if obstacle_grid[(r, c)] == IMPASSABLE {
            weight[(r, c)] = F_IMPASSABLE;
        }
    }
    for &cell in exit_cells {
        if let Some(ix) = cell.as_index() {
            weight[ix] = F_EXIT;
        }
    }

    let deltas: [(i32, i32); 8] = [
        (-1, -1),
        (-1, 0),
        (-1, 1),
        (0, -1),
        (0, 1),
        (1, -1),
        (1, 0),
        (1, 1),
    ];

    loop {
        let mut aux = grid::new_f32_grid(shape, 0.0);

        for (r, c) in ndarray::indices(shape) {
            let current = weight[(r, c)];
            // A positive value means "already known distance, can propagate".
            let source_value = if weight[(r, c)] == F_EXIT {
                0.0
            } else if current > 0.0 {
                current
            } else {
                continue;
            };

            let loc = Location::new(r as i32, c as i32);
            for (dr, dc) in deltas {
                let n = loc + Location::new(dr, dc);
                let Some(nix) = n.as_index() else { continue };
                let Some(&n_val) = weight.get(nix) else { continue };
                if n_val == F_IMPASSABLE || n_val == F_EXIT {
                    continue;
                }

                if dr != 0 && dc != 0 {
                    let orth_a = Location::new(loc.row + dr, loc.col);
                    let orth_b = Location::new(loc.row, loc.col + dc);
                    let a_impassable = grid::get_f32(&weight, orth_a) == Some(F_IMPASSABLE);
                    let b_impassable = grid::get_f32(&weight, orth_b) == Some(F_IMPASSABLE);
                    if !crate::location::diagonal_is_valid(
                        a_impassable,
                        b_impassable,
                        prevent_corner_crossing,
                    ) {
                        continue;
                    }
                }

                let proposal = source_value + step_cost(dr, dc, diagonal_cost) as f32;
                let slot = &mut aux[nix];
                if *slot == 0.0 || proposal < *slot {
                    *slot = proposal;
                }
            }
        }

        // `changed` reflects whether any cell's settled weight actually
        // improved this sweep, not whether a proposal was written into the
        // (always zero-seeded) scratch buffer — exit cells and already-
        // converged cells re-propose their unchanged distance every sweep,
        // so tracking writes into `aux` would never reach a fixed point.
        let mut changed = false;
        for (r, c) in ndarray::indices(shape) {
            if weight[(r, c)] == F_IMPASSABLE || weight[(r, c)] == F_EXIT {
                continue;
            }
            if aux[(r, c)] > 0.0 && (weight[(r, c)] == 0.0 || aux[(r, c)] < weight[(r, c)]) {
                weight[(r, c)] = aux[(r, c)];
                changed = true;
            }
        }

        if !changed {
            break;
        }
    }

    weight
}

/// Euclidean distance from every passable cell to the nearest of
/// `exit_cells`. Impassable/fire cells carry the matching sentinel.
pub fn distance_to_exit(
    obstacle_grid: &Array2<i32>,
    fire_grid: &Array2<i32>,
    exit_cells: &[Location],
) -> Array2<f32> {
    let shape = obstacle_grid.dim();
    let mut distance = grid::new_f32_grid(shape, 0.0);

    for (r, c) in ndarray::indices(shape) {
        if obstacle_grid[(r, c)] == IMPASSABLE {
            distance[(r, c)] = F_IMPASSABLE;
            continue;
        }
        if fire_grid[(r, c)] == FIRE {
            distance[(r, c)] = F_FIRE;
            continue;
        }
        let loc = Location::new(r as i32, c as i32);
        let d = exit_cells
            .iter()
            .map(|&e| loc.euclidean_distance(e))
            .fold(f32::INFINITY, f32::min);
        distance[(r, c)] = if d.is_finite() { d } else { F_BLOCKED_EXIT };
    }

    distance
}

/// Zheng normalised form: `s = 1/(d+1)`, normalised so `sum(s) == 1` over
/// passable, non-fire, non-blocked-exit cells.
fn zheng_from_distance(distance: &Array2<f32>) -> Array2<f32> {
    let shape = distance.dim();
    let mut field = grid::new_f32_grid(shape, 0.0);
    let mut total = 0.0f64;

    for (r, c) in ndarray::indices(shape) {
        let d = distance[(r, c)];
        if d < 0.0 {
            field[(r, c)] = d;
            continue;
        }
        let s = 1.0 / (d as f64 + 1.0);
        field[(r, c)] = s as f32;
        total += s;
    }

    if total > 0.0 {
        for (r, c) in ndarray::indices(shape) {
            if field[(r, c)] >= 0.0 {
                field[(r, c)] = (field[(r, c)] as f64 / total) as f32;
            }
        }
    }

    field
}

/// Kirchner form: `s = max_value - d`, higher means closer.
fn kirchner_from_distance(distance: &Array2<f32>) -> Array2<f32> {
    let shape = distance.dim();
    let max_value = distance
        .iter()
        .copied()
        .filter(|&d| d >= 0.0)
        .fold(0.0f32, f32::max);

    let mut field = grid::new_f32_grid(shape, 0.0);
    for (r, c) in ndarray::indices(shape) {
        let d = distance[(r, c)];
        field[(r, c)] = if d < 0.0 { d } else { max_value - d };
    }
    field
}

pub struct StaticFieldResult {
    pub field: Array2<f32>,
    pub distance_to_exit: Array2<f32>,
}

/// Recompute the static field for the engine's currently non-blocked exits
/// (§4.3). Called at simulation-set start and whenever the effective exit
/// set changes (an exit becomes blocked by fire).
pub fn compute(
    kind: StaticFieldKind,
    obstacle_grid: &Array2<i32>,
    fire_grid: &Array2<i32>,
    exits: &ExitRegistry,
    diagonal_cost: f64,
    prevent_corner_crossing: bool,
) -> StaticFieldResult {
    let exit_cells = exits.non_blocked_cells();
    let distance = distance_to_exit(obstacle_grid, fire_grid, &exit_cells);

    let field = match kind {
        StaticFieldKind::Varas => {
            varas_flood_fill(obstacle_grid, &exit_cells, diagonal_cost, prevent_corner_crossing)
        }
        StaticFieldKind::Zheng => zheng_from_distance(&distance),
        StaticFieldKind::Kirchner => kirchner_from_distance(&distance),
    };

    StaticFieldResult {
        field,
        distance_to_exit: distance,
    }
}

/// Build a static field using only the subset of exit cells a pedestrian can
/// see (§4.6 line-of-sight aux field). Always Zheng-normalised, since it is
/// only used by the fire-aware transition model.
pub fn compute_visible_zheng(
    obstacle_grid: &Array2<i32>,
    fire_grid: &Array2<i32>,
    visible_exit_cells: &[Location],
) -> Array2<f32> {
    let distance = distance_to_exit(obstacle_grid, fire_grid, visible_exit_cells);
    zheng_from_distance(&distance)
}
