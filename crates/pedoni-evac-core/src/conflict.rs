//! Conflict resolution (§4.7): target conflicts (with friction) and
//! path-crossing "X" conflicts, run after scoring and before the movement
//! commit.

use crate::grid::{self, new_i32_grid};
use crate::location::Location;
use crate::pedestrian::{Pedestrian, PedestrianState};
use crate::random::Rng;

struct ConflictRecord {
    ids: Vec<u32>,
}

/// Scan targets in id order into a scratch grid; positive entries are a
/// single claim so far, negative entries are `-(index+1)` into `records`.
fn build_target_conflicts(pedestrians: &[Pedestrian], shape: (usize, usize)) -> Vec<ConflictRecord> {
    let mut claims = new_i32_grid(shape, 0);
    let mut records: Vec<ConflictRecord> = Vec::new();

    let mut moving: Vec<&Pedestrian> = pedestrians
        .iter()
        .filter(|p| p.state == PedestrianState::Moving)
        .collect();
    moving.sort_by_key(|p| p.id);

    for ped in moving {
        let Some(ix) = ped.target.as_index() else { continue };
        if ix.0 >= shape.0 || ix.1 >= shape.1 {
            continue;
        }
        let slot = claims[ix];
        if slot == 0 {
            claims[ix] = ped.id as i32;
        } else if slot > 0 {
            let record_index = records.len();
            records.push(ConflictRecord {
                ids: vec![slot as u32, ped.id],
            });
            claims[ix] = -((record_index as i32) + 1);
        } else {
            let record_index = (-slot - 1) as usize;
            records[record_index].ids.push(ped.id);
        }
    }

    records
}

/// Resolve target conflicts: with probability `mu` every participant is
/// denied (friction), otherwise a fair roulette picks one winner. Every
/// non-winner transitions `MOVING -> STOPPED`.
pub fn resolve_target_conflicts(pedestrians: &mut [Pedestrian], shape: (usize, usize), mu: f64, rng: &mut Rng) {
    let records = build_target_conflicts(pedestrians, shape);
    if records.is_empty() {
        return;
    }

    for record in records {
        let winner = if rng.bernoulli(mu) {
            None
        } else {
            let weights = vec![1.0; record.ids.len()];
            let total = record.ids.len() as f64;
            rng.roulette(&weights, total).map(|idx| record.ids[idx])
        };

        for &id in &record.ids {
            if Some(id) != winner {
                if let Some(p) = pedestrians.iter_mut().find(|p| p.id == id) {
                    if p.state == PedestrianState::Moving {
                        p.state = PedestrianState::Stopped;
                    }
                }
            }
        }
    }
}

/// Two segments `current -> target`, both axis-oblique, cross strictly
/// inside both open segments, and the crossing point is not either target
/// (that would already be a handled target conflict).
fn segments_cross(a_from: Location, a_to: Location, b_from: Location, b_to: Location) -> bool {
    let (ax0, ay0, ax1, ay1) = (a_from.col as f64, a_from.row as f64, a_to.col as f64, a_to.row as f64);
    let (bx0, by0, bx1, by1) = (b_from.col as f64, b_from.row as f64, b_to.col as f64, b_to.row as f64);

    let dax = ax1 - ax0;
    let day = ay1 - ay0;
    let dbx = bx1 - bx0;
    let dby = by1 - by0;

    if dax == 0.0 || day == 0.0 || dbx == 0.0 || dby == 0.0 {
        return false;
    }

    let slope_a = day / dax;
    let slope_b = dby / dbx;
    if (slope_a - slope_b).abs() < 1e-12 {
        return false;
    }

    // y = slope*(x - x0) + y0 for both lines; solve for x.
    let intercept_a = ay0 - slope_a * ax0;
    let intercept_b = by0 - slope_b * bx0;
    let x = (intercept_b - intercept_a) / (slope_a - slope_b);
    let y = slope_a * x + intercept_a;

    let strictly_between = |v: f64, p0: f64, p1: f64| {
        let (lo, hi) = if p0 < p1 { (p0, p1) } else { (p1, p0) };
        v > lo + 1e-9 && v < hi - 1e-9
    };

    if !strictly_between(x, ax0, ax1) || !strictly_between(y, ay0, ay1) {
        return false;
    }
    if !strictly_between(x, bx0, bx1) || !strictly_between(y, by0, by1) {
        return false;
    }

    let at_a_target = (x - ax1).abs() < 1e-9 && (y - ay1).abs() < 1e-9;
    let at_b_target = (x - bx1).abs() < 1e-9 && (y - by1).abs() < 1e-9;
    !at_a_target && !at_b_target
}

/// Path-crossing ("X") conflicts: only checks the right and below neighbor of
/// each position, in row-major order, matching the grid scan in §4.7.
pub fn resolve_crossing_conflicts(pedestrians: &mut [Pedestrian], position_grid: &ndarray::Array2<i32>, rng: &mut Rng) {
    let shape = position_grid.dim();

    for (r, c) in ndarray::indices(shape) {
        let here = position_grid[(r, c)];
        if here <= 0 {
            continue;
        }
        let loc = Location::new(r as i32, c as i32);

        for neighbor in [Location::new(loc.row, loc.col + 1), Location::new(loc.row + 1, loc.col)] {
            let Some(other_id) = grid::get_i32(position_grid, neighbor) else { continue };
            if other_id <= 0 {
                continue;
            }

            let (here_idx, other_idx) = {
                let here_idx = pedestrians.iter().position(|p| p.id as i32 == here);
                let other_idx = pedestrians.iter().position(|p| p.id as i32 == other_id);
                (here_idx, other_idx)
            };
            let (Some(hi), Some(oi)) = (here_idx, other_idx) else { continue };
            if pedestrians[hi].state != PedestrianState::Moving || pedestrians[oi].state != PedestrianState::Moving {
                continue;
            }

            let crosses = segments_cross(
                pedestrians[hi].current,
                pedestrians[hi].target,
                pedestrians[oi].current,
                pedestrians[oi].target,
            );
            if crosses {
                if rng.bernoulli(0.5) {
                    pedestrians[hi].state = PedestrianState::Stopped;
                } else {
                    pedestrians[oi].state = PedestrianState::Stopped;
                }
            }
        }
    }
}
