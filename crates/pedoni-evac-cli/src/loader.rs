//! Environment and auxiliary file parsers (§6). Both formats are plain text;
//! malformed input is reported as a typed `EngineError` so the CLI can print
//! a diagnostic naming the file/line (environment) or byte offset (auxiliary)
//! exactly as §7 prescribes.

use std::collections::{HashSet, VecDeque};

use pedoni_evac_core::environment::{Environment, SimulationSetExits};
use pedoni_evac_core::error::{EngineError, EngineResult};
use pedoni_evac_core::grid::{new_i32_grid, IMPASSABLE};
use pedoni_evac_core::Location;

/// Parses an environment file: `rows cols` header, then `rows` lines of
/// exactly `cols` glyphs from `{#, _, ., p, P}`.
///
/// `_` cells are grouped into exits by flood fill (orthogonal adjacency) and
/// returned as the environment's static exit set; callers that read exits
/// from an auxiliary file instead simply ignore `Environment::static_exits`.
pub fn parse_environment(path: &str, text: &str) -> EngineResult<Environment> {
    let mut lines = text.lines();
    let header = lines.next().ok_or_else(|| EngineError::MalformedEnvironment {
        file: path.to_string(),
        line: 1,
        detail: "empty file, expected a \"rows cols\" header".to_string(),
    })?;

    let mut parts = header.split_whitespace();
    let (rows, cols) = match (parts.next().and_then(|v| v.parse::<usize>().ok()), parts.next().and_then(|v| v.parse::<usize>().ok())) {
        (Some(r), Some(c)) => (r, c),
        _ => {
            return Err(EngineError::MalformedEnvironment {
                file: path.to_string(),
                line: 1,
                detail: format!("expected \"rows cols\", got {header:?}"),
            })
        }
    };

    let mut env = Environment::empty((rows, cols));
    let mut exit_cells: HashSet<Location> = HashSet::new();

    for (row_idx, line) in lines.enumerate() {
        if row_idx >= rows {
            break;
        }
        let chars: Vec<char> = line.chars().collect();
        if chars.len() != cols {
            return Err(EngineError::MalformedEnvironment {
                file: path.to_string(),
                line: row_idx + 2,
                detail: format!("expected {cols} columns, got {}", chars.len()),
            });
        }
        for (col_idx, &ch) in chars.iter().enumerate() {
            let loc = Location::new(row_idx as i32, col_idx as i32);
            match ch {
                '#' => env.obstacle_grid[(row_idx, col_idx)] = IMPASSABLE,
                '_' => {
                    exit_cells.insert(loc);
                }
                '.' => {}
                'p' | 'P' => env.static_pedestrians.push(loc),
                other => {
                    return Err(EngineError::MalformedEnvironment {
                        file: path.to_string(),
                        line: row_idx + 2,
                        detail: format!("unknown glyph {other:?}"),
                    })
                }
            }
        }
    }

    env.static_exits = group_exits(&exit_cells).into_iter().flatten().collect();
    Ok(env)
}

/// Groups exit cells into contiguous (orthogonally-connected) components.
pub(crate) fn group_exits(cells: &HashSet<Location>) -> Vec<Vec<Location>> {
    let mut remaining: HashSet<Location> = cells.clone();
    let mut groups = Vec::new();

    while let Some(&start) = remaining.iter().next() {
        remaining.remove(&start);
        let mut group = vec![start];
        let mut queue = VecDeque::from([start]);
        while let Some(cell) = queue.pop_front() {
            for n in cell.von_neumann4() {
                if remaining.remove(&n) {
                    group.push(n);
                    queue.push_back(n);
                }
            }
        }
        groups.push(group);
    }

    groups
}

/// Parses the auxiliary file: one simulation set per non-empty line, each a
/// `,`-separated list of exits whose cells are joined with `+`, terminated
/// by `.`. Example: `3 0+4 0,10 7.`.
pub fn parse_auxiliary(text: &str) -> EngineResult<Vec<SimulationSetExits>> {
    let mut sets = Vec::new();
    let mut offset = 0usize;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            offset += line.len() + 1;
            continue;
        }
        let body = trimmed.strip_suffix('.').ok_or_else(|| EngineError::MalformedAuxiliary {
            offset,
            detail: "line missing terminating '.'".to_string(),
        })?;

        let mut exits = Vec::new();
        for exit_text in body.split(',') {
            if exit_text.trim().is_empty() {
                continue;
            }
            let mut cells = Vec::new();
            for pair in exit_text.split('+') {
                let mut nums = pair.split_whitespace();
                let (row, col) = match (nums.next().and_then(|v| v.parse::<i32>().ok()), nums.next().and_then(|v| v.parse::<i32>().ok())) {
                    (Some(r), Some(c)) => (r, c),
                    _ => {
                        return Err(EngineError::MalformedAuxiliary {
                            offset,
                            detail: format!("expected \"row col\" pair, got {pair:?}"),
                        })
                    }
                };
                cells.push(Location::new(row, col));
            }
            exits.push(cells);
        }
        sets.push(SimulationSetExits { exits });
        offset += line.len() + 1;
    }

    Ok(sets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_glyphs() {
        let text = "3 3\n#_#\n#p#\n###\n";
        let env = parse_environment("env.txt", text).unwrap();
        assert_eq!(env.shape(), (3, 3));
        assert_eq!(env.obstacle_grid[(0, 0)], IMPASSABLE);
        assert_eq!(env.obstacle_grid[(0, 1)], pedoni_evac_core::grid::EMPTY);
        assert_eq!(env.static_pedestrians, vec![Location::new(1, 1)]);
        assert_eq!(env.static_exits, vec![Location::new(0, 1)]);
    }

    #[test]
    fn rejects_ragged_row() {
        let text = "2 3\n##\n###\n";
        let err = parse_environment("env.txt", text).unwrap_err();
        assert!(matches!(err, EngineError::MalformedEnvironment { line: 2, .. }));
    }

    #[test]
    fn rejects_unknown_glyph() {
        let text = "1 1\nx\n";
        let err = parse_environment("env.txt", text).unwrap_err();
        assert!(matches!(err, EngineError::MalformedEnvironment { .. }));
    }

    #[test]
    fn groups_adjacent_exit_cells() {
        let mut cells = HashSet::new();
        cells.insert(Location::new(3, 0));
        cells.insert(Location::new(4, 0));
        cells.insert(Location::new(10, 7));
        let groups = group_exits(&cells);
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().any(|g| g.len() == 2));
        assert!(groups.iter().any(|g| g.len() == 1));
    }

    #[test]
    fn parses_auxiliary_sets() {
        let text = "3 0+4 0,10 7.\n1 1.\n";
        let sets = parse_auxiliary(text).unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].exits.len(), 2);
        assert_eq!(sets[0].exits[0], vec![Location::new(3, 0), Location::new(4, 0)]);
        assert_eq!(sets[0].exits[1], vec![Location::new(10, 7)]);
    }

    #[test]
    fn rejects_missing_terminator() {
        let text = "3 0+4 0,10 7\n";
        let err = parse_auxiliary(text).unwrap_err();
        assert!(matches!(err, EngineError::MalformedAuxiliary { .. }));
    }
}
