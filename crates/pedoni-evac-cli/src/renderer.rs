//! Textual output writers (§6): the three output formats plus the optional
//! JSON diagnostics dump.

use std::io::Write;

use ndarray::Array2;
use pedoni_evac_core::diagnostic::DiagnosticLog;
use pedoni_evac_core::driver::{SimulationSetOutcome, INACCESSIBLE_PLACEHOLDER};
use pedoni_evac_core::grid::{EMPTY, EXIT, FIRE, IMPASSABLE};

const GLYPH_EMPTY: char = '.';
const GLYPH_WALL: char = '#';
const GLYPH_EXIT: char = '_';
const GLYPH_FIRE: char = '*';
const GLYPH_PEDESTRIAN: char = 'o';

/// Prints one visualisation frame: a header line then the grid, one row per
/// line. Pedestrians take priority over fire/exit glyphs, fire over exit.
pub fn print_frame(
    simulation_index: usize,
    timestep: usize,
    obstacle_grid: &Array2<i32>,
    position_grid: &Array2<i32>,
    fire_grid: &Array2<i32>,
) {
    println!("Simulation {simulation_index} - timestep {timestep}");
    let shape = obstacle_grid.dim();
    for r in 0..shape.0 {
        let mut row = String::with_capacity(shape.1);
        for c in 0..shape.1 {
            let ch = if position_grid[(r, c)] > 0 {
                GLYPH_PEDESTRIAN
            } else if fire_grid[(r, c)] == FIRE {
                GLYPH_FIRE
            } else {
                match obstacle_grid[(r, c)] {
                    IMPASSABLE => GLYPH_WALL,
                    EXIT => GLYPH_EXIT,
                    EMPTY => GLYPH_EMPTY,
                    _ => GLYPH_EMPTY,
                }
            };
            row.push(ch);
        }
        println!("{row}");
    }
}

/// Prints the evacuation-time output format: one line of space-separated
/// integers per sweep point, `-1` for simulations that never reached an
/// exit, and two blank lines after the set.
pub fn print_evacuation_times(outcome: &SimulationSetOutcome) {
    for point in &outcome.sweep_results {
        let line: Vec<String> = point.iter().map(|run| run.evacuation_time.to_string()).collect();
        println!("{}", line.join(" "));
    }
    println!();
    println!();
}

/// A simulation that could not be run at all (inaccessible exits, §7) is
/// rendered as a single placeholder line.
pub fn print_inaccessible_set() {
    println!("{INACCESSIBLE_PLACEHOLDER}");
    println!();
    println!();
}

/// Per-cell mean visit count across every run in a sweep point.
fn mean_visits(runs: &[pedoni_evac_core::driver::SimulationRunOutcome]) -> Option<Array2<f64>> {
    let first = runs.first()?;
    let shape = first.heatmap.dim();
    let mut sum = Array2::<u32>::zeros(shape);
    for run in runs {
        sum += &run.heatmap;
    }
    let count = runs.len().max(1) as f64;
    Some(sum.mapv(|v| v as f64 / count))
}

/// Prints the heatmap output format: per sweep point, `mean_visits =
/// heatmap[i][j] / num_simulations`, formatted to two decimal places.
pub fn print_heatmap(outcome: &SimulationSetOutcome) {
    for point in &outcome.sweep_results {
        let Some(means) = mean_visits(point) else { continue };
        for r in 0..means.nrows() {
            let row: Vec<String> = (0..means.ncols()).map(|c| format!("{:.2}", means[(r, c)])).collect();
            println!("{}", row.join(" "));
        }
        println!();
    }
    println!();
}

/// Writes every diagnostic log collected across a set's runs as a JSON
/// array, mirroring the teacher's headless-mode single-log export.
pub fn write_diagnostics(path: &std::path::Path, outcome: &SimulationSetOutcome) -> anyhow::Result<()> {
    let logs: Vec<&DiagnosticLog> = outcome
        .sweep_results
        .iter()
        .flatten()
        .filter_map(|run| run.diagnostic_log.as_ref())
        .collect();
    let mut file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(&mut file, &logs)?;
    file.flush()?;
    Ok(())
}
