mod args;
mod loader;
mod renderer;

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use args::Args;
use clap::Parser;
use log::{info, warn};
use pedoni_evac_core::config::{Configuration, OutputFormat};
use pedoni_evac_core::driver::SimulationSetOutcome;
use pedoni_evac_core::environment::SimulationSetExits;
use pedoni_evac_core::Simulator;

static SIG_INT: AtomicBool = AtomicBool::new(false);

/// Mirrors the teacher's headless-mode interrupt handling: on Ctrl-C, dump
/// whatever diagnostics the most recently completed set collected to a
/// timestamped file under `logs/` before exiting.
fn dump_diagnostics_on_interrupt(outcome: &SimulationSetOutcome) -> anyhow::Result<()> {
    fs::create_dir_all("logs").ok();
    let stamp = chrono::Local::now().format("%Y-%m-%d_%H%M%S_log.json").to_string();
    let path: PathBuf = ["logs", &stamp].iter().collect();
    renderer::write_diagnostics(&path, outcome)?;
    info!("Exported log file: {}", path.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_module("pedoni_evac", log::LevelFilter::Info)
        .init();

    if cfg!(debug_assertions) {
        warn!("Debug build");
    }

    let args = Args::parse();
    ctrlc::set_handler(|| SIG_INT.store(true, Ordering::SeqCst))?;

    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading config file {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))?
        }
        None => Configuration::default(),
    };
    args.apply_overrides(&mut config);

    let environment_path = args.environment.display().to_string();
    let environment_text =
        fs::read_to_string(&args.environment).with_context(|| format!("reading environment file {environment_path}"))?;
    let environment = loader::parse_environment(&environment_path, &environment_text)?;
    info!(
        "Loaded environment {environment_path}: {}x{} cells, {} static pedestrians",
        environment.shape().0,
        environment.shape().1,
        environment.static_pedestrians.len()
    );

    let simulation_sets: Vec<SimulationSetExits> = match &args.auxiliary {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading auxiliary file {}", path.display()))?;
            loader::parse_auxiliary(&text)?
        }
        None => {
            let cells: HashSet<_> = environment.static_exits.iter().copied().collect();
            vec![SimulationSetExits {
                exits: loader::group_exits(&cells),
            }]
        }
    };
    info!("{} simulation set(s) to run", simulation_sets.len());

    let simulator = Simulator::new(config.clone());
    let mut last_outcome: Option<SimulationSetOutcome> = None;

    for (set_index, exits) in simulation_sets.iter().enumerate() {
        if SIG_INT.load(Ordering::SeqCst) {
            info!("Interrupted, stopping before simulation set {set_index}");
            if let (true, Some(outcome)) = (args.diagnostics.is_some(), &last_outcome) {
                dump_diagnostics_on_interrupt(outcome)?;
            }
            break;
        }

        match config.output_format {
            OutputFormat::Visualization => {
                for run_index in 0..config.num_simulations {
                    let seed = config.seed.wrapping_add(run_index as u64);
                    let result = simulator.run_single_simulation_visualized(&environment, exits, seed, |t, position_grid, fire_grid| {
                        renderer::print_frame(run_index + 1, t, &environment.obstacle_grid, position_grid, fire_grid);
                    });
                    match result {
                        Ok(outcome) => info!(
                            "Simulation set {set_index}, run {run_index}: evacuated in {} steps, {} dead",
                            outcome.evacuation_time, outcome.dead_count
                        ),
                        Err(err) => {
                            warn!("Simulation set {set_index}: {err}, skipping");
                            renderer::print_inaccessible_set();
                            break;
                        }
                    }
                }
            }
            OutputFormat::EvacuationTime => match simulator.run_simulation_set(&environment, exits, args.diagnostics.is_some()) {
                Ok(outcome) => {
                    renderer::print_evacuation_times(&outcome);
                    if let Some(path) = &args.diagnostics {
                        renderer::write_diagnostics(path, &outcome)?;
                    }
                    last_outcome = Some(outcome);
                }
                Err(err) => {
                    warn!("simulation set {set_index}: exit inaccessible, skipping ({err})");
                    renderer::print_inaccessible_set();
                }
            },
            OutputFormat::Heatmap => match simulator.run_simulation_set(&environment, exits, args.diagnostics.is_some()) {
                Ok(outcome) => {
                    renderer::print_heatmap(&outcome);
                    if let Some(path) = &args.diagnostics {
                        renderer::write_diagnostics(path, &outcome)?;
                    }
                    last_outcome = Some(outcome);
                }
                Err(err) => {
                    warn!("simulation set {set_index}: exit inaccessible, skipping ({err})");
                    renderer::print_inaccessible_set();
                }
            },
        }
    }

    Ok(())
}
