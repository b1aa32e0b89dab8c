//! Simulation driver (§4.9): turns a parsed environment and one exit
//! placement into evacuation-time/heatmap results, one simulation set at a
//! time. Sweep points and independent simulations within a set are
//! mutually independent and may run on a `rayon` thread pool (§5).

use ndarray::Array2;
use rayon::prelude::*;

use crate::config::{Configuration, SweepVariable};
use crate::conflict;
use crate::diagnostic::{DiagnosticLog, StepMetrics};
use crate::dynamic_field::{self, DynamicField};
use crate::environment::{Environment, SimulationSetExits};
use crate::error::{EngineError, EngineResult};
use crate::exit::ExitRegistry;
use crate::fire::FireState;
use crate::grid::{self, new_i32_grid, FIRE};
use crate::location::Location;
use crate::pedestrian::{PedestrianSet, PedestrianState};
use crate::random::Rng;
use crate::static_field::{self, StaticFieldResult};
use crate::transition::{self, TransitionInputs};

/// Placeholder evacuation time for a simulation set whose exits are
/// inaccessible (§4.9 step 3, §6).
pub const INACCESSIBLE_PLACEHOLDER: i64 = -1;

pub struct SimulationRunOutcome {
    pub evacuation_time: i64,
    pub dead_count: usize,
    pub heatmap: Array2<u32>,
    pub diagnostic_log: Option<DiagnosticLog>,
}

pub struct SimulationSetOutcome {
    /// One entry per sweep point (a single entry when no sweep is active),
    /// each holding `num_simulations` run outcomes in seed order.
    pub sweep_results: Vec<Vec<SimulationRunOutcome>>,
}

pub struct Simulator {
    config: Configuration,
}

impl Simulator {
    pub fn new(config: Configuration) -> Self {
        Simulator { config }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    fn build_exit_registry(&self, environment: &Environment, exits: &SimulationSetExits) -> ExitRegistry {
        let mut registry = ExitRegistry::new();
        for group in &exits.exits {
            let mut iter = group.iter().copied();
            if let Some(first) = iter.next() {
                registry.add_exit(first, &environment.obstacle_grid);
                for cell in iter {
                    registry.expand_last(cell);
                }
            }
        }
        registry
    }

    /// Run one simulation set: builds the exit registry, checks
    /// accessibility, then sweeps (or runs once) and collects ordered
    /// results (§4.9 steps 3-5).
    pub fn run_simulation_set(
        &self,
        environment: &Environment,
        exits: &SimulationSetExits,
        collect_diagnostics: bool,
    ) -> EngineResult<SimulationSetOutcome> {
        let registry = self.build_exit_registry(environment, exits);
        let exits_grid = Self::exits_grid(environment.shape(), &registry);

        if registry.any_inaccessible(&environment.obstacle_grid, &exits_grid) {
            return Err(EngineError::InaccessibleExit);
        }

        let sweep_points: Vec<Option<f64>> = match &self.config.sweep {
            Some(sweep) => sweep.points().into_iter().map(Some).collect(),
            None => vec![None],
        };

        let sweep_results: Vec<Vec<SimulationRunOutcome>> = sweep_points
            .into_iter()
            .map(|point| {
                (0..self.config.num_simulations)
                    .into_par_iter()
                    .map(|i| {
                        let seed = self.config.seed.wrapping_add(i as u64);
                        self.run_single_simulation(
                            environment,
                            &registry,
                            point,
                            seed,
                            collect_diagnostics,
                            &mut |_t, _position_grid, _fire_grid| {},
                        )
                    })
                    .collect::<EngineResult<Vec<_>>>()
            })
            .collect::<EngineResult<Vec<_>>>()?;

        Ok(SimulationSetOutcome { sweep_results })
    }

    /// Runs a single simulation (no sweep, seed 0 offset) and invokes
    /// `on_step` after every committed movement step with the timestep
    /// index, the rebuilt position grid and the fire grid — the textual
    /// renderer's hook for the visualisation output format (§6). Runs
    /// sequentially; callers that don't need to watch each frame should use
    /// `run_simulation_set` instead, which parallelises across simulations.
    pub fn run_single_simulation_visualized(
        &self,
        environment: &Environment,
        exits: &SimulationSetExits,
        seed: u64,
        mut on_step: impl FnMut(usize, &Array2<i32>, &Array2<i32>),
    ) -> EngineResult<SimulationRunOutcome> {
        let registry = self.build_exit_registry(environment, exits);
        let exits_grid = Self::exits_grid(environment.shape(), &registry);

        if registry.any_inaccessible(&environment.obstacle_grid, &exits_grid) {
            return Err(EngineError::InaccessibleExit);
        }

        self.run_single_simulation(environment, &registry, None, seed, false, &mut on_step)
    }

    fn exits_grid(shape: (usize, usize), registry: &ExitRegistry) -> Array2<i32> {
        let mut grid = new_i32_grid(shape, grid::EMPTY);
        for cell in registry.all_cells() {
            grid::set_i32(&mut grid, cell, crate::grid::EXIT);
        }
        grid
    }

    fn effective_config(&self, sweep_point: Option<f64>) -> Configuration {
        let mut config = self.config.clone();
        let (Some(value), Some(sweep)) = (sweep_point, &self.config.sweep) else {
            return config;
        };
        match sweep.variable {
            SweepVariable::Ks => config.ks = value,
            SweepVariable::Kd => config.kd = value,
            SweepVariable::Kf => config.kf = value,
            SweepVariable::Alpha => config.alpha = value,
            SweepVariable::Delta => config.delta = value,
            SweepVariable::Omega => config.omega = value,
            SweepVariable::Mu => config.mu = value,
            SweepVariable::RiskDistance => config.risk_distance = value,
            SweepVariable::Density => config.density = value,
        }
        config
    }

    fn run_single_simulation(
        &self,
        environment: &Environment,
        base_registry: &ExitRegistry,
        sweep_point: Option<f64>,
        seed: u64,
        collect_diagnostics: bool,
        on_step: &mut dyn FnMut(usize, &Array2<i32>, &Array2<i32>),
    ) -> EngineResult<SimulationRunOutcome> {
        let config = self.effective_config(sweep_point);
        let shape = environment.shape();

        let mut rng = Rng::with_seed(seed);
        let mut registry = Self::clone_registry(base_registry, &environment.obstacle_grid);
        let mut fire = FireState::new({
            let mut grid = new_i32_grid(shape, grid::EMPTY);
            for &cell in &environment.initial_fire {
                grid::set_i32(&mut grid, cell, FIRE);
            }
            grid
        });

        let mut dynamic_field = DynamicField::new(shape);
        let mut pedestrians = PedestrianSet::new();
        let mut heatmap = Array2::<u32>::zeros(shape);
        let mut dead_count = 0usize;
        let mut diagnostic_log = collect_diagnostics.then(DiagnosticLog::default);

        let exits_grid = Self::exits_grid(shape, &registry);
        fire.compute_distance_to_fire(&environment.obstacle_grid);
        fire.compute_fire_field(config.fire_gamma, &environment.obstacle_grid);
        fire.classify_risky(&environment.obstacle_grid);
        // Exits may already be blocked by seeded fire before the loop ever runs.
        registry.update_fire_blockage(&environment.obstacle_grid, &exits_grid, &fire.grid);

        let fire_aware = config.flags.fire_present;
        // The fire-aware transition equation (§4.6) assumes a Zheng-normalised
        // static field; other models use whichever kind is configured.
        let static_field_kind = if fire_aware {
            crate::config::StaticFieldKind::Zheng
        } else {
            config.static_field_kind
        };

        let mut static_result = static_field::compute(
            static_field_kind,
            &environment.obstacle_grid,
            &fire.grid,
            &registry,
            config.diagonal_cost,
            config.flags.prevent_corner_crossing,
        );

        self.insert_pedestrians(environment, &config, &mut rng, &mut pedestrians)?;
        let mut position_grid = Self::rebuild_position_grid(shape, &pedestrians);

        let mut t: usize = 0;
        let mut has_spread = false;
        let spread_period = config.fire_spread_period();

        while !pedestrians.is_environment_empty() {
            if has_spread {
                let changed = registry.update_fire_blockage(&environment.obstacle_grid, &exits_grid, &fire.grid);
                if changed {
                    static_result = static_field::compute(
                        static_field_kind,
                        &environment.obstacle_grid,
                        &fire.grid,
                        &registry,
                        config.diagonal_cost,
                        config.flags.prevent_corner_crossing,
                    );
                }
                has_spread = false;
            }

            self.score_and_target(
                &environment.obstacle_grid,
                &fire.grid,
                &position_grid,
                &static_result,
                &dynamic_field,
                &fire.fire_field,
                &fire.risky,
                &registry,
                &config,
                fire_aware,
                &mut pedestrians,
                &mut rng,
            );

            conflict::resolve_target_conflicts(&mut pedestrians.pedestrians, shape, config.mu, &mut rng);
            if config.flags.enable_crossing_conflicts && !fire_aware {
                conflict::resolve_crossing_conflicts(&mut pedestrians.pedestrians, &position_grid, &mut rng);
            }

            self.commit_movement(&mut pedestrians, &mut dynamic_field, &config, &registry);
            position_grid = Self::rebuild_position_grid(shape, &pedestrians);
            for (r, c) in ndarray::indices(shape) {
                if position_grid[(r, c)] > 0 {
                    heatmap[(r, c)] += 1;
                }
            }
            on_step(t + 1, &position_grid, &fire.grid);

            for p in pedestrians.pedestrians.iter_mut() {
                if grid::get_i32(&fire.grid, p.current) == Some(FIRE) && p.is_present() {
                    p.state = PedestrianState::Dead;
                    dead_count += 1;
                }
            }
            Self::reset_transient_states(&mut pedestrians);

            t += 1;
            dynamic_field.step(
                config.dynamic_kernel,
                &mut rng,
                &environment.obstacle_grid,
                &fire.grid,
                config.alpha,
                config.delta,
            );

            let mut time_fire_spread = None;
            if fire_aware && t % spread_period == 0 {
                let before = std::time::Instant::now();
                let spread_happened = fire.spread(&environment.obstacle_grid);
                if spread_happened {
                    fire.compute_distance_to_fire(&environment.obstacle_grid);
                    fire.compute_fire_field(config.fire_gamma, &environment.obstacle_grid);
                    fire.classify_risky(&environment.obstacle_grid);
                    has_spread = true;
                }
                time_fire_spread = Some(before.elapsed().as_secs_f64());
            }

            if let Some(log) = diagnostic_log.as_mut() {
                log.push(StepMetrics {
                    active_ped_count: pedestrians.active_count(),
                    dead_count,
                    time_step: 0.0,
                    time_fire_spread,
                });
            }
        }

        Ok(SimulationRunOutcome {
            evacuation_time: t as i64,
            dead_count,
            heatmap,
            diagnostic_log,
        })
    }

    fn clone_registry(base: &ExitRegistry, obstacle_grid: &Array2<i32>) -> ExitRegistry {
        let mut registry = ExitRegistry::new();
        for exit in &base.exits {
            let mut cells = exit.cells.iter().copied();
            if let Some(first) = cells.next() {
                registry.add_exit(first, obstacle_grid);
                for cell in cells {
                    registry.expand_last(cell);
                }
            }
        }
        registry
    }

    fn insert_pedestrians(
        &self,
        environment: &Environment,
        config: &Configuration,
        rng: &mut Rng,
        pedestrians: &mut PedestrianSet,
    ) -> EngineResult<()> {
        match config.environment_origin {
            crate::config::EnvironmentOrigin::StaticAll => {
                for &loc in &environment.static_pedestrians {
                    pedestrians.spawn_at(loc);
                }
                Ok(())
            }
            crate::config::EnvironmentOrigin::AuxiliaryExitsRandomPedestrians => {
                let empty_cells = environment.empty_cells();
                let count = config
                    .total_pedestrians
                    .unwrap_or_else(|| ((config.density * empty_cells.len() as f64).floor() as usize).max(1));
                let mut occupied = new_i32_grid(environment.shape(), 0);
                pedestrians.spawn_random(rng, &empty_cells, &mut occupied, count)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn score_and_target(
        &self,
        obstacle_grid: &Array2<i32>,
        fire_grid: &Array2<i32>,
        position_grid: &Array2<i32>,
        static_result: &StaticFieldResult,
        dynamic_field: &DynamicField,
        fire_field: &Array2<f32>,
        risky: &Array2<crate::grid::RiskLevel>,
        registry: &ExitRegistry,
        config: &Configuration,
        fire_aware: bool,
        pedestrians: &mut PedestrianSet,
        rng: &mut Rng,
    ) {
        let exit_cells = registry.non_blocked_cells();
        let inputs = TransitionInputs {
            obstacle_grid,
            fire_grid,
            position_grid,
            static_field: &static_result.field,
            distance_to_exit: &static_result.distance_to_exit,
            dynamic_field: &dynamic_field.grid,
            fire_field,
            risky,
            exit_cells: &exit_cells,
            ks: config.ks,
            kd: config.kd,
            kf: config.kf,
            omega: config.omega,
            fire_alpha: config.fire_alpha,
            risk_distance: config.risk_distance,
            fire_aware,
            allow_diagonals: !fire_aware,
            prevent_corner_crossing: config.flags.prevent_corner_crossing,
        };

        for p in pedestrians.pedestrians.iter_mut() {
            if p.state != PedestrianState::Moving {
                continue;
            }
            let prob = transition::score(p, &inputs);
            p.prob = prob;
            p.target = transition::select_target(&prob, p.current, rng);
        }
    }

    fn commit_movement(
        &self,
        pedestrians: &mut PedestrianSet,
        dynamic_field: &mut DynamicField,
        config: &Configuration,
        registry: &ExitRegistry,
    ) {
        let exit_cells: std::collections::HashSet<Location> = registry.all_cells().into_iter().collect();

        for p in pedestrians.pedestrians.iter_mut() {
            match p.state {
                PedestrianState::Stopped | PedestrianState::GotOut | PedestrianState::Dead => {}
                PedestrianState::Leaving => p.state = PedestrianState::GotOut,
                PedestrianState::Moving => {
                    let left = p.current;
                    let moved = p.current != p.target;
                    if moved {
                        p.previous = p.current;
                        dynamic_field::emit_for_step(dynamic_field, config.emission_policy, left, p.target, moved);
                    }
                    p.current = p.target;
                    if exit_cells.contains(&p.current) {
                        p.state = if config.flags.immediate_exit {
                            PedestrianState::GotOut
                        } else {
                            PedestrianState::Leaving
                        };
                    }
                }
            }
        }
    }

    fn reset_transient_states(pedestrians: &mut PedestrianSet) {
        for p in pedestrians.pedestrians.iter_mut() {
            if !matches!(
                p.state,
                PedestrianState::GotOut | PedestrianState::Leaving | PedestrianState::Dead
            ) {
                p.state = PedestrianState::Moving;
            }
        }
    }

    fn rebuild_position_grid(shape: (usize, usize), pedestrians: &PedestrianSet) -> Array2<i32> {
        let mut grid = new_i32_grid(shape, 0);
        for p in pedestrians.pedestrians.iter() {
            if p.is_present() {
                grid::set_i32(&mut grid, p.current, p.id as i32);
            }
        }
        grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use crate::location::Location;

    fn small_environment() -> Environment {
        let mut env = Environment::empty((3, 3));
        env.static_pedestrians = vec![Location::new(1, 1)];
        env
    }

    #[test]
    fn empty_room_evacuates_to_adjacent_exit() {
        let mut config = Configuration::default();
        config.environment_origin = crate::config::EnvironmentOrigin::StaticAll;
        config.num_simulations = 1;
        let sim = Simulator::new(config);
        let environment = small_environment();
        let exits = SimulationSetExits {
            exits: vec![vec![Location::new(1, 0)]],
        };

        let outcome = sim.run_simulation_set(&environment, &exits, false).unwrap();
        let run = &outcome.sweep_results[0][0];
        assert!(run.evacuation_time > 0);
        assert_eq!(run.dead_count, 0);
    }

    #[test]
    fn oversaturated_density_propagates_no_room_error() {
        // Only one passable cell ((0,1)) but five pedestrians requested: the
        // population can never fully spawn, so the engine must terminate
        // with `NoRoomForPedestrians` rather than silently run fewer.
        let mut obstacle_grid = new_i32_grid((1, 2), 0);
        obstacle_grid[(0, 0)] = crate::grid::IMPASSABLE;
        let mut env = Environment::empty((1, 2));
        env.obstacle_grid = obstacle_grid;

        let mut config = Configuration::default();
        config.environment_origin = crate::config::EnvironmentOrigin::AuxiliaryExitsRandomPedestrians;
        config.total_pedestrians = Some(5);
        config.num_simulations = 1;
        let sim = Simulator::new(config);
        let exits = SimulationSetExits {
            exits: vec![vec![Location::new(0, 1)]],
        };

        let result = sim.run_simulation_set(&env, &exits, false);
        assert!(matches!(result, Err(EngineError::NoRoomForPedestrians)));
    }

    #[test]
    fn inaccessible_exit_is_reported() {
        let mut obstacle_grid = new_i32_grid((3, 3), 0);
        for n in Location::new(1, 1).von_neumann4() {
            grid::set_i32(&mut obstacle_grid, n, crate::grid::IMPASSABLE);
        }
        let mut env = Environment::empty((3, 3));
        env.obstacle_grid = obstacle_grid;
        env.static_pedestrians = vec![];

        let config = Configuration::default();
        let sim = Simulator::new(config);
        let exits = SimulationSetExits {
            exits: vec![vec![Location::new(1, 1)]],
        };
        let result = sim.run_simulation_set(&env, &exits, false);
        assert!(matches!(result, Err(EngineError::InaccessibleExit)));
    }

    #[test]
    fn visualized_run_invokes_callback_every_step() {
        let mut config = Configuration::default();
        config.environment_origin = crate::config::EnvironmentOrigin::StaticAll;
        let sim = Simulator::new(config);
        let environment = small_environment();
        let exits = SimulationSetExits {
            exits: vec![vec![Location::new(1, 0)]],
        };

        let mut steps_seen = 0usize;
        let outcome = sim
            .run_single_simulation_visualized(&environment, &exits, 7, |_t, _position_grid, _fire_grid| {
                steps_seen += 1;
            })
            .unwrap();
        assert_eq!(steps_seen, outcome.evacuation_time as usize);
    }
}
