//! Command-line flags (§6). Mirrors the teacher's own `Args`/
//! `to_simulator_options` split: `clap` owns parsing, `apply_overrides`
//! folds the handful of scalar overrides into a `Configuration` loaded from
//! a TOML file (or the engine's defaults when no file is given).

use std::path::PathBuf;

use pedoni_evac_core::config::{Configuration, OutputFormat};

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormatArg {
    Visualization,
    EvacuationTime,
    Heatmap,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(value: OutputFormatArg) -> Self {
        match value {
            OutputFormatArg::Visualization => OutputFormat::Visualization,
            OutputFormatArg::EvacuationTime => OutputFormat::EvacuationTime,
            OutputFormatArg::Heatmap => OutputFormat::Heatmap,
        }
    }
}

#[derive(Debug, clap::Parser)]
pub struct Args {
    /// Path to the environment file
    pub environment: PathBuf,
    /// Path to the auxiliary (exit sets) file
    #[arg(short = 'x', long)]
    pub auxiliary: Option<PathBuf>,
    /// Path to a TOML configuration file; engine defaults are used if absent
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Write a JSON diagnostics dump here after each simulation set
    #[arg(long)]
    pub diagnostics: Option<PathBuf>,

    /// Output format override
    #[arg(value_enum, short, long)]
    pub output: Option<OutputFormatArg>,

    /// RNG seed override
    #[arg(long)]
    pub seed: Option<u64>,
    /// Number of simulations per sweep point
    #[arg(long)]
    pub num_simulations: Option<usize>,
    /// Fixed pedestrian count (overrides density)
    #[arg(long)]
    pub total_pedestrians: Option<usize>,
    /// Spawn density when pedestrians are placed at random
    #[arg(long)]
    pub density: Option<f64>,

    /// Static field attraction strength
    #[arg(long)]
    pub ks: Option<f64>,
    /// Dynamic field attraction strength
    #[arg(long)]
    pub kd: Option<f64>,
    /// Fire repulsion strength
    #[arg(long)]
    pub kf: Option<f64>,
    /// Dynamic field diffusion rate
    #[arg(long)]
    pub alpha: Option<f64>,
    /// Dynamic field decay rate
    #[arg(long)]
    pub delta: Option<f64>,
    /// Target-conflict friction probability
    #[arg(long)]
    pub mu: Option<f64>,
    /// Inertia factor
    #[arg(long)]
    pub omega: Option<f64>,
    /// Fire-risk field scaling distance
    #[arg(long)]
    pub risk_distance: Option<f64>,

    /// Seed the environment with fire present from the first timestep
    #[arg(long)]
    pub fire: bool,
    /// Forbid diagonal moves that cut across an impassable corner
    #[arg(long)]
    pub prevent_corner_crossing: bool,
}

impl Args {
    /// Applies every flag the user actually passed on top of `config`,
    /// leaving untouched fields at whatever the config file (or engine
    /// default) set.
    pub fn apply_overrides(&self, config: &mut Configuration) {
        if let Some(output) = self.output {
            config.output_format = output.into();
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(n) = self.num_simulations {
            config.num_simulations = n;
        }
        if let Some(total) = self.total_pedestrians {
            config.total_pedestrians = Some(total);
        }
        if let Some(density) = self.density {
            config.density = density;
        }

        if let Some(ks) = self.ks {
            config.ks = ks;
        }
        if let Some(kd) = self.kd {
            config.kd = kd;
        }
        if let Some(kf) = self.kf {
            config.kf = kf;
        }
        if let Some(alpha) = self.alpha {
            config.alpha = alpha;
        }
        if let Some(delta) = self.delta {
            config.delta = delta;
        }
        if let Some(mu) = self.mu {
            config.mu = mu;
        }
        if let Some(omega) = self.omega {
            config.omega = omega;
        }
        if let Some(risk_distance) = self.risk_distance {
            config.risk_distance = risk_distance;
        }

        if self.fire {
            config.flags.fire_present = true;
        }
        if self.prevent_corner_crossing {
            config.flags.prevent_corner_crossing = true;
        }
    }
}
