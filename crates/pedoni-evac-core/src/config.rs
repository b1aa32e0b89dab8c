//! Immutable per-run configuration (§3, §6). Plain data; parsing it from a
//! TOML file is the CLI crate's job (mirrors the teacher keeping `Scenario`
//! `Deserialize`-able while `main.rs` does the actual `fs::read_to_string`).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StaticFieldKind {
    /// Varas flood-fill wavefront cost.
    Varas,
    /// Zheng Euclidean-min, normalised to a probability-like field.
    Zheng,
    /// Kirchner inverted-distance form.
    Kirchner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DynamicFieldKernel {
    /// Combined decay+diffusion pass (§4.4 main equation).
    DecayDiffusion,
    /// Legacy Kirchner-family kernels kept for bit-parity with earlier drivers.
    Decay,
    SingleDiffusion,
    MultipleDiffusion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmissionPolicy {
    /// One particle at the cell a pedestrian just left (default).
    SourceDensity,
    /// One particle at the pedestrian's current cell, every step.
    VelocityDensity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvironmentOrigin {
    /// Exits and pedestrians are read from the environment file.
    StaticAll,
    /// Exits come from the auxiliary file; pedestrians are placed at random.
    AuxiliaryExitsRandomPedestrians,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Visualization,
    EvacuationTime,
    Heatmap,
}

/// Which scalar parameter a sweep varies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepVariable {
    Ks,
    Kd,
    Kf,
    Alpha,
    Delta,
    Omega,
    Mu,
    RiskDistance,
    Density,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Sweep {
    pub variable: SweepVariable,
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl Sweep {
    /// Inclusive sequence of sweep points from `min` to `max` by `step`.
    pub fn points(&self) -> Vec<f64> {
        if self.step <= 0.0 || self.max < self.min {
            return vec![self.min];
        }
        let mut points = Vec::new();
        let mut v = self.min;
        // Half-a-step slack against float accumulation error.
        while v <= self.max + self.step * 0.5 {
            points.push(v);
            v += self.step;
        }
        if points.is_empty() {
            points.push(self.min);
        }
        points
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flags {
    pub prevent_corner_crossing: bool,
    pub immediate_exit: bool,
    pub fire_present: bool,
    /// Enable the path-crossing ("X") conflict check; fire-aware runs force this off.
    pub enable_crossing_conflicts: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Flags {
            prevent_corner_crossing: false,
            immediate_exit: true,
            fire_present: false,
            enable_crossing_conflicts: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    pub environment_origin: EnvironmentOrigin,
    pub output_format: OutputFormat,
    /// Fixed population; `None` uses `density` instead (§4.9 step 4).
    pub total_pedestrians: Option<usize>,
    pub density: f64,
    pub seed: u64,
    pub num_simulations: usize,

    pub static_field_kind: StaticFieldKind,
    pub dynamic_kernel: DynamicFieldKernel,
    pub emission_policy: EmissionPolicy,

    pub ks: f64,
    pub kd: f64,
    pub kf: f64,
    pub alpha: f64,
    pub delta: f64,
    pub mu: f64,
    pub omega: f64,
    pub diagonal_cost: f64,
    pub risk_distance: f64,
    pub fire_alpha: f64,
    pub fire_gamma: f64,
    pub spread_rate: f64,
    pub cell_length: f64,
    pub timestep_duration: f64,

    pub flags: Flags,
    pub sweep: Option<Sweep>,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            environment_origin: EnvironmentOrigin::StaticAll,
            output_format: OutputFormat::EvacuationTime,
            total_pedestrians: None,
            density: 0.1,
            seed: 0,
            num_simulations: 1,

            static_field_kind: StaticFieldKind::Zheng,
            dynamic_kernel: DynamicFieldKernel::DecayDiffusion,
            emission_policy: EmissionPolicy::SourceDensity,

            ks: 1.0,
            kd: 1.0,
            kf: 1.0,
            alpha: 0.3,
            delta: 0.2,
            mu: 0.3,
            omega: 1.0,
            diagonal_cost: std::f64::consts::SQRT_2,
            risk_distance: 5.0,
            fire_alpha: 2.0,
            fire_gamma: 10.0,
            spread_rate: 0.1,
            cell_length: 0.4,
            timestep_duration: 0.3,

            flags: Flags::default(),
        sweep: None,
        }
    }
}

impl Configuration {
    /// `K` in §4.5: fire spreads every `K` timesteps.
    pub fn fire_spread_period(&self) -> usize {
        if self.spread_rate <= 0.0 || self.timestep_duration <= 0.0 {
            return usize::MAX;
        }
        let k = (self.cell_length / (self.spread_rate * self.timestep_duration)).floor();
        if k < 1.0 {
            1
        } else {
            k as usize
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_points_cover_inclusive_range() {
        let sweep = Sweep {
            variable: SweepVariable::Ks,
            min: 0.0,
            max: 1.0,
            step: 0.25,
        };
        let points = sweep.points();
        assert_eq!(points.len(), 5);
        assert!((points[4] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn fire_spread_period_matches_formula() {
        let mut config = Configuration::default();
        config.cell_length = 0.4;
        config.spread_rate = 0.1;
        config.timestep_duration = 0.3;
        // floor(0.4 / (0.1*0.3)) = floor(13.33) = 13
        assert_eq!(config.fire_spread_period(), 13);
    }
}
