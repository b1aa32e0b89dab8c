//! Per-run diagnostics, written to disk by the CLI crate as JSON when
//! `--diagnostics <path>` is passed (§6, §10).

use serde::Serialize;

#[derive(Debug, Default, Clone, Serialize)]
pub struct DiagnosticLog {
    pub environment: String,
    pub simulation_set: usize,
    pub total_steps: usize,
    pub preprocess_metrics: PreprocessMetrics,
    pub step_metrics: StepMetricsCollection,
}

impl DiagnosticLog {
    pub fn push(&mut self, metrics: StepMetrics) {
        self.step_metrics.push(metrics);
        self.total_steps += 1;
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct StepMetricsCollection {
    pub active_ped_count: Vec<usize>,
    pub dead_count: Vec<usize>,
    pub time_step: Vec<f64>,
    pub time_fire_spread: Vec<Option<f64>>,
}

impl StepMetricsCollection {
    pub fn push(&mut self, metrics: StepMetrics) {
        self.active_ped_count.push(metrics.active_ped_count);
        self.dead_count.push(metrics.dead_count);
        self.time_step.push(metrics.time_step);
        self.time_fire_spread.push(metrics.time_fire_spread);
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct PreprocessMetrics {
    pub time_static_field: f64,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct StepMetrics {
    pub active_ped_count: usize,
    pub dead_count: usize,
    pub time_step: f64,
    pub time_fire_spread: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_accumulates_step_series() {
        let mut log = DiagnosticLog::default();
        log.push(StepMetrics {
            active_ped_count: 10,
            dead_count: 0,
            time_step: 0.001,
            time_fire_spread: None,
        });
        log.push(StepMetrics {
            active_ped_count: 8,
            dead_count: 1,
            time_step: 0.002,
            time_fire_spread: Some(0.0005),
        });
        assert_eq!(log.total_steps, 2);
        assert_eq!(log.step_metrics.active_ped_count, vec![10, 8]);
        assert_eq!(log.step_metrics.dead_count, vec![0, 1]);
    }
}
