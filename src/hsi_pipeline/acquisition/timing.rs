use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::info;

use crate::hsi_pipeline::common::Stage;

#[derive(Debug, Clone)]
pub struct StageTiming {
    pub stage: Stage,
    pub duration: Duration,
}

/// Wall-clock time spent per acquisition stage.
#[derive(Debug, Default)]
pub struct StageTimings {
    stages: Vec<StageTiming>,
    totals: HashMap<Stage, Duration>,
}

impl StageTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stage(&mut self, stage: Stage, duration: Duration) {
        self.stages.push(StageTiming { stage, duration });
        *self.totals.entry(stage).or_insert(Duration::ZERO) += duration;
    }

    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    /// Summed duration of every run of `stage`.
    pub fn get_stage(&self, stage: Stage) -> Option<Duration> {
        self.totals.get(&stage).copied()
    }

    pub fn stages(&self) -> &[StageTiming] {
        &self.stages
    }

    pub fn log_summary(&self) {
        let total = self.total_duration();
        for timing in &self.stages {
            let percentage = if total.as_secs_f64() > 0.0 {
                (timing.duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            } else {
                0.0
            };
            info!(
                "{:<16} {:>12.3}ms ({:>5.1}%)",
                timing.stage.name(),
                timing.duration.as_secs_f64() * 1000.0,
                percentage
            );
        }
        info!("{:<16} {:>12.3}ms", "Total", total.as_secs_f64() * 1000.0);
    }
}

pub struct Timer {
    start: Instant,
    stage: Stage,
}

impl Timer {
    pub fn start(stage: Stage) -> Self {
        Self {
            start: Instant::now(),
            stage,
        }
    }

    pub fn stop(self) -> (Stage, Duration) {
        (self.stage, self.start.elapsed())
    }
}
