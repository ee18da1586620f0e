// src/shared_data.rs

use crate::flow_analyzer::DirectionMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::Instant;

/// Simulated time of a run, in seconds since it started.
///
/// Wall-clock time runs `speed_scale` times as long as simulated time, so
/// readings are divided back out to keep results comparable across scales.
#[derive(Debug, Clone, Copy)]
pub struct SimClock {
    started: Instant,
    speed_scale: f64,
}

impl SimClock {
    pub fn start(speed_scale: f64) -> Self {
        Self {
            started: Instant::now(),
            speed_scale,
        }
    }

    pub fn now(&self) -> f64 {
        self.started.elapsed().as_secs_f64() / self.speed_scale
    }
}

/// Lifecycle of a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationStatus {
    NotStarted,
    Running,
    Completed,
    Stopped,
    Failed,
}

impl fmt::Display for SimulationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SimulationStatus::NotStarted => "not started",
            SimulationStatus::Running => "running",
            SimulationStatus::Completed => "completed",
            SimulationStatus::Stopped => "stopped",
            SimulationStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// What a run hands back to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub status: SimulationStatus,
    /// Empty unless the run completed.
    pub directions: Vec<DirectionMetrics>,
    pub efficiency_score: Option<f64>,
    pub total_vehicles_processed: usize,
    /// Simulated seconds from start to stop.
    pub duration: f64,
}

impl SimulationReport {
    pub fn stopped(total_vehicles_processed: usize, duration: f64) -> Self {
        Self {
            status: SimulationStatus::Stopped,
            directions: Vec::new(),
            efficiency_score: None,
            total_vehicles_processed,
            duration,
        }
    }

    /// Junction-wide average wait, weighted by vehicles processed.
    pub fn average_waiting_time(&self) -> Option<f64> {
        let (total, count) = self
            .directions
            .iter()
            .filter_map(|m| m.average_waiting_time.map(|avg| (avg, m.vehicles_processed)))
            .fold((0.0, 0usize), |(t, c), (avg, n)| (t + avg * n as f64, c + n));
        (count > 0).then(|| total / count as f64)
    }

    pub fn max_waiting_time(&self) -> Option<f64> {
        self.directions
            .iter()
            .filter_map(|m| m.max_waiting_time)
            .reduce(f64::max)
    }

    pub fn max_queue_length(&self) -> usize {
        self.directions
            .iter()
            .map(|m| m.max_queue_length)
            .max()
            .unwrap_or(0)
    }

    /// One-line summary of the run.
    pub fn summary(&self) -> String {
        let avg = self
            .average_waiting_time()
            .map_or_else(|| "n/a".to_string(), |v| format!("{:.2}s", v));
        let max = self
            .max_waiting_time()
            .map_or_else(|| "n/a".to_string(), |v| format!("{:.2}s", v));
        let score = self
            .efficiency_score
            .map_or_else(|| "n/a".to_string(), |v| format!("{:.1}", v));
        format!(
            "Simulation {}: average wait time: {}, max wait time: {}, max queue length: {}, vehicles processed: {}, efficiency score: {}",
            self.status,
            avg,
            max,
            self.max_queue_length(),
            self.total_vehicles_processed,
            score
        )
    }
}
