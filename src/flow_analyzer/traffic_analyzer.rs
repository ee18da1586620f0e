// traffic_analyzer.rs

use crate::errors::RecordStoreError;
use crate::flow_analyzer::queue_tracker::MaxQueueLengthTracker;
use crate::global_variables::{WEIGHT_AVG_WAIT, WEIGHT_MAX_QUEUE, WEIGHT_MAX_WAIT};
use crate::simulation_engine::directions::Direction;
use crate::storage::VehicleStore;
use serde::{Deserialize, Serialize};

/// Outcome of a run for one incoming direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionMetrics {
    pub direction: Direction,
    /// `None` when no vehicle from this direction departed.
    pub average_waiting_time: Option<f64>,
    pub max_waiting_time: Option<f64>,
    pub max_queue_length: usize,
    pub vehicles_processed: usize,
}

/// Combines the store's wait-time aggregate with the queue tracker.
pub fn collect_metrics(
    store: &dyn VehicleStore,
    tracker: &MaxQueueLengthTracker,
) -> Result<Vec<DirectionMetrics>, RecordStoreError> {
    let aggregate = store.aggregate_wait_times()?;
    Ok(Direction::ALL
        .iter()
        .map(|&direction| {
            let waits = aggregate.get(&direction);
            DirectionMetrics {
                direction,
                average_waiting_time: waits.map(|w| w.average),
                max_waiting_time: waits.map(|w| w.max),
                max_queue_length: tracker.get(direction),
                vehicles_processed: waits.map_or(0, |w| w.count),
            }
        })
        .collect())
}

/// Min-max normalises `values`, filling gaps with the worst value seen,
/// then inverts so that lower raw values score higher.
/// A flat dimension (max == min) normalises to 0 and so inverts to 1.
fn inverted_scores(values: &[Option<f64>]) -> Vec<f64> {
    let worst = values
        .iter()
        .flatten()
        .copied()
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
        .unwrap_or(0.0);
    let filled: Vec<f64> = values.iter().map(|v| v.unwrap_or(worst)).collect();

    let min = filled.iter().copied().fold(f64::INFINITY, f64::min);
    let max = filled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    filled
        .iter()
        .map(|v| {
            let normalised = if range > 0.0 { (v - min) / range } else { 0.0 };
            1.0 - normalised
        })
        .collect()
}

/// Efficiency of the junction on a 0..=100 scale, to one decimal place.
pub fn efficiency_score(metrics: &[DirectionMetrics]) -> f64 {
    if metrics.is_empty() {
        return 0.0;
    }

    let avg_waits: Vec<Option<f64>> = metrics.iter().map(|m| m.average_waiting_time).collect();
    let max_waits: Vec<Option<f64>> = metrics.iter().map(|m| m.max_waiting_time).collect();
    let queues: Vec<Option<f64>> = metrics
        .iter()
        .map(|m| Some(m.max_queue_length as f64))
        .collect();

    let avg_scores = inverted_scores(&avg_waits);
    let max_scores = inverted_scores(&max_waits);
    let queue_scores = inverted_scores(&queues);

    let total: f64 = (0..metrics.len())
        .map(|i| {
            WEIGHT_AVG_WAIT * avg_scores[i]
                + WEIGHT_MAX_WAIT * max_scores[i]
                + WEIGHT_MAX_QUEUE * queue_scores[i]
        })
        .sum();
    let mean = total / metrics.len() as f64;
    (mean * 100.0 * 10.0).round() / 10.0
}
