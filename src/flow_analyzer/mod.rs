pub mod queue_tracker;
pub mod traffic_analyzer;

pub use queue_tracker::MaxQueueLengthTracker;
pub use traffic_analyzer::{collect_metrics, efficiency_score, DirectionMetrics};
