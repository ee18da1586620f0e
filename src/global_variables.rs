use std::time::Duration;

// Signal timing (simulated seconds)
pub const DEFAULT_CYCLE_TIME_SECS: f64 = 30.0;
pub const DEFAULT_CROSSING_TIME_SECS: f64 = 2.0;
pub const DEFAULT_SPEED_SCALE: f64 = 1.0;

// Vehicle population
pub const DEFAULT_POOL_SIZE: usize = 50;
pub const MAX_INBOUND_FLOW_VPH: f64 = 2000.0;

// Departure workers rest this long (simulated) after a scan that moved nothing.
pub const IDLE_SCAN_SECS: f64 = 0.25;

// Shutdown waits at most this long (real time) for each task.
pub const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

// Efficiency score weights
pub const WEIGHT_AVG_WAIT: f64 = 0.5;
pub const WEIGHT_MAX_WAIT: f64 = 0.25;
pub const WEIGHT_MAX_QUEUE: f64 = 0.25;

// Output
pub const RESULTS_CSV: &str = "simulation_results.csv";
