use crate::simulation_engine::directions::Direction;
use thiserror::Error;

/// Rejected junction configuration. Raised before any task is spawned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("lane count must be at least 1")]
    ZeroLanes,
    #[error("left-turn lanes need at least 2 lanes per direction, got {0}")]
    LeftTurnNeedsTwoLanes(usize),
    #[error("{direction} has a negative flow rate ({rate} veh/h)")]
    NegativeFlow { direction: Direction, rate: f64 },
    #[error("{direction} inbound flow {rate} veh/h exceeds the {max} veh/h limit")]
    FlowTooHigh {
        direction: Direction,
        rate: f64,
        max: f64,
    },
    #[error("{direction} inbound flow {inbound} veh/h does not match its exit total {exits} veh/h")]
    FlowMismatch {
        direction: Direction,
        inbound: f64,
        exits: f64,
    },
    #[error("{0} cannot list itself as an exit")]
    SelfExit(Direction),
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },
    #[error("{what} works out to {seconds} s of wall-clock time, which cannot be scheduled")]
    TimingOutOfRange { what: String, seconds: f64 },
    #[error("pool size must be at least 1")]
    ZeroPoolSize,
    #[error("could not read config: {0}")]
    Io(String),
    #[error("could not parse config: {0}")]
    Parse(String),
}

/// The warehouse was asked for a vehicle after its pool ran dry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("vehicle pool for {0} is exhausted")]
pub struct EmptyPoolError(pub Direction);

/// Any failure raised by a vehicle record store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordStoreError {
    #[error("vehicle record {0} not found")]
    NotFound(u64),
    #[error("record store is unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] RecordStoreError),
    #[error("a simulation is already running")]
    AlreadyRunning,
    #[error("{task} task died before the junction drained: {reason}")]
    WorkerPanicked { task: String, reason: String },
}

/// Failure writing or reading the results log.
#[derive(Debug, Error)]
pub enum ResultsLogError {
    #[error("results log I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("results log is malformed: {0}")]
    Csv(#[from] csv::Error),
}
