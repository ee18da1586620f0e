pub mod control_system;
pub mod errors;
pub mod flow_analyzer;
pub mod global_variables;
pub mod monitoring;
pub mod shared_data;
pub mod simulation_engine;
pub mod storage;

pub use errors::{ConfigError, EmptyPoolError, RecordStoreError, ResultsLogError, SimulationError};
pub use shared_data::{SimulationReport, SimulationStatus};
pub use simulation_engine::{Direction, JunctionConfig, SimulationEngine};
pub use storage::{InMemoryVehicleStore, VehicleStore};
