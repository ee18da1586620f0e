// simulation_engine/mod.rs
pub mod config;
pub mod dequeuer;
pub mod directions;
pub mod enqueuer;
pub mod junction;
pub mod lanes;
pub mod simulation;
pub mod vehicles;
pub mod warehouse;

pub use config::{DirectionFlow, JunctionConfig, Timing};
pub use directions::{Direction, Turn};
pub use simulation::SimulationEngine;
