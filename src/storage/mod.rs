pub mod vehicle_store;

pub use vehicle_store::{InMemoryVehicleStore, VehicleRecord, VehicleStore, WaitTimeAggregate};
