pub mod stop_signal;
pub mod traffic_light_controller;

pub use stop_signal::StopSignal;
pub use traffic_light_controller::{LightState, TrafficLight};
