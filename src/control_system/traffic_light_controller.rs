use crate::control_system::stop_signal::StopSignal;
use crate::simulation_engine::directions::Direction;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// The two signal phases. Exactly one axis is green at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightState {
    NsGreen,
    EwGreen,
}

impl LightState {
    pub fn toggled(self) -> Self {
        match self {
            LightState::NsGreen => LightState::EwGreen,
            LightState::EwGreen => LightState::NsGreen,
        }
    }

    pub fn is_green(self, direction: Direction) -> bool {
        match self {
            LightState::NsGreen => direction.is_north_south(),
            LightState::EwGreen => !direction.is_north_south(),
        }
    }
}

/// Fixed-period two-phase signal, starting on north/south green.
#[derive(Debug)]
pub struct TrafficLight {
    state: Mutex<LightState>,
    switches: AtomicU64,
}

impl Default for TrafficLight {
    fn default() -> Self {
        Self::new()
    }
}

impl TrafficLight {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LightState::NsGreen),
            switches: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> LightState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_green(&self, direction: Direction) -> bool {
        self.state().is_green(direction)
    }

    /// Flips the phase and returns the new one.
    pub fn switch_state(&self) -> LightState {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = state.toggled();
        self.switches.fetch_add(1, Ordering::Relaxed);
        *state
    }

    pub fn switch_count(&self) -> u64 {
        self.switches.load(Ordering::Relaxed)
    }

    // The only writer of the light state during a run.
    pub async fn run_update_loop(light: Arc<Self>, cycle: Duration, stop: StopSignal) {
        loop {
            if stop.sleep(cycle).await {
                break;
            }
            let state = light.switch_state();
            log::debug!("Traffic light switched to {:?}", state);
        }
        log::debug!(
            "Traffic light controller stopped after {} switches",
            light.switch_count()
        );
    }
}
