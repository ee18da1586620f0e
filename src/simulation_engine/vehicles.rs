use crate::simulation_engine::directions::{relative_turn, Direction, Turn};

/// Identifier handed out by the vehicle record store.
pub type VehicleId = u64;

/// A vehicle crossing the junction.
#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    pub id: VehicleId,
    pub incoming_direction: Direction,
    pub exit_direction: Direction,
    pub incoming_lane: usize,
    pub exit_lane: usize,
    /// Simulated seconds since the run started. Set when it joins an incoming lane.
    pub arrival_time: Option<f64>,
    /// Set when it leaves the head of its incoming lane.
    pub departure_time: Option<f64>,
    pub waiting_time: Option<f64>,
}

impl Vehicle {
    pub fn new(
        id: VehicleId,
        incoming_direction: Direction,
        exit_direction: Direction,
        incoming_lane: usize,
        exit_lane: usize,
    ) -> Self {
        Self {
            id,
            incoming_direction,
            exit_direction,
            incoming_lane,
            exit_lane,
            arrival_time: None,
            departure_time: None,
            waiting_time: None,
        }
    }

    /// Turn made through the junction. The warehouse never builds a U-turn,
    /// so a missing entry is treated as straight on.
    pub fn turn(&self) -> Turn {
        relative_turn(self.incoming_direction, self.exit_direction).unwrap_or(Turn::Straight)
    }

    pub fn mark_arrived(&mut self, at: f64) {
        self.arrival_time = Some(at);
    }

    /// Stamps departure and returns `(departure_time, waiting_time)` as
    /// recorded on the vehicle.
    pub fn mark_departed(&mut self, at: f64) -> (f64, f64) {
        let arrived = self.arrival_time.unwrap_or(at);
        let departed = at.max(arrived);
        let waited = departed - arrived;
        self.departure_time = Some(departed);
        self.waiting_time = Some(waited);
        (departed, waited)
    }
}
