use crate::simulation_engine::directions::Direction;
use crate::simulation_engine::vehicles::Vehicle;
use std::collections::VecDeque;
use tokio::sync::{Mutex, MutexGuard};

/// Unbounded FIFO of vehicles.
#[derive(Debug, Default)]
pub struct Lane {
    vehicles: VecDeque<Vehicle>,
}

impl Lane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins the tail of the lane.
    pub fn add_vehicle(&mut self, vehicle: Vehicle) {
        self.vehicles.push_back(vehicle);
    }

    pub fn head(&self) -> Option<&Vehicle> {
        self.vehicles.front()
    }

    pub fn remove_head(&mut self) -> Option<Vehicle> {
        self.vehicles.pop_front()
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.iter()
    }
}

/// Incoming and exiting lanes of one approach, each behind its own lock.
#[derive(Debug)]
pub struct DirectionLanes {
    pub direction: Direction,
    pub incoming: Vec<Mutex<Lane>>,
    pub exiting: Vec<Mutex<Lane>>,
}

impl DirectionLanes {
    pub fn new(direction: Direction, num_lanes: usize) -> Self {
        Self {
            direction,
            incoming: (0..num_lanes).map(|_| Mutex::new(Lane::new())).collect(),
            exiting: (0..num_lanes).map(|_| Mutex::new(Lane::new())).collect(),
        }
    }
}

/// The 4 x N lane matrix of the junction.
#[derive(Debug)]
pub struct LaneMatrix {
    num_lanes: usize,
    directions: Vec<DirectionLanes>,
}

impl LaneMatrix {
    pub fn new(num_lanes: usize) -> Self {
        Self {
            num_lanes,
            directions: Direction::ALL
                .iter()
                .map(|d| DirectionLanes::new(*d, num_lanes))
                .collect(),
        }
    }

    pub fn num_lanes(&self) -> usize {
        self.num_lanes
    }

    pub fn direction(&self, direction: Direction) -> &DirectionLanes {
        &self.directions[direction.index()]
    }

    pub fn incoming(&self, direction: Direction, lane: usize) -> &Mutex<Lane> {
        &self.direction(direction).incoming[lane]
    }

    pub fn exiting(&self, direction: Direction, lane: usize) -> &Mutex<Lane> {
        &self.direction(direction).exiting[lane]
    }

    /// Vehicles still waiting in incoming lanes, summed over the junction.
    pub async fn queued_vehicles(&self) -> usize {
        let mut total = 0;
        for lanes in &self.directions {
            for lane in &lanes.incoming {
                total += lane.lock().await.len();
            }
        }
        total
    }

    /// Vehicles that have cleared the junction.
    pub async fn exited_vehicles(&self) -> usize {
        let mut total = 0;
        for lanes in &self.directions {
            for lane in &lanes.exiting {
                total += lane.lock().await.len();
            }
        }
        total
    }
}

/// Takes every lock in `lanes` without waiting, or none of them.
///
/// Returns `None` as soon as one lock is contended; guards taken up to that
/// point are dropped before returning.
pub fn try_lock_all(lanes: &[Mutex<Lane>]) -> Option<Vec<MutexGuard<'_, Lane>>> {
    let mut guards = Vec::with_capacity(lanes.len());
    for lane in lanes {
        match lane.try_lock() {
            Ok(guard) => guards.push(guard),
            Err(_) => return None,
        }
    }
    Some(guards)
}
