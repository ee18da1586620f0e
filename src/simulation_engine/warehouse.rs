use crate::errors::{EmptyPoolError, RecordStoreError};
use crate::simulation_engine::config::JunctionConfig;
use crate::simulation_engine::directions::{dedicated_lane, mirrored_lane, relative_turn, Direction, Turn};
use crate::simulation_engine::vehicles::Vehicle;
use crate::storage::VehicleStore;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Pre-built arrival pools, one per inbound direction, behind a single lock.
#[derive(Debug, Default)]
pub struct VehiclesWarehouse {
    pools: Mutex<HashMap<Direction, VecDeque<Vehicle>>>,
}

impl VehiclesWarehouse {
    /// Generates the pool of every direction and registers each vehicle
    /// with the record store.
    pub fn build<R: Rng + ?Sized>(
        config: &JunctionConfig,
        store: &dyn VehicleStore,
        rng: &mut R,
    ) -> Result<Self, RecordStoreError> {
        let mut pools = HashMap::new();
        for direction in Direction::ALL {
            let vehicles = generate(direction, config, store, rng)?;
            log::debug!("{} pool holds {} vehicles", direction, vehicles.len());
            pools.insert(direction, VecDeque::from(vehicles));
        }
        Ok(Self {
            pools: Mutex::new(pools),
        })
    }

    /// Wraps already generated pools.
    pub fn from_pools(pools: HashMap<Direction, Vec<Vehicle>>) -> Self {
        Self {
            pools: Mutex::new(
                pools
                    .into_iter()
                    .map(|(d, vehicles)| (d, VecDeque::from(vehicles)))
                    .collect(),
            ),
        }
    }

    /// Takes the next vehicle due to arrive from `direction`.
    pub fn get(&self, direction: Direction) -> Result<Vehicle, EmptyPoolError> {
        self.lock()
            .get_mut(&direction)
            .and_then(VecDeque::pop_front)
            .ok_or(EmptyPoolError(direction))
    }

    pub fn is_empty(&self, direction: Direction) -> bool {
        self.lock().get(&direction).map_or(true, VecDeque::is_empty)
    }

    pub fn is_fully_empty(&self) -> bool {
        self.lock().values().all(VecDeque::is_empty)
    }

    pub fn remaining(&self, direction: Direction) -> usize {
        self.lock().get(&direction).map_or(0, VecDeque::len)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Direction, VecDeque<Vehicle>>> {
        self.pools.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Number of vehicles heading to each exit of `direction`:
/// `round(pool_size * exit_rate / inbound_rate)`.
pub fn exit_counts(direction: Direction, config: &JunctionConfig) -> Vec<(Direction, usize)> {
    let flow = config.flow(direction);
    if flow.inbound <= 0.0 {
        return Vec::new();
    }
    let pool_size = config.pool_size() as f64;
    direction
        .exits()
        .map(|exit| {
            let share = pool_size * flow.exit_rate(exit) / flow.inbound;
            (exit, share.round().max(0.0) as usize)
        })
        .collect()
}

/// Builds the shuffled arrival pool of one inbound direction.
pub fn generate<R: Rng + ?Sized>(
    direction: Direction,
    config: &JunctionConfig,
    store: &dyn VehicleStore,
    rng: &mut R,
) -> Result<Vec<Vehicle>, RecordStoreError> {
    let mut vehicles = Vec::new();
    for (exit, count) in exit_counts(direction, config) {
        for _ in 0..count {
            let incoming_lane = assign_lane(direction, exit, config, rng);
            let exit_lane = mirrored_lane(incoming_lane, config.num_lanes);
            let id = store.create(direction, exit, incoming_lane, exit_lane)?;
            vehicles.push(Vehicle::new(id, direction, exit, incoming_lane, exit_lane));
        }
    }
    vehicles.shuffle(rng);
    Ok(vehicles)
}

/// Chooses the incoming lane for a vehicle.
///
/// With dedicated turn lanes, left turns use lane 0, right turns the last
/// lane, and straight traffic any lane in between. Without them every lane
/// is equally likely.
pub fn assign_lane<R: Rng + ?Sized>(
    incoming: Direction,
    exit: Direction,
    config: &JunctionConfig,
    rng: &mut R,
) -> usize {
    let num_lanes = config.num_lanes;
    if !config.left_turn {
        return rng.random_range(0..num_lanes);
    }
    let turn = relative_turn(incoming, exit).unwrap_or(Turn::Straight);
    match dedicated_lane(turn, num_lanes) {
        Some(lane) => lane,
        None if num_lanes > 2 => rng.random_range(1..num_lanes - 1),
        None => rng.random_range(0..num_lanes),
    }
}
