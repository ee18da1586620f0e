use crate::errors::RecordStoreError;
use crate::global_variables::IDLE_SCAN_SECS;
use crate::simulation_engine::directions::{Direction, Turn};
use crate::simulation_engine::junction::Junction;
use crate::simulation_engine::lanes::try_lock_all;
use crate::simulation_engine::vehicles::{Vehicle, VehicleId};
use std::sync::Arc;

/// Result of a right-turn yield check against the opposite approach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arbitration {
    /// No opposing straight traffic; the right turn may go.
    Clear,
    /// An opposite lane was busy. Try again on a later scan.
    Contended,
    /// This many opposing straight vehicles were sent through first.
    Yielded(usize),
}

/// A vehicle taken off its lane, with the departure stamped on it.
struct Departing {
    vehicle: Vehicle,
    departed: f64,
    waited: f64,
}

impl Departing {
    fn stamp(mut vehicle: Vehicle, now: f64) -> Self {
        let (departed, waited) = vehicle.mark_departed(now);
        Self {
            vehicle,
            departed,
            waited,
        }
    }
}

/// Departure worker for one direction.
///
/// Scans the direction's incoming lanes in index order and sends head
/// vehicles across the junction while the light is green. A right turn
/// crosses the oncoming stream, so it first gives way to straight traffic
/// waiting at the head of the opposite approach.
pub struct Dequeuer {
    direction: Direction,
    junction: Arc<Junction>,
}

impl Dequeuer {
    pub fn new(direction: Direction, junction: Arc<Junction>) -> Self {
        Self { direction, junction }
    }

    pub async fn run(self) {
        let idle = self.junction.timing.real(IDLE_SCAN_SECS);
        let mut departed = 0usize;

        while !self.junction.stop.is_raised() {
            match self.scan().await {
                Ok(0) => {
                    if self.junction.stop.sleep(idle).await {
                        break;
                    }
                }
                Ok(moved) => {
                    departed += moved;
                    tokio::task::yield_now().await;
                }
                Err(e) => {
                    self.junction.fail(e);
                    break;
                }
            }
        }

        log::info!(
            "Departure task for {} finished after moving {} vehicles",
            self.direction,
            departed
        );
    }

    /// One pass over every incoming lane. Returns how many vehicles left.
    pub async fn scan(&self) -> Result<usize, RecordStoreError> {
        let mut moved = 0;
        for lane in 0..self.junction.lanes.num_lanes() {
            if self.junction.stop.is_raised() {
                break;
            }
            moved += self.service_lane(lane).await?;
        }
        Ok(moved)
    }

    async fn service_lane(&self, lane_index: usize) -> Result<usize, RecordStoreError> {
        let junction = &self.junction;
        let lane = junction.lanes.incoming(self.direction, lane_index);

        let (head_id, turn, queue_length) = {
            let guard = lane.lock().await;
            match guard.head() {
                Some(head) => (head.id, head.turn(), guard.len()),
                None => return Ok(0),
            }
        };

        if !junction.light.is_green(self.direction) {
            junction.tracker.observe(self.direction, queue_length);
            return Ok(0);
        }

        if turn == Turn::Right {
            match self.yield_to_opposite_straight().await? {
                Arbitration::Clear => {}
                Arbitration::Contended => {
                    log::debug!(
                        "Right turn {} from {} deferred: opposite lanes busy",
                        head_id,
                        self.direction
                    );
                    return Ok(0);
                }
                Arbitration::Yielded(count) => {
                    log::debug!(
                        "Right turn {} from {} gave way to {} straight vehicles",
                        head_id,
                        self.direction,
                        count
                    );
                    return Ok(count);
                }
            }
        }

        match self.take_head(lane_index, head_id).await {
            Some(departing) => {
                self.cross(departing).await?;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    /// Removes the head of a lane, provided it is still the vehicle that was
    /// inspected. The opposite departure task may have sent it already.
    async fn take_head(&self, lane_index: usize, expected: VehicleId) -> Option<Departing> {
        let lane = self.junction.lanes.incoming(self.direction, lane_index);
        let mut guard = lane.lock().await;
        if guard.head().map(|v| v.id) != Some(expected) {
            return None;
        }
        let vehicle = guard.remove_head()?;
        Some(Departing::stamp(vehicle, self.junction.clock.now()))
    }

    /// Gives way to straight-ahead vehicles at the head of the opposite
    /// approach's lanes.
    ///
    /// All opposite lanes are locked without waiting, or none are. Eligible
    /// vehicles are taken off their lanes under those locks, and the locks
    /// are released before any of them is driven across.
    pub async fn yield_to_opposite_straight(&self) -> Result<Arbitration, RecordStoreError> {
        let junction = &self.junction;
        let opposite = self.direction.opposite();
        if !junction.light.is_green(opposite) {
            return Ok(Arbitration::Clear);
        }

        let priority: Vec<Departing> = {
            let Some(mut guards) = try_lock_all(&junction.lanes.direction(opposite).incoming)
            else {
                return Ok(Arbitration::Contended);
            };
            let now = junction.clock.now();
            guards
                .iter_mut()
                .filter(|lane| lane.head().map(Vehicle::turn) == Some(Turn::Straight))
                .filter_map(|lane| lane.remove_head())
                .map(|vehicle| Departing::stamp(vehicle, now))
                .collect()
        };

        if priority.is_empty() {
            return Ok(Arbitration::Clear);
        }
        let count = priority.len();
        for departing in priority {
            self.cross(departing).await?;
        }
        Ok(Arbitration::Yielded(count))
    }

    /// Persists the departure, then occupies the exit lane for the crossing
    /// time before the vehicle joins it.
    async fn cross(&self, departing: Departing) -> Result<(), RecordStoreError> {
        let junction = &self.junction;
        let Departing {
            vehicle,
            departed,
            waited,
        } = departing;
        junction.store.set_departure(vehicle.id, departed, waited)?;

        log::debug!(
            "Vehicle {} left {} lane {} for {} after waiting {:.2}s",
            vehicle.id,
            vehicle.incoming_direction,
            vehicle.incoming_lane,
            vehicle.exit_direction,
            waited
        );

        let exit = junction
            .lanes
            .exiting(vehicle.exit_direction, vehicle.exit_lane);
        let mut exit_lane = exit.lock().await;
        tokio::time::sleep(junction.timing.crossing()).await;
        exit_lane.add_vehicle(vehicle);
        drop(exit_lane);

        junction.vehicle_cleared();
        Ok(())
    }
}
