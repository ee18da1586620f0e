use crate::simulation_engine::directions::Direction;
use crate::simulation_engine::junction::Junction;
use std::sync::Arc;

/// Arrival worker for one inbound direction.
///
/// Releases the direction's pool into its incoming lanes at the configured
/// flow rate, one vehicle every `3600 / flow_rate` simulated seconds.
pub struct Enqueuer {
    direction: Direction,
    junction: Arc<Junction>,
}

impl Enqueuer {
    pub fn new(direction: Direction, junction: Arc<Junction>) -> Self {
        Self { direction, junction }
    }

    pub async fn run(self) {
        let junction = &self.junction;
        let gap = junction
            .timing
            .inter_arrival(junction.inbound_rate(self.direction));
        let mut arrived = 0usize;

        while !junction.warehouse.is_empty(self.direction) {
            if junction.stop.sleep(gap).await {
                break;
            }

            let mut vehicle = match junction.warehouse.get(self.direction) {
                Ok(vehicle) => vehicle,
                Err(e) => {
                    log::warn!("Arrival task ending early: {}", e);
                    break;
                }
            };

            let now = junction.clock.now();
            vehicle.mark_arrived(now);
            if let Err(e) = junction.store.set_arrival(vehicle.id, now) {
                junction.fail(e);
                break;
            }
            log::debug!(
                "Vehicle {} arrived from {} into lane {} heading {} at {:.2}s",
                vehicle.id,
                self.direction,
                vehicle.incoming_lane,
                vehicle.exit_direction,
                now
            );
            junction.admit(vehicle).await;
            arrived += 1;
        }

        log::info!(
            "Arrival task for {} finished after {} vehicles",
            self.direction,
            arrived
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_system::StopSignal;
    use crate::simulation_engine::config::JunctionConfig;
    use crate::simulation_engine::vehicles::Vehicle;
    use crate::simulation_engine::warehouse::VehiclesWarehouse;
    use crate::storage::{InMemoryVehicleStore, VehicleStore};
    use std::collections::HashMap;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn paces_arrivals_and_preserves_pool_order() {
        let store = Arc::new(InMemoryVehicleStore::new());
        let config = JunctionConfig::new(2, false)
            .with_flow(Direction::West, 360.0, &[(Direction::East, 360.0)])
            .with_timing(30.0, 2.0, 1.0);
        let pool: Vec<Vehicle> = (0..3)
            .map(|_| {
                let id = store.create(Direction::West, Direction::East, 1, 0).unwrap();
                Vehicle::new(id, Direction::West, Direction::East, 1, 0)
            })
            .collect();
        let ids: Vec<u64> = pool.iter().map(|v| v.id).collect();
        let junction = Junction::new(
            &config,
            VehiclesWarehouse::from_pools(HashMap::from([(Direction::West, pool)])),
            store.clone(),
            StopSignal::new(),
        );

        // 360 veh/h is one vehicle every 10 simulated seconds.
        Enqueuer::new(Direction::West, Arc::clone(&junction)).run().await;

        assert!(junction.warehouse.is_fully_empty());
        let lane = junction.lanes.incoming(Direction::West, 1).lock().await;
        let queued: Vec<u64> = lane.iter().map(|v| v.id).collect();
        assert_eq!(queued, ids);
        let arrivals: Vec<f64> = lane.iter().filter_map(|v| v.arrival_time).collect();
        for (i, t) in arrivals.iter().enumerate() {
            assert!((t - 10.0 * (i + 1) as f64).abs() < 0.05);
        }
        drop(lane);
        for id in ids {
            assert!(store.get(id).unwrap().unwrap().arrival_time.is_some());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_signalled() {
        let store = Arc::new(InMemoryVehicleStore::new());
        let config = JunctionConfig::new(1, false)
            .with_flow(Direction::South, 36.0, &[(Direction::North, 36.0)]);
        let pool = vec![Vehicle::new(1, Direction::South, Direction::North, 0, 0)];
        let stop = StopSignal::new();
        let junction = Junction::new(
            &config,
            VehiclesWarehouse::from_pools(HashMap::from([(Direction::South, pool)])),
            store,
            stop.clone(),
        );

        let task = tokio::spawn(Enqueuer::new(Direction::South, Arc::clone(&junction)).run());
        tokio::time::sleep(Duration::from_secs(5)).await;
        stop.raise();
        task.await.unwrap();
        assert_eq!(junction.warehouse.remaining(Direction::South), 1);
    }
}
