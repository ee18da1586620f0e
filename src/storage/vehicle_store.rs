use crate::errors::RecordStoreError;
use crate::simulation_engine::directions::Direction;
use crate::simulation_engine::vehicles::VehicleId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// Persisted view of one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub id: VehicleId,
    pub incoming_direction: Direction,
    pub exit_direction: Direction,
    pub incoming_lane: usize,
    pub exit_lane: usize,
    pub arrival_time: Option<f64>,
    pub departure_time: Option<f64>,
    pub waiting_time: Option<f64>,
}

/// Average and maximum waiting time of one incoming direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaitTimeAggregate {
    pub average: f64,
    pub max: f64,
    pub count: usize,
}

/// Storage for vehicle records, shared by every worker of a run.
pub trait VehicleStore: Send + Sync {
    fn create(
        &self,
        incoming_direction: Direction,
        exit_direction: Direction,
        incoming_lane: usize,
        exit_lane: usize,
    ) -> Result<VehicleId, RecordStoreError>;

    fn set_arrival(&self, id: VehicleId, timestamp: f64) -> Result<(), RecordStoreError>;

    fn set_departure(
        &self,
        id: VehicleId,
        timestamp: f64,
        waiting_time: f64,
    ) -> Result<(), RecordStoreError>;

    /// Group-by incoming direction over records with a waiting time.
    /// Directions without any such record are absent from the map.
    fn aggregate_wait_times(&self) -> Result<BTreeMap<Direction, WaitTimeAggregate>, RecordStoreError>;

    /// Number of records with a waiting time.
    fn processed_count(&self) -> Result<usize, RecordStoreError>;

    fn delete_all(&self) -> Result<(), RecordStoreError>;
}

#[derive(Debug, Default)]
struct StoreState {
    next_id: VehicleId,
    records: HashMap<VehicleId, VehicleRecord>,
}

/// Process-local record store.
#[derive(Debug, Default)]
pub struct InMemoryVehicleStore {
    state: Mutex<StoreState>,
}

impl InMemoryVehicleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: VehicleId) -> Result<Option<VehicleRecord>, RecordStoreError> {
        Ok(self.lock()?.records.get(&id).cloned())
    }

    pub fn len(&self) -> Result<usize, RecordStoreError> {
        Ok(self.lock()?.records.len())
    }

    pub fn records(&self) -> Result<Vec<VehicleRecord>, RecordStoreError> {
        let mut records: Vec<VehicleRecord> = self.lock()?.records.values().cloned().collect();
        records.sort_by_key(|r| r.id);
        Ok(records)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreState>, RecordStoreError> {
        self.state
            .lock()
            .map_err(|_| RecordStoreError::Unavailable("store lock poisoned".to_string()))
    }
}

impl VehicleStore for InMemoryVehicleStore {
    fn create(
        &self,
        incoming_direction: Direction,
        exit_direction: Direction,
        incoming_lane: usize,
        exit_lane: usize,
    ) -> Result<VehicleId, RecordStoreError> {
        let mut state = self.lock()?;
        state.next_id += 1;
        let id = state.next_id;
        state.records.insert(
            id,
            VehicleRecord {
                id,
                incoming_direction,
                exit_direction,
                incoming_lane,
                exit_lane,
                arrival_time: None,
                departure_time: None,
                waiting_time: None,
            },
        );
        Ok(id)
    }

    fn set_arrival(&self, id: VehicleId, timestamp: f64) -> Result<(), RecordStoreError> {
        let mut state = self.lock()?;
        let record = state
            .records
            .get_mut(&id)
            .ok_or(RecordStoreError::NotFound(id))?;
        record.arrival_time = Some(timestamp);
        Ok(())
    }

    fn set_departure(
        &self,
        id: VehicleId,
        timestamp: f64,
        waiting_time: f64,
    ) -> Result<(), RecordStoreError> {
        let mut state = self.lock()?;
        let record = state
            .records
            .get_mut(&id)
            .ok_or(RecordStoreError::NotFound(id))?;
        record.departure_time = Some(timestamp);
        record.waiting_time = Some(waiting_time);
        Ok(())
    }

    fn aggregate_wait_times(&self) -> Result<BTreeMap<Direction, WaitTimeAggregate>, RecordStoreError> {
        let state = self.lock()?;
        let mut sums: BTreeMap<Direction, (f64, f64, usize)> = BTreeMap::new();
        for record in state.records.values() {
            if let Some(waited) = record.waiting_time {
                let entry = sums
                    .entry(record.incoming_direction)
                    .or_insert((0.0, f64::NEG_INFINITY, 0));
                entry.0 += waited;
                entry.1 = entry.1.max(waited);
                entry.2 += 1;
            }
        }
        Ok(sums
            .into_iter()
            .map(|(direction, (total, max, count))| {
                (
                    direction,
                    WaitTimeAggregate {
                        average: total / count as f64,
                        max,
                        count,
                    },
                )
            })
            .collect())
    }

    fn processed_count(&self) -> Result<usize, RecordStoreError> {
        Ok(self
            .lock()?
            .records
            .values()
            .filter(|r| r.waiting_time.is_some())
            .count())
    }

    fn delete_all(&self) -> Result<(), RecordStoreError> {
        self.lock()?.records.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregates_only_departed_vehicles() {
        let store = InMemoryVehicleStore::new();
        let a = store.create(Direction::North, Direction::South, 0, 1).unwrap();
        let b = store.create(Direction::North, Direction::East, 0, 1).unwrap();
        let c = store.create(Direction::East, Direction::West, 1, 0).unwrap();
        let waiting = store.create(Direction::North, Direction::West, 1, 0).unwrap();

        store.set_arrival(a, 0.0).unwrap();
        store.set_departure(a, 4.0, 4.0).unwrap();
        store.set_arrival(b, 1.0).unwrap();
        store.set_departure(b, 11.0, 10.0).unwrap();
        store.set_arrival(c, 2.0).unwrap();
        store.set_departure(c, 3.0, 1.0).unwrap();
        store.set_arrival(waiting, 5.0).unwrap();

        let aggregate = store.aggregate_wait_times().unwrap();
        let north = aggregate[&Direction::North];
        assert_eq!(north.average, 7.0);
        assert_eq!(north.max, 10.0);
        assert_eq!(north.count, 2);
        assert_eq!(aggregate[&Direction::East].max, 1.0);
        assert!(!aggregate.contains_key(&Direction::South));
        assert_eq!(store.processed_count().unwrap(), 3);
    }

    #[test]
    fn unknown_ids_are_reported() {
        let store = InMemoryVehicleStore::new();
        assert_eq!(
            store.set_arrival(42, 1.0),
            Err(RecordStoreError::NotFound(42))
        );
    }

    #[test]
    fn delete_all_resets_records_but_not_ids() {
        let store = InMemoryVehicleStore::new();
        let first = store.create(Direction::West, Direction::East, 0, 0).unwrap();
        store.delete_all().unwrap();
        assert_eq!(store.len().unwrap(), 0);
        let second = store.create(Direction::West, Direction::East, 0, 0).unwrap();
        assert!(second > first);
    }
}
