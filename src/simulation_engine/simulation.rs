// simulation.rs
use crate::control_system::StopSignal;
use crate::errors::SimulationError;
use crate::flow_analyzer::{collect_metrics, efficiency_score};
use crate::global_variables::JOIN_TIMEOUT;
use crate::shared_data::{SimulationReport, SimulationStatus};
use crate::simulation_engine::config::JunctionConfig;
use crate::simulation_engine::junction::Junction;
use crate::simulation_engine::warehouse::VehiclesWarehouse;
use crate::storage::VehicleStore;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

#[derive(Debug)]
struct EngineState {
    status: SimulationStatus,
    current_stop: Option<StopSignal>,
}

/// Runs one junction simulation at a time against a record store.
pub struct SimulationEngine {
    store: Arc<dyn VehicleStore>,
    state: Mutex<EngineState>,
}

impl SimulationEngine {
    pub fn new(store: Arc<dyn VehicleStore>) -> Self {
        Self {
            store,
            state: Mutex::new(EngineState {
                status: SimulationStatus::NotStarted,
                current_stop: None,
            }),
        }
    }

    pub fn status(&self) -> SimulationStatus {
        self.lock_state().status
    }

    /// Runs a simulation to completion or until `cancel` is called.
    ///
    /// Records written during the run are deleted before returning, whatever
    /// the outcome.
    pub async fn start(&self, config: &JunctionConfig) -> Result<SimulationReport, SimulationError> {
        let stop = {
            let mut state = self.lock_state();
            if state.current_stop.is_some() {
                return Err(SimulationError::AlreadyRunning);
            }
            if let Err(e) = config.validate() {
                state.status = SimulationStatus::Failed;
                return Err(e.into());
            }
            let stop = StopSignal::new();
            state.current_stop = Some(stop.clone());
            state.status = SimulationStatus::Running;
            stop
        };

        let result = self.run(config, stop).await;

        let mut state = self.lock_state();
        state.current_stop = None;
        state.status = match &result {
            Ok(report) => report.status,
            Err(_) => SimulationStatus::Failed,
        };
        drop(state);

        match &result {
            Ok(report) => log::info!("{}", report.summary()),
            Err(e) => log::error!("Simulation failed: {}", e),
        }
        result
    }

    /// Raises the stop signal of the running simulation, if any. The pending
    /// `start` call then joins its tasks, clears the store and reports
    /// [`SimulationStatus::Stopped`].
    pub fn cancel(&self) {
        if let Some(stop) = &self.lock_state().current_stop {
            log::info!("Cancelling simulation");
            stop.raise();
        }
    }

    async fn run(&self, config: &JunctionConfig, stop: StopSignal) -> Result<SimulationReport, SimulationError> {
        let seed = config.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        let warehouse = match VehiclesWarehouse::build(config, self.store.as_ref(), &mut rng) {
            Ok(warehouse) => warehouse,
            Err(e) => {
                self.clear_store();
                return Err(e.into());
            }
        };
        log::info!("Simulation starting (seed {})", seed);

        let junction = Junction::new(config, warehouse, Arc::clone(&self.store), stop.clone());
        let handles = junction.start();
        let drained = junction.wait_until_drained().await;
        stop.raise();
        join_with_timeout(handles).await;
        let duration = junction.clock.now();

        let outcome = match junction.take_failure() {
            Some(e) => Err(e),
            None => self.collect_report(&junction, drained, duration),
        };

        match outcome {
            Ok(report) => {
                self.store.delete_all()?;
                Ok(report)
            }
            Err(e) => {
                self.clear_store();
                Err(e)
            }
        }
    }

    fn collect_report(
        &self,
        junction: &Junction,
        drained: bool,
        duration: f64,
    ) -> Result<SimulationReport, SimulationError> {
        let total_vehicles_processed = self.store.processed_count()?;
        if !drained {
            return Ok(SimulationReport::stopped(total_vehicles_processed, duration));
        }
        let directions = collect_metrics(self.store.as_ref(), &junction.tracker)?;
        let score = efficiency_score(&directions);
        Ok(SimulationReport {
            status: SimulationStatus::Completed,
            directions,
            efficiency_score: Some(score),
            total_vehicles_processed,
            duration,
        })
    }

    // Best effort; the caller is already reporting a failure.
    fn clear_store(&self) {
        if let Err(e) = self.store.delete_all() {
            log::warn!("Could not clear vehicle records: {}", e);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Joins every task, giving each at most [`JOIN_TIMEOUT`] before aborting it.
async fn join_with_timeout(handles: Vec<(String, JoinHandle<()>)>) {
    for (name, handle) in handles {
        let abort = handle.abort_handle();
        match tokio::time::timeout(JOIN_TIMEOUT, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("Task {} ended abnormally: {}", name, e),
            Err(_) => {
                log::warn!("Task {} did not stop within {:?}; aborting", name, JOIN_TIMEOUT);
                abort.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ConfigError, RecordStoreError};
    use crate::simulation_engine::directions::Direction;
    use crate::storage::InMemoryVehicleStore;

    fn light_demand() -> JunctionConfig {
        JunctionConfig::new(2, true)
            .with_flow(
                Direction::North,
                720.0,
                &[
                    (Direction::East, 240.0),
                    (Direction::South, 240.0),
                    (Direction::West, 240.0),
                ],
            )
            .with_flow(Direction::East, 360.0, &[(Direction::West, 360.0)])
            .with_timing(20.0, 1.0, 1.0)
            .with_pool_size(6)
            .with_seed(42)
    }

    #[tokio::test(start_paused = true)]
    async fn completed_run_reports_and_clears_records() {
        let store = Arc::new(InMemoryVehicleStore::new());
        let engine = SimulationEngine::new(store.clone());
        let report = engine.start(&light_demand()).await.unwrap();

        assert_eq!(report.status, SimulationStatus::Completed);
        assert_eq!(engine.status(), SimulationStatus::Completed);
        assert_eq!(report.total_vehicles_processed, 12);
        assert_eq!(report.directions.len(), 4);
        let score = report.efficiency_score.unwrap();
        assert!((0.0..=100.0).contains(&score));
        assert_eq!(store.len().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_config_never_starts() {
        let store = Arc::new(InMemoryVehicleStore::new());
        let engine = SimulationEngine::new(store.clone());
        let result = engine.start(&JunctionConfig::new(1, true)).await;
        assert!(matches!(
            result,
            Err(SimulationError::Config(ConfigError::LeftTurnNeedsTwoLanes(1)))
        ));
        assert_eq!(engine.status(), SimulationStatus::Failed);
        assert_eq!(store.len().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_reports_stopped() {
        let store = Arc::new(InMemoryVehicleStore::new());
        let engine = Arc::new(SimulationEngine::new(store.clone()));
        let config = light_demand().with_pool_size(200);

        let runner = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.start(&config).await })
        };
        tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        assert_eq!(engine.status(), SimulationStatus::Running);
        engine.cancel();

        let report = runner.await.unwrap().unwrap();
        assert_eq!(report.status, SimulationStatus::Stopped);
        assert!(report.efficiency_score.is_none());
        assert!(report.total_vehicles_processed < 400);
        assert_eq!(engine.status(), SimulationStatus::Stopped);
        assert_eq!(store.len().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_start_during_a_run_leaves_it_running() {
        let engine = Arc::new(SimulationEngine::new(Arc::new(InMemoryVehicleStore::new())));
        let config = light_demand().with_pool_size(200);
        let runner = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.start(&config).await })
        };
        tokio::time::sleep(std::time::Duration::from_secs(10)).await;

        let second = engine.start(&JunctionConfig::new(0, false)).await;
        assert!(matches!(second, Err(SimulationError::AlreadyRunning)));
        assert_eq!(engine.status(), SimulationStatus::Running);

        engine.cancel();
        let report = runner.await.unwrap().unwrap();
        assert_eq!(report.status, SimulationStatus::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn unschedulable_flow_is_rejected_up_front() {
        let store = Arc::new(InMemoryVehicleStore::new());
        let engine = SimulationEngine::new(store.clone());
        let config = JunctionConfig::new(2, false).with_flow(
            Direction::North,
            1e-300,
            &[(Direction::South, 1e-300)],
        );
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(60),
            engine.start(&config),
        )
        .await
        .expect("start returns without running the junction");
        assert!(matches!(
            result,
            Err(SimulationError::Config(ConfigError::TimingOutOfRange { .. }))
        ));
        assert_eq!(store.len().unwrap(), 0);
    }

    /// Accepts `departures_left` departures, then refuses writes.
    struct FlakyStore {
        inner: InMemoryVehicleStore,
        departures_left: Mutex<usize>,
    }

    impl VehicleStore for FlakyStore {
        fn create(&self, i: Direction, e: Direction, il: usize, el: usize) -> Result<u64, RecordStoreError> {
            self.inner.create(i, e, il, el)
        }
        fn set_arrival(&self, id: u64, t: f64) -> Result<(), RecordStoreError> {
            self.inner.set_arrival(id, t)
        }
        fn set_departure(&self, id: u64, t: f64, w: f64) -> Result<(), RecordStoreError> {
            let mut left = self.departures_left.lock().unwrap();
            if *left == 0 {
                return Err(RecordStoreError::Unavailable("connection reset".into()));
            }
            *left -= 1;
            self.inner.set_departure(id, t, w)
        }
        fn aggregate_wait_times(
            &self,
        ) -> Result<std::collections::BTreeMap<Direction, crate::storage::WaitTimeAggregate>, RecordStoreError> {
            self.inner.aggregate_wait_times()
        }
        fn processed_count(&self) -> Result<usize, RecordStoreError> {
            self.inner.processed_count()
        }
        fn delete_all(&self) -> Result<(), RecordStoreError> {
            self.inner.delete_all()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn store_failure_fails_the_run_and_cleans_up() {
        let store = Arc::new(FlakyStore {
            inner: InMemoryVehicleStore::new(),
            departures_left: Mutex::new(2),
        });
        let engine = SimulationEngine::new(store.clone());
        let result = engine.start(&light_demand()).await;

        assert!(matches!(
            result,
            Err(SimulationError::Store(RecordStoreError::Unavailable(_)))
        ));
        assert_eq!(engine.status(), SimulationStatus::Failed);
        assert_eq!(store.inner.len().unwrap(), 0);
    }
}
