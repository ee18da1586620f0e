use crate::control_system::{StopSignal, TrafficLight};
use crate::errors::SimulationError;
use crate::flow_analyzer::MaxQueueLengthTracker;
use crate::shared_data::SimClock;
use crate::simulation_engine::config::{JunctionConfig, Timing};
use crate::simulation_engine::dequeuer::Dequeuer;
use crate::simulation_engine::directions::Direction;
use crate::simulation_engine::enqueuer::Enqueuer;
use crate::simulation_engine::lanes::LaneMatrix;
use crate::simulation_engine::vehicles::Vehicle;
use crate::simulation_engine::warehouse::VehiclesWarehouse;
use crate::storage::VehicleStore;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Notify;
use tokio::task::{AbortHandle, JoinError, JoinHandle};

/// Everything one run shares between its tasks.
pub struct Junction {
    pub lanes: LaneMatrix,
    pub light: Arc<TrafficLight>,
    pub warehouse: VehiclesWarehouse,
    pub store: Arc<dyn VehicleStore>,
    pub tracker: MaxQueueLengthTracker,
    pub timing: Timing,
    pub clock: SimClock,
    pub stop: StopSignal,
    inbound_rates: [f64; 4],
    /// Vehicles generated but not yet through the junction.
    outstanding: AtomicUsize,
    progress: Notify,
    failure: Mutex<Option<SimulationError>>,
}

/// Aborts the wrapped task when its supervisor is dropped or aborted.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl Junction {
    pub fn new(
        config: &JunctionConfig,
        warehouse: VehiclesWarehouse,
        store: Arc<dyn VehicleStore>,
        stop: StopSignal,
    ) -> Arc<Self> {
        let timing = config.timing();
        let outstanding = Direction::ALL
            .iter()
            .map(|d| warehouse.remaining(*d))
            .sum();
        let mut inbound_rates = [0.0; 4];
        for direction in Direction::ALL {
            inbound_rates[direction.index()] = config.inbound_rate(direction);
        }

        Arc::new(Self {
            lanes: LaneMatrix::new(config.num_lanes),
            light: Arc::new(TrafficLight::new()),
            warehouse,
            store,
            tracker: MaxQueueLengthTracker::new(),
            timing,
            clock: SimClock::start(timing.speed_scale),
            stop,
            inbound_rates,
            outstanding: AtomicUsize::new(outstanding),
            progress: Notify::new(),
            failure: Mutex::new(None),
        })
    }

    pub fn inbound_rate(&self, direction: Direction) -> f64 {
        self.inbound_rates[direction.index()]
    }

    /// Spawns the light controller, one arrival task per direction with
    /// demand, and one departure task per direction.
    pub fn start(self: &Arc<Self>) -> Vec<(String, JoinHandle<()>)> {
        let mut handles = Vec::new();

        handles.push(self.spawn_worker(
            "traffic-light".to_string(),
            TrafficLight::run_update_loop(
                Arc::clone(&self.light),
                self.timing.cycle(),
                self.stop.clone(),
            ),
        ));

        for direction in Direction::ALL {
            if self.inbound_rate(direction) > 0.0 && !self.warehouse.is_empty(direction) {
                let enqueuer = Enqueuer::new(direction, Arc::clone(self));
                handles.push(self.spawn_worker(format!("arrival-{}", direction), enqueuer.run()));
            }
        }
        for direction in Direction::ALL {
            let dequeuer = Dequeuer::new(direction, Arc::clone(self));
            handles.push(self.spawn_worker(format!("departure-{}", direction), dequeuer.run()));
        }

        log::info!(
            "Junction started with {} tasks ({} lanes per direction)",
            handles.len(),
            self.lanes.num_lanes()
        );
        handles
    }

    /// Spawns `task` under a supervisor that fails the run if it panics.
    /// The returned handle is the supervisor's; aborting it aborts `task`.
    fn spawn_worker<F>(self: &Arc<Self>, name: String, task: F) -> (String, JoinHandle<()>)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let worker = tokio::spawn(task);
        let guard = AbortOnDrop(worker.abort_handle());
        let junction = Arc::clone(self);
        let task_name = name.clone();
        let supervisor = tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = worker.await {
                junction.worker_died(task_name, e);
            }
        });
        (name, supervisor)
    }

    fn worker_died(&self, task: String, error: JoinError) {
        if error.is_cancelled() {
            return;
        }
        let reason = match error.try_into_panic() {
            Ok(payload) => payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panicked".to_string()),
            Err(e) => e.to_string(),
        };
        self.fail(SimulationError::WorkerPanicked { task, reason });
    }

    /// Appends a vehicle to the tail of its incoming lane.
    pub async fn admit(&self, vehicle: Vehicle) {
        let lane = self
            .lanes
            .incoming(vehicle.incoming_direction, vehicle.incoming_lane);
        lane.lock().await.add_vehicle(vehicle);
    }

    /// Called once a vehicle has reached its exit lane.
    pub fn vehicle_cleared(&self) {
        let cleared = self
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        if cleared.is_err() {
            log::warn!("Vehicle cleared with none outstanding; ignoring");
        }
        self.progress.notify_one();
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Records the first failure and stops the run.
    pub fn fail(&self, error: impl Into<SimulationError>) {
        let error = error.into();
        log::error!("Stopping simulation: {}", error);
        let mut failure = self.failure.lock().unwrap_or_else(PoisonError::into_inner);
        failure.get_or_insert(error);
        drop(failure);
        self.stop.raise();
        self.progress.notify_one();
    }

    pub fn take_failure(&self) -> Option<SimulationError> {
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Waits until every pool is exhausted and every incoming lane is empty.
    /// Returns `false` if the run was stopped first.
    pub async fn wait_until_drained(&self) -> bool {
        loop {
            if self.stop.is_raised() {
                return false;
            }
            if self.outstanding() == 0
                && self.warehouse.is_fully_empty()
                && self.lanes.queued_vehicles().await == 0
            {
                return true;
            }
            tokio::select! {
                _ = self.progress.notified() => {}
                _ = self.stop.wait() => {}
            }
        }
    }
}
