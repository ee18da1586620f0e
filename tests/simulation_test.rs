use junction_sim::simulation_engine::warehouse::exit_counts;
use junction_sim::{
    ConfigError, Direction, InMemoryVehicleStore, JunctionConfig, SimulationEngine,
    SimulationError, SimulationStatus,
};
use std::sync::Arc;
use std::time::Duration;

fn busy_junction(pool_size: usize) -> JunctionConfig {
    JunctionConfig::new(2, true)
        .with_flow(
            Direction::North,
            500.0,
            &[
                (Direction::East, 200.0),
                (Direction::South, 150.0),
                (Direction::West, 150.0),
            ],
        )
        .with_flow(
            Direction::South,
            400.0,
            &[(Direction::North, 300.0), (Direction::East, 100.0)],
        )
        .with_flow(Direction::East, 300.0, &[(Direction::West, 300.0)])
        .with_timing(15.0, 1.0, 1.0)
        .with_pool_size(pool_size)
        .with_seed(2024)
}

fn expected_total(config: &JunctionConfig) -> usize {
    Direction::ALL
        .iter()
        .flat_map(|d| exit_counts(*d, config))
        .map(|(_, n)| n)
        .sum()
}

#[tokio::test(start_paused = true)]
async fn full_run_processes_every_generated_vehicle() {
    let store = Arc::new(InMemoryVehicleStore::new());
    let engine = SimulationEngine::new(store.clone());
    let config = busy_junction(10);

    let report = engine.start(&config).await.unwrap();

    assert_eq!(report.status, SimulationStatus::Completed);
    assert_eq!(report.total_vehicles_processed, expected_total(&config));
    let processed: usize = report.directions.iter().map(|m| m.vehicles_processed).sum();
    assert_eq!(processed, report.total_vehicles_processed);

    let score = report.efficiency_score.unwrap();
    assert!((0.0..=100.0).contains(&score), "score {}", score);
    assert!(report.duration > 0.0);
    assert_eq!(store.len().unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn direction_without_demand_processes_nothing() {
    let engine = SimulationEngine::new(Arc::new(InMemoryVehicleStore::new()));
    let report = engine.start(&busy_junction(8)).await.unwrap();

    let west = report
        .directions
        .iter()
        .find(|m| m.direction == Direction::West)
        .unwrap();
    assert_eq!(west.vehicles_processed, 0);
    assert_eq!(west.average_waiting_time, None);
    assert_eq!(west.max_queue_length, 0);
}

#[tokio::test(start_paused = true)]
async fn waits_are_never_negative() {
    let engine = SimulationEngine::new(Arc::new(InMemoryVehicleStore::new()));
    let report = engine.start(&busy_junction(12)).await.unwrap();

    for m in &report.directions {
        if let (Some(avg), Some(max)) = (m.average_waiting_time, m.max_waiting_time) {
            assert!(avg >= 0.0);
            assert!(max >= avg);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn single_lane_junction_completes() {
    let engine = SimulationEngine::new(Arc::new(InMemoryVehicleStore::new()));
    let config = JunctionConfig::new(1, false)
        .with_flow(
            Direction::West,
            600.0,
            &[(Direction::East, 300.0), (Direction::North, 300.0)],
        )
        .with_flow(Direction::East, 600.0, &[(Direction::West, 600.0)])
        .with_timing(10.0, 1.0, 1.0)
        .with_pool_size(6);

    let report = engine.start(&config).await.unwrap();
    assert_eq!(report.status, SimulationStatus::Completed);
    assert_eq!(report.total_vehicles_processed, 12);
}

#[tokio::test(start_paused = true)]
async fn json_configuration_drives_a_run() {
    let json = r#"{
        "north": {"inbound": 360, "south": 360},
        "south": {"inbound": 360, "north": 180, "west": 180},
        "leftTurn": true,
        "numLanes": 3,
        "cycleTime": 20,
        "crossingTime": 1,
        "poolSize": 6,
        "seed": 11
    }"#;
    let config = JunctionConfig::from_json(json).unwrap();
    let engine = SimulationEngine::new(Arc::new(InMemoryVehicleStore::new()));

    let report = engine.start(&config).await.unwrap();
    assert_eq!(report.status, SimulationStatus::Completed);
    assert_eq!(report.total_vehicles_processed, 12);
}

#[tokio::test(start_paused = true)]
async fn cancel_stops_a_long_run() {
    let store = Arc::new(InMemoryVehicleStore::new());
    let engine = Arc::new(SimulationEngine::new(store.clone()));
    let config = busy_junction(500);

    let runner = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.start(&config).await })
    };
    tokio::time::sleep(Duration::from_secs(120)).await;
    engine.cancel();

    let report = runner.await.unwrap().unwrap();
    assert_eq!(report.status, SimulationStatus::Stopped);
    assert!(report.total_vehicles_processed < expected_total(&busy_junction(500)));
    assert_eq!(engine.status(), SimulationStatus::Stopped);
    assert_eq!(store.len().unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn invalid_configuration_is_rejected() {
    let engine = SimulationEngine::new(Arc::new(InMemoryVehicleStore::new()));

    let result = engine.start(&JunctionConfig::new(0, false)).await;
    assert!(matches!(
        result,
        Err(SimulationError::Config(ConfigError::ZeroLanes))
    ));

    let negative = JunctionConfig::new(2, false).with_flow(Direction::North, -1.0, &[]);
    assert!(matches!(
        engine.start(&negative).await,
        Err(SimulationError::Config(ConfigError::NegativeFlow { .. }))
    ));
}

#[tokio::test(start_paused = true)]
async fn engine_can_run_again_after_a_run() {
    let engine = SimulationEngine::new(Arc::new(InMemoryVehicleStore::new()));
    let first = engine.start(&busy_junction(4)).await.unwrap();
    let second = engine.start(&busy_junction(4)).await.unwrap();
    assert_eq!(first.total_vehicles_processed, second.total_vehicles_processed);
    assert_eq!(first.directions.len(), second.directions.len());
}
