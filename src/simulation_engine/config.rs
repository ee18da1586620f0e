use crate::errors::ConfigError;
use crate::global_variables::{
    DEFAULT_CROSSING_TIME_SECS, DEFAULT_CYCLE_TIME_SECS, DEFAULT_POOL_SIZE, DEFAULT_SPEED_SCALE,
    IDLE_SCAN_SECS, MAX_INBOUND_FLOW_VPH,
};
use crate::simulation_engine::directions::Direction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Inbound flow of one approach and its split over the exits (veh/h).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectionFlow {
    #[serde(default)]
    pub inbound: f64,
    #[serde(flatten)]
    pub exits: BTreeMap<Direction, f64>,
}

impl DirectionFlow {
    pub fn new(inbound: f64, exits: &[(Direction, f64)]) -> Self {
        Self {
            inbound,
            exits: exits.iter().copied().collect(),
        }
    }

    pub fn exit_rate(&self, exit: Direction) -> f64 {
        self.exits.get(&exit).copied().unwrap_or(0.0)
    }
}

/// Junction layout and demand, in the shape the web form submits:
///
/// ```json
/// {"north": {"inbound": 500, "east": 200, "south": 150, "west": 150},
///  "leftTurn": true, "numLanes": 2}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JunctionConfig {
    #[serde(default)]
    pub north: DirectionFlow,
    #[serde(default)]
    pub east: DirectionFlow,
    #[serde(default)]
    pub south: DirectionFlow,
    #[serde(default)]
    pub west: DirectionFlow,
    #[serde(default)]
    pub left_turn: bool,
    #[serde(default = "default_num_lanes")]
    pub num_lanes: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crossing_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_size: Option<usize>,
    /// Seed for pool generation; a fresh one is drawn when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_num_lanes() -> usize {
    2
}

impl Default for JunctionConfig {
    fn default() -> Self {
        Self::new(default_num_lanes(), false)
    }
}

impl JunctionConfig {
    /// An idle junction: no demand on any approach.
    pub fn new(num_lanes: usize, left_turn: bool) -> Self {
        Self {
            north: DirectionFlow::default(),
            east: DirectionFlow::default(),
            south: DirectionFlow::default(),
            west: DirectionFlow::default(),
            left_turn,
            num_lanes,
            cycle_time: None,
            crossing_time: None,
            speed_scale: None,
            pool_size: None,
            seed: None,
        }
    }

    pub fn with_flow(
        mut self,
        direction: Direction,
        inbound: f64,
        exits: &[(Direction, f64)],
    ) -> Self {
        *self.flow_mut(direction) = DirectionFlow::new(inbound, exits);
        self
    }

    pub fn with_timing(mut self, cycle_time: f64, crossing_time: f64, speed_scale: f64) -> Self {
        self.cycle_time = Some(cycle_time);
        self.crossing_time = Some(crossing_time);
        self.speed_scale = Some(speed_scale);
        self
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = Some(pool_size);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_json(&text)
    }

    pub fn flow(&self, direction: Direction) -> &DirectionFlow {
        match direction {
            Direction::North => &self.north,
            Direction::East => &self.east,
            Direction::South => &self.south,
            Direction::West => &self.west,
        }
    }

    pub fn flow_mut(&mut self, direction: Direction) -> &mut DirectionFlow {
        match direction {
            Direction::North => &mut self.north,
            Direction::East => &mut self.east,
            Direction::South => &mut self.south,
            Direction::West => &mut self.west,
        }
    }

    pub fn inbound_rate(&self, direction: Direction) -> f64 {
        self.flow(direction).inbound
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size.unwrap_or(DEFAULT_POOL_SIZE)
    }

    pub fn timing(&self) -> Timing {
        Timing {
            cycle_time: self.cycle_time.unwrap_or(DEFAULT_CYCLE_TIME_SECS),
            crossing_time: self.crossing_time.unwrap_or(DEFAULT_CROSSING_TIME_SECS),
            speed_scale: self.speed_scale.unwrap_or(DEFAULT_SPEED_SCALE),
        }
    }

    /// Rejects layouts and demand the simulation cannot run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_lanes == 0 {
            return Err(ConfigError::ZeroLanes);
        }
        if self.left_turn && self.num_lanes < 2 {
            return Err(ConfigError::LeftTurnNeedsTwoLanes(self.num_lanes));
        }

        for direction in Direction::ALL {
            let flow = self.flow(direction);
            if flow.inbound < 0.0 {
                return Err(ConfigError::NegativeFlow {
                    direction,
                    rate: flow.inbound,
                });
            }
            if flow.exits.contains_key(&direction) {
                return Err(ConfigError::SelfExit(direction));
            }
            if let Some((_, &rate)) = flow.exits.iter().find(|(_, rate)| **rate < 0.0) {
                return Err(ConfigError::NegativeFlow { direction, rate });
            }
            if flow.inbound > MAX_INBOUND_FLOW_VPH {
                return Err(ConfigError::FlowTooHigh {
                    direction,
                    rate: flow.inbound,
                    max: MAX_INBOUND_FLOW_VPH,
                });
            }
            let exits: f64 = flow.exits.values().sum();
            if (exits - flow.inbound).abs() > 1e-6 {
                return Err(ConfigError::FlowMismatch {
                    direction,
                    inbound: flow.inbound,
                    exits,
                });
            }
        }

        let timing = self.timing();
        for (name, value) in [
            ("cycle time", timing.cycle_time),
            ("crossing time", timing.crossing_time),
            ("speed scale", timing.speed_scale),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        if self.pool_size() == 0 {
            return Err(ConfigError::ZeroPoolSize);
        }

        let mut waits = vec![
            ("cycle time".to_string(), timing.cycle_time),
            ("crossing time".to_string(), timing.crossing_time),
            ("idle scan".to_string(), IDLE_SCAN_SECS),
        ];
        for direction in Direction::ALL {
            let rate = self.inbound_rate(direction);
            if rate > 0.0 {
                waits.push((format!("{} arrival gap", direction), 3600.0 / rate));
            }
        }
        for (what, simulated_secs) in waits {
            if timing.try_real(simulated_secs).is_none() {
                return Err(ConfigError::TimingOutOfRange {
                    what,
                    seconds: simulated_secs * timing.speed_scale,
                });
            }
        }
        Ok(())
    }
}

/// Resolved timing of a run. Durations are simulated seconds; `speed_scale`
/// compresses them uniformly into wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    pub cycle_time: f64,
    pub crossing_time: f64,
    pub speed_scale: f64,
}

impl Timing {
    /// Wall-clock duration of `simulated_secs`, or `None` when it does not
    /// fit in a `Duration`.
    pub fn try_real(&self, simulated_secs: f64) -> Option<Duration> {
        Duration::try_from_secs_f64((simulated_secs * self.speed_scale).max(0.0)).ok()
    }

    /// Like [`Timing::try_real`], saturating at `Duration::MAX`. Validated
    /// configs never reach the cap.
    pub fn real(&self, simulated_secs: f64) -> Duration {
        self.try_real(simulated_secs).unwrap_or(Duration::MAX)
    }

    pub fn cycle(&self) -> Duration {
        self.real(self.cycle_time)
    }

    pub fn crossing(&self) -> Duration {
        self.real(self.crossing_time)
    }

    /// Gap between two arrivals at `flow_rate` veh/h.
    pub fn inter_arrival(&self, flow_rate: f64) -> Duration {
        self.real(3600.0 / flow_rate)
    }
}
