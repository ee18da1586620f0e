use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four approaches to the junction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Position of this direction in per-direction arrays.
    pub fn index(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::East => 1,
            Direction::South => 2,
            Direction::West => 3,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    /// North and south share one signal phase, east and west the other.
    pub fn is_north_south(self) -> bool {
        matches!(self, Direction::North | Direction::South)
    }

    /// The three directions a vehicle arriving from `self` may leave by.
    pub fn exits(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |d| *d != self)
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A vehicle's path through the junction relative to its approach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Turn {
    Left,
    Straight,
    Right,
}

/// Classifies the path from `incoming` to `exit`.
///
/// Traffic keeps to the left, so a right turn is the movement that cuts
/// across the oncoming stream. Returns `None` for a U-turn (same direction),
/// which the junction does not allow.
pub fn relative_turn(incoming: Direction, exit: Direction) -> Option<Turn> {
    use Direction::*;
    let turn = match (incoming, exit) {
        (North, East) => Turn::Left,
        (North, South) => Turn::Straight,
        (North, West) => Turn::Right,
        (East, South) => Turn::Left,
        (East, West) => Turn::Straight,
        (East, North) => Turn::Right,
        (South, West) => Turn::Left,
        (South, North) => Turn::Straight,
        (South, East) => Turn::Right,
        (West, North) => Turn::Left,
        (West, East) => Turn::Straight,
        (West, South) => Turn::Right,
        _ => return None,
    };
    Some(turn)
}

/// Fixed incoming lane for a turn when dedicated turn lanes are in use.
///
/// Left turns take lane 0 and right turns the last lane. Straight traffic
/// returns `None` and may use any of the middle lanes (or either edge lane
/// when there are only two).
pub fn dedicated_lane(turn: Turn, num_lanes: usize) -> Option<usize> {
    match turn {
        Turn::Left => Some(0),
        Turn::Right => Some(num_lanes.saturating_sub(1)),
        Turn::Straight => None,
    }
}

/// Exit lane index mirrors the incoming lane index.
pub fn mirrored_lane(incoming_lane: usize, num_lanes: usize) -> usize {
    num_lanes - 1 - incoming_lane
}
