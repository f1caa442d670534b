use serde::{Deserialize, Serialize};

pub mod action;
pub mod command;
pub mod config;
pub mod error;
pub mod map;
pub mod navigation;
pub mod registry;
pub mod snapshot;
pub mod topology;
pub mod world;

pub use action::ExploreReport;
pub use command::Command;
pub use config::WorldConfig;
pub use error::{ActionError, CommandError, ConfigError};
pub use snapshot::{SnapshotHandle, WorldSnapshot};
pub use world::World;

/// Index of a room. The main room is always `MAIN_ROOM_ID`.
pub type RoomId = usize;

/// Index of a door. Every room owns exactly one door, so door ids equal room ids.
pub type DoorId = usize;

/// Index of a key in the registry.
pub type KeyId = usize;

/// Index of an object in the registry.
pub type ObjectId = usize;

/// Name of the implicit, always-open main room.
pub const MAIN_ROOM: &str = "main";

/// Id of the main room (and of its virtual door).
pub const MAIN_ROOM_ID: RoomId = 0;

/// Represents a 2D grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Number of unit steps between two cells on an obstacle-free grid.
    pub fn manhattan_distance(&self, other: &Position) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
