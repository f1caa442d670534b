//! Declarative room layout.
//!
//! A world is described by a list of rooms, each holding keys and objects.
//! The main room is implicit; a room entry named [`MAIN_ROOM`](crate::MAIN_ROOM)
//! only describes what lies around in it.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Position, error::ConfigError};

fn default_size() -> usize {
    10
}

fn default_room_extent() -> usize {
    3
}

fn default_step_delay_ms() -> u64 {
    200
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Side length of the square world.
    #[serde(default = "default_size")]
    pub size: usize,
    #[serde(default = "default_room_extent")]
    pub room_width: usize,
    #[serde(default = "default_room_extent")]
    pub room_height: usize,
    /// Pause after every step of the agent, so an observer can watch it walk.
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    /// Seed for item and agent placement. `None` draws one from the OS.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub agent_start: Option<Position>,
    #[serde(default)]
    pub rooms: Vec<RoomConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    pub name: String,
    #[serde(default)]
    pub objects: Vec<ObjectConfig>,
    #[serde(default)]
    pub doorkeys: Vec<KeyConfig>,
    /// Starts unlocked; such a room needs no key.
    #[serde(default)]
    pub open: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectConfig {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyConfig {
    pub name: String,
    /// Name of the room this key unlocks.
    pub forroom: String,
}

impl WorldConfig {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            room_width: default_room_extent(),
            room_height: default_room_extent(),
            step_delay_ms: default_step_delay_ms(),
            seed: None,
            agent_start: None,
            rooms: Vec::new(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_room(mut self, room: RoomConfig) -> Self {
        self.rooms.push(room);
        self
    }

    pub fn with_room_size(mut self, width: usize, height: usize) -> Self {
        self.room_width = width;
        self.room_height = height;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the per-step pause. Delays beyond `u64::MAX` milliseconds saturate.
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_agent_start(mut self, position: Position) -> Self {
        self.agent_start = Some(position);
        self
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

impl RoomConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: Vec::new(),
            doorkeys: Vec::new(),
            open: false,
        }
    }

    pub fn with_object(mut self, name: impl Into<String>) -> Self {
        self.objects.push(ObjectConfig { name: name.into() });
        self
    }

    pub fn with_key(mut self, name: impl Into<String>, forroom: impl Into<String>) -> Self {
        self.doorkeys.push(KeyConfig {
            name: name.into(),
            forroom: forroom.into(),
        });
        self
    }

    pub fn opened(mut self) -> Self {
        self.open = true;
        self
    }
}
