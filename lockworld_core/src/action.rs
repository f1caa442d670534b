//! Command resolution.
//!
//! Each command checks all of its preconditions before it touches the registry
//! or the graph, so a rejected command leaves the world exactly as it was.

use std::{fmt, thread};

use tracing::{debug, info, warn};

use crate::{
    Position,
    command::Command,
    error::ActionError,
    registry::{EntityRef, Item},
    world::World,
};

/// What the agent can currently perceive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExploreReport {
    /// Keys lying in open rooms.
    pub keys: Vec<String>,
    /// Objects lying in open rooms.
    pub objects: Vec<String>,
    /// Doors that are still locked. Their contents stay hidden.
    pub closed_doors: Vec<String>,
    pub held: Vec<String>,
}

fn list(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

impl fmt::Display for ExploreReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Keys: {}", list(&self.keys))?;
        writeln!(f, "Objects: {}", list(&self.objects))?;
        writeln!(f, "Closed doors: {}", list(&self.closed_doors))?;
        write!(f, "Holding: {}", list(&self.held))
    }
}

impl World {
    /// Runs one command and returns the message for the driver.
    pub fn execute(&mut self, command: &Command) -> Result<String, ActionError> {
        info!(%command, "executing command");
        let result = match command {
            Command::Explore => Ok(self.explore().to_string()),
            Command::Goto(target) => self.goto(target),
            Command::Pick(item) => self.pick(item),
            Command::Drop(item) => self.drop(item),
            Command::Open { door, key } => self.open(door, key),
            Command::Finished => Ok("Finished.".to_string()),
        };
        if let Err(err) = &result {
            warn!(%command, error = %err, "command rejected");
        }
        result
    }

    /// Lists visible keys, visible objects, closed doors and held items.
    pub fn explore(&self) -> ExploreReport {
        let registry = &self.registry;
        ExploreReport {
            keys: registry
                .visible_keys()
                .map(|key| key.item.name.clone())
                .collect(),
            objects: registry
                .visible_objects()
                .map(|object| object.item.name.clone())
                .collect(),
            closed_doors: registry
                .closed_doors()
                .map(|door| door.name.clone())
                .collect(),
            held: registry
                .held_items()
                .map(|item| item.name.clone())
                .collect(),
        }
    }

    /// Walks the agent to an entity. Rooms and doors resolve to the door's
    /// approach cell.
    pub fn goto(&mut self, name: &str) -> Result<String, ActionError> {
        let entity = self.registry.lookup(name)?;
        let label = self.registry.name_of(entity).to_string();
        let lying_at = |item: &Item| {
            if item.held {
                Err(ActionError::AlreadyHeld {
                    name: item.name.clone(),
                })
            } else {
                Ok(item.position)
            }
        };
        let target = match entity {
            EntityRef::Room(id) | EntityRef::Door(id) => self.registry.door(id).approach(),
            EntityRef::Key(id) => lying_at(&self.registry.key(id).item)?,
            EntityRef::Object(id) => lying_at(&self.registry.objects()[id].item)?,
            EntityRef::Agent => self.registry.agent().position,
        };

        self.walk_to(&label, target)?;
        Ok(format!("Moved to {label}."))
    }

    /// Picks up an item lying on the agent's cell.
    pub fn pick(&mut self, name: &str) -> Result<String, ActionError> {
        let item_ref = self.registry.lookup_item(name)?;
        let item = self.registry.item(item_ref);
        let label = item.name.clone();
        if item.held {
            return Err(ActionError::AlreadyHeld { name: label });
        }
        let agent = self.registry.agent().position;
        if item.position != agent {
            return Err(ActionError::NotColocated {
                name: label,
                item: item.position,
                agent,
            });
        }

        self.registry.set_held(item_ref);
        self.publish();
        info!(item = %label, at = %agent, "picked up");
        Ok(format!("Picked up {label}."))
    }

    /// Puts a held item down on the agent's cell.
    pub fn drop(&mut self, name: &str) -> Result<String, ActionError> {
        let item_ref = self.registry.lookup_item(name)?;
        let item = self.registry.item(item_ref);
        let label = item.name.clone();
        if !item.held {
            return Err(ActionError::NotHeld { name: label });
        }

        let at = self.registry.agent().position;
        let inroom = self.topology.room_at(at);
        self.registry.place(item_ref, at, inroom);
        self.publish();
        info!(item = %label, %at, inroom, "put down");
        Ok(format!("Put down {label} at {at}."))
    }

    /// Walks up to a door and unlocks it with a held key.
    pub fn open(&mut self, door_name: &str, key_name: &str) -> Result<String, ActionError> {
        let door_id = self.registry.lookup_door(door_name)?;
        let key_id = self.registry.lookup_key(key_name)?;
        let door = self.registry.door(door_id);
        let door_label = door.name.clone();

        let key = self.registry.key(key_id);
        let key_label = key.item.name.clone();
        if !key.item.held {
            return Err(ActionError::NotHeld { name: key_label });
        }
        if door.key != Some(key_id) {
            let expected = door
                .key
                .map(|id| self.registry.key(id).item.name.clone())
                .unwrap_or_else(|| "no key".to_string());
            return Err(ActionError::WrongKey {
                door: door_label,
                key: key_label,
                expected,
            });
        }
        if door.open {
            return Ok(format!("{door_label} is already open."));
        }

        let room = door.room;
        let approach = door.approach();
        self.walk_to(&door_label, approach)?;

        self.registry.set_door_open(door_id);
        self.graph.open_room(room);
        self.publish();
        info!(door = %door_label, key = %key_label, "opened door");
        Ok(format!("Opened {door_label} with {key_label}."))
    }

    /// Moves the agent along a shortest path, publishing and pausing after every step.
    ///
    /// The path is computed before the first step, so on `Unreachable` the agent
    /// has not moved.
    fn walk_to(&mut self, label: &str, target: Position) -> Result<(), ActionError> {
        let from = self.registry.agent().position;
        let Some(path) = self.graph.shortest_path(from, target) else {
            let room = self.registry.room(self.topology.room_at(target));
            let door = self.registry.door(room.door);
            return Err(ActionError::Unreachable {
                target: label.to_string(),
                door: (!door.open).then(|| door.name.clone()),
            });
        };

        debug!(destination = label, %from, steps = path.len(), "walking");
        for step in path {
            self.registry.set_agent_position(step);
            self.publish();
            debug!(at = %step, "step");
            if !self.step_delay.is_zero() {
                thread::sleep(self.step_delay);
            }
        }
        Ok(())
    }
}
