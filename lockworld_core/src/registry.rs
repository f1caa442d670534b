//! Authoritative storage for every room, door, key, object and the agent.
//!
//! Entities are addressed by index and looked up by name through a single
//! name → [`EntityRef`] map. Only the action layer mutates them.

use std::collections::HashMap;

use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use crate::{
    DoorId, KeyId, MAIN_ROOM_ID, ObjectId, Position, RoomId,
    config::WorldConfig,
    error::{ActionError, ConfigError},
    topology::{Rect, Topology},
};

/// Name under which the agent is registered.
pub const AGENT_NAME: &str = "agent";

/// A resolved name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityRef {
    Room(RoomId),
    Door(DoorId),
    Key(KeyId),
    Object(ObjectId),
    Agent,
}

/// The carryable subset of [`EntityRef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemRef {
    Key(KeyId),
    Object(ObjectId),
}

impl EntityRef {
    pub fn as_item(self) -> Option<ItemRef> {
        match self {
            EntityRef::Key(id) => Some(ItemRef::Key(id)),
            EntityRef::Object(id) => Some(ItemRef::Object(id)),
            _ => None,
        }
    }

    /// Rooms stand in for their doors.
    pub fn as_door(self) -> Option<DoorId> {
        match self {
            EntityRef::Room(id) | EntityRef::Door(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Room {
    pub name: String,
    pub bounds: Rect,
    pub door: DoorId,
}

#[derive(Debug, Clone)]
pub struct Door {
    pub name: String,
    pub room: RoomId,
    pub position: Position,
    /// Main-room cell in front of the door; `None` for the main room's virtual door.
    pub exterior: Option<Position>,
    pub open: bool,
    /// The one key that unlocks this door.
    pub key: Option<KeyId>,
}

impl Door {
    /// Where the agent stands when it walks "to the door": on the door cell once
    /// it is open, in front of it while it is closed.
    pub fn approach(&self) -> Position {
        match self.exterior {
            Some(exterior) if !self.open => exterior,
            _ => self.position,
        }
    }
}

/// State shared by keys and objects.
#[derive(Debug, Clone)]
pub struct Item {
    pub name: String,
    /// Last cell the item was placed on. Meaningless while `held`.
    pub position: Position,
    /// Room of `position`; decides the item's visibility.
    pub inroom: RoomId,
    pub held: bool,
}

#[derive(Debug, Clone)]
pub struct Key {
    pub item: Item,
    pub forroom: RoomId,
}

#[derive(Debug, Clone)]
pub struct Object {
    pub item: Item,
}

#[derive(Debug, Clone)]
pub struct Agent {
    pub name: String,
    pub position: Position,
}

#[derive(Debug, Clone)]
pub struct Registry {
    rooms: Vec<Room>,
    doors: Vec<Door>,
    keys: Vec<Key>,
    objects: Vec<Object>,
    agent: Agent,
    names: HashMap<String, EntityRef>,
}

/// Lookup key for a free-text name.
fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

fn door_name(room: &str) -> String {
    format!("{room}_door")
}

impl Registry {
    /// Validates `config` against `topology` and places every entity.
    ///
    /// Keys and objects land on distinct random cells of their room; the agent
    /// starts on `config.agent_start` or on a random main-room cell.
    pub(crate) fn from_config<R: Rng>(
        config: &WorldConfig,
        topology: &Topology,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        let mut names = HashMap::new();
        let mut register = |name: &str, entity: EntityRef| {
            let normalized = normalize(name);
            match names.insert(normalized.clone(), entity) {
                Some(_) => Err(ConfigError::DuplicateName(normalized)),
                None => Ok(()),
            }
        };

        register(AGENT_NAME, EntityRef::Agent)?;
        let room_ids: HashMap<String, RoomId> = topology
            .rooms()
            .iter()
            .enumerate()
            .map(|(id, room)| (normalize(&room.name), id))
            .collect();

        let mut rooms = Vec::with_capacity(topology.rooms().len());
        let mut doors = Vec::with_capacity(topology.rooms().len());
        for (id, layout) in topology.rooms().iter().enumerate() {
            register(&layout.name, EntityRef::Room(id))?;
            register(&door_name(&layout.name), EntityRef::Door(id))?;
            let preopened = config
                .rooms
                .iter()
                .any(|room| room.open && normalize(&room.name) == normalize(&layout.name));
            rooms.push(Room {
                name: layout.name.clone(),
                bounds: layout.bounds,
                door: id,
            });
            doors.push(Door {
                name: door_name(&layout.name),
                room: id,
                position: layout.door,
                exterior: layout.exterior,
                open: id == MAIN_ROOM_ID || preopened,
                key: None,
            });
        }

        let agent_position = match config.agent_start {
            Some(position) => {
                if !topology.contains(position) || topology.room_at(position) != MAIN_ROOM_ID {
                    return Err(ConfigError::InvalidAgentStart { position });
                }
                position
            }
            None => {
                let cells = topology.room_cells(MAIN_ROOM_ID);
                cells[rng.random_range(0..cells.len())]
            }
        };

        let mut keys = Vec::new();
        let mut objects = Vec::new();
        for room_config in &config.rooms {
            let inroom = room_ids[&normalize(&room_config.name)];
            let mut cells = topology.room_cells(inroom);
            if inroom == MAIN_ROOM_ID {
                cells.retain(|cell| *cell != agent_position);
            }
            let wanted = room_config.doorkeys.len() + room_config.objects.len();
            if wanted > cells.len() {
                return Err(ConfigError::RoomFull {
                    room: room_config.name.clone(),
                    items: wanted,
                    cells: cells.len(),
                });
            }
            cells.shuffle(rng);
            let mut free = cells.into_iter();

            for key_config in &room_config.doorkeys {
                let forroom = match room_ids.get(&normalize(&key_config.forroom)) {
                    Some(&MAIN_ROOM_ID) => {
                        return Err(ConfigError::MainRoomKey {
                            key: key_config.name.clone(),
                        });
                    }
                    Some(&id) => id,
                    None => {
                        return Err(ConfigError::UnknownRoom {
                            key: key_config.name.clone(),
                            room: key_config.forroom.clone(),
                        });
                    }
                };
                if forroom == inroom && !doors[forroom].open {
                    return Err(ConfigError::KeyInsideRoom {
                        key: key_config.name.clone(),
                        room: rooms[forroom].name.clone(),
                    });
                }
                let id = keys.len();
                register(&key_config.name, EntityRef::Key(id))?;
                let door = &mut doors[forroom];
                if door.key.replace(id).is_some() {
                    return Err(ConfigError::DuplicateKey {
                        room: rooms[forroom].name.clone(),
                    });
                }
                keys.push(Key {
                    item: Item {
                        name: key_config.name.clone(),
                        position: free.next().unwrap_or(agent_position),
                        inroom,
                        held: false,
                    },
                    forroom,
                });
            }

            for object_config in &room_config.objects {
                register(&object_config.name, EntityRef::Object(objects.len()))?;
                objects.push(Object {
                    item: Item {
                        name: object_config.name.clone(),
                        position: free.next().unwrap_or(agent_position),
                        inroom,
                        held: false,
                    },
                });
            }
        }

        if let Some(door) = doors.iter().find(|door| !door.open && door.key.is_none()) {
            return Err(ConfigError::MissingKey {
                room: rooms[door.room].name.clone(),
            });
        }

        Ok(Self {
            rooms,
            doors,
            keys,
            objects,
            agent: Agent {
                name: AGENT_NAME.to_string(),
                position: agent_position,
            },
            names,
        })
    }

    /// Resolves a free-text name. Surrounding whitespace and case are ignored.
    pub fn lookup(&self, name: &str) -> Result<EntityRef, ActionError> {
        self.names
            .get(&normalize(name))
            .copied()
            .ok_or_else(|| ActionError::EntityNotFound {
                name: name.trim().to_string(),
            })
    }

    pub fn lookup_item(&self, name: &str) -> Result<ItemRef, ActionError> {
        self.lookup(name)?
            .as_item()
            .ok_or_else(|| ActionError::InvalidTarget {
                name: name.trim().to_string(),
                expected: "key or object",
            })
    }

    pub fn lookup_door(&self, name: &str) -> Result<DoorId, ActionError> {
        self.lookup(name)?
            .as_door()
            .ok_or_else(|| ActionError::InvalidTarget {
                name: name.trim().to_string(),
                expected: "door",
            })
    }

    pub fn lookup_key(&self, name: &str) -> Result<KeyId, ActionError> {
        match self.lookup(name)? {
            EntityRef::Key(id) => Ok(id),
            _ => Err(ActionError::InvalidTarget {
                name: name.trim().to_string(),
                expected: "key",
            }),
        }
    }

    /// Display name of any entity.
    pub fn name_of(&self, entity: EntityRef) -> &str {
        match entity {
            EntityRef::Room(id) => &self.rooms[id].name,
            EntityRef::Door(id) => &self.doors[id].name,
            EntityRef::Key(id) => &self.keys[id].item.name,
            EntityRef::Object(id) => &self.objects[id].item.name,
            EntityRef::Agent => &self.agent.name,
        }
    }

    /// All rooms, indexed by [`RoomId`]. The main room comes first.
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    /// All doors. A door shares its id with its room.
    pub fn doors(&self) -> &[Door] {
        &self.doors
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    /// Returns room `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not handed out by this registry.
    pub fn room(&self, id: RoomId) -> &Room {
        &self.rooms[id]
    }

    /// Returns door `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not handed out by this registry.
    pub fn door(&self, id: DoorId) -> &Door {
        &self.doors[id]
    }

    /// Returns key `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not handed out by this registry.
    pub fn key(&self, id: KeyId) -> &Key {
        &self.keys[id]
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Shared item state of a key or object.
    ///
    /// # Panics
    ///
    /// Panics if the id inside `item` is out of range.
    pub fn item(&self, item: ItemRef) -> &Item {
        match item {
            ItemRef::Key(id) => &self.keys[id].item,
            ItemRef::Object(id) => &self.objects[id].item,
        }
    }

    fn item_mut(&mut self, item: ItemRef) -> &mut Item {
        match item {
            ItemRef::Key(id) => &mut self.keys[id].item,
            ItemRef::Object(id) => &mut self.objects[id].item,
        }
    }

    /// An item is visible while it lies in a room whose door is open.
    pub fn is_visible(&self, item: &Item) -> bool {
        !item.held && self.doors[self.rooms[item.inroom].door].open
    }

    pub fn visible_keys(&self) -> impl Iterator<Item = &Key> {
        self.keys.iter().filter(|key| self.is_visible(&key.item))
    }

    pub fn visible_objects(&self) -> impl Iterator<Item = &Object> {
        self.objects
            .iter()
            .filter(|object| self.is_visible(&object.item))
    }

    /// Doors still locked, in room order.
    pub fn closed_doors(&self) -> impl Iterator<Item = &Door> {
        self.doors.iter().filter(|door| !door.open)
    }

    /// Items the agent carries, keys first.
    pub fn held_items(&self) -> impl Iterator<Item = &Item> {
        self.keys
            .iter()
            .map(|key| &key.item)
            .chain(self.objects.iter().map(|object| &object.item))
            .filter(|item| item.held)
    }

    pub(crate) fn set_agent_position(&mut self, position: Position) {
        self.agent.position = position;
    }

    pub(crate) fn set_held(&mut self, item: ItemRef) {
        self.item_mut(item).held = true;
    }

    pub(crate) fn place(&mut self, item: ItemRef, position: Position, inroom: RoomId) {
        let item = self.item_mut(item);
        item.position = position;
        item.inroom = inroom;
        item.held = false;
    }

    pub(crate) fn set_door_open(&mut self, door: DoorId) {
        self.doors[door].open = true;
    }
}
