use std::time::Duration;

use rand::{SeedableRng, rngs::StdRng};
use tracing::info;

use crate::{
    MAIN_ROOM,
    config::WorldConfig,
    error::ConfigError,
    navigation::NavigationGraph,
    registry::Registry,
    snapshot::{SnapshotHandle, WorldSnapshot},
    topology::Topology,
};

/// The simulation: static topology, live navigation graph and entity registry.
///
/// Commands are resolved by the methods in [`crate::action`]. A `World` is
/// driven from a single thread; observers read it through [`SnapshotHandle`].
pub struct World {
    pub(crate) topology: Topology,
    pub(crate) registry: Registry,
    pub(crate) graph: NavigationGraph,
    pub(crate) step_delay: Duration,
    snapshots: SnapshotHandle,
    version: u64,
}

impl World {
    /// Builds a world from `config`. Fails if the rooms cannot be laid out or
    /// the entities cannot be placed.
    pub fn new(config: &WorldConfig) -> Result<Self, ConfigError> {
        let sub_rooms: Vec<String> = config
            .rooms
            .iter()
            .filter(|room| room.name.trim().to_lowercase() != MAIN_ROOM)
            .map(|room| room.name.clone())
            .collect();
        let topology = Topology::new(
            config.size,
            &sub_rooms,
            config.room_width,
            config.room_height,
        )?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let registry = Registry::from_config(config, &topology, &mut rng)?;

        let mut graph = NavigationGraph::build(&topology);
        for door in registry.doors().iter().filter(|door| door.open) {
            graph.open_room(door.room);
        }

        let snapshots = SnapshotHandle::new(WorldSnapshot::capture(0, config.size, &registry));
        info!(
            size = config.size,
            rooms = sub_rooms.len(),
            keys = registry.keys().len(),
            objects = registry.objects().len(),
            agent = %registry.agent().position,
            "world created"
        );

        Ok(Self {
            topology,
            registry,
            graph,
            step_delay: config.step_delay(),
            snapshots,
            version: 0,
        })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn graph(&self) -> &NavigationGraph {
        &self.graph
    }

    pub fn step_delay(&self) -> Duration {
        self.step_delay
    }

    pub fn set_step_delay(&mut self, delay: Duration) {
        self.step_delay = delay;
    }

    /// A handle observers can poll from any thread.
    pub fn snapshots(&self) -> SnapshotHandle {
        self.snapshots.clone()
    }

    pub(crate) fn publish(&mut self) {
        self.version += 1;
        self.snapshots.publish(WorldSnapshot::capture(
            self.version,
            self.topology.size(),
            &self.registry,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MAIN_ROOM_ID, Position, config::RoomConfig};

    #[test]
    fn test_new_world_has_only_main_room_open() {
        let config = WorldConfig::new(10)
            .with_seed(1)
            .with_room(RoomConfig::new("main").with_key("key_a", "room_a"))
            .with_room(RoomConfig::new("room_a"))
            .with_room(RoomConfig::new("room_b").opened());
        let world = World::new(&config).unwrap();

        assert!(world.graph().is_open(MAIN_ROOM_ID));
        assert!(!world.graph().is_open(1));
        assert!(world.graph().is_open(2));
        assert_eq!(world.graph().node_count(), 100 - 9);
        assert_eq!(world.snapshots().latest().version, 0);
    }

    #[test]
    fn test_same_seed_same_placement() {
        let config = WorldConfig::new(10)
            .with_seed(42)
            .with_room(RoomConfig::new("main").with_object("apple").with_object("pear"));
        let a = World::new(&config).unwrap();
        let b = World::new(&config).unwrap();
        assert_eq!(a.registry().agent().position, b.registry().agent().position);
        for (x, y) in a.registry().objects().iter().zip(b.registry().objects()) {
            assert_eq!(x.item.position, y.item.position);
        }
    }

    #[test]
    fn test_layout_errors_surface() {
        let config = WorldConfig::new(4)
            .with_room(RoomConfig::new("room_a").opened())
            .with_room(RoomConfig::new("room_b").opened());
        assert!(matches!(
            World::new(&config),
            Err(ConfigError::RoomsDoNotFit { rooms: 2, .. })
        ));
    }

    #[test]
    fn test_snapshot_reflects_registry() {
        let config = WorldConfig::new(6)
            .with_seed(3)
            .with_agent_start(Position::new(3, 3))
            .with_room(RoomConfig::new("main").with_object("apple"));
        let world = World::new(&config).unwrap();
        let snapshot = world.snapshots().latest();
        assert_eq!(snapshot.agent, Position::new(3, 3));
        assert_eq!(snapshot.items.len(), 1);
        assert!(snapshot.items[0].visible);
        assert_eq!(snapshot.doors[0].name, "main_door");
    }
}
