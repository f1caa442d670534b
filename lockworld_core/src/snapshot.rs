//! Read-only views of the world for observers running on other threads.
//!
//! The control thread publishes a fresh immutable [`WorldSnapshot`] after every
//! mutation. Readers hold the lock only long enough to clone an `Arc`, so they
//! never see a half-applied step and never stall the control thread.

use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;

use crate::{Position, registry::Registry, topology::Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ItemKind {
    Key,
    Object,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomView {
    pub name: String,
    pub bounds: Rect,
    pub open: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoorView {
    pub name: String,
    pub position: Position,
    pub open: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemView {
    pub name: String,
    pub kind: ItemKind,
    /// `None` while the agent carries the item.
    pub position: Option<Position>,
    /// Lies on the grid inside an open room.
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorldSnapshot {
    /// Increases by one with every publication.
    pub version: u64,
    pub size: usize,
    pub agent: Position,
    pub rooms: Vec<RoomView>,
    pub doors: Vec<DoorView>,
    pub items: Vec<ItemView>,
}

impl WorldSnapshot {
    pub fn capture(version: u64, size: usize, registry: &Registry) -> Self {
        let rooms = registry
            .rooms()
            .iter()
            .map(|room| RoomView {
                name: room.name.clone(),
                bounds: room.bounds,
                open: registry.door(room.door).open,
            })
            .collect();
        let doors = registry
            .doors()
            .iter()
            .map(|door| DoorView {
                name: door.name.clone(),
                position: door.position,
                open: door.open,
            })
            .collect();
        let keys = registry
            .keys()
            .iter()
            .map(|key| (ItemKind::Key, &key.item));
        let objects = registry
            .objects()
            .iter()
            .map(|object| (ItemKind::Object, &object.item));
        let items = keys
            .chain(objects)
            .map(|(kind, item)| ItemView {
                name: item.name.clone(),
                kind,
                position: (!item.held).then_some(item.position),
                visible: registry.is_visible(item),
            })
            .collect();

        Self {
            version,
            size,
            agent: registry.agent().position,
            rooms,
            doors,
            items,
        }
    }

    /// The item lying on `pos`, if any is visible there.
    pub fn visible_item_at(&self, pos: Position) -> Option<&ItemView> {
        self.items
            .iter()
            .find(|item| item.visible && item.position == Some(pos))
    }

    /// The room whose bounds contain `pos`, ignoring the main room.
    pub fn sub_room_at(&self, pos: Position) -> Option<&RoomView> {
        self.rooms
            .iter()
            .skip(1)
            .find(|room| room.bounds.contains(pos))
    }
}

/// Shared handle to the latest snapshot. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SnapshotHandle {
    latest: Arc<RwLock<Arc<WorldSnapshot>>>,
}

impl SnapshotHandle {
    pub(crate) fn new(initial: WorldSnapshot) -> Self {
        Self {
            latest: Arc::new(RwLock::new(Arc::new(initial))),
        }
    }

    /// The most recently published snapshot.
    pub fn latest(&self) -> Arc<WorldSnapshot> {
        // A panicking writer cannot leave a torn snapshot behind, the swap is a single store.
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn publish(&self, snapshot: WorldSnapshot) {
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn empty(version: u64) -> WorldSnapshot {
        WorldSnapshot {
            version,
            size: 4,
            agent: Position::new(version as usize % 4, 0),
            rooms: Vec::new(),
            doors: Vec::new(),
            items: Vec::new(),
        }
    }

    #[test]
    fn test_publish_replaces_latest() {
        let handle = SnapshotHandle::new(empty(0));
        let before = handle.latest();
        handle.publish(empty(1));
        assert_eq!(before.version, 0);
        assert_eq!(handle.latest().version, 1);
    }

    #[test]
    fn test_reader_on_other_thread_sees_monotonic_versions() {
        let handle = SnapshotHandle::new(empty(0));
        let reader = handle.clone();
        let observer = thread::spawn(move || {
            let mut last = 0;
            for _ in 0..1000 {
                let snapshot = reader.latest();
                assert!(snapshot.version >= last);
                assert_eq!(snapshot.agent.x, snapshot.version as usize % 4);
                last = snapshot.version;
            }
        });
        for version in 1..=1000 {
            handle.publish(empty(version));
        }
        observer.join().unwrap();
    }
}
