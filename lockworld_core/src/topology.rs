//! Static room geometry.
//!
//! Sub-rooms are equally sized rectangles tiled left to right along the top
//! edge of the world and then along the bottom edge. Every cell that is not
//! inside a sub-room belongs to the main room, which always keeps a full-width
//! band of rows between the two room rows and is therefore connected.

use serde::{Deserialize, Serialize};

use crate::{MAIN_ROOM, MAIN_ROOM_ID, Position, RoomId, error::ConfigError, map::Grid};

/// Axis-aligned rectangle of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= self.x
            && pos.x < self.x + self.width
            && pos.y >= self.y
            && pos.y < self.y + self.height
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Position> + use<> {
        let Rect {
            x,
            y,
            width,
            height,
        } = *self;
        (y..y + height).flat_map(move |row| (x..x + width).map(move |col| Position::new(col, row)))
    }
}

/// Geometry of one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomLayout {
    pub name: String,
    pub bounds: Rect,
    /// Door cell. For sub-rooms it lies on the room's edge facing the main room.
    pub door: Position,
    /// Main-room cell in front of the door. `None` for the main room's virtual door.
    pub exterior: Option<Position>,
}

#[derive(Debug, Clone)]
pub struct Topology {
    size: usize,
    rooms: Vec<RoomLayout>,
    room_map: Grid<RoomId>,
}

impl Topology {
    /// Lays out `sub_rooms` (main room excluded) inside a `size`x`size` world.
    pub fn new(
        size: usize,
        sub_rooms: &[String],
        room_width: usize,
        room_height: usize,
    ) -> Result<Self, ConfigError> {
        if size == 0 {
            return Err(ConfigError::WorldTooSmall { size });
        }
        if room_width == 0 || room_height == 0 {
            return Err(ConfigError::InvalidRoomSize {
                width: room_width,
                height: room_height,
            });
        }

        let does_not_fit = || ConfigError::RoomsDoNotFit {
            rooms: sub_rooms.len(),
            width: room_width,
            height: room_height,
            size,
        };

        let per_row = size / room_width;
        let rows = if sub_rooms.is_empty() {
            0
        } else if per_row == 0 {
            return Err(does_not_fit());
        } else {
            sub_rooms.len().div_ceil(per_row)
        };
        // At most a top and a bottom row, and at least one row of main room between them.
        if rows > 2 || rows * room_height >= size {
            return Err(does_not_fit());
        }

        let band_top = if rows >= 1 { room_height } else { 0 };
        let band_bottom = if rows == 2 { size - room_height } else { size };
        let mut rooms = vec![RoomLayout {
            name: MAIN_ROOM.to_string(),
            bounds: Rect {
                x: 0,
                y: 0,
                width: size,
                height: size,
            },
            door: Position::new(size / 2, band_top + (band_bottom - band_top) / 2),
            exterior: None,
        }];

        for (index, name) in sub_rooms.iter().enumerate() {
            let top_row = index < per_row;
            let column = if top_row { index } else { index - per_row };
            let x = column * room_width;
            let door_x = x + room_width / 2;
            let (y, door, exterior) = if top_row {
                (
                    0,
                    Position::new(door_x, room_height - 1),
                    Position::new(door_x, room_height),
                )
            } else {
                let y = size - room_height;
                (y, Position::new(door_x, y), Position::new(door_x, y - 1))
            };
            rooms.push(RoomLayout {
                name: name.clone(),
                bounds: Rect {
                    x,
                    y,
                    width: room_width,
                    height: room_height,
                },
                door,
                exterior: Some(exterior),
            });
        }

        let room_map = Grid::from_generator(size, size, |pos| {
            rooms
                .iter()
                .enumerate()
                .skip(1)
                .find(|(_, room)| room.bounds.contains(pos))
                .map_or(MAIN_ROOM_ID, |(id, _)| id)
        });

        Ok(Self {
            size,
            rooms,
            room_map,
        })
    }

    /// Side length of the square world.
    pub fn size(&self) -> usize {
        self.size
    }

    /// All rooms, main room first.
    pub fn rooms(&self) -> &[RoomLayout] {
        &self.rooms
    }

    /// Geometry of room `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a room of this topology.
    pub fn room(&self, id: RoomId) -> &RoomLayout {
        &self.rooms[id]
    }

    /// The room owning `pos`. Out-of-bounds cells count as main room.
    pub fn room_at(&self, pos: Position) -> RoomId {
        self.room_map.get(pos).copied().unwrap_or(MAIN_ROOM_ID)
    }

    /// Cells whose interior belongs to `id`, in row-major order.
    pub fn room_cells(&self, id: RoomId) -> Vec<Position> {
        self.room_map
            .enumerate()
            .filter(|(_, owner)| **owner == id)
            .map(|(pos, _)| pos)
            .collect()
    }

    /// Checks whether `pos` lies inside the world.
    pub fn contains(&self, pos: Position) -> bool {
        self.room_map.contains(pos)
    }

    pub(crate) fn room_map(&self) -> &Grid<RoomId> {
        &self.room_map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("room_{i}")).collect()
    }

    #[test]
    fn test_main_only_world() {
        let topology = Topology::new(5, &[], 3, 3).unwrap();
        assert_eq!(topology.rooms().len(), 1);
        assert_eq!(topology.room_cells(MAIN_ROOM_ID).len(), 25);
        assert_eq!(topology.room(MAIN_ROOM_ID).door, Position::new(2, 2));
    }

    #[test]
    fn test_top_row_room_door_faces_main() {
        let topology = Topology::new(10, &names(1), 3, 3).unwrap();
        let room = topology.room(1);
        assert_eq!(room.bounds, Rect { x: 0, y: 0, width: 3, height: 3 });
        assert_eq!(room.door, Position::new(1, 2));
        assert_eq!(room.exterior, Some(Position::new(1, 3)));
        assert_eq!(topology.room_at(room.door), 1);
        assert_eq!(topology.room_at(Position::new(1, 3)), MAIN_ROOM_ID);
        assert_eq!(topology.room_at(Position::new(3, 0)), MAIN_ROOM_ID);
    }

    #[test]
    fn test_rooms_wrap_to_bottom_row() {
        // Three rooms per row in a 10-wide world.
        let topology = Topology::new(10, &names(4), 3, 3).unwrap();
        let fourth = topology.room(4);
        assert_eq!(fourth.bounds, Rect { x: 0, y: 7, width: 3, height: 3 });
        assert_eq!(fourth.door, Position::new(1, 7));
        assert_eq!(fourth.exterior, Some(Position::new(1, 6)));
        assert_eq!(topology.room(MAIN_ROOM_ID).door, Position::new(5, 5));
    }

    #[test]
    fn test_room_interiors_are_disjoint() {
        let topology = Topology::new(10, &names(6), 3, 3).unwrap();
        let total: usize = (0..topology.rooms().len())
            .map(|id| topology.room_cells(id).len())
            .sum();
        assert_eq!(total, 100);
        for id in 1..topology.rooms().len() {
            assert_eq!(topology.room_cells(id).len(), 9);
        }
    }

    #[test]
    fn test_too_many_rooms() {
        let err = Topology::new(10, &names(7), 3, 3).unwrap_err();
        assert!(matches!(err, ConfigError::RoomsDoNotFit { rooms: 7, .. }));
    }

    #[test]
    fn test_no_main_band_left() {
        assert!(Topology::new(6, &names(4), 3, 3).is_err());
        assert!(Topology::new(3, &names(1), 3, 3).is_err());
        assert!(Topology::new(4, &names(1), 3, 3).is_ok());
    }

    #[test]
    fn test_invalid_sizes() {
        assert!(matches!(
            Topology::new(0, &[], 3, 3),
            Err(ConfigError::WorldTooSmall { size: 0 })
        ));
        assert!(matches!(
            Topology::new(5, &names(1), 0, 3),
            Err(ConfigError::InvalidRoomSize { .. })
        ));
        assert!(matches!(
            Topology::new(2, &names(1), 3, 1),
            Err(ConfigError::RoomsDoNotFit { .. })
        ));
    }
}
