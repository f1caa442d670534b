use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::Position;

/// One of the four axis-aligned unit steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// Fixed expansion order, so searches are deterministic.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// Returns the direction leading from `from` to the adjacent cell `to`,
    /// or `None` if the cells are not 4-neighbours.
    pub fn between(from: Position, to: Position) -> Option<Direction> {
        let dx = to.x as isize - from.x as isize;
        let dy = to.y as isize - from.y as isize;
        match (dx, dy) {
            (0, -1) => Some(Direction::North),
            (1, 0) => Some(Direction::East),
            (0, 1) => Some(Direction::South),
            (-1, 0) => Some(Direction::West),
            _ => None,
        }
    }

    fn delta(self) -> (isize, isize) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }
}

/// A dense 2D grid.
///
/// Cells are stored row-major in a flat vector and addressed by [`Position`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a grid with every cell set to a clone of `value`.
    pub fn filled(width: usize, height: usize, value: T) -> Self
    where
        T: Clone,
    {
        Grid {
            width,
            height,
            cells: vec![value; width * height],
        }
    }

    /// Creates a grid whose cells are produced by `f`, called once per cell in row-major order.
    pub fn from_generator<F>(width: usize, height: usize, mut f: F) -> Self
    where
        F: FnMut(Position) -> T,
    {
        let mut cells = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                cells.push(f(Position { x, y }));
            }
        }
        Grid {
            width,
            height,
            cells,
        }
    }

    /// Number of columns.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Checks whether `pos` lies inside the grid.
    ///
    /// # Arguments
    ///
    /// * `pos`: The cell to test.
    #[inline]
    pub fn contains(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    #[inline]
    fn index_of(&self, pos: Position) -> Option<usize> {
        self.contains(pos).then(|| pos.y * self.width + pos.x)
    }

    /// Returns `None` if `pos` is out of bounds.
    pub fn get(&self, pos: Position) -> Option<&T> {
        self.index_of(pos).and_then(|index| self.cells.get(index))
    }

    /// Returns `None` if `pos` is out of bounds.
    pub fn get_mut(&mut self, pos: Position) -> Option<&mut T> {
        self.index_of(pos).and_then(|index| self.cells.get_mut(index))
    }

    /// The cell one step from `pos` in `direction`, if it lies inside the grid.
    pub fn neighbor(&self, pos: Position, direction: Direction) -> Option<Position> {
        let (dx, dy) = direction.delta();
        let next = Position {
            x: pos.x.checked_add_signed(dx)?,
            y: pos.y.checked_add_signed(dy)?,
        };
        self.contains(next).then_some(next)
    }

    /// Iterates `(position, &cell)` in row-major order.
    pub fn enumerate(&self) -> impl Iterator<Item = (Position, &T)> {
        let width = self.width;
        self.cells.iter().enumerate().map(move |(index, cell)| {
            (
                Position {
                    x: index % width,
                    y: index / width,
                },
                cell,
            )
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.cells.iter()
    }
}

impl<T> Index<Position> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, pos: Position) -> &Self::Output {
        match self.index_of(pos) {
            Some(idx) => &self.cells[idx],
            None => panic!(
                "Grid index {} out of bounds for grid size ({}, {})",
                pos, self.width, self.height
            ),
        }
    }
}

impl<T> IndexMut<Position> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, pos: Position) -> &mut Self::Output {
        let (width, height) = (self.width, self.height);
        match self.index_of(pos) {
            Some(idx) => &mut self.cells[idx],
            None => panic!(
                "Grid index {} out of bounds for grid size ({}, {})",
                pos, width, height
            ),
        }
    }
}
