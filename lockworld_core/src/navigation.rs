//! The live navigation graph.
//!
//! Nodes are grid cells the agent may currently stand on, edges are 4-neighbour
//! steps. The graph starts out as the main room only. Every locked room keeps
//! its interior as a pre-built subgraph which is merged in, together with the
//! single edge through its door, when the room is opened.

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::{
    MAIN_ROOM_ID, Position, RoomId,
    map::{Direction, Grid},
    topology::Topology,
};

/// Edges leaving one node, one bit per direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Links(u8);

impl Links {
    fn bit(direction: Direction) -> u8 {
        match direction {
            Direction::North => 1,
            Direction::East => 2,
            Direction::South => 4,
            Direction::West => 8,
        }
    }

    fn has(self, direction: Direction) -> bool {
        self.0 & Self::bit(direction) != 0
    }

    fn insert(&mut self, direction: Direction) {
        self.0 |= Self::bit(direction);
    }

    fn count(self) -> usize {
        self.0.count_ones() as usize
    }
}

/// The interior of a locked room, waiting to be merged.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RoomSubgraph {
    nodes: Vec<Position>,
    edges: Vec<(Position, Position)>,
    /// Door cell and the main-room cell in front of it.
    bridge: (Position, Position),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationGraph {
    /// `None` marks a cell that is not a node.
    cells: Grid<Option<Links>>,
    /// Subgraphs of rooms that are still closed.
    closed: HashMap<RoomId, RoomSubgraph>,
}

impl NavigationGraph {
    /// Builds the graph with every sub-room closed.
    pub fn build(topology: &Topology) -> Self {
        let room_map = topology.room_map();
        let mut graph = Self {
            cells: Grid::from_generator(room_map.width(), room_map.height(), |pos| {
                (room_map[pos] == MAIN_ROOM_ID).then(Links::default)
            }),
            closed: HashMap::new(),
        };

        for pos in topology.room_cells(MAIN_ROOM_ID) {
            for direction in [Direction::East, Direction::South] {
                if let Some(next) = room_map.neighbor(pos, direction) {
                    if room_map[next] == MAIN_ROOM_ID {
                        graph.add_edge(pos, next);
                    }
                }
            }
        }

        for (id, room) in topology.rooms().iter().enumerate().skip(1) {
            let Some(exterior) = room.exterior else {
                continue;
            };
            let nodes: Vec<Position> = room.bounds.cells().collect();
            let edges = nodes
                .iter()
                .flat_map(|&pos| {
                    [Direction::East, Direction::South]
                        .into_iter()
                        .filter_map(move |direction| room_map.neighbor(pos, direction))
                        .filter(|next| room.bounds.contains(*next))
                        .map(move |next| (pos, next))
                })
                .collect();
            graph.closed.insert(
                id,
                RoomSubgraph {
                    nodes,
                    edges,
                    bridge: (room.door, exterior),
                },
            );
        }

        graph
    }

    pub fn contains(&self, pos: Position) -> bool {
        matches!(self.cells.get(pos), Some(Some(_)))
    }

    pub fn has_edge(&self, a: Position, b: Position) -> bool {
        match (Direction::between(a, b), self.cells.get(a)) {
            (Some(direction), Some(Some(links))) => links.has(direction),
            _ => false,
        }
    }

    pub fn node_count(&self) -> usize {
        self.cells.iter().flatten().count()
    }

    pub fn edge_count(&self) -> usize {
        self.cells.iter().flatten().map(|links| links.count()).sum::<usize>() / 2
    }

    /// Whether `room`'s interior is part of the graph. The main room always is.
    pub fn is_open(&self, room: RoomId) -> bool {
        !self.closed.contains_key(&room)
    }

    /// Nodes adjacent to `pos` through an edge.
    pub fn neighbors(&self, pos: Position) -> impl Iterator<Item = Position> + '_ {
        let links = self.cells.get(pos).copied().flatten().unwrap_or_default();
        Direction::ALL
            .into_iter()
            .filter(move |direction| links.has(*direction))
            .filter_map(move |direction| self.cells.neighbor(pos, direction))
    }

    /// Breadth-first shortest path. All edges weigh one, so BFS order is
    /// Dijkstra order.
    ///
    /// The returned cells exclude `from` and end with `to`; an empty path means
    /// the agent is already there. `None` if either end is not a node or no
    /// path connects them.
    pub fn shortest_path(&self, from: Position, to: Position) -> Option<Vec<Position>> {
        if !self.contains(from) || !self.contains(to) {
            return None;
        }
        if from == to {
            return Some(Vec::new());
        }

        let mut came_from: Grid<Option<Position>> =
            Grid::filled(self.cells.width(), self.cells.height(), None);
        let mut frontier = VecDeque::from([from]);
        came_from[from] = Some(from);

        while let Some(current) = frontier.pop_front() {
            if current == to {
                break;
            }
            for next in self.neighbors(current) {
                if came_from[next].is_none() {
                    came_from[next] = Some(current);
                    frontier.push_back(next);
                }
            }
        }

        came_from[to]?;
        let mut path = vec![to];
        let mut current = to;
        while let Some(previous) = came_from[current].filter(|previous| *previous != from) {
            path.push(previous);
            current = previous;
        }
        path.reverse();
        Some(path)
    }

    /// Merges `room`'s interior and its door edge into the graph.
    ///
    /// Returns `false` and leaves the graph untouched if the room is already open.
    pub fn open_room(&mut self, room: RoomId) -> bool {
        let Some(subgraph) = self.closed.remove(&room) else {
            return false;
        };
        for &pos in &subgraph.nodes {
            if let Some(cell) = self.cells.get_mut(pos) {
                cell.get_or_insert_with(Links::default);
            }
        }
        for &(a, b) in &subgraph.edges {
            self.add_edge(a, b);
        }
        let (door, exterior) = subgraph.bridge;
        self.add_edge(door, exterior);
        debug!(
            room,
            nodes = subgraph.nodes.len(),
            edges = subgraph.edges.len() + 1,
            "merged room into navigation graph"
        );
        true
    }

    /// Links two adjacent nodes in both directions. Adding an existing edge is a no-op.
    fn add_edge(&mut self, a: Position, b: Position) {
        let Some(direction) = Direction::between(a, b) else {
            return;
        };
        if !self.contains(a) || !self.contains(b) {
            return;
        }
        if let Some(Some(links)) = self.cells.get_mut(a) {
            links.insert(direction);
        }
        if let Some(Some(links)) = self.cells.get_mut(b) {
            links.insert(direction.opposite());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn one_room_world() -> (Topology, NavigationGraph) {
        let topology = Topology::new(10, &["room_a".to_string()], 3, 3).unwrap();
        let graph = NavigationGraph::build(&topology);
        (topology, graph)
    }

    fn is_valid_walk(graph: &NavigationGraph, from: Position, path: &[Position]) -> bool {
        let mut current = from;
        for &next in path {
            if !graph.has_edge(current, next) {
                return false;
            }
            current = next;
        }
        true
    }

    #[test]
    fn test_closed_room_is_not_in_graph() {
        let (topology, graph) = one_room_world();
        assert_eq!(graph.node_count(), 100 - 9);
        for pos in topology.room_cells(1) {
            assert!(!graph.contains(pos));
        }
        assert!(!graph.is_open(1));
        assert!(graph.is_open(MAIN_ROOM_ID));
    }

    #[test]
    fn test_path_into_closed_room_is_unreachable() {
        let (topology, graph) = one_room_world();
        let inside = Position::new(0, 0);
        assert_eq!(topology.room_at(inside), 1);
        assert_eq!(graph.shortest_path(Position::new(9, 9), inside), None);
    }

    #[test]
    fn test_walls_around_closed_room() {
        let (_, graph) = one_room_world();
        // (3, 0) is main room, next to the room's east wall.
        assert!(graph.contains(Position::new(3, 0)));
        assert!(!graph.has_edge(Position::new(3, 0), Position::new(2, 0)));
    }

    #[test]
    fn test_open_room_adds_interior_and_single_bridge() {
        let (topology, mut graph) = one_room_world();
        let nodes_before = graph.node_count();
        let edges_before = graph.edge_count();

        assert!(graph.open_room(1));

        // 9 nodes, 12 internal edges of a 3x3 block, one door edge.
        assert_eq!(graph.node_count(), nodes_before + 9);
        assert_eq!(graph.edge_count(), edges_before + 13);

        let room = topology.room(1);
        let exterior = room.exterior.unwrap();
        assert!(graph.has_edge(room.door, exterior));
        // Only the door edge crosses the room boundary.
        assert!(!graph.has_edge(Position::new(0, 2), Position::new(0, 3)));
        assert!(!graph.has_edge(Position::new(2, 1), Position::new(3, 1)));
    }

    #[test]
    fn test_path_through_door() {
        let (_, mut graph) = one_room_world();
        graph.open_room(1);

        let from = Position::new(0, 4);
        let to = Position::new(0, 0);
        let path = graph.shortest_path(from, to).unwrap();
        // (0,4) -> (1,4) -> (1,3) -> (1,2) door -> (1,1) -> (1,0) -> (0,0)
        assert_eq!(path.len(), 6);
        assert!(path.contains(&Position::new(1, 2)));
        assert_eq!(path.last(), Some(&to));
        assert!(is_valid_walk(&graph, from, &path));
    }

    #[test]
    fn test_open_room_twice_is_idempotent() {
        let (_, mut once) = one_room_world();
        once.open_room(1);
        let mut twice = once.clone();
        assert!(!twice.open_room(1));
        assert_eq!(once, twice);
        assert_eq!(once.node_count(), twice.node_count());
        assert_eq!(once.edge_count(), twice.edge_count());
    }

    #[test]
    fn test_open_main_room_is_noop() {
        let (_, mut graph) = one_room_world();
        let before = graph.clone();
        assert!(!graph.open_room(MAIN_ROOM_ID));
        assert_eq!(graph, before);
    }

    #[test]
    fn test_path_to_self_is_empty() {
        let (_, graph) = one_room_world();
        let here = Position::new(5, 5);
        assert_eq!(graph.shortest_path(here, here), Some(vec![]));
    }

    proptest! {
        #[test]
        fn shortest_path_is_manhattan_in_open_grid(
            size in 1usize..12,
            ax in 0usize..12, ay in 0usize..12,
            bx in 0usize..12, by in 0usize..12,
        ) {
            let topology = Topology::new(size, &[], 1, 1).unwrap();
            let graph = NavigationGraph::build(&topology);
            let a = Position::new(ax % size, ay % size);
            let b = Position::new(bx % size, by % size);

            let path = graph.shortest_path(a, b);
            prop_assert!(path.is_some());
            let path = path.unwrap();
            prop_assert_eq!(path.len(), a.manhattan_distance(&b));
            prop_assert!(is_valid_walk(&graph, a, &path));
        }

        #[test]
        fn open_room_is_idempotent(rooms in 1usize..=6, pick in 0usize..6, repeats in 1usize..4) {
            let names: Vec<String> = (0..rooms).map(|i| format!("room_{i}")).collect();
            let topology = Topology::new(10, &names, 3, 3).unwrap();
            let room = 1 + pick % rooms;

            let mut once = NavigationGraph::build(&topology);
            once.open_room(room);
            let mut many = NavigationGraph::build(&topology);
            for _ in 0..repeats {
                many.open_room(room);
            }
            prop_assert_eq!(&once, &many);
            prop_assert_eq!(once.node_count(), 100 - 9 * (rooms - 1));
        }
    }
}
