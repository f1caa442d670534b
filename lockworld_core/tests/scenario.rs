use std::{collections::HashSet, thread, time::Duration};

use lockworld_core::{
    ActionError, Command, Position, World, WorldConfig,
    config::RoomConfig,
};

fn key_room_world(delay: Duration) -> World {
    let config = WorldConfig::new(10)
        .with_seed(2024)
        .with_step_delay(delay)
        .with_room(RoomConfig::new("main").with_key("key_a", "room_a"))
        .with_room(RoomConfig::new("room_a").with_object("gem"));
    World::new(&config).expect("valid layout")
}

#[test]
fn unlock_room_and_reach_gem() {
    let mut world = key_room_world(Duration::ZERO);

    let report = world.explore();
    assert_eq!(report.keys, vec!["key_a"]);
    assert!(report.objects.is_empty());
    assert_eq!(report.closed_doors, vec!["room_a_door"]);

    match world.goto("gem") {
        Err(ActionError::Unreachable { target, door }) => {
            assert_eq!(target, "gem");
            assert_eq!(door.as_deref(), Some("room_a_door"));
        }
        other => panic!("expected Unreachable, got {other:?}"),
    }

    world.goto("key_a").unwrap();
    world.pick("key_a").unwrap();
    world.open("room_a", "key_a").unwrap();

    let report = world.explore();
    assert_eq!(report.objects, vec!["gem"]);
    assert!(report.closed_doors.is_empty());
    assert_eq!(report.held, vec!["key_a"]);

    assert_eq!(world.goto("gem").unwrap(), "Moved to gem.");
    let gem = world.registry().objects()[0].item.position;
    assert_eq!(world.registry().agent().position, gem);
    world.pick("gem").unwrap();
    world.goto("main").unwrap();
    world.drop("gem").unwrap();
    assert_eq!(world.explore().objects, vec!["gem"]);
}

#[test]
fn scripted_commands_solve_the_world() {
    let mut world = key_room_world(Duration::ZERO);
    let script = [
        "EXPLORE()",
        "MOVETO(key_a)",
        "PICKUP(key_a)",
        "OPENDOOR(room_a, key_a)",
        "MOVETO(gem)",
        "PICKUP(gem)",
        "FINISHED",
    ];
    for line in script {
        let command: Command = line.parse().unwrap();
        world
            .execute(&command)
            .unwrap_or_else(|err| panic!("{line} failed: {err}"));
    }
    assert!(world.registry().objects()[0].item.held);
}

#[test]
fn failed_commands_leave_world_untouched() {
    let mut world = key_room_world(Duration::ZERO);
    let before = world.snapshots().latest();

    assert!(world.goto("gem").is_err());
    assert!(world.pick("key_a").is_err());
    assert!(world.drop("key_a").is_err());
    assert!(world.open("room_a", "key_a").is_err());
    assert!(world.goto("nothing here").is_err());

    assert_eq!(world.snapshots().latest(), before);
}

#[test]
fn observer_sees_every_step() {
    let mut world = key_room_world(Duration::from_millis(5));
    let start = world.registry().agent().position;
    let key = world.registry().key(0).item.position;
    let expected = world
        .graph()
        .shortest_path(start, key)
        .expect("key lies in the main room");

    let snapshots = world.snapshots();
    let observer = thread::spawn(move || {
        let mut seen = HashSet::new();
        let mut last_version = 0;
        loop {
            let snapshot = snapshots.latest();
            assert!(snapshot.version >= last_version);
            last_version = snapshot.version;
            seen.insert(snapshot.agent);
            if snapshot.agent == key {
                return seen;
            }
            thread::sleep(Duration::from_millis(1));
        }
    });

    world.goto("key_a").unwrap();
    let seen: HashSet<Position> = observer.join().unwrap();
    assert!(seen.contains(&key));
    // Every observed position lies on the walked path.
    assert!(seen.iter().all(|cell| *cell == start || expected.contains(cell)));
}

#[test]
fn shipped_script_solves_shipped_config() {
    let mut config = WorldConfig::from_json_str(include_str!("../../configs/simple_room.json"))
        .expect("shipped config parses");
    config.step_delay_ms = 0;
    let mut world = World::new(&config).expect("shipped config builds");

    for line in include_str!("../../scripts/simple_room.txt").lines() {
        let command: Command = line.parse().unwrap();
        world
            .execute(&command)
            .unwrap_or_else(|err| panic!("{line} failed: {err}"));
    }

    let report = world.explore();
    assert!(report.closed_doors.is_empty());
    assert!(report.held.contains(&"kitchen_key".to_string()));
    let table = world.registry().objects()[0].item.position;
    for object in &world.registry().objects()[1..] {
        assert_eq!(object.item.position, table);
    }
}
