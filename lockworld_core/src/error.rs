use crate::Position;

/// Why a command was rejected. Every variant is raised before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("there is nothing called '{name}'")]
    EntityNotFound { name: String },

    #[error("'{name}' is not a {expected}")]
    InvalidTarget { name: String, expected: &'static str },

    #[error("the agent at {agent} is not at {name} ({item}); move there first")]
    NotColocated {
        name: String,
        item: Position,
        agent: Position,
    },

    #[error("{name} is already held")]
    AlreadyHeld { name: String },

    #[error("{name} is not held; pick it up first")]
    NotHeld { name: String },

    #[error("{key} does not open {door}; it needs {expected}")]
    WrongKey {
        door: String,
        key: String,
        expected: String,
    },

    #[error(
        "cannot reach {target}{}",
        .door.as_ref().map(|door| format!(": {door} is closed")).unwrap_or_default()
    )]
    Unreachable {
        target: String,
        door: Option<String>,
    },
}

/// A room layout that cannot be turned into a world.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid world configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("world size must be at least 1, got {size}")]
    WorldTooSmall { size: usize },

    #[error("rooms must be at least 1x1, got {width}x{height}")]
    InvalidRoomSize { width: usize, height: usize },

    #[error(
        "{rooms} rooms of {width}x{height} do not fit into a {size}x{size} world with a main area left over"
    )]
    RoomsDoNotFit {
        rooms: usize,
        width: usize,
        height: usize,
        size: usize,
    },

    #[error("the name '{0}' is used more than once")]
    DuplicateName(String),

    #[error("key '{key}' unlocks unknown room '{room}'")]
    UnknownRoom { key: String, room: String },

    #[error("key '{key}' cannot unlock the main room")]
    MainRoomKey { key: String },

    #[error("room '{room}' is locked but no key opens it")]
    MissingKey { room: String },

    #[error("room '{room}' has more than one key")]
    DuplicateKey { room: String },

    #[error("key '{key}' lies inside '{room}', the locked room it opens")]
    KeyInsideRoom { key: String, room: String },

    #[error("room '{room}' holds {items} items but only has {cells} free cells")]
    RoomFull {
        room: String,
        items: usize,
        cells: usize,
    },

    #[error("agent start {position} is not a cell of the main room")]
    InvalidAgentStart { position: Position },
}

/// A textual command that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}'")]
    Unknown(String),

    #[error("{command} takes {expected} argument(s), got {found}")]
    Arity {
        command: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("unbalanced parentheses in '{0}'")]
    Malformed(String),
}
