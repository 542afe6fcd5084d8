//! The closed set of domain events a node can report.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Free-form key/value payload attached by the host application.
///
/// The relay never inspects it; it is stored and forwarded verbatim.
pub type Detail = serde_json::Map<String, serde_json::Value>;

/// A scalar game setting value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

/// A point on the game map, encoded as a two-element `[x, y]` array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position(pub f64, pub f64);

/// The state of a player at the moment they spawn into a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    /// Identity of the player within this game.
    pub uuid: String,
    /// Numeric in-game player id.
    pub id: u32,
    /// Identity of the connection that controls the player.
    pub owner_uuid: String,
    /// Cosmetic slot (`hat`, `pet`, `skin`, `color`, ...) to item id.
    pub cosmetics: BTreeMap<String, i64>,
}

/// Coarse grouping of event variants, used for log fields and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    Lobby,
    Game,
    Player,
    Meeting,
    Sabotage,
    Map,
    Chat,
}

impl EventCategory {
    /// Returns the canonical lowercase label for this category.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lobby => "lobby",
            Self::Game => "game",
            Self::Player => "player",
            Self::Meeting => "meeting",
            Self::Sabotage => "sabotage",
            Self::Map => "map",
            Self::Chat => "chat",
        }
    }
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One discrete occurrence on a game server node.
///
/// Identity fields (`*Uuid`) are opaque strings minted by the host
/// application. `Option` fields are omitted from the JSON when absent and
/// read back as `None`; there is no sentinel value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Event {
    // ── Lobby ────────────────────────────────────────────────────────
    /// A lobby was created by a connection.
    LobbyCreated {
        creator_uuid: String,
        lobby_uuid: String,
        /// The join code shown to players.
        code: String,
    },

    /// A connection joined a lobby.
    LobbyJoined {
        lobby_uuid: String,
        connection_uuid: String,
        connection_id: u32,
    },

    /// A connection left its lobby.
    LobbyLeft { connection_uuid: String },

    /// Lobby host privileges moved from one connection to another.
    HostReassigned { from_uuid: String, to_uuid: String },

    /// A lobby was torn down.
    LobbyDestroyed { lobby_uuid: String },

    /// A looking-for-group announcement was posted for a lobby.
    LfgFired {
        lobby_uuid: String,
        discord_channel_id: u64,
    },

    // ── Game ─────────────────────────────────────────────────────────
    /// The settings a game was started with.
    GameSettings {
        game_uuid: String,
        settings: BTreeMap<String, Scalar>,
    },

    /// A game was started from a lobby.
    GameCreated {
        lobby_uuid: String,
        game_uuid: String,
    },

    /// A player entered the game world.
    GamePlayerSpawned {
        game_uuid: String,
        player: PlayerSnapshot,
        detail: Detail,
        /// Task ids assigned to the player.
        tasks: Vec<u32>,
    },

    /// A custom, positioned game occurrence began.
    GameEvent {
        game_uuid: String,
        event_uuid: String,
        position: Position,
        starter_uuid: String,
        detail: Detail,
    },

    /// A custom game occurrence finished.
    GameEventEnded { event_uuid: String, detail: Detail },

    /// A game finished.
    GameEnded {
        reason: Detail,
        winner_uuids: Vec<String>,
        game_uuid: String,
    },

    // ── Player ───────────────────────────────────────────────────────
    PlayerMove {
        player_uuid: String,
        position: Position,
    },

    PlayerTaskCompleted { player_uuid: String, task: u32 },

    /// A player died. The cause, and the killer if any, live in `detail`.
    PlayerDiedEvent { player_uuid: String, detail: Detail },

    VentEntered { player_uuid: String, vent_id: u32 },

    VentExited { player_uuid: String, vent_id: u32 },

    // ── Meeting ──────────────────────────────────────────────────────
    MeetingCreated {
        game_uuid: String,
        meeting_uuid: String,
        caller_uuid: String,
    },

    /// A vote was cast. `accused_uuid` is absent for a skip vote.
    MeetingVote {
        meeting_uuid: String,
        accuser_uuid: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        accused_uuid: Option<String>,
    },

    /// A meeting concluded. `exiled_uuid` is absent when nobody was exiled.
    MeetingEnded {
        meeting_uuid: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exiled_uuid: Option<String>,
    },

    // ── Sabotage ─────────────────────────────────────────────────────
    /// A system was sabotaged. `caller_uuid` is absent when the environment
    /// triggered it rather than a player.
    SabotageStarted {
        sabotage_uuid: String,
        sabotage_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caller_uuid: Option<String>,
        detail: Detail,
    },

    SabotageEnded { sabotage_uuid: String, detail: Detail },

    // ── Map ──────────────────────────────────────────────────────────
    DoorClosed {
        game_uuid: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        closer_uuid: Option<String>,
        detail: Detail,
        door_ids: Vec<u32>,
    },

    DoorOpened {
        game_uuid: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        opener_uuid: Option<String>,
        detail: Detail,
        door_ids: Vec<u32>,
    },

    // ── Chat ─────────────────────────────────────────────────────────
    /// A chat message. Hosts may omit `lobby_uuid`; `game_uuid` is absent
    /// for messages sent in the lobby.
    PlayerChat {
        connection_uuid: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lobby_uuid: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        game_uuid: Option<String>,
        message: String,
    },
}

impl Event {
    /// Every discriminator this build of the schema knows how to read.
    pub const KNOWN_TYPES: &'static [&'static str] = &[
        "lobbyCreated",
        "lobbyJoined",
        "lobbyLeft",
        "hostReassigned",
        "lobbyDestroyed",
        "lfgFired",
        "gameSettings",
        "gameCreated",
        "gamePlayerSpawned",
        "gameEvent",
        "gameEventEnded",
        "gameEnded",
        "playerMove",
        "playerTaskCompleted",
        "playerDiedEvent",
        "ventEntered",
        "ventExited",
        "meetingCreated",
        "meetingVote",
        "meetingEnded",
        "sabotageStarted",
        "sabotageEnded",
        "doorClosed",
        "doorOpened",
        "playerChat",
    ];

    /// Returns `true` if `event_type` is a discriminator this schema defines.
    pub fn is_known_type(event_type: &str) -> bool {
        Self::KNOWN_TYPES.contains(&event_type)
    }

    /// Returns the `type` discriminator written for this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::LobbyCreated { .. } => "lobbyCreated",
            Self::LobbyJoined { .. } => "lobbyJoined",
            Self::LobbyLeft { .. } => "lobbyLeft",
            Self::HostReassigned { .. } => "hostReassigned",
            Self::LobbyDestroyed { .. } => "lobbyDestroyed",
            Self::LfgFired { .. } => "lfgFired",
            Self::GameSettings { .. } => "gameSettings",
            Self::GameCreated { .. } => "gameCreated",
            Self::GamePlayerSpawned { .. } => "gamePlayerSpawned",
            Self::GameEvent { .. } => "gameEvent",
            Self::GameEventEnded { .. } => "gameEventEnded",
            Self::GameEnded { .. } => "gameEnded",
            Self::PlayerMove { .. } => "playerMove",
            Self::PlayerTaskCompleted { .. } => "playerTaskCompleted",
            Self::PlayerDiedEvent { .. } => "playerDiedEvent",
            Self::VentEntered { .. } => "ventEntered",
            Self::VentExited { .. } => "ventExited",
            Self::MeetingCreated { .. } => "meetingCreated",
            Self::MeetingVote { .. } => "meetingVote",
            Self::MeetingEnded { .. } => "meetingEnded",
            Self::SabotageStarted { .. } => "sabotageStarted",
            Self::SabotageEnded { .. } => "sabotageEnded",
            Self::DoorClosed { .. } => "doorClosed",
            Self::DoorOpened { .. } => "doorOpened",
            Self::PlayerChat { .. } => "playerChat",
        }
    }

    /// Returns the category this event belongs to.
    pub fn category(&self) -> EventCategory {
        match self {
            Self::LobbyCreated { .. }
            | Self::LobbyJoined { .. }
            | Self::LobbyLeft { .. }
            | Self::HostReassigned { .. }
            | Self::LobbyDestroyed { .. }
            | Self::LfgFired { .. } => EventCategory::Lobby,
            Self::GameSettings { .. }
            | Self::GameCreated { .. }
            | Self::GamePlayerSpawned { .. }
            | Self::GameEvent { .. }
            | Self::GameEventEnded { .. }
            | Self::GameEnded { .. } => EventCategory::Game,
            Self::PlayerMove { .. }
            | Self::PlayerTaskCompleted { .. }
            | Self::PlayerDiedEvent { .. }
            | Self::VentEntered { .. }
            | Self::VentExited { .. } => EventCategory::Player,
            Self::MeetingCreated { .. } | Self::MeetingVote { .. } | Self::MeetingEnded { .. } => {
                EventCategory::Meeting
            }
            Self::SabotageStarted { .. } | Self::SabotageEnded { .. } => EventCategory::Sabotage,
            Self::DoorClosed { .. } | Self::DoorOpened { .. } => EventCategory::Map,
            Self::PlayerChat { .. } => EventCategory::Chat,
        }
    }
}
