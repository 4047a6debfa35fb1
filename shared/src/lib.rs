//! Wire protocol and plain records shared by the arena server and its clients.
//!
//! Every message is a JSON object with an integer `Type` discriminator plus
//! type-specific fields. Field names are PascalCase and enums travel as their
//! integer codes, which is what the existing browser and console front-ends
//! expect.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// Errors raised while decoding or encoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown {kind} code {code}")]
    UnknownCode { kind: &'static str, code: u8 },
    #[error("message type {type_code} is missing field `{field}`")]
    MissingField { type_code: u8, field: &'static str },
}

/// Declares a closed enum that travels on the wire as its integer code.
macro_rules! wire_code_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $code:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "u8", into = "u8")]
        pub enum $name {
            $($variant),+
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                match value {
                    $($name::$variant => $code),+
                }
            }
        }

        impl TryFrom<u8> for $name {
            type Error = ProtocolError;

            fn try_from(code: u8) -> Result<Self, Self::Error> {
                match code {
                    $($code => Ok($name::$variant),)+
                    other => Err(ProtocolError::UnknownCode {
                        kind: stringify!($name),
                        code: other,
                    }),
                }
            }
        }
    };
}

wire_code_enum! {
    /// Facing and movement direction. `Up` decreases `y`.
    Direction { Up = 0, Left = 1, Down = 2, Right = 3 }
}

wire_code_enum! {
    StanceType { Battle = 0, Defense = 1 }
}

wire_code_enum! {
    /// The three things an actor can do in one cycle.
    ActionKind { Move = 0, Attack = 1, Defense = 2 }
}

wire_code_enum! {
    BlockType { Wall = 0, Floor = 1, Fog = 2 }
}

wire_code_enum! {
    EntityType { Skeleton = 0, Door = 1, Woodstick = 2 }
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Left,
        Direction::Down,
        Direction::Right,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Left => Direction::Right,
            Direction::Down => Direction::Up,
            Direction::Right => Direction::Left,
        }
    }

    /// Grid offset `(dx, dy)` of one step in this direction.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Left => (-1, 0),
            Direction::Down => (0, 1),
            Direction::Right => (1, 0),
        }
    }
}

/// Player (session) identifier, assigned by the server on connect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque token naming one resolution round. Compared byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CycleId(String);

impl CycleId {
    pub fn mint() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CycleId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct BlockId(Uuid);

impl BlockId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Identifier carried by synthesized fog cells.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

/// Posture of an actor: mode plus facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Stance {
    #[serde(rename = "Type")]
    pub kind: StanceType,
    pub direction: Direction,
}

impl Stance {
    pub fn battle(direction: Direction) -> Self {
        Self {
            kind: StanceType::Battle,
            direction,
        }
    }

    pub fn defense(direction: Direction) -> Self {
        Self {
            kind: StanceType::Defense,
            direction,
        }
    }

    /// True when this stance turns an attack coming from `attack` into a push.
    pub fn parries(&self, attack: Direction) -> bool {
        self.kind == StanceType::Defense && self.direction == attack.opposite()
    }
}

impl Default for Stance {
    fn default() -> Self {
        Stance::battle(Direction::Up)
    }
}

/// Ability scores. Carried through the protocol, not used by resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Stats {
    pub str: i32,
    pub dex: i32,
    pub vit: i32,
    pub wis: i32,
}

/// Actor record as it travels on the wire.
///
/// Clients fill in the descriptive fields when registering; the server owns
/// `Guid`, the coordinates and `AssignedToEntity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SkeletonInfo {
    #[serde(default)]
    pub guid: EntityId,
    #[serde(rename = "Type", default = "skeleton_entity_type")]
    pub entity_type: EntityType,
    #[serde(default)]
    pub name: String,
    pub hit_points: i32,
    pub attack_power: i32,
    #[serde(default)]
    pub armor_class: i32,
    #[serde(default)]
    pub xcoord: i32,
    #[serde(default)]
    pub ycoord: i32,
    #[serde(default)]
    pub assigned_to_entity: Option<BlockId>,
    #[serde(default)]
    pub stats: Option<Stats>,
    #[serde(default)]
    pub fight_stance: Stance,
}

fn skeleton_entity_type() -> EntityType {
    EntityType::Skeleton
}

impl SkeletonInfo {
    pub fn new(name: &str, hit_points: i32, attack_power: i32) -> Self {
        Self {
            guid: EntityId::generate(),
            entity_type: EntityType::Skeleton,
            name: name.to_string(),
            hit_points,
            attack_power,
            armor_class: 0,
            xcoord: 0,
            ycoord: 0,
            assigned_to_entity: None,
            stats: None,
            fight_stance: Stance::default(),
        }
    }
}

/// Entity reference as listed inside a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntityRecord {
    pub guid: EntityId,
    #[serde(rename = "Type")]
    pub entity_type: EntityType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlockRecord {
    pub block_type: BlockType,
    pub is_passable: bool,
    pub entities: Vec<EntityRecord>,
    pub block_guid: BlockId,
}

impl BlockRecord {
    pub fn fog() -> Self {
        Self {
            block_type: BlockType::Fog,
            is_passable: false,
            entities: Vec::new(),
            block_guid: BlockId::nil(),
        }
    }
}

/// World (or view window) snapshot. `map_blocks` is row-major: `map_blocks[y][x]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MapRecord {
    pub id: i32,
    pub width: usize,
    pub height: usize,
    pub map_blocks: Vec<Vec<BlockRecord>>,
}

impl MapRecord {
    pub fn block(&self, x: usize, y: usize) -> Option<&BlockRecord> {
        self.map_blocks.get(y).and_then(|row| row.get(x))
    }
}

/// One client-submitted action, tagged with the cycle it claims to belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlayerAction {
    pub player_guid: PlayerId,
    pub cycle_guid: CycleId,
    pub player_action_type: ActionKind,
    pub direction: Direction,
}

impl PlayerAction {
    pub fn new(player: PlayerId, cycle: CycleId, kind: ActionKind, direction: Direction) -> Self {
        Self {
            player_guid: player,
            cycle_guid: cycle,
            player_action_type: kind,
            direction,
        }
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Server → client messages.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    PlayerInfo { player_guid: PlayerId },
    CycleGuid { cycle_guid: CycleId },
    Map { map: MapRecord },
    SkeletonInfo { skeleton: SkeletonInfo },
    EndGame,
}

impl ServerMessage {
    pub fn type_code(&self) -> u8 {
        match self {
            ServerMessage::PlayerInfo { .. } => 0,
            ServerMessage::CycleGuid { .. } => 1,
            ServerMessage::Map { .. } => 2,
            ServerMessage::SkeletonInfo { .. } => 3,
            ServerMessage::EndGame => 4,
        }
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let envelope: ServerEnvelope = serde_json::from_str(text)?;
        let type_code = envelope.kind;
        let missing = |field| ProtocolError::MissingField { type_code, field };

        match type_code {
            0 => Ok(ServerMessage::PlayerInfo {
                player_guid: envelope.player_guid.ok_or_else(|| missing("PlayerGuid"))?,
            }),
            1 => Ok(ServerMessage::CycleGuid {
                cycle_guid: envelope.cycle_guid.ok_or_else(|| missing("CycleGuid"))?,
            }),
            2 => Ok(ServerMessage::Map {
                map: envelope.map.ok_or_else(|| missing("Map"))?,
            }),
            3 => Ok(ServerMessage::SkeletonInfo {
                skeleton: envelope.skeleton.ok_or_else(|| missing("Skeleton"))?,
            }),
            4 => Ok(ServerMessage::EndGame),
            other => Err(ProtocolError::UnknownCode {
                kind: "ServerMessage",
                code: other,
            }),
        }
    }
}

impl Serialize for ServerMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("Type", &self.type_code())?;
        match self {
            ServerMessage::PlayerInfo { player_guid } => {
                map.serialize_entry("PlayerGuid", player_guid)?
            }
            ServerMessage::CycleGuid { cycle_guid } => {
                map.serialize_entry("CycleGuid", cycle_guid)?
            }
            ServerMessage::Map { map: world } => map.serialize_entry("Map", world)?,
            ServerMessage::SkeletonInfo { skeleton } => {
                map.serialize_entry("Skeleton", skeleton)?
            }
            ServerMessage::EndGame => {}
        }
        map.end()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ServerEnvelope {
    #[serde(rename = "Type")]
    kind: u8,
    #[serde(default)]
    player_guid: Option<PlayerId>,
    #[serde(default)]
    cycle_guid: Option<CycleId>,
    #[serde(default)]
    map: Option<MapRecord>,
    #[serde(default)]
    skeleton: Option<SkeletonInfo>,
}

/// Client → server messages.
///
/// `CycleAction` keeps the legacy double encoding: `player_action` is a
/// complete JSON-encoded [`PlayerAction`] carried as a string.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    CycleAction {
        player_action: String,
    },
    SkeletonInfo {
        player_guid: PlayerId,
        skeleton: SkeletonInfo,
    },
}

impl ClientMessage {
    pub fn type_code(&self) -> u8 {
        match self {
            ClientMessage::CycleAction { .. } => 0,
            ClientMessage::SkeletonInfo { .. } => 1,
        }
    }

    pub fn cycle_action(action: &PlayerAction) -> Result<Self, ProtocolError> {
        Ok(ClientMessage::CycleAction {
            player_action: action.encode()?,
        })
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let envelope: ClientEnvelope = serde_json::from_str(text)?;
        let type_code = envelope.kind;
        let missing = |field| ProtocolError::MissingField { type_code, field };

        match type_code {
            0 => Ok(ClientMessage::CycleAction {
                player_action: envelope.player_action.ok_or_else(|| missing("PlayerAction"))?,
            }),
            1 => Ok(ClientMessage::SkeletonInfo {
                player_guid: envelope.player_guid.ok_or_else(|| missing("PlayerGuid"))?,
                skeleton: envelope.skeleton.ok_or_else(|| missing("Skeleton"))?,
            }),
            other => Err(ProtocolError::UnknownCode {
                kind: "ClientMessage",
                code: other,
            }),
        }
    }
}

impl Serialize for ClientMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("Type", &self.type_code())?;
        match self {
            ClientMessage::CycleAction { player_action } => {
                map.serialize_entry("PlayerAction", player_action)?;
            }
            ClientMessage::SkeletonInfo {
                player_guid,
                skeleton,
            } => {
                map.serialize_entry("PlayerGuid", player_guid)?;
                map.serialize_entry("Skeleton", skeleton)?;
            }
        }
        map.end()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ClientEnvelope {
    #[serde(rename = "Type")]
    kind: u8,
    #[serde(default)]
    player_action: Option<String>,
    #[serde(default)]
    player_guid: Option<PlayerId>,
    #[serde(default)]
    skeleton: Option<SkeletonInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_direction_opposites() {
        for direction in Direction::ALL {
            assert_eq!(direction.opposite().opposite(), direction);
            let (dx, dy) = direction.offset();
            let (ox, oy) = direction.opposite().offset();
            assert_eq!((dx + ox, dy + oy), (0, 0));
        }
        assert_eq!(Direction::Up.offset(), (0, -1));
        assert_eq!(Direction::Right.offset(), (1, 0));
    }

    #[test]
    fn test_wire_codes() {
        assert_eq!(u8::from(Direction::Left), 1);
        assert_eq!(u8::from(ActionKind::Defense), 2);
        assert_eq!(u8::from(BlockType::Fog), 2);
        assert_eq!(Direction::try_from(3).unwrap(), Direction::Right);
        assert!(matches!(
            Direction::try_from(9),
            Err(ProtocolError::UnknownCode { kind: "Direction", code: 9 })
        ));
    }

    #[test]
    fn test_parry_requires_defense_facing_attacker() {
        assert!(Stance::defense(Direction::Left).parries(Direction::Right));
        assert!(!Stance::defense(Direction::Right).parries(Direction::Right));
        assert!(!Stance::battle(Direction::Left).parries(Direction::Right));
    }

    #[test]
    fn test_player_info_wire_shape() {
        let message = ServerMessage::PlayerInfo {
            player_guid: PlayerId::from("abc"),
        };
        let value: Value = serde_json::from_str(&message.encode().unwrap()).unwrap();
        assert_eq!(value["Type"], 0);
        assert_eq!(value["PlayerGuid"], "abc");
    }

    #[test]
    fn test_end_game_has_no_payload() {
        let value: Value = serde_json::from_str(&ServerMessage::EndGame.encode().unwrap()).unwrap();
        assert_eq!(value, serde_json::json!({ "Type": 4 }));
    }

    #[test]
    fn test_cycle_action_is_double_encoded() {
        let action = PlayerAction::new(
            PlayerId::from("p1"),
            CycleId::from("c1"),
            ActionKind::Attack,
            Direction::Down,
        );
        let text = ClientMessage::cycle_action(&action).unwrap().encode().unwrap();

        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["Type"], 0);
        let inner = value["PlayerAction"].as_str().expect("PlayerAction must be a string");
        let inner: Value = serde_json::from_str(inner).unwrap();
        assert_eq!(inner["PlayerGuid"], "p1");
        assert_eq!(inner["CycleGuid"], "c1");
        assert_eq!(inner["PlayerActionType"], 1);
        assert_eq!(inner["Direction"], 2);

        match ClientMessage::decode(&text).unwrap() {
            ClientMessage::CycleAction { player_action } => {
                assert_eq!(PlayerAction::decode(&player_action).unwrap(), action);
            }
            _ => panic!("Wrong message type after decoding"),
        }
    }

    #[test]
    fn test_decode_browser_skeleton_info() {
        let text = r#"{
            "Type": 1,
            "PlayerGuid": "p-7",
            "Skeleton": {
                "Name": "Classssssic",
                "HitPoints": 10,
                "AttackPower": 3,
                "Xcoord": 0,
                "Ycoord": 0,
                "ArmorClass": 0,
                "Stats": null,
                "FightStance": { "Type": 0, "Direction": 0 }
            }
        }"#;

        match ClientMessage::decode(text).unwrap() {
            ClientMessage::SkeletonInfo {
                player_guid,
                skeleton,
            } => {
                assert_eq!(player_guid.as_str(), "p-7");
                assert_eq!(skeleton.name, "Classssssic");
                assert_eq!(skeleton.hit_points, 10);
                assert_eq!(skeleton.attack_power, 3);
                assert_eq!(skeleton.entity_type, EntityType::Skeleton);
                assert_eq!(skeleton.fight_stance, Stance::battle(Direction::Up));
            }
            _ => panic!("Wrong message type after decoding"),
        }
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        let result = ClientMessage::decode(r#"{ "Type": 7 }"#);
        assert!(matches!(
            result,
            Err(ProtocolError::UnknownCode { code: 7, .. })
        ));
    }

    #[test]
    fn test_decode_rejects_missing_payload() {
        let result = ClientMessage::decode(r#"{ "Type": 0 }"#);
        assert!(matches!(
            result,
            Err(ProtocolError::MissingField {
                type_code: 0,
                field: "PlayerAction"
            })
        ));

        let result = ServerMessage::decode(r#"{ "Type": 2 }"#);
        assert!(matches!(
            result,
            Err(ProtocolError::MissingField { field: "Map", .. })
        ));
    }

    #[test]
    fn test_decode_rejects_malformed_json() {
        assert!(matches!(
            ClientMessage::decode("{ not json"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(PlayerAction::decode(r#"{"PlayerGuid":"p","CycleGuid":"c","PlayerActionType":5,"Direction":0}"#).is_err());
    }

    #[test]
    fn test_map_record_is_row_major() {
        let floor = BlockRecord {
            block_type: BlockType::Floor,
            is_passable: true,
            entities: Vec::new(),
            block_guid: BlockId::generate(),
        };
        let map = MapRecord {
            id: 1,
            width: 2,
            height: 1,
            map_blocks: vec![vec![BlockRecord::fog(), floor.clone()]],
        };

        assert_eq!(map.block(1, 0), Some(&floor));
        assert_eq!(map.block(0, 1), None);

        let message = ServerMessage::Map { map: map.clone() };
        let value: Value = serde_json::from_str(&message.encode().unwrap()).unwrap();
        assert_eq!(value["Map"]["MapBlocks"][0][1]["BlockType"], 1);
        assert_eq!(value["Map"]["MapBlocks"][0][0]["IsPassable"], false);

        match ServerMessage::decode(&message.encode().unwrap()).unwrap() {
            ServerMessage::Map { map: decoded } => assert_eq!(decoded, map),
            _ => panic!("Wrong message type after decoding"),
        }
    }
}
