use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::config::MatchTuning;

/// Protocol version - increment when making breaking changes.
pub const PROTOCOL_VERSION: u32 = 1;

/// Largest roster a match supports.
pub const MAX_PLAYERS: usize = 2;

// === Shared enums ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub enum GameMode {
    #[serde(rename = "Coin Cascade")]
    CoinCascade,
    #[serde(rename = "Bullet Barrage")]
    BulletBarrage,
    #[serde(rename = "Disco Dash")]
    DiscoDash,
    #[serde(rename = "Beat Tap")]
    BeatTap,
}

impl GameMode {
    /// Only the projectile-dodge variant spends lives.
    pub fn tracks_lives(self) -> bool {
        matches!(self, GameMode::BulletBarrage)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub enum Modifier {
    #[serde(rename = "speed-up")]
    SpeedUp,
    #[serde(rename = "none")]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub enum ArrowKind {
    ArrowUp,
    ArrowLeft,
    ArrowRight,
    Button,
}

impl ArrowKind {
    pub const ALL: [ArrowKind; 4] = [
        ArrowKind::ArrowUp,
        ArrowKind::ArrowLeft,
        ArrowKind::ArrowRight,
        ArrowKind::Button,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub enum Feedback {
    Perfect,
    Good,
    Miss,
    Collected,
    Hit,
    Dodged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "snake_case")]
pub enum BeatPhase {
    AwaitingBeat,
    WindowOpen,
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "lowercase")]
pub enum Pose {
    Idle,
    Jump,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    LivesExhausted,
    Timeout,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "lowercase")]
pub enum WheelPhase {
    Idle,
    Spinning,
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Coin,
    Spike,
    Arrow,
}

// === Server -> Client ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(tag = "type")]
pub enum ServerMsg {
    #[serde(rename = "welcome")]
    Welcome(WelcomeMsg),
    #[serde(rename = "config_ack")]
    ConfigAck(ConfigAckMsg),
    #[serde(rename = "controller_status")]
    ControllerStatus(ControllerStatusMsg),
    #[serde(rename = "wheel_state")]
    WheelState(WheelStateMsg),
    #[serde(rename = "match_started")]
    MatchStarted(MatchStartedMsg),
    #[serde(rename = "game_state")]
    GameState(GameStateMsg),
    #[serde(rename = "score_feedback")]
    ScoreFeedback(ScoreFeedbackMsg),
    #[serde(rename = "game_over")]
    GameOver(GameOverMsg),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct WelcomeMsg {
    pub protocol_version: u32,
    pub server_version: String,
    pub names: Vec<String>,
    pub tuning: MatchTuning,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct ConfigAckMsg {
    pub num_players: u32,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct ControllerStatusMsg {
    /// 1-based player number
    pub player: u32,
    pub name: String,
    pub connected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct WheelStateMsg {
    pub mode: GameMode,
    pub state: WheelPhase,
    pub angle: f64,
    pub selected: Option<Modifier>,
    pub presses: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct MatchStartedMsg {
    pub mode: GameMode,
    pub modifier: Modifier,
    pub players: Vec<PlayerWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct GameStateMsg {
    pub mode: GameMode,
    #[ts(type = "number")]
    pub elapsed_ms: u64,
    pub objects: Vec<EntityWire>,
    pub players: Vec<PlayerWire>,
    pub beat: Option<BeatWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct ScoreFeedbackMsg {
    /// 1-based player number
    pub player: u32,
    pub result: Feedback,
    #[ts(type = "number")]
    pub points: i64,
    #[ts(type = "number | null")]
    pub entity: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct GameOverMsg {
    pub reason: EndReason,
    pub players: Vec<PlayerWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct EntityWire {
    #[ts(type = "number")]
    pub id: u64,
    pub kind: EntityKind,
    pub pos: [f64; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrow: Option<ArrowKind>,
    #[serde(default)]
    pub missed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct PlayerWire {
    /// 1-based player number
    pub player: u32,
    pub username: String,
    #[ts(type = "number")]
    pub score: i64,
    /// Absent for variants that do not track lives
    #[serde(default)]
    pub lives: Option<u32>,
    pub pos: [f64; 3],
    pub pose: Pose,
    /// Draw the pose flipped horizontally
    #[serde(default)]
    pub mirrored: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct BeatWire {
    pub phase: BeatPhase,
    #[ts(type = "number")]
    pub last_beat_ms: u64,
    pub interval_ms: u32,
    pub hit_this_beat: bool,
}

// === Client -> Server ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(tag = "type")]
pub enum ClientMsg {
    #[serde(rename = "data")]
    Data(ControllerMsg),
    #[serde(rename = "key")]
    Key(KeyMsg),
    #[serde(rename = "init")]
    Init(InitMsg),
    #[serde(rename = "game_selection")]
    GameSelection(GameSelectionMsg),
    #[serde(rename = "wheel_press")]
    WheelPress,
    #[serde(rename = "exit")]
    Exit,
}

/// One controller edge. Either a `data` code or boolean action flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct ControllerMsg {
    /// 1-based player number
    pub player: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jump: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button1: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button2: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub still: Option<bool>,
}

impl ControllerMsg {
    /// A message carrying a single controller code, as the TCP bridge emits.
    pub fn from_code(player: u32, code: &str) -> Self {
        Self {
            player,
            data: Some(code.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct KeyMsg {
    pub key: String,
    pub down: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct InitMsg {
    pub num_players: u32,
    #[serde(default)]
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct GameSelectionMsg {
    pub mode: GameMode,
}

// === Score API ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct ScoreEntry {
    pub username: String,
    #[ts(type = "number")]
    pub score: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct ScoresResponse {
    pub scores: Vec<ScoreEntry>,
}

// === Conversion helpers ===

/// Round to 4 decimal places (stage units never need more, keeps JSON small)
#[inline]
pub fn round4(v: f64) -> f64 {
    (v * 10000.0).round() / 10000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controller_flag_message_parses() {
        let json = r#"{"type":"data","player":2,"left":true}"#;
        match serde_json::from_str::<ClientMsg>(json).unwrap() {
            ClientMsg::Data(c) => {
                assert_eq!(c.player, 2);
                assert_eq!(c.left, Some(true));
                assert!(c.data.is_none());
            }
            other => panic!("Expected Data, got {:?}", other),
        }
    }

    #[test]
    fn controller_code_message_parses() {
        let json = r#"{"type":"data","player":1,"data":"B1","button1":true}"#;
        match serde_json::from_str::<ClientMsg>(json).unwrap() {
            ClientMsg::Data(c) => {
                assert_eq!(c.data.as_deref(), Some("B1"));
                assert_eq!(c.button1, Some(true));
            }
            other => panic!("Expected Data, got {:?}", other),
        }
    }

    #[test]
    fn unknown_action_fields_are_tolerated() {
        let json = r#"{"type":"data","player":1,"wiggle":true}"#;
        match serde_json::from_str::<ClientMsg>(json).unwrap() {
            ClientMsg::Data(c) => assert!(c.left.is_none() && c.data.is_none()),
            other => panic!("Expected Data, got {:?}", other),
        }
    }

    #[test]
    fn init_and_selection_use_lobby_names() {
        let init: ClientMsg =
            serde_json::from_str(r#"{"type":"init","numPlayers":2,"names":["Mario","Waluigi"]}"#)
                .unwrap();
        assert!(matches!(init, ClientMsg::Init(InitMsg { num_players: 2, .. })));

        let sel: ClientMsg =
            serde_json::from_str(r#"{"type":"game_selection","mode":"Bullet Barrage"}"#).unwrap();
        match sel {
            ClientMsg::GameSelection(g) => assert_eq!(g.mode, GameMode::BulletBarrage),
            other => panic!("Expected GameSelection, got {:?}", other),
        }
    }

    #[test]
    fn unit_variants_parse() {
        assert!(matches!(
            serde_json::from_str::<ClientMsg>(r#"{"type":"wheel_press"}"#).unwrap(),
            ClientMsg::WheelPress
        ));
        assert!(matches!(
            serde_json::from_str::<ClientMsg>(r#"{"type":"exit"}"#).unwrap(),
            ClientMsg::Exit
        ));
    }

    #[test]
    fn score_feedback_wire_shape() {
        let msg = ServerMsg::ScoreFeedback(ScoreFeedbackMsg {
            player: 1,
            result: Feedback::Perfect,
            points: 2,
            entity: None,
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"score_feedback\""));
        assert!(json.contains("\"result\":\"Perfect\""));
        assert!(json.contains("\"player\":1"));
    }

    #[test]
    fn game_state_wire_shape() {
        let msg = ServerMsg::GameState(GameStateMsg {
            mode: GameMode::DiscoDash,
            elapsed_ms: 1500,
            objects: vec![EntityWire {
                id: 3,
                kind: EntityKind::Arrow,
                pos: [80.0, 0.0, 0.0],
                arrow: Some(ArrowKind::ArrowLeft),
                missed: false,
            }],
            players: vec![PlayerWire {
                player: 1,
                username: "Mario".to_string(),
                score: -1,
                lives: None,
                pos: [0.0, -0.35, 0.0],
                pose: Pose::Idle,
                mirrored: false,
            }],
            beat: None,
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"game_state\""));
        assert!(json.contains("\"mode\":\"Disco Dash\""));
        assert!(json.contains("\"elapsedMs\":1500"));
        assert!(json.contains("\"arrow\":\"ArrowLeft\""));
        assert!(json.contains("\"pose\":\"idle\""));
    }

    #[test]
    fn modifier_wire_names() {
        assert_eq!(serde_json::to_string(&Modifier::SpeedUp).unwrap(), "\"speed-up\"");
        assert_eq!(serde_json::to_string(&Modifier::None).unwrap(), "\"none\"");
    }

    #[test]
    fn only_bullet_barrage_tracks_lives() {
        assert!(GameMode::BulletBarrage.tracks_lives());
        assert!(!GameMode::CoinCascade.tracks_lives());
        assert!(!GameMode::DiscoDash.tracks_lives());
        assert!(!GameMode::BeatTap.tracks_lives());
    }

    #[test]
    fn round4_trims_precision() {
        assert_eq!(round4(0.123456), 0.1235);
        assert_eq!(round4(-0.65), -0.65);
    }
}
