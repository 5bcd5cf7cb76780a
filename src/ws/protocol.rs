//! Observer protocol message definitions
//! These are the JSON wire types exchanged with browser observers

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game::{Action, GameMode, GameObject, Judgement, PlayerId};
use crate::store::ScoreEntry;

/// A bare `{x, y}` pair as sent by browsers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub x: f64,
    pub y: f64,
}

/// Messages sent from observer to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Configure the roster for a new session
    Init {
        #[serde(rename = "numPlayers", default = "default_num_players")]
        num_players: i64,
        #[serde(default)]
        names: Vec<String>,
    },

    /// Switch the active game mode
    GameSelection { mode: String },

    /// Latest position of one player
    PlayerPosition {
        player: PlayerId,
        position: Coords,
        /// Client send time in Unix milliseconds
        #[serde(rename = "sentAt", default)]
        sent_at: Option<f64>,
    },

    /// Discrete action from a browser-side controller
    PlayerInput {
        player: PlayerId,
        action: Action,
        #[serde(default)]
        timestamp: f64,
    },

    /// Ask for the ledger leaderboard
    GetScores,

    /// Return to the lobby (only honoured when enabled)
    Reset,

    #[serde(other)]
    Unknown,
}

fn default_num_players() -> i64 {
    1
}

/// Messages sent from server to observers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerMsg {
    /// Reply to `init`
    #[serde(rename = "config_ack")]
    ConfigAck {
        #[serde(rename = "expectedPlayers")]
        expected_players: u32,
    },

    #[serde(rename = "player_connected")]
    PlayerConnected {
        player: PlayerId,
        name: String,
        address: String,
    },

    #[serde(rename = "player_disconnected")]
    PlayerDisconnected { player: PlayerId },

    /// Raw controller token plus its decoded flags
    #[serde(rename = "data")]
    Data(ControllerData),

    #[serde(rename = "startGame")]
    StartGame {
        mode: GameMode,
        /// Unix seconds
        #[serde(rename = "startAt")]
        start_at: f64,
    },

    /// Rhythm judgement for one input
    #[serde(rename = "score_feedback")]
    ScoreFeedback {
        player: PlayerId,
        result: Judgement,
        points: i64,
    },

    /// Full arena snapshot, sent every tick while a mode is active
    #[serde(rename = "gameStateUpdate")]
    GameStateUpdate {
        mode: GameMode,
        objects: Vec<GameObject>,
        scores: BTreeMap<PlayerId, i64>,
        /// Unix seconds
        timestamp: f64,
    },

    /// Reply to `get_scores`
    #[serde(rename = "score_data")]
    ScoreData { scores: Vec<ScoreEntry> },
}

/// Payload of a `data` message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerData {
    pub player: PlayerId,
    pub data: String,
    pub button1: bool,
    pub button2: bool,
    pub jump: bool,
    pub left: bool,
    pub right: bool,
    pub still: bool,
}

impl ControllerData {
    /// Flag set for a token; unknown tokens carry no flags
    pub fn new(player: PlayerId, token: &str, action: Option<Action>) -> Self {
        Self {
            player,
            data: token.to_string(),
            button1: action == Some(Action::ButtonOne),
            button2: action == Some(Action::ButtonTwo),
            jump: action == Some(Action::Jump),
            left: action == Some(Action::Left),
            right: action == Some(Action::Right),
            still: action == Some(Action::Neutral),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_every_client_message() {
        let init: ClientMsg =
            serde_json::from_str(r#"{"type":"init","numPlayers":2,"names":["A","B"]}"#).unwrap();
        assert!(matches!(init, ClientMsg::Init { num_players: 2, ref names } if names.len() == 2));

        let select: ClientMsg =
            serde_json::from_str(r#"{"type":"game_selection","mode":"Disco Dash"}"#).unwrap();
        assert!(matches!(select, ClientMsg::GameSelection { ref mode } if mode == "Disco Dash"));

        let pos: ClientMsg = serde_json::from_str(
            r#"{"type":"player_position","player":1,"position":{"x":0.5,"y":-0.2},"sentAt":1700000000000}"#,
        )
        .unwrap();
        assert!(matches!(
            pos,
            ClientMsg::PlayerPosition { player: 1, sent_at: Some(_), .. }
        ));

        let input: ClientMsg = serde_json::from_str(
            r#"{"type":"player_input","player":2,"action":"ArrowUp","timestamp":12.5}"#,
        )
        .unwrap();
        assert!(matches!(
            input,
            ClientMsg::PlayerInput { player: 2, action: Action::Jump, .. }
        ));

        let scores: ClientMsg = serde_json::from_str(r#"{"type":"get_scores"}"#).unwrap();
        assert!(matches!(scores, ClientMsg::GetScores));
    }

    #[test]
    fn unknown_type_maps_to_unknown() {
        let msg: ClientMsg = serde_json::from_str(r#"{"type":"dance","x":1}"#).unwrap();
        assert!(matches!(msg, ClientMsg::Unknown));
    }

    #[test]
    fn init_defaults_to_one_unnamed_player() {
        let msg: ClientMsg = serde_json::from_str(r#"{"type":"init"}"#).unwrap();
        assert!(matches!(msg, ClientMsg::Init { num_players: 1, ref names } if names.is_empty()));
    }

    #[test]
    fn server_messages_use_observer_field_names() {
        let ack = serde_json::to_value(ServerMsg::ConfigAck { expected_players: 2 }).unwrap();
        assert_eq!(ack, json!({"type": "config_ack", "expectedPlayers": 2}));

        let start = serde_json::to_value(ServerMsg::StartGame {
            mode: GameMode::BulletBarrage,
            start_at: 10.0,
        })
        .unwrap();
        assert_eq!(
            start,
            json!({"type": "startGame", "mode": "Bullet Barrage", "startAt": 10.0})
        );

        let feedback = serde_json::to_value(ServerMsg::ScoreFeedback {
            player: 1,
            result: Judgement::Perfect,
            points: 2,
        })
        .unwrap();
        assert_eq!(
            feedback,
            json!({"type": "score_feedback", "player": 1, "result": "Perfect", "points": 2})
        );
    }

    #[test]
    fn controller_data_flags_follow_decoded_action() {
        let jump = serde_json::to_value(ServerMsg::Data(ControllerData::new(
            1,
            "J",
            Some(Action::Jump),
        )))
        .unwrap();
        assert_eq!(
            jump,
            json!({
                "type": "data", "player": 1, "data": "J",
                "button1": false, "button2": false, "jump": true,
                "left": false, "right": false, "still": false
            })
        );

        let unknown = ControllerData::new(2, "A 57", None);
        assert!(!(unknown.button1 || unknown.jump || unknown.still));
        assert_eq!(unknown.data, "A 57");
    }

    #[test]
    fn snapshot_scores_serialize_as_player_keyed_object() {
        let mut scores = BTreeMap::new();
        scores.insert(1, 3);
        scores.insert(2, -1);
        let msg = serde_json::to_value(ServerMsg::GameStateUpdate {
            mode: GameMode::CoinCascade,
            objects: Vec::new(),
            scores,
            timestamp: 1.5,
        })
        .unwrap();

        assert_eq!(msg["scores"], json!({"1": 3, "2": -1}));
        assert_eq!(msg["mode"], "Coin Cascade");
    }
}
