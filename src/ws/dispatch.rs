//! Observer message dispatcher

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::Engine;
use crate::game::{GameMode, InputEvent, PlayerPosition};
use crate::store::ScoreLedger;
use crate::util::time::unix_secs;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Apply one text frame from an observer.
///
/// Malformed or unknown messages are logged and ignored; the connection
/// always stays open.
pub async fn handle_text(engine: &Engine, ledger: &dyn ScoreLedger, client: Uuid, text: &str) {
    let msg = match serde_json::from_str::<ClientMsg>(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(client_id = %client, error = %e, "Failed to parse observer message");
            return;
        }
    };

    match msg {
        ClientMsg::Init { num_players, names } => match engine.init_session(num_players, names) {
            Ok(expected_players) => {
                engine
                    .clients()
                    .send_to(client, &ServerMsg::ConfigAck { expected_players });
            }
            Err(e) => warn!(client_id = %client, error = %e, "Rejected init"),
        },

        ClientMsg::GameSelection { mode } => match mode.parse::<GameMode>() {
            Ok(mode) => engine.select_mode(mode, unix_secs()),
            Err(e) => warn!(client_id = %client, error = %e, "Ignoring game selection"),
        },

        ClientMsg::PlayerPosition {
            player,
            position,
            sent_at,
        } => {
            engine.set_position(
                player,
                PlayerPosition {
                    x: position.x,
                    y: position.y,
                    sent_at,
                },
            );
        }

        ClientMsg::PlayerInput {
            player,
            action,
            timestamp,
        } => {
            engine.push_input(InputEvent {
                player,
                action,
                client_timestamp: timestamp,
            });
        }

        ClientMsg::GetScores => {
            let scores = match ledger.scores().await {
                Ok(scores) => scores,
                Err(e) => {
                    warn!(client_id = %client, error = %e, "Failed to load scores");
                    Vec::new()
                }
            };
            engine
                .clients()
                .send_to(client, &ServerMsg::ScoreData { scores });
        }

        ClientMsg::Reset => {
            if engine.allows_lobby_reset() {
                info!(client_id = %client, "Lobby reset requested");
                engine.end_game();
            } else {
                warn!(client_id = %client, "Lobby reset is disabled, ignoring");
            }
        }

        ClientMsg::Unknown => {
            debug!(client_id = %client, "Ignoring unknown observer message");
        }
    }
}
