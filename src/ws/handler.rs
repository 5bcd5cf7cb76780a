//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::ws::dispatch::handle_text;

/// WebSocket upgrade handler. Observers are not authenticated.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (client_id, mut outbound) = state.engine.clients().register();
    info!(client_id = %client_id, "Observer connected");

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Writer task: observer queue -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if let Err(e) = ws_sink.send(Message::Text(frame.to_string())).await {
                debug!(client_id = %client_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> dispatcher
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                handle_text(&state.engine, state.ledger.as_ref(), client_id, &text).await;
            }
            Ok(Message::Binary(_)) => {
                warn!(client_id = %client_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(client_id = %client_id, "Observer initiated close");
                break;
            }
            Err(e) => {
                error!(client_id = %client_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    state.engine.clients().unregister(client_id);
    writer_handle.abort();

    info!(client_id = %client_id, "Observer disconnected");
}
