use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{ClientMessage, ServerMessage},
    error::ServiceError,
    services::rooms::{ConnectionHandle, ConnectionId, ConnectionOutbox},
    state::SharedState,
};

/// Handle the full lifecycle of one realtime client connection.
///
/// Clients stay anonymous until they send `join:session`; every frame is handled in
/// receipt order and failures are answered with an `error` frame to this connection only.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let connection_id: ConnectionId = Uuid::new_v4();
    state.rooms().register(ConnectionHandle {
        id: connection_id,
        tx: outbound_tx.clone(),
    });
    let outbox = ConnectionOutbox::new(state.rooms().clone(), connection_id);
    let limiter_key = connection_id.to_string();

    info!(%connection_id, "client connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                if let Err(err) = state.socket_limiter().check(&limiter_key) {
                    warn!(%connection_id, "socket rate limit exceeded");
                    send_error(&outbound_tx, &err);
                    continue;
                }

                let inbound = match ClientMessage::from_json_str(text.as_str()) {
                    Ok(inbound) => inbound,
                    Err(err) => {
                        warn!(%connection_id, error = %err, "failed to parse or validate client message");
                        send_error(&outbound_tx, &err);
                        continue;
                    }
                };

                let event = inbound.event_name();
                let session_id = inbound.session_id();
                match state.engine().execute(inbound, &outbox).await {
                    Ok(()) => info!(%connection_id, %session_id, event, "event handled"),
                    Err(err) => {
                        warn!(%connection_id, %session_id, event, error = %err, "event rejected");
                        send_error(&outbound_tx, &err);
                    }
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(%connection_id, "client closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {
                send_error(
                    &outbound_tx,
                    &ServiceError::InvalidInput("binary frames are not supported".into()),
                );
            }
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(%connection_id, error = %err, "websocket error");
                break;
            }
        }
    }

    state.rooms().unregister(connection_id);
    state.socket_limiter().forget(&limiter_key);
    info!(%connection_id, "client disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Queue an `error` frame for this connection; a closed writer is ignored.
fn send_error(tx: &mpsc::UnboundedSender<Message>, err: &ServiceError) {
    match serde_json::to_string(&ServerMessage::error(err)) {
        Ok(payload) => {
            let _ = tx.send(Message::Text(payload.into()));
        }
        Err(serialize_err) => {
            warn!(error = %serialize_err, "failed to serialize error frame");
        }
    }
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
