use std::fmt::Display;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::http::AppState;
use crate::registry::SubscriberRegistry;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket: WebSocket| async move {
        let (sink, stream) = socket.split();
        serve_subscriber(&state.registry, sink, stream).await;
    })
}

/// Runs one push subscriber until either side goes away.
///
/// Frames queued by the broadcaster are written out as text. Anything the
/// client sends is read only to notice a close or error.
pub async fn serve_subscriber<S, R, E>(registry: &SubscriberRegistry, mut sink: S, mut inbound: R)
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let (id, mut frames) = registry.register().await;

    loop {
        tokio::select! {
            frame = frames.recv() => {
                match frame {
                    Some(frame) => {
                        if let Err(e) = sink.send(Message::Text(frame.to_string().into())).await {
                            debug!("Subscriber {} write failed: {}", id, e);
                            break;
                        }
                    }
                    None => {
                        debug!("Subscriber {} dropped by broadcaster", id);
                        break;
                    }
                }
            }

            msg = inbound.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Subscriber {} closed connection", id);
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("Read error from subscriber {}: {}", id, e);
                        break;
                    }
                }
            }
        }
    }

    registry.remove(id).await;
    let _ = sink.close().await;
}
