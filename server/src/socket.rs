//! The room socket: one task per connection, relaying between the client and
//! the [`Hub`](crate::rooms::Hub).

use crate::app::AppState;
use crate::control;
use crate::rooms::ConnId;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use std::sync::Arc;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

pub async fn upgrade(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run(socket, state))
}

async fn run(mut socket: WebSocket, state: Arc<AppState>) {
    let (conn, mut events) = state.hub.register().await;
    info!(message = "room socket connected", conn);

    // Only inbound frames push the deadline back; our own sends do not.
    let deadline = sleep(state.idle_timeout);
    tokio::pin!(deadline);
    let mut pinged = false;

    loop {
        tokio::select! {
            received = socket.recv() => {
                let frame = match received {
                    Some(Ok(frame)) => frame,
                    Some(Err(error)) => {
                        debug!(message = "room socket read error", conn, %error);
                        break;
                    }
                    None => break,
                };
                // anything at all counts as a sign of life
                pinged = false;
                deadline.as_mut().reset(Instant::now() + state.idle_timeout);
                if !handle_frame(&state, conn, frame).await {
                    break;
                }
            }
            () = &mut deadline => {
                if pinged {
                    info!(message = "room socket timed out", conn);
                    break;
                }
                debug!(message = "room socket idle, pinging", conn);
                if socket.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
                pinged = true;
                deadline.as_mut().reset(Instant::now() + state.pong_timeout);
            }
            Some(event) = events.recv() => {
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(error) => {
                        error!(message = "cannot serialize server event", conn, %error);
                        continue;
                    }
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    state.hub.disconnect(conn).await;
    info!(message = "room socket disconnected", conn);
}

/// Returns false once the connection should end.
async fn handle_frame(state: &AppState, conn: ConnId, frame: Message) -> bool {
    let result = match &frame {
        Message::Text(text) => control::parse(text.as_bytes()),
        Message::Binary(bytes) => control::parse(bytes),
        Message::Close(_) => return false,
        Message::Ping(_) | Message::Pong(_) => {
            // pings are answered by the lower layers
            return true;
        }
    };
    match result {
        Ok(message) => {
            debug!(message = "control message", conn, control = ?message);
            state.hub.dispatch(conn, message).await;
        }
        Err(rejection) => {
            warn!(message = "rejected control message", conn, %rejection);
            if let Some(reply) = rejection.reply() {
                state.hub.notify(conn, reply).await;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use crate::app::{self, AppState};
    use crate::{database, upstream};
    use futures::{SinkExt, StreamExt};
    use serde_json::{json, Value};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpStream;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    fn state(idle_timeout: Duration, pong_timeout: Duration) -> Arc<AppState> {
        let upstream = upstream::Upstream::new(
            reqwest::Client::new(),
            None,
            database::temporary(),
            "http://127.0.0.1:9/token".to_string(),
            "http://127.0.0.1:9/search".to_string(),
        );
        let mut state = AppState::new(upstream);
        state.idle_timeout = idle_timeout;
        state.pong_timeout = pong_timeout;
        Arc::new(state)
    }

    async fn serve(state: Arc<AppState>) -> SocketAddr {
        let app = app::router(state, None);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });
        addr
    }

    async fn connect(addr: SocketAddr) -> Client {
        let (client, _response) = tokio_tungstenite::connect_async(format!("ws://{}/socket", addr))
            .await
            .unwrap();
        client
    }

    async fn send(client: &mut Client, value: Value) {
        client
            .send(Message::Text(value.to_string().into()))
            .await
            .unwrap();
    }

    async fn recv(client: &mut Client) -> Value {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(2), client.next())
                .await
                .expect("timed out waiting for a server event")
                .expect("socket closed")
                .unwrap();
            if let Message::Text(text) = frame {
                return serde_json::from_str(text.as_str()).unwrap();
            }
        }
    }

    async fn assert_closed(client: &mut Client) {
        let deadline = Duration::from_secs(2);
        let closed = tokio::time::timeout(deadline, async {
            loop {
                match client.next().await {
                    None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
                    Some(Ok(_)) => {}
                }
            }
        })
        .await;
        assert!(closed.is_ok(), "server kept the socket open");
    }

    fn default_state() -> Arc<AppState> {
        state(Duration::from_secs(30), Duration::from_secs(10))
    }

    #[tokio::test]
    async fn page_announcement_round_trip() {
        let addr = serve(default_state()).await;
        let mut page = connect(addr).await;

        send(&mut page, json!({"action": "create_room", "room_name": "test"})).await;
        send(&mut page, json!({"action": "join_room", "room_name": "test"})).await;
        assert_eq!(recv(&mut page).await, json!({"error": "Already in the room!"}));
    }

    #[tokio::test]
    async fn queue_is_broadcast_to_room() {
        let addr = serve(default_state()).await;
        let mut admin = connect(addr).await;
        let mut guest = connect(addr).await;

        send(&mut admin, json!({"action": "create_room", "room_name": "party"})).await;
        // ordering across connections: make sure the room exists before joining
        send(&mut admin, json!({"action": "join_room", "room_name": "party"})).await;
        recv(&mut admin).await;

        send(&mut guest, json!({"action": "join_room", "room_name": "party"})).await;
        let snapshot = recv(&mut guest).await;
        assert_eq!(snapshot["uris"], json!([]));
        assert!(snapshot["last_updated"].is_string());

        send(&mut guest, json!({"action": "add_song", "song_uri": "spotify:track:1"})).await;
        assert_eq!(recv(&mut guest).await, json!({"error": "Not an admin"}));

        send(&mut admin, json!({"action": "add_song", "song_uri": "spotify:track:1"})).await;
        assert_eq!(recv(&mut admin).await["uris"], json!(["spotify:track:1"]));
        assert_eq!(recv(&mut guest).await["uris"], json!(["spotify:track:1"]));
    }

    #[tokio::test]
    async fn bad_messages() {
        let addr = serve(default_state()).await;
        let mut client = connect(addr).await;

        // undecodable and unknown messages get no reply, so the next reply
        // we see belongs to the message after them
        client
            .send(Message::Text("{not json".to_string().into()))
            .await
            .unwrap();
        send(&mut client, json!({"action": "dance"})).await;
        send(&mut client, json!({"room_name": "x"})).await;
        assert_eq!(recv(&mut client).await, json!({"error": "improperly formed data"}));

        send(&mut client, json!({"action": "join_room"})).await;
        assert_eq!(recv(&mut client).await, json!({"error": "Room name not specified"}));
        send(&mut client, json!({"action": "join_room", "room_name": "nowhere"})).await;
        assert_eq!(recv(&mut client).await, json!({"error": "Room doesn't exist"}));
    }

    #[tokio::test]
    async fn admin_disconnect_closes_room() {
        let addr = serve(default_state()).await;
        let mut admin = connect(addr).await;
        send(&mut admin, json!({"action": "create_room", "room_name": "gone"})).await;
        send(&mut admin, json!({"action": "join_room", "room_name": "gone"})).await;
        recv(&mut admin).await;
        admin.close(None).await.unwrap();
        drop(admin);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut late = connect(addr).await;
        send(&mut late, json!({"action": "join_room", "room_name": "gone"})).await;
        assert_eq!(recv(&mut late).await, json!({"error": "Room doesn't exist"}));
    }

    #[tokio::test]
    async fn silent_client_is_dropped() {
        let addr = serve(state(Duration::from_millis(50), Duration::from_millis(50))).await;
        let mut sleeper = connect(addr).await;
        send(&mut sleeper, json!({"action": "create_room", "room_name": "idle"})).await;
        // not reading means not answering the ping
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_closed(&mut sleeper).await;

        let mut other = connect(addr).await;
        send(&mut other, json!({"action": "join_room", "room_name": "idle"})).await;
        assert_eq!(recv(&mut other).await, json!({"error": "Room doesn't exist"}));
    }

    #[tokio::test]
    async fn silent_guest_in_busy_room_is_dropped() {
        let state = state(Duration::from_millis(100), Duration::from_millis(100));
        let addr = serve(state.clone()).await;

        let mut admin = connect(addr).await;
        send(&mut admin, json!({"action": "create_room", "room_name": "busy"})).await;
        send(&mut admin, json!({"action": "join_room", "room_name": "busy"})).await;
        recv(&mut admin).await;

        // connections are numbered in order, starting at 1
        let mut guest = connect(addr).await;
        send(&mut guest, json!({"action": "join_room", "room_name": "busy"})).await;
        recv(&mut guest).await;
        assert_eq!(state.hub.room_of(2).await.as_deref(), Some("busy"));

        // the guest goes quiet while queue updates keep flowing to it
        for n in 0..20 {
            let uri = format!("spotify:track:{}", n);
            send(&mut admin, json!({"action": "add_song", "song_uri": uri})).await;
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        assert_eq!(state.hub.room_of(2).await, None);
        assert_eq!(state.hub.room_of(1).await.as_deref(), Some("busy"));
    }
}
