//! Listening rooms and who is in them.
//!
//! [`Rooms`] is plain state: every operation returns the events to deliver,
//! addressed by connection. [`Hub`] owns the outbound channel of every live
//! connection and delivers them.

use jamroom_protocol::{ControlMessage, ServerEvent};
use std::collections::{BTreeSet, HashMap};
use time::OffsetDateTime;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

pub type ConnId = u64;

pub type Outbox = Vec<(ConnId, ServerEvent)>;

struct Room {
    admin: ConnId,
    song_uris: Vec<String>,
    last_updated: OffsetDateTime,
    users: BTreeSet<ConnId>,
}

impl Room {
    fn snapshot(&self) -> ServerEvent {
        ServerEvent::Queue {
            uris: self.song_uris.clone(),
            last_updated: self.last_updated,
        }
    }
}

#[derive(Default)]
pub struct Rooms {
    rooms: HashMap<String, Room>,
    // a connection is in at most one room
    membership: HashMap<ConnId, String>,
}

impl Rooms {
    pub fn handle(&mut self, conn: ConnId, message: ControlMessage, now: OffsetDateTime) -> Outbox {
        match message {
            ControlMessage::CreateRoom { room_name } => self.create_room(conn, room_name, now),
            ControlMessage::JoinRoom { room_name } => self.join_room(conn, &room_name),
            ControlMessage::LeaveRoom {} => {
                self.leave_room(conn);
                Vec::new()
            }
            ControlMessage::AddSong { song_uri } => self.add_song(conn, song_uri, now),
        }
    }

    pub fn create_room(&mut self, conn: ConnId, name: String, now: OffsetDateTime) -> Outbox {
        if self.rooms.contains_key(&name) {
            return vec![(conn, ServerEvent::error("room already exists"))];
        }
        self.leave_room(conn);
        let mut users = BTreeSet::new();
        users.insert(conn);
        info!(message = "room created", room = %name, admin = conn);
        self.rooms.insert(
            name.clone(),
            Room {
                admin: conn,
                song_uris: Vec::new(),
                last_updated: now,
                users,
            },
        );
        self.membership.insert(conn, name);
        Vec::new()
    }

    pub fn join_room(&mut self, conn: ConnId, name: &str) -> Outbox {
        if !self.rooms.contains_key(name) {
            return vec![(conn, ServerEvent::error("Room doesn't exist"))];
        }
        if self.room_of(conn) == Some(name) {
            return vec![(conn, ServerEvent::error("Already in the room!"))];
        }
        self.leave_room(conn);
        let room = match self.rooms.get_mut(name) {
            Some(room) => room,
            // leaving can only delete the room we were in, and that wasn't this one
            None => return vec![(conn, ServerEvent::error("Room doesn't exist"))],
        };
        room.users.insert(conn);
        self.membership.insert(conn, name.to_string());
        debug!(message = "joined room", room = %name, conn);
        vec![(conn, room.snapshot())]
    }

    /// Takes `conn` out of its room. When the admin leaves, everyone else is
    /// removed too and the room is gone. Returns the connections removed.
    pub fn leave_room(&mut self, conn: ConnId) -> Vec<ConnId> {
        let name = match self.membership.remove(&conn) {
            Some(name) => name,
            None => return Vec::new(),
        };
        let room = match self.rooms.get_mut(&name) {
            Some(room) => room,
            None => return vec![conn],
        };
        room.users.remove(&conn);
        if room.admin != conn {
            return vec![conn];
        }

        let mut removed = vec![conn];
        if let Some(room) = self.rooms.remove(&name) {
            for user in room.users {
                self.membership.remove(&user);
                removed.push(user);
            }
        }
        info!(message = "room closed", room = %name, kicked = removed.len() - 1);
        removed
    }

    pub fn add_song(&mut self, conn: ConnId, song_uri: String, now: OffsetDateTime) -> Outbox {
        let not_found = || vec![(conn, ServerEvent::error("Room doesn't exist!"))];
        let name = match self.membership.get(&conn) {
            Some(name) => name,
            None => return not_found(),
        };
        let room = match self.rooms.get_mut(name) {
            Some(room) => room,
            None => return not_found(),
        };
        if room.admin != conn {
            return vec![(conn, ServerEvent::error("Not an admin"))];
        }
        room.song_uris.push(song_uri);
        room.last_updated = now;
        let snapshot = room.snapshot();
        room.users
            .iter()
            .map(|user| (*user, snapshot.clone()))
            .collect()
    }

    pub fn room_of(&self, conn: ConnId) -> Option<&str> {
        self.membership.get(&conn).map(String::as_str)
    }

    pub fn members(&self, name: &str) -> Option<Vec<ConnId>> {
        self.rooms
            .get(name)
            .map(|room| room.users.iter().copied().collect())
    }
}

struct HubState {
    next_id: ConnId,
    rooms: Rooms,
    peers: HashMap<ConnId, mpsc::UnboundedSender<ServerEvent>>,
}

impl HubState {
    fn deliver(&self, outbox: Outbox) {
        for (conn, event) in outbox {
            match self.peers.get(&conn) {
                // a closed receiver means the connection is on its way out
                Some(peer) => {
                    let _ = peer.send(event);
                }
                None => debug!(message = "event for unknown connection", conn),
            }
        }
    }
}

pub struct Hub {
    state: Mutex<HubState>,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HubState {
                next_id: 1,
                rooms: Rooms::default(),
                peers: HashMap::new(),
            }),
        }
    }

    pub async fn register(&self) -> (ConnId, mpsc::UnboundedReceiver<ServerEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut state = self.state.lock().await;
        let conn = state.next_id;
        state.next_id += 1;
        state.peers.insert(conn, sender);
        (conn, receiver)
    }

    pub async fn dispatch(&self, conn: ConnId, message: ControlMessage) {
        let mut state = self.state.lock().await;
        let outbox = state
            .rooms
            .handle(conn, message, OffsetDateTime::now_utc());
        state.deliver(outbox);
    }

    pub async fn notify(&self, conn: ConnId, event: ServerEvent) {
        self.state.lock().await.deliver(vec![(conn, event)]);
    }

    pub async fn disconnect(&self, conn: ConnId) {
        let mut state = self.state.lock().await;
        state.peers.remove(&conn);
        state.rooms.leave_room(conn);
    }

    pub async fn room_of(&self, conn: ConnId) -> Option<String> {
        self.state.lock().await.rooms.room_of(conn).map(str::to_string)
    }
}
