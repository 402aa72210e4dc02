//! In-memory chat store and an engine harness for the session tests.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;

use poll_chat_sync::common::{ChatCommand, ChatEvent, MessageId, RoomId, User, UserId};
use poll_chat_sync::config::SyncConfig;
use poll_chat_sync::error::StoreError;
use poll_chat_sync::network::{FetchedMessage, LatestNotification, RemoteStore};
use poll_chat_sync::sync::SessionController;

pub const ALICE: UserId = UserId(2);
pub const BOB: UserId = UserId(3);
pub const ALICE_ROOM: RoomId = RoomId(10);
pub const BOB_ROOM: RoomId = RoomId(20);

const EVENT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListUsers,
    CreateRoom(UserId),
    Send(RoomId, String),
    ListMessages(RoomId, MessageId),
    MarkRead(RoomId, Vec<MessageId>),
    MarkRoomRead(RoomId),
    Presence(bool),
    Beacon(bool),
    SetTyping(RoomId, bool),
    GetTyping(RoomId),
    Notifications,
}

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    rooms: HashMap<UserId, RoomId>,
    rows: HashMap<RoomId, Vec<FetchedMessage>>,
    /// Rows whose read flag changed and must be returned regardless of cursor.
    changed: BTreeSet<(RoomId, MessageId)>,
    next_id: u64,
    peer_typing: HashMap<RoomId, bool>,
    notification: LatestNotification,
    reject_send: Option<String>,
    fail_room_read: bool,
    lose_room_read: bool,
    /// Behave like a server that only returns rows above the cursor.
    hide_changed: bool,
    fail_rooms: bool,
    calls: Vec<Call>,
    /// Rows each read-mark call actually flipped.
    mark_results: Vec<(Call, u64)>,
}

/// Stand-in for the chat server. Rows are stored from the local user's point of
/// view (`is_sender` means "written by us").
pub struct FakeStore {
    inner: Mutex<Inner>,
    holds: Mutex<HashMap<RoomId, Arc<Semaphore>>>,
}

pub fn timestamp() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(10, 30, 0)
        .unwrap()
}

pub fn user(id: UserId, name: &str, is_online: bool) -> User {
    User {
        id,
        display_name: name.to_string(),
        avatar_ref: String::new(),
        is_online,
        unread_count: 0,
    }
}

impl FakeStore {
    /// Alice and Bob, each with a room and no messages.
    pub fn new() -> Arc<Self> {
        let inner = Inner {
            users: vec![user(ALICE, "Alice", true), user(BOB, "Bob", false)],
            rooms: HashMap::from([(ALICE, ALICE_ROOM), (BOB, BOB_ROOM)]),
            next_id: 100,
            ..Inner::default()
        };
        Arc::new(Self {
            inner: Mutex::new(inner),
            holds: Mutex::new(HashMap::new()),
        })
    }

    pub fn seed(&self, room: RoomId, id: u64, is_sender: bool, is_read: bool, content: &str) {
        let mut inner = self.inner.lock().unwrap();
        let (sender_id, sender_name) = if is_sender {
            (Some(UserId(1)), "me".to_string())
        } else {
            (Some(UserId(99)), "peer".to_string())
        };
        inner.rows.entry(room).or_default().push(FetchedMessage {
            id: MessageId(id),
            sender_id,
            sender_name,
            content: content.to_string(),
            timestamp: timestamp(),
            is_sender,
            is_read,
        });
        inner.next_id = inner.next_id.max(id + 1);
    }

    /// The peer opened the conversation and read our message `id`.
    pub fn peer_reads(&self, room: RoomId, id: u64) {
        let mut inner = self.inner.lock().unwrap();
        let id = MessageId(id);
        if let Some(row) = inner
            .rows
            .get_mut(&room)
            .and_then(|rows| rows.iter_mut().find(|row| row.id == id))
        {
            row.is_read = true;
        }
        inner.changed.insert((room, id));
    }

    pub fn set_peer_typing(&self, room: RoomId, is_typing: bool) {
        self.inner.lock().unwrap().peer_typing.insert(room, is_typing);
    }

    pub fn set_online(&self, id: UserId, is_online: bool) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(user) = inner.users.iter_mut().find(|user| user.id == id) {
            user.is_online = is_online;
        }
    }

    pub fn set_unread(&self, id: UserId, unread_count: u32) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(user) = inner.users.iter_mut().find(|user| user.id == id) {
            user.unread_count = unread_count;
        }
    }

    pub fn add_user(&self, new_user: User) {
        self.inner.lock().unwrap().users.push(new_user);
    }

    pub fn set_notification(&self, id: u64, sender: &str, content: &str) {
        self.inner.lock().unwrap().notification = LatestNotification {
            message_id: Some(MessageId(id)),
            sender: Some(sender.to_string()),
            content: Some(content.to_string()),
        };
    }

    pub fn reject_sends(&self, reason: &str) {
        self.inner.lock().unwrap().reject_send = Some(reason.to_string());
    }

    pub fn fail_room_read(&self) {
        self.inner.lock().unwrap().fail_room_read = true;
    }

    /// The room mark is applied server-side but the caller gets an error.
    pub fn lose_room_read_response(&self) {
        self.inner.lock().unwrap().lose_room_read = true;
    }

    pub fn hide_status_changes(&self) {
        self.inner.lock().unwrap().hide_changed = true;
    }

    pub fn mark_results(&self) -> Vec<(Call, u64)> {
        self.inner.lock().unwrap().mark_results.clone()
    }

    pub fn fail_room_creation(&self) {
        self.inner.lock().unwrap().fail_rooms = true;
    }

    /// Make `list_messages` for `room` block until [`FakeStore::release`].
    pub fn hold(&self, room: RoomId) {
        self.holds
            .lock()
            .unwrap()
            .insert(room, Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, room: RoomId) {
        if let Some(gate) = self.holds.lock().unwrap().remove(&room) {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| pred(call)).count()
    }

    fn record(&self, call: Call) {
        self.inner.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl RemoteStore for FakeStore {
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        self.record(Call::ListUsers);
        Ok(self.inner.lock().unwrap().users.clone())
    }

    async fn create_or_get_room(&self, peer: UserId) -> Result<RoomId, StoreError> {
        self.record(Call::CreateRoom(peer));
        let inner = self.inner.lock().unwrap();
        if inner.fail_rooms {
            return Err(StoreError::Network("connection refused".into()));
        }
        inner
            .rooms
            .get(&peer)
            .copied()
            .ok_or_else(|| StoreError::Application(Some("User not found".into())))
    }

    async fn send_message(&self, room: RoomId, content: &str) -> Result<MessageId, StoreError> {
        self.record(Call::Send(room, content.to_string()));
        let mut inner = self.inner.lock().unwrap();
        if let Some(reason) = inner.reject_send.clone() {
            return Err(StoreError::Application(Some(reason)));
        }
        let id = MessageId(inner.next_id);
        inner.next_id += 1;
        inner.rows.entry(room).or_default().push(FetchedMessage {
            id,
            sender_id: Some(UserId(1)),
            sender_name: "me".into(),
            content: content.to_string(),
            timestamp: timestamp(),
            is_sender: true,
            is_read: false,
        });
        Ok(id)
    }

    async fn list_messages(
        &self,
        room: RoomId,
        since: MessageId,
    ) -> Result<Vec<FetchedMessage>, StoreError> {
        self.record(Call::ListMessages(room, since));
        let gate = self.holds.lock().unwrap().get(&room).cloned();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await;
        }

        let mut inner = self.inner.lock().unwrap();
        let changed: BTreeSet<MessageId> = if inner.hide_changed {
            BTreeSet::new()
        } else {
            inner
                .changed
                .iter()
                .filter(|(changed_room, _)| *changed_room == room)
                .map(|(_, id)| *id)
                .collect()
        };
        inner.changed.retain(|(changed_room, _)| *changed_room != room);
        Ok(inner
            .rows
            .get(&room)
            .map(|rows| {
                rows.iter()
                    .filter(|row| row.id > since || changed.contains(&row.id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn mark_messages_read(
        &self,
        room: RoomId,
        ids: &[MessageId],
    ) -> Result<u64, StoreError> {
        let call = Call::MarkRead(room, ids.to_vec());
        self.record(call.clone());
        let mut inner = self.inner.lock().unwrap();
        let mut updated = 0;
        for row in inner.rows.entry(room).or_default() {
            if ids.contains(&row.id) && !row.is_sender && !row.is_read {
                row.is_read = true;
                updated += 1;
            }
        }
        inner.mark_results.push((call, updated));
        Ok(updated)
    }

    async fn mark_room_read(&self, room: RoomId) -> Result<u64, StoreError> {
        self.record(Call::MarkRoomRead(room));
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_room_read {
            return Err(StoreError::Network("timed out".into()));
        }
        let mut updated = 0;
        for row in inner.rows.entry(room).or_default() {
            if !row.is_sender && !row.is_read {
                row.is_read = true;
                updated += 1;
            }
        }
        inner.mark_results.push((Call::MarkRoomRead(room), updated));
        if inner.lose_room_read {
            return Err(StoreError::Network("connection reset".into()));
        }
        Ok(updated)
    }

    async fn set_presence(&self, online: bool) -> Result<(), StoreError> {
        self.record(Call::Presence(online));
        Ok(())
    }

    fn presence_beacon(&self, online: bool) {
        self.record(Call::Beacon(online));
    }

    async fn set_typing(&self, room: RoomId, is_typing: bool) -> Result<(), StoreError> {
        self.record(Call::SetTyping(room, is_typing));
        Ok(())
    }

    async fn get_typing(&self, room: RoomId) -> Result<bool, StoreError> {
        self.record(Call::GetTyping(room));
        Ok(self
            .inner
            .lock()
            .unwrap()
            .peer_typing
            .get(&room)
            .copied()
            .unwrap_or(false))
    }

    async fn latest_notification(&self) -> Result<LatestNotification, StoreError> {
        self.record(Call::Notifications);
        Ok(self.inner.lock().unwrap().notification.clone())
    }
}

/// A running session controller wired to a [`FakeStore`].
pub struct Harness {
    pub store: Arc<FakeStore>,
    pub commands: mpsc::Sender<ChatCommand>,
    pub events: mpsc::UnboundedReceiver<ChatEvent>,
    engine: JoinHandle<()>,
}

impl Harness {
    pub fn start(store: Arc<FakeStore>) -> Self {
        Self::start_with(store, SyncConfig::default())
    }

    pub fn start_with(store: Arc<FakeStore>, config: SyncConfig) -> Self {
        let (commands, command_receiver) = mpsc::channel(32);
        let (event_sender, events) = mpsc::unbounded_channel();
        let controller =
            SessionController::new(store.clone(), &config, event_sender, command_receiver);
        let engine = tokio::spawn(controller.run());
        Self {
            store,
            commands,
            events,
            engine,
        }
    }

    pub async fn send(&self, command: ChatCommand) {
        self.commands
            .send(command)
            .await
            .expect("session controller stopped");
    }

    /// Wait for the first event matching `pred`; returns it together with every
    /// event that arrived before it.
    pub async fn wait_for(
        &mut self,
        what: &str,
        pred: impl Fn(&ChatEvent) -> bool,
    ) -> (ChatEvent, Vec<ChatEvent>) {
        let mut skipped = Vec::new();
        let found = tokio::time::timeout(EVENT_TIMEOUT, async {
            while let Some(event) = self.events.recv().await {
                if pred(&event) {
                    return Some(event);
                }
                skipped.push(event);
            }
            None
        })
        .await;
        match found {
            Ok(Some(event)) => (event, skipped),
            Ok(None) => panic!("{what}: event stream closed; saw {skipped:?}"),
            Err(_) => panic!("{what}: not seen within {EVENT_TIMEOUT:?}; saw {skipped:?}"),
        }
    }

    /// Everything emitted until the engine has been idle for `period`.
    pub async fn drain_for(&mut self, period: Duration) -> Vec<ChatEvent> {
        let mut seen = Vec::new();
        let deadline = tokio::time::Instant::now() + period;
        while let Ok(Some(event)) = tokio::time::timeout_at(deadline, self.events.recv()).await {
            seen.push(event);
        }
        seen
    }

    pub async fn open_room(&mut self, peer: UserId) -> RoomId {
        self.send(ChatCommand::SelectPeer(peer)).await;
        let (entered, _) = self
            .wait_for("room entered", |event| {
                matches!(event, ChatEvent::RoomEntered { peer: p, .. } if *p == peer)
            })
            .await;
        match entered {
            ChatEvent::RoomEntered { room, .. } => room,
            _ => unreachable!(),
        }
    }

    pub async fn shutdown(self) -> Arc<FakeStore> {
        let _ = self.commands.send(ChatCommand::Teardown).await;
        let _ = self.engine.await;
        self.store
    }
}
