//! The session controller: a single task that owns [`SessionState`] and every
//! timer, and turns view commands and store responses into [`ChatEvent`]s.
//!
//! Store calls never run on the controller task. Each one is spawned and posts a
//! [`Completion`] back, tagged with the [`RoomTicket`] it was issued for, so a
//! response that outlived its room is recognised and dropped. Typing and presence
//! writes go through a sequential outbox so the server sees them in the order they
//! were decided.

use std::future::{Future, pending};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use futures::future::OptionFuture;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval, interval_at, sleep_until};
use uuid::Uuid;

use crate::common::{
    ChatCommand, ChatEvent, MessageId, NoticeLevel, RenderedMessage, RoomId, Span, User, UserId,
    Visibility,
};
use crate::config::SyncConfig;
use crate::error::{FetchError, SelectError, SendError, StoreError};
use crate::network::{FetchedMessage, LatestNotification, RemoteStore};
use crate::storage::NotificationLog;

use super::RoomTicket;
use super::messages::BatchOutcome;
use super::roster::RosterUpdate;
use super::state::SessionState;
use super::typing::TypingSignal;

/// Results of spawned store calls, delivered back to the controller.
#[derive(Debug)]
enum Completion {
    RoomResolved {
        epoch: u64,
        peer: UserId,
        result: Result<RoomId, StoreError>,
    },
    Polled {
        ticket: RoomTicket,
        result: Result<Vec<FetchedMessage>, StoreError>,
    },
    /// Full-room fetch used only to refresh read flags.
    Swept {
        ticket: RoomTicket,
        result: Result<Vec<FetchedMessage>, StoreError>,
    },
    /// A poll tick: messages and the peer's typing flag fetched together.
    Ticked {
        ticket: RoomTicket,
        messages: Option<Result<Vec<FetchedMessage>, StoreError>>,
        typing: Option<Result<bool, StoreError>>,
    },
    Sent {
        ticket: RoomTicket,
        local_id: Uuid,
        content: String,
        result: Result<MessageId, StoreError>,
    },
    RoomRead {
        ticket: RoomTicket,
        result: Result<u64, StoreError>,
    },
    MessagesRead {
        ticket: RoomTicket,
        ids: Vec<MessageId>,
        fallback: bool,
        result: Result<u64, StoreError>,
    },
    Roster(Result<Vec<User>, StoreError>),
    Notification(Result<LatestNotification, StoreError>),
    SignalSent {
        signal: Signal,
        result: Result<(), StoreError>,
    },
}

/// Writes whose relative order matters to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Typing { room: RoomId, is_typing: bool },
    Presence(bool),
}

pub struct SessionController {
    store: Arc<dyn RemoteStore>,
    state: SessionState,
    event_sender: mpsc::UnboundedSender<ChatEvent>,
    command_receiver: mpsc::Receiver<ChatCommand>,
    completion_sender: mpsc::UnboundedSender<Completion>,
    completion_receiver: mpsc::UnboundedReceiver<Completion>,
    outbox_sender: mpsc::UnboundedSender<Signal>,
    outbox_receiver: Option<mpsc::UnboundedReceiver<Signal>>,
    message_poll: Option<Interval>,
    message_poll_every: Duration,
    roster_poll_every: Duration,
    notification_poll_every: Duration,
}

impl SessionController {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        config: &SyncConfig,
        event_sender: mpsc::UnboundedSender<ChatEvent>,
        command_receiver: mpsc::Receiver<ChatCommand>,
    ) -> Self {
        let (completion_sender, completion_receiver) = mpsc::unbounded_channel();
        let (outbox_sender, outbox_receiver) = mpsc::unbounded_channel();
        Self {
            store,
            state: SessionState::new(config, None),
            event_sender,
            command_receiver,
            completion_sender,
            completion_receiver,
            outbox_sender,
            outbox_receiver: Some(outbox_receiver),
            message_poll: None,
            message_poll_every: config.message_poll(),
            roster_poll_every: config.roster_poll(),
            notification_poll_every: config.notification_poll(),
        }
    }

    /// Persist the notification watermark across restarts.
    pub fn with_notification_log(mut self, marker: NotificationLog) -> Self {
        self.state.notifications = super::notify::NotificationWatcher::new(Some(marker));
        self
    }

    /// Drive the session until `Teardown` arrives or the command channel closes.
    pub async fn run(mut self) {
        let outbox_task = match self.outbox_receiver.take() {
            Some(receiver) => spawn_outbox(
                self.store.clone(),
                receiver,
                self.completion_sender.clone(),
            ),
            None => {
                log::error!("Session controller started twice");
                return;
            }
        };

        let mut roster_timer = interval(self.roster_poll_every);
        roster_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut notification_timer = interval(self.notification_poll_every);
        notification_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        log::info!("Sync session started");
        self.report_visibility(Visibility::Visible);

        loop {
            let typing_due = self.state.typing.deadline();
            let presence_due = self.state.presence.deadline();
            let entry_read_due = self.state.receipts.entry_deadline();

            tokio::select! {
                command = self.command_receiver.recv() => {
                    match command {
                        Some(command) => {
                            if self.handle_command(command).is_break() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                Some(completion) = self.completion_receiver.recv() => {
                    self.handle_completion(completion);
                }
                _ = next_tick(&mut self.message_poll) => self.on_message_tick(),
                _ = roster_timer.tick() => self.request_roster(),
                _ = notification_timer.tick() => self.request_notification(),
                _ = wait_until(typing_due) => self.on_typing_deadline(),
                _ = wait_until(presence_due) => self.on_presence_deadline(),
                _ = wait_until(entry_read_due) => self.on_entry_read_due(),
            }
        }

        outbox_task.abort();
        self.teardown();
    }

    fn handle_command(&mut self, command: ChatCommand) -> ControlFlow<()> {
        match command {
            ChatCommand::SelectPeer(peer) => self.select_peer(peer),
            ChatCommand::InputChanged { text } => self.on_input(&text),
            ChatCommand::InputBlurred => {
                let signal = self.state.typing.on_blur();
                self.send_typing(signal);
            }
            ChatCommand::SendMessage { content } => self.send_message(content),
            ChatCommand::ViewportSettled { viewport, rendered } => {
                self.mark_visible_read(viewport, &rendered)
            }
            ChatCommand::VisibilityChanged(visibility) => self.report_visibility(visibility),
            ChatCommand::RefreshRoster => self.request_roster(),
            ChatCommand::Teardown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::RoomResolved {
                epoch,
                peer,
                result,
            } => self.on_room_resolved(epoch, peer, result),
            Completion::Polled { ticket, result } => self.on_polled(ticket, result),
            Completion::Swept { ticket, result } => self.on_swept(ticket, result),
            Completion::Ticked {
                ticket,
                messages,
                typing,
            } => {
                if let Some(result) = messages {
                    self.on_polled(ticket, result);
                }
                if let Some(result) = typing {
                    self.on_typing_polled(ticket, result);
                }
            }
            Completion::Sent {
                ticket,
                local_id,
                content,
                result,
            } => self.on_sent(ticket, local_id, content, result),
            Completion::RoomRead { ticket, result } => self.on_room_read(ticket, result),
            Completion::MessagesRead {
                ticket,
                ids,
                fallback,
                result,
            } => self.on_messages_read(ticket, ids, fallback, result),
            Completion::Roster(result) => self.on_roster(result),
            Completion::Notification(result) => self.on_notification(result),
            Completion::SignalSent { signal, result } => self.on_signal_sent(signal, result),
        }
    }

    // Room selection

    fn select_peer(&mut self, peer: UserId) {
        log::info!("Selecting peer {peer}");
        self.message_poll = None;

        let left = self.state.leave_room();
        if left.typing_stop {
            if let Some(room) = left.room {
                self.enqueue(Signal::Typing {
                    room,
                    is_typing: false,
                });
            }
        }
        self.emit(ChatEvent::PeerTyping(false));
        self.emit(ChatEvent::RoomLeft { room: left.room });
        if left.send_abandoned {
            self.emit(ChatEvent::SendControl { enabled: true });
        }

        let epoch = self.state.begin_selection(peer);
        self.spawn_call(move |store| async move {
            let result = store.create_or_get_room(peer).await;
            Completion::RoomResolved {
                epoch,
                peer,
                result,
            }
        });
    }

    fn on_room_resolved(&mut self, epoch: u64, peer: UserId, result: Result<RoomId, StoreError>) {
        if !self.state.finish_selection(epoch) {
            log::debug!("Dropping superseded room resolution for peer {peer}");
            return;
        }

        let room = match result {
            Ok(room) => room,
            Err(err) => {
                let err = SelectError::from(err);
                log::error!("Failed to open room with peer {peer}: {err}");
                self.state.abort_selection();
                self.notice(NoticeLevel::Error, err.user_notice());
                return;
            }
        };

        let ticket = self.state.enter_room(room, epoch, peer);
        log::info!("Entered room {room} with peer {peer}");
        self.emit(ChatEvent::RoomEntered { room, peer });
        if let Some(user) = self.state.roster.get(peer) {
            self.emit(ChatEvent::PeerPresence {
                user: peer,
                is_online: user.is_online,
            });
        }

        self.request_fetch(ticket);
        let mut timer = interval_at(
            Instant::now() + self.message_poll_every,
            self.message_poll_every,
        );
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.message_poll = Some(timer);
    }

    // Message polling

    /// Fetch now, or right after the outstanding fetch lands.
    fn request_fetch(&mut self, ticket: RoomTicket) {
        match self.state.messages.begin_poll(ticket) {
            Some(since) => self.spawn_call(move |store| async move {
                let result = store.list_messages(ticket.room, since).await;
                Completion::Polled { ticket, result }
            }),
            None => self.state.messages.request_refetch(),
        }
    }

    fn on_message_tick(&mut self) {
        let Some(ticket) = self.state.active_ticket() else {
            return;
        };
        let since = self.state.messages.begin_poll(ticket);
        let typing = self.state.typing.begin_peer_poll();
        if since.is_none() && !typing {
            log::trace!("Poll tick skipped for room {}: requests outstanding", ticket.room);
            return;
        }

        self.spawn_call(move |store| async move {
            let messages = OptionFuture::from(
                since.map(|since| store.list_messages(ticket.room, since)),
            );
            let typing = OptionFuture::from(typing.then(|| store.get_typing(ticket.room)));
            let (messages, typing) = futures::join!(messages, typing);
            Completion::Ticked {
                ticket,
                messages,
                typing,
            }
        });
    }

    fn on_polled(&mut self, ticket: RoomTicket, result: Result<Vec<FetchedMessage>, StoreError>) {
        match self.state.messages.apply_fetch(ticket, result) {
            Ok(outcome) => {
                self.render_batch(ticket, outcome);
                self.request_sweep(ticket);
            }
            Err(FetchError::Stale { issued_for }) => {
                log::debug!(
                    "Dropping stale poll for room {} (epoch {})",
                    issued_for.room,
                    issued_for.epoch
                );
                return;
            }
            Err(err) => {
                log::warn!("Polling room {} failed: {err}", ticket.room);
            }
        }

        if self.state.messages.take_refetch() {
            self.request_fetch(ticket);
        }
    }

    /// Rows below the cursor are only returned by a fetch from id 0, so read flips
    /// of known messages are picked up by a separate status-only pass.
    fn request_sweep(&mut self, ticket: RoomTicket) {
        if !self.state.messages.begin_sweep(ticket) {
            return;
        }
        self.spawn_call(move |store| async move {
            let result = store.list_messages(ticket.room, MessageId(0)).await;
            Completion::Swept { ticket, result }
        });
    }

    fn on_swept(&mut self, ticket: RoomTicket, result: Result<Vec<FetchedMessage>, StoreError>) {
        match self.state.messages.apply_sweep(ticket, result) {
            Ok(changes) => {
                for (id, status) in changes {
                    self.emit(ChatEvent::StatusChanged { id, status });
                }
            }
            Err(FetchError::Stale { issued_for }) => {
                log::debug!("Dropping stale status sweep for room {}", issued_for.room);
            }
            Err(err) => log::debug!("Status sweep for room {} failed: {err}", ticket.room),
        }
    }

    fn render_batch(&mut self, ticket: RoomTicket, outcome: BatchOutcome) {
        log::debug!(
            "Room {}: {} fetched, {} new, {} status changes, cursor {}",
            ticket.room,
            outcome.fetched.len(),
            outcome.appended.len(),
            outcome.status_changes.len(),
            self.state.messages.cursor()
        );

        let BatchOutcome {
            appended,
            status_changes,
            first_incoming,
            ..
        } = outcome;
        if !appended.is_empty() {
            self.emit(ChatEvent::MessagesAppended(appended));
        }
        for (id, status) in status_changes {
            self.emit(ChatEvent::StatusChanged { id, status });
        }
        if let Some(id) = first_incoming {
            self.emit(ChatEvent::IncomingMessage { id });
        }
        self.state.receipts.batch_rendered(Instant::now());
    }

    // Sending

    fn send_message(&mut self, content: String) {
        let Some(ticket) = self.state.active_ticket() else {
            log::warn!("Send ignored: no active room");
            self.notice(NoticeLevel::Error, SendError::NoActiveRoom.user_notice());
            return;
        };
        let pending = match self.state.messages.begin_send(&content) {
            Ok(pending) => pending,
            Err(err) => {
                log::debug!("Send ignored: {err}");
                return;
            }
        };

        let signal = self.state.typing.before_send();
        self.send_typing(signal);
        self.emit(ChatEvent::SendControl { enabled: false });
        self.emit(ChatEvent::PendingSend {
            local_id: pending.local_id,
            content: pending.content.clone(),
        });

        let local_id = pending.local_id;
        let content = pending.content;
        self.spawn_call(move |store| async move {
            let result = store.send_message(ticket.room, &content).await;
            Completion::Sent {
                ticket,
                local_id,
                content,
                result,
            }
        });
    }

    fn on_sent(
        &mut self,
        ticket: RoomTicket,
        local_id: Uuid,
        content: String,
        result: Result<MessageId, StoreError>,
    ) {
        if !self.state.is_current(ticket) {
            log::debug!("Dropping send result for inactive room {}", ticket.room);
            return;
        }
        self.state.messages.finish_send(local_id);
        self.emit(ChatEvent::SendControl { enabled: true });

        match result.map_err(SendError::from) {
            Ok(message_id) => {
                log::info!("Message {message_id} sent to room {}", ticket.room);
                self.emit(ChatEvent::SendSucceeded {
                    local_id,
                    message_id,
                });
                self.request_fetch(ticket);
            }
            Err(err) => {
                log::error!("Sending to room {} failed: {err}", ticket.room);
                let notice = err.user_notice();
                self.emit(ChatEvent::SendFailed {
                    local_id,
                    content,
                    notice: notice.clone(),
                });
                self.notice(NoticeLevel::Error, notice);
            }
        }
    }

    // Read receipts

    fn mark_visible_read(&mut self, viewport: Span, rendered: &[RenderedMessage]) {
        let Some(ticket) = self.state.active_ticket() else {
            return;
        };
        let ids = self
            .state
            .receipts
            .visible_unread(&self.state.messages, viewport, rendered);
        self.request_mark_read(ticket, ids, false);
    }

    fn request_mark_read(&mut self, ticket: RoomTicket, ids: Vec<MessageId>, fallback: bool) {
        if ids.is_empty() {
            return;
        }
        self.state.receipts.claim(&ids);
        self.spawn_call(move |store| async move {
            let result = store.mark_messages_read(ticket.room, &ids).await;
            Completion::MessagesRead {
                ticket,
                ids,
                fallback,
                result,
            }
        });
    }

    fn on_messages_read(
        &mut self,
        ticket: RoomTicket,
        ids: Vec<MessageId>,
        fallback: bool,
        result: Result<u64, StoreError>,
    ) {
        if !self.state.is_current(ticket) {
            log::debug!("Dropping read-mark result for inactive room {}", ticket.room);
            return;
        }
        self.state.receipts.release(&ids);

        match result {
            Ok(updated) => {
                let flipped = self.state.messages.mark_read(&ids);
                log::debug!(
                    "Marked {} of {} messages read in room {} (server updated {updated}, fallback {fallback})",
                    flipped.len(),
                    ids.len(),
                    ticket.room
                );
                self.emit_read(flipped);
            }
            Err(err) => log::warn!("Marking messages read in room {} failed: {err}", ticket.room),
        }
    }

    fn on_entry_read_due(&mut self) {
        let Some(ticket) = self.state.active_ticket() else {
            return;
        };
        if !self.state.receipts.take_entry_due(Instant::now()) {
            return;
        }
        self.spawn_call(move |store| async move {
            let result = store.mark_room_read(ticket.room).await;
            Completion::RoomRead { ticket, result }
        });
    }

    fn on_room_read(&mut self, ticket: RoomTicket, result: Result<u64, StoreError>) {
        if !self.state.is_current(ticket) {
            log::debug!("Dropping room read-mark for inactive room {}", ticket.room);
            return;
        }
        self.state.receipts.entry_finished();

        match result {
            Ok(updated) => {
                let flipped = self.state.messages.mark_all_delivered_read();
                log::debug!(
                    "Room {} marked read: server updated {updated}, {} shown as read",
                    ticket.room,
                    flipped.len()
                );
                self.emit_read(flipped);
            }
            Err(err) => {
                log::warn!(
                    "Marking room {} read failed ({err}); marking messages individually",
                    ticket.room
                );
                let ids = self
                    .state
                    .receipts
                    .fallback_ids(&self.state.messages);
                self.request_mark_read(ticket, ids, true);
            }
        }
    }

    fn emit_read(&self, ids: Vec<MessageId>) {
        for id in ids {
            if let Some(message) = self.state.messages.get(id) {
                self.emit(ChatEvent::StatusChanged {
                    id,
                    status: message.status(),
                });
            }
        }
    }

    // Typing

    fn on_input(&mut self, text: &str) {
        let room_active = self.state.active_ticket().is_some();
        let signal = self
            .state
            .typing
            .on_keystroke(Instant::now(), text, room_active);
        self.send_typing(signal);
    }

    fn on_typing_deadline(&mut self) {
        let signal = self.state.typing.on_deadline(Instant::now());
        self.send_typing(signal);
    }

    fn send_typing(&self, signal: Option<TypingSignal>) {
        let (Some(signal), Some(ticket)) = (signal, self.state.active_ticket()) else {
            return;
        };
        self.enqueue(Signal::Typing {
            room: ticket.room,
            is_typing: signal.is_typing(),
        });
    }

    fn on_typing_polled(&mut self, ticket: RoomTicket, result: Result<bool, StoreError>) {
        if !self.state.is_current(ticket) {
            log::debug!("Dropping typing status for inactive room {}", ticket.room);
            return;
        }
        let polled = match result {
            Ok(is_typing) => Some(is_typing),
            Err(err) => {
                log::debug!("Typing status for room {} unavailable: {err}", ticket.room);
                None
            }
        };
        if let Some(is_typing) = self.state.typing.observe_peer(polled) {
            self.emit(ChatEvent::PeerTyping(is_typing));
        }
    }

    // Presence

    fn report_visibility(&mut self, visibility: Visibility) {
        if let Some(online) = self
            .state
            .presence
            .on_visibility(visibility, Instant::now())
        {
            self.enqueue(Signal::Presence(online));
        }
    }

    fn on_presence_deadline(&mut self) {
        if let Some(online) = self.state.presence.on_deadline(Instant::now()) {
            self.enqueue(Signal::Presence(online));
        }
    }

    fn on_signal_sent(&mut self, signal: Signal, result: Result<(), StoreError>) {
        let Err(err) = result else {
            return;
        };
        match signal {
            Signal::Presence(online) => {
                log::warn!("Reporting presence (online: {online}) failed: {err}");
                self.state.presence.report_failed(online);
            }
            Signal::Typing { room, is_typing } => {
                log::debug!("Reporting typing ({is_typing}) to room {room} failed: {err}");
            }
        }
    }

    // Roster

    fn request_roster(&mut self) {
        if !self.state.roster.begin_fetch() {
            return;
        }
        self.spawn_call(|store| async move { Completion::Roster(store.list_users().await) });
    }

    fn on_roster(&mut self, result: Result<Vec<User>, StoreError>) {
        let users = match result {
            Ok(users) => users,
            Err(err) => {
                self.state.roster.fetch_failed();
                log::warn!("Loading users failed: {err}");
                if !self.state.roster.is_loaded() {
                    self.notice(NoticeLevel::Error, "Error loading users");
                }
                return;
            }
        };

        let peer_online_before = self.state.roster.selected().map(|user| user.is_online);
        match self.state.roster.apply(users) {
            RosterUpdate::Unchanged => {}
            RosterUpdate::Replaced => {
                log::debug!("User list replaced ({} users)", self.state.roster.users().len());
                self.emit(ChatEvent::RosterReplaced(self.state.roster.users().to_vec()));
            }
            RosterUpdate::Patched(changes) => {
                log::debug!("User list patched ({} changes)", changes.len());
                self.emit(ChatEvent::RosterPatched(changes));
            }
        }

        if let Some(peer) = self.state.roster.selected() {
            if peer_online_before != Some(peer.is_online) {
                self.emit(ChatEvent::PeerPresence {
                    user: peer.id,
                    is_online: peer.is_online,
                });
            }
        }
    }

    // Notifications

    fn request_notification(&mut self) {
        if !self.state.notifications.begin_fetch() {
            return;
        }
        self.spawn_call(|store| async move {
            Completion::Notification(store.latest_notification().await)
        });
    }

    fn on_notification(&mut self, result: Result<LatestNotification, StoreError>) {
        let latest = match result {
            Ok(latest) => latest,
            Err(err) => {
                self.state.notifications.fetch_failed();
                log::debug!("Notification check failed: {err}");
                return;
            }
        };
        let already_shown = latest
            .message_id
            .is_some_and(|id| self.state.messages.contains(id));
        if let Some(event) = self.state.notifications.observe(latest, already_shown) {
            self.emit(event);
        }
    }

    // Plumbing

    fn teardown(&mut self) {
        self.message_poll = None;
        let left = self.state.leave_room();
        if left.room.is_some() {
            self.emit(ChatEvent::RoomLeft { room: left.room });
        }
        self.state.presence.on_teardown();
        self.store.presence_beacon(false);
        log::info!("Sync session stopped");
    }

    fn spawn_call<F, Fut>(&self, call: F)
    where
        F: FnOnce(Arc<dyn RemoteStore>) -> Fut,
        Fut: Future<Output = Completion> + Send + 'static,
    {
        let completions = self.completion_sender.clone();
        let task = call(self.store.clone());
        tokio::spawn(async move {
            let completion = task.await;
            if completions.send(completion).is_err() {
                log::debug!("Session ended before a store call completed");
            }
        });
    }

    fn enqueue(&self, signal: Signal) {
        if let Err(err) = self.outbox_sender.send(signal) {
            log::warn!("Outbox closed; dropping {:?}", err.0);
        }
    }

    fn emit(&self, event: ChatEvent) {
        if let Err(err) = self.event_sender.send(event) {
            log::warn!("Failed to deliver event to view: {err}");
        }
    }

    fn notice(&self, level: NoticeLevel, text: impl Into<String>) {
        self.emit(ChatEvent::Notice {
            level,
            text: text.into(),
        });
    }
}

/// Sends typing and presence writes one at a time, in submission order.
fn spawn_outbox(
    store: Arc<dyn RemoteStore>,
    mut receiver: mpsc::UnboundedReceiver<Signal>,
    completions: mpsc::UnboundedSender<Completion>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(signal) = receiver.recv().await {
            let result = match signal {
                Signal::Typing { room, is_typing } => store.set_typing(room, is_typing).await,
                Signal::Presence(online) => store.set_presence(online).await,
            };
            if completions.send(Completion::SignalSent { signal, result }).is_err() {
                break;
            }
        }
    })
}

async fn next_tick(timer: &mut Option<Interval>) -> Instant {
    match timer {
        Some(timer) => timer.tick().await,
        None => pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}
