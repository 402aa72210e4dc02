use std::ops::ControlFlow;

use tokio::io::{AsyncBufReadExt, BufReader, stdin};
use tokio::sync::mpsc;

use crate::common::{ChatCommand, ChatEvent, NoticeLevel, Visibility};

use super::components::input_bar::InputAction;
use super::components::{chat_area, input_bar, sidebar};
use super::state::ViewState;

const HELP: &str = "Commands: /users, /open <user id>, /retry, /hide, /show, /blur, /quit. Anything else is sent to the open chat.";

/// Line-oriented front-end: stdin lines become commands, engine events are
/// printed as they arrive.
pub struct ConsoleApp {
    state: ViewState,
    command_sender: mpsc::Sender<ChatCommand>,
    event_receiver: mpsc::UnboundedReceiver<ChatEvent>,
}

impl ConsoleApp {
    pub fn new(
        command_sender: mpsc::Sender<ChatCommand>,
        event_receiver: mpsc::UnboundedReceiver<ChatEvent>,
    ) -> Self {
        Self {
            state: ViewState::new(),
            command_sender,
            event_receiver,
        }
    }

    pub async fn run(mut self) {
        let mut lines = BufReader::new(stdin()).lines();
        println!("{HELP}");

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            if self.handle_line(&line).await.is_break() {
                                break;
                            }
                        }
                        Ok(None) => break,
                        Err(err) => {
                            log::error!("Failed to read input: {err}");
                            break;
                        }
                    }
                }
                event = self.event_receiver.recv() => {
                    match event {
                        Some(event) => self.handle_event(event).await,
                        None => {
                            log::warn!("Sync engine stopped");
                            return;
                        }
                    }
                }
            }
        }

        self.send_command(ChatCommand::Teardown).await;
    }

    async fn handle_line(&mut self, line: &str) -> ControlFlow<()> {
        let Some(action) = input_bar::parse(line) else {
            return ControlFlow::Continue(());
        };

        match action {
            InputAction::Send(content) => self.submit(content).await,
            InputAction::Retry => match self.state.draft.clone() {
                Some(draft) => self.submit(draft).await,
                None => println!("Nothing to retry"),
            },
            InputAction::Open(peer) => self.send_command(ChatCommand::SelectPeer(peer)).await,
            InputAction::Users => {
                println!("{}", sidebar::render(&self.state.users));
                self.send_command(ChatCommand::RefreshRoster).await;
            }
            InputAction::Hide => {
                self.send_command(ChatCommand::VisibilityChanged(Visibility::Hidden))
                    .await
            }
            InputAction::Show => {
                self.send_command(ChatCommand::VisibilityChanged(Visibility::Visible))
                    .await
            }
            InputAction::Blur => self.send_command(ChatCommand::InputBlurred).await,
            InputAction::Quit => return ControlFlow::Break(()),
            InputAction::Invalid(reason) => println!("{reason}. {HELP}"),
        }
        ControlFlow::Continue(())
    }

    async fn submit(&self, content: String) {
        if !self.state.send_enabled {
            println!("Still sending the previous message");
            return;
        }
        self.send_command(ChatCommand::InputChanged {
            text: content.clone(),
        })
        .await;
        self.send_command(ChatCommand::SendMessage { content }).await;
    }

    async fn handle_event(&mut self, event: ChatEvent) {
        let relayout = self.state.apply(&event);
        self.print_event(&event);

        if relayout {
            let (viewport, rendered) = self.state.layout();
            self.send_command(ChatCommand::ViewportSettled { viewport, rendered })
                .await;
        }
    }

    fn print_event(&self, event: &ChatEvent) {
        match event {
            ChatEvent::RoomEntered { peer, .. } => {
                let name = self
                    .state
                    .user(*peer)
                    .map(|user| user.display_name.as_str())
                    .unwrap_or("unknown user");
                let presence = match self.state.peer_online {
                    Some(true) => " (online)",
                    Some(false) => " (offline)",
                    None => "",
                };
                println!("--- Chat with {name}{presence} ---");
            }
            ChatEvent::MessagesAppended(messages) => {
                for message in messages {
                    println!("{}", chat_area::render_message(message));
                }
            }
            ChatEvent::StatusChanged { id, .. } => {
                if let Some(message) = self.state.message(*id) {
                    log::debug!("{}", chat_area::render_status(message));
                }
            }
            ChatEvent::PendingSend { content, .. } => {
                println!("{}", chat_area::render_pending(content))
            }
            ChatEvent::SendFailed { .. } => {
                if let Some(draft) = &self.state.draft {
                    println!("Not sent: {draft} (type /retry to send it again)");
                }
            }
            ChatEvent::PeerTyping(true) => println!("... typing"),
            ChatEvent::RosterReplaced(users) => {
                println!("Users:\n{}", sidebar::render(users))
            }
            ChatEvent::PeerPresence { is_online, .. } => {
                let label = if *is_online { "online" } else { "offline" };
                println!("Peer is now {label}");
            }
            ChatEvent::IncomingNotification {
                sender, content, ..
            } => println!("New message from {sender}: {content}"),
            ChatEvent::Notice { level, text } => match level {
                NoticeLevel::Info => println!("{text}"),
                NoticeLevel::Error => println!("Error: {text}"),
            },
            ChatEvent::RoomLeft { .. }
            | ChatEvent::SendSucceeded { .. }
            | ChatEvent::SendControl { .. }
            | ChatEvent::PeerTyping(false)
            | ChatEvent::RosterPatched(_)
            | ChatEvent::IncomingMessage { .. } => {}
        }
    }

    async fn send_command(&self, command: ChatCommand) {
        if let Err(err) = self.command_sender.send(command).await {
            log::warn!("Failed to send command to sync engine: {err}");
        }
    }
}
