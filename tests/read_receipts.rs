use std::time::Duration;

use poll_chat_sync::common::{
    ChatCommand, ChatEvent, DisplayStatus, MessageId, RenderedMessage, Span,
};
use poll_chat_sync::config::SyncConfig;
use poll_chat_sync::network::RemoteStore;

mod support;

use support::{ALICE, ALICE_ROOM, Call, FakeStore, Harness};

fn read(id: u64) -> ChatEvent {
    ChatEvent::StatusChanged {
        id: MessageId(id),
        status: DisplayStatus::Read,
    }
}

fn row(id: u64, top: f32) -> RenderedMessage {
    RenderedMessage {
        id: MessageId(id),
        bounds: Span::new(top, top + 40.0),
    }
}

async fn wait_history(harness: &mut Harness) {
    harness
        .wait_for("history", |event| {
            matches!(event, ChatEvent::MessagesAppended(_))
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn room_entry_marks_everything_read_once() {
    let store = FakeStore::new();
    store.seed(ALICE_ROOM, 1, false, false, "one");
    store.seed(ALICE_ROOM, 2, false, false, "two");
    store.seed(ALICE_ROOM, 3, true, false, "mine");
    let mut harness = Harness::start(store.clone());
    harness.open_room(ALICE).await;
    wait_history(&mut harness).await;

    harness.wait_for("first read", |event| *event == read(1)).await;
    harness.wait_for("second read", |event| *event == read(2)).await;

    let rest = harness.drain_for(Duration::from_secs(5)).await;
    assert!(!rest.contains(&read(3)));
    assert_eq!(store.count(|call| *call == Call::MarkRoomRead(ALICE_ROOM)), 1);
    assert_eq!(store.count(|call| matches!(call, Call::MarkRead(..))), 0);
    assert_eq!(
        store.mark_results(),
        vec![(Call::MarkRoomRead(ALICE_ROOM), 2)]
    );

    // Marking the room again changes nothing on either side.
    assert_eq!(store.mark_room_read(ALICE_ROOM).await, Ok(0));
    let rest = harness.drain_for(Duration::from_secs(3)).await;
    assert!(!rest
        .iter()
        .any(|event| matches!(event, ChatEvent::StatusChanged { .. })));

    harness.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn lost_bulk_response_marks_each_message_once() {
    let store = FakeStore::new();
    store.lose_room_read_response();
    store.seed(ALICE_ROOM, 1, false, false, "one");
    store.seed(ALICE_ROOM, 2, false, false, "two");
    let config = SyncConfig {
        message_poll_ms: 600_000,
        room_read_delay_ms: 300,
        ..SyncConfig::default()
    };
    let mut harness = Harness::start_with(store.clone(), config);
    harness.open_room(ALICE).await;
    wait_history(&mut harness).await;

    harness.wait_for("first read", |event| *event == read(1)).await;
    harness.wait_for("second read", |event| *event == read(2)).await;
    let rest = harness.drain_for(Duration::from_secs(3)).await;
    assert!(!rest
        .iter()
        .any(|event| matches!(event, ChatEvent::StatusChanged { .. })));

    // The server already applied the bulk mark, so the per-message retry is a no-op.
    assert_eq!(
        store.mark_results(),
        vec![
            (Call::MarkRoomRead(ALICE_ROOM), 2),
            (Call::MarkRead(ALICE_ROOM, vec![MessageId(1), MessageId(2)]), 0),
        ]
    );

    harness.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn failed_bulk_mark_falls_back_to_per_message_marking() {
    let store = FakeStore::new();
    store.fail_room_read();
    store.seed(ALICE_ROOM, 1, false, false, "one");
    store.seed(ALICE_ROOM, 2, false, false, "two");
    let mut harness = Harness::start(store.clone());
    harness.open_room(ALICE).await;
    wait_history(&mut harness).await;

    harness.wait_for("first read", |event| *event == read(1)).await;
    harness.wait_for("second read", |event| *event == read(2)).await;

    assert!(store
        .calls()
        .contains(&Call::MarkRead(ALICE_ROOM, vec![MessageId(1), MessageId(2)])));
    harness.drain_for(Duration::from_secs(5)).await;
    assert_eq!(store.count(|call| *call == Call::MarkRoomRead(ALICE_ROOM)), 1);

    harness.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn only_messages_in_view_are_marked_read() {
    let store = FakeStore::new();
    for id in 1..=3 {
        store.seed(ALICE_ROOM, id, false, false, "unread");
    }
    let config = SyncConfig {
        room_read_delay_ms: 600_000,
        ..SyncConfig::default()
    };
    let mut harness = Harness::start_with(store.clone(), config);
    harness.open_room(ALICE).await;
    wait_history(&mut harness).await;

    let settled = ChatCommand::ViewportSettled {
        viewport: Span::new(0.0, 100.0),
        rendered: vec![row(1, 0.0), row(2, 50.0), row(3, 200.0)],
    };
    harness.send(settled.clone()).await;
    harness.wait_for("first read", |event| *event == read(1)).await;
    harness.wait_for("second read", |event| *event == read(2)).await;
    assert!(store
        .calls()
        .contains(&Call::MarkRead(ALICE_ROOM, vec![MessageId(1), MessageId(2)])));

    // Scrolling back over messages already read sends nothing new.
    harness.send(settled).await;
    let rest = harness.drain_for(Duration::from_secs(2)).await;
    assert!(!rest.contains(&read(3)));
    assert_eq!(store.count(|call| matches!(call, Call::MarkRead(..))), 1);

    harness.shutdown().await;
}
