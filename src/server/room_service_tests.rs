use super::test_support::{connect, create_room, drain, server_with, test_server, FlakyDatabase};
use super::*;
use crate::database::InMemoryDatabase;
use crate::protocol::{ErrorCode, ServerMessage};
use std::sync::atomic::Ordering;
use uuid::Uuid;

fn history(events: &[ServerMessage]) -> Vec<String> {
    events
        .iter()
        .find_map(|event| match event {
            ServerMessage::LoadMessages { messages, .. } => {
                Some(messages.iter().map(|m| m.text.clone()).collect())
            }
            _ => None,
        })
        .expect("loadMessages delivered")
}

#[tokio::test]
async fn join_unknown_room_is_rejected_without_state_change() {
    let server = test_server();
    let (session, mut rx) = connect(&server, "alice");
    let missing = Uuid::new_v4();

    let err = server
        .join_room(&session, missing)
        .await
        .expect_err("unknown room rejected");
    assert!(matches!(err, ChatError::RoomNotFound(id) if id == missing));
    assert!(!server.registry().is_member(&session, &missing));
    assert!(drain(&mut rx).is_empty());
    assert!(server.database().find_room(&missing).await.unwrap().is_none());
}

#[tokio::test]
async fn join_records_participant_and_replays_history() {
    let server = test_server();
    let room = create_room(&server, "general").await;
    for text in ["one", "two"] {
        server
            .database()
            .append_message(&room, &"bob".to_string(), text)
            .await
            .unwrap();
    }

    let (session, mut rx) = connect(&server, "alice");
    server.join_room(&session, room).await.unwrap();

    assert!(server.registry().is_member(&session, &room));
    let stored = server.database().find_room(&room).await.unwrap().unwrap();
    assert!(stored.participants.contains("alice"));
    assert_eq!(history(&drain(&mut rx)), vec!["one", "two"]);
}

#[tokio::test]
async fn history_is_capped_to_most_recent_messages() {
    let config = ServerConfig {
        history_limit: 3,
        ..ServerConfig::default()
    };
    let server = server_with(Arc::new(InMemoryDatabase::new()), config);
    let room = create_room(&server, "busy").await;
    for i in 0..5 {
        server
            .database()
            .append_message(&room, &"bob".to_string(), &format!("m{i}"))
            .await
            .unwrap();
    }

    let (session, mut rx) = connect(&server, "alice");
    server.join_room(&session, room).await.unwrap();
    assert_eq!(history(&drain(&mut rx)), vec!["m2", "m3", "m4"]);
}

#[tokio::test]
async fn join_announces_to_others_only() {
    let server = test_server();
    let room = create_room(&server, "general").await;
    let (alice, mut alice_rx) = connect(&server, "alice");
    let (bob, mut bob_rx) = connect(&server, "bob");

    server.join_room(&alice, room).await.unwrap();
    drain(&mut alice_rx);
    server.join_room(&bob, room).await.unwrap();

    let alice_events = drain(&mut alice_rx);
    assert_eq!(alice_events.len(), 1);
    match &alice_events[0] {
        ServerMessage::UserJoined {
            user_id,
            room_id,
            message,
        } => {
            assert_eq!(user_id, "bob");
            assert_eq!(*room_id, room);
            assert_eq!(message, "User joined room general");
        }
        other => panic!("unexpected {other:?}"),
    }

    let bob_events = drain(&mut bob_rx);
    assert!(bob_events
        .iter()
        .all(|event| !matches!(event, ServerMessage::UserJoined { .. })));
}

#[tokio::test]
async fn rejoin_resends_history_without_announcement() {
    let server = test_server();
    let room = create_room(&server, "general").await;
    let (alice, mut alice_rx) = connect(&server, "alice");
    let (bob, mut bob_rx) = connect(&server, "bob");
    server.join_room(&alice, room).await.unwrap();
    server.join_room(&bob, room).await.unwrap();
    drain(&mut alice_rx);
    drain(&mut bob_rx);

    server.join_room(&bob, room).await.unwrap();

    assert!(drain(&mut alice_rx).is_empty());
    let bob_events = drain(&mut bob_rx);
    assert_eq!(bob_events.len(), 1);
    assert!(matches!(bob_events[0], ServerMessage::LoadMessages { .. }));
    assert_eq!(server.registry().room_members(&room).len(), 2);
}

#[tokio::test]
async fn leave_notifies_remaining_members_and_is_idempotent() {
    let server = test_server();
    let room = create_room(&server, "general").await;
    let (alice, mut alice_rx) = connect(&server, "alice");
    let (bob, mut bob_rx) = connect(&server, "bob");
    server.join_room(&alice, room).await.unwrap();
    server.join_room(&bob, room).await.unwrap();
    drain(&mut alice_rx);
    drain(&mut bob_rx);

    server.leave_room(&bob, room).await.unwrap();
    server.leave_room(&bob, room).await.unwrap();

    let alice_events = drain(&mut alice_rx);
    assert_eq!(alice_events.len(), 1);
    assert!(matches!(
        &alice_events[0],
        ServerMessage::UserLeft { user_id, .. } if user_id == "bob"
    ));
    assert!(drain(&mut bob_rx).is_empty());
    assert!(!server.registry().is_member(&bob, &room));

    let stored = server.database().find_room(&room).await.unwrap().unwrap();
    assert!(!stored.participants.contains("bob"));
    assert!(stored.participants.contains("alice"));
}

#[tokio::test]
async fn leave_of_unjoined_room_is_silent() {
    let server = test_server();
    let room = create_room(&server, "general").await;
    let (alice, mut alice_rx) = connect(&server, "alice");

    server.leave_room(&alice, room).await.unwrap();
    server.leave_room(&alice, Uuid::new_v4()).await.unwrap();
    assert!(drain(&mut alice_rx).is_empty());
}

#[tokio::test]
async fn disconnect_keeps_participants_and_stays_quiet_by_default() {
    let server = test_server();
    let room = create_room(&server, "general").await;
    let (alice, mut alice_rx) = connect(&server, "alice");
    let (bob, _bob_rx) = connect(&server, "bob");
    server.join_room(&alice, room).await.unwrap();
    server.join_room(&bob, room).await.unwrap();
    drain(&mut alice_rx);

    server.unregister_session(&bob).await;

    assert!(drain(&mut alice_rx).is_empty());
    assert_eq!(server.registry().room_members(&room), vec![alice]);
    let stored = server.database().find_room(&room).await.unwrap().unwrap();
    assert!(stored.participants.contains("bob"));
}

#[tokio::test]
async fn disconnect_announces_when_enabled() {
    let config = ServerConfig {
        announce_disconnect: true,
        ..ServerConfig::default()
    };
    let server = server_with(Arc::new(InMemoryDatabase::new()), config);
    let room = create_room(&server, "general").await;
    let (alice, mut alice_rx) = connect(&server, "alice");
    let (bob, _bob_rx) = connect(&server, "bob");
    server.join_room(&alice, room).await.unwrap();
    server.join_room(&bob, room).await.unwrap();
    drain(&mut alice_rx);

    server.unregister_session(&bob).await;
    server.unregister_session(&bob).await;

    let alice_events = drain(&mut alice_rx);
    assert_eq!(alice_events.len(), 1);
    assert!(matches!(
        &alice_events[0],
        ServerMessage::UserLeft { user_id, .. } if user_id == "bob"
    ));
}

#[tokio::test]
async fn participant_failure_rolls_back_registry_join() {
    let db = Arc::new(FlakyDatabase::default());
    let server = server_with(db.clone(), ServerConfig::default());
    let room = create_room(&server, "general").await;
    let (alice, mut alice_rx) = connect(&server, "alice");

    db.fail_participants.store(true, Ordering::SeqCst);
    let err = server.join_room(&alice, room).await.expect_err("join fails");
    assert_eq!(err.error_code(), ErrorCode::StorageError);
    assert!(!server.registry().is_member(&alice, &room));
    assert!(drain(&mut alice_rx).is_empty());
}

#[tokio::test]
async fn two_users_join_then_exchange_a_message() {
    let server = test_server();
    let room = create_room(&server, "general").await;
    let (alice, mut alice_rx) = connect(&server, "alice");
    let (bob, mut bob_rx) = connect(&server, "bob");

    server.join_room(&alice, room).await.unwrap();
    assert!(history(&drain(&mut alice_rx)).is_empty());
    server.join_room(&bob, room).await.unwrap();
    assert!(matches!(
        drain(&mut alice_rx).as_slice(),
        [ServerMessage::UserJoined { .. }]
    ));
    drain(&mut bob_rx);

    server.send_message(&alice, room, "hello").await.unwrap();

    for rx in [&mut alice_rx, &mut bob_rx] {
        match drain(rx).as_slice() {
            [ServerMessage::ReceiveMessage(view)] => {
                assert_eq!(view.text, "hello");
                assert_eq!(view.user.id, "alice");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    let (carol, mut carol_rx) = connect(&server, "carol");
    server.join_room(&carol, room).await.unwrap();
    assert_eq!(history(&drain(&mut carol_rx)), vec!["hello"]);
}

#[tokio::test]
async fn events_from_departed_session_are_ignored() {
    let server = test_server();
    let room = create_room(&server, "general").await;
    let (alice, _rx) = connect(&server, "alice");
    server.join_room(&alice, room).await.unwrap();

    server.unregister_session(&alice).await;
    server.join_room(&alice, room).await.unwrap();
    assert!(!server.registry().is_member(&alice, &room));
}
