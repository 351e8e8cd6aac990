use super::*;
use crate::config::{SeedRoom, SeedUser, StorageConfig};
use chrono::TimeZone;
use std::collections::HashSet;
use uuid::Uuid;

async fn backends() -> Vec<(&'static str, Arc<dyn ChatDatabase>)> {
    let memory = create_database(DatabaseConfig::InMemory)
        .await
        .expect("in-memory database");
    let sqlite = create_database(DatabaseConfig::Sqlite {
        url: "sqlite::memory:".to_string(),
        max_connections: 4,
    })
    .await
    .expect("sqlite database");
    vec![("memory", memory), ("sqlite", sqlite)]
}

#[test]
fn next_timestamp_is_strictly_increasing() {
    let now = now_micros();
    assert!(next_message_timestamp(None) >= now);

    let future = now + Duration::seconds(10);
    assert_eq!(
        next_message_timestamp(Some(future)),
        future + Duration::microseconds(1)
    );

    let past = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    assert!(next_message_timestamp(Some(past)) > past);
}

#[test]
fn sqlite_backend_requires_url() {
    let cfg = StorageConfig {
        backend: StorageBackend::Sqlite,
        sqlite_url: None,
        ..StorageConfig::default()
    };
    assert!(DatabaseConfig::from_storage_config(&cfg).is_err());

    let cfg = StorageConfig {
        backend: StorageBackend::Sqlite,
        sqlite_url: Some("sqlite://chat.db".to_string()),
        max_connections: 0,
        ..StorageConfig::default()
    };
    match DatabaseConfig::from_storage_config(&cfg).unwrap() {
        DatabaseConfig::Sqlite {
            url,
            max_connections,
        } => {
            assert_eq!(url, "sqlite://chat.db");
            assert_eq!(max_connections, 1);
        }
        other => panic!("unexpected config {other:?}"),
    }
}

#[tokio::test]
async fn ensure_room_is_idempotent_for_explicit_ids() {
    for (name, db) in backends().await {
        let id = Uuid::new_v4();
        let first = db.ensure_room(Some(id), "General").await.unwrap();
        let second = db.ensure_room(Some(id), "Renamed").await.unwrap();
        assert_eq!(first.id, id, "{name}");
        assert_eq!(second.name, "General", "{name}: existing room must be kept");

        let generated = db.ensure_room(None, "Random").await.unwrap();
        assert_ne!(generated.id, id, "{name}");
        assert_eq!(db.list_rooms().await.unwrap().len(), 2, "{name}");
    }
}

#[tokio::test]
async fn find_room_returns_none_for_unknown_id() {
    for (name, db) in backends().await {
        assert!(
            db.find_room(&Uuid::new_v4()).await.unwrap().is_none(),
            "{name}"
        );
    }
}

#[tokio::test]
async fn participants_behave_as_a_set() {
    for (name, db) in backends().await {
        let room = db.ensure_room(None, "General").await.unwrap();
        let alice = "alice".to_string();

        assert!(db.add_participant(&room.id, &alice).await.unwrap(), "{name}");
        assert!(!db.add_participant(&room.id, &alice).await.unwrap(), "{name}");

        let stored = db.find_room(&room.id).await.unwrap().unwrap();
        assert_eq!(stored.participants.len(), 1, "{name}");
        assert!(stored.participants.contains("alice"), "{name}");

        assert!(db.remove_participant(&room.id, &alice).await.unwrap(), "{name}");
        assert!(!db.remove_participant(&room.id, &alice).await.unwrap(), "{name}");
        let stored = db.find_room(&room.id).await.unwrap().unwrap();
        assert!(stored.participants.is_empty(), "{name}");
    }
}

#[tokio::test]
async fn participant_changes_require_an_existing_room() {
    for (name, db) in backends().await {
        let missing = Uuid::new_v4();
        let bob = "bob".to_string();
        assert!(db.add_participant(&missing, &bob).await.is_err(), "{name}");
        assert!(db.remove_participant(&missing, &bob).await.is_err(), "{name}");
        assert!(
            db.append_message(&missing, &bob, "hello").await.is_err(),
            "{name}"
        );
    }
}

#[tokio::test]
async fn concurrent_joins_do_not_lose_participants() {
    for (name, db) in backends().await {
        let room = db.ensure_room(None, "Busy").await.unwrap();

        let mut handles = Vec::new();
        for i in 0..20 {
            let db = Arc::clone(&db);
            let room_id = room.id;
            handles.push(tokio::spawn(async move {
                db.add_participant(&room_id, &format!("user-{i}")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = db.find_room(&room.id).await.unwrap().unwrap();
        assert_eq!(stored.participants.len(), 20, "{name}");
    }
}

#[tokio::test]
async fn appended_messages_are_strictly_ordered() {
    for (name, db) in backends().await {
        let room = db.ensure_room(None, "General").await.unwrap();
        let author = "alice".to_string();

        let mut ids = HashSet::new();
        let mut previous = None;
        for i in 0..25 {
            let message = db
                .append_message(&room.id, &author, &format!("message {i}"))
                .await
                .unwrap();
            assert!(ids.insert(message.id), "{name}: ids must be unique");
            if let Some(previous) = previous {
                assert!(message.created_at > previous, "{name}: order violated");
            }
            previous = Some(message.created_at);
        }

        let history = db.room_history(&room.id).await.unwrap();
        assert_eq!(history.len(), 25, "{name}");
        let texts: Vec<_> = history.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts.first(), Some(&"message 0"), "{name}");
        assert_eq!(texts.last(), Some(&"message 24"), "{name}");
    }
}

#[tokio::test]
async fn recent_messages_returns_latest_window_oldest_first() {
    for (name, db) in backends().await {
        let room = db.ensure_room(None, "General").await.unwrap();
        let other = db.ensure_room(None, "Other").await.unwrap();
        let author = "alice".to_string();

        for i in 0..60 {
            db.append_message(&room.id, &author, &format!("m{i}"))
                .await
                .unwrap();
        }
        db.append_message(&other.id, &author, "elsewhere")
            .await
            .unwrap();

        let recent = db.recent_messages(&room.id, 50).await.unwrap();
        assert_eq!(recent.len(), 50, "{name}");
        assert_eq!(recent[0].text, "m10", "{name}");
        assert_eq!(recent[49].text, "m59", "{name}");
        assert!(recent.iter().all(|m| m.room_id == room.id), "{name}");

        let empty = db.ensure_room(None, "Quiet").await.unwrap();
        assert!(db.recent_messages(&empty.id, 50).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn last_message_summary_is_stored() {
    for (name, db) in backends().await {
        let room = db.ensure_room(None, "General").await.unwrap();
        let at = now_micros();
        let summary = LastMessageSummary::from_text(&"x".repeat(80), 50, at);

        db.set_last_message(&room.id, summary.clone()).await.unwrap();
        let stored = db.find_room(&room.id).await.unwrap().unwrap();
        assert_eq!(stored.last_message, Some(summary), "{name}");

        assert!(
            db.set_last_message(
                &Uuid::new_v4(),
                LastMessageSummary::from_text("hi", 50, at)
            )
            .await
            .is_err(),
            "{name}"
        );
    }
}

#[tokio::test]
async fn authors_resolve_with_fallback() {
    for (name, db) in backends().await {
        db.upsert_user(AuthorInfo {
            id: "alice".to_string(),
            login: Some("alice".to_string()),
            avatar: Some("https://example.test/alice.png".to_string()),
        })
        .await
        .unwrap();

        let alice = db.resolve_author(&"alice".to_string()).await.unwrap();
        assert_eq!(alice.login.as_deref(), Some("alice"), "{name}");

        let ghost = db.resolve_author(&"ghost".to_string()).await.unwrap();
        assert_eq!(ghost, AuthorInfo::unknown("ghost"), "{name}");

        db.upsert_user(AuthorInfo {
            id: "alice".to_string(),
            login: Some("alice2".to_string()),
            avatar: None,
        })
        .await
        .unwrap();
        let updated = db.resolve_author(&"alice".to_string()).await.unwrap();
        assert_eq!(updated.login.as_deref(), Some("alice2"), "{name}");
        assert_eq!(updated.avatar, None, "{name}");
    }
}

#[tokio::test]
async fn seed_applies_configured_rooms_and_users() {
    let room_id = Uuid::new_v4();
    let cfg = StorageConfig {
        rooms: vec![
            SeedRoom {
                id: Some(room_id),
                name: "Lobby".to_string(),
            },
            SeedRoom {
                id: None,
                name: "Random".to_string(),
            },
        ],
        users: vec![SeedUser {
            id: "u1".to_string(),
            login: "first".to_string(),
            avatar: None,
        }],
        ..StorageConfig::default()
    };

    for (name, db) in backends().await {
        seed(db.as_ref(), &cfg).await.unwrap();
        // Second run must not duplicate rooms
        seed(db.as_ref(), &cfg).await.unwrap();
        assert_eq!(db.list_rooms().await.unwrap().len(), 2, "{name}");

        let lobby = db.find_room(&room_id).await.unwrap().unwrap();
        assert_eq!(lobby.name, "Lobby", "{name}");
        let author = db.resolve_author(&"u1".to_string()).await.unwrap();
        assert_eq!(author.login.as_deref(), Some("first"), "{name}");
    }
}

#[tokio::test]
async fn sqlite_file_database_survives_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("chat.db").display());
    let config = DatabaseConfig::Sqlite {
        url: url.clone(),
        max_connections: 2,
    };

    let room_id = {
        let db = create_database(config.clone()).await.unwrap();
        let room = db.ensure_room(None, "Persistent").await.unwrap();
        db.add_participant(&room.id, &"alice".to_string())
            .await
            .unwrap();
        db.append_message(&room.id, &"alice".to_string(), "still here")
            .await
            .unwrap();
        assert!(db.health_check().await);
        room.id
    };

    let db = create_database(config).await.unwrap();
    let room = db.find_room(&room_id).await.unwrap().unwrap();
    assert!(room.participants.contains("alice"));
    let history = db.room_history(&room_id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].text, "still here");
}
