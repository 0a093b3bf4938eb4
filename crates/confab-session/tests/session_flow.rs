//! End-to-end flows through `UserSession`.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeTransport, message, summary};
use confab_session::UserSession;
use confab_session::stream::StreamPhase;
use confab_types::OutOfBandEvent;

#[tokio::test]
async fn concurrent_initial_loads_share_one_fetch() {
    let transport = Arc::new(
        FakeTransport::new()
            .with_delay(Duration::from_millis(40))
            .with_messages("c1", vec![message("c1", "m1", 100), message("c1", "m2", 200)]),
    );
    let session = UserSession::new("sess-1", transport.clone());

    let a = session.message_stream("c1").await.unwrap();
    let b = session.message_stream("c1").await.unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    let (ra, rb) = tokio::join!(a.load_initial(), b.load_initial());
    ra.unwrap();
    rb.unwrap();

    assert_eq!(transport.message_fetches(), 1);
    assert_eq!(a.phase().await, StreamPhase::Loaded);
    assert_eq!(a.messages().await.len(), 2);
    assert_eq!(a.messages().await, b.messages().await);
}

#[tokio::test]
async fn unknown_conversation_surfaces_not_found() {
    let transport = Arc::new(FakeTransport::new());
    let session = UserSession::new("sess-1", transport);

    let source = session.message_stream("ghost").await.unwrap();
    let err = source.load_initial().await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(source.phase().await, StreamPhase::Failed);
}

#[tokio::test]
async fn failed_initial_load_retries_with_a_fresh_request() {
    let transport = Arc::new(
        FakeTransport::new().with_messages("c1", vec![message("c1", "m1", 100)]),
    );
    transport.fail_next();
    let session = UserSession::new("sess-1", transport.clone());
    let source = session.message_stream("c1").await.unwrap();

    assert!(source.load_initial().await.unwrap_err().is_transport());
    assert_eq!(source.phase().await, StreamPhase::Failed);

    source.load_initial().await.unwrap();
    assert_eq!(source.phase().await, StreamPhase::Loaded);
    assert_eq!(transport.message_fetches(), 2);
}

#[tokio::test]
async fn paging_loads_older_history_behind_the_first_page() {
    // 60 messages: the initial page holds the newest 50, one older page the rest.
    let history: Vec<_> = (0..60)
        .map(|i| message("c1", &format!("m{i:02}"), 1_000 + i))
        .collect();
    let transport = Arc::new(FakeTransport::new().with_messages("c1", history));
    let session = UserSession::new("sess-1", transport.clone());
    let source = session.message_stream("c1").await.unwrap();

    source.load_initial().await.unwrap();
    assert_eq!(source.messages().await.len(), 50);
    assert!(source.has_more().await);

    source.load_more().await.unwrap();
    let messages = source.messages().await;
    assert_eq!(messages.len(), 60);
    assert_eq!(messages[0].id, "m00");
    assert!(!source.has_more().await);
    assert_eq!(transport.message_fetches(), 2);
}

#[tokio::test]
async fn teardown_cancels_both_attached_page_callers() {
    let history: Vec<_> = (0..60)
        .map(|i| message("c2", &format!("m{i:02}"), 1_000 + i))
        .collect();
    let transport = Arc::new(FakeTransport::new().with_messages("c2", history));
    let session = Arc::new(UserSession::new("sess-1", transport.clone()));

    let source = session.message_stream("c2").await.unwrap();
    source.load_initial().await.unwrap();
    assert!(source.has_more().await);

    // Make the page fetch hang so teardown catches it mid-flight.
    transport.set_delay(Duration::from_secs(5));
    let first = {
        let source = Arc::clone(&source);
        tokio::spawn(async move { source.load_more().await })
    };
    let second = {
        let source = Arc::clone(&source);
        tokio::spawn(async move { source.load_more().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    session.teardown().await;

    assert!(first.await.unwrap().unwrap_err().is_canceled());
    assert!(second.await.unwrap().unwrap_err().is_canceled());

    // The session is hard-closed afterwards.
    assert!(
        session
            .message_stream("c2")
            .await
            .unwrap_err()
            .is_session_closed()
    );
    assert!(session.conversation_list().unwrap_err().is_session_closed());
}

#[tokio::test]
async fn concurrent_list_refreshes_share_one_fetch() {
    let transport = Arc::new(
        FakeTransport::new()
            .with_delay(Duration::from_millis(30))
            .with_conversations(vec![summary("a", 200), summary("b", 100)]),
    );
    let session = UserSession::new("sess-1", transport.clone());
    let list = session.conversation_list().unwrap();

    let (ra, rb) = tokio::join!(list.refresh(), list.refresh());
    ra.unwrap();
    rb.unwrap();

    assert_eq!(transport.conversation_fetches(), 1);
    assert_eq!(list.conversations().await.len(), 2);
}

#[tokio::test]
async fn push_events_keep_list_and_streams_consistent() {
    let transport = Arc::new(
        FakeTransport::new()
            .with_conversations(vec![summary("a", 200), summary("b", 100)])
            .with_messages("a", vec![message("a", "m1", 100)]),
    );
    let session = UserSession::new("sess-1", transport);
    let list = session.conversation_list().unwrap();
    list.refresh().await.unwrap();

    let stream = session.message_stream("a").await.unwrap();
    stream.load_initial().await.unwrap();

    // A pushed message lands in the realized stream.
    session
        .dispatch_event(OutOfBandEvent::Message {
            conversation_id: "a".to_string(),
            message: message("a", "m2", 300),
        })
        .await
        .unwrap();
    assert_eq!(stream.messages().await.len(), 2);

    // New activity on "b" moves it to the front of the list.
    session
        .dispatch_event(OutOfBandEvent::ConversationChanged {
            summary: summary("b", 400),
        })
        .await
        .unwrap();
    assert_eq!(list.conversations().await[0].id, "b");

    // Deleting "a" drops it from the list.
    session
        .dispatch_event(OutOfBandEvent::ConversationDeleted {
            conversation_id: "a".to_string(),
        })
        .await
        .unwrap();
    let remaining = list.conversations().await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, "b");
}

#[tokio::test]
async fn sessions_never_share_deduplication_state() {
    let transport = Arc::new(
        FakeTransport::new()
            .with_delay(Duration::from_millis(40))
            .with_messages("c1", vec![message("c1", "m1", 100)]),
    );
    let first = UserSession::new("token-1", transport.clone());
    let second = UserSession::new("token-2", transport.clone());

    let a = first.message_stream("c1").await.unwrap();
    let b = second.message_stream("c1").await.unwrap();
    let (ra, rb) = tokio::join!(a.load_initial(), b.load_initial());
    ra.unwrap();
    rb.unwrap();

    // Same conversation, different sessions: two independent fetches.
    assert_eq!(transport.message_fetches(), 2);
}
