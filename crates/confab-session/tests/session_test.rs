mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use confab_provider::AssistantGateway;
use confab_session::{ConversationSession, MemoryStore, SendOutcome, SessionError, SessionStore};
use confab_types::{Delivery, Message, PollConfig, RunStatus, SessionConfig, ThreadId};
use support::{FailKind, MockGateway};

fn build_session(
    gateway: &Arc<MockGateway>,
    store: &Arc<MemoryStore>,
    config: SessionConfig,
) -> Arc<ConversationSession> {
    Arc::new(ConversationSession::new(
        Arc::clone(gateway) as Arc<dyn AssistantGateway>,
        Arc::clone(store) as Arc<dyn SessionStore>,
        config,
    ))
}

#[tokio::test]
async fn test_initialize_creates_and_persists_a_thread() {
    let gateway = Arc::new(MockGateway::new());
    let store = Arc::new(MemoryStore::new());
    let session = build_session(&gateway, &store, SessionConfig::default());

    session.initialize().await.unwrap();

    assert_eq!(gateway.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        store.load_thread_id().unwrap(),
        Some(ThreadId::new("thread_0"))
    );
    assert_eq!(session.state().thread_id, Some(ThreadId::new("thread_0")));
}

#[tokio::test]
async fn test_initialize_seeds_the_system_prompt() {
    let gateway = Arc::new(MockGateway::new());
    let store = Arc::new(MemoryStore::new());
    let config = SessionConfig::default().with_system_prompt("You are a business assistant.");
    let session = build_session(&gateway, &store, config);

    session.initialize().await.unwrap();

    let posts = gateway.posts.lock().unwrap().clone();
    assert_eq!(posts, vec!["You are a business assistant."]);
}

#[tokio::test]
async fn test_initialize_resumes_a_stored_thread() {
    let gateway = Arc::new(MockGateway::new());
    let store = Arc::new(MemoryStore::new());
    store.save_thread_id(&ThreadId::new("thread_kept")).unwrap();
    // provider pages are newest-first
    gateway.push_page(vec![
        Message::assistant("msg_2", "hello back"),
        Message::user("msg_1", "hello"),
    ]);
    let session = build_session(&gateway, &store, SessionConfig::default());

    session.initialize().await.unwrap();

    assert_eq!(gateway.create_calls.load(Ordering::SeqCst), 0);
    let snapshot = session.state();
    assert_eq!(snapshot.thread_id, Some(ThreadId::new("thread_kept")));
    // display order is newest-last
    assert_eq!(snapshot.messages[0].content, "hello");
    assert_eq!(snapshot.messages[1].content, "hello back");
    assert!(!snapshot.has_more);
}

#[tokio::test]
async fn test_initialize_fetch_failure_is_recoverable() {
    let gateway = Arc::new(MockGateway::new());
    let store = Arc::new(MemoryStore::new());
    store.save_thread_id(&ThreadId::new("thread_kept")).unwrap();
    gateway.script_lists([Some(FailKind::Server)]);
    let session = build_session(&gateway, &store, SessionConfig::default());

    session.initialize().await.unwrap();

    let snapshot = session.state();
    assert!(snapshot.messages.is_empty());
    assert!(snapshot.error.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_send_message_reconciles_the_optimistic_entry() {
    let gateway = Arc::new(MockGateway::new());
    let store = Arc::new(MemoryStore::new());
    let session = build_session(&gateway, &store, SessionConfig::default());
    session.initialize().await.unwrap();

    gateway.push_page(vec![
        Message::assistant("msg_2", "the answer"),
        Message::user("msg_1", "what is the question?"),
    ]);

    let outcome = session.send_message("what is the question?").await.unwrap();

    assert_eq!(outcome, SendOutcome::Delivered);
    let snapshot = session.state();
    assert!(
        snapshot.messages.iter().all(|m| !m.is_optimistic()),
        "optimistic entry must be reconciled away"
    );
    let echoes = snapshot
        .messages
        .iter()
        .filter(|m| m.content == "what is the question?")
        .count();
    assert_eq!(echoes, 1, "the user's text must not render twice");
    assert!(!snapshot.is_loading);
    assert!(snapshot.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_second_send_does_not_start_a_second_run() {
    let gateway = Arc::new(MockGateway::new());
    let store = Arc::new(MemoryStore::new());
    let session = build_session(&gateway, &store, SessionConfig::default());
    session.initialize().await.unwrap();

    gateway.script_statuses([RunStatus::InProgress]);

    let first = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.send_message("first").await }
    });
    // let the first send get its run in flight
    tokio::task::yield_now().await;

    let second = session.send_message("second").await;
    assert!(matches!(second, Err(SessionError::StillProcessing)));
    assert_eq!(
        gateway.run_calls.load(Ordering::SeqCst),
        1,
        "exactly one active run per thread"
    );

    // the stalled first run is bounded by the poll timeout
    let first = first.await.unwrap();
    assert!(matches!(first, Err(SessionError::PollingTimeout)));
}

#[tokio::test]
async fn test_offline_send_is_queued_not_errored() {
    let gateway = Arc::new(MockGateway::new());
    let store = Arc::new(MemoryStore::new());
    let session = build_session(&gateway, &store, SessionConfig::default());
    session.initialize().await.unwrap();
    session.set_online(false).await.unwrap();

    let outcome = session.send_message("store this").await.unwrap();

    assert_eq!(outcome, SendOutcome::Queued);
    assert_eq!(session.queued_message_count().unwrap(), 1);
    assert_eq!(gateway.run_calls.load(Ordering::SeqCst), 0);
    let snapshot = session.state();
    let last = snapshot.messages.last().unwrap();
    assert_eq!(last.delivery, Delivery::Queued);
    assert!(snapshot.error.unwrap().contains("reconnect"));
}

#[tokio::test]
async fn test_connectivity_loss_during_dispatch_queues() {
    let gateway = Arc::new(MockGateway::new());
    let store = Arc::new(MemoryStore::new());
    let session = build_session(&gateway, &store, SessionConfig::default());
    session.initialize().await.unwrap();
    gateway.script_posts([Some(FailKind::Offline)]);

    let outcome = session.send_message("flaky network").await.unwrap();

    assert_eq!(outcome, SendOutcome::Queued);
    assert!(!session.state().is_online);
    assert_eq!(session.queued_message_count().unwrap(), 1);
}

#[tokio::test]
async fn test_thread_not_found_is_surfaced_never_queued() {
    let gateway = Arc::new(MockGateway::new());
    let store = Arc::new(MemoryStore::new());
    let session = build_session(&gateway, &store, SessionConfig::default());
    session.initialize().await.unwrap();
    gateway.script_posts([Some(FailKind::ThreadNotFound)]);

    let result = session.send_message("hello?").await;

    assert!(matches!(result, Err(SessionError::ThreadNotFound)));
    assert_eq!(session.queued_message_count().unwrap(), 0);
    let snapshot = session.state();
    assert!(snapshot.error.unwrap().contains("new conversation"));
    assert_eq!(
        snapshot.messages.last().unwrap().delivery,
        Delivery::Failed,
        "only the affected entry is flagged"
    );
}

#[tokio::test]
async fn test_reconnect_drains_the_queue() {
    let gateway = Arc::new(MockGateway::new());
    let store = Arc::new(MemoryStore::new());
    let session = build_session(&gateway, &store, SessionConfig::default());
    session.initialize().await.unwrap();
    session.set_online(false).await.unwrap();
    session.send_message("while offline").await.unwrap();

    session.set_online(true).await.unwrap();

    assert_eq!(session.queued_message_count().unwrap(), 0);
    let posts = gateway.posts.lock().unwrap().clone();
    assert_eq!(posts, vec!["while offline"]);
    assert!(session.state().is_online);
}

#[tokio::test(start_paused = true)]
async fn test_force_reset_cancels_polling_and_keeps_the_queue() {
    let gateway = Arc::new(MockGateway::new());
    let store = Arc::new(MemoryStore::new());
    let session = build_session(&gateway, &store, SessionConfig::default());
    session.initialize().await.unwrap();

    // a message stuck in the queue from an earlier offline spell; the
    // reconnect drain fails upstream, so it stays queued
    session.set_online(false).await.unwrap();
    session.send_message("held").await.unwrap();
    gateway.script_posts([Some(FailKind::Server)]);
    session.set_online(true).await.unwrap();
    assert_eq!(session.queued_message_count().unwrap(), 1);

    // a run that never finishes
    gateway.script_statuses([RunStatus::InProgress]);
    let stuck = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.send_message("stuck").await }
    });
    tokio::task::yield_now().await;

    session.force_reset().await.unwrap();

    let stuck = stuck.await.unwrap();
    assert!(matches!(
        stuck,
        Err(SessionError::RunFailed(RunStatus::Cancelled))
    ));
    let snapshot = session.state();
    assert_eq!(snapshot.thread_id, Some(ThreadId::new("thread_1")));
    assert!(snapshot.messages.is_empty());
    assert_eq!(
        session.queued_message_count().unwrap(),
        1,
        "force_reset leaves queued messages to be retried later"
    );
}

#[tokio::test]
async fn test_load_more_respects_the_has_more_flag() {
    let gateway = Arc::new(MockGateway::new());
    let store = Arc::new(MemoryStore::new());
    store.save_thread_id(&ThreadId::new("thread_kept")).unwrap();
    gateway.push_page(vec![Message::assistant("msg_1", "only message")]);
    let session = build_session(&gateway, &store, SessionConfig::default());
    session.initialize().await.unwrap();

    let listed_after_init = gateway.list_calls.load(Ordering::SeqCst);
    assert!(!session.state().has_more);

    session.load_more_messages().await.unwrap();

    assert_eq!(
        gateway.list_calls.load(Ordering::SeqCst),
        listed_after_init,
        "no gateway call when has_more is false"
    );
}

#[tokio::test]
async fn test_load_more_pages_backwards_from_the_oldest_message() {
    let gateway = Arc::new(MockGateway::new());
    let store = Arc::new(MemoryStore::new());
    store.save_thread_id(&ThreadId::new("thread_kept")).unwrap();
    let config = SessionConfig::default().with_page_size(2);
    gateway.push_page(vec![
        Message::assistant("msg_4", "newest"),
        Message::user("msg_3", "recent"),
    ]);
    gateway.push_page(vec![
        Message::assistant("msg_2", "older"),
        Message::user("msg_1", "oldest"),
    ]);
    let session = build_session(&gateway, &store, config);
    session.initialize().await.unwrap();
    assert!(session.state().has_more);

    session.load_more_messages().await.unwrap();

    let befores = gateway.befores.lock().unwrap().clone();
    assert_eq!(befores.len(), 2);
    assert_eq!(
        befores[1].as_ref().map(|id| id.as_str()),
        Some("msg_3"),
        "cursor must be the oldest loaded message"
    );
    let contents: Vec<_> = session
        .state()
        .messages
        .iter()
        .map(|m| m.content.clone())
        .collect();
    assert_eq!(contents, vec!["oldest", "older", "recent", "newest"]);
}

#[tokio::test]
async fn test_pagination_failure_leaves_messages_intact() {
    let gateway = Arc::new(MockGateway::new());
    let store = Arc::new(MemoryStore::new());
    store.save_thread_id(&ThreadId::new("thread_kept")).unwrap();
    let config = SessionConfig::default().with_page_size(1);
    gateway.push_page(vec![Message::assistant("msg_1", "kept")]);
    let session = build_session(&gateway, &store, config);
    session.initialize().await.unwrap();
    gateway.script_lists([Some(FailKind::Server)]);

    let result = session.load_more_messages().await;

    assert!(result.is_err());
    let snapshot = session.state();
    assert_eq!(snapshot.messages.len(), 1);
    assert_eq!(snapshot.messages[0].content, "kept");
    assert!(snapshot.error.is_some());
}

#[tokio::test]
async fn test_blank_input_is_rejected_before_any_io() {
    let gateway = Arc::new(MockGateway::new());
    let store = Arc::new(MemoryStore::new());
    let session = build_session(&gateway, &store, SessionConfig::default());
    session.initialize().await.unwrap();

    let result = session.send_message("   ").await;

    assert!(matches!(result, Err(SessionError::EmptyMessage)));
    assert_eq!(gateway.post_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_reset_thread_seeds_a_welcome_round_trip() {
    let gateway = Arc::new(MockGateway::new());
    let store = Arc::new(MemoryStore::new());
    let session = build_session(&gateway, &store, SessionConfig::default());
    session.initialize().await.unwrap();

    gateway.push_page(vec![Message::assistant("msg_w", "Welcome!")]);
    let welcomed = session.reset_thread(Some("Welcome!")).await.unwrap();

    assert!(welcomed);
    assert_eq!(gateway.create_calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        store.load_thread_id().unwrap(),
        Some(ThreadId::new("thread_1"))
    );
    let snapshot = session.state();
    assert_eq!(snapshot.messages.len(), 1);
    assert_eq!(snapshot.messages[0].content, "Welcome!");
}

#[tokio::test(start_paused = true)]
async fn test_send_uses_short_poll_config() {
    // guards the PollConfig plumbing: a 2-interval budget times out a
    // never-finishing run after exactly 2 polls
    let gateway = Arc::new(MockGateway::new());
    let store = Arc::new(MemoryStore::new());
    let config = SessionConfig::default().with_poll(
        PollConfig::new()
            .with_interval(Duration::from_secs(1))
            .with_max_wait(Duration::from_secs(2)),
    );
    let session = build_session(&gateway, &store, config);
    session.initialize().await.unwrap();
    gateway.script_statuses([RunStatus::InProgress]);

    let result = session.send_message("never answered").await;

    assert!(matches!(result, Err(SessionError::PollingTimeout)));
    assert_eq!(gateway.status_calls.load(Ordering::SeqCst), 2);
}
