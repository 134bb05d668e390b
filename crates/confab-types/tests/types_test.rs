use chrono::{TimeZone, Utc};
use confab_types::{Message, MessageRole, QueuedMessage, ThreadId};

#[test]
fn test_timestamp_from_rfc3339_string() {
    let message: Message = serde_json::from_str(
        r#"{"id": "msg_1", "role": "assistant", "content": "hi", "timestamp": "2024-03-01T12:00:00Z"}"#,
    )
    .unwrap();

    let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    assert_eq!(message.timestamp, expected);
}

#[test]
fn test_timestamp_from_epoch_millis() {
    let message: Message = serde_json::from_str(
        r#"{"id": "msg_1", "role": "user", "content": "hi", "timestamp": 1709294400000}"#,
    )
    .unwrap();

    let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    assert_eq!(message.timestamp, expected);
}

#[test]
fn test_garbage_timestamp_falls_back_to_now() {
    let before = Utc::now();
    let message: Message = serde_json::from_str(
        r#"{"id": "msg_1", "role": "user", "content": "hi", "timestamp": "not a date"}"#,
    )
    .unwrap();
    let after = Utc::now();

    assert!(message.timestamp >= before && message.timestamp <= after);
}

#[test]
fn test_missing_timestamp_falls_back_to_now() {
    let before = Utc::now();
    let message: Message =
        serde_json::from_str(r#"{"id": "msg_1", "role": "user", "content": "hi"}"#).unwrap();
    let after = Utc::now();

    assert!(message.timestamp >= before && message.timestamp <= after);
}

#[test]
fn test_null_timestamp_falls_back_to_now() {
    let message: Message = serde_json::from_str(
        r#"{"id": "msg_1", "role": "user", "content": "hi", "timestamp": null}"#,
    )
    .unwrap();

    assert!(message.timestamp <= Utc::now());
}

#[test]
fn test_role_wire_format() {
    let message: Message =
        serde_json::from_str(r#"{"id": "m", "role": "system", "content": "rules"}"#).unwrap();
    assert_eq!(message.role, MessageRole::System);
    assert_eq!(message.role.as_str(), "system");
}

#[test]
fn test_optimistic_ids_are_unique() {
    let first = Message::optimistic("one");
    let second = Message::optimistic("two");

    assert_ne!(first.id, second.id);
    assert!(first.id.is_temporary());
}

#[test]
fn test_queued_message_keeps_thread_identity() {
    let queued = QueuedMessage::new(ThreadId::new("thread_9"), "hello");

    assert_eq!(queued.thread_id, ThreadId::new("thread_9"));
    assert_eq!(queued.content, "hello");
}
