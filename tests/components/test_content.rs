//! Tests for components/content.rs

use kodegen_notify_enrich::{
    DisplayFields, EnrichmentConfig, MessageIntent, NotificationContent, RawPayload,
    SenderIdentity, normalize,
};
use serde_json::json;

fn fields() -> DisplayFields {
    DisplayFields {
        sender_name: "Ann".to_string(),
        message: "hi".to_string(),
        thread_id: Some("t1".to_string()),
        from_uid: "u1".to_string(),
        sender_photo_url: None,
    }
}

#[test]
fn test_content_from_payload() {
    let raw: RawPayload = serde_json::from_value(json!({
        "aps": {
            "alert": { "title": "Chat", "subtitle": "Room", "body": "New message" },
            "thread-id": "thread-1",
            "category": "MESSAGE",
            "badge": 2,
            "mutable-content": 1
        },
        "data": { "senderName": "Ann" }
    }))
    .unwrap();

    let content = NotificationContent::from_payload(raw.clone());
    assert_eq!(content.title, "Chat");
    assert_eq!(content.subtitle.as_deref(), Some("Room"));
    assert_eq!(content.body, "New message");
    assert_eq!(content.thread_identifier.as_deref(), Some("thread-1"));
    assert_eq!(content.category_identifier.as_deref(), Some("MESSAGE"));
    assert_eq!(content.badge, Some(2));
    assert!(content.mutable_content);
    assert_eq!(content.user_info, raw);
    assert!(!content.is_communication());
}

#[test]
fn test_builder_content_feeds_field_derivation() {
    let raw: RawPayload = serde_json::from_value(json!({
        "data": { "senderName": "Ann", "message": "hi", "fromUid": "u1" }
    }))
    .unwrap();

    let content = NotificationContent::new("Chat", "New message")
        .with_subtitle("Room")
        .with_user_info(raw.clone());
    assert_eq!(content.subtitle.as_deref(), Some("Room"));
    assert_eq!(content.user_info, raw);

    let fields = DisplayFields::derive(
        &normalize(&content.user_info),
        &content,
        &EnrichmentConfig::default(),
    );
    assert_eq!(fields.sender_name, "Ann");
    assert_eq!(fields.message, "hi");
    assert_eq!(fields.from_uid, "u1");

    // Subtitle is not a display field and survives apply_fields
    let mut applied = content.clone();
    applied.apply_fields(&fields);
    assert_eq!(applied.subtitle.as_deref(), Some("Room"));
}

#[test]
fn test_apply_fields_keeps_thread_without_derived_one() {
    let mut content = NotificationContent::new("old", "old body").with_thread_identifier("keep");
    let mut derived = fields();
    derived.thread_id = None;

    content.apply_fields(&derived);
    assert_eq!(content.title, "Ann");
    assert_eq!(content.body, "hi");
    assert_eq!(content.thread_identifier.as_deref(), Some("keep"));

    content.apply_fields(&fields());
    assert_eq!(content.thread_identifier.as_deref(), Some("t1"));
}

#[test]
fn test_sender_identity_validation() {
    assert!(SenderIdentity::new("u1", "Ann").is_ok());
    assert!(SenderIdentity::new("", "Ann").is_err());
    assert!(SenderIdentity::new("u1", "  ").is_err());
}

#[test]
fn test_sender_identity_avatar_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.png");
    let identity = SenderIdentity::new("u1", "Ann").unwrap();
    assert!(identity.clone().with_avatar(&missing).is_err());

    let empty = dir.path().join("empty.png");
    std::fs::write(&empty, b"").unwrap();
    assert!(identity.clone().with_avatar(&empty).is_err());

    let avatar = dir.path().join("avatar.png");
    std::fs::write(&avatar, b"\x89PNG\r\n\x1a\n").unwrap();
    let identity = identity.with_avatar(&avatar).unwrap();
    assert_eq!(identity.avatar.as_deref(), Some(avatar.as_path()));
}

#[test]
fn test_message_intent_from_fields() {
    let intent = MessageIntent::from_fields(&fields(), None).unwrap();
    assert_eq!(intent.sender.handle, "u1");
    assert_eq!(intent.sender.display_name, "Ann");
    assert_eq!(intent.sender.avatar, None);
    assert_eq!(intent.message, "hi");
    assert_eq!(intent.conversation_identifier.as_deref(), Some("t1"));

    let dir = tempfile::tempdir().unwrap();
    let gone = dir.path().join("gone.png");
    assert!(MessageIntent::from_fields(&fields(), Some(&gone)).is_err());
}
