//! Example: enrich a chat push the way the service extension would
//!
//! Run with: cargo run --example enrich_payload [path/to/payload.json]

use std::time::Duration;

use kodegen_notify_enrich::{
    EnrichmentConfig, NotificationRequest, NotificationService, RawPayload,
};

const SAMPLE_PAYLOAD: &str = r#"{
    "aps": {
        "alert": { "title": "Chat", "body": "You have a new message" },
        "mutable-content": 1,
        "thread-id": "fallback-thread"
    },
    "data": {
        "senderName": "Ann",
        "message": "Are we still on for lunch?",
        "threadId": "room-42",
        "fromUid": "u-1001",
        "senderPhotoURL": "https://kodegen.ai/assets/icon_128x128@2x.png"
    }
}"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let json = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(path)?,
        None => SAMPLE_PAYLOAD.to_string(),
    };
    let payload = RawPayload::from_json_str(&json)?;

    let config = EnrichmentConfig::new().with_time_budget(Duration::from_secs(10));
    let service = NotificationService::new(config)?;

    let (tx, rx) = tokio::sync::oneshot::channel();
    let report = service
        .run_with_budget(NotificationRequest::from_payload("demo", payload), move |content| {
            let _ = tx.send(content);
        })
        .await;

    let content = rx.await?;
    println!("title:   {}", content.title);
    println!("body:    {}", content.body);
    println!("thread:  {:?}", content.thread_identifier);
    if let Some(communication) = &content.communication {
        println!(
            "sender:  {} ({}) avatar={:?}",
            communication.sender.display_name, communication.sender.handle, communication.sender.avatar
        );
    }
    println!("report:  {:?} in {:?}", report.path, report.elapsed);

    Ok(())
}
