// Display field derivation from normalized payload fields

use serde::{Deserialize, Serialize};

use super::config::EnrichmentConfig;
use super::content::NotificationContent;
use super::payload::NormalizedPayload;

/// Application keys read from the normalized payload
pub mod keys {
    pub const SENDER_NAME: &str = "senderName";
    pub const MESSAGE: &str = "message";
    pub const THREAD_ID: &str = "threadId";
    pub const ROOM_ID: &str = "roomId";
    pub const FROM_UID: &str = "fromUid";
    pub const SENDER_PHOTO_URL: &str = "senderPhotoURL";
}

/// Fields the enriched notification is rendered from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayFields {
    pub sender_name: String,
    pub message: String,
    pub thread_id: Option<String>,
    pub from_uid: String,
    /// Unvalidated; the avatar fetcher checks the scheme
    pub sender_photo_url: Option<String>,
}

impl DisplayFields {
    /// Apply the fallback chains. Always produces a usable set of fields.
    ///
    /// - sender name: `senderName`, original title, configured default
    /// - message: `message`, original body
    /// - thread: `threadId`, `roomId`, original thread identifier
    /// - sender id: `fromUid`, configured sentinel
    pub fn derive(
        normalized: &NormalizedPayload,
        original: &NotificationContent,
        config: &EnrichmentConfig,
    ) -> Self {
        let sender_name = normalized
            .non_blank(keys::SENDER_NAME)
            .or_else(|| non_blank(&original.title))
            .unwrap_or(config.default_sender_name.as_str())
            .to_string();

        let message = normalized
            .non_blank(keys::MESSAGE)
            .unwrap_or(original.body.as_str())
            .to_string();

        let thread_id = normalized
            .first_non_blank(&[keys::THREAD_ID, keys::ROOM_ID])
            .or_else(|| original.thread_identifier.as_deref().and_then(non_blank))
            .map(str::to_string);

        let from_uid = normalized
            .non_blank(keys::FROM_UID)
            .unwrap_or(config.unknown_sender_id.as_str())
            .to_string();

        let sender_photo_url = normalized
            .non_blank(keys::SENDER_PHOTO_URL)
            .map(|url| url.trim().to_string());

        Self {
            sender_name,
            message,
            thread_id,
            from_uid,
            sender_photo_url,
        }
    }

    pub fn has_known_sender(&self, config: &EnrichmentConfig) -> bool {
        self.from_uid != config.unknown_sender_id
    }
}

fn non_blank(value: &str) -> Option<&str> {
    if value.trim().is_empty() { None } else { Some(value) }
}
