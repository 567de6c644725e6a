// Mutable notification content and communication-style metadata
// The host renders whatever NotificationContent it receives on completion

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::fields::DisplayFields;
use super::payload::RawPayload;
use super::{EnrichmentError, EnrichmentResult};

/// Content the extension hands back to the host.
///
/// Starts as the host's decoding of the APNs envelope and is mutated in
/// place while the invocation enriches it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub subtitle: Option<String>,
    pub body: String,
    /// Groups notifications in the notification center
    pub thread_identifier: Option<String>,
    pub category_identifier: Option<String>,
    pub badge: Option<u32>,
    /// Whether the payload opted into service extension processing
    pub mutable_content: bool,
    /// The raw payload, preserved for the app
    pub user_info: RawPayload,
    /// Present once communication-style rendering has been applied
    pub communication: Option<CommunicationContext>,
}

impl NotificationContent {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            ..Default::default()
        }
    }

    /// Decode the content the host would show without an extension
    pub fn from_payload(payload: RawPayload) -> Self {
        let aps = payload.aps();
        let alert = aps.alert.as_ref();
        Self {
            title: alert.and_then(|a| a.title()).unwrap_or_default().to_string(),
            subtitle: alert.and_then(|a| a.subtitle()).map(str::to_string),
            body: alert.and_then(|a| a.body()).unwrap_or_default().to_string(),
            thread_identifier: aps.thread_id.clone(),
            category_identifier: aps.category.clone(),
            badge: aps.badge,
            mutable_content: aps.mutable_content,
            user_info: payload,
            communication: None,
        }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn with_thread_identifier(mut self, thread: impl Into<String>) -> Self {
        self.thread_identifier = Some(thread.into());
        self
    }

    pub fn with_user_info(mut self, payload: RawPayload) -> Self {
        self.user_info = payload;
        self
    }

    /// Overwrite title, body and thread with derived fields
    pub fn apply_fields(&mut self, fields: &DisplayFields) {
        self.title = fields.sender_name.clone();
        self.body = fields.message.clone();
        if let Some(thread) = &fields.thread_id {
            self.thread_identifier = Some(thread.clone());
        }
    }

    pub fn is_communication(&self) -> bool {
        self.communication.is_some()
    }

    pub fn has_avatar(&self) -> bool {
        self.communication
            .as_ref()
            .is_some_and(|c| c.sender.avatar.is_some())
    }
}

/// Who sent the message, as shown inline by communication notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderIdentity {
    /// Stable sender id (`fromUid`)
    pub handle: String,
    pub display_name: String,
    /// Local image file; never a remote URL
    pub avatar: Option<PathBuf>,
}

impl SenderIdentity {
    pub fn new(handle: impl Into<String>, display_name: impl Into<String>) -> EnrichmentResult<Self> {
        let handle = handle.into();
        let display_name = display_name.into();
        if handle.trim().is_empty() {
            return Err(EnrichmentError::Rendering {
                message: "sender handle cannot be empty".to_string(),
            });
        }
        if display_name.trim().is_empty() {
            return Err(EnrichmentError::Rendering {
                message: "sender display name cannot be empty".to_string(),
            });
        }
        Ok(Self {
            handle,
            display_name,
            avatar: None,
        })
    }

    /// Attach an avatar file, which must exist and hold at least one byte
    pub fn with_avatar(mut self, path: &Path) -> EnrichmentResult<Self> {
        let metadata = std::fs::metadata(path)
            .map_err(|e| EnrichmentError::io(format!("reading avatar {}", path.display()), e))?;
        if !metadata.is_file() || metadata.len() == 0 {
            return Err(EnrichmentError::Rendering {
                message: format!("avatar {} is not a non-empty file", path.display()),
            });
        }
        self.avatar = Some(path.to_path_buf());
        Ok(self)
    }
}

/// Incoming-message description handed to the communication renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageIntent {
    pub sender: SenderIdentity,
    pub message: String,
    pub conversation_identifier: Option<String>,
}

impl MessageIntent {
    pub fn from_fields(fields: &DisplayFields, avatar: Option<&Path>) -> EnrichmentResult<Self> {
        let mut sender = SenderIdentity::new(&fields.from_uid, &fields.sender_name)?;
        if let Some(path) = avatar {
            sender = sender.with_avatar(path)?;
        }
        Ok(Self {
            sender,
            message: fields.message.clone(),
            conversation_identifier: fields.thread_id.clone(),
        })
    }
}

/// Communication-style metadata attached to rendered content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunicationContext {
    pub sender: SenderIdentity,
    pub conversation_identifier: Option<String>,
}

impl From<MessageIntent> for CommunicationContext {
    fn from(intent: MessageIntent) -> Self {
        Self {
            sender: intent.sender,
            conversation_identifier: intent.conversation_identifier,
        }
    }
}
