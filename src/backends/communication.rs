// Communication-style rendering
// Attaches sender identity and avatar so the host shows the message inline

use crate::components::config::parse_version;
use crate::components::{
    EnrichmentConfig, EnrichmentError, EnrichmentResult, MessageIntent, NotificationContent,
};

/// First platform release that renders communication notifications
pub const COMMUNICATION_MIN_VERSION: (u32, u32, u32) = (15, 0, 0);

/// Platform seam that turns plain content into communication-style content.
///
/// On a device this wraps the platform's message intent donation; the
/// content it returns replaces the best attempt. An error leaves the
/// content as it was before rendering.
pub trait CommunicationRenderer: Send + Sync {
    fn render(
        &self,
        content: &NotificationContent,
        intent: MessageIntent,
    ) -> EnrichmentResult<NotificationContent>;
}

/// Default renderer: embeds the intent as `CommunicationContext` when the
/// host platform is recent enough
#[derive(Debug, Clone)]
pub struct CommunicationStyleRenderer {
    platform_version: String,
}

impl CommunicationStyleRenderer {
    pub fn new(platform_version: impl Into<String>) -> Self {
        Self {
            platform_version: platform_version.into(),
        }
    }

    pub fn from_config(config: &EnrichmentConfig) -> Self {
        Self::new(config.platform_version.clone())
    }

    pub fn supports_communication(&self) -> bool {
        parse_version(&self.platform_version).is_some_and(|v| v >= COMMUNICATION_MIN_VERSION)
    }
}

impl CommunicationRenderer for CommunicationStyleRenderer {
    fn render(
        &self,
        content: &NotificationContent,
        intent: MessageIntent,
    ) -> EnrichmentResult<NotificationContent> {
        if !self.supports_communication() {
            let (major, minor, patch) = COMMUNICATION_MIN_VERSION;
            return Err(EnrichmentError::UnsupportedPlatform {
                feature: "communication notifications".to_string(),
                required: format!("{}.{}.{}", major, minor, patch),
                actual: self.platform_version.clone(),
            });
        }

        let mut rendered = content.clone();
        if let Some(conversation) = &intent.conversation_identifier {
            rendered.thread_identifier = Some(conversation.clone());
        }
        rendered.communication = Some(intent.into());
        Ok(rendered)
    }
}

impl<R: CommunicationRenderer + ?Sized> CommunicationRenderer for Box<R> {
    fn render(
        &self,
        content: &NotificationContent,
        intent: MessageIntent,
    ) -> EnrichmentResult<NotificationContent> {
        (**self).render(content, intent)
    }
}

impl<R: CommunicationRenderer + ?Sized> CommunicationRenderer for std::sync::Arc<R> {
    fn render(
        &self,
        content: &NotificationContent,
        intent: MessageIntent,
    ) -> EnrichmentResult<NotificationContent> {
        (**self).render(content, intent)
    }
}
