// Notification enrichment components
// Payload decoding, display field derivation, mutable content and invocation lifecycle

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod config;
pub mod content;
pub mod fields;
pub mod lifecycle;
pub mod payload;

pub use config::EnrichmentConfig;
pub use content::{
    CommunicationContext, MessageIntent, NotificationContent, SenderIdentity,
};
pub use fields::DisplayFields;
pub use lifecycle::{CompletionGuard, FinalizePath, Invocation, InvocationState};
pub use payload::{Aps, ApsAlert, NormalizedPayload, RawPayload, normalize};

/// Per-invocation identifier carried on tracing spans and finalize reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvocationId(Uuid);

impl InvocationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for InvocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for InvocationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Failures raised inside the enrichment flow.
///
/// None of these reach the host: every site that can produce one degrades
/// to a default and logs it. Only config loading and client construction
/// return them to the embedding code.
#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    /// Avatar URL did not parse or used a scheme other than http/https
    #[error("Invalid avatar URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Transport-level failure while fetching a resource
    #[error("Network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered, but not with a 2xx status
    #[error("HTTP {status} fetching {url}")]
    HttpStatus { url: String, status: u16 },

    /// Server answered with no bytes
    #[error("Empty response body from {url}")]
    EmptyBody { url: String },

    /// Response exceeded the configured avatar limit
    #[error("Resource from {url} too large: {size} bytes exceeds {limit} byte limit")]
    TooLarge { url: String, size: u64, limit: u64 },

    /// Local file system failure (scratch file creation, write, persist, read)
    #[error("I/O error during {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// Host platform is older than the feature requires
    #[error("{feature} requires platform version {required}, host reports {actual}")]
    UnsupportedPlatform {
        feature: String,
        required: String,
        actual: String,
    },

    /// Sender identity or communication-style rendering could not be built
    #[error("Rendering error: {message}")]
    Rendering { message: String },

    /// Host delivered bytes that are not a JSON object
    #[error("Malformed push payload: {message}")]
    MalformedPayload { message: String },

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl EnrichmentError {
    pub(crate) fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        EnrichmentError::Io {
            operation: operation.into(),
            source,
        }
    }
}

/// Type alias for enrichment results
pub type EnrichmentResult<T> = Result<T, EnrichmentError>;
