// Service configuration
// Defaults match a notification service extension running under a ~30s host budget

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{EnrichmentError, EnrichmentResult};

/// Sender id used when the payload carries no `fromUid`
pub const UNKNOWN_SENDER_ID: &str = "unknown";

/// Display name used when neither `senderName` nor the original title is present
pub const DEFAULT_SENDER_NAME: &str = "New Message";

/// 10MB, same ceiling the platform enforces on attachments
pub const DEFAULT_MAX_AVATAR_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Localized fallback display name
    pub default_sender_name: String,
    /// Sentinel sender id for payloads without `fromUid`
    pub unknown_sender_id: String,
    /// Directory for downloaded avatars; the OS temp dir when unset
    pub scratch_dir: Option<PathBuf>,
    pub max_avatar_bytes: u64,
    pub user_agent: String,
    /// Milliseconds. Unset by default: the host deadline bounds the fetch
    pub connect_timeout_ms: Option<u64>,
    /// Milliseconds. Unset by default: the host deadline bounds the fetch
    pub request_timeout_ms: Option<u64>,
    /// Milliseconds granted by `run_with_budget` before expiring the invocation
    pub time_budget_ms: u64,
    /// Host OS version, compared against renderer minimums ("17.0", "15.4.1")
    pub platform_version: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            default_sender_name: DEFAULT_SENDER_NAME.to_string(),
            unknown_sender_id: UNKNOWN_SENDER_ID.to_string(),
            scratch_dir: None,
            max_avatar_bytes: DEFAULT_MAX_AVATAR_BYTES,
            user_agent: format!("KODEGEN-NotifyEnrich/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout_ms: None,
            request_timeout_ms: None,
            time_budget_ms: 30_000,
            platform_version: "17.0".to_string(),
        }
    }
}

impl EnrichmentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> EnrichmentResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| EnrichmentError::Config {
            message: format!("Failed to parse config: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> EnrichmentResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| EnrichmentError::io(format!("reading config {}", path.display()), e))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> EnrichmentResult<()> {
        if self.default_sender_name.trim().is_empty() {
            return Err(EnrichmentError::Config {
                message: "default_sender_name cannot be empty".to_string(),
            });
        }
        if self.max_avatar_bytes == 0 {
            return Err(EnrichmentError::Config {
                message: "max_avatar_bytes must be greater than zero".to_string(),
            });
        }
        if self.time_budget_ms == 0 {
            return Err(EnrichmentError::Config {
                message: "time_budget_ms must be greater than zero".to_string(),
            });
        }
        // A zero timeout makes every fetch fail immediately
        for (name, timeout) in [
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("request_timeout_ms", self.request_timeout_ms),
        ] {
            if timeout == Some(0) {
                return Err(EnrichmentError::Config {
                    message: format!("{} must be greater than zero when set", name),
                });
            }
        }
        if parse_version(&self.platform_version).is_none() {
            return Err(EnrichmentError::Config {
                message: format!("platform_version '{}' is not a version", self.platform_version),
            });
        }
        Ok(())
    }

    pub fn with_default_sender_name(mut self, name: impl Into<String>) -> Self {
        self.default_sender_name = name.into();
        self
    }

    pub fn with_unknown_sender_id(mut self, id: impl Into<String>) -> Self {
        self.unknown_sender_id = id.into();
        self
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn with_max_avatar_bytes(mut self, limit: u64) -> Self {
        self.max_avatar_bytes = limit;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = Some(duration_ms(timeout));
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = Some(duration_ms(timeout));
        self
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget_ms = duration_ms(budget);
        self
    }

    pub fn with_platform_version(mut self, version: impl Into<String>) -> Self {
        self.platform_version = version.into();
        self
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }
}

/// Whole milliseconds, rounding a nonzero sub-millisecond remainder up
fn duration_ms(duration: Duration) -> u64 {
    let ms = duration.as_millis();
    let ms = if duration.subsec_nanos() % 1_000_000 != 0 { ms + 1 } else { ms };
    u64::try_from(ms).unwrap_or(u64::MAX)
}

/// Parse a dotted version into (major, minor, patch); missing parts are zero
pub fn parse_version(version: &str) -> Option<(u32, u32, u32)> {
    let mut parts = version.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = match parts.next() {
        Some(p) => p.parse().ok()?,
        None => 0,
    };
    let patch = match parts.next() {
        Some(p) => p.parse().ok()?,
        None => 0,
    };
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor, patch))
}
