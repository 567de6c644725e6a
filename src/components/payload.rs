// Push payload decoding
// Typed view of the APNs envelope and flattening of application fields

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::{EnrichmentError, EnrichmentResult};

/// Key of the nested application dictionary that overrides top-level fields
pub const DATA_KEY: &str = "data";

/// Key of the APNs envelope
pub const APS_KEY: &str = "aps";

/// Untyped push payload exactly as the host delivered it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawPayload(Map<String, Value>);

impl RawPayload {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Parse a payload from the JSON the host shim received
    pub fn from_json_str(json: &str) -> EnrichmentResult<Self> {
        match serde_json::from_str::<Value>(json) {
            Ok(Value::Object(map)) => Ok(Self(map)),
            Ok(other) => Err(EnrichmentError::MalformedPayload {
                message: format!("expected a JSON object, found {}", json_kind(&other)),
            }),
            Err(e) => Err(EnrichmentError::MalformedPayload {
                message: e.to_string(),
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Typed APNs envelope; a missing or malformed `aps` yields an empty one
    pub fn aps(&self) -> Aps {
        match self.0.get(APS_KEY) {
            Some(value) => Aps::deserialize(value).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed aps dictionary: {}", e);
                Aps::default()
            }),
            None => Aps::default(),
        }
    }
}

impl From<Map<String, Value>> for RawPayload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// The `aps` dictionary of an APNs payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Aps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert: Option<ApsAlert>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<u32>,
    /// Either a sound name or a critical-alert dictionary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub mutable_content: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub content_available: bool,
}

/// `aps.alert` is either a bare string (the body) or a dictionary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApsAlert {
    Text(String),
    Fields {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subtitle: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,
    },
}

impl ApsAlert {
    pub fn title(&self) -> Option<&str> {
        match self {
            ApsAlert::Text(_) => None,
            ApsAlert::Fields { title, .. } => title.as_deref(),
        }
    }

    pub fn subtitle(&self) -> Option<&str> {
        match self {
            ApsAlert::Text(_) => None,
            ApsAlert::Fields { subtitle, .. } => subtitle.as_deref(),
        }
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            ApsAlert::Text(body) => Some(body),
            ApsAlert::Fields { body, .. } => body.as_deref(),
        }
    }
}

/// Providers send `1`, `true` or `"1"` for the APNs flags
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        Value::String(s) => matches!(s.trim(), "1" | "true"),
        _ => false,
    })
}

/// Flat string mapping of application fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedPayload(BTreeMap<String, String>);

impl NormalizedPayload {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Value for `key` unless it is missing or whitespace-only
    pub fn non_blank(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|value| !value.trim().is_empty())
    }

    /// First non-blank value among `keys`, in order
    pub fn first_non_blank(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.non_blank(key))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for NormalizedPayload {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Flatten the payload's application fields.
///
/// A nested `data` object wins over the top level entirely. `data` may also
/// arrive as a JSON-encoded string holding an object. Values that have no
/// scalar text form (objects, arrays, null) are dropped.
pub fn normalize(payload: &RawPayload) -> NormalizedPayload {
    let source: Cow<'_, Map<String, Value>> = match payload.get(DATA_KEY) {
        Some(Value::Object(data)) => Cow::Borrowed(data),
        Some(Value::String(encoded)) => match serde_json::from_str::<Value>(encoded) {
            Ok(Value::Object(data)) => Cow::Owned(data),
            _ => {
                tracing::debug!("String data field is not an encoded object, using top-level fields");
                Cow::Borrowed(payload.as_map())
            }
        },
        _ => Cow::Borrowed(payload.as_map()),
    };

    source
        .iter()
        .filter_map(|(key, value)| scalar_text(value).map(|text| (key.clone(), text)))
        .collect()
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
