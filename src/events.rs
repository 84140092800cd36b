//! Typed view of the events published on the `/event` stream.
//!
//! The stream itself yields raw JSON. [`Event::from_value`] reads the `type`
//! discriminator first and hands `properties` to the one decoder registered for
//! that type. Types this client does not know, and known types whose payload
//! does not decode, come back as [`Event::Unknown`] with the original JSON.
//!
//! # Example
//!
//! ```
//! use opencode_sdk::Event;
//! use serde_json::json;
//!
//! let event = Event::from_value(json!({
//!     "type": "session.idle",
//!     "properties": {"sessionID": "ses_1"}
//! }));
//! assert_eq!(event.event_type(), "session.idle");
//! assert_eq!(event.session_id(), Some("ses_1"));
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An event received from the server's event bus.
///
/// # Forward Compatibility
///
/// New event types are added over time. Always include a wildcard arm, and
/// use [`Event::Unknown`] to inspect anything this version cannot decode.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Event {
    /// First event on every connection.
    ServerConnected(Map<String, Value>),
    InstallationUpdated(InstallationUpdated),
    LspClientDiagnostics(LspClientDiagnostics),
    MessageUpdated(InfoProperties),
    MessageRemoved(MessageRemoved),
    MessagePartUpdated(MessagePartUpdated),
    MessagePartRemoved(MessagePartRemoved),
    PermissionUpdated(Map<String, Value>),
    PermissionReplied(PermissionReplied),
    FileEdited(FileEdited),
    FileWatcherUpdated(FileWatcherUpdated),
    SessionUpdated(InfoProperties),
    SessionDeleted(InfoProperties),
    SessionIdle(SessionRef),
    SessionCompacted(SessionRef),
    SessionError(SessionErrorProperties),
    IdeInstalled(IdeInstalled),
    /// An event type this client does not recognize, or one whose payload
    /// failed to decode.
    Unknown {
        /// The `type` field as received
        event_type: String,
        /// The complete event object
        raw: Value,
    },
}

/// `installation.updated`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallationUpdated {
    pub version: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `lsp.client.diagnostics`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LspClientDiagnostics {
    #[serde(rename = "serverID")]
    pub server_id: String,
    pub path: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload of events that carry a whole session or message object.
///
/// `info` is left as raw JSON; its schema belongs to the generated model layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoProperties {
    pub info: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `message.removed`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRemoved {
    #[serde(rename = "sessionID")]
    pub session_id: String,
    #[serde(rename = "messageID")]
    pub message_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `message.part.updated`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePartUpdated {
    pub part: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `message.part.removed`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePartRemoved {
    #[serde(rename = "sessionID")]
    pub session_id: String,
    #[serde(rename = "messageID")]
    pub message_id: String,
    #[serde(rename = "partID")]
    pub part_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `permission.replied`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionReplied {
    #[serde(rename = "sessionID")]
    pub session_id: String,
    #[serde(rename = "permissionID")]
    pub permission_id: String,
    pub response: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `file.edited`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEdited {
    pub file: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileWatchEvent {
    Add,
    Change,
    Unlink,
}

/// `file.watcher.updated`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileWatcherUpdated {
    pub file: String,
    pub event: FileWatchEvent,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload naming a single session (`session.idle`, `session.compacted`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRef {
    #[serde(rename = "sessionID")]
    pub session_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `session.error`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionErrorProperties {
    #[serde(rename = "sessionID", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SessionErrorKind>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The error attached to a `session.error` event, keyed by its `name` field.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SessionErrorKind {
    ProviderAuth(Map<String, Value>),
    Unknown(Map<String, Value>),
    MessageOutputLength(Map<String, Value>),
    MessageAborted(Map<String, Value>),
    /// An error name this client does not recognize.
    Other { name: String, raw: Value },
}

impl SessionErrorKind {
    /// The `name` discriminator as sent by the server.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::ProviderAuth(_) => "ProviderAuthError",
            Self::Unknown(_) => "UnknownError",
            Self::MessageOutputLength(_) => "MessageOutputLengthError",
            Self::MessageAborted(_) => "MessageAbortedError",
            Self::Other { name, .. } => name,
        }
    }

    /// The human-readable message, when the error carries one.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::ProviderAuth(data)
            | Self::Unknown(data)
            | Self::MessageOutputLength(data)
            | Self::MessageAborted(data) => data.get("message").and_then(Value::as_str),
            Self::Other { raw, .. } => raw
                .get("data")
                .and_then(|d| d.get("message"))
                .and_then(Value::as_str),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Self::Other { raw, .. } => raw.clone(),
            Self::ProviderAuth(data)
            | Self::Unknown(data)
            | Self::MessageOutputLength(data)
            | Self::MessageAborted(data) => serde_json::json!({
                "name": self.name(),
                "data": data,
            }),
        }
    }
}

impl Serialize for SessionErrorKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SessionErrorKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let data = value
            .get("data")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        Ok(match name.as_str() {
            "ProviderAuthError" => Self::ProviderAuth(data),
            "UnknownError" => Self::Unknown(data),
            "MessageOutputLengthError" => Self::MessageOutputLength(data),
            "MessageAbortedError" => Self::MessageAborted(data),
            _ => Self::Other { name, raw: value },
        })
    }
}

fn properties<T: DeserializeOwned>(properties: Value) -> Result<T, serde_json::Error> {
    serde_json::from_value(properties)
}

fn properties_map(properties: Value) -> Result<Map<String, Value>, serde_json::Error> {
    match properties {
        Value::Null => Ok(Map::new()),
        other => serde_json::from_value(other),
    }
}

impl Event {
    /// Decodes a raw stream event by its `type` discriminator. Never fails.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        let Some(event_type) = value.get("type").and_then(Value::as_str).map(String::from) else {
            tracing::warn!("Event is missing a string `type` field");
            return Self::Unknown {
                event_type: String::new(),
                raw: value,
            };
        };
        let props = value.get("properties").cloned().unwrap_or(Value::Null);

        let decoded = match event_type.as_str() {
            "server.connected" => properties_map(props).map(Self::ServerConnected),
            "installation.updated" => properties(props).map(Self::InstallationUpdated),
            "lsp.client.diagnostics" => properties(props).map(Self::LspClientDiagnostics),
            "message.updated" => properties(props).map(Self::MessageUpdated),
            "message.removed" => properties(props).map(Self::MessageRemoved),
            "message.part.updated" => properties(props).map(Self::MessagePartUpdated),
            "message.part.removed" => properties(props).map(Self::MessagePartRemoved),
            "permission.updated" => properties_map(props).map(Self::PermissionUpdated),
            "permission.replied" => properties(props).map(Self::PermissionReplied),
            "file.edited" => properties(props).map(Self::FileEdited),
            "file.watcher.updated" => properties(props).map(Self::FileWatcherUpdated),
            "session.updated" => properties(props).map(Self::SessionUpdated),
            "session.deleted" => properties(props).map(Self::SessionDeleted),
            "session.idle" => properties(props).map(Self::SessionIdle),
            "session.compacted" => properties(props).map(Self::SessionCompacted),
            "session.error" => properties(props).map(Self::SessionError),
            "ide.installed" => properties(props).map(Self::IdeInstalled),
            _ => {
                return Self::Unknown {
                    event_type,
                    raw: value,
                };
            }
        };

        decoded.unwrap_or_else(|e| {
            tracing::warn!(
                "Event '{}' has unexpected properties: {}. Keeping it as Unknown.",
                event_type,
                e
            );
            Self::Unknown {
                event_type,
                raw: value,
            }
        })
    }

    /// The `type` discriminator of this event.
    #[must_use]
    pub fn event_type(&self) -> &str {
        match self {
            Self::ServerConnected(_) => "server.connected",
            Self::InstallationUpdated(_) => "installation.updated",
            Self::LspClientDiagnostics(_) => "lsp.client.diagnostics",
            Self::MessageUpdated(_) => "message.updated",
            Self::MessageRemoved(_) => "message.removed",
            Self::MessagePartUpdated(_) => "message.part.updated",
            Self::MessagePartRemoved(_) => "message.part.removed",
            Self::PermissionUpdated(_) => "permission.updated",
            Self::PermissionReplied(_) => "permission.replied",
            Self::FileEdited(_) => "file.edited",
            Self::FileWatcherUpdated(_) => "file.watcher.updated",
            Self::SessionUpdated(_) => "session.updated",
            Self::SessionDeleted(_) => "session.deleted",
            Self::SessionIdle(_) => "session.idle",
            Self::SessionCompacted(_) => "session.compacted",
            Self::SessionError(_) => "session.error",
            Self::IdeInstalled(_) => "ide.installed",
            Self::Unknown { event_type, .. } => event_type,
        }
    }

    /// The session this event concerns, for events that name one directly.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::MessageRemoved(p) => Some(&p.session_id),
            Self::MessagePartRemoved(p) => Some(&p.session_id),
            Self::PermissionReplied(p) => Some(&p.session_id),
            Self::SessionIdle(p) | Self::SessionCompacted(p) => Some(&p.session_id),
            Self::SessionError(p) => p.session_id.as_deref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown { .. })
    }

    /// Re-encodes the event into its wire shape.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let props = match self {
            Self::Unknown { raw, .. } => return raw.clone(),
            Self::ServerConnected(map) | Self::PermissionUpdated(map) => {
                Ok(Value::Object(map.clone()))
            }
            Self::InstallationUpdated(p) => serde_json::to_value(p),
            Self::LspClientDiagnostics(p) => serde_json::to_value(p),
            Self::MessageUpdated(p) | Self::SessionUpdated(p) | Self::SessionDeleted(p) => {
                serde_json::to_value(p)
            }
            Self::MessageRemoved(p) => serde_json::to_value(p),
            Self::MessagePartUpdated(p) => serde_json::to_value(p),
            Self::MessagePartRemoved(p) => serde_json::to_value(p),
            Self::PermissionReplied(p) => serde_json::to_value(p),
            Self::FileEdited(p) => serde_json::to_value(p),
            Self::FileWatcherUpdated(p) => serde_json::to_value(p),
            Self::SessionIdle(p) | Self::SessionCompacted(p) => serde_json::to_value(p),
            Self::SessionError(p) => serde_json::to_value(p),
            Self::IdeInstalled(p) => serde_json::to_value(p),
        };
        serde_json::json!({
            "type": self.event_type(),
            "properties": props.unwrap_or(Value::Null),
        })
    }
}

impl From<Value> for Event {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

impl Serialize for Event {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

/// `ide.installed`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeInstalled {
    pub ide: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
