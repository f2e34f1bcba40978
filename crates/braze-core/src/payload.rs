//! Version-tagged event payloads and message-id projection.
//!
//! The adapter keeps one internal representation of a message identity (an
//! opaque string) and projects it into the shape each protocol revision
//! expects at the boundary, instead of branching on the version at every
//! call site. [`MessageId`] is that projection type.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ApiError, ApiResult};
use crate::segment::Segment;

// =============================================================================
// Protocol versions
// =============================================================================

/// OneBot protocol revisions spoken by downstream consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Version {
    /// The legacy revision; requires integer message ids on the wire.
    V11,
    /// The current revision; message ids are opaque strings.
    V12,
}

impl Version {
    /// Whether this revision requires integer message ids.
    pub fn is_legacy(self) -> bool {
        matches!(self, Version::V11)
    }
}

// =============================================================================
// Event kinds
// =============================================================================

/// Broad class of an inbound backend event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Message,
    Notice,
    Request,
}

impl EventKind {
    /// The emission topic for this kind.
    pub fn topic(self) -> &'static str {
        match self {
            EventKind::Message => "message.receive",
            EventKind::Notice => "notice.receive",
            EventKind::Request => "request.receive",
        }
    }
}

/// Raw-event fields that may carry the detail type, probed in order.
pub const DETAIL_TYPE_FIELDS: [&str; 3] = ["message_type", "notice_type", "request_type"];

// =============================================================================
// Message ids
// =============================================================================

/// A message id projected for a protocol version: an integer for the legacy
/// revision, an opaque string otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Int(i32),
    Str(String),
}

impl MessageId {
    /// Reads a message id from a JSON value.
    pub fn from_value(value: &Value) -> ApiResult<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(|n| MessageId::Int(n as i32))
                .ok_or_else(|| ApiError::invalid("message id must be an integer or a string")),
            Value::String(s) => Ok(MessageId::Str(s.clone())),
            _ => Err(ApiError::invalid(
                "message id must be an integer or a string",
            )),
        }
    }
}

impl From<i32> for MessageId {
    fn from(id: i32) -> Self {
        MessageId::Int(id)
    }
}

impl From<String> for MessageId {
    fn from(id: String) -> Self {
        MessageId::Str(id)
    }
}

impl From<MessageId> for Value {
    fn from(id: MessageId) -> Self {
        match id {
            MessageId::Int(n) => Value::from(n),
            MessageId::Str(s) => Value::from(s),
        }
    }
}

/// Result of a send operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageReceipt {
    /// The sent message's identity, in the shape of the requested version.
    pub message_id: MessageId,
}

// =============================================================================
// Normalized payloads
// =============================================================================

/// The emitting account, as seen by downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfRef {
    /// Backend platform tag.
    pub platform: String,
    /// The bot's own account number.
    pub user_id: i64,
}

/// A normalized, version-correct event payload.
///
/// Fields the normalizer derives are lifted into the struct; everything else
/// from the raw backend event is carried in `rest` and serialized inline, so
/// unknown raw fields pass through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// Event id; a random token when the raw event carries none.
    pub id: String,
    /// Event class.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Protocol revision this payload is shaped for.
    pub version: Version,
    /// The emitting account.
    #[serde(rename = "self")]
    pub self_ref: SelfRef,
    /// First non-null of the raw `message_type` / `notice_type` /
    /// `request_type` fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail_type: Option<String>,
    /// Backend platform tag.
    pub platform: String,
    /// All remaining raw event fields, unchanged.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl Payload {
    /// The message body segments, when present.
    pub fn message(&self) -> Option<&Vec<Value>> {
        self.rest.get("message").and_then(Value::as_array)
    }

    /// Parses the message body into [`Segment`]s, when present.
    pub fn segments(&self) -> ApiResult<Vec<Segment>> {
        match self.rest.get("message") {
            Some(value) => serde_json::from_value(value.clone()).map_err(Into::into),
            None => Ok(Vec::new()),
        }
    }
}
