//! The backend client capability surface.
//!
//! The adapter consumes the underlying QQ client only through [`QqClient`]:
//! send a message, fetch or recall a stored one, log in and out, run the two
//! side-effecting share actions, and a generic call fallback. Connection
//! management, transport, and interactive credential flows stay on the other
//! side of this trait.

use std::collections::BTreeMap;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use braze_core::ApiResult;

// =============================================================================
// Native message elements
// =============================================================================

/// A field of a native message element.
///
/// Most fields are plain JSON, but two shapes need more: binary payloads
/// produced by `base64://` decoding, and the nested element list of a
/// forward node.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Plain JSON value, forwarded unchanged.
    Json(Value),
    /// Raw bytes (a decoded `base64://` payload).
    Binary(Vec<u8>),
    /// Nested elements (a forward node's message body).
    Nodes(Vec<Element>),
}

/// A backend-native message element.
///
/// Serializes flat, matching the backend wire shape:
/// `{"type": kind, ...fields}`, with binary fields re-armored as plain
/// base64 strings.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Element type tag (`text`, `image`, `quote`, `node`, ...).
    pub kind: String,
    /// Element fields.
    pub fields: BTreeMap<String, FieldValue>,
}

impl Element {
    /// Creates an empty element of the given type.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Creates an element carrying the given JSON fields.
    pub fn from_object(kind: impl Into<String>, fields: Map<String, Value>) -> Self {
        let mut element = Self::new(kind);
        for (key, value) in fields {
            element.fields.insert(key, FieldValue::Json(value));
        }
        element
    }

    /// Inserts a JSON field (builder style).
    pub fn with_json(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), FieldValue::Json(value.into()));
        self
    }

    /// Inserts a binary field (builder style).
    pub fn with_binary(mut self, key: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.fields.insert(key.into(), FieldValue::Binary(bytes));
        self
    }

    /// Returns a field as a JSON value, if present and JSON.
    pub fn json(&self, key: &str) -> Option<&Value> {
        match self.fields.get(key) {
            Some(FieldValue::Json(value)) => Some(value),
            _ => None,
        }
    }

    /// Returns a field as raw bytes, if present and binary.
    pub fn binary(&self, key: &str) -> Option<&[u8]> {
        match self.fields.get(key) {
            Some(FieldValue::Binary(bytes)) => Some(bytes),
            _ => None,
        }
    }

    /// Returns the nested element list, if this is a forward node.
    pub fn nodes(&self, key: &str) -> Option<&[Element]> {
        match self.fields.get(key) {
            Some(FieldValue::Nodes(elements)) => Some(elements),
            _ => None,
        }
    }
}

impl Serialize for Element {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry("type", &self.kind)?;
        for (key, value) in &self.fields {
            match value {
                FieldValue::Json(v) => map.serialize_entry(key, v)?,
                FieldValue::Binary(bytes) => map.serialize_entry(key, &BASE64.encode(bytes))?,
                FieldValue::Nodes(elements) => map.serialize_entry(key, elements)?,
            }
        }
        map.end()
    }
}

// =============================================================================
// Conversation handles and receipts
// =============================================================================

/// A picked conversation handle, the target of side-effecting share actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contact {
    /// A direct conversation with a friend.
    Friend(i64),
    /// A group conversation.
    Group(i64),
}

/// Identity returned by the backend for a private or group send.
#[derive(Debug, Clone, Deserialize)]
pub struct SendReceipt {
    /// The backend's opaque message id.
    pub message_id: String,
}

/// Identity returned by the backend for a guild-channel send.
#[derive(Debug, Clone, Deserialize)]
pub struct GuildReceipt {
    pub seq: i64,
    pub rand: i64,
    pub time: i64,
}

/// Login identity reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginInfo {
    pub user_id: i64,
    pub nickname: String,
}

// =============================================================================
// Capability trait
// =============================================================================

/// Narrow capability surface of the backend QQ client.
///
/// All calls are asynchronous and may fail; failures propagate to the caller
/// unchanged. Whatever timeout the backend enforces governs overall latency —
/// the adapter imposes none of its own.
#[async_trait]
pub trait QqClient: Send + Sync {
    /// Sends a private message, optionally quoting a stored message object.
    async fn send_private_msg(
        &self,
        user_id: i64,
        elements: Vec<Element>,
        quote: Option<Value>,
    ) -> ApiResult<SendReceipt>;

    /// Sends a group message, optionally quoting a stored message object.
    async fn send_group_msg(
        &self,
        group_id: i64,
        elements: Vec<Element>,
        quote: Option<Value>,
    ) -> ApiResult<SendReceipt>;

    /// Sends a guild-channel message.
    async fn send_guild_msg(
        &self,
        guild_id: &str,
        channel_id: &str,
        elements: Vec<Element>,
    ) -> ApiResult<GuildReceipt>;

    /// Fetches a stored message as the backend's raw object, including its
    /// native `message` element list and `source` quote descriptor.
    async fn get_msg(&self, message_id: &str) -> ApiResult<Value>;

    /// Recalls a message. Returns whether the backend accepted the recall.
    async fn delete_msg(&self, message_id: &str) -> ApiResult<bool>;

    /// Logs the account in.
    async fn login(&self, uin: i64, password: Option<&str>) -> ApiResult<()>;

    /// Logs the account out.
    async fn logout(&self) -> ApiResult<()>;

    /// Returns the logged-in account's identity.
    async fn login_info(&self) -> ApiResult<LoginInfo>;

    /// Shares a music card into the picked conversation.
    async fn share_music(&self, contact: Contact, data: Map<String, Value>) -> ApiResult<()>;

    /// Shares a URL card into the picked conversation.
    async fn share_url(&self, contact: Contact, data: Map<String, Value>) -> ApiResult<()>;

    /// Generic fallback for methods the adapter does not implement locally.
    async fn call(&self, method: &str, args: Vec<Value>) -> ApiResult<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn element_serializes_flat() {
        let element = Element::new("text").with_json("text", "hi");
        assert_eq!(
            serde_json::to_value(&element).unwrap(),
            json!({"type": "text", "text": "hi"})
        );
    }

    #[test]
    fn binary_fields_rearmor_as_base64() {
        let element = Element::new("image").with_binary("file", b"hello".to_vec());
        assert_eq!(
            serde_json::to_value(&element).unwrap(),
            json!({"type": "image", "file": "aGVsbG8="})
        );
    }

    #[test]
    fn node_elements_nest() {
        let nested = Element::new("text").with_json("text", "inner");
        let mut node = Element::new("node").with_json("user_id", 42);
        node.fields
            .insert("message".into(), FieldValue::Nodes(vec![nested]));
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({"type": "node", "message": [{"type": "text", "text": "inner"}], "user_id": 42})
        );
    }
}
