//! Inbound event normalization.
//!
//! Converts a raw backend event into a version-correct [`Payload`]:
//! derived fields are lifted (`id`, `detail_type`, `self`), a quoted-message
//! descriptor is reconstructed into a leading `reply` segment, message
//! events get their `alt_message` text, and message ids are projected into
//! the requested version's shape. Every other raw field passes through
//! unchanged.

use serde_json::{Map, Value, json};
use tracing::trace;
use uuid::Uuid;

use braze_core::{DETAIL_TYPE_FIELDS, Payload, RawEvent, SelfRef, Version};

use crate::codec::{MessageIdRegistry, MessageRef};

/// Normalizes one raw backend event for the given protocol version.
pub(crate) fn normalize_event(
    registry: &MessageIdRegistry,
    platform: &str,
    version: Version,
    event: RawEvent,
) -> Payload {
    let RawEvent { kind, data } = event;
    let mut rest = match data {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let id = match rest.remove("id") {
        Some(Value::String(id)) => id,
        Some(Value::Number(id)) => id.to_string(),
        _ => Uuid::new_v4().simple().to_string(),
    };
    let detail_type = DETAIL_TYPE_FIELDS
        .iter()
        .find_map(|field| rest.get(*field).and_then(Value::as_str))
        .map(str::to_string);
    let self_ref = SelfRef {
        platform: platform.to_string(),
        user_id: rest.get("self_id").and_then(Value::as_i64).unwrap_or_default(),
    };

    if let Some(source) = rest.get("source").cloned() {
        let reply_id = quoted_message_id(registry, version, &rest, &source);
        splice_reply(&mut rest, detail_type.as_deref(), reply_id);
    }

    if kind == braze_core::EventKind::Message {
        let alt = rest
            .get("raw_message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        rest.insert("alt_message".into(), Value::from(alt));
    }

    if version.is_legacy()
        && let Some(Value::String(message_id)) = rest.get("message_id")
    {
        let n = registry.to_int(message_id);
        rest.insert("message_id".into(), Value::from(n));
    }

    trace!(%id, ?detail_type, "normalized inbound event");
    Payload {
        id,
        kind,
        version,
        self_ref,
        detail_type,
        platform: platform.to_string(),
        rest,
    }
}

/// Reconstructs the quoted message's identity from the `source` descriptor
/// and projects it into the requested version's id shape.
fn quoted_message_id(
    registry: &MessageIdRegistry,
    version: Version,
    rest: &Map<String, Value>,
    source: &Value,
) -> Value {
    let seq = field_i64(source, "seq") as i32;
    let rand = field_i64(source, "rand") as i32;
    let time = field_i64(source, "time");
    let sender = rest
        .get("sender")
        .map(|s| field_i64(s, "user_id"))
        .unwrap_or_default();

    let message_ref = if rest.get("message_type").and_then(Value::as_str) == Some("group") {
        MessageRef::Group {
            group_id: rest.get("group_id").and_then(Value::as_i64).unwrap_or_default(),
            user_id: sender,
            seq,
            rand,
            time,
            pktnum: source
                .get("pktnum")
                .and_then(Value::as_u64)
                .unwrap_or(1) as u8,
        }
    } else {
        MessageRef::Dm {
            user_id: sender,
            seq,
            rand,
            time,
        }
    };

    let message_id = message_ref.encode();
    if version.is_legacy() {
        Value::from(registry.to_int(&message_id))
    } else {
        Value::from(message_id)
    }
}

/// Inserts the synthesized reply segment into the message body.
///
/// Group messages whose first segment is an `at` mention already reference
/// the quoted sender, so the mention is replaced instead of duplicated;
/// everywhere else the reply is prepended.
fn splice_reply(rest: &mut Map<String, Value>, detail_type: Option<&str>, reply_id: Value) {
    let reply = json!({"type": "reply", "data": {"id": reply_id}});
    let message = rest
        .entry("message")
        .or_insert_with(|| Value::Array(Vec::new()));
    let Value::Array(message) = message else {
        return;
    };
    let leading_at = detail_type == Some("group")
        && message
            .first()
            .and_then(|segment| segment.get("type"))
            .and_then(Value::as_str)
            == Some("at");
    if leading_at {
        message[0] = reply;
    } else {
        message.insert(0, reply);
    }
}

fn field_i64(value: &Value, key: &str) -> i64 {
    value.get(key).and_then(Value::as_i64).unwrap_or_default()
}
