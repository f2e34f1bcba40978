//! Outbound segment encoding.
//!
//! Converts an ordered list of generic [`Segment`]s into the backend's
//! native [`Element`] list. Encoding is recursive: a `node` segment's nested
//! content is itself a segment list, encoded against the node's sender as a
//! private-scope target.
//!
//! Two segment types produce no output element at all — `music` and `share`
//! dispatch a side-effecting share action against the picked conversation
//! handle instead. Unrecognized types pass through with their data unchanged.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Map, Value};
use tracing::trace;

use braze_core::{ApiError, ApiResult, Segment, Version};

use crate::client::{Contact, Element, FieldValue, QqClient};
use crate::codec::{MessageIdRegistry, resolve_message_id_value};

/// Prefix marking a base64-armored binary payload in a file field.
const BASE64_MARKER: &str = "base64://";

/// The two fields that may carry an armored binary payload.
const BINARY_FIELDS: [&str; 2] = ["file", "file_id"];

/// Addressing context for an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// A direct conversation.
    Private { user_id: i64 },
    /// A group conversation.
    Group { group_id: i64 },
    /// A guild channel. Share actions have no conversation handle here.
    Channel,
}

impl Target {
    /// Picks the conversation handle for side-effecting share actions.
    fn contact(self) -> ApiResult<Contact> {
        match self {
            Target::Private { user_id } => Ok(Contact::Friend(user_id)),
            Target::Group { group_id } => Ok(Contact::Group(group_id)),
            Target::Channel => Err(ApiError::invalid(
                "share actions are not available in channel scope",
            )),
        }
    }
}

/// Encodes a segment list into native elements for the given target.
pub(crate) async fn encode_segments(
    client: &dyn QqClient,
    registry: &MessageIdRegistry,
    version: Version,
    target: Target,
    segments: Vec<Segment>,
) -> ApiResult<Vec<Element>> {
    let mut out = Vec::with_capacity(segments.len());
    for segment in segments {
        let Segment { kind, data, extra } = segment;
        match kind.as_str() {
            "node" => out.push(encode_node(client, registry, version, data, extra).await?),
            "music" => {
                let data = patch_custom_platform(data);
                let mut card = data;
                card.insert("type".into(), Value::from(kind));
                client.share_music(target.contact()?, card).await?;
            }
            "share" => {
                client.share_url(target.contact()?, data).await?;
            }
            "image" | "audio" | "video" => {
                out.push(decode_binary_fields(Element::from_object(
                    kind,
                    merge(data, extra),
                )));
            }
            "reply" => {
                let id = data.get("id").cloned().unwrap_or(Value::Null);
                let message_id = resolve_message_id_value(registry, version, &id)?;
                let message = client.get_msg(&message_id).await?;
                out.push(splice_quote(message));
            }
            _ => out.push(Element::from_object(kind, merge(data, extra))),
        }
    }
    Ok(out)
}

/// Encodes a `node` segment: the nested content is encoded against the
/// node's sender as a private-scope target and embedded as the node's
/// message body.
async fn encode_node(
    client: &dyn QqClient,
    registry: &MessageIdRegistry,
    version: Version,
    mut data: Map<String, Value>,
    extra: Map<String, Value>,
) -> ApiResult<Element> {
    let user_id = match data.get("user_id") {
        Some(Value::Number(n)) => n.as_i64().unwrap_or_default(),
        Some(Value::String(s)) => s.parse().unwrap_or_default(),
        _ => 0,
    };
    let content: Vec<Segment> = match data.remove("content") {
        Some(Value::Null) | None => Vec::new(),
        Some(value) => serde_json::from_value(value)?,
    };
    trace!(user_id, nested = content.len(), "encoding forward node");
    let nested = Box::pin(encode_segments(
        client,
        registry,
        version,
        Target::Private { user_id },
        content,
    ))
    .await?;

    let mut element = Element::from_object("node", merge(data, extra));
    element = element.with_json("user_id", user_id);
    element
        .fields
        .insert("message".into(), FieldValue::Nodes(nested));
    Ok(element)
}

/// go-cqhttp stores the platform of a `custom` music card under `subtype`;
/// the backend expects it under `platform`.
fn patch_custom_platform(mut data: Map<String, Value>) -> Map<String, Value> {
    if data.get("platform").and_then(Value::as_str) == Some("custom") {
        let subtype = data.get("subtype").cloned().unwrap_or(Value::Null);
        data.insert("platform".into(), subtype);
    }
    data
}

/// Decodes `base64://`-armored file fields into raw bytes.
///
/// A payload that fails to decode is left as-is; the backend rejects it.
fn decode_binary_fields(mut element: Element) -> Element {
    for key in BINARY_FIELDS {
        let Some(payload) = element
            .json(key)
            .and_then(Value::as_str)
            .and_then(|s| s.strip_prefix(BASE64_MARKER))
        else {
            continue;
        };
        if let Ok(bytes) = BASE64.decode(payload) {
            element.fields.insert(key.into(), FieldValue::Binary(bytes));
        }
    }
    element
}

/// Splices a fetched message object into a `quote` element.
fn splice_quote(message: Value) -> Element {
    match message {
        Value::Object(fields) => Element::from_object("quote", fields),
        _ => Element::new("quote"),
    }
}

/// Merges `data` with the segment's top-level extras, extras last.
fn merge(data: Map<String, Value>, extra: Map<String, Value>) -> Map<String, Value> {
    let mut merged = data;
    merged.extend(extra);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockClient;
    use serde_json::json;

    fn registry() -> MessageIdRegistry {
        MessageIdRegistry::new()
    }

    async fn encode(
        client: &MockClient,
        registry: &MessageIdRegistry,
        version: Version,
        target: Target,
        segments: Vec<Segment>,
    ) -> ApiResult<Vec<Element>> {
        encode_segments(client, registry, version, target, segments).await
    }

    #[tokio::test]
    async fn passthrough_types_keep_their_data() {
        let client = MockClient::new();
        let registry = registry();
        let segments = vec![
            Segment::text("hi"),
            Segment::new("sticker").with("pack", "cats"),
        ];
        let elements = encode(
            &client,
            &registry,
            Version::V12,
            Target::Private { user_id: 1 },
            segments,
        )
        .await
        .unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].kind, "text");
        assert_eq!(elements[0].json("text"), Some(&json!("hi")));
        assert_eq!(elements[1].kind, "sticker");
        assert_eq!(elements[1].json("pack"), Some(&json!("cats")));
    }

    #[tokio::test]
    async fn base64_marker_decodes_to_raw_bytes() {
        let client = MockClient::new();
        let registry = registry();
        let elements = encode(
            &client,
            &registry,
            Version::V12,
            Target::Private { user_id: 1 },
            vec![Segment::image("base64://aGVsbG8=")],
        )
        .await
        .unwrap();
        assert_eq!(elements[0].binary("file"), Some(&b"hello"[..]));
    }

    #[tokio::test]
    async fn text_then_image_scenario() {
        let client = MockClient::new();
        let registry = registry();
        let elements = encode(
            &client,
            &registry,
            Version::V12,
            Target::Private { user_id: 1 },
            vec![Segment::text("hi"), Segment::image("base64://AAAA")],
        )
        .await
        .unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].json("text"), Some(&json!("hi")));
        assert_eq!(elements[1].binary("file").map(<[u8]>::len), Some(3));
    }

    #[tokio::test]
    async fn malformed_base64_passes_through_unchanged() {
        let client = MockClient::new();
        let registry = registry();
        let elements = encode(
            &client,
            &registry,
            Version::V12,
            Target::Private { user_id: 1 },
            vec![Segment::image("base64://!!not-base64!!")],
        )
        .await
        .unwrap();
        assert_eq!(
            elements[0].json("file"),
            Some(&json!("base64://!!not-base64!!"))
        );
    }

    #[tokio::test]
    async fn plain_file_references_stay_json() {
        let client = MockClient::new();
        let registry = registry();
        let elements = encode(
            &client,
            &registry,
            Version::V12,
            Target::Private { user_id: 1 },
            vec![Segment::video("https://example.com/v.mp4")],
        )
        .await
        .unwrap();
        assert_eq!(
            elements[0].json("file"),
            Some(&json!("https://example.com/v.mp4"))
        );
    }

    #[tokio::test]
    async fn custom_music_substitutes_platform_and_emits_nothing() {
        let client = MockClient::new();
        let registry = registry();
        let segment = Segment::new("music")
            .with("platform", "custom")
            .with("subtype", "qq")
            .with("id", "453049")
            .with("title", "song");
        let elements = encode(
            &client,
            &registry,
            Version::V12,
            Target::Group { group_id: 42 },
            vec![segment],
        )
        .await
        .unwrap();
        assert!(elements.is_empty());

        let shares = client.music_shares.lock();
        assert_eq!(shares.len(), 1);
        let (contact, card) = &shares[0];
        assert_eq!(*contact, Contact::Group(42));
        assert_eq!(card.get("platform"), Some(&json!("qq")));
        assert_eq!(card.get("type"), Some(&json!("music")));
    }

    #[tokio::test]
    async fn share_dispatches_to_picked_contact() {
        let client = MockClient::new();
        let registry = registry();
        let elements = encode(
            &client,
            &registry,
            Version::V12,
            Target::Private { user_id: 7 },
            vec![Segment::share("https://example.com", "title")],
        )
        .await
        .unwrap();
        assert!(elements.is_empty());

        let shares = client.url_shares.lock();
        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].0, Contact::Friend(7));
        assert_eq!(shares[0].1.get("url"), Some(&json!("https://example.com")));
    }

    #[tokio::test]
    async fn node_encodes_nested_content_recursively() {
        let client = MockClient::new();
        let registry = registry();
        let node = Segment::node(
            10001000,
            vec![Segment::text("inner"), Segment::image("base64://aGVsbG8=")],
        );
        let elements = encode(
            &client,
            &registry,
            Version::V12,
            Target::Group { group_id: 42 },
            vec![node],
        )
        .await
        .unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].kind, "node");
        assert_eq!(elements[0].json("user_id"), Some(&json!(10001000)));
        let nested = elements[0].nodes("message").unwrap();
        assert_eq!(nested.len(), 2);
        assert_eq!(nested[0].json("text"), Some(&json!("inner")));
        assert_eq!(nested[1].binary("file"), Some(&b"hello"[..]));
    }

    #[tokio::test]
    async fn reply_splices_fetched_message_into_quote() {
        let client = MockClient::new();
        client.store_message(
            "abc",
            json!({"user_id": 10001000, "seq": 3517, "message": [{"type": "text", "text": "q"}]}),
        );
        let registry = registry();
        let elements = encode(
            &client,
            &registry,
            Version::V12,
            Target::Private { user_id: 1 },
            vec![Segment::reply("abc")],
        )
        .await
        .unwrap();
        assert_eq!(elements[0].kind, "quote");
        assert_eq!(elements[0].json("seq"), Some(&json!(3517)));
    }

    #[tokio::test]
    async fn legacy_reply_resolves_integer_id_through_registry() {
        let client = MockClient::new();
        client.store_message("abc", json!({"seq": 1}));
        let registry = registry();
        let n = registry.to_int("abc");
        let elements = encode(
            &client,
            &registry,
            Version::V11,
            Target::Private { user_id: 1 },
            vec![Segment::reply(n)],
        )
        .await
        .unwrap();
        assert_eq!(elements[0].kind, "quote");
        assert_eq!(elements[0].json("seq"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn reply_to_missing_message_surfaces_fetch_failure() {
        let client = MockClient::new();
        let registry = registry();
        let result = encode(
            &client,
            &registry,
            Version::V12,
            Target::Private { user_id: 1 },
            vec![Segment::reply("gone")],
        )
        .await;
        assert!(matches!(result, Err(ApiError::Backend(_))));
    }

    #[tokio::test]
    async fn share_in_channel_scope_is_rejected() {
        let client = MockClient::new();
        let registry = registry();
        let result = encode(
            &client,
            &registry,
            Version::V12,
            Target::Channel,
            vec![Segment::share("https://example.com", "t")],
        )
        .await;
        assert!(matches!(result, Err(ApiError::InvalidArgument(_))));
    }
}
