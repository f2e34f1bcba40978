//! Inbound native-message decoding.
//!
//! The structural inverse of the encoder's passthrough path: backend-native
//! message elements come back as generic [`Segment`]s for query-style calls
//! such as fetching a historical message. `music`, `share`, and `reply` are
//! outbound-only, side-effecting conversions and have no inverse here.

use serde_json::{Map, Value};

use braze_core::Segment;

/// Converts a backend-native message into an ordered segment list.
///
/// Accepts a single element, an ordered sequence, or bare strings. Non-object
/// entries are wrapped as text segments; object entries split into
/// `{type, data: remaining fields}`.
pub fn to_segments(message: &Value) -> Vec<Segment> {
    let items: Vec<&Value> = match message {
        Value::Array(items) => items.iter().collect(),
        single => vec![single],
    };
    items.into_iter().map(to_segment).collect()
}

fn to_segment(item: &Value) -> Segment {
    match item {
        Value::Object(fields) => {
            let mut data = fields.clone();
            let kind = match data.remove("type") {
                Some(Value::String(kind)) => kind,
                _ => "text".to_string(),
            };
            Segment {
                kind,
                data,
                extra: Map::new(),
            }
        }
        Value::String(text) => Segment::text(text.clone()),
        other => Segment::text(other.to_string()),
    }
}
