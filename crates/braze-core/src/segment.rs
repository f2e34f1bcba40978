//! Generic message segments.
//!
//! A segment is a single unit of content in the OneBot message model: plain
//! text, an image, a mention, a reply marker, etc. Segments are kept as an
//! open `{type, data}` pair rather than a closed enum: the translation layer
//! forwards segment types it does not recognize with their data unchanged,
//! so new types survive a round trip through the adapter without a code
//! change here.
//!
//! # Example
//!
//! ```rust,ignore
//! use braze_core::Segment;
//!
//! let text = Segment::text("Hello, ");
//! let at = Segment::at(10001000);
//! let image = Segment::image("base64://aGVsbG8=");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A generic message segment.
///
/// Serializes as `{"type": "...", "data": {...}}`. Fields some producers
/// place beside `data` are captured in `extra` and forwarded as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Segment type tag (`text`, `image`, `reply`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-specific payload.
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Top-level fields outside `data`; passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Segment {
    /// Creates an empty segment of the given type.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            data: Map::new(),
            extra: Map::new(),
        }
    }

    /// Adds a data field (builder style).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Creates a plain text segment.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new("text").with("text", text.into())
    }

    /// Creates an image segment from a file reference (path, URL, or
    /// `base64://`-armored payload).
    pub fn image(file: impl Into<String>) -> Self {
        Self::new("image").with("file", file.into())
    }

    /// Creates an audio segment.
    pub fn audio(file: impl Into<String>) -> Self {
        Self::new("audio").with("file", file.into())
    }

    /// Creates a video segment.
    pub fn video(file: impl Into<String>) -> Self {
        Self::new("video").with("file", file.into())
    }

    /// Creates an @mention segment.
    pub fn at(user_id: i64) -> Self {
        Self::new("at").with("qq", user_id)
    }

    /// Creates a reply segment referencing another message.
    ///
    /// The id is an integer under the legacy protocol revision and an opaque
    /// string otherwise, so any JSON value is accepted.
    pub fn reply(id: impl Into<Value>) -> Self {
        Self::new("reply").with("id", id)
    }

    /// Creates a forward node holding a nested message from another sender.
    pub fn node(user_id: i64, content: Vec<Segment>) -> Self {
        Self::new("node")
            .with("user_id", user_id)
            .with("content", serde_json::to_value(content).unwrap_or_default())
    }

    /// Creates a link share segment.
    pub fn share(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new("share")
            .with("url", url.into())
            .with("title", title.into())
    }

    /// Returns a data field as a string, if present and a string.
    pub fn str_data(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// Returns a data field as an integer, accepting numeric strings.
    pub fn i64_data(&self, key: &str) -> Option<i64> {
        match self.data.get(key) {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind.as_str() {
            "text" => write!(f, "{}", self.str_data("text").unwrap_or_default()),
            "image" => write!(f, "[图片]"),
            "audio" | "record" => write!(f, "[语音]"),
            "video" => write!(f, "[视频]"),
            "face" => write!(f, "[表情:{}]", self.i64_data("id").unwrap_or_default()),
            "at" => match self.str_data("qq") {
                Some("all") => write!(f, "@全体成员"),
                _ => write!(f, "@{}", self.i64_data("qq").unwrap_or_default()),
            },
            "reply" => write!(f, "[回复]"),
            "node" => write!(f, "[转发节点]"),
            "music" => write!(f, "[音乐]"),
            "share" => write!(f, "[分享:{}]", self.str_data("title").unwrap_or_default()),
            other => write!(f, "[{other}]"),
        }
    }
}

/// Renders a short, human-readable preview of a segment list for logging.
pub fn preview(segments: &[Segment]) -> String {
    segments.iter().map(Segment::to_string).collect()
}
