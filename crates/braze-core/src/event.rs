//! Inbound events and the downstream emission seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::payload::{EventKind, Payload};

/// An event as delivered by the backend client, before normalization.
#[derive(Debug, Clone)]
pub struct RawEvent {
    /// Broad event class, from the backend's event stream routing.
    pub kind: EventKind,
    /// The raw event body.
    pub data: Value,
}

impl RawEvent {
    /// Creates a raw event.
    pub fn new(kind: EventKind, data: Value) -> Self {
        Self { kind, data }
    }
}

/// Collaborator that consumes normalized payloads (the outer bot server).
///
/// The adapter emits each normalized event exactly once per configured
/// protocol version, on the topic of its [`EventKind`].
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Delivers one normalized payload.
    async fn emit(&self, topic: &str, payload: Payload);
}

/// Liveness of the backend session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotStatus {
    /// No session; also the state after a clean logout.
    Offline,
    /// Logged in and serving.
    Online,
    /// The last login attempt failed.
    Bad,
}

/// Identity snapshot exposed to downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfInfo {
    /// Display name of the logged-in account.
    pub nickname: String,
    /// Current session status.
    pub status: BotStatus,
}
