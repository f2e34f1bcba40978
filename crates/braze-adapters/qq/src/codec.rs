//! Message identity codec.
//!
//! Two independent responsibilities:
//!
//! - **Construction** — [`MessageRef`] packs the components addressing one
//!   sent message into a canonical opaque string and parses it back. The
//!   encoding is a fixed-width big-endian packing, base64-armored; group and
//!   private identities have distinct packed lengths, so decoding needs no
//!   scope hint.
//! - **Legacy mapping** — [`MessageIdRegistry`] is the bidirectional table
//!   between opaque ids and the small integers the legacy protocol revision
//!   requires on the wire. Append-only and stable for the process lifetime;
//!   one instance is injected per backend session.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use parking_lot::Mutex;
use serde_json::Value;

use braze_core::{ApiError, ApiResult, MessageId, Version};

// =============================================================================
// Canonical opaque ids
// =============================================================================

/// Packed length of a private (direct message) identity.
const DM_LEN: usize = 24;
/// Packed length of a group identity.
const GROUP_LEN: usize = 33;

/// Components uniquely addressing one sent message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRef {
    /// A message in a direct conversation.
    Dm {
        user_id: i64,
        seq: i32,
        rand: i32,
        time: i64,
    },
    /// A message in a group; carries the group and the packet count.
    Group {
        group_id: i64,
        user_id: i64,
        seq: i32,
        rand: i32,
        time: i64,
        pktnum: u8,
    },
}

impl MessageRef {
    /// Packs this identity into its canonical opaque string form.
    pub fn encode(&self) -> String {
        let mut buf = Vec::with_capacity(GROUP_LEN);
        match *self {
            MessageRef::Dm {
                user_id,
                seq,
                rand,
                time,
            } => {
                buf.extend_from_slice(&user_id.to_be_bytes());
                buf.extend_from_slice(&seq.to_be_bytes());
                buf.extend_from_slice(&rand.to_be_bytes());
                buf.extend_from_slice(&time.to_be_bytes());
            }
            MessageRef::Group {
                group_id,
                user_id,
                seq,
                rand,
                time,
                pktnum,
            } => {
                buf.extend_from_slice(&group_id.to_be_bytes());
                buf.extend_from_slice(&user_id.to_be_bytes());
                buf.extend_from_slice(&seq.to_be_bytes());
                buf.extend_from_slice(&rand.to_be_bytes());
                buf.extend_from_slice(&time.to_be_bytes());
                buf.push(pktnum);
            }
        }
        BASE64.encode(buf)
    }

    /// Recovers the identity components from an opaque string.
    pub fn decode(id: &str) -> ApiResult<Self> {
        let raw = BASE64
            .decode(id)
            .map_err(|err| ApiError::MalformedMessageId {
                reason: err.to_string(),
            })?;
        let mut rest = raw.as_slice();
        match raw.len() {
            DM_LEN => Ok(MessageRef::Dm {
                user_id: i64::from_be_bytes(take(&mut rest)?),
                seq: i32::from_be_bytes(take(&mut rest)?),
                rand: i32::from_be_bytes(take(&mut rest)?),
                time: i64::from_be_bytes(take(&mut rest)?),
            }),
            GROUP_LEN => Ok(MessageRef::Group {
                group_id: i64::from_be_bytes(take(&mut rest)?),
                user_id: i64::from_be_bytes(take(&mut rest)?),
                seq: i32::from_be_bytes(take(&mut rest)?),
                rand: i32::from_be_bytes(take(&mut rest)?),
                time: i64::from_be_bytes(take(&mut rest)?),
                pktnum: take::<1>(&mut rest)?[0],
            }),
            n => Err(ApiError::MalformedMessageId {
                reason: format!("unexpected packed length {n}"),
            }),
        }
    }
}

/// Splits the next `N` bytes off the front of `raw`.
fn take<const N: usize>(raw: &mut &[u8]) -> ApiResult<[u8; N]> {
    let (head, rest) = raw
        .split_first_chunk::<N>()
        .ok_or_else(|| ApiError::MalformedMessageId {
            reason: "truncated id".into(),
        })?;
    *raw = rest;
    Ok(*head)
}

// =============================================================================
// Legacy integer registry
// =============================================================================

/// Bidirectional opaque-string ↔ integer table for the legacy revision.
///
/// Both directions are O(1); allocation is atomic under a single lock, so
/// concurrent encode and normalize paths cannot mint duplicate ids. The
/// table is never pruned — ids are stable only within a session, which is
/// accepted: the mapping is lost on restart.
#[derive(Debug, Default)]
pub struct MessageIdRegistry {
    inner: Mutex<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    by_str: HashMap<String, i32>,
    by_int: HashMap<i32, String>,
    next: i32,
}

impl MessageIdRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the integer mapped to `id`, allocating a fresh one on first
    /// sight.
    pub fn to_int(&self, id: &str) -> i32 {
        let mut inner = self.inner.lock();
        if let Some(&n) = inner.by_str.get(id) {
            return n;
        }
        inner.next += 1;
        let n = inner.next;
        inner.by_str.insert(id.to_string(), n);
        inner.by_int.insert(n, id.to_string());
        n
    }

    /// Returns the opaque string mapped to `id`, failing loudly for
    /// never-allocated integers.
    pub fn to_str(&self, id: i32) -> ApiResult<String> {
        self.inner
            .lock()
            .by_int
            .get(&id)
            .cloned()
            .ok_or(ApiError::UnknownMessageId { id })
    }

    /// Number of allocated ids.
    pub fn len(&self) -> usize {
        self.inner.lock().by_str.len()
    }

    /// Whether any ids have been allocated.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Version boundary helpers
// =============================================================================

/// Resolves a version-shaped message id back to the backend's opaque form.
///
/// Integer ids always go through the registry (only the registry mints
/// them); under the legacy revision, wholly numeric strings are treated as
/// integers too, since legacy clients serialize ids either way.
pub(crate) fn resolve_message_id(
    registry: &MessageIdRegistry,
    version: Version,
    id: &MessageId,
) -> ApiResult<String> {
    match id {
        MessageId::Int(n) => registry.to_str(*n),
        MessageId::Str(s) => {
            if version.is_legacy()
                && let Ok(n) = s.parse::<i32>()
            {
                return registry.to_str(n);
            }
            Ok(s.clone())
        }
    }
}

/// Convenience wrapper over [`resolve_message_id`] for raw JSON ids.
pub(crate) fn resolve_message_id_value(
    registry: &MessageIdRegistry,
    version: Version,
    id: &Value,
) -> ApiResult<String> {
    resolve_message_id(registry, version, &MessageId::from_value(id)?)
}

/// Projects an opaque message id into the shape `version` expects.
pub(crate) fn project_message_id(
    registry: &MessageIdRegistry,
    version: Version,
    id: String,
) -> MessageId {
    if version.is_legacy() {
        MessageId::Int(registry.to_int(&id))
    } else {
        MessageId::Str(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dm_identity_round_trips() {
        let id = MessageRef::Dm {
            user_id: 10001000,
            seq: 3517,
            rand: -1729,
            time: 1700000000,
        };
        let encoded = id.encode();
        assert_eq!(MessageRef::decode(&encoded).unwrap(), id);
    }

    #[test]
    fn group_identity_round_trips() {
        let id = MessageRef::Group {
            group_id: 987654321,
            user_id: 10001000,
            seq: 1,
            rand: 2,
            time: 1700000000,
            pktnum: 3,
        };
        let encoded = id.encode();
        assert_eq!(MessageRef::decode(&encoded).unwrap(), id);
    }

    #[test]
    fn scopes_have_distinct_lengths() {
        let dm = MessageRef::Dm {
            user_id: 1,
            seq: 2,
            rand: 3,
            time: 4,
        };
        let group = MessageRef::Group {
            group_id: 1,
            user_id: 2,
            seq: 3,
            rand: 4,
            time: 5,
            pktnum: 1,
        };
        assert_ne!(dm.encode().len(), group.encode().len());
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            MessageRef::decode("not base64!!"),
            Err(ApiError::MalformedMessageId { .. })
        ));
        // Valid base64, wrong length.
        assert!(matches!(
            MessageRef::decode(&BASE64.encode([0u8; 7])),
            Err(ApiError::MalformedMessageId { .. })
        ));
    }

    #[test]
    fn registry_round_trips_and_stays_stable() {
        let registry = MessageIdRegistry::new();
        let a = registry.to_int("abc");
        let b = registry.to_int("def");
        assert_ne!(a, b);
        assert_eq!(registry.to_int("abc"), a);
        assert_eq!(registry.to_str(a).unwrap(), "abc");
        assert_eq!(registry.to_str(b).unwrap(), "def");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn registry_fails_loudly_for_unknown_integers() {
        let registry = MessageIdRegistry::new();
        assert!(matches!(
            registry.to_str(99),
            Err(ApiError::UnknownMessageId { id: 99 })
        ));
    }

    #[test]
    fn resolve_accepts_legacy_numeric_strings() {
        let registry = MessageIdRegistry::new();
        let n = registry.to_int("abc");
        let resolved = resolve_message_id(
            &registry,
            Version::V11,
            &MessageId::Str(n.to_string()),
        )
        .unwrap();
        assert_eq!(resolved, "abc");
    }

    #[test]
    fn project_is_version_tagged() {
        let registry = MessageIdRegistry::new();
        assert_eq!(
            project_message_id(&registry, Version::V12, "abc".into()),
            MessageId::Str("abc".into())
        );
        let MessageId::Int(n) = project_message_id(&registry, Version::V11, "abc".into()) else {
            panic!("legacy projection must be an integer");
        };
        assert_eq!(registry.to_str(n).unwrap(), "abc");
    }
}
