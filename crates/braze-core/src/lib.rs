//! # Braze Core
//!
//! Protocol-side foundation for the braze translation adapter.
//!
//! Braze bridges the generic OneBot control protocol to a concrete backend
//! messaging client. This crate holds the pieces both sides of that bridge
//! agree on:
//!
//! - [`Segment`] — the generic `{type, data}` message fragment, deliberately
//!   open so unknown segment types pass through the translation layer
//!   untouched.
//! - [`Payload`] — a normalized, version-tagged event as delivered to
//!   downstream consumers.
//! - [`Version`] / [`MessageId`] — the protocol revisions and the id shape
//!   each of them expects on the wire.
//! - [`EventSink`] — the seam towards the outer bot server that consumes
//!   normalized events.
//! - [`ApiError`] — the unified error surface of adapter operations.
//!
//! Backend-specific types (native message elements, the client capability
//! trait, the message-id codec) live in the adapter crates.

pub mod error;
pub mod event;
pub mod payload;
pub mod segment;

pub use error::{ApiError, ApiResult};
pub use event::{BotStatus, EventSink, RawEvent, SelfInfo};
pub use payload::{
    DETAIL_TYPE_FIELDS, EventKind, MessageId, MessageReceipt, Payload, SelfRef, Version,
};
pub use segment::Segment;
