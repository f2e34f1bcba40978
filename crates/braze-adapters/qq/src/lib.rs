//! QQ backend adapter for the braze translation layer.
//!
//! Bridges the generic OneBot segment model to a QQ backend client:
//! outbound segment lists are encoded into the backend's native message
//! elements, and the backend's raw events are normalized into
//! version-correct OneBot payloads, with message identities translated
//! between the backend's opaque strings and the legacy revision's integers.
//!
//! # Overview
//!
//! ```text
//! ┌────────────┐  segments   ┌───────────┐  elements  ┌──────────┐
//! │ outer bot  │────────────▶│ QqAdapter │───────────▶│ QqClient │
//! │  server    │◀────────────│  (codec)  │◀───────────│ (backend)│
//! └────────────┘  payloads   └───────────┘  events    └──────────┘
//! ```
//!
//! The backend client is consumed only through the [`QqClient`] capability
//! trait; normalized events leave through the injected
//! [`EventSink`](braze_core::EventSink).
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use braze_adapter_qq::{QqAdapter, QqConfig};
//! use braze_core::{Segment, Version};
//!
//! let adapter = Arc::new(QqAdapter::new(config, client, sink));
//! let pump = adapter.start(events).await?;
//! adapter
//!     .send_private_message(Version::V12, 10001000, vec![Segment::text("hi")], None)
//!     .await?;
//! ```

mod adapter;
pub mod client;
mod codec;
pub mod config;
mod decode;
mod encode;
mod normalize;
#[cfg(test)]
mod testing;

pub use adapter::QqAdapter;
pub use client::{Contact, Element, FieldValue, GuildReceipt, LoginInfo, QqClient, SendReceipt};
pub use codec::{MessageIdRegistry, MessageRef};
pub use config::QqConfig;
pub use decode::to_segments;
