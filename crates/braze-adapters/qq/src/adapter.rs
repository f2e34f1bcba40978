//! The QQ adapter: OneBot-facing entry points over the backend client.
//!
//! [`QqAdapter`] owns one backend session. Outbound calls run through the
//! segment encoder and the message-id codec; inbound events flow through the
//! normalizer and out to the injected [`EventSink`], once per configured
//! protocol version:
//!
//! ```text
//! send_* ──▶ encoder ──▶ QqClient ──▶ codec (project) ──▶ receipt
//! QqClient events ──▶ normalizer (codec) ──▶ EventSink
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use braze_core::{
    ApiError, ApiResult, BotStatus, EventSink, MessageId, MessageReceipt, RawEvent, Segment,
    SelfInfo, Version, segment,
};

use crate::client::QqClient;
use crate::codec::{MessageIdRegistry, project_message_id, resolve_message_id};
use crate::config::QqConfig;
use crate::decode::to_segments;
use crate::encode::{Target, encode_segments};
use crate::normalize::normalize_event;

/// Platform tag stamped on normalized payloads.
const PLATFORM: &str = "qq";

/// One backend session bridged to the OneBot model.
pub struct QqAdapter {
    config: QqConfig,
    client: Arc<dyn QqClient>,
    sink: Arc<dyn EventSink>,
    registry: Arc<MessageIdRegistry>,
    status: Mutex<BotStatus>,
    shutdown: CancellationToken,
}

impl QqAdapter {
    /// Creates an adapter with a fresh message-id registry.
    pub fn new(config: QqConfig, client: Arc<dyn QqClient>, sink: Arc<dyn EventSink>) -> Self {
        Self::with_registry(config, client, sink, Arc::new(MessageIdRegistry::new()))
    }

    /// Creates an adapter with an injected registry.
    ///
    /// One registry belongs to one backend session; injecting it keeps the
    /// legacy id mapping out of ambient global state and makes it visible to
    /// tests and diagnostics.
    pub fn with_registry(
        config: QqConfig,
        client: Arc<dyn QqClient>,
        sink: Arc<dyn EventSink>,
        registry: Arc<MessageIdRegistry>,
    ) -> Self {
        Self {
            config,
            client,
            sink,
            registry,
            status: Mutex::new(BotStatus::Offline),
            shutdown: CancellationToken::new(),
        }
    }

    /// The adapter configuration.
    pub fn config(&self) -> &QqConfig {
        &self.config
    }

    /// The session's message-id registry.
    pub fn registry(&self) -> &Arc<MessageIdRegistry> {
        &self.registry
    }

    /// Current session status.
    pub fn status(&self) -> BotStatus {
        *self.status.lock()
    }

    fn ensure_session(&self) -> ApiResult<()> {
        if self.status() == BotStatus::Online {
            Ok(())
        } else {
            Err(ApiError::NoSession {
                uin: self.config.uin,
            })
        }
    }

    // =========================================================================
    // Session lifecycle
    // =========================================================================

    /// Logs the account in and marks the session online.
    pub async fn set_online(&self) -> ApiResult<()> {
        let result = self
            .client
            .login(self.config.uin, self.config.password.as_deref())
            .await;
        match result {
            Ok(()) => {
                *self.status.lock() = BotStatus::Online;
                info!(uin = self.config.uin, "backend session online");
                Ok(())
            }
            Err(err) => {
                *self.status.lock() = BotStatus::Bad;
                warn!(uin = self.config.uin, error = %err, "login failed");
                Err(err)
            }
        }
    }

    /// Logs the account out and marks the session offline.
    pub async fn set_offline(&self) -> ApiResult<()> {
        self.client.logout().await?;
        *self.status.lock() = BotStatus::Offline;
        info!(uin = self.config.uin, "backend session offline");
        Ok(())
    }

    /// Logs in and spawns the inbound event pump.
    pub async fn start(
        self: Arc<Self>,
        events: mpsc::Receiver<RawEvent>,
    ) -> anyhow::Result<tokio::task::JoinHandle<()>> {
        self.set_online().await?;
        Ok(tokio::spawn(async move { self.run(events).await }))
    }

    /// Stops event intake and logs out.
    pub async fn stop(&self) -> anyhow::Result<()> {
        self.shutdown.cancel();
        self.set_offline().await?;
        Ok(())
    }

    /// Requests the event pump to stop accepting new events.
    ///
    /// The event already being processed finishes (or fails) independently.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    // =========================================================================
    // Outbound entry points
    // =========================================================================

    /// Sends a private message.
    pub async fn send_private_message(
        &self,
        version: Version,
        user_id: i64,
        segments: Vec<Segment>,
        quote: Option<MessageId>,
    ) -> ApiResult<MessageReceipt> {
        self.ensure_session()?;
        let quote = self.fetch_quote(version, quote).await?;
        debug!(user_id, preview = %segment::preview(&segments), "sending private message");
        let elements = encode_segments(
            self.client.as_ref(),
            &self.registry,
            version,
            Target::Private { user_id },
            segments,
        )
        .await?;
        let receipt = self.client.send_private_msg(user_id, elements, quote).await?;
        Ok(self.receipt(version, receipt.message_id))
    }

    /// Sends a group message.
    pub async fn send_group_message(
        &self,
        version: Version,
        group_id: i64,
        segments: Vec<Segment>,
        quote: Option<MessageId>,
    ) -> ApiResult<MessageReceipt> {
        self.ensure_session()?;
        let quote = self.fetch_quote(version, quote).await?;
        debug!(group_id, preview = %segment::preview(&segments), "sending group message");
        let elements = encode_segments(
            self.client.as_ref(),
            &self.registry,
            version,
            Target::Group { group_id },
            segments,
        )
        .await?;
        let receipt = self.client.send_group_msg(group_id, elements, quote).await?;
        Ok(self.receipt(version, receipt.message_id))
    }

    /// Sends a guild-channel message. The target is a composite
    /// `guild_id:channel_id`; the returned identity is a `seq:rand:time`
    /// triple.
    pub async fn send_guild_message(
        &self,
        version: Version,
        target: &str,
        segments: Vec<Segment>,
    ) -> ApiResult<MessageReceipt> {
        self.ensure_session()?;
        let (guild_id, channel_id) = target
            .split_once(':')
            .ok_or_else(|| ApiError::invalid("guild target must be `guild_id:channel_id`"))?;
        debug!(guild_id, channel_id, "sending guild message");
        let elements = encode_segments(
            self.client.as_ref(),
            &self.registry,
            version,
            Target::Channel,
            segments,
        )
        .await?;
        let receipt = self
            .client
            .send_guild_msg(guild_id, channel_id, elements)
            .await?;
        let message_id = format!("{}:{}:{}", receipt.seq, receipt.rand, receipt.time);
        Ok(self.receipt(version, message_id))
    }

    /// Fetches a stored message, with its native element list decoded back
    /// into generic segments.
    pub async fn get_message(&self, version: Version, id: MessageId) -> ApiResult<Value> {
        self.ensure_session()?;
        let message_id = resolve_message_id(&self.registry, version, &id)?;
        let mut message = self.client.get_msg(&message_id).await?;
        if let Value::Object(fields) = &mut message {
            let segments = fields.get("message").map(to_segments).unwrap_or_default();
            fields.insert("message".into(), serde_json::to_value(segments)?);
        }
        Ok(message)
    }

    /// Recalls a message.
    pub async fn delete_message(&self, version: Version, id: MessageId) -> ApiResult<bool> {
        self.ensure_session()?;
        let message_id = resolve_message_id(&self.registry, version, &id)?;
        self.client.delete_msg(&message_id).await
    }

    /// Returns the bot's identity and session status.
    pub async fn get_self_info(&self, _version: Version) -> ApiResult<SelfInfo> {
        let info = self.client.login_info().await?;
        Ok(SelfInfo {
            nickname: info.nickname,
            status: self.status(),
        })
    }

    /// Generic method dispatch: local methods first, then the backend's own
    /// surface. An unknown method on both paths fails with
    /// [`ApiError::UnsupportedMethod`]; the underlying lookup failure is
    /// logged, not propagated.
    pub async fn call(&self, version: Version, method: &str, args: Vec<Value>) -> ApiResult<Value> {
        if let Some(local) = LocalMethod::lookup(method) {
            return self.call_local(local, version, args).await;
        }
        self.client.call(method, args).await.map_err(|err| {
            debug!(method, error = %err, "backend fallback failed");
            ApiError::UnsupportedMethod {
                method: method.to_string(),
            }
        })
    }

    async fn call_local(
        &self,
        method: LocalMethod,
        version: Version,
        args: Vec<Value>,
    ) -> ApiResult<Value> {
        let mut args = args.into_iter();
        let result = match method {
            LocalMethod::SendPrivateMessage => {
                let user_id = parse_target_id(args.next())?;
                let segments = parse_segments(args.next())?;
                let quote = parse_quote(args.next())?;
                serde_json::to_value(
                    self.send_private_message(version, user_id, segments, quote)
                        .await?,
                )?
            }
            LocalMethod::SendGroupMessage => {
                let group_id = parse_target_id(args.next())?;
                let segments = parse_segments(args.next())?;
                let quote = parse_quote(args.next())?;
                serde_json::to_value(
                    self.send_group_message(version, group_id, segments, quote)
                        .await?,
                )?
            }
            LocalMethod::SendGuildMessage => {
                let target = parse_string(args.next())?;
                let segments = parse_segments(args.next())?;
                serde_json::to_value(
                    self.send_guild_message(version, &target, segments).await?,
                )?
            }
            LocalMethod::GetMessage => {
                let id = parse_message_id(args.next())?;
                self.get_message(version, id).await?
            }
            LocalMethod::DeleteMessage => {
                let id = parse_message_id(args.next())?;
                Value::from(self.delete_message(version, id).await?)
            }
            LocalMethod::GetSelfInfo => serde_json::to_value(self.get_self_info(version).await?)?,
        };
        Ok(result)
    }

    // =========================================================================
    // Inbound pump
    // =========================================================================

    /// Runs the inbound event pump until shutdown or the stream ends.
    ///
    /// Events are processed one at a time: each is normalized and emitted
    /// once per configured protocol version before the next is read.
    pub async fn run(&self, mut events: mpsc::Receiver<RawEvent>) {
        info!(uin = self.config.uin, "event pump started");
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                event = events.recv() => {
                    let Some(event) = event else { break };
                    self.dispatch(event).await;
                }
            }
        }
        info!(uin = self.config.uin, "event pump stopped");
    }

    async fn dispatch(&self, event: RawEvent) {
        let topic = event.kind.topic();
        for &version in &self.config.versions {
            let payload = normalize_event(&self.registry, PLATFORM, version, event.clone());
            self.sink.emit(topic, payload).await;
        }
    }

    fn receipt(&self, version: Version, message_id: String) -> MessageReceipt {
        MessageReceipt {
            message_id: project_message_id(&self.registry, version, message_id),
        }
    }

    async fn fetch_quote(
        &self,
        version: Version,
        quote: Option<MessageId>,
    ) -> ApiResult<Option<Value>> {
        match quote {
            Some(id) => {
                let message_id = resolve_message_id(&self.registry, version, &id)?;
                Ok(Some(self.client.get_msg(&message_id).await?))
            }
            None => Ok(None),
        }
    }
}

// =============================================================================
// Local method dispatch
// =============================================================================

/// Methods the adapter implements itself, checked before falling back to the
/// backend's generic surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocalMethod {
    SendPrivateMessage,
    SendGroupMessage,
    SendGuildMessage,
    GetMessage,
    DeleteMessage,
    GetSelfInfo,
}

impl LocalMethod {
    fn lookup(name: &str) -> Option<Self> {
        match name {
            "send_private_message" => Some(Self::SendPrivateMessage),
            "send_group_message" => Some(Self::SendGroupMessage),
            "send_guild_message" => Some(Self::SendGuildMessage),
            "get_message" => Some(Self::GetMessage),
            "delete_message" => Some(Self::DeleteMessage),
            "get_self_info" => Some(Self::GetSelfInfo),
            _ => None,
        }
    }
}

// =============================================================================
// Argument parsing
// =============================================================================

fn parse_target_id(arg: Option<Value>) -> ApiResult<i64> {
    match arg {
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| ApiError::invalid("target id must be an integer")),
        Some(Value::String(s)) => s
            .parse()
            .map_err(|_| ApiError::invalid("target id must be numeric")),
        _ => Err(ApiError::invalid("missing target id")),
    }
}

fn parse_string(arg: Option<Value>) -> ApiResult<String> {
    match arg {
        Some(Value::String(s)) => Ok(s),
        _ => Err(ApiError::invalid("missing target")),
    }
}

fn parse_segments(arg: Option<Value>) -> ApiResult<Vec<Segment>> {
    match arg {
        Some(value) => serde_json::from_value(value).map_err(Into::into),
        None => Ok(Vec::new()),
    }
}

fn parse_quote(arg: Option<Value>) -> ApiResult<Option<MessageId>> {
    match arg {
        None | Some(Value::Null) => Ok(None),
        Some(value) => MessageId::from_value(&value).map(Some),
    }
}

fn parse_message_id(arg: Option<Value>) -> ApiResult<MessageId> {
    let value = arg.ok_or_else(|| ApiError::invalid("missing message id"))?;
    MessageId::from_value(&value)
}
