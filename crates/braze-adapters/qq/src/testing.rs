//! Test doubles shared across the crate's unit tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use braze_core::{ApiError, ApiResult, EventSink, Payload};

use crate::client::{Contact, Element, GuildReceipt, LoginInfo, QqClient, SendReceipt};

/// A recording backend client.
///
/// Sends and share actions append to their vectors; `get_msg` serves from
/// the `messages` store and fails like a real backend for unknown ids.
#[derive(Default)]
pub(crate) struct MockClient {
    pub next_message_id: Mutex<String>,
    pub messages: Mutex<HashMap<String, Value>>,
    pub private_sends: Mutex<Vec<(i64, Vec<Element>, Option<Value>)>>,
    pub group_sends: Mutex<Vec<(i64, Vec<Element>, Option<Value>)>>,
    pub guild_sends: Mutex<Vec<(String, String, Vec<Element>)>>,
    pub music_shares: Mutex<Vec<(Contact, Map<String, Value>)>>,
    pub url_shares: Mutex<Vec<(Contact, Map<String, Value>)>>,
    pub deletions: Mutex<Vec<String>>,
    pub logins: Mutex<Vec<(i64, Option<String>)>>,
    pub fail_login: Mutex<bool>,
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            next_message_id: Mutex::new("abc".into()),
            ..Default::default()
        }
    }

    pub fn store_message(&self, id: &str, value: Value) {
        self.messages.lock().insert(id.to_string(), value);
    }
}

#[async_trait]
impl QqClient for MockClient {
    async fn send_private_msg(
        &self,
        user_id: i64,
        elements: Vec<Element>,
        quote: Option<Value>,
    ) -> ApiResult<SendReceipt> {
        self.private_sends.lock().push((user_id, elements, quote));
        Ok(SendReceipt {
            message_id: self.next_message_id.lock().clone(),
        })
    }

    async fn send_group_msg(
        &self,
        group_id: i64,
        elements: Vec<Element>,
        quote: Option<Value>,
    ) -> ApiResult<SendReceipt> {
        self.group_sends.lock().push((group_id, elements, quote));
        Ok(SendReceipt {
            message_id: self.next_message_id.lock().clone(),
        })
    }

    async fn send_guild_msg(
        &self,
        guild_id: &str,
        channel_id: &str,
        elements: Vec<Element>,
    ) -> ApiResult<GuildReceipt> {
        self.guild_sends
            .lock()
            .push((guild_id.to_string(), channel_id.to_string(), elements));
        Ok(GuildReceipt {
            seq: 7,
            rand: 8,
            time: 9,
        })
    }

    async fn get_msg(&self, message_id: &str) -> ApiResult<Value> {
        self.messages
            .lock()
            .get(message_id)
            .cloned()
            .ok_or_else(|| ApiError::backend(format!("message {message_id} not found")))
    }

    async fn delete_msg(&self, message_id: &str) -> ApiResult<bool> {
        self.deletions.lock().push(message_id.to_string());
        Ok(true)
    }

    async fn login(&self, uin: i64, password: Option<&str>) -> ApiResult<()> {
        if *self.fail_login.lock() {
            return Err(ApiError::backend("login failed"));
        }
        self.logins.lock().push((uin, password.map(str::to_string)));
        Ok(())
    }

    async fn logout(&self) -> ApiResult<()> {
        Ok(())
    }

    async fn login_info(&self) -> ApiResult<LoginInfo> {
        Ok(LoginInfo {
            user_id: 10000,
            nickname: "braze".into(),
        })
    }

    async fn share_music(&self, contact: Contact, data: Map<String, Value>) -> ApiResult<()> {
        self.music_shares.lock().push((contact, data));
        Ok(())
    }

    async fn share_url(&self, contact: Contact, data: Map<String, Value>) -> ApiResult<()> {
        self.url_shares.lock().push((contact, data));
        Ok(())
    }

    async fn call(&self, method: &str, args: Vec<Value>) -> ApiResult<Value> {
        match method {
            "echo" => Ok(Value::from(args)),
            _ => Err(ApiError::backend(format!("no api {method}"))),
        }
    }
}

/// An [`EventSink`] that records every emission.
#[derive(Default)]
pub(crate) struct RecordingSink {
    pub events: Mutex<Vec<(String, Payload)>>,
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn emit(&self, topic: &str, payload: Payload) {
        self.events.lock().push((topic.to_string(), payload));
    }
}
