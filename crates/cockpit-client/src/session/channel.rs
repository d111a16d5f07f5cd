//! Channel id allocation and `open` parameters.

use serde_json::{Map, Value};
use tracing::debug;

use super::control::ControlMessage;
use crate::error::ClientError;

/// Hands out `seed+1`, `seed+2`, ... as strings. Ids are never reused, so
/// allocation fails once the counter reaches `u64::MAX`.
#[derive(Debug, Clone, Default)]
pub struct ChannelIds {
    last: u64,
}

impl ChannelIds {
    pub fn new(seed: u64) -> Self {
        ChannelIds { last: seed }
    }

    pub fn allocate(&mut self) -> Result<String, ClientError> {
        self.last = self
            .last
            .checked_add(1)
            .ok_or_else(|| ClientError::protocol("channel ids exhausted"))?;
        Ok(self.last.to_string())
    }
}

/// Well-known channel payload types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadType {
    DbusJson3,
    Stream,
    Echo,
    Null,
    Other(String),
}

impl PayloadType {
    pub fn as_str(&self) -> &str {
        match self {
            PayloadType::DbusJson3 => "dbus-json3",
            PayloadType::Stream => "stream",
            PayloadType::Echo => "echo",
            PayloadType::Null => "null",
            PayloadType::Other(name) => name,
        }
    }
}

impl From<&str> for PayloadType {
    fn from(name: &str) -> Self {
        match name {
            "dbus-json3" => PayloadType::DbusJson3,
            "stream" => PayloadType::Stream,
            "echo" => PayloadType::Echo,
            "null" => PayloadType::Null,
            other => PayloadType::Other(other.to_string()),
        }
    }
}

/// Parameters of an `open` command, minus the channel id.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenChannel {
    pub payload: PayloadType,
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub options: Map<String, Value>,
}

impl OpenChannel {
    pub fn new(payload: impl Into<PayloadType>) -> Self {
        OpenChannel {
            payload: payload.into(),
            host: None,
            user: None,
            password: None,
            options: Map::new(),
        }
    }

    pub fn dbus() -> Self {
        Self::new(PayloadType::DbusJson3)
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Extra payload-specific field. Later values replace earlier ones.
    ///
    /// `payload`, `host`, `user` and `password` set the matching typed field
    /// (string values only). `command` and `channel` belong to the session
    /// and are dropped.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        match key.as_str() {
            "command" | "channel" => debug!(%key, "dropping reserved open option"),
            "payload" | "host" | "user" | "password" => self.set_field(&key, value.into()),
            _ => {
                self.options.insert(key, value.into());
            }
        }
        self
    }

    fn set_field(&mut self, key: &str, value: Value) {
        let Value::String(text) = value else {
            debug!(key, "dropping non-string open option");
            return;
        };
        match key {
            "payload" => self.payload = PayloadType::from(text.as_str()),
            "host" => self.host = Some(text),
            "user" => self.user = Some(text),
            _ => self.password = Some(text),
        }
    }

    /// Entries placed in `options` directly go through [`OpenChannel::option`].
    pub fn into_message(self, channel: impl Into<String>) -> ControlMessage {
        let mut spec = OpenChannel {
            options: Map::new(),
            ..self
        };
        for (key, value) in self.options {
            spec = spec.option(key, value);
        }
        ControlMessage::Open {
            channel: channel.into(),
            payload: spec.payload.as_str().to_string(),
            host: spec.host,
            user: spec.user,
            password: spec.password,
            options: spec.options,
        }
    }
}
