//! Control-channel commands.
//!
//! Each command is a JSON object tagged by its `command` field:
//!
//! ```text
//! {"command":"init","version":1,"channel-seed":"5"}
//! {"command":"open","channel":"6","payload":"dbus-json3","bus":"session","name":"org.example"}
//! {"command":"close","channel":"6","reason":""}
//! {"command":"logout","disconnect":true}
//! {"command":"ping"}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum ControlMessage {
    Init {
        #[serde(default)]
        version: u32,
        #[serde(
            rename = "channel-seed",
            default,
            with = "seed",
            skip_serializing_if = "Option::is_none"
        )]
        channel_seed: Option<u64>,
    },
    Open {
        channel: String,
        payload: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        host: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
        /// Payload-specific options such as `bus` and `name`.
        #[serde(flatten)]
        options: Map<String, Value>,
    },
    Close {
        channel: String,
        #[serde(default)]
        reason: String,
        /// Set by the peer when a channel fails.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        problem: Option<String>,
    },
    Logout {
        #[serde(default)]
        disconnect: bool,
    },
    Ping,
    /// Any inbound command this client does not interpret. Never sent.
    #[serde(other, skip_serializing)]
    Unrecognized,
}

impl ControlMessage {
    pub fn close(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        ControlMessage::Close {
            channel: channel.into(),
            reason: reason.into(),
            problem: None,
        }
    }

    pub fn command(&self) -> &'static str {
        match self {
            ControlMessage::Init { .. } => "init",
            ControlMessage::Open { .. } => "open",
            ControlMessage::Close { .. } => "close",
            ControlMessage::Logout { .. } => "logout",
            ControlMessage::Ping => "ping",
            ControlMessage::Unrecognized => "unrecognized",
        }
    }

    pub fn to_json(&self) -> Result<String, ClientError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, ClientError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// `channel-seed` arrives as a JSON string or number and is sent as a string.
mod seed {
    use serde::de::{self, Deserializer, Visitor};
    use serde::Serializer;
    use std::fmt;

    pub fn serialize<S: Serializer>(seed: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        match seed {
            Some(seed) => serializer.collect_str(seed),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        struct SeedVisitor;

        impl<'de> Visitor<'de> for SeedVisitor {
            type Value = Option<u64>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a channel seed as a non-negative integer or numeric string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(Some(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                u64::try_from(v)
                    .map(Some)
                    .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.trim()
                    .parse()
                    .map(Some)
                    .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(None)
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(None)
            }
        }

        deserializer.deserialize_any(SeedVisitor)
    }
}
