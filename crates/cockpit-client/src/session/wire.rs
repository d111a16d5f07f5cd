//! Channel framing: `"<channel-id>\n<payload>"` in one text message.

use std::fmt;

use crate::error::ClientError;

/// Outbound id of the control channel.
pub const CONTROL_CHANNEL: &str = "";

/// Inbound control frames use either the empty id or `"0"`.
pub fn is_control_channel(channel: &str) -> bool {
    channel.is_empty() || channel == "0"
}

/// One framed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub channel: String,
    pub payload: String,
}

impl Frame {
    pub fn new(channel: impl Into<String>, payload: impl Into<String>) -> Self {
        Frame {
            channel: channel.into(),
            payload: payload.into(),
        }
    }

    pub fn is_control(&self) -> bool {
        is_control_channel(&self.channel)
    }

    /// Split at the first newline. A message without one is malformed.
    pub fn parse(text: &str) -> Result<Frame, ClientError> {
        let (channel, payload) = text
            .split_once('\n')
            .ok_or_else(|| ClientError::protocol("frame has no channel separator"))?;
        Ok(Frame::new(channel, payload))
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Channel name for log output.
    pub fn channel_label(&self) -> &str {
        if self.is_control() {
            "control"
        } else {
            &self.channel
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", self.channel, self.payload)
    }
}
