//! D-Bus method calls over a `dbus-json3` channel.
//!
//! A call is sent as `{"call":[path, interface, method, args],"id":"cookie"}`.
//! When a reply is wanted, the next inbound frame on the session is taken as
//! the reply. Calls are not correlated by id and there is no timeout, so a
//! caller must not have other traffic in flight while waiting.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::SessionConfig;
use crate::error::ClientError;
use crate::session::{Frame, OpenChannel, Session, SessionState};
use crate::transport::{Transport, WebSocket};

/// Call id attached when a reply is requested.
const REPLY_COOKIE: &str = "cookie";

/// Which message bus a D-Bus channel talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bus {
    #[default]
    Session,
    System,
}

impl Bus {
    pub fn as_str(self) -> &'static str {
        match self {
            Bus::Session => "session",
            Bus::System => "system",
        }
    }
}

#[derive(Serialize)]
struct MethodCall<'a> {
    call: (&'a str, &'a str, &'a str, &'a [Value]),
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
}

/// An open D-Bus channel on a ready session.
pub struct RemoteDbus<T: Transport> {
    session: Session<T>,
    channel: String,
}

impl RemoteDbus<WebSocket> {
    /// Connect with the settings in `config` and open a channel to `service`
    /// on the configured bus.
    pub fn connect(
        config: &SessionConfig,
        username: &str,
        password: &str,
        service: &str,
    ) -> Result<Self, ClientError> {
        let mut session = Session::new(WebSocket::new(config.websocket_options()))?;
        session.connect(&config.url, username, password)?;
        let spec = OpenChannel::dbus().user(username).password(password);
        Self::open_with(session, config.bus, service, spec)
    }
}

impl<T: Transport> RemoteDbus<T> {
    pub fn open(session: Session<T>, bus: Bus, service: &str) -> Result<Self, ClientError> {
        Self::open_with(session, bus, service, OpenChannel::dbus())
    }

    /// Open with extra `open` parameters.
    pub fn open_with(
        mut session: Session<T>,
        bus: Bus,
        service: &str,
        spec: OpenChannel,
    ) -> Result<Self, ClientError> {
        if session.state() != SessionState::Ready {
            return Err(ClientError::InvalidState {
                expected: SessionState::Ready,
                actual: session.state(),
            });
        }
        let channel = session.open_dbus_channel(bus, service, spec)?;
        debug!(channel = %channel, service, bus = bus.as_str(), "dbus channel opened");
        Ok(RemoteDbus { session, channel })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<T> {
        &mut self.session
    }

    /// Invoke `interface.method` on `path`. With `require_response`, blocks
    /// for the next inbound frame and returns it.
    pub fn call(
        &mut self,
        path: &str,
        interface: &str,
        method: &str,
        args: &[Value],
        require_response: bool,
    ) -> Result<Option<Frame>, ClientError> {
        let call = MethodCall {
            call: (path, interface, method, args),
            id: require_response.then_some(REPLY_COOKIE),
        };
        let payload = serde_json::to_string(&call)?;
        self.session.send_message(&self.channel, &payload)?;
        if !require_response {
            return Ok(None);
        }
        self.session.receive_message().map(Some)
    }

    /// Close the channel and disconnect the session.
    pub fn close(mut self, reason: &str) -> Result<Session<T>, ClientError> {
        let closed = self.session.close_channel(&self.channel, reason);
        let disconnected = self.session.disconnect();
        closed?;
        disconnected?;
        Ok(self.session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn call_payload_with_reply() {
        let args = [json!("hello")];
        let call = MethodCall {
            call: ("/org/example", "org.example.Iface", "Echo", &args),
            id: Some(REPLY_COOKIE),
        };
        insta::assert_snapshot!(
            serde_json::to_string(&call).unwrap(),
            @r#"{"call":["/org/example","org.example.Iface","Echo",["hello"]],"id":"cookie"}"#
        );
    }

    #[test]
    fn call_payload_without_reply() {
        let call = MethodCall {
            call: ("/", "org.example.Iface", "Reset", &[]),
            id: None,
        };
        insta::assert_snapshot!(
            serde_json::to_string(&call).unwrap(),
            @r#"{"call":["/","org.example.Iface","Reset",[]]}"#
        );
    }

    #[test]
    fn bus_names() {
        assert_eq!(Bus::default(), Bus::Session);
        assert_eq!(Bus::System.as_str(), "system");
        assert_eq!(serde_json::to_string(&Bus::Session).unwrap(), "\"session\"");
    }
}
