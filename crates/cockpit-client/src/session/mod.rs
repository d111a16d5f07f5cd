//! The channel session: login, handshake, and framed traffic over one transport.
//!
//! A [`Session`] walks through [`SessionState`] in order. `connect` runs the
//! whole sequence; the individual steps are public for callers that need to
//! interleave their own work.
//!
//! Opening a channel does not wait for the peer. A failed open shows up later
//! as a `close` control message carrying a `problem`, which the caller sees
//! through [`Session::receive_message`].

pub mod channel;
pub mod control;
pub mod state;
pub mod wire;

use cockpit_http::Endpoint;
use tracing::{debug, info, warn};

use crate::auth::{self, AuthCookieGenerator, Credentials};
use crate::error::ClientError;
use crate::remote::Bus;
use crate::transport::Transport;

pub use channel::{ChannelIds, OpenChannel, PayloadType};
pub use control::ControlMessage;
pub use state::SessionState;
pub use wire::{is_control_channel, Frame, CONTROL_CHANNEL};

/// One authenticated connection to a Cockpit web service.
pub struct Session<T: Transport> {
    transport: T,
    state: SessionState,
    endpoint: Option<Endpoint>,
    credentials: Option<Credentials>,
    cookies: AuthCookieGenerator,
    channel_ids: ChannelIds,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T) -> Result<Self, ClientError> {
        Ok(Self::with_cookie_generator(transport, AuthCookieGenerator::new()?))
    }

    pub fn with_cookie_generator(transport: T, cookies: AuthCookieGenerator) -> Self {
        Session {
            transport,
            state: SessionState::Disconnected,
            endpoint: None,
            credentials: None,
            cookies,
            channel_ids: ChannelIds::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// True between a successful login and logout.
    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn expect_state(&self, expected: SessionState) -> Result<(), ClientError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ClientError::InvalidState {
                expected,
                actual: self.state,
            })
        }
    }

    /// Connect, log in and complete the handshake. Returns the peer's `init`.
    ///
    /// Any failure closes the transport and leaves the session `Closed`.
    pub fn connect(&mut self, url: &str, username: &str, password: &str) -> Result<ControlMessage, ClientError> {
        self.expect_state(SessionState::Disconnected)?;
        let result = self.run_connect(url, username, password);
        if result.is_err() && self.state != SessionState::Closed {
            self.teardown();
        }
        result
    }

    fn run_connect(&mut self, url: &str, username: &str, password: &str) -> Result<ControlMessage, ClientError> {
        self.connect_transport(url)?;
        let cookie = self.login(username, password)?;
        self.handshake(&cookie)
    }

    /// Open the transport to `url`.
    pub fn connect_transport(&mut self, url: &str) -> Result<(), ClientError> {
        self.expect_state(SessionState::Disconnected)?;
        let endpoint = cockpit_http::parse_url(url)?;
        self.transport.connect(&endpoint)?;
        info!(url, "connected");
        self.endpoint = Some(endpoint);
        self.state = SessionState::TransportConnected;
        Ok(())
    }

    /// Log in over the connected transport and return the session cookie.
    pub fn login(&mut self, username: &str, password: &str) -> Result<String, ClientError> {
        self.expect_state(SessionState::TransportConnected)?;
        let endpoint = self.endpoint.as_ref().ok_or(ClientError::InvalidState {
            expected: SessionState::TransportConnected,
            actual: self.state,
        })?;
        let credentials = Credentials::new(username, password);
        let stream = self.transport.stream()?;
        let cookie = auth::login(stream, endpoint, &self.cookies, &credentials)?;
        self.credentials = Some(credentials);
        self.state = SessionState::Authenticated;
        Ok(cookie)
    }

    /// Upgrade the transport with the session cookie and wait for `init`.
    ///
    /// The first inbound frame must be an `init` on the control channel. On
    /// success the channel seed is taken from it and an `init` reply carrying
    /// the same version is sent. On failure the session is torn down.
    pub fn handshake(&mut self, cookie: &str) -> Result<ControlMessage, ClientError> {
        self.expect_state(SessionState::Authenticated)?;
        let result = self.run_handshake(cookie);
        if result.is_err() {
            self.teardown();
        }
        result
    }

    fn run_handshake(&mut self, cookie: &str) -> Result<ControlMessage, ClientError> {
        let headers = [("Cookie".to_string(), format!("cockpit={cookie}"))];
        self.transport.handshake(&headers)?;
        self.state = SessionState::HandshakePending;

        let frame = self.recv_frame()?;
        if !frame.is_control() {
            return Err(ClientError::protocol(format!(
                "expected init on the control channel, got a frame for channel {:?}",
                frame.channel
            )));
        }
        let init = ControlMessage::from_json(&frame.payload)
            .map_err(|e| ClientError::protocol(format!("undecodable first control message: {e}")))?;
        let ControlMessage::Init { version, channel_seed } = init else {
            return Err(ClientError::protocol(format!(
                "expected init, got {}",
                init.command()
            )));
        };

        self.channel_ids = ChannelIds::new(channel_seed.unwrap_or_default());
        self.send_control_frame(&ControlMessage::Init {
            version,
            channel_seed: None,
        })?;
        self.state = SessionState::Ready;
        info!(version, seed = channel_seed.unwrap_or_default(), "session ready");
        Ok(init)
    }

    /// Next unused channel id. Fails once the peer's seed leaves no ids.
    pub fn next_channel_id(&mut self) -> Result<String, ClientError> {
        self.channel_ids.allocate()
    }

    /// Allocate an id and open a channel under it. Returns the id without
    /// waiting for the peer.
    pub fn open_channel(&mut self, spec: OpenChannel) -> Result<String, ClientError> {
        self.expect_state(SessionState::Ready)?;
        let id = self.next_channel_id()?;
        self.open_channel_with_id(id, spec)
    }

    pub fn open_channel_with_id(&mut self, id: impl Into<String>, spec: OpenChannel) -> Result<String, ClientError> {
        self.expect_state(SessionState::Ready)?;
        let id = id.into();
        self.send_control_frame(&spec.into_message(id.as_str()))?;
        Ok(id)
    }

    /// Open a `dbus-json3` channel to `service` on `bus`.
    ///
    /// Only the host, user, password and options of `spec` are used. Its
    /// payload is always replaced by `dbus-json3`, and `bus` and `name` are
    /// overwritten.
    pub fn open_dbus_channel(&mut self, bus: Bus, service: &str, spec: OpenChannel) -> Result<String, ClientError> {
        if spec.payload != PayloadType::DbusJson3 {
            debug!(payload = spec.payload.as_str(), "replacing payload with dbus-json3");
        }
        let spec = OpenChannel {
            payload: PayloadType::DbusJson3,
            ..spec
        }
        .option("bus", bus.as_str())
        .option("name", service);
        self.open_channel(spec)
    }

    pub fn close_channel(&mut self, id: &str, reason: &str) -> Result<(), ClientError> {
        self.expect_state(SessionState::Ready)?;
        self.send_control_frame(&ControlMessage::close(id, reason))
    }

    pub fn ping(&mut self) -> Result<(), ClientError> {
        self.expect_state(SessionState::Ready)?;
        self.send_control_frame(&ControlMessage::Ping)
    }

    /// Send `logout` and forget the credentials. A no-op when not logged in.
    pub fn logout(&mut self, disconnect: bool) -> Result<(), ClientError> {
        if self.credentials.is_none() {
            return Ok(());
        }
        self.expect_state(SessionState::Ready)?;
        self.send_control_frame(&ControlMessage::Logout { disconnect })?;
        self.credentials = None;
        info!(disconnect, "logged out");
        Ok(())
    }

    /// Log out and close the transport. Only valid from `Ready`.
    pub fn disconnect(&mut self) -> Result<(), ClientError> {
        self.expect_state(SessionState::Ready)?;
        let logout = self.logout(true);
        let close = self.transport.close();
        self.state = SessionState::Closed;
        logout?;
        close?;
        Ok(())
    }

    pub fn send_message(&mut self, channel: &str, payload: &str) -> Result<(), ClientError> {
        self.expect_state(SessionState::Ready)?;
        self.send_frame(&Frame::new(channel, payload))
    }

    pub fn send_control(&mut self, message: &ControlMessage) -> Result<(), ClientError> {
        self.expect_state(SessionState::Ready)?;
        self.send_control_frame(message)
    }

    /// Block until the next frame arrives, on any channel.
    pub fn receive_message(&mut self) -> Result<Frame, ClientError> {
        self.expect_state(SessionState::Ready)?;
        self.recv_frame()
    }

    fn send_control_frame(&mut self, message: &ControlMessage) -> Result<(), ClientError> {
        self.send_frame(&Frame::new(CONTROL_CHANNEL, message.to_json()?))
    }

    fn send_frame(&mut self, frame: &Frame) -> Result<(), ClientError> {
        debug!(channel = frame.channel_label(), payload = %frame.payload, "send");
        self.transport.send(&frame.encode())?;
        Ok(())
    }

    fn recv_frame(&mut self) -> Result<Frame, ClientError> {
        let text = self.transport.receive()?;
        let frame = Frame::parse(&text)?;
        debug!(channel = frame.channel_label(), payload = %frame.payload, "recv");
        Ok(frame)
    }

    fn teardown(&mut self) {
        if let Err(e) = self.transport.close() {
            warn!(error = %e, "closing transport after failed connect");
        }
        self.credentials = None;
        self.state = SessionState::Closed;
    }
}
