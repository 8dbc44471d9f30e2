//! The eight socket patterns (spec §4.4, C6): publisher/subscriber, xpublisher/xsubscriber,
//! request/reply, router/dealer. Every pattern exposes `initialize`/`is_initialized`/
//! `socket_details` plus its own send/receive verbs, over the [`Socket`] wrapper in
//! `socket.rs`.

use std::time::Duration;

use umps_auth::SecurityLevel;
use umps_base::error::{Error, Result};
use umps_messages::registry::Registry;
use umps_messages::Message;

use crate::auth_apply;
use crate::context::Context;
use crate::details::{MinimumPrivilege, SocketDetails, SocketPattern};
use crate::envelope::RoutedMessage;
use crate::options::{ConnectOrBind, SocketOptions};
use crate::socket::{Frame, Socket};

fn apply_common(socket: &Socket, options: &SocketOptions) -> Result<()> {
    options.validate()?;
    socket.set_sndhwm(options.send_high_water_mark.unwrap_or(options.high_water_mark).as_i32())?;
    socket.set_rcvhwm(options.receive_high_water_mark.unwrap_or(options.high_water_mark).as_i32())?;
    socket.set_sndtimeo(options.send_time_out.unwrap_or(options.time_out).as_millis_i32())?;
    socket.set_rcvtimeo(options.receive_time_out.unwrap_or(options.time_out).as_millis_i32())?;
    if let Some(routing_identifier) = options.truncated_routing_identifier() {
        socket.set_identity(&routing_identifier)?;
    }
    if let Some(zap) = &options.zap_options {
        auth_apply::apply(socket, zap)?;
    }
    Ok(())
}

fn bind_or_connect(socket: &Socket, options: &SocketOptions) -> Result<()> {
    match options.connect_or_bind {
        ConnectOrBind::Bind => socket.bind(&options.address),
        ConnectOrBind::Connect => socket.connect(&options.address),
    }
}

fn security_level(options: &SocketOptions) -> SecurityLevel {
    options
        .zap_options
        .as_ref()
        .map(|zap| zap.security_level())
        .unwrap_or(SecurityLevel::Grasslands)
}

fn details(pattern: SocketPattern, options: &SocketOptions) -> SocketDetails {
    SocketDetails {
        pattern,
        address: options.address.clone(),
        security_level: security_level(options),
        minimum_user_privileges: MinimumPrivilege::ReadOnly,
        connect_or_bind: options.connect_or_bind,
        frontend: None,
        backend: None,
    }
}

fn encode_frames(message: &dyn Message) -> Result<Vec<Frame>> {
    let body = message.serialize()?;
    Ok(vec![
        Frame::from(message.type_tag().as_bytes()),
        Frame::from(body.as_slice()),
    ])
}

fn decode_frames(frames: &[Frame], registry: &Registry) -> Result<Box<dyn Message>> {
    let [type_tag, body] = frames else {
        return Err(Error::invalid_argument("expected exactly two frames"));
    };
    let type_tag = std::str::from_utf8(type_tag)
        .map_err(|_| Error::invalid_argument("type tag is not valid UTF-8"))?;
    registry.deserialize(type_tag, body)
}

macro_rules! initialized_pattern {
    ($name:ident, $pattern:expr, $zmq_type:expr) => {
        pub struct $name {
            socket: Option<Socket>,
            details: SocketDetails,
            receive_timeout: Option<Duration>,
        }

        impl $name {
            pub fn new() -> Self {
                Self {
                    socket: None,
                    details: SocketDetails {
                        pattern: $pattern,
                        address: String::new(),
                        security_level: SecurityLevel::Grasslands,
                        minimum_user_privileges: MinimumPrivilege::ReadOnly,
                        connect_or_bind: ConnectOrBind::Connect,
                        frontend: None,
                        backend: None,
                    },
                    receive_timeout: None,
                }
            }

            pub fn initialize(&mut self, context: &Context, options: SocketOptions) -> Result<()> {
                if self.is_initialized() {
                    return Err(Error::already_initialized(stringify!($name)));
                }
                let socket = context.socket($zmq_type)?;
                apply_common(&socket, &options)?;
                bind_or_connect(&socket, &options)?;
                self.receive_timeout = options.receive_time_out.unwrap_or(options.time_out).as_duration();
                self.details = details($pattern, &options);
                self.socket = Some(socket);
                Ok(())
            }

            pub fn is_initialized(&self) -> bool {
                self.socket.is_some()
            }

            pub fn socket_details(&self) -> &SocketDetails {
                &self.details
            }

            fn socket_mut(&mut self) -> Result<&mut Socket> {
                self.socket
                    .as_mut()
                    .ok_or_else(|| Error::not_initialized(stringify!($name)))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

initialized_pattern!(Publisher, SocketPattern::Publisher, zmq::SocketType::PUB);
initialized_pattern!(Subscriber, SocketPattern::Subscriber, zmq::SocketType::SUB);
initialized_pattern!(XPublisher, SocketPattern::XPublisher, zmq::SocketType::XPUB);
initialized_pattern!(XSubscriber, SocketPattern::XSubscriber, zmq::SocketType::XSUB);
initialized_pattern!(Request, SocketPattern::Request, zmq::SocketType::REQ);
initialized_pattern!(Reply, SocketPattern::Reply, zmq::SocketType::REP);
initialized_pattern!(Router, SocketPattern::Router, zmq::SocketType::ROUTER);
initialized_pattern!(Dealer, SocketPattern::Dealer, zmq::SocketType::DEALER);

impl Publisher {
    pub async fn send(&mut self, message: &dyn Message) -> Result<()> {
        let frames = encode_frames(message)?;
        self.socket_mut()?.send_multipart(frames).await
    }
}

impl Subscriber {
    /// Subscribes to the given message types (spec §4.4 `message_formats`); an empty slice
    /// subscribes to everything.
    pub fn subscribe(&mut self, type_tags: &[&str]) -> Result<()> {
        let socket = self.socket_mut()?;
        if type_tags.is_empty() {
            socket.set_subscribe(b"")?;
        } else {
            for type_tag in type_tags {
                socket.set_subscribe(type_tag.as_bytes())?;
            }
        }
        Ok(())
    }

    /// Receives one message, or `None` on timeout. Unknown types are dropped (spec §4.4).
    pub async fn receive(&mut self, registry: &Registry) -> Result<Option<Box<dyn Message>>> {
        let timeout = self.receive_timeout;
        loop {
            let frames = match recv_with_timeout(self.socket_mut()?, timeout).await? {
                Some(frames) => frames,
                None => return Ok(None),
            };
            match decode_frames(&frames, registry) {
                Ok(message) => return Ok(Some(message)),
                Err(error) => {
                    tracing::warn!(%error, "dropping unrecognized message");
                    continue;
                }
            }
        }
    }
}

/// Awaits one multipart receive, returning `None` if `timeout` elapses first.
async fn recv_with_timeout(
    socket: &mut Socket,
    timeout: Option<Duration>,
) -> Result<Option<Vec<Frame>>> {
    match timeout {
        None => socket.recv_multipart().await.map(Some),
        Some(duration) => match tokio::time::timeout(duration, socket.recv_multipart()).await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        },
    }
}

impl XPublisher {
    pub async fn send(&mut self, message: &dyn Message) -> Result<()> {
        let frames = encode_frames(message)?;
        self.socket_mut()?.send_multipart(frames).await
    }

    /// Reads one raw frame off the XPUB socket: either a subscription control frame (prefixed
    /// `\x01`/`\x00`) or a message frame, used when relaying subscriber activity upstream.
    pub async fn recv_raw(&mut self) -> Result<Vec<Frame>> {
        self.socket_mut()?.recv_multipart().await
    }

    pub async fn send_raw(&mut self, frames: Vec<Frame>) -> Result<()> {
        self.socket_mut()?.send_multipart(frames).await
    }
}

impl XSubscriber {
    /// Same semantics as [`Subscriber::subscribe`]; XSUB sockets take subscriptions the same
    /// way, the difference is only that XSUB also surfaces them for the owner to forward.
    pub fn subscribe(&mut self, type_tags: &[&str]) -> Result<()> {
        let socket = self.socket_mut()?;
        if type_tags.is_empty() {
            socket.set_subscribe(b"")?;
        } else {
            for type_tag in type_tags {
                socket.set_subscribe(type_tag.as_bytes())?;
            }
        }
        Ok(())
    }

    pub async fn send_raw(&mut self, frames: Vec<Frame>) -> Result<()> {
        self.socket_mut()?.send_multipart(frames).await
    }

    pub async fn recv_raw(&mut self) -> Result<Vec<Frame>> {
        self.socket_mut()?.recv_multipart().await
    }
}

impl Request {
    /// Sends `message` and blocks for the reply, up to the configured receive timeout. Returns
    /// `Err(Error::Timeout)` if none arrives in time (spec §4.9: requestors "do not retry").
    pub async fn request(
        &mut self,
        message: &dyn Message,
        registry: &Registry,
    ) -> Result<Box<dyn Message>> {
        let frames = encode_frames(message)?;
        let timeout = self.receive_timeout;
        let socket = self.socket_mut()?;
        socket.send_multipart(frames).await?;
        match recv_with_timeout(socket, timeout).await? {
            Some(reply) => decode_frames(&reply, registry),
            None => Err(Error::timeout("no reply within the configured time_out")),
        }
    }
}

/// A reply-socket callback: given the request's type tag and serialized body, produces the
/// response message to send back.
pub type ReplyCallback =
    Box<dyn Fn(&str, &[u8]) -> Box<dyn Message> + Send + Sync>;

impl Reply {
    /// Serves `callback` until `cancel` fires. Errors decoding a request are logged and
    /// answered with nothing sent (the REQ/REP lockstep means we must still reply, so malformed
    /// requests get whatever `callback` produces for an empty type tag).
    pub async fn serve(
        &mut self,
        registry: &Registry,
        callback: &ReplyCallback,
        cancel: &umps_base::Cancel,
    ) -> Result<()> {
        loop {
            let frames = tokio::select! {
                () = cancel.wait() => return Ok(()),
                frames = self.socket_mut()?.recv_multipart() => frames?,
            };
            let response = match decode_frames(&frames, registry) {
                Ok(message) => callback(message.type_tag(), &message.serialize()?),
                Err(error) => {
                    tracing::warn!(%error, "reply: invalid request");
                    callback("", &[])
                }
            };
            let response_frames = encode_frames(response.as_ref())?;
            self.socket_mut()?.send_multipart(response_frames).await?;
        }
    }
}

impl Router {
    /// Receives one client request, or `None` on timeout. The caller is responsible for
    /// correlating the returned routing-id frames with the eventual `send`.
    pub async fn receive(
        &mut self,
        registry: &Registry,
    ) -> Result<Option<(Vec<Frame>, Box<dyn Message>)>> {
        let timeout = self.receive_timeout;
        let Some(frames) = recv_with_timeout(self.socket_mut()?, timeout).await? else {
            return Ok(None);
        };
        let routed = RoutedMessage::try_from(frames)
            .map_err(|_| Error::invalid_argument("router frame missing routing envelope"))?;
        let (routing_id, payload) = routed.into_parts();
        let message = decode_frames(&payload, registry)?;
        Ok(Some((routing_id, message)))
    }

    pub async fn send(&mut self, routing_id: Vec<Frame>, message: &dyn Message) -> Result<()> {
        let routed = RoutedMessage::new(routing_id, encode_frames(message)?);
        self.socket_mut()?
            .send_multipart(Vec::from(routed))
            .await
    }

    /// Forwards raw frames untouched, including the leading routing-id frame ROUTER prepends on
    /// receive. Used by the ROUTER/DEALER proxy (spec §4.5), which never decodes payloads.
    pub async fn recv_raw(&mut self) -> Result<Vec<Frame>> {
        self.socket_mut()?.recv_multipart().await
    }

    pub async fn send_raw(&mut self, frames: Vec<Frame>) -> Result<()> {
        self.socket_mut()?.send_multipart(frames).await
    }
}

impl Dealer {
    pub async fn send(&mut self, message: &dyn Message) -> Result<()> {
        let frames = encode_frames(message)?;
        let routed = RoutedMessage::new(Vec::new(), frames);
        self.socket_mut()?
            .send_multipart(Vec::from(routed))
            .await
    }

    pub async fn receive(&mut self, registry: &Registry) -> Result<Option<Box<dyn Message>>> {
        let timeout = self.receive_timeout;
        let Some(frames) = recv_with_timeout(self.socket_mut()?, timeout).await? else {
            return Ok(None);
        };
        let routed = RoutedMessage::try_from(frames)
            .map_err(|_| Error::invalid_argument("dealer frame missing routing envelope"))?;
        let (_routing_id, payload) = routed.into_parts();
        decode_frames(&payload, registry).map(Some)
    }

    /// Forwards raw frames untouched (spec §4.5 ROUTER/DEALER proxy).
    pub async fn recv_raw(&mut self) -> Result<Vec<Frame>> {
        self.socket_mut()?.recv_multipart().await
    }

    pub async fn send_raw(&mut self, frames: Vec<Frame>) -> Result<()> {
        self.socket_mut()?.send_multipart(frames).await
    }
}
