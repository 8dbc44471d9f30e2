//! Async wrapper around `zmq::Socket`, driven by `AsyncFd` on the socket's edge-triggered fd.
//!
//! Grounded on the non-blocking retry-on-readable idiom: every I/O call is attempted with
//! `DONTWAIT` first and only awaits the fd becoming readable on `EAGAIN`.

use std::os::fd::{AsRawFd, RawFd};

use tokio::io::unix::AsyncFd;
use zmq::{Message, DONTWAIT};

use umps_base::error::{Error, Result};

pub type Frame = Message;
pub type Multipart = Vec<Frame>;

pub struct Socket {
    socket: zmq::Socket,
    fd: AsyncFd<RawFd>,
}

// `zmq::Socket` is not `Sync`, but we only ever expose `&mut Socket`, so no two threads can
// drive I/O on the same instance concurrently.
unsafe impl Sync for Socket {}

impl Socket {
    pub fn new(socket: zmq::Socket) -> Result<Self> {
        let fd = AsyncFd::new(socket.as_raw_fd())
            .map_err(|error| Error::io_failure(format!("register socket fd: {error}")))?;
        Ok(Self { socket, fd })
    }

    pub fn get_ref(&self) -> &zmq::Socket {
        &self.socket
    }

    pub async fn recv_multipart(&mut self) -> Result<Multipart> {
        let mut frames = Vec::new();
        loop {
            let frame = self.recv_frame().await?;
            let more = self
                .socket
                .get_rcvmore()
                .map_err(|error| Error::io_failure(format!("get_rcvmore: {error}")))?;
            frames.push(frame);
            if !more {
                return Ok(frames);
            }
        }
    }

    async fn recv_frame(&mut self) -> Result<Frame> {
        loop {
            let mut message = Message::new();
            match self.socket.recv(&mut message, DONTWAIT) {
                Ok(()) => return Ok(message),
                Err(zmq::Error::EAGAIN) => {
                    self.wait_readable().await?;
                }
                Err(error) => return Err(Error::io_failure(format!("recv: {error}"))),
            }
        }
    }

    pub async fn send_multipart(&mut self, frames: Multipart) -> Result<()> {
        let last = frames.len().saturating_sub(1);
        for (index, frame) in frames.into_iter().enumerate() {
            let flags = if index == last { 0 } else { zmq::SNDMORE };
            self.send_frame(frame, flags).await?;
        }
        Ok(())
    }

    async fn send_frame(&mut self, frame: Frame, flags: i32) -> Result<()> {
        let mut message = frame;
        loop {
            match self.socket.send(&mut message, flags | DONTWAIT) {
                Ok(()) => return Ok(()),
                Err(zmq::Error::EAGAIN) => {
                    self.wait_readable().await?;
                }
                Err(error) => return Err(Error::io_failure(format!("send: {error}"))),
            }
        }
    }

    /// Waits for `ZMQ_FD` to report readable. It is edge-triggered and only covers `recv`/`send`
    /// readiness, so we clear readiness every time we come back around the retry loop.
    async fn wait_readable(&mut self) -> Result<()> {
        self.fd
            .readable()
            .await
            .map_err(|error| Error::io_failure(format!("poll socket fd: {error}")))?
            .clear_ready();
        Ok(())
    }
}

macro_rules! forward_sockopt {
    ($($name:ident($arg:ty)),* $(,)?) => {
        $(
            pub fn $name(&self, value: $arg) -> Result<()> {
                self.socket.$name(value).map_err(|error| Error::io_failure(format!(
                    concat!(stringify!($name), ": {}"), error
                )))
            }
        )*
    };
}

impl Socket {
    pub fn bind(&self, endpoint: &str) -> Result<()> {
        self.socket
            .bind(endpoint)
            .map_err(|error| map_bind_error(endpoint, error))
    }

    pub fn connect(&self, endpoint: &str) -> Result<()> {
        self.socket
            .connect(endpoint)
            .map_err(|error| Error::io_failure(format!("connect {endpoint}: {error}")))
    }

    pub fn last_endpoint(&self) -> Result<String> {
        self.socket
            .get_last_endpoint()
            .map_err(|error| Error::io_failure(format!("get_last_endpoint: {error}")))?
            .map_err(|_| Error::io_failure("last endpoint is not valid UTF-8"))
    }

    forward_sockopt! {
        set_sndhwm(i32),
        set_rcvhwm(i32),
        set_sndtimeo(i32),
        set_rcvtimeo(i32),
        set_linger(i32),
        set_subscribe(&[u8]),
        set_unsubscribe(&[u8]),
        set_identity(&[u8]),
        set_router_mandatory(bool),
        set_plain_server(bool),
        set_curve_server(bool),
        set_curve_publickey(&[u8]),
        set_curve_secretkey(&[u8]),
        set_curve_serverkey(&[u8]),
        set_zap_domain(&str),
    }

    pub fn set_plain_username(&self, value: &str) -> Result<()> {
        self.socket
            .set_plain_username(Some(value))
            .map_err(|error| Error::io_failure(format!("set_plain_username: {error}")))
    }

    pub fn set_plain_password(&self, value: &str) -> Result<()> {
        self.socket
            .set_plain_password(Some(value))
            .map_err(|error| Error::io_failure(format!("set_plain_password: {error}")))
    }
}

fn map_bind_error(endpoint: &str, error: zmq::Error) -> Error {
    if error == zmq::Error::EADDRINUSE {
        Error::address_in_use(format!("bind {endpoint}: {error}"))
    } else {
        Error::io_failure(format!("bind {endpoint}: {error}"))
    }
}
