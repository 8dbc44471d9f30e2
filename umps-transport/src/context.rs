//! `Context` (spec §4.3, C4): a shared, cloneable transport context per process group.

use umps_base::error::{Error, Result};

use crate::socket::Socket;

/// Wraps `zmq::Context`, which is already reference-counted internally; cloning this type
/// shares the same I/O threads, so multiple components can use one `inproc://` namespace.
#[derive(Clone, Debug)]
pub struct Context {
    inner: zmq::Context,
}

impl Context {
    /// Creates a context with `io_threads` I/O threads (spec §4.3: "created with an I/O-thread
    /// count").
    pub fn new(io_threads: i32) -> Result<Self> {
        let inner = zmq::Context::new();
        inner
            .set_io_threads(io_threads)
            .map_err(|error| Error::io_failure(format!("set_io_threads: {error}")))?;
        Ok(Self { inner })
    }

    pub fn raw(&self) -> &zmq::Context {
        &self.inner
    }

    /// Creates a socket of the given type. Exposed beyond `pattern.rs` for components that need
    /// a raw socket outside the eight typed patterns, e.g. the ZAP endpoint (C3) and a proxy's
    /// inproc control channel (C7).
    pub fn socket(&self, socket_type: zmq::SocketType) -> Result<Socket> {
        let raw = self
            .inner
            .socket(socket_type)
            .map_err(|error| Error::io_failure(format!("create socket: {error}")))?;
        Socket::new(raw)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(1).expect("default context with 1 I/O thread")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_shares_inner_context() {
        let context = Context::new(1).unwrap();
        let clone = context.clone();
        assert!(clone.socket(zmq::SocketType::PAIR).is_ok());
    }
}
