//! The requestor base (spec §4.9, C11): opens a request socket, blocks for a reply up to the
//! configured timeout, never retries, and disconnects idempotently.

use umps_base::error::{Error, Result};
use umps_messages::registry::Registry;
use umps_messages::Message;
use umps_transport::{Context, Request, SocketOptions};

/// Shared by every domain-specific requestor. `context`/`logger` in spec §4.9's constructor
/// become plain constructor parameters here; there is no ambient logger object in this crate's
/// idiom, `tracing`'s global subscriber plays that role.
pub struct Requestor {
    context: Context,
    socket: Option<Request>,
}

impl Requestor {
    pub fn new(context: Context) -> Self {
        Self { context, socket: None }
    }

    pub fn is_initialized(&self) -> bool {
        self.socket.is_some()
    }

    pub fn initialize(&mut self, options: SocketOptions) -> Result<()> {
        if self.socket.is_some() {
            return Err(Error::already_initialized("requestor"));
        }
        let mut request = Request::new();
        request.initialize(&self.context, options)?;
        self.socket = Some(request);
        Ok(())
    }

    /// Sends `message` and blocks for a reply up to the socket's configured receive timeout.
    /// `Err(Error::Timeout)` surfaces to the caller unchanged; this never retries (spec §4.9).
    pub async fn request(&mut self, message: &dyn Message, registry: &Registry) -> Result<Box<dyn Message>> {
        let socket = self.socket.as_mut().ok_or_else(|| Error::not_initialized("requestor"))?;
        socket.request(message, registry).await
    }

    /// Idempotent: dropping an already-disconnected requestor does nothing further.
    pub fn disconnect(&mut self) {
        self.socket = None;
    }
}
