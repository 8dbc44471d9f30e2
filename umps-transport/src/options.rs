//! Socket initialization options (spec §4.4 option table).

use std::time::Duration;

use umps_auth::ZapOptions;

use umps_base::error::{Error, Result};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConnectOrBind {
    Connect,
    Bind,
}

/// Upper bound on queued messages per direction. `Unbounded` maps to HWM 0.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HighWaterMark {
    Unbounded,
    Bounded(u32),
}

impl HighWaterMark {
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Unbounded => 0,
            Self::Bounded(n) => n as i32,
        }
    }
}

/// Receive/send timeout (spec: negative = wait forever, 0 = return immediately, positive =
/// bounded wait).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TimeOut {
    Forever,
    Immediate,
    Bounded(Duration),
}

impl TimeOut {
    pub fn as_millis_i32(self) -> i32 {
        match self {
            Self::Forever => -1,
            Self::Immediate => 0,
            Self::Bounded(duration) => duration.as_millis().min(i32::MAX as u128) as i32,
        }
    }

    /// `None` means "wait forever"; used to drive an application-level `tokio::time::timeout`
    /// around the socket's non-blocking retry loop, since `ZMQ_RCVTIMEO` has no effect once
    /// every recv is issued with `DONTWAIT` (spec §4.4 `time_out`).
    pub fn as_duration(self) -> Option<Duration> {
        match self {
            Self::Forever => None,
            Self::Immediate => Some(Duration::ZERO),
            Self::Bounded(duration) => Some(duration),
        }
    }
}

/// Options shared by every socket pattern. Pattern-specific option structs in `pattern.rs`
/// embed this and add their own verbs (subscriptions, routing identity, callback).
#[derive(Clone, Debug)]
pub struct SocketOptions {
    pub address: String,
    pub connect_or_bind: ConnectOrBind,
    pub high_water_mark: HighWaterMark,
    pub send_high_water_mark: Option<HighWaterMark>,
    pub receive_high_water_mark: Option<HighWaterMark>,
    pub time_out: TimeOut,
    pub send_time_out: Option<TimeOut>,
    pub receive_time_out: Option<TimeOut>,
    pub zap_options: Option<ZapOptions>,
    pub message_formats: Vec<String>,
    pub routing_identifier: Option<Vec<u8>>,
}

/// Maximum length of an explicit ROUTER/DEALER routing identity (spec §4.4).
pub const MAX_ROUTING_IDENTIFIER_LEN: usize = 255;

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            address: String::new(),
            connect_or_bind: ConnectOrBind::Connect,
            high_water_mark: HighWaterMark::Bounded(1000),
            send_high_water_mark: None,
            receive_high_water_mark: None,
            time_out: TimeOut::Forever,
            send_time_out: None,
            receive_time_out: None,
            zap_options: None,
            message_formats: Vec::new(),
            routing_identifier: None,
        }
    }
}

impl SocketOptions {
    pub fn validate(&self) -> Result<()> {
        if self.address.is_empty() {
            return Err(Error::invalid_argument("address must not be empty"));
        }
        if let HighWaterMark::Bounded(0) = self.high_water_mark {
            // 0 means unbounded; callers should use `HighWaterMark::Unbounded` for that. A
            // literal zero here is accepted as a synonym, never rejected.
        }
        if let Some(zap) = &self.zap_options {
            zap.validate()?;
        }
        Ok(())
    }

    /// Truncates an over-long routing identity rather than rejecting it outright, per spec
    /// §4.4 ("truncated if longer"). Never rejected by `validate`, since truncation is the
    /// spec'd recovery for a too-long identity, not a validation error.
    pub fn truncated_routing_identifier(&self) -> Option<Vec<u8>> {
        self.routing_identifier.as_ref().map(|id| {
            let mut id = id.clone();
            id.truncate(MAX_ROUTING_IDENTIFIER_LEN);
            id
        })
    }
}
