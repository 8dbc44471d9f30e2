//! Socket transport layer (spec §4.4, C6): the eight ZeroMQ-style socket patterns, their
//! shared options, and the `SocketDetails` introspection type consumed by C8.

mod auth_apply;
mod context;
mod details;
mod envelope;
mod options;
mod pattern;
mod socket;

pub use context::Context;
pub use details::{MinimumPrivilege, SocketDetails, SocketPattern};
pub use envelope::RoutedMessage;
pub use options::{ConnectOrBind, HighWaterMark, SocketOptions, TimeOut, MAX_ROUTING_IDENTIFIER_LEN};
pub use pattern::{
    Dealer, Publisher, Reply, ReplyCallback, Request, Router, Subscriber, XPublisher, XSubscriber,
};
pub use socket::{Frame, Multipart, Socket};
