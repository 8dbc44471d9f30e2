//! The proxy state machine (spec §4.5): `Created → Ready → Running ⇄ Paused → Stopped` for the
//! broadcast proxy; the service proxy has no `Paused` state and never constructs it (spec §9:
//! "the ROUTER/DEALER source lacks a `pause`" — it offers only `Created → Ready → Running →
//! Stopped`).

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProxyState {
    Created,
    Ready,
    Running,
    Paused,
    Stopped,
}

/// Control-channel commands for the broadcast proxy (spec §4.5: "commands are `START`, `PAUSE`,
/// `STOP`"). Sent over a `tokio::mpsc` channel rather than a literal inproc socket, since the
/// proxy loop already multiplexes its frontend/backend I/O through one `tokio::select!`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Control {
    Start,
    Pause,
    Stop,
}

/// Control-channel commands for the service proxy (spec §9: "ROUTER/DEALER offers only
/// `start/stop`").
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ServiceControl {
    Start,
    Stop,
}
