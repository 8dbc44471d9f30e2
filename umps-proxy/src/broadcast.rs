//! The XPUB/XSUB broadcast proxy (spec §4.5): forwards publisher traffic frontend→backend and
//! subscription activity backend→frontend.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use umps_base::error::{Error, Result};
use umps_base::task::{Cancel, JoinGuard};
use umps_transport::{Context, SocketDetails, SocketOptions, XPublisher, XSubscriber};

use crate::state::{Control, ProxyState};

/// Owns an XSUB frontend (faces publishers) and an XPUB backend (faces subscribers).
pub struct BroadcastProxy {
    state: Arc<Mutex<ProxyState>>,
    control: Option<mpsc::UnboundedSender<Control>>,
    guard: Option<JoinGuard<Result<()>>>,
    details: Option<SocketDetails>,
}

impl BroadcastProxy {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ProxyState::Created)),
            control: None,
            guard: None,
            details: None,
        }
    }

    pub fn state(&self) -> ProxyState {
        *self.state.lock().expect("proxy state mutex poisoned")
    }

    pub fn is_initialized(&self) -> bool {
        self.state() != ProxyState::Created
    }

    pub fn socket_details(&self) -> Option<&SocketDetails> {
        self.details.as_ref()
    }

    /// Binds both sockets and spawns the forwarding loop in a paused state; `start()` is
    /// required to begin forwarding (spec §4.5 state machine).
    pub fn initialize(
        &mut self,
        context: &Context,
        frontend_options: SocketOptions,
        backend_options: SocketOptions,
    ) -> Result<()> {
        if self.is_initialized() {
            return Err(Error::already_initialized("broadcast proxy"));
        }

        let mut frontend = XSubscriber::new();
        frontend.initialize(context, frontend_options)?;
        frontend.subscribe(&[])?;

        let mut backend = XPublisher::new();
        backend.initialize(context, backend_options)?;

        self.details = Some(SocketDetails::proxy(
            frontend.socket_details().clone(),
            backend.socket_details().clone(),
        ));

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let state = self.state.clone();
        *state.lock().expect("proxy state mutex poisoned") = ProxyState::Ready;

        self.guard = Some(JoinGuard::spawn(move |cancel| {
            run(frontend, backend, control_rx, state, cancel)
        }));
        self.control = Some(control_tx);
        Ok(())
    }

    /// Begins forwarding. Valid from `Ready` or `Paused` (spec §4.5).
    pub fn start(&mut self) -> Result<()> {
        self.send_control(Control::Start, &[ProxyState::Ready, ProxyState::Paused])
    }

    /// Suspends forwarding without tearing the sockets down. Valid from `Running`.
    pub fn pause(&mut self) -> Result<()> {
        self.send_control(Control::Pause, &[ProxyState::Running])
    }

    /// Terminal; joins the proxy thread. Idempotent once `Stopped`.
    pub async fn stop(&mut self) -> Result<()> {
        if self.state() == ProxyState::Stopped {
            return Ok(());
        }
        if let Some(control) = &self.control {
            let _ = control.send(Control::Stop);
        }
        if let Some(mut guard) = self.guard.take() {
            let result = guard.shutdown().await;
            *self.state.lock().expect("proxy state mutex poisoned") = ProxyState::Stopped;
            return result.unwrap_or(Ok(()));
        }
        *self.state.lock().expect("proxy state mutex poisoned") = ProxyState::Stopped;
        Ok(())
    }

    fn send_control(&self, command: Control, allowed: &[ProxyState]) -> Result<()> {
        if !allowed.contains(&self.state()) {
            return Err(Error::not_initialized("broadcast proxy not ready for this transition"));
        }
        let control = self
            .control
            .as_ref()
            .ok_or_else(|| Error::not_initialized("broadcast proxy"))?;
        control
            .send(command)
            .map_err(|_| Error::not_initialized("broadcast proxy thread already exited"))
    }
}

impl Default for BroadcastProxy {
    fn default() -> Self {
        Self::new()
    }
}

async fn run(
    mut frontend: XSubscriber,
    mut backend: XPublisher,
    mut control_rx: mpsc::UnboundedReceiver<Control>,
    state: Arc<Mutex<ProxyState>>,
    cancel: Cancel,
) -> Result<()> {
    let mut running = false;
    loop {
        tokio::select! {
            () = cancel.wait() => break,
            command = control_rx.recv() => {
                match command {
                    Some(Control::Start) => {
                        running = true;
                        *state.lock().expect("proxy state mutex poisoned") = ProxyState::Running;
                    }
                    Some(Control::Pause) => {
                        running = false;
                        *state.lock().expect("proxy state mutex poisoned") = ProxyState::Paused;
                    }
                    Some(Control::Stop) | None => break,
                }
            }
            frames = frontend.recv_raw(), if running => {
                match frames {
                    Ok(frames) => {
                        if let Err(error) = backend.send_raw(frames).await {
                            tracing::warn!(%error, "broadcast proxy: frontend -> backend");
                        }
                    }
                    Err(error @ Error::AddressInUse { .. }) => {
                        tracing::error!(%error, "broadcast proxy: frontend socket lost");
                        break;
                    }
                    Err(error) => tracing::warn!(%error, "broadcast proxy: frontend recv"),
                }
            }
            frames = backend.recv_raw(), if running => {
                match frames {
                    Ok(frames) => {
                        if let Err(error) = frontend.send_raw(frames).await {
                            tracing::warn!(%error, "broadcast proxy: backend -> frontend");
                        }
                    }
                    Err(error @ Error::AddressInUse { .. }) => {
                        tracing::error!(%error, "broadcast proxy: backend socket lost");
                        break;
                    }
                    Err(error) => tracing::warn!(%error, "broadcast proxy: backend recv"),
                }
            }
        }
    }
    *state.lock().expect("proxy state mutex poisoned") = ProxyState::Stopped;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use umps_messages::Message;
    use umps_transport::ConnectOrBind;

    fn options(address: &str, bind: bool) -> SocketOptions {
        SocketOptions {
            address: address.to_string(),
            connect_or_bind: if bind { ConnectOrBind::Bind } else { ConnectOrBind::Connect },
            ..SocketOptions::default()
        }
    }

    #[tokio::test]
    async fn forwards_publisher_traffic_to_subscribers() {
        let context = Context::new(1).unwrap();
        let mut proxy = BroadcastProxy::new();
        proxy
            .initialize(
                &context,
                options("inproc://broadcast-test-frontend", true),
                options("inproc://broadcast-test-backend", true),
            )
            .unwrap();
        assert_eq!(proxy.state(), ProxyState::Ready);
        proxy.start().unwrap();
        assert_eq!(proxy.state(), ProxyState::Running);

        let mut publisher = umps_transport::Publisher::new();
        publisher
            .initialize(&context, options("inproc://broadcast-test-frontend", false))
            .unwrap();

        let mut subscriber = umps_transport::Subscriber::new();
        subscriber
            .initialize(&context, options("inproc://broadcast-test-backend", false))
            .unwrap();
        subscriber.subscribe(&[]).unwrap();

        // Give XSUB/XPUB subscription propagation a beat before publishing.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let message = umps_messages::modules::PingRequest;
        publisher.send(&message).await.unwrap();

        let registry = {
            let mut registry = umps_messages::registry::Registry::new();
            registry.register::<umps_messages::modules::PingRequest>();
            registry
        };
        let received = tokio::time::timeout(std::time::Duration::from_secs(2), subscriber.receive(&registry))
            .await
            .expect("no message forwarded")
            .unwrap();
        assert_eq!(received.unwrap().type_tag(), "PingRequest");

        proxy.stop().await.unwrap();
    }
}
