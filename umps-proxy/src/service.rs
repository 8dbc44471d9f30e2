//! The ROUTER/DEALER service proxy (spec §4.5): a scalable request/reply device. Frontend
//! (ROUTER) faces clients, backend (DEALER) load-balances among workers; frames are forwarded
//! untouched in both directions, preserving per-client routing identities.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use umps_base::error::{Error, Result};
use umps_base::task::{Cancel, JoinGuard};
use umps_transport::{Context, Dealer, Router, SocketDetails, SocketOptions};

use crate::state::{ProxyState, ServiceControl};

pub struct ServiceProxy {
    state: Arc<Mutex<ProxyState>>,
    control: Option<mpsc::UnboundedSender<ServiceControl>>,
    guard: Option<JoinGuard<Result<()>>>,
    details: Option<SocketDetails>,
}

impl ServiceProxy {
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

    pub fn initialize(
        &mut self,
        context: &Context,
        frontend_options: SocketOptions,
        backend_options: SocketOptions,
    ) -> Result<()> {
        if self.is_initialized() {
            return Err(Error::already_initialized("service proxy"));
        }

        let mut frontend = Router::new();
        frontend.initialize(context, frontend_options)?;
        let mut backend = Dealer::new();
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

    /// Begins forwarding. Valid only from `Ready`: this proxy has no `Paused` state to resume
    /// from (spec §9).
    pub fn start(&mut self) -> Result<()> {
        self.send_control(ServiceControl::Start, &[ProxyState::Ready])
    }

    pub async fn stop(&mut self) -> Result<()> {
        if self.state() == ProxyState::Stopped {
            return Ok(());
        }
        if let Some(control) = &self.control {
            let _ = control.send(ServiceControl::Stop);
        }
        if let Some(mut guard) = self.guard.take() {
            let result = guard.shutdown().await;
            *self.state.lock().expect("proxy state mutex poisoned") = ProxyState::Stopped;
            return result.unwrap_or(Ok(()));
        }
        *self.state.lock().expect("proxy state mutex poisoned") = ProxyState::Stopped;
        Ok(())
    }

    fn send_control(&self, command: ServiceControl, allowed: &[ProxyState]) -> Result<()> {
        if !allowed.contains(&self.state()) {
            return Err(Error::not_initialized("service proxy not ready for this transition"));
        }
        let control = self
            .control
            .as_ref()
            .ok_or_else(|| Error::not_initialized("service proxy"))?;
        control
            .send(command)
            .map_err(|_| Error::not_initialized("service proxy thread already exited"))
    }
}

impl Default for ServiceProxy {
    fn default() -> Self {
        Self::new()
    }
}

async fn run(
    mut frontend: Router,
    mut backend: Dealer,
    mut control_rx: mpsc::UnboundedReceiver<ServiceControl>,
    state: Arc<Mutex<ProxyState>>,
    cancel: Cancel,
) -> Result<()> {
    let mut running = false;
    loop {
        tokio::select! {
            () = cancel.wait() => break,
            command = control_rx.recv() => {
                match command {
                    Some(ServiceControl::Start) => {
                        running = true;
                        *state.lock().expect("proxy state mutex poisoned") = ProxyState::Running;
                    }
                    Some(ServiceControl::Stop) | None => break,
                }
            }
            frames = frontend.recv_raw(), if running => {
                match frames {
                    Ok(frames) => {
                        if let Err(error) = backend.send_raw(frames).await {
                            tracing::warn!(%error, "service proxy: frontend -> backend");
                        }
                    }
                    Err(error @ Error::AddressInUse { .. }) => {
                        tracing::error!(%error, "service proxy: frontend socket lost");
                        break;
                    }
                    Err(error) => tracing::warn!(%error, "service proxy: frontend recv"),
                }
            }
            frames = backend.recv_raw(), if running => {
                match frames {
                    Ok(frames) => {
                        if let Err(error) = frontend.send_raw(frames).await {
                            tracing::warn!(%error, "service proxy: backend -> frontend");
                        }
                    }
                    Err(error @ Error::AddressInUse { .. }) => {
                        tracing::error!(%error, "service proxy: backend socket lost");
                        break;
                    }
                    Err(error) => tracing::warn!(%error, "service proxy: backend recv"),
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
    use umps_transport::ConnectOrBind;

    fn options(address: &str, bind: bool) -> SocketOptions {
        SocketOptions {
            address: address.to_string(),
            connect_or_bind: if bind { ConnectOrBind::Bind } else { ConnectOrBind::Connect },
            ..SocketOptions::default()
        }
    }

    #[tokio::test]
    async fn forwards_request_and_reply_through_worker() {
        let context = Context::new(1).unwrap();
        let mut proxy = ServiceProxy::new();
        proxy
            .initialize(
                &context,
                options("inproc://service-test-frontend", true),
                options("inproc://service-test-backend", true),
            )
            .unwrap();
        proxy.start().unwrap();

        let mut worker = Dealer::new();
        worker
            .initialize(&context, options("inproc://service-test-backend", false))
            .unwrap();

        let mut client = umps_transport::Request::new();
        client
            .initialize(&context, options("inproc://service-test-frontend", false))
            .unwrap();

        let registry = {
            let mut registry = umps_messages::registry::Registry::new();
            registry.register::<umps_messages::modules::PingRequest>();
            registry.register::<umps_messages::modules::PingResponse>();
            registry
        };

        let request_task = tokio::spawn(async move {
            client
                .request(&umps_messages::modules::PingRequest, &registry)
                .await
        });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let frames = worker.recv_raw().await.unwrap();
        worker.send_raw(frames).await.unwrap();

        let reply = tokio::time::timeout(std::time::Duration::from_secs(2), request_task)
            .await
            .expect("worker never echoed a reply")
            .unwrap()
            .unwrap();
        assert_eq!(reply.type_tag(), "PingRequest");

        proxy.stop().await.unwrap();
    }
}
