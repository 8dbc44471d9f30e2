//! The remote command plane's wire service (spec §4.7): a single ROUTER socket that receives
//! module registrations and `AvailableModulesRequest`s, and originates ping/terminate traffic
//! on a timer.

use std::sync::Arc;
use std::time::{Duration, Instant};

use umps_base::error::Result;
use umps_base::task::JoinGuard;
use umps_messages::modules::{
    AvailableModulesRequest, AvailableModulesResponse, PingRequest, RegistrationAction,
    RegistrationRequest, RegistrationResponse, RegistrationStatus, TerminateRequest,
};
use umps_messages::registry::Registry;
use umps_messages::{Message, MessageType};
use umps_transport::{Context, Frame, Router, SocketOptions};

use crate::remote::{PingAction, RemoteRegistry, RoutingId};

const TICK_INTERVAL: Duration = Duration::from_millis(100);

fn wire_registry() -> Registry {
    let mut registry = Registry::new();
    registry.register::<RegistrationRequest>();
    registry.register::<AvailableModulesRequest>();
    registry.register::<umps_messages::modules::PingResponse>();
    registry.register::<umps_messages::modules::TerminateResponse>();
    registry.register::<umps_messages::modules::CommandResponse>();
    registry
}

fn to_routing_id(frames: &[Frame]) -> RoutingId {
    frames.iter().map(|frame| frame.to_vec()).collect()
}

fn to_frames(routing_id: &RoutingId) -> Vec<Frame> {
    routing_id.iter().map(|bytes| Frame::from(bytes.as_slice())).collect()
}

pub struct ModuleProxy {
    guard: JoinGuard<Result<()>>,
    registry: Arc<RemoteRegistry>,
}

impl ModuleProxy {
    pub fn spawn(context: &Context, options: SocketOptions, registry: Arc<RemoteRegistry>) -> Result<Self> {
        let mut router = Router::new();
        router.initialize(context, options)?;

        let task_registry = registry.clone();
        let guard = JoinGuard::spawn(move |cancel| async move {
            let wire_registry = wire_registry();
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            loop {
                tokio::select! {
                    () = cancel.wait() => break,
                    _ = interval.tick() => {
                        for (routing_id, action) in task_registry.tick(Instant::now()) {
                            match action {
                                PingAction::Ping | PingAction::ResendPing => {
                                    let _ = router.send(to_frames(&routing_id), &PingRequest).await;
                                }
                                PingAction::Terminate => {
                                    let _ = router.send(to_frames(&routing_id), &TerminateRequest).await;
                                }
                                PingAction::Evict => {
                                    tracing::info!("module proxy: evicted an unresponsive module");
                                }
                            }
                        }
                    }
                    received = router.receive(&wire_registry) => {
                        match received {
                            Ok(Some((frames, message))) => {
                                handle(&mut router, &task_registry, frames, message).await;
                            }
                            Ok(None) => {}
                            Err(error) => tracing::warn!(%error, "module proxy: receive"),
                        }
                    }
                }
            }
            Ok(())
        });

        Ok(Self { guard, registry })
    }

    pub fn registry(&self) -> &Arc<RemoteRegistry> {
        &self.registry
    }

    pub async fn stop(&mut self) -> Result<()> {
        match self.guard.shutdown().await {
            Ok(result) => result,
            Err(_) => Ok(()),
        }
    }
}

async fn handle(router: &mut Router, registry: &Arc<RemoteRegistry>, frames: Vec<Frame>, message: Box<dyn Message>) {
    let routing_id = to_routing_id(&frames);
    match message.type_tag() {
        "RegistrationRequest" => {
            let Ok(request) = RegistrationRequest::deserialize(&message.serialize().unwrap_or_default()) else {
                return;
            };
            let status = match request.action {
                RegistrationAction::Register => {
                    registry.register(request.module_details, routing_id);
                    RegistrationStatus::Accepted
                }
                RegistrationAction::Deregister => {
                    registry.deregister(&request.module_details.name, request.module_details.instance);
                    RegistrationStatus::Accepted
                }
            };
            let _ = router.send(frames, &RegistrationResponse { status }).await;
        }
        "AvailableModulesRequest" => {
            let response = AvailableModulesResponse { modules: registry.available() };
            let _ = router.send(frames, &response).await;
        }
        "PingResponse" | "TerminateResponse" | "CommandResponse" => {
            registry.note_reply(&routing_id);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umps_messages::details::ModuleDetails;
    use umps_messages::modules::PingResponse;
    use umps_transport::{ConnectOrBind, Dealer};

    use crate::remote::PingSchedule;

    fn options(address: &str, bind: bool) -> SocketOptions {
        SocketOptions {
            address: address.to_string(),
            connect_or_bind: if bind { ConnectOrBind::Bind } else { ConnectOrBind::Connect },
            ..SocketOptions::default()
        }
    }

    #[tokio::test]
    async fn registration_then_available_modules_round_trips() {
        let context = Context::new(1).unwrap();
        let registry = RemoteRegistry::new_arc(PingSchedule::new(vec![Duration::from_secs(60)]).unwrap());
        let mut proxy = ModuleProxy::spawn(&context, options("inproc://module-proxy-test", true), registry).unwrap();

        let mut module = Dealer::new();
        module
            .initialize(&context, options("inproc://module-proxy-test", false))
            .unwrap();

        let details = ModuleDetails {
            name: "picker".to_string(),
            instance: 1,
            ..ModuleDetails::default()
        };
        module
            .send(&RegistrationRequest { module_details: details, action: RegistrationAction::Register })
            .await
            .unwrap();

        let mut registry_wire = Registry::new();
        registry_wire.register::<RegistrationResponse>();
        let reply = tokio::time::timeout(Duration::from_secs(2), module.receive(&registry_wire))
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(reply.type_tag(), "RegistrationResponse");

        let mut requestor = Dealer::new();
        requestor
            .initialize(&context, options("inproc://module-proxy-test", false))
            .unwrap();
        requestor.send(&AvailableModulesRequest).await.unwrap();

        let mut response_registry = Registry::new();
        response_registry.register::<AvailableModulesResponse>();
        let reply = tokio::time::timeout(Duration::from_secs(2), requestor.receive(&response_registry))
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let response = AvailableModulesResponse::deserialize(&reply.serialize().unwrap()).unwrap();
        assert_eq!(response.modules.len(), 1);
        assert_eq!(response.modules[0].name, "picker");

        proxy.stop().await.unwrap();
    }

    #[tokio::test]
    async fn ping_is_sent_to_registered_module() {
        let context = Context::new(1).unwrap();
        let registry = RemoteRegistry::new_arc(PingSchedule::new(vec![Duration::from_millis(20)]).unwrap());
        let mut proxy = ModuleProxy::spawn(&context, options("inproc://module-ping-test", true), registry).unwrap();

        let mut module = Dealer::new();
        module
            .initialize(&context, options("inproc://module-ping-test", false))
            .unwrap();
        module
            .send(&RegistrationRequest {
                module_details: ModuleDetails { name: "picker".to_string(), instance: 0, ..ModuleDetails::default() },
                action: RegistrationAction::Register,
            })
            .await
            .unwrap();

        let mut registration_registry = Registry::new();
        registration_registry.register::<RegistrationResponse>();
        tokio::time::timeout(Duration::from_secs(2), module.receive(&registration_registry))
            .await
            .unwrap()
            .unwrap();

        let mut ping_registry = Registry::new();
        ping_registry.register::<PingRequest>();
        let ping = tokio::time::timeout(Duration::from_secs(2), module.receive(&ping_registry))
            .await
            .expect("no ping received")
            .unwrap()
            .unwrap();
        assert_eq!(ping.type_tag(), "PingRequest");

        module.send(&PingResponse).await.unwrap();
        proxy.stop().await.unwrap();
    }
}
