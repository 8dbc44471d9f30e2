//! The ZAP background service (spec §4.2, C3): a single ROUTER socket bound to the well-known
//! in-process authentication endpoint, answering every other socket's ZAP handshake by
//! delegating to an [`umps_auth::Authenticator`].
//!
//! Mutation methods (`whitelist`, `blacklist`, `configure_plain_text_passwords`,
//! `configure_curve`) never touch the authenticator from the caller's thread directly: each
//! sends a command over an mpsc channel to this service's own thread, which applies it and
//! replies with the outcome over a one-shot channel, the same control-channel shape
//! `umps_proxy` uses for its start/stop/pause commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use umps_auth::{hash, Authenticator, KeyPair, Privilege, SecurityLevel, User, UsernameAndPassword};
use umps_base::error::{Error, Result};
use umps_base::task::{Cancel, JoinGuard};
use umps_transport::{Context, Frame, RoutedMessage, Socket};

/// The endpoint every ZAP-aware socket's ZAP domain routes to, per RFC 27.
pub const ZAP_ENDPOINT: &str = "inproc://zeromq.zap.01";

const ZAP_VERSION: &str = "1.0";

enum ControlCommand {
    Whitelist(String, oneshot::Sender<Result<()>>),
    Blacklist(String, oneshot::Sender<Result<()>>),
    ConfigurePlainTextPasswords(String, Vec<(String, String)>, oneshot::Sender<Result<()>>),
    ConfigureCurve(String, PathBuf, oneshot::Sender<Result<()>>),
}

/// Owns the ZAP service's dedicated thread. Dropping it cancels the loop and detaches; call
/// [`ZapService::stop`] to wait for a clean shutdown instead.
pub struct ZapService {
    guard: JoinGuard<Result<()>>,
    control: mpsc::UnboundedSender<ControlCommand>,
}

impl ZapService {
    /// Binds the ZAP endpoint and spawns the service loop. Fails with `AddressInUse` if another
    /// ZAP service is already bound on this context (spec §4.2: "a well-known ... endpoint").
    pub fn spawn(context: &Context, authenticator: Arc<dyn Authenticator>) -> Result<Self> {
        let socket = context.socket(zmq::SocketType::ROUTER)?;
        socket.bind(ZAP_ENDPOINT)?;
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let guard = JoinGuard::spawn(move |cancel| run(socket, authenticator, control_rx, cancel));
        Ok(Self { guard, control: control_tx })
    }

    /// Cancels the service and waits for the loop to exit, surfacing its last error if any.
    pub async fn stop(&mut self) -> Result<()> {
        match self.guard.shutdown().await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout("zap service did not stop in time")),
        }
    }

    /// Adds `address` to the whitelist (spec §4.2).
    pub async fn whitelist(&self, address: impl Into<String>) -> Result<()> {
        let address = address.into();
        self.dispatch(|reply| ControlCommand::Whitelist(address, reply)).await
    }

    /// Adds `address` to the blacklist (spec §4.2).
    pub async fn blacklist(&self, address: impl Into<String>) -> Result<()> {
        let address = address.into();
        self.dispatch(|reply| ControlCommand::Blacklist(address, reply)).await
    }

    /// Registers PLAIN `(username, password)` credentials for `domain` (spec §4.2). `domain` is
    /// accepted for parity with RFC 27's per-domain ZAP handlers; this service's authenticator
    /// carries no domain partitioning, so every domain shares the same user table.
    pub async fn configure_plain_text_passwords(
        &self,
        domain: impl Into<String>,
        passwords: Vec<(String, String)>,
    ) -> Result<()> {
        let domain = domain.into();
        self.dispatch(|reply| ControlCommand::ConfigurePlainTextPasswords(domain, passwords, reply))
            .await
    }

    /// Registers every CURVE public key found under `directory` for `domain` (spec §4.2). Each
    /// file holds a Z85 public key on its first line and an optional `# <name>` comment on its
    /// second, the format [`umps_auth::KeyPair::to_files`] writes.
    pub async fn configure_curve(
        &self,
        domain: impl Into<String>,
        directory: impl Into<PathBuf>,
    ) -> Result<()> {
        let domain = domain.into();
        let directory = directory.into();
        self.dispatch(|reply| ControlCommand::ConfigureCurve(domain, directory, reply)).await
    }

    async fn dispatch(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<()>>) -> ControlCommand,
    ) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.control
            .send(build(reply_tx))
            .map_err(|_| Error::not_initialized("zap service thread already exited"))?;
        reply_rx
            .await
            .map_err(|_| Error::not_initialized("zap service thread dropped the reply"))?
    }
}

async fn run(
    mut socket: Socket,
    authenticator: Arc<dyn Authenticator>,
    mut control_rx: mpsc::UnboundedReceiver<ControlCommand>,
    cancel: Cancel,
) -> Result<()> {
    loop {
        tokio::select! {
            () = cancel.wait() => return Ok(()),
            command = control_rx.recv() => {
                if let Some(command) = command {
                    apply_control(command, &authenticator);
                }
            }
            frames = socket.recv_multipart() => {
                match handle_request(frames?, &authenticator) {
                    Ok(reply) => {
                        if let Err(error) = socket.send_multipart(reply).await {
                            tracing::warn!(%error, "zap: failed to send reply");
                        }
                    }
                    Err(error) => tracing::warn!(%error, "zap: malformed request"),
                }
            }
        }
    }
}

fn apply_control(command: ControlCommand, authenticator: &Arc<dyn Authenticator>) {
    match command {
        ControlCommand::Whitelist(address, reply) => {
            let _ = reply.send(authenticator.add_to_whitelist(&address));
        }
        ControlCommand::Blacklist(address, reply) => {
            let _ = reply.send(authenticator.add_to_blacklist(&address));
        }
        ControlCommand::ConfigurePlainTextPasswords(_domain, passwords, reply) => {
            let _ = reply.send(configure_plain_text_passwords(authenticator, passwords));
        }
        ControlCommand::ConfigureCurve(_domain, directory, reply) => {
            let _ = reply.send(configure_curve(authenticator, &directory));
        }
    }
}

fn upsert_user(authenticator: &Arc<dyn Authenticator>, user: User) -> Result<()> {
    if authenticator.have_user(&user.name)? {
        authenticator.update_user(&user)
    } else {
        authenticator.add_user(&user)
    }
}

fn configure_plain_text_passwords(
    authenticator: &Arc<dyn Authenticator>,
    passwords: Vec<(String, String)>,
) -> Result<()> {
    for (username, password) in passwords {
        let hashed_password = UsernameAndPassword::new(username.clone(), password).hash_password()?;
        upsert_user(
            authenticator,
            User {
                id: 0,
                name: username,
                email: String::new(),
                hashed_password: Some(hashed_password),
                hashed_public_key: None,
                privilege: Privilege::ReadOnly,
            },
        )?;
    }
    Ok(())
}

fn configure_curve(authenticator: &Arc<dyn Authenticator>, directory: &Path) -> Result<()> {
    let entries = std::fs::read_dir(directory).map_err(|error| Error::io_failure(error.to_string()))?;
    for entry in entries {
        let entry = entry.map_err(|error| Error::io_failure(error.to_string()))?;
        let contents = std::fs::read_to_string(entry.path())
            .map_err(|error| Error::io_failure(error.to_string()))?;
        let mut lines = contents.lines();
        let Some(public_key_text) = lines.next() else { continue };
        let file_name = entry.file_name();
        let default_name = file_name.to_string_lossy();
        let name = lines
            .next()
            .and_then(|line| line.strip_prefix("# "))
            .unwrap_or(&default_name)
            .to_string();
        let key_pair = KeyPair::from_text(public_key_text, None, name.clone())?;
        upsert_user(
            authenticator,
            User {
                id: 0,
                name,
                email: String::new(),
                hashed_password: None,
                hashed_public_key: Some(hash::encode_public_key(key_pair.public_key())),
                privilege: Privilege::ReadOnly,
            },
        )?;
    }
    Ok(())
}

/// Maps the wire `mechanism` straight to a security level: grasslands sockets never set a ZAP
/// domain, so the handler never sees a grasslands request in the first place.
fn level_for_mechanism(mechanism: &str) -> Result<SecurityLevel> {
    match mechanism {
        "NULL" => Ok(SecurityLevel::Strawhouse),
        "PLAIN" => Ok(SecurityLevel::Woodhouse),
        "CURVE" => Ok(SecurityLevel::Stonehouse),
        other => Err(Error::invalid_argument(format!("unknown mechanism {other}"))),
    }
}

fn handle_request(frames: Vec<Frame>, authenticator: &Arc<dyn Authenticator>) -> Result<Vec<Frame>> {
    let routed = RoutedMessage::try_from(frames)
        .map_err(|_| Error::invalid_argument("zap request missing routing envelope"))?;
    let (routing_id, data) = routed.into_parts();

    let (request_id, status_code, status_text, user_id) = match decode_and_authenticate(&data, authenticator) {
        Ok(outcome) => outcome,
        Err(error) => {
            let request_id = data.get(1).map(|f| f.to_vec()).unwrap_or_default();
            (
                request_id,
                "500".to_string(),
                error.to_string(),
                String::new(),
            )
        }
    };

    let reply_data = vec![
        Frame::from(ZAP_VERSION.as_bytes()),
        Frame::from(request_id.as_slice()),
        Frame::from(status_code.as_bytes()),
        Frame::from(status_text.as_bytes()),
        Frame::from(user_id.as_bytes()),
        Frame::from(&b""[..]),
    ];
    Ok(Vec::from(RoutedMessage::new(routing_id, reply_data)))
}

fn decode_and_authenticate(
    data: &[Frame],
    authenticator: &Arc<dyn Authenticator>,
) -> Result<(Vec<u8>, String, String, String)> {
    if data.len() < 6 {
        return Err(Error::invalid_argument("expected at least 6 ZAP request frames"));
    }
    let request_id = data[1].to_vec();
    let address = frame_str(&data[3])?;
    let mechanism = frame_str(&data[5])?;
    let rest = &data[6..];

    let level = level_for_mechanism(mechanism)?;
    let (credentials, public_key) = mechanism_fields(mechanism, rest)?;

    let (verdict, reason) =
        authenticator.authenticate(address, level, credentials.as_ref(), public_key.as_ref());
    let (status_code, user_id) = if verdict.is_allow() {
        ("200", address)
    } else {
        ("400", "")
    };
    Ok((request_id, status_code.to_string(), reason, user_id.to_string()))
}

fn mechanism_fields(
    mechanism: &str,
    rest: &[Frame],
) -> Result<(Option<UsernameAndPassword>, Option<[u8; 32]>)> {
    match mechanism {
        "NULL" => Ok((None, None)),
        "PLAIN" => {
            let [username, password] = rest else {
                return Err(Error::invalid_argument("PLAIN mechanism needs 2 frames"));
            };
            Ok((
                Some(UsernameAndPassword::new(
                    frame_str(username)?,
                    frame_str(password)?,
                )),
                None,
            ))
        }
        "CURVE" => {
            let [public_key] = rest else {
                return Err(Error::invalid_argument("CURVE mechanism needs 1 frame"));
            };
            let key: [u8; 32] = public_key[..]
                .try_into()
                .map_err(|_| Error::invalid_argument("CURVE public key must be 32 bytes"))?;
            Ok((None, Some(key)))
        }
        other => Err(Error::invalid_argument(format!("unknown mechanism {other}"))),
    }
}

fn frame_str(frame: &Frame) -> Result<&str> {
    std::str::from_utf8(frame).map_err(|_| Error::invalid_argument("frame is not valid UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use umps_auth::{MemoryAuthenticator, Verdict};

    fn zap_request(request_id: &[u8], address: &str, mechanism: &str, extra: &[&[u8]]) -> Vec<Frame> {
        let mut frames = vec![
            Frame::from(&b""[..]), // routing id placeholder for in-test REQ-style peer
            Frame::new(),          // delimiter
            Frame::from(ZAP_VERSION.as_bytes()),
            Frame::from(request_id),
            Frame::from(b"global".as_slice()),
            Frame::from(address.as_bytes()),
            Frame::from(b"identity".as_slice()),
            Frame::from(mechanism.as_bytes()),
        ];
        frames.extend(extra.iter().map(|f| Frame::from(*f)));
        frames
    }

    #[test]
    fn null_mechanism_allows_unlisted_address() {
        let authenticator: Arc<dyn Authenticator> = Arc::new(MemoryAuthenticator::new());
        let frames = zap_request(b"1", "10.0.0.1", "NULL", &[]);
        let reply = handle_request(frames, &authenticator).unwrap();
        assert_eq!(&reply[3][..], b"200");
    }

    #[test]
    fn null_mechanism_denies_blacklisted_address() {
        let authenticator: Arc<dyn Authenticator> = Arc::new(MemoryAuthenticator::new());
        authenticator.add_to_blacklist("10.0.0.5").unwrap();
        let frames = zap_request(b"2", "10.0.0.5", "NULL", &[]);
        let reply = handle_request(frames, &authenticator).unwrap();
        assert_eq!(&reply[3][..], b"400");
    }

    #[tokio::test]
    async fn service_round_trips_a_request() {
        let context = Context::new(1).unwrap();
        let authenticator: Arc<dyn Authenticator> = Arc::new(MemoryAuthenticator::new());
        let mut service = ZapService::spawn(&context, authenticator).unwrap();

        let mut client = context.socket(zmq::SocketType::REQ).unwrap();
        client.connect(ZAP_ENDPOINT).unwrap();

        let frames = vec![
            Frame::from(ZAP_VERSION.as_bytes()),
            Frame::from(b"7".as_slice()),
            Frame::from(b"global".as_slice()),
            Frame::from(b"10.0.0.9".as_slice()),
            Frame::from(b"id".as_slice()),
            Frame::from(b"NULL".as_slice()),
        ];
        client.send_multipart(frames).await.unwrap();
        let reply = client.recv_multipart().await.unwrap();
        assert_eq!(&reply[1][..], b"7");
        assert_eq!(&reply[2][..], b"200");

        service.stop().await.unwrap();
    }

    #[tokio::test]
    async fn whitelist_control_message_takes_effect_before_the_next_handshake() {
        let context = Context::new(1).unwrap();
        let authenticator = Arc::new(MemoryAuthenticator::new());
        let mut service = ZapService::spawn(&context, authenticator.clone()).unwrap();

        service.whitelist("10.0.0.9").await.unwrap();
        assert_eq!(authenticator.is_whitelisted("10.0.0.9").0, Verdict::Allow);

        service.blacklist("10.0.0.5").await.unwrap();
        assert_eq!(authenticator.is_blacklisted("10.0.0.5").0, Verdict::Deny);

        service.stop().await.unwrap();
    }

    #[tokio::test]
    async fn configure_plain_text_passwords_registers_users() {
        let context = Context::new(1).unwrap();
        let authenticator = Arc::new(MemoryAuthenticator::new());
        let mut service = ZapService::spawn(&context, authenticator.clone()).unwrap();

        service
            .configure_plain_text_passwords("global", vec![("alice".to_string(), "secret".to_string())])
            .await
            .unwrap();
        let decision = authenticator.is_valid_credentials(&UsernameAndPassword::new("alice", "secret"));
        assert_eq!(decision.0, Verdict::Allow);

        service.stop().await.unwrap();
    }

    #[tokio::test]
    async fn configure_curve_registers_keys_from_a_directory() {
        let context = Context::new(1).unwrap();
        let authenticator = Arc::new(MemoryAuthenticator::new());
        let mut service = ZapService::spawn(&context, authenticator.clone()).unwrap();

        let keys = KeyPair::create("bob").unwrap();
        let public_only = KeyPair::from_public_key(*keys.public_key(), "bob").unwrap();
        let directory = tempfile::tempdir().unwrap();
        public_only
            .to_files(directory.path().join("bob.pub"), directory.path().join("bob.priv"))
            .unwrap();

        service.configure_curve("global", directory.path()).await.unwrap();
        let decision = authenticator.is_valid_public_key(keys.public_key());
        assert_eq!(decision.0, Verdict::Allow);

        service.stop().await.unwrap();
    }
}
