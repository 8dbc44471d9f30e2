//! Applies a `ZapOptions` record to a socket's CURVE/PLAIN/ZAP sockopts (spec §4.4
//! `zap_options`, §6 "Authentication protocol").

use umps_auth::{Role, SecurityLevel, ZapOptions};

use umps_base::error::Result;

use crate::socket::Socket;

pub fn apply(socket: &Socket, zap: &ZapOptions) -> Result<()> {
    // Grasslands never invokes the ZAP handler at all (no domain set); every other level relies
    // on the ZAP domain to turn the handshake on, even strawhouse's plain NULL mechanism.
    if zap.security_level() != SecurityLevel::Grasslands {
        socket.set_zap_domain(zap.domain())?;
    }
    match zap.security_level() {
        SecurityLevel::Grasslands | SecurityLevel::Strawhouse => {}
        SecurityLevel::Woodhouse => {
            if let Some(credentials) = zap.username_and_password() {
                socket.set_plain_username(credentials.username())?;
                socket.set_plain_password(credentials.password())?;
            }
            if zap.role() == Role::Server {
                socket.set_plain_server(true)?;
            }
        }
        SecurityLevel::Stonehouse => match zap.role() {
            Role::Server => {
                socket.set_curve_server(true)?;
                if let Some(key_pair) = zap.client_key_pair() {
                    socket.set_curve_secretkey(key_pair.private_key().expect("server key pair"))?;
                }
            }
            Role::Client => {
                if let Some(key_pair) = zap.client_key_pair() {
                    socket.set_curve_publickey(key_pair.public_key())?;
                    socket
                        .set_curve_secretkey(key_pair.private_key().expect("client key pair"))?;
                }
                if let Some(server_public_key) = zap.server_public_key() {
                    socket.set_curve_serverkey(server_public_key)?;
                }
            }
        },
    }
    Ok(())
}
