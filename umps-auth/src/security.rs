//! Security levels and the ZAP options record (spec §3 "ZAPOptions", §4.1 policy matrix).

use umps_base::error::{Error, Result};

use crate::keypair::KeyPair;

/// The four ZeroMQ RFC 27-style security tiers, from no checks to mutual Curve auth.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SecurityLevel {
    Grasslands,
    Strawhouse,
    Woodhouse,
    Stonehouse,
}

impl SecurityLevel {
    pub fn checks_ip(self) -> bool {
        !matches!(self, Self::Grasslands)
    }

    pub fn checks_credentials(self) -> bool {
        matches!(self, Self::Woodhouse)
    }

    pub fn checks_key(self) -> bool {
        matches!(self, Self::Stonehouse)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Role {
    Client,
    Server,
}

/// The socket-side security configuration (spec §3 "ZAPOptions").
///
/// Invariants: a stonehouse client carries both `server_public_key` and a complete
/// `client_key_pair`; a stonehouse server carries a complete `key_pair`.
#[derive(Clone, Debug)]
pub struct ZapOptions {
    security_level: SecurityLevel,
    role: Role,
    domain: String,
    server_public_key: Option<[u8; 32]>,
    client_key_pair: Option<KeyPair>,
    username_and_password: Option<crate::keypair::UsernameAndPassword>,
}

const DEFAULT_DOMAIN: &str = "global";

impl ZapOptions {
    pub fn grasslands(role: Role) -> Self {
        Self {
            security_level: SecurityLevel::Grasslands,
            role,
            domain: DEFAULT_DOMAIN.to_string(),
            server_public_key: None,
            client_key_pair: None,
            username_and_password: None,
        }
    }

    pub fn strawhouse(role: Role) -> Self {
        Self {
            security_level: SecurityLevel::Strawhouse,
            ..Self::grasslands(role)
        }
    }

    pub fn woodhouse(
        role: Role,
        username_and_password: crate::keypair::UsernameAndPassword,
    ) -> Self {
        Self {
            security_level: SecurityLevel::Woodhouse,
            username_and_password: Some(username_and_password),
            ..Self::grasslands(role)
        }
    }

    pub fn stonehouse_server(key_pair: KeyPair) -> Result<Self> {
        if !key_pair.has_private_key() {
            return Err(Error::invalid_argument(
                "stonehouse server requires a complete key pair",
            ));
        }
        Ok(Self {
            security_level: SecurityLevel::Stonehouse,
            role: Role::Server,
            domain: DEFAULT_DOMAIN.to_string(),
            server_public_key: None,
            client_key_pair: Some(key_pair),
            username_and_password: None,
        })
    }

    pub fn stonehouse_client(server_public_key: [u8; 32], client_key_pair: KeyPair) -> Result<Self> {
        if !client_key_pair.has_private_key() {
            return Err(Error::invalid_argument(
                "stonehouse client requires a complete key pair",
            ));
        }
        Ok(Self {
            security_level: SecurityLevel::Stonehouse,
            role: Role::Client,
            domain: DEFAULT_DOMAIN.to_string(),
            server_public_key: Some(server_public_key),
            client_key_pair: Some(client_key_pair),
            username_and_password: None,
        })
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Validates the invariants spec §3 states for `ZAPOptions`.
    pub fn validate(&self) -> Result<()> {
        if self.security_level == SecurityLevel::Stonehouse {
            match self.role {
                Role::Server => {
                    if self
                        .client_key_pair
                        .as_ref()
                        .is_none_or(|k| !k.has_private_key())
                    {
                        return Err(Error::invalid_argument(
                            "stonehouse server missing a complete key pair",
                        ));
                    }
                }
                Role::Client => {
                    if self.server_public_key.is_none() {
                        return Err(Error::invalid_argument(
                            "stonehouse client missing the server public key",
                        ));
                    }
                    if self
                        .client_key_pair
                        .as_ref()
                        .is_none_or(|k| !k.has_private_key())
                    {
                        return Err(Error::invalid_argument(
                            "stonehouse client missing a complete key pair",
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn security_level(&self) -> SecurityLevel {
        self.security_level
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn server_public_key(&self) -> Option<&[u8; 32]> {
        self.server_public_key.as_ref()
    }

    pub fn client_key_pair(&self) -> Option<&KeyPair> {
        self.client_key_pair.as_ref()
    }

    pub fn username_and_password(&self) -> Option<&crate::keypair::UsernameAndPassword> {
        self.username_and_password.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stonehouse_server_requires_private_key() {
        let public_only = KeyPair::from_public_key([1u8; 32], "server").unwrap();
        assert!(ZapOptions::stonehouse_server(public_only).is_err());

        let full = KeyPair::create("server").unwrap();
        assert!(ZapOptions::stonehouse_server(full).is_ok());
    }

    #[test]
    fn grasslands_validates() {
        assert!(ZapOptions::grasslands(Role::Server).validate().is_ok());
    }
}
