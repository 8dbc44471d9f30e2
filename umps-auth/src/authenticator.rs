//! The `Authenticator` trait (spec §4.1, C2) and its verdict types.

use umps_base::error::Result;

use crate::keypair::UsernameAndPassword;
use crate::security::SecurityLevel;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Verdict {
    Allow,
    Deny,
}

impl Verdict {
    pub fn is_allow(self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// `(verdict, reason)`, as named by spec §4.1's `is_*` operations.
pub type Decision = (Verdict, String);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Privilege {
    ReadOnly,
    ReadWrite,
    Admin,
}

impl Default for Privilege {
    fn default() -> Self {
        Self::ReadOnly
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub hashed_password: Option<String>,
    pub hashed_public_key: Option<String>,
    pub privilege: Privilege,
}

/// Given a connection attempt, decides whether to grant it (spec §4.1).
///
/// All `is_*` predicates are infallible in signature: a lookup failure is folded into `Deny`
/// with a diagnostic reason, never surfaced as an `Err`. Mutators return `Err` on invalid
/// arguments or store I/O failures.
pub trait Authenticator: Send + Sync {
    fn is_blacklisted(&self, address: &str) -> Decision;
    fn is_whitelisted(&self, address: &str) -> Decision;
    fn is_valid_credentials(&self, credentials: &UsernameAndPassword) -> Decision;
    fn is_valid_public_key(&self, public_key: &[u8; 32]) -> Decision;

    fn add_to_whitelist(&self, address: &str) -> Result<()>;
    fn remove_from_whitelist(&self, address: &str) -> Result<()>;
    fn add_to_blacklist(&self, address: &str) -> Result<()>;
    fn remove_from_blacklist(&self, address: &str) -> Result<()>;

    fn add_user(&self, user: &User) -> Result<()>;
    fn update_user(&self, user: &User) -> Result<()>;
    fn delete_user(&self, name: &str) -> Result<()>;
    fn have_user(&self, name: &str) -> Result<bool>;
    fn get_users(&self) -> Result<Vec<User>>;

    /// Applies the policy matrix (spec §4.1) for a full connection attempt: IP check first
    /// (when the level requires it), then the mechanism-specific check.
    fn authenticate(
        &self,
        address: &str,
        level: SecurityLevel,
        credentials: Option<&UsernameAndPassword>,
        public_key: Option<&[u8; 32]>,
    ) -> Decision {
        let (verdict, reason) = self.is_blacklisted(address);
        if !verdict.is_allow() {
            return (Verdict::Deny, reason);
        }

        if level.checks_ip() {
            let (verdict, reason) = self.is_whitelisted(address);
            if !verdict.is_allow() {
                return (Verdict::Deny, reason);
            }
        }

        if level.checks_credentials() {
            let Some(credentials) = credentials else {
                return (Verdict::Deny, "missing credentials".to_string());
            };
            let decision = self.is_valid_credentials(credentials);
            if !decision.0.is_allow() {
                return decision;
            }
        }

        if level.checks_key() {
            let Some(public_key) = public_key else {
                return (Verdict::Deny, "missing public key".to_string());
            };
            let decision = self.is_valid_public_key(public_key);
            if !decision.0.is_allow() {
                return decision;
            }
        }

        (Verdict::Allow, "granted".to_string())
    }
}
