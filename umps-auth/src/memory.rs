//! In-memory `Authenticator` backend (spec §4.1: "Backend variants: in-memory map ...").

use std::collections::HashSet;
use std::sync::RwLock;

use umps_base::error::{Error, Result};

use crate::authenticator::{Authenticator, Decision, User, Verdict};
use crate::hash;
use crate::keypair::UsernameAndPassword;

#[derive(Default)]
struct State {
    whitelist: HashSet<String>,
    blacklist: HashSet<String>,
    users: Vec<User>,
}

/// Reentrant in-memory authenticator. Reads and writes both take the same lock; this backend
/// favors simplicity over the concurrent-read allowance the relational backend provides.
pub struct MemoryAuthenticator {
    state: RwLock<State>,
}

impl Default for MemoryAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAuthenticator {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
        }
    }

    fn user_by_name(state: &State, name: &str) -> Option<User> {
        state.users.iter().find(|u| u.name == name).cloned()
    }
}

impl Authenticator for MemoryAuthenticator {
    fn is_blacklisted(&self, address: &str) -> Decision {
        let state = self.state.read().unwrap();
        if state.blacklist.contains(address) {
            (Verdict::Deny, format!("{address} is blacklisted"))
        } else {
            (Verdict::Allow, "not blacklisted".to_string())
        }
    }

    fn is_whitelisted(&self, address: &str) -> Decision {
        let state = self.state.read().unwrap();
        if state.whitelist.contains(address) {
            (Verdict::Allow, "whitelisted".to_string())
        } else {
            (Verdict::Deny, format!("{address} is not whitelisted"))
        }
    }

    fn is_valid_credentials(&self, credentials: &UsernameAndPassword) -> Decision {
        let state = self.state.read().unwrap();
        let Some(user) = Self::user_by_name(&state, credentials.username()) else {
            return (Verdict::Deny, "no such user".to_string());
        };
        match &user.hashed_password {
            Some(stored) if hash::verify_password(credentials.password(), stored) => {
                (Verdict::Allow, "password matches".to_string())
            }
            _ => (Verdict::Deny, "password mismatch".to_string()),
        }
    }

    fn is_valid_public_key(&self, public_key: &[u8; 32]) -> Decision {
        let state = self.state.read().unwrap();
        for user in &state.users {
            if let Some(stored) = &user.hashed_public_key {
                if hash::verify_public_key(public_key, stored) {
                    return (Verdict::Allow, "public key matches".to_string());
                }
            }
        }
        (Verdict::Deny, "no matching public key".to_string())
    }

    fn add_to_whitelist(&self, address: &str) -> Result<()> {
        if address.is_empty() {
            return Err(Error::invalid_argument("address must not be empty"));
        }
        let mut state = self.state.write().unwrap();
        if state.blacklist.contains(address) {
            return Err(Error::invalid_argument(
                "address is already blacklisted",
            ));
        }
        state.whitelist.insert(address.to_string());
        Ok(())
    }

    fn remove_from_whitelist(&self, address: &str) -> Result<()> {
        self.state.write().unwrap().whitelist.remove(address);
        Ok(())
    }

    fn add_to_blacklist(&self, address: &str) -> Result<()> {
        if address.is_empty() {
            return Err(Error::invalid_argument("address must not be empty"));
        }
        let mut state = self.state.write().unwrap();
        if state.whitelist.contains(address) {
            return Err(Error::invalid_argument(
                "address is already whitelisted",
            ));
        }
        state.blacklist.insert(address.to_string());
        Ok(())
    }

    fn remove_from_blacklist(&self, address: &str) -> Result<()> {
        self.state.write().unwrap().blacklist.remove(address);
        Ok(())
    }

    fn add_user(&self, user: &User) -> Result<()> {
        if user.name.is_empty() {
            return Err(Error::invalid_argument("user name is required"));
        }
        let mut state = self.state.write().unwrap();
        if state.users.iter().any(|u| u.name == user.name) {
            return Err(Error::invalid_argument("user name already exists"));
        }
        state.users.push(user.clone());
        Ok(())
    }

    fn update_user(&self, user: &User) -> Result<()> {
        let mut state = self.state.write().unwrap();
        match state.users.iter_mut().find(|u| u.name == user.name) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(Error::not_found(format!("no such user: {}", user.name))),
        }
    }

    fn delete_user(&self, name: &str) -> Result<()> {
        let mut state = self.state.write().unwrap();
        let before = state.users.len();
        state.users.retain(|u| u.name != name);
        if state.users.len() == before {
            return Err(Error::not_found(format!("no such user: {name}")));
        }
        Ok(())
    }

    fn have_user(&self, name: &str) -> Result<bool> {
        Ok(Self::user_by_name(&self.state.read().unwrap(), name).is_some())
    }

    fn get_users(&self) -> Result<Vec<User>> {
        Ok(self.state.read().unwrap().users.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authenticator::Privilege;

    #[test]
    fn whitelist_and_blacklist_are_mutually_exclusive() {
        let auth = MemoryAuthenticator::new();
        auth.add_to_whitelist("10.0.0.1").unwrap();
        assert!(auth.add_to_blacklist("10.0.0.1").is_err());
    }

    #[test]
    fn credential_check_denies_unknown_user() {
        let auth = MemoryAuthenticator::new();
        let decision = auth.is_valid_credentials(&UsernameAndPassword::new("nobody", "x"));
        assert_eq!(decision.0, Verdict::Deny);
    }

    #[test]
    fn credential_check_allows_matching_password() {
        let auth = MemoryAuthenticator::new();
        auth.add_user(&User {
            id: 1,
            name: "alice".to_string(),
            email: "alice@example.com".to_string(),
            hashed_password: Some(hash::hash_password("secret").unwrap()),
            hashed_public_key: None,
            privilege: Privilege::ReadOnly,
        })
        .unwrap();
        let decision = auth.is_valid_credentials(&UsernameAndPassword::new("alice", "secret"));
        assert_eq!(decision.0, Verdict::Allow);
    }
}
