use async_trait::async_trait;
use profego_api::auth::{AuthError, Identity, IdentityProvider, Session};
use std::collections::HashMap;
use std::sync::Mutex;

const TOKEN_PREFIX: &str = "token-";

/// In-memory identity provider issuing `token-{email}` tokens.
#[derive(Default)]
pub struct StubIdentityProvider {
    users: Mutex<HashMap<String, String>>,
}

impl StubIdentityProvider {
    pub fn token_for(email: &str) -> String {
        format!("{}{}", TOKEN_PREFIX, email)
    }

    pub fn add_user(&self, email: &str, password: &str) {
        self.users
            .lock()
            .unwrap()
            .insert(email.to_string(), password.to_string());
    }
}

#[async_trait]
impl IdentityProvider for StubIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let users = self.users.lock().unwrap();
        match users.get(email) {
            None => Err(AuthError::UnknownIdentity),
            Some(stored) if stored != password => Err(AuthError::BadCredential),
            Some(_) => Ok(Session {
                email: email.to_string(),
                token: Self::token_for(email),
            }),
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let mut users = self.users.lock().unwrap();
        if users.contains_key(email) {
            return Err(AuthError::EmailExists);
        }
        users.insert(email.to_string(), password.to_string());
        Ok(())
    }

    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let email = token
            .strip_prefix(TOKEN_PREFIX)
            .ok_or(AuthError::InvalidToken)?;
        if !self.users.lock().unwrap().contains_key(email) {
            return Err(AuthError::InvalidToken);
        }
        Ok(Identity {
            email: email.to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}
