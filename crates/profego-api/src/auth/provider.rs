use async_trait::async_trait;

/// Typed authentication failures, classified at the adapter boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("User not found")]
    UnknownIdentity,

    #[error("Invalid credentials")]
    BadCredential,

    #[error("Too many attempts")]
    RateLimited,

    #[error("Email already registered")]
    EmailExists,

    #[error("Invalid email")]
    InvalidEmail,

    #[error("Weak password: {0}")]
    WeakPassword(String),

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),
}

/// A signed-in user and the bearer token the provider issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub email: String,
    pub token: String,
}

/// Identity resolved from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<(), AuthError>;

    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;

    fn name(&self) -> &'static str;
}
