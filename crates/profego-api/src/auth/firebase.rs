//! Firebase Identity Toolkit adapter.
//!
//! Uses the REST endpoints `accounts:signInWithPassword`, `accounts:signUp` and
//! `accounts:lookup`. Failures come back as `{"error": {"message": "CODE : text"}}`;
//! the leading code token picks the [`AuthError`] variant.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::provider::{AuthError, Identity, IdentityProvider, Session};

const REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
struct LookupUser {
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Which call produced a provider error; unknown codes fall back differently per call.
#[derive(Debug, Clone, Copy)]
enum Operation {
    SignIn,
    SignUp,
    Lookup,
}

pub struct FirebaseIdentityProvider {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl Debug for FirebaseIdentityProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FirebaseIdentityProvider")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl FirebaseIdentityProvider {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> anyhow::Result<Self> {
        use anyhow::Context;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client for identity provider")?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn call<B: Serialize>(
        &self,
        method: &str,
        body: &B,
        operation: Operation,
    ) -> Result<reqwest::Response, AuthError> {
        let response = self
            .http_client
            .post(format!("{}/accounts:{}", self.base_url, method))
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let message = response
            .json::<ErrorEnvelope>()
            .await
            .map(|envelope| envelope.error.message)
            .unwrap_or_default();

        tracing::debug!(
            status = status.as_u16(),
            provider_message = %message,
            operation = ?operation,
            "Identity provider rejected request"
        );

        Err(classify(status, &message, operation))
    }
}

/// Map a provider failure onto the typed error.
fn classify(status: StatusCode, message: &str, operation: Operation) -> AuthError {
    if status.is_server_error() {
        return AuthError::Unavailable(format!("identity provider returned {}", status));
    }

    let (code, detail) = match message.split_once(':') {
        Some((code, detail)) => (code.trim(), detail.trim()),
        None => (message.trim(), ""),
    };

    match code {
        "EMAIL_NOT_FOUND" => AuthError::UnknownIdentity,
        "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => AuthError::BadCredential,
        "EMAIL_EXISTS" => AuthError::EmailExists,
        "INVALID_EMAIL" => AuthError::InvalidEmail,
        "WEAK_PASSWORD" => AuthError::WeakPassword(if detail.is_empty() {
            "Password is too weak".to_string()
        } else {
            detail.to_string()
        }),
        code if code.starts_with("TOO_MANY_ATTEMPTS") => AuthError::RateLimited,
        _ => match operation {
            Operation::SignIn => AuthError::BadCredential,
            Operation::SignUp => AuthError::Unavailable(format!("sign up rejected: {}", code)),
            Operation::Lookup => AuthError::InvalidToken,
        },
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let request = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let response = self
            .call("signInWithPassword", &request, Operation::SignIn)
            .await?;
        let body: SignInResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Unavailable(format!("invalid sign-in response: {}", e)))?;

        Ok(Session {
            email: body.email.unwrap_or_else(|| email.to_string()),
            token: body.id_token,
        })
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let request = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        self.call("signUp", &request, Operation::SignUp).await?;
        Ok(())
    }

    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let response = self
            .call("lookup", &LookupRequest { id_token: token }, Operation::Lookup)
            .await?;
        let body: LookupResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Unavailable(format!("invalid lookup response: {}", e)))?;

        body.users
            .into_iter()
            .next()
            .and_then(|user| user.email)
            .map(|email| Identity { email })
            .ok_or(AuthError::InvalidToken)
    }

    fn name(&self) -> &'static str {
        "firebase"
    }
}
