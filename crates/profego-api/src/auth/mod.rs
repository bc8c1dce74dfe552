//! Authentication: identity provider seam, Firebase adapter, Bearer middleware.

pub mod firebase;
pub mod middleware;
pub mod models;
pub mod provider;

pub use firebase::FirebaseIdentityProvider;
pub use models::UserContext;
pub use provider::{AuthError, Identity, IdentityProvider, Session};
