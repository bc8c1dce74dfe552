//! ProfeGo API Library
//!
//! HTTP surface of the ingestion pipeline: authentication, the batch upload orchestrator,
//! artifact access handlers and application setup.

pub mod api_doc;
pub mod auth;
pub mod constants;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod setup;
pub mod state;
pub mod telemetry;
pub mod utils;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use services::{IngestService, SubmittedFile};
pub use state::AppState;
