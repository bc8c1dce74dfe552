//! OpenAPI documentation.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::auth::models;
use crate::error;
use crate::handlers;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ProfeGo API",
        version = "0.1.0",
        description = "Document ingestion for educators: upload files, keep the originals, and get plain-text versions for downstream use."
    ),
    paths(
        handlers::auth::login,
        handlers::auth::register,
        handlers::file_upload::upload_files,
        handlers::file_list::list_files,
        handlers::file_access::download_file,
        handlers::file_access::preview_file,
        handlers::file_delete::delete_file,
        handlers::storage_info::storage_info,
        handlers::health::health_check,
    ),
    components(
        schemas(
            error::ErrorResponse,
            models::CredentialsRequest,
            models::LoginResponse,
            models::MessageResponse,
            profego_core::ProcessingResult,
            profego_core::FileError,
            profego_core::FileErrorKind,
            profego_core::FileInfo,
            profego_core::Tier,
            profego_storage::UserUsage,
            profego_storage::TierUsage,
            handlers::file_access::TextPreview,
            handlers::health::HealthResponse,
            handlers::health::StorageHealth,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Sign in and registration"),
        (name = "files", description = "Upload, list, download, preview and delete files"),
        (name = "user", description = "Per-user storage usage"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_lists_every_route() {
        let spec = get_openapi_spec();
        for path in [
            "/api/auth/login",
            "/api/auth/register",
            "/api/files/upload",
            "/api/files/list",
            "/api/files/download/{category}/{filename}",
            "/api/files/preview/{category}/{filename}",
            "/api/files/delete/{category}/{filename}",
            "/api/user/storage-info",
            "/health",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
