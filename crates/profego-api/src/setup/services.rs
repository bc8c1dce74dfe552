//! Wiring of storage, converter, staging and identity provider into [`AppState`].

use crate::auth::{FirebaseIdentityProvider, IdentityProvider};
use crate::services::IngestService;
use crate::state::{AppState, RateLimiters};
use anyhow::{Context, Result};
use profego_core::{Config, ConverterBackend};
use profego_processing::{
    BuiltinConverter, ConversionDispatcher, Converter, FileValidator, HttpConverter, TempStaging,
};
use profego_storage::{create_storage, ArtifactStore};
use std::sync::Arc;
use std::time::Duration;

/// Subdirectory of the staging directory receiving converter output.
const CONVERTED_SUBDIR: &str = "converted";

pub async fn initialize_services(config: &Config) -> Result<Arc<AppState>> {
    let storage = create_storage(config)
        .await
        .context("Failed to initialize storage backend")?;
    storage
        .health_check()
        .await
        .context("Storage backend is not reachable")?;
    let artifacts = ArtifactStore::new(storage);

    let converter = create_converter(config)?;

    let identity_config = config.identity();
    let api_key = identity_config
        .firebase_api_key
        .as_deref()
        .context("FIREBASE_API_KEY must be set")?;
    let identity: Arc<dyn IdentityProvider> = Arc::new(FirebaseIdentityProvider::new(
        api_key,
        identity_config.identity_base_url.as_str(),
    )?);

    tracing::info!(
        storage_backend = %artifacts.backend_type(),
        converter = converter.name(),
        identity_provider = identity.name(),
        concurrency = config.ingest().concurrency,
        "Services initialized"
    );

    Ok(build_state(config.clone(), artifacts, converter, identity))
}

fn create_converter(config: &Config) -> Result<Arc<dyn Converter>> {
    let ingest = config.ingest();
    let output_dir = ingest.staging_dir.join(CONVERTED_SUBDIR);

    let converter: Arc<dyn Converter> = match ingest.converter_backend {
        ConverterBackend::Builtin => Arc::new(BuiltinConverter::new(output_dir)),
        ConverterBackend::Http => {
            let url = ingest
                .converter_url
                .as_deref()
                .context("CONVERTER_URL must be set when CONVERTER_BACKEND=http")?;
            Arc::new(HttpConverter::new(
                url,
                Duration::from_secs(ingest.converter_timeout_secs),
                output_dir,
            )?)
        }
    };

    Ok(converter)
}

/// Assemble the state from already-built collaborators.
pub fn build_state(
    config: Config,
    artifacts: ArtifactStore,
    converter: Arc<dyn Converter>,
    identity: Arc<dyn IdentityProvider>,
) -> Arc<AppState> {
    let ingest_config = config.ingest();
    let ingest = IngestService::new(
        FileValidator::from_config(ingest_config),
        Arc::new(TempStaging::new(ingest_config.staging_dir.clone())),
        ConversionDispatcher::new(converter),
        artifacts.clone(),
        ingest_config.concurrency,
    );
    let rate_limiters = RateLimiters::from_config(&config);

    Arc::new(AppState {
        config,
        artifacts,
        ingest: Arc::new(ingest),
        identity,
        rate_limiters,
    })
}
