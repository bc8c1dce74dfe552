//! Test helpers: build the router around local storage and a stub identity provider.
//!
//! Run with `cargo test -p profego-api`.

#![allow(dead_code)]

pub mod identity;

use axum_test::TestServer;
use profego_api::setup::{routes, services};
use profego_api::state::AppState;
use profego_core::Config;
use profego_processing::BuiltinConverter;
use profego_storage::{create_storage, ArtifactStore};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

pub use identity::StubIdentityProvider;

pub const TEST_EMAIL: &str = "ana@example.com";
pub const TEST_PASSWORD: &str = "secret123";

/// Test application: server, state, and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub identity: Arc<StubIdentityProvider>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Register `email` with the stub provider and return a bearer header value.
    pub fn bearer_for(&self, email: &str) -> String {
        self.identity.add_user(email, TEST_PASSWORD);
        format!("Bearer {}", StubIdentityProvider::token_for(email))
    }

    pub fn bearer(&self) -> String {
        self.bearer_for(TEST_EMAIL)
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(&[]).await
}

/// Setup a test app; `overrides` are applied on top of the default test environment.
pub async fn setup_test_app_with(overrides: &[(&str, &str)]) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let storage_path = temp_dir.path().join("storage");
    let staging_path = temp_dir.path().join("staging");

    let mut env: HashMap<String, String> = HashMap::from([
        ("ENVIRONMENT".to_string(), "test".to_string()),
        ("STORAGE_BACKEND".to_string(), "local".to_string()),
        (
            "LOCAL_STORAGE_PATH".to_string(),
            storage_path.display().to_string(),
        ),
        ("STAGING_DIR".to_string(), staging_path.display().to_string()),
        ("FIREBASE_API_KEY".to_string(), "test-key".to_string()),
    ]);
    for (key, value) in overrides {
        env.insert(key.to_string(), value.to_string());
    }

    let config = Config::from_lookup(|key| env.get(key).cloned()).expect("Invalid test config");
    config.validate().expect("Test config failed validation");

    let storage = create_storage(&config)
        .await
        .expect("Failed to create test storage");
    let artifacts = ArtifactStore::new(storage);
    let converter = Arc::new(BuiltinConverter::new(staging_path.join("converted")));
    let identity = Arc::new(StubIdentityProvider::default());

    let state = services::build_state(config.clone(), artifacts, converter, identity.clone());
    let router = routes::setup_routes(&config, state.clone()).expect("Failed to build routes");
    let server = TestServer::new(router).expect("Failed to start test server");

    TestApp {
        server,
        state,
        identity,
        _temp_dir: temp_dir,
    }
}
