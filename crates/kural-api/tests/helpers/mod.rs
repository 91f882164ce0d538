#![allow(dead_code)]

pub mod fixtures;

use axum_test::TestServer;
use kural_api::setup::routes::setup_routes;
use kural_api::AppState;
use kural_core::Config;
use kural_storage::MemoryStorage;
use std::collections::HashMap;
use std::sync::Arc;

/// Returns the versioned API path.
/// Usage: `api_path("/uploads/cleanup")` -> `/api/v1/uploads/cleanup`.
pub fn api_path(path: &str) -> String {
    format!("{}{}", kural_core::constants::API_PREFIX, path)
}

/// Test application: the real router over an in-memory storage backend.
pub struct TestApp {
    pub server: TestServer,
    pub storage: MemoryStorage,
}

impl TestApp {
    /// Get the HTTP test client
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Get the storage the app writes to
    pub fn storage(&self) -> &MemoryStorage {
        &self.storage
    }
}

/// Setup a test application with default upload settings
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(&[]).await
}

/// Setup a test application with extra configuration variables
pub async fn setup_test_app_with(vars: &[(&str, &str)]) -> TestApp {
    let mut env: HashMap<String, String> = HashMap::new();
    env.insert("STORAGE_BACKEND".to_string(), "memory".to_string());
    for (key, value) in vars {
        env.insert(key.to_string(), value.to_string());
    }

    let config = Config::from_lookup(|key| env.get(key).cloned())
        .expect("Failed to build test configuration");
    config.validate().expect("Test configuration is invalid");

    let storage = MemoryStorage::new(config.upload.public_prefix.clone());
    let state = Arc::new(AppState::new(config.clone(), Arc::new(storage.clone())));

    let router = setup_routes(&config, state)
        .await
        .expect("Failed to build router");
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp { server, storage }
}
