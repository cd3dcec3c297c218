//! Test helpers for integration tests.
//!
//! Provides an in-memory repository and a mock Discord endpoint.

#![allow(dead_code)]

use std::sync::Arc;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ankama_hooks::config::DeliveryConfig;
use ankama_hooks::hooks::{HookRepository, SqlHookRepository};
use ankama_hooks::scheduler::Dispatcher;
use ankama_hooks::Database;

/// In-memory database with its repository.
pub struct TestStore {
    pub db: Database,
    pub repo: Arc<SqlHookRepository>,
}

impl TestStore {
    pub async fn new() -> Self {
        let db = Database::open_in_memory()
            .await
            .expect("Failed to open in-memory database");
        let repo = Arc::new(SqlHookRepository::new(db.pool().clone()));
        Self { db, repo }
    }

    pub fn dyn_repo(&self) -> Arc<dyn HookRepository> {
        self.repo.clone()
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.dyn_repo(), &DeliveryConfig::default())
            .expect("Failed to create dispatcher")
    }
}

/// Mock Discord accepting `/ok`, rejecting `/gone` with 404 and failing
/// `/broken` with 500.
pub async fn discord_mock() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    server
}

/// JSON bodies received on `route`.
pub async fn bodies_for(server: &MockServer, route: &str) -> Vec<serde_json::Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == route)
        .map(|r| serde_json::from_slice(&r.body).expect("body is not JSON"))
        .collect()
}
