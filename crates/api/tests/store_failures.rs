//! Store failures surface as a uniform 500 on every todo route.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde_json::{Value, json};

use tickbox_api::app::{AppServices, router};
use tickbox_api::config::AppConfig;
use tickbox_core::{TodoId, UserId};
use tickbox_infra::services::{AdminService, AuthService, TodoService};
use tickbox_infra::store::{InMemoryStore, StoreError, TodoStore};
use tickbox_todos::Todo;

/// Todo backend that is always down.
struct UnavailableTodos;

fn unavailable() -> StoreError {
    StoreError::Backend("connection refused".to_string())
}

#[async_trait]
impl TodoStore for UnavailableTodos {
    async fn list_todos(&self, _owner: UserId) -> Result<Vec<Todo>, StoreError> {
        Err(unavailable())
    }

    async fn insert_todo(&self, _todo: &Todo) -> Result<(), StoreError> {
        Err(unavailable())
    }

    async fn get_todo(&self, _id: TodoId) -> Result<Option<Todo>, StoreError> {
        Err(unavailable())
    }

    async fn set_completed(&self, _id: TodoId, _completed: bool, _now: DateTime<Utc>) -> Result<bool, StoreError> {
        Err(unavailable())
    }

    async fn delete_todo(&self, _id: TodoId) -> Result<bool, StoreError> {
        Err(unavailable())
    }
}

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let config = AppConfig::for_tests();
        let store = Arc::new(InMemoryStore::new());
        let services = AppServices {
            auth: AuthService::new(store.clone(), store.clone(), store.clone(), config.session_ttl),
            todos: TodoService::new(Arc::new(UnavailableTodos)),
            admin: AdminService::new(store.clone(), store),
            config,
        };
        let app = router(Arc::new(services));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn every_todo_route_maps_store_failure_to_500() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .post(srv.url("/api/auth/sign-up/email"))
        .json(&json!({ "name": "Olga", "email": "olga@example.com", "password": "Sup3r-secret" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let id = "0190b6a2-0000-7000-8000-000000000000";
    let requests = [
        srv.client.get(srv.url("/api/todos")),
        srv.client
            .post(srv.url("/api/todos"))
            .json(&json!({ "title": "Water plants", "date": "2026-06-01" })),
        srv.client
            .patch(srv.url(&format!("/api/todos/{id}")))
            .json(&json!({ "completed": true })),
        srv.client.delete(srv.url(&format!("/api/todos/{id}"))),
    ];

    for req in requests {
        let res = req.bearer_auth(&token).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "internal_error");
        // Backend details stay in the logs.
        assert!(!body["message"].as_str().unwrap().contains("connection refused"));
    }
}
