//! Shared harness: the real router over a `MemoryStore`, served on an ephemeral port.

#![allow(dead_code)]

use classifieds::app::marketplace::DEFAULT_BUCKET;
use classifieds::{transport, MarketplaceService, MemoryStore};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

pub const PUBLIC_BASE: &str = "https://store.example.co";

pub struct TestServer {
    pub base_url: String,
    pub store: MemoryStore,
    pub http: reqwest::Client,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get_json(&self, path: &str) -> JsonValue {
        self.http
            .get(self.url(path))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    /// Creates a listing through the API and returns its `data` object.
    pub async fn create_listing(&self, body: JsonValue) -> JsonValue {
        let resp = self
            .http
            .post(self.url("/listings"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        resp.json::<JsonValue>().await.unwrap()["data"].clone()
    }
}

pub async fn spawn_server() -> TestServer {
    let store = MemoryStore::new(PUBLIC_BASE);
    let service = MarketplaceService::new(Arc::new(store.clone()), DEFAULT_BUCKET);
    let router = transport::http::create_router(transport::http::AppState {
        service: Arc::new(service),
    });

    // Bind to an ephemeral port so tests can run in parallel.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestServer {
        base_url: format!("http://127.0.0.1:{}", port),
        store,
        http: reqwest::Client::new(),
    }
}

pub fn listing_body(title: &str, price: &str, category: &str) -> JsonValue {
    json!({
        "title": title,
        "price": price,
        "seller_email": "seller@example.com",
        "category": category,
    })
}
