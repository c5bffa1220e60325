//! In-process fake of the remote inventory API.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{TimeZone, Utc};
use serde_json::Value;
use tokio::net::TcpListener;

use coffee_inventory::models::{Coffee, InventoryData};

/// Server-side state, shared with the test body for assertions.
#[derive(Default)]
pub struct FakeApi {
    /// Stored coffees in insertion order, as raw JSON
    pub coffees: Mutex<Vec<Value>>,
    /// Writes (POST/PUT) for these ids answer 500
    pub failing_ids: Mutex<HashSet<String>>,
    /// When set, GET /api/Coffee answers 500
    pub fail_list: AtomicBool,
    /// When set, requests without this X-Deploy-Key get 401
    pub required_key: Option<String>,
    /// Added to every response, in milliseconds
    pub delay_ms: AtomicU64,
    pub requests: AtomicUsize,
    pub creates: AtomicUsize,
    pub updates: AtomicUsize,
}

impl FakeApi {
    pub fn with_key(key: &str) -> Self {
        Self {
            required_key: Some(key.to_string()),
            ..Default::default()
        }
    }

    pub fn slow(millis: u64) -> Self {
        let api = Self::default();
        api.delay_ms.store(millis, Ordering::SeqCst);
        api
    }

    pub fn stored_name(&self, id: &str) -> Option<String> {
        self.coffees
            .lock()
            .unwrap()
            .iter()
            .find(|c| id_of(c) == Some(id))
            .and_then(|c| c.get("name").and_then(Value::as_str).map(str::to_string))
    }

    /// Sleep the configured delay. Called before any state lock is taken.
    async fn stall(&self) {
        let millis = self.delay_ms.load(Ordering::SeqCst);
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }

    pub fn seed(&self, coffees: &[Coffee]) {
        let mut stored = self.coffees.lock().unwrap();
        for coffee in coffees {
            stored.push(serde_json::to_value(coffee).unwrap());
        }
    }

    pub fn fail_writes_for(&self, id: &str) {
        self.failing_ids.lock().unwrap().insert(id.to_string());
    }

    pub fn stored_count(&self) -> usize {
        self.coffees.lock().unwrap().len()
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        match &self.required_key {
            Some(key) => headers
                .get("X-Deploy-Key")
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v == key),
            None => true,
        }
    }

    fn fails(&self, id: &str) -> bool {
        self.failing_ids.lock().unwrap().contains(id)
    }
}

fn id_of(value: &Value) -> Option<&str> {
    value.get("id").and_then(Value::as_str)
}

async fn list_coffees(State(api): State<Arc<FakeApi>>, headers: HeaderMap) -> Response {
    api.requests.fetch_add(1, Ordering::SeqCst);
    api.stall().await;
    if !api.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if api.fail_list.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "database offline").into_response();
    }
    let coffees = api.coffees.lock().unwrap().clone();
    Json(Value::Array(coffees)).into_response()
}

async fn get_coffee(
    State(api): State<Arc<FakeApi>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    api.requests.fetch_add(1, Ordering::SeqCst);
    api.stall().await;
    if !api.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let coffees = api.coffees.lock().unwrap();
    match coffees.iter().find(|c| id_of(c) == Some(id.as_str())) {
        Some(coffee) => Json(coffee.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn create_coffee(
    State(api): State<Arc<FakeApi>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    api.requests.fetch_add(1, Ordering::SeqCst);
    api.stall().await;
    if !api.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let id = id_of(&body).unwrap_or_default().to_string();
    if api.fails(&id) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "write rejected").into_response();
    }
    api.creates.fetch_add(1, Ordering::SeqCst);
    api.coffees.lock().unwrap().push(body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn update_coffee(
    State(api): State<Arc<FakeApi>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    api.requests.fetch_add(1, Ordering::SeqCst);
    api.stall().await;
    if !api.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if api.fails(&id) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "write rejected").into_response();
    }
    let mut coffees = api.coffees.lock().unwrap();
    match coffees.iter_mut().find(|c| id_of(c) == Some(id.as_str())) {
        Some(slot) => {
            *slot = body;
            api.updates.fetch_add(1, Ordering::SeqCst);
            StatusCode::NO_CONTENT.into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Start the fake API on an ephemeral port; returns its base URL.
pub async fn spawn_fake_api(api: Arc<FakeApi>) -> String {
    let app = Router::new()
        .route("/api/Coffee", get(list_coffees).post(create_coffee))
        .route("/api/Coffee/:id", get(get_coffee).put(update_coffee))
        .with_state(api);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("http://{}", addr)
}

/// A fully populated coffee with fixed timestamps.
pub fn coffee(id: &str, name: &str, stock: u32, price: f64) -> Coffee {
    let ts = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
    Coffee {
        id: id.to_string(),
        name: name.to_string(),
        origin: "Ethiopia".to_string(),
        roast_level: "Medium".to_string(),
        description: format!("{} description", name),
        price_per_bag: price,
        stock_quantity: stock,
        flavor_notes: vec!["berry".to_string(), "chocolate".to_string()],
        image_url: String::new(),
        is_available: stock > 0,
        roasted_date: ts,
        created_at: ts,
        updated_at: ts,
    }
}

pub fn inventory(api_url: &str, api_key: Option<&str>, coffees: Vec<Coffee>) -> InventoryData {
    InventoryData {
        api_url: api_url.to_string(),
        api_key: api_key.map(str::to_string),
        coffees,
    }
}
