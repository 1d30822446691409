//! In-process stand-in for the eBay token and Browse endpoints.

#![allow(dead_code)]

use axum::{
    extract::{Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use config_manager::{MarketplaceConfig, SystemConfig};
use marketplace_client::Clock;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub struct FakeEbay {
    pub token_requests: AtomicUsize,
    pub search_requests: AtomicUsize,
    pub expires_in: i64,
    pub token_status: u16,
    /// Status per search call, front first; 200 once exhausted
    pub search_statuses: Mutex<VecDeque<u16>>,
    pub search_body: Value,
    pub token_authorizations: Mutex<Vec<String>>,
    pub token_bodies: Mutex<Vec<String>>,
    pub search_authorizations: Mutex<Vec<String>>,
    pub search_params: Mutex<Vec<HashMap<String, String>>>,
}

impl FakeEbay {
    pub fn new(search_body: Value) -> Self {
        Self {
            token_requests: AtomicUsize::new(0),
            search_requests: AtomicUsize::new(0),
            expires_in: 7200,
            token_status: 200,
            search_statuses: Mutex::new(VecDeque::new()),
            search_body,
            token_authorizations: Mutex::new(Vec::new()),
            token_bodies: Mutex::new(Vec::new()),
            search_authorizations: Mutex::new(Vec::new()),
            search_params: Mutex::new(Vec::new()),
        }
    }

    pub fn with_search_statuses(self, statuses: &[u16]) -> Self {
        *self.search_statuses.lock().unwrap() = statuses.iter().copied().collect();
        self
    }

    pub fn token_count(&self) -> usize {
        self.token_requests.load(Ordering::SeqCst)
    }

    pub fn search_count(&self) -> usize {
        self.search_requests.load(Ordering::SeqCst)
    }
}

fn authorization(headers: &HeaderMap) -> String {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn token(State(state): State<Arc<FakeEbay>>, headers: HeaderMap, body: String) -> Response {
    let n = state.token_requests.fetch_add(1, Ordering::SeqCst) + 1;
    state.token_authorizations.lock().unwrap().push(authorization(&headers));
    state.token_bodies.lock().unwrap().push(body);

    if state.token_status != 200 {
        let status = StatusCode::from_u16(state.token_status).unwrap();
        return (status, "invalid_client").into_response();
    }

    Json(json!({
        "access_token": format!("token-{}", n),
        "expires_in": state.expires_in,
        "token_type": "Application Access Token"
    }))
    .into_response()
}

async fn search(
    State(state): State<Arc<FakeEbay>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.search_requests.fetch_add(1, Ordering::SeqCst);
    state.search_authorizations.lock().unwrap().push(authorization(&headers));
    state.search_params.lock().unwrap().push(params);

    let status = state.search_statuses.lock().unwrap().pop_front().unwrap_or(200);
    if status != 200 {
        let status = StatusCode::from_u16(status).unwrap();
        return (status, r#"{"errors":[{"errorId":1001}]}"#).into_response();
    }

    Json(state.search_body.clone()).into_response()
}

/// Serve `state` on an ephemeral port; returns the base URL.
pub async fn spawn(state: Arc<FakeEbay>) -> String {
    let app = Router::new()
        .route("/identity/v1/oauth2/token", post(token))
        .route("/buy/browse/v1/item_summary/search", get(search))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

pub fn config(base_url: &str) -> MarketplaceConfig {
    MarketplaceConfig {
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        api_base_url: base_url.to_string(),
        ..SystemConfig::default().ebay
    }
}

/// Search body with one priced GBP listing per entry of `prices`.
pub fn listings(prices: &[&str]) -> Value {
    let items: Vec<Value> = prices
        .iter()
        .enumerate()
        .map(|(i, price)| {
            json!({
                "title": format!("Listing {}", i + 1),
                "price": { "value": price, "currency": "GBP" },
                "condition": "Used",
                "itemWebUrl": format!("https://www.ebay.co.uk/itm/{}", i + 1),
                "image": { "imageUrl": format!("https://i.ebayimg.com/{}.jpg", i + 1) },
                "itemEndDate": "2024-05-01T12:00:00.000Z",
                "buyingOptions": ["FIXED_PRICE"]
            })
        })
        .collect();

    json!({ "total": items.len(), "itemSummaries": items })
}

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
