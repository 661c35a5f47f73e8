#![allow(dead_code)]

use adsync::config::{
    AnalyticsConfig, AnalyticsResolvedConfig, MetaConfig, MetaResolvedConfig, PlatformDefaults,
    SyncConfig,
};
use adsync::db::{DbActorHandle, IntegrationSettings, IntegrationUpsert, Platform, SyncStore};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header::HOST},
    routing::get,
};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::TcpListener;
use url::Url;

pub fn unique_sqlite_url(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();

    let mut temp_path = std::env::temp_dir();
    temp_path.push(format!(
        "adsync-{prefix}-{}-{}.sqlite",
        std::process::id(),
        nanos
    ));
    format!("sqlite:{}", temp_path.to_str().expect("utf-8 temp path"))
}

pub async fn spawn_store(prefix: &str) -> DbActorHandle {
    adsync::db::spawn(&unique_sqlite_url(prefix))
        .await
        .expect("spawn db actor")
}

pub async fn spawn_test_server(app: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    let base = Url::parse(&format!("http://{}/", addr)).expect("valid base url");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    base
}

/// Fast retries so failure paths do not slow the suite down.
pub fn meta_config(base: &Url) -> MetaResolvedConfig {
    MetaConfig {
        graph_api_url: base.join("v19.0/").expect("graph url"),
        retry_attempts: Some(2),
        retry_base_delay_ms: Some(1),
        request_timeout_secs: Some(5),
        requests_per_second: Some(1000),
        ..MetaConfig::default()
    }
    .resolve(&PlatformDefaults::default())
}

pub fn analytics_config(base: &Url) -> AnalyticsResolvedConfig {
    AnalyticsConfig {
        api_url: base.clone(),
        token_url: base.join("token").expect("token url"),
        retry_attempts: Some(2),
        retry_base_delay_ms: Some(1),
        request_timeout_secs: Some(5),
        requests_per_second: Some(1000),
        ..AnalyticsConfig::default()
    }
    .resolve(&PlatformDefaults::default())
}

pub fn sync_config() -> SyncConfig {
    SyncConfig {
        concurrency: 2,
        run_timeout_secs: 30,
        campaigns_interval_secs: 0,
        analytics_interval_secs: 0,
    }
}

pub async fn seed_meta_integration(
    store: &DbActorHandle,
    workspace_id: &str,
    token: &str,
    ad_accounts: &[&str],
) -> i64 {
    let accounts: Vec<Value> = ad_accounts
        .iter()
        .map(|id| json!({ "id": id, "name": format!("Account {id}") }))
        .collect();
    let mut settings = Map::new();
    settings.insert("ad_accounts".to_string(), Value::Array(accounts));

    store
        .upsert_integration(IntegrationUpsert {
            workspace_id: workspace_id.to_string(),
            platform: Platform::Meta,
            access_token: token.to_string(),
            refresh_token: None,
            expires_at: None,
            platform_user_id: Some("u-1".to_string()),
            platform_user_name: Some("Jane Marketer".to_string()),
            settings: IntegrationSettings(settings),
        })
        .await
        .expect("seed integration")
}

/// Graph API stand-in.
///
/// Campaign listings return A then (on the `after` page) B. Insights return rows for A and for
/// an unknown campaign C. `act_fail` answers 500, `act_expired` answers an invalid-token error,
/// `act_throttled` answers a 400 rate-limit error and `act_midfail` fails on its second page.
/// Code `huge` exchanges into a token with an absurd `expires_in`.
#[derive(Clone, Default)]
pub struct GraphStub {
    pub campaign_calls: Arc<AtomicUsize>,
    pub insight_queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    pub campaigns_delay: Duration,
}

pub fn graph_router(stub: GraphStub) -> Router {
    Router::new()
        .route("/v19.0/oauth/access_token", get(graph_access_token))
        .route("/v19.0/me", get(graph_me))
        .route("/v19.0/me/adaccounts", get(graph_ad_accounts))
        .route("/v19.0/{account}/campaigns", get(graph_campaigns))
        .route("/v19.0/{account}/insights", get(graph_insights))
        .with_state(stub)
}

fn graph_error(status: StatusCode, kind: &str, code: i64) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({
            "error": { "message": "stubbed failure", "type": kind, "code": code, "fbtrace_id": "x" }
        })),
    )
}

async fn graph_access_token(
    Query(q): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    match q.get("code").map(String::as_str) {
        Some("bad") => return graph_error(StatusCode::BAD_REQUEST, "OAuthException", 100),
        Some("huge") => {
            return (
                StatusCode::OK,
                Json(json!({ "access_token": "T", "expires_in": 10_000_000_000_000_i64 })),
            );
        }
        _ => {}
    }
    (
        StatusCode::OK,
        Json(json!({ "access_token": "T", "token_type": "bearer", "expires_in": 3600 })),
    )
}

async fn graph_me() -> Json<Value> {
    Json(json!({ "id": "u-1", "name": "Jane Marketer" }))
}

async fn graph_ad_accounts() -> Json<Value> {
    Json(json!({ "data": [] }))
}

async fn graph_campaigns(
    State(stub): State<GraphStub>,
    Path(account): Path<String>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    stub.campaign_calls.fetch_add(1, Ordering::SeqCst);
    if !stub.campaigns_delay.is_zero() {
        tokio::time::sleep(stub.campaigns_delay).await;
    }

    match account.as_str() {
        "act_fail" => {
            return graph_error(StatusCode::INTERNAL_SERVER_ERROR, "FacebookApiException", 1);
        }
        "act_expired" => return graph_error(StatusCode::BAD_REQUEST, "OAuthException", 190),
        "act_throttled" => return graph_error(StatusCode::BAD_REQUEST, "OAuthException", 17),
        "act_midfail" if q.contains_key("after") => {
            return graph_error(StatusCode::INTERNAL_SERVER_ERROR, "FacebookApiException", 2);
        }
        _ => {}
    }

    if q.contains_key("after") {
        return (
            StatusCode::OK,
            Json(json!({
                "data": [{
                    "id": "B",
                    "name": "Campaign B",
                    "status": "ACTIVE",
                    "effective_status": "PAUSED",
                    "lifetime_budget": "12000",
                    "start_time": "2024-04-01T00:00:00+0000"
                }],
                "paging": {}
            })),
        );
    }

    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("127.0.0.1");
    (
        StatusCode::OK,
        Json(json!({
            "data": [{
                "id": "A",
                "name": "Campaign A",
                "status": "ACTIVE",
                "objective": "OUTCOME_SALES",
                "daily_budget": "5000",
                "lifetime_budget": "90000",
                "start_time": "2024-04-01T00:00:00+0000"
            }],
            "paging": {
                "cursors": { "after": "c1" },
                "next": format!("http://{host}/v19.0/{account}/campaigns?after=c1")
            }
        })),
    )
}

async fn graph_insights(
    State(stub): State<GraphStub>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<Value> {
    stub.insight_queries
        .lock()
        .expect("insight log")
        .push(q);

    Json(json!({
        "data": [
            {
                "campaign_id": "A",
                "date_start": "2024-05-01",
                "date_stop": "2024-05-01",
                "spend": "12.34",
                "impressions": "1000",
                "clicks": "25",
                "ctr": "2.5",
                "cpc": "0.49",
                "cpm": "12.34",
                "reach": "800",
                "purchase_roas": [{ "action_type": "omni_purchase", "value": "3.1" }],
                "action_values": [{ "action_type": "omni_purchase", "value": "38.25" }]
            },
            {
                "campaign_id": "C",
                "date_start": "2024-05-01",
                "date_stop": "2024-05-01",
                "spend": "1.00"
            }
        ]
    }))
}
