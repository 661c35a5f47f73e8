use crate::server::guards::auth::RequireAdminKey;
use crate::server::routes::{health, integrations, sync};
use crate::service::IntegrationService;
use crate::sync::{CampaignSync, FunnelSync};

use axum::{
    Router,
    extract::Request,
    http::{
        HeaderName, HeaderValue, Method, StatusCode, Version,
        header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT},
    },
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use base64::Engine as _;
use rand::RngCore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info, warn};

const MAX_REQUEST_ID_LEN: usize = 128;
const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
const X_API_KEY: HeaderName = HeaderName::from_static("x-api-key");

fn generate_request_id() -> String {
    // 96 bits => 16 chars base64url (no padding).
    let mut bytes = [0u8; 12];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn format_http_version(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2",
        Version::HTTP_3 => "HTTP/3",
        _ => "HTTP/?",
    }
}

#[derive(Clone)]
pub struct AdsyncState {
    pub integrations: IntegrationService,
    pub campaigns: Arc<CampaignSync>,
    pub funnel: Arc<FunnelSync>,
    pub admin_key: Arc<str>,
}

impl AdsyncState {
    pub fn new(
        integrations: IntegrationService,
        campaigns: Arc<CampaignSync>,
        funnel: Arc<FunnelSync>,
        admin_key: Arc<str>,
    ) -> Self {
        Self {
            integrations,
            campaigns,
            funnel,
            admin_key,
        }
    }
}

async fn not_found_handler() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn access_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let version = req.version();

    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(generate_request_id);

    let user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let start = Instant::now();
    let mut resp = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        resp.headers_mut().insert(X_REQUEST_ID, value);
    }

    let status = resp.status();
    let latency_ms = start.elapsed().as_millis() as u64;
    let path = uri.path();
    let protocol = format_http_version(version);

    // Sync triggers hold the request for the whole run, so latency is the run duration.
    if status.is_server_error() {
        error!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            user_agent
        );
    } else if status.is_client_error() {
        warn!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            user_agent
        );
    } else {
        info!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            user_agent
        );
    }

    resp
}

/// Empty list or `["*"]` allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let any_origin = origins.is_empty() || origins.iter().any(|o| o == "*");
    let allow_origin = if any_origin {
        AllowOrigin::any()
    } else {
        let allowed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "Ignoring unparsable CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(allowed)
    };

    let layer = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .max_age(Duration::from_secs(3600));

    if any_origin {
        layer.allow_headers(Any)
    } else {
        layer.allow_headers([AUTHORIZATION, CONTENT_TYPE, X_API_KEY, X_REQUEST_ID])
    }
}

pub fn adsync_router(state: AdsyncState, cors_allow_origins: &[String]) -> Router {
    let admin = Router::new()
        .route(
            "/integrations/meta/exchange",
            post(integrations::meta_exchange),
        )
        .route(
            "/integrations/google-analytics",
            post(integrations::register_analytics),
        )
        .route(
            "/integrations/{platform}/disconnect",
            post(integrations::disconnect),
        )
        .route("/sync/campaigns", post(sync::trigger_campaigns))
        .route("/sync/analytics", post(sync::trigger_analytics))
        .route_layer(middleware::from_extractor_with_state::<RequireAdminKey, _>(
            state.clone(),
        ));

    Router::new()
        .route("/healthz", get(health::healthz))
        .merge(admin)
        .fallback(not_found_handler)
        .with_state(state)
        .layer(cors_layer(cors_allow_origins))
        .layer(middleware::from_fn(access_log))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_url_safe() {
        let id = generate_request_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn http_versions_render() {
        assert_eq!(format_http_version(Version::HTTP_11), "HTTP/1.1");
        assert_eq!(format_http_version(Version::HTTP_2), "HTTP/2");
    }
}
