use crate::db::Platform;
use crate::error::{AdsyncError, ExchangeError};
use crate::server::router::AdsyncState;
use crate::service::{AnalyticsRegistration, MetaExchangeRequest};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::str::FromStr;

/// Malformed bodies answer with the same JSON error shape as validation failures.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AdsyncError> {
    body.map(|Json(v)| v)
        .map_err(|e| ExchangeError::InvalidRequest(e.body_text()).into())
}

/// POST /integrations/meta/exchange
pub async fn meta_exchange(
    State(state): State<AdsyncState>,
    body: Result<Json<MetaExchangeRequest>, JsonRejection>,
) -> Result<Json<Value>, AdsyncError> {
    let req = json_body(body)?;
    let outcome = state.integrations.exchange_meta_code(req).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Meta integration connected",
        "data": outcome,
    })))
}

/// POST /integrations/google-analytics
pub async fn register_analytics(
    State(state): State<AdsyncState>,
    body: Result<Json<AnalyticsRegistration>, JsonRejection>,
) -> Result<Json<Value>, AdsyncError> {
    let req = json_body(body)?;
    let outcome = state.integrations.register_analytics(req).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Analytics integration registered",
        "data": outcome,
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DisconnectRequest {
    pub workspace_id: String,
}

/// POST /integrations/{platform}/disconnect
pub async fn disconnect(
    State(state): State<AdsyncState>,
    Path(platform): Path<String>,
    body: Result<Json<DisconnectRequest>, JsonRejection>,
) -> Result<Json<Value>, AdsyncError> {
    let platform = Platform::from_str(&platform).map_err(ExchangeError::InvalidRequest)?;
    let req = json_body(body)?;
    state.integrations.disconnect(&req.workspace_id, platform).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("{platform} integration disconnected"),
    })))
}
