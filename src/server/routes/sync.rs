use crate::error::AdsyncError;
use crate::server::router::AdsyncState;
use axum::{Json, extract::State};
use serde_json::{Value, json};

/// POST /sync/campaigns
///
/// Runs a full pass and answers with its summary; `409` while another pass is in flight.
pub async fn trigger_campaigns(
    State(state): State<AdsyncState>,
) -> Result<Json<Value>, AdsyncError> {
    let summary = state.campaigns.run().await?;
    Ok(Json(json!({
        "message": "Campaign sync completed",
        "summary": summary,
    })))
}

/// POST /sync/analytics
pub async fn trigger_analytics(
    State(state): State<AdsyncState>,
) -> Result<Json<Value>, AdsyncError> {
    let summary = state.funnel.run().await?;
    Ok(Json(json!({
        "message": "Analytics sync completed",
        "summary": summary,
    })))
}
