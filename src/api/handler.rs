use std::sync::Arc;

use axum::{body::Bytes, extract::State, Json};
use chrono::Utc;
use tracing::{info, warn};

use super::models::{HealthResponse, SettlementRequest};
use crate::error::AppResult;
use crate::settlement::{SettlementReport, SettlementService};
use crate::upstream::TransactionStatus;

#[derive(Clone)]
pub struct AppState {
    pub settlement: Arc<SettlementService>,
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Reconciled approved transactions
/// POST /api/transactions
pub async fn list_transactions(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<SettlementReport>> {
    settle(&state, TransactionStatus::Approved, &body).await
}

/// Reconciled refunded transactions
/// POST /api/refunds
pub async fn list_refunds(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<SettlementReport>> {
    settle(&state, TransactionStatus::Refunded, &body).await
}

async fn settle(
    state: &AppState,
    status: TransactionStatus,
    body: &[u8],
) -> AppResult<Json<SettlementReport>> {
    let request = SettlementRequest::from_body(body)?;
    let range = request.date_range(
        Utc::now().date_naive(),
        state.settlement.default_lookback_days(),
    )?;
    info!("Received {} request for {}", status.as_str(), range);

    let report = state
        .settlement
        .fetch_and_reconcile(status, Some(range))
        .await?;

    for window in &report.failed_chunks {
        warn!("Response for {} is missing window {}", range, window);
    }

    Ok(Json(report))
}
