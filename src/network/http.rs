//! HTTP Query Routes
//!
//! Read-only balance and history lookups for the web client.

use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    extract::{Path, State},
    http::{header, Method},
    routing::get,
    Json, Router,
};
use serde::{Serialize, Deserialize};
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::core::money::Amount;
use crate::ledger::session_ledger::SessionLedger;
use crate::ledger::types::{HistoryEntry, UserId};

/// Body of `GET /api/balance/:user_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceResponse {
    /// Current balance, defaulted for unseen users.
    pub balance: Amount,
}

/// Build the query router.
pub fn router(ledger: Arc<SessionLedger>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/balance/:user_id", get(get_balance))
        .route("/api/history/:user_id", get(get_history))
        .layer(cors)
        .with_state(ledger)
}

async fn get_balance(
    State(ledger): State<Arc<SessionLedger>>,
    Path(user_id): Path<String>,
) -> Json<BalanceResponse> {
    let balance = ledger.get_balance(&UserId::new(user_id)).await;
    Json(BalanceResponse { balance })
}

async fn get_history(
    State(ledger): State<Arc<SessionLedger>>,
    Path(user_id): Path<String>,
) -> Json<Vec<HistoryEntry>> {
    Json(ledger.get_history(&UserId::new(user_id)).await)
}

/// Serve the query routes until a shutdown signal arrives.
pub async fn serve(
    addr: SocketAddr,
    ledger: Arc<SessionLedger>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP query routes listening on {}", addr);

    axum::serve(listener, router(ledger))
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await
}
