//! HTTP request handlers. A thin presentation adapter over the claim state
//! machine, condition store and activity feed.

use crate::claim::ClaimAttemptState;
use crate::metrics::METRICS;
use crate::middleware::RequestId;
use crate::response::{
    ActivityResponse, BalanceResponse, ClaimResponse, ConditionResponse, HealthResponse,
    SessionResponse,
};
use crate::state::AppState;
use crate::units::{self, USDC_DECIMALS};
use alloy_primitives::Address;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info};

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let wallet = state.session.address();
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.start_time.elapsed().as_secs(),
        requests: state.request_count.load(Ordering::Relaxed),
        signed_in: wallet.is_some(),
        wallet: wallet.map(|a| a.to_string()),
        claim_state: state.claims.state(),
    })
}

/// Prometheus metrics in text exposition format.
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4",
        )],
        METRICS.render(state.session.is_signed_in()),
    )
}

/// Latest claim condition, reading once if nothing is cached.
pub async fn condition(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ConditionResponse>, crate::Error> {
    state.request_count.fetch_add(1, Ordering::Relaxed);
    let snapshot = state.conditions.current().await?;
    Ok(Json(ConditionResponse {
        token_id: state.config.token_id.clone(),
        view: snapshot.view(now_secs()),
    }))
}

/// USDC balance of the signed-in wallet.
pub async fn balance(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BalanceResponse>, crate::Error> {
    state.request_count.fetch_add(1, Ordering::Relaxed);
    let wallet = state.session.address().ok_or(crate::Error::NotConnected)?;
    let raw = state
        .conditions
        .reader()
        .read_usdc_balance(wallet)
        .await?;
    Ok(Json(BalanceResponse {
        wallet: wallet.to_string(),
        usdc: units::format_units(raw, USDC_DECIMALS),
        usdc_raw: raw.to_string(),
    }))
}

pub async fn claim_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ClaimResponse::from_state(state.claims.state()))
}

/// Run one claim attempt. The attempt runs on its own task so a client
/// disconnect cannot strand it mid-flight.
pub async fn claim(
    State(state): State<Arc<AppState>>,
    Extension(req_id): Extension<RequestId>,
) -> Result<(StatusCode, Json<ClaimResponse>), crate::Error> {
    state.request_count.fetch_add(1, Ordering::Relaxed);
    info!(req_id = %req_id, "Claim requested");

    let claims = Arc::clone(&state.claims);
    let terminal = tokio::spawn(async move { claims.claim().await })
        .await
        .map_err(|e| {
            error!(req_id = %req_id, error = %e, "Claim task panicked");
            crate::Error::Internal(format!("claim task failed: {e}"))
        })??;

    let status = match terminal {
        ClaimAttemptState::Failed(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::OK,
    };
    Ok((status, Json(ClaimResponse::from_state(terminal))))
}

pub async fn dismiss_claim(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.claims.dismiss();
    Json(ClaimResponse::from_state(state.claims.state()))
}

#[derive(Deserialize)]
pub struct SignInRequest {
    pub address: String,
}

fn session_response(state: &AppState) -> Json<SessionResponse> {
    let wallet = state.session.address();
    Json(SessionResponse {
        signed_in: wallet.is_some(),
        wallet: wallet.map(|a| a.to_string()),
    })
}

pub async fn session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    session_response(&state)
}

pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignInRequest>,
) -> impl IntoResponse {
    match Address::from_str(request.address.trim()) {
        Ok(address) => {
            state.session.sign_in(address);
            (StatusCode::OK, session_response(&state)).into_response()
        }
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "success": false,
                "error": format!("Invalid wallet address: {e}")
            })),
        )
            .into_response(),
    }
}

pub async fn sign_out(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.session.sign_out();
    session_response(&state)
}

pub async fn activity(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.activity.latest();
    Json(ActivityResponse {
        available: snapshot.is_some(),
        snapshot,
    })
}
