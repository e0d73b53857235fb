//! Response types for the claimer API.

use serde::Serialize;

use crate::activity::ActivitySnapshot;
use crate::claim::ClaimAttemptState;
use crate::condition::ConditionView;

/// Response from the health endpoint.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
    pub requests: u64,
    pub signed_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet: Option<String>,
    pub claim_state: ClaimAttemptState,
}

/// Response from `GET /condition`.
#[derive(Serialize)]
pub struct ConditionResponse {
    pub token_id: String,
    #[serde(flatten)]
    pub view: ConditionView,
}

/// Response from `GET /balance`.
#[derive(Serialize)]
pub struct BalanceResponse {
    pub wallet: String,
    pub usdc: String,
    pub usdc_raw: String,
}

/// Response from the claim endpoints.
#[derive(Serialize)]
pub struct ClaimResponse {
    pub success: bool,
    #[serde(flatten)]
    pub state: ClaimAttemptState,
}

impl ClaimResponse {
    pub fn from_state(state: ClaimAttemptState) -> Self {
        Self {
            success: !matches!(state, ClaimAttemptState::Failed(_)),
            state,
        }
    }
}

/// Response from `GET /activity`.
#[derive(Serialize)]
pub struct ActivityResponse {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<ActivitySnapshot>,
}

/// Response from the session endpoints.
#[derive(Serialize)]
pub struct SessionResponse {
    pub signed_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet: Option<String>,
}
