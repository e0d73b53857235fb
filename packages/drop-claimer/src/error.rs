//! Error types for the claimer.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Message raised when the ledger reports the on-chain transaction failed.
pub const TRANSACTION_FAILED_MESSAGE: &str =
    "Transaction failed on-chain. Please check your transaction and try again.";

/// Claimer error type.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Step evaluation rejected by the Trail API. Never retried.
    #[error("Evaluation failed: {0}")]
    Evaluation(String),

    /// Execution ledger refused the transaction hash.
    #[error("Execution failed: {0}")]
    ExecutionSubmit(String),

    /// Node read failed.
    #[error("Failed to read node: {0}")]
    Read(String),

    /// Execution history query failed.
    #[error("Failed to fetch execution history: {0}")]
    History(String),

    #[error("Wallet not connected")]
    NotConnected,

    /// Wallet declined to sign or broadcast.
    #[error("{0}")]
    SigningRejected(String),

    /// On-chain revert reported by the execution ledger. Carries the broadcast hash.
    #[error("{}", TRANSACTION_FAILED_MESSAGE)]
    TransactionFailed { tx_hash: String },

    /// Ledger recording failed for a reason other than an on-chain failure.
    #[error("execution tracking failed: {0}")]
    LedgerRecording(String),

    #[error("failed to fetch NFT metadata: {0}")]
    MetadataFetch(String),

    #[error(
        "This NFT drop is not currently configured. The maximum supply is set to 0. \
         Please contact the drop creator."
    )]
    DropNotConfigured,

    #[error("invalid value for {field}: {value:?}")]
    InvalidField { field: String, value: String },

    #[error("a claim attempt is already in progress")]
    ClaimInFlight,

    #[error("config error: {0}")]
    Config(String),

    #[error("Unauthorized: invalid or missing API key")]
    Unauthorized,

    /// Background task died before producing a result.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Non-success HTTP or network failure against the Trail API.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Evaluation(_) | Error::ExecutionSubmit(_) | Error::Read(_) | Error::History(_)
        )
    }

    /// The ledger signalled that the transaction itself failed.
    pub(crate) fn signals_onchain_failure(message: &str) -> bool {
        message.contains("Transaction") && message.contains("failed")
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            e if e.is_transport() => StatusCode::BAD_GATEWAY,
            Error::NotConnected | Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::ClaimInFlight | Error::DropNotConfigured => StatusCode::CONFLICT,
            Error::SigningRejected(_) | Error::TransactionFailed { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Error::InvalidField { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = serde_json::json!({
            "success": false,
            "error": self.to_string()
        });
        (status, Json(body)).into_response()
    }
}
