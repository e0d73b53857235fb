//! # Drop Claimer
//!
//! Claims one free NFT from a fixed on-chain drop through the Herd Trail API.
//! The Trail API builds the calldata; this crate reads the live claim
//! condition, evaluates the claim step, hands the call to a wallet signer and
//! records the broadcast hash with the remote execution ledger.
//!
//! ## Quick Start
//! ```bash
//! CLAIMER_SIGNER_URL=http://127.0.0.1:3050 cargo run --bin drop-claimer
//! ```
//!
//! ## Endpoints
//! - `GET /condition` - Current claim condition and NFT preview
//! - `POST /claim` - Run one claim attempt
//! - `GET /activity` - Aggregate mint activity

pub mod activity;
pub mod claim;
pub mod condition;
pub mod config;
mod error;
pub mod executor;
mod handlers;
pub mod metrics;
mod middleware;
mod response;
mod router;
mod state;
pub mod trail;
pub mod units;
pub mod wallet;

pub use activity::{ActivityFeed, ActivitySnapshot};
pub use claim::{ClaimAttemptState, ClaimFailure, ClaimStateMachine, FailureKind};
pub use condition::{ClaimCondition, ConditionReader, ConditionSnapshot, ConditionStore};
pub use config::Config;
pub use error::Error;
pub use executor::TransactionExecutor;
pub use router::create as create_router;
pub use state::AppState;
pub use trail::TrailClient;
pub use wallet::{RemoteSigner, WalletSession, WalletSigner};
