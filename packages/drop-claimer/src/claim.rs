//! Claim state machine: evaluate, sign/send, record, refresh.
//!
//! One attempt is in flight at a time. The state lives in a `watch` channel so
//! presentation adapters can follow transitions; starting an attempt is a
//! single check-and-set on that channel.

use alloy_primitives::Address;
use serde::Serialize;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::condition::{ConditionSnapshot, ConditionStore};
use crate::config::Config;
use crate::executor::{LedgerStatus, TransactionExecutor};
use crate::metrics::METRICS;
use crate::trail::{EvaluationRequest, ExecutionSelector, TrailClient, UserInputs};

const CLAIM_QUANTITY: &str = "1";
/// No allowlist support: the proof is always empty bytes.
const EMPTY_PROOF: &str = "";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ClaimAttemptState {
    Idle,
    Loading,
    Evaluating,
    Sending,
    Recording,
    Succeeded {
        tx_hash: String,
        explorer_url: String,
        /// `false` when the ledger could not be updated; the mint still happened.
        ledger_recorded: bool,
    },
    Failed(ClaimFailure),
}

impl ClaimAttemptState {
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            ClaimAttemptState::Loading
                | ClaimAttemptState::Evaluating
                | ClaimAttemptState::Sending
                | ClaimAttemptState::Recording
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ClaimAttemptState::Succeeded { .. } | ClaimAttemptState::Failed(_)
        )
    }

    pub fn tx_hash(&self) -> Option<&str> {
        match self {
            ClaimAttemptState::Succeeded { tx_hash, .. } => Some(tx_hash),
            ClaimAttemptState::Failed(ClaimFailure {
                kind: FailureKind::TransactionFailed { tx_hash, .. },
                ..
            }) => tx_hash.as_deref(),
            _ => None,
        }
    }
}

/// Failure shown to the user: the raw message plus an optional enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimFailure {
    pub message: String,
    pub kind: FailureKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FailureKind {
    /// Show the wallet address so the user can fund it.
    InsufficientBalance { deposit_address: Option<String> },
    /// Link the transaction for diagnosis.
    TransactionFailed {
        tx_hash: Option<String>,
        explorer_url: Option<String>,
    },
    DropNotConfigured,
    Other,
}

impl ClaimFailure {
    /// Classify by message text; collaborators carry no structured error code.
    pub fn classify(err: &crate::Error, wallet: Option<Address>, explorer_tx_base: &str) -> Self {
        let message = err.to_string();
        let kind = if matches!(err, crate::Error::DropNotConfigured) {
            FailureKind::DropNotConfigured
        } else if message.contains("Insufficient balance") || message.contains("insufficient") {
            FailureKind::InsufficientBalance {
                deposit_address: wallet.map(|a| a.to_string()),
            }
        } else if message.contains("Transaction failed") {
            let tx_hash = match err {
                crate::Error::TransactionFailed { tx_hash } => Some(tx_hash.clone()),
                _ => None,
            };
            FailureKind::TransactionFailed {
                explorer_url: tx_hash.as_ref().map(|h| format!("{explorer_tx_base}{h}")),
                tx_hash,
            }
        } else {
            FailureKind::Other
        };
        Self { message, kind }
    }
}

pub struct ClaimStateMachine {
    trail: Arc<TrailClient>,
    executor: Arc<TransactionExecutor>,
    conditions: Arc<ConditionStore>,
    primary_node_id: String,
    token_id: String,
    claim_step: u32,
    settle_delay: Duration,
    explorer_tx_base: String,
    state: watch::Sender<ClaimAttemptState>,
    pending_refresh: Mutex<Option<JoinHandle<()>>>,
}

impl ClaimStateMachine {
    pub fn new(
        config: &Config,
        trail: Arc<TrailClient>,
        executor: Arc<TransactionExecutor>,
        conditions: Arc<ConditionStore>,
    ) -> Self {
        let (state, _rx) = watch::channel(ClaimAttemptState::Idle);
        Self {
            trail,
            executor,
            conditions,
            primary_node_id: config.primary_node_id.clone(),
            token_id: config.token_id.clone(),
            claim_step: config.claim_step,
            settle_delay: config.settle_delay(),
            explorer_tx_base: config.explorer_tx_base.clone(),
            state,
            pending_refresh: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ClaimAttemptState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ClaimAttemptState> {
        self.state.subscribe()
    }

    pub fn conditions(&self) -> &Arc<ConditionStore> {
        &self.conditions
    }

    /// Return a terminal state to `Idle`. In-flight attempts are untouched.
    pub fn dismiss(&self) -> bool {
        self.state.send_if_modified(|state| {
            if state.is_terminal() {
                *state = ClaimAttemptState::Idle;
                true
            } else {
                false
            }
        })
    }

    /// Run one claim attempt to a terminal state.
    ///
    /// Returns `ClaimInFlight` without touching the state if another attempt
    /// is running. Dropping the future mid-attempt leaves the state in flight,
    /// so adapters should drive it on a spawned task.
    pub async fn claim(&self) -> Result<ClaimAttemptState, crate::Error> {
        let cached = self
            .conditions
            .latest()
            .filter(|s| s.condition.is_configured());
        let first = if cached.is_some() {
            ClaimAttemptState::Evaluating
        } else {
            ClaimAttemptState::Loading
        };

        let started = self.state.send_if_modified(|state| {
            if state.is_in_flight() {
                return false;
            }
            *state = first.clone();
            true
        });
        if !started {
            METRICS.claims_rejected_in_flight.fetch_add(1, Ordering::Relaxed);
            return Err(crate::Error::ClaimInFlight);
        }

        METRICS.claims_started.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();
        let wallet = self.executor.connected_wallet().ok();
        info!(wallet = ?wallet, "Claim started");

        let terminal = match self.run_attempt(cached).await {
            Ok((tx_hash, ledger)) => {
                METRICS.claims_succeeded.fetch_add(1, Ordering::Relaxed);
                info!(tx_hash = %tx_hash, ledger = ?ledger, "Claim succeeded");
                self.schedule_settle_refresh();
                ClaimAttemptState::Succeeded {
                    explorer_url: format!("{}{}", self.explorer_tx_base, tx_hash),
                    ledger_recorded: ledger == LedgerStatus::Recorded,
                    tx_hash,
                }
            }
            Err(e) => {
                METRICS.claims_failed.fetch_add(1, Ordering::Relaxed);
                error!(error = %e, "Claim failed");
                ClaimAttemptState::Failed(ClaimFailure::classify(
                    &e,
                    wallet,
                    &self.explorer_tx_base,
                ))
            }
        };

        self.state.send_replace(terminal.clone());
        METRICS.record_claim_duration(start);
        Ok(terminal)
    }

    async fn run_attempt(
        &self,
        cached: Option<ConditionSnapshot>,
    ) -> Result<(String, LedgerStatus), crate::Error> {
        let wallet = self.executor.connected_wallet()?;

        let snapshot = match cached {
            Some(snapshot) => snapshot,
            None => self.conditions.refresh().await?,
        };
        if !snapshot.condition.is_configured() {
            return Err(crate::Error::DropNotConfigured);
        }

        self.transition(ClaimAttemptState::Evaluating);
        let user_inputs = UserInputs::new()
            .with(&self.primary_node_id, "inputs._allowlistProof.proof", EMPTY_PROOF)
            .with(&self.primary_node_id, "inputs._quantity", CLAIM_QUANTITY)
            .with(&self.primary_node_id, "inputs._tokenId", &self.token_id);
        let evaluation = self
            .trail
            .evaluate_step(
                self.claim_step,
                &EvaluationRequest {
                    wallet_address: wallet.to_string(),
                    user_inputs,
                    execution: ExecutionSelector::Latest,
                },
            )
            .await?;

        self.transition(ClaimAttemptState::Sending);
        let broadcast = self.executor.broadcast(wallet, &evaluation).await?;

        self.transition(ClaimAttemptState::Recording);
        let ledger = self
            .executor
            .record(wallet, &self.primary_node_id, &broadcast.transaction_hash)
            .await?;

        Ok((broadcast.transaction_hash, ledger))
    }

    fn transition(&self, next: ClaimAttemptState) {
        debug!(state = ?next, "Claim state");
        self.state.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            *state = next;
            true
        });
    }

    /// One deferred re-read after the settle delay; replaces any pending one.
    fn schedule_settle_refresh(&self) {
        let conditions = Arc::clone(&self.conditions);
        let delay = self.settle_delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match conditions.refresh().await {
                Ok(snapshot) => debug!(
                    claimed = %snapshot.condition.supply_claimed,
                    "Post-claim condition refreshed"
                ),
                Err(e) => warn!(error = %e, "Post-claim condition refresh failed"),
            }
        });
        let mut pending = self
            .pending_refresh
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.replace(handle) {
            previous.abort();
        }
    }

    /// Wait for the pending settle refresh, if any.
    pub async fn settled(&self) {
        let handle = self
            .pending_refresh
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}
