//! Transaction executor: wallet broadcast, then execution ledger recording.

use alloy_primitives::Address;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::metrics::METRICS;
use crate::trail::{EvaluationResult, ExecutionRecord, ExecutionSelector, TrailClient};
use crate::units;
use crate::wallet::{BroadcastResult, SignerRequest, TransactionRequest, WalletSession, WalletSigner};

const TX_TYPE: &str = "eip1559";

/// Outcome of recording a broadcast hash with the execution ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerStatus {
    Recorded,
    /// Ledger refused for a reason other than an on-chain failure.
    Unrecorded(String),
}

/// Broadcast hash together with the ledger outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub broadcast: BroadcastResult,
    pub ledger: LedgerStatus,
}

pub struct TransactionExecutor {
    signer: Arc<dyn WalletSigner>,
    trail: Arc<TrailClient>,
    session: Arc<WalletSession>,
    chain_id: u64,
    network: String,
    gas_limit: u64,
}

impl TransactionExecutor {
    pub fn new(
        config: &Config,
        signer: Arc<dyn WalletSigner>,
        trail: Arc<TrailClient>,
        session: Arc<WalletSession>,
    ) -> Self {
        Self {
            signer,
            trail,
            session,
            chain_id: config.chain_id,
            network: config.network.clone(),
            gas_limit: config.gas_limit,
        }
    }

    /// Connected wallet or `NotConnected`, checked before any network call.
    pub fn connected_wallet(&self) -> Result<Address, crate::Error> {
        self.session.address().ok_or(crate::Error::NotConnected)
    }

    /// Step 1: have the wallet sign and broadcast `call`.
    pub async fn broadcast(
        &self,
        wallet: Address,
        call: &EvaluationResult,
    ) -> Result<BroadcastResult, crate::Error> {
        let value = units::parse_u256("payableAmount", &call.payable_amount)?;
        let request = SignerRequest {
            transaction: TransactionRequest {
                to: call.contract_address.clone(),
                data: call.call_data.clone(),
                value: value.to_string(),
                chain_id: self.chain_id,
                tx_type: TX_TYPE.to_string(),
                gas: self.gas_limit.to_string(),
            },
            evm_account: wallet.to_string(),
            network: self.network.clone(),
        };

        info!(
            to = %request.transaction.to,
            value = %request.transaction.value,
            chain_id = self.chain_id,
            gas = self.gas_limit,
            "Sending transaction"
        );
        let result = self.signer.send_transaction(&request).await?;
        info!(tx_hash = %result.transaction_hash, "Transaction sent");
        Ok(result)
    }

    /// Steps 2-4: record `tx_hash` on the ledger. Only an on-chain failure
    /// reported by the ledger is returned as an error.
    pub async fn record(
        &self,
        wallet: Address,
        node_id: &str,
        tx_hash: &str,
    ) -> Result<LedgerStatus, crate::Error> {
        let record = ExecutionRecord {
            node_id: node_id.to_string(),
            transaction_hash: tx_hash.to_string(),
            wallet_address: wallet.to_string(),
            execution: ExecutionSelector::Latest,
        };

        match self.trail.submit_execution(&record).await {
            Ok(_) => {
                info!(tx_hash, node_id, "Execution recorded");
                Ok(LedgerStatus::Recorded)
            }
            Err(e) => {
                let message = e.to_string();
                if crate::Error::signals_onchain_failure(&message) {
                    METRICS.onchain_failures.fetch_add(1, Ordering::Relaxed);
                    error!(tx_hash, error = %message, "Ledger reports transaction failed on-chain");
                    return Err(crate::Error::TransactionFailed {
                        tx_hash: tx_hash.to_string(),
                    });
                }
                METRICS.ledger_record_failures.fetch_add(1, Ordering::Relaxed);
                let absorbed = crate::Error::LedgerRecording(message);
                warn!(tx_hash, error = %absorbed, "Transaction may have succeeded; ledger not updated");
                Ok(LedgerStatus::Unrecorded(absorbed.to_string()))
            }
        }
    }

    /// Convenience wrapper: broadcast then record, strictly in that order.
    /// The claim state machine calls the two halves itself so it can publish
    /// `Sending` and `Recording` in between.
    pub async fn execute(
        &self,
        call: &EvaluationResult,
        node_id: &str,
    ) -> Result<ExecutionOutcome, crate::Error> {
        let wallet = self.connected_wallet()?;
        let broadcast = self.broadcast(wallet, call).await?;
        let ledger = self
            .record(wallet, node_id, &broadcast.transaction_hash)
            .await?;
        Ok(ExecutionOutcome { broadcast, ledger })
    }
}
