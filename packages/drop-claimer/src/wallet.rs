//! Wallet session and signing collaborator.

use alloy_primitives::Address;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Signed-in wallet identity, shared explicitly with everything that needs it.
pub struct WalletSession {
    address: watch::Sender<Option<Address>>,
}

impl WalletSession {
    pub fn new(address: Option<Address>) -> Self {
        let (tx, _rx) = watch::channel(address);
        Self { address: tx }
    }

    pub fn address(&self) -> Option<Address> {
        *self.address.borrow()
    }

    pub fn is_signed_in(&self) -> bool {
        self.address().is_some()
    }

    /// Switch to `address`. Observers are only woken on an actual change.
    pub fn sign_in(&self, address: Address) {
        let changed = self.address.send_if_modified(|current| {
            if *current == Some(address) {
                return false;
            }
            *current = Some(address);
            true
        });
        if changed {
            info!(wallet = %address, "Wallet signed in");
        }
    }

    pub fn sign_out(&self) {
        let changed = self.address.send_if_modified(|current| current.take().is_some());
        if changed {
            info!("Wallet signed out");
        }
    }

    /// Receiver woken on every address change.
    pub fn subscribe(&self) -> watch::Receiver<Option<Address>> {
        self.address.subscribe()
    }
}

/// EIP-1559 transaction handed to the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub to: String,
    pub data: String,
    /// Decimal wei.
    pub value: String,
    pub chain_id: u64,
    #[serde(rename = "type")]
    pub tx_type: String,
    pub gas: String,
}

/// Transaction plus the account and network that must sign it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignerRequest {
    pub transaction: TransactionRequest,
    pub evm_account: String,
    pub network: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastResult {
    pub transaction_hash: String,
}

/// Signs and broadcasts a prepared call. May suspend for user approval; a
/// rejection surfaces as `Error::SigningRejected`.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    async fn send_transaction(&self, request: &SignerRequest)
        -> Result<BroadcastResult, crate::Error>;
}

/// Wallet service reached over HTTP.
pub struct RemoteSigner {
    http: reqwest::Client,
    url: String,
}

const SIGNER_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

impl RemoteSigner {
    pub fn new(signer_url: &str) -> Result<Self, crate::Error> {
        // No request timeout: signing can wait on interactive approval.
        let http = reqwest::Client::builder()
            .connect_timeout(SIGNER_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| crate::Error::Config(format!("HTTP client build failed: {e}")))?;
        Ok(Self {
            http,
            url: format!("{}/transactions", signer_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl WalletSigner for RemoteSigner {
    async fn send_transaction(
        &self,
        request: &SignerRequest,
    ) -> Result<BroadcastResult, crate::Error> {
        debug!(to = %request.transaction.to, account = %request.evm_account, "Requesting signature");

        let response = self
            .http
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| crate::Error::SigningRejected(format!("signer unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body_text, "Signer rejected transaction");
            return Err(crate::Error::SigningRejected(if body_text.is_empty() {
                format!("signer returned HTTP {status}")
            } else {
                body_text
            }));
        }

        response
            .json()
            .await
            .map_err(|e| crate::Error::SigningRejected(format!("invalid signer response: {e}")))
    }
}
