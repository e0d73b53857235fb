//! Application state shared across handlers.

use crate::activity::ActivityFeed;
use crate::claim::ClaimStateMachine;
use crate::condition::{ConditionReader, ConditionStore};
use crate::config::Config;
use crate::executor::TransactionExecutor;
use crate::trail::TrailClient;
use crate::wallet::{RemoteSigner, WalletSession, WalletSigner};
use alloy_primitives::Address;
use std::str::FromStr;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub session: Arc<WalletSession>,
    pub conditions: Arc<ConditionStore>,
    pub claims: Arc<ClaimStateMachine>,
    pub activity: Arc<ActivityFeed>,
    pub start_time: Instant,
    pub request_count: AtomicU64,
}

impl AppState {
    /// Build state with the HTTP wallet signer from `config.signer_url`.
    pub fn new(config: Config) -> Result<Self, crate::Error> {
        let signer = Arc::new(RemoteSigner::new(&config.signer_url)?);
        Self::with_signer(config, signer)
    }

    /// Build state around any wallet signer.
    pub fn with_signer(
        config: Config,
        signer: Arc<dyn WalletSigner>,
    ) -> Result<Self, crate::Error> {
        let wallet = config
            .wallet_address
            .as_deref()
            .filter(|a| !a.is_empty())
            .map(|a| {
                Address::from_str(a)
                    .map_err(|e| crate::Error::Config(format!("Invalid wallet address: {e}")))
            })
            .transpose()?;
        let session = Arc::new(WalletSession::new(wallet));

        let trail = Arc::new(TrailClient::new(&config)?);
        info!(base = trail.base_url(), "Trail API client ready");

        let reader = Arc::new(ConditionReader::new(&config, Arc::clone(&trail)));
        let conditions = Arc::new(ConditionStore::new(reader, Arc::clone(&session)));
        let executor = Arc::new(TransactionExecutor::new(
            &config,
            signer,
            Arc::clone(&trail),
            Arc::clone(&session),
        ));
        let claims = Arc::new(ClaimStateMachine::new(
            &config,
            Arc::clone(&trail),
            executor,
            Arc::clone(&conditions),
        ));
        let activity = Arc::new(ActivityFeed::new(&config, trail, Arc::clone(&session)));

        Ok(Self {
            config,
            session,
            conditions,
            claims,
            activity,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
        })
    }
}
