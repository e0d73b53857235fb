//! Read-only activity feed: aggregate mint totals and recent claims.

use serde::Serialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::Config;
use crate::metrics::METRICS;
use crate::trail::{ExecutionHistory, StepTransaction, TrailClient};
use crate::wallet::WalletSession;

/// Step whose transactions are the mints.
const CLAIM_STEP_INDEX: usize = 1;
const RECENT_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MintActivity {
    pub tx_hash: String,
    pub wallet_address: String,
    pub block_timestamp: u64,
    /// Farcaster username, else the shortened wallet.
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub explorer_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivitySnapshot {
    pub total_mints: u64,
    pub total_wallets: u64,
    pub recent: Vec<MintActivity>,
    pub fetched_at: u64,
}

impl ActivitySnapshot {
    pub fn from_history(history: &ExecutionHistory, explorer_tx_base: &str, fetched_at: u64) -> Self {
        let recent = history
            .totals
            .step_transactions(CLAIM_STEP_INDEX)
            .into_iter()
            .take(RECENT_LIMIT)
            .map(|tx| MintActivity::from_step(tx, explorer_tx_base))
            .collect();
        Self {
            total_mints: history.totals.transactions,
            total_wallets: history.totals.wallets,
            recent,
            fetched_at,
        }
    }
}

impl MintActivity {
    fn from_step(tx: StepTransaction, explorer_tx_base: &str) -> Self {
        let profile = tx.farcaster_data.unwrap_or_default();
        Self {
            display_name: profile
                .username
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| short_address(&tx.wallet_address)),
            avatar_url: profile.pfp_url,
            explorer_url: format!("{explorer_tx_base}{}", tx.tx_hash),
            tx_hash: tx.tx_hash,
            wallet_address: tx.wallet_address,
            block_timestamp: tx.block_timestamp,
        }
    }
}

/// `0x1234...abcd`.
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// Polls execution history on an interval and on wallet change. A failed poll
/// keeps the previous snapshot.
pub struct ActivityFeed {
    trail: Arc<TrailClient>,
    session: Arc<WalletSession>,
    interval: Duration,
    explorer_tx_base: String,
    latest: watch::Sender<Option<ActivitySnapshot>>,
}

impl ActivityFeed {
    pub fn new(config: &Config, trail: Arc<TrailClient>, session: Arc<WalletSession>) -> Self {
        let (latest, _rx) = watch::channel(None);
        Self {
            trail,
            session,
            interval: config.activity_poll_interval(),
            explorer_tx_base: config.explorer_tx_base.clone(),
            latest,
        }
    }

    pub fn latest(&self) -> Option<ActivitySnapshot> {
        self.latest.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ActivitySnapshot>> {
        self.latest.subscribe()
    }

    /// Fetch once. On failure the previous snapshot stays in place.
    pub async fn poll(&self) -> Result<ActivitySnapshot, crate::Error> {
        METRICS.activity_polls.fetch_add(1, Ordering::Relaxed);
        let wallets: Vec<String> = self
            .session
            .address()
            .map(|a| vec![a.to_string()])
            .unwrap_or_default();

        match self.trail.query_execution_history(&wallets).await {
            Ok(history) => {
                let snapshot =
                    ActivitySnapshot::from_history(&history, &self.explorer_tx_base, now_secs());
                debug!(
                    mints = snapshot.total_mints,
                    wallets = snapshot.total_wallets,
                    recent = snapshot.recent.len(),
                    "Activity refreshed"
                );
                self.latest.send_replace(Some(snapshot.clone()));
                Ok(snapshot)
            }
            Err(e) => {
                METRICS.activity_poll_errors.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "Activity poll failed, keeping previous snapshot");
                Err(e)
            }
        }
    }

    /// Poll until `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut changes = self.session.subscribe();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    ticker.reset();
                }
            }
            let _ = self.poll().await;
        }
        debug!("Activity poller stopped");
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
