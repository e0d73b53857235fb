//! Claim condition reads, NFT metadata and the latest-snapshot store.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::metrics::METRICS;
use crate::trail::{TrailClient, UserInputs};
use crate::units::{self, Supply, USDC_DECIMALS};
use crate::wallet::WalletSession;

const IPFS_SCHEME: &str = "ipfs://";

/// Condition fields keyed by name. The API returns an ordered `{name, value}`
/// list whose order is not stable, so it is indexed once here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionFields(HashMap<String, String>);

impl ConditionFields {
    pub fn from_output(output: Option<&Value>) -> Self {
        let mut fields = HashMap::new();
        if let Some(Value::Array(items)) = output {
            for item in items {
                let Some(name) = item.get("name").and_then(Value::as_str) else {
                    continue;
                };
                let value = item.get("value").map(value_to_string).unwrap_or_default();
                // First occurrence wins.
                fields.entry(name.to_string()).or_insert(value);
            }
        }
        Self(fields)
    }

    /// Field value, `"0"` when absent.
    pub fn get_or_zero(&self, name: &str) -> &str {
        self.0.get(name).map(String::as_str).unwrap_or("0")
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str).filter(|s| !s.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn number(&self, name: &str) -> Result<U256, crate::Error> {
        units::parse_u256(name, self.get_or_zero(name))
    }

    fn timestamp(&self, name: &str) -> Result<u64, crate::Error> {
        Ok(u64::try_from(self.number(name)?).unwrap_or(u64::MAX))
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// On-chain claim parameters for one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimCondition {
    /// Raw 6-decimal units.
    pub price_per_token: U256,
    pub max_claimable_supply: Supply,
    pub supply_claimed: U256,
    pub start_timestamp: u64,
    pub end_timestamp: u64,
    pub metadata_uri: Option<String>,
}

/// Whether the drop can be claimed right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropStatus {
    NotConfigured,
    NotStarted,
    Ended,
    Open,
}

impl ClaimCondition {
    pub fn from_fields(fields: &ConditionFields) -> Result<Self, crate::Error> {
        Ok(Self {
            price_per_token: fields.number("pricePerToken")?,
            max_claimable_supply: Supply::from_raw(fields.number("maxClaimableSupply")?),
            supply_claimed: fields.number("supplyClaimed")?,
            start_timestamp: fields.timestamp("startTimestamp")?,
            end_timestamp: fields.timestamp("endTimestamp")?,
            metadata_uri: fields.text("metadata").map(str::to_string),
        })
    }

    pub fn is_configured(&self) -> bool {
        !self.max_claimable_supply.is_unconfigured()
    }

    pub fn remaining(&self) -> Supply {
        self.max_claimable_supply.remaining(self.supply_claimed)
    }

    /// Window check is informational; the evaluator enforces it on-chain.
    /// An end timestamp of zero means the window never closes.
    pub fn status(&self, now: u64) -> DropStatus {
        if !self.is_configured() {
            DropStatus::NotConfigured
        } else if now < self.start_timestamp {
            DropStatus::NotStarted
        } else if self.end_timestamp != 0 && now >= self.end_timestamp {
            DropStatus::Ended
        } else {
            DropStatus::Open
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Rewrite `ipfs://<path>` to `<gateway>/<path>`; other URIs pass through.
pub fn rewrite_ipfs(uri: &str, gateway: &str) -> String {
    match uri.strip_prefix(IPFS_SCHEME) {
        Some(path) => format!("{}/{}", gateway.trim_end_matches('/'), path),
        None => uri.to_string(),
    }
}

/// A condition read together with its best-effort metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionSnapshot {
    pub condition: ClaimCondition,
    pub metadata: Option<NftMetadata>,
}

/// Display projection of a snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct ConditionView {
    pub price: String,
    pub price_raw: String,
    pub max_supply: String,
    pub claimed: String,
    pub remaining: String,
    /// `None` hides the progress bar.
    pub progress_bps: Option<u64>,
    pub status: DropStatus,
    pub claimable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub start_timestamp: u64,
    pub end_timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<NftMetadata>,
}

impl ConditionSnapshot {
    pub fn view(&self, now: u64) -> ConditionView {
        let c = &self.condition;
        let price = if c.price_per_token.is_zero() {
            "FREE".to_string()
        } else {
            format!("{} USDC", units::format_units(c.price_per_token, USDC_DECIMALS))
        };
        let status = c.status(now);
        ConditionView {
            price,
            price_raw: c.price_per_token.to_string(),
            max_supply: c.max_claimable_supply.to_string(),
            claimed: c.supply_claimed.to_string(),
            remaining: c.remaining().to_string(),
            progress_bps: c.max_claimable_supply.progress_bps(c.supply_claimed),
            status,
            claimable: status != DropStatus::NotConfigured,
            message: (status == DropStatus::NotConfigured)
                .then(|| crate::Error::DropNotConfigured.to_string()),
            start_timestamp: c.start_timestamp,
            end_timestamp: c.end_timestamp,
            metadata: self.metadata.clone(),
        }
    }
}

/// Reads claim conditions and balances through the Trail read-node operation.
pub struct ConditionReader {
    trail: Arc<TrailClient>,
    http: reqwest::Client,
    primary_node_id: String,
    condition_node_id: String,
    usdc_node_id: String,
    token_id: String,
    condition_id: String,
    ipfs_gateway: String,
}

impl ConditionReader {
    pub fn new(config: &Config, trail: Arc<TrailClient>) -> Self {
        Self {
            trail,
            http: reqwest::Client::new(),
            primary_node_id: config.primary_node_id.clone(),
            condition_node_id: config.claim_condition_node_id.clone(),
            usdc_node_id: config.usdc_read_node_id.clone(),
            token_id: config.token_id.clone(),
            condition_id: config.condition_id.clone(),
            ipfs_gateway: config.ipfs_gateway.clone(),
        }
    }

    /// Read the current condition. Unauthenticated reads use the zero address.
    pub async fn read(&self, wallet: Option<Address>) -> Result<ConditionSnapshot, crate::Error> {
        let wallet = wallet.unwrap_or(Address::ZERO).to_string();
        let inputs = UserInputs::new()
            .with(&self.primary_node_id, "inputs._tokenId", &self.token_id)
            .with(&self.condition_node_id, "inputs._tokenId", &self.token_id)
            .with(&self.condition_node_id, "inputs._conditionId", &self.condition_id);

        let response = self
            .trail
            .read_node(&self.condition_node_id, &wallet, inputs, None)
            .await?;

        let fields = ConditionFields::from_output(response.output("condition"));
        if fields.is_empty() {
            warn!(node_id = %self.condition_node_id, "No condition in read response");
        }
        let condition = ClaimCondition::from_fields(&fields)?;
        debug!(
            price = %condition.price_per_token,
            max = %condition.max_claimable_supply,
            claimed = %condition.supply_claimed,
            start = condition.start_timestamp,
            end = condition.end_timestamp,
            "Claim condition read"
        );

        let metadata = match condition.metadata_uri.as_deref() {
            Some(uri) => match self.fetch_metadata(uri).await {
                Ok(m) => Some(m),
                Err(e) => {
                    METRICS.metadata_errors.fetch_add(1, Ordering::Relaxed);
                    warn!(uri, error = %e, "NFT metadata unavailable");
                    None
                }
            },
            None => None,
        };

        Ok(ConditionSnapshot {
            condition,
            metadata,
        })
    }

    /// Fetch and normalise the metadata document behind `uri`.
    pub async fn fetch_metadata(&self, uri: &str) -> Result<NftMetadata, crate::Error> {
        let url = rewrite_ipfs(uri, &self.ipfs_gateway);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| crate::Error::MetadataFetch(e.to_string()))?;
        if !response.status().is_success() {
            return Err(crate::Error::MetadataFetch(format!(
                "HTTP {} from {url}",
                response.status()
            )));
        }
        let mut metadata: NftMetadata = response
            .json()
            .await
            .map_err(|e| crate::Error::MetadataFetch(format!("invalid metadata: {e}")))?;
        metadata.image = metadata
            .image
            .map(|image| rewrite_ipfs(&image, &self.ipfs_gateway));
        Ok(metadata)
    }

    /// Raw USDC balance (6 decimals) of `wallet`.
    pub async fn read_usdc_balance(&self, wallet: Address) -> Result<U256, crate::Error> {
        let wallet = wallet.to_string();
        let inputs = UserInputs::new().with(&self.usdc_node_id, "inputs.account", &wallet);
        let response = self
            .trail
            .read_node(&self.usdc_node_id, &wallet, inputs, None)
            .await?;
        let raw = response.output("arg_0").map(value_to_string).unwrap_or_default();
        units::parse_u256("arg_0", &raw)
    }
}

/// Latest condition snapshot, refreshed on wallet change and after claims.
pub struct ConditionStore {
    reader: Arc<ConditionReader>,
    session: Arc<WalletSession>,
    latest: watch::Sender<Option<ConditionSnapshot>>,
}

impl ConditionStore {
    pub fn new(reader: Arc<ConditionReader>, session: Arc<WalletSession>) -> Self {
        let (latest, _rx) = watch::channel(None);
        Self {
            reader,
            session,
            latest,
        }
    }

    pub fn reader(&self) -> &ConditionReader {
        &self.reader
    }

    pub fn latest(&self) -> Option<ConditionSnapshot> {
        self.latest.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ConditionSnapshot>> {
        self.latest.subscribe()
    }

    /// Re-read for the current session wallet and keep the result.
    pub async fn refresh(&self) -> Result<ConditionSnapshot, crate::Error> {
        let snapshot = self.reader.read(self.session.address()).await?;
        self.latest.send_replace(Some(snapshot.clone()));
        Ok(snapshot)
    }

    /// Cached snapshot, reading once if nothing is cached yet.
    pub async fn current(&self) -> Result<ConditionSnapshot, crate::Error> {
        match self.latest() {
            Some(snapshot) => Ok(snapshot),
            None => self.refresh().await,
        }
    }

    /// Refresh now and on every wallet change until `cancel` fires.
    pub async fn run_session_watch(self: Arc<Self>, cancel: CancellationToken) {
        let mut changes = self.session.subscribe();
        loop {
            if let Err(e) = self.refresh().await {
                warn!(error = %e, "Claim condition refresh failed");
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let wallet = *changes.borrow_and_update();
                    info!(wallet = ?wallet, "Wallet changed, re-reading claim condition");
                }
            }
        }
        debug!("Condition watcher stopped");
    }
}
