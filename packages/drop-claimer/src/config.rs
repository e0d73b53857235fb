//! Claimer configuration.

use serde::Deserialize;
use std::time::Duration;

/// Configuration for the drop claimer. Every field defaults to the production
/// trail so an empty environment is runnable.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "defaults::trail_api_base")]
    pub trail_api_base: String,

    #[serde(default = "defaults::trail_id")]
    pub trail_id: String,

    #[serde(default = "defaults::version_id")]
    pub version_id: String,

    /// Sent as `Herd-Trail-App-Id` on every Trail API request.
    #[serde(default = "defaults::trail_app_id")]
    pub trail_app_id: String,

    #[serde(default = "defaults::primary_node_id")]
    pub primary_node_id: String,

    #[serde(default = "defaults::claim_condition_node_id")]
    pub claim_condition_node_id: String,

    #[serde(default = "defaults::usdc_read_node_id")]
    pub usdc_read_node_id: String,

    #[serde(default = "defaults::token_id")]
    pub token_id: String,

    #[serde(default = "defaults::condition_id")]
    pub condition_id: String,

    #[serde(default = "defaults::claim_step")]
    pub claim_step: u32,

    #[serde(default = "defaults::chain_id")]
    pub chain_id: u64,

    #[serde(default = "defaults::network")]
    pub network: String,

    #[serde(default = "defaults::gas_limit")]
    pub gas_limit: u64,

    #[serde(default = "defaults::ipfs_gateway")]
    pub ipfs_gateway: String,

    #[serde(default = "defaults::explorer_tx_base")]
    pub explorer_tx_base: String,

    #[serde(default = "defaults::settle_delay_ms")]
    pub settle_delay_ms: u64,

    #[serde(default = "defaults::activity_poll_secs")]
    pub activity_poll_secs: u64,

    /// Wallet signed in at startup. `None` starts signed out.
    #[serde(default)]
    pub wallet_address: Option<String>,

    #[serde(default = "defaults::signer_url")]
    pub signer_url: String,

    #[serde(default = "defaults::bind_address")]
    pub bind_address: String,

    /// Required on `/claim` and `/session` when set (`CLAIMER_API_KEY`).
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Config {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn activity_poll_interval(&self) -> Duration {
        Duration::from_secs(self.activity_poll_secs.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trail_api_base: defaults::trail_api_base(),
            trail_id: defaults::trail_id(),
            version_id: defaults::version_id(),
            trail_app_id: defaults::trail_app_id(),
            primary_node_id: defaults::primary_node_id(),
            claim_condition_node_id: defaults::claim_condition_node_id(),
            usdc_read_node_id: defaults::usdc_read_node_id(),
            token_id: defaults::token_id(),
            condition_id: defaults::condition_id(),
            claim_step: defaults::claim_step(),
            chain_id: defaults::chain_id(),
            network: defaults::network(),
            gas_limit: defaults::gas_limit(),
            ipfs_gateway: defaults::ipfs_gateway(),
            explorer_tx_base: defaults::explorer_tx_base(),
            settle_delay_ms: defaults::settle_delay_ms(),
            activity_poll_secs: defaults::activity_poll_secs(),
            wallet_address: None,
            signer_url: defaults::signer_url(),
            bind_address: defaults::bind_address(),
            api_key: None,
        }
    }
}

mod defaults {
    pub fn trail_api_base() -> String {
        "https://trails-api.herd.eco/v1".into()
    }

    pub fn trail_id() -> String {
        "01990c7d-7084-7bca-9986-5ee9ac9d9f91".into()
    }

    pub fn version_id() -> String {
        "01990c7d-708d-7869-9c4a-590203690c0a".into()
    }

    pub fn trail_app_id() -> String {
        "01990bf2-ea7c-7973-807d-b623f473ad7c".into()
    }

    pub fn primary_node_id() -> String {
        "01990c7d-708f-7eda-b441-5e5207a99c0d".into()
    }

    pub fn claim_condition_node_id() -> String {
        "01990c7d-7090-7b98-a726-9606bfd85ae9".into()
    }

    pub fn usdc_read_node_id() -> String {
        "01990c7d-7090-7b98-a726-96059742778a".into()
    }

    pub fn token_id() -> String {
        "0".into()
    }

    pub fn condition_id() -> String {
        "0".into()
    }

    pub fn claim_step() -> u32 {
        1
    }

    /// Base mainnet.
    pub fn chain_id() -> u64 {
        8453
    }

    pub fn network() -> String {
        "base".into()
    }

    pub fn gas_limit() -> u64 {
        300_000
    }

    pub fn ipfs_gateway() -> String {
        "https://ipfs.io/ipfs/".into()
    }

    pub fn explorer_tx_base() -> String {
        "https://herd.eco/base/tx/".into()
    }

    pub fn settle_delay_ms() -> u64 {
        5_000
    }

    pub fn activity_poll_secs() -> u64 {
        60
    }

    pub fn signer_url() -> String {
        "http://127.0.0.1:3050".into()
    }

    pub fn bind_address() -> String {
        "0.0.0.0:3060".into()
    }
}
