//! Wire types for the Trail API.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Which logical run of the trail a request attaches to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExecutionSelector {
    Latest,
    New,
    Manual {
        #[serde(rename = "executionId")]
        execution_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputValue {
    pub value: String,
}

/// Named input overrides for one node, keyed by input path (`inputs._tokenId`).
pub type NodeInputs = BTreeMap<String, InputValue>;

/// Input overrides keyed by node id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserInputs(BTreeMap<String, NodeInputs>);

impl UserInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `path = value` on `node_id`.
    pub fn with(mut self, node_id: &str, path: &str, value: impl Into<String>) -> Self {
        self.0.entry(node_id.to_string()).or_default().insert(
            path.to_string(),
            InputValue {
                value: value.into(),
            },
        );
        self
    }

    pub fn node(&self, node_id: &str) -> Option<&NodeInputs> {
        self.0.get(node_id)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRequest {
    pub wallet_address: String,
    pub user_inputs: UserInputs,
    pub execution: ExecutionSelector,
}

/// Calldata produced by evaluating a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub contract_address: String,
    pub call_data: String,
    /// Decimal wei string.
    #[serde(default)]
    pub payable_amount: String,
    #[serde(default)]
    pub final_input_values: BTreeMap<String, String>,
}

/// Transaction hash handed to the execution ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub node_id: String,
    pub transaction_hash: String,
    pub wallet_address: String,
    pub execution: ExecutionSelector,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadNodeRequest {
    pub wallet_address: String,
    pub user_inputs: UserInputs,
    pub execution: ExecutionSelector,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeOutput {
    #[serde(default)]
    pub value: Value,
}

/// Raw read-node outputs keyed by output name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReadNodeResponse {
    #[serde(default)]
    pub outputs: BTreeMap<String, NodeOutput>,
}

impl ReadNodeResponse {
    pub fn output(&self, name: &str) -> Option<&Value> {
        self.outputs.get(name).map(|o| &o.value).filter(|v| !v.is_null())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub wallet_addresses: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutionHistory {
    #[serde(default)]
    pub totals: HistoryTotals,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryTotals {
    #[serde(default)]
    pub transactions: u64,
    #[serde(default)]
    pub wallets: u64,
    /// Either an array indexed by step or an object keyed by step number.
    #[serde(default)]
    pub step_stats: Value,
}

impl HistoryTotals {
    /// Transactions recorded for `step`.
    pub fn step_transactions(&self, step: usize) -> Vec<StepTransaction> {
        let stats = match &self.step_stats {
            Value::Array(items) => items.get(step),
            Value::Object(map) => map.get(&step.to_string()),
            _ => None,
        };
        stats
            .and_then(|s| s.get("transactionHashes"))
            .and_then(|txs| serde_json::from_value(txs.clone()).ok())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepTransaction {
    pub tx_hash: String,
    pub wallet_address: String,
    #[serde(default)]
    pub block_timestamp: u64,
    #[serde(default)]
    pub farcaster_data: Option<FarcasterProfile>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarcasterProfile {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub pfp_url: Option<String>,
}
