use anyhow::Result;
use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use drop_claimer::wallet::{BroadcastResult, SignerRequest};
use drop_claimer::{AppState, Config, WalletSigner};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const TRAIL_ID: &str = "trail-1";
pub const VERSION_ID: &str = "version-1";
pub const APP_ID: &str = "app-1";
pub const PRIMARY_NODE: &str = "node-primary";
pub const CONDITION_NODE: &str = "node-condition";
pub const USDC_NODE: &str = "node-usdc";
pub const WALLET: &str = "0x1111111111111111111111111111111111111111";
pub const TX_HASH: &str = "0xdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef";
pub const MAX_UINT256: &str =
    "115792089237316195423570985008687907853269984665640564039457584007913129639935";

/// Canned HTTP reply.
#[derive(Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl Reply {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    pub fn error(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            body: Value::String(message.to_string()),
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> axum::response::Response {
        match self.body {
            Value::String(text) if !self.status.is_success() => {
                (self.status, text).into_response()
            }
            body => (self.status, Json(body)).into_response(),
        }
    }
}

/// One request seen by the mock.
#[derive(Clone, Debug)]
pub struct Call {
    pub op: &'static str,
    pub target: String,
    pub body: Value,
    pub app_id: Option<String>,
}

/// In-process stand-in for the Trail API and an IPFS gateway.
pub struct MockTrail {
    pub condition: Mutex<Value>,
    pub usdc_balance: Mutex<String>,
    pub evaluation: Mutex<Reply>,
    pub submit: Mutex<Reply>,
    pub history: Mutex<Reply>,
    pub read_failure: Mutex<Option<Reply>>,
    pub ipfs: Mutex<HashMap<String, Value>>,
    pub calls: Mutex<Vec<Call>>,
}

impl MockTrail {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            condition: Mutex::new(condition_fields("0", MAX_UINT256, "3", None)),
            usdc_balance: Mutex::new("0".into()),
            evaluation: Mutex::new(Reply::ok(json!({
                "contractAddress": "0xabc",
                "callData": "0x1234",
                "payableAmount": "0",
                "finalInputValues": {"inputs._quantity": "1"}
            }))),
            submit: Mutex::new(Reply::ok(json!({"ok": true}))),
            history: Mutex::new(Reply::ok(json!({
                "totals": {"transactions": 0, "wallets": 0, "stepStats": []}
            }))),
            read_failure: Mutex::new(None),
            ipfs: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn set_condition(&self, fields: Value) {
        *self.condition.lock().unwrap() = fields;
    }

    pub fn set_submit(&self, reply: Reply) {
        *self.submit.lock().unwrap() = reply;
    }

    pub fn set_evaluation(&self, reply: Reply) {
        *self.evaluation.lock().unwrap() = reply;
    }

    pub fn set_history(&self, reply: Reply) {
        *self.history.lock().unwrap() = reply;
    }

    pub fn calls(&self, op: &str) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.op == op)
            .cloned()
            .collect()
    }

    fn record(&self, op: &'static str, target: String, headers: &HeaderMap, body: Value) {
        self.calls.lock().unwrap().push(Call {
            op,
            target,
            body,
            app_id: headers
                .get("Herd-Trail-App-Id")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        });
    }
}

/// `{name, value}` list as returned by the condition node.
pub fn condition_fields(price: &str, max: &str, claimed: &str, metadata: Option<&str>) -> Value {
    let mut fields = vec![
        json!({"name": "startTimestamp", "value": "0"}),
        json!({"name": "maxClaimableSupply", "value": max}),
        json!({"name": "supplyClaimed", "value": claimed}),
        json!({"name": "pricePerToken", "value": price}),
        json!({"name": "endTimestamp", "value": "0"}),
    ];
    if let Some(uri) = metadata {
        fields.push(json!({"name": "metadata", "value": uri}));
    }
    Value::Array(fields)
}

type Mock = State<Arc<MockTrail>>;

async fn evaluate(
    State(mock): Mock,
    Path((_, _, step)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    mock.record("evaluate", step, &headers, body);
    mock.evaluation.lock().unwrap().clone()
}

async fn submit(
    State(mock): Mock,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    mock.record("submit", String::new(), &headers, body);
    mock.submit.lock().unwrap().clone()
}

async fn query(State(mock): Mock, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    mock.record("history", String::new(), &headers, body);
    mock.history.lock().unwrap().clone()
}

async fn read(
    State(mock): Mock,
    Path((_, _, node)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    mock.record("read", node.clone(), &headers, body);
    if let Some(failure) = mock.read_failure.lock().unwrap().clone() {
        return failure;
    }
    if node == USDC_NODE {
        let balance = mock.usdc_balance.lock().unwrap().clone();
        return Reply::ok(json!({"outputs": {"arg_0": {"value": balance}}}));
    }
    let condition = mock.condition.lock().unwrap().clone();
    Reply::ok(json!({"outputs": {"condition": {"value": condition}}}))
}

async fn ipfs(State(mock): Mock, Path(path): Path<String>, headers: HeaderMap) -> Reply {
    mock.record("ipfs", path.clone(), &headers, Value::Null);
    match mock.ipfs.lock().unwrap().get(&path) {
        Some(doc) => Reply::ok(doc.clone()),
        None => Reply::error(StatusCode::NOT_FOUND, "no such object"),
    }
}

/// Serve `mock` on an ephemeral port.
pub async fn spawn_mock(mock: Arc<MockTrail>) -> Result<SocketAddr> {
    let versioned = "/v1/trails/{trail}/versions/{version}";
    let app = Router::new()
        .route(
            &format!("{versioned}/steps/{{step}}/evaluations"),
            post(evaluate),
        )
        .route(&format!("{versioned}/executions"), post(submit))
        .route(&format!("{versioned}/executions/query"), post(query))
        .route(&format!("{versioned}/nodes/{{node}}/read"), post(read))
        .route("/ipfs/{*path}", get(ipfs))
        .with_state(mock);
    serve(app).await
}

pub async fn serve(app: Router) -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move { axum::serve(listener, app).await });
    Ok(addr)
}

/// Config pointing every collaborator at the mock.
pub fn test_config(addr: SocketAddr, wallet: Option<&str>) -> Config {
    Config {
        trail_api_base: format!("http://{addr}/v1"),
        trail_id: TRAIL_ID.into(),
        version_id: VERSION_ID.into(),
        trail_app_id: APP_ID.into(),
        primary_node_id: PRIMARY_NODE.into(),
        claim_condition_node_id: CONDITION_NODE.into(),
        usdc_read_node_id: USDC_NODE.into(),
        ipfs_gateway: format!("http://{addr}/ipfs/"),
        settle_delay_ms: 20,
        activity_poll_secs: 1,
        wallet_address: wallet.map(str::to_string),
        ..Config::default()
    }
}

/// Wallet signer with a scripted answer and an optional release gate.
pub struct MockSigner {
    pub result: Mutex<Result<String, String>>,
    pub requests: Mutex<Vec<SignerRequest>>,
    pub calls: AtomicUsize,
    pub gate: Option<Arc<Notify>>,
}

impl MockSigner {
    pub fn returning(tx_hash: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Ok(tx_hash.to_string())),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            gate: None,
        })
    }

    pub fn rejecting(message: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Err(message.to_string())),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            gate: None,
        })
    }

    /// Waits on `gate` before answering, like a wallet awaiting approval.
    pub fn gated(tx_hash: &str, gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Ok(tx_hash.to_string())),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            gate: Some(gate),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletSigner for MockSigner {
    async fn send_transaction(
        &self,
        request: &SignerRequest,
    ) -> Result<BroadcastResult, drop_claimer::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match self.result.lock().unwrap().clone() {
            Ok(transaction_hash) => Ok(BroadcastResult { transaction_hash }),
            Err(message) => Err(drop_claimer::Error::SigningRejected(message)),
        }
    }
}

/// Mock trail, signer and wired application state.
pub struct Harness {
    pub mock: Arc<MockTrail>,
    pub signer: Arc<MockSigner>,
    pub state: Arc<AppState>,
    pub addr: SocketAddr,
}

pub async fn harness(wallet: Option<&str>, signer: Arc<MockSigner>) -> Result<Harness> {
    harness_with(wallet, signer, |_| {}).await
}

/// Like [`harness`], with a hook to adjust the config before wiring.
pub async fn harness_with(
    wallet: Option<&str>,
    signer: Arc<MockSigner>,
    configure: impl FnOnce(&mut Config),
) -> Result<Harness> {
    let mock = MockTrail::new();
    let addr = spawn_mock(Arc::clone(&mock)).await?;
    let mut config = test_config(addr, wallet);
    configure(&mut config);
    let state = Arc::new(AppState::with_signer(config, signer.clone())?);
    Ok(Harness {
        mock,
        signer,
        state,
        addr,
    })
}
