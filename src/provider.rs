//! Wallet providers: anything that answers EIP-1193 style `request` calls.
//!
//! Two kinds exist, probed in a fixed order by a [`ProviderSource`]: a wallet embedded
//! by the hosting app, then a generic injected wallet endpoint. Only injected
//! providers report account and network changes.

use alloy_primitives::Address;
use serde::Deserialize;
use serde_json::{
    Value,
    json,
};
use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{
            AtomicU64,
            Ordering,
        },
    },
    time::Duration,
};
use tokio::{
    sync::mpsc,
    time,
};
use tracing::{
    debug,
    warn,
};

pub const USER_REJECTED: i64 = 4001;
pub const UNRECOGNIZED_CHAIN: i64 = 4902;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const TRANSPORT_ERROR: i64 = -32603;

const CHANGE_WATCH_INTERVAL: Duration = Duration::from_secs(4);

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("provider error {code}: {message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(TRANSPORT_ERROR, message)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProviderKind {
    EmbeddedHost,
    Injected,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
}

pub trait WalletProvider: Clone {
    fn kind(&self) -> ProviderKind;

    fn request(
        &self,
        method: &str,
        params: Value,
    ) -> impl Future<Output = Result<Value, RpcError>>;

    /// Change notifications, or `None` when this provider cannot report them.
    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<ProviderEvent>>;
}

/// Finds providers in priority order.
pub trait ProviderSource {
    type Provider: WalletProvider;

    /// The wallet of the hosting app, if running inside one that answers.
    fn embedded_host(&self) -> impl Future<Output = Option<Self::Provider>>;

    fn injected(&self) -> Option<Self::Provider>;
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    #[serde(default)]
    message: String,
}

/// JSON-RPC over HTTP to a wallet endpoint that holds the user's keys.
#[derive(Clone, Debug)]
pub struct HttpProvider {
    kind: ProviderKind,
    url: String,
    http: reqwest::Client,
    next_id: Arc<AtomicU64>,
}

impl HttpProvider {
    pub fn new(kind: ProviderKind, url: impl Into<String>) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RpcError::transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            kind,
            url: url.into(),
            http,
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(%method, id, "provider request");
        let res = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::transport(format!("{method} request failed: {e}")))?;
        let status = res.status();
        let response: RpcResponse = res.json().await.map_err(|e| {
            RpcError::transport(format!("{method} returned {status} with invalid body: {e}"))
        })?;
        if let Some(err) = response.error {
            return Err(RpcError::new(err.code, err.message));
        }
        Ok(response.result.unwrap_or(Value::Null))
    }
}

impl WalletProvider for HttpProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        self.call(method, params).await
    }

    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<ProviderEvent>> {
        if self.kind != ProviderKind::Injected {
            return None;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(watch_changes(self.clone(), tx));
        Some(rx)
    }
}

/// Last seen accounts and chain id. The first observation of each only sets the
/// baseline; later ones yield an event when the value differs.
#[derive(Debug, Default)]
struct ChangeTracker {
    accounts: Option<Vec<Address>>,
    chain: Option<u64>,
}

impl ChangeTracker {
    fn observe_accounts(&mut self, now: Vec<Address>) -> Option<ProviderEvent> {
        let prev = self.accounts.replace(now.clone());
        prev.is_some_and(|prev| prev != now)
            .then_some(ProviderEvent::AccountsChanged(now))
    }

    fn observe_chain(&mut self, now: u64) -> Option<ProviderEvent> {
        let prev = self.chain.replace(now);
        prev.is_some_and(|prev| prev != now)
            .then_some(ProviderEvent::ChainChanged(now))
    }
}

/// Polls accounts and chain id, emitting an event whenever either moves. Stops
/// once the receiving session is gone.
async fn watch_changes(provider: HttpProvider, tx: mpsc::UnboundedSender<ProviderEvent>) {
    let mut ticker = time::interval(CHANGE_WATCH_INTERVAL);
    let mut tracker = ChangeTracker::default();
    loop {
        ticker.tick().await;
        if tx.is_closed() {
            debug!(url = %provider.url, "change watcher stopped");
            break;
        }
        let mut events = Vec::new();
        match provider.call("eth_accounts", json!([])).await {
            Ok(value) => match serde_json::from_value::<Vec<Address>>(value) {
                Ok(accounts) => events.extend(tracker.observe_accounts(accounts)),
                Err(err) => warn!(?err, "eth_accounts returned unexpected payload"),
            },
            Err(err) => debug!(?err, "account watch request failed"),
        }
        match provider.call("eth_chainId", json!([])).await {
            Ok(value) => {
                let chain = value
                    .as_str()
                    .and_then(crate::units::parse_quantity)
                    .and_then(|q| u64::try_from(q).ok());
                match chain {
                    Some(chain) => events.extend(tracker.observe_chain(chain)),
                    None => warn!(?value, "eth_chainId returned unexpected payload"),
                }
            }
            Err(err) => debug!(?err, "chain watch request failed"),
        }
        for event in events {
            if tx.send(event).is_err() {
                return;
            }
        }
    }
}

/// Provider endpoints taken from configuration.
#[derive(Clone, Debug, Default)]
pub struct HttpProviderSource {
    pub host_url: Option<String>,
    pub injected_url: Option<String>,
}

impl ProviderSource for HttpProviderSource {
    type Provider = HttpProvider;

    async fn embedded_host(&self) -> Option<HttpProvider> {
        let url = self.host_url.as_ref()?;
        let provider = HttpProvider::new(ProviderKind::EmbeddedHost, url.clone()).ok()?;
        // the host endpoint only counts when it answers
        match provider.request("eth_chainId", json!([])).await {
            Ok(_) => Some(provider),
            Err(err) => {
                debug!(?err, %url, "embedded host wallet did not answer");
                None
            }
        }
    }

    fn injected(&self) -> Option<HttpProvider> {
        let url = self.injected_url.as_ref()?;
        match HttpProvider::new(ProviderKind::Injected, url.clone()) {
            Ok(provider) => Some(provider),
            Err(err) => {
                warn!(?err, %url, "could not build injected wallet provider");
                None
            }
        }
    }
}
