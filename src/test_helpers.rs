//! Scripted wallet provider for driving sessions and plays without a node.

use crate::provider::{
    METHOD_NOT_FOUND,
    ProviderEvent,
    ProviderKind,
    ProviderSource,
    RpcError,
    WalletProvider,
};
use alloy_primitives::{
    Address,
    B256,
    U256,
};
use serde_json::{
    Value,
    json,
};
use std::{
    collections::{
        HashMap,
        VecDeque,
    },
    sync::{
        Arc,
        Mutex,
    },
};
use tokio::sync::mpsc;

type Script = HashMap<String, VecDeque<Result<Value, RpcError>>>;

/// Answers each method from a queue of scripted responses. The last response
/// queued for a method keeps being returned once the others are used up.
#[derive(Clone)]
pub struct MockProvider {
    kind: ProviderKind,
    script: Arc<Mutex<Script>>,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
    notifications: bool,
    events: Arc<Mutex<Option<mpsc::UnboundedSender<ProviderEvent>>>>,
}

impl MockProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            script: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            notifications: false,
            events: Arc::new(Mutex::new(None)),
        }
    }

    pub fn injected() -> Self {
        Self::new(ProviderKind::Injected).with_notifications()
    }

    pub fn embedded_host() -> Self {
        Self::new(ProviderKind::EmbeddedHost)
    }

    /// A wallet that hands out `account` and already sits on the target chain.
    pub fn ready_wallet(account: Address) -> Self {
        let provider = Self::injected();
        provider.respond("eth_requestAccounts", json!([account]));
        provider.respond("wallet_switchEthereumChain", Value::Null);
        provider
    }

    pub fn with_notifications(mut self) -> Self {
        self.notifications = true;
        self
    }

    pub fn respond(&self, method: &str, value: Value) -> &Self {
        self.push(method, Ok(value))
    }

    pub fn fail(&self, method: &str, code: i64, message: &str) -> &Self {
        self.push(method, Err(RpcError::new(code, message)))
    }

    /// Drops whatever is still scripted for `method`.
    pub fn clear(&self, method: &str) -> &Self {
        self.script.lock().unwrap().remove(method);
        self
    }

    fn push(&self, method: &str, response: Result<Value, RpcError>) -> &Self {
        self.script
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params)
            .collect()
    }

    /// Pushes a change notification to whoever subscribed.
    pub fn emit(&self, event: ProviderEvent) -> bool {
        self.events
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|tx| tx.send(event).is_ok())
    }
}

impl WalletProvider for MockProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), params));
        let mut script = self.script.lock().unwrap();
        let Some(queue) = script.get_mut(method) else {
            return Err(RpcError::new(
                METHOD_NOT_FOUND,
                format!("{method} not scripted"),
            ));
        };
        match queue.len() {
            0 => Err(RpcError::new(METHOD_NOT_FOUND, format!("{method} not scripted"))),
            1 => queue[0].clone(),
            _ => queue.pop_front().unwrap_or_else(|| {
                Err(RpcError::new(METHOD_NOT_FOUND, format!("{method} not scripted")))
            }),
        }
    }

    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<ProviderEvent>> {
        if !self.notifications {
            return None;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        *self.events.lock().unwrap() = Some(tx);
        Some(rx)
    }
}

#[derive(Clone, Default)]
pub struct MockProviderSource {
    pub embedded: Option<MockProvider>,
    pub injected: Option<MockProvider>,
}

impl MockProviderSource {
    pub fn injected(provider: MockProvider) -> Self {
        Self {
            embedded: None,
            injected: Some(provider),
        }
    }
}

impl ProviderSource for MockProviderSource {
    type Provider = MockProvider;

    async fn embedded_host(&self) -> Option<MockProvider> {
        self.embedded.clone()
    }

    fn injected(&self) -> Option<MockProvider> {
        self.injected.clone()
    }
}

pub fn account(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

pub fn tx_hash(byte: u8) -> B256 {
    B256::repeat_byte(byte)
}

/// Hex log data of a `GamePlayed` event's non-indexed words.
pub fn game_played_data(guess: u8, winning_number: u8, won: bool, prize_wei: u128) -> String {
    let words: Vec<u8> = [
        U256::from(guess),
        U256::from(winning_number),
        U256::from(won as u8),
        U256::from(prize_wei),
    ]
    .iter()
    .flat_map(|w| w.to_be_bytes::<32>())
    .collect();
    format!("0x{}", hex::encode(words))
}

/// Receipt JSON as a node returns it.
pub fn receipt_json(hash: B256, success: bool, log_data: Option<String>) -> Value {
    let logs = match log_data {
        Some(data) => json!([{
            "topics": [crate::abi::game_played_topic(), B256::left_padding_from(&[0x11; 20])],
            "data": data,
        }]),
        None => json!([]),
    };
    json!({
        "transactionHash": hash,
        "status": if success { "0x1" } else { "0x0" },
        "logs": logs,
    })
}
