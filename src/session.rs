use crate::{
    error::GameError,
    provider::{
        METHOD_NOT_FOUND,
        ProviderEvent,
        ProviderSource,
        UNRECOGNIZED_CHAIN,
        WalletProvider,
    },
};
use alloy_primitives::Address;
use serde_json::{
    Value,
    json,
};
use tokio::sync::mpsc;
use tracing::{
    debug,
    info,
    warn,
};

pub const BASE_CHAIN_ID: u64 = 8453;

/// The single network the game contract lives on.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TargetChain {
    pub chain_id: u64,
    pub name: &'static str,
    pub rpc_url: &'static str,
    pub explorer_url: &'static str,
}

impl TargetChain {
    pub fn base() -> Self {
        Self {
            chain_id: BASE_CHAIN_ID,
            name: "Base",
            rpc_url: "https://mainnet.base.org",
            explorer_url: "https://basescan.org",
        }
    }

    pub fn hex_id(&self) -> String {
        format!("{:#x}", self.chain_id)
    }

    fn add_chain_params(&self) -> Value {
        json!([{
            "chainId": self.hex_id(),
            "chainName": self.name,
            "nativeCurrency": {
                "name": "Ethereum",
                "symbol": "ETH",
                "decimals": 18,
            },
            "rpcUrls": [self.rpc_url],
            "blockExplorerUrls": [self.explorer_url],
        }])
    }
}

/// How a provider notification changed the session.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SessionChange {
    Disconnected,
    AccountSwitched(Address),
    NetworkChanged { chain_id: u64, on_target: bool },
    Unchanged,
}

/// Connection state for one wallet. `address` is only ever set while connected.
pub struct WalletSession<P> {
    target: TargetChain,
    provider: Option<P>,
    address: Option<Address>,
    network: Option<u64>,
    events: Option<mpsc::UnboundedReceiver<ProviderEvent>>,
}

impl<P: WalletProvider> WalletSession<P> {
    pub fn new(target: TargetChain) -> Self {
        Self {
            target,
            provider: None,
            address: None,
            network: None,
            events: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.address.is_some()
    }

    pub fn address(&self) -> Option<Address> {
        self.address
    }

    pub fn provider(&self) -> Option<&P> {
        self.provider.as_ref()
    }

    pub fn network(&self) -> Option<u64> {
        self.network
    }

    pub fn target(&self) -> &TargetChain {
        &self.target
    }

    pub fn on_target_network(&self) -> bool {
        self.network == Some(self.target.chain_id)
    }

    /// Connects through the embedded host wallet when it yields accounts, otherwise
    /// through the injected wallet. Already connected sessions are left as they are.
    pub async fn connect<S>(&mut self, source: &S) -> Result<Address, GameError>
    where
        S: ProviderSource<Provider = P>,
    {
        if let Some(address) = self.address {
            return Ok(address);
        }

        let mut chosen = None;
        if let Some(host) = source.embedded_host().await {
            match request_accounts(&host).await {
                Ok(accounts) if !accounts.is_empty() => chosen = Some((host, accounts)),
                Ok(_) => debug!("embedded host wallet returned no accounts"),
                Err(err) => debug!(%err, "embedded host wallet refused accounts"),
            }
        }
        let (provider, accounts) = match chosen {
            Some(found) => found,
            None => {
                let injected = source.injected().ok_or(GameError::NoProviderFound)?;
                let accounts = request_accounts(&injected).await?;
                (injected, accounts)
            }
        };
        let address = *accounts.first().ok_or(GameError::NoAccountsReturned)?;

        self.provider = Some(provider);
        self.ensure_network().await?;

        self.address = Some(address);
        self.events = self.provider.as_ref().and_then(|p| p.subscribe());
        info!(
            %address,
            kind = ?self.provider.as_ref().map(|p| p.kind()),
            notifications = self.events.is_some(),
            "wallet connected"
        );
        Ok(address)
    }

    /// Asks the wallet to switch to the target chain, adding it when the wallet
    /// does not know it yet.
    pub async fn ensure_network(&mut self) -> Result<(), GameError> {
        let provider = self.provider.as_ref().ok_or(GameError::NotConnected)?;
        let chain_id = self.target.chain_id;
        let switch = provider
            .request(
                "wallet_switchEthereumChain",
                json!([{ "chainId": self.target.hex_id() }]),
            )
            .await;
        match switch {
            Ok(_) => {}
            Err(err) if err.code == UNRECOGNIZED_CHAIN => {
                info!(chain_id, "wallet does not know target chain; adding it");
                provider
                    .request("wallet_addEthereumChain", self.target.add_chain_params())
                    .await
                    .map_err(|e| GameError::NetworkSwitchFailed {
                        chain_id,
                        reason: e.to_string(),
                    })?;
            }
            Err(err) => {
                return Err(GameError::NetworkSwitchFailed {
                    chain_id,
                    reason: err.to_string(),
                });
            }
        }
        self.network = Some(chain_id);
        Ok(())
    }

    pub fn disconnect(&mut self) {
        if let Some(address) = self.address.take() {
            info!(%address, "wallet disconnected");
        }
        self.events = None;
    }

    pub fn on_accounts_changed(&mut self, accounts: &[Address]) -> SessionChange {
        match accounts.first() {
            None => {
                self.disconnect();
                SessionChange::Disconnected
            }
            Some(first) if self.address == Some(*first) => SessionChange::Unchanged,
            Some(first) => {
                info!(address = %first, "wallet account switched");
                self.address = Some(*first);
                SessionChange::AccountSwitched(*first)
            }
        }
    }

    pub fn on_chain_changed(&mut self, chain_id: u64) -> SessionChange {
        self.network = Some(chain_id);
        let on_target = self.on_target_network();
        if !on_target {
            warn!(chain_id, target = self.target.chain_id, "wallet left target chain");
        }
        SessionChange::NetworkChanged {
            chain_id,
            on_target,
        }
    }

    pub fn handle_event(&mut self, event: ProviderEvent) -> SessionChange {
        match event {
            ProviderEvent::AccountsChanged(accounts) => self.on_accounts_changed(&accounts),
            ProviderEvent::ChainChanged(chain_id) => self.on_chain_changed(chain_id),
        }
    }

    /// Waits for the next provider notification; pends forever without one.
    pub async fn next_event(&mut self) -> ProviderEvent {
        if let Some(rx) = self.events.as_mut() {
            if let Some(event) = rx.recv().await {
                return event;
            }
            self.events = None;
        }
        std::future::pending().await
    }
}

async fn request_accounts<P: WalletProvider>(provider: &P) -> Result<Vec<Address>, GameError> {
    let response = match provider.request("eth_requestAccounts", json!([])).await {
        Err(err) if err.code == METHOD_NOT_FOUND => {
            provider.request("eth_accounts", json!([])).await
        }
        other => other,
    };
    let value = response.map_err(|err| {
        warn!(%err, "wallet refused account access");
        GameError::NoAccountsReturned
    })?;
    serde_json::from_value(value).map_err(|err| {
        warn!(%err, "wallet returned malformed account list");
        GameError::NoAccountsReturned
    })
}
