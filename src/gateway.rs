use crate::{
    abi::{
        self,
        GamePlayedLog,
        POOL_BALANCE_SELECTOR,
    },
    error::GameError,
    game::{
        ENTRY_FEE_WEI,
        Guess,
    },
    provider::WalletProvider,
    session::WalletSession,
    units::{
        EthAmount,
        format_quantity,
        parse_quantity,
    },
};
use alloy_primitives::{
    Address,
    B256,
    Bytes,
    U256,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{
    debug,
    error,
    info,
};

/// Mainnet deployment of the game contract on Base.
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x8b28c26f733c6c0c978d76aa4f8ab5aa13f6f8b2";

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    #[serde(default)]
    pub transaction_hash: Option<B256>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub logs: Vec<ReceiptLog>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ReceiptLog {
    #[serde(default)]
    pub topics: Vec<B256>,
    #[serde(default)]
    pub data: Bytes,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        self.status
            .as_deref()
            .and_then(parse_quantity)
            .is_some_and(|status| status == U256::from(1u8))
    }

    /// The `GamePlayed` log, falling back to the first log when no topic matches.
    pub fn game_played_log(&self) -> Option<&ReceiptLog> {
        let topic = abi::game_played_topic();
        self.logs
            .iter()
            .find(|log| log.topics.first() == Some(&topic))
            .or_else(|| self.logs.first())
    }

    pub fn decode_game_played(&self) -> Result<GamePlayedLog, GameError> {
        let log = self
            .game_played_log()
            .ok_or_else(|| GameError::EventDecodeFailed("receipt has no logs".into()))?;
        GamePlayedLog::decode(&log.data)
    }
}

/// Calls against the game contract. Holds only where to send them.
#[derive(Clone, Debug)]
pub struct ChainGateway {
    contract: Address,
    entry_fee: EthAmount,
}

impl ChainGateway {
    pub fn new(contract: Address) -> Self {
        Self {
            contract,
            entry_fee: EthAmount::from_wei_u128(ENTRY_FEE_WEI),
        }
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn entry_fee(&self) -> EthAmount {
        self.entry_fee
    }

    /// Sends `play(guess)` with the entry fee attached from the session's account.
    pub async fn submit_play<P: WalletProvider>(
        &self,
        session: &WalletSession<P>,
        guess: Guess,
    ) -> Result<B256, GameError> {
        let (provider, from) = match (session.provider(), session.address()) {
            (Some(provider), Some(from)) => (provider, from),
            _ => return Err(GameError::NotConnected),
        };
        let data = abi::encode_play(guess);
        let value = format_quantity(self.entry_fee.wei());
        info!(%from, to = %self.contract, %guess, %value, "sending play transaction");
        let response = provider
            .request(
                "eth_sendTransaction",
                json!([{
                    "from": from,
                    "to": self.contract,
                    "value": value,
                    "data": format!("0x{}", hex::encode(&data)),
                }]),
            )
            .await
            .map_err(|err| GameError::SubmissionRejected(err.message))?;
        let tx_hash: B256 = serde_json::from_value(response).map_err(|err| {
            GameError::SubmissionRejected(format!("wallet returned no transaction hash: {err}"))
        })?;
        info!(%tx_hash, "play transaction sent");
        Ok(tx_hash)
    }

    /// One receipt lookup. `Ok(None)` means not mined yet.
    pub async fn fetch_receipt<P: WalletProvider>(
        &self,
        provider: &P,
        tx_hash: B256,
    ) -> Result<Option<TransactionReceipt>, GameError> {
        let response = provider
            .request("eth_getTransactionReceipt", json!([tx_hash]))
            .await
            .map_err(|err| GameError::ReceiptReadTransient(err.to_string()))?;
        if response.is_null() {
            return Ok(None);
        }
        serde_json::from_value(response)
            .map(Some)
            .map_err(|err| GameError::ReceiptReadTransient(format!("malformed receipt: {err}")))
    }

    /// Current prize pool. Read failures show up as an empty pool.
    pub async fn fetch_pool_balance<P: WalletProvider>(&self, provider: &P) -> EthAmount {
        let result = provider
            .request(
                "eth_call",
                json!([
                    {
                        "to": self.contract,
                        "data": format!("0x{}", hex::encode(POOL_BALANCE_SELECTOR)),
                    },
                    "latest"
                ]),
            )
            .await;
        let balance = match result {
            Ok(value) => value.as_str().and_then(parse_quantity),
            Err(err) => {
                error!(%err, "pool balance read failed");
                return EthAmount::ZERO;
            }
        };
        match balance {
            Some(wei) => {
                debug!(%wei, "pool balance");
                EthAmount::from_wei(wei)
            }
            None => {
                error!("pool balance read returned a non-quantity");
                EthAmount::ZERO
            }
        }
    }

    /// Native balance of `address`, or `None` when the read fails.
    pub async fn fetch_wallet_balance<P: WalletProvider>(
        &self,
        provider: &P,
        address: Address,
    ) -> Option<EthAmount> {
        match provider
            .request("eth_getBalance", json!([address, "latest"]))
            .await
        {
            Ok(value) => value
                .as_str()
                .and_then(parse_quantity)
                .map(EthAmount::from_wei),
            Err(err) => {
                error!(%err, %address, "wallet balance read failed");
                None
            }
        }
    }
}
