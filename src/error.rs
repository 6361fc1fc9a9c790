use thiserror::Error;

/// Failures a connection attempt or a play attempt can end with.
///
/// Cloneable so a failure can be carried inside a lifecycle state and handed to
/// every observer of that state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("no wallet provider found; open this game from a wallet-capable host")]
    NoProviderFound,

    #[error("wallet returned no accounts")]
    NoAccountsReturned,

    #[error("failed to switch wallet to chain {chain_id}: {reason}")]
    NetworkSwitchFailed { chain_id: u64, reason: String },

    #[error("wallet is not connected")]
    NotConnected,

    #[error("transaction rejected: {0}")]
    SubmissionRejected(String),

    #[error("transaction not confirmed after {attempts} attempts; check your wallet")]
    ConfirmationTimeout { attempts: u32 },

    #[error("receipt read failed: {0}")]
    ReceiptReadTransient(String),

    #[error("could not decode GamePlayed event: {0}")]
    EventDecodeFailed(String),

    #[error("stored history is corrupt: {0}")]
    PersistenceCorrupt(String),
}

impl GameError {
    /// Errors the poll loop swallows and retries.
    pub fn is_transient(&self) -> bool {
        matches!(self, GameError::ReceiptReadTransient(_))
    }
}
