pub mod abi;

pub mod error;

pub mod game;

pub mod gateway;

pub mod history;

pub mod lifecycle;

pub mod provider;

pub mod session;

pub mod units;

pub mod test_helpers;

pub use error::GameError;
pub use game::{
    Guess,
    PlayOutcome,
    PlayRequest,
};
pub use gateway::ChainGateway;
pub use history::{
    HistoryEntry,
    HistoryStore,
};
pub use lifecycle::{
    PlayLifecycle,
    PlayResult,
    PlayState,
};
pub use session::WalletSession;
pub use units::EthAmount;
