use alloy_primitives::Address;
use clap::{
    Parser,
    ValueEnum,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use lucky_ten::{
    gateway::DEFAULT_CONTRACT_ADDRESS,
    lifecycle::{
        ConfirmationPolicy,
        FallbackPolicy,
    },
    provider::HttpProviderSource,
};
use std::{
    path::PathBuf,
    time::Duration,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum FallbackArg {
    /// Leave unreadable outcomes unresolved
    Unresolved,
    /// Report unreadable outcomes as a loss against a locally drawn number
    RandomDraw,
}

impl From<FallbackArg> for FallbackPolicy {
    fn from(arg: FallbackArg) -> Self {
        match arg {
            FallbackArg::Unresolved => FallbackPolicy::Unresolved,
            FallbackArg::RandomDraw => FallbackPolicy::RandomDraw,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "lucky-ten",
    about = "Pick a number from 1 to 10 and play it against the Base contract"
)]
pub struct Cli {
    /// JSON-RPC endpoint of the wallet that signs for you
    #[arg(long, env = "LUCKY_TEN_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Wallet endpoint exposed by a hosting app, tried before --rpc-url
    #[arg(long, env = "LUCKY_TEN_HOST_RPC_URL")]
    pub host_rpc_url: Option<String>,

    /// Game contract address
    #[arg(long, default_value = DEFAULT_CONTRACT_ADDRESS)]
    pub contract: String,

    #[arg(long, default_value = "~/.lucky-ten/history.json")]
    pub history_file: String,

    #[arg(long, default_value = "~/.lucky-ten/logs")]
    pub log_dir: String,

    /// What to show when a mined play's outcome cannot be decoded
    #[arg(long, value_enum, default_value_t = FallbackArg::Unresolved)]
    pub fallback: FallbackArg,

    #[arg(long, default_value_t = 2)]
    pub poll_interval_secs: u64,

    #[arg(long, default_value_t = 30)]
    pub max_poll_attempts: u32,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub source: HttpProviderSource,
    pub contract: Address,
    pub history_file: PathBuf,
    pub log_dir: PathBuf,
    pub confirmation: ConfirmationPolicy,
    pub fallback: FallbackPolicy,
}

impl Cli {
    pub fn into_config(self) -> Result<AppConfig> {
        let contract: Address = self
            .contract
            .parse()
            .wrap_err_with(|| format!("invalid contract address {}", self.contract))?;
        if self.poll_interval_secs == 0 {
            return Err(eyre!("--poll-interval-secs must be at least 1"));
        }
        if self.max_poll_attempts == 0 {
            return Err(eyre!("--max-poll-attempts must be at least 1"));
        }
        Ok(AppConfig {
            source: HttpProviderSource {
                host_url: self.host_rpc_url,
                injected_url: self.rpc_url,
            },
            contract,
            history_file: expand_path(&self.history_file),
            log_dir: expand_path(&self.log_dir),
            confirmation: ConfirmationPolicy {
                interval: Duration::from_secs(self.poll_interval_secs),
                max_attempts: self.max_poll_attempts,
            },
            fallback: self.fallback.into(),
        })
    }
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}
