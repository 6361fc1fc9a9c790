use crate::{
    config::AppConfig,
    ui,
};
use alloy_primitives::Address;
use chrono::Utc;
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use lucky_ten::{
    ChainGateway,
    EthAmount,
    GameError,
    Guess,
    HistoryEntry,
    HistoryStore,
    PlayLifecycle,
    PlayResult,
    PlayState,
    WalletSession,
    history::{
        FileHistoryBackend,
        HistoryBackend,
    },
    provider::{
        ProviderEvent,
        ProviderSource,
    },
    session::{
        SessionChange,
        TargetChain,
    },
};
use tokio::sync::watch;
use tracing::{
    error,
    info,
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResultView {
    pub title: String,
    pub message: String,
    pub won: bool,
}

#[derive(Clone, Debug)]
pub struct AppSnapshot {
    pub connected: bool,
    pub address: Option<String>,
    pub balance: Option<EthAmount>,
    pub network: Option<u64>,
    pub on_target_network: bool,
    pub pool: EthAmount,
    pub entry_fee: EthAmount,
    pub selected: Option<Guess>,
    pub play: PlayState,
    pub status: String,
    pub errors: Vec<String>,
    pub history: Vec<HistoryEntry>,
    pub result: Option<ResultView>,
}

pub struct AppController<S: ProviderSource, B> {
    source: S,
    session: WalletSession<S::Provider>,
    gateway: ChainGateway,
    lifecycle: PlayLifecycle,
    history: HistoryStore<B>,
    selected: Option<Guess>,
    pool: EthAmount,
    balance: Option<EthAmount>,
    status: String,
    errors: Vec<String>,
    last_result: Option<PlayResult>,
}

impl<S: ProviderSource, B: HistoryBackend> AppController<S, B> {
    pub fn new(
        source: S,
        gateway: ChainGateway,
        lifecycle: PlayLifecycle,
        history: HistoryStore<B>,
    ) -> Self {
        Self {
            source,
            session: WalletSession::new(TargetChain::base()),
            gateway,
            lifecycle,
            history,
            selected: None,
            pool: EthAmount::ZERO,
            balance: None,
            status: String::from("Connect a wallet to play"),
            errors: Vec::new(),
            last_result: None,
        }
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
        info!(status = %self.status);
    }

    fn push_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("{}", message);
        self.errors.push(message);
        if self.errors.len() > 5 {
            self.errors.remove(0);
        }
    }

    pub async fn connect(&mut self) {
        if self.session.is_connected() {
            return;
        }
        self.set_status("Connecting...");
        match self.session.connect(&self.source).await {
            Ok(address) => {
                self.set_status(format!("Connected {}", format_address(address)));
                self.refresh_balance().await;
                self.refresh_pool().await;
            }
            Err(GameError::NoProviderFound) => {
                self.set_status("No wallet found");
                self.push_error(
                    "No wallet found. Start with --rpc-url <wallet endpoint> or open the \
                     game from a wallet host.",
                );
            }
            Err(err) => {
                self.set_status("Connection failed");
                self.push_error(err.to_string());
            }
        }
    }

    pub fn select(&mut self, guess: Guess) {
        self.selected = Some(guess);
    }

    pub fn select_next(&mut self) {
        self.selected = Some(match self.selected {
            Some(guess) => guess.next(),
            None => Guess::FIRST,
        });
    }

    pub fn select_prev(&mut self) {
        self.selected = Some(match self.selected {
            Some(guess) => guess.prev(),
            None => Guess::LAST,
        });
    }

    pub fn dismiss_result(&mut self) {
        self.last_result = None;
    }

    pub fn play_transitions(&self) -> watch::Receiver<PlayState> {
        self.lifecycle.subscribe()
    }

    pub async fn refresh_pool(&mut self) {
        let provider = self
            .session
            .provider()
            .cloned()
            .or_else(|| self.source.injected());
        if let Some(provider) = provider {
            self.pool = self.gateway.fetch_pool_balance(&provider).await;
        }
    }

    pub async fn refresh_balance(&mut self) {
        let (Some(provider), Some(address)) = (self.session.provider(), self.session.address())
        else {
            self.balance = None;
            return;
        };
        if let Some(balance) = self.gateway.fetch_wallet_balance(provider, address).await {
            self.balance = Some(balance);
        }
    }

    pub async fn next_provider_event(&mut self) -> ProviderEvent {
        self.session.next_event().await
    }

    pub async fn handle_provider_event(&mut self, event: ProviderEvent) {
        match self.session.handle_event(event) {
            SessionChange::Disconnected => {
                self.balance = None;
                self.set_status("Wallet disconnected");
            }
            SessionChange::AccountSwitched(address) => {
                self.set_status(format!("Switched to {}", format_address(address)));
                self.balance = None;
                self.refresh_balance().await;
            }
            SessionChange::NetworkChanged { on_target, .. } => {
                if !on_target {
                    if let Err(err) = self.session.ensure_network().await {
                        self.set_status("Switch the wallet to Base to play");
                        self.push_error(err.to_string());
                    }
                }
                self.refresh_balance().await;
                self.refresh_pool().await;
            }
            SessionChange::Unchanged => {}
        }
    }

    /// Plays the selected number and records whatever it resolves to.
    pub async fn play(&mut self) -> Option<PlayResult> {
        if !self.session.is_connected() {
            self.set_status("Connect a wallet first");
            return None;
        }
        if self.selected.is_none() {
            self.set_status("Pick a number first");
            return None;
        }
        if !self.session.on_target_network() {
            if let Err(err) = self.session.ensure_network().await {
                self.set_status("Switch the wallet to Base to play");
                self.push_error(err.to_string());
                return None;
            }
        }
        let result = self
            .lifecycle
            .run(&self.session, &self.gateway, self.selected)
            .await?;
        self.record_result(&result).await;
        Some(result)
    }

    async fn record_result(&mut self, result: &PlayResult) {
        match result {
            PlayResult::Won { outcome, .. } | PlayResult::Lost { outcome, .. } => {
                self.history
                    .append(HistoryEntry::from_outcome(outcome, Utc::now()));
                self.selected = None;
                self.set_status(if outcome.won { "You won!" } else { "Not this time" });
                self.refresh_pool().await;
                self.refresh_balance().await;
            }
            PlayResult::Failed { reason, .. } => {
                self.set_status("Play failed");
                self.push_error(reason.to_string());
            }
            PlayResult::Unresolved { tx_hash, .. } => {
                self.set_status(format!("Play {tx_hash} mined; outcome unknown"));
                self.refresh_pool().await;
                self.refresh_balance().await;
            }
        }
        self.last_result = Some(result.clone());
    }

    pub fn snapshot(&self) -> AppSnapshot {
        AppSnapshot {
            connected: self.session.is_connected(),
            address: self.session.address().map(format_address),
            balance: self.balance,
            network: self.session.network(),
            on_target_network: self.session.on_target_network(),
            pool: self.pool,
            entry_fee: self.gateway.entry_fee(),
            selected: self.selected,
            play: self.lifecycle.state().clone(),
            status: self.status.clone(),
            errors: self.errors.clone(),
            history: self.history.all().to_vec(),
            result: self
                .last_result
                .as_ref()
                .map(|r| result_view(r, self.session.target())),
        }
    }
}

pub fn format_address(address: Address) -> String {
    let full = address.to_string();
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

pub fn result_view(result: &PlayResult, chain: &TargetChain) -> ResultView {
    match result {
        PlayResult::Won { outcome, .. } => ResultView {
            title: "You Won!".into(),
            message: format!(
                "The number was {}. You won {} ETH!",
                outcome.winning_number.unwrap_or(outcome.guess.value()),
                outcome.prize
            ),
            won: true,
        },
        PlayResult::Lost { outcome, .. } => ResultView {
            title: "Not This Time".into(),
            message: match outcome.winning_number {
                Some(n) => format!(
                    "The number was {n}. Your guess was {}. Try again!",
                    outcome.guess
                ),
                None => format!(
                    "The transaction reverted. Your guess was {}. Try again!",
                    outcome.guess
                ),
            },
            won: false,
        },
        PlayResult::Failed { reason, .. } => ResultView {
            title: "Transaction Failed".into(),
            message: reason.to_string(),
            won: false,
        },
        PlayResult::Unresolved { tx_hash, .. } => ResultView {
            title: "Result Unknown".into(),
            message: format!(
                "Your play was mined but its outcome could not be read. Check {}/tx/{tx_hash}",
                chain.explorer_url
            ),
            won: false,
        },
    }
}

pub fn status_for(state: &PlayState) -> String {
    match state {
        PlayState::Idle => String::from("Ready"),
        PlayState::Submitting { request } => {
            format!("Submitting guess {} ({} ETH)...", request.guess, request.entry_fee)
        }
        PlayState::AwaitingReceipt { attempts, .. } => {
            format!("Confirming... (check {attempts})")
        }
        PlayState::Resolving { .. } => String::from("Reading result..."),
        PlayState::Finished(result) => format!("Finished: {}", result.label()),
    }
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let history = HistoryStore::load(FileHistoryBackend::new(&config.history_file));
    info!(
        entries = history.len(),
        path = %config.history_file.display(),
        "loaded game history"
    );
    let lifecycle = PlayLifecycle::new(config.confirmation, config.fallback);
    let gateway = ChainGateway::new(config.contract);
    let mut controller = AppController::new(config.source, gateway, lifecycle, history);
    controller.refresh_pool().await;

    let mut ui_state = ui::UiState::default();
    let mut input = ui::input_events();
    ui::terminal_enter(&mut ui_state)?;
    info!("UI ready");
    let res = run_loop(&mut controller, &mut ui_state, &mut input).await;
    ui::terminal_exit()?;
    res
}

async fn run_loop<S, B>(
    controller: &mut AppController<S, B>,
    ui_state: &mut ui::UiState,
    input: &mut ui::InputEvents,
) -> Result<()>
where
    S: ProviderSource,
    B: HistoryBackend,
{
    ui::draw(ui_state, &controller.snapshot()).wrap_err("initial draw failed")?;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = controller.next_provider_event() => {
                controller.handle_provider_event(event).await;
            }
            user = ui::next_user_event(ui_state, input) => {
                match user? {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::Redraw => {}
                    ui::UserEvent::Connect => {
                        let mut snapshot = controller.snapshot();
                        snapshot.status = String::from("Connecting...");
                        ui::draw(ui_state, &snapshot).wrap_err("draw before connect failed")?;
                        controller.connect().await;
                    }
                    ui::UserEvent::Select(guess) => controller.select(guess),
                    ui::UserEvent::NextNumber => controller.select_next(),
                    ui::UserEvent::PrevNumber => controller.select_prev(),
                    ui::UserEvent::Play => play_with_progress(controller, ui_state).await?,
                    ui::UserEvent::DismissResult => controller.dismiss_result(),
                }
            }
        }
        ui::draw(ui_state, &controller.snapshot()).wrap_err("draw failed")?;
    }
    Ok(())
}

/// Plays while redrawing on every lifecycle transition.
async fn play_with_progress<S, B>(
    controller: &mut AppController<S, B>,
    ui_state: &mut ui::UiState,
) -> Result<()>
where
    S: ProviderSource,
    B: HistoryBackend,
{
    let mut snapshot = controller.snapshot();
    let mut transitions = controller.play_transitions();
    let play = controller.play();
    tokio::pin!(play);
    loop {
        tokio::select! {
            _ = &mut play => break,
            Ok(()) = transitions.changed() => {
                snapshot.play = transitions.borrow_and_update().clone();
                snapshot.status = status_for(&snapshot.play);
                ui::draw(ui_state, &snapshot).wrap_err("draw during play failed")?;
            }
        }
    }
    Ok(())
}
