//! One play attempt, from submission to a terminal result.
//!
//! `Idle -> Submitting -> AwaitingReceipt -> Resolving -> Finished`, where
//! `Finished` carries a won, lost, failed, or unresolved result. Each step is its
//! own method so the poll bound and the resolution rules can be driven directly;
//! [`PlayLifecycle::run`] strings them together against a live gateway.

use crate::{
    error::GameError,
    game::{
        Guess,
        MAX_GUESS,
        MIN_GUESS,
        PlayOutcome,
        PlayRequest,
    },
    gateway::{
        ChainGateway,
        TransactionReceipt,
    },
    provider::WalletProvider,
    session::WalletSession,
};
use alloy_primitives::B256;
use rand::Rng;
use std::time::Duration;
use tokio::{
    sync::watch,
    time,
};
use tracing::{
    debug,
    error,
    info,
    warn,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 30;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ConfirmationPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

/// What to report when a mined play cannot be read back from its receipt.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum FallbackPolicy {
    /// Leave the play unresolved and point the user at the transaction.
    #[default]
    Unresolved,
    /// Report a loss against a locally drawn number.
    RandomDraw,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PlayResult {
    Won {
        outcome: PlayOutcome,
        tx_hash: B256,
    },
    Lost {
        outcome: PlayOutcome,
        tx_hash: B256,
    },
    Failed {
        request: PlayRequest,
        reason: GameError,
    },
    Unresolved {
        request: PlayRequest,
        tx_hash: B256,
        reason: GameError,
    },
}

impl PlayResult {
    pub fn label(&self) -> &'static str {
        match self {
            PlayResult::Won { .. } => "won",
            PlayResult::Lost { .. } => "lost",
            PlayResult::Failed { .. } => "failed",
            PlayResult::Unresolved { .. } => "unresolved",
        }
    }

    pub fn outcome(&self) -> Option<&PlayOutcome> {
        match self {
            PlayResult::Won { outcome, .. } | PlayResult::Lost { outcome, .. } => Some(outcome),
            PlayResult::Failed { .. } | PlayResult::Unresolved { .. } => None,
        }
    }

    pub fn tx_hash(&self) -> Option<B256> {
        match self {
            PlayResult::Won { tx_hash, .. }
            | PlayResult::Lost { tx_hash, .. }
            | PlayResult::Unresolved { tx_hash, .. } => Some(*tx_hash),
            PlayResult::Failed { .. } => None,
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum PlayState {
    #[default]
    Idle,
    Submitting {
        request: PlayRequest,
    },
    AwaitingReceipt {
        request: PlayRequest,
        tx_hash: B256,
        attempts: u32,
    },
    Resolving {
        request: PlayRequest,
        tx_hash: B256,
    },
    Finished(PlayResult),
}

impl PlayState {
    pub fn label(&self) -> &'static str {
        match self {
            PlayState::Idle => "idle",
            PlayState::Submitting { .. } => "submitting",
            PlayState::AwaitingReceipt { .. } => "awaiting-receipt",
            PlayState::Resolving { .. } => "resolving",
            PlayState::Finished(result) => result.label(),
        }
    }

    /// Between a submit and the result being taken.
    pub fn is_in_flight(&self) -> bool {
        !matches!(self, PlayState::Idle)
    }
}

#[derive(Debug)]
pub enum PollStep {
    Pending { attempts: u32 },
    Receipt(TransactionReceipt),
    Exhausted,
    NotAwaiting,
}

pub struct PlayLifecycle {
    state: PlayState,
    confirmation: ConfirmationPolicy,
    fallback: FallbackPolicy,
    transitions: watch::Sender<PlayState>,
}

impl PlayLifecycle {
    pub fn new(confirmation: ConfirmationPolicy, fallback: FallbackPolicy) -> Self {
        let (transitions, _) = watch::channel(PlayState::Idle);
        Self {
            state: PlayState::Idle,
            confirmation,
            fallback,
            transitions,
        }
    }

    pub fn state(&self) -> &PlayState {
        &self.state
    }

    pub fn confirmation(&self) -> ConfirmationPolicy {
        self.confirmation
    }

    /// Every state the lifecycle enters, starting from the current one.
    pub fn subscribe(&self) -> watch::Receiver<PlayState> {
        self.transitions.subscribe()
    }

    fn transition(&mut self, next: PlayState) {
        debug!(from = self.state.label(), to = next.label(), "play transition");
        self.state = next.clone();
        self.transitions.send_replace(next);
    }

    /// Starts a play. `ready` means connected on the target network; without it,
    /// without a guess, or with a play already in flight this is a no-op.
    pub fn begin(&mut self, ready: bool, guess: Option<Guess>) -> Option<PlayRequest> {
        if self.state.is_in_flight() {
            warn!(state = self.state.label(), "play already in flight; ignoring submit");
            return None;
        }
        let Some(guess) = guess.filter(|_| ready) else {
            debug!(ready, "submit ignored without a ready wallet and a guess");
            return None;
        };
        let request = PlayRequest::new(guess);
        info!(%guess, fee = %request.entry_fee, "submitting play");
        self.transition(PlayState::Submitting { request });
        Some(request)
    }

    pub fn record_submission(&mut self, submitted: Result<B256, GameError>) {
        let PlayState::Submitting { request } = self.state else {
            warn!(state = self.state.label(), "submission result outside submitting state");
            return;
        };
        match submitted {
            Ok(tx_hash) => self.transition(PlayState::AwaitingReceipt {
                request,
                tx_hash,
                attempts: 0,
            }),
            Err(reason) => {
                error!(%reason, "play submission failed");
                self.transition(PlayState::Finished(PlayResult::Failed { request, reason }));
            }
        }
    }

    /// Counts one receipt lookup. Transient read errors are tolerated until the
    /// attempt bound runs out; any other error fails the play at once.
    pub fn record_poll(
        &mut self,
        read: Result<Option<TransactionReceipt>, GameError>,
    ) -> PollStep {
        let PlayState::AwaitingReceipt {
            request,
            tx_hash,
            attempts,
        } = self.state
        else {
            return PollStep::NotAwaiting;
        };
        let attempts = attempts + 1;
        match read {
            Ok(Some(receipt)) => {
                info!(%tx_hash, attempts, "receipt found");
                self.transition(PlayState::Resolving { request, tx_hash });
                return PollStep::Receipt(receipt);
            }
            Ok(None) => debug!(%tx_hash, attempts, "waiting for confirmation"),
            Err(err) if err.is_transient() => {
                debug!(%tx_hash, attempts, %err, "receipt read failed; retrying")
            }
            Err(reason) => {
                error!(%tx_hash, %reason, "receipt polling aborted");
                self.transition(PlayState::Finished(PlayResult::Failed { request, reason }));
                return PollStep::Exhausted;
            }
        }
        if attempts >= self.confirmation.max_attempts {
            let reason = GameError::ConfirmationTimeout { attempts };
            error!(%tx_hash, %reason, "gave up waiting for receipt");
            self.transition(PlayState::Finished(PlayResult::Failed { request, reason }));
            PollStep::Exhausted
        } else {
            self.transition(PlayState::AwaitingReceipt {
                request,
                tx_hash,
                attempts,
            });
            PollStep::Pending { attempts }
        }
    }

    pub fn resolve(&mut self, receipt: &TransactionReceipt) {
        let PlayState::Resolving { request, tx_hash } = self.state else {
            warn!(state = self.state.label(), "receipt resolved outside resolving state");
            return;
        };
        let result = if receipt.succeeded() {
            match receipt.decode_game_played() {
                Ok(log) => {
                    if log.guess != request.guess.value() {
                        warn!(sent = %request.guess, echoed = log.guess, "contract echoed a different guess");
                    }
                    let outcome = PlayOutcome {
                        guess: request.guess,
                        winning_number: Some(log.winning_number),
                        won: log.won,
                        prize: log.prize,
                    };
                    if outcome.won {
                        PlayResult::Won { outcome, tx_hash }
                    } else {
                        PlayResult::Lost { outcome, tx_hash }
                    }
                }
                Err(reason) => match self.fallback {
                    FallbackPolicy::Unresolved => {
                        warn!(%tx_hash, %reason, "outcome unreadable; play left unresolved");
                        PlayResult::Unresolved {
                            request,
                            tx_hash,
                            reason,
                        }
                    }
                    FallbackPolicy::RandomDraw => {
                        warn!(%tx_hash, %reason, "outcome unreadable; reporting a drawn loss");
                        PlayResult::Lost {
                            outcome: PlayOutcome::lost(request.guess, Some(draw_number())),
                            tx_hash,
                        }
                    }
                },
            }
        } else {
            warn!(%tx_hash, "play transaction reverted");
            let winning_number = match self.fallback {
                FallbackPolicy::Unresolved => None,
                FallbackPolicy::RandomDraw => Some(draw_number()),
            };
            PlayResult::Lost {
                outcome: PlayOutcome::lost(request.guess, winning_number),
                tx_hash,
            }
        };
        info!(result = result.label(), %tx_hash, "play finished");
        self.transition(PlayState::Finished(result));
    }

    /// Hands out the terminal result and returns to `Idle`.
    pub fn take_result(&mut self) -> Option<PlayResult> {
        if !matches!(self.state, PlayState::Finished(_)) {
            return None;
        }
        let PlayState::Finished(result) = std::mem::take(&mut self.state) else {
            return None;
        };
        self.transitions.send_replace(PlayState::Idle);
        Some(result)
    }

    /// Drives one play to completion. Returns `None` when the submit was a no-op;
    /// otherwise the lifecycle is back at `Idle` when this returns.
    pub async fn run<P: WalletProvider>(
        &mut self,
        session: &WalletSession<P>,
        gateway: &ChainGateway,
        guess: Option<Guess>,
    ) -> Option<PlayResult> {
        let ready = session.is_connected() && session.on_target_network();
        let request = self.begin(ready, guess)?;
        let submitted = gateway.submit_play(session, request.guess).await;
        self.record_submission(submitted);

        if let PlayState::AwaitingReceipt { tx_hash, .. } = self.state {
            loop {
                time::sleep(self.confirmation.interval).await;
                let read = match session.provider() {
                    Some(provider) => gateway.fetch_receipt(provider, tx_hash).await,
                    None => Err(GameError::NotConnected),
                };
                match self.record_poll(read) {
                    PollStep::Pending { .. } => continue,
                    PollStep::Receipt(receipt) => {
                        self.resolve(&receipt);
                        break;
                    }
                    PollStep::Exhausted | PollStep::NotAwaiting => break,
                }
            }
        }
        self.take_result()
    }
}

fn draw_number() -> u8 {
    rand::rng().random_range(MIN_GUESS..=MAX_GUESS)
}
