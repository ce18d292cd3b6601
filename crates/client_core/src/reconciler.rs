use std::sync::Arc;

use shared::{
    domain::{PlayerId, Snapshot},
    protocol::{LandingOutcome, ServerEvent},
};
use tokio::{
    sync::{broadcast, mpsc, Mutex},
    time::sleep,
};
use tracing::{debug, warn};

use crate::{
    dice::DiceAnimationController,
    notify::{NotificationScheduler, ToastKind},
    sequencer::{
        forced_move_delta, forced_move_params, roll_move_params, AnimationSequencer, MoveKind,
    },
    store::{GameStateStore, MergeOutcome},
    ClientEvent, SoundCue, SoundSink, DICE_SETTLE_DELAY, PENDING_DRAIN_DELAY,
};

/// Messages consumed by the reconciler loop: transport events in arrival
/// order, plus completion signals from spawned animation chains. A single
/// consumer keeps all store and sequencer access serialized without locks
/// beyond the store's own.
pub enum Inbound {
    Server(ServerEvent),
    MoveFinished(MoveFinished),
}

#[derive(Debug)]
pub struct MoveFinished {
    pub kind: MoveKind,
    /// Landing outcome whose side effects were held back until the forced
    /// move resolved.
    pub deferred: Option<LandingOutcome>,
}

/// One-slot deferred queue entry; overwritten, never accumulated.
struct PendingLanding {
    result: LandingOutcome,
    snapshot: Snapshot,
}

/// Classifies each inbound event and routes it to immediate application, the
/// animation sequencer, or the one-slot deferred queue.
pub struct EventReconciler {
    store: Arc<Mutex<GameStateStore>>,
    events: broadcast::Sender<ClientEvent>,
    sounds: Arc<dyn SoundSink>,
    notify: NotificationScheduler,
    dice: DiceAnimationController,
    sequencer: AnimationSequencer,
    pending: Option<PendingLanding>,
}

impl EventReconciler {
    pub fn new(
        store: Arc<Mutex<GameStateStore>>,
        events: broadcast::Sender<ClientEvent>,
        sounds: Arc<dyn SoundSink>,
        notify: NotificationScheduler,
        done_tx: mpsc::Sender<Inbound>,
    ) -> Self {
        let sequencer = AnimationSequencer::new(
            Arc::clone(&store),
            events.clone(),
            Arc::clone(&sounds),
            notify.clone(),
            done_tx,
        );
        Self {
            store,
            events,
            sounds,
            notify,
            dice: DiceAnimationController::new(),
            sequencer,
            pending: None,
        }
    }

    pub async fn run(mut self, mut rx: mpsc::Receiver<Inbound>) {
        while let Some(message) = rx.recv().await {
            match message {
                Inbound::Server(event) => self.handle_server_event(event).await,
                Inbound::MoveFinished(done) => self.handle_move_finished(done).await,
            }
        }
        debug!("inbound channel closed; reconciler stopping");
    }

    async fn handle_server_event(&mut self, event: ServerEvent) {
        debug!(event = event.name(), "processing server event");
        match event {
            ServerEvent::DiceRolled {
                result,
                player_still_in_jail,
                game,
            } => {
                self.handle_dice_rolled(result.total, player_still_in_jail, game)
                    .await;
            }
            ServerEvent::LandingResult { result, game } => {
                if self.sequencer.is_active() {
                    if self
                        .pending
                        .replace(PendingLanding {
                            result,
                            snapshot: game,
                        })
                        .is_some()
                    {
                        debug!("overwriting deferred landing result");
                    }
                } else {
                    self.apply_landing(result, game).await;
                }
            }
            ServerEvent::AuctionEnded {
                winner,
                position,
                amount,
            } => {
                // Notification only; the follow-up snapshot arrives separately.
                let message = {
                    let store = self.store.lock().await;
                    let space = store
                        .snapshot()
                        .and_then(|s| s.spaces.get(usize::from(position)))
                        .map(|s| s.name.clone())
                        .unwrap_or_else(|| format!("space {position}"));
                    match winner.and_then(|id| store.player(id).map(|p| p.name.clone())) {
                        Some(name) => format!("{name} won {space} for ${amount}"),
                        None => format!("No bids; {space} stays with the bank"),
                    }
                };
                self.notify
                    .toast(ToastKind::Info, "Auction ended", message)
                    .await;
            }
            ServerEvent::Error(err) => {
                warn!(code = ?err.code, "authority reported error: {}", err.message);
                self.sounds.play(SoundCue::ErrorBeep);
                self.notify.toast(ToastKind::Error, "Error", err.message).await;
            }
            other => self.apply_immediate(other).await,
        }
    }

    async fn handle_dice_rolled(&mut self, total: u8, still_in_jail: bool, game: Snapshot) {
        self.sounds.play(SoundCue::DiceRoll);

        // Failed jail escape: no movement, just the settle sound once the
        // rolling effect has finished.
        if still_in_jail {
            self.merge_snapshot(game, true).await;
            let sounds = Arc::clone(&self.sounds);
            tokio::spawn(async move {
                sleep(DICE_SETTLE_DELAY).await;
                sounds.play(SoundCue::DiceSettle);
            });
            return;
        }

        // A roll landing while the previous turn still animates cannot start
        // a second task; the stale-merge guard decides what survives.
        if self.sequencer.is_active() {
            self.merge_snapshot(game, true).await;
            return;
        }

        let Some(mover) = game.current_player().map(|p| (p.id, p.position)) else {
            warn!(
                current_player_index = game.current_player_index,
                "dice roll for unknown player index; applying snapshot as-is"
            );
            self.merge_snapshot(game, true).await;
            return;
        };
        let (player_id, end_position) = mover;
        let params = roll_move_params(player_id, end_position, total);

        // Freeze the piece at the computed start before the merge goes out,
        // so no re-render between the two can show the end position.
        {
            self.store.lock().await.set_override(player_id, params.start);
        }
        let outcome = self.merge_snapshot(game, true).await;
        if !outcome.applied {
            self.store.lock().await.clear_override();
            return;
        }

        self.sequencer.start(params, MoveKind::Roll, None);
    }

    async fn apply_landing(&mut self, result: LandingOutcome, game: Snapshot) {
        let mover = game.current_player().map(|p| p.id);
        let forced = match mover {
            Some(player_id) => {
                let start = {
                    let store = self.store.lock().await;
                    store.player(player_id).map(|p| p.position)
                };
                let end = game.player(player_id).map(|p| p.position);
                match (start, end) {
                    (Some(start), Some(end)) => forced_move_delta(&result, start, end)
                        .map(|(steps, direction)| (player_id, start, steps, direction)),
                    _ => None,
                }
            }
            None => None,
        };

        let Some((player_id, start, steps, direction)) = forced else {
            self.merge_snapshot(game, false).await;
            self.apply_landing_effects(&result).await;
            return;
        };

        let params = forced_move_params(player_id, start, steps, direction);
        // Same freeze-then-merge ordering as the dice path.
        {
            self.store.lock().await.set_override(player_id, start);
        }
        self.merge_snapshot(game, false).await;
        self.sequencer.start(params, MoveKind::Forced, Some(result));
    }

    async fn handle_move_finished(&mut self, done: MoveFinished) {
        self.sequencer.finish();
        let _ = self.events.send(ClientEvent::StateChanged);
        debug!(kind = ?done.kind, "move animation finished");

        if let Some(result) = done.deferred {
            self.apply_landing_effects(&result).await;
        }

        if let Some(pending) = self.pending.take() {
            sleep(PENDING_DRAIN_DELAY).await;
            self.apply_landing(pending.result, pending.snapshot).await;
        }
    }

    async fn apply_landing_effects(&mut self, result: &LandingOutcome) {
        match result {
            LandingOutcome::RentPaid { owner, amount } => {
                self.sounds.play(SoundCue::CashOut);
                let owner_name = self.player_name(*owner).await;
                self.notify
                    .toast(
                        ToastKind::Warning,
                        "Rent due",
                        format!("Paid ${amount} to {owner_name}"),
                    )
                    .await;
            }
            LandingOutcome::PropertyAvailable { position, price } => {
                let space = self.space_name(*position).await;
                self.notify
                    .toast(
                        ToastKind::Info,
                        "Property available",
                        format!("{space} can be bought for ${price}"),
                    )
                    .await;
            }
            LandingOutcome::CardDrawn { deck, card } => {
                self.sounds.play(SoundCue::CardDraw);
                self.notify.card(*deck, card.clone()).await;
            }
            LandingOutcome::TaxPaid { amount } => {
                self.sounds.play(SoundCue::CashOut);
                self.notify
                    .toast(ToastKind::Warning, "Tax", format!("Paid ${amount} in tax"))
                    .await;
            }
            LandingOutcome::GoToJail => {
                self.sounds.play(SoundCue::Jail);
                self.notify
                    .toast(ToastKind::Warning, "Go to jail", "Do not collect $200")
                    .await;
            }
            LandingOutcome::FreeParkingCollected { amount } => {
                self.sounds.play(SoundCue::CashIn);
                self.notify
                    .toast(
                        ToastKind::Success,
                        "Free parking",
                        format!("Collected ${amount} from the pool"),
                    )
                    .await;
            }
            LandingOutcome::Idle => {}
        }
    }

    async fn apply_immediate(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::GameCreated { game_id, game } => {
                {
                    self.store.lock().await.set_game_id(game_id);
                }
                self.merge_snapshot(game, false).await;
            }
            ServerEvent::GameJoined {
                game_id,
                player_id,
                game,
            } => {
                {
                    self.store.lock().await.set_session(game_id, player_id);
                }
                self.merge_snapshot(game, false).await;
            }
            ServerEvent::GameRejoined {
                game_id,
                player_id,
                game,
            } => {
                {
                    self.store.lock().await.set_session(game_id, player_id);
                }
                // The identity cache keeps a rejoin from replaying the last
                // roll's animation.
                self.merge_snapshot(game, false).await;
            }
            ServerEvent::PlayerJoined { player_id, game } => {
                self.merge_snapshot(game, false).await;
                let name = self.player_name(player_id).await;
                self.notify
                    .toast(ToastKind::Info, "Player joined", format!("{name} joined"))
                    .await;
            }
            ServerEvent::PlayerLeft { player_id, game } => {
                let name = self.player_name(player_id).await;
                self.merge_snapshot(game, false).await;
                self.notify
                    .toast(ToastKind::Info, "Player left", format!("{name} left"))
                    .await;
            }
            ServerEvent::PlayerDisconnected { player_id, game } => {
                self.merge_snapshot(game, false).await;
                let name = self.player_name(player_id).await;
                self.notify
                    .toast(
                        ToastKind::Warning,
                        "Disconnected",
                        format!("{name} lost connection"),
                    )
                    .await;
            }
            ServerEvent::PlayerReconnected { player_id, game } => {
                self.merge_snapshot(game, false).await;
                let name = self.player_name(player_id).await;
                self.notify
                    .toast(ToastKind::Info, "Reconnected", format!("{name} is back"))
                    .await;
            }
            ServerEvent::GameStarted { game } => {
                self.merge_snapshot(game, false).await;
                self.sounds.play(SoundCue::GameStart);
                self.notify
                    .toast(ToastKind::Success, "Game on", "The game has started")
                    .await;
            }
            ServerEvent::PropertyBought { position, game } => {
                self.merge_snapshot(game, false).await;
                self.sounds.play(SoundCue::CashOut);
                let space = self.space_name(position).await;
                let owner = self.space_owner_name(position).await;
                self.notify
                    .toast(ToastKind::Info, "Sold", format!("{owner} bought {space}"))
                    .await;
            }
            ServerEvent::PropertyDeclined { game, .. } => {
                self.merge_snapshot(game, false).await;
            }
            ServerEvent::HouseBuilt { game, .. } => {
                self.merge_snapshot(game, false).await;
                self.sounds.play(SoundCue::Build);
            }
            ServerEvent::HouseSold { game, .. } => {
                self.merge_snapshot(game, false).await;
                self.sounds.play(SoundCue::CashIn);
            }
            ServerEvent::PropertyMortgaged { game, .. } => {
                self.merge_snapshot(game, false).await;
                self.sounds.play(SoundCue::Mortgage);
            }
            ServerEvent::PropertyUnmortgaged { game, .. } => {
                self.merge_snapshot(game, false).await;
                self.sounds.play(SoundCue::CashOut);
            }
            ServerEvent::AuctionStarted { auction, game } => {
                self.merge_snapshot(game, false).await;
                self.sounds.play(SoundCue::AuctionBid);
                let space = self.space_name(auction.position).await;
                self.notify
                    .toast(ToastKind::Info, "Auction", format!("Bidding opened on {space}"))
                    .await;
            }
            ServerEvent::AuctionUpdate { auction, game } => {
                self.merge_snapshot(game, false).await;
                // Only a rival's bid is worth a sound.
                let local = { self.store.lock().await.local_player_id() };
                if auction.highest_bidder.is_some() && auction.highest_bidder != local {
                    self.sounds.play(SoundCue::AuctionBid);
                }
            }
            ServerEvent::TradeProposed { game, .. } => {
                self.merge_snapshot(game, false).await;
                self.sounds.play(SoundCue::TradeChime);
                self.notify
                    .toast(ToastKind::Info, "Trade", "A trade was proposed")
                    .await;
            }
            ServerEvent::TradeCompleted { game, .. } => {
                self.merge_snapshot(game, false).await;
                self.sounds.play(SoundCue::TradeChime);
                self.notify
                    .toast(ToastKind::Success, "Trade", "Trade completed")
                    .await;
            }
            ServerEvent::TradeDeclined { game, .. } => {
                self.merge_snapshot(game, false).await;
                self.notify
                    .toast(ToastKind::Info, "Trade", "Trade declined")
                    .await;
            }
            ServerEvent::JailFinePaid { game, .. } => {
                self.merge_snapshot(game, false).await;
                self.sounds.play(SoundCue::CashOut);
            }
            ServerEvent::JailCardUsed { game, .. } => {
                self.merge_snapshot(game, false).await;
                self.sounds.play(SoundCue::CardDraw);
            }
            ServerEvent::TurnEnded { game } => {
                self.merge_snapshot(game, false).await;
            }
            ServerEvent::PlayerBankrupt { player_id, game } => {
                let name = self.player_name(player_id).await;
                self.merge_snapshot(game, false).await;
                self.sounds.play(SoundCue::Bankrupt);
                self.notify
                    .toast(ToastKind::Warning, "Bankrupt", format!("{name} is bankrupt"))
                    .await;
            }
            ServerEvent::GameOver { winner, game } => {
                self.merge_snapshot(game, false).await;
                self.sounds.play(SoundCue::GameOver);
                let message = match winner {
                    Some(id) => format!("{} wins the game", self.player_name(id).await),
                    None => "The game is over".to_string(),
                };
                self.notify
                    .toast(ToastKind::Success, "Game over", message)
                    .await;
            }
            // Routed before apply_immediate; nothing to do here.
            ServerEvent::DiceRolled { .. }
            | ServerEvent::LandingResult { .. }
            | ServerEvent::AuctionEnded { .. }
            | ServerEvent::Error(_) => {}
        }
    }

    /// Merge plus re-render signal plus dice flicker decision. `force_dice`
    /// asks the controller to animate even when the record identity is
    /// unchanged, which it still collapses to at most once per record.
    async fn merge_snapshot(&mut self, game: Snapshot, force_dice: bool) -> MergeOutcome {
        let animating = self.sequencer.is_active();
        let outcome = { self.store.lock().await.merge(game, animating) };
        if !outcome.applied {
            return outcome;
        }

        let _ = self.events.send(ClientEvent::StateChanged);
        if outcome.dice_changed || force_dice {
            let roll = { self.store.lock().await.dice() };
            if let Some(roll) = roll {
                if let Some(plan) = self.dice.observe(&roll, force_dice) {
                    let _ = self.events.send(ClientEvent::DiceAnimation(plan));
                }
            }
        }
        outcome
    }

    async fn player_name(&self, id: PlayerId) -> String {
        let store = self.store.lock().await;
        store
            .player(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("player {}", id.0))
    }

    async fn space_name(&self, position: u8) -> String {
        let store = self.store.lock().await;
        store
            .snapshot()
            .and_then(|s| s.spaces.get(usize::from(position)))
            .map(|s| s.name.clone())
            .unwrap_or_else(|| format!("space {position}"))
    }

    async fn space_owner_name(&self, position: u8) -> String {
        let store = self.store.lock().await;
        store
            .snapshot()
            .and_then(|s| s.spaces.get(usize::from(position)))
            .and_then(|s| s.owner)
            .and_then(|id| store.player(id).map(|p| p.name.clone()))
            .unwrap_or_else(|| "someone".to_string())
    }
}

#[cfg(test)]
#[path = "tests/reconciler_tests.rs"]
mod tests;
