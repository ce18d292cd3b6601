use std::sync::Arc;

use shared::{
    domain::{wrap_position, CardAction, PlayerId, BOARD_SPACES, JAIL_POSITION},
    protocol::LandingOutcome,
};
use tokio::{
    sync::{broadcast, mpsc, Mutex},
    time::sleep,
};
use tracing::debug;

use crate::{
    animator::StepAnimator,
    notify::NotificationScheduler,
    reconciler::{Inbound, MoveFinished},
    store::GameStateStore,
    ClientEvent, SoundCue, SoundSink, DICE_SETTLE_DELAY, MOVE_SETTLE_DELAY, RESULT_DISPLAY_DELAY,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    /// Ordinary dice-driven move; prefixed by the dice settle and result
    /// display delays.
    Roll,
    /// Rule-triggered move (card, send-to-jail); starts immediately and
    /// suppresses per-step sounds.
    Forced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveParams {
    pub player_id: PlayerId,
    pub start: u8,
    pub steps: u8,
    pub direction: i8,
    pub step_sound: bool,
    pub landing_sound: bool,
}

/// Move parameters for an ordinary roll: the start position is derived from
/// the authoritative end position, so a client that missed earlier pushes
/// still animates into the correct final space.
pub fn roll_move_params(player_id: PlayerId, end_position: u8, total: u8) -> MoveParams {
    MoveParams {
        player_id,
        start: wrap_position(end_position, -i16::from(total)),
        steps: total,
        direction: 1,
        step_sound: true,
        landing_sound: true,
    }
}

pub fn forced_move_params(player_id: PlayerId, start: u8, steps: u8, direction: i8) -> MoveParams {
    MoveParams {
        player_id,
        start,
        steps,
        direction,
        step_sound: false,
        landing_sound: true,
    }
}

/// Steps and direction implied by a landing outcome, relative to the position
/// the player was displayed at (`start`) and the position the new snapshot
/// puts them at (`end`). `None` means the outcome moves nothing beyond the
/// roll itself.
pub fn forced_move_delta(outcome: &LandingOutcome, start: u8, end: u8) -> Option<(u8, i8)> {
    let delta = match outcome {
        LandingOutcome::GoToJail => (backward_distance(start, JAIL_POSITION), -1),
        LandingOutcome::CardDrawn { card, .. } => match card.action {
            CardAction::MoveBack { spaces } => (spaces % BOARD_SPACES, -1),
            CardAction::Move { .. } | CardAction::NearestRailroad | CardAction::NearestUtility => {
                (forward_distance(start, end), 1)
            }
            CardAction::GoToJail => (backward_distance(start, JAIL_POSITION), -1),
            _ => return None,
        },
        _ => return None,
    };
    match delta {
        (0, _) => None,
        (steps, direction) => Some((steps, direction)),
    }
}

fn forward_distance(start: u8, end: u8) -> u8 {
    (i16::from(end) - i16::from(start)).rem_euclid(i16::from(BOARD_SPACES)) as u8
}

fn backward_distance(start: u8, end: u8) -> u8 {
    (i16::from(start) - i16::from(end)).rem_euclid(i16::from(BOARD_SPACES)) as u8
}

/// Owns the "at most one animation in flight" invariant. The reconciler is
/// the sole caller and serializes by construction, so concurrent `start`
/// calls are a programming error rather than a condition to reject.
pub struct AnimationSequencer {
    store: Arc<Mutex<GameStateStore>>,
    events: broadcast::Sender<ClientEvent>,
    sounds: Arc<dyn SoundSink>,
    notify: NotificationScheduler,
    done_tx: mpsc::Sender<Inbound>,
    active: bool,
}

impl AnimationSequencer {
    pub fn new(
        store: Arc<Mutex<GameStateStore>>,
        events: broadcast::Sender<ClientEvent>,
        sounds: Arc<dyn SoundSink>,
        notify: NotificationScheduler,
        done_tx: mpsc::Sender<Inbound>,
    ) -> Self {
        Self {
            store,
            events,
            sounds,
            notify,
            done_tx,
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Cleared by the reconciler when the completion message arrives, before
    /// any deferred work runs.
    pub fn finish(&mut self) {
        self.active = false;
    }

    /// Spawns the sequential move chain and marks the task active. A
    /// zero-step move resolves immediately with no visual effect.
    pub fn start(&mut self, params: MoveParams, kind: MoveKind, deferred: Option<LandingOutcome>) {
        self.active = true;
        debug!(
            player_id = params.player_id.0,
            start = params.start,
            steps = params.steps,
            direction = params.direction,
            ?kind,
            "starting move animation"
        );

        let done_tx = self.done_tx.clone();
        if params.steps == 0 {
            tokio::spawn(async move {
                let _ = done_tx
                    .send(Inbound::MoveFinished(MoveFinished { kind, deferred }))
                    .await;
            });
            return;
        }

        let store = Arc::clone(&self.store);
        let events = self.events.clone();
        let sounds = Arc::clone(&self.sounds);
        let notify = self.notify.clone();
        tokio::spawn(async move {
            if kind == MoveKind::Roll {
                sleep(DICE_SETTLE_DELAY).await;
                sounds.play(SoundCue::DiceSettle);
                sleep(RESULT_DISPLAY_DELAY).await;
            }

            StepAnimator::new(
                params,
                Arc::clone(&store),
                events.clone(),
                Arc::clone(&sounds),
                notify,
            )
            .run()
            .await;

            sleep(MOVE_SETTLE_DELAY).await;
            {
                store.lock().await.clear_override();
            }
            let _ = events.send(ClientEvent::StateChanged);
            if params.landing_sound {
                sounds.play(SoundCue::PieceLand);
            }
            let _ = done_tx
                .send(Inbound::MoveFinished(MoveFinished { kind, deferred }))
                .await;
        });
    }
}

#[cfg(test)]
#[path = "tests/sequencer_tests.rs"]
mod tests;
