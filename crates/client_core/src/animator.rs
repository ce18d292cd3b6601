use std::sync::Arc;

use shared::domain::{wrap_position, GO_SALARY};
use tokio::{
    sync::{broadcast, Mutex},
    time::sleep,
};

use crate::{
    notify::{NotificationScheduler, ToastKind},
    sequencer::MoveParams,
    store::GameStateStore,
    ClientEvent, SoundCue, SoundSink, STEP_INTERVAL,
};

/// Advances one piece's visual position a space at a time on a fixed tick.
/// The origin-wrap notice fires exactly when a forward step lands on space 0,
/// so at most once per traversal.
pub struct StepAnimator {
    params: MoveParams,
    store: Arc<Mutex<GameStateStore>>,
    events: broadcast::Sender<ClientEvent>,
    sounds: Arc<dyn SoundSink>,
    notify: NotificationScheduler,
}

impl StepAnimator {
    pub fn new(
        params: MoveParams,
        store: Arc<Mutex<GameStateStore>>,
        events: broadcast::Sender<ClientEvent>,
        sounds: Arc<dyn SoundSink>,
        notify: NotificationScheduler,
    ) -> Self {
        Self {
            params,
            store,
            events,
            sounds,
            notify,
        }
    }

    pub async fn run(self) {
        let params = self.params;
        for tick in 1..=i16::from(params.steps) {
            sleep(STEP_INTERVAL).await;
            let position = wrap_position(params.start, tick * i16::from(params.direction));
            {
                self.store
                    .lock()
                    .await
                    .set_override(params.player_id, position);
            }
            let _ = self.events.send(ClientEvent::PieceMoved {
                player_id: params.player_id,
                position,
            });

            if params.direction > 0 && position == 0 {
                self.sounds.play(SoundCue::PassOrigin);
                self.notify
                    .toast(
                        ToastKind::Success,
                        "Passed GO",
                        format!("Collect ${GO_SALARY} salary"),
                    )
                    .await;
            }

            if params.step_sound {
                self.sounds.play(SoundCue::PieceStep);
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/animator_tests.rs"]
mod tests;
