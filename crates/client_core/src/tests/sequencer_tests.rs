use super::*;
use std::sync::Mutex as StdMutex;

use shared::domain::{Card, CardDeck, Player, Snapshot};
use tokio::time::Instant;

use crate::STEP_INTERVAL;

struct RecordingSounds(StdMutex<Vec<SoundCue>>);

impl RecordingSounds {
    fn new() -> Arc<Self> {
        Arc::new(Self(StdMutex::new(Vec::new())))
    }

    fn cues(&self) -> Vec<SoundCue> {
        self.0.lock().unwrap().clone()
    }
}

impl SoundSink for RecordingSounds {
    fn play(&self, cue: SoundCue) {
        self.0.lock().unwrap().push(cue);
    }
}

fn card(action: CardAction) -> LandingOutcome {
    LandingOutcome::CardDrawn {
        deck: CardDeck::Chance,
        card: Card {
            text: "test card".to_string(),
            action,
        },
    }
}

#[test]
fn roll_params_derive_start_from_authoritative_end() {
    let params = roll_move_params(PlayerId(1), 7, 7);
    assert_eq!(params.start, 0);
    assert_eq!(params.steps, 7);
    assert_eq!(params.direction, 1);
    assert!(params.step_sound);

    // End position already wrapped past the origin.
    let params = roll_move_params(PlayerId(1), 2, 5);
    assert_eq!(params.start, 37);
}

#[test]
fn go_to_jail_walks_backward_to_the_jail_space() {
    let delta = forced_move_delta(&LandingOutcome::GoToJail, 30, JAIL_POSITION);
    assert_eq!(delta, Some((20, -1)));
}

#[test]
fn card_move_back_uses_the_card_distance() {
    let delta = forced_move_delta(&card(CardAction::MoveBack { spaces: 3 }), 7, 4);
    assert_eq!(delta, Some((3, -1)));
}

#[test]
fn card_advance_walks_forward_to_the_snapshot_position() {
    let delta = forced_move_delta(&card(CardAction::Move { position: 0 }), 36, 0);
    assert_eq!(delta, Some((4, 1)));

    let delta = forced_move_delta(&card(CardAction::NearestRailroad), 7, 15);
    assert_eq!(delta, Some((8, 1)));
}

#[test]
fn monetary_cards_move_nothing() {
    assert_eq!(
        forced_move_delta(&card(CardAction::Collect { amount: 50 }), 7, 7),
        None
    );
    assert_eq!(
        forced_move_delta(&LandingOutcome::TaxPaid { amount: 200 }, 4, 4),
        None
    );
}

#[test]
fn zero_distance_move_is_no_move() {
    // Already standing on the target space.
    assert_eq!(
        forced_move_delta(&card(CardAction::Move { position: 5 }), 5, 5),
        None
    );
}

struct Fixture {
    sequencer: AnimationSequencer,
    store: Arc<Mutex<GameStateStore>>,
    done_rx: mpsc::Receiver<Inbound>,
    sounds: Arc<RecordingSounds>,
}

fn fixture() -> Fixture {
    let (events, _) = broadcast::channel(256);
    let store = Arc::new(Mutex::new(GameStateStore::default()));
    let sounds = RecordingSounds::new();
    let (done_tx, done_rx) = mpsc::channel(8);
    let sequencer = AnimationSequencer::new(
        Arc::clone(&store),
        events.clone(),
        sounds.clone(),
        NotificationScheduler::new(events),
        done_tx,
    );
    Fixture {
        sequencer,
        store,
        done_rx,
        sounds,
    }
}

fn one_player_snapshot(position: u8) -> Snapshot {
    Snapshot {
        players: vec![Player {
            id: PlayerId(1),
            name: "mover".to_string(),
            token: "dog".to_string(),
            color: "#00ff00".to_string(),
            money: 1500,
            position,
            in_jail: false,
            jail_turns: 0,
            properties: Vec::new(),
            get_out_of_jail_cards: 0,
            bankrupt: false,
            disconnected: false,
        }],
        spaces: Vec::new(),
        current_player_index: 0,
        dice: None,
        dice_rolled: false,
        pending_action: None,
        auction: None,
        trades: Vec::new(),
        log: Vec::new(),
        free_parking_pool: 0,
        started: true,
    }
}

#[tokio::test(start_paused = true)]
async fn roll_move_runs_the_full_delay_chain() {
    let mut fx = fixture();
    fx.store.lock().await.merge(one_player_snapshot(7), false);
    let params = roll_move_params(PlayerId(1), 7, 7);

    let begun = Instant::now();
    fx.sequencer.start(params, MoveKind::Roll, None);
    assert!(fx.sequencer.is_active());

    let done = fx.done_rx.recv().await.unwrap();
    let elapsed = begun.elapsed();

    let expected = DICE_SETTLE_DELAY
        + RESULT_DISPLAY_DELAY
        + STEP_INTERVAL * 7
        + MOVE_SETTLE_DELAY;
    assert_eq!(elapsed, expected);
    assert!(matches!(
        done,
        Inbound::MoveFinished(MoveFinished {
            kind: MoveKind::Roll,
            deferred: None,
        })
    ));
    assert!(fx.sounds.cues().contains(&SoundCue::DiceSettle));
    assert!(fx.sounds.cues().contains(&SoundCue::PieceLand));
    assert!(fx.store.lock().await.position_override().is_none());
}

#[tokio::test(start_paused = true)]
async fn forced_move_skips_the_dice_delays() {
    let mut fx = fixture();
    fx.store.lock().await.merge(one_player_snapshot(4), false);
    let params = forced_move_params(PlayerId(1), 7, 3, -1);

    let begun = Instant::now();
    fx.sequencer.start(params, MoveKind::Forced, None);
    let _ = fx.done_rx.recv().await.unwrap();

    assert_eq!(begun.elapsed(), STEP_INTERVAL * 3 + MOVE_SETTLE_DELAY);
    assert!(!fx.sounds.cues().contains(&SoundCue::DiceSettle));
}

#[tokio::test(start_paused = true)]
async fn zero_step_move_completes_immediately() {
    let mut fx = fixture();
    let outcome = LandingOutcome::TaxPaid { amount: 100 };
    let params = forced_move_params(PlayerId(1), 4, 0, 1);

    fx.sequencer.start(params, MoveKind::Forced, Some(outcome));
    let done = fx.done_rx.recv().await.unwrap();

    assert!(matches!(
        done,
        Inbound::MoveFinished(MoveFinished {
            kind: MoveKind::Forced,
            deferred: Some(LandingOutcome::TaxPaid { amount: 100 }),
        })
    ));
    assert!(fx.sounds.cues().is_empty());
}

#[tokio::test(start_paused = true)]
async fn finish_clears_the_active_flag() {
    let mut fx = fixture();
    fx.sequencer
        .start(forced_move_params(PlayerId(1), 0, 0, 1), MoveKind::Forced, None);
    assert!(fx.sequencer.is_active());

    let _ = fx.done_rx.recv().await.unwrap();
    fx.sequencer.finish();
    assert!(!fx.sequencer.is_active());
}
