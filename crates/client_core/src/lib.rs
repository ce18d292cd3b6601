//! Client-side reconciliation and animation sequencing for the board game.
//!
//! The authority pushes full snapshots; this crate decides when each one is
//! applied, which ones animate, and which arrive too early and must wait for
//! the animation in flight. Rendering layers subscribe to [`ClientEvent`] and
//! read display state from the [`store::GameStateStore`].

use std::{fmt, sync::Arc, time::Duration};

use futures::{SinkExt, StreamExt};
use shared::protocol::{ClientCommand, ServerEvent};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

pub mod animator;
pub mod dice;
pub mod notify;
pub mod reconciler;
pub mod sequencer;
pub mod store;

pub use dice::FlickerPlan;
pub use notify::{CardBanner, Toast, ToastKind};
pub use reconciler::{EventReconciler, Inbound, MoveFinished};
pub use store::GameStateStore;

/// Delay between single-space hops of an animated piece.
pub const STEP_INTERVAL: Duration = Duration::from_millis(200);
/// Time the dice visibly tumble before the faces settle.
pub const DICE_SETTLE_DELAY: Duration = Duration::from_millis(700);
/// Time the settled faces are shown before the piece starts moving.
pub const RESULT_DISPLAY_DELAY: Duration = Duration::from_millis(800);
/// Pause on the final space before the move is considered resolved.
pub const MOVE_SETTLE_DELAY: Duration = Duration::from_millis(300);
/// Pause before a landing result held back during an animation is applied.
pub const PENDING_DRAIN_DELAY: Duration = Duration::from_millis(300);
pub const DICE_FLICKER_INTERVAL: Duration = Duration::from_millis(80);
pub const DICE_FLICKER_DURATION: Duration = Duration::from_millis(600);
pub const TOAST_TTL: Duration = Duration::from_millis(3000);
pub const CARD_TTL: Duration = Duration::from_millis(3500);
/// Final portion of [`CARD_TTL`] spent fading out.
pub const CARD_FADE: Duration = Duration::from_millis(500);

const INBOUND_CHANNEL_CAPACITY: usize = 256;
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Audio cues the reconciler asks the host to play. The sink is synchronous
/// and must not block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    DiceRoll,
    DiceSettle,
    PieceStep,
    PieceLand,
    PassOrigin,
    CashIn,
    CashOut,
    CardDraw,
    Build,
    Mortgage,
    TradeChime,
    AuctionBid,
    Jail,
    Bankrupt,
    GameOver,
    GameStart,
    ErrorBeep,
}

pub trait SoundSink: Send + Sync {
    fn play(&self, cue: SoundCue);
}

/// Sink for hosts without audio; logs each cue at debug level.
pub struct NullSoundSink;

impl SoundSink for NullSoundSink {
    fn play(&self, cue: SoundCue) {
        debug!(?cue, "sound cue");
    }
}

/// Everything a rendering layer needs to react to, fanned out over a
/// broadcast channel. Slow subscribers lag and miss events rather than
/// stalling the reconciler.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Store contents changed; re-read display state.
    StateChanged,
    PieceMoved {
        player_id: shared::domain::PlayerId,
        position: u8,
    },
    DiceAnimation(FlickerPlan),
    Toast(Toast),
    ToastDismissed {
        id: u64,
    },
    CardShown(CardBanner),
    CardFading {
        id: u64,
    },
    CardDismissed {
        id: u64,
    },
}

#[derive(Debug, Error)]
pub enum ClientError {
    /// Command requires an active session; only create/join are allowed
    /// before one exists.
    #[error("not joined to a game")]
    NotJoined,
    #[error("connection to the server is closed")]
    TransportClosed,
    #[error("server url must start with http:// or https://")]
    InvalidServerUrl,
    #[error("websocket connect failed: {0}")]
    Connect(String),
}

/// Handle to a connected client: command sender, event subscription, and the
/// shared display store. Dropping the handle closes the outbound channel and
/// winds the tasks down.
pub struct GameClient {
    store: Arc<Mutex<GameStateStore>>,
    events: broadcast::Sender<ClientEvent>,
    outbound: mpsc::Sender<ClientCommand>,
}

impl fmt::Debug for GameClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameClient").finish_non_exhaustive()
    }
}

impl GameClient {
    /// Connects to the server, spawns the read/write pumps and the
    /// reconciler task, and returns the handle.
    pub async fn connect(
        server_url: &str,
        sounds: Arc<dyn SoundSink>,
    ) -> Result<Self, ClientError> {
        let ws_url = websocket_url(server_url)?;
        let (ws_stream, _) = connect_async(&ws_url)
            .await
            .map_err(|err| ClientError::Connect(err.to_string()))?;
        info!(url = %ws_url, "connected");
        let (mut ws_writer, mut ws_reader) = ws_stream.split();

        let store = Arc::new(Mutex::new(GameStateStore::default()));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel::<Inbound>(INBOUND_CHANNEL_CAPACITY);
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<ClientCommand>(16);

        let notify = notify::NotificationScheduler::new(events.clone());
        let reconciler = EventReconciler::new(
            Arc::clone(&store),
            events.clone(),
            sounds,
            notify,
            inbound_tx.clone(),
        );
        tokio::spawn(reconciler.run(inbound_rx));

        tokio::spawn(async move {
            while let Some(msg) = ws_reader.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ServerEvent>(&text) {
                            Ok(event) => {
                                if inbound_tx.send(Inbound::Server(event)).await.is_err() {
                                    break;
                                }
                            }
                            Err(err) => warn!("invalid server event: {err}"),
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        warn!("websocket receive failed: {err}");
                        break;
                    }
                }
            }
            info!("server connection closed");
            let closed = shared::error::ApiError::new(
                shared::error::ErrorCode::Internal,
                "connection to the server was lost",
            );
            let _ = inbound_tx.send(Inbound::Server(ServerEvent::Error(closed))).await;
        });

        tokio::spawn(async move {
            while let Some(command) = outbound_rx.recv().await {
                let text = match serde_json::to_string(&command) {
                    Ok(text) => text,
                    Err(err) => {
                        warn!("failed to encode command: {err}");
                        continue;
                    }
                };
                if let Err(err) = ws_writer.send(Message::Text(text)).await {
                    warn!("websocket send failed: {err}");
                    break;
                }
            }
        });

        Ok(Self {
            store,
            events,
            outbound: outbound_tx,
        })
    }

    /// Wires a client out of pre-built channels. Lets tests drive the
    /// reconciler without a socket.
    pub fn from_parts(
        store: Arc<Mutex<GameStateStore>>,
        events: broadcast::Sender<ClientEvent>,
        outbound: mpsc::Sender<ClientCommand>,
    ) -> Self {
        Self {
            store,
            events,
            outbound,
        }
    }

    /// Sends a command to the authority. Everything except creating or
    /// joining a game is rejected until a session exists.
    pub async fn send(&self, command: ClientCommand) -> Result<(), ClientError> {
        if !command.allowed_before_join() {
            let joined = { self.store.lock().await.is_joined() };
            if !joined {
                return Err(ClientError::NotJoined);
            }
        }
        self.outbound
            .send(command)
            .await
            .map_err(|_| ClientError::TransportClosed)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn store(&self) -> Arc<Mutex<GameStateStore>> {
        Arc::clone(&self.store)
    }
}

fn websocket_url(server_url: &str) -> Result<String, ClientError> {
    let base = if let Some(rest) = server_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = server_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        return Err(ClientError::InvalidServerUrl);
    };
    Ok(format!("{}/ws", base.trim_end_matches('/')))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
