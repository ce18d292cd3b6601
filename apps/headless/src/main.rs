//! Terminal client: joins a game and prints every reconciled change. Useful
//! for watching a server without a board UI attached.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use client_core::{ClientEvent, GameClient, NullSoundSink};
use shared::{domain::GameId, protocol::ClientCommand};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

mod config;

use config::load_settings;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    player_name: Option<String>,
    /// Join this game instead of creating a new one.
    #[arg(long)]
    game_id: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(v) = args.server_url {
        settings.server_url = v;
    }
    if let Some(v) = args.player_name {
        settings.player_name = v;
    }

    let client = GameClient::connect(&settings.server_url, Arc::new(NullSoundSink)).await?;
    let mut events = client.subscribe_events();

    match args.game_id {
        Some(id) => {
            client
                .send(ClientCommand::JoinGame {
                    game_id: GameId(id),
                    player_name: settings.player_name.clone(),
                })
                .await?;
            info!(game_id = id, "joining as {}", settings.player_name);
        }
        None => {
            client
                .send(ClientCommand::CreateGame {
                    player_name: settings.player_name.clone(),
                })
                .await?;
            info!("creating a game as {}", settings.player_name);
        }
    }

    loop {
        match events.recv().await {
            Ok(ClientEvent::StateChanged) => {
                let store = client.store();
                let store = store.lock().await;
                if let Some(snapshot) = store.snapshot() {
                    let current = snapshot
                        .current_player()
                        .map(|p| p.name.as_str())
                        .unwrap_or("?");
                    info!(
                        players = snapshot.players.len(),
                        current, "state updated"
                    );
                }
            }
            Ok(ClientEvent::PieceMoved {
                player_id,
                position,
            }) => {
                info!(player_id = player_id.0, position, "piece moved");
            }
            Ok(ClientEvent::Toast(toast)) => {
                info!("[{}] {}", toast.title, toast.message);
            }
            Ok(ClientEvent::CardShown(banner)) => {
                info!(deck = ?banner.deck, "card: {}", banner.card.text);
            }
            Ok(ClientEvent::DiceAnimation(plan)) => {
                info!(die1 = plan.settle.die1, die2 = plan.settle.die2, "dice");
            }
            Ok(_) => {}
            Err(RecvError::Lagged(missed)) => {
                warn!(missed, "event stream lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }

    Ok(())
}
