use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use shared::domain::{Card, CardDeck};
use tokio::{
    sync::{broadcast, Mutex},
    time::sleep,
};

use crate::{ClientEvent, CARD_FADE, CARD_TTL, TOAST_TTL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CardBanner {
    pub id: u64,
    pub deck: CardDeck,
    pub card: Card,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Channel {
    Toast,
    Card,
}

#[derive(Default)]
struct NotifyState {
    next_id: u64,
    generations: HashMap<Channel, u64>,
}

/// Time-boxed ephemeral UI messages, independent of the animation pipeline.
/// A new notification on a channel invalidates the previous one's timers; a
/// dismissed/fading event is only emitted while its notification is still the
/// channel's latest.
#[derive(Clone)]
pub struct NotificationScheduler {
    events: broadcast::Sender<ClientEvent>,
    state: Arc<Mutex<NotifyState>>,
}

impl NotificationScheduler {
    pub fn new(events: broadcast::Sender<ClientEvent>) -> Self {
        Self {
            events,
            state: Arc::new(Mutex::new(NotifyState::default())),
        }
    }

    pub async fn toast(
        &self,
        kind: ToastKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> u64 {
        let (id, generation) = self.begin(Channel::Toast).await;
        let _ = self.events.send(ClientEvent::Toast(Toast {
            id,
            kind,
            title: title.into(),
            message: message.into(),
            created_at: Utc::now(),
        }));

        let scheduler = self.clone();
        tokio::spawn(async move {
            sleep(TOAST_TTL).await;
            if scheduler.is_current(Channel::Toast, generation).await {
                let _ = scheduler.events.send(ClientEvent::ToastDismissed { id });
            }
        });
        id
    }

    pub async fn card(&self, deck: CardDeck, card: Card) -> u64 {
        let (id, generation) = self.begin(Channel::Card).await;
        let _ = self.events.send(ClientEvent::CardShown(CardBanner {
            id,
            deck,
            card,
            created_at: Utc::now(),
        }));

        let scheduler = self.clone();
        tokio::spawn(async move {
            sleep(CARD_TTL - CARD_FADE).await;
            if scheduler.is_current(Channel::Card, generation).await {
                let _ = scheduler.events.send(ClientEvent::CardFading { id });
            }
            sleep(CARD_FADE).await;
            if scheduler.is_current(Channel::Card, generation).await {
                let _ = scheduler.events.send(ClientEvent::CardDismissed { id });
            }
        });
        id
    }

    async fn begin(&self, channel: Channel) -> (u64, u64) {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let generation = state.generations.entry(channel).or_insert(0);
        *generation += 1;
        let generation = *generation;
        (state.next_id, generation)
    }

    async fn is_current(&self, channel: Channel, generation: u64) -> bool {
        let state = self.state.lock().await;
        state.generations.get(&channel).copied() == Some(generation)
    }
}

#[cfg(test)]
#[path = "tests/notify_tests.rs"]
mod tests;
