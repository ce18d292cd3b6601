use std::sync::Arc;

use shared::domain::{DiceRoll, GameId, Player, PlayerId, Snapshot};
use tracing::debug;

/// Visual position of the single animated piece, shadowing the authoritative
/// position until the animation resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOverride {
    pub player_id: PlayerId,
    pub position: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// False when the incoming snapshot was dropped as stale.
    pub applied: bool,
    /// True when the stored dice record is a new identity after the merge.
    pub dice_changed: bool,
}

/// Latest reconciled snapshot plus the two anti-flicker/anti-stale rules.
/// Intentionally dumb otherwise; all sequencing decisions live in the
/// reconciler.
#[derive(Default)]
pub struct GameStateStore {
    snapshot: Option<Snapshot>,
    dice: Option<Arc<DiceRoll>>,
    position_override: Option<PositionOverride>,
    game_id: Option<GameId>,
    local_player_id: Option<PlayerId>,
}

impl GameStateStore {
    /// Applies an authoritative snapshot. Rules, in order: a snapshot whose
    /// current player differs from the displayed one while an animation for
    /// the previous turn is in flight is dropped; a dice record value-equal
    /// to the stored one keeps the stored record's identity so the display
    /// layer's change detection stays quiet.
    pub fn merge(&mut self, incoming: Snapshot, animating: bool) -> MergeOutcome {
        if animating {
            if let Some(prev) = &self.snapshot {
                if prev.current_player_index != incoming.current_player_index {
                    debug!(
                        displayed = prev.current_player_index,
                        incoming = incoming.current_player_index,
                        "dropping snapshot that advanced the turn mid-animation"
                    );
                    return MergeOutcome {
                        applied: false,
                        dice_changed: false,
                    };
                }
            }
        }

        let dice_changed = match (self.dice.as_deref(), incoming.dice.as_ref()) {
            (Some(prev), Some(new)) if prev == new => false,
            (_, Some(new)) => {
                self.dice = Some(Arc::new(*new));
                true
            }
            (Some(_), None) => {
                self.dice = None;
                false
            }
            (None, None) => false,
        };

        self.snapshot = Some(incoming);
        MergeOutcome {
            applied: true,
            dice_changed,
        }
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// Identity-stable dice record; clones of the same `Arc` compare equal
    /// under `Arc::ptr_eq` across merges of value-equal rolls.
    pub fn dice(&self) -> Option<Arc<DiceRoll>> {
        self.dice.clone()
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.snapshot.as_ref().and_then(|s| s.player(id))
    }

    pub fn set_override(&mut self, player_id: PlayerId, position: u8) {
        self.position_override = Some(PositionOverride {
            player_id,
            position,
        });
    }

    pub fn clear_override(&mut self) {
        self.position_override = None;
    }

    pub fn position_override(&self) -> Option<PositionOverride> {
        self.position_override
    }

    /// Rendered position: the visual override while that player animates,
    /// the authoritative position otherwise.
    pub fn display_position(&self, player_id: PlayerId) -> Option<u8> {
        if let Some(over) = &self.position_override {
            if over.player_id == player_id {
                return Some(over.position);
            }
        }
        self.player(player_id).map(|p| p.position)
    }

    pub fn set_game_id(&mut self, game_id: GameId) {
        self.game_id = Some(game_id);
    }

    pub fn set_session(&mut self, game_id: GameId, player_id: PlayerId) {
        self.game_id = Some(game_id);
        self.local_player_id = Some(player_id);
    }

    pub fn is_joined(&self) -> bool {
        self.game_id.is_some() && self.local_player_id.is_some()
    }

    pub fn local_player_id(&self) -> Option<PlayerId> {
        self.local_player_id
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
