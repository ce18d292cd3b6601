use std::{sync::Arc, time::Duration};

use rand::Rng;
use shared::domain::DiceRoll;

use crate::{DICE_FLICKER_DURATION, DICE_FLICKER_INTERVAL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlickerFrame {
    pub die1: u8,
    pub die2: u8,
}

/// Frame plan for one flicker-and-settle dice animation: random faces at a
/// fixed cadence, then the true faces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlickerPlan {
    pub frames: Vec<FlickerFrame>,
    pub frame_interval: Duration,
    pub settle: FlickerFrame,
}

/// Decides when the dice widget re-runs its flicker animation. The settle
/// animation runs at most once per distinct roll record (by `Arc` identity),
/// even if `force` is asserted repeatedly for the same record.
#[derive(Default)]
pub struct DiceAnimationController {
    last_observed: Option<Arc<DiceRoll>>,
    last_animated: Option<Arc<DiceRoll>>,
}

impl DiceAnimationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, roll: &Arc<DiceRoll>, force: bool) -> Option<FlickerPlan> {
        let identity_changed = !self
            .last_observed
            .as_ref()
            .is_some_and(|prev| Arc::ptr_eq(prev, roll));
        self.last_observed = Some(Arc::clone(roll));

        let already_animated = self
            .last_animated
            .as_ref()
            .is_some_and(|prev| Arc::ptr_eq(prev, roll));
        if already_animated || !(identity_changed || force) {
            return None;
        }

        self.last_animated = Some(Arc::clone(roll));
        Some(flicker_plan(roll))
    }
}

fn flicker_plan(roll: &DiceRoll) -> FlickerPlan {
    let mut rng = rand::thread_rng();
    let frame_count =
        (DICE_FLICKER_DURATION.as_millis() / DICE_FLICKER_INTERVAL.as_millis()) as usize;
    let frames = (0..frame_count)
        .map(|_| FlickerFrame {
            die1: rng.gen_range(1..=6),
            die2: rng.gen_range(1..=6),
        })
        .collect();
    FlickerPlan {
        frames,
        frame_interval: DICE_FLICKER_INTERVAL,
        settle: FlickerFrame {
            die1: roll.die1,
            die2: roll.die2,
        },
    }
}

#[cfg(test)]
#[path = "tests/dice_tests.rs"]
mod tests;
