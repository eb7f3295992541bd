use crate::input::PlayerIndex;

/// One roster slot for the duration of a match.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSlot {
    pub index: PlayerIndex,
    pub username: String,
    pub score: i64,
    pub lives: u32,
    starting_lives: u32,
}

impl PlayerSlot {
    pub fn starting_lives(&self) -> u32 {
        self.starting_lives
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEvent {
    /// First time a tracked player ran out of lives. Emitted once per match.
    GameOver { player: PlayerIndex },
}

/// Per-match score and life accumulator.
///
/// Score is never clamped. Lives stay within `[0, starting lives]`.
#[derive(Debug, Clone)]
pub struct ScoreLedger {
    slots: Vec<PlayerSlot>,
    tracks_lives: bool,
    game_over: bool,
}

impl ScoreLedger {
    /// `starting_lives` is `None` for variants that do not spend lives.
    pub fn new(names: &[String], starting_lives: Option<u32>) -> Self {
        let lives = starting_lives.unwrap_or(0);
        let slots = names
            .iter()
            .enumerate()
            .map(|(i, name)| PlayerSlot {
                index: PlayerIndex::new(i),
                username: name.clone(),
                score: 0,
                lives,
                starting_lives: lives,
            })
            .collect();
        Self {
            slots,
            tracks_lives: starting_lives.is_some(),
            game_over: false,
        }
    }

    pub fn apply_delta(
        &mut self,
        player: PlayerIndex,
        score_delta: i64,
        life_delta: i64,
    ) -> Option<LedgerEvent> {
        let Some(slot) = self.slots.get_mut(player.get()) else {
            tracing::debug!("Delta for unknown player slot {}", player.get());
            return None;
        };
        slot.score += score_delta;

        if !self.tracks_lives {
            return None;
        }
        let lives = (slot.lives as i64 + life_delta).clamp(0, slot.starting_lives as i64);
        slot.lives = lives as u32;

        if slot.lives == 0 && !self.game_over {
            self.game_over = true;
            return Some(LedgerEvent::GameOver { player });
        }
        None
    }

    pub fn slots(&self) -> &[PlayerSlot] {
        &self.slots
    }

    pub fn slot(&self, player: PlayerIndex) -> Option<&PlayerSlot> {
        self.slots.get(player.get())
    }

    pub fn score(&self, player: PlayerIndex) -> i64 {
        self.slot(player).map(|s| s.score).unwrap_or(0)
    }

    pub fn tracks_lives(&self) -> bool {
        self.tracks_lives
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn names() -> Vec<String> {
        vec!["Mario".to_string(), "Waluigi".to_string()]
    }

    #[test]
    fn score_accumulates_unclamped() {
        let mut ledger = ScoreLedger::new(&names(), None);
        let p = PlayerIndex::new(0);
        ledger.apply_delta(p, -1, 0);
        ledger.apply_delta(p, -1, 0);
        ledger.apply_delta(p, 2, 0);
        assert_eq!(ledger.score(p), 0);
        ledger.apply_delta(p, -5, 0);
        assert_eq!(ledger.score(p), -5);
        assert_eq!(ledger.score(PlayerIndex::new(1)), 0);
    }

    #[test]
    fn lives_never_rise_above_start() {
        let mut ledger = ScoreLedger::new(&names(), Some(3));
        let p = PlayerIndex::new(1);
        ledger.apply_delta(p, 0, 5);
        assert_eq!(ledger.slot(p).unwrap().lives, 3);
    }

    #[test]
    fn game_over_fires_once() {
        let mut ledger = ScoreLedger::new(&names(), Some(2));
        let a = PlayerIndex::new(0);
        let b = PlayerIndex::new(1);
        assert_eq!(ledger.apply_delta(a, -1, -1), None);
        assert_eq!(
            ledger.apply_delta(a, -1, -1),
            Some(LedgerEvent::GameOver { player: a })
        );
        assert_eq!(ledger.apply_delta(a, -1, -1), None);
        assert_eq!(ledger.apply_delta(b, 0, -2), None);
        assert!(ledger.is_game_over());
        assert_eq!(ledger.slot(a).unwrap().lives, 0);
    }

    #[test]
    fn untracked_lives_never_end_the_game() {
        let mut ledger = ScoreLedger::new(&names(), None);
        assert_eq!(ledger.apply_delta(PlayerIndex::new(0), -1, -1), None);
        assert!(!ledger.is_game_over());
    }

    #[test]
    fn unknown_slot_is_ignored() {
        let mut ledger = ScoreLedger::new(&names(), Some(3));
        assert_eq!(ledger.apply_delta(PlayerIndex::new(7), 1, -3), None);
        assert!(!ledger.is_game_over());
    }

    proptest! {
        #[test]
        fn lives_stay_within_bounds(deltas in prop::collection::vec((0usize..2, -3i64..3, -3i64..3), 0..64)) {
            let mut ledger = ScoreLedger::new(&names(), Some(3));
            let mut fired = 0;
            for (p, score, life) in deltas {
                if ledger.apply_delta(PlayerIndex::new(p), score, life).is_some() {
                    fired += 1;
                }
                for slot in ledger.slots() {
                    prop_assert!(slot.lives <= slot.starting_lives());
                }
            }
            prop_assert!(fired <= 1);
        }
    }
}
