//! One running minigame.

use party_shared::config::MatchTuning;
use party_shared::protocol::{
    round4, ArrowKind, EndReason, Feedback, GameMode, GameOverMsg, GameStateMsg, MatchStartedMsg,
    Modifier, PlayerWire, ScoreFeedbackMsg, ServerMsg,
};

use crate::beat::{BeatEvent, BeatScheduler};
use crate::input::{Intent, IntentKind, PlayerIndex};
use crate::ledger::{LedgerEvent, ScoreLedger};
use crate::player::{Avatar, MovementMode, PlayerAvatar, Roster};
use crate::simulator::{EntitySimulator, ScoreEvent, SimVariant};

pub enum Engine {
    Entities(EntitySimulator),
    Beat(BeatScheduler),
}

fn movement_for(mode: GameMode) -> MovementMode {
    match mode {
        GameMode::CoinCascade => MovementMode::Free,
        GameMode::BulletBarrage => MovementMode::JumpOnly,
        GameMode::DiscoDash | GameMode::BeatTap => MovementMode::Fixed,
    }
}

fn arrow_for(kind: IntentKind) -> Option<ArrowKind> {
    match kind {
        IntentKind::Left => Some(ArrowKind::ArrowLeft),
        IntentKind::Right => Some(ArrowKind::ArrowRight),
        IntentKind::Jump => Some(ArrowKind::ArrowUp),
        IntentKind::Hit => Some(ArrowKind::Button),
        IntentKind::Still | IntentKind::None => None,
    }
}

pub struct Match {
    mode: GameMode,
    modifier: Modifier,
    ledger: ScoreLedger,
    avatars: Vec<PlayerAvatar>,
    engine: Engine,
    pending: Vec<Intent>,
    start_ms: u64,
    last_tick_ms: u64,
    deadline_ms: Option<u64>,
    ended: Option<EndReason>,
}

impl Match {
    /// `duration_ms` only bounds variants that do not end on lives.
    pub fn start(
        mode: GameMode,
        modifier: Modifier,
        roster: &Roster,
        tuning: &MatchTuning,
        seed: u64,
        start_ms: u64,
        duration_ms: Option<u64>,
    ) -> Self {
        let roster_size = roster.len();
        let movement = movement_for(mode);
        let avatars: Vec<PlayerAvatar> = (0..roster_size)
            .map(|i| PlayerAvatar::new(PlayerIndex::new(i), roster_size, movement, tuning.avatar))
            .collect();

        let engine = match SimVariant::for_mode(mode) {
            Some(variant) => {
                let anchors: Vec<_> = avatars.iter().map(|a| a.tracked_position()).collect();
                Engine::Entities(EntitySimulator::new(
                    variant,
                    *tuning,
                    &anchors,
                    roster_size,
                    seed,
                    start_ms,
                ))
            }
            None => Engine::Beat(BeatScheduler::new(tuning.beat, modifier, start_ms)),
        };

        let lives = mode.tracks_lives().then_some(tuning.spikes.lives);
        let deadline_ms = if mode.tracks_lives() {
            None
        } else {
            duration_ms.map(|d| start_ms + d)
        };

        tracing::info!(
            "Match started: {:?} ({:?}) with {} player(s)",
            mode,
            modifier,
            roster_size
        );

        Self {
            mode,
            modifier,
            ledger: ScoreLedger::new(roster.names(), lives),
            avatars,
            engine,
            pending: Vec::new(),
            start_ms,
            last_tick_ms: start_ms,
            deadline_ms,
            ended: None,
        }
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn is_live(&self) -> bool {
        self.ended.is_none()
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.ended
    }

    pub fn ledger(&self) -> &ScoreLedger {
        &self.ledger
    }

    /// Queue an intent for the next tick. Arrival order is preserved.
    pub fn push_intent(&mut self, intent: Intent) {
        if self.is_live() {
            self.pending.push(intent);
        }
    }

    /// Advance the match to `now_ms` and return every message it produced.
    pub fn tick(&mut self, now_ms: u64) -> Vec<ServerMsg> {
        let mut out = Vec::new();
        if !self.is_live() {
            return out;
        }
        let now_ms = now_ms.max(self.last_tick_ms);

        for intent in std::mem::take(&mut self.pending) {
            let at = intent.timestamp_ms.clamp(self.last_tick_ms, now_ms);
            self.fire_timers(at, &mut out);
            self.apply_intent(intent, at, &mut out);
            if !self.is_live() {
                return out;
            }
        }
        self.fire_timers(now_ms, &mut out);

        let dt = (now_ms - self.last_tick_ms) as f64 / 1000.0;
        for avatar in &mut self.avatars {
            avatar.advance(dt);
        }
        if let Engine::Entities(sim) = &mut self.engine {
            let players: Vec<_> = self.avatars.iter().map(|a| a.tracked_position()).collect();
            for event in sim.advance(now_ms, dt, &players) {
                self.apply_event(event, &mut out);
                if !self.is_live() {
                    return out;
                }
            }
        }
        self.last_tick_ms = now_ms;

        if self.deadline_ms.is_some_and(|d| now_ms >= d) {
            out.push(self.end(EndReason::Timeout));
        }
        out
    }

    fn fire_timers(&mut self, at_ms: u64, out: &mut Vec<ServerMsg>) {
        match &mut self.engine {
            Engine::Entities(sim) => sim.fire_timers(at_ms),
            Engine::Beat(beat) => {
                for event in beat.fire_timers(at_ms) {
                    let BeatEvent::Missed { beat_ms } = event;
                    tracing::debug!("Beat at {}ms missed", beat_ms);
                    for slot in self.ledger.slots() {
                        out.push(feedback(slot.index, Feedback::Miss, 0, None));
                    }
                }
            }
        }
    }

    fn apply_intent(&mut self, intent: Intent, at_ms: u64, out: &mut Vec<ServerMsg>) {
        let Some(avatar) = self.avatars.get_mut(intent.player.get()) else {
            return;
        };
        match self.mode {
            GameMode::CoinCascade | GameMode::BulletBarrage => {
                // The action button doubles as jump when there is nothing to hit.
                let kind = match intent.kind {
                    IntentKind::Hit => IntentKind::Jump,
                    kind => kind,
                };
                avatar.apply_intent(kind);
            }
            GameMode::DiscoDash => {
                avatar.apply_intent(intent.kind);
                let Some(kind) = arrow_for(intent.kind) else {
                    return;
                };
                let event = match &mut self.engine {
                    Engine::Entities(sim) => Some(sim.judge_press(intent.player, kind, at_ms)),
                    Engine::Beat(_) => None,
                };
                if let Some(event) = event {
                    self.apply_event(event, out);
                }
            }
            GameMode::BeatTap => {
                if intent.kind != IntentKind::Hit {
                    return;
                }
                avatar.apply_intent(intent.kind);
                let judgment = match &mut self.engine {
                    Engine::Beat(beat) => beat.hit(at_ms),
                    Engine::Entities(_) => None,
                };
                if let Some(j) = judgment {
                    self.apply_event(
                        ScoreEvent {
                            player: intent.player,
                            score_delta: j.points,
                            life_delta: 0,
                            feedback: j.feedback,
                            entity: None,
                        },
                        out,
                    );
                }
            }
        }
    }

    fn apply_event(&mut self, event: ScoreEvent, out: &mut Vec<ServerMsg>) {
        let ledger_event = self
            .ledger
            .apply_delta(event.player, event.score_delta, event.life_delta);
        out.push(feedback(
            event.player,
            event.feedback,
            event.score_delta,
            event.entity,
        ));
        if let Some(LedgerEvent::GameOver { player }) = ledger_event {
            tracing::info!("Player {} is out of lives", player.to_wire());
            out.push(self.end(EndReason::LivesExhausted));
        }
    }

    /// Stop the match. Every pending timer is torn down; later calls are no-ops
    /// apart from returning the final standings again.
    pub fn end(&mut self, reason: EndReason) -> ServerMsg {
        if self.ended.is_none() {
            self.ended = Some(reason);
            self.pending.clear();
            match &mut self.engine {
                Engine::Entities(sim) => sim.shutdown(),
                Engine::Beat(beat) => beat.shutdown(),
            }
            tracing::info!("Match ended: {:?} ({:?})", self.mode, reason);
        }
        ServerMsg::GameOver(GameOverMsg {
            reason: self.ended.unwrap_or(reason),
            players: self.players_wire(),
        })
    }

    /// Final (username, score) pairs for the leaderboard.
    pub fn final_scores(&self) -> Vec<(String, i64)> {
        self.ledger
            .slots()
            .iter()
            .map(|s| (s.username.clone(), s.score))
            .collect()
    }

    pub fn players_wire(&self) -> Vec<PlayerWire> {
        let tracks_lives = self.ledger.tracks_lives();
        self.ledger
            .slots()
            .iter()
            .zip(&self.avatars)
            .map(|(slot, avatar)| {
                let render = avatar.render_state();
                PlayerWire {
                    player: slot.index.to_wire(),
                    username: slot.username.clone(),
                    score: slot.score,
                    lives: tracks_lives.then_some(slot.lives),
                    pos: [
                        round4(render.feet.x),
                        round4(render.feet.y),
                        round4(render.feet.z),
                    ],
                    pose: render.pose,
                    mirrored: render.mirrored,
                }
            })
            .collect()
    }

    pub fn started_msg(&self) -> MatchStartedMsg {
        MatchStartedMsg {
            mode: self.mode,
            modifier: self.modifier,
            players: self.players_wire(),
        }
    }

    pub fn snapshot(&self, now_ms: u64) -> GameStateMsg {
        let (objects, beat) = match &self.engine {
            Engine::Entities(sim) => (sim.entities().map(|e| e.to_wire()).collect(), None),
            Engine::Beat(beat) => (Vec::new(), Some(beat.to_wire(now_ms))),
        };
        GameStateMsg {
            mode: self.mode,
            elapsed_ms: now_ms.saturating_sub(self.start_ms),
            objects,
            players: self.players_wire(),
            beat,
        }
    }
}

fn feedback(player: PlayerIndex, result: Feedback, points: i64, entity: Option<u64>) -> ServerMsg {
    ServerMsg::ScoreFeedback(ScoreFeedbackMsg {
        player: player.to_wire(),
        result,
        points,
        entity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputSource;

    fn roster(n: usize) -> Roster {
        let names = ["Mario", "Waluigi"][..n]
            .iter()
            .map(|s| s.to_string())
            .collect();
        Roster::new(names).unwrap()
    }

    fn intent(player: usize, kind: IntentKind, timestamp_ms: u64) -> Intent {
        Intent {
            player: PlayerIndex::new(player),
            kind,
            source: InputSource::Controller,
            timestamp_ms,
        }
    }

    fn feedbacks(msgs: &[ServerMsg]) -> Vec<&ScoreFeedbackMsg> {
        msgs.iter()
            .filter_map(|m| match m {
                ServerMsg::ScoreFeedback(f) => Some(f),
                _ => None,
            })
            .collect()
    }

    fn run_frames(m: &mut Match, from_ms: u64, to_ms: u64) -> Vec<ServerMsg> {
        let mut out = Vec::new();
        let mut now = from_ms;
        while now < to_ms && m.is_live() {
            now += 16;
            out.extend(m.tick(now));
        }
        out
    }

    #[test]
    fn two_player_beat_match_scores_perfect_hit() {
        let tuning = MatchTuning::default();
        let mut m = Match::start(GameMode::BeatTap, Modifier::None, &roster(2), &tuning, 1, 0, None);
        m.push_intent(intent(0, IntentKind::Hit, 1500));
        let out = m.tick(1500);

        let fb = feedbacks(&out);
        assert_eq!(fb.len(), 1);
        assert_eq!(fb[0].player, 1);
        assert_eq!(fb[0].result, Feedback::Perfect);
        assert_eq!(m.ledger().score(PlayerIndex::new(0)), 2);
        assert_eq!(m.ledger().score(PlayerIndex::new(1)), 0);
    }

    #[test]
    fn second_player_in_same_cycle_is_not_judged() {
        let tuning = MatchTuning::default();
        let mut m = Match::start(GameMode::BeatTap, Modifier::None, &roster(2), &tuning, 1, 0, None);
        m.push_intent(intent(0, IntentKind::Hit, 1500));
        m.push_intent(intent(1, IntentKind::Hit, 1510));
        let out = m.tick(1516);
        assert_eq!(feedbacks(&out).len(), 1);
        assert_eq!(m.ledger().score(PlayerIndex::new(1)), 0);
    }

    #[test]
    fn intent_is_judged_before_later_timers_fire() {
        let tuning = MatchTuning::default();
        let mut m = Match::start(GameMode::BeatTap, Modifier::None, &roster(1), &tuning, 1, 0, None);
        run_frames(&mut m, 0, 4590);
        // The frame crosses the 6000ms boundary; the hit still belongs to the 3000ms cycle.
        m.push_intent(intent(0, IntentKind::Hit, 4600));
        let out = m.tick(6010);
        let fb = feedbacks(&out);
        assert_eq!(fb.len(), 1);
        assert_eq!(fb[0].result, Feedback::Perfect);
        assert_eq!(m.ledger().score(PlayerIndex::FIRST), 2);
    }

    #[test]
    fn unplayed_beat_reports_miss_for_everyone() {
        let tuning = MatchTuning::default();
        let mut m = Match::start(GameMode::BeatTap, Modifier::None, &roster(2), &tuning, 1, 0, None);
        let out = m.tick(3000);
        let fb = feedbacks(&out);
        assert_eq!(fb.len(), 2);
        assert!(fb.iter().all(|f| f.result == Feedback::Miss && f.points == 0));
    }

    #[test]
    fn non_hit_intents_do_nothing_in_beat_tap() {
        let tuning = MatchTuning::default();
        let mut m = Match::start(GameMode::BeatTap, Modifier::None, &roster(1), &tuning, 1, 0, None);
        m.push_intent(intent(0, IntentKind::Jump, 1500));
        assert!(feedbacks(&m.tick(1500)).is_empty());
    }

    #[test]
    fn spike_match_ends_when_lives_run_out() {
        let mut tuning = MatchTuning::default();
        tuning.spikes.lives = 1;
        tuning.spikes.speed_min = 1.0;
        tuning.spikes.speed_max = 1.0;
        let mut m = Match::start(
            GameMode::BulletBarrage,
            Modifier::None,
            &roster(1),
            &tuning,
            7,
            0,
            Some(1),
        );
        let out = run_frames(&mut m, 0, 10_000);
        let over: Vec<_> = out
            .iter()
            .filter_map(|msg| match msg {
                ServerMsg::GameOver(g) => Some(g),
                _ => None,
            })
            .collect();
        assert_eq!(over.len(), 1, "game over fires exactly once");
        assert_eq!(over[0].reason, EndReason::LivesExhausted);
        assert_eq!(over[0].players[0].lives, Some(0));
        assert_eq!(over[0].players[0].score, -1);
        assert!(!m.is_live());
        assert!(m.tick(20_000).is_empty());
    }

    #[test]
    fn timed_jump_clears_spike() {
        // (spike speed, jump time): the spike spawns at 2000ms and reaches the
        // player at x = -0.9 after 3.4 units of travel.
        for (speed, jump_ms) in [(0.4, 10_224), (1.0, 5_120)] {
            let mut tuning = MatchTuning::default();
            tuning.spikes.speed_min = speed;
            tuning.spikes.speed_max = speed;
            let mut m = Match::start(
                GameMode::BulletBarrage,
                Modifier::None,
                &roster(1),
                &tuning,
                7,
                0,
                None,
            );
            let before = run_frames(&mut m, 0, jump_ms - 16);
            assert!(feedbacks(&before).is_empty(), "speed {}", speed);

            m.push_intent(intent(0, IntentKind::Jump, jump_ms));
            let out = run_frames(&mut m, jump_ms - 16, jump_ms + 2000);
            let fb = feedbacks(&out);
            assert_eq!(fb[0].result, Feedback::Dodged, "speed {}", speed);
            assert_eq!(fb[0].points, 1);
            assert_eq!(fb[0].entity, Some(1));
            assert_eq!(m.ledger().slots()[0].lives, 3);
        }
    }

    #[test]
    fn arrow_press_with_nothing_to_hit_is_a_miss() {
        let tuning = MatchTuning::default();
        let mut m = Match::start(GameMode::DiscoDash, Modifier::None, &roster(2), &tuning, 3, 0, None);
        m.push_intent(intent(1, IntentKind::Left, 100));
        m.push_intent(intent(0, IntentKind::Still, 110));
        let out = m.tick(116);

        let fb = feedbacks(&out);
        assert_eq!(fb.len(), 1);
        assert_eq!(fb[0].player, 2);
        assert_eq!(fb[0].result, Feedback::Miss);
        assert_eq!(fb[0].points, -1);
        assert_eq!(fb[0].entity, None);
        assert_eq!(m.ledger().score(PlayerIndex::new(1)), -1);
        assert_eq!(m.ledger().score(PlayerIndex::new(0)), 0);
    }

    #[test]
    fn coins_fall_onto_standing_players() {
        let mut tuning = MatchTuning::default();
        tuning.coins.spawn_jitter = 0.0;
        tuning.coins.gravity_min = 1.0;
        tuning.coins.gravity_max = 1.0;
        let mut m = Match::start(GameMode::CoinCascade, Modifier::None, &roster(2), &tuning, 3, 0, None);
        // Coin 1 spawns at 1000 and needs ~1.6s to reach the first player.
        let out = run_frames(&mut m, 0, 3000);
        let fb = feedbacks(&out);
        assert_eq!(fb.len(), 1);
        assert_eq!(fb[0].result, Feedback::Collected);
        assert_eq!(m.ledger().score(PlayerIndex::new(0)), 1);
    }

    #[test]
    fn lives_are_hidden_outside_spike_mode() {
        let tuning = MatchTuning::default();
        let m = Match::start(GameMode::CoinCascade, Modifier::None, &roster(2), &tuning, 3, 0, None);
        assert!(m.players_wire().iter().all(|p| p.lives.is_none()));
        assert_eq!(m.players_wire()[1].player, 2);
    }

    #[test]
    fn timeout_ends_untracked_match() {
        let tuning = MatchTuning::default();
        let mut m = Match::start(GameMode::DiscoDash, Modifier::None, &roster(1), &tuning, 3, 0, Some(500));
        assert!(m.tick(499).is_empty());
        let out = m.tick(500);
        assert!(matches!(
            out.last(),
            Some(ServerMsg::GameOver(GameOverMsg {
                reason: EndReason::Timeout,
                ..
            }))
        ));
        assert!(!m.is_live());
    }

    #[test]
    fn end_is_idempotent() {
        let tuning = MatchTuning::default();
        let mut m = Match::start(GameMode::DiscoDash, Modifier::None, &roster(1), &tuning, 3, 0, None);
        m.end(EndReason::Exit);
        let again = m.end(EndReason::Timeout);
        match again {
            ServerMsg::GameOver(g) => assert_eq!(g.reason, EndReason::Exit),
            _ => panic!("Expected GameOver"),
        }
        m.push_intent(intent(0, IntentKind::Hit, 10));
        assert!(m.tick(10_000).is_empty());
        assert!(m.snapshot(10_000).objects.is_empty());
    }

    #[test]
    fn snapshot_reports_elapsed_and_entities() {
        let tuning = MatchTuning::default();
        let mut m = Match::start(GameMode::DiscoDash, Modifier::None, &roster(1), &tuning, 3, 100, None);
        m.tick(1100);
        let snap = m.snapshot(1100);
        assert_eq!(snap.elapsed_ms, 1000);
        assert_eq!(snap.objects.len(), 1);
        assert!(snap.beat.is_none());
    }
}
