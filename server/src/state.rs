use party_shared::config::MatchTuning;
use party_shared::protocol::{
    ConfigAckMsg, ControllerMsg, ControllerStatusMsg, EndReason, GameMode, InitMsg, KeyMsg,
    Modifier, ScoreEntry, ServerMsg, WelcomeMsg, MAX_PLAYERS, PROTOCOL_VERSION,
};

use crate::config::ServerConfig;
use crate::input::{InputRouter, InputSource, Intent, IntentKind, KeyboardRouter, PlayerIndex};
use crate::player::Roster;
use crate::scores::Leaderboard;
use crate::session::Match;
use crate::wheel::{ModifierWheel, WheelOutcome};

/// Where the lobby currently is.
pub enum Phase {
    Lobby,
    Wheel { mode: GameMode, wheel: ModifierWheel },
    Playing(Match),
}

/// Central game state owned by the game loop task.
pub struct GameState {
    pub phase: Phase,
    roster: Roster,
    tuning: MatchTuning,
    rng_seed: u64,
    match_duration_ms: u64,
    router: InputRouter,
    keyboard: KeyboardRouter,
    /// Connected controller per slot
    controllers: [bool; MAX_PLAYERS],
    leaderboard: Leaderboard,
    matches_started: u64,
}

impl GameState {
    pub fn new(server_config: &ServerConfig) -> Self {
        let roster = server_config.roster().unwrap_or_else(|e| {
            tracing::warn!("Configured player names rejected ({}), using placeholders", e);
            Roster::placeholder()
        });
        Self {
            phase: Phase::Lobby,
            router: InputRouter::new(roster.len()),
            roster,
            tuning: server_config.tuning,
            rng_seed: server_config.rng_seed,
            match_duration_ms: server_config.match_duration_ms(),
            keyboard: KeyboardRouter::new(),
            controllers: [false; MAX_PLAYERS],
            leaderboard: Leaderboard::new(),
            matches_started: 0,
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn leaderboard(&self) -> &Leaderboard {
        &self.leaderboard
    }

    pub fn standings(&self) -> Vec<ScoreEntry> {
        self.leaderboard.standings()
    }

    pub fn welcome(&self) -> WelcomeMsg {
        WelcomeMsg {
            protocol_version: PROTOCOL_VERSION,
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            names: self.roster.names().to_vec(),
            tuning: self.tuning,
        }
    }

    /// Apply a lobby `init`. An invalid roster keeps the previous one.
    pub fn configure(&mut self, msg: &InitMsg) -> Vec<ServerMsg> {
        if !matches!(self.phase, Phase::Lobby) {
            tracing::debug!("Ignoring init outside the lobby");
            return Vec::new();
        }
        match Roster::from_init(msg) {
            Ok(roster) => {
                tracing::info!("Roster configured: {:?}", roster.names());
                self.roster = roster;
                self.router.set_roster_size(self.roster.len());
            }
            Err(e) => tracing::warn!("Rejected init: {}", e),
        }
        vec![ServerMsg::ConfigAck(ConfigAckMsg {
            num_players: self.roster.len() as u32,
            names: self.roster.names().to_vec(),
        })]
    }

    /// Pick a game from the lobby and bring up the modifier wheel.
    pub fn select_game(&mut self, mode: GameMode) -> Vec<ServerMsg> {
        if !matches!(self.phase, Phase::Lobby) {
            tracing::debug!("Ignoring game selection outside the lobby");
            return Vec::new();
        }
        tracing::info!("Game selected: {:?}", mode);
        let wheel = ModifierWheel::new(self.tuning.wheel);
        let msg = ServerMsg::WheelState(wheel.to_wire(mode));
        self.phase = Phase::Wheel { mode, wheel };
        vec![msg]
    }

    pub fn controller(&mut self, msg: &ControllerMsg, now_ms: u64) -> Vec<ServerMsg> {
        match self.router.route(msg, now_ms) {
            Some(intent) => self.dispatch(intent, now_ms),
            None => Vec::new(),
        }
    }

    pub fn key(&mut self, msg: &KeyMsg, now_ms: u64) -> Vec<ServerMsg> {
        match self.keyboard.handle(msg, now_ms) {
            Some(intent) => self.dispatch(intent, now_ms),
            None => Vec::new(),
        }
    }

    /// A wheel press from the browser.
    pub fn wheel_press(&mut self, now_ms: u64) -> Vec<ServerMsg> {
        self.press_wheel(now_ms, false)
    }

    fn dispatch(&mut self, intent: Intent, now_ms: u64) -> Vec<ServerMsg> {
        if let Phase::Playing(m) = &mut self.phase {
            m.push_intent(intent);
            return Vec::new();
        }
        if matches!(self.phase, Phase::Wheel { .. }) && intent.kind == IntentKind::Hit {
            // The keyboard can brake the wheel but never start or commit it.
            return self.press_wheel(now_ms, intent.source == InputSource::Keyboard);
        }
        Vec::new()
    }

    fn press_wheel(&mut self, now_ms: u64, stop_only: bool) -> Vec<ServerMsg> {
        let Phase::Wheel { mode, wheel } = &mut self.phase else {
            return Vec::new();
        };
        let mode = *mode;
        let outcome = if stop_only {
            wheel.request_stop()
        } else {
            wheel.press()
        };
        match outcome {
            WheelOutcome::Committed(modifier) => self.start_match(mode, modifier, now_ms),
            WheelOutcome::Ignored if stop_only => Vec::new(),
            _ => vec![ServerMsg::WheelState(wheel.to_wire(mode))],
        }
    }

    fn start_match(&mut self, mode: GameMode, modifier: Modifier, now_ms: u64) -> Vec<ServerMsg> {
        let seed = self.rng_seed.wrapping_add(self.matches_started);
        self.matches_started += 1;
        self.keyboard.reset();
        let m = Match::start(
            mode,
            modifier,
            &self.roster,
            &self.tuning,
            seed,
            now_ms,
            Some(self.match_duration_ms),
        );
        let started = ServerMsg::MatchStarted(m.started_msg());
        self.phase = Phase::Playing(m);
        vec![started]
    }

    /// Leave the wheel or the running match and return to the lobby.
    pub fn exit(&mut self) -> Vec<ServerMsg> {
        match std::mem::replace(&mut self.phase, Phase::Lobby) {
            Phase::Playing(mut m) => {
                let over = m.end(EndReason::Exit);
                self.finish(&m);
                vec![over]
            }
            Phase::Wheel { .. } => {
                tracing::info!("Wheel abandoned");
                Vec::new()
            }
            Phase::Lobby => Vec::new(),
        }
    }

    /// Advance whatever is running to `now_ms`.
    pub fn tick(&mut self, now_ms: u64) -> Vec<ServerMsg> {
        match &mut self.phase {
            Phase::Lobby => Vec::new(),
            Phase::Wheel { mode, wheel } => match wheel.tick() {
                Some(modifier) => {
                    tracing::info!("Wheel settled on {:?}", modifier);
                    vec![ServerMsg::WheelState(wheel.to_wire(*mode))]
                }
                None => Vec::new(),
            },
            Phase::Playing(m) => {
                let out = m.tick(now_ms);
                if !m.is_live() {
                    if let Phase::Playing(m) = std::mem::replace(&mut self.phase, Phase::Lobby) {
                        self.finish(&m);
                    }
                }
                out
            }
        }
    }

    fn finish(&mut self, m: &Match) {
        let scores = m.final_scores();
        self.leaderboard
            .record(scores.iter().map(|(name, score)| (name.as_str(), *score)));
        self.keyboard.reset();
    }

    /// Periodic state for every client, if anything is running.
    pub fn snapshot(&self, now_ms: u64) -> Option<ServerMsg> {
        match &self.phase {
            Phase::Lobby => None,
            Phase::Wheel { mode, wheel } => Some(ServerMsg::WheelState(wheel.to_wire(*mode))),
            Phase::Playing(m) => Some(ServerMsg::GameState(m.snapshot(now_ms))),
        }
    }

    /// Claim the first free controller slot within the roster.
    pub fn controller_join(&mut self) -> Option<(u32, ServerMsg)> {
        let index = (0..self.roster.len()).find(|&i| !self.controllers[i])?;
        self.controllers[index] = true;
        let player = PlayerIndex::new(index).to_wire();
        tracing::info!("Controller connected as player {}", player);
        Some((player, self.controller_status(index, true)))
    }

    pub fn controller_leave(&mut self, player: u32) -> Option<ServerMsg> {
        let index = PlayerIndex::from_wire(player, MAX_PLAYERS)?.get();
        if !std::mem::replace(&mut self.controllers[index], false) {
            return None;
        }
        tracing::info!("Controller for player {} disconnected", player);
        Some(self.controller_status(index, false))
    }

    fn controller_status(&self, index: usize, connected: bool) -> ServerMsg {
        let name = self
            .roster
            .names()
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("Player {}", index + 1));
        ServerMsg::ControllerStatus(ControllerStatusMsg {
            player: PlayerIndex::new(index).to_wire(),
            name,
            connected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use party_shared::protocol::{Feedback, WheelPhase};

    fn test_state() -> GameState {
        GameState::new(&ServerConfig {
            rng_seed: 12345,
            match_duration_secs: 5,
            ..Default::default()
        })
    }

    fn hit(player: u32) -> ControllerMsg {
        ControllerMsg::from_code(player, "B1")
    }

    /// Press, brake and commit the wheel, returning the match-start messages.
    fn spin_to_match(state: &mut GameState, now_ms: u64) -> Vec<ServerMsg> {
        state.controller(&hit(1), now_ms);
        state.controller(&hit(1), now_ms);
        for _ in 0..200 {
            state.tick(now_ms);
        }
        state.controller(&hit(1), now_ms)
    }

    #[test]
    fn lobby_starts_with_configured_names() {
        let state = GameState::new(&ServerConfig {
            player_names: vec!["Daisy".into()],
            ..Default::default()
        });
        assert_eq!(state.roster().names(), ["Daisy"]);
        assert_eq!(state.welcome().names, vec!["Daisy"]);

        let state = GameState::new(&ServerConfig {
            player_names: Vec::new(),
            ..Default::default()
        });
        assert_eq!(state.roster().names(), ["Player 1", "Player 2"]);
    }

    #[test]
    fn init_configures_roster() {
        let mut state = test_state();
        let out = state.configure(&InitMsg {
            num_players: 1,
            names: vec!["Peach".into()],
        });
        match &out[0] {
            ServerMsg::ConfigAck(ack) => {
                assert_eq!(ack.num_players, 1);
                assert_eq!(ack.names, vec!["Peach".to_string()]);
            }
            other => panic!("Expected ConfigAck, got {:?}", other),
        }
        assert_eq!(state.roster().len(), 1);
    }

    #[test]
    fn invalid_init_keeps_previous_roster() {
        let mut state = test_state();
        let out = state.configure(&InitMsg {
            num_players: 5,
            names: vec![],
        });
        assert_eq!(out.len(), 1);
        assert_eq!(state.roster().names(), &["Mario".to_string(), "Waluigi".to_string()]);
    }

    #[test]
    fn lobby_ignores_controller_input() {
        let mut state = test_state();
        assert!(state.controller(&hit(1), 0).is_empty());
        assert!(state.snapshot(0).is_none());
    }

    #[test]
    fn wheel_commit_starts_match() {
        let mut state = test_state();
        let out = state.select_game(GameMode::BeatTap);
        assert!(matches!(&out[0], ServerMsg::WheelState(w) if w.state == WheelPhase::Idle));

        let out = spin_to_match(&mut state, 100);
        match &out[0] {
            ServerMsg::MatchStarted(m) => {
                assert_eq!(m.mode, GameMode::BeatTap);
                assert_eq!(m.players.len(), 2);
            }
            other => panic!("Expected MatchStarted, got {:?}", other),
        }
        assert!(matches!(state.phase, Phase::Playing(_)));
    }

    #[test]
    fn keyboard_space_only_brakes_the_wheel() {
        let mut state = test_state();
        state.select_game(GameMode::CoinCascade);
        let space = |down| KeyMsg {
            key: " ".to_string(),
            down,
        };
        // Idle wheel: the keyboard cannot start it.
        assert!(state.key(&space(true), 0).is_empty());
        state.key(&space(false), 0);

        state.wheel_press(0);
        let out = state.key(&space(true), 0);
        assert!(matches!(&out[0], ServerMsg::WheelState(w) if w.state == WheelPhase::Spinning));
    }

    #[test]
    fn beat_match_scores_and_records_on_exit() {
        let mut state = test_state();
        state.select_game(GameMode::BeatTap);
        spin_to_match(&mut state, 0);

        state.controller(&hit(2), 1500);
        let out = state.tick(1500);
        assert!(out.iter().any(|m| matches!(
            m,
            ServerMsg::ScoreFeedback(f) if f.player == 2 && f.result == Feedback::Perfect
        )));

        let out = state.exit();
        assert!(matches!(&out[0], ServerMsg::GameOver(g) if g.reason == EndReason::Exit));
        assert!(matches!(state.phase, Phase::Lobby));

        let standings = state.standings();
        assert_eq!(standings[0].username, "Waluigi");
        assert_eq!(standings[0].score, 2);
    }

    #[test]
    fn timed_out_match_returns_to_lobby() {
        let mut state = test_state();
        state.select_game(GameMode::DiscoDash);
        spin_to_match(&mut state, 0);
        let out = state.tick(5000);
        assert!(out
            .iter()
            .any(|m| matches!(m, ServerMsg::GameOver(g) if g.reason == EndReason::Timeout)));
        assert!(matches!(state.phase, Phase::Lobby));
        assert_eq!(state.leaderboard().len(), 2);
    }

    #[test]
    fn controller_slots_follow_roster() {
        let mut state = test_state();
        let (p1, _) = state.controller_join().unwrap();
        let (p2, status) = state.controller_join().unwrap();
        assert_eq!((p1, p2), (1, 2));
        assert!(matches!(status, ServerMsg::ControllerStatus(s) if s.name == "Waluigi" && s.connected));
        assert!(state.controller_join().is_none());

        assert!(state.controller_leave(1).is_some());
        assert!(state.controller_leave(1).is_none());
        assert_eq!(state.controller_join().unwrap().0, 1);
    }
}
