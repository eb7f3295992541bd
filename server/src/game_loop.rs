use crate::config::ServerConfig;
use crate::state::GameState;
use party_shared::protocol::{ClientMsg, ControllerMsg, ScoreEntry, ServerMsg, WelcomeMsg};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, oneshot};

/// Commands from connections to the game loop
pub enum GameCommand {
    /// A browser connected and wants the welcome
    Join {
        response: oneshot::Sender<WelcomeMsg>,
    },
    Client(ClientMsg),
    /// One edge from the TCP controller bridge
    Controller(ControllerMsg),
    /// Responds with the assigned 1-based player, or None when every slot is taken
    ControllerJoin {
        response: oneshot::Sender<Option<u32>>,
    },
    ControllerLeave {
        player: u32,
    },
    Standings {
        response: oneshot::Sender<Vec<ScoreEntry>>,
    },
}

/// Run the main game loop. Owns all game state.
pub async fn run_game_loop(
    mut cmd_rx: mpsc::Receiver<GameCommand>,
    broadcast_tx: broadcast::Sender<ServerMsg>,
    server_config: ServerConfig,
) {
    let mut state = GameState::new(&server_config);

    let tick_duration = Duration::from_secs_f64(1.0 / server_config.tick_rate_hz as f64);
    let broadcast_every_n = (server_config.tick_rate_hz / server_config.broadcast_rate_hz).max(1);
    let mut tick_count: u64 = 0;

    let mut tick_interval = tokio::time::interval(tick_duration);
    tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    // Every timestamp in a match is milliseconds since this instant.
    let epoch = Instant::now();
    let now_ms = || epoch.elapsed().as_millis() as u64;

    let send_all = |msgs: Vec<ServerMsg>| {
        for msg in msgs {
            let _ = broadcast_tx.send(msg);
        }
    };

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                let now = now_ms();
                send_all(state.tick(now));

                // Broadcast state at lower rate
                tick_count += 1;
                if tick_count % broadcast_every_n as u64 == 0 {
                    if let Some(msg) = state.snapshot(now) {
                        let _ = broadcast_tx.send(msg);
                    }
                }
            }

            Some(cmd) = cmd_rx.recv() => {
                let now = now_ms();
                match cmd {
                    GameCommand::Join { response } => {
                        let _ = response.send(state.welcome());
                    }
                    GameCommand::Client(msg) => {
                        let out = match msg {
                            ClientMsg::Data(c) => state.controller(&c, now),
                            ClientMsg::Key(k) => state.key(&k, now),
                            ClientMsg::Init(init) => state.configure(&init),
                            ClientMsg::GameSelection(sel) => state.select_game(sel.mode),
                            ClientMsg::WheelPress => state.wheel_press(now),
                            ClientMsg::Exit => state.exit(),
                        };
                        send_all(out);
                    }
                    GameCommand::Controller(msg) => {
                        send_all(state.controller(&msg, now));
                    }
                    GameCommand::ControllerJoin { response } => {
                        match state.controller_join() {
                            Some((player, status)) => {
                                if response.send(Some(player)).is_ok() {
                                    let _ = broadcast_tx.send(status);
                                } else {
                                    // Connection gave up before hearing back; free the slot.
                                    state.controller_leave(player);
                                }
                            }
                            None => {
                                let _ = response.send(None);
                            }
                        }
                    }
                    GameCommand::ControllerLeave { player } => {
                        if let Some(status) = state.controller_leave(player) {
                            let _ = broadcast_tx.send(status);
                        }
                    }
                    GameCommand::Standings { response } => {
                        let _ = response.send(state.standings());
                    }
                }
            }

            else => break,
        }
    }

    tracing::info!("Game loop ended");
}
