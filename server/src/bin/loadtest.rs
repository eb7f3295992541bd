//! Load test for the party server.
//!
//! Spawns multiple fake WebSocket clients that:
//! - Connect to the server
//! - Client 0 configures the lobby, picks a game and drives the wheel
//! - Every client sends random controller edges for both players
//! - Receive and count game_state / score_feedback broadcasts
//!
//! Usage: cargo run --bin loadtest -- [OPTIONS]
//!
//! Options:
//!   --clients N      Number of clients to spawn (default: 20)
//!   --duration S     Test duration in seconds (default: 30)
//!   --rate R         Controller messages per second per client (default: 5)
//!   --url URL        Server URL (default: ws://127.0.0.1:9001/ws)

use futures_util::{Sink, SinkExt, StreamExt};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

// === Protocol types (minimal subset) ===

#[derive(Serialize)]
#[serde(tag = "type")]
enum ClientMsg {
    #[serde(rename = "init")]
    Init {
        #[serde(rename = "numPlayers")]
        num_players: u32,
        names: Vec<String>,
    },
    #[serde(rename = "game_selection")]
    GameSelection { mode: &'static str },
    #[serde(rename = "wheel_press")]
    WheelPress,
    #[serde(rename = "data")]
    Data { player: u32, data: &'static str },
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ServerMsg {
    #[serde(rename = "game_state")]
    GameState { objects: Vec<serde_json::Value> },
    #[serde(rename = "score_feedback")]
    ScoreFeedback {},
    #[serde(rename = "match_started")]
    MatchStarted {},
    #[serde(rename = "game_over")]
    GameOver {},
    #[serde(other)]
    Other,
}

const CODES: [&str; 6] = ["L", "R", "J", "B1", "B2", "N"];
const MODES: [&str; 4] = ["Coin Cascade", "Bullet Barrage", "Disco Dash", "Beat Tap"];

// === Metrics ===

struct Metrics {
    connected: AtomicU64,
    messages_received: AtomicU64,
    game_states_received: AtomicU64,
    feedback_received: AtomicU64,
    matches_started: AtomicU64,
    matches_ended: AtomicU64,
    inputs_sent: AtomicU64,
    errors: AtomicU64,
    total_objects_seen: AtomicU64,
    latency_sum_ms: AtomicU64,
    latency_count: AtomicU64,
}

impl Metrics {
    fn new() -> Self {
        Self {
            connected: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            game_states_received: AtomicU64::new(0),
            feedback_received: AtomicU64::new(0),
            matches_started: AtomicU64::new(0),
            matches_ended: AtomicU64::new(0),
            inputs_sent: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            total_objects_seen: AtomicU64::new(0),
            latency_sum_ms: AtomicU64::new(0),
            latency_count: AtomicU64::new(0),
        }
    }
}

// === Client task ===

async fn run_client(
    client_id: u32,
    url: String,
    rate: f64,
    duration: Duration,
    metrics: Arc<Metrics>,
) {
    let connect_start = Instant::now();

    let (mut ws, _) = match connect_async(url.as_str()).await {
        Ok(conn) => conn,
        Err(e) => {
            if client_id < 5 {
                eprintln!("Client {} failed to connect: {}", client_id, e);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    let connect_latency = connect_start.elapsed();
    metrics
        .latency_sum_ms
        .fetch_add(connect_latency.as_millis() as u64, Ordering::Relaxed);
    metrics.latency_count.fetch_add(1, Ordering::Relaxed);
    metrics.connected.fetch_add(1, Ordering::Relaxed);

    let mut rng = ChaCha8Rng::seed_from_u64(client_id as u64 * 12345 + 67890);

    // Client 0 owns the lobby flow
    let is_host = client_id == 0;
    if is_host {
        let init = ClientMsg::Init {
            num_players: 2,
            names: vec!["Mario".to_string(), "Waluigi".to_string()],
        };
        if !send(&mut ws, &init).await {
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    }

    let input_interval = if rate > 0.0 {
        Duration::from_secs_f64(1.0 / rate)
    } else {
        Duration::from_secs(3600) // Effectively never
    };
    let mut input_timer = tokio::time::interval(input_interval);
    input_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    // Host presses the wheel twice a second; three presses start a match
    let mut lobby_timer = tokio::time::interval(Duration::from_millis(500));
    lobby_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut in_match = false;
    let mut selected = false;

    let test_end = Instant::now() + duration;

    loop {
        if Instant::now() >= test_end {
            break;
        }

        tokio::select! {
            _ = input_timer.tick() => {
                let msg = ClientMsg::Data {
                    player: rng.gen_range(1..=2),
                    data: CODES[rng.gen_range(0..CODES.len())],
                };
                if send(&mut ws, &msg).await {
                    metrics.inputs_sent.fetch_add(1, Ordering::Relaxed);
                } else {
                    metrics.errors.fetch_add(1, Ordering::Relaxed);
                    break;
                }
            }

            _ = lobby_timer.tick(), if is_host && !in_match => {
                let msg = if selected {
                    ClientMsg::WheelPress
                } else {
                    selected = true;
                    ClientMsg::GameSelection { mode: MODES[rng.gen_range(0..MODES.len())] }
                };
                if !send(&mut ws, &msg).await {
                    metrics.errors.fetch_add(1, Ordering::Relaxed);
                    break;
                }
            }

            msg = ws.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                        match serde_json::from_str::<ServerMsg>(&text) {
                            Ok(ServerMsg::GameState { objects }) => {
                                metrics.game_states_received.fetch_add(1, Ordering::Relaxed);
                                metrics.total_objects_seen.fetch_add(objects.len() as u64, Ordering::Relaxed);
                            }
                            Ok(ServerMsg::ScoreFeedback {}) => {
                                metrics.feedback_received.fetch_add(1, Ordering::Relaxed);
                            }
                            Ok(ServerMsg::MatchStarted {}) => {
                                in_match = true;
                                if is_host {
                                    metrics.matches_started.fetch_add(1, Ordering::Relaxed);
                                }
                            }
                            Ok(ServerMsg::GameOver {}) => {
                                in_match = false;
                                selected = false;
                                if is_host {
                                    metrics.matches_ended.fetch_add(1, Ordering::Relaxed);
                                }
                            }
                            Ok(ServerMsg::Other) => {}
                            Err(_) => {
                                metrics.errors.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        if client_id < 3 {
                            eprintln!("Client {} error: {}", client_id, e);
                        }
                        metrics.errors.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    let _ = ws.close(None).await;
    metrics.connected.fetch_sub(1, Ordering::Relaxed);
}

async fn send<S>(ws: &mut S, msg: &ClientMsg) -> bool
where
    S: Sink<Message> + Unpin,
{
    match serde_json::to_string(msg) {
        Ok(json) => ws.send(Message::Text(json.into())).await.is_ok(),
        Err(_) => false,
    }
}

// === Main ===

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut num_clients: u32 = 20;
    let mut duration_secs: u64 = 30;
    let mut rate: f64 = 5.0;
    let mut url = "ws://127.0.0.1:9001/ws".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--clients" => {
                i += 1;
                num_clients = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(20);
            }
            "--duration" => {
                i += 1;
                duration_secs = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(30);
            }
            "--rate" => {
                i += 1;
                rate = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(5.0);
            }
            "--url" => {
                i += 1;
                url = args.get(i).cloned().unwrap_or(url);
            }
            _ => {}
        }
        i += 1;
    }

    println!("=== Party Server Load Test ===");
    println!("Clients: {}", num_clients);
    println!("Duration: {}s", duration_secs);
    println!("Input rate: {}/s per client", rate);
    println!("URL: {}", url);
    println!();

    let metrics = Arc::new(Metrics::new());
    let duration = Duration::from_secs(duration_secs);

    let mut handles = Vec::with_capacity(num_clients as usize);
    let spawn_start = Instant::now();

    for client_id in 0..num_clients {
        let url = url.clone();
        let metrics = Arc::clone(&metrics);

        handles.push(tokio::spawn(async move {
            run_client(client_id, url, rate, duration, metrics).await;
        }));

        // Stagger spawns slightly to avoid thundering herd
        if client_id % 50 == 49 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    println!("All clients spawned in {:?}", spawn_start.elapsed());
    println!();

    // Print stats periodically
    let metrics_clone = Arc::clone(&metrics);
    let stats_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        let start = Instant::now();

        loop {
            interval.tick().await;
            let elapsed = start.elapsed().as_secs();
            if elapsed >= duration_secs + 5 {
                break;
            }

            println!(
                "[{:3}s] connected={}, msgs={}, game_states={}, feedback={}, inputs={}, errors={}",
                elapsed,
                metrics_clone.connected.load(Ordering::Relaxed),
                metrics_clone.messages_received.load(Ordering::Relaxed),
                metrics_clone.game_states_received.load(Ordering::Relaxed),
                metrics_clone.feedback_received.load(Ordering::Relaxed),
                metrics_clone.inputs_sent.load(Ordering::Relaxed),
                metrics_clone.errors.load(Ordering::Relaxed),
            );
        }
    });

    for handle in handles {
        let _ = handle.await;
    }

    stats_handle.abort();

    // Final stats
    println!();
    println!("=== Final Results ===");
    let msgs = metrics.messages_received.load(Ordering::Relaxed);
    let game_states = metrics.game_states_received.load(Ordering::Relaxed);
    let objects = metrics.total_objects_seen.load(Ordering::Relaxed);
    let latency_sum = metrics.latency_sum_ms.load(Ordering::Relaxed);
    let latency_count = metrics.latency_count.load(Ordering::Relaxed);

    println!("Total messages received: {}", msgs);
    println!("Total game_state messages: {}", game_states);
    println!(
        "Total score_feedback messages: {}",
        metrics.feedback_received.load(Ordering::Relaxed)
    );
    println!(
        "Matches started/ended: {}/{}",
        metrics.matches_started.load(Ordering::Relaxed),
        metrics.matches_ended.load(Ordering::Relaxed)
    );
    println!(
        "Total inputs sent: {}",
        metrics.inputs_sent.load(Ordering::Relaxed)
    );
    println!("Total errors: {}", metrics.errors.load(Ordering::Relaxed));
    println!(
        "Average objects per game_state: {}",
        if game_states > 0 { objects / game_states } else { 0 }
    );

    if latency_count > 0 {
        println!("Average connect latency: {}ms", latency_sum / latency_count);
    }

    let msgs_per_sec = msgs as f64 / duration_secs.max(1) as f64;
    println!();
    println!("Messages/sec (total): {:.0}", msgs_per_sec);
}
