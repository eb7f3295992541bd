use axum::routing::get;
use axum::Router;
use party_server::config::ServerConfig;
use party_server::controller::run_controller_listener;
use party_server::game_loop::{run_game_loop, GameCommand};
use party_server::scores::scores_handler;
use party_server::ws::{ws_handler, AppState};
use party_shared::protocol::ServerMsg;
use tokio::sync::{broadcast, mpsc};
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env()?;
    init_tracing(&config.log_level);

    let listen_addr = config.listen_addr.clone();
    let controller_addr = config.controller_addr.clone();

    let (game_tx, game_rx) = mpsc::channel::<GameCommand>(256);
    let (broadcast_tx, _) = broadcast::channel::<ServerMsg>(64);

    // Spawn game loop
    let bc_tx = broadcast_tx.clone();
    tokio::spawn(async move {
        run_game_loop(game_rx, bc_tx, config).await;
    });

    // Physical controllers
    let controller_listener = tokio::net::TcpListener::bind(&controller_addr).await?;
    tracing::info!("Accepting controllers on {}", controller_addr);
    tokio::spawn(run_controller_listener(controller_listener, game_tx.clone()));

    // Axum app
    let app_state = AppState {
        game_tx,
        broadcast_tx,
    };
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/scores", get(scores_handler))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    tracing::info!("Starting party server on {}", listen_addr);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
