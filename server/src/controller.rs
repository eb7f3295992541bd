//! TCP bridge for physical controllers.
//!
//! A controller connects, receives the start byte `S`, then streams short
//! ASCII codes (`L R J B1 B2 N`). Each code becomes one controller message
//! for the slot the controller was assigned on connect.

use std::net::SocketAddr;

use party_shared::protocol::ControllerMsg;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};

use crate::game_loop::GameCommand;
use crate::input::MAX_MESSAGE_BYTES;

/// Sent once after a slot is assigned
pub const START_BYTE: &[u8] = b"S";

/// Codes in one received chunk.
pub fn codes(chunk: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(chunk)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Accept controllers until the listener fails.
pub async fn run_controller_listener(listener: TcpListener, game_tx: mpsc::Sender<GameCommand>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                tokio::spawn(handle_controller(stream, addr, game_tx.clone()));
            }
            Err(e) => {
                tracing::warn!("Controller accept failed: {}", e);
            }
        }
    }
}

async fn handle_controller(
    mut stream: TcpStream,
    addr: SocketAddr,
    game_tx: mpsc::Sender<GameCommand>,
) {
    let (resp_tx, resp_rx) = oneshot::channel();
    if game_tx
        .send(GameCommand::ControllerJoin { response: resp_tx })
        .await
        .is_err()
    {
        tracing::error!("Failed to send ControllerJoin command");
        return;
    }
    let player = match resp_rx.await {
        Ok(Some(player)) => player,
        Ok(None) => {
            tracing::warn!("No free controller slot, rejecting {}", addr);
            return;
        }
        Err(_) => return,
    };

    tracing::info!("Controller at {} assigned to player {}", addr, player);
    if let Err(e) = stream.write_all(START_BYTE).await {
        tracing::warn!("Failed to start controller {}: {}", addr, e);
    } else {
        let mut buf = vec![0u8; MAX_MESSAGE_BYTES];
        loop {
            let n = match stream.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!("Controller {} read failed: {}", addr, e);
                    break;
                }
            };
            for code in codes(&buf[..n]) {
                let msg = ControllerMsg::from_code(player, &code);
                if game_tx.send(GameCommand::Controller(msg)).await.is_err() {
                    return;
                }
            }
        }
    }

    let _ = game_tx.send(GameCommand::ControllerLeave { player }).await;
    tracing::info!("Controller for player {} disconnected", player);
}
