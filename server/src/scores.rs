use std::collections::HashMap;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use party_shared::protocol::{ScoreEntry, ScoresResponse};
use tokio::sync::oneshot;

use crate::game_loop::GameCommand;
use crate::ws::AppState;

/// Cumulative score per username across every finished match.
///
/// Owned by the game loop; HTTP readers get a copy through [`GameCommand::Standings`].
#[derive(Debug, Clone, Default)]
pub struct Leaderboard {
    totals: HashMap<String, i64>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add each player's final match score to their running total.
    pub fn record<'a>(&mut self, results: impl IntoIterator<Item = (&'a str, i64)>) {
        for (username, score) in results {
            *self.totals.entry(username.to_string()).or_insert(0) += score;
        }
    }

    /// Highest total first; equal totals ordered by username.
    pub fn standings(&self) -> Vec<ScoreEntry> {
        let mut scores: Vec<ScoreEntry> = self
            .totals
            .iter()
            .map(|(username, score)| ScoreEntry {
                username: username.clone(),
                score: *score,
            })
            .collect();
        scores.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.username.cmp(&b.username)));
        scores
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

/// `GET /scores`
pub async fn scores_handler(
    State(app_state): State<AppState>,
) -> Result<Json<ScoresResponse>, StatusCode> {
    let (resp_tx, resp_rx) = oneshot::channel();
    if app_state
        .game_tx
        .send(GameCommand::Standings { response: resp_tx })
        .await
        .is_err()
    {
        tracing::error!("Failed to send Standings command");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    match resp_rx.await {
        Ok(scores) => Ok(Json(ScoresResponse { scores })),
        Err(_) => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}
