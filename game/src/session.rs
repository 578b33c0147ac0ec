//! Glue between the synchronous game and the async score service.

use crate::orchestrator::{Game, Submission};
use crate::score::{LeaderboardEntry, ScoreService, ScoreStore, SubmitReceipt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    pub receipt: Option<SubmitReceipt>,
    /// Fresh top list; only fetched when the score was saved.
    pub top: Option<Vec<LeaderboardEntry>>,
}

pub async fn submit<S: ScoreStore>(
    service: &ScoreService<S>,
    submission: Submission,
    top_n: usize,
) -> SubmissionResult {
    let receipt = service
        .submit_score(submission.score, &submission.display_name)
        .await;
    let top = match receipt {
        Some(_) => Some(service.get_top_scores(top_n).await),
        None => None,
    };
    SubmissionResult { receipt, top }
}

/// Drains the game's confirmed leaderboard entry, if any, and closes the
/// round once the service has answered. Returns whether anything was sent.
pub async fn finish_pending_submission<S: ScoreStore>(
    game: &mut Game,
    service: &ScoreService<S>,
    top_n: usize,
) -> bool {
    let Some(submission) = game.take_pending_submission() else {
        return false;
    };
    let result = submit(service, submission, top_n).await;
    game.apply_submission(result.receipt, result.top);
    true
}

pub async fn refresh_leaderboard<S: ScoreStore>(
    game: &mut Game,
    service: &ScoreService<S>,
    top_n: usize,
) {
    let top = service.get_top_scores(top_n).await;
    tracing::debug!(rows = top.len(), "leaderboard refreshed");
    game.set_leaderboard(top);
}
