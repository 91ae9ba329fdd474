use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::context::tag_possessions;
use crate::error::{ConfigError, FailureReason, GameFailure};
use crate::event::GameEvents;
use crate::rules::RuleSet;
use crate::segment::{Possession, Segmentation, segment};
use crate::stats::RunStatistics;
use crate::validate::{ValidationReport, validate_game};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentedGame {
    pub game_id: String,
    pub possessions: Vec<Possession>,
    pub report: ValidationReport,
    pub stats: RunStatistics,
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub games: Vec<Result<SegmentedGame, GameFailure>>,
    pub stats: RunStatistics,
}

impl BatchOutcome {
    pub fn succeeded(&self) -> impl Iterator<Item = &SegmentedGame> {
        self.games.iter().filter_map(|game| game.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &GameFailure> {
        self.games.iter().filter_map(|game| game.as_ref().err())
    }
}

/// Segments, tags and validates one game. `rules` must already be validated.
pub fn process_game(game: &GameEvents, rules: &RuleSet) -> Result<SegmentedGame, GameFailure> {
    let Segmentation {
        possessions,
        mut stats,
        ambiguous_free_throws,
    } = segment(game, rules);
    stats.games_processed = 1;
    let last_good_possession = possessions.last().map(|p| p.possession_number);

    let orphan_percent = stats.orphaned_percent();
    if orphan_percent > rules.max_orphaned_event_percent {
        stats.games_failed = 1;
        let reason = FailureReason::GameProcessingFailed {
            orphaned: stats.orphaned_total(),
            total: game.total_records(),
            percent: orphan_percent,
            limit: rules.max_orphaned_event_percent,
        };
        warn!(game_id = %game.game_id, "game failed: {reason}");
        return Err(GameFailure {
            game_id: game.game_id.clone(),
            last_good_possession,
            reason,
            possessions,
            report: None,
            stats,
        });
    }

    let possessions = tag_possessions(possessions, rules);
    let report = validate_game(game, &possessions, &stats, &ambiguous_free_throws, rules);

    if let Some(reason) = report.first_fatal() {
        stats.games_failed = 1;
        warn!(game_id = %game.game_id, "game failed: {reason}");
        return Err(GameFailure {
            game_id: game.game_id.clone(),
            last_good_possession,
            reason,
            possessions,
            report: Some(report),
            stats,
        });
    }

    if report.oliver_flagged() {
        warn!(
            game_id = %game.game_id,
            estimated = report.oliver_estimate,
            actual = report.actual_possessions,
            delta_pct = report.delta_percent,
            "possession count outside oliver tolerance"
        );
    }

    Ok(SegmentedGame {
        game_id: game.game_id.clone(),
        possessions,
        report,
        stats,
    })
}

/// Processes independent games in parallel. The rule set is validated once
/// up front; an invalid one aborts the whole batch.
pub fn process_games(games: &[GameEvents], rules: &RuleSet) -> Result<BatchOutcome, ConfigError> {
    rules.validate()?;

    let results: Vec<Result<SegmentedGame, GameFailure>> = games
        .par_iter()
        .map(|game| process_game(game, rules))
        .collect();

    let stats: RunStatistics = results
        .iter()
        .map(|result| match result {
            Ok(game) => &game.stats,
            Err(failure) => &failure.stats,
        })
        .sum();
    info!(
        games = stats.games_processed,
        failed = stats.games_failed,
        possessions = stats.possessions_emitted,
        "batch segmented"
    );

    Ok(BatchOutcome {
        games: results,
        stats,
    })
}

/// SHA-256 (hex) of the serialized possessions.
pub fn possessions_fingerprint(possessions: &[Possession]) -> String {
    let bytes = serde_json::to_vec(possessions).unwrap_or_default();
    let digest = Sha256::digest(&bytes);
    format!("{digest:x}")
}
