use serde::{Deserialize, Serialize};

use crate::error::{FailureReason, ScoreSide};
use crate::event::{EventKind, GameEvents, ReboundKind};
use crate::rules::RuleSet;
use crate::segment::{AmbiguousFreeThrow, Possession, PossessionResult};
use crate::stats::RunStatistics;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxCounts {
    pub fga: u32,
    pub fta: u32,
    pub orb: u32,
    pub tov: u32,
}

impl BoxCounts {
    pub fn new(fga: u32, fta: u32, orb: u32, tov: u32) -> Self {
        Self { fga, fta, orb, tov }
    }

    /// One team's term of the Oliver estimator.
    pub fn possessions(&self, fta_coefficient: f64) -> f64 {
        f64::from(self.fga) + fta_coefficient * f64::from(self.fta) - f64::from(self.orb)
            + f64::from(self.tov)
    }
}

pub fn oliver_estimate(home: &BoxCounts, away: &BoxCounts, fta_coefficient: f64) -> f64 {
    0.5 * (home.possessions(fta_coefficient) + away.possessions(fta_coefficient))
}

pub fn delta_percent(estimated: f64, actual: f64) -> f64 {
    if estimated <= 0.0 {
        return if actual > 0.0 { 100.0 } else { 0.0 };
    }
    (actual - estimated).abs() * 100.0 / estimated
}

/// Box-score tallies (home, away) read from the event stream.
pub fn box_counts(game: &GameEvents) -> (BoxCounts, BoxCounts) {
    let mut home = BoxCounts::default();
    let mut away = BoxCounts::default();
    for event in &game.events {
        let side = match event.team_id {
            Some(team) if team == game.home_team_id => &mut home,
            Some(team) if team == game.away_team_id => &mut away,
            _ => continue,
        };
        match event.kind {
            EventKind::FieldGoalMade { .. } | EventKind::FieldGoalMissed { .. } => side.fga += 1,
            EventKind::FreeThrow { .. } => side.fta += 1,
            EventKind::Rebound {
                kind: ReboundKind::Offensive,
            } => side.orb += 1,
            EventKind::Turnover => side.tov += 1,
            _ => {}
        }
    }
    (home, away)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ValidationIssue {
    OliverDeltaExceeded {
        estimated: f64,
        actual: f64,
        delta_percent: f64,
        tolerance_percent: f64,
    },
    OrphanedEvents {
        orphaned: usize,
        total: usize,
        percent: f64,
    },
    DurationOutlier {
        possession_number: u32,
        duration_seconds: f64,
    },
    ScoreRegression {
        sequence_number: u32,
        side: ScoreSide,
        from: u16,
        to: u16,
    },
    PointsInconsistent {
        possession_number: u32,
        points_scored: u16,
        result: PossessionResult,
    },
    AmbiguousFreeThrow {
        sequence_number: u32,
        description: String,
    },
}

impl ValidationIssue {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ValidationIssue::ScoreRegression { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub game_id: String,
    pub home: BoxCounts,
    pub away: BoxCounts,
    pub oliver_estimate: f64,
    /// Possessions per team (total / 2), the estimator's unit.
    pub actual_possessions: f64,
    pub total_possessions: usize,
    pub delta_percent: f64,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_fatal(&self) -> bool {
        self.issues.iter().any(ValidationIssue::is_fatal)
    }

    pub fn oliver_flagged(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| matches!(issue, ValidationIssue::OliverDeltaExceeded { .. }))
    }

    pub fn first_fatal(&self) -> Option<FailureReason> {
        self.issues.iter().find_map(|issue| match issue {
            ValidationIssue::ScoreRegression {
                sequence_number,
                side,
                from,
                to,
            } => Some(FailureReason::ImpossibleScoreRegression {
                sequence_number: *sequence_number,
                side: *side,
                from: *from,
                to: *to,
            }),
            _ => None,
        })
    }
}

pub fn score_regressions(game: &GameEvents) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for pair in game.events.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.score_home < prev.score_home {
            issues.push(ValidationIssue::ScoreRegression {
                sequence_number: next.sequence_number,
                side: ScoreSide::Home,
                from: prev.score_home,
                to: next.score_home,
            });
        }
        if next.score_away < prev.score_away {
            issues.push(ValidationIssue::ScoreRegression {
                sequence_number: next.sequence_number,
                side: ScoreSide::Away,
                from: prev.score_away,
                to: next.score_away,
            });
        }
    }
    issues
}

pub fn validate_game(
    game: &GameEvents,
    possessions: &[Possession],
    stats: &RunStatistics,
    ambiguous: &[AmbiguousFreeThrow],
    rules: &RuleSet,
) -> ValidationReport {
    let (home, away) = box_counts(game);
    let estimated = oliver_estimate(&home, &away, rules.oliver_fta_coefficient);
    let actual = possessions.len() as f64 / 2.0;
    let delta = delta_percent(estimated, actual);

    let mut issues = Vec::new();
    if delta > rules.oliver_tolerance_percent {
        issues.push(ValidationIssue::OliverDeltaExceeded {
            estimated,
            actual,
            delta_percent: delta,
            tolerance_percent: rules.oliver_tolerance_percent,
        });
    }

    let orphan_percent = stats.orphaned_percent();
    if stats.orphaned_total() > 0 && orphan_percent >= rules.orphan_warn_percent {
        issues.push(ValidationIssue::OrphanedEvents {
            orphaned: stats.orphaned_total(),
            total: game.total_records(),
            percent: orphan_percent,
        });
    }

    for possession in possessions {
        if possession.duration_seconds > rules.duration_outlier_seconds {
            issues.push(ValidationIssue::DurationOutlier {
                possession_number: possession.possession_number,
                duration_seconds: possession.duration_seconds,
            });
        }
        if possession.quality.points_out_of_range {
            issues.push(ValidationIssue::PointsInconsistent {
                possession_number: possession.possession_number,
                points_scored: possession.points_scored,
                result: possession.result,
            });
        }
    }

    issues.extend(ambiguous.iter().map(|ft| ValidationIssue::AmbiguousFreeThrow {
        sequence_number: ft.sequence_number,
        description: ft.description.clone(),
    }));
    issues.extend(score_regressions(game));

    ValidationReport {
        game_id: game.game_id.clone(),
        home,
        away,
        oliver_estimate: estimated,
        actual_possessions: actual,
        total_possessions: possessions.len(),
        delta_percent: delta,
        issues,
    }
}
