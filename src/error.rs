use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::segment::Possession;
use crate::stats::RunStatistics;
use crate::validate::ValidationReport;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("configuration invalid: {0}")]
    ConfigurationInvalid(String),

    #[error("configuration invalid: could not parse rule set: {0}")]
    Parse(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("unrecognized event type `{raw}` at sequence {sequence_number}")]
    UnrecognizedEventType { sequence_number: u32, raw: String },

    #[error("malformed field `{field}` at sequence {sequence_number}: {value}")]
    MalformedField {
        sequence_number: u32,
        field: &'static str,
        value: String,
    },
}

impl NormalizeError {
    pub fn sequence_number(&self) -> u32 {
        match self {
            NormalizeError::UnrecognizedEventType {
                sequence_number, ..
            } => *sequence_number,
            NormalizeError::MalformedField {
                sequence_number, ..
            } => *sequence_number,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSide {
    Home,
    Away,
}

#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FailureReason {
    #[error("orphaned events {orphaned}/{total} ({percent:.2}%) exceed {limit:.2}%")]
    GameProcessingFailed {
        orphaned: usize,
        total: usize,
        percent: f64,
        limit: f64,
    },

    #[error("impossible score regression at sequence {sequence_number}: {side:?} {from} -> {to}")]
    ImpossibleScoreRegression {
        sequence_number: u32,
        side: ScoreSide,
        from: u16,
        to: u16,
    },
}

/// Per-game failure descriptor. Carries whatever was produced before the
/// game was abandoned so the caller can retain, discard or re-queue it.
#[derive(Error, Debug, Clone)]
#[error("game {game_id} failed after possession {last_good_possession:?}: {reason}")]
pub struct GameFailure {
    pub game_id: String,
    pub last_good_possession: Option<u32>,
    pub reason: FailureReason,
    pub possessions: Vec<Possession>,
    pub report: Option<ValidationReport>,
    pub stats: RunStatistics,
}
