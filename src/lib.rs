//! Possession segmentation for basketball play-by-play feeds.

pub mod context;
pub mod error;
pub mod event;
pub mod free_throw;
pub mod normalize;
pub mod pipeline;
pub mod rules;
pub mod segment;
pub mod stats;
pub mod synthetic;
pub mod tracking;
pub mod validate;

pub use error::{ConfigError, FailureReason, GameFailure, NormalizeError};
pub use event::{Event, EventKind, EventType, GameEvents, ReboundKind, TeamId};
pub use pipeline::{BatchOutcome, SegmentedGame, possessions_fingerprint, process_game, process_games};
pub use rules::{RuleSet, StrategyKind};
pub use segment::{Possession, PossessionResult, PossessionStrategy, segment};
pub use stats::RunStatistics;
pub use validate::{BoxCounts, ValidationIssue, ValidationReport};
