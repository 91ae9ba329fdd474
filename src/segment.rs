use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::event::{Event, EventKind, GameEvents, ReboundKind, TeamId};
use crate::free_throw::{self, FreeThrowKind};
use crate::rules::{RuleSet, StrategyKind};
use crate::stats::RunStatistics;
use crate::tracking::OffenseTracking;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PossessionResult {
    MadeFg,
    FreeThrows,
    MissDefensiveRebound,
    Turnover,
    EndOfPeriod,
    Other,
}

impl PossessionResult {
    pub fn is_scoring_or_attempt(&self) -> bool {
        matches!(
            self,
            PossessionResult::MadeFg
                | PossessionResult::FreeThrows
                | PossessionResult::MissDefensiveRebound
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextFlags {
    pub clutch: bool,
    pub garbage_time: bool,
    pub fastbreak: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityFlags {
    pub offense_mismatch: bool,
    pub ambiguous_free_throws: bool,
    pub forced_close: bool,
    pub implausible_duration: bool,
    pub points_out_of_range: bool,
}

impl QualityFlags {
    pub fn is_clean(&self) -> bool {
        !(self.offense_mismatch
            || self.ambiguous_free_throws
            || self.implausible_duration
            || self.points_out_of_range)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Possession {
    pub game_id: String,
    pub possession_number: u32,
    pub offense_team_id: TeamId,
    pub defense_team_id: TeamId,
    pub period: u8,
    pub start_sequence: u32,
    pub end_sequence: u32,
    pub start_clock: f64,
    pub end_clock: f64,
    pub duration_seconds: f64,
    pub start_score_home: u16,
    pub start_score_away: u16,
    pub end_score_home: u16,
    pub end_score_away: u16,
    pub points_scored: u16,
    pub result: PossessionResult,
    pub event_count: u32,
    pub offensive_rebounds: u16,
    pub context: ContextFlags,
    pub quality: QualityFlags,
}

impl Possession {
    /// Home minus away at the start of the possession.
    pub fn start_margin(&self) -> i32 {
        i32::from(self.start_score_home) - i32::from(self.start_score_away)
    }

    pub fn with_context(self, context: ContextFlags) -> Self {
        Self { context, ..self }
    }
}

/// A free throw decided by the sequence fallback, kept with its raw text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbiguousFreeThrow {
    pub sequence_number: u32,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Segmentation {
    pub possessions: Vec<Possession>,
    pub stats: RunStatistics,
    pub ambiguous_free_throws: Vec<AmbiguousFreeThrow>,
}

pub trait PossessionStrategy {
    fn segment(&self, game: &GameEvents, rules: &RuleSet) -> Segmentation;
}

pub fn strategy_for(kind: StrategyKind) -> &'static dyn PossessionStrategy {
    match kind {
        StrategyKind::EventClassification => &EventClassification,
        StrategyKind::OffenseTracking => &OffenseTracking,
    }
}

/// Segments one game with the strategy the rule set selects.
pub fn segment(game: &GameEvents, rules: &RuleSet) -> Segmentation {
    strategy_for(rules.strategy).segment(game, rules)
}

#[derive(Debug, Clone)]
pub(crate) struct Accumulator {
    pub(crate) offense: TeamId,
    pub(crate) defense: TeamId,
    pub(crate) period: u8,
    start_sequence: u32,
    last_sequence: u32,
    start_clock: f64,
    last_clock: f64,
    start_score: (u16, u16),
    last_score: (u16, u16),
    pub(crate) event_count: u32,
    offensive_rebounds: u16,
    pub(crate) and_one: bool,
    pub(crate) cause: Option<PossessionResult>,
    quality: QualityFlags,
}

impl Accumulator {
    pub(crate) fn push(&mut self, event: &Event, stats: &mut RunStatistics) {
        self.last_sequence = event.sequence_number;
        self.last_clock = event.clock_seconds;
        self.last_score = (event.score_home, event.score_away);
        self.event_count += 1;

        if event.kind
            == (EventKind::Rebound {
                kind: ReboundKind::Offensive,
            })
            && event.team_id == Some(self.offense)
        {
            self.offensive_rebounds += 1;
        }

        let technical = matches!(event.kind, EventKind::FreeThrow { .. })
            && free_throw::free_throw_kind(&event.description) == FreeThrowKind::Technical;
        if event.kind.is_offense_only() && !technical && event.team_id == Some(self.defense) {
            self.quality.offense_mismatch = true;
            stats.offense_mismatches += 1;
            debug!(
                game_id = %event.game_id,
                sequence = event.sequence_number,
                offense = self.offense,
                "offense-only event by the defending team"
            );
        }
    }

    pub(crate) fn flag_ambiguous(&mut self) {
        self.quality.ambiguous_free_throws = true;
    }
}

/// Shared possession bookkeeping used by every strategy.
pub(crate) struct PossessionBuilder<'a> {
    pub(crate) game: &'a GameEvents,
    pub(crate) rules: &'a RuleSet,
    possessions: Vec<Possession>,
    pub(crate) stats: RunStatistics,
    ambiguous: Vec<AmbiguousFreeThrow>,
    score: (u16, u16),
    clock_anchor: Option<(u8, f64)>,
}

impl<'a> PossessionBuilder<'a> {
    pub(crate) fn new(game: &'a GameEvents, rules: &'a RuleSet) -> Self {
        let stats = RunStatistics {
            records_rejected: game.rejected_records,
            ..RunStatistics::default()
        };
        Self {
            game,
            rules,
            possessions: Vec::new(),
            stats,
            ambiguous: Vec::new(),
            score: (0, 0),
            clock_anchor: None,
        }
    }

    /// Counts the event and reports whether it must be skipped as orphaned.
    pub(crate) fn observe(&mut self, event: &Event) -> bool {
        self.stats.events_seen += 1;
        let foreign = event.team_id.is_some_and(|team| !self.game.has_team(team));
        let missing = event.kind.requires_team() && event.team_id.is_none();
        if foreign || missing {
            self.stats.events_orphaned += 1;
            warn!(
                game_id = %self.game.game_id,
                sequence = event.sequence_number,
                team_id = ?event.team_id,
                "orphaned event skipped"
            );
            return true;
        }
        false
    }

    /// Counts and reports an event the rule set leaves unclassified.
    pub(crate) fn unclassified(&mut self, event: &Event) -> bool {
        if self.rules.classifies(event.event_type()) {
            return false;
        }
        self.stats.events_unclassified += 1;
        debug!(
            game_id = %self.game.game_id,
            sequence = event.sequence_number,
            event_type = ?event.event_type(),
            "unclassified event left out of possessions"
        );
        true
    }

    pub(crate) fn anchor_period(&mut self, event: &Event) {
        self.clock_anchor = Some((event.period, event.clock_seconds));
    }

    pub(crate) fn record_ambiguous(&mut self, event: &Event) {
        warn!(
            game_id = %self.game.game_id,
            sequence = event.sequence_number,
            description = %event.description,
            "ambiguous free-throw sequence"
        );
        self.stats.ambiguous_free_throws += 1;
        self.ambiguous.push(AmbiguousFreeThrow {
            sequence_number: event.sequence_number,
            description: event.description.clone(),
        });
    }

    pub(crate) fn open(&self, offense: TeamId, event: &Event) -> Accumulator {
        let start_clock = match self.clock_anchor {
            Some((period, clock)) if period == event.period => clock,
            _ => event.clock_seconds,
        };
        Accumulator {
            offense,
            defense: self.game.opponent(offense),
            period: event.period,
            start_sequence: event.sequence_number,
            last_sequence: event.sequence_number,
            start_clock,
            last_clock: event.clock_seconds,
            start_score: self.score,
            last_score: self.score,
            event_count: 0,
            offensive_rebounds: 0,
            and_one: false,
            cause: None,
            quality: QualityFlags::default(),
        }
    }

    pub(crate) fn seal(&mut self, acc: Accumulator, result: PossessionResult, forced: bool) {
        let mut quality = acc.quality;
        quality.forced_close = forced;

        let raw_duration = acc.start_clock - acc.last_clock;
        let duration_seconds = raw_duration.max(0.0);
        quality.implausible_duration = raw_duration < 0.0
            || duration_seconds < self.rules.min_duration
            || duration_seconds > self.rules.max_duration;

        let start_total = i32::from(acc.start_score.0) + i32::from(acc.start_score.1);
        let end_total = i32::from(acc.last_score.0) + i32::from(acc.last_score.1);
        let points = u16::try_from((end_total - start_total).max(0)).unwrap_or(u16::MAX);
        let max_points = if acc.and_one { 4 } else { 3 };
        quality.points_out_of_range = (points > max_points && acc.offensive_rebounds == 0)
            || (result == PossessionResult::MadeFg && points < 2);

        if forced {
            self.stats.forced_period_closes += 1;
        }
        self.stats.possessions_emitted += 1;

        let possession = Possession {
            game_id: self.game.game_id.clone(),
            possession_number: self.possessions.len() as u32 + 1,
            offense_team_id: acc.offense,
            defense_team_id: acc.defense,
            period: acc.period,
            start_sequence: acc.start_sequence,
            end_sequence: acc.last_sequence,
            start_clock: acc.start_clock,
            end_clock: acc.last_clock,
            duration_seconds,
            start_score_home: acc.start_score.0,
            start_score_away: acc.start_score.1,
            end_score_home: acc.last_score.0,
            end_score_away: acc.last_score.1,
            points_scored: points,
            result,
            event_count: acc.event_count,
            offensive_rebounds: acc.offensive_rebounds,
            context: ContextFlags::default(),
            quality,
        };
        debug!(
            game_id = %possession.game_id,
            number = possession.possession_number,
            offense = possession.offense_team_id,
            result = ?possession.result,
            points = possession.points_scored,
            "possession sealed"
        );

        self.score = acc.last_score;
        self.clock_anchor = Some((acc.period, acc.last_clock));
        self.possessions.push(possession);
    }

    /// Seals at a period boundary, keeping the recorded cause when there is one.
    pub(crate) fn force_seal(&mut self, acc: Accumulator) {
        let result = acc.cause.unwrap_or(PossessionResult::EndOfPeriod);
        self.seal(acc, result, true);
    }

    pub(crate) fn finish(self) -> Segmentation {
        Segmentation {
            possessions: self.possessions,
            stats: self.stats,
            ambiguous_free_throws: self.ambiguous,
        }
    }
}

/// Event-type classification state machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventClassification;

enum State {
    Idle,
    Pending { offense: TeamId, period: u8 },
    Open(Accumulator),
}

enum Decision {
    Continue,
    End {
        result: PossessionResult,
        next_offense: TeamId,
    },
}

impl PossessionStrategy for EventClassification {
    fn segment(&self, game: &GameEvents, rules: &RuleSet) -> Segmentation {
        let mut builder = PossessionBuilder::new(game, rules);
        let mut state = State::Idle;
        let events = &game.events;

        for (idx, event) in events.iter().enumerate() {
            state = match state {
                State::Open(acc) if acc.period != event.period => {
                    builder.stats.implicit_period_breaks += 1;
                    builder.force_seal(acc);
                    State::Idle
                }
                State::Pending { period, .. } if period != event.period => State::Idle,
                other => other,
            };

            if builder.observe(event) {
                continue;
            }

            match event.kind {
                EventKind::PeriodBegin => {
                    if let State::Open(acc) = std::mem::replace(&mut state, State::Idle) {
                        builder.stats.implicit_period_breaks += 1;
                        builder.force_seal(acc);
                    }
                    builder.anchor_period(event);
                    continue;
                }
                EventKind::PeriodEnd => {
                    if let State::Open(mut acc) = std::mem::replace(&mut state, State::Idle) {
                        acc.push(event, &mut builder.stats);
                        builder.force_seal(acc);
                    }
                    continue;
                }
                _ => {}
            }
            if builder.unclassified(event) {
                continue;
            }

            let mut acc = match std::mem::replace(&mut state, State::Idle) {
                State::Open(acc) => acc,
                State::Pending { offense, .. } => {
                    let offense = match (event.kind, event.team_id) {
                        (EventKind::Rebound { .. }, Some(rebounder)) => rebounder,
                        _ => offense,
                    };
                    builder.open(offense, event)
                }
                State::Idle => {
                    if !rules.start_event_types.contains(&event.event_type()) {
                        continue;
                    }
                    let Some(offense) = offense_for_start(event, game) else {
                        continue;
                    };
                    builder.open(offense, event)
                }
            };

            acc.push(event, &mut builder.stats);
            state = match decide(events, idx, &mut acc, &mut builder) {
                Decision::Continue => State::Open(acc),
                Decision::End {
                    result,
                    next_offense,
                } => {
                    let period = acc.period;
                    builder.seal(acc, result, false);
                    State::Pending {
                        offense: next_offense,
                        period,
                    }
                }
            };
        }

        if let State::Open(acc) = state {
            builder.force_seal(acc);
        }
        builder.finish()
    }
}

/// Offense implied by a start event seen while idle.
fn offense_for_start(event: &Event, game: &GameEvents) -> Option<TeamId> {
    let team = event.team_id?;
    match event.kind {
        EventKind::Foul => Some(game.opponent(team)),
        _ => Some(team),
    }
}

fn decide(
    events: &[Event],
    idx: usize,
    acc: &mut Accumulator,
    builder: &mut PossessionBuilder<'_>,
) -> Decision {
    let event = &events[idx];
    let rules = builder.rules;
    if !rules.end_event_types.contains(&event.event_type()) {
        return Decision::Continue;
    }
    let game = builder.game;
    let acting = event.team_id.unwrap_or(acc.offense);

    match event.kind {
        EventKind::FieldGoalMade { .. } => {
            if free_throw::is_and_one(events, idx) {
                acc.and_one = true;
                acc.cause = Some(PossessionResult::MadeFg);
                builder.stats.and_ones += 1;
                return Decision::Continue;
            }
            Decision::End {
                result: PossessionResult::MadeFg,
                next_offense: game.opponent(acting),
            }
        }
        EventKind::FreeThrow { made } => {
            let call = free_throw::resolve_free_throw(events, idx);
            if call.is_ambiguous() {
                acc.flag_ambiguous();
                builder.record_ambiguous(event);
            }
            if !call.terminal {
                return Decision::Continue;
            }
            if !made && rules.merge_offensive_rebounds && free_throw::offensive_rebound_follows(events, idx)
            {
                return Decision::Continue;
            }
            let result = if acc.and_one {
                PossessionResult::MadeFg
            } else {
                PossessionResult::FreeThrows
            };
            Decision::End {
                result,
                next_offense: game.opponent(acting),
            }
        }
        EventKind::Rebound {
            kind: ReboundKind::Defensive,
        } => {
            if acting == acc.offense {
                return Decision::Continue;
            }
            Decision::End {
                result: PossessionResult::MissDefensiveRebound,
                next_offense: acting,
            }
        }
        EventKind::Rebound {
            kind: ReboundKind::Offensive,
        } => {
            if acting == acc.defense {
                return Decision::End {
                    result: PossessionResult::MissDefensiveRebound,
                    next_offense: acting,
                };
            }
            if rules.merge_offensive_rebounds || acc.event_count <= 1 {
                return Decision::Continue;
            }
            Decision::End {
                result: PossessionResult::Other,
                next_offense: acc.offense,
            }
        }
        EventKind::Turnover => Decision::End {
            result: PossessionResult::Turnover,
            next_offense: game.opponent(acting),
        },
        EventKind::FieldGoalMissed { .. } => Decision::Continue,
        _ => Decision::End {
            result: PossessionResult::Other,
            next_offense: game.opponent(acc.offense),
        },
    }
}
