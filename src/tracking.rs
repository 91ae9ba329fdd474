//! Possession-object segmentation: every event is attributed to the team in
//! control of the ball and a possession is the longest run of events with the
//! same offense inside one period. Lineup-aware feeds ship a possession hint
//! per action; it is used when the event itself does not settle ownership.

use tracing::debug;

use crate::event::{Event, EventKind, GameEvents, ReboundKind, TeamId};
use crate::free_throw::{self, FreeThrowKind};
use crate::rules::RuleSet;
use crate::segment::{
    Accumulator, PossessionBuilder, PossessionResult, PossessionStrategy, Segmentation,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct OffenseTracking;

impl PossessionStrategy for OffenseTracking {
    fn segment(&self, game: &GameEvents, rules: &RuleSet) -> Segmentation {
        let mut builder = PossessionBuilder::new(game, rules);
        let mut open: Option<Accumulator> = None;
        // Team expected to have the ball next, carried across dead-ball events.
        let mut control: Option<TeamId> = None;

        for (idx, event) in game.events.iter().enumerate() {
            if open.as_ref().is_some_and(|acc| acc.period != event.period) {
                if let Some(acc) = open.take() {
                    builder.stats.implicit_period_breaks += 1;
                    builder.force_seal(acc);
                }
                control = None;
            }

            if builder.observe(event) {
                continue;
            }

            match event.kind {
                EventKind::PeriodBegin => {
                    if let Some(acc) = open.take() {
                        builder.stats.implicit_period_breaks += 1;
                        builder.force_seal(acc);
                    }
                    builder.anchor_period(event);
                    control = None;
                    continue;
                }
                EventKind::PeriodEnd => {
                    if let Some(mut acc) = open.take() {
                        acc.push(event, &mut builder.stats);
                        builder.force_seal(acc);
                    }
                    control = None;
                    continue;
                }
                _ => {}
            }
            if builder.unclassified(event) {
                continue;
            }

            let Some(owner) = owner_of(event, control, game) else {
                continue;
            };

            if let Some(acc) = open.take() {
                if acc.offense == owner {
                    open = Some(acc);
                } else {
                    let result = acc.cause.unwrap_or(PossessionResult::Other);
                    builder.seal(acc, result, false);
                }
            }
            let mut acc = match open.take() {
                Some(acc) => acc,
                None => builder.open(owner, event),
            };

            acc.push(event, &mut builder.stats);
            control = Some(record_cause(&game.events, idx, &mut acc, &mut builder));

            let split = event.kind
                == (EventKind::Rebound {
                    kind: ReboundKind::Offensive,
                })
                && event.team_id == Some(acc.offense)
                && !rules.merge_offensive_rebounds
                && acc.event_count > 1;
            if split {
                builder.seal(acc, PossessionResult::Other, false);
            } else {
                open = Some(acc);
            }
        }

        if let Some(acc) = open {
            builder.force_seal(acc);
        }
        builder.finish()
    }
}

/// Team whose possession the event belongs to.
fn owner_of(event: &Event, control: Option<TeamId>, game: &GameEvents) -> Option<TeamId> {
    let hint = event.possession_hint.filter(|team| game.has_team(*team));
    let acting = event.team_id;

    let inferred = match event.kind {
        EventKind::FreeThrow { .. }
            if free_throw::free_throw_kind(&event.description) == FreeThrowKind::Technical =>
        {
            None
        }
        EventKind::FieldGoalMade { .. }
        | EventKind::FieldGoalMissed { .. }
        | EventKind::FreeThrow { .. }
        | EventKind::Turnover
        | EventKind::Rebound {
            kind: ReboundKind::Offensive,
        } => acting,
        // A defensive rebound closes the shooting team's run.
        EventKind::Rebound {
            kind: ReboundKind::Defensive,
        } => acting.map(|team| game.opponent(team)),
        EventKind::Foul if control.is_none() => acting.map(|team| game.opponent(team)),
        EventKind::JumpBall if control.is_none() => acting,
        _ => None,
    };

    inferred.or(hint).or(control)
}

/// Records the terminal cause the event implies and returns the team
/// expected to control the ball afterwards.
fn record_cause(
    events: &[Event],
    idx: usize,
    acc: &mut Accumulator,
    builder: &mut PossessionBuilder<'_>,
) -> TeamId {
    let event = &events[idx];
    let game = builder.game;
    let acting = event.team_id.unwrap_or(acc.offense);

    match event.kind {
        EventKind::FieldGoalMade { .. } => {
            acc.cause = Some(PossessionResult::MadeFg);
            if free_throw::is_and_one(events, idx) {
                acc.and_one = true;
                builder.stats.and_ones += 1;
                return acting;
            }
            game.opponent(acting)
        }
        EventKind::FieldGoalMissed { .. } => {
            acc.cause = None;
            acc.offense
        }
        EventKind::FreeThrow { .. } => {
            let call = free_throw::resolve_free_throw(events, idx);
            if call.is_ambiguous() {
                acc.flag_ambiguous();
                builder.record_ambiguous(event);
            }
            if call.kind != FreeThrowKind::Regular {
                return acc.offense;
            }
            if call.terminal {
                if !acc.and_one {
                    acc.cause = Some(PossessionResult::FreeThrows);
                }
                game.opponent(acting)
            } else {
                acc.offense
            }
        }
        EventKind::Rebound {
            kind: ReboundKind::Defensive,
        } => {
            if acting != acc.offense {
                acc.cause = Some(PossessionResult::MissDefensiveRebound);
            }
            acting
        }
        EventKind::Rebound {
            kind: ReboundKind::Offensive,
        } => {
            acc.cause = None;
            acting
        }
        EventKind::Turnover => {
            acc.cause = Some(PossessionResult::Turnover);
            debug!(
                game_id = %event.game_id,
                sequence = event.sequence_number,
                "turnover flips control"
            );
            game.opponent(acting)
        }
        _ => acc.offense,
    }
}
