//! And-1 and free-throw sequence resolution.
//!
//! Providers never ship a reliable "last free throw" flag, so terminal
//! attempts are read from the vendor-authored "N of M" text and fall back to
//! grouping consecutive attempts by the same team when the text is missing or
//! unreadable. Lookahead never crosses a period boundary.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::event::{Event, EventKind, ReboundKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreeThrowKind {
    Regular,
    Technical,
    /// Flagrant and clear-path attempts; the shooting team keeps the ball.
    Flagrant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveMethod {
    Ordinal,
    Sequence,
    Excluded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeThrowCall {
    pub kind: FreeThrowKind,
    pub ordinal: Option<(u8, u8)>,
    pub terminal: bool,
    pub method: ResolveMethod,
}

impl FreeThrowCall {
    /// The sequence heuristic was needed to decide this attempt.
    pub fn is_ambiguous(&self) -> bool {
        self.method == ResolveMethod::Sequence
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Skip {
    /// Substitutions, timeouts and unclassified noise.
    DeadBall,
    /// Dead-ball events plus fouls and jump balls.
    DeadBallAndFouls,
}

pub fn parse_ordinal(description: &str) -> Option<(u8, u8)> {
    let text = description.to_ascii_lowercase();
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let (n, after_n) = read_number(bytes, i);
        let mut j = skip_spaces(bytes, after_n);
        let has_separator = if bytes[j..].starts_with(b"of") {
            j += 2;
            true
        } else if bytes.get(j) == Some(&b'/') {
            j += 1;
            true
        } else {
            false
        };
        if has_separator {
            j = skip_spaces(bytes, j);
            if bytes.get(j).is_some_and(|b| b.is_ascii_digit()) {
                let (m, _) = read_number(bytes, j);
                if let (Some(n), Some(m)) = (n, m) {
                    if n >= 1 && n <= m && m <= 3 {
                        return Some((n, m));
                    }
                }
            }
        }
        i = after_n;
    }
    None
}

fn read_number(bytes: &[u8], start: usize) -> (Option<u8>, usize) {
    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let value = std::str::from_utf8(&bytes[start..end])
        .ok()
        .and_then(|digits| digits.parse::<u8>().ok());
    (value, end)
}

fn skip_spaces(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() && bytes[idx].is_ascii_whitespace() {
        idx += 1;
    }
    idx
}

pub fn free_throw_kind(description: &str) -> FreeThrowKind {
    let text = description.to_ascii_lowercase();
    if text.contains("technical") || text.contains("tech.") {
        FreeThrowKind::Technical
    } else if text.contains("flagrant") || text.contains("clear path") {
        FreeThrowKind::Flagrant
    } else {
        FreeThrowKind::Regular
    }
}

fn next_significant(events: &[Event], idx: usize, skip: Skip) -> Option<&Event> {
    let period = events.get(idx)?.period;
    for event in events.iter().skip(idx + 1) {
        if event.period != period || event.kind.is_period_marker() {
            return None;
        }
        let skipped = match event.kind {
            EventKind::Substitution | EventKind::Timeout | EventKind::Other => true,
            EventKind::Foul | EventKind::JumpBall => skip == Skip::DeadBallAndFouls,
            _ => false,
        };
        if !skipped {
            return Some(event);
        }
    }
    None
}

fn is_regular_free_throw_by(event: &Event, team_id: Option<u32>) -> bool {
    matches!(event.kind, EventKind::FreeThrow { .. })
        && event.team_id == team_id
        && free_throw_kind(&event.description) == FreeThrowKind::Regular
}

/// A made field goal at `idx` is an and-1 when the next live event of the
/// period is a single free throw by the same team.
pub fn is_and_one(events: &[Event], idx: usize) -> bool {
    let Some(made) = events.get(idx) else {
        return false;
    };
    if !matches!(made.kind, EventKind::FieldGoalMade { .. }) || made.team_id.is_none() {
        return false;
    }
    let Some(next) = next_significant(events, idx, Skip::DeadBallAndFouls) else {
        return false;
    };
    if !is_regular_free_throw_by(next, made.team_id) {
        return false;
    }
    match parse_ordinal(&next.description) {
        Some((_, total)) => total == 1,
        None => true,
    }
}

pub fn resolve_free_throw(events: &[Event], idx: usize) -> FreeThrowCall {
    let Some(event) = events.get(idx) else {
        return FreeThrowCall {
            kind: FreeThrowKind::Regular,
            ordinal: None,
            terminal: false,
            method: ResolveMethod::Excluded,
        };
    };
    let kind = free_throw_kind(&event.description);
    let ordinal = parse_ordinal(&event.description);

    if kind != FreeThrowKind::Regular {
        return FreeThrowCall {
            kind,
            ordinal,
            terminal: false,
            method: ResolveMethod::Excluded,
        };
    }

    if let Some((n, m)) = ordinal {
        return FreeThrowCall {
            kind,
            ordinal,
            terminal: n == m,
            method: ResolveMethod::Ordinal,
        };
    }

    let terminal = match next_significant(events, idx, Skip::DeadBall) {
        Some(next) => !is_regular_free_throw_by(next, event.team_id),
        None => true,
    };
    debug!(
        game_id = %event.game_id,
        sequence = event.sequence_number,
        description = %event.description,
        terminal,
        "free throw ordinal unreadable, using sequence fallback"
    );
    FreeThrowCall {
        kind,
        ordinal: None,
        terminal,
        method: ResolveMethod::Sequence,
    }
}

/// The next live event after `idx` is an offensive rebound by the same team.
pub fn offensive_rebound_follows(events: &[Event], idx: usize) -> bool {
    let Some(event) = events.get(idx) else {
        return false;
    };
    next_significant(events, idx, Skip::DeadBall).is_some_and(|next| {
        next.kind
            == EventKind::Rebound {
                kind: ReboundKind::Offensive,
            }
            && next.team_id == event.team_id
    })
}
