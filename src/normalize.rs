use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::NormalizeError;
use crate::event::{Event, EventKind, GameEvents, ReboundKind, TeamId};
use crate::free_throw::{self, FreeThrowKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameHeader {
    pub game_id: String,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
}

impl GameHeader {
    fn has_team(&self, team_id: TeamId) -> bool {
        team_id == self.home_team_id || team_id == self.away_team_id
    }
}

/// Row of the event-type-coded stats feed. Numeric cells are kept as read
/// and range-checked when the row is normalized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsFeedRow {
    pub event_num: u64,
    pub msg_type: i64,
    pub action_type: i64,
    pub period: u64,
    pub clock: String,
    pub home_description: Option<String>,
    pub neutral_description: Option<String>,
    pub visitor_description: Option<String>,
    // "away - home", only present on scoring rows.
    pub score: Option<String>,
    pub player1_id: Option<u64>,
    pub player1_team_id: Option<u64>,
    pub player3_team_id: Option<u64>,
}

/// Action of the lineup-aware live feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveAction {
    pub action_number: u32,
    pub period: u8,
    pub clock: String,
    pub action_type: String,
    #[serde(default)]
    pub sub_type: Option<String>,
    #[serde(default)]
    pub shot_result: Option<String>,
    #[serde(default)]
    pub team_id: Option<u32>,
    #[serde(default)]
    pub person_id: Option<u32>,
    #[serde(default)]
    pub score_home: Option<String>,
    #[serde(default)]
    pub score_away: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub possession: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawEvent {
    Stats(StatsFeedRow),
    Live(LiveAction),
}

/// State carried between records of one game.
#[derive(Debug, Clone, Default)]
pub struct NormalizerCarry {
    score: (u16, u16),
    last_miss_team: Option<TeamId>,
    // The last miss left the ball dead: a non-final, technical or flagrant
    // free throw. Rebounds credited after it are bookkeeping rows.
    dead_ball_miss: bool,
}

pub fn normalize_game(header: &GameHeader, records: impl IntoIterator<Item = RawEvent>) -> GameEvents {
    let mut carry = NormalizerCarry::default();
    let mut events = Vec::new();
    let mut rejected_records = 0usize;

    for record in records {
        match normalize_record(header, &record, &mut carry) {
            Ok(event) => events.push(event),
            Err(err) => {
                rejected_records += 1;
                warn!(
                    game_id = %header.game_id,
                    sequence = err.sequence_number(),
                    "record rejected: {err}"
                );
            }
        }
    }

    GameEvents {
        game_id: header.game_id.clone(),
        home_team_id: header.home_team_id,
        away_team_id: header.away_team_id,
        events,
        rejected_records,
    }
}

pub fn normalize_record(
    header: &GameHeader,
    record: &RawEvent,
    carry: &mut NormalizerCarry,
) -> Result<Event, NormalizeError> {
    match record {
        RawEvent::Stats(row) => normalize_stats_row(header, row, carry),
        RawEvent::Live(action) => normalize_live_action(header, action, carry),
    }
}

pub fn normalize_stats_row(
    header: &GameHeader,
    row: &StatsFeedRow,
    carry: &mut NormalizerCarry,
) -> Result<Event, NormalizeError> {
    let sequence_number: u32 = narrow(row.event_num, 0, "event_num")?;
    let period: u8 = narrow(row.period, sequence_number, "period")?;
    if period == 0 {
        return Err(NormalizeError::MalformedField {
            sequence_number,
            field: "period",
            value: row.period.to_string(),
        });
    }
    let clock_seconds = parse_clock(&row.clock).ok_or_else(|| NormalizeError::MalformedField {
        sequence_number,
        field: "clock",
        value: row.clock.clone(),
    })?;
    let player1_id = narrow_id(row.player1_id, sequence_number, "player1_id")?;
    let player1_team_id = narrow_id(row.player1_team_id, sequence_number, "player1_team_id")?;
    let player3_team_id = narrow_id(row.player3_team_id, sequence_number, "player3_team_id")?;

    let description = [
        row.home_description.as_deref(),
        row.neutral_description.as_deref(),
        row.visitor_description.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .filter(|text| !text.is_empty())
    .collect::<Vec<_>>()
    .join(" | ");
    let description = if row.msg_type == 3 {
        label_free_throw(description, row.action_type)
    } else {
        description
    };
    let upper = description.to_ascii_uppercase();

    // Team-level rows (team rebounds, team turnovers, timeouts) put the team
    // id in the player slot.
    let mut team_id = player1_team_id.or(player1_id.filter(|id| header.has_team(*id)));

    let shot_points = if upper.contains("3PT") { 3 } else { 2 };
    let kind = match row.msg_type {
        1 => EventKind::FieldGoalMade {
            points: shot_points,
        },
        2 => EventKind::FieldGoalMissed {
            points: shot_points,
        },
        3 => EventKind::FreeThrow {
            made: !upper.contains("MISS"),
        },
        4 => rebound_event(None, team_id, carry),
        5 => EventKind::Turnover,
        6 => EventKind::Foul,
        7 => EventKind::Violation,
        8 => EventKind::Substitution,
        9 => EventKind::Timeout,
        10 => {
            team_id = player3_team_id.or(team_id);
            EventKind::JumpBall
        }
        11 | 18 => EventKind::Other,
        12 => EventKind::PeriodBegin,
        13 => EventKind::PeriodEnd,
        other => {
            return Err(NormalizeError::UnrecognizedEventType {
                sequence_number,
                raw: format!("msg_type {other}"),
            });
        }
    };

    if let Some(raw) = row.score.as_deref() {
        if let Some((away, home)) = parse_score_pair(raw) {
            carry.score = (home, away);
        }
    }
    track_misses(&kind, team_id, &description, carry);

    Ok(Event {
        game_id: header.game_id.clone(),
        sequence_number,
        period,
        clock_seconds,
        kind,
        team_id,
        player_id: player1_id.filter(|id| *id != 0 && !header.has_team(*id)),
        score_home: carry.score.0,
        score_away: carry.score.1,
        description,
        possession_hint: None,
        payload: serde_json::to_value(row).unwrap_or(Value::Null),
    })
}

pub fn normalize_live_action(
    header: &GameHeader,
    action: &LiveAction,
    carry: &mut NormalizerCarry,
) -> Result<Event, NormalizeError> {
    let sequence_number = action.action_number;
    let clock_seconds =
        parse_clock(&action.clock).ok_or_else(|| NormalizeError::MalformedField {
            sequence_number,
            field: "clock",
            value: action.clock.clone(),
        })?;

    let mut team_id = action.team_id.filter(|id| *id != 0);
    let possession_hint = action
        .possession
        .filter(|id| *id != 0 && header.has_team(*id));
    let sub_type = action
        .sub_type
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let made = action
        .shot_result
        .as_deref()
        .is_some_and(|result| result.eq_ignore_ascii_case("made"));

    let kind = match action.action_type.trim().to_ascii_lowercase().as_str() {
        "2pt" | "3pt" => {
            let points = if action.action_type.starts_with('3') { 3 } else { 2 };
            if made {
                EventKind::FieldGoalMade { points }
            } else {
                EventKind::FieldGoalMissed { points }
            }
        }
        "freethrow" => EventKind::FreeThrow { made },
        "rebound" => {
            let kind = match sub_type.as_str() {
                "offensive" => Some(ReboundKind::Offensive),
                "defensive" => Some(ReboundKind::Defensive),
                _ => None,
            };
            rebound_event(kind, team_id, carry)
        }
        "turnover" => EventKind::Turnover,
        "foul" => EventKind::Foul,
        "violation" => EventKind::Violation,
        "substitution" => EventKind::Substitution,
        "timeout" => EventKind::Timeout,
        "jumpball" => {
            team_id = possession_hint.or(team_id);
            EventKind::JumpBall
        }
        "period" => match sub_type.as_str() {
            "start" => EventKind::PeriodBegin,
            "end" => EventKind::PeriodEnd,
            _ => EventKind::Other,
        },
        "block" | "steal" | "instantreplay" | "stoppage" | "ejection" | "game" | "memo" => {
            EventKind::Other
        }
        other => {
            return Err(NormalizeError::UnrecognizedEventType {
                sequence_number,
                raw: other.to_string(),
            });
        }
    };

    let home = action.score_home.as_deref().and_then(parse_score);
    let away = action.score_away.as_deref().and_then(parse_score);
    if let (Some(home), Some(away)) = (home, away) {
        carry.score = (home, away);
    }
    let description = action.description.clone().unwrap_or_default();
    track_misses(&kind, team_id, &description, carry);

    Ok(Event {
        game_id: header.game_id.clone(),
        sequence_number,
        period: action.period,
        clock_seconds,
        kind,
        team_id,
        player_id: action.person_id.filter(|id| *id != 0),
        score_home: carry.score.0,
        score_away: carry.score.1,
        description,
        possession_hint,
        payload: serde_json::to_value(action).unwrap_or(Value::Null),
    })
}

/// Feeds credit a team rebound after a free throw that leaves the ball dead.
/// Those rows are kept as `Other` so they neither split a trip nor count as
/// a rebound in the box score.
fn rebound_event(
    explicit: Option<ReboundKind>,
    team_id: Option<TeamId>,
    carry: &NormalizerCarry,
) -> EventKind {
    if carry.dead_ball_miss {
        return EventKind::Other;
    }
    let kind = explicit.unwrap_or(match (team_id, carry.last_miss_team) {
        (Some(team), Some(shooter)) if team == shooter => ReboundKind::Offensive,
        _ => ReboundKind::Defensive,
    });
    EventKind::Rebound { kind }
}

fn leaves_ball_dead(description: &str) -> bool {
    free_throw::free_throw_kind(description) != FreeThrowKind::Regular
        || free_throw::parse_ordinal(description).is_some_and(|(n, m)| n < m)
}

fn track_misses(
    kind: &EventKind,
    team_id: Option<TeamId>,
    description: &str,
    carry: &mut NormalizerCarry,
) {
    match kind {
        EventKind::FieldGoalMissed { .. } => {
            carry.last_miss_team = team_id;
            carry.dead_ball_miss = false;
        }
        EventKind::FreeThrow { made } => {
            carry.last_miss_team = if *made { None } else { team_id };
            carry.dead_ball_miss = !made && leaves_ball_dead(description);
        }
        EventKind::Rebound { .. }
        | EventKind::FieldGoalMade { .. }
        | EventKind::Turnover
        | EventKind::PeriodBegin
        | EventKind::PeriodEnd => {
            carry.last_miss_team = None;
            carry.dead_ball_miss = false;
        }
        _ => {}
    }
}

/// Trip labels for the stats feed's free-throw action codes.
fn stats_free_throw_label(action_type: i64) -> Option<&'static str> {
    let label = match action_type {
        10 => "1 of 1",
        11 => "1 of 2",
        12 => "2 of 2",
        13 => "1 of 3",
        14 => "2 of 3",
        15 => "3 of 3",
        16 => "Technical",
        18 => "Flagrant 1 of 2",
        19 => "Flagrant 2 of 2",
        20 => "Flagrant 1 of 1",
        21 => "Technical 1 of 2",
        22 => "Technical 2 of 2",
        25 => "Clear Path 1 of 2",
        26 => "Clear Path 2 of 2",
        27 => "Flagrant 1 of 3",
        28 => "Flagrant 2 of 3",
        29 => "Flagrant 3 of 3",
        _ => return None,
    };
    Some(label)
}

/// Free throws are resolved from their text, so the action code is written
/// in front of the description when the two disagree. The code wins.
fn label_free_throw(description: String, action_type: i64) -> String {
    let Some(label) = stats_free_throw_label(action_type) else {
        return description;
    };
    let agrees = free_throw::parse_ordinal(&description) == free_throw::parse_ordinal(label)
        && free_throw::free_throw_kind(&description) == free_throw::free_throw_kind(label);
    if agrees {
        description
    } else if description.is_empty() {
        format!("Free Throw {label}")
    } else {
        format!("Free Throw {label} | {description}")
    }
}

fn narrow<T: TryFrom<u64>>(
    value: u64,
    sequence_number: u32,
    field: &'static str,
) -> Result<T, NormalizeError> {
    T::try_from(value).map_err(|_| NormalizeError::MalformedField {
        sequence_number,
        field,
        value: value.to_string(),
    })
}

fn narrow_id(
    value: Option<u64>,
    sequence_number: u32,
    field: &'static str,
) -> Result<Option<u32>, NormalizeError> {
    value
        .map(|id| narrow(id, sequence_number, field))
        .transpose()
}

/// Seconds remaining from `MM:SS[.f]` or ISO-8601 `PT11M42.00S`.
pub fn parse_clock(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("PT") {
        let (minutes, rest) = match rest.split_once('M') {
            Some((m, rest)) => (m.parse::<f64>().ok()?, rest),
            None => (0.0, rest),
        };
        let seconds = match rest.strip_suffix('S') {
            Some(s) if !s.is_empty() => s.parse::<f64>().ok()?,
            Some(_) => 0.0,
            None if rest.is_empty() => 0.0,
            None => return None,
        };
        return valid_clock(minutes * 60.0 + seconds);
    }
    let (minutes, seconds) = trimmed.split_once(':')?;
    let minutes = minutes.trim().parse::<f64>().ok()?;
    let seconds = seconds.trim().parse::<f64>().ok()?;
    if seconds >= 60.0 {
        return None;
    }
    valid_clock(minutes * 60.0 + seconds)
}

fn valid_clock(seconds: f64) -> Option<f64> {
    if seconds.is_finite() && seconds >= 0.0 {
        Some(seconds)
    } else {
        None
    }
}

fn parse_score(raw: &str) -> Option<u16> {
    raw.trim().parse::<u16>().ok()
}

fn parse_score_pair(raw: &str) -> Option<(u16, u16)> {
    let (left, right) = raw.split_once('-')?;
    Some((parse_score(left)?, parse_score(right)?))
}

/// Rows of the `PlayByPlay` result set (`resultSets[].headers/rowSet`).
pub fn parse_stats_feed_json(raw: &str) -> Result<Vec<StatsFeedRow>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let root: Value = serde_json::from_str(trimmed).context("invalid stats feed json")?;
    let sets = root
        .get("resultSets")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let Some(set) = sets
        .iter()
        .find(|set| set.get("name").and_then(Value::as_str) == Some("PlayByPlay"))
        .or_else(|| sets.first())
    else {
        return Ok(Vec::new());
    };

    let headers: HashMap<String, usize> = set
        .get("headers")
        .and_then(Value::as_array)
        .map(|headers| {
            headers
                .iter()
                .enumerate()
                .filter_map(|(idx, h)| h.as_str().map(|h| (h.to_ascii_uppercase(), idx)))
                .collect()
        })
        .unwrap_or_default();
    let rows = set
        .get("rowSet")
        .and_then(Value::as_array)
        .context("stats feed result set has no rowSet")?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(cells) = row.as_array() else {
            continue;
        };
        let cell = |name: &str| headers.get(name).and_then(|idx| cells.get(*idx));
        out.push(StatsFeedRow {
            event_num: cell("EVENTNUM").and_then(value_u64).unwrap_or(0),
            msg_type: cell("EVENTMSGTYPE")
                .and_then(value_u64)
                .and_then(|v| i64::try_from(v).ok())
                .unwrap_or(-1),
            action_type: cell("EVENTMSGACTIONTYPE")
                .and_then(value_u64)
                .and_then(|v| i64::try_from(v).ok())
                .unwrap_or(0),
            period: cell("PERIOD").and_then(value_u64).unwrap_or(0),
            clock: cell("PCTIMESTRING")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            home_description: cell("HOMEDESCRIPTION").and_then(value_string),
            neutral_description: cell("NEUTRALDESCRIPTION").and_then(value_string),
            visitor_description: cell("VISITORDESCRIPTION").and_then(value_string),
            score: cell("SCORE").and_then(value_string),
            player1_id: cell("PLAYER1_ID").and_then(value_u64),
            player1_team_id: cell("PLAYER1_TEAM_ID").and_then(value_u64),
            player3_team_id: cell("PLAYER3_TEAM_ID").and_then(value_u64),
        });
    }
    Ok(out)
}

#[derive(Debug, Deserialize)]
struct LiveFeed {
    game: LiveGame,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveGame {
    #[serde(default)]
    actions: Vec<LiveAction>,
}

pub fn parse_live_feed_json(raw: &str) -> Result<Vec<LiveAction>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let feed: LiveFeed = serde_json::from_str(trimmed).context("invalid live feed json")?;
    Ok(feed.game.actions)
}

pub fn normalize_stats_feed_json(header: &GameHeader, raw: &str) -> Result<GameEvents> {
    let rows = parse_stats_feed_json(raw)?;
    Ok(normalize_game(header, rows.into_iter().map(RawEvent::Stats)))
}

pub fn normalize_live_feed_json(header: &GameHeader, raw: &str) -> Result<GameEvents> {
    let actions = parse_live_feed_json(raw)?;
    Ok(normalize_game(header, actions.into_iter().map(RawEvent::Live)))
}

fn value_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn value_string(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_formats() {
        assert_eq!(parse_clock("11:42"), Some(702.0));
        assert_eq!(parse_clock("0:24.5"), Some(24.5));
        assert_eq!(parse_clock("PT11M42.00S"), Some(702.0));
        assert_eq!(parse_clock("PT00M05.30S"), Some(5.3));
        assert_eq!(parse_clock("12:75"), None);
        assert_eq!(parse_clock("soon"), None);
    }

    #[test]
    fn score_pair_is_away_then_home() {
        assert_eq!(parse_score_pair("102 - 99"), Some((102, 99)));
        assert_eq!(parse_score_pair("TIE"), None);
    }
}
