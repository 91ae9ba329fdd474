use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type TeamId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReboundKind {
    Offensive,
    Defensive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum EventKind {
    FieldGoalMade { points: u8 },
    FieldGoalMissed { points: u8 },
    FreeThrow { made: bool },
    Rebound { kind: ReboundKind },
    Turnover,
    Foul,
    Violation,
    Substitution,
    Timeout,
    JumpBall,
    PeriodBegin,
    PeriodEnd,
    Other,
}

/// Field-less tag for an [`EventKind`], used by the rule set's event-type sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    FieldGoalMade,
    FieldGoalMissed,
    FreeThrow,
    OffensiveRebound,
    DefensiveRebound,
    Turnover,
    Foul,
    Violation,
    Substitution,
    Timeout,
    JumpBall,
    PeriodBegin,
    PeriodEnd,
    Other,
}

impl EventKind {
    pub fn event_type(&self) -> EventType {
        match self {
            EventKind::FieldGoalMade { .. } => EventType::FieldGoalMade,
            EventKind::FieldGoalMissed { .. } => EventType::FieldGoalMissed,
            EventKind::FreeThrow { .. } => EventType::FreeThrow,
            EventKind::Rebound {
                kind: ReboundKind::Offensive,
            } => EventType::OffensiveRebound,
            EventKind::Rebound {
                kind: ReboundKind::Defensive,
            } => EventType::DefensiveRebound,
            EventKind::Turnover => EventType::Turnover,
            EventKind::Foul => EventType::Foul,
            EventKind::Violation => EventType::Violation,
            EventKind::Substitution => EventType::Substitution,
            EventKind::Timeout => EventType::Timeout,
            EventKind::JumpBall => EventType::JumpBall,
            EventKind::PeriodBegin => EventType::PeriodBegin,
            EventKind::PeriodEnd => EventType::PeriodEnd,
            EventKind::Other => EventType::Other,
        }
    }

    /// Events only the team with the ball can produce.
    pub fn is_offense_only(&self) -> bool {
        matches!(
            self,
            EventKind::FieldGoalMade { .. }
                | EventKind::FieldGoalMissed { .. }
                | EventKind::FreeThrow { .. }
                | EventKind::Rebound {
                    kind: ReboundKind::Offensive
                }
                | EventKind::Turnover
        )
    }

    /// Events that cannot be attributed without an acting team.
    pub fn requires_team(&self) -> bool {
        matches!(
            self,
            EventKind::FieldGoalMade { .. }
                | EventKind::FieldGoalMissed { .. }
                | EventKind::FreeThrow { .. }
                | EventKind::Rebound { .. }
                | EventKind::Turnover
        )
    }

    pub fn is_period_marker(&self) -> bool {
        matches!(self, EventKind::PeriodBegin | EventKind::PeriodEnd)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub game_id: String,
    pub sequence_number: u32,
    pub period: u8,
    pub clock_seconds: f64,
    pub kind: EventKind,
    #[serde(default)]
    pub team_id: Option<TeamId>,
    #[serde(default)]
    pub player_id: Option<u32>,
    pub score_home: u16,
    pub score_away: u16,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub possession_hint: Option<TeamId>,
    #[serde(default)]
    pub payload: Value,
}

impl Event {
    pub fn event_type(&self) -> EventType {
        self.kind.event_type()
    }

    pub fn combined_score(&self) -> u32 {
        u32::from(self.score_home) + u32::from(self.score_away)
    }
}

/// One game's canonical, chronologically ordered event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvents {
    pub game_id: String,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub events: Vec<Event>,
    /// Source records the normalizer could not map.
    #[serde(default)]
    pub rejected_records: usize,
}

impl GameEvents {
    pub fn has_team(&self, team_id: TeamId) -> bool {
        team_id == self.home_team_id || team_id == self.away_team_id
    }

    pub fn opponent(&self, team_id: TeamId) -> TeamId {
        if team_id == self.home_team_id {
            self.away_team_id
        } else {
            self.home_team_id
        }
    }

    pub fn final_combined_score(&self) -> u32 {
        self.events.last().map(Event::combined_score).unwrap_or(0)
    }

    /// Records the caller handed in, accepted or not.
    pub fn total_records(&self) -> usize {
        self.events.len() + self.rejected_records
    }
}
