#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use hoops_possessions::{Event, EventKind, GameEvents, ReboundKind, TeamId};

pub const HOME: TeamId = 1610612738;
pub const AWAY: TeamId = 1610612747;

pub fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

/// Hand-written event stream. Each event takes four seconds off the clock
/// and scoring events update the running score.
pub struct Script {
    game_id: String,
    events: Vec<Event>,
    period: u8,
    clock: f64,
    score: (u16, u16),
}

impl Script {
    pub fn new() -> Self {
        Self {
            game_id: "test-game".to_string(),
            events: Vec::new(),
            period: 1,
            clock: 720.0,
            score: (0, 0),
        }
    }

    pub fn event(&mut self, kind: EventKind, team: Option<TeamId>, description: &str) -> &mut Self {
        let points = match kind {
            EventKind::FieldGoalMade { points } => u16::from(points),
            EventKind::FreeThrow { made: true } => 1,
            _ => 0,
        };
        match team {
            Some(HOME) => self.score.0 += points,
            Some(_) => self.score.1 += points,
            None => {}
        }
        if !kind.is_period_marker() {
            self.clock = (self.clock - 4.0).max(0.0);
        }
        let clock = match kind {
            EventKind::PeriodEnd => 0.0,
            _ => self.clock,
        };
        self.events.push(Event {
            game_id: self.game_id.clone(),
            sequence_number: self.events.len() as u32 + 1,
            period: self.period,
            clock_seconds: clock,
            kind,
            team_id: team,
            player_id: None,
            score_home: self.score.0,
            score_away: self.score.1,
            description: description.to_string(),
            possession_hint: None,
            payload: serde_json::Value::Null,
        });
        self
    }

    /// Moves to `period` with a full clock, without emitting markers.
    pub fn period(&mut self, period: u8) -> &mut Self {
        self.period = period;
        self.clock = 720.0;
        self
    }

    pub fn begin_period(&mut self, period: u8) -> &mut Self {
        self.period(period);
        self.event(EventKind::PeriodBegin, None, "Start of period")
    }

    pub fn end_period(&mut self) -> &mut Self {
        self.event(EventKind::PeriodEnd, None, "End of period")
    }

    pub fn made(&mut self, team: TeamId, points: u8) -> &mut Self {
        self.event(EventKind::FieldGoalMade { points }, Some(team), "Jump Shot")
    }

    pub fn miss(&mut self, team: TeamId) -> &mut Self {
        self.event(EventKind::FieldGoalMissed { points: 2 }, Some(team), "MISS Jump Shot")
    }

    pub fn free_throw(&mut self, team: TeamId, made: bool, description: &str) -> &mut Self {
        self.event(EventKind::FreeThrow { made }, Some(team), description)
    }

    pub fn offensive_rebound(&mut self, team: TeamId) -> &mut Self {
        self.event(
            EventKind::Rebound {
                kind: ReboundKind::Offensive,
            },
            Some(team),
            "Offensive Rebound",
        )
    }

    pub fn defensive_rebound(&mut self, team: TeamId) -> &mut Self {
        self.event(
            EventKind::Rebound {
                kind: ReboundKind::Defensive,
            },
            Some(team),
            "Defensive Rebound",
        )
    }

    pub fn foul(&mut self, team: TeamId) -> &mut Self {
        self.event(EventKind::Foul, Some(team), "S.FOUL")
    }

    pub fn turnover(&mut self, team: TeamId) -> &mut Self {
        self.event(EventKind::Turnover, Some(team), "Bad Pass Turnover")
    }

    pub fn set_hint(&mut self, team: TeamId) -> &mut Self {
        if let Some(last) = self.events.last_mut() {
            last.possession_hint = Some(team);
        }
        self
    }

    pub fn build(&self) -> GameEvents {
        GameEvents {
            game_id: self.game_id.clone(),
            home_team_id: HOME,
            away_team_id: AWAY,
            events: self.events.clone(),
            rejected_records: 0,
        }
    }
}
