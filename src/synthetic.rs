use anyhow::{Result, bail};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::Value;

use crate::event::{Event, EventKind, GameEvents, ReboundKind, TeamId};
use crate::validate::BoxCounts;

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub game_id: String,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub home: BoxCounts,
    pub away: BoxCounts,
    pub periods: u8,
    pub period_seconds: f64,
    pub seed: u64,
}

impl SyntheticConfig {
    pub fn new(home: BoxCounts, away: BoxCounts, seed: u64) -> Self {
        Self {
            game_id: format!("synthetic-{seed}"),
            home_team_id: 1610612738,
            away_team_id: 1610612747,
            home,
            away,
            periods: 4,
            period_seconds: 720.0,
            seed,
        }
    }
}

#[derive(Debug, Clone)]
enum Script {
    Shots {
        offensive_rebounds: u32,
        final_points: u8,
        made: bool,
        and_one: bool,
    },
    Turnover,
    Trip {
        attempts: u8,
    },
}

impl Script {
    fn is_two_shot_trip(&self) -> bool {
        matches!(self, Script::Trip { attempts: 2 })
    }
}

fn team_scripts(counts: &BoxCounts, rng: &mut StdRng) -> Result<Vec<Script>> {
    if counts.fga < counts.orb {
        bail!("fga ({}) must cover orb ({})", counts.fga, counts.orb);
    }
    let shot_possessions = counts.fga - counts.orb;
    if shot_possessions == 0 && (counts.orb > 0 || counts.fta % 2 == 1) {
        bail!("offensive rebounds and and-1s need at least one field-goal possession");
    }

    let mut shots: Vec<Script> = (0..shot_possessions)
        .map(|_| Script::Shots {
            offensive_rebounds: 0,
            final_points: if rng.gen_bool(0.35) { 3 } else { 2 },
            made: rng.gen_bool(0.5),
            and_one: false,
        })
        .collect();
    for _ in 0..counts.orb {
        let idx = rng.gen_range(0..shots.len());
        if let Script::Shots {
            offensive_rebounds, ..
        } = &mut shots[idx]
        {
            *offensive_rebounds += 1;
        }
    }
    if counts.fta % 2 == 1 {
        add_and_one(&mut shots)?;
    }

    let mut scripts = shots;
    scripts.extend((0..counts.tov).map(|_| Script::Turnover));
    scripts.extend((0..counts.fta / 2).map(|_| Script::Trip { attempts: 2 }));
    Ok(scripts)
}

fn add_and_one(scripts: &mut [Script]) -> Result<()> {
    for script in scripts.iter_mut() {
        if let Script::Shots { made, and_one, .. } = script {
            if !*and_one {
                *made = true;
                *and_one = true;
                return Ok(());
            }
        }
    }
    bail!("no field-goal possession left for an and-1")
}

/// Folds two 2-shot trips into a 3-shot trip plus an and-1: free throws are
/// unchanged and the team loses one possession.
fn drop_one_possession(scripts: &mut Vec<Script>) -> Result<()> {
    let trips: Vec<usize> = scripts
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is_two_shot_trip())
        .map(|(idx, _)| idx)
        .take(2)
        .collect();
    if trips.len() < 2 {
        bail!("not enough two-shot trips to balance possessions");
    }
    add_and_one(scripts)?;
    scripts[trips[0]] = Script::Trip { attempts: 3 };
    scripts.remove(trips[1]);
    Ok(())
}

struct Emitter {
    game_id: String,
    home_team_id: TeamId,
    events: Vec<Event>,
    score: (u16, u16),
}

impl Emitter {
    fn emit(
        &mut self,
        period: u8,
        clock: f64,
        kind: EventKind,
        team_id: Option<TeamId>,
        description: String,
    ) {
        let points = match kind {
            EventKind::FieldGoalMade { points } => u16::from(points),
            EventKind::FreeThrow { made: true } => 1,
            _ => 0,
        };
        if let Some(team) = team_id {
            if team == self.home_team_id {
                self.score.0 += points;
            } else {
                self.score.1 += points;
            }
        }
        self.events.push(Event {
            game_id: self.game_id.clone(),
            sequence_number: self.events.len() as u32 + 1,
            period,
            clock_seconds: (clock * 10.0).round() / 10.0,
            kind,
            team_id,
            player_id: None,
            score_home: self.score.0,
            score_away: self.score.1,
            description,
            possession_hint: None,
            payload: Value::Null,
        });
    }
}

/// Builds a plausible event stream whose box score matches the config
/// exactly. Possessions alternate between the teams.
pub fn synthetic_game(cfg: &SyntheticConfig) -> Result<GameEvents> {
    if cfg.periods == 0 || cfg.period_seconds <= 0.0 {
        bail!("synthetic game needs at least one period of positive length");
    }
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let mut home = team_scripts(&cfg.home, &mut rng)?;
    let mut away = team_scripts(&cfg.away, &mut rng)?;
    while home.len() > away.len() + 1 {
        drop_one_possession(&mut home)?;
    }
    while away.len() > home.len() + 1 {
        drop_one_possession(&mut away)?;
    }
    home.shuffle(&mut rng);
    away.shuffle(&mut rng);

    let (first, second, first_team, second_team) = if away.len() > home.len() {
        (away, home, cfg.away_team_id, cfg.home_team_id)
    } else {
        (home, away, cfg.home_team_id, cfg.away_team_id)
    };
    let mut order: Vec<(TeamId, Script)> = Vec::with_capacity(first.len() + second.len());
    let mut second_iter = second.into_iter();
    for script in first {
        order.push((first_team, script));
        if let Some(script) = second_iter.next() {
            order.push((second_team, script));
        }
    }

    let mut out = Emitter {
        game_id: cfg.game_id.clone(),
        home_team_id: cfg.home_team_id,
        events: Vec::new(),
        score: (0, 0),
    };
    let opponent = |team: TeamId| {
        if team == cfg.home_team_id {
            cfg.away_team_id
        } else {
            cfg.home_team_id
        }
    };

    let periods = usize::from(cfg.periods);
    let total = order.len();
    let mut scripts = order.into_iter();
    for p in 0..periods {
        let period = p as u8 + 1;
        let count = (total * (p + 1)) / periods - (total * p) / periods;
        let chunk: Vec<(TeamId, Script)> = scripts.by_ref().take(count).collect();

        let weights: Vec<f64> = chunk.iter().map(|_| rng.gen_range(0.4..1.6)).collect();
        let budget = weights.iter().sum::<f64>() + 0.5;
        let mut clock = cfg.period_seconds;

        out.emit(period, clock, EventKind::PeriodBegin, None, "Start of period".to_string());
        if period == 1 {
            if let Some((team, _)) = chunk.first() {
                out.emit(period, clock, EventKind::JumpBall, Some(*team), "Jump Ball".to_string());
            }
        }

        let last_idx = chunk.len().saturating_sub(1);
        for (idx, (team, script)) in chunk.into_iter().enumerate() {
            let slice = cfg.period_seconds * weights[idx] / budget;
            let start = clock;
            let end = clock - slice;
            let steps = script_len(&script) as f64;
            let mut step = 0.0;
            let mut tick = || {
                step += 1.0;
                start - slice * step / (steps + 1.0)
            };

            if idx > 0 && rng.gen_bool(0.1) {
                let kind = if rng.gen_bool(0.5) {
                    EventKind::Substitution
                } else {
                    EventKind::Timeout
                };
                out.emit(period, start, kind, Some(team), "Dead ball".to_string());
            }

            let other = opponent(team);
            match script {
                Script::Turnover => {
                    let at = tick();
                    out.emit(period, at, EventKind::Turnover, Some(team), "Bad Pass".to_string());
                }
                Script::Trip { attempts } => {
                    let at = tick();
                    out.emit(period, at, EventKind::Foul, Some(other), "Shooting Foul".to_string());
                    for n in 1..=attempts {
                        let made = if n == attempts && idx == last_idx {
                            true
                        } else {
                            rng.gen_bool(0.75)
                        };
                        let text = free_throw_text(made, n, attempts);
                        out.emit(period, at, EventKind::FreeThrow { made }, Some(team), text);
                        if n == attempts && !made {
                            out.emit(
                                period,
                                tick(),
                                EventKind::Rebound {
                                    kind: ReboundKind::Defensive,
                                },
                                Some(other),
                                "Defensive Rebound".to_string(),
                            );
                        }
                    }
                }
                Script::Shots {
                    offensive_rebounds,
                    final_points,
                    made,
                    and_one,
                } => {
                    for _ in 0..offensive_rebounds {
                        out.emit(
                            period,
                            tick(),
                            EventKind::FieldGoalMissed { points: 2 },
                            Some(team),
                            "MISS Layup".to_string(),
                        );
                        out.emit(
                            period,
                            tick(),
                            EventKind::Rebound {
                                kind: ReboundKind::Offensive,
                            },
                            Some(team),
                            "Offensive Rebound".to_string(),
                        );
                    }
                    let shot = if final_points == 3 { "3PT Jump Shot" } else { "Jump Shot" };
                    let at = tick();
                    if made {
                        out.emit(
                            period,
                            at,
                            EventKind::FieldGoalMade {
                                points: final_points,
                            },
                            Some(team),
                            shot.to_string(),
                        );
                        if and_one {
                            let foul = "Shooting Foul".to_string();
                            out.emit(period, at, EventKind::Foul, Some(other), foul);
                            let make_it = idx == last_idx || rng.gen_bool(0.75);
                            out.emit(
                                period,
                                at,
                                EventKind::FreeThrow { made: make_it },
                                Some(team),
                                free_throw_text(make_it, 1, 1),
                            );
                            if !make_it {
                                out.emit(
                                    period,
                                    tick(),
                                    EventKind::Rebound {
                                        kind: ReboundKind::Defensive,
                                    },
                                    Some(other),
                                    "Defensive Rebound".to_string(),
                                );
                            }
                        }
                    } else {
                        out.emit(
                            period,
                            at,
                            EventKind::FieldGoalMissed {
                                points: final_points,
                            },
                            Some(team),
                            format!("MISS {shot}"),
                        );
                        out.emit(
                            period,
                            tick(),
                            EventKind::Rebound {
                                kind: ReboundKind::Defensive,
                            },
                            Some(other),
                            "Defensive Rebound".to_string(),
                        );
                    }
                }
            }
            clock = end;
        }

        out.emit(period, 0.0, EventKind::PeriodEnd, None, "End of period".to_string());
    }

    Ok(GameEvents {
        game_id: cfg.game_id.clone(),
        home_team_id: cfg.home_team_id,
        away_team_id: cfg.away_team_id,
        events: out.events,
        rejected_records: 0,
    })
}

fn script_len(script: &Script) -> u32 {
    match script {
        Script::Turnover => 1,
        Script::Trip { .. } => 2,
        Script::Shots {
            offensive_rebounds, ..
        } => offensive_rebounds * 2 + 2,
    }
}

fn free_throw_text(made: bool, n: u8, of: u8) -> String {
    if made {
        format!("Free Throw {n} of {of}")
    } else {
        format!("MISS Free Throw {n} of {of}")
    }
}
