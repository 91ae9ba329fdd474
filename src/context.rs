use crate::rules::RuleSet;
use crate::segment::{ContextFlags, Possession};

pub fn context_for(possession: &Possession, rules: &RuleSet) -> ContextFlags {
    let late = rules.is_late_period(possession.period);
    let margin = possession.start_margin().unsigned_abs();

    let clutch = late
        && possession.start_clock <= rules.clutch_seconds
        && margin <= u32::from(rules.clutch_margin);
    let garbage_time = late
        && possession.start_clock <= rules.garbage_time_seconds
        && margin > u32::from(rules.garbage_time_margin);
    let fastbreak = possession.duration_seconds <= rules.fastbreak_max_seconds
        && possession.result.is_scoring_or_attempt();

    ContextFlags {
        clutch,
        garbage_time,
        fastbreak,
    }
}

/// Tags sealed possessions. Boundaries, numbering and order are untouched.
pub fn tag_possessions(possessions: Vec<Possession>, rules: &RuleSet) -> Vec<Possession> {
    possessions
        .into_iter()
        .map(|possession| {
            let flags = context_for(&possession, rules);
            possession.with_context(flags)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::{PossessionResult, QualityFlags};

    fn possession(period: u8, clock: f64, home: u16, away: u16) -> Possession {
        Possession {
            game_id: "g".to_string(),
            possession_number: 1,
            offense_team_id: 1,
            defense_team_id: 2,
            period,
            start_sequence: 1,
            end_sequence: 2,
            start_clock: clock,
            end_clock: clock - 12.0,
            duration_seconds: 12.0,
            start_score_home: home,
            start_score_away: away,
            end_score_home: home,
            end_score_away: away,
            points_scored: 0,
            result: PossessionResult::Turnover,
            event_count: 2,
            offensive_rebounds: 0,
            context: ContextFlags::default(),
            quality: QualityFlags::default(),
        }
    }

    fn timed(result: PossessionResult, duration: f64) -> Possession {
        Possession {
            result,
            duration_seconds: duration,
            ..possession(1, 600.0, 10, 10)
        }
    }

    #[test]
    fn fastbreak_boundary_is_inclusive() {
        let rules = RuleSet::default();
        assert!(context_for(&timed(PossessionResult::MadeFg, 8.0), &rules).fastbreak);
        assert!(!context_for(&timed(PossessionResult::MadeFg, 8.1), &rules).fastbreak);
        assert!(context_for(&timed(PossessionResult::FreeThrows, 5.0), &rules).fastbreak);
        assert!(context_for(&timed(PossessionResult::MissDefensiveRebound, 2.0), &rules).fastbreak);
    }

    #[test]
    fn turnovers_and_period_ends_are_never_fastbreaks() {
        let rules = RuleSet::default();
        assert!(!context_for(&timed(PossessionResult::Turnover, 3.0), &rules).fastbreak);
        assert!(!context_for(&timed(PossessionResult::EndOfPeriod, 1.0), &rules).fastbreak);
        assert!(!context_for(&timed(PossessionResult::Other, 4.0), &rules).fastbreak);
    }

    #[test]
    fn overtime_counts_as_late() {
        let rules = RuleSet::default();
        assert!(context_for(&possession(5, 120.0, 100, 98), &rules).clutch);
        assert!(!context_for(&possession(3, 120.0, 100, 98), &rules).clutch);
    }

    #[test]
    fn margin_boundaries() {
        let rules = RuleSet::default();
        assert!(context_for(&possession(4, 200.0, 90, 85), &rules).clutch);
        assert!(!context_for(&possession(4, 200.0, 90, 84), &rules).clutch);
        assert!(!context_for(&possession(4, 200.0, 110, 90), &rules).garbage_time);
        assert!(context_for(&possession(4, 200.0, 111, 90), &rules).garbage_time);
    }
}
