mod common;

use common::{AWAY, HOME, Script};
use hoops_possessions::{EventKind, EventType, PossessionResult, RuleSet, StrategyKind, segment};

fn no_merge() -> RuleSet {
    RuleSet {
        merge_offensive_rebounds: false,
        ..RuleSet::default()
    }
}

#[test]
fn offensive_rebound_merges_into_one_possession() {
    let game = Script::new().miss(HOME).offensive_rebound(HOME).made(HOME, 2).build();

    let out = segment(&game, &RuleSet::default());
    assert_eq!(out.possessions.len(), 1);
    let p = &out.possessions[0];
    assert_eq!(p.offense_team_id, HOME);
    assert_eq!(p.result, PossessionResult::MadeFg);
    assert_eq!(p.offensive_rebounds, 1);
    assert_eq!(p.points_scored, 2);
    assert_eq!(p.event_count, 3);
}

#[test]
fn offensive_rebound_splits_when_merging_is_off() {
    let game = Script::new().miss(HOME).offensive_rebound(HOME).made(HOME, 2).build();

    let out = segment(&game, &no_merge());
    assert_eq!(out.possessions.len(), 2);
    assert!(out.possessions.iter().all(|p| p.offense_team_id == HOME));
    assert_eq!(out.possessions[0].result, PossessionResult::Other);
    assert_eq!(out.possessions[1].result, PossessionResult::MadeFg);
    assert_eq!(out.possessions[1].points_scored, 2);
}

#[test]
fn and_one_is_a_single_possession() {
    let game = Script::new()
        .made(HOME, 2)
        .free_throw(HOME, true, "Tatum Free Throw 1 of 1 (3 PTS)")
        .build();

    let out = segment(&game, &RuleSet::default());
    assert_eq!(out.possessions.len(), 1);
    let p = &out.possessions[0];
    assert_eq!(p.result, PossessionResult::MadeFg);
    assert_eq!(p.points_scored, 3);
    assert_eq!(p.end_sequence, 2);
    assert_eq!(out.stats.and_ones, 1);
    assert!(!p.quality.points_out_of_range);
}

#[test]
fn and_one_lookahead_skips_the_shooting_foul() {
    let game = Script::new()
        .made(AWAY, 3)
        .foul(HOME)
        .free_throw(AWAY, true, "James Free Throw 1 of 1 (4 PTS)")
        .turnover(HOME)
        .build();

    let out = segment(&game, &RuleSet::default());
    assert_eq!(out.possessions.len(), 2);
    assert_eq!(out.possessions[0].offense_team_id, AWAY);
    assert_eq!(out.possessions[0].points_scored, 4);
    assert_eq!(out.possessions[0].result, PossessionResult::MadeFg);
    assert_eq!(out.possessions[1].offense_team_id, HOME);
    assert_eq!(out.possessions[1].result, PossessionResult::Turnover);
}

#[test]
fn two_shot_trip_is_not_an_and_one() {
    let game = Script::new()
        .made(HOME, 2)
        .foul(HOME)
        .free_throw(AWAY, true, "Davis Free Throw 1 of 2")
        .free_throw(AWAY, true, "Davis Free Throw 2 of 2")
        .build();

    let out = segment(&game, &RuleSet::default());
    assert_eq!(out.stats.and_ones, 0);
    assert_eq!(out.possessions.len(), 2);
    assert_eq!(out.possessions[0].points_scored, 2);
    assert_eq!(out.possessions[1].offense_team_id, AWAY);
    assert_eq!(out.possessions[1].result, PossessionResult::FreeThrows);
    assert_eq!(out.possessions[1].points_scored, 2);
}

#[test]
fn only_the_last_free_throw_of_a_trip_ends_the_possession() {
    let game = Script::new()
        .foul(AWAY)
        .free_throw(HOME, true, "Brown Free Throw 1 of 2")
        .free_throw(HOME, false, "MISS Brown Free Throw 2 of 2")
        .defensive_rebound(AWAY)
        .build();

    let out = segment(&game, &RuleSet::default());
    let first = &out.possessions[0];
    assert_eq!(first.offense_team_id, HOME);
    assert_eq!(first.start_sequence, 1);
    assert_eq!(first.end_sequence, 3);
    assert_eq!(first.result, PossessionResult::FreeThrows);
    assert_eq!(first.points_scored, 1);
    assert_eq!(out.possessions[1].offense_team_id, AWAY);
    assert_eq!(out.possessions[1].start_sequence, 4);
}

#[test]
fn missed_last_free_throw_with_offensive_rebound_continues() {
    let game = Script::new()
        .foul(AWAY)
        .free_throw(HOME, false, "MISS Brown Free Throw 1 of 2")
        .free_throw(HOME, false, "MISS Brown Free Throw 2 of 2")
        .offensive_rebound(HOME)
        .made(HOME, 2)
        .build();

    let out = segment(&game, &RuleSet::default());
    assert_eq!(out.possessions.len(), 1);
    assert_eq!(out.possessions[0].result, PossessionResult::MadeFg);
    assert_eq!(out.possessions[0].offensive_rebounds, 1);
}

#[test]
fn technical_free_throws_never_end_a_possession() {
    let game = Script::new()
        .miss(HOME)
        .foul(AWAY)
        .free_throw(HOME, true, "Tatum Free Throw Technical (1 PTS)")
        .offensive_rebound(HOME)
        .made(HOME, 2)
        .build();

    let out = segment(&game, &RuleSet::default());
    assert_eq!(out.possessions.len(), 1);
    assert_eq!(out.possessions[0].points_scored, 3);
    assert!(out.possessions[0].quality.is_clean());
}

#[test]
fn technical_by_the_defense_is_not_an_offense_mismatch() {
    let game = Script::new()
        .miss(HOME)
        .event(EventKind::Foul, Some(HOME), "T.FOUL")
        .free_throw(AWAY, true, "Davis Free Throw Technical")
        .offensive_rebound(HOME)
        .made(HOME, 2)
        .build();

    let out = segment(&game, &RuleSet::default());
    assert_eq!(out.possessions.len(), 1);
    assert!(!out.possessions[0].quality.offense_mismatch);
    assert_eq!(out.stats.offense_mismatches, 0);
}

#[test]
fn unreadable_free_throws_fall_back_to_the_sequence() {
    let game = Script::new()
        .foul(AWAY)
        .free_throw(HOME, true, "Free Throw")
        .free_throw(HOME, true, "Free Throw")
        .made(AWAY, 2)
        .build();

    let out = segment(&game, &RuleSet::default());
    assert_eq!(out.possessions.len(), 2);
    assert_eq!(out.possessions[0].end_sequence, 3);
    assert_eq!(out.possessions[0].result, PossessionResult::FreeThrows);
    assert!(out.possessions[0].quality.ambiguous_free_throws);
    assert_eq!(out.ambiguous_free_throws.len(), 2);
    assert_eq!(out.ambiguous_free_throws[0].description, "Free Throw");
    assert_eq!(out.stats.ambiguous_free_throws, 2);
}

#[test]
fn period_end_force_closes_the_open_possession() {
    let game = Script::new()
        .begin_period(1)
        .miss(HOME)
        .end_period()
        .begin_period(2)
        .turnover(AWAY)
        .build();

    let out = segment(&game, &RuleSet::default());
    assert_eq!(out.possessions.len(), 2);

    let first = &out.possessions[0];
    assert_eq!(first.result, PossessionResult::EndOfPeriod);
    assert!(first.quality.forced_close);
    assert_eq!(first.end_sequence, 3);
    assert_eq!(first.start_clock, 720.0);
    assert_eq!(first.end_clock, 0.0);

    let second = &out.possessions[1];
    assert_eq!(second.period, 2);
    assert_eq!(second.offense_team_id, AWAY);
    assert_eq!(second.start_sequence, 5);
    assert_eq!(second.start_clock, 720.0);
    assert_eq!(out.stats.forced_period_closes, 1);
}

#[test]
fn period_change_without_markers_is_an_implicit_break() {
    let game = Script::new().miss(HOME).period(2).turnover(AWAY).build();

    let out = segment(&game, &RuleSet::default());
    assert_eq!(out.possessions.len(), 2);
    assert_eq!(out.possessions[0].period, 1);
    assert_eq!(out.possessions[0].result, PossessionResult::EndOfPeriod);
    assert_eq!(out.possessions[1].period, 2);
    assert_eq!(out.stats.implicit_period_breaks, 1);
}

#[test]
fn possessions_are_numbered_and_partition_the_score() {
    let game = Script::new()
        .begin_period(1)
        .made(HOME, 3)
        .miss(AWAY)
        .defensive_rebound(HOME)
        .made(HOME, 2)
        .foul(HOME)
        .free_throw(AWAY, true, "Free Throw 1 of 2")
        .free_throw(AWAY, true, "Free Throw 2 of 2")
        .turnover(HOME)
        .made(AWAY, 2)
        .end_period()
        .build();

    let out = segment(&game, &RuleSet::default());
    let numbers: Vec<u32> = out.possessions.iter().map(|p| p.possession_number).collect();
    let expected: Vec<u32> = (1..=out.possessions.len() as u32).collect();
    assert_eq!(numbers, expected);

    for p in &out.possessions {
        assert_ne!(p.offense_team_id, p.defense_team_id);
        assert!(p.start_sequence <= p.end_sequence);
    }
    for pair in out.possessions.windows(2) {
        assert!(pair[0].end_sequence < pair[1].start_sequence);
        assert_eq!(pair[0].end_score_home, pair[1].start_score_home);
        assert_eq!(pair[0].end_score_away, pair[1].start_score_away);
    }

    let total: u32 = out.possessions.iter().map(|p| u32::from(p.points_scored)).sum();
    assert_eq!(total, game.final_combined_score());
    assert_eq!(total, 9);
}

#[test]
fn defensive_rebound_flips_the_offense() {
    let game = Script::new().miss(HOME).defensive_rebound(AWAY).miss(AWAY).build();

    let out = segment(&game, &RuleSet::default());
    assert_eq!(out.possessions.len(), 2);
    assert_eq!(out.possessions[0].result, PossessionResult::MissDefensiveRebound);
    assert_eq!(out.possessions[0].end_sequence, 2);
    assert_eq!(out.possessions[1].offense_team_id, AWAY);
}

#[test]
fn foreign_team_events_are_orphaned() {
    let game = Script::new()
        .miss(HOME)
        .event(EventKind::Turnover, Some(42), "Bad Pass")
        .event(EventKind::Turnover, None, "Team Turnover")
        .defensive_rebound(AWAY)
        .build();

    let out = segment(&game, &RuleSet::default());
    assert_eq!(out.stats.events_orphaned, 2);
    assert_eq!(out.stats.events_seen, 4);
    assert_eq!(out.possessions[0].event_count, 2);
}

#[test]
fn segmentation_is_deterministic() {
    let game = Script::new()
        .made(HOME, 2)
        .miss(AWAY)
        .offensive_rebound(AWAY)
        .made(AWAY, 3)
        .build();
    let rules = RuleSet::default();
    assert_eq!(segment(&game, &rules), segment(&game, &rules));
}

#[test]
fn continuation_set_decides_which_events_join_a_possession() {
    let game = Script::new()
        .made(HOME, 2)
        .event(EventKind::Substitution, Some(HOME), "SUB: Porzingis FOR Horford")
        .turnover(AWAY)
        .build();

    for strategy in [StrategyKind::EventClassification, StrategyKind::OffenseTracking] {
        let rules = RuleSet {
            strategy,
            ..RuleSet::default()
        };
        let out = segment(&game, &rules);
        assert_eq!(out.possessions.len(), 2);
        assert_eq!(out.possessions[1].start_sequence, 2);
        assert_eq!(out.possessions[1].event_count, 2);
        assert_eq!(out.stats.events_unclassified, 0);

        let mut narrowed = rules.clone();
        narrowed.continuation_event_types.remove(&EventType::Substitution);
        let out = segment(&game, &narrowed);
        assert_eq!(out.possessions.len(), 2);
        let second = &out.possessions[1];
        assert_eq!(second.offense_team_id, AWAY);
        assert_eq!((second.start_sequence, second.end_sequence), (3, 3));
        assert_eq!(second.event_count, 1);
        assert_eq!(second.result, PossessionResult::Turnover);
        assert_eq!(out.stats.events_unclassified, 1);
        assert_eq!(out.stats.events_orphaned, 0);
    }
}
