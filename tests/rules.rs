use hoops_possessions::{ConfigError, EventType, RuleSet, StrategyKind};

#[test]
fn empty_config_uses_defaults() {
    assert_eq!(RuleSet::from_json_str("null").expect("null ok"), RuleSet::default());
    assert_eq!(RuleSet::from_json_str("").expect("blank ok"), RuleSet::default());
}

#[test]
fn partial_config_keeps_other_defaults() {
    let raw = r#"{
        "strategy": "offense_tracking",
        "merge_offensive_rebounds": false,
        "oliver_tolerance_percent": 3.0,
        "continuation_event_types": ["foul", "substitution", "timeout"]
    }"#;
    let rules = RuleSet::from_json_str(raw).expect("config should parse");
    assert_eq!(rules.strategy, StrategyKind::OffenseTracking);
    assert!(!rules.merge_offensive_rebounds);
    assert!((rules.oliver_tolerance_percent - 3.0).abs() < 1e-9);
    assert!(!rules.continuation_event_types.contains(&EventType::JumpBall));
    assert!((rules.oliver_fta_coefficient - 0.44).abs() < 1e-9);
    assert_eq!(rules.end_event_types, RuleSet::default().end_event_types);
    assert!(rules.validate().is_ok());
}

#[test]
fn malformed_config_is_a_parse_error() {
    let err = RuleSet::from_json_str("{\"max_duration\": \"long\"}").expect_err("bad type");
    assert!(matches!(err, ConfigError::Parse(_)));
}

fn rejects(rules: RuleSet) {
    let err = rules.validate().expect_err("rule set should be rejected");
    assert!(matches!(err, ConfigError::ConfigurationInvalid(_)));
}

#[test]
fn rejects_structurally_invalid_rule_sets() {
    rejects(RuleSet {
        min_duration: 10.0,
        max_duration: 10.0,
        ..RuleSet::default()
    });
    rejects(RuleSet {
        min_duration: -1.0,
        ..RuleSet::default()
    });
    rejects(RuleSet {
        oliver_tolerance_percent: 0.0,
        ..RuleSet::default()
    });
    rejects(RuleSet {
        oliver_tolerance_percent: 100.5,
        ..RuleSet::default()
    });
    rejects(RuleSet {
        oliver_fta_coefficient: 0.0,
        ..RuleSet::default()
    });
    rejects(RuleSet {
        orphan_warn_percent: 8.0,
        ..RuleSet::default()
    });
    rejects(RuleSet {
        regulation_periods: 0,
        ..RuleSet::default()
    });
    rejects(RuleSet {
        garbage_time_margin: 5,
        ..RuleSet::default()
    });
    rejects(RuleSet {
        start_event_types: Default::default(),
        ..RuleSet::default()
    });

    let mut overlap = RuleSet::default();
    overlap.end_event_types.insert(EventType::Foul);
    rejects(overlap);

    let mut marker = RuleSet::default();
    marker.start_event_types.insert(EventType::PeriodBegin);
    rejects(marker);
}

#[test]
fn tolerance_upper_bound_is_inclusive() {
    let rules = RuleSet {
        oliver_tolerance_percent: 100.0,
        ..RuleSet::default()
    };
    assert!(rules.validate().is_ok());
}
