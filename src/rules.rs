use std::collections::BTreeSet;
use std::env;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::event::EventType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    EventClassification,
    OffenseTracking,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    pub strategy: StrategyKind,
    pub min_duration: f64,
    pub max_duration: f64,
    pub start_event_types: BTreeSet<EventType>,
    pub end_event_types: BTreeSet<EventType>,
    pub continuation_event_types: BTreeSet<EventType>,
    pub merge_offensive_rebounds: bool,
    pub regulation_periods: u8,
    pub oliver_fta_coefficient: f64,
    pub oliver_tolerance_percent: f64,
    pub duration_outlier_seconds: f64,
    pub max_orphaned_event_percent: f64,
    pub orphan_warn_percent: f64,
    pub clutch_seconds: f64,
    pub clutch_margin: u16,
    pub garbage_time_seconds: f64,
    pub garbage_time_margin: u16,
    pub fastbreak_max_seconds: f64,
}

impl Default for RuleSet {
    fn default() -> Self {
        use EventType::*;
        Self {
            strategy: StrategyKind::EventClassification,
            min_duration: 0.0,
            max_duration: 60.0,
            start_event_types: [
                FieldGoalMade,
                FieldGoalMissed,
                FreeThrow,
                OffensiveRebound,
                DefensiveRebound,
                Turnover,
                Foul,
                JumpBall,
            ]
            .into_iter()
            .collect(),
            end_event_types: [
                FieldGoalMade,
                FreeThrow,
                OffensiveRebound,
                DefensiveRebound,
                Turnover,
                PeriodEnd,
            ]
            .into_iter()
            .collect(),
            continuation_event_types: [
                FieldGoalMissed,
                Foul,
                Violation,
                Substitution,
                Timeout,
                JumpBall,
                Other,
            ]
            .into_iter()
            .collect(),
            merge_offensive_rebounds: true,
            regulation_periods: 4,
            oliver_fta_coefficient: 0.44,
            oliver_tolerance_percent: 5.0,
            duration_outlier_seconds: 35.0,
            max_orphaned_event_percent: 5.0,
            orphan_warn_percent: 1.0,
            clutch_seconds: 300.0,
            clutch_margin: 5,
            garbage_time_seconds: 300.0,
            garbage_time_margin: 20,
            fastbreak_max_seconds: 8.0,
        }
    }
}

impl RuleSet {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Ok(Self::default());
        }
        serde_json::from_str(trimmed).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Defaults with `POSSESSION_*` environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let num = |key: &str| lookup(key).and_then(|val| val.trim().parse::<f64>().ok());

        if let Some(val) = lookup("POSSESSION_MERGE_OREB") {
            self.merge_offensive_rebounds =
                matches!(val.trim(), "1" | "true" | "TRUE" | "on" | "ON");
        }
        if let Some(val) = lookup("POSSESSION_STRATEGY") {
            match val.trim().to_ascii_lowercase().as_str() {
                "offense_tracking" | "tracking" => {
                    self.strategy = StrategyKind::OffenseTracking;
                }
                "event_classification" | "classification" => {
                    self.strategy = StrategyKind::EventClassification;
                }
                _ => {}
            }
        }
        if let Some(val) = num("POSSESSION_MIN_DURATION") {
            self.min_duration = val;
        }
        if let Some(val) = num("POSSESSION_MAX_DURATION") {
            self.max_duration = val;
        }
        if let Some(val) = num("POSSESSION_OLIVER_FTA_COEFFICIENT") {
            self.oliver_fta_coefficient = val;
        }
        if let Some(val) = num("POSSESSION_OLIVER_TOLERANCE_PCT") {
            self.oliver_tolerance_percent = val;
        }
        if let Some(val) = num("POSSESSION_DURATION_OUTLIER_SECS") {
            self.duration_outlier_seconds = val;
        }
        if let Some(val) = num("POSSESSION_MAX_ORPHANED_PCT") {
            self.max_orphaned_event_percent = val;
        }
        if let Some(val) = num("POSSESSION_FASTBREAK_SECS") {
            self.fastbreak_max_seconds = val;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::ConfigurationInvalid(msg));

        if !self.min_duration.is_finite() || self.min_duration < 0.0 {
            return invalid(format!("min_duration must be >= 0, got {}", self.min_duration));
        }
        if !self.max_duration.is_finite() || self.max_duration <= self.min_duration {
            return invalid(format!(
                "max_duration ({}) must exceed min_duration ({})",
                self.max_duration, self.min_duration
            ));
        }
        if !(self.oliver_tolerance_percent > 0.0 && self.oliver_tolerance_percent <= 100.0) {
            return invalid(format!(
                "oliver_tolerance_percent must be in (0, 100], got {}",
                self.oliver_tolerance_percent
            ));
        }
        if !(self.oliver_fta_coefficient > 0.0 && self.oliver_fta_coefficient <= 1.0) {
            return invalid(format!(
                "oliver_fta_coefficient must be in (0, 1], got {}",
                self.oliver_fta_coefficient
            ));
        }
        if !(self.max_orphaned_event_percent >= 0.0 && self.max_orphaned_event_percent <= 100.0) {
            return invalid(format!(
                "max_orphaned_event_percent must be in [0, 100], got {}",
                self.max_orphaned_event_percent
            ));
        }
        if !(self.orphan_warn_percent >= 0.0
            && self.orphan_warn_percent <= self.max_orphaned_event_percent)
        {
            return invalid(format!(
                "orphan_warn_percent ({}) must be in [0, max_orphaned_event_percent]",
                self.orphan_warn_percent
            ));
        }
        if !(self.duration_outlier_seconds > 0.0) {
            return invalid(format!(
                "duration_outlier_seconds must be > 0, got {}",
                self.duration_outlier_seconds
            ));
        }
        if self.regulation_periods == 0 {
            return invalid("regulation_periods must be >= 1".to_string());
        }
        for (name, secs) in [
            ("clutch_seconds", self.clutch_seconds),
            ("garbage_time_seconds", self.garbage_time_seconds),
            ("fastbreak_max_seconds", self.fastbreak_max_seconds),
        ] {
            if !secs.is_finite() || secs < 0.0 {
                return invalid(format!("{name} must be >= 0, got {secs}"));
            }
        }
        if self.garbage_time_margin <= self.clutch_margin {
            return invalid(format!(
                "garbage_time_margin ({}) must exceed clutch_margin ({})",
                self.garbage_time_margin, self.clutch_margin
            ));
        }
        if self.start_event_types.is_empty() {
            return invalid("start_event_types must not be empty".to_string());
        }
        if self.end_event_types.is_empty() {
            return invalid("end_event_types must not be empty".to_string());
        }
        if let Some(overlap) = self
            .end_event_types
            .intersection(&self.continuation_event_types)
            .next()
        {
            return invalid(format!(
                "{overlap:?} cannot be both an end and a continuation event type"
            ));
        }
        for marker in [EventType::PeriodBegin, EventType::PeriodEnd] {
            if self.continuation_event_types.contains(&marker)
                || self.start_event_types.contains(&marker)
            {
                return invalid(format!(
                    "{marker:?} is a period marker and cannot be a start or continuation type"
                ));
            }
        }
        Ok(())
    }

    /// Types in neither the end nor the continuation set are left out of
    /// possessions entirely. Period markers are always classified.
    pub fn classifies(&self, event_type: EventType) -> bool {
        matches!(event_type, EventType::PeriodBegin | EventType::PeriodEnd)
            || self.end_event_types.contains(&event_type)
            || self.continuation_event_types.contains(&event_type)
    }

    /// Final regulation period or overtime.
    pub fn is_late_period(&self, period: u8) -> bool {
        period >= self.regulation_periods
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(RuleSet::default().validate().is_ok());
    }

    #[test]
    fn overrides_apply_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("POSSESSION_MERGE_OREB", "false"),
            ("POSSESSION_STRATEGY", "tracking"),
            ("POSSESSION_OLIVER_TOLERANCE_PCT", "2.5"),
            ("POSSESSION_MAX_DURATION", "not-a-number"),
        ]
        .into_iter()
        .collect();
        let rules =
            RuleSet::default().with_overrides(|key| vars.get(key).map(|v| v.to_string()));
        assert!(!rules.merge_offensive_rebounds);
        assert_eq!(rules.strategy, StrategyKind::OffenseTracking);
        assert!((rules.oliver_tolerance_percent - 2.5).abs() < 1e-9);
        assert!((rules.max_duration - 60.0).abs() < 1e-9);
    }

    #[test]
    fn defaults_classify_every_event_type() {
        use EventType::*;
        let rules = RuleSet::default();
        for ty in [
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
        ] {
            assert!(rules.classifies(ty), "{ty:?}");
        }
    }

    #[test]
    fn overlapping_end_and_continuation_is_rejected() {
        let mut rules = RuleSet::default();
        rules.continuation_event_types.insert(EventType::Turnover);
        assert!(rules.validate().is_err());
    }
}
