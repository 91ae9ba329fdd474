use serde::{Deserialize, Serialize};

/// Counters for one call. Callers merge them across a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub games_processed: usize,
    pub games_failed: usize,
    pub events_seen: usize,
    pub records_rejected: usize,
    pub events_orphaned: usize,
    /// Events whose type is in neither the end nor the continuation set.
    pub events_unclassified: usize,
    pub possessions_emitted: usize,
    pub and_ones: usize,
    pub ambiguous_free_throws: usize,
    pub forced_period_closes: usize,
    pub implicit_period_breaks: usize,
    pub offense_mismatches: usize,
}

impl RunStatistics {
    pub fn merge(&mut self, other: &RunStatistics) {
        self.games_processed += other.games_processed;
        self.games_failed += other.games_failed;
        self.events_seen += other.events_seen;
        self.records_rejected += other.records_rejected;
        self.events_orphaned += other.events_orphaned;
        self.events_unclassified += other.events_unclassified;
        self.possessions_emitted += other.possessions_emitted;
        self.and_ones += other.and_ones;
        self.ambiguous_free_throws += other.ambiguous_free_throws;
        self.forced_period_closes += other.forced_period_closes;
        self.implicit_period_breaks += other.implicit_period_breaks;
        self.offense_mismatches += other.offense_mismatches;
    }

    /// Rejected records plus events skipped for a missing or foreign team.
    pub fn orphaned_total(&self) -> usize {
        self.records_rejected + self.events_orphaned
    }

    pub fn orphaned_percent(&self) -> f64 {
        let total = self.events_seen + self.records_rejected;
        if total == 0 {
            return 0.0;
        }
        self.orphaned_total() as f64 * 100.0 / total as f64
    }
}

impl<'a> std::iter::Sum<&'a RunStatistics> for RunStatistics {
    fn sum<I: Iterator<Item = &'a RunStatistics>>(iter: I) -> Self {
        let mut out = RunStatistics::default();
        for stats in iter {
            out.merge(stats);
        }
        out
    }
}
