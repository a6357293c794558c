//! Text and JSON output.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::detect::TrafficResult;

#[derive(Debug, Serialize)]
pub struct DetectionReport {
    pub scenario: String,
    pub ownship: String,
    pub generated_at: DateTime<Utc>,
    /// Absolute lookahead window
    pub window: [f64; 2],
    pub results: Vec<TrafficResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankEntry {
    pub id: String,
    pub urgency: f64,
}

#[derive(Debug, Serialize)]
pub struct RankingReport {
    pub scenario: String,
    pub ownship: String,
    pub generated_at: DateTime<Utc>,
    pub time: f64,
    pub ranking: Vec<RankEntry>,
    /// Traffic with no usable state at `time`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unranked: Vec<String>,
}

impl DetectionReport {
    pub fn conflict_count(&self) -> usize {
        self.results.iter().map(|r| r.conflicts.len()).sum()
    }

    pub fn print_table(&self) {
        println!(
            "Scenario: {}  ownship: {}  window: [{:.1}, {:.1}] s",
            self.scenario, self.ownship, self.window[0], self.window[1]
        );
        for r in &self.results {
            if r.conflicts.is_empty() {
                println!("  {:<16} {:<13} clear", r.id, r.kind);
            }
            for c in &r.conflicts {
                println!(
                    "  {:<16} {:<13} in {:>9.1}  out {:>9.1}  tca {:>9.1}  dist {:.3}  legs {}-{}",
                    r.id, r.kind, c.time_in, c.time_out, c.time_closest, c.dist_closest,
                    c.segment_in, c.segment_out
                );
            }
            for m in &r.messages {
                println!("    ! {m}");
            }
        }
        println!("{} conflict(s)", self.conflict_count());
    }
}

impl RankingReport {
    pub fn print_table(&self) {
        println!(
            "Scenario: {}  ownship: {}  at t={:.1} s",
            self.scenario, self.ownship, self.time
        );
        for (i, e) in self.ranking.iter().enumerate() {
            println!("  {:>2}. {:<16} {:>12.4}", i + 1, e.id, e.urgency);
        }
        for id in &self.unranked {
            println!("      {id:<16} no usable state");
        }
    }
}
