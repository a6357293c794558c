//! Conflict intervals produced by the sequencers, and their merging.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error_log::{ErrorLog, ErrorReporter};
use crate::util::{almost_less, PRECISION7};

/// One predicted loss of separation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConflictInterval {
    pub time_in: f64,
    pub time_out: f64,
    /// Time of closest approach within the interval
    pub time_closest: f64,
    /// Distance at `time_closest` (kernel specific measure)
    pub dist_closest: f64,
    /// Trajectory segment in which the interval starts
    #[serde(default)]
    pub segment_in: usize,
    /// Trajectory segment in which the interval ends
    #[serde(default)]
    pub segment_out: usize,
}

impl ConflictInterval {
    pub fn new(time_in: f64, time_out: f64, time_closest: f64, dist_closest: f64) -> Self {
        Self {
            time_in,
            time_out,
            time_closest,
            dist_closest,
            segment_in: 0,
            segment_out: 0,
        }
    }

    pub fn with_segments(mut self, segment_in: usize, segment_out: usize) -> Self {
        self.segment_in = segment_in;
        self.segment_out = segment_out;
        self
    }

    /// All times moved by `dt`.
    pub fn shifted(self, dt: f64) -> Self {
        Self {
            time_in: self.time_in + dt,
            time_out: self.time_out + dt,
            time_closest: self.time_closest + dt,
            ..self
        }
    }

    pub fn duration(&self) -> f64 {
        self.time_out - self.time_in
    }

    /// Overlaps the closed window `[start, end]`.
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        self.time_in <= end && self.time_out >= start
    }
}

fn by_time_in(a: &ConflictInterval, b: &ConflictInterval) -> Ordering {
    a.time_in.total_cmp(&b.time_in)
}

/// Fuse intervals that touch or overlap.
///
/// Input is sorted by entry time first. Two neighbours are fused unless the
/// first exits strictly (beyond round-off) before the second enters. The
/// fused interval keeps the closest approach with the smaller distance.
/// Applying `merge` to its own output changes nothing.
pub fn merge(intervals: &[ConflictInterval]) -> Vec<ConflictInterval> {
    let mut sorted = intervals.to_vec();
    sorted.sort_by(by_time_in);

    let mut merged: Vec<ConflictInterval> = Vec::with_capacity(sorted.len());
    for next in sorted {
        match merged.last_mut() {
            Some(last) if !almost_less(last.time_out, next.time_in, PRECISION7) => {
                if next.time_out > last.time_out {
                    last.time_out = next.time_out;
                    last.segment_out = next.segment_out;
                }
                if next.dist_closest <= last.dist_closest {
                    last.time_closest = next.time_closest;
                    last.dist_closest = next.dist_closest;
                }
            }
            _ => merged.push(next),
        }
    }
    merged
}

/// Ordered, non-overlapping conflict intervals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConflictList {
    intervals: Vec<ConflictInterval>,
}

impl ConflictList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw per-segment captures, merging as needed.
    pub fn merged(raw: &[ConflictInterval]) -> Self {
        Self {
            intervals: merge(raw),
        }
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&ConflictInterval> {
        self.intervals.get(i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConflictInterval> {
        self.intervals.iter()
    }

    pub fn as_slice(&self) -> &[ConflictInterval] {
        &self.intervals
    }

    pub fn clear(&mut self) {
        self.intervals.clear();
    }

    /// Any interval overlapping the closed window `[start, end]`.
    pub fn conflict_between(&self, start: f64, end: f64) -> bool {
        self.intervals.iter().any(|c| c.overlaps(start, end))
    }

    /// Keep only intervals overlapping `[start, end]`.
    pub fn retain_overlapping(&mut self, start: f64, end: f64) {
        self.intervals.retain(|c| c.overlaps(start, end));
    }

    /// Drop intervals shorter than `min` seconds.
    pub fn retain_min_duration(&mut self, min: f64) {
        self.intervals.retain(|c| c.duration() >= min);
    }
}

impl<'a> IntoIterator for &'a ConflictList {
    type Item = &'a ConflictInterval;
    type IntoIter = std::slice::Iter<'a, ConflictInterval>;

    fn into_iter(self) -> Self::IntoIter {
        self.intervals.iter()
    }
}

/// Indexed read access to a detector's last result.
///
/// Out-of-range indices are logged as errors and yield 0.
pub trait ConflictReport: ErrorReporter {
    fn conflicts(&self) -> &ConflictList;

    fn error_log(&self) -> &ErrorLog;

    fn size(&self) -> usize {
        self.conflicts().len()
    }

    fn conflict(&self) -> bool {
        !self.conflicts().is_empty()
    }

    fn conflict_between(&self, start: f64, end: f64) -> bool {
        self.conflicts().conflict_between(start, end)
    }

    fn time_in(&self, i: usize) -> f64 {
        report_field(self, i, "time_in", |c| c.time_in)
    }

    fn time_out(&self, i: usize) -> f64 {
        report_field(self, i, "time_out", |c| c.time_out)
    }

    fn time_closest(&self, i: usize) -> f64 {
        report_field(self, i, "time_closest", |c| c.time_closest)
    }

    fn distance_closest(&self, i: usize) -> f64 {
        report_field(self, i, "distance_closest", |c| c.dist_closest)
    }

    fn segment_in(&self, i: usize) -> usize {
        report_field(self, i, "segment_in", |c| c.segment_in)
    }

    fn segment_out(&self, i: usize) -> usize {
        report_field(self, i, "segment_out", |c| c.segment_out)
    }
}

fn report_field<R, T>(report: &R, i: usize, what: &str, f: impl Fn(&ConflictInterval) -> T) -> T
where
    R: ConflictReport + ?Sized,
    T: Default,
{
    match report.conflicts().get(i) {
        Some(c) => f(c),
        None => {
            report.error_log().add_error(format!(
                "Out of range error 0 <= {i} < {} in {what}",
                report.size()
            ));
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(tin: f64, tout: f64, dist: f64) -> ConflictInterval {
        ConflictInterval::new(tin, tout, (tin + tout) / 2.0, dist)
    }

    #[test]
    fn test_merge_touching_intervals() {
        let merged = merge(&[iv(0.0, 10.0, 5.0), iv(10.0, 20.0, 1.0), iv(30.0, 40.0, 2.0)]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].time_in, 0.0);
        assert_eq!(merged[0].time_out, 20.0);
        assert_eq!(merged[0].dist_closest, 1.0);
        assert_eq!(merged[0].time_closest, 15.0);
        assert_eq!(merged[1].time_in, 30.0);
    }

    #[test]
    fn test_merge_keeps_closer_approach_of_first() {
        let merged = merge(&[iv(0.0, 10.0, 0.5), iv(5.0, 12.0, 3.0)]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].time_out, 12.0);
        assert_eq!(merged[0].dist_closest, 0.5);
    }

    #[test]
    fn test_merge_nested_interval_does_not_shrink() {
        let merged = merge(&[iv(0.0, 50.0, 1.0), iv(10.0, 20.0, 2.0)]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].time_out, 50.0);
    }

    #[test]
    fn test_merge_within_roundoff() {
        let merged = merge(&[iv(0.0, 3600.0, 1.0), iv(3600.0 + 1e-9, 4000.0, 1.0)]);
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_merge_sorts_and_is_idempotent() {
        let raw = [iv(30.0, 40.0, 2.0), iv(0.0, 10.0, 5.0), iv(9.0, 12.0, 1.0)];
        let once = merge(&raw);
        assert_eq!(merge(&once), once);
        assert!(once.windows(2).all(|w| w[0].time_out < w[1].time_in));
    }

    #[test]
    fn test_conflict_between() {
        let list = ConflictList::merged(&[iv(10.0, 20.0, 1.0)]);
        assert!(list.conflict_between(0.0, 10.0));
        assert!(list.conflict_between(15.0, 16.0));
        assert!(!list.conflict_between(21.0, 30.0));
    }

    #[derive(Default)]
    struct Holder {
        list: ConflictList,
        log: ErrorLog,
    }

    impl ErrorReporter for Holder {
        fn has_error(&self) -> bool {
            self.log.has_error()
        }
        fn has_message(&self) -> bool {
            self.log.has_message()
        }
        fn get_message(&self) -> String {
            self.log.get_message()
        }
        fn get_message_no_clear(&self) -> String {
            self.log.get_message_no_clear()
        }
    }

    impl ConflictReport for Holder {
        fn conflicts(&self) -> &ConflictList {
            &self.list
        }
        fn error_log(&self) -> &ErrorLog {
            &self.log
        }
    }

    #[test]
    fn test_out_of_range_access_logs_error() {
        let holder = Holder {
            list: ConflictList::merged(&[iv(1.0, 2.0, 0.0)]),
            ..Default::default()
        };
        assert_eq!(holder.time_in(0), 1.0);
        assert!(!holder.has_error());
        assert_eq!(holder.time_out(3), 0.0);
        assert!(holder.has_error());
        assert!(holder.get_message().contains("Out of range error 0 <= 3 < 1 in time_out"));
    }
}
