//! Trajectory sequencers.
//!
//! A sequencer walks the legs of an intent trajectory, runs a pairwise
//! kernel on each leg with a leg-relative lookahead window, and merges the
//! per-leg captures into one ordered [`ConflictList`](crate::ConflictList).
//!
//! | sequencer       | ownship | traffic    | kernel                  |
//! |-----------------|---------|------------|-------------------------|
//! | [`Cdsi`]        | state   | `Plan`     | [`Detection3D`](crate::detection::Detection3D) |
//! | [`CdsiPolygon`] | state   | `PolyPath` | [`DetectionPolygon`](crate::detection::DetectionPolygon) |
//! | [`Cdii`]        | `Plan`  | `Plan`     | `Cdsi` per ownship leg  |
//! | [`CdiiPolygon`] | `Plan`  | `PolyPath` | `CdsiPolygon` per leg   |

/// `ErrorReporter` and `ConflictReport` for a type with `conflicts` and
/// `error` fields.
macro_rules! impl_conflict_report {
    ($ty:ty) => {
        impl $crate::error_log::ErrorReporter for $ty {
            fn has_error(&self) -> bool {
                $crate::error_log::ErrorReporter::has_error(&self.error)
            }

            fn has_message(&self) -> bool {
                $crate::error_log::ErrorReporter::has_message(&self.error)
            }

            fn get_message(&self) -> String {
                $crate::error_log::ErrorReporter::get_message(&self.error)
            }

            fn get_message_no_clear(&self) -> String {
                $crate::error_log::ErrorReporter::get_message_no_clear(&self.error)
            }
        }

        impl $crate::conflict_list::ConflictReport for $ty {
            fn conflicts(&self) -> &$crate::conflict_list::ConflictList {
                &self.conflicts
            }

            fn error_log(&self) -> &$crate::error_log::ErrorLog {
                &self.error
            }
        }
    };
}

pub mod cdii;
pub mod cdii_polygon;
pub mod cdsi;
pub mod cdsi_polygon;

pub use cdii::Cdii;
pub use cdii_polygon::CdiiPolygon;
pub use cdsi::Cdsi;
pub use cdsi_polygon::CdsiPolygon;

use crate::conflict_list::{ConflictInterval, ConflictList};
use crate::error_log::ErrorLog;
use crate::plan::Plan;
use crate::position::Position;
use crate::util::{almost_equals_prec, PRECISION7};
use crate::vect::Velocity;

/// Legs shorter than this (seconds) are searched but flagged.
const SMALL_LEG_S: f64 = 1e-6;

/// Lookahead window of one leg, in seconds after the leg's base time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct LegWindow {
    /// How long the states of this leg stay valid
    pub ht: f64,
    /// Start of the search
    pub bt: f64,
    /// End of the search
    pub nt: f64,
}

impl LegWindow {
    /// `elapsed` is the leg base time minus the query reference time; `b`
    /// and `t` are relative to that reference. A conflict still open at the
    /// previous leg's end (`cont`) is followed to the end of this leg.
    pub(crate) fn new(b: f64, t: f64, elapsed: f64, state_horizon: f64, leg_remaining: f64, cont: bool) -> Self {
        let ht = (state_horizon - elapsed).min(leg_remaining).max(0.0);
        let bt = (b - elapsed).max(0.0);
        let nt = if cont { ht } else { t - elapsed };
        Self { ht, bt, nt }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.nt >= 0.0
    }

    /// Warn about a search window too short to mean anything.
    pub(crate) fn check_duration(&self, log: &ErrorLog, leg: usize, t_base: f64) {
        let dt = self.nt - self.bt;
        if dt > 0.0 && dt < SMALL_LEG_S {
            log.add_warning(format!(
                "detection on leg {leg} at time {:.6} with very small duration {dt:e}",
                self.bt + t_base
            ));
        }
    }
}

/// The last capture is still open at `leg_end` (absolute time).
pub(crate) fn continues(last: Option<&ConflictInterval>, leg_end: f64) -> bool {
    last.is_some_and(|c| almost_equals_prec(c.time_out, leg_end, PRECISION7))
}

/// A capture that ends where the query window starts was already left
/// before the query; it is not reported again.
pub(crate) fn already_exited(time_out: f64, window_start: f64) -> bool {
    almost_equals_prec(time_out, window_start, PRECISION7)
}

/// Merged captures, without the conflicts shorter than `min_duration`.
///
/// Filtering after the merge keeps a conflict whose pieces are each short
/// but which is long once joined across leg boundaries.
pub(crate) fn merge_filtered(raw: &[ConflictInterval], min_duration: f64) -> ConflictList {
    let mut list = ConflictList::merged(raw);
    list.retain_min_duration(min_duration);
    list
}

/// Walks the legs of `ownship` that overlap `[b, t]` (absolute times).
///
/// `leg` gets the leg's start position, its velocity, its base time and its
/// window, and returns the absolute conflict intervals found on it; those
/// are tagged with the leg index. With `stop_at` set, the walk ends after
/// the first leg yielding a capture at least that long.
pub(crate) fn sequence_plan<F>(ownship: &Plan, b: f64, t: f64, stop_at: Option<f64>, mut leg: F) -> Vec<ConflictInterval>
where
    F: FnMut(&Position, Velocity, f64, &LegWindow) -> Vec<ConflictInterval>,
{
    let n = ownship.size();
    let start = if b > ownship.last_time() {
        n - 1
    } else {
        ownship.get_segment(b).unwrap_or(0)
    };
    let lat_lon = ownship.is_lat_lon();

    let mut raw = Vec::new();
    let mut cont = false;
    for i in start..n - 1 {
        let t_base = ownship.time(i);
        let w = LegWindow::new(b, t, t_base, f64::INFINITY, ownship.time(i + 1) - t_base, cont);
        if !w.is_open() || w.bt > w.nt {
            continue;
        }
        let Some(point) = ownship.point(i) else {
            break;
        };
        let vo = if lat_lon {
            ownship.velocity(t_base)
        } else {
            ownship.initial_velocity(i)
        };

        let found = leg(&point.position, vo, t_base, &w);
        let done = stop_at.is_some_and(|min| found.iter().any(|c| c.duration() >= min));
        raw.extend(found.into_iter().map(|c| c.with_segments(i, i)));
        if done {
            return raw;
        }
        cont = continues(raw.last(), w.ht + t_base);
    }
    raw
}
