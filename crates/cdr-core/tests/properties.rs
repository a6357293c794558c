//! Randomised checks of the geometric properties every detector keeps.
//!
//! Seeds are fixed so failures reproduce.

use cdr_core::{
    merge, CdCylinder, CdPolyIter, Cdii, Cdsi, ConflictInterval, ConflictReport, Detection3D,
    DetectionPolygon, MovingPolygon2D, MovingPolygon3D, Plan, Poly2D, Position, Vect2, Vect3,
    Velocity,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const CASES: usize = 500;
const SLACK: f64 = 1e-6;

fn random_state(rng: &mut StdRng) -> (Vect3, Velocity) {
    let s = Vect3::new(
        rng.random_range(-40_000.0..40_000.0),
        rng.random_range(-40_000.0..40_000.0),
        rng.random_range(1000.0..2000.0),
    );
    let v = Velocity::new(
        rng.random_range(-250.0..250.0),
        rng.random_range(-250.0..250.0),
        rng.random_range(-5.0..5.0),
    );
    (s, v)
}

fn negated(v: Velocity) -> Velocity {
    Velocity::new(-v.x, -v.y, -v.z)
}

fn random_plan(rng: &mut StdRng, name: &str, legs: usize, leg_s: f64) -> Plan {
    let mut plan = Plan::new(name);
    for i in 0..=legs {
        let p = Position::xyz(
            rng.random_range(-30_000.0..30_000.0),
            rng.random_range(-30_000.0..30_000.0),
            rng.random_range(1300.0..1700.0),
        );
        plan.add(p, i as f64 * leg_s);
    }
    plan
}

fn assert_ordered(conflicts: &[ConflictInterval]) {
    for c in conflicts {
        assert!(c.time_in <= c.time_out, "{c:?}");
    }
    for pair in conflicts.windows(2) {
        assert!(pair[0].time_out < pair[1].time_in, "{pair:?}");
    }
}

#[test]
fn test_swapping_roles_gives_same_interval() {
    let mut rng = StdRng::seed_from_u64(11);
    let cd = CdCylinder::default();
    for _ in 0..CASES {
        let (so, vo) = random_state(&mut rng);
        let (si, vi) = random_state(&mut rng);
        let a = cd.conflict_detection(so, vo, si, vi, 0.0, 600.0);
        let b = cd.conflict_detection(si, vi, so, vo, 0.0, 600.0);
        assert_eq!(a.conflict(), b.conflict());
        if a.conflict() {
            assert!((a.time_in() - b.time_in()).abs() < SLACK);
            assert!((a.time_out() - b.time_out()).abs() < SLACK);
        }
    }
}

#[test]
fn test_reversed_motion_mirrors_interval_in_time() {
    let mut rng = StdRng::seed_from_u64(12);
    let cd = CdCylinder::default();
    let horizon = 600.0;
    let mut checked = 0;
    for _ in 0..CASES {
        let (so, vo) = random_state(&mut rng);
        let (si, vi) = random_state(&mut rng);
        let fwd = cd.conflict_detection(so, vo, si, vi, 0.0, horizon);
        if !fwd.conflict() || fwd.loss.duration() < 1.0 {
            continue;
        }
        // Start both aircraft where they end up and fly them backwards
        let so_end = so.linear(vo.vect3(), horizon);
        let si_end = si.linear(vi.vect3(), horizon);
        let back = cd.conflict_detection(so_end, negated(vo), si_end, negated(vi), 0.0, horizon);
        assert!(back.conflict());
        assert!((back.time_in() - (horizon - fwd.time_out())).abs() < 1e-4);
        assert!((back.time_out() - (horizon - fwd.time_in())).abs() < 1e-4);
        checked += 1;
    }
    assert!(checked > 0);
}

#[test]
fn test_larger_cylinder_never_shrinks_conflict() {
    let mut rng = StdRng::seed_from_u64(13);
    let small = CdCylinder::default();
    for _ in 0..CASES {
        let (so, vo) = random_state(&mut rng);
        let (si, vi) = random_state(&mut rng);
        let large = CdCylinder::new(
            small.horizontal_separation() * rng.random_range(1.0..2.0),
            small.vertical_separation() * rng.random_range(1.0..2.0),
        );
        let a = small.conflict_detection(so, vo, si, vi, 0.0, 600.0);
        let b = large.conflict_detection(so, vo, si, vi, 0.0, 600.0);
        if a.conflict() {
            assert!(b.conflict());
            assert!(b.time_in() <= a.time_in() + SLACK);
            assert!(b.time_out() >= a.time_out() - SLACK);
        }
    }
}

#[test]
fn test_merge_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(14);
    for _ in 0..CASES {
        let n = rng.random_range(0..12);
        let mut raw: Vec<ConflictInterval> = (0..n)
            .map(|i| {
                let tin = rng.random_range(0.0..1000.0);
                let dur = rng.random_range(0.0..150.0);
                ConflictInterval::new(tin, tin + dur, tin + dur / 2.0, rng.random_range(0.0..1.0))
                    .with_segments(i, i)
            })
            .collect();
        raw.sort_by(|a, b| a.time_in.total_cmp(&b.time_in));

        let once = merge(&raw);
        assert_eq!(merge(&once), once);
        assert_ordered(&once);
        for c in &raw {
            assert!(once
                .iter()
                .any(|m| m.time_in <= c.time_in && m.time_out >= c.time_out));
        }
    }
}

#[test]
fn test_sequencer_output_ordered_and_clipped() {
    let mut rng = StdRng::seed_from_u64(15);
    let leg_s = 300.0;
    let mut found = 0;
    for _ in 0..CASES / 5 {
        let intent = random_plan(&mut rng, "intruder", 5, leg_s);
        let (so, vo) = random_state(&mut rng);
        let b = rng.random_range(0.0..600.0);
        let t = b + rng.random_range(0.0..900.0);

        let mut cdsi = Cdsi::new(Box::new(CdCylinder::new(8000.0, 300.0)), 0.0);
        cdsi.detection(&Position::Xyz(so), vo, 0.0, f64::MAX, &intent, b, t);
        let conflicts = cdsi.conflicts().as_slice();
        assert_ordered(conflicts);
        for c in conflicts {
            assert!(c.time_in <= t + SLACK, "{c:?} after {t}");
            assert!(c.time_out >= b - SLACK, "{c:?} before {b}");
            assert!(c.time_in >= intent.time(c.segment_in) - SLACK);
            assert!(c.time_out <= intent.time(c.segment_out + 1) + SLACK);
        }
        found += conflicts.len();
    }
    assert!(found > 0);
}

#[test]
fn test_extended_detection_overlaps_window() {
    let mut rng = StdRng::seed_from_u64(16);
    for _ in 0..CASES / 5 {
        let own = random_plan(&mut rng, "own", 4, 300.0);
        let intent = random_plan(&mut rng, "intruder", 4, 300.0);
        let b = rng.random_range(0.0..900.0);
        let t = b + rng.random_range(0.0..300.0);

        let mut cdii = Cdii::new(Box::new(CdCylinder::new(8000.0, 300.0)), 0.0);
        cdii.detection_extended(&own, &intent, b, t);
        assert_ordered(cdii.conflicts().as_slice());
        for i in 0..cdii.size() {
            assert!(cdii.time_in(i) <= t);
            assert!(cdii.time_out(i) >= b);
        }
    }
}

#[test]
fn test_stationary_point_on_static_boundary() {
    let mut rng = StdRng::seed_from_u64(17);
    let square = Poly2D::new(vec![
        Vect2::new(0.0, 0.0),
        Vect2::new(1000.0, 0.0),
        Vect2::new(1000.0, 1000.0),
        Vect2::new(0.0, 1000.0),
    ]);
    let mp = MovingPolygon3D::new(
        MovingPolygon2D::translating(square, Vect2::ZERO, f64::MAX),
        0.0,
        0.0,
        500.0,
    );
    let cd = CdPolyIter::default();
    for _ in 0..CASES {
        let along = rng.random_range(0.0..1000.0);
        let p = match rng.random_range(0..4) {
            0 => Vect2::new(along, 0.0),
            1 => Vect2::new(1000.0, along),
            2 => Vect2::new(along, 1000.0),
            _ => Vect2::new(0.0, along),
        };
        let b = rng.random_range(0.0..100.0);
        let t = b + rng.random_range(1.0..200.0);
        let found = cd.conflict_detection(Vect3::new(p.x, p.y, 100.0), Velocity::ZERO, &mp, b, t);
        match found.as_slice() {
            [] => {}
            [c] => {
                assert!((c.time_in - b).abs() < SLACK);
                assert!((c.time_out - t).abs() < SLACK);
            }
            more => panic!("partial coverage {more:?}"),
        }
    }
}

#[test]
fn test_stationary_pair_on_cylinder_edge() {
    let cd = CdCylinder::new(1000.0, 100.0);
    let si = Vect3::new(1000.0, 0.0, 0.0);
    let v = Velocity::new(50.0, 0.0, 0.0);
    let det = cd.conflict_detection(Vect3::ZERO, v, si, v, 10.0, 90.0);
    if det.conflict() {
        assert!((det.time_in() - 10.0).abs() < SLACK);
        assert!((det.time_out() - 90.0).abs() < SLACK);
    }
}
