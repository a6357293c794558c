//! Floating point helpers shared by the detection kernels.
//!
//! Comparisons are done in units in the last place (ULPs) so that tolerances
//! scale with the magnitude of the operands. Around zero, where ULP distance is
//! meaningless, an absolute threshold matching the requested precision is used.

/// Roughly five significant decimal digits.
pub const PRECISION5: i64 = 1 << 40;
/// Roughly seven significant decimal digits.
pub const PRECISION7: i64 = 1 << 34;
/// Roughly nine significant decimal digits.
pub const PRECISION9: i64 = 1 << 27;
/// Roughly thirteen significant decimal digits.
pub const PRECISION13: i64 = 16348;
pub const PRECISION_DEFAULT: i64 = PRECISION13;

/// Determine if two values are equal within `max_ulps` units in the last place.
///
/// NaN is never almost-equal to anything. Infinities are only equal to
/// themselves.
pub fn almost_equals_prec(a: f64, b: f64, max_ulps: i64) -> bool {
    if a == b {
        return true;
    }
    if a == 0.0 || b == 0.0 {
        let comp = match max_ulps {
            PRECISION5 => 1e-5,
            PRECISION7 => 1e-7,
            PRECISION9 => 1e-9,
            _ => 1e-13,
        };
        return (a - b).abs() < comp;
    }
    if !a.is_finite() || !b.is_finite() {
        return false;
    }
    let diff = i128::from(ordered_bits(a)) - i128::from(ordered_bits(b));
    diff.abs() <= i128::from(max_ulps)
}

/// Map the IEEE bit pattern onto a monotonic integer line so that adjacent
/// floats differ by one.
fn ordered_bits(x: f64) -> i64 {
    let bits = x.to_bits() as i64;
    if bits < 0 {
        i64::MIN.wrapping_sub(bits)
    } else {
        bits
    }
}

pub fn almost_equals(a: f64, b: f64) -> bool {
    almost_equals_prec(a, b, PRECISION_DEFAULT)
}

/// `a < b` and not almost equal.
pub fn almost_less(a: f64, b: f64, max_ulps: i64) -> bool {
    !almost_equals_prec(a, b, max_ulps) && a < b
}

/// `a <= b` or almost equal.
pub fn almost_leq(a: f64, b: f64, max_ulps: i64) -> bool {
    a < b || almost_equals_prec(a, b, max_ulps)
}

/// `a >= b` or almost equal.
pub fn almost_geq(a: f64, b: f64, max_ulps: i64) -> bool {
    a > b || almost_equals_prec(a, b, max_ulps)
}

pub fn sq(x: f64) -> f64 {
    x * x
}

/// Square root that treats small negative round-off as zero.
pub fn sqrt_safe(x: f64) -> f64 {
    x.max(0.0).sqrt()
}

/// +1 for non-negative values, -1 otherwise.
pub fn sign(x: f64) -> f64 {
    if x >= 0.0 {
        1.0
    } else {
        -1.0
    }
}

/// Root of `a*x^2 + 2*b*x + c = 0` selected by `eps` (-1 smaller, +1 larger
/// when `a > 0`).
///
/// Returns NaN when there is no real root or the equation is degenerate.
pub fn root2b(a: f64, b: f64, c: f64, eps: i32) -> f64 {
    if a == 0.0 && b == 0.0 {
        return f64::NAN;
    }
    if a == 0.0 {
        return -c / (2.0 * b);
    }
    let discr = sq(b) - a * c;
    if almost_equals(sq(b), a * c) || discr > 0.0 {
        (-b + f64::from(eps) * sqrt_safe(discr)) / a
    } else {
        f64::NAN
    }
}
