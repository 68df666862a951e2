//! Negative-log-space arithmetic.
//!
//! Values are costs `c = -ln p`. Zero probability is `+inf`, probability one is `0`.

use std::f64::consts::LN_2;

/// Returns `-ln(exp(-a) + exp(-b))`.
///
/// Computed as `min - ln(1 + exp(-(max - min)))` so that neither operand is ever
/// exponentiated directly.
pub fn log_plus(a: f64, b: f64) -> f64 {
    if a == f64::INFINITY {
        return b;
    }
    if b == f64::INFINITY {
        return a;
    }
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    lo - (lo - hi).exp().ln_1p()
}

/// Returns `-ln(exp(-a) - exp(-b))`, or `None` when `b` is cheaper than `a`
/// (the difference would be a negative probability).
///
/// Uses `ln(-expm1(-d))` for small gaps and `ln_1p(-exp(-d))` for large ones;
/// the switch at `ln 2` keeps both branches away from cancellation.
pub fn log_minus(a: f64, b: f64) -> Option<f64> {
    if b == f64::INFINITY {
        return Some(a);
    }
    if a > b || a.is_nan() || b.is_nan() {
        return None;
    }
    let gap = b - a;
    if gap == 0.0 {
        return Some(f64::INFINITY);
    }
    let log_one_minus = if gap < LN_2 {
        (-(-gap).exp_m1()).ln()
    } else {
        (-(-gap).exp()).ln_1p()
    };
    Some(a - log_one_minus)
}

/// Folds [`log_plus`] over an iterator of costs.
pub fn log_sum<I: IntoIterator<Item = f64>>(costs: I) -> f64 {
    costs.into_iter().fold(f64::INFINITY, log_plus)
}
