//! Age-based linear interpolation of LMS parameters between two reference rows.

use crate::lms::LmsParams;
use crate::reference::ReferenceBracket;

/// Resolves the LMS parameters for `age_days` from its bracketing rows.
///
/// An exact (or clamped) bracket returns the row's parameters untouched, so exact-age lookups
/// carry no interpolation error. Otherwise each of L, M and S is interpolated independently by
/// the age ratio `(age - lower.age) / (upper.age - lower.age)`.
pub fn interpolate(bracket: &ReferenceBracket, age_days: u32) -> LmsParams {
    let (lower, upper) = (&bracket.lower, &bracket.upper);
    if bracket.is_exact() {
        return lower.lms;
    }

    let span = f64::from(upper.age_days) - f64::from(lower.age_days);
    let ratio = ((f64::from(age_days) - f64::from(lower.age_days)) / span).clamp(0.0, 1.0);
    let lerp = |a: f64, b: f64| a + ratio * (b - a);

    LmsParams {
        l: lerp(lower.lms.l, upper.lms.l),
        m: lerp(lower.lms.m, upper.lms.m),
        s: lerp(lower.lms.s, upper.lms.s),
    }
}
