//! Z-score to percentile conversion.
//!
//! The standard normal CDF is evaluated with the Abramowitz & Stegun 26.2.17 rational
//! approximation (absolute error below 7.5e-8). The upper half is computed directly and the lower
//! half by reflection, so the result is exactly symmetric around `Z = 0`.

use crate::constants::{PERCENTILE_LOWER_CLAMP, PERCENTILE_UPPER_CLAMP, PERCENTILE_Z_CLAMP};

const P: f64 = 0.231_641_9;
const B1: f64 = 0.319_381_530;
const B2: f64 = -0.356_563_782;
const B3: f64 = 1.781_477_937;
const B4: f64 = -1.821_255_978;
const B5: f64 = 1.330_274_429;
const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;

/// Standard normal cumulative distribution function, `P(X <= z)`.
pub fn normal_cdf(z: f64) -> f64 {
    let x = z.abs();
    let t = 1.0 / (1.0 + P * x);
    let density = INV_SQRT_2PI * (-0.5 * x * x).exp();
    let poly = t * (B1 + t * (B2 + t * (B3 + t * (B4 + t * B5))));
    let upper = 1.0 - density * poly;
    if z >= 0.0 {
        upper
    } else {
        1.0 - upper
    }
}

/// Converts a Z-score to a percentile in `(0, 100)`.
///
/// Inputs beyond ±5 are clamped to 99.9999 / 0.0001 where the approximation's relative error
/// would otherwise dominate.
pub fn percentile(z: f64) -> f64 {
    if z > PERCENTILE_Z_CLAMP {
        return PERCENTILE_UPPER_CLAMP;
    }
    if z < -PERCENTILE_Z_CLAMP {
        return PERCENTILE_LOWER_CLAMP;
    }
    normal_cdf(z) * 100.0
}

/// Rounds to a fixed number of decimal places. Only used at display/API boundaries.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_is_the_median() {
        assert!((percentile(0.0) - 50.0).abs() < 0.01);
    }

    #[test]
    fn known_quantiles() {
        assert!((percentile(1.0) - 84.134).abs() < 0.01);
        assert!((percentile(-2.0) - 2.275).abs() < 0.01);
        assert!((percentile(1.96) - 97.5).abs() < 0.01);
    }

    #[test]
    fn symmetric_around_zero() {
        for z in [0.3, 1.1, 2.7, 4.2] {
            assert!((percentile(z) + percentile(-z) - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn clamps_extreme_tails() {
        assert_eq!(percentile(7.0), 99.9999);
        assert_eq!(percentile(-7.0), 0.0001);
    }

    #[test]
    fn monotonic_on_a_fine_grid() {
        let mut previous = percentile(-5.0);
        for step in 1..=10_000 {
            let z = -5.0 + f64::from(step) / 1000.0;
            let current = percentile(z);
            assert!(current > previous, "not increasing at z={z}");
            previous = current;
        }
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_to(1.23456, 3), 1.235);
        assert_eq!(round_to(49.96, 1), 50.0);
    }

    proptest! {
        #[test]
        fn increasing_in_z(a in -5.0f64..4.0, delta in 1e-3f64..1.0) {
            prop_assert!(percentile(a + delta) > percentile(a));
        }
    }
}
